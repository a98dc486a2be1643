//! The scheduler engine: assignment, cycle stepping, lifecycle and queries.
//!
//! The engine never looks at a clock. Each call to [`SchedulerEngine::cycle`]
//! advances the simulation by exactly one step:
//! 1. every worker, in pool order, works its head task and may complete it;
//! 2. the migration policy decides whether one ring migration pass runs;
//! 3. the cycle counter increments.
//!
//! Whoever owns the engine decides when cycles happen (a timer thread, a
//! test, or a headless loop).

use std::fmt;

use rand::Rng;
use tracing::{debug, info, trace};

use crate::error::{Result, SimError};
use crate::factory::{TaskFactory, WorkerFactory};
use crate::migration::{self, CoinFlip, MigrationPolicy};
use crate::random::RandomGenerator;
use crate::settings::Settings;
use crate::types::{Task, TaskId, Worker, WorkerId};

// Keeps the migration coin independent of the generation stream.
const MIGRATION_SEED_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Emitted once per task, in the cycle where its complexity first drops to zero or below.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionEvent {
    /// Cycle number before the end-of-cycle increment.
    pub cycle: u64,
    pub worker_id: WorkerId,
    pub worker_name: String,
    pub task_id: TaskId,
    pub task_name: String,
    pub initial_complexity: u32,
}

impl fmt::Display for CompletionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cycle={} worker={} task={} complexity={}",
            self.cycle, self.worker_name, self.task_name, self.initial_complexity
        )
    }
}

/// Outcome of a single [`SchedulerEngine::cycle`] call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub cycle: u64,
    pub completions: Vec<CompletionEvent>,
    /// Tasks moved by the migration pass; `None` when no pass ran.
    pub migrated: Option<usize>,
}

/// Read-only view of one task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub name: String,
    pub initial_complexity: u32,
    pub complexity: i64,
}

impl From<&Task> for TaskSnapshot {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            name: task.name.clone(),
            initial_complexity: task.initial_complexity,
            complexity: task.complexity,
        }
    }
}

/// One row of the worker list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerSnapshot {
    pub id: WorkerId,
    pub name: String,
    pub productivity: u32,
    pub queued: usize,
    pub head: Option<TaskSnapshot>,
}

impl fmt::Display for WorkerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.productivity)?;
        match &self.head {
            Some(task) => write!(f, " -- {}: {}", task.name, task.complexity),
            None => write!(f, " -- idle"),
        }
    }
}

/// A worker together with its whole queue, head first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerDetail {
    pub id: WorkerId,
    pub name: String,
    pub productivity: u32,
    pub tasks: Vec<TaskSnapshot>,
}

/// Owns the worker pool and steps the round-robin simulation.
pub struct SchedulerEngine {
    settings: Settings,
    workers: Vec<Worker>,
    /// Generated tasks not yet handed to a worker.
    pending: Vec<Task>,
    current_cycle: u64,
    running: bool,
    assigned: bool,
    history: Vec<CompletionEvent>,
    migration_passes: u64,
    migration: Box<dyn MigrationPolicy + Send>,
}

impl fmt::Debug for SchedulerEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerEngine")
            .field("settings", &self.settings)
            .field("workers", &self.workers.len())
            .field("pending", &self.pending.len())
            .field("current_cycle", &self.current_cycle)
            .field("running", &self.running)
            .field("completed", &self.history.len())
            .finish()
    }
}

impl SchedulerEngine {
    /// Engine over an explicit pool. Tasks stay pending until [`assign`](Self::assign).
    pub fn new(
        settings: Settings,
        workers: Vec<Worker>,
        tasks: Vec<Task>,
        migration: impl MigrationPolicy + Send + 'static,
    ) -> Self {
        Self {
            settings,
            workers,
            pending: tasks,
            current_cycle: 0,
            running: false,
            assigned: false,
            history: Vec::new(),
            migration_passes: 0,
            migration: Box::new(migration),
        }
    }

    /// Generate a fresh pool from `settings` using `rng`.
    pub fn generate<R: Rng>(
        settings: Settings,
        rng: &mut RandomGenerator<R>,
        migration: impl MigrationPolicy + Send + 'static,
    ) -> Result<Self> {
        let workers = WorkerFactory::new(&settings).generate_workers(rng)?;
        let tasks = TaskFactory::new(&settings).generate_tasks(rng)?;
        info!(
            "[ENGINE] generated workers={} tasks={}",
            workers.len(),
            tasks.len()
        );
        Ok(Self::new(settings, workers, tasks, migration))
    }

    /// Fully reproducible engine: generation and migration coin both derive from `seed`.
    pub fn seeded(settings: Settings, seed: u64) -> Result<Self> {
        let mut rng = RandomGenerator::seeded(seed);
        Self::generate(
            settings,
            &mut rng,
            CoinFlip::seeded(seed ^ MIGRATION_SEED_SALT),
        )
    }

    pub fn set_migration_policy(&mut self, migration: impl MigrationPolicy + Send + 'static) {
        self.migration = Box::new(migration);
    }

    /// Deal pending tasks round-robin: task `i` goes to worker `i mod N`.
    ///
    /// Returns the number of tasks dealt. With no workers the tasks stay
    /// pending and a configuration error is returned.
    pub fn assign(&mut self) -> Result<usize> {
        let worker_count = self.workers.len();
        if worker_count == 0 {
            return Err(SimError::NoWorkers {
                tasks: self.pending.len(),
            });
        }
        let dealt = self.pending.len();
        for (index, task) in self.pending.drain(..).enumerate() {
            self.workers[index % worker_count].add_task(task);
        }
        self.assigned = true;
        debug!("[ENGINE] assigned tasks={dealt} across workers={worker_count}");
        Ok(dealt)
    }

    /// Advance the simulation by one cycle.
    pub fn cycle(&mut self) -> CycleReport {
        let cycle = self.current_cycle;
        let mut completions = Vec::new();

        for worker in &mut self.workers {
            let productivity = worker.productivity;
            let done = match worker.head_mut() {
                Some(task) => task.work(productivity),
                None => continue,
            };
            if !done {
                continue;
            }
            // Only the head is touched, so at most one completion per worker.
            if let Some(task) = worker.take_head() {
                let event = CompletionEvent {
                    cycle,
                    worker_id: worker.id,
                    worker_name: worker.name.clone(),
                    task_id: task.id,
                    task_name: task.name,
                    initial_complexity: task.initial_complexity,
                };
                debug!("[CYCLE] completed {event}");
                completions.push(event);
            }
        }

        let migrated = if self.migration.should_migrate(cycle) {
            Some(self.migrate())
        } else {
            None
        };

        self.history.extend(completions.iter().cloned());
        self.current_cycle += 1;
        trace!(
            "[CYCLE] cycle={cycle} completions={} migrated={migrated:?}",
            completions.len()
        );
        CycleReport {
            cycle,
            completions,
            migrated,
        }
    }

    /// Run one migration pass immediately, bypassing the policy.
    pub fn migrate(&mut self) -> usize {
        let moved = migration::rotate_heads(&mut self.workers);
        self.migration_passes += 1;
        debug!("[MIGRATE] cycle={} moved={moved}", self.current_cycle);
        moved
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Mark the engine as running, assigning pending tasks first if needed.
    /// An empty worker pool refuses to start.
    pub fn run(&mut self) -> Result<()> {
        if !self.assigned {
            self.assign()?;
        } else if self.workers.is_empty() {
            return Err(SimError::NoWorkers {
                tasks: self.pending.len(),
            });
        }
        if !self.running {
            info!("[ENGINE] running from cycle={}", self.current_cycle);
        }
        self.running = true;
        Ok(())
    }

    /// Suspend without touching any simulation state.
    pub fn stop(&mut self) {
        if self.running {
            info!("[ENGINE] stopped at cycle={}", self.current_cycle);
        }
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Discard all simulation state. A new engine is needed to simulate again.
    pub fn clear(&mut self) {
        self.running = false;
        self.assigned = false;
        self.workers.clear();
        self.pending.clear();
        self.history.clear();
        self.current_cycle = 0;
        self.migration_passes = 0;
        info!("[ENGINE] cleared");
    }

    // ── Queries ─────────────────────────────────────────────────────

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn current_cycle(&self) -> u64 {
        self.current_cycle
    }

    pub fn workers(&self) -> &[Worker] {
        &self.workers
    }

    /// Tasks not yet assigned to any worker.
    pub fn pending_tasks(&self) -> &[Task] {
        &self.pending
    }

    /// Every completion so far, in emission order.
    pub fn history(&self) -> &[CompletionEvent] {
        &self.history
    }

    pub fn migration_passes(&self) -> u64 {
        self.migration_passes
    }

    /// Tasks still sitting in worker queues.
    pub fn queued_tasks(&self) -> usize {
        self.workers.iter().map(Worker::task_count).sum()
    }

    /// True once every generated task has been assigned and completed.
    pub fn is_drained(&self) -> bool {
        self.pending.is_empty() && self.workers.iter().all(Worker::is_idle)
    }

    /// Worker list with each worker's head task.
    pub fn snapshot(&self) -> Vec<WorkerSnapshot> {
        self.workers
            .iter()
            .map(|worker| WorkerSnapshot {
                id: worker.id,
                name: worker.name.clone(),
                productivity: worker.productivity,
                queued: worker.task_count(),
                head: worker.head().map(TaskSnapshot::from),
            })
            .collect()
    }

    /// Full queue of the worker called `name`.
    pub fn find_worker_by_name(&self, name: &str) -> Result<WorkerDetail> {
        let worker = self
            .workers
            .iter()
            .find(|w| w.name == name)
            .ok_or_else(|| SimError::WorkerNotFound(name.to_string()))?;
        Ok(WorkerDetail {
            id: worker.id,
            name: worker.name.clone(),
            productivity: worker.productivity,
            tasks: worker.tasks().map(TaskSnapshot::from).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::{Always, Never};
    use crate::settings::SettingsConfig;

    fn small_settings() -> Settings {
        Settings::new(SettingsConfig {
            timer_period_ms: 1,
            min_workers: 2,
            max_workers: 5,
            min_tasks: 5,
            max_tasks: 40,
            min_productivity: 3,
            max_productivity: 9,
            min_complexity: 10,
            max_complexity: 60,
        })
        .expect("valid settings")
    }

    fn pool(productivities: &[u32], complexities: &[u32]) -> (Vec<Worker>, Vec<Task>) {
        let workers = productivities
            .iter()
            .enumerate()
            .map(|(i, &p)| Worker::new(i as u64, format!("w{i}"), p))
            .collect();
        let tasks = complexities
            .iter()
            .enumerate()
            .map(|(i, &c)| Task::new(i as u64, format!("t{i}"), c))
            .collect();
        (workers, tasks)
    }

    #[test]
    fn assignment_uses_stride_mapping() {
        let (workers, tasks) = pool(&[1, 1, 1], &[5; 8]);
        let mut engine = SchedulerEngine::new(Settings::default(), workers, tasks, Never);
        assert_eq!(engine.assign().unwrap(), 8);
        let queues: Vec<Vec<u64>> = engine
            .workers()
            .iter()
            .map(|w| w.tasks().map(|t| t.id).collect())
            .collect();
        assert_eq!(queues, vec![vec![0, 3, 6], vec![1, 4, 7], vec![2, 5]]);
        assert!(engine.pending_tasks().is_empty());
    }

    #[test]
    fn assignment_without_workers_is_a_configuration_error() {
        let (_, tasks) = pool(&[], &[5, 5]);
        let mut engine = SchedulerEngine::new(Settings::default(), Vec::new(), tasks, Never);
        let err = engine.assign().unwrap_err();
        assert!(matches!(err, SimError::NoWorkers { tasks: 2 }));
        assert!(err.is_configuration());
        // Tasks remain pending and the engine refuses to start.
        assert_eq!(engine.pending_tasks().len(), 2);
        assert!(engine.run().is_err());
        assert!(!engine.is_running());
    }

    #[test]
    fn head_progresses_by_productivity_until_done() {
        let (workers, tasks) = pool(&[7], &[30]);
        let mut engine = SchedulerEngine::new(Settings::default(), workers, tasks, Never);
        engine.assign().unwrap();
        let mut expected = 30i64;
        loop {
            let report = engine.cycle();
            expected -= 7;
            if expected <= 0 {
                assert_eq!(report.completions.len(), 1);
                break;
            }
            assert!(report.completions.is_empty());
            assert_eq!(engine.workers()[0].head().unwrap().complexity, expected);
        }
        assert!(engine.is_drained());
    }

    #[test]
    fn one_completion_per_worker_per_cycle() {
        // Productivity far above complexity still finishes only the head.
        let (workers, tasks) = pool(&[1_000], &[1, 1, 1]);
        let mut engine = SchedulerEngine::new(Settings::default(), workers, tasks, Never);
        engine.assign().unwrap();
        for cycle in 0..3 {
            let report = engine.cycle();
            assert_eq!(report.completions.len(), 1);
            assert_eq!(report.completions[0].cycle, cycle);
            assert_eq!(report.completions[0].task_id, cycle);
        }
        assert!(engine.cycle().completions.is_empty());
    }

    #[test]
    fn completed_tasks_are_not_migrated() {
        let (workers, tasks) = pool(&[100, 1], &[5, 50]);
        let mut engine = SchedulerEngine::new(Settings::default(), workers, tasks, Always);
        engine.assign().unwrap();
        let report = engine.cycle();
        assert_eq!(report.completions.len(), 1);
        assert_eq!(report.completions[0].task_id, 0);
        // Only worker 1's head was left to rotate.
        assert_eq!(report.migrated, Some(1));
        assert_eq!(engine.queued_tasks(), 1);
        let head = engine.workers()[0].head().expect("task moved to worker 0");
        assert_eq!((head.id, head.complexity), (1, 49));
    }

    #[test]
    fn cycle_counter_and_history_track_reports() {
        let mut engine = SchedulerEngine::seeded(small_settings(), 5).unwrap();
        engine.assign().unwrap();
        let mut total = 0;
        while !engine.is_drained() {
            let before = engine.current_cycle();
            let report = engine.cycle();
            assert_eq!(report.cycle, before);
            assert_eq!(engine.current_cycle(), before + 1);
            total += report.completions.len();
        }
        assert_eq!(engine.history().len(), total);
    }

    #[test]
    fn lifecycle_run_stop_resume_keeps_state() {
        let mut engine = SchedulerEngine::seeded(small_settings(), 9).unwrap();
        engine.run().unwrap();
        assert!(engine.is_running());
        engine.cycle();
        engine.cycle();
        engine.stop();
        assert!(!engine.is_running());
        assert_eq!(engine.current_cycle(), 2);
        engine.run().unwrap();
        assert!(engine.is_running());
        assert_eq!(engine.current_cycle(), 2);
    }

    #[test]
    fn clear_discards_everything() {
        let mut engine = SchedulerEngine::seeded(small_settings(), 2).unwrap();
        engine.run().unwrap();
        engine.cycle();
        engine.clear();
        assert!(!engine.is_running());
        assert!(engine.workers().is_empty());
        assert!(engine.history().is_empty());
        assert_eq!(engine.current_cycle(), 0);
        assert!(matches!(engine.run(), Err(SimError::NoWorkers { tasks: 0 })));
    }

    #[test]
    fn snapshot_and_detail_views() {
        let (workers, tasks) = pool(&[2, 3], &[10, 20, 30]);
        let mut engine = SchedulerEngine::new(Settings::default(), workers, tasks, Never);
        engine.assign().unwrap();
        engine.cycle();

        let rows = engine.snapshot();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].queued, 2);
        assert_eq!(rows[0].head.as_ref().map(|t| t.complexity), Some(8));
        assert_eq!(rows[1].to_string(), "w1: 3 -- t1: 17");

        let detail = engine.find_worker_by_name("w0").unwrap();
        let queue: Vec<(String, i64)> = detail
            .tasks
            .iter()
            .map(|t| (t.name.clone(), t.complexity))
            .collect();
        assert_eq!(queue, vec![("t0".to_string(), 8), ("t2".to_string(), 30)]);

        assert!(matches!(
            engine.find_worker_by_name("nobody"),
            Err(SimError::WorkerNotFound(name)) if name == "nobody"
        ));
    }

    #[test]
    fn same_seed_same_run() {
        let run = |seed| {
            let mut engine = SchedulerEngine::seeded(small_settings(), seed).unwrap();
            engine.assign().unwrap();
            while !engine.is_drained() {
                engine.cycle();
            }
            engine.history().to_vec()
        };
        assert_eq!(run(77), run(77));
    }
}
