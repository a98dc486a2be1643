//! Random generation of worker and task pools from validated settings.

use std::collections::HashSet;

use rand::Rng;
use tracing::debug;

use crate::error::Result;
use crate::random::{DEFAULT_IDENTIFIER_LEN, RandomGenerator};
use crate::settings::{Bounds, Settings};
use crate::types::{Task, TaskId, Worker, WorkerId};

/// Builds the worker pool: random size, random productivity, unique names.
#[derive(Debug, Clone)]
pub struct WorkerFactory {
    count: Bounds,
    productivity: Bounds,
    next_id: WorkerId,
    names: HashSet<String>,
}

impl WorkerFactory {
    pub fn new(settings: &Settings) -> Self {
        Self {
            count: settings.workers(),
            productivity: settings.productivity(),
            next_id: 0,
            names: HashSet::new(),
        }
    }

    /// One worker with a name not yet handed out by this factory.
    pub fn generate_worker<R: Rng>(&mut self, rng: &mut RandomGenerator<R>) -> Result<Worker> {
        let productivity = rng.random_int(self.productivity.min(), self.productivity.max())?;
        let name = loop {
            let candidate = rng.random_identifier(DEFAULT_IDENTIFIER_LEN);
            if self.names.insert(candidate.clone()) {
                break candidate;
            }
        };
        let id = self.next_id;
        self.next_id += 1;
        Ok(Worker::new(id, name, productivity))
    }

    /// A pool of `random_int(min_workers, max_workers)` workers; may be empty.
    pub fn generate_workers<R: Rng>(&mut self, rng: &mut RandomGenerator<R>) -> Result<Vec<Worker>> {
        let count = rng.random_int(self.count.min(), self.count.max())?;
        let workers = (0..count)
            .map(|_| self.generate_worker(rng))
            .collect::<Result<Vec<_>>>()?;
        debug!("[FACTORY] generated workers={}", workers.len());
        Ok(workers)
    }
}

/// Builds the task pool: random size, random complexity.
#[derive(Debug, Clone)]
pub struct TaskFactory {
    count: Bounds,
    complexity: Bounds,
    next_id: TaskId,
}

impl TaskFactory {
    pub fn new(settings: &Settings) -> Self {
        Self {
            count: settings.tasks(),
            complexity: settings.complexity(),
            next_id: 0,
        }
    }

    pub fn generate_task<R: Rng>(&mut self, rng: &mut RandomGenerator<R>) -> Result<Task> {
        let complexity = rng.random_int(self.complexity.min(), self.complexity.max())?;
        let id = self.next_id;
        self.next_id += 1;
        Ok(Task::new(id, rng.random_identifier(DEFAULT_IDENTIFIER_LEN), complexity))
    }

    pub fn generate_tasks<R: Rng>(&mut self, rng: &mut RandomGenerator<R>) -> Result<Vec<Task>> {
        let count = rng.random_int(self.count.min(), self.count.max())?;
        let tasks = (0..count)
            .map(|_| self.generate_task(rng))
            .collect::<Result<Vec<_>>>()?;
        debug!("[FACTORY] generated tasks={}", tasks.len());
        Ok(tasks)
    }
}
