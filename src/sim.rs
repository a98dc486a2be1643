//! Demo, live, inspection, benchmark and stress runners behind the CLI.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::{info, warn};

use crate::driver::TimerDriver;
use crate::engine::{CycleReport, SchedulerEngine, WorkerSnapshot};
use crate::error::{Result, SimError};
use crate::settings::{Settings, SettingsConfig};

/// Safety cap for headless runs; every run drains long before this.
pub const DEFAULT_MAX_CYCLES: u64 = 1_000_000;
pub const DEFAULT_BENCH_RUNS: usize = 20;
pub const DEFAULT_STRESS_WORKERS: [u32; 4] = [1, 2, 8, 32];
pub const DEFAULT_STRESS_TASKS: [u32; 3] = [10, 100, 1000];

const CSV_HEADER: &str =
    "workers,tasks,runs,total_cycles,completed,elapsed_ms,cycles_per_s,cpu_user_s,cpu_sys_s,leftover";

/// Best-effort CPU user/system time snapshot (seconds) on Unix platforms.
#[cfg(unix)]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    use libc::{RUSAGE_SELF, getrusage, rusage};
    // SAFETY: rusage is plain old data; all-zero is a valid value.
    let mut usage: rusage = unsafe { std::mem::zeroed() };
    let rc = unsafe { getrusage(RUSAGE_SELF, &mut usage) };
    if rc != 0 {
        return None;
    }
    let user = usage.ru_utime.tv_sec as f64 + (usage.ru_utime.tv_usec as f64 / 1_000_000.0);
    let sys = usage.ru_stime.tv_sec as f64 + (usage.ru_stime.tv_usec as f64 / 1_000_000.0);
    Some((user, sys))
}

/// Stub on non-Unix platforms.
#[cfg(not(unix))]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    None
}

/// Step until every queue is empty or `max_cycles` is hit; returns cycles run.
fn drain_engine(
    engine: &mut SchedulerEngine,
    max_cycles: u64,
    mut on_report: impl FnMut(&CycleReport),
) -> u64 {
    let mut cycles = 0;
    while !engine.is_drained() && cycles < max_cycles {
        let report = engine.cycle();
        on_report(&report);
        cycles += 1;
    }
    cycles
}

/// Final tallies of a headless run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub seed: u64,
    pub workers: usize,
    pub tasks_total: usize,
    pub cycles: u64,
    pub completed: usize,
    pub remaining: usize,
    pub migrations: u64,
    pub completed_per_worker: Vec<usize>,
}

impl RunSummary {
    fn collect(engine: &SchedulerEngine, seed: u64, tasks_total: usize) -> Self {
        let completed_per_worker = engine
            .workers()
            .iter()
            .map(|worker| {
                engine
                    .history()
                    .iter()
                    .filter(|event| event.worker_id == worker.id)
                    .count()
            })
            .collect();
        Self {
            seed,
            workers: engine.workers().len(),
            tasks_total,
            cycles: engine.current_cycle(),
            completed: engine.history().len(),
            remaining: engine.queued_tasks() + engine.pending_tasks().len(),
            migrations: engine.migration_passes(),
            completed_per_worker,
        }
    }
}

/// Generate, assign and drain one seeded run without a timer.
pub fn simulate(settings: Settings, seed: u64, max_cycles: u64) -> Result<RunSummary> {
    let mut engine = SchedulerEngine::seeded(settings, seed)?;
    let tasks_total = engine.pending_tasks().len();
    engine.assign()?;
    drain_engine(&mut engine, max_cycles, |_| {});
    Ok(RunSummary::collect(&engine, seed, tasks_total))
}

fn print_workers(rows: &[WorkerSnapshot]) {
    println!("WORKERS");
    for row in rows.iter().filter(|row| row.head.is_some()) {
        println!("  {row}");
    }
}

/// Run the default headless demo and print every completion plus a summary.
pub fn run_demo(settings: Settings, seed: u64, max_cycles: u64) -> Result<()> {
    info!("[DEMO] start seed={seed}");
    let mut engine = SchedulerEngine::seeded(settings, seed)?;
    let tasks_total = engine.pending_tasks().len();
    engine.assign()?;
    print_workers(&engine.snapshot());

    let start = Instant::now();
    drain_engine(&mut engine, max_cycles, |report| {
        for event in &report.completions {
            println!("completed {event}");
        }
    });
    let summary = RunSummary::collect(&engine, seed, tasks_total);
    info!(
        "[DEMO] finished cycles={} in {}ms",
        summary.cycles,
        start.elapsed().as_millis()
    );
    if summary.remaining > 0 {
        warn!("[DEMO] cycle cap {max_cycles} reached with tasks left");
    }

    println!("DEMO SUMMARY");
    println!("seed={}", summary.seed);
    println!("workers={} tasks_total={}", summary.workers, summary.tasks_total);
    println!("cycles={}", summary.cycles);
    println!("completed={}", summary.completed);
    println!("remaining={}", summary.remaining);
    println!("migrations={}", summary.migrations);
    println!("completed_per_worker={:?}", summary.completed_per_worker);
    Ok(())
}

/// Timer-driven run: cycles happen every `timer_period`, events stream to stdout.
///
/// Stops after `cycles` cycles or when every queue drains. With `pause_after`,
/// the timer is stopped once at that cycle, the worker list printed, and the
/// run resumed from the same state.
pub fn run_live(
    settings: Settings,
    seed: u64,
    cycles: u64,
    pause_after: Option<u64>,
) -> Result<()> {
    let period = settings.timer_period();
    let mut engine = SchedulerEngine::seeded(settings, seed)?;
    engine.assign()?;
    print_workers(&engine.snapshot());

    let engine = Arc::new(Mutex::new(engine));
    let (tx, rx) = mpsc::channel();
    let mut driver = TimerDriver::start(Arc::clone(&engine), tx.clone())?;
    let mut paused_once = false;

    loop {
        match rx.recv_timeout(period) {
            Ok(event) => println!("completed {event}"),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        let (cycle, drained) = {
            let guard = engine.lock().expect("engine mutex poisoned");
            (guard.current_cycle(), guard.is_drained())
        };
        if cycle >= cycles || drained {
            break;
        }
        if let Some(pause_at) = pause_after.filter(|&at| !paused_once && cycle >= at) {
            driver.stop();
            paused_once = true;
            println!("PAUSED cycle={cycle} (requested {pause_at})");
            print_workers(&engine.lock().expect("engine mutex poisoned").snapshot());
            driver = TimerDriver::start(Arc::clone(&engine), tx.clone())?;
            println!("RESUMED");
        }
    }
    driver.stop();
    // Events emitted between the last receive and the stop.
    for event in rx.try_iter() {
        println!("completed {event}");
    }

    let guard = engine.lock().expect("engine mutex poisoned");
    print_workers(&guard.snapshot());
    println!("LIVE SUMMARY");
    println!("cycles={}", guard.current_cycle());
    println!("completed={}", guard.history().len());
    println!("remaining={}", guard.queued_tasks());
    Ok(())
}

/// Detail view of one worker after `after` cycles of a seeded run.
/// Without a name, lists every worker instead.
pub fn show_worker(settings: Settings, seed: u64, name: Option<&str>, after: u64) -> Result<()> {
    let mut engine = SchedulerEngine::seeded(settings, seed)?;
    engine.assign()?;
    for _ in 0..after {
        engine.cycle();
    }
    let Some(name) = name else {
        println!("cycle={}", engine.current_cycle());
        for row in engine.snapshot() {
            println!("  {row} (queued {})", row.queued);
        }
        return Ok(());
    };
    let detail = engine.find_worker_by_name(name)?;
    println!(
        "worker={} productivity={} cycle={} queued={}",
        detail.name,
        detail.productivity,
        engine.current_cycle(),
        detail.tasks.len()
    );
    for task in &detail.tasks {
        println!("  {}: {}", task.name, task.complexity);
    }
    Ok(())
}

/// Aggregated metrics from a batch of seeded runs.
struct BenchResult {
    workers: String,
    tasks: String,
    runs: usize,
    total_cycles: u64,
    completed: usize,
    elapsed_ms: f64,
    cycles_per_s: f64,
    cpu_user_s: Option<f64>,
    cpu_sys_s: Option<f64>,
    leftover: usize,
}

fn range_label(min: u32, max: u32) -> String {
    if min == max {
        min.to_string()
    } else {
        format!("{min}-{max}")
    }
}

fn benchmark_once(settings: Settings, seed: u64, runs: usize) -> Result<BenchResult> {
    let mut total_cycles = 0u64;
    let mut completed = 0usize;
    let mut leftover = 0usize;

    let cpu_start = cpu_times_seconds();
    let start = Instant::now();
    for run in 0..runs {
        let summary = simulate(settings, seed.wrapping_add(run as u64), DEFAULT_MAX_CYCLES)?;
        total_cycles += summary.cycles;
        completed += summary.completed;
        leftover += summary.remaining;
    }
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    let cycles_per_s = if elapsed_ms > 0.0 {
        total_cycles as f64 / (elapsed_ms / 1000.0)
    } else {
        0.0
    };
    let (cpu_user_s, cpu_sys_s) = match (cpu_start, cpu_times_seconds()) {
        (Some((user_start, sys_start)), Some((user_end, sys_end))) => {
            (Some(user_end - user_start), Some(sys_end - sys_start))
        }
        _ => (None, None),
    };

    Ok(BenchResult {
        workers: range_label(settings.workers().min(), settings.workers().max()),
        tasks: range_label(settings.tasks().min(), settings.tasks().max()),
        runs,
        total_cycles,
        completed,
        elapsed_ms,
        cycles_per_s,
        cpu_user_s,
        cpu_sys_s,
        leftover,
    })
}

fn print_result(result: &BenchResult) {
    let cpu_user = result
        .cpu_user_s
        .map(|v| format!("{v:.4}"))
        .unwrap_or_else(|| "NA".to_string());
    let cpu_sys = result
        .cpu_sys_s
        .map(|v| format!("{v:.4}"))
        .unwrap_or_else(|| "NA".to_string());
    println!(
        "{},{},{},{},{},{:.2},{:.2},{},{},{}",
        result.workers,
        result.tasks,
        result.runs,
        result.total_cycles,
        result.completed,
        result.elapsed_ms,
        result.cycles_per_s,
        cpu_user,
        cpu_sys,
        result.leftover
    );
    if result.leftover > 0 {
        eprintln!("# warning,leftover_tasks,{}", result.leftover);
    }
}

/// Drain `runs` seeded simulations with the given settings and print CSV.
pub fn run_benchmark(settings: Settings, seed: u64, runs: usize) -> Result<()> {
    if runs == 0 {
        return Err(SimError::InvalidSetting {
            field: "runs",
            reason: "must be > 0".to_string(),
        });
    }
    let result = benchmark_once(settings, seed, runs)?;
    println!("{CSV_HEADER}");
    print_result(&result);
    Ok(())
}

/// Sweep pinned worker/task counts over the base settings and print CSV.
pub fn run_stress(
    base: Settings,
    seed: u64,
    runs: usize,
    worker_sets: Option<Vec<u32>>,
    task_sets: Option<Vec<u32>>,
) -> Result<()> {
    let worker_sets = worker_sets.unwrap_or_else(|| DEFAULT_STRESS_WORKERS.to_vec());
    let task_sets = task_sets.unwrap_or_else(|| DEFAULT_STRESS_TASKS.to_vec());
    if runs == 0 {
        return Err(SimError::InvalidSetting {
            field: "runs",
            reason: "must be > 0".to_string(),
        });
    }
    if worker_sets.iter().any(|&workers| workers == 0) {
        return Err(SimError::InvalidSetting {
            field: "worker_sets",
            reason: "every worker count must be > 0".to_string(),
        });
    }

    println!("{CSV_HEADER}");
    for &workers in &worker_sets {
        for &tasks in &task_sets {
            let settings = Settings::new(SettingsConfig {
                min_workers: workers,
                max_workers: workers,
                min_tasks: tasks,
                max_tasks: tasks,
                ..base.to_config()
            })?;
            let result = benchmark_once(settings, seed, runs)?;
            print_result(&result);
        }
    }
    Ok(())
}
