//! Periodic driver that steps a shared engine on a background thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::engine::{CompletionEvent, SchedulerEngine};
use crate::error::Result;

/// Engine shared between the timer thread and whoever inspects it.
pub type SharedEngine = Arc<Mutex<SchedulerEngine>>;

// Upper bound on how long a stop request waits for the timer to notice.
const STOP_POLL: Duration = Duration::from_millis(10);

/// Calls [`SchedulerEngine::cycle`] once per timer period until stopped.
///
/// All mutation goes through the engine mutex, so a cycle is applied whole
/// or not at all from the point of view of other lock holders.
pub struct TimerDriver {
    engine: SharedEngine,
    stop_flag: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl TimerDriver {
    /// Start (or resume) the engine and begin ticking at its timer period.
    /// Completion events are forwarded to `sink`; a dropped receiver stops the timer.
    pub fn start(engine: SharedEngine, sink: Sender<CompletionEvent>) -> Result<Self> {
        let period = {
            let mut guard = engine.lock().expect("engine mutex poisoned");
            guard.run()?;
            guard.settings().timer_period()
        };
        let stop_flag = Arc::new(AtomicBool::new(false));

        let handle = {
            let engine = Arc::clone(&engine);
            let stop_flag = Arc::clone(&stop_flag);
            thread::Builder::new()
                .name("cycle-timer".to_string())
                .spawn(move || tick_loop(engine, stop_flag, period, sink))?
        };
        info!("[TIMER] started period={}ms", period.as_millis());

        Ok(Self {
            engine,
            stop_flag,
            handle: Some(handle),
        })
    }

    /// Whether the timer thread is still alive.
    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn engine(&self) -> &SharedEngine {
        &self.engine
    }

    /// Stop the engine and wait for the timer thread to finish its current cycle.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("[TIMER] timer thread panicked");
            }
        }
        self.engine.lock().expect("engine mutex poisoned").stop();
        info!("[TIMER] stopped");
    }
}

impl Drop for TimerDriver {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.shutdown();
        }
    }
}

/// Sleep until `deadline`, waking early if a stop was requested.
fn wait_for_tick(stop_flag: &AtomicBool, deadline: Instant) -> bool {
    loop {
        if stop_flag.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep((deadline - now).min(STOP_POLL));
    }
}

fn tick_loop(
    engine: SharedEngine,
    stop_flag: Arc<AtomicBool>,
    period: Duration,
    sink: Sender<CompletionEvent>,
) {
    let mut deadline = Instant::now() + period;
    while wait_for_tick(&stop_flag, deadline) {
        let report = {
            let mut guard = engine.lock().expect("engine mutex poisoned");
            if !guard.is_running() {
                debug!("[TIMER] engine no longer running");
                return;
            }
            guard.cycle()
        };
        // Next tick is one period after this cycle ends; missed ticks are dropped.
        deadline = Instant::now() + period;
        for event in report.completions {
            if sink.send(event).is_err() {
                debug!("[TIMER] event receiver dropped");
                return;
            }
        }
    }
}
