//! Round-robin task scheduling simulator.
//!
//! A randomly generated pool of workers receives a randomly generated pool of
//! tasks round-robin. Every cycle each worker chips away at the task at the
//! head of its queue, finished tasks are reported, and from time to time the
//! head tasks rotate one step around the worker ring.

pub mod driver;
pub mod engine;
pub mod error;
pub mod factory;
pub mod logging;
pub mod migration;
pub mod random;
pub mod settings;
pub mod sim;
pub mod types;

pub use driver::{SharedEngine, TimerDriver};
pub use engine::{
    CompletionEvent, CycleReport, SchedulerEngine, TaskSnapshot, WorkerDetail, WorkerSnapshot,
};
pub use error::{Result, SimError};
pub use factory::{TaskFactory, WorkerFactory};
pub use migration::{Always, CoinFlip, MigrationPolicy, Never, rotate_heads};
pub use random::RandomGenerator;
pub use settings::{Bounds, Settings, SettingsConfig};
pub use types::{Task, TaskId, Worker, WorkerId};
