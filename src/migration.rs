//! Ring migration of head tasks and the per-cycle decision to run it.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::types::Worker;

/// Chance that a cycle ends with a migration pass.
pub const DEFAULT_MIGRATION_PROBABILITY: f64 = 0.5;

/// Decides, once per cycle, whether a migration pass runs.
pub trait MigrationPolicy {
    fn should_migrate(&mut self, cycle: u64) -> bool;
}

/// Scripted policies for tests and replays.
impl<F> MigrationPolicy for F
where
    F: FnMut(u64) -> bool,
{
    fn should_migrate(&mut self, cycle: u64) -> bool {
        self(cycle)
    }
}

/// Migrate after every cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct Always;

impl MigrationPolicy for Always {
    fn should_migrate(&mut self, _cycle: u64) -> bool {
        true
    }
}

/// Never migrate.
#[derive(Debug, Clone, Copy, Default)]
pub struct Never;

impl MigrationPolicy for Never {
    fn should_migrate(&mut self, _cycle: u64) -> bool {
        false
    }
}

/// Bernoulli trial per cycle, with its own RNG stream so the generator
/// sequence is unaffected by how many cycles run.
#[derive(Debug, Clone)]
pub struct CoinFlip<R = ChaCha8Rng> {
    rng: R,
    probability: f64,
}

impl CoinFlip<ChaCha8Rng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(ChaCha8Rng::seed_from_u64(seed), DEFAULT_MIGRATION_PROBABILITY)
    }
}

impl<R: Rng> CoinFlip<R> {
    /// `probability` is clamped to `[0, 1]`.
    pub fn new(rng: R, probability: f64) -> Self {
        Self {
            rng,
            probability: probability.clamp(0.0, 1.0),
        }
    }
}

impl<R: Rng> MigrationPolicy for CoinFlip<R> {
    fn should_migrate(&mut self, _cycle: u64) -> bool {
        self.rng.random_bool(self.probability)
    }
}

/// One migration pass around the ring `0 -> 1 -> ... -> N-1 -> 0`.
///
/// Pairs are visited in order and each worker hands its *current* head to the
/// tail of its successor, so a worker that was idle forwards the task it just
/// received. The last worker hands over the head it had before the pass began,
/// if any. Returns the number of moves; fewer than two workers is a no-op.
pub fn rotate_heads(workers: &mut [Worker]) -> usize {
    let count = workers.len();
    if count < 2 {
        return 0;
    }
    let last_had_head = !workers[count - 1].is_idle();

    let mut moved = 0;
    for i in 0..count - 1 {
        if let Some(task) = workers[i].take_head() {
            workers[i + 1].add_task(task);
            moved += 1;
        }
    }

    // Appends land at the tail, so a pre-pass head is still at the front.
    if last_had_head {
        if let Some(task) = workers[count - 1].take_head() {
            workers[0].add_task(task);
            moved += 1;
        }
    }
    moved
}
