use std::sync::atomic::{AtomicU64, Ordering};

use paperless_core::{ConversionMode, JobId};

use crate::config::{system_clock, thread_rng_entropy, Clock, Entropy};

/// Produces `{category}-{unix_millis:x}-{sequence:x}-{random:032x}` ids.
///
/// The sequence makes ids from one generator distinct even when the clock
/// and entropy are fixed, as they are in tests.
pub struct JobIdGenerator {
    clock: Clock,
    entropy: Entropy,
    sequence: AtomicU64,
}

impl JobIdGenerator {
    pub fn new(clock: Clock, entropy: Entropy) -> Self {
        Self {
            clock,
            entropy,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn next_id(&self, mode: ConversionMode) -> JobId {
        let millis = (self.clock)().timestamp_millis().max(0);
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let random = (self.entropy)();
        JobId::new(format!(
            "{}-{millis:x}-{sequence:x}-{random:032x}",
            mode.category()
        ))
    }
}

impl Default for JobIdGenerator {
    fn default() -> Self {
        Self::new(system_clock(), thread_rng_entropy())
    }
}
