// Audio clock - Sample-accurate time base shared with the scheduling thread

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonically non-decreasing time source, in seconds.
///
/// The scheduling pass never reads a wall clock: it is handed a reading from
/// this trait so the driver thread can use the real stream clock while tests
/// inject a [`ManualClock`].
pub trait AudioClock: Send + Sync {
    /// Current time in seconds since the stream started.
    fn now(&self) -> f64;
}

/// Clock backed by the output stream's sample position.
///
/// The audio callback advances the counter by the number of frames it
/// rendered; any thread can read it back as seconds. This is the same clock
/// domain the trigger times are expressed in, so a trigger scheduled at
/// `now() + 0.12` lands on an exact sample.
#[derive(Clone)]
pub struct StreamClock {
    sample_position: Arc<AtomicU64>,
    sample_rate: f64,
}

impl StreamClock {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            sample_position: Arc::new(AtomicU64::new(0)),
            sample_rate: sample_rate as f64,
        }
    }

    /// Current sample position (read from any thread)
    pub fn current_sample(&self) -> u64 {
        self.sample_position.load(Ordering::Relaxed)
    }

    /// Advance the position (called from the audio callback only)
    pub fn advance(&self, frames: usize) {
        self.sample_position
            .fetch_add(frames as u64, Ordering::Relaxed);
    }

    /// Convert an absolute time in seconds to an absolute sample index.
    pub fn seconds_to_samples(&self, seconds: f64) -> u64 {
        if seconds <= 0.0 {
            return 0;
        }
        (seconds * self.sample_rate) as u64
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}

impl AudioClock for StreamClock {
    fn now(&self) -> f64 {
        self.current_sample() as f64 / self.sample_rate
    }
}

/// Hand-driven clock for tests: no timers, no audio device.
#[derive(Clone, Default)]
pub struct ManualClock {
    micros: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, seconds: f64) {
        self.micros
            .store((seconds * 1_000_000.0) as u64, Ordering::Relaxed);
    }

    pub fn advance(&self, seconds: f64) {
        self.micros
            .fetch_add((seconds * 1_000_000.0) as u64, Ordering::Relaxed);
    }
}

impl AudioClock for ManualClock {
    fn now(&self) -> f64 {
        self.micros.load(Ordering::Relaxed) as f64 / 1_000_000.0
    }
}
