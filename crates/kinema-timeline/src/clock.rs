use kinema_core::{Duration, EngineError, EngineResult, PlaybackConfig, Timestamp};

/// The deterministic playback clock.
///
/// Advances simulated time by a fixed step per tick and nothing else; it
/// has no notion of wall-clock time. The current timestamp is always
/// computed as `step * ticks` from the tick counter, so a given tick
/// sequence produces bit-identical timestamps on every run.
#[derive(Debug, Clone)]
pub struct Clock {
    step: Duration,
    ticks: u64,
}

impl Clock {
    /// Create a clock with the given fixed step.
    pub fn new(step: Duration) -> EngineResult<Self> {
        if step.is_zero() {
            return Err(EngineError::config("clock step must be positive"));
        }
        Ok(Self { step, ticks: 0 })
    }

    /// Create a clock from playback settings; the step is one frame of
    /// simulated time scaled by the playback speed.
    pub fn from_config(config: &PlaybackConfig) -> EngineResult<Self> {
        config.validate()?;
        Self::new(config.frame_interval())
    }

    /// Advance one fixed step and return the new simulated time.
    pub fn tick(&mut self) -> Timestamp {
        self.ticks += 1;
        self.now()
    }

    /// The current simulated time.
    pub fn now(&self) -> Timestamp {
        Timestamp::from_seconds(self.step.as_seconds() * self.ticks as f64)
    }

    /// The fixed step one tick advances.
    pub fn step(&self) -> Duration {
        self.step
    }

    /// Number of ticks consumed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Rewind to the start of simulated time.
    pub fn reset(&mut self) {
        self.ticks = 0;
    }
}
