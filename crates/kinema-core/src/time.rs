use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Sub};

/// A span of simulated time, stored as fractional seconds.
///
/// Negative inputs are tolerated and collapse to zero. Animation code
/// frequently computes durations from differences, and the engine treats
/// a non-positive duration as "instantaneous" rather than an error.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Duration {
    seconds: f64,
}

impl Duration {
    /// Create a duration from seconds. Negative values clamp to zero.
    pub fn from_seconds(seconds: f64) -> Self {
        Self {
            seconds: seconds.max(0.0),
        }
    }

    /// Create a duration from milliseconds.
    pub fn from_millis(millis: f64) -> Self {
        Self::from_seconds(millis / 1000.0)
    }

    /// The zero duration.
    pub fn zero() -> Self {
        Self { seconds: 0.0 }
    }

    /// Duration in seconds.
    pub fn as_seconds(&self) -> f64 {
        self.seconds
    }

    /// Duration in milliseconds.
    pub fn as_millis(&self) -> f64 {
        self.seconds * 1000.0
    }

    /// Whether this duration is instantaneous.
    pub fn is_zero(&self) -> bool {
        self.seconds == 0.0
    }

    /// Number of fixed-step ticks needed to cover this duration.
    pub fn tick_count(&self, fps: f64) -> u64 {
        (self.seconds * fps).ceil() as u64
    }
}

impl Default for Duration {
    fn default() -> Self {
        Duration::zero()
    }
}

impl Add for Duration {
    type Output = Duration;
    fn add(self, rhs: Duration) -> Duration {
        Duration::from_seconds(self.seconds + rhs.seconds)
    }
}

impl Sub for Duration {
    type Output = Duration;
    fn sub(self, rhs: Duration) -> Duration {
        Duration::from_seconds(self.seconds - rhs.seconds)
    }
}

impl Mul<f64> for Duration {
    type Output = Duration;
    fn mul(self, rhs: f64) -> Duration {
        Duration::from_seconds(self.seconds * rhs)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.seconds < 1.0 {
            write!(f, "{:.0}ms", self.seconds * 1000.0)
        } else {
            write!(f, "{:.2}s", self.seconds)
        }
    }
}

/// A point in simulated time, measured from the start of playback.
///
/// Timestamps are produced by the playback clock and never reference
/// wall-clock time, so a given tick sequence always produces identical
/// timestamps.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Timestamp {
    seconds: f64,
}

impl Timestamp {
    /// Create a timestamp at the given number of seconds from playback start.
    pub fn from_seconds(seconds: f64) -> Self {
        Self {
            seconds: seconds.max(0.0),
        }
    }

    /// The timestamp at playback start.
    pub fn zero() -> Self {
        Self { seconds: 0.0 }
    }

    /// Seconds from playback start.
    pub fn as_seconds(&self) -> f64 {
        self.seconds
    }

    /// Convert to a frame index at the given frame rate.
    pub fn to_frame(&self, fps: f64) -> u64 {
        (self.seconds * fps).floor() as u64
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::zero()
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;
    fn add(self, rhs: Duration) -> Timestamp {
        Timestamp::from_seconds(self.seconds + rhs.as_seconds())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.seconds)
    }
}
