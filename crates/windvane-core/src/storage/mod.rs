//! Sample history and vector averaging

pub mod rolling_buffer;
pub mod vector_averager;

pub use rolling_buffer::*;
pub use vector_averager::*;

use core::fmt::Display;

use serde::{Deserialize, Serialize};

/// Number of sampling windows kept in the history.
///
/// 200 windows of 3 seconds cover 10 minutes, the longest supported
/// averaging period.
pub const SAMPLE_CAPACITY: usize = 200;

/// One sampling window worth of raw wind data
///
/// `pulses` is the number of rotor pulses counted during the window and
/// `direction` the vector-averaged vane angle over the same window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSample {
    /// Rotor pulses counted during the window
    pub pulses: u32,
    /// Averaged vane direction in degrees, `0..360`
    pub direction: u16,
    /// `false` marks the "no data" sentinel
    pub valid: bool,
}

impl RawSample {
    /// Sentinel returned by history lookups that have no data
    pub const INVALID: Self = Self {
        pulses: 0,
        direction: 0,
        valid: false,
    };

    /// Create a valid sample
    pub const fn new(pulses: u32, direction: u16) -> Self {
        Self {
            pulses,
            direction,
            valid: true,
        }
    }
}

impl Default for RawSample {
    fn default() -> Self {
        Self::INVALID
    }
}

impl Display for RawSample {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.valid {
            write!(
                f,
                "[RawSample] pulses: {}, direction: {}°",
                self.pulses, self.direction
            )
        } else {
            write!(f, "[RawSample] invalid")
        }
    }
}
