//! Timing constants, user settings and their validation

use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::units::SpeedUnit;

/// Base tick rate of the timer interrupt
pub const DEFAULT_TICK_HZ: u16 = 10;

/// 30 ticks at 10 Hz: pulses are counted over 3 second windows
pub const DEFAULT_WINDOW_TICKS: u16 = 30;

/// In low power mode the vane is read every 5th tick (every 500 ms)
pub const DEFAULT_LOW_POWER_VANE_TICKS: u16 = 5;

/// Default averaging period of the period report
pub const DEFAULT_AVERAGING_PERIOD_SECS: u16 = 60;

/// Default time between two period reports
pub const DEFAULT_REPORTING_INTERVAL_SECS: u16 = 60;

/// Pulse frequency to speed ratio of the standard rotor, in (m/s) per Hz
pub const DEFAULT_CALIBRATION: f32 = 1.31;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Averaging period {requested}s out of range {min}..={max}s")]
    AveragingPeriodOutOfRange { requested: u16, min: u32, max: u32 },
    #[error("Reporting interval {requested}s shorter than {min}s")]
    ReportingIntervalTooShort { requested: u16, min: u32 },
    #[error("Invalid timing: {0}")]
    InvalidTiming(&'static str),
    #[error("Calibration must be a positive finite number")]
    InvalidCalibration,
}

/// Fixed timing of the sampling pipeline
///
/// These values follow the hardware (timer rate) and are set once when the
/// engine is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// Rate of the timer interrupt in Hz
    pub tick_hz: u16,
    /// Ticks per sampling window
    pub window_ticks: u16,
    /// In low power mode, read the vane every this many ticks
    pub low_power_vane_ticks: u16,
    /// Extra wall-clock time a window may take before it is discarded
    pub drift_tolerance_ms: u32,
}

impl TimingConfig {
    /// Check that every period is at least one millisecond long and that a
    /// low power window always contains a vane read
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_hz == 0 {
            return Err(ConfigError::InvalidTiming("tick_hz must be non-zero"));
        }
        if self.tick_hz > 1000 {
            return Err(ConfigError::InvalidTiming("tick_hz must be at most 1000"));
        }
        if self.window_ticks == 0 {
            return Err(ConfigError::InvalidTiming("window_ticks must be non-zero"));
        }
        if self.low_power_vane_ticks == 0 {
            return Err(ConfigError::InvalidTiming(
                "low_power_vane_ticks must be non-zero",
            ));
        }
        if self.low_power_vane_ticks > self.window_ticks {
            return Err(ConfigError::InvalidTiming(
                "low_power_vane_ticks must not exceed window_ticks",
            ));
        }
        Ok(())
    }

    /// Length of one base tick in milliseconds
    pub const fn tick_ms(&self) -> u32 {
        1000 / self.tick_hz as u32
    }

    /// Length of one sampling window in milliseconds
    pub const fn window_ms(&self) -> u32 {
        self.window_ticks as u32 * 1000 / self.tick_hz as u32
    }

    /// Length of one sampling window in seconds
    pub fn window_secs(&self) -> f32 {
        f32::from(self.window_ticks) / f32::from(self.tick_hz)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_hz: DEFAULT_TICK_HZ,
            window_ticks: DEFAULT_WINDOW_TICKS,
            low_power_vane_ticks: DEFAULT_LOW_POWER_VANE_TICKS,
            drift_tolerance_ms: 1000 / DEFAULT_TICK_HZ as u32,
        }
    }
}

/// User-adjustable settings
///
/// All fields are optional when deserializing; missing ones take their
/// defaults.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Length of history averaged into each period report
    pub averaging_period_secs: u16,
    /// Time between two period reports
    pub reporting_interval_secs: u16,
    pub unit: SpeedUnit,
    /// Add 180° to every vane reading (magnet mounted backwards)
    pub invert_polarity: bool,
    /// Read the vane less often to save power
    pub low_power: bool,
    /// Rotor constant in (m/s) per Hz
    pub calibration: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            averaging_period_secs: DEFAULT_AVERAGING_PERIOD_SECS,
            reporting_interval_secs: DEFAULT_REPORTING_INTERVAL_SECS,
            unit: SpeedUnit::MetersPerSecond,
            invert_polarity: false,
            low_power: false,
            calibration: DEFAULT_CALIBRATION,
        }
    }
}

/// Check an averaging period against the window length and history capacity
pub fn check_averaging_period(
    secs: u16,
    timing: &TimingConfig,
    capacity: usize,
) -> Result<(), ConfigError> {
    let window_ms = timing.window_ms();
    let min_ms = window_ms;
    let max_ms = window_ms.saturating_mul(capacity as u32);
    let requested_ms = u32::from(secs) * 1000;

    if secs == 0 || requested_ms < min_ms || requested_ms > max_ms {
        return Err(ConfigError::AveragingPeriodOutOfRange {
            requested: secs,
            min: min_ms.div_ceil(1000),
            max: max_ms / 1000,
        });
    }
    Ok(())
}

/// Check a reporting interval against the window length
pub fn check_reporting_interval(secs: u16, timing: &TimingConfig) -> Result<(), ConfigError> {
    let window_ms = timing.window_ms();
    if secs == 0 || u32::from(secs) * 1000 < window_ms {
        return Err(ConfigError::ReportingIntervalTooShort {
            requested: secs,
            min: window_ms.div_ceil(1000),
        });
    }
    Ok(())
}

/// Check a rotor calibration constant
pub fn check_calibration(calibration: f32) -> Result<(), ConfigError> {
    if !calibration.is_finite() || calibration <= 0.0 {
        return Err(ConfigError::InvalidCalibration);
    }
    Ok(())
}

/// Check every range-limited field of a settings block
pub fn check_settings(
    settings: &Settings,
    timing: &TimingConfig,
    capacity: usize,
) -> Result<(), ConfigError> {
    check_averaging_period(settings.averaging_period_secs, timing, capacity)?;
    check_reporting_interval(settings.reporting_interval_secs, timing)?;
    check_calibration(settings.calibration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timing() {
        let timing = TimingConfig::default();
        assert!(timing.validate().is_ok());
        assert_eq!(timing.tick_ms(), 100);
        assert_eq!(timing.window_ms(), 3000);
        assert_eq!(timing.window_secs(), 3.0);
        assert_eq!(timing.drift_tolerance_ms, 100);
    }

    #[test]
    fn test_zero_periods_rejected() {
        let mut timing = TimingConfig::default();
        timing.window_ticks = 0;
        assert!(matches!(
            timing.validate(),
            Err(ConfigError::InvalidTiming(_))
        ));

        let mut timing = TimingConfig::default();
        timing.tick_hz = 0;
        assert!(timing.validate().is_err());

        let mut timing = TimingConfig::default();
        timing.low_power_vane_ticks = 0;
        assert!(timing.validate().is_err());
    }

    #[test]
    fn test_sub_millisecond_ticks_rejected() {
        let timing = TimingConfig {
            tick_hz: 2000,
            window_ticks: 1,
            low_power_vane_ticks: 1,
            drift_tolerance_ms: 0,
        };
        assert_eq!(timing.window_ms(), 0);
        assert!(matches!(
            timing.validate(),
            Err(ConfigError::InvalidTiming(_))
        ));

        let timing = TimingConfig {
            tick_hz: 1000,
            ..timing
        };
        assert!(timing.validate().is_ok());
        assert_eq!(timing.tick_ms(), 1);
    }

    #[test]
    fn test_zero_periods_rejected_for_any_timing() {
        // Even unvalidated timing with a zero-length window must not accept 0
        let timing = TimingConfig {
            tick_hz: 2000,
            window_ticks: 1,
            low_power_vane_ticks: 1,
            drift_tolerance_ms: 0,
        };
        assert!(check_averaging_period(0, &timing, 200).is_err());
        assert!(check_reporting_interval(0, &timing).is_err());
    }

    #[test]
    fn test_low_power_stride_longer_than_window_rejected() {
        let timing = TimingConfig {
            window_ticks: 4,
            low_power_vane_ticks: 5,
            ..TimingConfig::default()
        };
        assert!(timing.validate().is_err());

        let timing = TimingConfig {
            window_ticks: 5,
            ..timing
        };
        assert!(timing.validate().is_ok());
    }

    #[test]
    fn test_calibration_must_be_positive_and_finite() {
        assert!(check_calibration(1.31).is_ok());
        assert_eq!(check_calibration(0.0), Err(ConfigError::InvalidCalibration));
        assert_eq!(check_calibration(-1.0), Err(ConfigError::InvalidCalibration));
        assert_eq!(check_calibration(f32::NAN), Err(ConfigError::InvalidCalibration));
        assert_eq!(
            check_calibration(f32::INFINITY),
            Err(ConfigError::InvalidCalibration)
        );
    }

    #[test]
    fn test_averaging_period_bounds() {
        let timing = TimingConfig::default();

        assert!(check_averaging_period(3, &timing, 200).is_ok());
        assert!(check_averaging_period(600, &timing, 200).is_ok());
        assert_eq!(
            check_averaging_period(2, &timing, 200),
            Err(ConfigError::AveragingPeriodOutOfRange {
                requested: 2,
                min: 3,
                max: 600
            })
        );
        assert!(check_averaging_period(601, &timing, 200).is_err());
        assert!(check_averaging_period(0, &timing, 200).is_err());
    }

    #[test]
    fn test_reporting_interval_bounds() {
        let timing = TimingConfig::default();

        assert!(check_reporting_interval(3, &timing).is_ok());
        assert!(check_reporting_interval(u16::MAX, &timing).is_ok());
        assert_eq!(
            check_reporting_interval(2, &timing),
            Err(ConfigError::ReportingIntervalTooShort {
                requested: 2,
                min: 3
            })
        );
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.averaging_period_secs, 60);
        assert_eq!(settings.reporting_interval_secs, 60);
        assert_eq!(settings.unit, SpeedUnit::MetersPerSecond);
        assert!(!settings.invert_polarity);
        assert!(!settings.low_power);
        assert_eq!(settings.calibration, 1.31);
    }
}
