//! Wind speed units and pulse-to-speed conversion

use serde::{Deserialize, Serialize};

/// Knots per metre/second
pub const MS_TO_KNOTS: f32 = 1.94384;
/// Kilometres per hour per metre/second
pub const MS_TO_KPH: f32 = 3.6;
/// Miles per hour per metre/second
pub const MS_TO_MPH: f32 = 2.23694;

/// Unit used for every speed handed to the report sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpeedUnit {
    #[default]
    MetersPerSecond,
    Knots,
    KilometersPerHour,
    MilesPerHour,
}

impl SpeedUnit {
    /// Convert a speed in m/s into this unit
    pub fn from_meters_per_second(self, speed_ms: f32) -> f32 {
        match self {
            Self::MetersPerSecond => speed_ms,
            Self::Knots => speed_ms * MS_TO_KNOTS,
            Self::KilometersPerHour => speed_ms * MS_TO_KPH,
            Self::MilesPerHour => speed_ms * MS_TO_MPH,
        }
    }

    /// Short label for display
    pub const fn label(self) -> &'static str {
        match self {
            Self::MetersPerSecond => "m/s",
            Self::Knots => "kn",
            Self::KilometersPerHour => "km/h",
            Self::MilesPerHour => "mph",
        }
    }
}

/// Raw unit codes as used by the device settings: 0 = m/s, 1 = knots,
/// 2 = km/h, 3 = mph. Unknown codes fall back to m/s.
impl From<u8> for SpeedUnit {
    fn from(raw: u8) -> Self {
        match raw {
            1 => Self::Knots,
            2 => Self::KilometersPerHour,
            3 => Self::MilesPerHour,
            _ => Self::MetersPerSecond,
        }
    }
}

/// Convert a pulse count over one sampling window into a speed
///
/// `calibration` is the rotor constant in (m/s) per Hz, `window_secs` the
/// length of the window the pulses were counted over. `pulses` is a float so
/// that averaged pulse counts convert the same way as raw ones.
pub fn pulses_to_speed(pulses: f32, calibration: f32, window_secs: f32, unit: SpeedUnit) -> f32 {
    let speed_ms = pulses * calibration / window_secs;
    unit.from_meters_per_second(speed_ms)
}
