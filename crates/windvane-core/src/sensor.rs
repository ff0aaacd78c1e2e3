//! Collaborators the engine reads from: the vane angle sensor and a clock

use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor}: read failed ({details})")]
    ReadFailed {
        sensor: &'static str,
        details: &'static str,
    },
    #[error("{sensor}: not ready")]
    NotReady { sensor: &'static str },
}

/// Source of instantaneous vane angles
///
/// Implementations may wake the sensor, measure and put it back to sleep on
/// every call; the engine only needs the call to return within a bounded time.
pub trait AngleSensor {
    /// Read the current vane angle in whole degrees, `0..360`
    fn read_angle(&mut self) -> Result<u16, SensorError>;
}

impl<T: AngleSensor + ?Sized> AngleSensor for &mut T {
    fn read_angle(&mut self) -> Result<u16, SensorError> {
        (**self).read_angle()
    }
}

/// Monotonic millisecond clock used for drift detection
///
/// The value is allowed to wrap around `u32::MAX`; the engine only ever looks
/// at wrapping differences.
pub trait MonotonicClock {
    fn now_millis(&self) -> u32;
}

impl<T: MonotonicClock + ?Sized> MonotonicClock for &T {
    fn now_millis(&self) -> u32 {
        (**self).now_millis()
    }
}

/// Decode the two angle-result bytes of the magnetic angle sensor
///
/// The result register holds a 13-bit angle with 4 fractional bits. The
/// fractional part is dropped, leaving whole degrees. Readings of 360 and
/// above (possible at the top of the 9-bit integer range) wrap to `0..360`.
pub fn angle_from_result_registers(msb: u8, lsb: u8) -> u16 {
    let raw = u16::from_be_bytes([msb, lsb]);
    ((raw & 0x1FFF) >> 4) % 360
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_angle_from_result_registers() {
        // 90.0° = 90 << 4
        assert_eq!(angle_from_result_registers(0x05, 0xA0), 90);
        // 359.9375° keeps the integer part
        assert_eq!(angle_from_result_registers(0x16, 0x7F), 359);
        // Upper status bits are ignored
        assert_eq!(angle_from_result_registers(0xE0, 0x10), 1);
        assert_eq!(angle_from_result_registers(0x00, 0x00), 0);
    }
}
