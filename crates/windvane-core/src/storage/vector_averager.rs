use super::RawSample;

/// Result of reducing a [`VectorAverager`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorAverage {
    /// Length of the mean vector, in the unit of the accumulated magnitudes
    pub magnitude: f32,
    /// Direction of the mean vector in whole degrees, `0..360`
    pub direction: u16,
    /// Smallest accumulated magnitude
    pub min: u32,
    /// Largest accumulated magnitude
    pub max: u32,
    /// Number of observations reduced
    pub count: u32,
}

/// Circular mean accumulator
///
/// Each observation is a polar vector (magnitude, angle). The averager keeps
/// the Cartesian sum of all observations so that the mean direction of, say,
/// 350° and 10° comes out as 0° rather than 180°.
///
/// Two independent instances are used by the engine: one per sampling window
/// (vane reads, weight 1) and a fresh one per period report (stored samples,
/// weighted by their pulse count). [`VectorAverager::reduce`] resets the state,
/// so an instance can't be shared between the two scales.
#[derive(Debug, Clone)]
pub struct VectorAverager {
    x: f32,
    y: f32,
    count: u32,
    min: u32,
    max: u32,
}

impl VectorAverager {
    pub const fn new() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            count: 0,
            min: u32::MAX,
            max: 0,
        }
    }

    /// Add one observation
    ///
    /// `angle_deg` must already be normalized to `0..360`.
    pub fn accumulate(&mut self, magnitude: u32, angle_deg: u16) {
        let rad = f32::from(angle_deg) * (core::f32::consts::PI / 180.0);
        let m = magnitude as f32;

        self.x += m * libm::cosf(rad);
        self.y += m * libm::sinf(rad);

        self.count += 1;
        self.min = self.min.min(magnitude);
        self.max = self.max.max(magnitude);
    }

    /// Add a stored sample, weighted by its pulse count
    pub fn accumulate_sample(&mut self, sample: &RawSample) {
        self.accumulate(sample.pulses, sample.direction);
    }

    /// Number of observations since the last reduction
    pub const fn count(&self) -> u32 {
        self.count
    }

    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Drop every observation without reducing
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Reduce the accumulated observations to their mean vector
    ///
    /// Returns `None` when nothing was accumulated. The accumulator is reset
    /// in both cases.
    pub fn reduce(&mut self) -> Option<VectorAverage> {
        if self.count == 0 {
            return None;
        }

        let n = self.count as f32;
        let avg_x = self.x / n;
        let avg_y = self.y / n;

        let mut dir = libm::atan2f(avg_y, avg_x) * (180.0 / core::f32::consts::PI);
        if dir < 0.0 {
            dir += 360.0;
        }

        // Round half-up; 359.5 and above wraps to north.
        let direction = ((dir + 0.5) as u16) % 360;

        let result = VectorAverage {
            magnitude: libm::sqrtf(avg_x * avg_x + avg_y * avg_y),
            direction,
            min: self.min,
            max: self.max,
            count: self.count,
        };

        self.clear();
        Some(result)
    }
}

impl Default for VectorAverager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32, tol: f32) -> bool {
        libm::fabsf(a - b) <= tol
    }

    #[test]
    fn test_reduce_empty_is_none() {
        let mut averager = VectorAverager::new();
        assert_eq!(averager.reduce(), None);
    }

    #[test]
    fn test_single_observation() {
        let mut averager = VectorAverager::new();
        averager.accumulate(12, 45);

        let avg = averager.reduce().unwrap();
        assert_eq!(avg.direction, 45);
        assert!(approx_eq(avg.magnitude, 12.0, 1e-4), "got {}", avg.magnitude);
        assert_eq!(avg.min, 12);
        assert_eq!(avg.max, 12);
        assert_eq!(avg.count, 1);
    }

    #[test]
    fn test_cardinal_points_cancel() {
        let mut averager = VectorAverager::new();
        for angle in [0, 90, 180, 270] {
            averager.accumulate(5, angle);
        }

        let avg = averager.reduce().unwrap();
        assert!(
            approx_eq(avg.magnitude, 0.0, 1e-5),
            "opposite vectors must cancel, got {}",
            avg.magnitude
        );
        assert_eq!(avg.count, 4);
    }

    #[test]
    fn test_mean_wraps_across_north() {
        let mut averager = VectorAverager::new();
        averager.accumulate(1, 350);
        averager.accumulate(1, 10);

        let avg = averager.reduce().unwrap();
        assert_eq!(avg.direction, 0, "350° and 10° average to north, not south");
    }

    #[test]
    fn test_mean_of_west_and_north() {
        let mut averager = VectorAverager::new();
        averager.accumulate(1, 270);
        averager.accumulate(1, 0);

        assert_eq!(averager.reduce().unwrap().direction, 315);
    }

    #[test]
    fn test_direction_weighted_by_magnitude() {
        let mut averager = VectorAverager::new();
        averager.accumulate(3, 0);
        averager.accumulate(1, 90);

        // atan2(1/2, 3/2) = 18.43°
        let avg = averager.reduce().unwrap();
        assert_eq!(avg.direction, 18);
        assert_eq!(avg.min, 1);
        assert_eq!(avg.max, 3);
    }

    #[test]
    fn test_direction_rounds_half_up() {
        let mut averager = VectorAverager::new();
        averager.accumulate(1, 10);
        averager.accumulate(1, 11);
        assert_eq!(averager.reduce().unwrap().direction, 11);

        // 10.67° rounds to 11, not truncated to 10
        averager.accumulate(1, 10);
        averager.accumulate(2, 11);
        assert_eq!(averager.reduce().unwrap().direction, 11);
    }

    #[test]
    fn test_direction_rounding_to_360_wraps_to_north() {
        let mut averager = VectorAverager::new();
        averager.accumulate(1, 359);
        averager.accumulate(1, 0);
        assert_eq!(averager.reduce().unwrap().direction, 0);

        // 359.67° must report 0, never 360
        averager.accumulate(1, 359);
        averager.accumulate(2, 0);
        assert_eq!(averager.reduce().unwrap().direction, 0);
    }

    #[test]
    fn test_reduce_resets_state() {
        let mut averager = VectorAverager::new();
        averager.accumulate(100, 90);
        averager.accumulate(2, 90);
        assert!(averager.reduce().is_some());

        assert!(averager.is_empty());
        assert_eq!(averager.reduce(), None);

        averager.accumulate(7, 180);
        let avg = averager.reduce().unwrap();
        assert_eq!(avg.direction, 180);
        assert_eq!(avg.min, 7, "min must not carry over from the previous reduction");
        assert_eq!(avg.max, 7, "max must not carry over from the previous reduction");
    }

    #[test]
    fn test_accumulate_sample_uses_pulses_as_weight() {
        let mut averager = VectorAverager::new();
        averager.accumulate_sample(&RawSample::new(10, 90));
        averager.accumulate_sample(&RawSample::new(20, 90));

        let avg = averager.reduce().unwrap();
        assert_eq!(avg.direction, 90);
        assert!(approx_eq(avg.magnitude, 15.0, 1e-3), "got {}", avg.magnitude);
        assert_eq!(avg.min, 10);
        assert_eq!(avg.max, 20);
    }

    #[test]
    fn test_clear_drops_observations() {
        let mut averager = VectorAverager::new();
        averager.accumulate(1, 10);
        averager.clear();

        assert_eq!(averager.count(), 0);
        assert_eq!(averager.reduce(), None);
    }
}
