//! Tick-driven wind sampling engine
//!
//! The engine runs three nested timing wheels off the base tick counter:
//!
//! 1. every tick (or every `low_power_vane_ticks` ticks in low power mode) the
//!    vane angle is read and accumulated into the window averager;
//! 2. every `window_ticks` ticks the window is closed: the averaged direction
//!    and the pulse count become one [`RawSample`] in the history, and an
//!    [`InstantReport`] goes to the sink;
//! 3. every reporting interval the last averaging period of history is
//!    reduced into a [`WindReport`] for the sink.
//!
//! A window that took noticeably longer than expected in wall-clock time
//! (main loop starved by a blocking call) counted pulses over the wrong
//! duration and is dropped.

use log::{debug, info, trace, warn};

use crate::config::{
    ConfigError, Settings, TimingConfig, check_averaging_period, check_reporting_interval,
    check_settings,
};
use crate::interrupts::WindInterrupts;
use crate::report::{InstantReport, ReportSink, WindReport};
use crate::sensor::{AngleSensor, MonotonicClock};
use crate::storage::{RawSample, SAMPLE_CAPACITY, SampleStore, VectorAverage, VectorAverager};
use crate::units::{SpeedUnit, pulses_to_speed};

/// Vane readings strictly inside this many degrees of north count as aligned
const NORTH_SECTOR_HALF_WIDTH_DEG: u16 = 5;

/// Wind sampling and aggregation engine
///
/// `N` is the history capacity in sampling windows; it bounds the longest
/// accepted averaging period (`N × window`).
pub struct WindEngine<'a, A, C, S, const N: usize = SAMPLE_CAPACITY>
where
    A: AngleSensor,
    C: MonotonicClock,
    S: ReportSink,
{
    interrupts: &'a WindInterrupts,
    sensor: A,
    clock: C,
    sink: S,
    timing: TimingConfig,
    settings: Settings,
    /// Base ticks since start, only ever used modulo the wheel periods
    ticks: u32,
    /// Clock value at the last window boundary
    last_window_ms: u32,
    /// Vane reads of the current window
    vane_averager: VectorAverager,
    samples: SampleStore<N>,
    dropped_windows: u32,
}

impl<'a, A, C, S, const N: usize> WindEngine<'a, A, C, S, N>
where
    A: AngleSensor,
    C: MonotonicClock,
    S: ReportSink,
{
    /// Create an engine with the default timing and settings
    pub fn new(interrupts: &'a WindInterrupts, sensor: A, clock: C, sink: S) -> Self {
        Self::build(
            interrupts,
            sensor,
            clock,
            sink,
            TimingConfig::default(),
            Settings::default(),
        )
    }

    /// Create an engine with explicit timing and settings
    ///
    /// Fails if the timing has a zero period or the settings are out of range
    /// for that timing and the history capacity.
    pub fn with_config(
        interrupts: &'a WindInterrupts,
        sensor: A,
        clock: C,
        sink: S,
        timing: TimingConfig,
        settings: Settings,
    ) -> Result<Self, ConfigError> {
        timing.validate()?;
        check_settings(&settings, &timing, N)?;

        Ok(Self::build(interrupts, sensor, clock, sink, timing, settings))
    }

    fn build(
        interrupts: &'a WindInterrupts,
        sensor: A,
        clock: C,
        sink: S,
        timing: TimingConfig,
        settings: Settings,
    ) -> Self {
        let last_window_ms = clock.now_millis();
        // Pulses counted before the engine existed don't belong to any window.
        interrupts.take_pulses();

        Self {
            interrupts,
            sensor,
            clock,
            sink,
            timing,
            settings,
            ticks: 0,
            last_window_ms,
            vane_averager: VectorAverager::new(),
            samples: SampleStore::new(),
            dropped_windows: 0,
        }
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Set how much history each period report averages over
    ///
    /// Accepted range is one sampling window up to the full history.
    pub fn set_averaging_period(&mut self, secs: u16) -> Result<(), ConfigError> {
        check_averaging_period(secs, &self.timing, N).inspect_err(|e| {
            warn!("Rejected averaging period: {}", e);
        })?;
        self.settings.averaging_period_secs = secs;
        info!("Averaging period set to {}s", secs);
        Ok(())
    }

    /// Set the time between two period reports
    ///
    /// Must be at least one sampling window.
    pub fn set_reporting_interval(&mut self, secs: u16) -> Result<(), ConfigError> {
        check_reporting_interval(secs, &self.timing).inspect_err(|e| {
            warn!("Rejected reporting interval: {}", e);
        })?;
        self.settings.reporting_interval_secs = secs;
        info!("Reporting interval set to {}s", secs);
        Ok(())
    }

    pub fn set_unit(&mut self, unit: SpeedUnit) {
        self.settings.unit = unit;
        info!("Speed unit set to {}", unit.label());
    }

    /// Add 180° to every vane reading from now on
    pub fn set_polarity_inversion(&mut self, invert: bool) {
        self.settings.invert_polarity = invert;
        info!("Vane polarity inversion {}", if invert { "on" } else { "off" });
    }

    pub fn enable_low_power(&mut self) {
        self.settings.low_power = true;
        info!("Low power mode enabled");
    }

    pub fn disable_low_power(&mut self) {
        self.settings.low_power = false;
        info!("Low power mode disabled");
    }

    /// Apply a complete set of settings
    ///
    /// Every field is validated first; on error nothing changes.
    pub fn apply_settings(&mut self, settings: &Settings) -> Result<(), ConfigError> {
        check_settings(settings, &self.timing, N).inspect_err(|e| {
            warn!("Rejected settings: {}", e);
        })?;
        self.settings = *settings;
        info!(
            "Settings applied: period {}s, interval {}s, unit {}, inverted {}, low power {}",
            settings.averaging_period_secs,
            settings.reporting_interval_secs,
            settings.unit.label(),
            settings.invert_polarity,
            settings.low_power
        );
        Ok(())
    }

    pub fn is_low_power(&self) -> bool {
        self.settings.low_power
    }

    pub fn is_polarity_inverted(&self) -> bool {
        self.settings.invert_polarity
    }

    pub fn unit(&self) -> SpeedUnit {
        self.settings.unit
    }

    pub fn averaging_period_secs(&self) -> u16 {
        self.settings.averaging_period_secs
    }

    pub fn reporting_interval_secs(&self) -> u16 {
        self.settings.reporting_interval_secs
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    // ------------------------------------------------------------------
    // Main loop entry point
    // ------------------------------------------------------------------

    /// Run one step of the state machine
    ///
    /// Call this from the main loop as often as possible. It does nothing and
    /// returns `false` unless the timer interrupt flagged a tick since the
    /// last call.
    pub fn tick(&mut self) -> bool {
        if !self.interrupts.take_tick() {
            return false;
        }

        self.ticks = self.ticks.wrapping_add(1);

        let low_power = self.settings.low_power;
        if !low_power || self.ticks % u32::from(self.timing.low_power_vane_ticks) == 0 {
            self.read_vane();
        }

        if self.ticks % u32::from(self.timing.window_ticks) == 0 {
            self.close_window();
        }

        if self.ticks % self.report_ticks() == 0 {
            self.publish_period_report();
        }

        true
    }

    fn report_ticks(&self) -> u32 {
        u32::from(self.settings.reporting_interval_secs) * u32::from(self.timing.tick_hz)
    }

    fn read_vane(&mut self) {
        let angle = match self.sensor.read_angle() {
            Ok(angle) => angle,
            Err(e) => {
                warn!("Vane read failed on tick {}: {}", self.ticks, e);
                return;
            }
        };

        let offset = if self.settings.invert_polarity { 180 } else { 0 };
        let angle = (angle % 360 + offset) % 360;
        trace!("Vane angle {}°", angle);

        let aligned = !self.settings.low_power
            && (angle > 360 - NORTH_SECTOR_HALF_WIDTH_DEG || angle < NORTH_SECTOR_HALF_WIDTH_DEG);
        self.sink.on_north_alignment(aligned);

        // Only the direction matters at this scale, so every read weighs 1.
        self.vane_averager.accumulate(1, angle);
    }

    fn close_window(&mut self) {
        let now = self.clock.now_millis();
        let elapsed = now.wrapping_sub(self.last_window_ms);
        let limit = self
            .timing
            .window_ms()
            .saturating_add(self.timing.drift_tolerance_ms);

        if elapsed >= limit {
            self.drop_window(now);
            warn!(
                "Dropped sampling window: took {}ms, limit {}ms",
                elapsed, limit
            );
            return;
        }

        let Some(vane) = self.vane_averager.reduce() else {
            self.drop_window(now);
            warn!("Dropped sampling window: no vane readings");
            return;
        };

        let sample = RawSample::new(self.interrupts.take_pulses(), vane.direction);
        self.last_window_ms = now;
        self.samples.push(sample);
        debug!("Stored {}", sample);

        let report = self.format_sample(&sample);
        self.sink.on_instant(report);
    }

    fn drop_window(&mut self, now: u32) {
        self.interrupts.take_pulses();
        self.vane_averager.clear();
        self.last_window_ms = now;
        self.dropped_windows = self.dropped_windows.wrapping_add(1);
    }

    fn publish_period_report(&mut self) {
        match self.report_for_recent_period(self.settings.averaging_period_secs) {
            Some(report) => {
                debug!("Period report {}", report);
                self.sink.on_average(report);
            }
            None => debug!("No stored samples yet, skipping period report"),
        }
    }

    // ------------------------------------------------------------------
    // History queries
    // ------------------------------------------------------------------

    /// Instant report for the window `age` windows before the latest one
    ///
    /// Converted with the unit that is active now, not the one at the time the
    /// window was recorded. `None` if there is no such window yet.
    pub fn sample(&self, age: usize) -> Option<InstantReport> {
        let sample = self.samples.get(age);
        sample.valid.then(|| self.format_sample(&sample))
    }

    /// Raw stored window, or [`RawSample::INVALID`] if out of range
    pub fn raw_sample(&self, age: usize) -> RawSample {
        self.samples.get(age)
    }

    /// Reduce the most recent `period_secs` of history into a report
    pub fn report_for_recent_period(&self, period_secs: u16) -> Option<WindReport> {
        self.report_for_period_from_last(period_secs, 0)
    }

    /// Reduce a block of history `period_secs` long, `index` blocks back
    ///
    /// Index 0 is the most recent period, index 1 the one before it. Windows
    /// that were never recorded are skipped; `None` if the block holds no
    /// valid window.
    pub fn report_for_period_from_last(&self, period_secs: u16, index: u16) -> Option<WindReport> {
        let window_ms = self.timing.window_ms();
        let period_ms = u32::from(period_secs) * 1000;
        let count = (period_ms / window_ms) as usize;
        let shift = ((u64::from(index) * u64::from(period_ms)) / u64::from(window_ms)) as usize;

        // A fresh averager: the window averager is mid-window and must not be
        // disturbed.
        let mut averager = VectorAverager::new();
        for age in shift..shift.saturating_add(count) {
            let sample = self.samples.get(age);
            if sample.valid {
                averager.accumulate_sample(&sample);
            }
        }

        averager.reduce().map(|avg| self.format_average(&avg))
    }

    /// Number of windows currently held in the history
    pub fn stored_samples(&self) -> usize {
        self.samples.len()
    }

    /// Windows discarded because of timing drift or missing vane readings
    pub fn dropped_windows(&self) -> u32 {
        self.dropped_windows
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    // ------------------------------------------------------------------
    // Unit conversion
    // ------------------------------------------------------------------

    fn to_speed(&self, pulses: f32) -> f32 {
        pulses_to_speed(
            pulses,
            self.settings.calibration,
            self.timing.window_secs(),
            self.settings.unit,
        )
    }

    fn format_sample(&self, sample: &RawSample) -> InstantReport {
        InstantReport {
            speed: self.to_speed(sample.pulses as f32),
            direction: sample.direction,
        }
    }

    fn format_average(&self, avg: &VectorAverage) -> WindReport {
        WindReport {
            avg_direction: avg.direction,
            avg_speed: self.to_speed(avg.magnitude),
            min_speed: self.to_speed(avg.min as f32),
            max_speed: self.to_speed(avg.max as f32),
        }
    }
}
