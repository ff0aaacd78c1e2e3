//! Desktop simulator for the windvane sampling core.
//!
//! Runs `windvane-core` against a synthetic rotor and vane in simulated time,
//! so the aggregation pipeline can be exercised without hardware. Reports go
//! through the same pub-sub channel the firmware would use and are logged.
//!
//! ```text
//! RUST_LOG=debug windvane-simulator --minutes 5 --direction 350 --stall-every 7
//! ```
//!
//! Settings can be loaded from a TOML file:
//!
//! ```toml
//! [settings]
//! averaging_period_secs = 120
//! reporting_interval_secs = 30
//! unit = "knots"
//!
//! [scenario]
//! pulse_hz = 8.0
//! direction = 10
//! swing = 30
//! ```

use std::cell::Cell;
use std::f32::consts::TAU;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pubsub::PubSubChannel;
use log::{debug, info, warn};
use serde::Deserialize;

use windvane_core::report::{EVENT_CHANNEL_CAPACITY, EVENT_PUBLISHERS, EVENT_SUBSCRIBERS};
use windvane_core::{
    AngleSensor, MonotonicClock, PublisherSink, ReportEvent, SensorError, Settings, SpeedUnit,
    TimingConfig, WindEngine, WindInterrupts,
};

// ---------------------------------------------------------------------------
// Shared state, as the firmware would declare it
// ---------------------------------------------------------------------------

static WIND_IRQ: WindInterrupts = WindInterrupts::new();

static REPORT_CHANNEL: PubSubChannel<
    CriticalSectionRawMutex,
    ReportEvent,
    EVENT_CHANNEL_CAPACITY,
    EVENT_SUBSCRIBERS,
    EVENT_PUBLISHERS,
> = PubSubChannel::new();

/// Period of the slow gust modulation applied to the rotor.
const GUST_PERIOD_SECS: f32 = 47.0;

/// Period of the vane swing around its base direction.
const SWING_PERIOD_SECS: f32 = 23.0;

// ---------------------------------------------------------------------------
// Command line and settings file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, ValueEnum)]
enum UnitArg {
    Ms,
    Kn,
    Kph,
    Mph,
}

impl From<UnitArg> for SpeedUnit {
    fn from(unit: UnitArg) -> Self {
        match unit {
            UnitArg::Ms => SpeedUnit::MetersPerSecond,
            UnitArg::Kn => SpeedUnit::Knots,
            UnitArg::Kph => SpeedUnit::KilometersPerHour,
            UnitArg::Mph => SpeedUnit::MilesPerHour,
        }
    }
}

#[derive(Parser, Debug)]
#[command(about = "Run the windvane core against a synthetic anemometer")]
struct Args {
    /// TOML file with `[settings]` and `[scenario]` tables
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simulated run time in minutes
    #[arg(short, long, default_value_t = 10)]
    minutes: u32,

    /// Mean rotor pulse frequency in Hz (overrides the file)
    #[arg(long)]
    pulse_hz: Option<f32>,

    /// Base wind direction in degrees (overrides the file)
    #[arg(long)]
    direction: Option<u16>,

    /// Speed unit for reports (overrides the file)
    #[arg(long, value_enum)]
    unit: Option<UnitArg>,

    /// Stall the main loop once every N sampling windows
    #[arg(long)]
    stall_every: Option<u32>,

    /// Simulate a vane magnet mounted backwards
    #[arg(long)]
    invert: bool,
}

/// Synthetic wind conditions
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
struct Scenario {
    /// Mean rotor pulse frequency in Hz
    pulse_hz: f32,
    /// Relative amplitude of the gust modulation, 0..1
    gustiness: f32,
    /// Base wind direction in degrees
    direction: u16,
    /// Vane swing amplitude in degrees
    swing: u16,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            pulse_hz: 6.0,
            gustiness: 0.3,
            direction: 350,
            swing: 25,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SimFile {
    settings: Settings,
    scenario: Scenario,
}

fn load_file(path: &Path) -> Result<SimFile> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

// ---------------------------------------------------------------------------
// Simulated hardware
// ---------------------------------------------------------------------------

/// Millisecond clock advanced by the main loop
struct SimClock {
    now: Cell<u32>,
}

impl SimClock {
    fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }

    fn secs(&self) -> f32 {
        self.now.get() as f32 / 1000.0
    }
}

impl MonotonicClock for SimClock {
    fn now_millis(&self) -> u32 {
        self.now.get()
    }
}

/// Vane swinging sinusoidally around the scenario direction
struct SimVane<'c> {
    clock: &'c SimClock,
    scenario: Scenario,
    inverted: bool,
}

impl AngleSensor for SimVane<'_> {
    fn read_angle(&mut self) -> Result<u16, SensorError> {
        let t = self.clock.secs();
        let swing = f32::from(self.scenario.swing) * (TAU * t / SWING_PERIOD_SECS).sin();
        let mut angle = f32::from(self.scenario.direction) + swing;
        if self.inverted {
            angle += 180.0;
        }
        Ok(angle.rem_euclid(360.0) as u16 % 360)
    }
}

/// Rotor turning at a gusty rate, raising pulse interrupts
struct SimRotor {
    scenario: Scenario,
    phase: f32,
}

impl SimRotor {
    /// Advance the rotor by `dt` seconds and return how many pulses fired
    fn advance(&mut self, t: f32, dt: f32) -> u32 {
        let gust = 1.0 + self.scenario.gustiness * (TAU * t / GUST_PERIOD_SECS).sin();
        self.phase += (self.scenario.pulse_hz * gust).max(0.0) * dt;
        let pulses = self.phase.floor();
        self.phase -= pulses;
        pulses as u32
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut file = match &args.config {
        Some(path) => load_file(path)?,
        None => SimFile::default(),
    };
    if let Some(hz) = args.pulse_hz {
        file.scenario.pulse_hz = hz;
    }
    if let Some(direction) = args.direction {
        file.scenario.direction = direction % 360;
    }
    if let Some(unit) = args.unit {
        file.settings.unit = unit.into();
    }
    // A backwards magnet is corrected by the inversion setting.
    if args.invert {
        file.settings.invert_polarity = true;
    }

    let timing = TimingConfig::default();
    let clock = SimClock {
        now: Cell::new(0),
    };
    let vane = SimVane {
        clock: &clock,
        scenario: file.scenario,
        inverted: args.invert,
    };
    let mut rotor = SimRotor {
        scenario: file.scenario,
        phase: 0.0,
    };

    let mut subscriber = REPORT_CHANNEL
        .subscriber()
        .map_err(|e| anyhow!("report channel subscriber: {e:?}"))?;
    let publisher = REPORT_CHANNEL
        .publisher()
        .map_err(|e| anyhow!("report channel publisher: {e:?}"))?;

    let mut engine: WindEngine<'_, _, _, _> = WindEngine::with_config(
        &WIND_IRQ,
        vane,
        &clock,
        PublisherSink::new(publisher),
        timing,
        file.settings,
    )
    .map_err(|e| anyhow!("invalid settings: {e}"))?;

    info!("Starting windvane simulator");
    info!(
        "Scenario: {:.1} Hz rotor, {}° ± {}°, {} minutes",
        file.scenario.pulse_hz, file.scenario.direction, file.scenario.swing, args.minutes
    );
    info!(
        "Averaging {}s every {}s in {}",
        engine.averaging_period_secs(),
        engine.reporting_interval_secs(),
        engine.unit().label()
    );

    let tick_ms = timing.tick_ms();
    let dt = tick_ms as f32 / 1000.0;
    let total_ticks = u64::from(args.minutes) * 60 * u64::from(timing.tick_hz);
    let window_ticks = u64::from(timing.window_ticks);
    let unit = engine.unit().label();
    let mut averages = 0_u32;

    for tick in 1..=total_ticks {
        // Interrupt side: rotor pulses during this tick, then the timer fires.
        for _ in 0..rotor.advance(clock.secs(), dt) {
            WIND_IRQ.on_pulse();
        }

        let mut elapsed = tick_ms;
        if let Some(every) = args.stall_every.filter(|n| *n > 0) {
            // Block the loop for a whole window somewhere inside every Nth window
            let window = (tick - 1) / window_ticks;
            if (window + 1) % u64::from(every) == 0 && tick % window_ticks == window_ticks / 2 {
                elapsed += timing.window_ms();
                warn!("Simulating a {}ms main loop stall", timing.window_ms());
            }
        }
        clock.advance(elapsed);
        WIND_IRQ.on_tick();

        // Main loop side.
        engine.tick();

        while let Some(event) = subscriber.try_next_message_pure() {
            match event {
                ReportEvent::Instant(report) => {
                    debug!("{:>7.1}s {:.2} {} @ {}°", clock.secs(), report.speed, unit, report.direction);
                }
                ReportEvent::Average(report) => {
                    averages += 1;
                    info!(
                        "{:>7.1}s average {:.2} {} @ {}° (min {:.2}, max {:.2})",
                        clock.secs(),
                        report.avg_speed,
                        unit,
                        report.avg_direction,
                        report.min_speed,
                        report.max_speed
                    );
                }
                ReportEvent::NorthAlignment(aligned) => {
                    debug!("North indicator {}", if aligned { "on" } else { "off" });
                }
            }
        }
    }

    info!(
        "Done: {} ticks, {} windows stored, {} dropped, {} period reports",
        engine.ticks(),
        engine.stored_samples(),
        engine.dropped_windows(),
        averages
    );
    match engine.report_for_recent_period(engine.averaging_period_secs()) {
        Some(report) => info!("Last period: {}", report),
        None => info!("Last period: no data"),
    }

    Ok(())
}
