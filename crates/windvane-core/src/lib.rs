//! Hardware-independent core library for windvane
//!
//! This crate contains the platform-agnostic sampling and aggregation logic
//! of a pulse anemometer with a magnetic wind vane: the tick-driven engine,
//! the rolling sample history and the vector averager that turns angle
//! readings into a direction-correct mean.
//!
//! It is `#![no_std]` without `alloc`: every buffer has a fixed capacity, so
//! it compiles on small microcontrollers as well as on desktop hosts (for the
//! simulator and tests).
//!
//! The hardware glue owns a [`WindInterrupts`] in a `static`, calls
//! [`WindInterrupts::on_tick`] from the timer interrupt and
//! [`WindInterrupts::on_pulse`] from the rotor pulse interrupt, and calls
//! [`WindEngine::tick`] from its main loop.

#![no_std]

pub mod config;
pub mod engine;
pub mod interrupts;
pub mod report;
pub mod sensor;
pub mod storage;
pub mod units;

pub use config::{ConfigError, Settings, TimingConfig};
pub use engine::WindEngine;
pub use interrupts::WindInterrupts;
pub use report::{InstantReport, NoopSink, PublisherSink, ReportEvent, ReportSink, WindReport};
pub use sensor::{AngleSensor, MonotonicClock, SensorError};
pub use storage::{RawSample, SAMPLE_CAPACITY, SampleStore, VectorAverage, VectorAverager};
pub use units::SpeedUnit;
