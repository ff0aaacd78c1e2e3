//! State shared between interrupt handlers and the main loop
//!
//! Exactly two values cross the interrupt boundary: the "a tick happened"
//! flag set by the base-rate timer and the rotor pulse counter incremented on
//! each rising edge. Everything else in the engine is touched from the main
//! loop only.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Interrupt-visible counters
///
/// Meant to live in a `static` so interrupt handlers can reach it:
///
/// ```rust,ignore
/// static WIND_IRQ: WindInterrupts = WindInterrupts::new();
///
/// fn on_timer_isr() { WIND_IRQ.on_tick(); }
/// fn on_rotor_edge_isr() { WIND_IRQ.on_pulse(); }
///
/// let mut engine = WindEngine::new(&WIND_IRQ, vane, clock, sink);
/// loop { engine.tick(); }
/// ```
///
/// Ticks are not counted individually. If the loop misses several timer
/// interrupts they collapse into a single pending tick; the engine detects
/// the resulting drift at the sampling window scale.
#[derive(Debug)]
pub struct WindInterrupts {
    tick_pending: AtomicBool,
    pulse_count: AtomicU32,
}

impl WindInterrupts {
    pub const fn new() -> Self {
        Self {
            tick_pending: AtomicBool::new(false),
            pulse_count: AtomicU32::new(0),
        }
    }

    /// Timer interrupt: mark that a base-rate tick elapsed
    #[inline]
    pub fn on_tick(&self) {
        self.tick_pending.store(true, Ordering::Release);
    }

    /// Rotor interrupt: count one pulse
    #[inline]
    pub fn on_pulse(&self) {
        self.pulse_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Main loop: consume the pending tick, if any
    #[inline]
    pub fn take_tick(&self) -> bool {
        self.tick_pending.swap(false, Ordering::Acquire)
    }

    /// Main loop: read and reset the pulse counter in one step
    #[inline]
    pub fn take_pulses(&self) -> u32 {
        self.pulse_count.swap(0, Ordering::Relaxed)
    }

    /// Pulses counted so far in the current window, without resetting
    #[inline]
    pub fn pending_pulses(&self) -> u32 {
        self.pulse_count.load(Ordering::Relaxed)
    }
}

impl Default for WindInterrupts {
    fn default() -> Self {
        Self::new()
    }
}
