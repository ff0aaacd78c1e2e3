//! Report types and the sinks reports are delivered to

use core::fmt::Display;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::pubsub::Publisher;
use serde::{Deserialize, Serialize};

/// Channel capacity for pub-sub report events
///
/// One instant report every 3 s leaves the subscriber plenty of time; 8 covers
/// a slow consumer catching up after a blocking operation.
pub const EVENT_CHANNEL_CAPACITY: usize = 8;

/// Number of subscribers that can listen to report events
pub const EVENT_SUBSCRIBERS: usize = 2;

/// Number of publishers (just the engine)
pub const EVENT_PUBLISHERS: usize = 1;

/// Wind measured over a single sampling window
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InstantReport {
    /// Speed in the engine's active unit
    pub speed: f32,
    /// Direction in degrees, `0..360`
    pub direction: u16,
}

impl Display for InstantReport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[Instant] {:.2} @ {}°", self.speed, self.direction)
    }
}

/// Wind averaged over the configured averaging period
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WindReport {
    /// Vector-averaged direction in degrees, `0..360`
    pub avg_direction: u16,
    /// Length of the mean wind vector, in the active unit
    pub avg_speed: f32,
    /// Lowest window speed in the period
    pub min_speed: f32,
    /// Highest window speed in the period (gust)
    pub max_speed: f32,
}

impl Display for WindReport {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "[WindReport] avg: {:.2} @ {}°, min: {:.2}, max: {:.2}",
            self.avg_speed, self.avg_direction, self.min_speed, self.max_speed
        )
    }
}

/// Events published by [`PublisherSink`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReportEvent {
    /// A sampling window completed
    Instant(InstantReport),
    /// A period report was computed
    Average(WindReport),
    /// The vane moved into or out of the north sector
    NorthAlignment(bool),
}

/// Receiver of engine reports
///
/// Every method has an empty default body, so a sink only implements what it
/// cares about. Methods are called synchronously from [`crate::WindEngine::tick`]
/// and must return quickly: a sink that blocks for longer than a tick makes
/// the next sampling window look late, and that window gets discarded.
pub trait ReportSink {
    /// A sampling window completed
    fn on_instant(&mut self, _report: InstantReport) {}

    /// A period report was computed
    fn on_average(&mut self, _report: WindReport) {}

    /// Called after every vane read with whether it points roughly north
    ///
    /// Always `false` in low power mode. Typically drives an indicator LED.
    fn on_north_alignment(&mut self, _aligned: bool) {}
}

/// Sink that drops everything, for hosts that only poll the history
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ReportSink for NoopSink {}

impl<T: ReportSink + ?Sized> ReportSink for &mut T {
    fn on_instant(&mut self, report: InstantReport) {
        (**self).on_instant(report);
    }

    fn on_average(&mut self, report: WindReport) {
        (**self).on_average(report);
    }

    fn on_north_alignment(&mut self, aligned: bool) {
        (**self).on_north_alignment(aligned);
    }
}

/// Sink forwarding reports into an embassy pub-sub channel
///
/// Publishing never waits: when a subscriber lags, the oldest event is
/// dropped. North alignment is only published when it changes.
///
/// ## Usage
///
/// ```rust,ignore
/// static REPORT_CHANNEL: PubSubChannel<
///     CriticalSectionRawMutex,
///     ReportEvent,
///     EVENT_CHANNEL_CAPACITY,
///     EVENT_SUBSCRIBERS,
///     EVENT_PUBLISHERS,
/// > = PubSubChannel::new();
///
/// let publisher = REPORT_CHANNEL.publisher().unwrap();
/// let engine = WindEngine::new(&WIND_IRQ, vane, clock, PublisherSink::new(publisher));
/// ```
pub struct PublisherSink<'a, M, const CAP: usize, const SUBS: usize, const PUBS: usize>
where
    M: RawMutex,
{
    publisher: Publisher<'a, M, ReportEvent, CAP, SUBS, PUBS>,
    north_aligned: Option<bool>,
}

impl<'a, M, const CAP: usize, const SUBS: usize, const PUBS: usize>
    PublisherSink<'a, M, CAP, SUBS, PUBS>
where
    M: RawMutex,
{
    pub fn new(publisher: Publisher<'a, M, ReportEvent, CAP, SUBS, PUBS>) -> Self {
        Self {
            publisher,
            north_aligned: None,
        }
    }
}

impl<M, const CAP: usize, const SUBS: usize, const PUBS: usize> ReportSink
    for PublisherSink<'_, M, CAP, SUBS, PUBS>
where
    M: RawMutex,
{
    fn on_instant(&mut self, report: InstantReport) {
        self.publisher.publish_immediate(ReportEvent::Instant(report));
    }

    fn on_average(&mut self, report: WindReport) {
        self.publisher.publish_immediate(ReportEvent::Average(report));
    }

    fn on_north_alignment(&mut self, aligned: bool) {
        if self.north_aligned != Some(aligned) {
            self.north_aligned = Some(aligned);
            self.publisher
                .publish_immediate(ReportEvent::NorthAlignment(aligned));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_sync::blocking_mutex::raw::NoopRawMutex;
    use embassy_sync::pubsub::PubSubChannel;

    type TestChannel = PubSubChannel<
        NoopRawMutex,
        ReportEvent,
        EVENT_CHANNEL_CAPACITY,
        EVENT_SUBSCRIBERS,
        EVENT_PUBLISHERS,
    >;

    #[test]
    fn test_publisher_sink_forwards_reports() {
        let channel = TestChannel::new();
        let mut subscriber = channel.subscriber().unwrap();
        let mut sink = PublisherSink::new(channel.publisher().unwrap());

        let instant = InstantReport {
            speed: 4.5,
            direction: 270,
        };
        let average = WindReport {
            avg_direction: 265,
            avg_speed: 4.0,
            min_speed: 2.0,
            max_speed: 6.5,
        };
        sink.on_instant(instant);
        sink.on_average(average);

        assert_eq!(
            subscriber.try_next_message_pure(),
            Some(ReportEvent::Instant(instant))
        );
        assert_eq!(
            subscriber.try_next_message_pure(),
            Some(ReportEvent::Average(average))
        );
        assert_eq!(subscriber.try_next_message_pure(), None);
    }

    #[test]
    fn test_north_alignment_published_on_change_only() {
        let channel = TestChannel::new();
        let mut subscriber = channel.subscriber().unwrap();
        let mut sink = PublisherSink::new(channel.publisher().unwrap());

        sink.on_north_alignment(false);
        sink.on_north_alignment(false);
        sink.on_north_alignment(true);
        sink.on_north_alignment(true);
        sink.on_north_alignment(false);

        assert_eq!(
            subscriber.try_next_message_pure(),
            Some(ReportEvent::NorthAlignment(false))
        );
        assert_eq!(
            subscriber.try_next_message_pure(),
            Some(ReportEvent::NorthAlignment(true))
        );
        assert_eq!(
            subscriber.try_next_message_pure(),
            Some(ReportEvent::NorthAlignment(false))
        );
        assert_eq!(subscriber.try_next_message_pure(), None);
    }

    #[test]
    fn test_lagging_subscriber_keeps_newest_events() {
        let channel = TestChannel::new();
        let mut subscriber = channel.subscriber().unwrap();
        let mut sink = PublisherSink::new(channel.publisher().unwrap());

        for direction in 0..(EVENT_CHANNEL_CAPACITY as u16 + 2) {
            sink.on_instant(InstantReport {
                speed: 1.0,
                direction,
            });
        }

        // The two oldest events were dropped to make room
        assert_eq!(
            subscriber.try_next_message_pure(),
            Some(ReportEvent::Instant(InstantReport {
                speed: 1.0,
                direction: 2
            }))
        );
    }
}
