use std::string::String;

use thiserror::Error;

use super::ClockEvent;

/// A failure to hand a clock event to its destination
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The receiving end is gone
    #[error("The clock sink is disconnected")]
    Disconnected,
    /// The output backend reported an error
    #[error("The clock sink failed: {0}")]
    Backend(String),
}

#[doc = r#"
Where a [`TransportClock`](super::TransportClock) delivers its events.

Events are handed over in order, one at a time, from the clock's delivery
thread. A slow sink delays delivery but never the schedule: events that pile
up beyond the clock's queue capacity are dropped.

Implemented for:
- [`RawSink`], wrapping a closure that takes the event's MIDI bytes
- [`crossbeam_channel::Sender<ClockEvent>`](crossbeam_channel::Sender)
- `midir::MidiOutputConnection` with the `midir` feature
"#]
pub trait PulseSink: Send + 'static {
    /// Deliver one event
    fn send(&mut self, event: &ClockEvent) -> Result<(), SinkError>;
}

/// A sink that passes the raw MIDI bytes of each event to a closure
pub struct RawSink<F>(pub F);

impl<F> PulseSink for RawSink<F>
where
    F: FnMut(&[u8]) -> Result<(), SinkError> + Send + 'static,
{
    fn send(&mut self, event: &ClockEvent) -> Result<(), SinkError> {
        (self.0)(&event.bytes())
    }
}

impl PulseSink for crossbeam_channel::Sender<ClockEvent> {
    fn send(&mut self, event: &ClockEvent) -> Result<(), SinkError> {
        crossbeam_channel::Sender::send(self, *event).map_err(|_| SinkError::Disconnected)
    }
}

#[cfg(feature = "midir")]
impl PulseSink for midir::MidiOutputConnection {
    fn send(&mut self, event: &ClockEvent) -> Result<(), SinkError> {
        midir::MidiOutputConnection::send(self, &event.bytes())
            .map_err(|e| SinkError::Backend(std::string::ToString::to_string(&e)))
    }
}

#[test]
fn raw_sink_sends_realtime_bytes() {
    use super::ClockEventKind;
    use pretty_assertions::assert_eq;
    use std::{time::Instant, vec::Vec};

    let mut sent = Vec::new();
    let (tx, rx) = crossbeam_channel::unbounded();
    let mut sink = RawSink(move |bytes: &[u8]| {
        tx.send(bytes.to_vec()).map_err(|_| SinkError::Disconnected)
    });
    for kind in [
        ClockEventKind::Start,
        ClockEventKind::Pulse,
        ClockEventKind::Stop,
        ClockEventKind::Continue,
    ] {
        let event = ClockEvent {
            kind,
            position: 0,
            target: Instant::now(),
        };
        sink.send(&event).unwrap();
        sent.extend(rx.try_recv().unwrap());
    }
    assert_eq!(sent, [0xFA, 0xF8, 0xFC, 0xFB]);
}
