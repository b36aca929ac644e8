use crate::prelude::*;

#[doc = r#"
One timed event in a track: a delta-time and a message.

The delta is the number of ticks since the previous event in the same track.
Events at the same instant have a delta of zero.
"#]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackEvent {
    delta_ticks: u32,
    message: TrackMessage,
}

impl TrackEvent {
    /// Create a new event
    pub fn new(delta_ticks: u32, message: impl Into<TrackMessage>) -> Self {
        Self {
            delta_ticks,
            message: message.into(),
        }
    }

    /// An End-of-Track event after `delta_ticks`
    pub fn end_of_track(delta_ticks: u32) -> Self {
        Self::new(delta_ticks, MetaMessage::end_of_track())
    }

    /// Ticks since the previous event
    pub const fn delta_ticks(&self) -> u32 {
        self.delta_ticks
    }

    /// Change the delta-time
    pub fn set_delta_ticks(&mut self, delta_ticks: u32) {
        self.delta_ticks = delta_ticks;
    }

    /// The message
    pub const fn message(&self) -> &TrackMessage {
        &self.message
    }

    /// Consume the event, returning its message
    pub fn into_message(self) -> TrackMessage {
        self.message
    }

    /// True for the End-of-Track meta event
    pub fn is_end_of_track(&self) -> bool {
        self.message.is_end_of_track()
    }
}

#[doc = r#"
Some value paired with its absolute position in ticks from the start of the track.
"#]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticked<T> {
    accumulated_ticks: u64,
    event: T,
}

impl<T> Ticked<T> {
    /// Pair a value with a tick position
    pub const fn new(accumulated_ticks: u64, event: T) -> Self {
        Self {
            accumulated_ticks,
            event,
        }
    }
    /// Ticks since the start of the track
    pub const fn accumulated_ticks(&self) -> u64 {
        self.accumulated_ticks
    }
    /// The value
    pub const fn event(&self) -> &T {
        &self.event
    }
    /// Consume, returning the value
    pub fn into_event(self) -> T {
        self.event
    }
}
