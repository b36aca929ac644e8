#![doc = r#"
The messages that can appear in a track chunk or on a MIDI port

# Hierarchy
```text
                    |---------------|
                    | Track Message |
                    |---------------|
                   /        |        \
|-----------------|  |--------------|  |------------------|
| Channel Message |  | Meta Message |  | SysEx Message    |
|-----------------|  |--------------|  |------------------|
```

[`SystemRealTime`] messages never appear in a file. They are what the
transport clock sends.
"#]

mod channel;
pub use channel::*;

mod meta;
pub use meta::*;

mod sysex;
pub use sysex::*;

mod realtime;
pub use realtime::*;

use crate::prelude::*;
use thiserror::Error;

/// Errors from constructing a message out of raw values
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MessageError {
    /// Not a channel status byte (0x80-0xEF)
    #[error("{0:#04X} is not a channel status byte")]
    InvalidStatus(u8),
    /// A data byte with its high bit set
    #[error("{0:#04X} is not a data byte")]
    InvalidDataByte(u8),
    /// The number of data bytes does not match the status
    #[error("status expects {expected} data bytes, found {found}")]
    DataLength {
        /// Bytes the status requires
        expected: usize,
        /// Bytes provided
        found: usize,
    },
    /// Channels are numbered 0-15
    #[error("channel {0} is out of range")]
    InvalidChannel(u8),
    /// Meta event types are 0x00-0x7F
    #[error("{0:#04X} is not a meta event type")]
    InvalidMetaType(u8),
    /// Time signature denominators are powers of two
    #[error("time signature denominator {0} is not a power of two")]
    TimeSignature(u8),
    /// Pitch bend is a signed 14-bit value, -8192 to 8191
    #[error("pitch bend {0} is out of range")]
    PitchBend(i16),
    /// End-of-Track takes no payload
    #[error("End-of-Track cannot carry a payload of {0} bytes")]
    EndOfTrackPayload(usize),
}

#[doc = r#"
The payload of a [`TrackEvent`](crate::file::TrackEvent)
"#]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrackMessage {
    /// A channel voice or mode message
    Channel(ChannelMessage),
    /// A meta event (`FF`)
    Meta(MetaMessage),
    /// A system exclusive event (`F0` or `F7`)
    SysEx(SysExMessage),
}

impl TrackMessage {
    /// True if this is the End-of-Track meta event
    pub fn is_end_of_track(&self) -> bool {
        matches!(self, Self::Meta(m) if m.is_end_of_track())
    }

    /// The bytes to send to a MIDI port for this message.
    ///
    /// Meta events are file-only and return `None`.
    pub fn live_bytes(&self) -> Option<Vec<u8>> {
        match self {
            Self::Channel(c) => Some(c.to_bytes()),
            Self::SysEx(s) => Some(s.live_bytes()),
            Self::Meta(_) => None,
        }
    }
}

impl From<ChannelMessage> for TrackMessage {
    fn from(value: ChannelMessage) -> Self {
        Self::Channel(value)
    }
}

impl From<MetaMessage> for TrackMessage {
    fn from(value: MetaMessage) -> Self {
        Self::Meta(value)
    }
}

impl From<SysExMessage> for TrackMessage {
    fn from(value: SysExMessage) -> Self {
        Self::SysEx(value)
    }
}
