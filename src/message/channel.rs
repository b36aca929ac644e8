use core::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use super::MessageError;
use crate::prelude::*;

#[doc = r#"
A MIDI channel, numbered 0-15 on the wire (shown as 1-16 to humans)
"#]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Channel(u8);

impl Channel {
    /// Create a channel from its wire number (0-15)
    pub const fn new(channel: u8) -> Result<Self, MessageError> {
        if channel > 0x0F {
            return Err(MessageError::InvalidChannel(channel));
        }
        Ok(Self(channel))
    }

    /// The channel encoded in the low nibble of a status byte
    pub const fn from_status(status: u8) -> Self {
        Self(status & 0x0F)
    }

    /// The wire number (0-15)
    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0 + 1)
    }
}

/// The message type in the high nibble of a channel status byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum VoiceKind {
    /// `8n`
    NoteOff = 0x8,
    /// `9n`
    NoteOn = 0x9,
    /// `An`, polyphonic key pressure
    PolyPressure = 0xA,
    /// `Bn`, also carries channel mode messages
    ControlChange = 0xB,
    /// `Cn`
    ProgramChange = 0xC,
    /// `Dn`
    ChannelPressure = 0xD,
    /// `En`
    PitchBend = 0xE,
}

impl VoiceKind {
    /// How many data bytes follow a status of this kind
    pub const fn data_len(&self) -> usize {
        match self {
            Self::ProgramChange | Self::ChannelPressure => 1,
            _ => 2,
        }
    }
}

#[doc = r#"
A channel message: status byte plus one or two data bytes.

The number of data bytes is fixed by the status, and construction refuses
anything else, so a channel message always re-encodes to the bytes it was
read from.

# Example
```rust
# use maxmidi::prelude::*;
let msg = ChannelMessage::new(0x91, &[60, 100]).unwrap();
assert_eq!(msg.kind(), VoiceKind::NoteOn);
assert_eq!(msg.channel().value(), 1);
assert_eq!(msg.data(), &[60, 100]);

assert!(ChannelMessage::new(0xC0, &[1, 2]).is_err());
```
"#]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelMessage {
    kind: VoiceKind,
    channel: Channel,
    data: [u8; 2],
}

impl ChannelMessage {
    /// Create a message from a status byte and its data bytes
    pub fn new(status: u8, data: &[u8]) -> Result<Self, MessageError> {
        let kind = VoiceKind::try_from(status >> 4)
            .map_err(|_| MessageError::InvalidStatus(status))?;
        Self::from_parts(kind, Channel::from_status(status), data)
    }

    /// Create a message from its kind, channel and data bytes
    pub fn from_parts(kind: VoiceKind, channel: Channel, data: &[u8]) -> Result<Self, MessageError> {
        let expected = kind.data_len();
        if data.len() != expected {
            return Err(MessageError::DataLength {
                expected,
                found: data.len(),
            });
        }
        if let Some(&byte) = data.iter().find(|b| **b > 0x7F) {
            return Err(MessageError::InvalidDataByte(byte));
        }
        let mut bytes = [0; 2];
        bytes[..expected].copy_from_slice(data);
        Ok(Self {
            kind,
            channel,
            data: bytes,
        })
    }

    /// Note on
    pub fn note_on(channel: Channel, note: u8, velocity: u8) -> Result<Self, MessageError> {
        Self::from_parts(VoiceKind::NoteOn, channel, &[note, velocity])
    }

    /// Note off
    pub fn note_off(channel: Channel, note: u8, velocity: u8) -> Result<Self, MessageError> {
        Self::from_parts(VoiceKind::NoteOff, channel, &[note, velocity])
    }

    /// Pitch bend, centered on zero: -8192 bends fully down, 8191 fully up
    pub fn pitch_bend(channel: Channel, bend: i16) -> Result<Self, MessageError> {
        if !(-8192..=8191).contains(&bend) {
            return Err(MessageError::PitchBend(bend));
        }
        let value = (bend + 8192) as u16;
        let (lsb, msb) = ((value & 0x7F) as u8, (value >> 7) as u8);
        Self::from_parts(VoiceKind::PitchBend, channel, &[lsb, msb])
    }

    /// The pitch bend as a signed value, for [`VoiceKind::PitchBend`] messages
    pub fn bend(&self) -> Option<i16> {
        if self.kind != VoiceKind::PitchBend {
            return None;
        }
        let value = ((self.data[1] as i16) << 7) | self.data[0] as i16;
        Some(value - 8192)
    }

    /// The full status byte
    pub fn status(&self) -> u8 {
        (u8::from(self.kind) << 4) | self.channel.value()
    }

    /// The message type
    pub const fn kind(&self) -> VoiceKind {
        self.kind
    }

    /// The channel
    pub const fn channel(&self) -> Channel {
        self.channel
    }

    /// The one or two data bytes
    pub fn data(&self) -> &[u8] {
        &self.data[..self.kind.data_len()]
    }

    /// Status and data bytes, ready to send to a port
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(3);
        bytes.push(self.status());
        bytes.extend_from_slice(self.data());
        bytes
    }
}

#[test]
fn status_round_trip() {
    use pretty_assertions::assert_eq;
    for status in 0x80..=0xEFu8 {
        let len = VoiceKind::try_from(status >> 4).unwrap().data_len();
        let msg = ChannelMessage::new(status, &[0x40, 0x7F][..len]).unwrap();
        assert_eq!(msg.status(), status);
        assert_eq!(msg.to_bytes().len(), len + 1);
    }
}

#[test]
fn invalid_channel_messages() {
    use pretty_assertions::assert_eq;
    assert_eq!(
        ChannelMessage::new(0xF0, &[0]).unwrap_err(),
        MessageError::InvalidStatus(0xF0)
    );
    assert_eq!(
        ChannelMessage::new(0x90, &[0x80, 0]).unwrap_err(),
        MessageError::InvalidDataByte(0x80)
    );
    assert_eq!(
        ChannelMessage::new(0xD3, &[1, 2]).unwrap_err(),
        MessageError::DataLength {
            expected: 1,
            found: 2
        }
    );
    assert_eq!(Channel::new(16).unwrap_err(), MessageError::InvalidChannel(16));
}

#[test]
fn pitch_bend_is_centered() {
    use pretty_assertions::assert_eq;
    let ch = Channel::new(2).unwrap();
    assert_eq!(ChannelMessage::pitch_bend(ch, 0).unwrap().to_bytes(), [0xE2, 0x00, 0x40]);
    assert_eq!(ChannelMessage::pitch_bend(ch, -8192).unwrap().to_bytes(), [0xE2, 0x00, 0x00]);
    assert_eq!(ChannelMessage::pitch_bend(ch, 8191).unwrap().to_bytes(), [0xE2, 0x7F, 0x7F]);
    assert_eq!(ChannelMessage::pitch_bend(ch, -1).unwrap().bend(), Some(-1));
    assert_eq!(
        ChannelMessage::pitch_bend(ch, 8192).unwrap_err(),
        MessageError::PitchBend(8192)
    );
    assert_eq!(ChannelMessage::note_on(ch, 60, 1).unwrap().bend(), None);
}
