use num_enum::{IntoPrimitive, TryFromPrimitive};

use super::MessageError;
use crate::prelude::*;

/// Meta event types with a defined meaning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum MetaType {
    /// `FF 00 02 ssss`
    SequenceNumber = 0x00,
    /// `FF 01 len text`
    Text = 0x01,
    /// `FF 02 len text`
    Copyright = 0x02,
    /// `FF 03 len text`
    TrackName = 0x03,
    /// `FF 04 len text`
    InstrumentName = 0x04,
    /// `FF 05 len text`
    Lyric = 0x05,
    /// `FF 06 len text`
    Marker = 0x06,
    /// `FF 07 len text`
    CuePoint = 0x07,
    /// `FF 20 01 cc`
    ChannelPrefix = 0x20,
    /// `FF 2F 00`
    EndOfTrack = 0x2F,
    /// `FF 51 03 tttttt`
    SetTempo = 0x51,
    /// `FF 54 05 hr mn se fr ff`
    SmpteOffset = 0x54,
    /// `FF 58 04 nn dd cc bb`
    TimeSignature = 0x58,
    /// `FF 59 02 sf mi`
    KeySignature = 0x59,
    /// `FF 7F len data`
    SequencerSpecific = 0x7F,
}

#[doc = r#"
A meta event: a type byte and a payload.

The payload length written to a file is always taken from the payload itself.
"#]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetaMessage {
    meta_type: u8,
    payload: Vec<u8>,
}

impl MetaMessage {
    /// Create a meta message. The type must be 0x00-0x7F, and End-of-Track
    /// (0x2F) takes no payload.
    pub fn new(meta_type: u8, payload: impl Into<Vec<u8>>) -> Result<Self, MessageError> {
        if meta_type > 0x7F {
            return Err(MessageError::InvalidMetaType(meta_type));
        }
        let payload = payload.into();
        if meta_type == u8::from(MetaType::EndOfTrack) && !payload.is_empty() {
            return Err(MessageError::EndOfTrackPayload(payload.len()));
        }
        Ok(Self { meta_type, payload })
    }

    /// Create a meta message of a known type.
    ///
    /// An End-of-Track payload is discarded.
    pub fn known(meta_type: MetaType, payload: impl Into<Vec<u8>>) -> Self {
        let mut payload = payload.into();
        if meta_type == MetaType::EndOfTrack {
            payload.clear();
        }
        Self {
            meta_type: meta_type.into(),
            payload,
        }
    }

    /// `FF 2F 00`
    pub fn end_of_track() -> Self {
        Self::known(MetaType::EndOfTrack, Vec::<u8>::new())
    }

    /// `FF 51 03 tttttt`
    pub fn set_tempo(tempo: Tempo) -> Self {
        Self::known(MetaType::SetTempo, tempo.to_bytes())
    }

    /// The raw type byte
    pub const fn meta_type(&self) -> u8 {
        self.meta_type
    }

    /// The type, if it is one with a defined meaning
    pub fn known_type(&self) -> Option<MetaType> {
        MetaType::try_from(self.meta_type).ok()
    }

    /// The payload bytes
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// True for `FF 2F 00`. The constructors keep End-of-Track payloads empty.
    pub fn is_end_of_track(&self) -> bool {
        self.meta_type == u8::from(MetaType::EndOfTrack)
    }

    /// The tempo of a Set-Tempo event.
    ///
    /// `None` if this is another type or the payload is not three bytes.
    pub fn tempo(&self) -> Option<Tempo> {
        if self.meta_type != u8::from(MetaType::SetTempo) {
            return None;
        }
        Tempo::from_payload(&self.payload)
    }
}

#[test]
fn meta_types() {
    use pretty_assertions::assert_eq;
    let tempo = MetaMessage::set_tempo(Tempo::new(400_000));
    assert_eq!(tempo.known_type(), Some(MetaType::SetTempo));
    assert_eq!(tempo.tempo(), Some(Tempo::new(400_000)));
    assert!(MetaMessage::end_of_track().is_end_of_track());
    assert_eq!(MetaMessage::new(0x60, Vec::<u8>::new()).unwrap().known_type(), None);
    assert_eq!(
        MetaMessage::new(0x80, Vec::<u8>::new()).unwrap_err(),
        MessageError::InvalidMetaType(0x80)
    );
}

#[test]
fn end_of_track_has_no_payload() {
    use pretty_assertions::assert_eq;
    assert_eq!(
        MetaMessage::new(0x2F, [0u8]).unwrap_err(),
        MessageError::EndOfTrackPayload(1)
    );
    assert!(MetaMessage::new(0x2F, Vec::<u8>::new()).unwrap().is_end_of_track());
    let normalized = MetaMessage::known(MetaType::EndOfTrack, [1u8, 2]);
    assert_eq!(normalized, MetaMessage::end_of_track());
}
