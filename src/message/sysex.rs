use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::prelude::*;

/// The prefix byte of a system exclusive event in a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum SysExKind {
    /// `F0 len data`: a system exclusive message, or the first packet of one
    Start = 0xF0,
    /// `F7 len data`: a continuation packet, or an escape carrying arbitrary bytes
    Escape = 0xF7,
}

#[doc = r#"
A system exclusive event as stored in a track.

For [`SysExKind::Start`] the leading `F0` is implied and is not part of the
payload. The message is complete when the payload ends with `F7`; otherwise
more packets follow as [`SysExKind::Escape`] events.
"#]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SysExMessage {
    kind: SysExKind,
    payload: Vec<u8>,
}

impl SysExMessage {
    /// Create a system exclusive event
    pub fn new(kind: SysExKind, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    /// `F0` or `F7`
    pub const fn kind(&self) -> SysExKind {
        self.kind
    }

    /// The bytes after the length
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// True unless this is an `F0` packet whose payload does not end with `F7`
    pub fn is_complete(&self) -> bool {
        match self.kind {
            SysExKind::Start => self.payload.last() == Some(&0xF7),
            SysExKind::Escape => true,
        }
    }

    /// The bytes to send to a port. `F0` packets get their prefix back.
    pub fn live_bytes(&self) -> Vec<u8> {
        match self.kind {
            SysExKind::Start => {
                let mut bytes = Vec::with_capacity(self.payload.len() + 1);
                bytes.push(u8::from(SysExKind::Start));
                bytes.extend_from_slice(&self.payload);
                bytes
            }
            SysExKind::Escape => self.payload.clone(),
        }
    }
}

#[test]
fn sysex_completion() {
    use pretty_assertions::assert_eq;
    let whole = SysExMessage::new(SysExKind::Start, [0x43u8, 0x12, 0x00, 0xF7]);
    assert!(whole.is_complete());
    assert_eq!(whole.live_bytes(), [0xF0, 0x43, 0x12, 0x00, 0xF7]);

    let first = SysExMessage::new(SysExKind::Start, [0x43u8, 0x12]);
    assert!(!first.is_complete());
    assert!(SysExMessage::new(SysExKind::Escape, [0x00u8, 0xF7]).is_complete());
}
