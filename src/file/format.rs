use num_enum::{IntoPrimitive, TryFromPrimitive};

#[doc = r#"
The format field of the header chunk.

- Format 0 holds a single track carrying every channel.
- Format 1 holds tracks that play simultaneously. The first track carries the
  tempo map for all of them.
- Format 2 holds independent single-track patterns, each with its own tempo.
"#]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum FormatType {
    /// Format 0
    SingleMultiChannel = 0,
    /// Format 1
    Simultaneous = 1,
    /// Format 2
    SequentiallyIndependent = 2,
}

impl FormatType {
    /// True when the first track's tempo events govern every track
    pub const fn has_shared_tempo(&self) -> bool {
        matches!(self, Self::SingleMultiChannel | Self::Simultaneous)
    }
}
