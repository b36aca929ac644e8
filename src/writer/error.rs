use thiserror::Error;

/// Errors produced while encoding a [`MidiFile`](crate::file::MidiFile)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WriteError {
    /// A delta-time or payload length does not fit in a four byte
    /// variable-length quantity
    #[error("{0} does not fit in a variable-length quantity")]
    ValueOutOfRange(u64),
    /// The header can count at most 65535 tracks
    #[error("{0} tracks cannot be counted by the header")]
    TooManyTracks(usize),
    /// A chunk body longer than `u32::MAX` bytes
    #[error("chunk of {0} bytes is too large")]
    ChunkTooLarge(usize),
}
