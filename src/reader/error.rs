use thiserror::Error;

#[doc = r#"
A set of errors that can occur while reading bytes into a [`MidiFile`](crate::file::MidiFile)

Every error carries the absolute byte offset into the input buffer where it
was detected.
"#]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Reading at Position {position}, {kind}")]
pub struct ReaderError {
    position: usize,
    pub(crate) kind: ReaderErrorKind,
}

/// A kind of error that a reader can produce
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReaderErrorKind {
    /// The header chunk is missing or malformed
    #[error("Bad header: {0}")]
    BadHeader(#[from] HeaderError),
    /// A track chunk ended (or the file ended) before an event was complete
    #[error("Track chunk is truncated")]
    TruncatedTrack,
    /// A variable-length quantity did not terminate within four bytes
    #[error("Variable-length quantity is longer than four bytes")]
    MalformedVlq,
    /// The chunk boundary was reached without an End-of-Track meta event.
    ///
    /// Reported at the offset of the chunk's final byte, or at the start of
    /// the chunk body if it is empty.
    #[error("Track chunk has no End-of-Track event")]
    MissingEndOfTrack,
    /// An End-of-Track meta event with a non-empty payload. Reported at the
    /// offset of its length.
    #[error("End-of-Track has a payload of {0} bytes")]
    InvalidEndOfTrack(usize),
    /// A data byte appeared where a status byte was expected, with no
    /// previous channel status to reuse
    #[error("Data byte without a running status")]
    MissingRunningStatus,
    /// A channel event data byte had its high bit set
    #[error("Invalid data byte {0:#04X}")]
    InvalidDataByte(u8),
    /// A status byte that cannot appear in a track chunk
    #[error("Unexpected status byte {0:#04X}")]
    UnexpectedStatus(u8),
    /// A meta event type above 0x7F
    #[error("Invalid meta event type {0:#04X}")]
    InvalidMetaType(u8),
    /// Reading out of bounds.
    #[error("Read out of bounds!")]
    OutOfBounds,
}

/// Errors found in the `MThd` header chunk
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HeaderError {
    /// The file does not start with `MThd`
    #[error("expected `MThd` tag, found {0:02X?}")]
    Tag([u8; 4]),
    /// The header chunk length is not 6
    #[error("header length must be 6, found {0}")]
    Length(u32),
    /// The file ends inside the header chunk
    #[error("file ends inside the header chunk")]
    Truncated,
    /// The format field is not 0, 1 or 2
    #[error("unknown format {0}")]
    Format(u16),
    /// The division uses SMPTE timing
    #[error("SMPTE division {0:#06X} is not supported")]
    Smpte(u16),
    /// The division is zero ticks per quarter note
    #[error("division of zero ticks per quarter note")]
    ZeroDivision,
    /// A format 0 file that does not declare exactly one track
    #[error("format 0 file declares {0} tracks")]
    SingleTrackCount(u16),
}

impl ReaderError {
    /// Create a reader error from a position and kind
    pub const fn new(position: usize, kind: ReaderErrorKind) -> Self {
        Self { position, kind }
    }
    /// True if out of bounds or unexpected end of file
    pub const fn is_out_of_bounds(&self) -> bool {
        matches!(self.kind, ReaderErrorKind::OutOfBounds)
    }
    /// Returns the error kind of the reader.
    pub fn error_kind(&self) -> &ReaderErrorKind {
        &self.kind
    }
    /// Returns the position where the read error occurred.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Create a new header error
    pub const fn header(position: usize, error: HeaderError) -> Self {
        Self {
            position,
            kind: ReaderErrorKind::BadHeader(error),
        }
    }

    /// Create a new out of bounds error
    pub const fn oob(position: usize) -> Self {
        Self {
            position,
            kind: ReaderErrorKind::OutOfBounds,
        }
    }

    /// Reinterpret an out of bounds read as the given kind, keeping the position.
    pub(crate) fn oob_as(self, kind: ReaderErrorKind) -> Self {
        if self.is_out_of_bounds() {
            Self {
                position: self.position,
                kind,
            }
        } else {
            self
        }
    }
}

/// The Read Result type (see [`ReaderError`])
pub type ReadResult<T> = Result<T, ReaderError>;
