#![doc = r#"
Reading Standard MIDI Files

[`Reader`] is a bounded forward cursor over a byte slice. It always reports
absolute offsets into the original buffer, including when it has been split
into a sub-reader for a single chunk, so every [`ReaderError`] points at the
exact byte that could not be read.

The decoding entry points are [`MidiFile::parse`](crate::file::MidiFile::parse)
and [`MidiFile::parse_with`](crate::file::MidiFile::parse_with).
"#]

mod error;
pub use error::*;

mod chunk;
pub(crate) use chunk::read_file;

mod track;

#[doc = r#"
Options controlling how strictly a file is decoded.

The default is strict: a track chunk without an End-of-Track event is an error.
"#]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParseOptions {
    /// Append a synthesized End-of-Track event to tracks that lack one
    /// instead of failing with [`ReaderErrorKind::MissingEndOfTrack`].
    ///
    /// Events truncated by the chunk boundary are still an error.
    pub lenient_end_of_track: bool,
}

impl ParseOptions {
    /// Strict decoding
    pub const fn strict() -> Self {
        Self {
            lenient_end_of_track: false,
        }
    }
    /// Decoding that synthesizes missing End-of-Track events
    pub const fn lenient() -> Self {
        Self {
            lenient_end_of_track: true,
        }
    }
}

/// A bounded forward reader over a byte buffer
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    end: usize,
}

impl<'a> Reader<'a> {
    /// Create a reader over the whole slice
    pub const fn from_byte_slice(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            end: buf.len(),
        }
    }

    /// The absolute offset of the next byte to be read
    #[inline]
    pub const fn buffer_position(&self) -> usize {
        self.pos
    }

    /// The absolute offset one past the last readable byte
    #[inline]
    pub const fn end_position(&self) -> usize {
        self.end
    }

    /// Bytes left before the bound
    #[inline]
    pub const fn remaining(&self) -> usize {
        self.end - self.pos
    }

    /// True when nothing is left to read
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.pos >= self.end
    }

    /// Look at the next byte without consuming it
    #[inline]
    pub fn peek_u8(&self) -> Option<u8> {
        if self.is_empty() {
            None
        } else {
            Some(self.buf[self.pos])
        }
    }

    /// Read a single byte
    pub fn read_u8(&mut self) -> ReadResult<u8> {
        let byte = self.peek_u8().ok_or(ReaderError::oob(self.pos))?;
        self.pos += 1;
        Ok(byte)
    }

    /// Read `len` bytes, borrowing them from the underlying buffer
    pub fn read_slice(&mut self, len: usize) -> ReadResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(ReaderError::oob(self.pos));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Read exactly `N` bytes into an array
    pub fn read_exact<const N: usize>(&mut self) -> ReadResult<[u8; N]> {
        let start = self.pos;
        let slice = self.read_slice(N)?;
        slice.try_into().map_err(|_| ReaderError::oob(start))
    }

    /// Read a big-endian u16
    pub fn read_u16_be(&mut self) -> ReadResult<u16> {
        self.read_exact().map(u16::from_be_bytes)
    }

    /// Read a big-endian u32
    pub fn read_u32_be(&mut self) -> ReadResult<u32> {
        self.read_exact().map(u32::from_be_bytes)
    }

    /// Split off the next `len` bytes as a reader of their own and advance past them.
    ///
    /// The returned reader keeps reporting absolute offsets.
    pub fn split_to(&mut self, len: usize) -> ReadResult<Reader<'a>> {
        if len > self.remaining() {
            return Err(ReaderError::oob(self.pos));
        }
        let sub = Reader {
            buf: self.buf,
            pos: self.pos,
            end: self.pos + len,
        };
        self.pos += len;
        Ok(sub)
    }
}

#[test]
fn reader_tracks_absolute_positions() {
    use pretty_assertions::assert_eq;
    let bytes = [0x00, 0x01, 0x02, 0x03, 0x04, 0x05];
    let mut reader = Reader::from_byte_slice(&bytes);
    assert_eq!(reader.read_u8().unwrap(), 0x00);

    let mut sub = reader.split_to(3).unwrap();
    assert_eq!(reader.buffer_position(), 4);
    assert_eq!(sub.read_u16_be().unwrap(), 0x0102);
    assert_eq!(sub.buffer_position(), 3);

    let err = sub.read_u16_be().unwrap_err();
    assert!(err.is_out_of_bounds());
    assert_eq!(err.position(), 3);

    assert_eq!(reader.read_exact::<2>().unwrap(), [0x04, 0x05]);
    assert!(reader.is_empty());
    assert_eq!(reader.read_u8().unwrap_err().position(), 6);
}
