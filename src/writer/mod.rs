#![doc = r#"
Writing Standard MIDI Files

[`Writer`] is the output counterpart of [`Reader`](crate::reader::Reader): a
growable byte buffer with big-endian integer writes, variable-length
quantities, and chunk framing whose length is patched in once the chunk body
is complete.

The encoding entry point is [`MidiFile::to_bytes`](crate::file::MidiFile::to_bytes).
"#]

mod error;
pub use error::*;

mod track;
pub(crate) use track::write_track;

use crate::{prelude::*, vlq};

/// A position returned by [`Writer::begin_chunk`], consumed by [`Writer::finish_chunk`]
#[derive(Debug)]
#[must_use = "a chunk must be finished to record its length"]
pub struct ChunkMark(usize);

/// A growable byte sink
#[derive(Debug, Default, Clone)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Create an empty writer
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Create an empty writer with room for `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Bytes written so far
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True if nothing has been written
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Append one byte
    #[inline]
    pub fn write_u8(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    /// Append a byte slice
    #[inline]
    pub fn write_all(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Append a big-endian u16
    pub fn write_u16_be(&mut self, value: u16) {
        self.write_all(&value.to_be_bytes());
    }

    /// Append a big-endian u32
    pub fn write_u32_be(&mut self, value: u32) {
        self.write_all(&value.to_be_bytes());
    }

    /// Append a variable-length quantity
    pub fn write_vlq(&mut self, value: u64) -> Result<(), WriteError> {
        let bytes = vlq::encode(value)?;
        self.write_all(&bytes);
        Ok(())
    }

    /// Write a chunk tag followed by a placeholder length
    pub fn begin_chunk(&mut self, tag: &[u8; 4]) -> ChunkMark {
        let mark = ChunkMark(self.buf.len());
        self.write_all(tag);
        self.write_u32_be(0);
        mark
    }

    /// Patch the length of a chunk started with [`Writer::begin_chunk`]
    pub fn finish_chunk(&mut self, mark: ChunkMark) -> Result<(), WriteError> {
        let body_start = mark.0 + 8;
        let body_len = self.buf.len() - body_start;
        let len = u32::try_from(body_len).map_err(|_| WriteError::ChunkTooLarge(body_len))?;
        self.buf[mark.0 + 4..body_start].copy_from_slice(&len.to_be_bytes());
        Ok(())
    }

    /// The bytes written so far
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the writer, returning its bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

pub(crate) fn write_file(file: &MidiFile) -> Result<Vec<u8>, WriteError> {
    let tracks = file.tracks();
    let track_count =
        u16::try_from(tracks.len()).map_err(|_| WriteError::TooManyTracks(tracks.len()))?;

    let mut writer = Writer::with_capacity(14 + tracks.len() * 1024);

    let header = writer.begin_chunk(b"MThd");
    writer.write_u16_be(file.format_type().into());
    writer.write_u16_be(track_count);
    writer.write_u16_be(file.timing().ticks_per_quarter_note());
    writer.finish_chunk(header)?;

    for track in tracks {
        let chunk = writer.begin_chunk(b"MTrk");
        write_track(track, &mut writer)?;
        writer.finish_chunk(chunk)?;
    }

    Ok(writer.into_bytes())
}

#[test]
fn chunk_length_is_patched() {
    use pretty_assertions::assert_eq;
    let mut writer = Writer::new();
    let mark = writer.begin_chunk(b"MTrk");
    writer.write_all(&[0x00, 0xFF, 0x2F, 0x00]);
    writer.finish_chunk(mark).unwrap();
    assert_eq!(
        writer.as_bytes(),
        &[b'M', b'T', b'r', b'k', 0, 0, 0, 4, 0x00, 0xFF, 0x2F, 0x00]
    );
}
