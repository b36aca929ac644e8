use super::{ParseOptions, ReadResult, Reader, ReaderError, ReaderErrorKind, track::read_track};
use crate::{prelude::*, reader::HeaderError};

const HEADER_TAG: &[u8; 4] = b"MThd";
const TRACK_TAG: &[u8; 4] = b"MTrk";
const HEADER_LEN: u32 = 6;

/// The 8 bytes that open every chunk
struct ChunkHeader {
    tag: [u8; 4],
    len: usize,
}

impl ChunkHeader {
    fn read(reader: &mut Reader<'_>) -> ReadResult<Self> {
        let tag = reader.read_exact::<4>()?;
        let len = reader.read_u32_be()? as usize;
        Ok(Self { tag, len })
    }
}

struct Header {
    format: FormatType,
    track_count: u16,
    timing: Timing,
}

fn read_header(reader: &mut Reader<'_>) -> ReadResult<Header> {
    let truncated = |e: ReaderError| e.oob_as(HeaderError::Truncated.into());

    let tag = reader.read_exact::<4>().map_err(truncated)?;
    if &tag != HEADER_TAG {
        return Err(ReaderError::header(0, HeaderError::Tag(tag)));
    }

    let len_pos = reader.buffer_position();
    let len = reader.read_u32_be().map_err(truncated)?;
    if len != HEADER_LEN {
        return Err(ReaderError::header(len_pos, HeaderError::Length(len)));
    }

    let format_pos = reader.buffer_position();
    let raw_format = reader.read_u16_be().map_err(truncated)?;
    let format = FormatType::try_from(raw_format)
        .map_err(|_| ReaderError::header(format_pos, HeaderError::Format(raw_format)))?;

    let count_pos = reader.buffer_position();
    let track_count = reader.read_u16_be().map_err(truncated)?;
    if format == FormatType::SingleMultiChannel && track_count != 1 {
        return Err(ReaderError::header(
            count_pos,
            HeaderError::SingleTrackCount(track_count),
        ));
    }

    let division_pos = reader.buffer_position();
    let division = reader.read_u16_be().map_err(truncated)?;
    let timing =
        Timing::from_division(division).map_err(|e| ReaderError::header(division_pos, e))?;

    tracing::debug!(
        "MIDI header: format {:?}, {} tracks, {} ticks per quarter note",
        format,
        track_count,
        timing.ticks_per_quarter_note()
    );

    Ok(Header {
        format,
        track_count,
        timing,
    })
}

/// Decode a whole file.
///
/// Chunks that are not `MTrk` are skipped. Anything after the last declared
/// track is ignored.
pub(crate) fn read_file(bytes: &[u8], options: ParseOptions) -> ReadResult<MidiFile> {
    let mut reader = Reader::from_byte_slice(bytes);
    let header = read_header(&mut reader)?;

    let truncated = |e: ReaderError| e.oob_as(ReaderErrorKind::TruncatedTrack);

    let mut tracks = Vec::with_capacity(header.track_count as usize);
    while tracks.len() < header.track_count as usize {
        let chunk_pos = reader.buffer_position();
        let chunk = ChunkHeader::read(&mut reader).map_err(truncated)?;
        let body = reader
            .split_to(chunk.len)
            .map_err(|_| ReaderError::new(chunk_pos, ReaderErrorKind::TruncatedTrack))?;

        if &chunk.tag != TRACK_TAG {
            tracing::debug!(
                "Skipping unknown chunk {:02X?} of {} bytes at offset {}",
                chunk.tag,
                chunk.len,
                chunk_pos
            );
            continue;
        }

        tracks.push(read_track(body, options)?);
    }

    if !reader.is_empty() {
        tracing::debug!(
            "Ignoring {} bytes after the last track",
            reader.remaining()
        );
    }

    Ok(MidiFile::from_parts_unchecked(
        header.format,
        header.timing,
        tracks,
    ))
}

#[test]
fn header_errors() {
    use pretty_assertions::assert_eq;
    let err = read_file(b"RIFF\0\0\0\x06\0\0\0\x01\0\x60", ParseOptions::strict()).unwrap_err();
    assert_eq!(
        err,
        ReaderError::header(0, HeaderError::Tag(*b"RIFF"))
    );

    let err = read_file(b"MThd\0\0\0\x08\0\0\0\x01\0\x60", ParseOptions::strict()).unwrap_err();
    assert_eq!(err, ReaderError::header(4, HeaderError::Length(8)));

    let err = read_file(b"MThd\0\0\0\x06\0\x03\0\x01\0\x60", ParseOptions::strict()).unwrap_err();
    assert_eq!(err, ReaderError::header(8, HeaderError::Format(3)));

    let err = read_file(b"MThd\0\0\0\x06\0\0\0\x02\0\x60", ParseOptions::strict()).unwrap_err();
    assert_eq!(err, ReaderError::header(10, HeaderError::SingleTrackCount(2)));

    let err = read_file(b"MThd\0\0\0\x06\0\x01\0\x01\xE7\x28", ParseOptions::strict()).unwrap_err();
    assert_eq!(err, ReaderError::header(12, HeaderError::Smpte(0xE728)));

    let err = read_file(b"MThd\0\0\0\x06\0\x01", ParseOptions::strict()).unwrap_err();
    assert_eq!(err, ReaderError::header(10, HeaderError::Truncated));
}
