use super::{ParseOptions, ReadResult, Reader, ReaderError, ReaderErrorKind};
use crate::{prelude::*, vlq};

const META: u8 = 0xFF;

/// Decode the body of one `MTrk` chunk.
///
/// `body` is bounded to the chunk, so any read past its end is a truncated
/// track. Running status lives in a local threaded through the loop.
pub(super) fn read_track(mut body: Reader<'_>, options: ParseOptions) -> ReadResult<Track> {
    let truncated = |e: ReaderError| e.oob_as(ReaderErrorKind::TruncatedTrack);

    let start = body.buffer_position();
    let mut events = Vec::new();
    let mut running_status: Option<u8> = None;

    while !body.is_empty() {
        let (delta_ticks, _) = vlq::decode(&mut body).map_err(truncated)?;
        let (message, next_status) = read_message(&mut body, running_status).map_err(truncated)?;
        running_status = next_status;

        let event = TrackEvent::new(delta_ticks, message);
        let is_end = event.is_end_of_track();
        events.push(event);

        if is_end {
            if !body.is_empty() {
                tracing::warn!(
                    "Ignoring {} bytes after End-of-Track at offset {}",
                    body.remaining(),
                    body.buffer_position()
                );
            }
            return Ok(Track::new(events));
        }
    }

    if options.lenient_end_of_track {
        tracing::warn!(
            "Track chunk ending at offset {} has no End-of-Track, appending one",
            body.end_position()
        );
        events.push(TrackEvent::end_of_track(0));
        return Ok(Track::new(events));
    }

    // the chunk's final byte, or its start if it has none
    let last_byte = body.end_position().saturating_sub(1).max(start);
    Err(ReaderError::new(last_byte, ReaderErrorKind::MissingEndOfTrack))
}

/// Decode the message after a delta-time.
///
/// Returns the message and the running status to use for the next event.
fn read_message(
    reader: &mut Reader<'_>,
    running_status: Option<u8>,
) -> ReadResult<(TrackMessage, Option<u8>)> {
    let status_pos = reader.buffer_position();
    let first = reader.peek_u8().ok_or(ReaderError::oob(status_pos))?;

    // a data byte here reuses the previous channel status
    let status = if first & 0x80 == 0 {
        running_status.ok_or(ReaderError::new(
            status_pos,
            ReaderErrorKind::MissingRunningStatus,
        ))?
    } else {
        reader.read_u8()?
    };

    match status {
        0x80..=0xEF => {
            let msg = read_channel(reader, status)?;
            Ok((TrackMessage::Channel(msg), Some(status)))
        }
        META => {
            let type_pos = reader.buffer_position();
            let meta_type = reader.read_u8()?;
            let len_pos = reader.buffer_position();
            let payload = read_payload(reader)?;
            if meta_type == u8::from(MetaType::EndOfTrack) && !payload.is_empty() {
                return Err(ReaderError::new(
                    len_pos,
                    ReaderErrorKind::InvalidEndOfTrack(payload.len()),
                ));
            }
            let meta = MetaMessage::new(meta_type, payload).map_err(|_| {
                ReaderError::new(type_pos, ReaderErrorKind::InvalidMetaType(meta_type))
            })?;
            Ok((TrackMessage::Meta(meta), None))
        }
        0xF0 | 0xF7 => {
            let kind = if status == 0xF0 {
                SysExKind::Start
            } else {
                SysExKind::Escape
            };
            let payload = read_payload(reader)?;
            Ok((TrackMessage::SysEx(SysExMessage::new(kind, payload)), None))
        }
        other => Err(ReaderError::new(
            status_pos,
            ReaderErrorKind::UnexpectedStatus(other),
        )),
    }
}

fn read_channel(reader: &mut Reader<'_>, status: u8) -> ReadResult<ChannelMessage> {
    let kind = VoiceKind::try_from(status >> 4)
        .map_err(|_| ReaderError::new(reader.buffer_position(), ReaderErrorKind::UnexpectedStatus(status)))?;
    let data_pos = reader.buffer_position();
    let data = reader.read_slice(kind.data_len())?;
    ChannelMessage::from_parts(kind, Channel::from_status(status), data).map_err(|_| {
        let (offset, byte) = data
            .iter()
            .enumerate()
            .find(|(_, b)| **b > 0x7F)
            .map(|(i, b)| (data_pos + i, *b))
            .unwrap_or((data_pos, data[0]));
        ReaderError::new(offset, ReaderErrorKind::InvalidDataByte(byte))
    })
}

fn read_payload<'a>(reader: &mut Reader<'a>) -> ReadResult<&'a [u8]> {
    let (len, _) = vlq::decode(reader)?;
    reader.read_slice(len as usize)
}

#[cfg(test)]
fn track_body(bytes: &[u8]) -> ReadResult<Track> {
    read_track(Reader::from_byte_slice(bytes), ParseOptions::strict())
}

#[test]
fn running_status_reuses_channel_status() {
    use pretty_assertions::assert_eq;
    let track = track_body(&[
        0x00, 0x90, 0x3C, 0x64, // note on 60
        0x0A, 0x3E, 0x64, // note on 62, running status
        0x00, 0xFF, 0x2F, 0x00,
    ])
    .unwrap();

    let second = &track.events()[1];
    assert_eq!(second.delta_ticks(), 10);
    let TrackMessage::Channel(msg) = second.message() else {
        panic!("expected a channel event");
    };
    assert_eq!(msg.status(), 0x90);
    assert_eq!(msg.data(), &[62, 100]);
}

#[test]
fn meta_and_sysex_cancel_running_status() {
    use pretty_assertions::assert_eq;
    let err = track_body(&[
        0x00, 0x90, 0x3C, 0x64, //
        0x00, 0xF0, 0x02, 0x7E, 0xF7, // sysex
        0x00, 0x3E, 0x64, // data byte with no status
    ])
    .unwrap_err();
    assert_eq!(err, ReaderError::new(10, ReaderErrorKind::MissingRunningStatus));
}

#[test]
fn one_data_byte_statuses() {
    use pretty_assertions::assert_eq;
    let track = track_body(&[
        0x00, 0xC2, 0x05, // program change
        0x00, 0x06, // running status
        0x00, 0xD2, 0x40, // channel pressure
        0x00, 0xFF, 0x2F, 0x00,
    ])
    .unwrap();
    let lens: Vec<usize> = track
        .events()
        .iter()
        .filter_map(|e| match e.message() {
            TrackMessage::Channel(c) => Some(c.data().len()),
            _ => None,
        })
        .collect();
    assert_eq!(lens, [1, 1, 1]);
}

#[test]
fn track_errors_carry_offsets() {
    use pretty_assertions::assert_eq;
    // note on cut short by the chunk boundary
    let err = track_body(&[0x00, 0x90, 0x3C]).unwrap_err();
    assert_eq!(err, ReaderError::new(2, ReaderErrorKind::TruncatedTrack));

    // meta payload longer than the chunk
    let err = track_body(&[0x00, 0xFF, 0x01, 0x05, b'a']).unwrap_err();
    assert_eq!(err, ReaderError::new(4, ReaderErrorKind::TruncatedTrack));

    let err = track_body(&[0x00, 0x90, 0x80, 0x40]).unwrap_err();
    assert_eq!(err, ReaderError::new(2, ReaderErrorKind::InvalidDataByte(0x80)));

    let err = track_body(&[0x00, 0xF8]).unwrap_err();
    assert_eq!(err, ReaderError::new(1, ReaderErrorKind::UnexpectedStatus(0xF8)));

    let err = track_body(&[0x00, 0xFF, 0x80, 0x00]).unwrap_err();
    assert_eq!(err, ReaderError::new(2, ReaderErrorKind::InvalidMetaType(0x80)));

    let err = track_body(&[0xFF, 0xFF, 0xFF, 0xFF, 0x00]).unwrap_err();
    assert_eq!(err, ReaderError::new(0, ReaderErrorKind::MalformedVlq));
}

#[test]
fn missing_end_of_track() {
    use pretty_assertions::assert_eq;
    let body = [0x00, 0x90, 0x3C, 0x64];
    let err = track_body(&body).unwrap_err();
    assert_eq!(err, ReaderError::new(3, ReaderErrorKind::MissingEndOfTrack));

    let err = track_body(&[]).unwrap_err();
    assert_eq!(err, ReaderError::new(0, ReaderErrorKind::MissingEndOfTrack));

    let track = read_track(Reader::from_byte_slice(&body), ParseOptions::lenient()).unwrap();
    assert_eq!(track.len(), 2);
    assert!(track.has_end_of_track());
}

#[test]
fn bytes_after_end_of_track_are_ignored() {
    use pretty_assertions::assert_eq;
    let track = track_body(&[0x00, 0xFF, 0x2F, 0x00, 0x00, 0x90, 0x3C, 0x64]).unwrap();
    assert_eq!(track.len(), 1);
}

#[test]
fn end_of_track_must_be_empty() {
    use pretty_assertions::assert_eq;
    let err = track_body(&[0x00, 0x90, 0x3C, 0x64, 0x00, 0xFF, 0x2F, 0x01, 0x00]).unwrap_err();
    assert_eq!(err, ReaderError::new(7, ReaderErrorKind::InvalidEndOfTrack(1)));

    // lenient mode only covers a missing End-of-Track
    let body = [0x00, 0xFF, 0x2F, 0x02, 0x00, 0x00];
    let err = read_track(Reader::from_byte_slice(&body), ParseOptions::lenient()).unwrap_err();
    assert_eq!(err, ReaderError::new(3, ReaderErrorKind::InvalidEndOfTrack(2)));
}
