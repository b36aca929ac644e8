use maxmidi::prelude::*;
use maxmidi::reader::HeaderError;
use pretty_assertions::assert_eq;

/// Assemble a file from a header and raw chunks. The track count is the
/// number of `MTrk` chunks.
fn smf(format: u16, division: u16, chunks: &[(&[u8; 4], &[u8])]) -> Vec<u8> {
    let tracks = chunks.iter().filter(|(tag, _)| *tag == b"MTrk").count() as u16;
    let mut bytes = b"MThd\0\0\0\x06".to_vec();
    bytes.extend(format.to_be_bytes());
    bytes.extend(tracks.to_be_bytes());
    bytes.extend(division.to_be_bytes());
    for (tag, body) in chunks {
        bytes.extend(*tag);
        bytes.extend((body.len() as u32).to_be_bytes());
        bytes.extend(*body);
    }
    bytes
}

const EOT: [u8; 4] = [0x00, 0xFF, 0x2F, 0x00];

#[test]
fn decode_running_status_track() {
    let body = [
        0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, // tempo 500000
        0x00, 0x90, 0x3C, 0x64, //
        0x60, 0x3C, 0x00, // running status
        0x00, 0x80, 0x3C, 0x40, //
        0x00, 0xFF, 0x2F, 0x00,
    ];
    let file = MidiFile::parse(&smf(0, 96, &[(b"MTrk", &body)])).unwrap();

    assert_eq!(file.format_type(), FormatType::SingleMultiChannel);
    assert_eq!(file.timing().ticks_per_quarter_note(), 96);
    let track = &file.tracks()[0];
    assert_eq!(track.len(), 5);
    assert_eq!(track.duration_ticks(), 96);

    let statuses: Vec<u8> = track
        .events()
        .iter()
        .filter_map(|e| match e.message() {
            TrackMessage::Channel(c) => Some(c.status()),
            _ => None,
        })
        .collect();
    assert_eq!(statuses, [0x90, 0x90, 0x80]);

    let TrackMessage::Meta(meta) = track.events()[0].message() else {
        panic!("expected a tempo event");
    };
    assert_eq!(meta.tempo(), Some(Tempo::new(500_000)));
}

#[test]
fn missing_end_of_track_reports_last_chunk_byte() {
    let bytes = smf(1, 480, &[(b"MTrk", &[0x00, 0x90, 0x3C, 0x64])]);
    let err = MidiFile::parse(&bytes).unwrap_err();
    assert_eq!(err.error_kind(), &ReaderErrorKind::MissingEndOfTrack);
    assert_eq!(err.position(), bytes.len() - 1);

    let file = MidiFile::parse_with(&bytes, ParseOptions::lenient()).unwrap();
    let track = &file.tracks()[0];
    assert_eq!(track.len(), 2);
    assert!(track.events()[1].is_end_of_track());
}

#[test]
fn lenient_mode_still_rejects_truncated_events() {
    let bytes = smf(1, 480, &[(b"MTrk", &[0x00, 0x90, 0x3C])]);
    let err = MidiFile::parse_with(&bytes, ParseOptions::lenient()).unwrap_err();
    assert_eq!(err.error_kind(), &ReaderErrorKind::TruncatedTrack);
}

#[test]
fn unknown_chunks_are_skipped() {
    let bytes = smf(
        1,
        480,
        &[
            (b"XFIH", &[1, 2, 3]),
            (b"MTrk", &EOT),
            (b"XFKM", &[]),
            (b"MTrk", &EOT),
        ],
    );
    let file = MidiFile::parse(&bytes).unwrap();
    assert_eq!(file.tracks().len(), 2);
}

#[test]
fn trailing_bytes_after_last_track_are_ignored() {
    let mut bytes = smf(0, 96, &[(b"MTrk", &EOT)]);
    bytes.extend([0xDE, 0xAD]);
    assert_eq!(MidiFile::parse(&bytes).unwrap().tracks().len(), 1);
}

#[test]
fn chunk_longer_than_file_is_truncated() {
    let mut bytes = smf(0, 96, &[(b"MTrk", &EOT)]);
    // claim ten body bytes where there are four
    bytes[21] = 10;
    let err = MidiFile::parse(&bytes).unwrap_err();
    assert_eq!(err, ReaderError::new(14, ReaderErrorKind::TruncatedTrack));
}

#[test]
fn declared_track_missing_from_file() {
    let mut bytes = smf(1, 96, &[(b"MTrk", &EOT)]);
    // header promises two tracks
    bytes[11] = 2;
    let err = MidiFile::parse(&bytes).unwrap_err();
    assert_eq!(err.error_kind(), &ReaderErrorKind::TruncatedTrack);
    assert_eq!(err.position(), bytes.len());
}

#[test]
fn overlong_delta_time() {
    let bytes = smf(0, 96, &[(b"MTrk", &[0x81, 0x80, 0x80, 0x80, 0x00, 0xFF, 0x2F, 0x00])]);
    let err = MidiFile::parse(&bytes).unwrap_err();
    assert_eq!(err, ReaderError::new(22, ReaderErrorKind::MalformedVlq));
}

#[test]
fn largest_delta_time() {
    let bytes = smf(0, 96, &[(b"MTrk", &[0xFF, 0xFF, 0xFF, 0x7F, 0xFF, 0x2F, 0x00])]);
    let file = MidiFile::parse(&bytes).unwrap();
    assert_eq!(file.tracks()[0].events()[0].delta_ticks(), 0x0FFF_FFFF);
}

#[test]
fn unsupported_divisions() {
    let err = MidiFile::parse(&smf(1, 0xE250, &[(b"MTrk", &EOT)])).unwrap_err();
    assert_eq!(err, ReaderError::header(12, HeaderError::Smpte(0xE250)));

    let err = MidiFile::parse(&smf(1, 0, &[(b"MTrk", &EOT)])).unwrap_err();
    assert_eq!(err, ReaderError::header(12, HeaderError::ZeroDivision));
}

#[test]
fn empty_input() {
    let err = MidiFile::parse(&[]).unwrap_err();
    assert_eq!(err, ReaderError::header(0, HeaderError::Truncated));
}

#[test]
fn sysex_and_escape_payloads() {
    let body = [
        0x00, 0xF0, 0x05, 0x7E, 0x7F, 0x09, 0x01, 0xF7, // GM reset
        0x00, 0xF7, 0x02, 0xF3, 0x01, // escaped song select
        0x00, 0xFF, 0x2F, 0x00,
    ];
    let file = MidiFile::parse(&smf(0, 96, &[(b"MTrk", &body)])).unwrap();
    let events = file.tracks()[0].events();

    let TrackMessage::SysEx(sysex) = events[0].message() else {
        panic!("expected sysex");
    };
    assert_eq!(sysex.kind(), SysExKind::Start);
    assert!(sysex.is_complete());
    assert_eq!(sysex.payload(), &[0x7E, 0x7F, 0x09, 0x01, 0xF7]);

    let TrackMessage::SysEx(escape) = events[1].message() else {
        panic!("expected escape");
    };
    assert_eq!(escape.kind(), SysExKind::Escape);
    assert_eq!(escape.payload(), &[0xF3, 0x01]);
}
