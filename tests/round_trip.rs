use maxmidi::prelude::*;
use pretty_assertions::assert_eq;

fn conductor() -> Track {
    let mut track = Track::default();
    track
        .name(0, "conductor")
        .tempo(0, Tempo::from_bpm(100.))
        .key_signature(0, -3, true)
        .time_signature(0, 6, 8)
        .unwrap()
        .tempo(1920, Tempo::from_bpm(140.))
        .end(0);
    track
}

fn part(channel: u8, program: u8, notes: &[u8]) -> Track {
    let ch = Channel::new(channel).unwrap();
    let mut track = Track::default();
    track
        .program_change(0, ch, program)
        .unwrap()
        .control_change(0, ch, 7, 100)
        .unwrap();
    for &note in notes {
        track
            .note_on(0, ch, note, 90)
            .unwrap()
            .note_off(240, ch, note, 0)
            .unwrap();
    }
    track.end(0);
    track
}

fn gm_reset() -> TrackEvent {
    TrackEvent::new(0, SysExMessage::new(SysExKind::Start, [0x7Eu8, 0x7F, 0x09, 0x01, 0xF7]))
}

#[test]
fn simultaneous_file_round_trips() {
    let mut piano = part(0, 0, &[60, 64, 67]);
    piano.push(gm_reset());
    let file = MidiFile::new(
        FormatType::Simultaneous,
        Timing::new(480).unwrap(),
        vec![conductor(), piano, part(9, 0, &[36, 38, 36, 38])],
    )
    .unwrap();

    let bytes = file.to_bytes().unwrap();
    let parsed = MidiFile::parse(&bytes).unwrap();
    assert_eq!(parsed, file);
    assert_eq!(parsed.to_bytes().unwrap(), bytes);
}

#[test]
fn single_track_file_round_trips() {
    let mut track = part(2, 33, &[40, 43]);
    track.push(TrackEvent::new(
        5,
        SysExMessage::new(SysExKind::Escape, [0xF3u8, 0x01]),
    ));
    let file = MidiFile::new(
        FormatType::SingleMultiChannel,
        Timing::new(96).unwrap(),
        vec![track],
    )
    .unwrap();

    let bytes = file.to_bytes().unwrap();
    assert_eq!(&bytes[8..14], &[0, 0, 0, 1, 0, 96]);
    assert_eq!(MidiFile::parse(&bytes).unwrap(), file);
}

#[test]
fn independent_file_round_trips() {
    let file = MidiFile::new(
        FormatType::SequentiallyIndependent,
        Timing::new(960).unwrap(),
        vec![conductor(), part(0, 1, &[72]), conductor()],
    )
    .unwrap();
    let bytes = file.to_bytes().unwrap();
    assert_eq!(MidiFile::parse(&bytes).unwrap(), file);
}

#[test]
fn hand_written_bytes_are_reproduced() {
    let bytes = [
        b'M', b'T', b'h', b'd', 0, 0, 0, 6, 0, 1, 0, 2, 0x01, 0xE0, //
        b'M', b'T', b'r', b'k', 0, 0, 0, 11, //
        0x00, 0xFF, 0x51, 0x03, 0x09, 0x27, 0xC0, // 600000 µs
        0x00, 0xFF, 0x2F, 0x00, //
        b'M', b'T', b'r', b'k', 0, 0, 0, 19, //
        0x00, 0xB3, 0x40, 0x7F, // sustain on
        0x00, 0x93, 0x30, 0x50, //
        0x83, 0x60, 0x30, 0x00, // running status, delta 480
        0x00, 0x40, 0x00, // still running status
        0x00, 0xFF, 0x2F, 0x00,
    ];
    let file = MidiFile::parse(&bytes).unwrap();
    assert_eq!(file.tracks()[1].duration_ticks(), 480);
    assert_eq!(file.to_bytes().unwrap(), bytes);
}

#[test]
fn missing_end_of_track_is_added_on_write() {
    let ch = Channel::new(0).unwrap();
    let mut track = Track::default();
    track.note_on(10, ch, 60, 1).unwrap();
    assert!(!track.has_end_of_track());

    let file = MidiFile::new(FormatType::Simultaneous, Timing::new(96).unwrap(), vec![track]).unwrap();
    let parsed = MidiFile::parse(&file.to_bytes().unwrap()).unwrap();
    let events = parsed.tracks()[0].events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1], TrackEvent::end_of_track(0));
}

#[test]
fn track_count_is_taken_from_tracks() {
    let mut file = MidiFile::new(FormatType::Simultaneous, Timing::new(96).unwrap(), Vec::new()).unwrap();
    assert_eq!(&file.to_bytes().unwrap()[10..12], &[0, 0]);

    file.push_track(conductor()).unwrap();
    file.push_track(part(1, 2, &[50])).unwrap();
    let bytes = file.to_bytes().unwrap();
    assert_eq!(&bytes[10..12], &[0, 2]);
    assert_eq!(MidiFile::parse(&bytes).unwrap().tracks().len(), 2);
}

#[test]
fn too_many_tracks() {
    let tracks = vec![Track::default(); 65_536];
    let file = MidiFile::new(FormatType::Simultaneous, Timing::new(96).unwrap(), tracks).unwrap();
    assert_eq!(file.to_bytes().unwrap_err(), WriteError::TooManyTracks(65_536));

    let mut out = Vec::new();
    let err = file.write_to(&mut out).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    assert!(out.is_empty());
}

#[test]
fn write_to_matches_to_bytes() {
    let file = MidiFile::new(
        FormatType::SingleMultiChannel,
        Timing::new(480).unwrap(),
        vec![conductor()],
    )
    .unwrap();
    let mut out = Vec::new();
    file.write_to(&mut out).unwrap();
    assert_eq!(out, file.to_bytes().unwrap());
}
