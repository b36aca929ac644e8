use maxmidi::prelude::*;
use pretty_assertions::assert_eq;

fn file_with_tempo_track(format: FormatType, tempo_track: Track, others: Vec<Track>) -> MidiFile {
    let mut tracks = vec![tempo_track];
    tracks.extend(others);
    MidiFile::new(format, Timing::new(480).unwrap(), tracks).unwrap()
}

#[test]
fn tempo_changes_accumulate() {
    let mut conductor = Track::default();
    conductor
        .tempo(0, Tempo::new(500_000))
        .tempo(480, Tempo::new(250_000))
        .end(0);
    let file = file_with_tempo_track(FormatType::Simultaneous, conductor, vec![Track::default()]);

    let map = file.tempo_map(1).unwrap();
    assert_eq!(map.ticks_to_micros(0), Micros::ZERO);
    assert_eq!(map.ticks_to_micros(480), Micros::new(500_000));
    assert_eq!(map.ticks_to_micros(960), Micros::new(750_000));
    assert_eq!(map.tempo_at(479), Tempo::new(500_000));
    assert_eq!(map.tempo_at(480), Tempo::new(250_000));

    assert_eq!(map.micros_to_ticks(Micros::new(500_000)), 480);
    assert_eq!(map.micros_to_ticks(Micros::new(750_000)), 960);
}

#[test]
fn default_tempo_without_set_tempo() {
    let file = file_with_tempo_track(FormatType::SingleMultiChannel, Track::default(), Vec::new());
    let map = file.tempo_map(0).unwrap();
    assert!(map.changes().is_empty());
    assert_eq!(map.tempo_at(10_000), Tempo::DEFAULT);
    assert_eq!(map.ticks_to_micros(480 * 4), Micros::from_ms(2_000));
}

#[test]
fn last_change_on_a_tick_wins() {
    let mut conductor = Track::default();
    conductor
        .tempo(0, Tempo::new(1_000_000))
        .tempo(0, Tempo::new(400_000));
    let file = file_with_tempo_track(FormatType::Simultaneous, conductor, Vec::new());
    let map = file.tempo_map(0).unwrap();
    assert_eq!(map.changes().len(), 1);
    assert_eq!(map.ticks_to_micros(480), Micros::new(400_000));
}

#[test]
fn conversions_are_monotonic() {
    let mut conductor = Track::default();
    conductor
        .tempo(0, Tempo::from_bpm(97.))
        .tempo(333, Tempo::from_bpm(151.))
        .tempo(1_000, Tempo::from_bpm(60.));
    let file = file_with_tempo_track(FormatType::Simultaneous, conductor, Vec::new());
    let map = file.tempo_map(0).unwrap();

    let mut previous = Micros::ZERO;
    for tick in (0..5_000).step_by(7) {
        let micros = map.ticks_to_micros(tick);
        assert!(micros >= previous, "not monotonic at tick {tick}");
        previous = micros;
        // `micros` is rounded down, so the tick is reached a microsecond later
        assert_eq!(map.micros_to_ticks(micros + Micros::new(1)), tick);
    }
}

#[test]
fn timed_events_follow_the_shared_map() {
    let mut conductor = Track::default();
    conductor.tempo(0, Tempo::new(1_000_000));
    let mut melody = Track::default();
    melody
        .note_on(480, Channel::new(0).unwrap(), 60, 100)
        .unwrap()
        .end(480);
    let file = file_with_tempo_track(FormatType::Simultaneous, conductor, vec![melody]);

    let times: Vec<(usize, u64)> = file
        .timed_events()
        .map(|e| (e.track, e.micros.us()))
        .collect();
    assert_eq!(times, [(0, 0), (1, 1_000_000), (1, 2_000_000)]);
}
