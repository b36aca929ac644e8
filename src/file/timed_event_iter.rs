use itertools::{Either, Itertools};

use crate::prelude::*;

/// An event placed on the file's timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedEvent<'a> {
    /// Elapsed time from the start of the sequence
    pub micros: Micros,
    /// Absolute tick within its track
    pub tick: u64,
    /// Index of the track the event came from
    pub track: usize,
    /// The event
    pub event: &'a TrackEvent,
}

/// Iterator over one track's events with their times
struct TrackTimeline<'a> {
    track: usize,
    tempo_map: TempoMap,
    ticks: u64,
    events: core::slice::Iter<'a, TrackEvent>,
}

impl<'a> TrackTimeline<'a> {
    fn new(track: usize, events: &'a Track, tempo_map: TempoMap) -> Self {
        Self {
            track,
            tempo_map,
            ticks: 0,
            events: events.events().iter(),
        }
    }
}

impl<'a> Iterator for TrackTimeline<'a> {
    type Item = TimedEvent<'a>;
    fn next(&mut self) -> Option<Self::Item> {
        let event = self.events.next()?;
        self.ticks += event.delta_ticks() as u64;
        Some(TimedEvent {
            micros: self.tempo_map.ticks_to_micros(self.ticks),
            tick: self.ticks,
            track: self.track,
            event,
        })
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.events.size_hint()
    }
}

/// Merge the tracks of a file into a single timeline.
///
/// Formats 0 and 1 share the first track's tempo map and are merged by tick,
/// ties going to the lower track index. Format 2 tracks play one after
/// another, each from zero with its own tempo map.
pub(super) fn timed_events(file: &MidiFile) -> impl Iterator<Item = TimedEvent<'_>> + '_ {
    let timing = file.timing();
    if file.format_type().has_shared_tempo() {
        let tempo_map = file
            .tracks()
            .first()
            .map(|t| TempoMap::from_track(t, timing))
            .unwrap_or_else(|| TempoMap::constant(timing));
        let timelines = file
            .tracks()
            .iter()
            .enumerate()
            .map(move |(i, t)| TrackTimeline::new(i, t, tempo_map.clone()));
        Either::Left(timelines.kmerge_by(|a, b| (a.tick, a.track) < (b.tick, b.track)))
    } else {
        Either::Right(
            file.tracks()
                .iter()
                .enumerate()
                .flat_map(move |(i, t)| TrackTimeline::new(i, t, TempoMap::from_track(t, timing))),
        )
    }
}

#[cfg(test)]
fn note_track(events: &[(u32, u8)]) -> Track {
    let ch = Channel::new(0).unwrap();
    let mut track = Track::default();
    for &(delta, note) in events {
        track.note_on(delta, ch, note, 100).unwrap();
    }
    track
}

#[test]
fn simultaneous_tracks_merge_by_tick() {
    use pretty_assertions::assert_eq;
    let mut conductor = Track::default();
    conductor.tempo(0, Tempo::new(500_000)).tempo(480, Tempo::new(250_000));
    let first = note_track(&[(0, 60), (480, 62), (480, 64)]);
    let second = note_track(&[(240, 48), (240, 50), (720, 52)]);

    let file = MidiFile::new(
        FormatType::Simultaneous,
        Timing::new(480).unwrap(),
        alloc::vec![conductor, first, second],
    )
    .unwrap();

    let merged: Vec<(u64, u64, usize)> = file
        .timed_events()
        .map(|e| (e.micros.us(), e.tick, e.track))
        .collect();

    assert_eq!(
        merged,
        [
            (0, 0, 0),
            (0, 0, 1),
            (250_000, 240, 2),
            (500_000, 480, 0),
            (500_000, 480, 1),
            (500_000, 480, 2),
            (750_000, 960, 1),
            (875_000, 1200, 2),
        ]
    );
}

#[test]
fn independent_tracks_play_in_sequence() {
    use pretty_assertions::assert_eq;
    let mut first = Track::default();
    first.tempo(0, Tempo::new(1_000_000));
    first.note_on(960, Channel::new(0).unwrap(), 60, 100).unwrap();
    let second = note_track(&[(0, 48), (480, 50)]);

    let file = MidiFile::new(
        FormatType::SequentiallyIndependent,
        Timing::new(960).unwrap(),
        alloc::vec![first, second],
    )
    .unwrap();

    let times: Vec<(u64, usize)> = file
        .timed_events()
        .map(|e| (e.micros.us(), e.track))
        .collect();
    assert_eq!(times, [(0, 0), (1_000_000, 0), (0, 1), (250_000, 1)]);
}

#[test]
fn empty_file_has_no_events() {
    let file = MidiFile::new(FormatType::Simultaneous, Timing::new(96).unwrap(), Vec::new()).unwrap();
    assert_eq!(file.timed_events().count(), 0);
}
