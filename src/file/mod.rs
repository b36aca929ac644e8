#![doc = r#"
Rusty representation of a [`MidiFile`]
"#]

mod format;
pub use format::*;

mod event;
pub use event::*;

mod track;
pub use track::*;

mod timing;
pub use timing::*;

mod tempo_map;
pub use tempo_map::*;

mod timed_event_iter;
pub use timed_event_iter::TimedEvent;

use crate::{
    prelude::*,
    reader::{self, ParseOptions},
    writer,
};
use thiserror::Error;

/// Errors from assembling a [`MidiFile`] in memory
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FileError {
    /// Format 0 files hold exactly one track
    #[error("Format 0 requires exactly one track, found {0}")]
    MultipleTracksForSingleMultiChannel(usize),
    /// Two consecutive events are further apart than a delta-time can encode
    #[error("A gap of {0} ticks does not fit in a delta-time")]
    DeltaOutOfRange(u64),
}

#[doc = r#"
A Standard MIDI File: format, timing and tracks.

# Example
```rust
# use maxmidi::prelude::*;
let bytes = [
    b'M', b'T', b'h', b'd', 0, 0, 0, 6, 0, 0, 0, 1, 0, 96,
    b'M', b'T', b'r', b'k', 0, 0, 0, 11,
    0x00, 0x90, 0x3C, 0x64, // note on
    0x60, 0x3C, 0x00,       // running status note on, velocity 0
    0x00, 0xFF, 0x2F, 0x00, // end of track
];
let file = MidiFile::parse(&bytes).unwrap();
assert_eq!(file.format_type(), FormatType::SingleMultiChannel);
assert_eq!(file.tracks()[0].duration_ticks(), 96);

// running status is re-applied when encoding
assert_eq!(file.to_bytes().unwrap(), bytes);
```
"#]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MidiFile {
    format: FormatType,
    timing: Timing,
    tracks: Vec<Track>,
}

impl MidiFile {
    /// Assemble a file. Format 0 must be given exactly one track.
    pub fn new(format: FormatType, timing: Timing, tracks: Vec<Track>) -> Result<Self, FileError> {
        if format == FormatType::SingleMultiChannel && tracks.len() != 1 {
            return Err(FileError::MultipleTracksForSingleMultiChannel(tracks.len()));
        }
        Ok(Self {
            format,
            timing,
            tracks,
        })
    }

    pub(crate) fn from_parts_unchecked(format: FormatType, timing: Timing, tracks: Vec<Track>) -> Self {
        Self {
            format,
            timing,
            tracks,
        }
    }

    /// Parse a set of bytes into a file struct, strictly
    pub fn parse(bytes: &[u8]) -> ReadResult<Self> {
        Self::parse_with(bytes, ParseOptions::strict())
    }

    /// Parse a set of bytes into a file struct with the given options
    pub fn parse_with(bytes: &[u8], options: ParseOptions) -> ReadResult<Self> {
        reader::read_file(bytes, options)
    }

    /// Encode the file.
    ///
    /// The track count is taken from the tracks present, running status is
    /// applied between identical channel statuses, and every track is closed
    /// with an End-of-Track event.
    pub fn to_bytes(&self) -> Result<Vec<u8>, WriteError> {
        writer::write_file(self)
    }

    /// Encode the file into a writer.
    ///
    /// Encoding errors are reported as [`std::io::ErrorKind::InvalidInput`].
    #[cfg(feature = "std")]
    pub fn write_to<W: std::io::Write>(&self, out: &mut W) -> std::io::Result<()> {
        let bytes = self
            .to_bytes()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        out.write_all(&bytes)
    }

    /// Returns the format type for the file.
    pub const fn format_type(&self) -> FormatType {
        self.format
    }

    /// Returns header info
    pub const fn timing(&self) -> Timing {
        self.timing
    }

    /// Returns the track list
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Mutable access to a track
    pub fn track_mut(&mut self, index: usize) -> Option<&mut Track> {
        self.tracks.get_mut(index)
    }

    /// Add a track. Fails for a format 0 file, which already has its one track.
    pub fn push_track(&mut self, track: Track) -> Result<&mut Track, FileError> {
        if self.format == FormatType::SingleMultiChannel && !self.tracks.is_empty() {
            return Err(FileError::MultipleTracksForSingleMultiChannel(
                self.tracks.len() + 1,
            ));
        }
        self.tracks.push(track);
        let last = self.tracks.len() - 1;
        Ok(&mut self.tracks[last])
    }

    /// Consume the file, returning its tracks
    pub fn into_tracks(self) -> Vec<Track> {
        self.tracks
    }

    /// The tempo map that governs the track at `track_index`.
    ///
    /// Formats 0 and 1 take it from the first track; format 2 tracks carry
    /// their own. Returns `None` if there is no such track.
    pub fn tempo_map(&self, track_index: usize) -> Option<TempoMap> {
        self.tracks.get(track_index)?;
        let source = if self.format.has_shared_tempo() {
            &self.tracks[0]
        } else {
            &self.tracks[track_index]
        };
        Some(TempoMap::from_track(source, self.timing))
    }

    /// Every event of the file placed on a single timeline.
    ///
    /// See [`TimedEvent`]. Formats 0 and 1 are merged by tick under the shared
    /// tempo map; format 2 tracks follow one another, each starting at zero.
    pub fn timed_events(&self) -> impl Iterator<Item = TimedEvent<'_>> + '_ {
        timed_event_iter::timed_events(self)
    }
}

#[test]
fn single_multichannel_requires_one_track() {
    use pretty_assertions::assert_eq;
    let timing = Timing::new(96).unwrap();
    assert_eq!(
        MidiFile::new(FormatType::SingleMultiChannel, timing, Vec::new()).unwrap_err(),
        FileError::MultipleTracksForSingleMultiChannel(0)
    );

    let mut file =
        MidiFile::new(FormatType::SingleMultiChannel, timing, alloc::vec![Track::default()]).unwrap();
    assert!(file.push_track(Track::default()).is_err());

    let mut file = MidiFile::new(FormatType::Simultaneous, timing, Vec::new()).unwrap();
    file.push_track(Track::default()).unwrap().end(0);
    assert!(file.tracks()[0].has_end_of_track());
}

#[test]
fn shared_tempo_map_comes_from_first_track() {
    use pretty_assertions::assert_eq;
    let timing = Timing::new(480).unwrap();
    let mut conductor = Track::default();
    conductor.tempo(0, Tempo::new(1_000_000));
    let mut other = Track::default();
    other.tempo(0, Tempo::new(250_000));

    let file = MidiFile::new(
        FormatType::Simultaneous,
        timing,
        alloc::vec![conductor.clone(), other.clone()],
    )
    .unwrap();
    assert_eq!(file.tempo_map(1).unwrap().tempo_at(0), Tempo::new(1_000_000));
    assert!(file.tempo_map(2).is_none());

    let file = MidiFile::new(
        FormatType::SequentiallyIndependent,
        timing,
        alloc::vec![conductor, other],
    )
    .unwrap();
    assert_eq!(file.tempo_map(1).unwrap().tempo_at(0), Tempo::new(250_000));
}
