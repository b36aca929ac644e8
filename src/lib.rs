#![doc = r#"
Standard MIDI File codec and real-time MIDI clock transport.

# Overview

The crate is made of two independent halves:

- **The SMF codec.** [`MidiFile::parse`](crate::file::MidiFile::parse) turns the
  bytes of a `.mid` file into a [`MidiFile`](crate::file::MidiFile), and
  [`MidiFile::to_bytes`](crate::file::MidiFile::to_bytes) turns one back into
  bytes. A [`TempoMap`](crate::file::TempoMap) converts file ticks into
  wall-clock microseconds and back.
- **The transport clock** (feature `std`). A
  [`TransportClock`](crate::clock::TransportClock) emits 24 pulses per quarter
  note with Start/Stop/Continue control. Pulses are scheduled against the pulse
  count, never against the previous pulse, so the clock does not drift.

# Example

```rust
# use maxmidi::prelude::*;
let mut track = Track::default();
track.tempo(0, Tempo::from_bpm(90.));
track.note_on(0, Channel::new(0).unwrap(), 60, 100).unwrap();
track.note_off(480, Channel::new(0).unwrap(), 60, 0).unwrap();

let file = MidiFile::new(FormatType::SingleMultiChannel, Timing::new(480).unwrap(), vec![track]).unwrap();
let bytes = file.to_bytes().unwrap();

let parsed = MidiFile::parse(&bytes).unwrap();
assert_eq!(parsed.tracks()[0].events().len(), 4);
```
"#]
#![warn(missing_docs)]
#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod file;
pub mod message;
pub mod reader;
pub mod vlq;
pub mod writer;

mod micros;
pub use micros::*;

mod tempo;
pub use tempo::*;

#[cfg(feature = "std")]
pub mod clock;

#[doc = r#"
Common re-exports
"#]
pub mod prelude {
    pub use crate::file::*;
    pub use crate::message::*;
    pub use crate::reader::{ParseOptions, ReadResult, Reader, ReaderError, ReaderErrorKind};
    pub use crate::writer::{WriteError, Writer};
    pub use crate::{Micros, Tempo};

    #[cfg(feature = "std")]
    pub use crate::clock::*;

    pub(crate) use alloc::vec::Vec;
}
