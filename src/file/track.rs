use crate::prelude::*;

#[doc = r#"
An ordered sequence of [`TrackEvent`]s.

A decoded track always ends with exactly one End-of-Track event. A track built
in memory may leave it out: the encoder appends one. The building methods
insert new events before an existing End-of-Track so that it stays last.

# Example
```rust
# use maxmidi::prelude::*;
let ch = Channel::new(9).unwrap();
let mut track = Track::default();
track
    .tempo(0, Tempo::from_bpm(100.))
    .time_signature(0, 6, 8)
    .unwrap()
    .note_on(0, ch, 36, 110)
    .unwrap()
    .note_off(240, ch, 36, 0)
    .unwrap();

let ticks: Vec<u64> = track.ticked_events().map(|e| e.accumulated_ticks()).collect();
assert_eq!(ticks, [0, 0, 0, 240]);
```
"#]
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Track {
    events: Vec<TrackEvent>,
}

impl Track {
    /// Create a track from events, taken as-is
    pub fn new(events: Vec<TrackEvent>) -> Self {
        Self { events }
    }

    /// The events, in order
    pub fn events(&self) -> &[TrackEvent] {
        &self.events
    }

    /// Consume the track, returning its events
    pub fn into_events(self) -> Vec<TrackEvent> {
        self.events
    }

    /// Number of events, including any End-of-Track
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True if the track has no events at all
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// True if the last event is End-of-Track
    pub fn has_end_of_track(&self) -> bool {
        self.events.last().is_some_and(TrackEvent::is_end_of_track)
    }

    /// Events paired with their absolute tick position
    pub fn ticked_events(&self) -> impl Iterator<Item = Ticked<&TrackEvent>> + '_ {
        self.events.iter().scan(0u64, |ticks, event| {
            *ticks += event.delta_ticks() as u64;
            Some(Ticked::new(*ticks, event))
        })
    }

    /// The absolute tick of the last event
    pub fn duration_ticks(&self) -> u64 {
        self.events.iter().map(|e| e.delta_ticks() as u64).sum()
    }

    /// Append an event, keeping a trailing End-of-Track last.
    ///
    /// Pushing an End-of-Track onto a track that already ends with one does nothing.
    pub fn push(&mut self, event: TrackEvent) -> &mut Self {
        if self.has_end_of_track() {
            if event.is_end_of_track() {
                return self;
            }
            let index = self.events.len() - 1;
            self.events.insert(index, event);
        } else {
            self.events.push(event);
        }
        self
    }

    #[doc = r#"
Insert an event before the one at `index`, keeping a trailing End-of-Track
last.

Indices at or past a trailing End-of-Track append, as [`Track::push`] does.
Deltas are left alone, so the events after `index` move later by
`event.delta_ticks()`.
"#]
    pub fn insert(&mut self, index: usize, event: TrackEvent) -> &mut Self {
        let body = self.len() - usize::from(self.has_end_of_track());
        if index >= body || event.is_end_of_track() {
            return self.push(event);
        }
        self.events.insert(index, event);
        self
    }

    /// Remove the event at `index`. The events after it move earlier by its delta.
    pub fn remove(&mut self, index: usize) -> Option<TrackEvent> {
        (index < self.events.len()).then(|| self.events.remove(index))
    }

    /// Move the event at `index`, and every event after it, by `ticks`.
    ///
    /// The delta is clamped to what a delta-time can hold, so an event never
    /// moves before its predecessor. Returns the new delta, or `None` if there
    /// is no event at `index`.
    pub fn slide(&mut self, index: usize, ticks: i64) -> Option<u32> {
        let event = self.events.get_mut(index)?;
        let delta = (event.delta_ticks() as i64)
            .saturating_add(ticks)
            .clamp(0, crate::vlq::MAX_VALUE as i64) as u32;
        event.set_delta_ticks(delta);
        Some(delta)
    }

    /// Copy the events out with absolute tick positions instead of deltas
    pub fn to_absolute(&self) -> Vec<Ticked<TrackEvent>> {
        self.ticked_events()
            .map(|e| Ticked::new(e.accumulated_ticks(), e.into_event().clone()))
            .collect()
    }

    #[doc = r#"
Build a track from events at absolute tick positions, computing the deltas.

Events are ordered by tick; events on the same tick keep their order. Any
End-of-Track events are replaced by one at the latest of their ticks and the
last event's tick.

# Errors
[`FileError::DeltaOutOfRange`] if two consecutive events are further apart
than a delta-time can encode.

# Example
```rust
# use maxmidi::prelude::*;
let ch = Channel::new(0).unwrap();
let mut track = Track::default();
track.note_on(0, ch, 60, 100).unwrap().note_off(480, ch, 60, 0).unwrap().end(0);

let mut events = track.to_absolute();
events.push(Ticked::new(240, TrackEvent::new(0, MetaMessage::known(MetaType::Marker, *b"half"))));
let track = Track::from_absolute(events).unwrap();
let deltas: Vec<u32> = track.events().iter().map(|e| e.delta_ticks()).collect();
assert_eq!(deltas, [0, 240, 240, 0]);
```
"#]
    pub fn from_absolute(
        events: impl IntoIterator<Item = Ticked<TrackEvent>>,
    ) -> Result<Self, FileError> {
        let mut events: Vec<Ticked<TrackEvent>> = events.into_iter().collect();
        events.sort_by_key(Ticked::accumulated_ticks);

        let mut end_of_track = None;
        let mut track = Vec::with_capacity(events.len() + 1);
        let mut previous = 0;
        for ticked in events {
            let ticks = ticked.accumulated_ticks();
            if ticked.event().is_end_of_track() {
                end_of_track = Some(ticks);
                continue;
            }
            let mut event = ticked.into_event();
            event.set_delta_ticks(Self::gap(previous, ticks)?);
            track.push(event);
            previous = ticks;
        }
        if let Some(ticks) = end_of_track {
            let ticks = ticks.max(previous);
            track.push(TrackEvent::end_of_track(Self::gap(previous, ticks)?));
        }
        Ok(Self::new(track))
    }

    fn gap(from: u64, to: u64) -> Result<u32, FileError> {
        let gap = to - from;
        if gap > crate::vlq::MAX_VALUE as u64 {
            return Err(FileError::DeltaOutOfRange(gap));
        }
        Ok(gap as u32)
    }

    /// Append a channel message
    pub fn channel(&mut self, delta_ticks: u32, message: ChannelMessage) -> &mut Self {
        self.push(TrackEvent::new(delta_ticks, message))
    }

    /// Append a note on
    pub fn note_on(
        &mut self,
        delta_ticks: u32,
        channel: Channel,
        note: u8,
        velocity: u8,
    ) -> Result<&mut Self, MessageError> {
        let msg = ChannelMessage::note_on(channel, note, velocity)?;
        Ok(self.channel(delta_ticks, msg))
    }

    /// Append a note off
    pub fn note_off(
        &mut self,
        delta_ticks: u32,
        channel: Channel,
        note: u8,
        velocity: u8,
    ) -> Result<&mut Self, MessageError> {
        let msg = ChannelMessage::note_off(channel, note, velocity)?;
        Ok(self.channel(delta_ticks, msg))
    }

    /// Append a control change
    pub fn control_change(
        &mut self,
        delta_ticks: u32,
        channel: Channel,
        controller: u8,
        value: u8,
    ) -> Result<&mut Self, MessageError> {
        let msg =
            ChannelMessage::from_parts(VoiceKind::ControlChange, channel, &[controller, value])?;
        Ok(self.channel(delta_ticks, msg))
    }

    /// Append a program change
    pub fn program_change(
        &mut self,
        delta_ticks: u32,
        channel: Channel,
        program: u8,
    ) -> Result<&mut Self, MessageError> {
        let msg = ChannelMessage::from_parts(VoiceKind::ProgramChange, channel, &[program])?;
        Ok(self.channel(delta_ticks, msg))
    }

    /// Append a polyphonic key pressure
    pub fn poly_pressure(
        &mut self,
        delta_ticks: u32,
        channel: Channel,
        note: u8,
        pressure: u8,
    ) -> Result<&mut Self, MessageError> {
        let msg = ChannelMessage::from_parts(VoiceKind::PolyPressure, channel, &[note, pressure])?;
        Ok(self.channel(delta_ticks, msg))
    }

    /// Append a channel pressure
    pub fn channel_pressure(
        &mut self,
        delta_ticks: u32,
        channel: Channel,
        pressure: u8,
    ) -> Result<&mut Self, MessageError> {
        let msg = ChannelMessage::from_parts(VoiceKind::ChannelPressure, channel, &[pressure])?;
        Ok(self.channel(delta_ticks, msg))
    }

    /// Append a pitch bend, -8192 to 8191 with zero centered
    pub fn pitch_bend(
        &mut self,
        delta_ticks: u32,
        channel: Channel,
        bend: i16,
    ) -> Result<&mut Self, MessageError> {
        let msg = ChannelMessage::pitch_bend(channel, bend)?;
        Ok(self.channel(delta_ticks, msg))
    }

    /// Append a Set-Tempo meta event
    pub fn tempo(&mut self, delta_ticks: u32, tempo: Tempo) -> &mut Self {
        self.push(TrackEvent::new(delta_ticks, MetaMessage::set_tempo(tempo)))
    }

    /// Append a time signature, e.g. `(6, 8)` for 6/8.
    ///
    /// The denominator must be a power of two. Uses 24 clocks per metronome
    /// click and 8 notated 32nd notes per quarter note.
    pub fn time_signature(
        &mut self,
        delta_ticks: u32,
        numerator: u8,
        denominator: u8,
    ) -> Result<&mut Self, MessageError> {
        if !denominator.is_power_of_two() {
            return Err(MessageError::TimeSignature(denominator));
        }
        let power = denominator.trailing_zeros() as u8;
        let meta = MetaMessage::known(MetaType::TimeSignature, [numerator, power, 24, 8]);
        Ok(self.push(TrackEvent::new(delta_ticks, meta)))
    }

    /// Append a key signature: sharps (positive) or flats (negative), and mode
    pub fn key_signature(&mut self, delta_ticks: u32, sharps: i8, minor: bool) -> &mut Self {
        let meta = MetaMessage::known(MetaType::KeySignature, [sharps as u8, minor as u8]);
        self.push(TrackEvent::new(delta_ticks, meta))
    }

    /// Append a text meta event
    pub fn text(&mut self, delta_ticks: u32, text: &str) -> &mut Self {
        let meta = MetaMessage::known(MetaType::Text, text.as_bytes());
        self.push(TrackEvent::new(delta_ticks, meta))
    }

    /// Append the track name meta event
    pub fn name(&mut self, delta_ticks: u32, name: &str) -> &mut Self {
        let meta = MetaMessage::known(MetaType::TrackName, name.as_bytes());
        self.push(TrackEvent::new(delta_ticks, meta))
    }

    /// Append End-of-Track after `delta_ticks` unless the track already ends with one
    pub fn end(&mut self, delta_ticks: u32) -> &mut Self {
        self.push(TrackEvent::end_of_track(delta_ticks))
    }
}

impl From<Vec<TrackEvent>> for Track {
    fn from(events: Vec<TrackEvent>) -> Self {
        Self::new(events)
    }
}

#[test]
fn push_keeps_end_of_track_last() {
    use pretty_assertions::assert_eq;
    let ch = Channel::new(0).unwrap();
    let mut track = Track::default();
    track.end(10);
    track.note_on(0, ch, 60, 100).unwrap();
    track.end(0);

    assert_eq!(track.len(), 2);
    assert!(track.has_end_of_track());
    assert_eq!(track.events()[0].delta_ticks(), 0);
    assert_eq!(track.duration_ticks(), 10);
}

#[test]
fn time_signature_payload() {
    use pretty_assertions::assert_eq;
    let mut track = Track::default();
    track.time_signature(0, 3, 4).unwrap();
    let TrackMessage::Meta(meta) = track.events()[0].message() else {
        panic!("expected a meta event");
    };
    assert_eq!(meta.payload(), &[3, 2, 24, 8]);
    assert_eq!(
        track.time_signature(0, 3, 5).unwrap_err(),
        MessageError::TimeSignature(5)
    );
}

#[cfg(test)]
fn deltas(track: &Track) -> Vec<u32> {
    track.events().iter().map(TrackEvent::delta_ticks).collect()
}

#[test]
fn insert_and_remove_keep_end_of_track_last() {
    use pretty_assertions::assert_eq;
    let ch = Channel::new(0).unwrap();
    let mut track = Track::default();
    track.note_on(0, ch, 60, 100).unwrap().note_off(96, ch, 60, 0).unwrap().end(0);

    track.insert(1, TrackEvent::new(48, ChannelMessage::pitch_bend(ch, 100).unwrap()));
    assert_eq!(deltas(&track), [0, 48, 96, 0]);
    assert_eq!(track.duration_ticks(), 144);

    track.insert(10, TrackEvent::new(12, MetaMessage::known(MetaType::Marker, *b"x")));
    assert!(track.has_end_of_track());
    assert_eq!(deltas(&track), [0, 48, 96, 12, 0]);
    track.insert(0, TrackEvent::end_of_track(5));
    assert_eq!(track.len(), 5);

    let removed = track.remove(1).unwrap();
    assert_eq!(removed.delta_ticks(), 48);
    assert_eq!(deltas(&track), [0, 96, 12, 0]);
    assert_eq!(track.remove(4), None);
}

#[test]
fn slide_moves_the_rest_of_the_track() {
    use pretty_assertions::assert_eq;
    let ch = Channel::new(1).unwrap();
    let mut track = Track::default();
    track.note_on(10, ch, 60, 100).unwrap().note_off(20, ch, 60, 0).unwrap();

    assert_eq!(track.slide(1, 15), Some(35));
    assert_eq!(track.duration_ticks(), 45);
    assert_eq!(track.slide(0, -100), Some(0));
    assert_eq!(track.slide(1, i64::MAX), Some(crate::vlq::MAX_VALUE));
    assert_eq!(track.slide(2, 1), None);
}

#[test]
fn absolute_ticks_rebuild_deltas() {
    use pretty_assertions::assert_eq;
    let ch = Channel::new(0).unwrap();
    let mut track = Track::default();
    track.note_on(0, ch, 60, 100).unwrap().note_off(480, ch, 60, 0).unwrap().end(20);

    let absolute = track.to_absolute();
    let ticks: Vec<u64> = absolute.iter().map(Ticked::accumulated_ticks).collect();
    assert_eq!(ticks, [0, 480, 500]);
    assert_eq!(Track::from_absolute(absolute.clone()).unwrap(), track);

    // out of order, with the End-of-Track before the last note
    let mut shuffled = absolute;
    shuffled.reverse();
    shuffled.push(Ticked::new(
        900,
        TrackEvent::new(7, ChannelMessage::from_parts(VoiceKind::ChannelPressure, ch, &[5]).unwrap()),
    ));
    let rebuilt = Track::from_absolute(shuffled).unwrap();
    assert_eq!(deltas(&rebuilt), [0, 480, 420, 0]);
    assert!(rebuilt.has_end_of_track());

    let far = [
        Ticked::new(0, TrackEvent::new(0, ChannelMessage::note_on(ch, 1, 1).unwrap())),
        Ticked::new(1 << 40, TrackEvent::new(0, ChannelMessage::note_on(ch, 2, 1).unwrap())),
    ];
    assert_eq!(
        Track::from_absolute(far).unwrap_err(),
        FileError::DeltaOutOfRange(1 << 40)
    );
}

#[test]
fn pressure_and_bend_builders() {
    use pretty_assertions::assert_eq;
    let ch = Channel::new(3).unwrap();
    let mut track = Track::default();
    track
        .poly_pressure(0, ch, 60, 20)
        .unwrap()
        .channel_pressure(10, ch, 30)
        .unwrap()
        .pitch_bend(10, ch, -8192)
        .unwrap();
    let bytes: Vec<Option<Vec<u8>>> = track.events().iter().map(|e| e.message().live_bytes()).collect();
    assert_eq!(
        bytes,
        [
            Some(alloc::vec![0xA3, 60, 20]),
            Some(alloc::vec![0xD3, 30]),
            Some(alloc::vec![0xE3, 0, 0]),
        ]
    );
    assert_eq!(
        track.channel_pressure(0, ch, 0x80).unwrap_err(),
        MessageError::InvalidDataByte(0x80)
    );
    assert_eq!(track.pitch_bend(0, ch, 9000).unwrap_err(), MessageError::PitchBend(9000));
}
