use crate::prelude::*;

/// A tempo taking effect at an absolute tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempoChange {
    /// Absolute tick where the tempo starts
    pub tick: u64,
    /// The tempo from this tick on
    pub tempo: Tempo,
    // sum of ticks × µs-per-quarter over earlier segments, divided by the
    // division only when converting so that rounding never accumulates
    scaled_micros: u128,
}

#[doc = r#"
The piecewise mapping from ticks to elapsed microseconds.

Built from the Set-Tempo events of one track. Before the first change the
default tempo of 500,000 µs per quarter note applies.

# Example
```rust
# use maxmidi::prelude::*;
let mut track = Track::default();
track.tempo(0, Tempo::new(500_000)).tempo(480, Tempo::new(250_000));

let map = TempoMap::from_track(&track, Timing::new(480).unwrap());
assert_eq!(map.ticks_to_micros(480), Micros::new(500_000));
assert_eq!(map.ticks_to_micros(960), Micros::new(750_000));
assert_eq!(map.micros_to_ticks(Micros::new(750_000)), 960);
```
"#]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempoMap {
    ticks_per_quarter_note: u64,
    changes: Vec<TempoChange>,
}

impl TempoMap {
    /// A map with no tempo changes
    pub fn constant(timing: Timing) -> Self {
        Self {
            ticks_per_quarter_note: timing.ticks_per_quarter_note() as u64,
            changes: Vec::new(),
        }
    }

    /// Collect the Set-Tempo events of a track.
    ///
    /// Several changes on the same tick collapse into the last one. Set-Tempo
    /// events whose payload is not three bytes are skipped.
    pub fn from_track(track: &Track, timing: Timing) -> Self {
        let mut map = Self::constant(timing);
        for ticked in track.ticked_events() {
            let TrackMessage::Meta(meta) = ticked.event().message() else {
                continue;
            };
            if meta.known_type() != Some(MetaType::SetTempo) {
                continue;
            }
            match meta.tempo() {
                Some(tempo) => map.insert(ticked.accumulated_ticks(), tempo),
                None => tracing::warn!(
                    "Skipping Set-Tempo event at tick {} with a {} byte payload",
                    ticked.accumulated_ticks(),
                    meta.payload().len()
                ),
            }
        }
        map
    }

    /// Add a tempo change. Changes must be added in tick order.
    fn insert(&mut self, tick: u64, tempo: Tempo) {
        if let Some(last) = self.changes.last_mut() {
            if last.tick == tick {
                last.tempo = tempo;
                return;
            }
        }
        let scaled_micros = self.scaled_micros_at(tick);
        self.changes.push(TempoChange {
            tick,
            tempo,
            scaled_micros,
        });
    }

    /// The tempo changes, in tick order
    pub fn changes(&self) -> &[TempoChange] {
        &self.changes
    }

    /// Ticks per quarter note used for conversion
    pub const fn ticks_per_quarter_note(&self) -> u64 {
        self.ticks_per_quarter_note
    }

    /// The tempo in effect at `tick`
    pub fn tempo_at(&self, tick: u64) -> Tempo {
        self.segment_for_tick(tick)
            .map(|c| c.tempo)
            .unwrap_or_default()
    }

    /// Elapsed time from tick 0 to `tick`, rounded down to the microsecond
    pub fn ticks_to_micros(&self, tick: u64) -> Micros {
        let scaled = self.scaled_micros_at(tick);
        let micros = scaled / self.ticks_per_quarter_note as u128;
        Micros::new(micros.min(u64::MAX as u128) as u64)
    }

    /// The last tick at or before `micros`
    pub fn micros_to_ticks(&self, micros: Micros) -> u64 {
        let target = micros.us() as u128 * self.ticks_per_quarter_note as u128;
        let idx = self.changes.partition_point(|c| c.scaled_micros <= target);
        let (start_tick, start_scaled, tempo) = match idx.checked_sub(1) {
            Some(i) => {
                let c = &self.changes[i];
                (c.tick, c.scaled_micros, c.tempo)
            }
            None => (0, 0, Tempo::DEFAULT),
        };
        let ticks = (target - start_scaled) / tempo.micros_per_quarter_note() as u128;
        start_tick.saturating_add(ticks.min(u64::MAX as u128) as u64)
    }

    fn segment_for_tick(&self, tick: u64) -> Option<&TempoChange> {
        let idx = self.changes.partition_point(|c| c.tick <= tick);
        idx.checked_sub(1).map(|i| &self.changes[i])
    }

    fn scaled_micros_at(&self, tick: u64) -> u128 {
        let (start_tick, start_scaled, tempo) = match self.segment_for_tick(tick) {
            Some(c) => (c.tick, c.scaled_micros, c.tempo),
            None => (0, 0, Tempo::DEFAULT),
        };
        start_scaled + (tick - start_tick) as u128 * tempo.micros_per_quarter_note() as u128
    }
}

#[cfg(test)]
fn tempo_track(changes: &[(u32, u32)]) -> Track {
    let mut track = Track::default();
    for &(delta, micros) in changes {
        track.tempo(delta, Tempo::new(micros));
    }
    track
}

#[test]
fn default_tempo_before_first_change() {
    use pretty_assertions::assert_eq;
    let track = tempo_track(&[(960, 250_000)]);
    let map = TempoMap::from_track(&track, Timing::new(480).unwrap());

    assert_eq!(map.tempo_at(0), Tempo::DEFAULT);
    assert_eq!(map.ticks_to_micros(960), Micros::new(1_000_000));
    assert_eq!(map.ticks_to_micros(1440), Micros::new(1_250_000));
    assert_eq!(map.micros_to_ticks(Micros::new(1_000_000)), 960);
    assert_eq!(map.micros_to_ticks(Micros::new(1_125_000)), 1200);
}

#[test]
fn same_tick_changes_collapse() {
    use pretty_assertions::assert_eq;
    let track = tempo_track(&[(0, 1_000_000), (0, 600_000), (96, 300_000)]);
    let map = TempoMap::from_track(&track, Timing::new(96).unwrap());

    assert_eq!(map.changes().len(), 2);
    assert_eq!(map.tempo_at(0), Tempo::new(600_000));
    assert_eq!(map.ticks_to_micros(96), Micros::new(600_000));
    assert_eq!(map.ticks_to_micros(144), Micros::new(750_000));
}

#[test]
fn rounding_does_not_accumulate() {
    use pretty_assertions::assert_eq;
    // 1 µs per quarter at 3 ticks per quarter: one third of a µs per tick
    let track = tempo_track(&[(0, 1), (3, 1), (3, 1), (3, 1)]);
    let map = TempoMap::from_track(&track, Timing::new(3).unwrap());
    assert_eq!(map.ticks_to_micros(1), Micros::ZERO);
    assert_eq!(map.ticks_to_micros(10), Micros::new(3));
    assert_eq!(map.ticks_to_micros(12), Micros::new(4));
}

#[test]
fn malformed_tempo_is_skipped() {
    use pretty_assertions::assert_eq;
    let mut track = Track::default();
    track.push(TrackEvent::new(
        0,
        MetaMessage::known(MetaType::SetTempo, [0x07u8, 0xA1]),
    ));
    let map = TempoMap::from_track(&track, Timing::new(480).unwrap());
    assert!(map.changes().is_empty());
    assert_eq!(map.ticks_to_micros(480), Micros::new(500_000));
}
