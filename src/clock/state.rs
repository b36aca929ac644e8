use std::time::{Duration, Instant};

use num_enum::{IntoPrimitive, TryFromPrimitive};

use super::ClockError;
use crate::message::SystemRealTime;

/// Tempo of the transport in beats per minute. Always finite and positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "f64", into = "f64"))]
pub struct Bpm(f64);

impl Bpm {
    /// Validate a tempo
    pub fn new(bpm: f64) -> Result<Self, ClockError> {
        if !bpm.is_finite() || bpm <= 0. {
            return Err(ClockError::InvalidBpm(bpm));
        }
        Ok(Self(bpm))
    }

    /// Beats per minute
    pub const fn value(&self) -> f64 {
        self.0
    }

    /// Seconds from the first pulse to the `pulses`-th one after it
    fn span_secs(&self, ppqn: u16, pulses: u64) -> f64 {
        pulses as f64 * 60. / (self.0 * ppqn as f64)
    }

    /// Time between two pulses at `ppqn` pulses per quarter note
    pub fn pulse_interval(&self, ppqn: u16) -> Duration {
        Duration::from_secs_f64(self.span_secs(ppqn, 1))
    }
}

impl TryFrom<f64> for Bpm {
    type Error = ClockError;
    fn try_from(bpm: f64) -> Result<Self, Self::Error> {
        Self::new(bpm)
    }
}

impl From<Bpm> for f64 {
    fn from(bpm: Bpm) -> Self {
        bpm.0
    }
}

/// Where the transport is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Phase {
    /// Never started. [`TransportCommand::Continue`] is not valid here.
    Stopped = 0,
    /// Emitting pulses
    Running = 1,
    /// Stopped with the position kept, waiting for Continue (or Start)
    Paused = 2,
}

/// A request to change the transport
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransportCommand {
    /// Start from position zero
    Start,
    /// Halt, keeping the position
    Stop,
    /// Resume from the kept position
    Continue,
    /// Change the tempo from the next pulse boundary on
    SetBpm(Bpm),
    /// Change the pulses per quarter note from the next pulse boundary on.
    /// Zero is ignored.
    SetPpqn(u16),
}

/// What the transport emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClockEventKind {
    /// MIDI Start
    Start,
    /// MIDI Continue
    Continue,
    /// MIDI Stop
    Stop,
    /// MIDI Timing Clock
    Pulse,
}

impl ClockEventKind {
    /// The real-time message for this event
    pub const fn message(&self) -> SystemRealTime {
        match self {
            Self::Start => SystemRealTime::Start,
            Self::Continue => SystemRealTime::Continue,
            Self::Stop => SystemRealTime::Stop,
            Self::Pulse => SystemRealTime::TimingClock,
        }
    }
}

/// An event produced by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockEvent {
    /// What happened
    pub kind: ClockEventKind,
    /// Pulses emitted since Start, including this one if it is a pulse
    pub position: u64,
    /// When the event was due
    pub target: Instant,
}

impl ClockEvent {
    /// The byte to send to a MIDI port
    pub fn bytes(&self) -> [u8; 1] {
        [self.kind.message().byte()]
    }
}

/// Phase and position read together
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportSnapshot {
    /// Current phase
    pub phase: Phase,
    /// Pulses emitted since Start
    pub position: u64,
}

const POSITION_MASK: u64 = (1 << 62) - 1;

impl TransportSnapshot {
    /// Pack into one word: the phase in the top two bits, the position below
    pub(crate) fn pack(&self) -> u64 {
        ((u8::from(self.phase) as u64) << 62) | (self.position & POSITION_MASK)
    }

    pub(crate) fn unpack(word: u64) -> Self {
        Self {
            phase: Phase::try_from((word >> 62) as u8).unwrap_or(Phase::Stopped),
            position: word & POSITION_MASK,
        }
    }
}

#[doc = r#"
The transport as a pure state machine.

Time only enters through the `now` arguments, so the schedule can be driven
by a test as easily as by the clock thread.

The pulse after `anchor_position` pulses is due at `anchor`; the `n`-th one
after it at `anchor + n × interval`. Every deadline is computed from the
pulse count, never from when the previous pulse actually went out, so late
wake-ups do not push later pulses back. The anchor moves only on Start,
Continue, and at the pulse boundary where a tempo or resolution change
takes effect.
"#]
#[derive(Debug, Clone)]
pub struct TransportState {
    phase: Phase,
    position: u64,
    bpm: Bpm,
    ppqn: u16,
    pending_bpm: Option<Bpm>,
    pending_ppqn: Option<u16>,
    anchor: Instant,
    anchor_position: u64,
}

impl TransportState {
    /// A stopped transport at position zero
    pub fn new(bpm: Bpm, ppqn: u16, now: Instant) -> Result<Self, ClockError> {
        if ppqn == 0 {
            return Err(ClockError::InvalidPpqn);
        }
        Ok(Self {
            phase: Phase::Stopped,
            position: 0,
            bpm,
            ppqn,
            pending_bpm: None,
            pending_ppqn: None,
            anchor: now,
            anchor_position: 0,
        })
    }

    /// Current phase
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Pulses emitted since Start
    pub const fn position(&self) -> u64 {
        self.position
    }

    /// The tempo pulses are currently spaced by
    pub const fn bpm(&self) -> Bpm {
        self.bpm
    }

    /// Pulses per quarter note
    pub const fn ppqn(&self) -> u16 {
        self.ppqn
    }

    /// Time between pulses at the current tempo
    pub fn pulse_interval(&self) -> Duration {
        self.bpm.pulse_interval(self.ppqn)
    }

    /// Phase and position together
    pub const fn snapshot(&self) -> TransportSnapshot {
        TransportSnapshot {
            phase: self.phase,
            position: self.position,
        }
    }

    /// When the next pulse is due, if running
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.phase != Phase::Running {
            return None;
        }
        let pulses = self.position - self.anchor_position;
        Some(self.anchor + Duration::from_secs_f64(self.bpm.span_secs(self.ppqn, pulses)))
    }

    /// Apply a request. Returns the marker to send, if any.
    ///
    /// Requests that are not valid in the current phase are ignored.
    pub fn apply(&mut self, command: TransportCommand, now: Instant) -> Option<ClockEvent> {
        match command {
            TransportCommand::Start => {
                if self.phase == Phase::Running {
                    tracing::debug!("Ignoring Start while running");
                    return None;
                }
                self.take_pending();
                self.phase = Phase::Running;
                self.position = 0;
                self.anchor(now);
                tracing::debug!("Transport started at {} BPM", self.bpm.value());
                Some(self.marker(ClockEventKind::Start, now))
            }
            TransportCommand::Stop => {
                if self.phase != Phase::Running {
                    tracing::debug!("Ignoring Stop while {:?}", self.phase);
                    return None;
                }
                self.take_pending();
                self.phase = Phase::Paused;
                tracing::debug!("Transport stopped at position {}", self.position);
                Some(self.marker(ClockEventKind::Stop, now))
            }
            TransportCommand::Continue => {
                if self.phase != Phase::Paused {
                    tracing::warn!("Ignoring Continue while {:?}", self.phase);
                    return None;
                }
                self.take_pending();
                self.phase = Phase::Running;
                self.anchor(now);
                tracing::debug!("Transport continued from position {}", self.position);
                Some(self.marker(ClockEventKind::Continue, now))
            }
            TransportCommand::SetBpm(bpm) => {
                self.pending_bpm = Some(bpm);
                if self.phase != Phase::Running {
                    self.take_pending();
                }
                None
            }
            TransportCommand::SetPpqn(0) => {
                tracing::warn!("Ignoring a resolution of zero pulses per quarter note");
                None
            }
            TransportCommand::SetPpqn(ppqn) => {
                self.pending_ppqn = Some(ppqn);
                if self.phase != Phase::Running {
                    self.take_pending();
                }
                None
            }
        }
    }

    /// Emit the pulse that is due. `now` is only used to report lateness.
    ///
    /// Returns `None` unless running.
    pub fn pulse(&mut self, now: Instant) -> Option<ClockEvent> {
        let target = self.next_deadline()?;
        if self.take_pending() {
            // the new spacing applies to the pulses after this one
            self.anchor = target;
            self.anchor_position = self.position;
        }
        self.position += 1;
        tracing::trace!(
            "Pulse {} is {:?} late",
            self.position,
            now.saturating_duration_since(target)
        );
        Some(ClockEvent {
            kind: ClockEventKind::Pulse,
            position: self.position,
            target,
        })
    }

    fn anchor(&mut self, now: Instant) {
        self.anchor = now;
        self.anchor_position = self.position;
    }

    /// Apply deferred changes, returning whether there were any
    fn take_pending(&mut self) -> bool {
        let bpm = self.pending_bpm.take();
        let ppqn = self.pending_ppqn.take();
        if let Some(bpm) = bpm {
            self.bpm = bpm;
        }
        if let Some(ppqn) = ppqn {
            self.ppqn = ppqn;
        }
        bpm.is_some() || ppqn.is_some()
    }

    fn marker(&self, kind: ClockEventKind, now: Instant) -> ClockEvent {
        ClockEvent {
            kind,
            position: self.position,
            target: now,
        }
    }
}

#[cfg(test)]
fn running(bpm: f64, now: Instant) -> TransportState {
    let mut state = TransportState::new(Bpm::new(bpm).unwrap(), 24, now).unwrap();
    state.apply(TransportCommand::Start, now);
    state
}

#[cfg(test)]
fn close(a: Duration, b: Duration) -> bool {
    a.abs_diff(b) <= Duration::from_micros(1)
}

#[test]
fn pulse_interval_at_120_bpm() {
    let interval = Bpm::new(120.).unwrap().pulse_interval(24);
    assert_eq!(interval.as_micros(), 20_833);
}

#[test]
fn forty_eight_pulses_per_second_at_120_bpm() {
    use pretty_assertions::assert_eq;
    let start = Instant::now();
    let mut state = running(120., start);
    let mut within_a_second = 0;
    while let Some(deadline) = state.next_deadline() {
        if deadline >= start + Duration::from_secs(1) {
            break;
        }
        let pulse = state.pulse(deadline).unwrap();
        let expected = Duration::from_nanos(20_833_333) * (pulse.position as u32 - 1);
        assert!(close(pulse.target - start, expected));
        within_a_second += 1;
    }
    assert_eq!(within_a_second, 48);
}

#[test]
fn late_wakeups_do_not_drift() {
    use pretty_assertions::assert_eq;
    let start = Instant::now();
    let mut state = running(120., start);
    for i in 0..10_000u64 {
        let deadline = state.next_deadline().unwrap();
        // wake up anywhere from 0 to 5 ms late
        let late = Duration::from_micros((i * 7_919) % 5_000);
        state.pulse(deadline + late).unwrap();
    }
    assert_eq!(state.position(), 10_000);
    let elapsed = state.next_deadline().unwrap() - start;
    let ideal = Duration::from_secs_f64(10_000. * 60. / (120. * 24.));
    assert!(close(elapsed, ideal), "{elapsed:?} != {ideal:?}");
}

#[test]
fn stop_and_continue_keep_position() {
    use pretty_assertions::assert_eq;
    let start = Instant::now();
    let mut state = running(120., start);
    for _ in 0..100 {
        let deadline = state.next_deadline().unwrap();
        state.pulse(deadline).unwrap();
    }
    let stopped_at = start + Duration::from_secs(3);
    let stop = state.apply(TransportCommand::Stop, stopped_at).unwrap();
    assert_eq!((stop.kind, stop.position), (ClockEventKind::Stop, 100));
    assert_eq!(state.next_deadline(), None);
    assert_eq!(state.pulse(stopped_at), None);

    let resumed_at = start + Duration::from_secs(10);
    let cont = state.apply(TransportCommand::Continue, resumed_at).unwrap();
    assert_eq!((cont.kind, cont.position), (ClockEventKind::Continue, 100));
    assert_eq!(state.next_deadline(), Some(resumed_at));

    let pulse = state.pulse(resumed_at).unwrap();
    assert_eq!(pulse.position, 101);
    assert_eq!(pulse.target, resumed_at);
}

#[test]
fn start_resets_and_continue_needs_pause() {
    use pretty_assertions::assert_eq;
    let now = Instant::now();
    let mut state = TransportState::new(Bpm::new(100.).unwrap(), 24, now).unwrap();
    assert_eq!(state.apply(TransportCommand::Continue, now), None);
    assert_eq!(state.apply(TransportCommand::Stop, now), None);

    state.apply(TransportCommand::Start, now).unwrap();
    assert_eq!(state.apply(TransportCommand::Start, now), None);
    state.pulse(now).unwrap();
    state.pulse(now).unwrap();
    state.apply(TransportCommand::Stop, now).unwrap();

    let restart = state.apply(TransportCommand::Start, now).unwrap();
    assert_eq!((restart.kind, restart.position), (ClockEventKind::Start, 0));
    assert_eq!(state.phase(), Phase::Running);
}

#[test]
fn tempo_change_applies_from_next_boundary() {
    use pretty_assertions::assert_eq;
    let start = Instant::now();
    let mut state = running(120., start);
    let first = state.pulse(start).unwrap();
    let second_due = state.next_deadline().unwrap();

    state.apply(TransportCommand::SetBpm(Bpm::new(60.).unwrap()), start);
    // the pulse already scheduled keeps its time
    assert_eq!(state.next_deadline(), Some(second_due));
    let second = state.pulse(second_due).unwrap();
    assert_eq!(second.target, second_due);
    assert_eq!(first.target, start);

    let third_due = state.next_deadline().unwrap();
    assert!(close(third_due - second_due, Bpm::new(60.).unwrap().pulse_interval(24)));
    assert_eq!(state.bpm(), Bpm::new(60.).unwrap());
}

#[test]
fn resolution_change_applies_from_next_boundary() {
    use pretty_assertions::assert_eq;
    let start = Instant::now();
    let mut state = running(120., start);
    state.pulse(start).unwrap();
    let second_due = state.next_deadline().unwrap();

    state.apply(TransportCommand::SetPpqn(48), start);
    assert_eq!(state.ppqn(), 24);
    assert_eq!(state.next_deadline(), Some(second_due));
    let second = state.pulse(second_due).unwrap();
    assert_eq!(second.position, 2);
    assert_eq!(state.ppqn(), 48);

    let bpm = Bpm::new(120.).unwrap();
    let third_due = state.next_deadline().unwrap();
    assert!(close(third_due - second_due, bpm.pulse_interval(48)));
    assert!(close(third_due - start, bpm.pulse_interval(24) + bpm.pulse_interval(48)));
}

#[test]
fn resolution_change_while_stopped_is_immediate() {
    use pretty_assertions::assert_eq;
    let now = Instant::now();
    let mut state = TransportState::new(Bpm::new(120.).unwrap(), 24, now).unwrap();
    assert_eq!(state.apply(TransportCommand::SetPpqn(96), now), None);
    assert_eq!(state.ppqn(), 96);
    state.apply(TransportCommand::SetPpqn(0), now);
    assert_eq!(state.ppqn(), 96);
    assert!(close(state.pulse_interval(), Duration::from_secs_f64(60. / (120. * 96.))));
}

#[test]
fn snapshot_packs_into_one_word() {
    use pretty_assertions::assert_eq;
    let snapshot = TransportSnapshot {
        phase: Phase::Paused,
        position: 123_456_789,
    };
    assert_eq!(TransportSnapshot::unpack(snapshot.pack()), snapshot);
}

#[test]
fn invalid_tempo_and_resolution() {
    assert!(matches!(Bpm::new(0.), Err(ClockError::InvalidBpm(_))));
    assert!(matches!(Bpm::new(f64::INFINITY), Err(ClockError::InvalidBpm(_))));
    assert!(matches!(Bpm::try_from(-3.), Err(ClockError::InvalidBpm(_))));
    assert!(matches!(
        TransportState::new(Bpm::new(120.).unwrap(), 0, Instant::now()),
        Err(ClockError::InvalidPpqn)
    ));
}
