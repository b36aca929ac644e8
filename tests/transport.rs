use std::{
    thread,
    time::{Duration, Instant},
};

use maxmidi::prelude::*;
use pretty_assertions::assert_eq;

fn drain(rx: &crossbeam_channel::Receiver<ClockEvent>) -> Vec<ClockEvent> {
    rx.try_iter().collect()
}

#[test]
fn start_pulse_stop_continue() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let clock = TransportClock::spawn(ClockConfig::with_bpm(240.), tx).unwrap();
    assert_eq!(clock.phase(), Phase::Stopped);

    clock.start().unwrap();
    thread::sleep(Duration::from_millis(200));
    clock.stop().unwrap();
    thread::sleep(Duration::from_millis(50));

    let events = drain(&rx);
    assert_eq!(events[0].kind, ClockEventKind::Start);
    assert_eq!(events[0].position, 0);
    let stop = events.last().unwrap();
    assert_eq!(stop.kind, ClockEventKind::Stop);

    let pulses: Vec<&ClockEvent> = events[1..events.len() - 1].iter().collect();
    assert!(pulses.len() >= 5, "only {} pulses", pulses.len());
    for (i, pulse) in pulses.iter().enumerate() {
        assert_eq!(pulse.kind, ClockEventKind::Pulse);
        assert_eq!(pulse.position, i as u64 + 1);
    }
    assert_eq!(stop.position, pulses.len() as u64);

    // targets are spaced by the pulse interval, measured from Start
    let interval = Bpm::new(240.).unwrap().pulse_interval(24);
    for pulse in &pulses {
        let offset = pulse.target - events[0].target;
        let ideal = interval.mul_f64((pulse.position - 1) as f64);
        assert!(offset.abs_diff(ideal) <= Duration::from_micros(1));
    }

    let snapshot = clock.snapshot();
    assert_eq!(snapshot.phase, Phase::Paused);
    assert_eq!(snapshot.position, stop.position);

    // nothing is emitted while stopped
    thread::sleep(Duration::from_millis(50));
    assert!(drain(&rx).is_empty());

    clock.continue_().unwrap();
    thread::sleep(Duration::from_millis(30));
    clock.stop().unwrap();
    thread::sleep(Duration::from_millis(30));

    let events = drain(&rx);
    assert_eq!(events[0].kind, ClockEventKind::Continue);
    assert_eq!(events[0].position, stop.position);
    assert_eq!(events[1].kind, ClockEventKind::Pulse);
    assert_eq!(events[1].position, stop.position + 1);
}

#[test]
fn pulses_are_never_early() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let clock = TransportClock::spawn(ClockConfig::with_bpm(300.), tx).unwrap();
    clock.start().unwrap();

    let mut received = 0;
    for event in rx.iter().take(20) {
        assert!(Instant::now() >= event.target);
        received += 1;
    }
    assert_eq!(received, 20);
}

#[test]
fn sink_failures_do_not_stop_the_clock() {
    let sink = RawSink(|_: &[u8]| Err::<(), _>(SinkError::Backend("port closed".into())));
    let clock = TransportClock::spawn(ClockConfig::with_bpm(600.), sink).unwrap();
    clock.start().unwrap();
    thread::sleep(Duration::from_millis(100));

    assert!(clock.position() > 1);
    let failures: Vec<SinkFailure> = clock.failures().collect();
    assert!(!failures.is_empty());
    assert_eq!(failures[0].event.kind, ClockEventKind::Start);
    assert_eq!(failures[0].error, SinkError::Backend("port closed".into()));
}

#[test]
fn configuration_is_validated() {
    let sink = |_: &[u8]| Ok::<(), SinkError>(());
    assert!(matches!(
        TransportClock::spawn(ClockConfig::with_bpm(-1.), RawSink(sink)),
        Err(ClockError::InvalidBpm(_))
    ));
    let config = ClockConfig {
        ppqn: 0,
        ..ClockConfig::default()
    };
    assert!(matches!(
        TransportClock::spawn(config, RawSink(sink)),
        Err(ClockError::InvalidPpqn)
    ));
    let config = ClockConfig {
        queue_capacity: 0,
        ..ClockConfig::default()
    };
    assert!(matches!(
        TransportClock::spawn(config, RawSink(sink)),
        Err(ClockError::InvalidQueueCapacity)
    ));

    let clock = TransportClock::spawn(ClockConfig::default(), RawSink(sink)).unwrap();
    assert_eq!(clock.ppqn(), 24);
    assert!(matches!(clock.set_bpm(f64::NAN), Err(ClockError::InvalidBpm(_))));
    clock.set_bpm(90.).unwrap();
}

#[test]
fn tempo_change_while_running() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let clock = TransportClock::spawn(ClockConfig::with_bpm(600.), tx).unwrap();
    clock.start().unwrap();
    thread::sleep(Duration::from_millis(50));
    clock.set_bpm(300.).unwrap();
    thread::sleep(Duration::from_millis(100));
    clock.stop().unwrap();
    thread::sleep(Duration::from_millis(30));

    let pulses: Vec<ClockEvent> = drain(&rx)
        .into_iter()
        .filter(|e| e.kind == ClockEventKind::Pulse)
        .collect();
    let gaps: Vec<Duration> = pulses.windows(2).map(|w| w[1].target - w[0].target).collect();
    let fast = Bpm::new(600.).unwrap().pulse_interval(24);
    let slow = Bpm::new(300.).unwrap().pulse_interval(24);
    let close = |a: Duration, b: Duration| a.abs_diff(b) <= Duration::from_micros(1);

    assert!(close(gaps[0], fast));
    assert!(close(*gaps.last().unwrap(), slow));
    // the change happens once, between two pulses
    let switch = gaps.iter().position(|g| close(*g, slow)).unwrap();
    assert!(gaps[..switch].iter().all(|g| close(*g, fast)));
    assert!(gaps[switch..].iter().all(|g| close(*g, slow)));
}

/// Forwards events, but blocks on its first one until the gate opens
struct GatedSink {
    gate: Option<crossbeam_channel::Receiver<()>>,
    out: crossbeam_channel::Sender<ClockEvent>,
}

impl PulseSink for GatedSink {
    fn send(&mut self, event: &ClockEvent) -> Result<(), SinkError> {
        if let Some(gate) = self.gate.take() {
            let _ = gate.recv();
        }
        self.out.send(*event).map_err(|_| SinkError::Disconnected)
    }
}

fn gated() -> (
    GatedSink,
    crossbeam_channel::Sender<()>,
    crossbeam_channel::Receiver<ClockEvent>,
) {
    let (gate_tx, gate_rx) = crossbeam_channel::bounded(0);
    let (tx, rx) = crossbeam_channel::unbounded();
    let sink = GatedSink {
        gate: Some(gate_rx),
        out: tx,
    };
    (sink, gate_tx, rx)
}

#[test]
fn stop_survives_a_blocked_sink() {
    let (sink, gate, rx) = gated();
    let config = ClockConfig {
        bpm: 600.,
        queue_capacity: 4,
        ..ClockConfig::default()
    };
    let clock = TransportClock::spawn(config, sink).unwrap();
    let started = Instant::now();
    clock.start().unwrap();
    thread::sleep(Duration::from_millis(150));

    // the sink is stuck on Start, yet the transport keeps time
    let running = clock.position();
    let due = started.elapsed().as_secs_f64() / Bpm::new(600.).unwrap().pulse_interval(24).as_secs_f64();
    assert!(running >= 15, "only {running} pulses in 150 ms");
    assert!(running as f64 <= due + 1., "{running} pulses, {due} due");
    clock.stop().unwrap();
    thread::sleep(Duration::from_millis(20));
    let stopped = clock.snapshot();
    assert_eq!(stopped.phase, Phase::Paused);

    drop(gate);
    thread::sleep(Duration::from_millis(50));
    let events = drain(&rx);
    let kinds: Vec<ClockEventKind> = events.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        [
            ClockEventKind::Start,
            ClockEventKind::Pulse,
            ClockEventKind::Pulse,
            ClockEventKind::Pulse,
            ClockEventKind::Pulse,
            ClockEventKind::Stop,
        ]
    );
    let positions: Vec<u64> = events.iter().map(|e| e.position).collect();
    assert_eq!(positions, [0, 1, 2, 3, 4, stopped.position]);
}

#[test]
fn queue_drains_after_a_slow_sink_catches_up() {
    let (sink, gate, rx) = gated();
    let config = ClockConfig {
        bpm: 600.,
        queue_capacity: 4,
        ..ClockConfig::default()
    };
    let clock = TransportClock::spawn(config, sink).unwrap();
    clock.start().unwrap();
    thread::sleep(Duration::from_millis(60));
    drop(gate);
    thread::sleep(Duration::from_millis(60));
    clock.stop().unwrap();
    thread::sleep(Duration::from_millis(30));

    let events = drain(&rx);
    assert_eq!(events[0].kind, ClockEventKind::Start);
    assert_eq!(events.last().unwrap().kind, ClockEventKind::Stop);
    // once unblocked, pulses flow again in order
    let pulses: Vec<u64> = events
        .iter()
        .filter(|e| e.kind == ClockEventKind::Pulse)
        .map(|e| e.position)
        .collect();
    assert!(pulses.len() > 4, "only {} pulses delivered", pulses.len());
    assert!(pulses.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(*pulses.last().unwrap(), clock.position());
}

#[test]
fn drop_does_not_wait_on_a_blocked_sink() {
    let (sink, gate, _rx) = gated();
    let clock = TransportClock::spawn(ClockConfig::with_bpm(600.), sink).unwrap();
    clock.start().unwrap();
    thread::sleep(Duration::from_millis(20));

    let dropping = Instant::now();
    drop(clock);
    assert!(dropping.elapsed() < Duration::from_secs(2));
    drop(gate);
}

#[test]
fn resolution_change_while_running() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let clock = TransportClock::spawn(ClockConfig::with_bpm(300.), tx).unwrap();
    assert!(matches!(clock.set_ppqn(0), Err(ClockError::InvalidPpqn)));
    clock.start().unwrap();
    thread::sleep(Duration::from_millis(50));
    clock.set_ppqn(48).unwrap();
    thread::sleep(Duration::from_millis(100));
    clock.stop().unwrap();
    thread::sleep(Duration::from_millis(30));
    assert_eq!(clock.ppqn(), 48);

    let pulses: Vec<ClockEvent> = drain(&rx)
        .into_iter()
        .filter(|e| e.kind == ClockEventKind::Pulse)
        .collect();
    let gaps: Vec<Duration> = pulses.windows(2).map(|w| w[1].target - w[0].target).collect();
    let bpm = Bpm::new(300.).unwrap();
    let close = |a: Duration, b: Duration| a.abs_diff(b) <= Duration::from_micros(1);

    assert!(close(gaps[0], bpm.pulse_interval(24)));
    assert!(close(*gaps.last().unwrap(), bpm.pulse_interval(48)));
    let switch = gaps.iter().position(|g| close(*g, bpm.pulse_interval(48))).unwrap();
    assert!(gaps[switch..].iter().all(|g| close(*g, bpm.pulse_interval(48))));
}
