#![doc = r#"
A MIDI beat clock with Start/Stop/Continue transport.

[`TransportClock::spawn`] starts two threads. The scheduling thread owns a
[`TransportState`] and sleeps on its command channel until the next pulse is
due, so a Stop sent before that deadline is always applied before the pulse.
Events go through a queue to the delivery thread, which hands them to a
[`PulseSink`] in order. A slow sink never holds the scheduler back. Once
[`ClockConfig::queue_capacity`] pulses are waiting, further pulses are
dropped, but Start, Stop and Continue are always queued. Sink failures never
stop the clock; they are logged and can be drained with
[`TransportClock::failures`].
"#]

mod sink;
pub use sink::*;

mod state;
pub use state::*;

use std::{
    sync::{
        Arc,
        atomic::{AtomicU16, AtomicU64, AtomicUsize, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryIter, TrySendError};
use thiserror::Error;

/// Errors from configuring or driving a [`TransportClock`]
#[derive(Debug, Error)]
pub enum ClockError {
    /// Tempo must be finite and positive
    #[error("Invalid tempo {0} BPM")]
    InvalidBpm(f64),
    /// At least one pulse per quarter note is needed
    #[error("Pulses per quarter note must be positive")]
    InvalidPpqn,
    /// The event queue needs room for at least one event
    #[error("Queue capacity must be positive")]
    InvalidQueueCapacity,
    /// A clock thread could not be started
    #[error("Could not spawn the clock thread: {0}")]
    Spawn(#[source] std::io::Error),
    /// The scheduling thread is no longer running
    #[error("The clock thread has exited")]
    Disconnected,
}

/// Settings for [`TransportClock::spawn`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClockConfig {
    /// Initial tempo in beats per minute
    pub bpm: f64,
    /// Pulses per quarter note. MIDI beat clock uses 24.
    pub ppqn: u16,
    /// How many undelivered pulses may queue up before new ones are dropped.
    /// Start, Stop and Continue are never dropped.
    pub queue_capacity: usize,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            bpm: 120.,
            ppqn: 24,
            queue_capacity: 256,
        }
    }
}

impl ClockConfig {
    /// The default configuration at the given tempo
    pub fn with_bpm(bpm: f64) -> Self {
        Self {
            bpm,
            ..Self::default()
        }
    }
}

/// An event the sink failed to deliver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkFailure {
    /// The event that was not delivered
    pub event: ClockEvent,
    /// Why
    pub error: SinkError,
}

const FAILURE_CAPACITY: usize = 64;

/// How long dropping a clock waits for the sink to finish queued events
const DELIVERY_GRACE: Duration = Duration::from_millis(500);

enum Request {
    Transport(TransportCommand),
    Shutdown,
}

#[doc = r#"
A running MIDI beat clock.

The clock starts out stopped. Dropping it stops the scheduling thread and
gives the delivery thread a short grace period to flush the queue. A sink
that is still blocked after that is left to finish on its own.

# Example
```rust,no_run
# use maxmidi::prelude::*;
let (tx, rx) = crossbeam_channel::unbounded();
let clock = TransportClock::spawn(ClockConfig::with_bpm(128.), tx).unwrap();
clock.start().unwrap();

for event in rx.iter().take(25) {
    println!("{:?} at position {}", event.kind, event.position);
}
clock.stop().unwrap();
```
"#]
pub struct TransportClock {
    commands: Sender<Request>,
    shared: Arc<Shared>,
    failures: Receiver<SinkFailure>,
    delivered: Receiver<()>,
    scheduler: Option<JoinHandle<()>>,
    delivery: Option<JoinHandle<()>>,
}

/// State published by the scheduling thread
struct Shared {
    snapshot: AtomicU64,
    ppqn: AtomicU16,
}

impl Shared {
    fn publish(&self, state: &TransportState) {
        self.ppqn.store(state.ppqn(), Ordering::Relaxed);
        self.snapshot.store(state.snapshot().pack(), Ordering::Release);
    }
}

/// The scheduler's end of the event queue
struct Outbox {
    events: Sender<ClockEvent>,
    queued_pulses: Arc<AtomicUsize>,
    capacity: usize,
}

impl Outbox {
    /// Queue an event. Pulses beyond the capacity are dropped.
    ///
    /// Returns `false` once the delivery thread has gone away.
    fn push(&self, event: ClockEvent) -> bool {
        if event.kind == ClockEventKind::Pulse {
            if self.queued_pulses.load(Ordering::Acquire) >= self.capacity {
                tracing::warn!("Clock sink is behind, dropping pulse {}", event.position);
                return true;
            }
            self.queued_pulses.fetch_add(1, Ordering::AcqRel);
        }
        if self.events.send(event).is_err() {
            tracing::warn!("Clock delivery thread has exited");
            return false;
        }
        true
    }
}

impl TransportClock {
    /// Validate `config` and start the clock threads, stopped at position zero.
    pub fn spawn<S: PulseSink>(config: ClockConfig, sink: S) -> Result<Self, ClockError> {
        let bpm = Bpm::new(config.bpm)?;
        if config.queue_capacity == 0 {
            return Err(ClockError::InvalidQueueCapacity);
        }
        let state = TransportState::new(bpm, config.ppqn, Instant::now())?;
        let shared = Arc::new(Shared {
            snapshot: AtomicU64::new(state.snapshot().pack()),
            ppqn: AtomicU16::new(state.ppqn()),
        });

        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let (failure_tx, failure_rx) = crossbeam_channel::bounded(FAILURE_CAPACITY);
        // never sent on; disconnects when the delivery thread returns
        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(0);
        let queued_pulses = Arc::new(AtomicUsize::new(0));

        let delivery = thread::Builder::new()
            .name("maxmidi-clock-delivery".into())
            .spawn({
                let failure_rx = failure_rx.clone();
                let queued_pulses = Arc::clone(&queued_pulses);
                move || {
                    let _done = done_tx;
                    deliver(event_rx, queued_pulses, sink, (failure_tx, failure_rx))
                }
            })
            .map_err(ClockError::Spawn)?;

        let outbox = Outbox {
            events: event_tx,
            queued_pulses,
            capacity: config.queue_capacity,
        };
        let published = Arc::clone(&shared);
        // if this fails, `outbox` is dropped with the closure and delivery exits
        let scheduler = thread::Builder::new()
            .name("maxmidi-clock".into())
            .spawn(move || schedule(state, command_rx, outbox, published))
            .map_err(ClockError::Spawn)?;

        tracing::debug!(
            "Clock spawned at {} BPM, {} PPQN",
            bpm.value(),
            config.ppqn
        );

        Ok(Self {
            commands: command_tx,
            shared,
            failures: failure_rx,
            delivered: done_rx,
            scheduler: Some(scheduler),
            delivery: Some(delivery),
        })
    }

    /// Start from position zero, sending Start. Ignored while running.
    pub fn start(&self) -> Result<(), ClockError> {
        self.request(TransportCommand::Start)
    }

    /// Stop, sending Stop and keeping the position. Ignored unless running.
    pub fn stop(&self) -> Result<(), ClockError> {
        self.request(TransportCommand::Stop)
    }

    /// Resume from the kept position, sending Continue. Ignored unless stopped
    /// after having run.
    pub fn continue_(&self) -> Result<(), ClockError> {
        self.request(TransportCommand::Continue)
    }

    /// Change the tempo. While running, the new tempo spaces the pulses after
    /// the one currently scheduled.
    pub fn set_bpm(&self, bpm: f64) -> Result<(), ClockError> {
        let bpm = Bpm::new(bpm)?;
        self.request(TransportCommand::SetBpm(bpm))
    }

    /// Change the pulses per quarter note. While running, the new resolution
    /// spaces the pulses after the one currently scheduled.
    pub fn set_ppqn(&self, ppqn: u16) -> Result<(), ClockError> {
        if ppqn == 0 {
            return Err(ClockError::InvalidPpqn);
        }
        self.request(TransportCommand::SetPpqn(ppqn))
    }

    /// Phase and position as of the last event, read together
    pub fn snapshot(&self) -> TransportSnapshot {
        TransportSnapshot::unpack(self.shared.snapshot.load(Ordering::Acquire))
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.snapshot().phase
    }

    /// Pulses emitted since Start
    pub fn position(&self) -> u64 {
        self.snapshot().position
    }

    /// Pulses per quarter note currently in effect
    pub fn ppqn(&self) -> u16 {
        self.shared.ppqn.load(Ordering::Relaxed)
    }

    /// Drain the delivery failures recorded so far.
    ///
    /// Only the most recent failures are kept if they are not drained.
    pub fn failures(&self) -> TryIter<'_, SinkFailure> {
        self.failures.try_iter()
    }

    fn request(&self, command: TransportCommand) -> Result<(), ClockError> {
        self.commands
            .send(Request::Transport(command))
            .map_err(|_| ClockError::Disconnected)
    }
}

impl Drop for TransportClock {
    fn drop(&mut self) {
        let _ = self.commands.send(Request::Shutdown);
        if let Some(handle) = self.scheduler.take() {
            if handle.join().is_err() {
                tracing::warn!("The clock thread panicked");
            }
        }
        let Some(handle) = self.delivery.take() else {
            return;
        };
        match self.delivered.recv_timeout(DELIVERY_GRACE) {
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!("Clock sink is still blocked, detaching the delivery thread");
            }
            _ => {
                if handle.join().is_err() {
                    tracing::warn!("The clock delivery thread panicked");
                }
            }
        }
    }
}

/// The scheduling loop: wait for a request or the next deadline, whichever
/// comes first.
fn schedule(
    mut state: TransportState,
    commands: Receiver<Request>,
    outbox: Outbox,
    shared: Arc<Shared>,
) {
    loop {
        let received = match state.next_deadline() {
            Some(deadline) => match commands.recv_deadline(deadline) {
                Ok(request) => Some(request),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match commands.recv() {
                Ok(request) => Some(request),
                Err(_) => break,
            },
        };

        let event = match received {
            Some(Request::Shutdown) => break,
            Some(Request::Transport(command)) => state.apply(command, Instant::now()),
            None => state.pulse(Instant::now()),
        };
        shared.publish(&state);

        if let Some(event) = event {
            if !outbox.push(event) {
                break;
            }
        }
    }
    tracing::debug!("Clock stopped at position {}", state.position());
}

/// The delivery loop: hand every queued event to the sink, in order.
fn deliver<S: PulseSink>(
    events: Receiver<ClockEvent>,
    queued_pulses: Arc<AtomicUsize>,
    mut sink: S,
    (failures, oldest): (Sender<SinkFailure>, Receiver<SinkFailure>),
) {
    for event in events.iter() {
        if event.kind == ClockEventKind::Pulse {
            queued_pulses.fetch_sub(1, Ordering::AcqRel);
        }
        if let Err(error) = sink.send(&event) {
            tracing::warn!(
                "Failed to deliver {:?} at position {}: {}",
                event.kind,
                event.position,
                error
            );
            if let Err(TrySendError::Full(failure)) = failures.try_send(SinkFailure { event, error }) {
                // keep the most recent failures
                let _ = oldest.try_recv();
                let _ = failures.try_send(failure);
            }
        }
    }
}
