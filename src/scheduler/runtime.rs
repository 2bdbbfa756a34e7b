//! Scheduler runtime: control thread + single fetch worker.
//!
//! Architecture:
//!   callers → SchedulerRuntime (commands over mpsc) → control thread
//!   control thread owns ProactiveScheduler, waits on recv_timeout(deadline),
//!   ticks, presents, and mutates state
//!   fetch worker (sync_channel(1)) runs one blocking fetch at a time and hands
//!   the outcome back as a single FetchDone message

use std::panic::AssertUnwindSafe;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::constants::IPC_TIMEOUT_SECS;
use crate::fetcher::{FetchFailure, FetchOutcome, MessageFetcher};
use crate::notification::NotificationPresenter;
use crate::{ProactiveError, ProactiveResult};

use super::{FetchJob, FetchTicket, ProactiveScheduler, SchedulerSnapshot, Tick};

enum Command {
    Start(Config),
    Stop,
    SetProactiveMode(bool),
    SetPresenter(Arc<dyn NotificationPresenter>),
    Snapshot(Sender<SchedulerSnapshot>),
    Shutdown,
}

enum Event {
    Command(Command),
    FetchDone {
        ticket: FetchTicket,
        outcome: FetchOutcome,
    },
}

pub struct SchedulerRuntime {
    tx: Sender<Event>,
    control: Option<JoinHandle<()>>,
}

impl SchedulerRuntime {
    /// Spawn the control thread (which owns `scheduler`) and the fetch worker.
    pub fn spawn(
        scheduler: ProactiveScheduler,
        fetcher: Arc<dyn MessageFetcher>,
    ) -> ProactiveResult<Self> {
        let (tx, rx) = mpsc::channel::<Event>();
        let (job_tx, job_rx) = mpsc::sync_channel::<FetchJob>(1);

        let worker = {
            let events = tx.clone();
            std::thread::Builder::new()
                .name("proactive-fetch".into())
                .spawn(move || {
                    tracing::debug!("Fetch worker started");
                    worker_loop(job_rx, fetcher, events);
                    tracing::debug!("Fetch worker stopped");
                })?
        };

        let control = std::thread::Builder::new()
            .name("proactive-control".into())
            .spawn(move || {
                control_loop(scheduler, rx, job_tx);
                let _ = worker.join();
                tracing::info!("Scheduler runtime stopped");
            })?;

        Ok(Self {
            tx,
            control: Some(control),
        })
    }

    pub fn start(&self, config: Config) -> ProactiveResult<()> {
        self.send(Command::Start(config))
    }

    pub fn stop(&self) -> ProactiveResult<()> {
        self.send(Command::Stop)
    }

    pub fn set_proactive_mode(&self, enabled: bool) -> ProactiveResult<()> {
        self.send(Command::SetProactiveMode(enabled))
    }

    pub fn set_presenter(&self, presenter: Arc<dyn NotificationPresenter>) -> ProactiveResult<()> {
        self.send(Command::SetPresenter(presenter))
    }

    pub fn snapshot(&self) -> ProactiveResult<SchedulerSnapshot> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.send(Command::Snapshot(reply_tx))?;
        reply_rx
            .recv_timeout(Duration::from_secs(IPC_TIMEOUT_SECS))
            .map_err(|_| ProactiveError::InvalidState("scheduler did not answer snapshot".into()))
    }

    /// Stop scheduling and join the threads. An in-flight fetch finishes
    /// first (bounded by the HTTP timeouts); its outcome is discarded.
    pub fn shutdown(&mut self) {
        let _ = self.tx.send(Event::Command(Command::Shutdown));
        if let Some(handle) = self.control.take() {
            let _ = handle.join();
        }
    }

    fn send(&self, command: Command) -> ProactiveResult<()> {
        self.tx
            .send(Event::Command(command))
            .map_err(|_| ProactiveError::InvalidState("scheduler runtime is not running".into()))
    }
}

impl Drop for SchedulerRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn control_loop(
    mut scheduler: ProactiveScheduler,
    rx: Receiver<Event>,
    job_tx: SyncSender<FetchJob>,
) {
    loop {
        let event = match scheduler.deadline() {
            Some(deadline) => {
                let wait = deadline.saturating_duration_since(Instant::now());
                match rx.recv_timeout(wait) {
                    Ok(event) => Some(event),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match rx.recv() {
                Ok(event) => Some(event),
                Err(_) => break,
            },
        };

        match event {
            None => {
                if let Tick::Fetch(job) = scheduler.tick() {
                    dispatch(&mut scheduler, &job_tx, job);
                }
            }
            Some(Event::FetchDone { ticket, outcome }) => scheduler.complete(ticket, outcome),
            Some(Event::Command(command)) => match command {
                Command::Start(config) => scheduler.start(config),
                Command::Stop => scheduler.stop(),
                Command::SetProactiveMode(enabled) => scheduler.set_proactive_mode(enabled),
                Command::SetPresenter(presenter) => scheduler.set_presenter(presenter),
                Command::Snapshot(reply) => {
                    let _ = reply.send(scheduler.snapshot());
                }
                Command::Shutdown => break,
            },
        }
    }

    scheduler.stop();
    // Dropping job_tx lets the worker exit once its current fetch returns.
    drop(job_tx);
}

fn dispatch(scheduler: &mut ProactiveScheduler, job_tx: &SyncSender<FetchJob>, job: FetchJob) {
    let ticket = job.ticket;
    match job_tx.try_send(job) {
        Ok(()) => tracing::debug!(fetch_id = ticket.id, "Fetch job queued"),
        Err(TrySendError::Full(_)) => {
            tracing::error!(fetch_id = ticket.id, "Fetch worker busy, job dropped");
            scheduler.abandon(ticket);
        }
        Err(TrySendError::Disconnected(_)) => {
            tracing::error!(fetch_id = ticket.id, "Fetch worker disconnected, job dropped");
            scheduler.abandon(ticket);
        }
    }
}

fn worker_loop(rx: Receiver<FetchJob>, fetcher: Arc<dyn MessageFetcher>, events: Sender<Event>) {
    while let Ok(job) = rx.recv() {
        let start = Instant::now();
        let outcome = match std::panic::catch_unwind(AssertUnwindSafe(|| fetcher.fetch(&job.config))) {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::error!(fetch_id = job.ticket.id, "Fetcher panicked. Worker continues.");
                FetchOutcome::Failure(FetchFailure::Network("fetcher panicked".into()))
            }
        };
        tracing::debug!(
            fetch_id = job.ticket.id,
            duration_ms = start.elapsed().as_millis() as u64,
            "Fetch finished"
        );
        let done = Event::FetchDone {
            ticket: job.ticket,
            outcome,
        };
        if events.send(done).is_err() {
            break;
        }
    }
}
