//! Proactive scheduler: single-owner state machine behind the tick loop.
//!
//! Phases: Idle → Armed ⇄ Fetching, any → Stopped (until restarted).
//!
//! There is exactly one timer slot: arming replaces whatever was pending, so
//! repeated starts or enable toggles never stack timers. The fetch itself runs
//! on the runtime's worker; this type hands out a [`FetchJob`] from
//! [`ProactiveScheduler::tick`] and receives its outcome in
//! [`ProactiveScheduler::complete`].
//!
//! Every fetch carries a [`FetchTicket`]. Only the ticket that set the
//! in-flight flag can clear it, and `stop()` bumps the epoch so outcomes of
//! fetches started before a stop are discarded.

pub mod delay;
pub mod runtime;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::Config;
use crate::fetcher::{self, FetchOutcome};
use crate::message::PendingMessage;
use crate::notification::{Notification, NotificationPresenter};
use crate::storage::pending_log::PendingMessageLog;

// ─── Types ───

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerPhase {
    Idle,
    Armed,
    Fetching,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FetchTicket {
    pub id: u64,
    pub epoch: u64,
}

/// Work item for the fetch worker: the ticket plus a config snapshot.
#[derive(Debug, Clone)]
pub struct FetchJob {
    pub ticket: FetchTicket,
    pub config: Config,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NotRunning,
    FetchInFlight,
    Disabled,
    ConfigIncomplete,
}

#[derive(Debug)]
pub enum Tick {
    /// A fetch was started; the next timer is armed when it completes.
    Fetch(FetchJob),
    /// No fetch; the timer was re-armed.
    Skipped(SkipReason),
    /// Idle or stopped: nothing to do, nothing armed.
    Inactive,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScheduleState {
    pub running: bool,
    pub fetch_in_flight: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerStats {
    pub ticks: u64,
    pub fetches: u64,
    pub skipped: u64,
    pub delivered: u64,
    pub fallbacks: u64,
    pub discarded: u64,
    pub timers_armed: u64,
    pub last_delay_ms: Option<u64>,
    pub last_delivered_at: Option<String>,
}

/// Point-in-time view for status reporting.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerSnapshot {
    pub phase: SchedulerPhase,
    pub state: ScheduleState,
    pub timer_pending: bool,
    pub next_tick_in_ms: Option<u64>,
    pub config: Config,
    pub stats: SchedulerStats,
}

#[derive(Debug, Clone, Copy)]
struct Timer {
    delay: Duration,
    deadline: Instant,
}

// ─── Scheduler ───

pub struct ProactiveScheduler {
    config: Config,
    phase: SchedulerPhase,
    running: bool,
    in_flight: Option<FetchTicket>,
    timer: Option<Timer>,
    epoch: u64,
    next_fetch_id: u64,
    log: PendingMessageLog,
    presenter: Arc<dyn NotificationPresenter>,
    stats: SchedulerStats,
}

impl ProactiveScheduler {
    pub fn new(log: PendingMessageLog, presenter: Arc<dyn NotificationPresenter>) -> Self {
        Self {
            config: Config::default(),
            phase: SchedulerPhase::Idle,
            running: false,
            in_flight: None,
            timer: None,
            epoch: 0,
            next_fetch_id: 1,
            log,
            presenter,
            stats: SchedulerStats::default(),
        }
    }

    pub fn phase(&self) -> SchedulerPhase {
        self.phase
    }

    pub fn state(&self) -> ScheduleState {
        ScheduleState {
            running: self.running,
            fetch_in_flight: self.in_flight.is_some(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    /// Deadline of the pending timer, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.timer.map(|t| t.deadline)
    }

    /// Delay of the pending timer, if any.
    pub fn pending_delay(&self) -> Option<Duration> {
        self.timer.map(|t| t.delay)
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            phase: self.phase,
            state: self.state(),
            timer_pending: self.timer.is_some(),
            next_tick_in_ms: self
                .deadline()
                .map(|d| d.saturating_duration_since(Instant::now()).as_millis() as u64),
            config: self.config.redacted(),
            stats: self.stats.clone(),
        }
    }

    pub fn set_presenter(&mut self, presenter: Arc<dyn NotificationPresenter>) {
        self.presenter = presenter;
    }

    /// Apply `config` and (re)arm the single timer. A repeated start re-arms
    /// in place; it never adds a second timer.
    pub fn start(&mut self, config: Config) {
        self.config = config;
        let first_start = !self.running;
        self.running = true;
        self.phase = if self.in_flight.is_some() {
            SchedulerPhase::Fetching
        } else {
            SchedulerPhase::Armed
        };

        if first_start {
            self.present(&Notification::service_status());
        }
        let delay = self.arm();
        if first_start {
            tracing::info!(delay_secs = delay.as_secs(), "Scheduler started, first proactive check armed");
        } else {
            tracing::info!(
                delay_secs = delay.as_secs(),
                interval_ms = self.config.interval_ms,
                "Scheduler already running, timer re-armed with updated config"
            );
        }
    }

    /// Cancel the pending timer. An in-flight fetch may finish, but its
    /// outcome is discarded.
    pub fn stop(&mut self) {
        if self.phase == SchedulerPhase::Stopped {
            return;
        }
        self.running = false;
        self.timer = None;
        self.phase = SchedulerPhase::Stopped;
        self.epoch += 1;
        tracing::info!(fetch_in_flight = self.in_flight.is_some(), "Scheduler stopped");
    }

    /// Toggle the master switch. Disabling leaves the timer alone: future
    /// ticks skip and re-arm. Enabling arms a timer only if none is pending.
    pub fn set_proactive_mode(&mut self, enabled: bool) {
        self.config.proactive_enabled = enabled;
        if enabled && self.running && self.timer.is_none() {
            self.arm();
        }
        tracing::info!(enabled, timer_pending = self.timer.is_some(), "Proactive mode updated");
    }

    /// Timer fired. Either starts exactly one fetch or re-arms immediately.
    pub fn tick(&mut self) -> Tick {
        if matches!(self.phase, SchedulerPhase::Idle | SchedulerPhase::Stopped) {
            self.timer = None;
            return Tick::Inactive;
        }
        self.timer = None;
        self.stats.ticks += 1;

        tracing::debug!(
            running = self.running,
            fetch_in_flight = self.in_flight.is_some(),
            enabled = self.config.proactive_enabled,
            "Proactive timer fired"
        );

        let skip = if !self.running {
            Some(SkipReason::NotRunning)
        } else if self.in_flight.is_some() {
            Some(SkipReason::FetchInFlight)
        } else if !self.config.proactive_enabled {
            Some(SkipReason::Disabled)
        } else if !self.config.is_complete() {
            tracing::debug!("api_key or api_url missing, skipping fetch");
            Some(SkipReason::ConfigIncomplete)
        } else {
            None
        };

        if let Some(reason) = skip {
            self.stats.skipped += 1;
            let delay = self.arm();
            tracing::debug!(reason = ?reason, delay_secs = delay.as_secs(), "Tick skipped");
            return Tick::Skipped(reason);
        }

        let ticket = FetchTicket {
            id: self.next_fetch_id,
            epoch: self.epoch,
        };
        self.next_fetch_id += 1;
        self.in_flight = Some(ticket);
        self.phase = SchedulerPhase::Fetching;
        self.stats.fetches += 1;
        Tick::Fetch(FetchJob {
            ticket,
            config: self.config.clone(),
        })
    }

    /// Route a finished fetch: success content or a fallback line goes to the
    /// pending log and the presenter, then the timer is re-armed.
    pub fn complete(&mut self, ticket: FetchTicket, outcome: FetchOutcome) {
        if self.in_flight != Some(ticket) {
            tracing::warn!(fetch_id = ticket.id, "Stale fetch completion ignored");
            return;
        }
        self.in_flight = None;

        if !self.running || ticket.epoch != self.epoch {
            self.stats.discarded += 1;
            tracing::info!(fetch_id = ticket.id, "Fetch finished after stop, outcome discarded");
            if self.running {
                self.phase = SchedulerPhase::Armed;
                if self.timer.is_none() {
                    self.arm();
                }
            }
            return;
        }

        let content = match outcome {
            FetchOutcome::Success(content) => content,
            FetchOutcome::Failure(reason) => {
                self.stats.fallbacks += 1;
                tracing::warn!(error = %reason, "Fetch failed, using fallback message");
                fetcher::pick_fallback(&mut rand::thread_rng()).to_string()
            }
        };
        self.deliver(content);

        self.phase = SchedulerPhase::Armed;
        let delay = self.arm();
        tracing::debug!(delay_secs = delay.as_secs(), "Scheduling next proactive check");
    }

    /// The worker could not accept a job: release the ticket and re-arm.
    pub fn abandon(&mut self, ticket: FetchTicket) {
        if self.in_flight != Some(ticket) {
            return;
        }
        self.in_flight = None;
        self.stats.fetches = self.stats.fetches.saturating_sub(1);
        if self.running {
            self.phase = SchedulerPhase::Armed;
            self.arm();
        }
    }

    fn deliver(&mut self, content: String) {
        if let Err(e) = self.log.append(PendingMessage::assistant(content.clone())) {
            tracing::warn!(error = %e, "Failed to persist proactive message");
        }
        self.present(&Notification::proactive(&content));
        self.stats.delivered += 1;
        self.stats.last_delivered_at = Some(chrono::Utc::now().to_rfc3339());
    }

    fn present(&self, notification: &Notification) {
        let presenter = &self.presenter;
        if std::panic::catch_unwind(AssertUnwindSafe(|| presenter.present(notification))).is_err() {
            tracing::error!(channel = %notification.channel, "Presenter panicked. Scheduler continues.");
        }
    }

    fn arm(&mut self) -> Duration {
        let delay = delay::next_delay(&self.config, &mut rand::thread_rng());
        self.timer = Some(Timer {
            delay,
            deadline: Instant::now() + delay,
        });
        self.stats.timers_armed += 1;
        self.stats.last_delay_ms = Some(delay.as_millis() as u64);
        delay
    }
}
