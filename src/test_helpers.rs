//! Shared test utilities: recording presenter, scripted fetcher, configs.
//!
//! Available only under `#[cfg(test)]`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::config::Config;
use crate::fetcher::{FetchOutcome, MessageFetcher};
use crate::notification::{Notification, NotificationPresenter};

/// Config with both credentials set and a fixed interval.
pub fn complete_config(interval_ms: i64) -> Config {
    Config {
        api_key: Some("test-key".into()),
        api_url: Some("http://127.0.0.1:9/v1/chat/completions".into()),
        interval_ms,
        ..Config::default()
    }
}

// ============================================================================
// RecordingPresenter
// ============================================================================

#[derive(Default)]
pub struct RecordingPresenter {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingPresenter {
    pub fn all(&self) -> Vec<Notification> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn count_on(&self, channel: &str) -> usize {
        self.all().iter().filter(|n| n.channel == channel).count()
    }

    pub fn bodies_on(&self, channel: &str) -> Vec<String> {
        self.all()
            .into_iter()
            .filter(|n| n.channel == channel)
            .map(|n| n.body)
            .collect()
    }
}

impl NotificationPresenter for RecordingPresenter {
    fn present(&self, notification: &Notification) {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notification.clone());
    }
}

// ============================================================================
// StubFetcher
// ============================================================================

/// Returns a fixed outcome after an optional delay, tracking concurrency.
pub struct StubFetcher {
    outcome: FetchOutcome,
    delay: Duration,
    active: AtomicUsize,
    max_active: AtomicUsize,
    calls: AtomicUsize,
}

impl StubFetcher {
    pub fn new(outcome: FetchOutcome) -> Self {
        Self {
            outcome,
            delay: Duration::ZERO,
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

impl MessageFetcher for StubFetcher {
    fn fetch(&self, _config: &Config) -> FetchOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}
