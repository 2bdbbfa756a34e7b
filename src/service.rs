//! Service lifecycle: bridges host commands to the scheduler runtime.
//!
//! Owns the process-wide running flag and the config store. Every config
//! mutation is persisted before it is applied to the running scheduler, so a
//! relaunched process resumes from the last saved state.

use std::sync::Arc;

use serde::Serialize;

use crate::config::{Config, StartRequest};
use crate::fetcher::MessageFetcher;
use crate::message::PendingMessage;
use crate::notification::{presenter_for, NotificationPresenter};
use crate::scheduler::runtime::SchedulerRuntime;
use crate::scheduler::{ProactiveScheduler, SchedulerSnapshot};
use crate::storage::config_store::ConfigStore;
use crate::storage::pending_log::PendingMessageLog;
use crate::ProactiveResult;

/// The environment hosting this process. Teardown cannot be prevented,
/// only followed by a relaunch request.
pub trait HostEnvironment: Send + Sync {
    fn request_relaunch(&self) -> ProactiveResult<()>;
}

/// Relaunch by spawning `current_exe daemon run-foreground --resume`, detached.
pub struct SelfRespawn;

impl HostEnvironment for SelfRespawn {
    fn request_relaunch(&self) -> ProactiveResult<()> {
        let self_bin = std::env::current_exe()?;
        let mut child = std::process::Command::new(&self_bin)
            .args(["daemon", "run-foreground", "--resume"])
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()?;
        tracing::info!(pid = child.id(), "Relaunch requested, replacement daemon spawned");
        std::thread::spawn(move || {
            let _ = child.wait();
        });
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub running: bool,
    pub started_at: Option<String>,
    pub pending_messages: usize,
    pub scheduler: Option<SchedulerSnapshot>,
}

pub struct ServiceLifecycleManager {
    store: ConfigStore,
    log: PendingMessageLog,
    runtime: SchedulerRuntime,
    host: Arc<dyn HostEnvironment>,
    running: bool,
    started_at: Option<String>,
    notify_command: Option<String>,
}

impl ServiceLifecycleManager {
    pub fn new(
        store: ConfigStore,
        log: PendingMessageLog,
        fetcher: Arc<dyn MessageFetcher>,
        host: Arc<dyn HostEnvironment>,
    ) -> ProactiveResult<Self> {
        let notify_command = store.load().notify_command;
        let presenter: Arc<dyn NotificationPresenter> = presenter_for(notify_command.as_deref());
        Self::with_presenter(store, log, fetcher, presenter, host, notify_command)
    }

    /// Construct with an explicit presenter (hosts embedding the library, tests).
    pub fn with_presenter(
        store: ConfigStore,
        log: PendingMessageLog,
        fetcher: Arc<dyn MessageFetcher>,
        presenter: Arc<dyn NotificationPresenter>,
        host: Arc<dyn HostEnvironment>,
        notify_command: Option<String>,
    ) -> ProactiveResult<Self> {
        let scheduler = ProactiveScheduler::new(log.clone(), presenter);
        let runtime = SchedulerRuntime::spawn(scheduler, fetcher)?;
        Ok(Self {
            store,
            log,
            runtime,
            host,
            running: false,
            started_at: None,
            notify_command,
        })
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Current persisted config.
    pub fn config(&self) -> Config {
        self.store.load()
    }

    /// Merge the provided fields into the persisted config, then (re)arm.
    /// Repeated starts re-apply config and re-arm the single timer.
    pub fn on_start(&mut self, request: StartRequest) -> ProactiveResult<()> {
        let mut config = self.store.load();
        if request.merge_into(&mut config) {
            self.store.save(&config)?;
        } else if request.is_empty() {
            tracing::info!("Start without config, resuming from persisted config");
        }

        if config.notify_command != self.notify_command {
            self.runtime
                .set_presenter(presenter_for(config.notify_command.as_deref()))?;
            self.notify_command = config.notify_command.clone();
        }

        tracing::info!(
            api_key_set = config.api_key.as_deref().is_some_and(|k| !k.is_empty()),
            proactive_enabled = config.proactive_enabled,
            proactive_random_enabled = config.proactive_random_enabled,
            interval_ms = config.interval_ms,
            already_running = self.running,
            "Service start"
        );

        self.runtime.start(config)?;
        if !self.running {
            self.running = true;
            self.started_at = Some(chrono::Utc::now().to_rfc3339());
        }
        Ok(())
    }

    pub fn on_stop(&mut self) -> ProactiveResult<()> {
        if self.running {
            tracing::info!("Service stop");
        }
        self.running = false;
        self.started_at = None;
        self.runtime.stop()
    }

    /// Persist the toggle, then apply it. A toggle received while stopped
    /// promotes the service to running first (it may be the first command
    /// after a relaunch).
    pub fn set_proactive_mode(&mut self, enabled: bool) -> ProactiveResult<()> {
        let mut config = self.store.load();
        config.proactive_enabled = enabled;
        self.store.save(&config)?;

        if !self.running {
            self.on_start(StartRequest::default())?;
        }
        self.runtime.set_proactive_mode(enabled)
    }

    /// The host is tearing this process down: stop scheduling and ask the
    /// host to bring a fresh instance back.
    pub fn on_host_teardown(&mut self) -> ProactiveResult<()> {
        tracing::warn!("Host teardown, requesting relaunch");
        self.on_stop()?;
        self.host.request_relaunch()
    }

    pub fn pending_messages(&self) -> Vec<PendingMessage> {
        self.log.load()
    }

    pub fn status(&self) -> ServiceStatus {
        let scheduler = match self.runtime.snapshot() {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::warn!(error = %e, "Scheduler snapshot unavailable");
                None
            }
        };
        ServiceStatus {
            running: self.running,
            started_at: self.started_at.clone(),
            pending_messages: self.log.load().len(),
            scheduler,
        }
    }

    /// Stop and join the scheduler threads.
    pub fn shutdown(mut self) {
        self.running = false;
        self.runtime.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::MIN_INTERVAL_FLOOR_MS;
    use crate::fetcher::FetchOutcome;
    use crate::scheduler::SchedulerPhase;
    use crate::test_helpers::{RecordingPresenter, StubFetcher};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingHost {
        relaunches: AtomicUsize,
    }

    impl HostEnvironment for CountingHost {
        fn request_relaunch(&self) -> ProactiveResult<()> {
            self.relaunches.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn manager(dir: &std::path::Path, host: Arc<CountingHost>) -> ServiceLifecycleManager {
        ServiceLifecycleManager::with_presenter(
            ConfigStore::in_dir(dir),
            PendingMessageLog::in_dir(dir),
            Arc::new(StubFetcher::new(FetchOutcome::Success("hi".into()))),
            Arc::new(RecordingPresenter::default()),
            host,
            None,
        )
        .unwrap()
    }

    fn start_request() -> StartRequest {
        StartRequest {
            api_key: Some("sk-test".into()),
            api_url: Some("http://127.0.0.1:9/v1/chat/completions".into()),
            model: Some("m-1".into()),
            interval_ms: Some(120_000),
            proactive_random_enabled: Some(false),
            notify_command: None,
        }
    }

    #[test]
    fn test_start_persists_and_runs() {
        let dir = tempfile::tempdir().unwrap();
        let mut mgr = manager(dir.path(), Arc::new(CountingHost::default()));
        assert!(!mgr.is_running());

        mgr.on_start(start_request()).unwrap();
        assert!(mgr.is_running());
        let persisted = ConfigStore::in_dir(dir.path()).load();
        assert_eq!(persisted.api_key.as_deref(), Some("sk-test"));
        assert_eq!(persisted.interval_ms, 120_000);

        let status = mgr.status();
        assert!(status.running);
        let sched = status.scheduler.unwrap();
        assert_eq!(sched.phase, SchedulerPhase::Armed);
        assert!(sched.timer_pending);
        mgr.shutdown();
    }

    #[test]
    fn test_repeated_start_keeps_one_timer() {
        let dir = tempfile::tempdir().unwrap();
        let mut mgr = manager(dir.path(), Arc::new(CountingHost::default()));
        mgr.on_start(start_request()).unwrap();
        mgr.on_start(StartRequest {
            interval_ms: Some(240_000),
            ..StartRequest::default()
        })
        .unwrap();

        let sched = mgr.status().scheduler.unwrap();
        assert!(sched.timer_pending);
        assert_eq!(sched.stats.last_delay_ms, Some(240_000));
        assert_eq!(mgr.config().api_key.as_deref(), Some("sk-test"));
        mgr.shutdown();
    }

    #[test]
    fn test_negative_interval_starts_on_floor() {
        let dir = tempfile::tempdir().unwrap();
        let mut mgr = manager(dir.path(), Arc::new(CountingHost::default()));
        mgr.on_start(StartRequest {
            interval_ms: Some(-5),
            ..start_request()
        })
        .unwrap();
        assert!(mgr.is_running());
        assert_eq!(mgr.config().interval_ms, -5);

        let sched = mgr.status().scheduler.unwrap();
        assert!(sched.timer_pending);
        assert_eq!(sched.stats.last_delay_ms, Some(MIN_INTERVAL_FLOOR_MS));
        mgr.shutdown();
    }

    #[test]
    fn test_stop_clears_running() {
        let dir = tempfile::tempdir().unwrap();
        let mut mgr = manager(dir.path(), Arc::new(CountingHost::default()));
        mgr.on_start(start_request()).unwrap();
        mgr.on_stop().unwrap();
        assert!(!mgr.is_running());
        let sched = mgr.status().scheduler.unwrap();
        assert_eq!(sched.phase, SchedulerPhase::Stopped);
        assert!(!sched.timer_pending);
        mgr.shutdown();
    }

    #[test]
    fn test_proactive_toggle_persists_and_promotes() {
        let dir = tempfile::tempdir().unwrap();
        let mut mgr = manager(dir.path(), Arc::new(CountingHost::default()));
        mgr.set_proactive_mode(false).unwrap();
        assert!(mgr.is_running());
        assert!(!ConfigStore::in_dir(dir.path()).load().proactive_enabled);

        mgr.set_proactive_mode(true).unwrap();
        mgr.set_proactive_mode(true).unwrap();
        assert!(mgr.config().proactive_enabled);
        let sched = mgr.status().scheduler.unwrap();
        assert!(sched.timer_pending);
        assert!(sched.config.proactive_enabled);
        mgr.shutdown();
    }

    #[test]
    fn test_teardown_relaunch_resumes_persisted_config() {
        let dir = tempfile::tempdir().unwrap();
        let host = Arc::new(CountingHost::default());

        let mut first = manager(dir.path(), host.clone());
        first
            .on_start(StartRequest {
                proactive_random_enabled: Some(true),
                ..start_request()
            })
            .unwrap();
        first.on_host_teardown().unwrap();
        assert_eq!(host.relaunches.load(Ordering::SeqCst), 1);
        assert!(!first.is_running());
        first.shutdown();

        let mut second = manager(dir.path(), host);
        second.on_start(StartRequest::default()).unwrap();
        let sched = second.status().scheduler.unwrap();
        assert!(sched.state.running);
        assert_eq!(sched.config.api_key.as_deref(), Some("****test"));
        assert_eq!(sched.config.model.as_deref(), Some("m-1"));
        assert!(sched.config.proactive_random_enabled);
        assert_eq!(sched.config.interval_ms, 120_000);
        second.shutdown();
    }
}
