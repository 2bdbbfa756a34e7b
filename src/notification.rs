//! Notification presentation: plain records handed to a host alerting surface.
//!
//! Styling is a pure function of the [`Notification`] record. Presenters are
//! fire-and-forget: every failure is logged here and never reaches the scheduler.

use std::process::{Command, Stdio};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::constants::{
    MESSAGE_CHANNEL_ID, MESSAGE_SOUND, MESSAGE_TITLE, SERVICE_BODY, SERVICE_CHANNEL_ID,
    SERVICE_TITLE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Min,
    Low,
    Default,
    High,
}

impl Priority {
    /// Urgency level understood by freedesktop notification daemons.
    pub fn urgency(&self) -> &'static str {
        match self {
            Self::Min | Self::Low => "low",
            Self::Default => "normal",
            Self::High => "critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub channel: String,
    pub priority: Priority,
    pub sound: Option<String>,
}

impl Notification {
    /// A proactive message on the high-priority message channel.
    pub fn proactive(content: &str) -> Self {
        Self {
            title: MESSAGE_TITLE.to_string(),
            body: content.to_string(),
            channel: MESSAGE_CHANNEL_ID.to_string(),
            priority: Priority::High,
            sound: Some(MESSAGE_SOUND.to_string()),
        }
    }

    /// Quiet notice that the service is active.
    pub fn service_status() -> Self {
        Self {
            title: SERVICE_TITLE.to_string(),
            body: SERVICE_BODY.to_string(),
            channel: SERVICE_CHANNEL_ID.to_string(),
            priority: Priority::Min,
            sound: None,
        }
    }
}

pub trait NotificationPresenter: Send + Sync {
    fn present(&self, notification: &Notification);
}

/// Surfaces notifications through the structured log only.
pub struct LogPresenter;

impl NotificationPresenter for LogPresenter {
    fn present(&self, notification: &Notification) {
        tracing::info!(
            channel = %notification.channel,
            priority = ?notification.priority,
            title = %notification.title,
            body = %notification.body,
            "Notification"
        );
    }
}

/// Spawns a host program as `<program> -u <urgency> <title> <body>`
/// (the `notify-send` calling convention). The child is reaped on a
/// background thread so presenting never blocks the control thread.
pub struct CommandPresenter {
    program: String,
}

impl CommandPresenter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl NotificationPresenter for CommandPresenter {
    fn present(&self, notification: &Notification) {
        let spawned = Command::new(&self.program)
            .arg("-u")
            .arg(notification.priority.urgency())
            .arg(&notification.title)
            .arg(&notification.body)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(mut child) => {
                std::thread::spawn(move || {
                    let _ = child.wait();
                });
            }
            Err(e) => tracing::warn!(
                program = %self.program,
                error = %e,
                "Notification command failed to start"
            ),
        }
    }
}

/// Presenter selected by config: the host command if set, else the log.
pub fn presenter_for(notify_command: Option<&str>) -> Arc<dyn NotificationPresenter> {
    match notify_command.filter(|c| !c.trim().is_empty()) {
        Some(cmd) => {
            tracing::info!(program = %cmd, "Using command notification presenter");
            Arc::new(CommandPresenter::new(cmd))
        }
        None => Arc::new(LogPresenter),
    }
}
