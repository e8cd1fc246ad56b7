//! Desktop notifications through `notify-send`
//!
//! Each notification is raised with a default click action; the spawned
//! reporter task waits for `notify-send` to exit and forwards a click to
//! the event channel.

use async_trait::async_trait;
use std::process::Stdio;
use tickwatch_host_api::{
    NotificationRequest, Notifier, NotifierEvent, NotifyError, NotifyResult,
};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

const APP_NAME: &str = "tickwatch";

/// Notifier backed by the `notify-send` CLI (libnotify)
pub struct DesktopNotifier {
    event_tx: mpsc::UnboundedSender<NotifierEvent>,
    event_rx: std::sync::Mutex<Option<mpsc::UnboundedReceiver<NotifierEvent>>>,
}

impl DesktopNotifier {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            event_tx: tx,
            event_rx: std::sync::Mutex::new(Some(rx)),
        }
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    async fn show(&self, request: NotificationRequest) -> NotifyResult<()> {
        let mut cmd = Command::new("notify-send");
        cmd.arg(format!("--app-name={APP_NAME}"))
            .arg("--action=default=열기")
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        if let Some(timeout) = request.timeout {
            cmd.arg(format!("--expire-time={}", timeout.as_millis()));
        }

        cmd.arg(&request.title).arg(&request.body);

        let child = cmd
            .spawn()
            .map_err(|e| NotifyError::ShowFailed(format!("notify-send spawn failed: {e}")))?;

        debug!(ticket_id = %request.ticket_id, "Notification shown");

        // notify-send blocks until the notification is dismissed or
        // clicked when an action is registered; wait in the background
        // and report the click.
        let event_tx = self.event_tx.clone();
        let ticket_id = request.ticket_id.clone();
        tokio::spawn(async move {
            match child.wait_with_output().await {
                Ok(output) => {
                    let action = String::from_utf8_lossy(&output.stdout);
                    if action.trim() == "default" {
                        let _ = event_tx.send(NotifierEvent::Clicked { ticket_id });
                    }
                }
                Err(e) => {
                    warn!(ticket_id = %ticket_id, error = %e, "notify-send wait failed");
                }
            }
        });

        Ok(())
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<NotifierEvent> {
        self.event_rx
            .lock()
            .unwrap()
            .take()
            .expect("subscribe() can only be called once")
    }
}
