//! Host adapter traits

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tickwatch_util::TicketId;
use tokio::sync::mpsc;

/// Errors from the page automation primitive
#[derive(Debug, Error)]
pub enum PageError {
    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("In-page script failed: {0}")]
    Script(String),

    #[error("Page already closed")]
    PageClosed,

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type PageResult<T> = Result<T, PageError>;

/// Opaque handle to an open page, minted by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageHandle(u64);

impl PageHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Options for opening a page
#[derive(Debug, Clone, Copy, Default)]
pub struct PageOptions {
    /// Show the browser window (development aid; headless otherwise)
    pub visible: bool,
}

/// The portal page automation primitive.
///
/// The engine only ever navigates, evaluates opaque scripts, and closes
/// pages; everything site-specific lives in the scripts it passes in.
/// Callers own the page lifecycle: every handle from `render_page` must
/// be given back to `close_page` on every exit path.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate a fresh page to `url` and wait for the initial load
    async fn render_page(&self, url: &str, options: PageOptions) -> PageResult<PageHandle>;

    /// Run a script in the page and return its JSON result
    async fn evaluate(&self, handle: PageHandle, script: &str) -> PageResult<serde_json::Value>;

    /// Release the page
    async fn close_page(&self, handle: PageHandle) -> PageResult<()>;
}

/// Errors from the notification primitive
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Failed to show notification: {0}")]
    ShowFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type NotifyResult<T> = Result<T, NotifyError>;

/// One notification to raise
#[derive(Debug, Clone)]
pub struct NotificationRequest {
    /// Ticket the notification is about; click events carry this back
    pub ticket_id: TicketId,
    pub title: String,
    pub body: String,
    /// How long the OS should keep the notification visible
    pub timeout: Option<Duration>,
}

/// Events from the notifier
#[derive(Debug, Clone)]
pub enum NotifierEvent {
    /// The user clicked the notification
    Clicked { ticket_id: TicketId },
}

/// The OS notification primitive
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Show one notification
    async fn show(&self, request: NotificationRequest) -> NotifyResult<()>;

    /// Subscribe to notifier events. May only be called once.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<NotifierEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_handle_identity() {
        let h1 = PageHandle::new(1);
        let h2 = PageHandle::new(1);
        let h3 = PageHandle::new(2);

        assert_eq!(h1, h2);
        assert_ne!(h1, h3);
        assert_eq!(h3.id(), 2);
    }
}
