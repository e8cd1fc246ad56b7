//! Notification dispatch
//!
//! One OS notification per qualifying ticket, keyed by ticket id. The
//! live-handle registry only exists to stop unbounded growth and repeat
//! notifications inside the TTL; eviction running late must never cause
//! visible misbehavior.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tickwatch_api::Ticket;
use tickwatch_host_api::{NotificationRequest, Notifier};
use tickwatch_util::{MonotonicInstant, TicketId};
use tracing::{debug, warn};

/// Default lifetime of a live notification handle
pub const DEFAULT_NOTIFICATION_TTL: Duration = Duration::from_secs(120);

/// Turns qualifying tickets into OS notifications
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    live: HashMap<TicketId, MonotonicInstant>,
    ttl: Duration,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, ttl: Duration) -> Self {
        Self {
            notifier,
            live: HashMap::new(),
            ttl,
        }
    }

    /// Show one notification per ticket. No-op when notifications are
    /// disabled. Tickets with a still-live handle are skipped. Returns
    /// how many notifications were raised.
    pub async fn dispatch(
        &mut self,
        tickets: &[Ticket],
        enabled: bool,
        now_mono: MonotonicInstant,
    ) -> usize {
        if !enabled {
            return 0;
        }

        self.evict_expired(now_mono);

        let mut shown = 0;
        for ticket in tickets {
            if self.live.contains_key(&ticket.id) {
                debug!(ticket_id = %ticket.id, "Notification already live, skipping");
                continue;
            }

            let request = NotificationRequest {
                ticket_id: ticket.id.clone(),
                title: format!("📬 새 요청 도착! - {}", ticket.title),
                body: format!(
                    "💡 상태: {}\n🏢 고객사: {}\n🕒 접수: {}",
                    ticket.status, ticket.company, ticket.requested_at
                ),
                timeout: Some(self.ttl),
            };

            match self.notifier.show(request).await {
                Ok(()) => {
                    self.live.insert(ticket.id.clone(), now_mono);
                    shown += 1;
                }
                Err(e) => {
                    warn!(ticket_id = %ticket.id, error = %e, "Failed to show notification");
                }
            }
        }

        shown
    }

    /// Drop handles older than the TTL. Best effort; called from the
    /// scheduler's tick.
    pub fn evict_expired(&mut self, now_mono: MonotonicInstant) {
        let ttl = self.ttl;
        self.live
            .retain(|_, shown_at| now_mono.duration_since(*shown_at) < ttl);
    }

    /// Number of live notification handles
    pub fn live_count(&self) -> usize {
        self.live.len()
    }
}
