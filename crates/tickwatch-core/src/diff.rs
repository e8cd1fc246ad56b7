//! Change detection against the previously persisted alert set

use std::collections::HashMap;
use tickwatch_api::{Ticket, TicketStatus};
use tickwatch_util::TicketId;

/// Result of diffing a fresh scrape against the persisted set
#[derive(Debug, Default)]
pub struct Changes {
    /// Tickets whose id was not in the previous set
    pub added: Vec<Ticket>,
    /// Tickets whose status moved into 고객사답변 since the last poll
    pub status_changed: Vec<Ticket>,
}

impl Changes {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.status_changed.is_empty()
    }
}

/// Diff `current` against `previous` by ticket id.
///
/// `added` is a pure set difference. `status_changed` is deliberately
/// narrow: only a transition into 고객사답변 (customer replied) counts,
/// because that is the one transition the on-call engineer must react
/// to. The two lists are disjoint by construction.
pub fn diff(previous: &[Ticket], current: &[Ticket]) -> Changes {
    let previous_status: HashMap<&TicketId, &TicketStatus> =
        previous.iter().map(|t| (&t.id, &t.status)).collect();

    let mut changes = Changes::default();

    for ticket in current {
        match previous_status.get(&ticket.id) {
            None => changes.added.push(ticket.clone()),
            Some(old_status) => {
                if **old_status != ticket.status
                    && ticket.status == TicketStatus::CustomerReplied
                {
                    changes.status_changed.push(ticket.clone());
                }
            }
        }
    }

    changes
}
