//! Priority classification and sorting
//!
//! Flags are derived from "now" and therefore recomputed on every poll
//! and every read; a persisted `pending` flag would go stale the moment
//! it was written.

use chrono::{DateTime, Local, NaiveDateTime};
use std::cmp::Ordering;
use tickwatch_api::{Ticket, TicketFlags, TicketStatus};

/// Title substrings that mark a ticket urgent
const URGENT_MARKERS: &[&str] = &["긴급", "urgent"];

/// A ticket still unprocessed after this long is delayed
const DELAYED_AFTER_DAYS: i64 = 7;

/// A received ticket nobody picked up within this long is pending
const PENDING_AFTER_MINUTES: i64 = 60;

/// Compute derived flags for one ticket
pub fn annotate(mut ticket: Ticket, now: DateTime<Local>) -> Ticket {
    let title_lower = ticket.title.to_lowercase();
    let urgent = URGENT_MARKERS.iter().any(|m| title_lower.contains(m));

    let requested = parse_portal_datetime(&ticket.requested_at_full)
        .or_else(|| parse_portal_datetime(&ticket.requested_at));

    let delayed = match (&requested, &ticket.processed_at) {
        (Some(requested), Some(processed)) => parse_portal_datetime(processed)
            .map(|processed| {
                processed.signed_duration_since(*requested)
                    > chrono::Duration::days(DELAYED_AFTER_DAYS)
            })
            .unwrap_or(false),
        _ => false,
    };

    let pending = ticket.status == TicketStatus::Received
        && requested
            .map(|requested| {
                now.naive_local().signed_duration_since(requested)
                    > chrono::Duration::minutes(PENDING_AFTER_MINUTES)
            })
            .unwrap_or(false);

    ticket.flags = TicketFlags {
        urgent,
        delayed,
        pending,
    };
    ticket
}

/// Annotate a whole scrape result
pub fn annotate_all(tickets: Vec<Ticket>, now: DateTime<Local>) -> Vec<Ticket> {
    tickets.into_iter().map(|t| annotate(t, now)).collect()
}

/// Priority score; higher sorts first
pub fn score(ticket: &Ticket) -> u8 {
    if ticket.status == TicketStatus::CustomerReplied {
        100
    } else if ticket.status == TicketStatus::InProgress {
        90
    } else if ticket.flags.urgent {
        80
    } else if ticket.flags.delayed {
        70
    } else if ticket.flags.pending {
        60
    } else {
        0
    }
}

/// Sort by score descending, then request time descending (most recent
/// first). The sort is stable so equal-key tickets keep their scrape
/// order, which keeps the persisted set deterministic.
pub fn sort(mut tickets: Vec<Ticket>) -> Vec<Ticket> {
    tickets.sort_by(|a, b| {
        score(b)
            .cmp(&score(a))
            .then_with(|| compare_requested_desc(a, b))
    });
    tickets
}

fn compare_requested_desc(a: &Ticket, b: &Ticket) -> Ordering {
    match (
        parse_portal_datetime(&a.requested_at_full),
        parse_portal_datetime(&b.requested_at_full),
    ) {
        (Some(a_ts), Some(b_ts)) => b_ts.cmp(&a_ts),
        // Unparseable timestamps fall back to reverse string order,
        // which matches chronological order for the portal's format
        _ => b.requested_at_full.cmp(&a.requested_at_full),
    }
}

/// Parse the portal's locale-formatted timestamps. The grid is not
/// consistent about precision, so several formats are tolerated;
/// anything else is treated as unknown.
fn parse_portal_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    const FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%Y/%m/%d %H:%M",
    ];

    for format in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }

    // Date-only cells mean midnight
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tickwatch_util::TicketId;

    fn ticket(id: &str, status: TicketStatus, requested_full: &str) -> Ticket {
        Ticket {
            id: TicketId::new(id),
            title: format!("요청 {}", id),
            company: "Acme".into(),
            status,
            writer: "kim".into(),
            requested_at: requested_full.chars().take(16).collect(),
            requested_at_full: requested_full.into(),
            processed_at: None,
            flags: TicketFlags::default(),
        }
    }

    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 12, 24, 12, 0, 0).unwrap()
    }

    #[test]
    fn urgent_flag_from_title_marker() {
        let mut t = ticket("A1", TicketStatus::Received, "2025-12-24 11:50:00");
        t.title = "[긴급] 서버 다운".into();
        assert!(annotate(t, noon()).flags.urgent);

        let mut t = ticket("A2", TicketStatus::Received, "2025-12-24 11:50:00");
        t.title = "URGENT: printer".into();
        assert!(annotate(t, noon()).flags.urgent);

        let t = ticket("A3", TicketStatus::Received, "2025-12-24 11:50:00");
        assert!(!annotate(t, noon()).flags.urgent);
    }

    #[test]
    fn delayed_when_processing_took_over_a_week() {
        let mut t = ticket("A1", TicketStatus::InProgress, "2025-12-01 09:00:00");
        t.processed_at = Some("2025-12-10 09:00:01".into());
        assert!(annotate(t, noon()).flags.delayed);

        let mut t = ticket("A2", TicketStatus::InProgress, "2025-12-01 09:00:00");
        t.processed_at = Some("2025-12-05 09:00:00".into());
        assert!(!annotate(t, noon()).flags.delayed);

        // No processing timestamp: not delayed, whatever the age
        let t = ticket("A3", TicketStatus::Received, "2025-01-01 09:00:00");
        assert!(!annotate(t, noon()).flags.delayed);
    }

    #[test]
    fn pending_when_received_and_over_an_hour_old() {
        let t = ticket("A1", TicketStatus::Received, "2025-12-24 10:30:00");
        assert!(annotate(t, noon()).flags.pending);

        // 50 minutes old: not yet pending
        let t = ticket("A2", TicketStatus::Received, "2025-12-24 11:10:00");
        assert!(!annotate(t, noon()).flags.pending);

        // Old but already in progress: not pending
        let t = ticket("A3", TicketStatus::InProgress, "2025-12-24 08:00:00");
        assert!(!annotate(t, noon()).flags.pending);
    }

    #[test]
    fn unparseable_dates_leave_flags_unset() {
        let mut t = ticket("A1", TicketStatus::Received, "지난주");
        t.processed_at = Some("어제".into());
        let annotated = annotate(t, noon());
        assert!(!annotated.flags.delayed);
        assert!(!annotated.flags.pending);
    }

    #[test]
    fn score_ladder() {
        let customer = ticket("A1", TicketStatus::CustomerReplied, "2025-12-24 09:00:00");
        let in_progress = ticket("A2", TicketStatus::InProgress, "2025-12-24 09:00:00");
        let mut urgent = ticket("A3", TicketStatus::Received, "2025-12-24 11:50:00");
        urgent.title = "긴급 문의".into();
        let plain = ticket("A4", TicketStatus::Received, "2025-12-24 11:50:00");

        let now = noon();
        assert_eq!(score(&annotate(customer, now)), 100);
        assert_eq!(score(&annotate(in_progress, now)), 90);
        assert_eq!(score(&annotate(urgent, now)), 80);
        assert_eq!(score(&annotate(plain, now)), 0);
    }

    #[test]
    fn sort_is_deterministic_for_equal_timestamps() {
        let ts = "2025-12-24 11:59:00";
        let inputs = [
            vec![
                ticket("A1", TicketStatus::CustomerReplied, ts),
                ticket("A2", TicketStatus::Received, ts),
                ticket("A3", TicketStatus::InProgress, ts),
            ],
            vec![
                ticket("A2", TicketStatus::Received, ts),
                ticket("A3", TicketStatus::InProgress, ts),
                ticket("A1", TicketStatus::CustomerReplied, ts),
            ],
            vec![
                ticket("A3", TicketStatus::InProgress, ts),
                ticket("A1", TicketStatus::CustomerReplied, ts),
                ticket("A2", TicketStatus::Received, ts),
            ],
        ];

        for input in inputs {
            let sorted = sort(annotate_all(input, noon()));
            let statuses: Vec<&TicketStatus> = sorted.iter().map(|t| &t.status).collect();
            assert_eq!(
                statuses,
                vec![
                    &TicketStatus::CustomerReplied,
                    &TicketStatus::InProgress,
                    &TicketStatus::Received
                ]
            );
        }
    }

    #[test]
    fn equal_scores_break_ties_most_recent_first() {
        let older = ticket("A1", TicketStatus::Received, "2025-12-24 09:00:00");
        let newer = ticket("A2", TicketStatus::Received, "2025-12-24 11:00:00");

        let sorted = sort(vec![older, newer]);
        assert_eq!(sorted[0].id.as_str(), "A2");
        assert_eq!(sorted[1].id.as_str(), "A1");
    }

    #[test]
    fn stable_for_fully_equal_keys() {
        let a = ticket("A1", TicketStatus::Received, "2025-12-24 09:00:00");
        let b = ticket("A2", TicketStatus::Received, "2025-12-24 09:00:00");

        let sorted = sort(vec![a, b]);
        assert_eq!(sorted[0].id.as_str(), "A1");
        assert_eq!(sorted[1].id.as_str(), "A2");
    }
}
