//! Ticket grid scraping
//!
//! The scraper assumes the caller already holds a live session; it never
//! re-authenticates. All failure modes are typed so the scheduler can
//! branch on them (and invalidate the session when the failure smells
//! like an expired login).

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tickwatch_api::{Settings, Ticket, TicketFlags, TicketStatus};
use tickwatch_host_api::{PageDriver, PageError, PageHandle, PageOptions};
use tickwatch_util::TicketId;
use tracing::{debug, warn};

use crate::scripts::{grid_query_script, parse_outcome, GRID_EXTRACT_SCRIPT, GRID_STATE_SCRIPT};
use crate::wait::{wait_for, WaitError};

/// Scrape failures surfaced to the UI as `scraping-error`
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("티켓 그리드 iframe을 찾을 수 없습니다")]
    FrameNotFound,

    #[error("grid API를 사용할 수 없습니다")]
    GridUnavailable,

    #[error("그리드 로딩이 끝나지 않습니다")]
    Timeout,

    #[error("스크래핑 스크립트 오류: {0}")]
    Script(String),

    #[error(transparent)]
    Page(#[from] PageError),
}

impl ScrapeError {
    /// Whether this failure points at an expired session rather than a
    /// flaky page: the authenticated-only grid frame being gone means the
    /// portal most likely bounced us back to the login screen.
    pub fn is_auth_suspect(&self) -> bool {
        matches!(self, ScrapeError::FrameNotFound)
    }
}

/// Bounded-wait tuning for the grid
#[derive(Debug, Clone, Copy)]
pub struct ScrapeTiming {
    /// How long to wait for the grid to finish loading
    pub grid_timeout: Duration,
    /// How often to re-check grid readiness
    pub poll_every: Duration,
}

impl Default for ScrapeTiming {
    fn default() -> Self {
        Self {
            grid_timeout: Duration::from_secs(20),
            poll_every: Duration::from_millis(500),
        }
    }
}

/// Raw row shape produced by the extraction script
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRow {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    company: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    writer: String,
    #[serde(default)]
    requested_at: String,
    #[serde(default)]
    requested_at_all: String,
    #[serde(default)]
    processed_at: String,
}

#[derive(Debug, Deserialize)]
struct ExtractResult {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    rows: Vec<RawRow>,
}

/// Pulls the current ticket list out of the portal grid
pub struct Scraper {
    driver: Arc<dyn PageDriver>,
    timing: ScrapeTiming,
}

impl Scraper {
    pub fn new(driver: Arc<dyn PageDriver>, timing: ScrapeTiming) -> Self {
        Self { driver, timing }
    }

    /// Fetch all rows currently in the grid. Dates come back as the
    /// portal formats them; parsing is the classifier's job.
    pub async fn fetch(&self, settings: &Settings) -> Result<Vec<Ticket>, ScrapeError> {
        let handle = self
            .driver
            .render_page(&settings.portal_url, PageOptions::default())
            .await?;

        let result = self.fetch_on_page(handle, settings).await;

        // The page is released on every exit path
        if let Err(e) = self.driver.close_page(handle).await {
            warn!(error = %e, "Failed to close scrape page");
        }

        result
    }

    async fn fetch_on_page(
        &self,
        handle: PageHandle,
        settings: &Settings,
    ) -> Result<Vec<Ticket>, ScrapeError> {
        self.wait_for_grid(handle).await?;

        // Portal-side pre-filtering, when configured
        if !settings.status_filter.is_empty() || settings.lookback_days.is_some() {
            let script = grid_query_script(&settings.status_filter, settings.lookback_days);
            let value = self.driver.evaluate(handle, &script).await?;
            let outcome = parse_outcome(value)
                .ok_or_else(|| ScrapeError::Script("검색 결과를 읽을 수 없습니다".into()))?;
            if !outcome.success {
                return Err(ScrapeError::Script(outcome.message_or("검색 실패")));
            }

            // The search rebuilds the grid; wait for it to settle again
            self.wait_for_grid(handle).await?;
        }

        let value = self.driver.evaluate(handle, GRID_EXTRACT_SCRIPT).await?;
        let extract: ExtractResult = serde_json::from_value(value)
            .map_err(|e| ScrapeError::Script(format!("행 데이터를 읽을 수 없습니다: {e}")))?;

        if !extract.success {
            return Err(ScrapeError::Script(
                extract.message.unwrap_or_else(|| "데이터 추출 실패".into()),
            ));
        }

        let mut tickets = Vec::with_capacity(extract.rows.len());
        for row in extract.rows {
            if row.id.is_empty() {
                debug!(title = %row.title, "Skipping grid row without a ticket number");
                continue;
            }
            tickets.push(Self::ticket_from_row(row));
        }

        debug!(count = tickets.len(), "Grid rows extracted");
        Ok(tickets)
    }

    /// Wait until the grid reports "ready", mapping a timeout to the most
    /// specific failure the last observed state supports.
    async fn wait_for_grid(&self, handle: PageHandle) -> Result<(), ScrapeError> {
        let result = wait_for(
            self.driver.as_ref(),
            handle,
            GRID_STATE_SCRIPT,
            self.timing.grid_timeout,
            self.timing.poll_every,
            |v| v.as_str() == Some("ready"),
        )
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(WaitError::Timeout { last }) => match last.as_str() {
                Some("no-frame") => Err(ScrapeError::FrameNotFound),
                Some("no-grid") => Err(ScrapeError::GridUnavailable),
                _ => Err(ScrapeError::Timeout),
            },
            Err(WaitError::Page(e)) => Err(ScrapeError::Page(e)),
        }
    }

    fn ticket_from_row(row: RawRow) -> Ticket {
        let requested_at_full = if row.requested_at_all.is_empty() {
            row.requested_at.clone()
        } else {
            row.requested_at_all
        };

        Ticket {
            id: TicketId::new(row.id),
            title: row.title,
            company: row.company,
            status: TicketStatus::from(row.status),
            writer: row.writer,
            requested_at: row.requested_at,
            requested_at_full,
            processed_at: if row.processed_at.is_empty() {
                None
            } else {
                Some(row.processed_at)
            },
            flags: TicketFlags::default(),
        }
    }
}
