//! Chromium-backed page driver
//!
//! Each `render_page` launches its own browser so a wedged page can never
//! poison a later poll cycle; `close_page` tears the whole thing down.
//! The extra launch cost is irrelevant at minutes-scale polling.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tickwatch_host_api::{PageDriver, PageError, PageHandle, PageOptions, PageResult};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

struct OpenPage {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

/// Page driver backed by a headless Chromium
pub struct ChromiumPageDriver {
    next_id: AtomicU64,
    pages: Mutex<HashMap<u64, OpenPage>>,
}

impl ChromiumPageDriver {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pages: Mutex::new(HashMap::new()),
        }
    }

    fn browser_config(options: PageOptions) -> Result<BrowserConfig, PageError> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox") // Required for containerized environments
            .arg("--disable-dev-shm-usage"); // Avoid /dev/shm size issues in containers

        if options.visible {
            builder = builder.with_head();
        }

        builder
            .build()
            .map_err(|e| PageError::Browser(format!("failed to build browser config: {e}")))
    }
}

impl Default for ChromiumPageDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageDriver for ChromiumPageDriver {
    async fn render_page(&self, url: &str, options: PageOptions) -> PageResult<PageHandle> {
        let config = Self::browser_config(options)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| PageError::Browser(e.to_string()))?;

        // The handler must be polled for the browser to make progress
        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let page = match browser.new_page(url).await {
            Ok(page) => page,
            Err(e) => {
                handler_task.abort();
                return Err(PageError::Navigation(e.to_string()));
            }
        };

        if let Err(e) = page.wait_for_navigation().await {
            debug!(url, error = %e, "wait_for_navigation failed; continuing with partial load");
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.pages.lock().await.insert(
            id,
            OpenPage {
                browser,
                page,
                handler: handler_task,
            },
        );

        debug!(url, page_id = id, "Page rendered");
        Ok(PageHandle::new(id))
    }

    async fn evaluate(&self, handle: PageHandle, script: &str) -> PageResult<serde_json::Value> {
        let pages = self.pages.lock().await;
        let open = pages.get(&handle.id()).ok_or(PageError::PageClosed)?;

        let result = open
            .page
            .evaluate(script)
            .await
            .map_err(|e| PageError::Script(e.to_string()))?;

        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn close_page(&self, handle: PageHandle) -> PageResult<()> {
        let mut open = self
            .pages
            .lock()
            .await
            .remove(&handle.id())
            .ok_or(PageError::PageClosed)?;

        // Closing the browser tears the page down with it
        if let Err(e) = open.browser.close().await {
            warn!(page_id = handle.id(), error = %e, "Failed to close browser");
        }
        open.handler.abort();

        debug!(page_id = handle.id(), "Page closed");
        Ok(())
    }
}
