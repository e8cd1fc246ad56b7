//! Mock host adapters for testing

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tickwatch_util::TicketId;
use tokio::sync::mpsc;

use crate::{
    NotificationRequest, Notifier, NotifierEvent, NotifyError, NotifyResult, PageDriver,
    PageError, PageHandle, PageOptions, PageResult,
};

/// Mock page driver for unit/integration testing.
///
/// Evaluate results are scripted by substring match against the script
/// text: `respond` installs a sticky result, `respond_seq` a sequence
/// whose last element then sticks. Unmatched scripts return JSON null.
pub struct MockPageDriver {
    next_id: AtomicU64,
    open_pages: Mutex<HashMap<u64, String>>,

    /// URLs passed to render_page, in call order
    pub rendered: Mutex<Vec<String>>,
    /// Scripts passed to evaluate, in call order
    pub evaluated: Mutex<Vec<String>>,
    /// Pages that were closed
    pub closed: Mutex<Vec<PageHandle>>,

    responses: Mutex<Vec<(String, VecDeque<serde_json::Value>)>>,

    /// Configure render_page to fail
    pub fail_render: Mutex<bool>,
    /// Configure evaluate to fail
    pub fail_evaluate: Mutex<bool>,
}

impl MockPageDriver {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            open_pages: Mutex::new(HashMap::new()),
            rendered: Mutex::new(Vec::new()),
            evaluated: Mutex::new(Vec::new()),
            closed: Mutex::new(Vec::new()),
            responses: Mutex::new(Vec::new()),
            fail_render: Mutex::new(false),
            fail_evaluate: Mutex::new(false),
        }
    }

    /// Always answer scripts containing `pattern` with `value`
    pub fn respond(&self, pattern: impl Into<String>, value: serde_json::Value) {
        self.responses
            .lock()
            .unwrap()
            .push((pattern.into(), VecDeque::from([value])));
    }

    /// Answer scripts containing `pattern` with each value in turn; the
    /// last value repeats once the sequence is exhausted
    pub fn respond_seq(&self, pattern: impl Into<String>, values: Vec<serde_json::Value>) {
        self.responses
            .lock()
            .unwrap()
            .push((pattern.into(), VecDeque::from(values)));
    }

    /// Number of render_page calls so far
    pub fn render_count(&self) -> usize {
        self.rendered.lock().unwrap().len()
    }

    /// Number of pages opened but not yet closed
    pub fn open_page_count(&self) -> usize {
        self.open_pages.lock().unwrap().len()
    }

    fn next_response(&self, script: &str) -> serde_json::Value {
        let mut responses = self.responses.lock().unwrap();
        // Later registrations win so tests can override a response
        // mid-scenario
        for (pattern, queue) in responses.iter_mut().rev() {
            if script.contains(pattern.as_str()) {
                return if queue.len() > 1 {
                    queue.pop_front().unwrap()
                } else {
                    queue.front().cloned().unwrap_or(serde_json::Value::Null)
                };
            }
        }
        serde_json::Value::Null
    }
}

impl Default for MockPageDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageDriver for MockPageDriver {
    async fn render_page(&self, url: &str, _options: PageOptions) -> PageResult<PageHandle> {
        if *self.fail_render.lock().unwrap() {
            return Err(PageError::Navigation("mock navigation failure".into()));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.open_pages.lock().unwrap().insert(id, url.to_string());
        self.rendered.lock().unwrap().push(url.to_string());

        Ok(PageHandle::new(id))
    }

    async fn evaluate(&self, handle: PageHandle, script: &str) -> PageResult<serde_json::Value> {
        if *self.fail_evaluate.lock().unwrap() {
            return Err(PageError::Script("mock script failure".into()));
        }

        if !self.open_pages.lock().unwrap().contains_key(&handle.id()) {
            return Err(PageError::PageClosed);
        }

        self.evaluated.lock().unwrap().push(script.to_string());
        Ok(self.next_response(script))
    }

    async fn close_page(&self, handle: PageHandle) -> PageResult<()> {
        if self.open_pages.lock().unwrap().remove(&handle.id()).is_none() {
            return Err(PageError::PageClosed);
        }
        self.closed.lock().unwrap().push(handle);
        Ok(())
    }
}

/// Mock notifier that records shown notifications
pub struct MockNotifier {
    /// Requests passed to show, in call order
    pub shown: Mutex<Vec<NotificationRequest>>,

    event_tx: mpsc::UnboundedSender<NotifierEvent>,
    event_rx: Mutex<Option<mpsc::UnboundedReceiver<NotifierEvent>>>,

    /// Configure show to fail
    pub fail_show: Mutex<bool>,
}

impl MockNotifier {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            shown: Mutex::new(Vec::new()),
            event_tx: tx,
            event_rx: Mutex::new(Some(rx)),
            fail_show: Mutex::new(false),
        }
    }

    /// Simulate the user clicking a notification
    pub fn simulate_click(&self, ticket_id: TicketId) {
        let _ = self.event_tx.send(NotifierEvent::Clicked { ticket_id });
    }

    /// Ticket ids shown so far, in call order
    pub fn shown_ids(&self) -> Vec<TicketId> {
        self.shown
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.ticket_id.clone())
            .collect()
    }
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn show(&self, request: NotificationRequest) -> NotifyResult<()> {
        if *self.fail_show.lock().unwrap() {
            return Err(NotifyError::ShowFailed("mock show failure".into()));
        }
        self.shown.lock().unwrap().push(request);
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
