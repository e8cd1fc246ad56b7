//! Bounded condition waits against a page
//!
//! The portal renders asynchronously; instead of sleeping a magic number
//! of seconds, callers poll a small readiness script until it reports the
//! state they want or the deadline passes.

use std::time::Duration;
use tickwatch_host_api::{PageDriver, PageError, PageHandle};
use tickwatch_util::MonotonicInstant;

pub(crate) enum WaitError {
    /// Deadline passed; carries the last value the script reported
    Timeout { last: serde_json::Value },
    Page(PageError),
}

/// Evaluate `script` every `poll_every` until `accept` approves its
/// result or `timeout` elapses. Returns the accepted value.
pub(crate) async fn wait_for<F>(
    driver: &dyn PageDriver,
    handle: PageHandle,
    script: &str,
    timeout: Duration,
    poll_every: Duration,
    accept: F,
) -> Result<serde_json::Value, WaitError>
where
    F: Fn(&serde_json::Value) -> bool,
{
    let started = MonotonicInstant::now();
    let mut last = serde_json::Value::Null;

    loop {
        match driver.evaluate(handle, script).await {
            Ok(value) => {
                if accept(&value) {
                    return Ok(value);
                }
                last = value;
            }
            Err(e) => return Err(WaitError::Page(e)),
        }

        if started.elapsed() >= timeout {
            return Err(WaitError::Timeout { last });
        }

        tokio::time::sleep(poll_every).await;
    }
}
