//! Portal reachability probe
//!
//! A cheap HTTP check run before a login attempt so connection problems
//! surface as "portal unreachable" instead of a misleading login failure.

use std::time::Duration;
use tracing::debug;

/// Default probe timeout
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Check if the portal URL answers at all
pub async fn probe_portal(url: &str, timeout: Duration) -> bool {
    let client = match reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()
    {
        Ok(client) => client,
        Err(_) => return false,
    };

    match client.get(url).send().await {
        Ok(response) => {
            let status = response.status();
            // Any HTTP answer means the portal is up; auth walls often
            // respond with redirects or 403 before login.
            let reachable = !status.is_server_error();
            debug!(url, status = %status, reachable, "Portal probe complete");
            reachable
        }
        Err(e) => {
            debug!(url, error = %e, "Portal probe failed");
            false
        }
    }
}
