//! External URL opener

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum OpenError {
    #[error("Failed to launch URL handler: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("URL handler exited with status {0}")]
    Failed(i32),
}

/// Hand a URL to the desktop's default handler (`xdg-open`).
///
/// Used for the ticket deep link when a notification is clicked or the
/// UI asks to open a request.
pub async fn open_external(url: &str) -> Result<(), OpenError> {
    debug!(url, "Opening external URL");

    let status = Command::new("xdg-open").arg(url).status().await?;

    if status.success() {
        Ok(())
    } else {
        Err(OpenError::Failed(status.code().unwrap_or(-1)))
    }
}
