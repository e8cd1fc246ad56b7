//! Portal session management
//!
//! The portal session is tracked by a process-lifetime boolean, not a
//! token: once a login succeeded, later cycles trust the flag until
//! something invalidates it (a forced recheck, a business-hours resume,
//! or an auth-suspect scrape failure).

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tickwatch_api::Settings;
use tickwatch_host_api::{PageDriver, PageError, PageHandle, PageOptions};
use tracing::{debug, info, warn};

use crate::scripts::{
    login_fill_script, parse_outcome, LOGIN_SETTLED_SCRIPT, LOGIN_VERIFY_SCRIPT,
};
use crate::wait::{wait_for, WaitError};

/// Login failures surfaced to the UI as `login-error`
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("로그인 정보가 없습니다")]
    MissingCredentials,

    #[error("{0}")]
    Rejected(String),

    #[error("로그인 페이지가 응답하지 않습니다")]
    Timeout,

    #[error(transparent)]
    Page(#[from] PageError),
}

/// Bounded-wait tuning for the login flow
#[derive(Debug, Clone, Copy)]
pub struct SessionTiming {
    /// How long to wait for the post-login page to settle
    pub login_timeout: Duration,
    /// How often to re-check the settle condition
    pub poll_every: Duration,
}

impl Default for SessionTiming {
    fn default() -> Self {
        Self {
            login_timeout: Duration::from_secs(15),
            poll_every: Duration::from_millis(500),
        }
    }
}

/// Owns the login flow and the session flag
pub struct SessionManager {
    driver: Arc<dyn PageDriver>,
    timing: SessionTiming,
    logged_in: bool,
}

impl SessionManager {
    pub fn new(driver: Arc<dyn PageDriver>, timing: SessionTiming) -> Self {
        Self {
            driver,
            timing,
            logged_in: false,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    /// Drop the session flag so the next cycle logs in again
    pub fn invalidate(&mut self) {
        if self.logged_in {
            debug!("Session invalidated");
        }
        self.logged_in = false;
    }

    /// Make sure the portal session is live.
    ///
    /// Fast path: if the flag is set, returns immediately without
    /// touching the driver. This trusts the flag; callers decide when to
    /// force a real recheck via `invalidate`.
    pub async fn ensure_logged_in(&mut self, settings: &Settings) -> Result<(), AuthError> {
        if self.logged_in {
            return Ok(());
        }

        self.login(settings).await?;
        self.logged_in = true;
        info!("Portal login succeeded");
        Ok(())
    }

    /// One-shot login check against the supplied settings. Does not
    /// touch the session flag; serves connection tests from the UI.
    pub async fn probe(&self, settings: &Settings) -> Result<(), AuthError> {
        self.login(settings).await
    }

    async fn login(&self, settings: &Settings) -> Result<(), AuthError> {
        if !settings.has_credentials() {
            return Err(AuthError::MissingCredentials);
        }

        let handle = self
            .driver
            .render_page(&settings.portal_url, PageOptions::default())
            .await?;

        let result = self.login_on_page(handle, settings).await;

        // The page is released on every exit path
        if let Err(e) = self.driver.close_page(handle).await {
            warn!(error = %e, "Failed to close login page");
        }

        result
    }

    async fn login_on_page(
        &self,
        handle: PageHandle,
        settings: &Settings,
    ) -> Result<(), AuthError> {
        // Inject credentials and submit
        let fill_script = login_fill_script(&settings.username, &settings.password);
        let value = self.driver.evaluate(handle, &fill_script).await?;
        let outcome = parse_outcome(value)
            .ok_or_else(|| AuthError::Rejected("로그인 스크립트 결과를 읽을 수 없습니다".into()))?;
        if !outcome.success {
            return Err(AuthError::Rejected(outcome.message_or("로그인 실패")));
        }

        // Wait for the page to settle instead of sleeping a fixed delay
        match wait_for(
            self.driver.as_ref(),
            handle,
            LOGIN_SETTLED_SCRIPT,
            self.timing.login_timeout,
            self.timing.poll_every,
            |v| v.as_bool() == Some(true),
        )
        .await
        {
            Ok(_) => {}
            Err(WaitError::Timeout { .. }) => return Err(AuthError::Timeout),
            Err(WaitError::Page(e)) => return Err(AuthError::Page(e)),
        }

        // Verify: authenticated landmark present and no error banner
        let value = self.driver.evaluate(handle, LOGIN_VERIFY_SCRIPT).await?;
        let outcome = parse_outcome(value)
            .ok_or_else(|| AuthError::Rejected("로그인 상태 확인 불가".into()))?;
        if outcome.success {
            Ok(())
        } else {
            Err(AuthError::Rejected(outcome.message_or("로그인 실패")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tickwatch_host_api::MockPageDriver;

    fn timing() -> SessionTiming {
        SessionTiming {
            login_timeout: Duration::from_millis(50),
            poll_every: Duration::from_millis(1),
        }
    }

    fn settings() -> Settings {
        Settings {
            portal_url: "https://support.example.co.kr/home".into(),
            username: "kim".into(),
            password: "secret".into(),
            ..Settings::default()
        }
    }

    fn driver_with_successful_login() -> Arc<MockPageDriver> {
        let driver = Arc::new(MockPageDriver::new());
        driver.respond("__twLoginFill", json!({"success": true}));
        driver.respond("__twLoginSettled", json!(true));
        driver.respond(
            "__twLoginVerify",
            json!({"success": true, "message": "로그인 성공"}),
        );
        driver
    }

    #[tokio::test]
    async fn login_success_sets_flag_and_closes_page() {
        let driver = driver_with_successful_login();
        let mut session = SessionManager::new(driver.clone(), timing());

        session.ensure_logged_in(&settings()).await.unwrap();
        assert!(session.is_logged_in());
        assert_eq!(driver.open_page_count(), 0);
    }

    #[tokio::test]
    async fn fast_path_skips_driver_entirely() {
        let driver = driver_with_successful_login();
        let mut session = SessionManager::new(driver.clone(), timing());

        session.ensure_logged_in(&settings()).await.unwrap();
        let renders_after_login = driver.render_count();

        // Second call must not contact the portal at all
        session.ensure_logged_in(&settings()).await.unwrap();
        assert_eq!(driver.render_count(), renders_after_login);
    }

    #[tokio::test]
    async fn missing_credentials_never_touch_network() {
        let driver = Arc::new(MockPageDriver::new());
        let mut session = SessionManager::new(driver.clone(), timing());

        let mut incomplete = settings();
        incomplete.password.clear();

        let err = session.ensure_logged_in(&incomplete).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingCredentials));
        assert_eq!(driver.render_count(), 0);
        assert!(!session.is_logged_in());
    }

    #[tokio::test]
    async fn rejected_login_reports_banner_text() {
        let driver = Arc::new(MockPageDriver::new());
        driver.respond("__twLoginFill", json!({"success": true}));
        driver.respond("__twLoginSettled", json!(true));
        driver.respond(
            "__twLoginVerify",
            json!({"success": false, "message": "비밀번호가 올바르지 않습니다"}),
        );

        let mut session = SessionManager::new(driver.clone(), timing());
        let err = session.ensure_logged_in(&settings()).await.unwrap_err();

        match err {
            AuthError::Rejected(message) => {
                assert_eq!(message, "비밀번호가 올바르지 않습니다")
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!session.is_logged_in());
        // Page closed despite the failure
        assert_eq!(driver.open_page_count(), 0);
    }

    #[tokio::test]
    async fn settle_timeout_maps_to_auth_timeout() {
        let driver = Arc::new(MockPageDriver::new());
        driver.respond("__twLoginFill", json!({"success": true}));
        driver.respond("__twLoginSettled", json!(false));

        let mut session = SessionManager::new(driver.clone(), timing());
        let err = session.ensure_logged_in(&settings()).await.unwrap_err();

        assert!(matches!(err, AuthError::Timeout));
        assert_eq!(driver.open_page_count(), 0);
    }

    #[tokio::test]
    async fn invalidate_forces_relogin() {
        let driver = driver_with_successful_login();
        let mut session = SessionManager::new(driver.clone(), timing());

        session.ensure_logged_in(&settings()).await.unwrap();
        session.invalidate();
        assert!(!session.is_logged_in());

        session.ensure_logged_in(&settings()).await.unwrap();
        assert_eq!(driver.render_count(), 2);
    }

    #[tokio::test]
    async fn probe_leaves_session_flag_alone() {
        let driver = driver_with_successful_login();
        let session = SessionManager::new(driver.clone(), timing());

        session.probe(&settings()).await.unwrap();
        assert!(!session.is_logged_in());
    }
}
