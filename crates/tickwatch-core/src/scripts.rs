//! In-page scripts for the portal
//!
//! Everything site-specific is concentrated here: CSS selectors, the grid
//! iframe id, the grid widget's data-access surface. These scripts are
//! opaque to the rest of the engine; it only looks at their JSON results.
//! Each script carries a `__tw*` function name so mock drivers can match
//! on it.

use serde::Deserialize;

/// Common {success, message} result shape shared by the fill/verify/query
/// scripts.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ScriptOutcome {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

impl ScriptOutcome {
    pub fn message_or(&self, fallback: &str) -> String {
        match &self.message {
            Some(m) if !m.is_empty() => m.clone(),
            _ => fallback.to_string(),
        }
    }
}

pub(crate) fn parse_outcome(value: serde_json::Value) -> Option<ScriptOutcome> {
    serde_json::from_value(value).ok()
}

/// Escape a string for interpolation into a double-quoted JS literal
pub(crate) fn js_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Fill the login form and submit. Returns {success, message}.
pub(crate) fn login_fill_script(username: &str, password: &str) -> String {
    format!(
        r##"
        (function __twLoginFill() {{
          try {{
            const usernameField = document.querySelector("#userId");
            const passwordField = document.querySelector("#password");
            const loginButton = document.querySelector(
              "body > div.wrap.login > div > div > div > div > form > fieldset > div.btn-area > button");

            if (!usernameField || !passwordField || !loginButton) {{
              return {{ success: false, message: "로그인 요소를 찾을 수 없습니다" }};
            }}

            usernameField.value = "{username}";
            passwordField.value = "{password}";
            loginButton.click();

            return {{ success: true, message: "로그인 시도 완료" }};
          }} catch (error) {{
            return {{ success: false, message: "로그인 스크립트 오류: " + error.message }};
          }}
        }})();
        "##,
        username = js_escape(username),
        password = js_escape(password),
    )
}

/// True once the post-login page has settled: either the authenticated
/// grid landmark or a visible error banner exists.
pub(crate) const LOGIN_SETTLED_SCRIPT: &str = r##"
(function __twLoginSettled() {
  try {
    const iframe = document.getElementById('ui-tabs-TM902313') ||
                   document.querySelector('iframe[role="tabpanel"]');
    if (iframe && iframe.contentDocument &&
        iframe.contentDocument.querySelector('.rg-header table tbody .rg-header-renderer')) {
      return true;
    }
    const alarm = document.querySelector("#up-alarm");
    return !!(alarm && getComputedStyle(alarm).display === "block");
  } catch (error) {
    return false;
  }
})();
"##;

/// Verify the login outcome. Returns {success, message}.
pub(crate) const LOGIN_VERIFY_SCRIPT: &str = r##"
(function __twLoginVerify() {
  try {
    const iframe = document.getElementById('ui-tabs-TM902313') ||
                   document.querySelector('iframe[role="tabpanel"]');

    if (!iframe || !iframe.contentDocument) {
      return { success: false, message: "iframe을 찾을 수 없거나 접근할 수 없습니다" };
    }

    const successEl = iframe.contentDocument.querySelector('.rg-header table tbody .rg-header-renderer');
    const errorEl = document.querySelector('.up-alarm-box .up-alarm-message');
    const alarm = document.querySelector("#up-alarm");

    if (successEl) {
      return { success: true, message: "로그인 성공" };
    } else if (errorEl && alarm && getComputedStyle(alarm).display === "block") {
      return { success: false, message: errorEl.textContent.trim() || "로그인 실패" };
    } else {
      return { success: false, message: "로그인 상태 확인 불가" };
    }
  } catch (error) {
    return { success: false, message: "상태 확인 오류: " + error.message };
  }
})();
"##;

/// Report the ticket grid's readiness: "no-frame", "no-grid", "loading",
/// or "ready".
pub(crate) const GRID_STATE_SCRIPT: &str = r#"
(function __twGridState() {
  try {
    const iframe = document.getElementById('ui-tabs-TM902313') ||
                   document.querySelector('iframe[role="tabpanel"]');
    if (!iframe || !iframe.contentDocument) return "no-frame";

    const win = iframe.contentWindow;
    if (!win || !win.grid || typeof win.grid.getAllRowValue !== "function") return "no-grid";

    const spinner = iframe.contentDocument.querySelector('.rg-loading');
    if (spinner && getComputedStyle(spinner).display !== "none") return "loading";

    return "ready";
  } catch (error) {
    return "no-frame";
  }
})();
"#;

/// Apply a status filter and date floor to the grid search, then rerun
/// it. Returns {success, message}.
pub(crate) fn grid_query_script(statuses: &[String], lookback_days: Option<u32>) -> String {
    let statuses_js = statuses
        .iter()
        .map(|s| format!("\"{}\"", js_escape(s)))
        .collect::<Vec<_>>()
        .join(", ");
    let lookback_js = lookback_days.map_or("null".to_string(), |d| d.to_string());

    format!(
        r#"
        (function __twGridQuery() {{
          try {{
            const iframe = document.getElementById('ui-tabs-TM902313') ||
                           document.querySelector('iframe[role="tabpanel"]');
            if (!iframe || !iframe.contentWindow) {{
              return {{ success: false, message: "iframe을 찾을 수 없습니다" }};
            }}

            const win = iframe.contentWindow;
            const statuses = [{statuses_js}];
            const lookbackDays = {lookback_js};

            if (statuses.length > 0 && win.setStatusFilter) {{
              win.setStatusFilter(statuses);
            }}
            if (lookbackDays !== null && win.setDateFloor) {{
              const floor = new Date();
              floor.setDate(floor.getDate() - lookbackDays);
              win.setDateFloor(floor);
            }}
            if (win.doSearch) {{
              win.doSearch();
            }}

            return {{ success: true, message: "검색 조건 적용 완료" }};
          }} catch (error) {{
            return {{ success: false, message: "검색 스크립트 오류: " + error.message }};
          }}
        }})();
        "#
    )
}

/// Pull every row out of the grid widget. Returns {success, rows} where
/// each row has normalized keys.
pub(crate) const GRID_EXTRACT_SCRIPT: &str = r#"
(function __twGridExtract() {
  try {
    const iframe = document.getElementById('ui-tabs-TM902313') ||
                   document.querySelector('iframe[role="tabpanel"]');
    if (!iframe || !iframe.contentWindow) {
      return { success: false, message: "iframe을 찾을 수 없습니다" };
    }

    const win = iframe.contentWindow;
    if (!win.grid || typeof win.grid.getAllRowValue !== "function") {
      return { success: false, message: "grid API를 사용할 수 없습니다" };
    }

    const rows = win.grid.getAllRowValue().map((row) => ({
      id: String(row["접수번호"] || row["요청번호"] || "").trim(),
      title: String(row["제목"] || row["요청내용"] || "").trim(),
      company: String(row["고객사명"] || row["회사명"] || "").trim(),
      status: String(row["처리상태"] || "").trim(),
      writer: String(row["작성자"] || row["요청자"] || "").trim(),
      requestedAt: String(row["접수일시"] || row["등록일시"] || "").trim(),
      requestedAtAll: String(row["접수일시전체"] || row["접수일시"] || "").trim(),
      processedAt: String(row["처리일시"] || "").trim(),
    }));

    return { success: true, rows: rows };
  } catch (error) {
    return { success: false, message: "데이터 스크래핑 오류: " + error.message };
  }
})();
"#;
