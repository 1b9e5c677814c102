//! Chromium-backed [`RevealDriver`] via the DevTools protocol.
//!
//! Each reveal launches a fresh headless browser with an isolated context
//! and a single page. Page, context and browser are torn down in that order
//! on every exit path.

use std::path::PathBuf;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde_json::Value;
use tokio::task::JoinHandle;

use super::targets::ClickTarget;
use super::{run_reveal, PhoneRevealer, RevealDriver, RevealTimings};
use crate::error::ScraperError;

const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Resolves once the DOM is parsed, or after 10s regardless.
const WAIT_FOR_DOM_SCRIPT: &str = r"
    new Promise((resolve) => {
        if (document.readyState === 'complete' || document.readyState === 'interactive') {
            resolve(document.readyState);
        } else {
            document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
            setTimeout(() => resolve('timeout'), 10000);
        }
    })
";

const FORCE_CLICK_FN: &str = "function() { this.click(); }";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChromiumSettings {
    /// Explicit browser binary; auto-detected when `None`.
    pub chrome_path: Option<PathBuf>,
    pub user_agent: String,
    pub locale: String,
    pub accept_language: String,
    pub viewport: (u32, u32),
    pub launch_timeout: Duration,
    pub teardown_timeout: Duration,
}

impl Default for ChromiumSettings {
    fn default() -> Self {
        Self {
            chrome_path: None,
            user_agent: DESKTOP_USER_AGENT.to_owned(),
            locale: "uk-UA".to_owned(),
            accept_language: "uk-UA,uk;q=0.9".to_owned(),
            viewport: (1280, 720),
            launch_timeout: Duration::from_secs(30),
            teardown_timeout: Duration::from_secs(5),
        }
    }
}

impl ChromiumSettings {
    #[must_use]
    pub fn from_app_config(config: &carwatch_core::AppConfig) -> Self {
        Self {
            chrome_path: config.chrome_path.clone(),
            ..Self::default()
        }
    }

    fn browser_config(&self) -> Result<BrowserConfig, ScraperError> {
        let (width, height) = self.viewport;
        let mut builder = BrowserConfig::builder()
            .window_size(width, height)
            .viewport(Viewport {
                width,
                height,
                ..Viewport::default()
            })
            .arg(format!("--lang={}", self.locale))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--no-sandbox")
            .arg("--disable-gpu");
        if let Some(path) = &self.chrome_path {
            builder = builder.chrome_executable(path);
        }
        builder
            .build()
            .map_err(|reason| ScraperError::Browser {
                stage: "configure",
                reason,
            })
    }
}

fn browser_error(stage: &'static str, err: impl std::fmt::Display) -> ScraperError {
    ScraperError::Browser {
        stage,
        reason: err.to_string(),
    }
}

/// One browser process with one isolated context and page.
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    context_id: Option<BrowserContextId>,
    page: Option<Page>,
}

impl BrowserSession {
    async fn open(settings: &ChromiumSettings) -> Result<Self, ScraperError> {
        let config = settings.browser_config()?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| browser_error("launch", e))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let mut session = Self {
            browser,
            handler,
            context_id: None,
            page: None,
        };
        if let Err(e) = session.prepare_page(settings).await {
            session.close(settings.teardown_timeout).await;
            return Err(e);
        }
        Ok(session)
    }

    async fn prepare_page(&mut self, settings: &ChromiumSettings) -> Result<(), ScraperError> {
        let context_id = self
            .browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(|e| browser_error("create context", e))?
            .result
            .browser_context_id;
        self.context_id = Some(context_id.clone());

        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id)
            .build()
            .map_err(|reason| ScraperError::Browser {
                stage: "create page",
                reason,
            })?;
        let page = self
            .browser
            .new_page(target)
            .await
            .map_err(|e| browser_error("create page", e))?;

        let identity = SetUserAgentOverrideParams::builder()
            .user_agent(settings.user_agent.clone())
            .accept_language(settings.accept_language.clone())
            .build()
            .map_err(|reason| ScraperError::Browser {
                stage: "identity",
                reason,
            })?;
        let applied = page.execute(identity).await;
        self.page = Some(page);
        applied.map_err(|e| browser_error("identity", e))?;
        Ok(())
    }

    /// Closes the page, then the context, then the browser. Each step is
    /// bounded by `step_timeout` and failures are only logged.
    async fn close(mut self, step_timeout: Duration) {
        if let Some(page) = self.page.take() {
            match tokio::time::timeout(step_timeout, page.close()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::debug!(error = %e, "page close failed"),
                Err(_) => tracing::debug!("page close timed out"),
            }
        }
        if let Some(context_id) = self.context_id.take() {
            let dispose = self
                .browser
                .execute(DisposeBrowserContextParams::new(context_id));
            if let Ok(Err(e)) = tokio::time::timeout(step_timeout, dispose).await {
                tracing::debug!(error = %e, "browser context dispose failed");
            }
        }
        if let Ok(Err(e)) = tokio::time::timeout(step_timeout, self.browser.close()).await {
            tracing::debug!(error = %e, "browser close failed");
        }
        if let Ok(Err(e)) = tokio::time::timeout(step_timeout, self.browser.wait()).await {
            tracing::debug!(error = %e, "browser process wait failed");
        }
        self.handler.abort();
    }
}

/// [`RevealDriver`] over a live page.
struct ChromiumPage<'a> {
    page: &'a Page,
}

impl ChromiumPage<'_> {
    async fn click_css(&self, selector: &str) -> bool {
        let Ok(element) = self.page.find_element(selector).await else {
            return false;
        };
        // Scrolling may fail for elements without a box; the click decides.
        let _ = element.scroll_into_view().await;
        if element.click().await.is_ok() {
            return true;
        }
        element.call_js_fn(FORCE_CLICK_FN, false).await.is_ok()
    }

    async fn click_by_text(&self, tag: &str, text: &str) -> bool {
        let script = text_click_script(tag, text);
        match self.page.evaluate(script).await {
            Ok(result) => result.into_value::<bool>().unwrap_or(false),
            Err(e) => {
                tracing::trace!(tag, text, error = %e, "text click script failed");
                false
            }
        }
    }
}

/// Script clicking the first `tag` element whose text contains `text`,
/// ignoring case. Evaluates to whether an element was clicked.
fn text_click_script(tag: &str, text: &str) -> String {
    let tag = Value::from(tag);
    let text = Value::from(text);
    format!(
        r#"(() => {{
    const needle = {text}.toLowerCase();
    const el = Array.from(document.querySelectorAll({tag}))
        .find((node) => (node.innerText || node.textContent || "").toLowerCase().includes(needle));
    if (!el) return false;
    el.scrollIntoView({{ block: "center" }});
    el.click();
    return true;
}})()"#
    )
}

impl RevealDriver for ChromiumPage<'_> {
    async fn navigate(&self, url: &str) -> Result<(), ScraperError> {
        let params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|reason| ScraperError::Browser {
                stage: "navigate",
                reason,
            })?;
        self.page
            .execute(params)
            .await
            .map_err(|e| browser_error("navigate", e))?;

        match self.page.evaluate(WAIT_FOR_DOM_SCRIPT.to_owned()).await {
            Ok(result) => {
                let state: String = result.into_value().unwrap_or_else(|_| "unknown".to_owned());
                tracing::trace!(url, state, "page ready state");
            }
            Err(e) => tracing::debug!(url, error = %e, "could not read ready state"),
        }
        Ok(())
    }

    async fn click(&self, target: &ClickTarget) -> bool {
        match *target {
            ClickTarget::Css(selector) => self.click_css(selector).await,
            ClickTarget::Text { tag, text } => self.click_by_text(tag, text).await,
        }
    }

    async fn scroll_by(&self, pixels: u32) {
        if let Err(e) = self
            .page
            .evaluate(format!("window.scrollBy(0, {pixels})"))
            .await
        {
            tracing::trace!(error = %e, "scroll failed");
        }
    }

    async fn text_of(&self, selector: &str) -> Option<String> {
        let element = self.page.find_element(selector).await.ok()?;
        element
            .inner_text()
            .await
            .ok()
            .flatten()
            .map(|text| text.trim().to_owned())
            .filter(|text| !text.is_empty())
    }

    async fn snapshot(&self) -> Option<String> {
        self.page.content().await.ok()
    }
}

/// Headless Chromium implementation of [`PhoneRevealer`].
#[derive(Debug, Clone)]
pub struct ChromiumRevealer {
    settings: ChromiumSettings,
    timings: RevealTimings,
}

impl ChromiumRevealer {
    #[must_use]
    pub fn new(settings: ChromiumSettings) -> Self {
        Self {
            settings,
            timings: RevealTimings::default(),
        }
    }
}

impl PhoneRevealer for ChromiumRevealer {
    async fn reveal(&self, listing_url: &str) -> Option<i64> {
        let opened =
            tokio::time::timeout(self.settings.launch_timeout, BrowserSession::open(&self.settings))
                .await;
        let session = match opened {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => {
                tracing::warn!(listing_url, error = %e, "browser unavailable for phone reveal");
                return None;
            }
            Err(_) => {
                tracing::warn!(listing_url, "browser launch timed out");
                return None;
            }
        };

        let phone = match session.page.as_ref() {
            Some(page) => run_reveal(&ChromiumPage { page }, listing_url, &self.timings).await,
            None => None,
        };
        session.close(self.settings.teardown_timeout).await;
        phone
    }
}
