//! Interactive phone reveal in a real browser.
//!
//! The reveal is an explicit state machine over [`RevealStage`]. Every stage
//! runs under its own time budget; a stage that overruns either advances to
//! the next best-effort stage or ends the attempt without a phone. Browser
//! access goes through the [`RevealDriver`] trait so the machine can be
//! exercised without a browser.

#[cfg(feature = "browser")]
pub mod chromium;
pub mod targets;

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;
use crate::phone::{find_phone_in_markup, normalize_rendered_phone};
use targets::{ClickTarget, OVERLAY_TARGETS, PHONE_CONTAINERS, REVEAL_TARGETS};

#[cfg(feature = "browser")]
pub use chromium::{ChromiumRevealer, ChromiumSettings};

/// Source of last-resort phone reveals for listings the endpoint could not resolve.
pub trait PhoneRevealer {
    /// Returns the normalized phone or `None`. Never fails.
    fn reveal(&self, listing_url: &str) -> impl Future<Output = Option<i64>> + Send;
}

/// Revealer used when the browser fallback is turned off.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledRevealer;

impl PhoneRevealer for DisabledRevealer {
    async fn reveal(&self, listing_url: &str) -> Option<i64> {
        tracing::debug!(listing_url, "browser reveal disabled");
        None
    }
}

/// Page-level browser operations the reveal needs.
pub trait RevealDriver: Sync {
    /// Loads `url` and waits until the document is parsed.
    fn navigate(&self, url: &str) -> impl Future<Output = Result<(), ScraperError>> + Send;

    /// Scrolls `target` into view and clicks it. `false` when the target is
    /// absent or the click did not go through.
    fn click(&self, target: &ClickTarget) -> impl Future<Output = bool> + Send;

    /// Scrolls the viewport down by `pixels`.
    fn scroll_by(&self, pixels: u32) -> impl Future<Output = ()> + Send;

    /// Rendered text of the first element matching `selector`.
    fn text_of(&self, selector: &str) -> impl Future<Output = Option<String>> + Send;

    /// Full markup of the current page.
    fn snapshot(&self) -> impl Future<Output = Option<String>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealStage {
    Navigate,
    DismissOverlays,
    InduceRender,
    TriggerReveal,
    PollRevealed,
    ScanSnapshot,
}

/// Time budgets for each stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealTimings {
    pub navigation: Duration,
    pub overlay_click: Duration,
    pub overlay_settle: Duration,
    pub scroll_pixels: u32,
    pub render_settle: Duration,
    pub reveal_click: Duration,
    pub poll_interval: Duration,
    pub poll_rounds: u32,
    pub element_read: Duration,
    pub snapshot: Duration,
}

impl Default for RevealTimings {
    fn default() -> Self {
        Self {
            navigation: Duration::from_secs(60),
            overlay_click: Duration::from_secs(2),
            overlay_settle: Duration::from_millis(500),
            scroll_pixels: 900,
            render_settle: Duration::from_millis(500),
            reveal_click: Duration::from_secs(8),
            poll_interval: Duration::from_millis(500),
            poll_rounds: 24,
            element_read: Duration::from_millis(500),
            snapshot: Duration::from_secs(10),
        }
    }
}

enum Transition {
    Advance(RevealStage),
    Resolved(i64),
    Unresolved(&'static str),
}

/// Runs the reveal against `driver` and returns the normalized phone.
pub async fn run_reveal<D: RevealDriver>(
    driver: &D,
    listing_url: &str,
    timings: &RevealTimings,
) -> Option<i64> {
    let mut stage = RevealStage::Navigate;
    loop {
        tracing::trace!(listing_url, ?stage, "reveal stage");
        let transition = match stage {
            RevealStage::Navigate => navigate(driver, listing_url, timings).await,
            RevealStage::DismissOverlays => dismiss_overlays(driver, timings).await,
            RevealStage::InduceRender => induce_render(driver, timings).await,
            RevealStage::TriggerReveal => trigger_reveal(driver, timings).await,
            RevealStage::PollRevealed => poll_revealed(driver, timings).await,
            RevealStage::ScanSnapshot => scan_snapshot(driver, timings).await,
        };
        match transition {
            Transition::Advance(next) => stage = next,
            Transition::Resolved(phone) => {
                tracing::debug!(listing_url, ?stage, "phone revealed in browser");
                return Some(phone);
            }
            Transition::Unresolved(reason) => {
                tracing::debug!(listing_url, ?stage, reason, "browser reveal gave up");
                return None;
            }
        }
    }
}

async fn navigate<D: RevealDriver>(
    driver: &D,
    url: &str,
    timings: &RevealTimings,
) -> Transition {
    match tokio::time::timeout(timings.navigation, driver.navigate(url)).await {
        Ok(Ok(())) => Transition::Advance(RevealStage::DismissOverlays),
        Ok(Err(e)) => {
            tracing::warn!(url, error = %e, "listing navigation failed");
            Transition::Unresolved("navigation failed")
        }
        Err(_) => Transition::Unresolved("navigation timed out"),
    }
}

async fn dismiss_overlays<D: RevealDriver>(driver: &D, timings: &RevealTimings) -> Transition {
    for target in OVERLAY_TARGETS {
        let clicked = tokio::time::timeout(timings.overlay_click, driver.click(target))
            .await
            .unwrap_or(false);
        if clicked {
            tokio::time::sleep(timings.overlay_settle).await;
            break;
        }
    }
    Transition::Advance(RevealStage::InduceRender)
}

async fn induce_render<D: RevealDriver>(driver: &D, timings: &RevealTimings) -> Transition {
    // A stuck scroll is not fatal; the reveal control may already be rendered.
    let _ = tokio::time::timeout(timings.render_settle, driver.scroll_by(timings.scroll_pixels))
        .await;
    tokio::time::sleep(timings.render_settle).await;
    Transition::Advance(RevealStage::TriggerReveal)
}

async fn trigger_reveal<D: RevealDriver>(driver: &D, timings: &RevealTimings) -> Transition {
    for target in REVEAL_TARGETS {
        let clicked = tokio::time::timeout(timings.reveal_click, driver.click(target))
            .await
            .unwrap_or(false);
        if clicked {
            return Transition::Advance(RevealStage::PollRevealed);
        }
    }
    Transition::Unresolved("no reveal control")
}

async fn poll_revealed<D: RevealDriver>(driver: &D, timings: &RevealTimings) -> Transition {
    for round in 0..timings.poll_rounds.max(1) {
        for selector in PHONE_CONTAINERS {
            let text = tokio::time::timeout(timings.element_read, driver.text_of(selector))
                .await
                .ok()
                .flatten();
            if let Some(phone) = text.as_deref().and_then(normalize_rendered_phone) {
                return Transition::Resolved(phone);
            }
        }
        if round + 1 < timings.poll_rounds {
            tokio::time::sleep(timings.poll_interval).await;
        }
    }
    Transition::Advance(RevealStage::ScanSnapshot)
}

async fn scan_snapshot<D: RevealDriver>(driver: &D, timings: &RevealTimings) -> Transition {
    let markup = tokio::time::timeout(timings.snapshot, driver.snapshot())
        .await
        .ok()
        .flatten();
    match markup.as_deref().and_then(find_phone_in_markup) {
        Some(phone) => Transition::Resolved(phone),
        None => Transition::Unresolved("no phone after reveal"),
    }
}

#[cfg(test)]
#[path = "reveal_test.rs"]
mod tests;
