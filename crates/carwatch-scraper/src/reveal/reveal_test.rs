use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::*;

#[derive(Default)]
struct FakeDriver {
    navigation_fails: bool,
    navigation_delay: Duration,
    clickable: Vec<ClickTarget>,
    texts: HashMap<&'static str, String>,
    snapshot: Option<String>,
    clicks: Mutex<Vec<ClickTarget>>,
    reads: AtomicUsize,
    snapshots: AtomicUsize,
}

impl RevealDriver for FakeDriver {
    async fn navigate(&self, _url: &str) -> Result<(), ScraperError> {
        if !self.navigation_delay.is_zero() {
            tokio::time::sleep(self.navigation_delay).await;
        }
        if self.navigation_fails {
            return Err(ScraperError::Browser {
                stage: "navigate",
                reason: "net::ERR_NAME_NOT_RESOLVED".to_owned(),
            });
        }
        Ok(())
    }

    async fn click(&self, target: &ClickTarget) -> bool {
        let ok = self.clickable.contains(target);
        if ok {
            self.clicks.lock().unwrap().push(*target);
        }
        ok
    }

    async fn scroll_by(&self, _pixels: u32) {}

    async fn text_of(&self, selector: &str) -> Option<String> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.texts.get(selector).cloned()
    }

    async fn snapshot(&self) -> Option<String> {
        self.snapshots.fetch_add(1, Ordering::SeqCst);
        self.snapshot.clone()
    }
}

fn fast_timings() -> RevealTimings {
    RevealTimings {
        navigation: Duration::from_millis(20),
        overlay_click: Duration::from_millis(20),
        overlay_settle: Duration::ZERO,
        scroll_pixels: 900,
        render_settle: Duration::ZERO,
        reveal_click: Duration::from_millis(20),
        poll_interval: Duration::from_millis(1),
        poll_rounds: 3,
        element_read: Duration::from_millis(20),
        snapshot: Duration::from_millis(20),
    }
}

const URL: &str = "https://auto.ria.com/uk/auto_bmw_x5_1.html";

#[tokio::test]
async fn resolves_phone_from_polled_container() {
    let driver = FakeDriver {
        clickable: vec![REVEAL_TARGETS[0]],
        texts: HashMap::from([("div.list-phone", "(093) 123 45 67".to_owned())]),
        ..FakeDriver::default()
    };
    assert_eq!(
        run_reveal(&driver, URL, &fast_timings()).await,
        Some(380_931_234_567)
    );
    assert_eq!(driver.snapshots.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn overlay_dismissal_stops_after_first_success() {
    let driver = FakeDriver {
        clickable: vec![OVERLAY_TARGETS[1], OVERLAY_TARGETS[2], REVEAL_TARGETS[0]],
        texts: HashMap::from([("a[href^='tel:']", "+380501234567".to_owned())]),
        ..FakeDriver::default()
    };
    run_reveal(&driver, URL, &fast_timings()).await;
    assert_eq!(
        *driver.clicks.lock().unwrap(),
        vec![OVERLAY_TARGETS[1], REVEAL_TARGETS[0]]
    );
}

#[tokio::test]
async fn falls_back_to_text_reveal_control() {
    let fallback = ClickTarget::Text {
        tag: "a",
        text: "показати",
    };
    let driver = FakeDriver {
        clickable: vec![fallback],
        texts: HashMap::from([("div.list-phone strong", "050 123 45 67".to_owned())]),
        ..FakeDriver::default()
    };
    assert_eq!(
        run_reveal(&driver, URL, &fast_timings()).await,
        Some(380_501_234_567)
    );
    assert_eq!(*driver.clicks.lock().unwrap(), vec![fallback]);
}

#[tokio::test]
async fn missing_reveal_control_ends_without_polling() {
    let driver = FakeDriver {
        snapshot: Some("<a href='tel:+380501234567'>".to_owned()),
        ..FakeDriver::default()
    };
    assert_eq!(run_reveal(&driver, URL, &fast_timings()).await, None);
    assert_eq!(driver.reads.load(Ordering::SeqCst), 0);
    assert_eq!(driver.snapshots.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn navigation_failure_ends_without_clicking() {
    let driver = FakeDriver {
        navigation_fails: true,
        clickable: vec![REVEAL_TARGETS[0]],
        ..FakeDriver::default()
    };
    assert_eq!(run_reveal(&driver, URL, &fast_timings()).await, None);
    assert!(driver.clicks.lock().unwrap().is_empty());
}

#[tokio::test]
async fn slow_navigation_times_out() {
    let driver = FakeDriver {
        navigation_delay: Duration::from_millis(200),
        clickable: vec![REVEAL_TARGETS[0]],
        ..FakeDriver::default()
    };
    assert_eq!(run_reveal(&driver, URL, &fast_timings()).await, None);
    assert!(driver.clicks.lock().unwrap().is_empty());
}

#[tokio::test]
async fn exhausted_poll_falls_through_to_snapshot_scan() {
    let driver = FakeDriver {
        clickable: vec![REVEAL_TARGETS[0]],
        texts: HashMap::from([("div.list-phone", "показати".to_owned())]),
        snapshot: Some(r#"<div data-ts="1999999999"><a href="tel:+380501234567">call</a></div>"#.to_owned()),
        ..FakeDriver::default()
    };
    assert_eq!(
        run_reveal(&driver, URL, &fast_timings()).await,
        Some(380_501_234_567)
    );
    assert_eq!(
        driver.reads.load(Ordering::SeqCst),
        3 * PHONE_CONTAINERS.len()
    );
    assert_eq!(driver.snapshots.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn nothing_found_anywhere_is_absent() {
    let driver = FakeDriver {
        clickable: vec![REVEAL_TARGETS[0]],
        snapshot: Some("<p>sold</p>".to_owned()),
        ..FakeDriver::default()
    };
    assert_eq!(run_reveal(&driver, URL, &fast_timings()).await, None);
}

#[tokio::test]
async fn disabled_revealer_never_finds_a_phone() {
    assert_eq!(DisabledRevealer.reveal(URL).await, None);
}

#[test]
fn default_timings_match_interactive_budgets() {
    let timings = RevealTimings::default();
    assert_eq!(timings.navigation, Duration::from_secs(60));
    assert_eq!(timings.reveal_click, Duration::from_secs(8));
    assert_eq!(timings.poll_interval * timings.poll_rounds, Duration::from_secs(12));
}
