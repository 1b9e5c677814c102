//! End-to-end tests for `Harvester` against a local mock of the listing site.
//!
//! Covers discovery across index pages, the reveal-endpoint phone path, the
//! browser fallback, and per-listing error isolation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use carwatch_core::{ExtractedListing, RunSummary};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use carwatch_scraper::{
    ExtractionPatterns, Harvester, ListingSink, PageFetcher, PhoneRevealer, PhoneSource,
    RetryPolicy,
};

const SEARCH_PATH: &str = "/uk/car/used/";
const BMW_PATH: &str = "/uk/auto_bmw_x5_123456.html";
const AUDI_PATH: &str = "/uk/auto_audi_a4_777.html";
const GOLF_PATH: &str = "/uk/auto_vw_golf_888.html";

#[derive(Default)]
struct MemorySink {
    rows: Mutex<Vec<(String, ExtractedListing)>>,
}

impl ListingSink for MemorySink {
    type Error = std::io::Error;

    async fn upsert(&self, url: &str, listing: &ExtractedListing) -> Result<(), Self::Error> {
        self.rows
            .lock()
            .unwrap()
            .push((url.to_owned(), listing.clone()));
        Ok(())
    }
}

struct FailingSink;

impl ListingSink for FailingSink {
    type Error = std::io::Error;

    async fn upsert(&self, _url: &str, _listing: &ExtractedListing) -> Result<(), Self::Error> {
        Err(std::io::Error::other("connection reset"))
    }
}

#[derive(Default)]
struct CountingRevealer {
    phone: Option<i64>,
    calls: AtomicUsize,
}

impl PhoneRevealer for CountingRevealer {
    async fn reveal(&self, _listing_url: &str) -> Option<i64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.phone
    }
}

fn harvester<R: PhoneRevealer + Sync>(server: &MockServer, revealer: R) -> Harvester<R> {
    let fetcher = PageFetcher::new(5, "carwatch-test/0.1", "uk-UA", RetryPolicy::immediate())
        .expect("failed to build test PageFetcher");
    Harvester::new(
        fetcher,
        &server.uri(),
        SEARCH_PATH,
        ExtractionPatterns::default(),
        revealer,
    )
    .expect("failed to build test Harvester")
}

fn index_page(hrefs: &[&str], pages: &[u32]) -> String {
    let links: String = hrefs
        .iter()
        .map(|h| format!(r#"<a class="address" href="{h}">car</a>"#))
        .collect();
    let pagination: String = pages
        .iter()
        .map(|p| format!(r#"<a class="page-link" href="?page={p}">{p}</a>"#))
        .collect();
    format!("<html><body>{links}<nav>{pagination}</nav></body></html>")
}

fn bmw_page() -> String {
    r#"<html><head>
<meta property="og:title" content="BMW X5 2019">
<script type="application/ld+json">{"@type":"Vehicle","name":"BMW X5 2019","offers":{"price":45500,"priceCurrency":"USD"}}</script>
</head><body>
<script>window.__PHONE__ = {"autoId": 123456, "expires": 1999999999, "hash": "abcdef0123456789"};</script>
</body></html>"#
        .to_owned()
}

fn audi_page() -> String {
    r#"<html><head><meta property="og:title" content="Audi A4 2016"></head>
<body><p>Audi A4, КА 7777 ОО</p></body></html>"#
        .to_owned()
}

async fn mount_html(server: &MockServer, at: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

async fn mount_bmw_reveal(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/users/phones/123456"))
        .and(query_param("expires", "1999999999"))
        .and(query_param("hash", "abcdef0123456789"))
        .and(header("x-requested-with", "XMLHttpRequest"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"formattedPhoneNumber": "+38 093 123 45 67"})),
        )
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_index(server: &MockServer) {
    // Page 2 is mounted first so it wins over the page-1 mock, which
    // matches any query string on the same path.
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(index_page(&[AUDI_PATH, GOLF_PATH], &[1, 2])),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(index_page(
            &[BMW_PATH, BMW_PATH, "/uk/newauto/auto_kia_sportage_1.html", AUDI_PATH],
            &[2],
        )))
        .mount(server)
        .await;
}

#[tokio::test]
async fn run_once_counts_each_outcome_and_isolates_failures() {
    let server = MockServer::start().await;
    mount_index(&server).await;
    mount_html(&server, BMW_PATH, bmw_page()).await;
    mount_html(&server, AUDI_PATH, audi_page()).await;
    mount_bmw_reveal(&server).await;
    Mock::given(method("GET"))
        .and(path(GOLF_PATH))
        .respond_with(ResponseTemplate::new(404))
        .expect(3)
        .mount(&server)
        .await;

    let harvester = harvester(&server, CountingRevealer::default());
    let sink = MemorySink::default();
    let summary = harvester.run_once(&sink, None).await.unwrap();

    assert_eq!(
        summary,
        RunSummary {
            with_phone: 1,
            without_phone: 1,
            errors: 1,
        }
    );
    assert_eq!(summary.total(), 3);

    let rows = sink.rows.lock().unwrap();
    let urls: Vec<&str> = rows.iter().map(|(url, _)| url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            format!("{}{BMW_PATH}", server.uri()),
            format!("{}{AUDI_PATH}", server.uri()),
        ]
    );

    let bmw = &rows[0].1;
    assert_eq!(bmw.phone_number, Some(380_931_234_567));
    assert_eq!(bmw.price_usd, Some(45_500));
    assert_eq!(bmw.title.as_deref(), Some("BMW X5 2019"));

    let audi = &rows[1].1;
    assert_eq!(audi.phone_number, None);
    assert_eq!(audi.title.as_deref(), Some("Audi A4 2016"));
    assert_eq!(audi.car_number.as_deref(), Some("КА 7777 ОО"));
}

#[tokio::test]
async fn endpoint_phone_skips_browser_revealer() {
    let server = MockServer::start().await;
    mount_html(&server, BMW_PATH, bmw_page()).await;
    mount_bmw_reveal(&server).await;

    let harvester = harvester(&server, CountingRevealer::default());
    let processed = harvester
        .process_listing(&format!("{}{BMW_PATH}", server.uri()))
        .await
        .unwrap();

    assert_eq!(processed.listing.phone_number, Some(380_931_234_567));
    assert_eq!(processed.phone_source, Some(PhoneSource::RevealEndpoint));
}

#[tokio::test]
async fn rejected_token_falls_back_to_browser() {
    let server = MockServer::start().await;
    mount_html(&server, BMW_PATH, bmw_page()).await;
    Mock::given(method("GET"))
        .and(path("/users/phones/123456"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let revealer = CountingRevealer {
        phone: Some(380_501_234_567),
        ..CountingRevealer::default()
    };
    let harvester = harvester(&server, revealer);
    let processed = harvester
        .process_listing(&format!("{}{BMW_PATH}", server.uri()))
        .await
        .unwrap();

    assert_eq!(processed.listing.phone_number, Some(380_501_234_567));
    assert_eq!(processed.phone_source, Some(PhoneSource::Browser));
}

#[tokio::test]
async fn undecodable_reveal_body_falls_back_to_browser() {
    let server = MockServer::start().await;
    mount_html(&server, BMW_PATH, bmw_page()).await;
    Mock::given(method("GET"))
        .and(path("/users/phones/123456"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>captcha</html>"))
        .mount(&server)
        .await;

    let harvester = harvester(&server, CountingRevealer::default());
    let processed = harvester
        .process_listing(&format!("{}{BMW_PATH}", server.uri()))
        .await
        .unwrap();

    assert_eq!(processed.listing.phone_number, None);
    assert_eq!(processed.phone_source, None);
}

#[tokio::test]
async fn page_cap_limits_index_walk() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(index_page(&[GOLF_PATH], &[])))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(index_page(&[], &[2, 3])))
        .mount(&server)
        .await;

    let harvester = harvester(&server, CountingRevealer::default());
    let summary = harvester.run_once(&MemorySink::default(), Some(1)).await.unwrap();
    assert_eq!(summary, RunSummary::default());
}

#[tokio::test]
async fn sink_failure_is_counted_as_error() {
    let server = MockServer::start().await;
    mount_html(&server, AUDI_PATH, audi_page()).await;

    let harvester = harvester(&server, CountingRevealer::default());
    let urls = vec![format!("{}{AUDI_PATH}", server.uri())];
    let summary = harvester.run_urls(&urls, &FailingSink).await;

    assert_eq!(summary.errors, 1);
    assert_eq!(summary.persisted(), 0);
}

#[tokio::test]
async fn discovery_failure_is_returned() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let harvester = harvester(&server, CountingRevealer::default());
    assert!(harvester.run_once(&MemorySink::default(), None).await.is_err());
}
