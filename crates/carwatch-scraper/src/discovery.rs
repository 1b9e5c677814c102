//! Listing URL discovery over the paginated search index.

use std::collections::HashSet;
use std::sync::LazyLock;

use reqwest::Url;
use scraper::{Html, Selector};

use crate::error::ScraperError;
use crate::fetch::PageFetcher;

static LISTING_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.address").expect("valid selector"));
static PAGE_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.page-link").expect("valid selector"));

const USED_LISTING_MARKER: &str = "/uk/auto_";
const NEW_CAR_MARKER: &str = "/newauto/";

/// Links and pagination found on one index page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexPage {
    /// Raw `href` values of listing links, in document order.
    pub hrefs: Vec<String>,
    /// Highest page number among the pagination links, if any.
    pub max_page: Option<u32>,
}

/// Parses an index page. Pure; performs no I/O.
#[must_use]
pub fn parse_index_page(html: &str) -> IndexPage {
    let document = Html::parse_document(html);
    let hrefs = document
        .select(&LISTING_LINK)
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(str::to_owned)
        .collect();
    let max_page = document
        .select(&PAGE_LINK)
        .filter_map(|a| a.text().collect::<String>().trim().parse::<u32>().ok())
        .max();
    IndexPage { hrefs, max_page }
}

/// Walks the search index and collects used-car listing URLs.
#[derive(Debug, Clone)]
pub struct ListingDiscovery {
    base: Url,
    search_url: String,
}

impl ListingDiscovery {
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidUrl`] if `base_url` or the joined search URL is invalid.
    pub fn new(base_url: &str, search_path: &str) -> Result<Self, ScraperError> {
        let invalid = |reason: String| ScraperError::InvalidUrl {
            url: format!("{base_url}{search_path}"),
            reason,
        };
        let base = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        let search_url = base.join(search_path).map_err(|e| invalid(e.to_string()))?;
        Ok(Self {
            base,
            search_url: search_url.to_string(),
        })
    }

    #[must_use]
    pub fn search_url(&self) -> &str {
        &self.search_url
    }

    fn page_url(&self, page: u32) -> String {
        format!("{}?page={page}", self.search_url)
    }

    /// Resolves an `href` against the site base and keeps it only if it
    /// points at a used-car listing.
    #[must_use]
    pub fn normalize_listing_href(&self, href: &str) -> Option<String> {
        let url = self.base.join(href).ok()?;
        let url = url.as_str();
        (url.contains(USED_LISTING_MARKER) && !url.contains(NEW_CAR_MARKER))
            .then(|| url.to_owned())
    }

    /// Fetches page 1, then pages `2..=min(max_page, page_cap)`, and returns
    /// the deduplicated listing URLs in first-seen order.
    ///
    /// `page_cap = None` walks every page the index advertises. A failure on
    /// page 1 is returned; failures on later pages are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns the fetch error for the first index page.
    pub async fn discover(
        &self,
        fetcher: &PageFetcher,
        page_cap: Option<u32>,
    ) -> Result<Vec<String>, ScraperError> {
        let first = parse_index_page(&fetcher.fetch_html(&self.search_url).await?);
        let advertised = first.max_page.unwrap_or(1).max(1);
        let last_page = page_cap.map_or(advertised, |cap| advertised.min(cap));
        tracing::info!(
            search_url = %self.search_url,
            advertised,
            last_page,
            "discovering listings"
        );

        let mut seen = HashSet::new();
        let mut urls = Vec::new();
        let mut collect = |page: IndexPage| {
            for href in page.hrefs {
                if let Some(url) = self.normalize_listing_href(&href) {
                    if seen.insert(url.clone()) {
                        urls.push(url);
                    }
                }
            }
        };
        collect(first);

        for page in 2..=last_page {
            let page_url = self.page_url(page);
            match fetcher.fetch_html(&page_url).await {
                Ok(html) => collect(parse_index_page(&html)),
                Err(e) => tracing::warn!(page, url = %page_url, error = %e, "skipping index page"),
            }
        }

        tracing::info!(count = urls.len(), "listing discovery complete");
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_links_and_max_page() {
        let html = r#"
            <a class="address" href="/uk/auto_bmw_x5_1.html">BMW</a>
            <a class="address" href=" https://auto.ria.com/uk/auto_audi_a4_2.html ">Audi</a>
            <a class="other" href="/uk/auto_skip_3.html">skip</a>
            <a class="page-link" href="?page=2">2</a>
            <a class="page-link" href="?page=17"> 17 </a>
            <a class="page-link" href="?page=3">»</a>
        "#;
        let page = parse_index_page(html);
        assert_eq!(
            page.hrefs,
            vec![
                "/uk/auto_bmw_x5_1.html",
                "https://auto.ria.com/uk/auto_audi_a4_2.html"
            ]
        );
        assert_eq!(page.max_page, Some(17));
    }

    #[test]
    fn missing_pagination_yields_none() {
        assert_eq!(parse_index_page("<p>empty</p>").max_page, None);
    }

    #[test]
    fn normalizes_and_filters_hrefs() {
        let discovery = ListingDiscovery::new("https://auto.ria.com", "/uk/car/used/").unwrap();
        assert_eq!(discovery.search_url(), "https://auto.ria.com/uk/car/used/");
        assert_eq!(
            discovery.normalize_listing_href("/uk/auto_bmw_x5_1.html").as_deref(),
            Some("https://auto.ria.com/uk/auto_bmw_x5_1.html")
        );
        assert_eq!(
            discovery
                .normalize_listing_href("https://auto.ria.com/uk/auto_audi_2.html")
                .as_deref(),
            Some("https://auto.ria.com/uk/auto_audi_2.html")
        );
        assert!(discovery
            .normalize_listing_href("/uk/newauto/auto_kia_3.html")
            .is_none());
        assert!(discovery.normalize_listing_href("/uk/news/1.html").is_none());
    }

    #[test]
    fn page_urls_use_query_parameter() {
        let discovery = ListingDiscovery::new("https://auto.ria.com", "/uk/car/used/").unwrap();
        assert_eq!(
            discovery.page_url(3),
            "https://auto.ria.com/uk/car/used/?page=3"
        );
    }
}
