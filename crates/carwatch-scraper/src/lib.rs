pub mod discovery;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod jsonld;
pub mod numeric;
pub mod patterns;
pub mod phone;
pub mod pipeline;
pub mod resolve;
pub mod retry;
pub mod reveal;
pub mod reveal_api;

pub use discovery::{parse_index_page, ListingDiscovery};
pub use error::ScraperError;
pub use extract::{extract_page, PageExtraction};
pub use fetch::PageFetcher;
pub use patterns::{ExtractionPatterns, PatternConfig};
pub use pipeline::{Harvester, ListingSink, PhoneSource, ProcessedListing};
pub use retry::RetryPolicy;
pub use reveal::{DisabledRevealer, PhoneRevealer, RevealTimings};
#[cfg(feature = "browser")]
pub use reveal::{ChromiumRevealer, ChromiumSettings};
pub use reveal_api::{PhoneRequest, RevealEndpoint};
