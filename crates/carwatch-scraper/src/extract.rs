//! Turns one listing page into an [`ExtractedListing`].

use carwatch_core::ExtractedListing;
use scraper::Html;

use crate::jsonld::best_vehicle;
use crate::patterns::ExtractionPatterns;
use crate::resolve::fields::{
    CAR_NUMBER, CAR_VIN, IMAGES_COUNT, IMAGE_URL, ODOMETER, PRICE_USD, TITLE, USERNAME,
};
use crate::resolve::{extract_auto_id, extract_reveal_token, PageContext};
use crate::reveal_api::PhoneRequest;

/// Fields read from the page, plus the reveal request when the page carries
/// both a listing id and a valid token. The phone itself is never set here.
#[derive(Debug, PartialEq)]
pub struct PageExtraction {
    pub listing: ExtractedListing,
    pub phone_request: Option<PhoneRequest>,
}

/// Extracts every field it can from `html`. Never fails; unresolvable
/// fields stay `None`.
#[must_use]
pub fn extract_page(html: &str, patterns: &ExtractionPatterns) -> PageExtraction {
    let vehicle = best_vehicle(html);
    let document = Html::parse_document(html);
    let ctx = PageContext {
        html,
        vehicle: &vehicle,
        document: &document,
        patterns,
    };

    let listing = ExtractedListing {
        title: TITLE.resolve(&ctx),
        price_usd: PRICE_USD.resolve(&ctx),
        odometer: ODOMETER.resolve(&ctx),
        username: USERNAME.resolve(&ctx),
        phone_number: None,
        image_url: IMAGE_URL.resolve(&ctx),
        images_count: IMAGES_COUNT.resolve(&ctx),
        car_number: CAR_NUMBER.resolve(&ctx),
        car_vin: CAR_VIN.resolve(&ctx),
    };

    let phone_request = extract_auto_id(&ctx).and_then(|auto_id| {
        extract_reveal_token(html, patterns).map(|token| PhoneRequest { auto_id, token })
    });

    PageExtraction {
        listing,
        phone_request,
    }
}
