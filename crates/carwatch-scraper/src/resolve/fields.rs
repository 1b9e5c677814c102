//! Strategy chains for the extracted listing fields.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;

use super::{FieldChain, PageContext};
use crate::numeric::lenient_i32;

static OG_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[property="og:title"]"#).expect("valid selector"));
static OG_IMAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[property="og:image"]"#).expect("valid selector"));
static IMG_SRC: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[src]").expect("valid selector"));

const HIDDEN_TEXT_PARENTS: &[&str] = &["script", "style", "noscript", "template"];

pub const TITLE: FieldChain<String> = FieldChain {
    field: "title",
    strategies: &[
        ("structured_name", title_from_vehicle),
        ("og_title", title_from_og_meta),
    ],
};

pub const PRICE_USD: FieldChain<i32> = FieldChain {
    field: "price_usd",
    strategies: &[
        ("usd_offer", price_from_offer),
        ("usd_marker", price_from_usd_marker),
        ("usd_field", price_from_usd_field),
    ],
};

pub const ODOMETER: FieldChain<i32> = FieldChain {
    field: "odometer",
    strategies: &[("structured_mileage", odometer_from_vehicle)],
};

pub const USERNAME: FieldChain<String> = FieldChain {
    field: "username",
    strategies: &[("seller_name", username_from_page_state)],
};

pub const IMAGE_URL: FieldChain<String> = FieldChain {
    field: "image_url",
    strategies: &[("og_image", image_url_from_og_meta)],
};

pub const IMAGES_COUNT: FieldChain<i32> = FieldChain {
    field: "images_count",
    strategies: &[
        ("structured_image_list", images_from_vehicle_list),
        ("structured_image", images_from_vehicle_single),
        ("photo_counter", images_from_counters),
        ("cdn_images", images_from_cdn_tags),
    ],
};

pub const CAR_NUMBER: FieldChain<String> = FieldChain {
    field: "car_number",
    strategies: &[("visible_plate", plate_from_visible_text)],
};

pub const CAR_VIN: FieldChain<String> = FieldChain {
    field: "car_vin",
    strategies: &[
        ("structured_vin", vin_from_identification_number),
        ("structured_vin_alias", vin_from_alias),
    ],
};

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|content| !content.is_empty())
        .map(str::to_owned)
}

fn first_capture(regex: &Regex, haystack: &str) -> Option<String> {
    regex
        .captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_owned())
}

fn capture_i32(regex: &Regex, haystack: &str) -> Option<i32> {
    first_capture(regex, haystack).and_then(|raw| raw.parse().ok())
}

/// Text content of the document outside `<script>`, `<style>` and similar.
pub(crate) fn visible_text(document: &Html) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_TEXT_PARENTS.contains(&el.name()))
        });
        if hidden {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }
    parts.join(" ")
}

fn title_from_vehicle(ctx: &PageContext<'_>) -> Option<String> {
    ctx.vehicle.str_field("name").map(str::to_owned)
}

fn title_from_og_meta(ctx: &PageContext<'_>) -> Option<String> {
    meta_content(ctx.document, &OG_TITLE)
}

fn is_usd_offer(offer: &Value) -> bool {
    offer.get("priceCurrency").and_then(Value::as_str) == Some("USD")
}

fn price_from_offer(ctx: &PageContext<'_>) -> Option<i32> {
    let offers = ctx.vehicle.get("offers")?;
    let offer = match offers {
        Value::Array(list) => list.iter().find(|o| is_usd_offer(o))?,
        Value::Object(_) if is_usd_offer(offers) => offers,
        _ => return None,
    };
    offer
        .get("price")
        .and_then(lenient_i32)
        .filter(|price| *price >= 0)
}

fn price_from_usd_marker(ctx: &PageContext<'_>) -> Option<i32> {
    capture_i32(&ctx.patterns.usd_marker, ctx.html)
}

fn price_from_usd_field(ctx: &PageContext<'_>) -> Option<i32> {
    ctx.patterns
        .usd_fields
        .iter()
        .find_map(|re| capture_i32(re, ctx.html))
}

fn odometer_from_vehicle(ctx: &PageContext<'_>) -> Option<i32> {
    ctx.vehicle
        .get("mileageFromOdometer")
        .and_then(|m| m.get("value"))
        .and_then(lenient_i32)
}

fn username_from_page_state(ctx: &PageContext<'_>) -> Option<String> {
    ctx.patterns.username.iter().find_map(|re| {
        first_capture(re, ctx.html)
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty())
    })
}

fn image_url_from_og_meta(ctx: &PageContext<'_>) -> Option<String> {
    meta_content(ctx.document, &OG_IMAGE)
}

fn images_from_vehicle_list(ctx: &PageContext<'_>) -> Option<i32> {
    match ctx.vehicle.get("image")? {
        Value::Array(images) if !images.is_empty() => i32::try_from(images.len()).ok(),
        _ => None,
    }
}

fn images_from_vehicle_single(ctx: &PageContext<'_>) -> Option<i32> {
    ctx.vehicle.str_field("image").map(|_| 1)
}

fn images_from_counters(ctx: &PageContext<'_>) -> Option<i32> {
    ctx.patterns
        .image_count
        .iter()
        .find_map(|re| capture_i32(re, ctx.html))
}

fn images_from_cdn_tags(ctx: &PageContext<'_>) -> Option<i32> {
    let host = ctx.patterns.image_cdn_host.as_str();
    let distinct: HashSet<&str> = ctx
        .document
        .select(&IMG_SRC)
        .filter_map(|el| el.value().attr("src"))
        .filter(|src| src.contains(host))
        .collect();
    if distinct.is_empty() {
        None
    } else {
        i32::try_from(distinct.len()).ok()
    }
}

fn plate_from_visible_text(ctx: &PageContext<'_>) -> Option<String> {
    let text = visible_text(ctx.document);
    ctx.patterns
        .plate
        .find(&text)
        .map(|m| m.as_str().trim().to_owned())
}

fn vin_from_identification_number(ctx: &PageContext<'_>) -> Option<String> {
    ctx.vehicle
        .str_field("vehicleIdentificationNumber")
        .map(str::to_owned)
}

fn vin_from_alias(ctx: &PageContext<'_>) -> Option<String> {
    ctx.vehicle.str_field("vin").map(str::to_owned)
}

#[cfg(test)]
#[path = "fields_test.rs"]
mod tests;
