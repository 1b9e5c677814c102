//! Element catalogs driven by the interactive reveal.

/// Something the driver can locate and click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    /// First element matching a CSS selector.
    Css(&'static str),
    /// First `tag` element whose text contains `text`, case-insensitively.
    Text { tag: &'static str, text: &'static str },
}

/// Cookie and consent overlays, tried in order until one is dismissed.
pub const OVERLAY_TARGETS: &[ClickTarget] = &[
    ClickTarget::Css("label[for='c-notifier-close']"),
    ClickTarget::Css("#c-notifier-close"),
    ClickTarget::Css("button.fc-cta-consent"),
    ClickTarget::Css("button[class*='fc-cta-consent']"),
    ClickTarget::Css("div.fc-cta-consent"),
    ClickTarget::Css("div[class*='fc-cta-consent']"),
    ClickTarget::Text { tag: "button", text: "Прийняти все" },
    ClickTarget::Text { tag: "button", text: "Прийняти" },
    ClickTarget::Text { tag: "button", text: "Погоджуюсь" },
    ClickTarget::Text { tag: "button", text: "Accept all" },
    ClickTarget::Text { tag: "button", text: "Accept" },
    ClickTarget::Css("#onetrust-accept-btn-handler"),
];

/// Controls that reveal the seller phone, primary first.
pub const REVEAL_TARGETS: &[ClickTarget] = &[
    ClickTarget::Css("span.mhide + a"),
    ClickTarget::Text { tag: "a", text: "показати" },
    ClickTarget::Text { tag: "a", text: "показать" },
    ClickTarget::Text { tag: "button", text: "показати телефон" },
    ClickTarget::Text { tag: "button", text: "показать телефон" },
];

/// Containers whose text holds the phone once revealed.
pub const PHONE_CONTAINERS: &[&str] = &[
    "div.list-phone",
    "div.list-phone div",
    "div.list-phone a:nth-of-type(2) + div",
    "div.list-phone strong",
    "a[href^='tel:']",
];
