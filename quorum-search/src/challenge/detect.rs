//! Challenge detection over a rendered page.
//!
//! [`detect_challenge`] is a pure predicate: it looks only at the page
//! snapshot it is given and returns the signature of the first heuristic
//! that matched. Engine-specific markers are checked before generic ones,
//! then the page title and body text.

use scraper::{ElementRef, Html, Selector};

use crate::session::PageSnapshot;
use crate::types::EngineId;

/// A single challenge heuristic.
#[derive(Debug, Clone, Copy)]
enum Marker {
    /// Any element matching the selector.
    Selector(&'static str),
    /// An element matching the selector whose text contains the phrase.
    SelectorWithText(&'static str, &'static str),
}

const GOOGLE_MARKERS: &[Marker] = &[
    Marker::Selector("#captcha-form"),
    Marker::Selector(".g-recaptcha"),
    Marker::Selector("iframe[src*=\"recaptcha\"]"),
];

const BRAVE_MARKERS: &[Marker] = &[
    Marker::SelectorWithText("button", "I'm not a robot"),
    Marker::SelectorWithText("button", "Je ne suis pas un robot"),
    Marker::Selector("[aria-label=\"Captcha\"]"),
];

const YANDEX_MARKERS: &[Marker] = &[
    Marker::Selector(".CheckboxCaptcha"),
    Marker::Selector(".AdvancedCaptcha"),
    Marker::Selector(".AdvancedCaptcha-Image"),
    Marker::Selector(".Captcha-Image"),
    Marker::Selector(".captcha__image"),
    Marker::Selector("img[src*=\"captcha\"]"),
    Marker::Selector("div[data-type=\"captcha\"]"),
    Marker::Selector("form[action*=\"captcha\"]"),
    Marker::SelectorWithText("div", "I am not a robot"),
    Marker::SelectorWithText("div", "Je ne suis pas un robot"),
    Marker::Selector(".SmartCaptcha"),
    Marker::Selector(".SmartCaptcha-Anchor"),
    Marker::Selector(".SmartCaptcha-CheckboxCaptcha"),
    Marker::Selector(".smartcaptcha"),
    Marker::Selector("iframe[src*=\"captcha.yandex.com\"]"),
    Marker::Selector("iframe[src*=\"smart-captcha\"]"),
    Marker::Selector("iframe[src*=\"smartcaptcha\"]"),
    Marker::Selector("div[data-testid=\"checkbox-captcha\"]"),
    Marker::Selector("a[href*=\"yandex.com/support/smart-captcha\"]"),
];

const BAIDU_MARKERS: &[Marker] = &[
    Marker::Selector("#seccaptcha"),
    Marker::Selector(".vcode-body"),
    Marker::Selector("iframe[src*=\"wappass.baidu.com\"]"),
];

const GENERIC_MARKERS: &[Marker] = &[
    Marker::Selector("#captcha"),
    Marker::Selector(".captcha"),
    Marker::Selector("iframe[src*=\"captcha\"]"),
    Marker::Selector("iframe[src*=\"recaptcha\"]"),
    Marker::Selector("iframe[src*=\"hcaptcha.com\"]"),
    Marker::Selector("#challenge-form"),
    Marker::Selector(".cf-turnstile"),
];

/// Lowercased title fragments that indicate a verification page.
const TITLE_PHRASES: &[&str] = &[
    "captcha",
    "are you a robot",
    "robot check",
    "human verification",
    "verify you are human",
    "just a moment",
    "unusual traffic",
];

/// Lowercased body fragments that indicate a verification prompt.
const BODY_PHRASES: &[&str] = &[
    "confirm you're a human",
    "confirm you are a human",
    "confirmer que vous êtes humain",
    "our systems have detected unusual traffic",
    "please complete the security check",
];

fn engine_markers(engine: EngineId) -> &'static [Marker] {
    match engine {
        EngineId::Google => GOOGLE_MARKERS,
        EngineId::Brave => BRAVE_MARKERS,
        EngineId::Yandex => YANDEX_MARKERS,
        EngineId::Baidu => BAIDU_MARKERS,
        EngineId::Bing | EngineId::DuckDuckGo | EngineId::Ecosia => &[],
    }
}

/// Check a page for an anti-automation challenge.
///
/// Returns the signature of the matching heuristic, e.g.
/// `selector:.g-recaptcha` or `text:title`, or `None` for a normal page.
pub fn detect_challenge(engine: EngineId, page: &PageSnapshot) -> Option<String> {
    let document = page.document();

    let markers = engine_markers(engine).iter().chain(GENERIC_MARKERS.iter());
    for marker in markers {
        if let Some(signature) = match_marker(&document, *marker) {
            return Some(signature);
        }
    }

    let title = page.title.to_lowercase();
    if TITLE_PHRASES.iter().any(|phrase| title.contains(phrase)) {
        return Some("text:title".to_string());
    }

    let body = page.body_text().to_lowercase();
    if BODY_PHRASES.iter().any(|phrase| body.contains(phrase)) {
        return Some("text:body".to_string());
    }

    None
}

fn match_marker(document: &Html, marker: Marker) -> Option<String> {
    match marker {
        Marker::Selector(css) => {
            let selector = Selector::parse(css).ok()?;
            document
                .select(&selector)
                .next()
                .map(|_| format!("selector:{css}"))
        }
        Marker::SelectorWithText(css, phrase) => {
            let selector = Selector::parse(css).ok()?;
            document
                .select(&selector)
                .any(|el| element_text(el).contains(phrase))
                .then(|| format!("selector:{css}:contains({phrase})"))
        }
    }
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>()
}
