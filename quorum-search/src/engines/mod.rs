//! Source adapters for the supported search engines.
//!
//! Every engine is described by an [`EngineProfile`]: where its results
//! page lives, how region and language are passed, which CSS selectors pick
//! out organic results, and how its redirect links are unwrapped. A single
//! [`HtmlAdapter`] drives any profile.

pub mod baidu;
pub mod bing;
pub mod brave;
pub mod duckduckgo;
pub mod ecosia;
pub mod google;
pub mod html;
pub mod redirect;
pub mod yandex;

pub use html::HtmlAdapter;

use url::Url;

use crate::error::SearchError;
use crate::types::{EngineId, Language, Region};

/// CSS selectors for one engine's organic results.
///
/// `title`, `link` and `description` are evaluated inside each element
/// matched by `result`. Each may be a selector group (`a, b`).
#[derive(Debug, Clone, Copy)]
pub struct ResultSelectors {
    pub result: &'static str,
    pub title: &'static str,
    pub link: &'static str,
    pub description: &'static str,
}

/// Static description of how to query and scrape one engine.
#[derive(Debug, Clone, Copy)]
pub struct EngineProfile {
    pub engine: EngineId,
    /// Results page, without query string.
    pub base_url: &'static str,
    /// Name of the query parameter (`q`, `text`, `wd`).
    pub query_param: &'static str,
    /// Parameters sent on every request, before the query.
    pub fixed_params: &'static [(&'static str, &'static str)],
    /// Region and language parameters, appended after the query.
    pub locale_params: fn(Region, Language) -> Vec<(&'static str, String)>,
    pub selectors: ResultSelectors,
    /// Unwraps the engine's redirect links.
    pub decode_link: fn(Url) -> Option<String>,
}

impl EngineProfile {
    /// Build the results page URL for `query` against `base`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if `base` is not a valid URL.
    pub fn search_url(
        &self,
        base: &str,
        query: &str,
        region: Region,
        language: Language,
    ) -> crate::Result<Url> {
        let mut url = Url::parse(base)
            .map_err(|e| SearchError::Config(format!("invalid base URL {base}: {e}")))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in self.fixed_params {
                pairs.append_pair(key, value);
            }
            pairs.append_pair(self.query_param, query);
            for (key, value) in (self.locale_params)(region, language) {
                pairs.append_pair(key, &value);
            }
        }
        Ok(url)
    }
}

/// No locale parameters.
pub(crate) fn no_locale(_: Region, _: Language) -> Vec<(&'static str, String)> {
    Vec::new()
}

/// Profile for a known engine.
pub fn profile(engine: EngineId) -> &'static EngineProfile {
    match engine {
        EngineId::Google => &google::PROFILE,
        EngineId::Bing => &bing::PROFILE,
        EngineId::DuckDuckGo => &duckduckgo::PROFILE,
        EngineId::Yandex => &yandex::PROFILE,
        EngineId::Ecosia => &ecosia::PROFILE,
        EngineId::Brave => &brave::PROFILE,
        EngineId::Baidu => &baidu::PROFILE,
    }
}

/// The engine's own results page for `query`, without locale hints.
///
/// Used as the link on placeholder findings so a reader can retry by hand.
pub fn search_page_url(engine: EngineId, query: &str) -> String {
    let profile = profile(engine);
    profile
        .search_url(profile.base_url, query, Region::Global, Language::Auto)
        .map(String::from)
        // SAFETY: every base_url is a valid absolute URL constant; fall back to it verbatim
        .unwrap_or_else(|_| profile.base_url.to_string())
}
