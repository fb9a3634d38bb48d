//! Core types: engine identifiers, locale hints, raw and aggregated findings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Placeholder used when an engine shows no description for a finding.
pub const NO_DESCRIPTION: &str = "No description available";

/// The fixed set of search engines quorum knows how to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineId {
    /// Google: best results but aggressive bot detection.
    Google,
    /// Bing: wraps result links in base64 redirects.
    Bing,
    /// DuckDuckGo: HTML endpoint, most tolerant of automation.
    DuckDuckGo,
    /// Yandex: slow, frequently serves SmartCaptcha.
    Yandex,
    /// Ecosia: Bing-backed index.
    Ecosia,
    /// Brave Search: independent index.
    Brave,
    /// Baidu: wraps result links in redirect URLs.
    Baidu,
}

impl EngineId {
    /// Stable lowercase identifier used on the wire and as the outcome key.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Bing => "bing",
            Self::DuckDuckGo => "duckduckgo",
            Self::Yandex => "yandex",
            Self::Ecosia => "ecosia",
            Self::Brave => "brave",
            Self::Baidu => "baidu",
        }
    }

    /// Human-readable name for placeholders and logs.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Google => "Google",
            Self::Bing => "Bing",
            Self::DuckDuckGo => "DuckDuckGo",
            Self::Yandex => "Yandex",
            Self::Ecosia => "Ecosia",
            Self::Brave => "Brave",
            Self::Baidu => "Baidu",
        }
    }

    /// Returns all available engine variants.
    pub fn all() -> &'static [EngineId] {
        &[
            Self::Google,
            Self::Bing,
            Self::DuckDuckGo,
            Self::Yandex,
            Self::Ecosia,
            Self::Brave,
            Self::Baidu,
        ]
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EngineId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|engine| engine.name() == lowered)
            .ok_or_else(|| format!("unknown engine: {s}"))
    }
}

/// Region hint passed to adapters. `Global` means no regional bias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[default]
    Global,
    Us,
    Fr,
    Uk,
    De,
    Es,
    It,
    Ca,
    Jp,
    Br,
    Cn,
}

impl Region {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Us => "us",
            Self::Fr => "fr",
            Self::Uk => "uk",
            Self::De => "de",
            Self::Es => "es",
            Self::It => "it",
            Self::Ca => "ca",
            Self::Jp => "jp",
            Self::Br => "br",
            Self::Cn => "cn",
        }
    }

    /// ISO 3166 country code, or `None` for [`Region::Global`].
    pub fn country_code(&self) -> Option<&'static str> {
        match self {
            Self::Global => None,
            Self::Us => Some("US"),
            Self::Fr => Some("FR"),
            Self::Uk => Some("GB"),
            Self::De => Some("DE"),
            Self::Es => Some("ES"),
            Self::It => Some("IT"),
            Self::Ca => Some("CA"),
            Self::Jp => Some("JP"),
            Self::Br => Some("BR"),
            Self::Cn => Some("CN"),
        }
    }

    pub fn all() -> &'static [Region] {
        &[
            Self::Global,
            Self::Us,
            Self::Fr,
            Self::Uk,
            Self::De,
            Self::Es,
            Self::It,
            Self::Ca,
            Self::Jp,
            Self::Br,
            Self::Cn,
        ]
    }

    /// Parse a region code, falling back to [`Region::Global`] for anything
    /// unrecognised.
    pub fn parse_lenient(raw: &str) -> Self {
        let lowered = raw.trim().to_ascii_lowercase();
        match Self::all().iter().find(|r| r.code() == lowered) {
            Some(region) => *region,
            None => {
                if !lowered.is_empty() {
                    tracing::warn!(region = raw, "unknown region, using global");
                }
                Self::Global
            }
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Interface language hint. `Auto` lets the engine decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Auto,
    En,
    Fr,
    De,
    Es,
    It,
    Ja,
    Pt,
    Zh,
    Ru,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::En => "en",
            Self::Fr => "fr",
            Self::De => "de",
            Self::Es => "es",
            Self::It => "it",
            Self::Ja => "ja",
            Self::Pt => "pt",
            Self::Zh => "zh",
            Self::Ru => "ru",
        }
    }

    /// The language code to send to engines, `None` for [`Language::Auto`].
    pub fn explicit(&self) -> Option<&'static str> {
        match self {
            Self::Auto => None,
            other => Some(other.code()),
        }
    }

    pub fn all() -> &'static [Language] {
        &[
            Self::Auto,
            Self::En,
            Self::Fr,
            Self::De,
            Self::Es,
            Self::It,
            Self::Ja,
            Self::Pt,
            Self::Zh,
            Self::Ru,
        ]
    }

    /// Parse a language code, falling back to [`Language::Auto`].
    pub fn parse_lenient(raw: &str) -> Self {
        let lowered = raw.trim().to_ascii_lowercase();
        match Self::all().iter().find(|l| l.code() == lowered) {
            Some(language) => *language,
            None => {
                if !lowered.is_empty() {
                    tracing::warn!(language = raw, "unknown language, using auto");
                }
                Self::Auto
            }
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A single finding as scraped from one engine's results page.
///
/// Lives only for the duration of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFinding {
    /// Result title. May be empty.
    pub title: String,
    /// Absolute URL of the result.
    pub url: String,
    /// Snippet text, or [`NO_DESCRIPTION`].
    pub description: String,
}

impl RawFinding {
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            description: description.into(),
        }
    }
}

/// A de-duplicated result merged from one or more engines.
///
/// `raw_score` always equals the number of contributing engines; the only
/// way to change either is [`AggregatedResult::absorb`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedResult {
    normalized_url: String,
    url: String,
    title: String,
    description: String,
    contributing_engines: Vec<String>,
    raw_score: usize,
    score: f64,
}

impl AggregatedResult {
    /// Seed a new aggregate from the first sighting of a normalised URL.
    pub(crate) fn seed(normalized_url: String, engine: &str, finding: &RawFinding) -> Self {
        let mut result = Self {
            normalized_url,
            url: finding.url.clone(),
            title: finding.title.clone(),
            description: finding.description.clone(),
            contributing_engines: vec![engine.to_string()],
            raw_score: 1,
            score: 0.0,
        };
        result.rescore();
        result
    }

    /// Merge another sighting of the same normalised URL.
    ///
    /// A repeat from an engine already listed does not count twice, but its
    /// title and description still compete on length.
    pub(crate) fn absorb(&mut self, engine: &str, finding: &RawFinding) {
        if !self.contributing_engines.iter().any(|e| e == engine) {
            self.contributing_engines.push(engine.to_string());
            self.raw_score = self.contributing_engines.len();
            self.rescore();
        }
        if finding.title.chars().count() > self.title.chars().count() {
            self.title = finding.title.clone();
        }
        if finding.description.chars().count() > self.description.chars().count() {
            self.description = finding.description.clone();
        }
    }

    fn rescore(&mut self) {
        self.score = crate::orchestrator::scoring::score(self.raw_score);
    }

    /// Deduplication key.
    pub fn normalized_url(&self) -> &str {
        &self.normalized_url
    }

    /// The URL as first seen, before normalisation.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Engines that returned this URL, in order of first sighting.
    pub fn contributing_engines(&self) -> &[String] {
        &self.contributing_engines
    }

    /// Number of distinct contributing engines.
    pub fn raw_score(&self) -> usize {
        self.raw_score
    }

    /// Display score in `1.0..=5.0`.
    pub fn score(&self) -> f64 {
        self.score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_names_are_lowercase_ids() {
        assert_eq!(EngineId::DuckDuckGo.name(), "duckduckgo");
        assert_eq!(EngineId::DuckDuckGo.display_name(), "DuckDuckGo");
        assert_eq!(EngineId::Google.to_string(), "google");
    }

    #[test]
    fn engine_parse_is_case_insensitive() {
        assert_eq!("Google".parse::<EngineId>(), Ok(EngineId::Google));
        assert_eq!(" BING ".parse::<EngineId>(), Ok(EngineId::Bing));
        assert!("altavista".parse::<EngineId>().is_err());
    }

    #[test]
    fn engine_all_has_seven_variants() {
        assert_eq!(EngineId::all().len(), 7);
    }

    #[test]
    fn engine_serde_uses_lowercase() {
        let json = serde_json::to_string(&EngineId::DuckDuckGo).expect("serialize");
        assert_eq!(json, "\"duckduckgo\"");
    }

    #[test]
    fn region_lenient_parse() {
        assert_eq!(Region::parse_lenient("FR"), Region::Fr);
        assert_eq!(Region::parse_lenient("atlantis"), Region::Global);
        assert_eq!(Region::parse_lenient(""), Region::Global);
    }

    #[test]
    fn region_country_codes() {
        assert_eq!(Region::Uk.country_code(), Some("GB"));
        assert_eq!(Region::Global.country_code(), None);
    }

    #[test]
    fn language_lenient_parse() {
        assert_eq!(Language::parse_lenient("ja"), Language::Ja);
        assert_eq!(Language::parse_lenient("klingon"), Language::Auto);
        assert_eq!(Language::Auto.explicit(), None);
        assert_eq!(Language::De.explicit(), Some("de"));
    }

    #[test]
    fn seed_starts_with_one_engine() {
        let finding = RawFinding::new("Cats", "https://x.com/cats", NO_DESCRIPTION);
        let result = AggregatedResult::seed("https://x.com/cats".into(), "google", &finding);
        assert_eq!(result.raw_score(), 1);
        assert_eq!(result.contributing_engines(), ["google".to_string()]);
        assert!((result.score() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn absorb_keeps_longer_fields_independently() {
        let first = RawFinding::new("Cats - Wikipedia", "https://x.com/cats", "short");
        let second = RawFinding::new("Cats", "https://x.com/cats", "a much longer description");
        let mut result = AggregatedResult::seed("https://x.com/cats".into(), "a", &first);
        result.absorb("b", &second);
        assert_eq!(result.title(), "Cats - Wikipedia");
        assert_eq!(result.description(), "a much longer description");
        assert_eq!(result.raw_score(), 2);
    }

    #[test]
    fn absorb_same_engine_does_not_double_count() {
        let finding = RawFinding::new("T", "https://x.com", "d");
        let mut result = AggregatedResult::seed("https://x.com/".into(), "a", &finding);
        result.absorb("a", &RawFinding::new("Longer title", "https://x.com", "d"));
        assert_eq!(result.raw_score(), 1);
        assert_eq!(result.contributing_engines().len(), 1);
        assert_eq!(result.title(), "Longer title");
    }

    #[test]
    fn aggregated_result_serializes_camel_case() {
        let finding = RawFinding::new("T", "https://x.com", "d");
        let result = AggregatedResult::seed("https://x.com/".into(), "a", &finding);
        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(json["normalizedUrl"], "https://x.com/");
        assert_eq!(json["rawScore"], 1);
        assert_eq!(json["contributingEngines"][0], "a");
    }
}
