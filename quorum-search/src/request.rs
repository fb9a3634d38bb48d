//! The validated, immutable search request handed to the orchestrator.

use serde::Serialize;

use crate::error::SearchError;
use crate::types::{Language, Region};

/// One search across a chosen set of engines.
///
/// Engine names are kept as given (trimmed, lowercased, de-duplicated in
/// first-seen order) so that names outside the registry can be reported
/// per engine instead of failing the whole request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchRequest {
    query: String,
    engines: Vec<String>,
    region: Region,
    language: Language,
}

impl SearchRequest {
    /// Build a request from boundary-layer strings.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidRequest`] when the query is blank or no
    /// engine name is given.
    pub fn new<I, S>(query: &str, engines: I, region: Region, language: Language) -> crate::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::InvalidRequest("query must not be empty".into()));
        }

        let mut names: Vec<String> = Vec::new();
        for raw in engines {
            let name = raw.as_ref().trim().to_ascii_lowercase();
            if name.is_empty() || names.contains(&name) {
                continue;
            }
            names.push(name);
        }
        if names.is_empty() {
            return Err(SearchError::InvalidRequest(
                "at least one engine must be selected".into(),
            ));
        }

        Ok(Self {
            query: query.to_string(),
            engines: names,
            region,
            language,
        })
    }

    /// Like [`SearchRequest::new`], parsing region and language leniently.
    pub fn from_parts<I, S>(query: &str, engines: I, region: &str, language: &str) -> crate::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(
            query,
            engines,
            Region::parse_lenient(region),
            Language::parse_lenient(language),
        )
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Selected engine names in request order.
    pub fn engines(&self) -> &[String] {
        &self.engines
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn language(&self) -> Language {
        self.language
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_query_rejected() {
        let err = SearchRequest::new("   ", ["google"], Region::Global, Language::Auto).unwrap_err();
        assert!(matches!(err, SearchError::InvalidRequest(_)));
        assert!(err.to_string().contains("query"));
    }

    #[test]
    fn empty_engine_set_rejected() {
        let engines: [&str; 0] = [];
        let err = SearchRequest::new("cats", engines, Region::Global, Language::Auto).unwrap_err();
        assert!(err.to_string().contains("engine"));
    }

    #[test]
    fn whitespace_only_engine_names_rejected() {
        let err = SearchRequest::new("cats", ["  ", ""], Region::Global, Language::Auto).unwrap_err();
        assert!(matches!(err, SearchError::InvalidRequest(_)));
    }

    #[test]
    fn engines_deduplicated_in_first_seen_order() {
        let request = SearchRequest::new(
            "cats",
            ["Bing", "google", "BING", "yahoo"],
            Region::Global,
            Language::Auto,
        )
        .expect("valid request");
        assert_eq!(request.engines(), ["bing", "google", "yahoo"]);
    }

    #[test]
    fn query_is_trimmed() {
        let request =
            SearchRequest::new("  cats  ", ["google"], Region::Global, Language::Auto).expect("valid");
        assert_eq!(request.query(), "cats");
    }

    #[test]
    fn from_parts_parses_locale_leniently() {
        let request = SearchRequest::from_parts("cats", ["google"], "jp", "nowhere").expect("valid");
        assert_eq!(request.region(), Region::Jp);
        assert_eq!(request.language(), Language::Auto);
    }
}
