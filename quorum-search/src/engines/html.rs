//! The generic HTML source adapter.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};

use super::{redirect, EngineProfile};
use crate::adapter::SourceAdapter;
use crate::error::{AdapterError, SearchError};
use crate::session::Session;
use crate::types::{EngineId, Language, RawFinding, Region, NO_DESCRIPTION};

/// Scrapes an engine's HTML results page as described by its profile.
#[derive(Debug, Clone)]
pub struct HtmlAdapter {
    profile: &'static EngineProfile,
    max_findings: usize,
    base_url: Option<String>,
}

impl HtmlAdapter {
    pub fn new(profile: &'static EngineProfile, max_findings: usize) -> Self {
        Self {
            profile,
            max_findings,
            base_url: None,
        }
    }

    /// Query `base` instead of the engine's public results page.
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = Some(base.into());
        self
    }

    pub fn profile(&self) -> &'static EngineProfile {
        self.profile
    }

    fn base(&self) -> &str {
        self.base_url.as_deref().unwrap_or(self.profile.base_url)
    }

    fn extract_current(&self, session: &Session) -> Result<Vec<RawFinding>, AdapterError> {
        let page = session
            .current_page()
            .ok_or_else(|| AdapterError::Navigation("session has no page".into()))?;
        let findings = extract_findings(self.profile, &page.final_url, &page.html, self.max_findings)?;
        tracing::debug!(engine = %self.profile.engine, count = findings.len(), "findings extracted");
        Ok(findings)
    }
}

#[async_trait]
impl SourceAdapter for HtmlAdapter {
    fn engine(&self) -> EngineId {
        self.profile.engine
    }

    async fn fetch(
        &self,
        query: &str,
        region: Region,
        language: Language,
        session: &mut Session,
    ) -> Result<Vec<RawFinding>, AdapterError> {
        tracing::trace!(engine = %self.profile.engine, query, "fetching results page");
        let url = self.profile.search_url(self.base(), query, region, language)?;
        session.navigate(url.as_str()).await?;
        self.extract_current(session)
    }

    /// After mediation the session already shows the reloaded results page.
    async fn resume(
        &self,
        _query: &str,
        _region: Region,
        _language: Language,
        session: &mut Session,
    ) -> Result<Vec<RawFinding>, AdapterError> {
        self.extract_current(session)
    }
}

fn selector(css: &str) -> crate::Result<Selector> {
    Selector::parse(css).map_err(|e| SearchError::Parse(format!("invalid selector {css:?}: {e:?}")))
}

fn collapsed_text(el: ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Pull organic findings out of a results page.
///
/// Results with an empty title or no usable link are skipped. A missing
/// description becomes [`NO_DESCRIPTION`]. Stops after `max_findings`.
///
/// # Errors
///
/// Returns [`SearchError::Parse`] if a profile selector is invalid.
pub fn extract_findings(
    profile: &EngineProfile,
    page_url: &str,
    html: &str,
    max_findings: usize,
) -> crate::Result<Vec<RawFinding>> {
    let document = Html::parse_document(html);
    let s = &profile.selectors;
    let result_sel = selector(s.result)?;
    let title_sel = selector(s.title)?;
    let link_sel = selector(s.link)?;
    let description_sel = selector(s.description)?;

    let mut findings = Vec::new();
    for element in document.select(&result_sel) {
        let Some(title_el) = element.select(&title_sel).next() else {
            continue;
        };
        let title = collapsed_text(title_el);
        if title.is_empty() {
            continue;
        }

        // The title element is often the link itself.
        let href = title_el
            .value()
            .attr("href")
            .or_else(|| element.select(&link_sel).find_map(|a| a.value().attr("href")));
        let Some(url) = href
            .and_then(|h| redirect::resolve_href(page_url, h))
            .and_then(profile.decode_link)
        else {
            continue;
        };

        let description = element
            .select(&description_sel)
            .map(collapsed_text)
            .find(|d| !d.is_empty())
            .unwrap_or_else(|| NO_DESCRIPTION.to_string());

        findings.push(RawFinding::new(title, url, description));
        if findings.len() >= max_findings {
            break;
        }
    }
    Ok(findings)
}
