//! Browsing sessions used by source adapters.
//!
//! A [`Session`] is an isolated browsing context: its own cookie jar, its
//! own randomised identity, and a record of the page it is currently on.
//! Sessions are handed out by the [`SessionManager`] and owned by exactly
//! one engine unit for the duration of one adapter invocation.
//!
//! Every navigation runs challenge detection on the page it lands on, so
//! adapters see a challenge as an [`AdapterError::Challenge`] from
//! [`Session::navigate`] and never have to look for one themselves.

pub mod identity;
pub mod manager;
pub mod pacing;

pub use identity::{IdentityProfile, Viewport};
pub use manager::{SessionGuard, SessionManager};
pub use pacing::PacingPolicy;

use scraper::{Html, Selector};
use std::time::Duration;

use crate::challenge::detect::detect_challenge;
use crate::error::{AdapterError, SearchError};
use crate::types::EngineId;

/// The page a session is currently showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    /// URL that was requested.
    pub url: String,
    /// URL after redirects.
    pub final_url: String,
    /// HTTP status code.
    pub status: u16,
    /// Contents of `<title>`, trimmed. Empty when absent.
    pub title: String,
    /// Raw HTML body.
    pub html: String,
}

impl PageSnapshot {
    /// Build a snapshot from a response body, extracting its title.
    pub fn new(url: impl Into<String>, final_url: impl Into<String>, status: u16, html: String) -> Self {
        let title = extract_title(&html);
        Self {
            url: url.into(),
            final_url: final_url.into(),
            status,
            title,
            html,
        }
    }

    /// Parse the body into a queryable document.
    pub fn document(&self) -> Html {
        Html::parse_document(&self.html)
    }

    /// Visible text of `<body>`, whitespace-collapsed.
    pub fn body_text(&self) -> String {
        let document = self.document();
        let Ok(body_sel) = Selector::parse("body") else {
            return String::new();
        };
        let raw: String = document
            .select(&body_sel)
            .next()
            .map(|body| body.text().collect::<Vec<_>>().join(" "))
            .unwrap_or_default();
        raw.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

fn extract_title(html: &str) -> String {
    let document = Html::parse_document(html);
    let Ok(title_sel) = Selector::parse("title") else {
        return String::new();
    };
    document
        .select(&title_sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// An isolated browsing context bound to one engine.
#[derive(Debug)]
pub struct Session {
    id: u64,
    engine: EngineId,
    identity: IdentityProfile,
    pacing: PacingPolicy,
    client: reqwest::Client,
    current: Option<PageSnapshot>,
    navigations: usize,
}

impl Session {
    /// Open a session with its own cookie store and identity.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Session`] if the HTTP client cannot be built.
    pub(crate) fn open(
        id: u64,
        engine: EngineId,
        identity: IdentityProfile,
        pacing: PacingPolicy,
        timeout: Duration,
    ) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .user_agent(identity.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| SearchError::Session(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            id,
            engine,
            identity,
            pacing,
            client,
            current: None,
            navigations: 0,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn engine(&self) -> EngineId {
        self.engine
    }

    pub fn identity(&self) -> &IdentityProfile {
        &self.identity
    }

    pub fn pacing(&self) -> &PacingPolicy {
        &self.pacing
    }

    /// The page the session is on, if it has navigated at all.
    pub fn current_page(&self) -> Option<&PageSnapshot> {
        self.current.as_ref()
    }

    /// Navigate to `url` and run challenge detection on the result.
    ///
    /// Every navigation after the first is preceded by a pacing pause.
    ///
    /// # Errors
    ///
    /// - [`AdapterError::Challenge`] if the landed page is a challenge. The
    ///   page is still recorded as current so the mediator can inspect it.
    /// - [`AdapterError::Navigation`] on transport errors or non-success
    ///   HTTP status.
    pub async fn navigate(&mut self, url: &str) -> Result<&PageSnapshot, AdapterError> {
        if self.navigations > 0 {
            pacing::pause(self.pacing.navigation_delay()).await;
        }
        self.load(url).await?;

        let Some(page) = self.current.as_ref() else {
            return Err(AdapterError::Navigation("no page recorded".into()));
        };
        if let Some(signature) = detect_challenge(self.engine, page) {
            return Err(AdapterError::Challenge { signature });
        }
        if !(200..300).contains(&page.status) {
            return Err(AdapterError::Navigation(format!(
                "{} returned HTTP {}",
                self.engine.display_name(),
                page.status
            )));
        }
        Ok(page)
    }

    /// Load the current URL again without running detection.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Navigation`] if nothing was loaded before or
    /// the request fails.
    pub async fn reload(&mut self) -> Result<&PageSnapshot, AdapterError> {
        let url = self
            .current
            .as_ref()
            .map(|page| page.url.clone())
            .ok_or_else(|| AdapterError::Navigation("nothing to reload".into()))?;
        self.load(&url).await?;
        self.current
            .as_ref()
            .ok_or_else(|| AdapterError::Navigation("no page recorded".into()))
    }

    async fn load(&mut self, url: &str) -> Result<(), AdapterError> {
        let name = self.engine.display_name();
        tracing::trace!(engine = %self.engine, session = self.id, url, "navigating");

        let response = self
            .client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml")
            .header("Accept-Language", self.identity.accept_language.as_str())
            .send()
            .await
            .map_err(|e| AdapterError::Navigation(format!("{name} request failed: {e}")))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let html = response
            .text()
            .await
            .map_err(|e| AdapterError::Navigation(format!("{name} response read failed: {e}")))?;

        tracing::trace!(engine = %self.engine, status, bytes = html.len(), "page received");

        self.navigations += 1;
        self.current = Some(PageSnapshot::new(url, final_url, status, html));
        Ok(())
    }
}
