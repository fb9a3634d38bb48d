//! Randomised browsing identities.
//!
//! Each session presents a User-Agent, an `Accept-Language` header and a
//! viewport drawn from pools keyed by the request's region and language, so
//! that consecutive sessions do not look identical to the engines.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::types::{Language, Region};

/// Browser User-Agent strings used when nothing more specific applies.
const GLOBAL_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.3 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.2903.51",
];

const US_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.2903.51",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
];

const EUROPE_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.3 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
];

const JAPAN_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.3 Safari/605.1.15",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
];

const CHINA_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; WOW64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/86.0.4240.198 Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 16_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15E148",
];

/// Browser window size reported by, and used to open, a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// A desktop-sized viewport with a little random jitter.
    pub fn randomized() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            width: 1280 + rng.gen_range(0..100),
            height: 800 + rng.gen_range(0..100),
        }
    }
}

/// The identity a session presents to an engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityProfile {
    pub user_agent: String,
    pub accept_language: String,
    pub viewport: Viewport,
}

impl IdentityProfile {
    /// Draw a fresh identity for the given locale hints.
    ///
    /// A configured `user_agent` replaces the pool lookup.
    pub fn randomized(region: Region, language: Language, user_agent: Option<&str>) -> Self {
        let user_agent = match user_agent {
            Some(custom) => custom.to_string(),
            None => random_user_agent(region, language).to_string(),
        };
        Self {
            user_agent,
            accept_language: accept_language(language),
            viewport: Viewport::randomized(),
        }
    }
}

/// The pool to draw from: language-specific first, then regional, then global.
fn agent_pool(region: Region, language: Language) -> &'static [&'static str] {
    match language {
        Language::Ja => return JAPAN_AGENTS,
        Language::Zh => return CHINA_AGENTS,
        _ => {}
    }
    match region {
        Region::Us | Region::Ca => US_AGENTS,
        Region::Fr | Region::Uk | Region::De | Region::Es | Region::It => EUROPE_AGENTS,
        Region::Jp => JAPAN_AGENTS,
        Region::Cn => CHINA_AGENTS,
        Region::Global | Region::Br => GLOBAL_AGENTS,
    }
}

/// Select a random User-Agent string for the locale hints.
pub fn random_user_agent(region: Region, language: Language) -> &'static str {
    let pool = agent_pool(region, language);
    let mut rng = rand::thread_rng();
    pool.choose(&mut rng)
        .copied()
        // SAFETY: every pool is a non-empty const array, choose only returns None on empty slices
        .unwrap_or(GLOBAL_AGENTS[0])
}

/// `Accept-Language` header value for a language hint.
pub fn accept_language(language: Language) -> String {
    match language.explicit() {
        Some(code) => format!("{code},en-US;q=0.9,en;q=0.8"),
        None => "en-US,en;q=0.9".to_string(),
    }
}
