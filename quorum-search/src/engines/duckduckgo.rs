//! DuckDuckGo: the HTML-only endpoint, the most tolerant of automation.

use super::{redirect, EngineProfile, ResultSelectors};
use crate::types::{EngineId, Language, Region};

pub const PROFILE: EngineProfile = EngineProfile {
    engine: EngineId::DuckDuckGo,
    base_url: "https://html.duckduckgo.com/html/",
    query_param: "q",
    fixed_params: &[],
    locale_params,
    selectors: ResultSelectors {
        result: ".result:not(.result--ad)",
        title: ".result__a",
        link: ".result__url, .result__a",
        description: ".result__snippet",
    },
    decode_link: redirect::duckduckgo,
};

/// `kl` region code, e.g. `fr-fr`, `uk-en`, `wt-wt` for no region.
fn locale_params(region: Region, language: Language) -> Vec<(&'static str, String)> {
    let Some(country) = region.country_code() else {
        return Vec::new();
    };
    let country = match region {
        Region::Uk => "uk".to_string(),
        _ => country.to_ascii_lowercase(),
    };
    let lang = language.explicit().unwrap_or(match region {
        Region::Us | Region::Uk | Region::Ca => "en",
        Region::Fr => "fr",
        Region::De => "de",
        Region::Es => "es",
        Region::It => "it",
        Region::Jp => "jp",
        Region::Br => "pt",
        Region::Cn => "zh",
        Region::Global => "en",
    });
    vec![("kl", format!("{country}-{lang}"))]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::html::extract_findings;

    const MOCK_DDG_HTML: &str = r#"<!DOCTYPE html>
<html>
<body>
<div class="result results_links results_links_deep web-result">
    <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2F&amp;rut=abc123">
        Rust Programming Language
    </a>
    <div class="result__snippet">
        A language empowering everyone to build reliable and efficient software.
    </div>
</div>
<div class="result results_links results_links_deep web-result">
    <a class="result__a" href="https://doc.rust-lang.org/book/">
        The Rust Programming Language Book
    </a>
    <div class="result__snippet">
        An introductory book about Rust.
    </div>
</div>
<div class="result result--ad">
    <a class="result__a" href="https://ads.example.com/">Sponsored</a>
</div>
</body>
</html>"#;

    #[test]
    fn parse_mock_html_returns_results() {
        let findings = extract_findings(&PROFILE, "https://html.duckduckgo.com/html/?q=rust", MOCK_DDG_HTML, 10)
            .expect("should parse");
        assert_eq!(findings.len(), 2, "ads are excluded");
        assert_eq!(findings[0].title, "Rust Programming Language");
        assert_eq!(findings[0].url, "https://www.rust-lang.org/");
        assert!(findings[0].description.contains("reliable and efficient"));
        assert_eq!(findings[1].url, "https://doc.rust-lang.org/book/");
    }

    #[test]
    fn parse_respects_max_results() {
        let findings = extract_findings(&PROFILE, "https://html.duckduckgo.com/html/", MOCK_DDG_HTML, 1)
            .expect("should parse");
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn kl_combines_region_and_language() {
        assert_eq!(
            locale_params(Region::Fr, Language::Auto),
            vec![("kl", "fr-fr".to_string())]
        );
        assert_eq!(
            locale_params(Region::Uk, Language::Auto),
            vec![("kl", "uk-en".to_string())]
        );
        assert!(locale_params(Region::Global, Language::Fr).is_empty());
    }
}
