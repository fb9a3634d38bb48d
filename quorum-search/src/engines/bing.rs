//! Bing: result links are wrapped in base64 click-tracking redirects.

use super::{redirect, EngineProfile, ResultSelectors};
use crate::types::{EngineId, Language, Region};

pub const PROFILE: EngineProfile = EngineProfile {
    engine: EngineId::Bing,
    base_url: "https://www.bing.com/search",
    query_param: "q",
    fixed_params: &[],
    locale_params,
    selectors: ResultSelectors {
        result: "li.b_algo",
        title: "h2",
        link: "h2 a, a.tilk",
        description: ".b_caption p, .b_lineclamp2, .b_algoSlug",
    },
    decode_link: redirect::bing,
};

fn locale_params(region: Region, language: Language) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(country) = region.country_code() {
        params.push(("cc", country.to_string()));
    }
    if let Some(lang) = language.explicit() {
        params.push(("setlang", lang.to_string()));
    }
    params
}
