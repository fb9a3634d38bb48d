//! Baidu: results link through `/link?url=` redirects.

use super::{redirect, EngineProfile, ResultSelectors};
use crate::types::{EngineId, Language, Region};

pub const PROFILE: EngineProfile = EngineProfile {
    engine: EngineId::Baidu,
    base_url: "https://www.baidu.com/s",
    query_param: "wd",
    fixed_params: &[("ie", "utf-8")],
    locale_params,
    selectors: ResultSelectors {
        result: ".c-container, .result",
        title: "h3",
        link: "h3 a, h3.c-title a, a[href]",
        description: ".c-abstract, .content-right_8Zs40, .c-span-last",
    },
    decode_link: redirect::baidu,
};

/// Baidu only distinguishes Chinese from everything else.
fn locale_params(_region: Region, language: Language) -> Vec<(&'static str, String)> {
    match language {
        Language::Auto | Language::Zh => Vec::new(),
        _ => vec![("rqlang", "en".to_string())],
    }
}
