//! Yandex: slow to answer and quick to serve SmartCaptcha.

use super::{redirect, EngineProfile, ResultSelectors};
use crate::types::{EngineId, Language, Region};

pub const PROFILE: EngineProfile = EngineProfile {
    engine: EngineId::Yandex,
    base_url: "https://yandex.com/search/",
    query_param: "text",
    fixed_params: &[],
    locale_params,
    selectors: ResultSelectors {
        result: ".serp-item, li.serp-item_card",
        title: ".OrganicTitle-LinkText, .organic__title, h2",
        link: ".OrganicTitle-Link, a.Link, a[href]",
        description: ".OrganicText, .organic__text, .TextContainer",
    },
    decode_link: redirect::passthrough,
};

fn locale_params(_region: Region, language: Language) -> Vec<(&'static str, String)> {
    language
        .explicit()
        .map(|lang| vec![("lang", lang.to_string())])
        .unwrap_or_default()
}
