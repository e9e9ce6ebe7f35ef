//! Outbound link discovery

use std::collections::HashSet;

use scraper::{Html, Selector};
use url::Url;

/// Prefixes of `href` values that never lead to a page
const SKIPPED_PREFIXES: &[&str] = &["#", "javascript:", "mailto:", "tel:"];

/// Links of a document resolved against `base`, fragments stripped, duplicates removed
pub fn extract_links(html: &str, base: &Url) -> Vec<Url> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let document = Html::parse_document(html);

    let mut seen = HashSet::new();
    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .filter(|href| {
            let lower = href.to_ascii_lowercase();
            !SKIPPED_PREFIXES.iter().any(|prefix| lower.starts_with(prefix))
        })
        .filter_map(|href| base.join(href).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .map(|mut url| {
            url.set_fragment(None);
            url
        })
        .filter(|url| seen.insert(url.to_string()))
        .collect()
}
