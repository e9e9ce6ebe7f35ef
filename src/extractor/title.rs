//! Title selection and site-name suffix trimming

use scraper::{Html, Selector};
use url::Url;

use super::collapse_inline;

/// Accepted title length range, in characters
const MIN_TITLE_CHARS: usize = 5;
const MAX_TITLE_CHARS: usize = 200;

/// Separators between a page title and a trailing site name
const SUFFIX_SEPARATORS: &[&str] = &[" - ", " | ", " :: ", " / ", " \u{2014} "];

/// Pick a title: `<title>`, first `<h1>`, meta titles, then a synthesized one
pub(super) fn extract_title(document: &Html, url: &Url) -> String {
    let candidates = [
        first_text(document, "title"),
        first_text(document, "h1"),
        first_attr(document, r#"meta[property="og:title"]"#, "content"),
        first_attr(document, r#"meta[name="twitter:title"]"#, "content"),
        first_attr(document, r#"meta[name="title"]"#, "content"),
    ];

    candidates
        .into_iter()
        .flatten()
        .map(|candidate| collapse_inline(&candidate))
        .find(|candidate| is_acceptable(candidate))
        .map(|title| trim_site_suffix(&title))
        .unwrap_or_else(|| synthesized_title(url))
}

fn is_acceptable(candidate: &str) -> bool {
    let len = candidate.chars().count();
    (MIN_TITLE_CHARS..=MAX_TITLE_CHARS).contains(&len)
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>())
}

fn first_attr(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .find_map(|element| element.value().attr(attr))
        .map(str::to_string)
}

/// Title used when no candidate qualifies
pub fn synthesized_title(url: &Url) -> String {
    format!("Imported from {}", url.host_str().unwrap_or("unknown host"))
}

/// Drop a trailing site name when the part before the separator dominates
pub fn trim_site_suffix(title: &str) -> String {
    let mut title = title.trim().to_string();
    for separator in SUFFIX_SEPARATORS {
        let Some(idx) = title.rfind(separator) else {
            continue;
        };
        let primary = title[..idx].trim();
        let suffix = title[idx + separator.len()..].trim();
        let primary_len = primary.chars().count();
        if primary_len >= MIN_TITLE_CHARS && primary_len > suffix.chars().count() {
            title = primary.to_string();
        }
    }
    title
}
