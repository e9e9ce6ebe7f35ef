//! Page metadata: canonical URL, description, keywords, author, language

use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

use super::collapse_inline;

/// Metadata extracted from a page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageMetadata {
    /// Canonical URL declared by the page, resolved against the page URL
    pub canonical_url: Option<String>,

    /// When the extraction ran
    pub extracted_at: DateTime<Utc>,

    /// Host of the page
    pub host: String,

    /// Meta description
    pub description: Option<String>,

    /// Meta keywords
    pub keywords: Option<String>,

    /// Meta author
    pub author: Option<String>,

    /// Declared `<html lang>` value
    pub language: Option<String>,
}

impl PageMetadata {
    /// Two-letter language code, if one was declared
    pub fn language_code(&self) -> Option<String> {
        let lang = self.language.as_deref()?;
        let code: String = lang
            .split(['-', '_'])
            .next()?
            .trim()
            .to_ascii_lowercase();
        (code.len() >= 2 && code.chars().all(|c| c.is_ascii_alphabetic())).then_some(code)
    }
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .find_map(|element| element.value().attr("content"))
        .map(collapse_inline)
        .filter(|value| !value.is_empty())
}

pub(super) fn extract_metadata(document: &Html, url: &Url) -> PageMetadata {
    let canonical_url = Selector::parse(r#"link[rel="canonical"]"#)
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .find_map(|element| element.value().attr("href"))
                .and_then(|href| url.join(href.trim()).ok())
        })
        .map(|canonical| canonical.to_string());

    let language = Selector::parse("html[lang]").ok().and_then(|selector| {
        document
            .select(&selector)
            .find_map(|element| element.value().attr("lang"))
            .map(|lang| lang.trim().to_string())
            .filter(|lang| !lang.is_empty())
    });

    PageMetadata {
        canonical_url,
        extracted_at: Utc::now(),
        host: url.host_str().unwrap_or_default().to_string(),
        description: meta_content(document, r#"meta[name="description"]"#)
            .or_else(|| meta_content(document, r#"meta[property="og:description"]"#)),
        keywords: meta_content(document, r#"meta[name="keywords"]"#),
        author: meta_content(document, r#"meta[name="author"]"#),
        language,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_metadata() {
        let html = r#"<html lang="tr-TR"><head>
            <link rel="canonical" href="/duyurular/">
            <meta name="description" content="Fakülte  duyuruları">
            <meta name="keywords" content="duyuru, fakülte">
            <meta name="author" content="Öğrenci İşleri">
            </head><body></body></html>"#;
        let url = Url::parse("https://ogr.example.edu.tr/duyurular/index.php?page=2").unwrap();
        let metadata = extract_metadata(&Html::parse_document(html), &url);

        assert_eq!(metadata.canonical_url.as_deref(), Some("https://ogr.example.edu.tr/duyurular/"));
        assert_eq!(metadata.host, "ogr.example.edu.tr");
        assert_eq!(metadata.description.as_deref(), Some("Fakülte duyuruları"));
        assert_eq!(metadata.keywords.as_deref(), Some("duyuru, fakülte"));
        assert_eq!(metadata.author.as_deref(), Some("Öğrenci İşleri"));
        assert_eq!(metadata.language.as_deref(), Some("tr-TR"));
        assert_eq!(metadata.language_code().as_deref(), Some("tr"));
    }

    #[test]
    fn test_missing_metadata() {
        let url = Url::parse("https://example.com/").unwrap();
        let metadata = extract_metadata(&Html::parse_document("<p>nothing</p>"), &url);
        assert!(metadata.canonical_url.is_none());
        assert!(metadata.description.is_none());
        assert!(metadata.language.is_none());
        assert!(metadata.language_code().is_none());
    }
}
