//! # Content Extraction Module
//!
//! Reduces a decoded HTML document to its main text, a title and page
//! metadata. Extraction never fails: when the main-content selectors find
//! nothing substantial the whole body is used, and when the DOM yields no text
//! at all the raw markup is stripped with regular expressions.
//!
//! ## Key Components
//!
//! - `extract`: title, content and metadata for one document
//! - `Extracted`: the extraction result with the method that produced it
//! - `PageMetadata`: canonical URL, host, description, keywords, author, language
//! - `extract_links`: outbound http(s) links for the crawl frontier

mod links;
mod metadata;
mod title;

pub use links::extract_links;
pub use metadata::PageMetadata;
pub use title::{synthesized_title, trim_site_suffix};

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, instrument};
use url::Url;

/// Elements that never carry page content
const NON_CONTENT_SELECTORS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "aside", "iframe", "noscript", "form", "svg",
    "template",
];

/// Boilerplate containers recognized by class or id
const BOILERPLATE_SELECTORS: &[&str] = &[
    r#"[class*="menu"]"#,
    r#"[id*="menu"]"#,
    r#"[class*="navigation"]"#,
    r#"[id*="navigation"]"#,
    r#"[class*="sidebar"]"#,
    r#"[id*="sidebar"]"#,
    r#"[class~="ads"]"#,
    r#"[id="ads"]"#,
    r#"[class*="advert"]"#,
    r#"[class*="cookie"]"#,
    r#"[id*="cookie"]"#,
];

/// Main-content containers, most specific first
const MAIN_CONTENT_SELECTORS: &[&str] = &[
    "main",
    "article",
    r#"[role="main"]"#,
    "#content",
    "#main-content",
    ".main-content",
    ".post-content",
    ".entry-content",
    ".article-body",
    ".content",
    "#main",
];

/// Minimum text a main-content container must hold to be preferred over the body
const MIN_MAIN_CONTENT_CHARS: usize = 100;

/// Elements after which a line break is inserted
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "br", "li", "tr", "td", "th", "h1", "h2", "h3", "h4", "h5", "h6", "section",
    "blockquote", "pre", "dd", "dt", "table", "ul", "ol",
];

/// Which path produced the content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionMethod {
    /// A main-content selector matched
    MainContent(&'static str),
    /// Whole body text
    Body,
    /// Regex tag stripping of the raw markup
    RegexFallback,
}

impl ExtractionMethod {
    /// Whether a fallback path was used
    pub fn is_fallback(&self) -> bool {
        !matches!(self, ExtractionMethod::MainContent(_))
    }
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionMethod::MainContent(selector) => write!(f, "main:{}", selector),
            ExtractionMethod::Body => write!(f, "body"),
            ExtractionMethod::RegexFallback => write!(f, "regex"),
        }
    }
}

/// Result of extracting a document
#[derive(Debug, Clone)]
pub struct Extracted {
    /// Page title
    pub title: String,

    /// Whitespace-collapsed, entity-decoded text
    pub content: String,

    /// Page metadata
    pub metadata: PageMetadata,

    /// Path that produced the content
    pub method: ExtractionMethod,
}

/// Extract title, main text and metadata from a document
#[instrument(skip(html), fields(url = %url, bytes = html.len()))]
pub fn extract(html: &str, url: &Url) -> Extracted {
    let mut document = Html::parse_document(html);

    let title = title::extract_title(&document, url);
    let metadata = metadata::extract_metadata(&document, url);

    strip_boilerplate(&mut document);

    let (content, method) = match main_content(&document) {
        Some(found) => found,
        None => {
            let body = body_text(&document);
            if body.is_empty() {
                (regex_strip(html), ExtractionMethod::RegexFallback)
            } else {
                (body, ExtractionMethod::Body)
            }
        }
    };

    debug!(%method, chars = content.chars().count(), "Extracted content");

    Extracted {
        title,
        content,
        metadata,
        method,
    }
}

/// Collapse every whitespace run into a single space
pub(crate) fn collapse_inline(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapse whitespace within lines and drop empty lines
pub fn collapse_whitespace(text: &str) -> String {
    text.lines()
        .map(collapse_inline)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_protected(element: &ElementRef) -> bool {
    matches!(element.value().name(), "html" | "body" | "main" | "article")
}

/// Detach non-content and boilerplate elements from the tree
fn strip_boilerplate(document: &mut Html) {
    let mut doomed = Vec::new();
    for selector_str in NON_CONTENT_SELECTORS.iter().chain(BOILERPLATE_SELECTORS) {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        doomed.extend(
            document
                .select(&selector)
                .filter(|element| !is_protected(element))
                .map(|element| element.id()),
        );
    }

    for id in doomed {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// Text of an element with line breaks at block boundaries
fn element_text(element: ElementRef) -> String {
    let mut text = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(t) => text.push_str(t),
            Node::Element(e) if BLOCK_ELEMENTS.contains(&e.name()) => text.push('\n'),
            _ => {}
        }
    }
    collapse_whitespace(&text)
}

fn main_content(document: &Html) -> Option<(String, ExtractionMethod)> {
    for selector_str in MAIN_CONTENT_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        if let Some(element) = document.select(&selector).next() {
            let text = element_text(element);
            if text.chars().count() >= MIN_MAIN_CONTENT_CHARS {
                return Some((text, ExtractionMethod::MainContent(selector_str)));
            }
        }
    }
    None
}

fn body_text(document: &Html) -> String {
    Selector::parse("body")
        .ok()
        .and_then(|selector| document.select(&selector).next())
        .map(element_text)
        .unwrap_or_default()
}

fn strip_regexes() -> &'static [Regex; 3] {
    static RE: OnceLock<[Regex; 3]> = OnceLock::new();
    RE.get_or_init(|| {
        [
            Regex::new(r"(?is)<(script|style|noscript)\b[^>]*>.*?</(script|style|noscript)\s*>")
                .expect("block regex is valid"),
            Regex::new(r"(?s)<!--.*?-->").expect("comment regex is valid"),
            Regex::new(r"(?s)<[^>]*>").expect("tag regex is valid"),
        ]
    })
}

/// Strip markup with regular expressions and decode entities
fn regex_strip(html: &str) -> String {
    let [blocks, comments, tags] = strip_regexes();
    let without_blocks = blocks.replace_all(html, " ");
    let without_comments = comments.replace_all(&without_blocks, " ");
    let stripped = tags.replace_all(&without_comments, "\n");

    // A fragment holding only text; parsing it decodes the entities
    let decoded: String = Html::parse_fragment(&stripped)
        .root_element()
        .text()
        .collect();
    collapse_whitespace(&decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://www.example.edu.tr/akademik/takvim").unwrap()
    }

    const LONG_PARAGRAPH: &str = "Güz dönemi dersleri Eylül ayının son haftasında başlar ve Ocak ayının ikinci haftasında sona erer. Ara sınavlar Kasım ayında yapılır.";

    #[test]
    fn test_main_content_preferred() {
        let html = format!(
            r#"<html><head><title>Akademik Takvim - Example Üniversitesi</title></head>
            <body>
              <header><h1>Example Üniversitesi</h1></header>
              <nav><a href="/">Ana sayfa</a></nav>
              <div class="cookie-banner">Çerezleri kabul edin</div>
              <main><h2>Akademik Takvim</h2><p>{LONG_PARAGRAPH}</p><script>var x = 1;</script></main>
              <footer>© 2024</footer>
            </body></html>"#
        );
        let extracted = extract(&html, &url());

        assert_eq!(extracted.method, ExtractionMethod::MainContent("main"));
        assert_eq!(extracted.content, format!("Akademik Takvim\n{LONG_PARAGRAPH}"));
        assert!(!extracted.content.contains("Ana sayfa"));
        assert!(!extracted.content.contains("var x"));
        assert_eq!(extracted.title, "Akademik Takvim - Example Üniversitesi");
        assert_eq!(extracted.metadata.host, "www.example.edu.tr");
    }

    #[test]
    fn test_body_fallback_strips_boilerplate() {
        let html = format!(
            r#"<html><body>
              <div id="sidebar-left">Links everywhere</div>
              <div class="menu top">Menu item</div>
              <div class="text"><p>{LONG_PARAGRAPH}</p><p>Second &amp; final   paragraph.</p></div>
              <aside>Related posts</aside>
            </body></html>"#
        );
        let extracted = extract(&html, &url());

        assert_eq!(extracted.method, ExtractionMethod::Body);
        assert!(extracted.method.is_fallback());
        assert_eq!(
            extracted.content,
            format!("{LONG_PARAGRAPH}\nSecond & final paragraph.")
        );
    }

    #[test]
    fn test_short_main_content_falls_back_to_body() {
        let html = format!(
            r#"<html><body><article>Tiny</article><div><p>{LONG_PARAGRAPH}</p></div></body></html>"#
        );
        let extracted = extract(&html, &url());
        assert_eq!(extracted.method, ExtractionMethod::Body);
        assert!(extracted.content.contains("Tiny"));
        assert!(extracted.content.contains(LONG_PARAGRAPH));
    }

    #[test]
    fn test_regex_fallback_when_dom_has_no_text() {
        // Everything visible sits in a <nav>, which the DOM pass removes
        let html = "<html><body><nav>Only navigation &amp; nothing else</nav></body></html>";
        let extracted = extract(html, &url());
        assert_eq!(extracted.method, ExtractionMethod::RegexFallback);
        assert_eq!(extracted.content, "Only navigation & nothing else");
    }

    #[test]
    fn test_garbage_input_never_panics() {
        for input in ["", "<<<>>>", "<html><body", "\u{0}\u{1}binary", "<div><p>unclosed"] {
            let extracted = extract(input, &url());
            assert!(!extracted.title.is_empty());
        }
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \t b \n\n\n  c  \n"), "a b\nc");
        assert_eq!(collapse_inline(" a \n b "), "a b");
    }
}
