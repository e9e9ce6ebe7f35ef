//! # Encoding Normalizer Module
//!
//! Turns raw response bytes into valid Unicode text. The target sites are
//! largely Turkish and serve a mix of UTF-8, Windows-1254, ISO-8859-9 and
//! double-decoded UTF-8, frequently with wrong or missing declarations.
//!
//! The first matching step wins:
//!
//! 1. Valid UTF-8 without mojibake signatures is returned as-is
//! 2. Valid UTF-8 with mojibake is repaired if the repair keeps the diacritics
//! 3. A BOM, declared charset or `<meta charset>` picks a candidate encoding;
//!    with no declaration the encoding is guessed from the bytes
//! 4. Turkish code pages are retried and kept if Turkish letters appear
//! 5. Windows-1252 when it yields readable text
//! 6. Lossy UTF-8, or a byte whitelist when even that is mostly garbage
//!
//! [`normalize`] never fails; the returned [`DecodePath`] says how the text
//! was obtained.

mod mojibake;

use std::fmt;
use std::sync::OnceLock;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252, WINDOWS_1254};
use regex::bytes::Regex;
use tracing::{debug, info};

/// Code pages tried when nothing declares an encoding
const TARGET_CODE_PAGES: &[&str] = &["windows-1254", "iso-8859-9", "cp1254"];

/// Letters that identify Turkish text
const TARGET_LETTERS: &str = "çğıöşüÇĞİÖŞÜ";

/// Share of unusable characters above which lossy output is discarded
const GARBAGE_RATIO: f64 = 0.3;

/// Bytes where Windows-1252 and Windows-1254 disagree (`ÐÝÞðýþ` vs `ĞİŞğış`)
const TARGET_ONLY_BYTES: &[u8] = &[0xD0, 0xDD, 0xDE, 0xF0, 0xFD, 0xFE];

/// How many leading bytes are scanned for a `<meta charset>` declaration
const SNIFF_LIMIT: usize = 4096;

/// How the text was decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodePath {
    /// Clean UTF-8
    Utf8,
    /// UTF-8 with mojibake, repaired
    MojibakeRepaired,
    /// UTF-8 with mojibake, repair rejected
    MojibakeKept,
    /// Decoded with a detected or declared encoding
    Detected(&'static str),
    /// Decoded with a Turkish code page after letters were recognized
    TargetCodePage(&'static str),
    /// UTF-8 with invalid sequences dropped
    Lossy,
    /// Reduced to whitelisted bytes
    Whitelisted,
}

impl fmt::Display for DecodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodePath::Utf8 => write!(f, "utf-8"),
            DecodePath::MojibakeRepaired => write!(f, "mojibake-repaired"),
            DecodePath::MojibakeKept => write!(f, "mojibake-kept"),
            DecodePath::Detected(name) => write!(f, "detected:{}", name),
            DecodePath::TargetCodePage(name) => write!(f, "code-page:{}", name),
            DecodePath::Lossy => write!(f, "lossy"),
            DecodePath::Whitelisted => write!(f, "whitelisted"),
        }
    }
}

/// Decoded text together with the path that produced it
#[derive(Debug, Clone)]
pub struct Normalized {
    /// Valid Unicode text
    pub text: String,

    /// Decoding path taken
    pub path: DecodePath,
}

impl Normalized {
    /// Whether the bytes were clean UTF-8
    pub fn is_clean(&self) -> bool {
        self.path == DecodePath::Utf8
    }
}

/// Normalize raw bytes with no external charset hint
pub fn normalize(bytes: &[u8]) -> Normalized {
    normalize_with_hint(bytes, None)
}

/// Normalize raw bytes, using the HTTP charset (if any) during detection
pub fn normalize_with_hint(bytes: &[u8], declared: Option<&str>) -> Normalized {
    let normalized = decode(bytes, declared);
    if !normalized.is_clean() {
        info!(path = %normalized.path, bytes = bytes.len(), "Non-trivial decoding path used");
    }
    normalized
}

fn decode(bytes: &[u8], declared: Option<&str>) -> Normalized {
    let utf8_body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    if let Ok(text) = std::str::from_utf8(utf8_body) {
        if !mojibake::has_signature(text) {
            return Normalized {
                text: text.to_string(),
                path: DecodePath::Utf8,
            };
        }
        return match mojibake::repair(text) {
            Some(repaired) => Normalized {
                text: repaired,
                path: DecodePath::MojibakeRepaired,
            },
            None => Normalized {
                text: text.to_string(),
                path: DecodePath::MojibakeKept,
            },
        };
    }

    if let Some(normalized) = decode_detected(bytes, declared) {
        return normalized;
    }

    if let Some(normalized) = decode_guessed(bytes) {
        return normalized;
    }

    if let Some(normalized) = decode_target_code_page(bytes) {
        return normalized;
    }

    if let Some(normalized) = decode_western(bytes) {
        return normalized;
    }

    decode_lossy(bytes)
}

/// Encodings accepted from a BOM or a declaration
fn is_candidate(encoding: &'static Encoding) -> bool {
    encoding == UTF_8 || encoding == WINDOWS_1254 || encoding == WINDOWS_1252
}

fn meta_charset_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?\s*([a-z0-9_:.\-]+)"#)
            .expect("charset regex is valid")
    })
}

/// Charset named by a `<meta>` tag near the start of the document
fn sniff_meta_charset(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(SNIFF_LIMIT)];
    let captures = meta_charset_regex().captures(head)?;
    Encoding::for_label(captures.get(1)?.as_bytes())
}

fn decode_detected(bytes: &[u8], declared: Option<&str>) -> Option<Normalized> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        if !had_errors {
            return Some(Normalized {
                text: text.into_owned(),
                path: DecodePath::Detected(encoding.name()),
            });
        }
    }

    let declared = declared.and_then(|label| Encoding::for_label(label.trim().as_bytes()));
    let candidates = [declared, sniff_meta_charset(bytes)];

    for encoding in candidates.into_iter().flatten().filter(|e| is_candidate(e)) {
        match encoding.decode_without_bom_handling_and_without_replacement(bytes) {
            Some(text) => {
                return Some(Normalized {
                    text: text.into_owned(),
                    path: DecodePath::Detected(encoding.name()),
                });
            }
            None => debug!("Declared encoding {} does not fit the bytes", encoding.name()),
        }
    }

    None
}

/// Guess the encoding from byte statistics when nothing declares one
fn decode_guessed(bytes: &[u8]) -> Option<Normalized> {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let guess = detector.guess(None, true);

    if !is_candidate(guess) {
        debug!("Guessed encoding {} is not a candidate", guess.name());
        return None;
    }
    // Turkish letters under a Western guess are left to the code page retry
    if guess == WINDOWS_1252 && bytes.iter().any(|b| TARGET_ONLY_BYTES.contains(b)) {
        return None;
    }

    let text = guess.decode_without_bom_handling_and_without_replacement(bytes)?;
    if !is_readable(&text) {
        return None;
    }
    Some(Normalized {
        text: text.into_owned(),
        path: DecodePath::Detected(guess.name()),
    })
}

/// Western single-byte text that neither declaration nor guess identified
fn decode_western(bytes: &[u8]) -> Option<Normalized> {
    let text = WINDOWS_1252.decode_without_bom_handling_and_without_replacement(bytes)?;
    if !is_readable(&text) {
        return None;
    }
    Some(Normalized {
        text: text.into_owned(),
        path: DecodePath::Detected(WINDOWS_1252.name()),
    })
}

fn decode_target_code_page(bytes: &[u8]) -> Option<Normalized> {
    let mut tried: Vec<&'static Encoding> = Vec::new();
    for label in TARGET_CODE_PAGES {
        let Some(encoding) = Encoding::for_label(label.as_bytes()) else {
            continue;
        };
        if tried.contains(&encoding) {
            continue;
        }
        tried.push(encoding);

        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
            if text.chars().any(|c| TARGET_LETTERS.contains(c)) {
                return Some(Normalized {
                    text: text.into_owned(),
                    path: DecodePath::TargetCodePage(encoding.name()),
                });
            }
        }
    }
    None
}

fn is_unusable(c: char) -> bool {
    c == char::REPLACEMENT_CHARACTER || (c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
}

fn is_garbage(text: &str) -> bool {
    let total = text.chars().count().max(1);
    let unusable = text.chars().filter(|c| is_unusable(*c)).count();
    unusable as f64 / total as f64 > GARBAGE_RATIO
}

/// Letters and typographic marks a single-byte page plausibly contains
fn is_plausible_non_ascii(c: char) -> bool {
    c.is_alphabetic()
        || ('\u{2010}'..='\u{206F}').contains(&c)
        || matches!(c, '\u{A0}' | '€' | '™' | '«' | '»' | '°' | '·' | '©' | '®')
}

/// Not garbage, and at least half of the non-ASCII characters are plausible
fn is_readable(text: &str) -> bool {
    if is_garbage(text) {
        return false;
    }
    let (non_ascii, plausible) = text
        .chars()
        .filter(|c| !c.is_ascii())
        .fold((0usize, 0usize), |(n, p), c| {
            (n + 1, p + usize::from(is_plausible_non_ascii(c)))
        });
    plausible * 2 >= non_ascii
}

fn decode_lossy(bytes: &[u8]) -> Normalized {
    let lossy = String::from_utf8_lossy(bytes);

    if !is_garbage(&lossy) {
        return Normalized {
            text: lossy.chars().filter(|c| *c != char::REPLACEMENT_CHARACTER).collect(),
            path: DecodePath::Lossy,
        };
    }

    let text = bytes
        .iter()
        .filter(|b| matches!(**b, 0x20..=0x7E | 0xA0..=0xFF | b'\n' | b'\r' | b'\t'))
        .map(|b| char::from(*b))
        .collect();
    Normalized {
        text,
        path: DecodePath::Whitelisted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(encoding: &'static Encoding, text: &str) -> Vec<u8> {
        let (bytes, _, had_errors) = encoding.encode(text);
        assert!(!had_errors);
        bytes.into_owned()
    }

    #[test]
    fn test_clean_utf8_passthrough() {
        let result = normalize("Merhaba dünya, nasılsın?".as_bytes());
        assert_eq!(result.text, "Merhaba dünya, nasılsın?");
        assert_eq!(result.path, DecodePath::Utf8);
        assert!(result.is_clean());
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        let mut bytes = b"\xEF\xBB\xBF".to_vec();
        bytes.extend_from_slice("Çay".as_bytes());
        let result = normalize(&bytes);
        assert_eq!(result.text, "Çay");
        assert_eq!(result.path, DecodePath::Utf8);
    }

    #[test]
    fn test_mojibake_is_repaired() {
        let original = "Güzel bir şehir: İzmir'in çarşısı";
        let (garbled, _, _) = WINDOWS_1252.decode(original.as_bytes());
        let result = normalize(garbled.as_bytes());
        assert_eq!(result.path, DecodePath::MojibakeRepaired);
        assert_eq!(result.text, original);
    }

    #[test]
    fn test_unrepairable_mojibake_is_kept() {
        let text = "Ã¼ber and şimdi";
        let result = normalize(text.as_bytes());
        assert_eq!(result.path, DecodePath::MojibakeKept);
        assert_eq!(result.text, text);
    }

    #[test]
    fn test_declared_charset_is_used() {
        let bytes = encode(WINDOWS_1254, "Öğrenci işleri");
        let result = normalize_with_hint(&bytes, Some("iso-8859-9"));
        assert_eq!(result.text, "Öğrenci işleri");
        assert_eq!(result.path, DecodePath::Detected("windows-1254"));
    }

    #[test]
    fn test_meta_charset_is_sniffed() {
        let mut bytes = b"<html><head><meta charset=\"windows-1254\"></head><body>".to_vec();
        bytes.extend(encode(WINDOWS_1254, "Şubat ayı"));
        let result = normalize(&bytes);
        assert!(result.text.contains("Şubat ayı"));
        assert_eq!(result.path, DecodePath::Detected("windows-1254"));
    }

    #[test]
    fn test_undeclared_turkish_code_page() {
        let bytes = encode(WINDOWS_1254, "Kağıt ve kalem");
        let result = normalize(&bytes);
        assert_eq!(result.text, "Kağıt ve kalem");
        assert!(matches!(
            result.path,
            DecodePath::Detected("windows-1254") | DecodePath::TargetCodePage("windows-1254")
        ));
    }

    #[test]
    fn test_undeclared_western_text_keeps_accents() {
        let result = normalize(b"caf\xE9 au lait");
        assert_eq!(result.text, "café au lait");
        assert!(matches!(result.path, DecodePath::Detected(_)));

        let text = "Crème brûlée au café, très délicieux";
        let result = normalize(&encode(WINDOWS_1252, text));
        assert_eq!(result.text, text);
        assert!(matches!(result.path, DecodePath::Detected(_)));
    }

    #[test]
    fn test_symbol_noise_degrades_to_lossy() {
        let mut bytes = "Merhaba ".repeat(20).into_bytes();
        bytes.extend_from_slice(b"\xA4\xA6\xA8\xAC\xB1\xB6");
        let result = normalize(&bytes);
        assert_eq!(result.path, DecodePath::Lossy);
        assert!(result.text.starts_with("Merhaba Merhaba"));
    }

    #[test]
    fn test_binary_is_whitelisted() {
        let bytes: Vec<u8> = (0u8..=255).cycle().take(2048).map(|b| b & 0x9F).collect();
        let result = normalize(&bytes);
        assert_eq!(result.path, DecodePath::Whitelisted);
        assert!(result.text.chars().all(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t')));
    }

    #[test]
    fn test_empty_input() {
        let result = normalize(&[]);
        assert_eq!(result.text, "");
        assert_eq!(result.path, DecodePath::Utf8);
    }

    #[test]
    fn test_normalize_is_total() {
        // Deterministic pseudo-random byte strings of varying length
        let mut state: u64 = 0x2545_F491_4F6C_DD1D;
        for len in 0..300 {
            let bytes: Vec<u8> = (0..len)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 7;
                    state ^= state << 17;
                    (state >> 24) as u8
                })
                .collect();
            let result = normalize(&bytes);
            assert!(std::str::from_utf8(result.text.as_bytes()).is_ok());
        }
    }
}
