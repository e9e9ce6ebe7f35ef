//! Detection and repair of double-decoded UTF-8
//!
//! Mojibake appears when UTF-8 bytes are decoded as Windows-1252/Latin-1 and
//! the result is stored as UTF-8 again. The repair re-encodes the text with
//! Windows-1252 and decodes the bytes as UTF-8.

use encoding_rs::WINDOWS_1252;

/// Sequences produced by double-decoding common Turkish and Western letters
/// and typographic punctuation.
const SIGNATURES: &[&str] = &[
    "Ã§", "Ã‡", "Ã¶", "Ã–", "Ã¼", "Ãœ", "ÄŸ", "Äž", "Ä±", "Ä°", "ÅŸ", "Åž", "Ã©", "Ã¢",
    "Ã®", "Ã»", "â€™", "â€œ", "â€\u{9d}", "â€“", "â€”", "â€¦",
];

/// Letters whose count decides whether a repair is kept
const DIACRITICS: &str = "çğıöşüÇĞİÖŞÜâîûÂÎÛéÉ";

/// Whether the text contains any known mojibake sequence
pub fn has_signature(text: &str) -> bool {
    SIGNATURES.iter().any(|sig| text.contains(sig))
}

/// Number of diacritic letters in the text
pub fn diacritic_count(text: &str) -> usize {
    text.chars().filter(|c| DIACRITICS.contains(*c)).count()
}

/// Re-encode as Windows-1252 and decode as UTF-8.
///
/// Returns `None` when the text holds characters Windows-1252 cannot
/// represent or the resulting bytes are not UTF-8.
pub fn round_trip(text: &str) -> Option<String> {
    let (bytes, _, had_errors) = WINDOWS_1252.encode(text);
    if had_errors {
        return None;
    }
    String::from_utf8(bytes.into_owned()).ok()
}

/// Attempt a repair, accepting it only if the diacritic count does not drop.
///
/// Ties are accepted, so a partially wrong repair can slip through.
pub fn repair(text: &str) -> Option<String> {
    let repaired = round_trip(text)?;
    (diacritic_count(&repaired) >= diacritic_count(text)).then_some(repaired)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn garble(text: &str) -> String {
        let (decoded, _, _) = WINDOWS_1252.decode(text.as_bytes());
        decoded.into_owned()
    }

    #[test]
    fn test_signature_detection() {
        assert!(has_signature(&garble("Güzel")));
        assert!(has_signature(&garble("ağaç")));
        assert!(!has_signature("Güzel ağaç"));
        assert!(!has_signature("plain ascii"));
    }

    #[test]
    fn test_round_trip_restores_turkish() {
        let original = "İstanbul'da şöyle güzel bir ağaç var.";
        assert_eq!(round_trip(&garble(original)).as_deref(), Some(original));
    }

    #[test]
    fn test_repair_rejected_for_unencodable_text() {
        // 'ş' cannot be written in Windows-1252
        assert_eq!(repair("Ã¼ and ş"), None);
    }

    #[test]
    fn test_diacritic_count() {
        assert_eq!(diacritic_count("çalışma"), 3);
        assert_eq!(diacritic_count("abc"), 0);
    }
}
