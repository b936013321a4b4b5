//! Cleanup applied to translator output before it is written back.
//!
//! Translation services trim surrounding whitespace and may return
//! decomposed Unicode. Runs inside a paragraph rely on their leading and
//! trailing spaces to separate words, so the source padding is restored
//! around the translated core.

use unicode_normalization::UnicodeNormalization;

/// NFC-normalize `translated` and give it the same leading/trailing
/// whitespace as `source`.
pub fn restore_padding(source: &str, translated: &str) -> String {
    if source.trim().is_empty() {
        return source.to_string();
    }
    let leading = &source[..source.len() - source.trim_start().len()];
    let trailing = &source[source.trim_end().len()..];
    let core: String = translated.trim().nfc().collect();

    let mut result = String::with_capacity(leading.len() + core.len() + trailing.len());
    result.push_str(leading);
    result.push_str(&core);
    result.push_str(trailing);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restore_padding() {
        assert_eq!(restore_padding("猫", "cat"), "cat");
        assert_eq!(restore_padding(" 猫 ", "cat"), " cat ");
        assert_eq!(restore_padding("猫\n", "  cat  "), "cat\n");
        assert_eq!(restore_padding("\t猫", "cat "), "\tcat");
    }

    #[test]
    fn test_nfc() {
        // "e" + combining acute accent becomes a single code point.
        assert_eq!(restore_padding("x", "cafe\u{301}"), "caf\u{e9}");
    }
}
