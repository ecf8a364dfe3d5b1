//! Byte-budgeted text helpers.

/// Suffix appended to truncated free-text fields.
pub const ELLIPSIS: &str = "...";

/// Truncates `s` to at most `max_len` bytes, appending `suffix` when anything
/// was cut.
///
/// The suffix counts toward the budget whenever the budget can hold it, so
/// truncating an already truncated string again is a no-op. The cut point walks
/// backward over UTF-8 continuation bytes and never splits a code point.
pub fn truncate(s: &str, max_len: usize, suffix: &str) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let bytes = s.as_bytes();
    let mut cut = max_len.saturating_sub(suffix.len());
    while cut > 0 && bytes[cut] & 0b1100_0000 == 0b1000_0000 {
        cut -= 1;
    }
    let mut out = String::with_capacity(cut + suffix.len());
    out.push_str(&s[..cut]);
    out.push_str(suffix);
    out
}

/// [`truncate`] with the default `"..."` suffix.
pub fn truncate_field(s: &str, max_len: usize) -> String {
    truncate(s, max_len, ELLIPSIS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case("hello", 10, "...", "hello" ; "shorter than max")]
    #[test_case("hello", 5, "...", "hello" ; "exact length")]
    #[test_case("hello world", 8, "...", "hello..." ; "truncate ascii")]
    #[test_case("", 10, "...", "" ; "empty input")]
    #[test_case("hello", 0, "...", "..." ; "max zero")]
    #[test_case("ab\u{e9}cd", 4, "!", "ab!" ; "two byte sequence not split")]
    #[test_case("a\u{20ac}b", 3, "!", "a!" ; "three byte sequence not split")]
    #[test_case("a\u{1F600}b", 3, "!", "a!" ; "four byte sequence not split")]
    #[test_case("a\u{e9}b", 2, "!", "a!" ; "clean boundary")]
    fn test_truncate(input: &str, max: usize, suffix: &str, want: &str) {
        assert_eq!(truncate(input, max, suffix), want);
    }

    #[test]
    fn test_emoji_bytes_cut_cleanly() {
        let input = String::from_utf8(b"a\xf0\x9f\x98\x80b".to_vec()).unwrap();
        assert_eq!(truncate(&input, 3, "!"), "a!");
    }

    #[test]
    fn test_truncate_field_uses_ellipsis() {
        assert_eq!(truncate_field(&"x".repeat(20), 10), "xxxxxxx...");
    }

    proptest! {
        #[test]
        fn truncation_is_idempotent(s in "\\PC{0,64}", max in 0usize..80) {
            let once = truncate(&s, max, "...");
            let twice = truncate(&once, max, "...");
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn truncation_respects_budget(s in "\\PC{0,64}", max in 3usize..80) {
            let out = truncate(&s, max, "...");
            prop_assert!(out.len() <= max);
        }
    }
}
