//! Case-insensitive text helpers shared by every index
//!
//! All name comparisons in the graph fold ASCII letters only; other bytes
//! compare by value. A proper prefix sorts before the longer string.

use std::cmp::Ordering;

use crate::limits::COMPOUND_SEPARATOR;

/// Compare two strings ignoring ASCII case.
pub fn compare_ignore_case(a: &str, b: &str) -> Ordering {
    let a = a.bytes().map(|c| c.to_ascii_lowercase());
    let b = b.bytes().map(|c| c.to_ascii_lowercase());
    a.cmp(b)
}

/// Equality under [`compare_ignore_case`].
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Position-wise similarity of two names as a percentage.
///
/// Counts positions where both strings hold the same (case-folded) byte and
/// divides by the longer length, truncating toward zero. Two empty strings
/// score 0.
pub fn similarity_percent(a: &str, b: &str) -> u32 {
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 0;
    }
    let matched = a
        .bytes()
        .zip(b.bytes())
        .filter(|(x, y)| x.eq_ignore_ascii_case(y))
        .count();
    ((matched * 100) / longest) as u32
}

/// Name of the compound entity synthesized from a subject and an object.
pub fn compound_name(subject: &str, object: &str) -> String {
    let mut name = String::with_capacity(subject.len() + object.len() + 1);
    name.push_str(subject);
    name.push(COMPOUND_SEPARATOR);
    name.push_str(object);
    name
}

/// Strip compound context from a name for display.
///
/// `cat_mammal` renders as `mammal`; names without a separator are
/// returned as-is.
pub fn display_name(name: &str) -> &str {
    match name.rfind(COMPOUND_SEPARATOR) {
        Some(pos) => &name[pos + COMPOUND_SEPARATOR.len_utf8()..],
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_ignore_case() {
        assert_eq!(compare_ignore_case("Cat", "cat"), Ordering::Equal);
        assert_eq!(compare_ignore_case("apple", "Banana"), Ordering::Less);
        assert_eq!(compare_ignore_case("ZEBRA", "yak"), Ordering::Greater);
    }

    #[test]
    fn test_prefix_sorts_first() {
        assert_eq!(
            compare_ignore_case("maxheap insert", "maxheap insert node"),
            Ordering::Less
        );
        assert_eq!(compare_ignore_case("ab", "a"), Ordering::Greater);
        assert_eq!(compare_ignore_case("", ""), Ordering::Equal);
    }

    #[test]
    fn test_non_letters_compare_by_value() {
        // '_' (0x5f) sits between upper and lower case letters in ASCII,
        // but letters are folded to lower case first.
        assert_eq!(compare_ignore_case("a_b", "aab"), Ordering::Less);
        assert_eq!(compare_ignore_case("A_B", "a_b"), Ordering::Equal);
    }

    #[test]
    fn test_similarity_percent() {
        assert_eq!(similarity_percent("elephant", "elephant"), 100);
        assert_eq!(similarity_percent("Elephant", "ELEPHANT"), 100);
        // e l e p h match, then n/a and t/n differ, 5 of 8
        assert_eq!(similarity_percent("elephant", "elephnt"), 62);
        assert_eq!(similarity_percent("cat", "dog"), 0);
        assert_eq!(similarity_percent("", ""), 0);
        assert_eq!(similarity_percent("cat", ""), 0);
    }

    #[test]
    fn test_compound_name() {
        assert_eq!(compound_name("cat", "mammal"), "cat_mammal");
        assert_eq!(compound_name("new york", "city"), "new york_city");
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("cat_mammal"), "mammal");
        assert_eq!(display_name("a_b_c"), "c");
        assert_eq!(display_name("cat"), "cat");
        assert_eq!(display_name("trailing_"), "");
    }
}
