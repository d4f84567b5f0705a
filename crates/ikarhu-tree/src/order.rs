use std::cmp::Ordering;

/// Returns `true` if `key` looks like a sequence index (non-empty, ASCII digits only).
pub fn is_index(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit())
}

/// Compare two keys for patch ordering.
///
/// Index-like keys come first and compare by numeric value; the comparison is
/// by length, then lexicographic, so arbitrarily long digit strings never
/// overflow. All other keys follow in plain lexicographic order.
///
/// # Examples
///
/// ```
/// use std::cmp::Ordering;
/// use ikarhu_tree::order::key_cmp;
///
/// assert_eq!(key_cmp("2", "10"), Ordering::Less);
/// assert_eq!(key_cmp("10", "a"), Ordering::Less);
/// assert_eq!(key_cmp("b", "a"), Ordering::Greater);
/// ```
pub fn key_cmp(a: &str, b: &str) -> Ordering {
    match (is_index(a), is_index(b)) {
        (true, true) => {
            let (a, b) = (a.trim_start_matches('0'), b.trim_start_matches('0'));
            a.len().cmp(&b.len()).then_with(|| a.cmp(b))
        }
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.cmp(b),
    }
}

/// Orders keys for applying a change tree: [`key_cmp`] descending.
///
/// Higher indices come before lower ones, so splicing an element out of a
/// sequence never shifts a key that is still waiting to be processed.
pub fn patch_order<'a, I>(keys: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut keys: Vec<String> = keys.into_iter().cloned().collect();
    keys.sort_by(|a, b| key_cmp(b, a));
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices() {
        assert_eq!(key_cmp("1", "2"), Ordering::Less);
        assert_eq!(key_cmp("9", "10"), Ordering::Less);
        assert_eq!(key_cmp("100", "99"), Ordering::Greater);
        assert_eq!(key_cmp("7", "7"), Ordering::Equal);
    }

    #[test]
    fn test_mixed() {
        assert_eq!(key_cmp("0", "a"), Ordering::Less);
        assert_eq!(key_cmp("a", "0"), Ordering::Greater);
        assert_eq!(key_cmp("", "a"), Ordering::Less);
        assert_eq!(key_cmp("-1", "1"), Ordering::Greater);
    }

    #[test]
    fn test_patch_order() {
        let keys: Vec<String> = ["1", "b", "10", "a", "2"].iter().map(|s| s.to_string()).collect();
        assert_eq!(patch_order(&keys), vec!["b", "a", "10", "2", "1"]);
    }

    #[test]
    fn test_is_index() {
        assert!(is_index("0"));
        assert!(is_index("042"));
        assert!(!is_index(""));
        assert!(!is_index("-1"));
        assert!(!is_index("1.5"));
    }
}
