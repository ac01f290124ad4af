//! Wildcard byte pattern search.
//!
//! Patterns are slices of `Option<u8>` where `None` matches any byte.

/// Find the first occurrence of a pattern in a buffer.
///
/// Returns the byte offset where the pattern starts, or None if not found.
///
/// # Example
///
/// ```
/// use chatbridge_core::process::pattern::find_first;
///
/// let buffer = [1, 2, 3, 1, 9, 3];
/// assert_eq!(find_first(&buffer, &[Some(9), None]), Some(4));
/// ```
pub fn find_first(buffer: &[u8], pattern: &[Option<u8>]) -> Option<usize> {
    if pattern.is_empty() || pattern.len() > buffer.len() {
        return None;
    }

    buffer
        .windows(pattern.len())
        .position(|window| matches_at(window, pattern))
}

/// Find all occurrences of a pattern in a buffer.
pub fn find_all(buffer: &[u8], pattern: &[Option<u8>]) -> Vec<usize> {
    if pattern.is_empty() || pattern.len() > buffer.len() {
        return Vec::new();
    }

    buffer
        .windows(pattern.len())
        .enumerate()
        .filter_map(|(i, window)| matches_at(window, pattern).then_some(i))
        .collect()
}

fn matches_at(window: &[u8], pattern: &[Option<u8>]) -> bool {
    window
        .iter()
        .zip(pattern)
        .all(|(byte, expected)| expected.is_none_or(|value| value == *byte))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_first_exact() {
        let buffer = [1, 2, 3, 4, 5, 1, 2, 3];
        assert_eq!(find_first(&buffer, &[Some(1), Some(2), Some(3)]), Some(0));
    }

    #[test]
    fn test_find_first_with_wildcard() {
        let buffer = [7, 1, 9, 3, 1, 5, 3];
        assert_eq!(find_first(&buffer, &[Some(1), None, Some(3)]), Some(1));
    }

    #[test]
    fn test_find_first_not_found() {
        let buffer = [1, 2, 3, 4, 5];
        assert_eq!(find_first(&buffer, &[Some(6), Some(7)]), None);
    }

    #[test]
    fn test_empty_pattern() {
        assert_eq!(find_first(&[1, 2, 3], &[]), None);
        assert!(find_all(&[1, 2, 3], &[]).is_empty());
    }

    #[test]
    fn test_pattern_larger_than_buffer() {
        assert_eq!(find_first(&[1, 2], &[Some(1), Some(2), Some(3)]), None);
    }

    #[test]
    fn test_find_all_with_wildcards() {
        let buffer = [1, 2, 3, 1, 9, 3, 1, 5, 3];
        let matches = find_all(&buffer, &[Some(1), None, Some(3)]);
        assert_eq!(matches, vec![0, 3, 6]);
    }

    #[test]
    fn test_all_wildcards_match_everywhere() {
        let buffer = [1, 2, 3, 4, 5];
        assert_eq!(find_all(&buffer, &[None, None]), vec![0, 1, 2, 3]);
    }
}
