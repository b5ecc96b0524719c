//! Edit distance.

/// Levenshtein distance between two strings, in characters.
///
/// Two-row dynamic programming; O(len(a)·len(b)) time, O(len(b)) space.
pub fn levenshtein(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0usize; b_chars.len() + 1];

    for (i, &ca) in a_chars.iter().enumerate() {
        current[0] = i + 1;
        for (j, &cb) in b_chars.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b_chars.len()]
}

/// Similarity in `[0, 1]` derived from edit distance and shared characters.
///
/// Used as the last step of the suggestion similarity chain when neither
/// containment nor a long common prefix applies.
pub fn overlap_similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    let distance = levenshtein(a, b);
    1.0 - distance as f64 / max_len as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classic_distances() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("flaw", "lawn"), 2);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn counts_chars_not_bytes() {
        assert_eq!(levenshtein("berço", "berco"), 1);
    }

    #[test]
    fn overlap_similarity_bounds() {
        assert_eq!(overlap_similarity("kit", "kit"), 1.0);
        assert!(overlap_similarity("kit", "kot") > 0.6);
        assert!(overlap_similarity("xyzqv", "berço") < 0.3);
    }
}
