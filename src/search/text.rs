//! Tokenization and boundary matching helpers.
//!
//! `tokenize` lower-cases its output; the other helpers expect callers to
//! hand them already-lowered text.

/// Full-word tokenization: split on any non-alphanumeric character and
/// lower-case the pieces.
///
/// Single-character tokens are kept so SKU-like terms as short as one
/// character remain matchable.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Whether `needle` occurs in `haystack` bounded by non-alphanumeric
/// characters (or the string edges) on both sides.
pub fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let mut search_from = 0;
    while let Some(offset) = haystack[search_from..].find(needle) {
        let start = search_from + offset;
        let end = start + needle.len();
        let left_ok = haystack[..start]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let right_ok = haystack[end..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_alphanumeric());
        if left_ok && right_ok {
            return true;
        }
        match haystack[start..].char_indices().nth(1) {
            Some((step, _)) => search_from = start + step,
            None => break,
        }
    }
    false
}

/// Consecutive-word n-grams of `text`, for n in `1..=max_words`.
pub fn ngrams(text: &str, max_words: usize) -> Vec<String> {
    let words = tokenize(text);
    let mut grams = Vec::new();
    for n in 1..=max_words {
        for window in words.windows(n) {
            grams.push(window.join(" "));
        }
    }
    grams
}

/// Length of the common prefix of two strings, in characters.
pub fn common_prefix_len(a: &str, b: &str) -> usize {
    a.chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_keeps_single_char_tokens() {
        assert_eq!(tokenize("kit p 2000"), vec!["kit", "p", "2000"]);
        assert_eq!(tokenize("berço-montessoriano"), vec!["berço", "montessoriano"]);
    }

    #[test]
    fn word_boundary_matching() {
        assert!(contains_word("kit enxoval completo", "kit"));
        assert!(contains_word("super kit de beleza", "kit"));
        assert!(!contains_word("marketingkit deluxe", "kit"));
        assert!(contains_word("mobile (musical) estrelas", "musical"));
    }

    #[test]
    fn word_boundary_on_multibyte_neighbors() {
        // "é" is not alphanumeric-adjacent confusion: it IS alphanumeric,
        // so "bebe" inside "bebé" must not count as a whole word.
        assert!(!contains_word("bebé", "beb"));
        assert!(contains_word("quarto do bebé", "bebé"));
    }

    #[test]
    fn ngrams_cover_one_to_three_words() {
        let grams = ngrams("kit enxoval completo", 3);
        assert!(grams.contains(&"kit".to_string()));
        assert!(grams.contains(&"kit enxoval".to_string()));
        assert!(grams.contains(&"kit enxoval completo".to_string()));
        assert!(!grams.contains(&"enxoval kit".to_string()));
    }

    #[test]
    fn common_prefix_counts_chars() {
        assert_eq!(common_prefix_len("berço", "berco"), 3);
        assert_eq!(common_prefix_len("kit", "kit"), 3);
        assert_eq!(common_prefix_len("a", "b"), 0);
    }
}
