//! Typo-tolerant text matching for the gallery search.
//!
//! A query matches a field when it can be found *somewhere inside* the field
//! with few edits. The score is
//!
//! ```text
//! similarity = 1 - errors / query_length
//! ```
//!
//! where `errors` is the semi-global edit distance: the fewest insertions,
//! deletions and substitutions needed to turn the query into any substring
//! of the field. Matching is case-insensitive and works on characters, not
//! bytes. `"natur"` inside `"nature"` scores 1.0; `"natrue"` scores 0.67.
//!
//! A record's score is the best score over its fields.

/// Similarity of `query` to the best-matching substring of `text`, in
/// `0.0..=1.0`. An empty query matches everything.
pub fn similarity(query: &str, text: &str) -> f64 {
    let query: Vec<char> = query.trim().to_lowercase().chars().collect();
    if query.is_empty() {
        return 1.0;
    }
    let text: Vec<char> = text.to_lowercase().chars().collect();
    let errors = substring_distance(&query, &text);
    (1.0 - errors as f64 / query.len() as f64).max(0.0)
}

/// Best [`similarity`] of `query` over several fields; 0.0 without fields.
pub fn best_similarity<'a>(query: &str, fields: impl IntoIterator<Item = &'a str>) -> f64 {
    fields
        .into_iter()
        .map(|field| similarity(query, field))
        .fold(0.0, f64::max)
}

/// Sellers' algorithm: edit distance from `pattern` to its best match
/// anywhere in `text`. Starting a match costs nothing at any text position.
fn substring_distance(pattern: &[char], text: &[char]) -> usize {
    // prev[j]: distance of pattern[..i] ending at text[..j].
    let mut prev = vec![0usize; text.len() + 1];
    let mut curr = vec![0usize; text.len() + 1];
    for (i, &p) in pattern.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &t) in text.iter().enumerate() {
            let substitution = prev[j] + usize::from(p != t);
            let deletion = prev[j + 1] + 1;
            let insertion = curr[j] + 1;
            curr[j + 1] = substitution.min(deletion).min(insertion);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev.into_iter().min().unwrap_or(pattern.len())
}

/// Indices of the items scoring at least `threshold`, most relevant first.
/// Equal scores keep input order.
pub fn rank<T, F>(items: &[T], query: &str, threshold: f64, fields: F) -> Vec<usize>
where
    F: Fn(&T) -> Vec<&str>,
{
    let mut scored: Vec<(usize, f64)> = items
        .iter()
        .enumerate()
        .map(|(i, item)| (i, best_similarity(query, fields(item))))
        .filter(|&(_, score)| score >= threshold)
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.into_iter().map(|(i, _)| i).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_and_prefix_matches_score_one() {
        assert_eq!(similarity("nature", "nature"), 1.0);
        assert_eq!(similarity("natur", "nature"), 1.0);
        assert_eq!(similarity("sun", "holiday-sunset.jpg"), 1.0);
    }

    #[test]
    fn matching_ignores_case() {
        assert_eq!(similarity("BEACH", "Beach.png"), 1.0);
    }

    #[test]
    fn one_typo_costs_one_error() {
        // "natyre" needs one substitution to become "nature".
        let score = similarity("natyre", "nature");
        assert!((score - (1.0 - 1.0 / 6.0)).abs() < 1e-9);
    }

    #[test]
    fn transposition_costs_two_errors() {
        let score = similarity("natrue", "nature");
        assert!((score - (1.0 - 2.0 / 6.0)).abs() < 1e-9);
    }

    #[test]
    fn unrelated_text_scores_low() {
        assert!(similarity("nature", "people") < 0.5);
        assert_eq!(similarity("abc", ""), 0.0);
    }

    #[test]
    fn empty_query_matches_everything() {
        assert_eq!(similarity("   ", "anything"), 1.0);
    }

    #[test]
    fn multibyte_characters_count_once() {
        assert_eq!(similarity("café", "le café.jpg"), 1.0);
        let score = similarity("cafe", "café");
        assert!((score - 0.75).abs() < 1e-9);
    }

    #[test]
    fn best_similarity_takes_the_max_field() {
        assert_eq!(best_similarity("nature", ["dsc_001.jpg", "nature"]), 1.0);
        assert_eq!(best_similarity("nature", Vec::<&str>::new()), 0.0);
    }

    #[test]
    fn rank_orders_by_relevance_then_input() {
        let items = ["natyre", "nature walk", "zzz", "nature"];
        let ranked = rank(&items, "nature", 0.7, |s| vec![*s]);
        assert_eq!(ranked, vec![1, 3, 0]);
    }
}
