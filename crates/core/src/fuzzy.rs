//! Token-set similarity scoring.
//!
//! Scores are integers in `0..=100`. Two strings are compared as bags of
//! words: shared words count fully, and whatever is left over on each side
//! is compared character by character.

use std::collections::BTreeSet;

/// Lowercases, turns every non-alphanumeric character into a space and trims.
pub fn preprocess(text: &str) -> String {
    text.chars()
        .map(|ch| if ch.is_alphanumeric() { ch } else { ' ' })
        .collect::<String>()
        .to_lowercase()
        .trim()
        .to_string()
}

/// Indel similarity `2 * lcs / (len_a + len_b)` scaled to `0..=100`.
pub fn ratio(left: &str, right: &str) -> u8 {
    let left: Vec<char> = left.chars().collect();
    let right: Vec<char> = right.chars().collect();
    let total = left.len() + right.len();
    if total == 0 {
        return 0;
    }

    let common = longest_common_subsequence(&left, &right);
    scale(2 * common, total)
}

fn scale(numerator: usize, denominator: usize) -> u8 {
    let score = (100.0 * numerator as f64 / denominator as f64).round();
    score.clamp(0.0, 100.0) as u8
}

fn longest_common_subsequence(left: &[char], right: &[char]) -> usize {
    if left.is_empty() || right.is_empty() {
        return 0;
    }

    let mut previous = vec![0usize; right.len() + 1];
    let mut current = vec![0usize; right.len() + 1];

    for &l in left {
        for (j, &r) in right.iter().enumerate() {
            current[j + 1] = if l == r {
                previous[j] + 1
            } else {
                previous[j + 1].max(current[j])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[right.len()]
}

fn join_sorted<'a>(tokens: impl Iterator<Item = &'a str>) -> String {
    tokens.collect::<Vec<_>>().join(" ")
}

/// Order- and duplication-insensitive comparison. If either side's word set
/// is contained in the other's, the score is 100.
pub fn token_set_ratio(left: &str, right: &str) -> u8 {
    let left = preprocess(left);
    let right = preprocess(right);
    if left.is_empty() || right.is_empty() {
        return 0;
    }

    let left_tokens: BTreeSet<&str> = left.split_whitespace().collect();
    let right_tokens: BTreeSet<&str> = right.split_whitespace().collect();

    let shared = join_sorted(left_tokens.intersection(&right_tokens).copied());
    let only_left = join_sorted(left_tokens.difference(&right_tokens).copied());
    let only_right = join_sorted(right_tokens.difference(&left_tokens).copied());

    let combined_left = format!("{shared} {only_left}").trim().to_string();
    let combined_right = format!("{shared} {only_right}").trim().to_string();

    [
        ratio(&shared, &combined_left),
        ratio(&shared, &combined_right),
        ratio(&combined_left, &combined_right),
    ]
    .into_iter()
    .max()
    .unwrap_or(0)
}

/// The first candidate with the highest `token_set_ratio` against `query`.
pub fn best_match<'a, I>(query: &str, candidates: I) -> Option<(&'a str, u8)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(&'a str, u8)> = None;
    for candidate in candidates {
        let score = token_set_ratio(query, candidate);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((candidate, score));
            if score == 100 {
                break;
            }
        }
    }
    best
}
