use models::normalize_text;

/// Cheap gatekeeper score, computed before the full composite: token-overlap
/// only. Anything below `GATE_THRESHOLD` short-circuits before the more
/// expensive Jaro-Winkler author pass runs.
pub const GATE_THRESHOLD: f32 = 0.4;
/// Full acceptance threshold for the composite title score.
pub const ACCEPT_THRESHOLD: f32 = 0.6;
/// Minimum fraction of reference authors whose surname must Jaro-Winkler
/// match a candidate's surname at this cutoff, when authors are present.
pub const AUTHOR_MATCH_CUTOFF: f64 = 0.8;
pub const AUTHOR_MATCH_RATE: f32 = 0.5;

/// token-overlap (Jaccard over whitespace tokens) weighted 70% + LCS-ratio
/// weighted 30%.
pub fn title_score(a: &str, b: &str) -> f32 {
    let norm_a = normalize_text(a);
    let norm_b = normalize_text(b);
    if norm_a.is_empty() || norm_b.is_empty() {
        return 0.0;
    }
    token_overlap(&norm_a, &norm_b) * 0.7 + lcs_ratio(&norm_a, &norm_b) * 0.3
}

/// The cheap gatekeeper pass: token-overlap alone, used to decide whether the
/// full composite score (and author check) is worth computing at all.
pub fn gate_score(a: &str, b: &str) -> f32 {
    let norm_a = normalize_text(a);
    let norm_b = normalize_text(b);
    token_overlap(&norm_a, &norm_b)
}

fn token_overlap(a: &str, b: &str) -> f32 {
    use std::collections::HashSet;
    let set_a: HashSet<&str> = a.split_whitespace().collect();
    let set_b: HashSet<&str> = b.split_whitespace().collect();
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    intersection as f32 / union as f32
}

/// Ratio of the longest common subsequence length to the longer string's
/// length, over whitespace tokens (so word reordering costs less than a
/// character-level LCS would).
fn lcs_ratio(a: &str, b: &str) -> f32 {
    let tokens_a: Vec<&str> = a.split_whitespace().collect();
    let tokens_b: Vec<&str> = b.split_whitespace().collect();
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let mut dp = vec![vec![0u32; tokens_b.len() + 1]; tokens_a.len() + 1];
    for i in 1..=tokens_a.len() {
        for j in 1..=tokens_b.len() {
            dp[i][j] = if tokens_a[i - 1] == tokens_b[j - 1] {
                dp[i - 1][j - 1] + 1
            } else {
                dp[i - 1][j].max(dp[i][j - 1])
            };
        }
    }

    let lcs_len = dp[tokens_a.len()][tokens_b.len()] as f32;
    let longer = tokens_a.len().max(tokens_b.len()) as f32;
    lcs_len / longer
}

/// Fraction of `reference_surnames` with a Jaro-Winkler match at or above
/// `AUTHOR_MATCH_CUTOFF` against any candidate surname.
pub fn author_match_rate(reference_surnames: &[String], candidate_surnames: &[String]) -> f32 {
    if reference_surnames.is_empty() {
        return 1.0;
    }
    if candidate_surnames.is_empty() {
        return 0.0;
    }
    let matched = reference_surnames
        .iter()
        .filter(|r| {
            candidate_surnames
                .iter()
                .any(|c| strsim::jaro_winkler(&normalize_text(r), &normalize_text(c)) >= AUTHOR_MATCH_CUTOFF)
        })
        .count();
    matched as f32 / reference_surnames.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_titles_score_high() {
        let score = title_score("Attention Is All You Need", "Attention is all you need");
        assert!(score > 0.95);
    }

    #[test]
    fn unrelated_titles_score_low() {
        let score = title_score("Attention Is All You Need", "A Survey of Deep Reinforcement Learning");
        assert!(score < GATE_THRESHOLD);
    }

    #[test]
    fn author_match_allows_typos() {
        let refs = vec!["Vaswani".to_string()];
        let cands = vec!["Vaswanni".to_string()];
        assert!(author_match_rate(&refs, &cands) >= AUTHOR_MATCH_RATE);
    }

    #[test]
    fn no_reference_authors_vacuously_passes() {
        assert_eq!(author_match_rate(&[], &["Smith".to_string()]), 1.0);
    }
}
