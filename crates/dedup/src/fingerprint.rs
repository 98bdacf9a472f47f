use models::normalize_text;
use sha2::{Digest, Sha256};

/// `title_fp` is the dedup phase 4 fingerprint: `hash(normalize(title) + sorted(last-names) + year)`.
/// Distinct from `Lid::derive`'s hex suffix (which only takes the first 4
/// hex chars and mixes in unsorted surname order) since this value is an
/// `Alias` lookup key in its own right, not a component of a human-readable id.
pub fn title_fp(title: &str, surnames: &[String], year: Option<i32>) -> String {
    let norm_title = normalize_text(title);
    let mut norm_surnames: Vec<String> = surnames.iter().map(|s| normalize_text(s)).collect();
    norm_surnames.sort();

    let digest_input = format!(
        "{}|{}|{}",
        norm_title,
        norm_surnames.join(","),
        year.map(|y| y.to_string()).unwrap_or_default(),
    );

    let mut hasher = Sha256::new();
    hasher.update(digest_input.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_regardless_of_surname_order() {
        let a = title_fp("Attention Is All You Need", &["Vaswani".into(), "Shazeer".into()], Some(2017));
        let b = title_fp("attention is all you need", &["Shazeer".into(), "Vaswani".into()], Some(2017));
        assert_eq!(a, b);
    }

    #[test]
    fn differs_on_year() {
        let a = title_fp("Some Title", &["Smith".into()], Some(2020));
        let b = title_fp("Some Title", &["Smith".into()], Some(2021));
        assert_ne!(a, b);
    }
}
