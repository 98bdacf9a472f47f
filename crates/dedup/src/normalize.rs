use std::sync::OnceLock;

/// Query parameters stripped during URL normalization because they carry no
/// identity information.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source", "utm_medium", "utm_campaign", "utm_term", "utm_content",
    "gclid", "fbclid", "ref", "referrer", "source",
];

fn arxiv_abs_pattern() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(r"(?i)^/(?:abs|pdf)/((?:[a-z.\-]+/\d{7}|\d{4}\.\d{4,5}))(?:v\d+)?(?:\.pdf)?$").unwrap()
    })
}

/// Normalizes a source URL for identity comparison:
/// lowercase host, strip fragment, strip tracking query params, and
/// canonicalize ArXiv `/abs/`, `/pdf/`, and versioned variants to a single
/// `arxiv.org/abs/<id>` form so `/pdf/1706.03762v2.pdf` and `/abs/1706.03762`
/// compare equal.
pub fn normalize_url(raw: &str) -> String {
    let Ok(mut url) = url::Url::parse(raw) else {
        return raw.trim().to_lowercase();
    };

    url.set_fragment(None);
    if let Some(host) = url.host_str() {
        let lower = host.to_lowercase();
        let _ = url.set_host(Some(&lower));
    }

    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !TRACKING_PARAMS.contains(&k.to_lowercase().as_str()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if retained.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(&retained);
    }

    if let Some(host) = url.host_str() {
        if host.eq_ignore_ascii_case("arxiv.org") || host.eq_ignore_ascii_case("www.arxiv.org") {
            if let Some(caps) = arxiv_abs_pattern().captures(url.path()) {
                let id = caps.get(1).unwrap().as_str().to_lowercase();
                return format!("https://arxiv.org/abs/{id}");
            }
        }
    }

    url.as_str().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tracking_params_and_fragment() {
        let a = normalize_url("https://EXAMPLE.com/paper?utm_source=x&id=7#section2");
        assert_eq!(a, "https://example.com/paper?id=7");
    }

    #[test]
    fn canonicalizes_arxiv_variants() {
        let a = normalize_url("https://arxiv.org/abs/1706.03762");
        let b = normalize_url("https://arxiv.org/pdf/1706.03762v2.pdf");
        assert_eq!(a, b);
        assert_eq!(a, "https://arxiv.org/abs/1706.03762");
    }

    #[test]
    fn leaves_non_arxiv_paths_alone() {
        let a = normalize_url("https://example.com/paper.pdf");
        assert_eq!(a, "https://example.com/paper.pdf");
    }
}
