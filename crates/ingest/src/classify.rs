/// The shape of a raw `submitted_source` string, decided before plan step 1
/// (URL Mapping) runs.
#[derive(Debug, Clone)]
pub enum SourceKind {
    Url(url::Url),
    Doi(String),
    ArxivId(String),
}

pub fn classify(submitted_source: &str) -> SourceKind {
    let trimmed = submitted_source.trim();

    if let Some(rest) = trimmed.strip_prefix("doi:") {
        return SourceKind::Doi(rest.trim().to_string());
    }
    if let Some(rest) = trimmed.strip_prefix("arxiv:") {
        return SourceKind::ArxivId(rest.trim().to_string());
    }
    if looks_like_doi(trimmed) {
        return SourceKind::Doi(trimmed.to_string());
    }
    if let Ok(url) = url::Url::parse(trimmed) {
        return SourceKind::Url(url);
    }

    // Not a URL and not identifier-shaped; treat as a DOI anyway so the
    // pipeline at least attempts a CrossRef lookup rather than failing fast.
    SourceKind::Doi(trimmed.to_string())
}

fn looks_like_doi(s: &str) -> bool {
    s.starts_with("10.") && s.contains('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_bare_doi() {
        assert!(matches!(classify("10.1145/3282.3284"), SourceKind::Doi(_)));
    }

    #[test]
    fn recognizes_url() {
        assert!(matches!(classify("https://arxiv.org/abs/1706.03762"), SourceKind::Url(_)));
    }

    #[test]
    fn recognizes_explicit_prefix() {
        assert!(matches!(classify("arxiv:1706.03762"), SourceKind::ArxivId(_)));
    }
}
