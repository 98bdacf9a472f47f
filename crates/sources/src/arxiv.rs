use crate::{NormalizedWork, SourceError};
use models::Author;
use std::sync::Arc;

const BASE_URL: &str = "http://export.arxiv.org/api/query";

/// ArxivClient wraps the ArXiv Atom API, used once an ArXiv id is known
///.
pub struct ArxivClient {
    broker: Arc<broker::RequestBroker>,
}

impl ArxivClient {
    pub fn new(broker: Arc<broker::RequestBroker>) -> Self {
        ArxivClient { broker }
    }

    pub async fn by_arxiv(&self, arxiv_id: &str) -> Result<NormalizedWork, SourceError> {
        let canonical = canonicalize_arxiv_id(arxiv_id);
        let mut url: url::Url = BASE_URL
            .parse()
            .map_err(|_| SourceError::parse_failure("arxiv", "invalid base URL"))?;
        url.query_pairs_mut()
            .append_pair("id_list", &canonical)
            .append_pair("max_results", "1");

        let outcome = self
            .broker
            .request(
                broker::DestClass::External,
                reqwest::Method::GET,
                &url,
                None,
                None,
                None,
            )
            .await
            .map_err(|err| SourceError::from_ingest("arxiv", err))?;

        if !outcome.is_success() {
            return Err(SourceError::from_ingest(
                "arxiv",
                models::IngestError::ProviderUnavailable("arxiv".to_string()),
            ));
        }

        let body = String::from_utf8_lossy(&outcome.body);
        parse_atom_entry(&body, &canonical)
    }
}

/// Strip version suffixes (`v2`) for identity while accepting both the old
/// (`cs/0701001`) and new (`1706.03762`) ArXiv id formats.
pub fn canonicalize_arxiv_id(raw: &str) -> String {
    let trimmed = raw.trim().trim_start_matches("arXiv:");
    strip_version(trimmed).to_string()
}

fn strip_version(id: &str) -> &str {
    match id.rfind('v') {
        Some(idx) if id[idx + 1..].chars().all(|c| c.is_ascii_digit()) && idx + 1 < id.len() => {
            &id[..idx]
        }
        _ => id,
    }
}

fn parse_atom_entry(xml: &str, arxiv_id: &str) -> Result<NormalizedWork, SourceError> {
    let doc = roxmltree::Document::parse(xml)
        .map_err(|err| SourceError::parse_failure("arxiv", err.to_string()))?;

    let entry = doc
        .descendants()
        .find(|n| n.has_tag_name("entry"))
        .ok_or_else(|| SourceError::not_found("arxiv"))?;

    let text_of = |tag: &str| -> Option<String> {
        entry
            .descendants()
            .find(|n| n.has_tag_name(tag))
            .and_then(|n| n.text())
            .map(|s| s.trim().to_string())
    };

    let title = text_of("title").unwrap_or_default();
    let summary = text_of("summary");
    let published = text_of("published");
    let year = published
        .as_deref()
        .and_then(|p| p.get(0..4))
        .and_then(|y| y.parse().ok());

    let authors: Vec<Author> = entry
        .descendants()
        .filter(|n| n.has_tag_name("author"))
        .enumerate()
        .filter_map(|(idx, n)| {
            n.descendants()
                .find(|c| c.has_tag_name("name"))
                .and_then(|c| c.text())
                .map(|name| Author {
                    name: name.trim().to_string(),
                    sequence: Some(idx as u32),
                    affiliation: None,
                })
        })
        .collect();

    Ok(NormalizedWork {
        title: crate::normalized::normalize_title(title),
        authors,
        year,
        journal: None,
        r#abstract: summary,
        doi: None,
        arxiv_id: Some(arxiv_id.to_string()),
        pdf_url: Some(format!("https://arxiv.org/pdf/{arxiv_id}")),
        references: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_version_suffix() {
        assert_eq!(canonicalize_arxiv_id("1706.03762v2"), "1706.03762");
        assert_eq!(canonicalize_arxiv_id("1706.03762"), "1706.03762");
    }

    #[test]
    fn accepts_old_format() {
        assert_eq!(canonicalize_arxiv_id("cs/0701001"), "cs/0701001");
    }
}
