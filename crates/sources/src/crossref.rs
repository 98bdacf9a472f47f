use crate::{NormalizedWork, SourceError};
use models::Author;
use std::sync::Arc;

const BASE_URL: &str = "https://api.crossref.org/works";

/// CrossRefClient wraps the CrossRef REST API, queried by DOI for authoritative
/// metadata and references: the first step of the metadata fetcher's waterfall.
pub struct CrossRefClient {
    broker: Arc<broker::RequestBroker>,
    mailto: Option<String>,
}

impl CrossRefClient {
    pub fn new(broker: Arc<broker::RequestBroker>, mailto: Option<String>) -> Self {
        CrossRefClient { broker, mailto }
    }

    pub async fn by_doi(&self, doi: &str) -> Result<NormalizedWork, SourceError> {
        let mut url: url::Url = format!("{BASE_URL}/{}", urlencoding_path(doi))
            .parse()
            .map_err(|_| SourceError::parse_failure("crossref", "invalid DOI for URL"))?;
        if let Some(mailto) = &self.mailto {
            url.query_pairs_mut().append_pair("mailto", mailto);
        }

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
            .map_err(|err| SourceError::from_ingest("crossref", err))?;

        if outcome.status == 404 {
            return Err(SourceError::not_found("crossref"));
        }
        if !outcome.is_success() {
            return Err(SourceError::from_ingest(
                "crossref",
                models::IngestError::ProviderUnavailable("crossref".to_string()),
            ));
        }

        let payload: CrossRefResponse = serde_json::from_slice(&outcome.body)
            .map_err(|err| SourceError::parse_failure("crossref", err.to_string()))?;
        Ok(message_to_work(payload.message))
    }

    pub async fn references_of(&self, doi: &str) -> Result<Vec<models::ParsedReference>, SourceError> {
        Ok(self.by_doi(doi).await?.references)
    }
}

fn urlencoding_path(s: &str) -> String {
    // DOIs contain `/`, which must remain a literal path separator after the
    // prefix segment but CrossRef's API accepts the raw DOI as a single path
    // component when percent-encoded wholesale.
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

#[derive(serde::Deserialize)]
struct CrossRefResponse {
    message: CrossRefWork,
}

#[derive(serde::Deserialize, Default)]
struct CrossRefWork {
    title: Option<Vec<String>>,
    author: Option<Vec<CrossRefAuthor>>,
    #[serde(rename = "published-print", alias = "published-online")]
    published: Option<CrossRefDateParts>,
    #[serde(rename = "container-title")]
    container_title: Option<Vec<String>>,
    #[serde(rename = "abstract")]
    abstract_: Option<String>,
    #[serde(rename = "DOI")]
    doi: Option<String>,
    reference: Option<Vec<CrossRefReference>>,
}

#[derive(serde::Deserialize)]
struct CrossRefAuthor {
    given: Option<String>,
    family: Option<String>,
    sequence: Option<String>,
    affiliation: Option<Vec<CrossRefAffiliation>>,
}

#[derive(serde::Deserialize)]
struct CrossRefAffiliation {
    name: Option<String>,
}

#[derive(serde::Deserialize)]
struct CrossRefDateParts {
    #[serde(rename = "date-parts")]
    date_parts: Vec<Vec<i32>>,
}

#[derive(serde::Deserialize)]
struct CrossRefReference {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(rename = "article-title")]
    article_title: Option<String>,
    author: Option<String>,
    year: Option<String>,
    unstructured: Option<String>,
}

fn message_to_work(msg: CrossRefWork) -> NormalizedWork {
    let authors = msg
        .author
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(idx, a)| Author {
            name: format!(
                "{} {}",
                a.given.unwrap_or_default(),
                a.family.unwrap_or_default()
            )
            .trim()
            .to_string(),
            sequence: Some(idx as u32),
            affiliation: a
                .affiliation
                .and_then(|affs| affs.into_iter().next())
                .and_then(|aff| aff.name),
        })
        .collect();

    let year = msg
        .published
        .and_then(|p| p.date_parts.into_iter().next())
        .and_then(|parts| parts.into_iter().next());

    let references = msg
        .reference
        .unwrap_or_default()
        .into_iter()
        .map(|r| models::ParsedReference {
            title: r.article_title.or(r.unstructured),
            authors: r.author.into_iter().collect(),
            year: r.year.and_then(|y| y.parse().ok()),
            doi: r.doi,
            arxiv_id: None,
        })
        .collect();

    NormalizedWork {
        title: crate::normalized::normalize_title(
            msg.title.unwrap_or_default().into_iter().next().unwrap_or_default(),
        ),
        authors,
        year,
        journal: msg.container_title.and_then(|c| c.into_iter().next()),
        r#abstract: msg.abstract_,
        doi: msg.doi,
        arxiv_id: None,
        pdf_url: None,
        references,
    }
}
