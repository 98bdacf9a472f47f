use crate::{NormalizedWork, SourceError};
use models::Author;
use std::sync::Arc;

const BASE_URL: &str = "https://api.semanticscholar.org/graph/v1";
const FIELDS: &str = "title,authors,abstract,year,externalIds,venue,openAccessPdf";

/// SemanticScholarClient is the "any identifier known" fallback of the
/// metadata waterfall and is also used
/// by the citation linker's title+author fuzzy search path.
pub struct SemanticScholarClient {
    broker: Arc<broker::RequestBroker>,
    api_key: Option<String>,
}

impl SemanticScholarClient {
    pub fn new(broker: Arc<broker::RequestBroker>, api_key: Option<String>) -> Self {
        SemanticScholarClient { broker, api_key }
    }

    fn headers(&self) -> Option<reqwest::header::HeaderMap> {
        let key = self.api_key.as_ref()?;
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "x-api-key",
            reqwest::header::HeaderValue::from_str(key).ok()?,
        );
        Some(headers)
    }

    pub async fn by_doi(&self, doi: &str) -> Result<NormalizedWork, SourceError> {
        self.by_identifier(&format!("DOI:{doi}")).await
    }

    pub async fn by_arxiv(&self, arxiv_id: &str) -> Result<NormalizedWork, SourceError> {
        self.by_identifier(&format!("ARXIV:{arxiv_id}")).await
    }

    /// Looks up a paper by its landing-page URL, used by the URL Mapping
    /// Service's third-party-DB strategy.
    pub async fn by_url(&self, url: &str) -> Result<NormalizedWork, SourceError> {
        self.by_identifier(&format!("URL:{url}")).await
    }

    async fn by_identifier(&self, id: &str) -> Result<NormalizedWork, SourceError> {
        let mut url: url::Url = format!("{BASE_URL}/paper/{id}")
            .parse()
            .map_err(|_| SourceError::parse_failure("semantic_scholar", "invalid id for URL"))?;
        url.query_pairs_mut().append_pair("fields", FIELDS);

        let outcome = self
            .broker
            .request(
                broker::DestClass::External,
                reqwest::Method::GET,
                &url,
                self.headers(),
                None,
                None,
            )
            .await
            .map_err(|err| SourceError::from_ingest("semantic_scholar", err))?;

        if outcome.status == 404 {
            return Err(SourceError::not_found("semantic_scholar"));
        }
        if !outcome.is_success() {
            return Err(SourceError::from_ingest(
                "semantic_scholar",
                models::IngestError::ProviderUnavailable("semantic_scholar".to_string()),
            ));
        }

        let paper: S2Paper = serde_json::from_slice(&outcome.body)
            .map_err(|err| SourceError::parse_failure("semantic_scholar", err.to_string()))?;
        Ok(paper_to_work(paper))
    }

    pub async fn search(
        &self,
        title: &str,
        year: Option<i32>,
    ) -> Result<Vec<NormalizedWork>, SourceError> {
        let mut url: url::Url = format!("{BASE_URL}/paper/search")
            .parse()
            .map_err(|_| SourceError::parse_failure("semantic_scholar", "invalid search URL"))?;
        url.query_pairs_mut().append_pair("query", title).append_pair("fields", FIELDS);
        if let Some(year) = year {
            url.query_pairs_mut().append_pair("year", &year.to_string());
        }

        let outcome = self
            .broker
            .request(
                broker::DestClass::External,
                reqwest::Method::GET,
                &url,
                self.headers(),
                None,
                None,
            )
            .await
            .map_err(|err| SourceError::from_ingest("semantic_scholar", err))?;

        if !outcome.is_success() {
            return Err(SourceError::from_ingest(
                "semantic_scholar",
                models::IngestError::ProviderUnavailable("semantic_scholar".to_string()),
            ));
        }

        let resp: S2SearchResponse = serde_json::from_slice(&outcome.body)
            .map_err(|err| SourceError::parse_failure("semantic_scholar", err.to_string()))?;
        Ok(resp.data.unwrap_or_default().into_iter().map(paper_to_work).collect())
    }
}

#[derive(serde::Deserialize)]
struct S2SearchResponse {
    data: Option<Vec<S2Paper>>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct S2Paper {
    title: Option<String>,
    authors: Option<Vec<S2Author>>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    year: Option<i32>,
    external_ids: Option<S2ExternalIds>,
    venue: Option<String>,
    open_access_pdf: Option<S2Pdf>,
}

#[derive(serde::Deserialize)]
struct S2Author {
    name: Option<String>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
struct S2ExternalIds {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(rename = "ArXiv")]
    arxiv: Option<String>,
}

#[derive(serde::Deserialize)]
struct S2Pdf {
    url: Option<String>,
}

fn paper_to_work(p: S2Paper) -> NormalizedWork {
    NormalizedWork {
        title: crate::normalized::normalize_title(p.title.unwrap_or_default()),
        authors: p
            .authors
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .filter_map(|(idx, a)| {
                a.name.map(|name| Author {
                    name,
                    sequence: Some(idx as u32),
                    affiliation: None,
                })
            })
            .collect(),
        year: p.year,
        journal: p.venue,
        r#abstract: p.abstract_text,
        doi: p.external_ids.as_ref().and_then(|e| e.doi.clone()),
        arxiv_id: p.external_ids.and_then(|e| e.arxiv),
        pdf_url: p.open_access_pdf.and_then(|pdf| pdf.url),
        references: Vec::new(),
    }
}
