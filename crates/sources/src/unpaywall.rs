use crate::SourceError;
use std::sync::Arc;

const BASE_URL: &str = "https://api.unpaywall.org/v2";

/// UnpaywallClient is the Unpaywall-style OA lookup used as the last resort of
/// the Content Fetcher's acquisition priority.
pub struct UnpaywallClient {
    broker: Arc<broker::RequestBroker>,
    email: String,
}

impl UnpaywallClient {
    pub fn new(broker: Arc<broker::RequestBroker>, email: String) -> Self {
        UnpaywallClient { broker, email }
    }

    pub async fn oa_pdf_url(&self, doi: &str) -> Result<Option<String>, SourceError> {
        let mut url: url::Url = format!("{BASE_URL}/{doi}")
            .parse()
            .map_err(|_| SourceError::parse_failure("unpaywall", "invalid DOI for URL"))?;
        url.query_pairs_mut().append_pair("email", &self.email);

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
            .map_err(|err| SourceError::from_ingest("unpaywall", err))?;

        if outcome.status == 404 {
            return Ok(None);
        }
        if !outcome.is_success() {
            return Err(SourceError::from_ingest(
                "unpaywall",
                models::IngestError::ProviderUnavailable("unpaywall".to_string()),
            ));
        }

        let payload: UnpaywallResponse = serde_json::from_slice(&outcome.body)
            .map_err(|err| SourceError::parse_failure("unpaywall", err.to_string()))?;
        Ok(payload
            .best_oa_location
            .and_then(|loc| loc.url_for_pdf.or(loc.url)))
    }
}

#[derive(serde::Deserialize)]
struct UnpaywallResponse {
    best_oa_location: Option<UnpaywallLocation>,
}

#[derive(serde::Deserialize)]
struct UnpaywallLocation {
    url_for_pdf: Option<String>,
    url: Option<String>,
}
