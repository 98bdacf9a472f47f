//! Content Fetcher: acquires PDF bytes for a submission,
//! trying candidate sources in priority order and validating what comes back.

use std::sync::Arc;

const PDF_MAGIC: &[u8] = b"%PDF-";
const DEFAULT_OBJECT_STORE_HOSTS: &[&str] = &["s3.amazonaws.com", "storage.googleapis.com"];

#[derive(Debug, thiserror::Error)]
pub enum ContentFetchError {
    #[error("no PDF candidate resolved")]
    NotFound,
    #[error("PDF exceeded the configured size cap")]
    TooLarge,
    #[error("fetched bytes did not start with the PDF magic number")]
    InvalidPdf,
    #[error("destination blocked by SSRF policy")]
    BlockedSsrf,
    #[error("network error: {0}")]
    Network(String),
}

impl From<models::IngestError> for ContentFetchError {
    fn from(err: models::IngestError) -> Self {
        match err {
            models::IngestError::SsrfBlocked => ContentFetchError::BlockedSsrf,
            other => ContentFetchError::Network(other.to_string()),
        }
    }
}

impl From<sources::SourceError> for ContentFetchError {
    fn from(err: sources::SourceError) -> Self {
        if err.kind == models::ErrorKind::SsrfBlocked {
            ContentFetchError::BlockedSsrf
        } else {
            ContentFetchError::Network(err.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSource {
    UserProvided,
    ObjectStore,
    MappingPdfUrl,
    LandingPageDerived,
    OpenAccessLookup,
}

#[derive(Debug, Clone)]
pub struct FetchedContent {
    pub bytes: bytes::Bytes,
    pub fetched_url: String,
    pub source: ContentSource,
}

/// The candidate sources the Content Fetcher considers, in priority order:
/// user-provided PDF, a recognized object-store URL, the mapping's
/// `pdf_url`, a link derived from scraping the landing page, and an OA
/// lookup by DOI as last resort.
#[derive(Debug, Clone, Default)]
pub struct ContentFetchInput<'a> {
    pub user_pdf_url: Option<&'a str>,
    pub object_store_url: Option<&'a str>,
    pub mapping_pdf_url: Option<&'a str>,
    pub landing_page_url: Option<&'a str>,
    pub doi: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct ContentFetchConfig {
    pub max_bytes: u64,
    pub object_store_hosts: Vec<String>,
    pub object_store_credentials_available: bool,
}

impl Default for ContentFetchConfig {
    fn default() -> Self {
        ContentFetchConfig {
            max_bytes: 50 * 1024 * 1024,
            object_store_hosts: DEFAULT_OBJECT_STORE_HOSTS.iter().map(|s| s.to_string()).collect(),
            object_store_credentials_available: false,
        }
    }
}

pub struct ContentFetcher {
    broker: Arc<broker::RequestBroker>,
    unpaywall: sources::UnpaywallClient,
    config: ContentFetchConfig,
}

impl ContentFetcher {
    pub fn new(
        broker: Arc<broker::RequestBroker>,
        unpaywall_email: String,
        config: ContentFetchConfig,
    ) -> Self {
        ContentFetcher {
            unpaywall: sources::UnpaywallClient::new(broker.clone(), unpaywall_email),
            broker,
            config,
        }
    }

    pub async fn fetch(
        &self,
        input: ContentFetchInput<'_>,
    ) -> Result<FetchedContent, ContentFetchError> {
        let mut last_err = ContentFetchError::NotFound;

        if let Some(url) = input.user_pdf_url {
            match self.fetch_and_validate(url, ContentSource::UserProvided).await {
                Ok(content) => return Ok(content),
                Err(err) => last_err = err,
            }
        }

        if let Some(url) = input.object_store_url {
            match self.fetch_object_store(url).await {
                Ok(content) => return Ok(content),
                Err(err) => last_err = err,
            }
        }

        if let Some(url) = input.mapping_pdf_url {
            match self.fetch_and_validate(url, ContentSource::MappingPdfUrl).await {
                Ok(content) => return Ok(content),
                Err(err) => last_err = err,
            }
        }

        if let Some(page_url) = input.landing_page_url {
            match self.fetch_derived_from_landing_page(page_url).await {
                Ok(content) => return Ok(content),
                Err(err) => last_err = err,
            }
        }

        if let Some(doi) = input.doi {
            match self.fetch_via_open_access(doi).await {
                Ok(Some(content)) => return Ok(content),
                Ok(None) => {}
                Err(err) => last_err = err,
            }
        }

        Err(last_err)
    }

    /// Object-store URLs are fetched via the internal destination class when
    /// credentials are configured, falling back to a plain HTTPS GET
    /// otherwise.
    async fn fetch_object_store(&self, url: &str) -> Result<FetchedContent, ContentFetchError> {
        let parsed: url::Url = url.parse().map_err(|_| ContentFetchError::NotFound)?;
        let is_object_store = parsed
            .host_str()
            .is_some_and(|h| self.config.object_store_hosts.iter().any(|known| h.ends_with(known.as_str())));

        if is_object_store && self.config.object_store_credentials_available {
            let outcome = self
                .broker
                .request(broker::DestClass::Internal, reqwest::Method::GET, &parsed, None, None, None)
                .await?;
            return self.validate(outcome.body, url, ContentSource::ObjectStore);
        }

        self.fetch_and_validate(url, ContentSource::ObjectStore).await
    }

    async fn fetch_derived_from_landing_page(
        &self,
        page_url: &str,
    ) -> Result<FetchedContent, ContentFetchError> {
        let parsed: url::Url = page_url.parse().map_err(|_| ContentFetchError::NotFound)?;
        let outcome = self
            .broker
            .request(broker::DestClass::External, reqwest::Method::GET, &parsed, None, None, None)
            .await?;
        if !outcome.is_success() {
            return Err(ContentFetchError::NotFound);
        }
        let html = String::from_utf8_lossy(&outcome.body);
        let derived = extract_pdf_link(&html).ok_or(ContentFetchError::NotFound)?;
        self.fetch_and_validate(&derived, ContentSource::LandingPageDerived).await
    }

    async fn fetch_via_open_access(
        &self,
        doi: &str,
    ) -> Result<Option<FetchedContent>, ContentFetchError> {
        match self.unpaywall.oa_pdf_url(doi).await? {
            Some(url) => self
                .fetch_and_validate(&url, ContentSource::OpenAccessLookup)
                .await
                .map(Some),
            None => Ok(None),
        }
    }

    async fn fetch_and_validate(
        &self,
        url: &str,
        source: ContentSource,
    ) -> Result<FetchedContent, ContentFetchError> {
        let parsed: url::Url = url.parse().map_err(|_| ContentFetchError::NotFound)?;
        let outcome = self
            .broker
            .request(broker::DestClass::External, reqwest::Method::GET, &parsed, None, None, None)
            .await?;
        if !outcome.is_success() {
            return Err(ContentFetchError::NotFound);
        }
        self.validate(outcome.body, url, source)
    }

    fn validate(
        &self,
        bytes: bytes::Bytes,
        url: &str,
        source: ContentSource,
    ) -> Result<FetchedContent, ContentFetchError> {
        if bytes.len() as u64 > self.config.max_bytes {
            return Err(ContentFetchError::TooLarge);
        }
        if !bytes.starts_with(PDF_MAGIC) {
            return Err(ContentFetchError::InvalidPdf);
        }
        Ok(FetchedContent {
            bytes,
            fetched_url: url.to_string(),
            source,
        })
    }
}

fn extract_pdf_link(html: &str) -> Option<String> {
    static PATTERN: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    let re = PATTERN.get_or_init(|| {
        regex::Regex::new(r#"<meta[^>]+citation_pdf_url[^>]+content=["']([^"']+)["']"#)
            .expect("valid pdf link regex")
    });
    re.captures(html).map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_non_pdf_bytes() {
        let broker = Arc::new(broker::RequestBroker::new(broker::BrokerConfig::default()).unwrap());
        let fetcher = ContentFetcher::new(broker, "test@example.com".to_string(), ContentFetchConfig::default());
        let err = fetcher
            .validate(bytes::Bytes::from_static(b"not a pdf"), "http://x", ContentSource::UserProvided)
            .unwrap_err();
        assert!(matches!(err, ContentFetchError::InvalidPdf));
    }

    #[test]
    fn validate_rejects_oversized_bytes() {
        let broker = Arc::new(broker::RequestBroker::new(broker::BrokerConfig::default()).unwrap());
        let mut config = ContentFetchConfig::default();
        config.max_bytes = 4;
        let fetcher = ContentFetcher::new(broker, "test@example.com".to_string(), config);
        let err = fetcher
            .validate(bytes::Bytes::from_static(b"%PDF-1.4"), "http://x", ContentSource::UserProvided)
            .unwrap_err();
        assert!(matches!(err, ContentFetchError::TooLarge));
    }

    #[test]
    fn extracts_pdf_link_from_meta_tag() {
        let html = r#"<html><head><meta name="citation_pdf_url" content="https://example.com/paper.pdf"></head></html>"#;
        assert_eq!(
            extract_pdf_link(html),
            Some("https://example.com/paper.pdf".to_string())
        );
    }
}
