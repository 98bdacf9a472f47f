use crate::Mapping;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("no adapter claims this URL")]
    NoAdapter,
    #[error("upstream source error: {0}")]
    Source(#[from] sources::SourceError),
    #[error("fetch failed: {0}")]
    Fetch(#[from] models::IngestError),
}

/// MappingContext bundles the shared broker and source clients every strategy
/// draws on, so adapters are constructed cheaply from one handle.
pub struct MappingContext {
    pub broker: Arc<broker::RequestBroker>,
    pub arxiv: sources::ArxivClient,
    pub semantic_scholar: sources::SemanticScholarClient,
}

impl MappingContext {
    pub fn new(broker: Arc<broker::RequestBroker>, semantic_scholar_api_key: Option<String>) -> Self {
        MappingContext {
            arxiv: sources::ArxivClient::new(broker.clone()),
            semantic_scholar: sources::SemanticScholarClient::new(broker.clone(), semantic_scholar_api_key),
            broker,
        }
    }
}

/// A Strategy is one way of turning a URL into a `Mapping`:
/// Regex, API, Scraping, or Third-party DB. Each returns `None` when it simply
/// does not apply, never when it applies but finds nothing.
#[async_trait::async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self, url: &url::Url) -> Result<Option<Mapping>, MappingError>;
}
