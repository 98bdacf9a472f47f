//! URL Mapping Service: given a URL, produce a canonicalized
//! identifier set via a registry of platform adapters, each composing an
//! ordered list of strategies.

mod adapters;
mod strategy;

pub use strategy::{MappingContext, MappingError, Strategy};

use std::sync::Arc;

/// The output of a successful mapping attempt. Every field besides `confidence`
/// is optional: a strategy may resolve only a DOI, only a PDF URL, or any
/// combination.
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    pub doi: Option<String>,
    pub arxiv_id: Option<String>,
    pub source_page_url: Option<String>,
    pub pdf_url: Option<String>,
    pub venue: Option<String>,
    pub confidence: f32,
}

impl Mapping {
    pub fn is_empty(&self) -> bool {
        self.doi.is_none()
            && self.arxiv_id.is_none()
            && self.source_page_url.is_none()
            && self.pdf_url.is_none()
    }
}

/// A PlatformAdapter claims URLs it knows how to handle and runs its
/// strategies, highest priority first, until one clears its confidence
/// threshold.
pub trait PlatformAdapter: Send + Sync {
    fn name(&self) -> &'static str;
    fn can_handle(&self, url: &url::Url) -> bool;
    fn strategies(&self) -> &[Box<dyn Strategy>];
    fn threshold(&self) -> f32 {
        0.6
    }
}

/// MappingRegistry holds platform adapters in priority order, with a Generic
/// always-true adapter expected last.
pub struct MappingRegistry {
    adapters: Vec<Box<dyn PlatformAdapter>>,
}

impl MappingRegistry {
    pub fn new(adapters: Vec<Box<dyn PlatformAdapter>>) -> Self {
        MappingRegistry { adapters }
    }

    /// Builds the default registry: ArXiv adapter ahead of the Generic
    /// always-true fallback.
    pub fn with_defaults(ctx: Arc<MappingContext>) -> Self {
        MappingRegistry::new(vec![
            Box::new(adapters::arxiv::ArxivAdapter::new(ctx.clone())),
            Box::new(adapters::generic::GenericAdapter::new(ctx)),
        ])
    }

    /// Runs the first adapter whose `can_handle` is true, executing its
    /// strategies in priority order and returning the best-confidence
    /// `Mapping` that clears the adapter's threshold. Ties are
    /// broken by strategy priority (array order) then arrival order, which
    /// falls out of stopping at the first strategy to clear the threshold.
    pub async fn resolve(&self, url: &url::Url) -> Result<Option<Mapping>, MappingError> {
        let adapter = self
            .adapters
            .iter()
            .find(|adapter| adapter.can_handle(url))
            .ok_or(MappingError::NoAdapter)?;

        tracing::debug!(adapter = adapter.name(), %url, "resolving mapping");

        let mut best: Option<Mapping> = None;
        for strategy in adapter.strategies() {
            let attempt = strategy.run(url).await?;
            let Some(mapping) = attempt else { continue };
            let cleared = mapping.confidence >= adapter.threshold();
            let is_better = best
                .as_ref()
                .map(|b| mapping.confidence > b.confidence)
                .unwrap_or(true);
            if is_better {
                best = Some(mapping);
            }
            if cleared {
                break;
            }
        }
        Ok(best)
    }
}

/// Extracts a DOI embedded in a path segment such as
/// `https://host/path/10.1000/xyz123.pdf`: PDF URLs that embed a DOI must be
/// parsed even under the Generic adapter.
pub fn doi_from_path(url: &url::Url) -> Option<String> {
    static PATTERN: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    let re = PATTERN.get_or_init(|| {
        regex::Regex::new(r"(10\.\d{4,9}/[-._;()/:A-Za-z0-9]+)").expect("valid doi regex")
    });
    re.captures(url.path())
        .map(|caps| caps[1].trim_end_matches(".pdf").to_string())
}
