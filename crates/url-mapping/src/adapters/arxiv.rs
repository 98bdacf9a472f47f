use crate::strategy::{MappingContext, MappingError};
use crate::{Mapping, PlatformAdapter, Strategy};
use std::sync::Arc;

/// ArxivAdapter claims any `arxiv.org` URL: both old-format `cs/0701001` and
/// new-format `1706.03762v2` ids are handled, version suffix stripped for
/// identity.
pub struct ArxivAdapter {
    strategies: Vec<Box<dyn Strategy>>,
}

impl ArxivAdapter {
    pub fn new(ctx: Arc<MappingContext>) -> Self {
        ArxivAdapter {
            strategies: vec![
                Box::new(ArxivRegexStrategy),
                Box::new(ArxivApiStrategy { ctx }),
            ],
        }
    }
}

impl PlatformAdapter for ArxivAdapter {
    fn name(&self) -> &'static str {
        "arxiv"
    }

    fn can_handle(&self, url: &url::Url) -> bool {
        url.host_str().is_some_and(|h| h.ends_with("arxiv.org"))
    }

    fn strategies(&self) -> &[Box<dyn Strategy>] {
        &self.strategies
    }
}

struct ArxivRegexStrategy;

#[async_trait::async_trait]
impl Strategy for ArxivRegexStrategy {
    fn name(&self) -> &'static str {
        "arxiv_regex"
    }

    async fn run(&self, url: &url::Url) -> Result<Option<Mapping>, MappingError> {
        let Some(raw_id) = extract_arxiv_id(url.path()) else {
            return Ok(None);
        };
        let canonical = sources::canonicalize_arxiv_id(&raw_id);
        Ok(Some(Mapping {
            arxiv_id: Some(canonical.clone()),
            source_page_url: Some(format!("https://arxiv.org/abs/{canonical}")),
            pdf_url: Some(format!("https://arxiv.org/pdf/{canonical}")),
            doi: None,
            venue: None,
            confidence: 0.9,
        }))
    }
}

struct ArxivApiStrategy {
    ctx: Arc<MappingContext>,
}

#[async_trait::async_trait]
impl Strategy for ArxivApiStrategy {
    fn name(&self) -> &'static str {
        "arxiv_api"
    }

    async fn run(&self, url: &url::Url) -> Result<Option<Mapping>, MappingError> {
        let Some(raw_id) = extract_arxiv_id(url.path()) else {
            return Ok(None);
        };
        let canonical = sources::canonicalize_arxiv_id(&raw_id);
        let work = self.ctx.arxiv.by_arxiv(&canonical).await?;
        Ok(Some(Mapping {
            arxiv_id: work.arxiv_id.or(Some(canonical.clone())),
            source_page_url: Some(format!("https://arxiv.org/abs/{canonical}")),
            pdf_url: work.pdf_url,
            doi: work.doi,
            venue: work.journal,
            confidence: 0.95,
        }))
    }
}

fn extract_arxiv_id(path: &str) -> Option<String> {
    static PATTERN: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    let re = PATTERN.get_or_init(|| {
        regex::Regex::new(r"/(?:abs|pdf)/((?:[A-Za-z.\-]+/\d{7}|\d{4}\.\d{4,5})(?:v\d+)?)")
            .expect("valid arxiv path regex")
    });
    re.captures(path).map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_new_format_id() {
        assert_eq!(
            extract_arxiv_id("/abs/1706.03762v2"),
            Some("1706.03762v2".to_string())
        );
    }

    #[test]
    fn extracts_old_format_id() {
        assert_eq!(
            extract_arxiv_id("/pdf/cs/0701001"),
            Some("cs/0701001".to_string())
        );
    }
}
