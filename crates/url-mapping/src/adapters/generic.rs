use crate::strategy::{MappingContext, MappingError};
use crate::{doi_from_path, Mapping, PlatformAdapter, Strategy};
use std::sync::Arc;

/// GenericAdapter is the always-true last-resort adapter:
/// DOI-in-path regex, then landing-page scraping, then a third-party-DB
/// lookup by URL.
pub struct GenericAdapter {
    strategies: Vec<Box<dyn Strategy>>,
}

impl GenericAdapter {
    pub fn new(ctx: Arc<MappingContext>) -> Self {
        GenericAdapter {
            strategies: vec![
                Box::new(DoiPathStrategy),
                Box::new(ScrapingStrategy { ctx: ctx.clone() }),
                Box::new(ThirdPartyDbStrategy { ctx }),
            ],
        }
    }
}

impl PlatformAdapter for GenericAdapter {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn can_handle(&self, _url: &url::Url) -> bool {
        true
    }

    fn strategies(&self) -> &[Box<dyn Strategy>] {
        &self.strategies
    }
}

struct DoiPathStrategy;

#[async_trait::async_trait]
impl Strategy for DoiPathStrategy {
    fn name(&self) -> &'static str {
        "doi_in_path"
    }

    async fn run(&self, url: &url::Url) -> Result<Option<Mapping>, MappingError> {
        let Some(doi) = doi_from_path(url) else {
            return Ok(None);
        };
        let looks_like_pdf = url.path().to_ascii_lowercase().ends_with(".pdf");
        Ok(Some(Mapping {
            doi: Some(doi),
            pdf_url: looks_like_pdf.then(|| url.to_string()),
            source_page_url: (!looks_like_pdf).then(|| url.to_string()),
            arxiv_id: None,
            venue: None,
            confidence: 0.8,
        }))
    }
}

struct ScrapingStrategy {
    ctx: Arc<MappingContext>,
}

#[async_trait::async_trait]
impl Strategy for ScrapingStrategy {
    fn name(&self) -> &'static str {
        "scraping"
    }

    async fn run(&self, url: &url::Url) -> Result<Option<Mapping>, MappingError> {
        let outcome = self
            .ctx
            .broker
            .request(
                broker::DestClass::External,
                reqwest::Method::GET,
                url,
                None,
                None,
                None,
            )
            .await?;
        if !outcome.is_success() {
            return Ok(None);
        }
        let html = String::from_utf8_lossy(&outcome.body);

        let doi = meta_content(&html, "citation_doi");
        let pdf_url = meta_content(&html, "citation_pdf_url");
        let venue = meta_content(&html, "citation_journal_title")
            .or_else(|| meta_content(&html, "og:site_name"));

        if doi.is_none() && pdf_url.is_none() {
            return Ok(None);
        }

        Ok(Some(Mapping {
            doi,
            pdf_url,
            source_page_url: Some(url.to_string()),
            arxiv_id: None,
            venue,
            confidence: 0.65,
        }))
    }
}

struct ThirdPartyDbStrategy {
    ctx: Arc<MappingContext>,
}

#[async_trait::async_trait]
impl Strategy for ThirdPartyDbStrategy {
    fn name(&self) -> &'static str {
        "third_party_db"
    }

    async fn run(&self, url: &url::Url) -> Result<Option<Mapping>, MappingError> {
        match self.ctx.semantic_scholar.by_url(url.as_str()).await {
            Ok(work) => Ok(Some(Mapping {
                doi: work.doi,
                arxiv_id: work.arxiv_id,
                pdf_url: work.pdf_url,
                source_page_url: Some(url.to_string()),
                venue: work.journal,
                confidence: 0.6,
            })),
            Err(err) if err.kind == models::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// Extracts a `<meta name="..." content="...">` (or `property="..."`) value by
/// name, tolerant of attribute order.
fn meta_content(html: &str, name: &str) -> Option<String> {
    static CACHE: std::sync::OnceLock<std::sync::Mutex<std::collections::HashMap<String, regex::Regex>>> =
        std::sync::OnceLock::new();
    let cache = CACHE.get_or_init(|| std::sync::Mutex::new(std::collections::HashMap::new()));
    let mut cache = cache.lock().unwrap();
    let re = cache.entry(name.to_string()).or_insert_with(|| {
        regex::Regex::new(&format!(
            r#"<meta[^>]+(?:name|property)=["']{}["'][^>]+content=["']([^"']+)["']"#,
            regex::escape(name)
        ))
        .expect("valid meta regex")
    });
    re.captures(html).map(|caps| caps[1].to_string())
}
