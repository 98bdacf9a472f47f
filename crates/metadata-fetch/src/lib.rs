//! Metadata Fetcher: a waterfall over progressively weaker
//! sources, stopping at the first confidence above threshold, then merging
//! fields by source priority.

use models::{Author, Metadata};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct MetadataFetchInput<'a> {
    pub doi: Option<&'a str>,
    pub arxiv_id: Option<&'a str>,
    pub pmid: Option<&'a str>,
    pub pdf_bytes: Option<bytes::Bytes>,
    pub landing_page_url: Option<&'a str>,
    pub user_title: Option<&'a str>,
    pub user_authors: &'a [String],
}

impl MetadataFetchInput<'_> {
    fn any_identifier(&self) -> bool {
        self.doi.is_some() || self.arxiv_id.is_some() || self.pmid.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct MetadataFetchResult {
    pub metadata: Metadata,
    pub next_action: Option<String>,
}

struct Attempt {
    source: &'static str,
    work: sources::NormalizedWork,
    confidence: f32,
}

pub struct MetadataFetcher {
    crossref: sources::CrossRefClient,
    arxiv: sources::ArxivClient,
    semantic_scholar: sources::SemanticScholarClient,
    pdf_parser: sources::PdfParserClient,
    broker: Arc<broker::RequestBroker>,
    threshold: f32,
}

impl MetadataFetcher {
    pub fn new(
        broker: Arc<broker::RequestBroker>,
        crossref_mailto: Option<String>,
        semantic_scholar_api_key: Option<String>,
        pdf_parser_endpoint: url::Url,
        threshold: f32,
    ) -> Self {
        MetadataFetcher {
            crossref: sources::CrossRefClient::new(broker.clone(), crossref_mailto),
            arxiv: sources::ArxivClient::new(broker.clone()),
            semantic_scholar: sources::SemanticScholarClient::new(broker.clone(), semantic_scholar_api_key),
            pdf_parser: sources::PdfParserClient::new(broker.clone(), pdf_parser_endpoint),
            broker,
            threshold,
        }
    }

    pub async fn fetch(&self, input: MetadataFetchInput<'_>) -> MetadataFetchResult {
        let mut attempts: Vec<Attempt> = Vec::new();

        if let Some(doi) = input.doi {
            if let Ok(work) = self.crossref.by_doi(doi).await {
                let stop = work_confident_enough(&work, 0.95, self.threshold);
                attempts.push(Attempt { source: "crossref", work, confidence: 0.95 });
                if stop {
                    return self.merge(input, attempts);
                }
            }
        }

        if let Some(arxiv_id) = input.arxiv_id {
            if let Ok(work) = self.arxiv.by_arxiv(arxiv_id).await {
                let stop = work_confident_enough(&work, 0.9, self.threshold);
                attempts.push(Attempt { source: "arxiv", work, confidence: 0.9 });
                if stop {
                    return self.merge(input, attempts);
                }
            }
        }

        if input.any_identifier() {
            let result = if let Some(doi) = input.doi {
                self.semantic_scholar.by_doi(doi).await
            } else if let Some(arxiv_id) = input.arxiv_id {
                self.semantic_scholar.by_arxiv(arxiv_id).await
            } else {
                Err(sources::SourceError {
                    kind: models::ErrorKind::NotFound,
                    retryable: false,
                    provider: "semantic_scholar",
                    original: "no identifier semantic scholar recognizes".to_string(),
                })
            };
            if let Ok(work) = result {
                let stop = work_confident_enough(&work, 0.85, self.threshold);
                attempts.push(Attempt { source: "semantic_scholar", work, confidence: 0.85 });
                if stop {
                    return self.merge(input, attempts);
                }
            }
        }

        if let Some(bytes) = input.pdf_bytes.clone() {
            if let Ok(tei_xml) = self.pdf_parser.parse_pdf(bytes).await {
                if let Ok(work) = sources::parse_tei_header(&tei_xml) {
                    let stop = work_confident_enough(&work, 0.7, self.threshold);
                    attempts.push(Attempt { source: "pdf_parse", work, confidence: 0.7 });
                    if stop {
                        return self.merge(input, attempts);
                    }
                }
            }
        }

        if let Some(page_url) = input.landing_page_url {
            if let Ok(work) = self.scrape_landing_page(page_url).await {
                attempts.push(Attempt { source: "landing_page_scrape", work, confidence: 0.5 });
            }
        }

        self.merge(input, attempts)
    }

    async fn scrape_landing_page(&self, page_url: &str) -> Result<sources::NormalizedWork, ()> {
        let parsed: url::Url = page_url.parse().map_err(|_| ())?;
        let outcome = self
            .broker
            .request(broker::DestClass::External, reqwest::Method::GET, &parsed, None, None, None)
            .await
            .map_err(|_| ())?;
        if !outcome.is_success() {
            return Err(());
        }
        let html = String::from_utf8_lossy(&outcome.body);
        let title = meta_content(&html, "citation_title").or_else(|| meta_content(&html, "og:title"));
        let Some(title) = title else { return Err(()) };
        let year = meta_content(&html, "citation_publication_date")
            .or_else(|| meta_content(&html, "citation_date"))
            .and_then(|d| d.get(0..4).and_then(|y| y.parse().ok()));
        let journal = meta_content(&html, "citation_journal_title");
        let authors: Vec<Author> = all_meta_content(&html, "citation_author")
            .into_iter()
            .enumerate()
            .map(|(idx, name)| Author { name, sequence: Some(idx as u32), affiliation: None })
            .collect();
        Ok(sources::NormalizedWork {
            title: sources::normalize_title(title),
            authors,
            year,
            journal,
            r#abstract: None,
            doi: meta_content(&html, "citation_doi"),
            arxiv_id: None,
            pdf_url: meta_content(&html, "citation_pdf_url"),
            references: Vec::new(),
        })
    }

    fn merge(&self, input: MetadataFetchInput<'_>, attempts: Vec<Attempt>) -> MetadataFetchResult {
        if attempts.is_empty() && input.user_title.is_none() {
            return MetadataFetchResult {
                metadata: Metadata::default(),
                next_action: Some(next_action_hint(&input)),
            };
        }

        let mut metadata = Metadata::default();
        let mut source_priority = Vec::new();

        if let Some(title) = input.user_title {
            metadata.title = sources::normalize_title(title);
            source_priority.push("user_input".to_string());
        }
        if !input.user_authors.is_empty() {
            metadata.authors = input
                .user_authors
                .iter()
                .enumerate()
                .map(|(idx, name)| Author { name: name.clone(), sequence: Some(idx as u32), affiliation: None })
                .collect();
        }

        for attempt in &attempts {
            source_priority.push(attempt.source.to_string());
            if metadata.title.is_empty() {
                metadata.title = attempt.work.title.clone();
            }
            if metadata.authors.is_empty() {
                metadata.authors = attempt.work.authors.clone();
            }
            if metadata.year.is_none() {
                metadata.year = attempt.work.year;
            }
            if metadata.journal.is_none() {
                metadata.journal = attempt.work.journal.clone();
            }
            if metadata.r#abstract.is_none() {
                metadata.r#abstract = attempt.work.r#abstract.clone();
            }
        }

        metadata.source_priority = source_priority;
        MetadataFetchResult { metadata, next_action: None }
    }
}

fn work_confident_enough(work: &sources::NormalizedWork, source_confidence: f32, threshold: f32) -> bool {
    !work.title.is_empty() && source_confidence >= threshold
}

fn next_action_hint(input: &MetadataFetchInput<'_>) -> String {
    if input.doi.is_none() && input.arxiv_id.is_none() {
        "provide a DOI or ArXiv id".to_string()
    } else if input.pdf_bytes.is_none() {
        "upload the PDF".to_string()
    } else {
        "metadata could not be resolved from any available source".to_string()
    }
}

fn meta_content(html: &str, name: &str) -> Option<String> {
    all_meta_content(html, name).into_iter().next()
}

fn all_meta_content(html: &str, name: &str) -> Vec<String> {
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
    re.captures_iter(html).map(|caps| caps[1].to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_action_prefers_identifier_hint() {
        let input = MetadataFetchInput::default();
        assert_eq!(next_action_hint(&input), "provide a DOI or ArXiv id");
    }

    #[test]
    fn next_action_suggests_pdf_upload_once_identifier_known() {
        let input = MetadataFetchInput { doi: Some("10.1/x"), ..Default::default() };
        assert_eq!(next_action_hint(&input), "upload the PDF");
    }
}
