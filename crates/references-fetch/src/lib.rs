//! References Fetcher: a waterfall over an authoritative API,
//! PDF-parser bibliography section, and site-extracted list, normalizing and
//! de-duplicating the winning source's entries.

use models::{NormalizedReference, ParsedReference};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct ReferencesFetchInput<'a> {
    pub doi: Option<&'a str>,
    pub pdf_bytes: Option<bytes::Bytes>,
    pub landing_page_url: Option<&'a str>,
}

/// The result of one waterfall run: `source` is `None` only when every
/// source was tried (or skipped for lack of input) and none produced a
/// non-empty list, the signal the executor needs to mark this component
/// `failed` rather than `success` with zero references.
#[derive(Debug, Clone, Default)]
pub struct ReferencesFetchResult {
    pub references: Vec<NormalizedReference>,
    pub source: Option<&'static str>,
}

pub struct ReferencesFetcher {
    crossref: sources::CrossRefClient,
    pdf_parser: sources::PdfParserClient,
    broker: Arc<broker::RequestBroker>,
}

impl ReferencesFetcher {
    pub fn new(
        broker: Arc<broker::RequestBroker>,
        crossref_mailto: Option<String>,
        pdf_parser_endpoint: url::Url,
    ) -> Self {
        ReferencesFetcher {
            crossref: sources::CrossRefClient::new(broker.clone(), crossref_mailto),
            pdf_parser: sources::PdfParserClient::new(broker.clone(), pdf_parser_endpoint),
            broker,
        }
    }

    pub async fn fetch(&self, input: ReferencesFetchInput<'_>) -> ReferencesFetchResult {
        if let Some(doi) = input.doi {
            if let Ok(refs) = self.crossref.references_of(doi).await {
                if !refs.is_empty() {
                    return ReferencesFetchResult {
                        references: dedup(to_normalized(refs, "crossref")),
                        source: Some("crossref"),
                    };
                }
            }
        }

        if let Some(bytes) = input.pdf_bytes.clone() {
            if let Ok(tei_xml) = self.pdf_parser.parse_pdf(bytes).await {
                if let Ok(refs) = sources::parse_tei_references(&tei_xml) {
                    if !refs.is_empty() {
                        return ReferencesFetchResult {
                            references: dedup(to_normalized(refs, "pdf_parse")),
                            source: Some("pdf_parse"),
                        };
                    }
                }
            }
        }

        if let Some(page_url) = input.landing_page_url {
            if let Ok(refs) = self.scrape_site_list(page_url).await {
                if !refs.is_empty() {
                    return ReferencesFetchResult { references: dedup(refs), source: Some("site_extracted") };
                }
            }
        }

        ReferencesFetchResult::default()
    }

    async fn scrape_site_list(&self, page_url: &str) -> Result<Vec<NormalizedReference>, ()> {
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
        Ok(extract_reference_items(&html)
            .into_iter()
            .map(|raw_text| NormalizedReference { raw_text, parsed: None, source: "site_extracted".to_string() })
            .collect())
    }
}

fn to_normalized(refs: Vec<ParsedReference>, source: &str) -> Vec<NormalizedReference> {
    refs.into_iter()
        .map(|parsed| NormalizedReference {
            raw_text: render_raw_text(&parsed),
            parsed: Some(parsed),
            source: source.to_string(),
        })
        .collect()
}

fn render_raw_text(parsed: &ParsedReference) -> String {
    let authors = parsed.authors.join(", ");
    let title = parsed.title.clone().unwrap_or_default();
    let year = parsed.year.map(|y| y.to_string()).unwrap_or_default();
    [authors, title, year].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(". ")
}

/// De-dups a single fetch's reference list, first by DOI, then by
/// normalized-title + year.
fn dedup(refs: Vec<NormalizedReference>) -> Vec<NormalizedReference> {
    let mut seen_dois = std::collections::HashSet::new();
    let mut seen_title_years = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(refs.len());

    for reference in refs {
        let key = reference.parsed.as_ref().and_then(|p| p.doi.clone());
        if let Some(doi) = &key {
            let normalized_doi = doi.trim().to_ascii_lowercase();
            if !seen_dois.insert(normalized_doi) {
                continue;
            }
            out.push(reference);
            continue;
        }

        let title_year = reference
            .parsed
            .as_ref()
            .and_then(|p| p.title.as_ref())
            .map(|t| format!("{}|{}", models::normalize_text(t), reference.parsed.as_ref().and_then(|p| p.year).unwrap_or(0)));
        if let Some(key) = title_year {
            if !seen_title_years.insert(key) {
                continue;
            }
        }
        out.push(reference);
    }
    out
}

fn extract_reference_items(html: &str) -> Vec<String> {
    static PATTERN: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    let re = PATTERN.get_or_init(|| {
        regex::Regex::new(r#"(?is)<li[^>]*class="[^"]*\breference[^"]*"[^>]*>(.*?)</li>"#)
            .expect("valid reference item regex")
    });
    static TAG: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    let tag = TAG.get_or_init(|| regex::Regex::new(r"<[^>]+>").expect("valid tag-strip regex"));

    re.captures_iter(html)
        .map(|caps| tag.replace_all(&caps[1], "").trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_with_no_usable_input_reports_no_source() {
        let broker = Arc::new(broker::RequestBroker::new(broker::BrokerConfig::default()).unwrap());
        let fetcher = ReferencesFetcher::new(broker, None, "http://127.0.0.1:0/parse".parse().unwrap());

        let result = fetcher
            .fetch(ReferencesFetchInput { doi: None, pdf_bytes: None, landing_page_url: None })
            .await;

        assert!(result.source.is_none());
        assert!(result.references.is_empty());
    }

    #[test]
    fn dedups_by_doi_first() {
        let refs = vec![
            NormalizedReference {
                raw_text: "a".to_string(),
                parsed: Some(ParsedReference { doi: Some("10.1/x".to_string()), ..Default::default() }),
                source: "crossref".to_string(),
            },
            NormalizedReference {
                raw_text: "b".to_string(),
                parsed: Some(ParsedReference { doi: Some("10.1/X".to_string()), ..Default::default() }),
                source: "crossref".to_string(),
            },
        ];
        assert_eq!(dedup(refs).len(), 1);
    }

    #[test]
    fn dedups_by_title_and_year_when_no_doi() {
        let refs = vec![
            NormalizedReference {
                raw_text: "a".to_string(),
                parsed: Some(ParsedReference { title: Some("Attention Is All You Need".to_string()), year: Some(2017), ..Default::default() }),
                source: "pdf_parse".to_string(),
            },
            NormalizedReference {
                raw_text: "b".to_string(),
                parsed: Some(ParsedReference { title: Some("attention is all you need".to_string()), year: Some(2017), ..Default::default() }),
                source: "pdf_parse".to_string(),
            },
        ];
        assert_eq!(dedup(refs).len(), 1);
    }

    #[test]
    fn extracts_reference_list_items() {
        let html = r#"<ol><li class="reference">Smith, J. Some Title. 2020.</li><li class="reference">Doe, A. Another. 2021.</li></ol>"#;
        assert_eq!(extract_reference_items(html).len(), 2);
    }
}
