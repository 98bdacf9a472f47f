use crate::{NormalizedWork, SourceError};
use models::{Author, ParsedReference};
use std::sync::Arc;

/// PdfParserClient wraps the internal TEI-XML-returning PDF extraction
/// service: POST PDF bytes, get back TEI XML whose `<teiHeader>` carries
/// metadata and `<back>/<listBibl>` carries references.
pub struct PdfParserClient {
    broker: Arc<broker::RequestBroker>,
    endpoint: url::Url,
}

impl PdfParserClient {
    pub fn new(broker: Arc<broker::RequestBroker>, endpoint: url::Url) -> Self {
        PdfParserClient { broker, endpoint }
    }

    pub async fn parse_pdf(&self, bytes: bytes::Bytes) -> Result<String, SourceError> {
        let outcome = self
            .broker
            .request(
                broker::DestClass::Internal,
                reqwest::Method::POST,
                &self.endpoint,
                None,
                Some(bytes),
                None,
            )
            .await
            .map_err(|err| SourceError::from_ingest("pdf_parser", err))?;

        if !outcome.is_success() {
            return Err(SourceError::from_ingest(
                "pdf_parser",
                models::IngestError::ProviderUnavailable("pdf_parser".to_string()),
            ));
        }

        String::from_utf8(outcome.body.to_vec())
            .map_err(|err| SourceError::parse_failure("pdf_parser", err.to_string()))
    }
}

/// Extracts title/authors/year/abstract from a TEI `<teiHeader>`, confidence 0.7.
pub fn parse_header(tei_xml: &str) -> Result<NormalizedWork, SourceError> {
    let doc = roxmltree::Document::parse(tei_xml)
        .map_err(|err| SourceError::parse_failure("tei", err.to_string()))?;

    let title = doc
        .descendants()
        .find(|n| n.has_tag_name("title") && n.attribute("type") != Some("sub"))
        .and_then(|n| n.text())
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    let authors: Vec<Author> = doc
        .descendants()
        .filter(|n| n.has_tag_name("author"))
        .enumerate()
        .filter_map(|(idx, n)| {
            let pers_name = n.descendants().find(|c| c.has_tag_name("persName"))?;
            let forename = pers_name
                .descendants()
                .find(|c| c.has_tag_name("forename"))
                .and_then(|c| c.text())
                .unwrap_or("");
            let surname = pers_name
                .descendants()
                .find(|c| c.has_tag_name("surname"))
                .and_then(|c| c.text())
                .unwrap_or("");
            let name = format!("{forename} {surname}").trim().to_string();
            if name.is_empty() {
                None
            } else {
                Some(Author {
                    name,
                    sequence: Some(idx as u32),
                    affiliation: None,
                })
            }
        })
        .collect();

    let year = doc
        .descendants()
        .find(|n| n.has_tag_name("date") && n.attribute("type") == Some("published"))
        .and_then(|n| n.attribute("when"))
        .and_then(|w| w.get(0..4))
        .and_then(|y| y.parse().ok());

    let abstract_text = doc
        .descendants()
        .find(|n| n.has_tag_name("abstract"))
        .and_then(|n| n.text())
        .map(|s| s.trim().to_string());

    Ok(NormalizedWork {
        title: crate::normalized::normalize_title(title),
        authors,
        year,
        journal: None,
        r#abstract: abstract_text,
        doi: None,
        arxiv_id: None,
        pdf_url: None,
        references: Vec::new(),
    })
}

/// Extracts the bibliography section from a TEI `<back>/<listBibl>`.
pub fn parse_references(tei_xml: &str) -> Result<Vec<ParsedReference>, SourceError> {
    let doc = roxmltree::Document::parse(tei_xml)
        .map_err(|err| SourceError::parse_failure("tei", err.to_string()))?;

    let refs = doc
        .descendants()
        .filter(|n| n.has_tag_name("biblStruct"))
        .map(|bibl| {
            let title = bibl
                .descendants()
                .find(|n| n.has_tag_name("title") && n.attribute("level") != Some("j"))
                .and_then(|n| n.text())
                .map(|s| s.trim().to_string());

            let authors: Vec<String> = bibl
                .descendants()
                .filter(|n| n.has_tag_name("author"))
                .filter_map(|n| {
                    let surname = n
                        .descendants()
                        .find(|c| c.has_tag_name("surname"))
                        .and_then(|c| c.text())?;
                    Some(surname.trim().to_string())
                })
                .collect();

            let year = bibl
                .descendants()
                .find(|n| n.has_tag_name("date"))
                .and_then(|n| n.attribute("when"))
                .and_then(|w| w.get(0..4))
                .and_then(|y| y.parse().ok());

            let doi = bibl
                .descendants()
                .find(|n| n.has_tag_name("idno") && n.attribute("type") == Some("DOI"))
                .and_then(|n| n.text())
                .map(|s| s.trim().to_string());

            ParsedReference {
                title,
                authors,
                year,
                doi,
                arxiv_id: None,
            }
        })
        .collect();

    Ok(refs)
}
