//! Wire shapes for the Resolver API surface. These are
//! presentation-layer projections of `models::Literature`/`Task`, not domain
//! types themselves: summary omits `fulltext` and raw reference text, the
//! fulltext variant includes everything.

use models::{Author, Lid, Literature};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub doi: Option<String>,
    pub arxiv_id: Option<String>,
    pub pmid: Option<String>,
    pub url: Option<String>,
    pub pdf_url: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
}

impl From<SubmitRequest> for models::Submission {
    fn from(req: SubmitRequest) -> Self {
        models::Submission {
            doi: req.doi,
            arxiv_id: req.arxiv_id,
            pmid: req.pmid,
            url: req.url,
            pdf_url: req.pdf_url,
            title: req.title,
            authors: req.authors,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitResponse {
    Exists { lid: Lid, resource_url: String },
    Accepted { task_id: models::TaskId, status_url: String, stream_url: String },
}

#[derive(Debug, Serialize)]
pub struct LiteratureSummary {
    pub lid: Lid,
    pub title: String,
    pub authors: Vec<Author>,
    pub year: Option<i32>,
    pub journal: Option<String>,
    pub r#abstract: Option<String>,
    pub doi: Option<String>,
    pub arxiv_id: Option<String>,
    pub pmid: Option<String>,
    pub pdf_url: Option<String>,
    pub source_page_url: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Literature> for LiteratureSummary {
    fn from(lit: &Literature) -> Self {
        LiteratureSummary {
            lid: lit.lid.clone(),
            title: lit.metadata.title.clone(),
            authors: lit.metadata.authors.clone(),
            year: lit.metadata.year,
            journal: lit.metadata.journal.clone(),
            r#abstract: lit.metadata.r#abstract.clone(),
            doi: lit.identifiers.doi.clone(),
            arxiv_id: lit.identifiers.arxiv_id.clone(),
            pmid: lit.identifiers.pmid.clone(),
            pdf_url: lit.content.pdf_url.clone(),
            source_page_url: lit.content.source_page_url.clone(),
            created_at: lit.timestamps.created_at,
            updated_at: lit.timestamps.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LiteratureFulltext {
    #[serde(flatten)]
    pub summary: LiteratureSummary,
    pub fulltext: Option<String>,
    pub parsing_method: Option<models::ParsingMethod>,
    pub quality_score: Option<f32>,
}

impl From<&Literature> for LiteratureFulltext {
    fn from(lit: &Literature) -> Self {
        LiteratureFulltext {
            summary: LiteratureSummary::from(lit),
            fulltext: lit.content.fulltext.clone(),
            parsing_method: lit.content.parsing_method,
            quality_score: lit.content.quality_score,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GraphQuery {
    pub lids: String,
    pub depth: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
    Doi,
    Arxiv,
    Pmid,
    Url,
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::{Content, Identifiers, Lid, Metadata, ParsingMethod, Timestamps};

    fn sample_literature() -> Literature {
        Literature {
            lid: Lid::from_raw("2024-smith-abc-1234"),
            identifiers: Identifiers {
                doi: Some("10.1/abc".to_string()),
                arxiv_id: None,
                pmid: None,
                fingerprint: None,
                source_urls: vec!["https://example.org/paper".to_string()],
            },
            metadata: Metadata {
                title: "A Study of Things".to_string(),
                authors: vec![Author { name: "Jane Smith".to_string(), sequence: Some(1), affiliation: None }],
                year: Some(2024),
                journal: Some("Journal of Things".to_string()),
                r#abstract: Some("An abstract.".to_string()),
                keywords: vec![],
                source_priority: vec!["crossref".to_string()],
            },
            content: Content {
                pdf_url: Some("https://example.org/paper.pdf".to_string()),
                source_page_url: Some("https://example.org/paper".to_string()),
                fulltext: Some("full text body".to_string()),
                parsing_method: Some(ParsingMethod::PdfParse),
                quality_score: Some(0.9),
            },
            task_info: None,
            timestamps: Timestamps::new(),
        }
    }

    #[test]
    fn summary_omits_fulltext_and_copies_identity_fields() {
        let lit = sample_literature();
        let summary = LiteratureSummary::from(&lit);

        assert_eq!(summary.lid.as_str(), "2024-smith-abc-1234");
        assert_eq!(summary.title, "A Study of Things");
        assert_eq!(summary.authors.len(), 1);
        assert_eq!(summary.doi.as_deref(), Some("10.1/abc"));
        assert_eq!(summary.pdf_url.as_deref(), Some("https://example.org/paper.pdf"));
    }

    #[test]
    fn fulltext_flattens_summary_and_adds_content_fields() {
        let lit = sample_literature();
        let fulltext = LiteratureFulltext::from(&lit);

        assert_eq!(fulltext.summary.lid.as_str(), lit.lid.as_str());
        assert_eq!(fulltext.fulltext.as_deref(), Some("full text body"));
        assert!(matches!(fulltext.parsing_method, Some(ParsingMethod::PdfParse)));
        assert_eq!(fulltext.quality_score, Some(0.9));

        let serialized = serde_json::to_value(&fulltext).unwrap();
        assert_eq!(serialized["title"], "A Study of Things");
        assert_eq!(serialized["fulltext"], "full text body");
    }

    #[test]
    fn submit_request_maps_fields_into_submission() {
        let req = SubmitRequest {
            doi: Some("10.1/xyz".to_string()),
            arxiv_id: None,
            pmid: None,
            url: Some("https://example.org".to_string()),
            pdf_url: None,
            title: None,
            authors: vec!["Jane Smith".to_string()],
        };
        let submission = models::Submission::from(req);
        assert_eq!(submission.doi.as_deref(), Some("10.1/xyz"));
        assert_eq!(submission.authors, vec!["Jane Smith".to_string()]);
    }
}
