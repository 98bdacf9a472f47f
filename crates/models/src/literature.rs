use crate::{Lid, TaskId};

/// Author as carried on `Metadata.authors`, ordered as they appear on the work.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Author {
    pub name: String,
    pub sequence: Option<u32>,
    pub affiliation: Option<String>,
}

impl Author {
    /// The surname, used for `Lid` derivation and citation-linker author matching.
    /// Authors are normalized as "Given Family"; the last whitespace-delimited
    /// token is taken as the surname. Single-token names are their own surname.
    pub fn surname(&self) -> String {
        self.name
            .rsplit(' ')
            .next()
            .unwrap_or(&self.name)
            .to_string()
    }
}

/// Identifiers is the set-valued identity bag of a `Literature`: values only
/// grow; at most one value is present per primary identifier field.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Identifiers {
    pub doi: Option<String>,
    pub arxiv_id: Option<String>,
    pub pmid: Option<String>,
    pub fingerprint: Option<String>,
    pub source_urls: Vec<String>,
}

impl Identifiers {
    pub fn merge(&mut self, other: &Identifiers) {
        if self.doi.is_none() {
            self.doi = other.doi.clone();
        }
        if self.arxiv_id.is_none() {
            self.arxiv_id = other.arxiv_id.clone();
        }
        if self.pmid.is_none() {
            self.pmid = other.pmid.clone();
        }
        if self.fingerprint.is_none() {
            self.fingerprint = other.fingerprint.clone();
        }
        for url in &other.source_urls {
            if !self.source_urls.contains(url) {
                self.source_urls.push(url.clone());
            }
        }
    }
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Metadata {
    pub title: String,
    pub authors: Vec<Author>,
    pub year: Option<i32>,
    pub journal: Option<String>,
    pub r#abstract: Option<String>,
    pub keywords: Vec<String>,
    /// The ordered list of sources that contributed to this metadata, highest
    /// priority first, per the metadata fetcher's waterfall merge rule.
    pub source_priority: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParsingMethod {
    AuthoritativeApi,
    PdfParse,
    SiteScrape,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Content {
    pub pdf_url: Option<String>,
    pub source_page_url: Option<String>,
    pub fulltext: Option<String>,
    pub parsing_method: Option<ParsingMethod>,
    pub quality_score: Option<f32>,
}

/// A snapshot of the task that produced (or is producing) this record, embedded
/// on `Literature`
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TaskInfo {
    pub task_id: TaskId,
    pub execution_status: crate::task::ExecutionStatus,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Timestamps {
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Timestamps {
    pub fn new() -> Self {
        let now = chrono::Utc::now();
        Timestamps {
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = chrono::Utc::now();
    }
}

/// Literature is the canonical record produced by a completed ingestion.
///
/// Invariants: `lid` is immutable post-creation; `identifiers` grow
/// monotonically; `timestamps.created_at <= timestamps.updated_at`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Literature {
    pub lid: Lid,
    pub identifiers: Identifiers,
    pub metadata: Metadata,
    pub content: Content,
    pub task_info: Option<TaskInfo>,
    pub timestamps: Timestamps,
}

impl Literature {
    pub fn surnames(&self) -> Vec<String> {
        self.metadata.authors.iter().map(Author::surname).collect()
    }
}

/// A citation candidate, as surfaced by the reference-parsing pipeline before
/// the citation linker resolves it to a `Lid` or `Unresolved`.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ParsedReference {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub doi: Option<String>,
    pub arxiv_id: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct NormalizedReference {
    pub raw_text: String,
    pub parsed: Option<ParsedReference>,
    pub source: String,
}
