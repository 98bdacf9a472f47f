//! Shared domain types for the literature ingestion & citation graph service.
//!
//! Kept dependency-light and free of any particular transport/storage crate so
//! that every component crate can depend on it without pulling in `axum`,
//! `sqlx`, or `neo4rs`.

mod alias;
mod error;
mod graph;
mod id;
pub mod literature;
pub mod task;
mod unresolved;

pub use alias::{Alias, AliasResolution, AliasType};
pub use error::{ErrorKind, IngestError};
pub use graph::{
    clamp_depth, node_id_literature, node_id_unresolved, CiteEdge, GraphEdge, GraphNode,
    GraphReadResult, NodeType, DEFAULT_GRAPH_DEPTH, MAX_GRAPH_DEPTH, MAX_GRAPH_SEEDS,
};
pub use id::{normalize_text, Lid, TaskId, UnresolvedId};
pub use literature::{
    Author, Content, Identifiers, Literature, Metadata, NormalizedReference, ParsedReference,
    ParsingMethod, TaskInfo, Timestamps,
};
pub use task::{
    ComponentName, ComponentState, ComponentStatus, ComponentStatuses, ErrorInfo, ExecutionStatus,
    ResultType, Task, TaskEvent, TaskEventKind, TaskStatusSnapshot,
};
pub use unresolved::Unresolved;

/// A user's submission, as accepted by the Resolver API surface.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Submission {
    pub doi: Option<String>,
    pub arxiv_id: Option<String>,
    pub pmid: Option<String>,
    pub url: Option<String>,
    pub pdf_url: Option<String>,
    pub title: Option<String>,
    pub authors: Vec<String>,
}

impl Submission {
    /// The canonical string this submission normalizes to, used as `Task.submitted_source`
    /// and for in-flight task matching.
    pub fn normalized_source(&self) -> String {
        if let Some(doi) = &self.doi {
            format!("doi:{}", normalize_text(doi))
        } else if let Some(arxiv) = &self.arxiv_id {
            format!("arxiv:{}", normalize_text(arxiv))
        } else if let Some(pmid) = &self.pmid {
            format!("pmid:{}", pmid.trim())
        } else if let Some(url) = &self.url {
            format!("url:{}", url.trim())
        } else if let Some(pdf) = &self.pdf_url {
            format!("pdf_url:{}", pdf.trim())
        } else {
            format!("title:{}", normalize_text(self.title.as_deref().unwrap_or("")))
        }
    }

    pub fn has_identifier(&self) -> bool {
        self.doi.is_some() || self.arxiv_id.is_some() || self.pmid.is_some()
    }
}
