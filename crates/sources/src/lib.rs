//! External source clients: one small wrapper per upstream API,
//! each mapping its provider-specific payload onto the shared [`NormalizedWork`]
//! schema and surfacing failures as [`SourceError`].

mod arxiv;
mod crossref;
mod error;
mod normalized;
mod semantic_scholar;
mod tei;
mod unpaywall;

pub use arxiv::{canonicalize_arxiv_id, ArxivClient};
pub use crossref::CrossRefClient;
pub use error::SourceError;
pub use normalized::{normalize_title, NormalizedWork};
pub use semantic_scholar::SemanticScholarClient;
pub use tei::{parse_header as parse_tei_header, parse_references as parse_tei_references, PdfParserClient};
pub use unpaywall::UnpaywallClient;
