use models::{Author, ParsedReference};

/// NormalizedWork is the shared schema every source client maps its
/// provider-specific payload into: authors as an ordered list, title
/// trimmed, year as an int, identifiers explicit.
#[derive(Debug, Clone, Default)]
pub struct NormalizedWork {
    pub title: String,
    pub authors: Vec<Author>,
    pub year: Option<i32>,
    pub journal: Option<String>,
    pub r#abstract: Option<String>,
    pub doi: Option<String>,
    pub arxiv_id: Option<String>,
    pub pdf_url: Option<String>,
    pub references: Vec<ParsedReference>,
}

fn trimmed_title(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn normalize_title(title: impl AsRef<str>) -> String {
    trimmed_title(title.as_ref())
}
