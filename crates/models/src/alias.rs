use crate::Lid;

/// AliasType enumerates the kinds of external handle that can identify a `Literature`.
/// `(alias_type, alias_value)` is globally unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasType {
    Doi,
    Arxiv,
    Pmid,
    Url,
    PdfUrl,
    TitleFp,
}

impl AliasType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AliasType::Doi => "doi",
            AliasType::Arxiv => "arxiv",
            AliasType::Pmid => "pmid",
            AliasType::Url => "url",
            AliasType::PdfUrl => "pdf_url",
            AliasType::TitleFp => "title_fp",
        }
    }
}

impl std::fmt::Display for AliasType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alias is an external handle pointing at a `Literature` via an `IDENTIFIES` edge.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Alias {
    pub alias_type: AliasType,
    pub alias_value: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Alias {
    pub fn new(alias_type: AliasType, alias_value: impl Into<String>) -> Self {
        Alias {
            alias_type,
            alias_value: alias_value.into(),
            created_at: chrono::Utc::now(),
        }
    }

    /// The unique key backing the `(Alias.alias_type, Alias.alias_value)` index.
    pub fn key(&self) -> (AliasType, &str) {
        (self.alias_type, self.alias_value.as_str())
    }
}

/// AliasResolution is the outcome of resolving an alias to a literature node.
#[derive(Debug, Clone)]
pub enum AliasResolution {
    Literature(Lid),
    Unresolved(crate::UnresolvedId),
    None,
}
