use crate::literature::ParsedReference;
use crate::UnresolvedId;

/// Unresolved is a placeholder node for a cited-but-unknown work.
/// It is promoted in place to a `Literature` node once a matching submission
/// arrives; incident `CITES` edges are preserved across promotion.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Unresolved {
    pub id: UnresolvedId,
    pub raw_text: String,
    pub parsed: Option<ParsedReference>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Unresolved {
    pub fn new(raw_text: impl Into<String>, parsed: Option<ParsedReference>) -> Self {
        Unresolved {
            id: UnresolvedId::new(),
            raw_text: raw_text.into(),
            parsed,
            created_at: chrono::Utc::now(),
        }
    }
}
