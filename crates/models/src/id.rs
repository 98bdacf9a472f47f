use sha2::{Digest, Sha256};

/// Stopwords dropped when deriving a title acronym for a `Lid`.
const TITLE_STOPWORDS: &[&str] = &[
    "a", "an", "the", "of", "on", "in", "for", "and", "or", "to", "with", "is", "are", "via",
];

/// Lid is the deterministic, human-readable identifier of a `Literature` record:
/// `YYYY-<first-author-surname-lc>-<title-acronym-lc>-<4hex>`.
///
/// A `Lid` is intentionally a readable string rather than an opaque id: its
/// whole purpose is to let a human recognize a citation graph node at a
/// glance.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lid(String);

impl Lid {
    /// Derive the canonical `Lid` for a (title, surnames, year) triple.
    ///
    /// Reproducible: identical normalized inputs always yield the same `Lid`.
    pub fn derive(title: &str, surnames: &[String], year: i32) -> Self {
        let norm_title = normalize_text(title);
        let acronym = title_acronym(&norm_title);
        let first_surname = surnames
            .first()
            .map(|s| normalize_text(s))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "unknown".to_string());
        let hex = content_hex(&norm_title, surnames, year);

        Lid(format!("{year}-{first_surname}-{acronym}-{hex}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unchecked constructor for values already known to be well-formed, e.g. as
    /// read back from the graph store.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Lid(raw.into())
    }
}

/// `hex` = first 4 hex chars of SHA-256 over `normalize(title) + "|" + join(",", surnames) + "|" + year`.
fn content_hex(norm_title: &str, surnames: &[String], year: i32) -> String {
    let normalized_surnames: Vec<String> = surnames.iter().map(|s| normalize_text(s)).collect();
    let digest_input = format!("{}|{}|{}", norm_title, normalized_surnames.join(","), year);

    let mut hasher = Sha256::new();
    hasher.update(digest_input.as_bytes());
    let digest = hasher.finalize();

    hex::encode(&digest[..2])
}

fn title_acronym(normalized_title: &str) -> String {
    normalized_title
        .split_whitespace()
        .filter(|w| !TITLE_STOPWORDS.contains(w))
        .take(5)
        .filter_map(|w| w.chars().next())
        .collect()
}

/// Lowercase, trim, and collapse whitespace; strip punctuation that would make
/// otherwise-identical titles hash differently.
pub fn normalize_text(s: &str) -> String {
    let lower = s.to_lowercase();
    let stripped: String = lower
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl std::fmt::Display for Lid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Debug for Lid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

impl std::str::FromStr for Lid {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Lid(s.to_string()))
    }
}

impl serde::Serialize for Lid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for Lid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Lid(s))
    }
}

#[cfg(feature = "sqlx-support")]
impl sqlx::Type<sqlx::Postgres> for Lid {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

#[cfg(feature = "sqlx-support")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Lid {
    fn decode(
        value: sqlx::postgres::PgValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Lid(s))
    }
}

#[cfg(feature = "sqlx-support")]
impl<'q> sqlx::Encode<'q, sqlx::Postgres> for Lid {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

/// TaskId identifies an ingestion `Task`. Unlike `Lid`, tasks have no human-facing
/// meaning, so a plain UUID is the natural choice.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub uuid::Uuid);

impl TaskId {
    pub fn new() -> Self {
        TaskId(uuid::Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Debug for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

impl std::str::FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(TaskId(uuid::Uuid::parse_str(s)?))
    }
}

/// UnresolvedId identifies a placeholder `Unresolved` node prior to promotion.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct UnresolvedId(pub uuid::Uuid);

impl UnresolvedId {
    pub fn new() -> Self {
        UnresolvedId(uuid::Uuid::new_v4())
    }
}

impl Default for UnresolvedId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UnresolvedId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Debug for UnresolvedId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lid_is_deterministic() {
        let a = Lid::derive(
            "Attention Is All You Need",
            &["Vaswani".to_string()],
            2017,
        );
        let b = Lid::derive(
            "attention is all you need",
            &["vaswani".to_string()],
            2017,
        );
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("2017-vaswani-"));
    }

    #[test]
    fn lid_acronym_skips_stopwords() {
        let lid = Lid::derive(
            "Attention Is All You Need",
            &["Vaswani".to_string()],
            2017,
        );
        // "is", "all", "you" survive (not in stopword list except "is"... check acronym form)
        assert_eq!(lid.as_str().split('-').count(), 4);
    }

    #[test]
    fn lid_differs_on_year() {
        let a = Lid::derive("Some Title", &["Smith".to_string()], 2020);
        let b = Lid::derive("Some Title", &["Smith".to_string()], 2021);
        assert_ne!(a, b);
    }
}
