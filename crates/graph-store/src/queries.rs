use crate::CiteTarget;
use models::{Alias, AliasType, Lid, Unresolved};

pub const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE CONSTRAINT literature_lid IF NOT EXISTS FOR (l:Literature) REQUIRE l.lid IS UNIQUE",
    "CREATE CONSTRAINT alias_identity IF NOT EXISTS FOR (a:Alias) REQUIRE (a.alias_type, a.alias_value) IS UNIQUE",
    "CREATE CONSTRAINT unresolved_id IF NOT EXISTS FOR (u:Unresolved) REQUIRE u.id IS UNIQUE",
    "CREATE INDEX literature_doi IF NOT EXISTS FOR (l:Literature) ON (l.doi)",
    "CREATE FULLTEXT INDEX literature_title IF NOT EXISTS FOR (l:Literature) ON EACH [l.title]",
    "CREATE INDEX literature_task_id IF NOT EXISTS FOR (l:Literature) ON (l.task_id)",
];

/// Candidate fields for `upsert_literature`. Everything here ends up as flat
/// properties on the `:Literature` node; nested structure lives in the
/// `Literature` domain type one layer up, in the `ingest` crate.
#[derive(Debug, Clone, Default)]
pub struct UpsertCandidate {
    pub title: String,
    pub author_surnames: Vec<String>,
    pub authors: Vec<String>,
    pub year: i32,
    pub journal: Option<String>,
    pub r#abstract: Option<String>,
    pub doi: Option<String>,
    pub arxiv_id: Option<String>,
    pub pmid: Option<String>,
    pub pdf_url: Option<String>,
    pub source_page_url: Option<String>,
    pub task_id: Option<String>,
}

impl UpsertCandidate {
    pub fn derive_lid(&self) -> Lid {
        Lid::derive(&self.title, &self.author_surnames, self.year)
    }
}

pub fn upsert_literature_query(lid: &Lid, candidate: &UpsertCandidate) -> neo4rs::Query {
    neo4rs::query(
        "MERGE (l:Literature {lid: $lid}) \
         ON CREATE SET l.title = $title, l.authors = $authors, l.year = $year, \
             l.journal = $journal, l.abstract = $abstract, l.doi = $doi, \
             l.arxiv_id = $arxiv_id, l.pmid = $pmid, l.pdf_url = $pdf_url, \
             l.source_page_url = $source_page_url, l.task_id = $task_id, \
             l.created_at = datetime(), l.updated_at = datetime(), l.__just_created = true \
         ON MATCH SET l.updated_at = datetime(), l.__just_created = false \
         RETURN l.__just_created AS created",
    )
    .param("lid", lid.as_str())
    .param("title", candidate.title.as_str())
    .param("authors", candidate.authors.clone())
    .param("year", candidate.year as i64)
    .param("journal", candidate.journal.clone().unwrap_or_default())
    .param("abstract", candidate.r#abstract.clone().unwrap_or_default())
    .param("doi", candidate.doi.clone().unwrap_or_default())
    .param("arxiv_id", candidate.arxiv_id.clone().unwrap_or_default())
    .param("pmid", candidate.pmid.clone().unwrap_or_default())
    .param("pdf_url", candidate.pdf_url.clone().unwrap_or_default())
    .param("source_page_url", candidate.source_page_url.clone().unwrap_or_default())
    .param("task_id", candidate.task_id.clone().unwrap_or_default())
}

pub fn add_alias_query(lid: &Lid, alias: &Alias) -> neo4rs::Query {
    neo4rs::query(
        "MATCH (l:Literature {lid: $lid}) \
         MERGE (a:Alias {alias_type: $alias_type, alias_value: $alias_value}) \
         ON CREATE SET a.created_at = datetime() \
         MERGE (a)-[:IDENTIFIES]->(l)",
    )
    .param("lid", lid.as_str())
    .param("alias_type", alias.alias_type.as_str())
    .param("alias_value", alias.alias_value.as_str())
}

pub fn resolve_alias_query(alias_type: AliasType, alias_value: &str) -> neo4rs::Query {
    neo4rs::query(
        "MATCH (a:Alias {alias_type: $alias_type, alias_value: $alias_value})-[:IDENTIFIES]->(n) \
         RETURN \
           CASE WHEN n:Literature THEN 'literature' ELSE 'unresolved' END AS node_type, \
           CASE WHEN n:Literature THEN n.lid ELSE toString(n.id) END AS id \
         LIMIT 1",
    )
    .param("alias_type", alias_type.as_str())
    .param("alias_value", alias_value)
}

pub fn link_cites_query(src: &Lid, dst: &CiteTarget, confidence: f32, source: &str) -> neo4rs::Query {
    match dst {
        CiteTarget::Literature(dst_lid) => neo4rs::query(
            "MATCH (s:Literature {lid: $src}), (d:Literature {lid: $dst}) \
             MERGE (s)-[r:CITES]->(d) \
             SET r.confidence = $confidence, r.source = $source",
        )
        .param("src", src.as_str())
        .param("dst", dst_lid.as_str())
        .param("confidence", confidence as f64)
        .param("source", source),
        CiteTarget::Unresolved(dst_id) => neo4rs::query(
            "MATCH (s:Literature {lid: $src}), (d:Unresolved {id: $dst}) \
             MERGE (s)-[r:CITES]->(d) \
             SET r.confidence = $confidence, r.source = $source",
        )
        .param("src", src.as_str())
        .param("dst", dst_id.0.to_string())
        .param("confidence", confidence as f64)
        .param("source", source),
    }
}

pub fn create_unresolved_query(unresolved: &Unresolved) -> neo4rs::Query {
    let (title, authors, year, doi, arxiv_id) = match &unresolved.parsed {
        Some(parsed) => (
            parsed.title.clone().unwrap_or_default(),
            parsed.authors.clone(),
            parsed.year,
            parsed.doi.clone().unwrap_or_default(),
            parsed.arxiv_id.clone().unwrap_or_default(),
        ),
        None => (String::new(), Vec::new(), None, String::new(), String::new()),
    };
    neo4rs::query(
        "CREATE (u:Unresolved { \
             id: $id, raw_text: $raw_text, title: $title, authors: $authors, \
             year: $year, doi: $doi, arxiv_id: $arxiv_id, created_at: datetime() \
         })",
    )
    .param("id", unresolved.id.0.to_string())
    .param("raw_text", unresolved.raw_text.as_str())
    .param("title", title)
    .param("authors", authors)
    .param("year", year.map(|y| y as i64).unwrap_or(0))
    .param("doi", doi)
    .param("arxiv_id", arxiv_id)
}

pub fn promote_unresolved_query(id: models::UnresolvedId, lid: &Lid) -> neo4rs::Query {
    neo4rs::query(
        "MATCH (u:Unresolved {id: $id}) \
         SET u:Literature, u.lid = $lid \
         REMOVE u:Unresolved",
    )
    .param("id", id.0.to_string())
    .param("lid", lid.as_str())
}

pub fn delete_literature_query(lid: &Lid) -> neo4rs::Query {
    neo4rs::query("MATCH (l:Literature {lid: $lid}) DETACH DELETE l").param("lid", lid.as_str())
}

pub fn literature_task_status_query(lid: &Lid) -> neo4rs::Query {
    neo4rs::query("MATCH (l:Literature {lid: $lid}) RETURN l.task_id AS task_id")
        .param("lid", lid.as_str())
}

pub fn get_literature_query(lid: &Lid) -> neo4rs::Query {
    neo4rs::query(
        "MATCH (l:Literature {lid: $lid}) RETURN \
           l.title AS title, l.authors AS authors, l.year AS year, \
           l.journal AS journal, l.abstract AS abstract, l.doi AS doi, \
           l.arxiv_id AS arxiv_id, l.pmid AS pmid, l.pdf_url AS pdf_url, \
           l.source_page_url AS source_page_url, l.task_id AS task_id, \
           toString(l.created_at) AS created_at, toString(l.updated_at) AS updated_at",
    )
    .param("lid", lid.as_str())
}

/// Supports the failure-doc cleanup rule: a failed literature is
/// only eligible for removal if nothing else already cites it.
pub fn has_incoming_cites_query(lid: &Lid) -> neo4rs::Query {
    neo4rs::query(
        "MATCH (:Literature)-[:CITES]->(l:Literature {lid: $lid}) RETURN count(l) > 0 AS has_incoming",
    )
    .param("lid", lid.as_str())
}

/// Candidate `Literature` nodes by fulltext title similarity, for the
/// citation linker's title+author+year fallback match.
/// Neo4j's Lucene-backed fulltext index already does the token matching the
/// gatekeeper score re-ranks more precisely afterward.
pub fn search_by_title_query(title: &str, limit: u32) -> neo4rs::Query {
    neo4rs::query(
        "CALL db.index.fulltext.queryNodes('literature_title', $title) YIELD node, score \
         RETURN node.lid AS lid, node.title AS title, node.authors AS authors, node.year AS year \
         ORDER BY score DESC LIMIT $limit",
    )
    .param("title", title)
    .param("limit", limit as i64)
}

/// Bounds the promotion sweep to `Unresolved` nodes recorded
/// with the same publication year, since scanning every unresolved node on
/// every new `Literature` would not scale.
pub fn unresolved_by_year_query(year: i32) -> neo4rs::Query {
    neo4rs::query(
        "MATCH (u:Unresolved {year: $year}) \
         RETURN toString(u.id) AS id, u.raw_text AS raw_text, u.title AS title, \
                u.authors AS authors, u.doi AS doi, u.arxiv_id AS arxiv_id",
    )
    .param("year", year as i64)
}

pub fn read_graph_query(seeds: &[Lid], depth: u32) -> neo4rs::Query {
    // Relationship range bounds cannot be supplied as query parameters in
    // Cypher, so `depth` (already clamped to [0, MAX_GRAPH_DEPTH]) is
    // interpolated directly rather than bound.
    let seed_values: Vec<String> = seeds.iter().map(|lid| lid.as_str().to_string()).collect();
    let cypher = format!(
        "MATCH (seed:Literature) WHERE seed.lid IN $seeds \
         CALL {{ \
             WITH seed \
             MATCH (seed)-[:CITES*0..{depth}]-(neighbor) \
             RETURN neighbor \
         }} \
         WITH DISTINCT neighbor AS n \
         OPTIONAL MATCH (n)-[r:CITES]-(m) \
         RETURN \
           CASE WHEN n:Literature THEN 'literature' ELSE 'unresolved' END AS node_type, \
           CASE WHEN n:Literature THEN n.lid ELSE toString(n.id) END AS id, \
           n.title AS title, n.authors AS authors, n.year AS year, \
           CASE WHEN r IS NOT NULL AND n:Literature THEN n.lid ELSE null END AS edge_source, \
           CASE WHEN r IS NOT NULL AND m:Literature THEN m.lid ELSE null END AS edge_target, \
           r.confidence AS edge_weight"
    );
    neo4rs::query(&cypher).param("seeds", seed_values)
}
