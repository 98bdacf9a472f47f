//! Alias & Graph DAO: the Neo4j-backed store of `Literature`,
//! `Alias`, and `Unresolved` nodes and the `IDENTIFIES`/`CITES` edges between
//! them.

mod queries;

pub use queries::UpsertCandidate;

use models::{
    clamp_depth, node_id_literature, node_id_unresolved, Alias, AliasResolution, AliasType,
    Author, Content, GraphEdge, GraphNode, GraphReadResult, Identifiers, Lid, Literature,
    Metadata, NodeType, ParsedReference, Timestamps, Unresolved, UnresolvedId,
};

#[derive(Debug, thiserror::Error)]
pub enum GraphStoreError {
    #[error("graph database error: {0}")]
    Database(#[from] neo4rs::Error),
    #[error("row was missing an expected column: {0}")]
    MissingColumn(&'static str),
}

#[derive(Debug, Clone)]
pub struct GraphStoreConfig {
    pub uri: String,
    pub user: String,
    pub password: String,
    pub database: Option<String>,
}

/// GraphStore wraps a `neo4rs::Graph` connection pool behind the graph
/// operations this crate names, one typed store struct per persistence
/// concern.
pub struct GraphStore {
    graph: neo4rs::Graph,
}

/// Target of a `CITES` edge: either a resolved `Literature` or a placeholder
/// `Unresolved` node.
#[derive(Debug, Clone)]
pub enum CiteTarget {
    Literature(Lid),
    Unresolved(UnresolvedId),
}

impl GraphStore {
    pub async fn connect(config: GraphStoreConfig) -> Result<Self, GraphStoreError> {
        let mut builder = neo4rs::ConfigBuilder::default()
            .uri(&config.uri)
            .user(&config.user)
            .password(&config.password);
        if let Some(db) = &config.database {
            builder = builder.db(db.as_str());
        }
        let graph = neo4rs::Graph::connect(builder.build()?).await?;
        Ok(GraphStore { graph })
    }

    /// Creates the unique indexes the schema requires: `Literature.lid`,
    /// `(Alias.alias_type, Alias.alias_value)`, plus secondary indices on
    /// `doi` and `title` for scan-avoidance.
    pub async fn ensure_indexes(&self) -> Result<(), GraphStoreError> {
        for stmt in queries::SCHEMA_STATEMENTS {
            self.graph.run(neo4rs::query(stmt)).await?;
        }
        Ok(())
    }

    /// Idempotent create-or-fetch: the `Lid` is derived deterministically from
    /// `candidate`, so re-running with identical input returns the same `Lid`.
    pub async fn upsert_literature(
        &self,
        candidate: UpsertCandidate,
    ) -> Result<(Lid, bool), GraphStoreError> {
        let lid = candidate.derive_lid();
        let mut result = self
            .graph
            .execute(queries::upsert_literature_query(&lid, &candidate))
            .await?;
        let row = result.next().await?.ok_or(GraphStoreError::MissingColumn("created"))?;
        let created: bool = row.get("created").map_err(|_| GraphStoreError::MissingColumn("created"))?;
        Ok((lid, created))
    }

    /// Creates the `Alias` node and `IDENTIFIES` edge if absent; a no-op if the
    /// alias is already attached to this `Literature`.
    pub async fn add_alias(&self, lid: &Lid, alias: &Alias) -> Result<(), GraphStoreError> {
        self.graph.run(queries::add_alias_query(lid, alias)).await?;
        Ok(())
    }

    /// O(log n) via the unique `(alias_type, alias_value)` index.
    pub async fn resolve_alias(
        &self,
        alias_type: AliasType,
        alias_value: &str,
    ) -> Result<AliasResolution, GraphStoreError> {
        let mut result = self
            .graph
            .execute(queries::resolve_alias_query(alias_type, alias_value))
            .await?;
        let Some(row) = result.next().await? else {
            return Ok(AliasResolution::None);
        };
        let node_type: String = row.get("node_type").map_err(|_| GraphStoreError::MissingColumn("node_type"))?;
        match node_type.as_str() {
            "literature" => {
                let lid: String = row.get("id").map_err(|_| GraphStoreError::MissingColumn("id"))?;
                Ok(AliasResolution::Literature(Lid::from_raw(lid)))
            }
            "unresolved" => {
                let id: String = row.get("id").map_err(|_| GraphStoreError::MissingColumn("id"))?;
                let uid: uuid::Uuid = id.parse().map_err(|_| GraphStoreError::MissingColumn("id"))?;
                Ok(AliasResolution::Unresolved(UnresolvedId(uid)))
            }
            _ => Ok(AliasResolution::None),
        }
    }

    /// Merges the `CITES` edge idempotently; repeated calls with the same
    /// endpoints update `confidence`/`source` rather than duplicating an edge.
    pub async fn link_cites(
        &self,
        src: &Lid,
        dst: CiteTarget,
        confidence: f32,
        source: &str,
    ) -> Result<(), GraphStoreError> {
        self.graph
            .run(queries::link_cites_query(src, &dst, confidence, source))
            .await?;
        Ok(())
    }

    pub async fn create_unresolved(&self, parsed_ref: Option<ParsedReference>, raw_text: &str) -> Result<UnresolvedId, GraphStoreError> {
        let unresolved = Unresolved::new(raw_text, parsed_ref);
        let id = unresolved.id;
        self.graph.run(queries::create_unresolved_query(&unresolved)).await?;
        Ok(id)
    }

    /// Relabels the `Unresolved` node in place so all incident `CITES` edges
    /// are preserved across promotion.
    pub async fn promote_unresolved(&self, id: UnresolvedId, lid: &Lid) -> Result<(), GraphStoreError> {
        self.graph.run(queries::promote_unresolved_query(id, lid)).await?;
        Ok(())
    }

    /// DETACH-deletes a `Literature` node; only used for failed-doc cleanup in
    /// dedup phase 1.
    pub async fn delete_literature(&self, lid: &Lid) -> Result<(), GraphStoreError> {
        self.graph.run(queries::delete_literature_query(lid)).await?;
        Ok(())
    }

    /// Reconstructs a `Literature` record from its node properties.
    /// `task_info` is left `None`: the graph store has no notion of task
    /// execution status, only the `task_id` it was created under; callers
    /// that need the live status cross-reference the task store by that id
    /// themselves.
    pub async fn get_literature(&self, lid: &Lid) -> Result<Option<Literature>, GraphStoreError> {
        let mut result = self.graph.execute(queries::get_literature_query(lid)).await?;
        let Some(row) = result.next().await? else { return Ok(None) };

        let authors: Vec<String> = row.get("authors").unwrap_or_default();
        let metadata = Metadata {
            title: row.get("title").unwrap_or_default(),
            authors: authors
                .into_iter()
                .enumerate()
                .map(|(idx, name)| Author { name, sequence: Some(idx as u32), affiliation: None })
                .collect(),
            year: row.get("year").ok(),
            journal: row.get("journal").ok().filter(|j: &String| !j.is_empty()),
            r#abstract: row.get("abstract").ok().filter(|a: &String| !a.is_empty()),
            keywords: Vec::new(),
            source_priority: Vec::new(),
        };

        let identifiers = Identifiers {
            doi: row.get("doi").ok().filter(|d: &String| !d.is_empty()),
            arxiv_id: row.get("arxiv_id").ok().filter(|a: &String| !a.is_empty()),
            pmid: row.get("pmid").ok().filter(|p: &String| !p.is_empty()),
            fingerprint: None,
            source_urls: row
                .get::<String>("source_page_url")
                .ok()
                .filter(|u| !u.is_empty())
                .into_iter()
                .collect(),
        };

        let content = Content {
            pdf_url: row.get("pdf_url").ok().filter(|p: &String| !p.is_empty()),
            source_page_url: row.get("source_page_url").ok().filter(|p: &String| !p.is_empty()),
            fulltext: None,
            parsing_method: None,
            quality_score: None,
        };

        let created_at = parse_datetime(row.get("created_at").ok());
        let updated_at = parse_datetime(row.get("updated_at").ok());

        Ok(Some(Literature {
            lid: lid.clone(),
            identifiers,
            metadata,
            content,
            task_info: None,
            timestamps: Timestamps { created_at, updated_at },
        }))
    }

    /// Whether any other `Literature` already cites `lid`. Used by the
    /// failure-doc cleanup rule: a failed node with incoming citations is
    /// kept rather than deleted.
    pub async fn has_incoming_cites(&self, lid: &Lid) -> Result<bool, GraphStoreError> {
        let mut result = self.graph.execute(queries::has_incoming_cites_query(lid)).await?;
        let Some(row) = result.next().await? else { return Ok(false) };
        Ok(row.get("has_incoming").unwrap_or(false))
    }

    /// Fulltext title search over `Literature`, for the citation linker's
    /// fallback match. Callers re-rank with their own scorer;
    /// this is a recall pass, not the acceptance decision.
    pub async fn search_by_title(&self, title: &str, limit: u32) -> Result<Vec<(Lid, String, Vec<String>, Option<i32>)>, GraphStoreError> {
        let mut result = self.graph.execute(queries::search_by_title_query(title, limit)).await?;
        let mut out = Vec::new();
        while let Some(row) = result.next().await? {
            let lid: String = row.get("lid").map_err(|_| GraphStoreError::MissingColumn("lid"))?;
            let title: String = row.get("title").unwrap_or_default();
            let authors: Vec<String> = row.get("authors").unwrap_or_default();
            let year: Option<i32> = row.get("year").ok();
            out.push((Lid::from_raw(lid), title, authors, year));
        }
        Ok(out)
    }

    /// Candidate `Unresolved` nodes sharing a publication year, for the
    /// citation linker's post-creation promotion sweep.
    pub async fn unresolved_by_year(&self, year: i32) -> Result<Vec<(UnresolvedId, ParsedReference, String)>, GraphStoreError> {
        let mut result = self.graph.execute(queries::unresolved_by_year_query(year)).await?;
        let mut out = Vec::new();
        while let Some(row) = result.next().await? {
            let raw_id: String = row.get("id").map_err(|_| GraphStoreError::MissingColumn("id"))?;
            let uid: uuid::Uuid = raw_id.parse().map_err(|_| GraphStoreError::MissingColumn("id"))?;
            let raw_text: String = row.get("raw_text").unwrap_or_default();
            let parsed = ParsedReference {
                title: row.get("title").ok().filter(|t: &String| !t.is_empty()),
                authors: row.get("authors").unwrap_or_default(),
                year: Some(year),
                doi: row.get("doi").ok().filter(|d: &String| !d.is_empty()),
                arxiv_id: row.get("arxiv_id").ok().filter(|a: &String| !a.is_empty()),
            };
            out.push((UnresolvedId(uid), parsed, raw_text));
        }
        Ok(out)
    }

    /// The originating task id recorded on a `Literature` node, if any. Used by
    /// dedup phase 1/2 to cross-reference the task store for a failed-document
    /// check: the graph store has no notion of task status
    /// itself, it only carries the `task_id` the node was created under.
    pub async fn literature_task_id(&self, lid: &Lid) -> Result<Option<String>, GraphStoreError> {
        let mut result = self.graph.execute(queries::literature_task_status_query(lid)).await?;
        let Some(row) = result.next().await? else {
            return Ok(None);
        };
        let task_id: String = row.get("task_id").unwrap_or_default();
        Ok(if task_id.is_empty() { None } else { Some(task_id) })
    }

    /// Bounded-neighborhood read used by the Resolver API's `graph(lids, depth)`
    /// operation. Depth is clamped server-side.
    pub async fn read_graph(&self, seeds: &[Lid], depth: Option<u32>) -> Result<GraphReadResult, GraphStoreError> {
        let depth = clamp_depth(depth);
        let mut result = self.graph.execute(queries::read_graph_query(seeds, depth)).await?;

        let mut nodes = std::collections::HashMap::new();
        let mut edges = std::collections::HashMap::new();

        while let Some(row) = result.next().await? {
            let node_type: String = row.get("node_type").map_err(|_| GraphStoreError::MissingColumn("node_type"))?;
            let raw_id: String = row.get("id").map_err(|_| GraphStoreError::MissingColumn("id"))?;
            let title: String = row.get("title").unwrap_or_default();
            let authors: Vec<String> = row.get("authors").unwrap_or_default();
            let year: Option<i32> = row.get("year").ok();

            let (id, r#type) = match node_type.as_str() {
                "literature" => (node_id_literature(&Lid::from_raw(raw_id)), NodeType::Literature),
                _ => {
                    let uid: uuid::Uuid = raw_id.parse().map_err(|_| GraphStoreError::MissingColumn("id"))?;
                    (node_id_unresolved(&UnresolvedId(uid)), NodeType::Unresolved)
                }
            };
            nodes.entry(id.clone()).or_insert(GraphNode { id, title, authors, year, r#type });

            if let (Ok(source), Ok(target)) = (row.get::<String>("edge_source"), row.get::<String>("edge_target")) {
                let weight: f32 = row.get("edge_weight").unwrap_or(0.0);
                edges.entry((source.clone(), target.clone())).or_insert(GraphEdge {
                    source,
                    target,
                    r#type: "cites",
                    weight,
                });
            }
        }

        Ok(GraphReadResult {
            nodes: nodes.into_values().collect(),
            edges: edges.into_values().collect(),
        })
    }
}

/// Neo4j temporal values stringify as RFC3339; fall back to "now" for rows
/// written before a timestamp column existed rather than failing the read.
fn parse_datetime(raw: Option<String>) -> chrono::DateTime<chrono::Utc> {
    raw.and_then(|s| chrono::DateTime::parse_from_rfc3339(&s).ok())
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .unwrap_or_else(chrono::Utc::now)
}
