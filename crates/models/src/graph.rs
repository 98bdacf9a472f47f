use crate::Lid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Literature,
    Unresolved,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<i32>,
    pub r#type: NodeType,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub r#type: &'static str,
    pub weight: f32,
}

/// The result of a bounded-neighborhood `graph(lids, depth)` read. `edges` is
/// exactly the induced subgraph among `nodes`.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct GraphReadResult {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Maximum number of seed `Lid`s accepted by a graph read.
pub const MAX_GRAPH_SEEDS: usize = 20;
/// Default and maximum BFS depth for a graph read.
pub const DEFAULT_GRAPH_DEPTH: u32 = 1;
pub const MAX_GRAPH_DEPTH: u32 = 3;

pub fn clamp_depth(requested: Option<u32>) -> u32 {
    requested.unwrap_or(DEFAULT_GRAPH_DEPTH).min(MAX_GRAPH_DEPTH)
}

#[derive(Debug, Clone)]
pub struct CiteEdge {
    pub confidence: f32,
    pub source: String,
}

pub fn node_id_literature(lid: &Lid) -> String {
    format!("lit:{lid}")
}

pub fn node_id_unresolved(id: &crate::UnresolvedId) -> String {
    format!("unresolved:{id}")
}
