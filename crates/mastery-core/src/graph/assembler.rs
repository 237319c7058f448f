//! Render-ready knowledge graph assembly
//!
//! Turns the raw node and edge collections into a closed graph for a
//! force-layout renderer: nodes are colored by mastery bucket and every edge
//! whose endpoints are not both present is dropped.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{EdgeType, KnowledgeGraph};

/// Lower bound (inclusive) of the medium mastery bucket
pub const MEDIUM_THRESHOLD: f64 = 0.33;
/// Lower bound (inclusive) of the high mastery bucket
pub const HIGH_THRESHOLD: f64 = 0.66;

/// Mastery bucket of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MasteryLevel {
    Low,
    Medium,
    High,
}

impl MasteryLevel {
    /// Bucket a mastery score: `< 0.33` low, `[0.33, 0.66)` medium, `>= 0.66` high
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_THRESHOLD {
            Self::High
        } else if score >= MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Self::Low => "#ef4444",
            Self::Medium => "#f59e0b",
            Self::High => "#22c55e",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for MasteryLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Link color for an edge type
pub fn edge_color(edge_type: EdgeType) -> &'static str {
    match edge_type {
        EdgeType::Prerequisite => "#6366f1",
        EdgeType::Subtopic => "#94a3b8",
    }
}

/// A node ready for rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderNode {
    pub id: String,
    pub name: String,
    pub description: String,
    pub mastery_score: f64,
    pub level: MasteryLevel,
    pub color: String,
}

/// A link ready for rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderLink {
    pub source: String,
    pub target: String,
    pub edge_type: EdgeType,
    pub color: String,
}

/// A closed graph: node ids are unique and every link endpoint is the id of
/// a node in `nodes`
///
/// Serializes in the `{nodes, links}` shape force-graph renderers expect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssembledGraph {
    pub nodes: Vec<RenderNode>,
    pub links: Vec<RenderLink>,
    /// Edges discarded because an endpoint was missing from the node set
    #[serde(skip)]
    pub dropped_edges: usize,
}

impl AssembledGraph {
    pub fn node(&self, id: &str) -> Option<&RenderNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Whether node ids are unique and every link endpoint resolves to a node
    pub fn is_closed(&self) -> bool {
        let ids: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        ids.len() == self.nodes.len()
            && self
                .links
                .iter()
                .all(|l| ids.contains(l.source.as_str()) && ids.contains(l.target.as_str()))
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats::from_graph(self)
    }
}

/// Assemble a render-ready graph
pub fn assemble(graph: &KnowledgeGraph) -> AssembledGraph {
    // First occurrence of an id wins
    let mut valid_ids: HashSet<&str> = HashSet::with_capacity(graph.nodes.len());
    let mut nodes: Vec<RenderNode> = Vec::with_capacity(graph.nodes.len());
    for node in &graph.nodes {
        if !valid_ids.insert(node.id.as_str()) {
            warn!(id = %node.id, "Skipping duplicate knowledge node");
            continue;
        }
        let level = MasteryLevel::from_score(node.mastery_score);
        nodes.push(RenderNode {
            id: node.id.clone(),
            name: node.name.clone(),
            description: node.description.clone(),
            mastery_score: node.mastery_score,
            level,
            color: level.color().to_string(),
        });
    }

    let mut dropped_edges = 0;
    let links: Vec<RenderLink> = graph
        .edges
        .iter()
        .filter(|edge| {
            let valid = valid_ids.contains(edge.source_id.as_str())
                && valid_ids.contains(edge.target_id.as_str());
            if !valid {
                dropped_edges += 1;
                debug!(
                    source = %edge.source_id,
                    target = %edge.target_id,
                    "Dropping dangling edge"
                );
            }
            valid
        })
        .map(|edge| RenderLink {
            source: edge.source_id.clone(),
            target: edge.target_id.clone(),
            edge_type: edge.edge_type,
            color: edge_color(edge.edge_type).to_string(),
        })
        .collect();

    if dropped_edges > 0 {
        warn!(dropped = dropped_edges, "Knowledge graph contained dangling edges");
    }

    AssembledGraph {
        nodes,
        links,
        dropped_edges,
    }
}

/// Summary of an assembled graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub link_count: usize,
    pub low: usize,
    pub medium: usize,
    pub high: usize,
    pub average_mastery: f64,
}

impl GraphStats {
    fn from_graph(graph: &AssembledGraph) -> Self {
        let mut stats = Self {
            node_count: graph.nodes.len(),
            link_count: graph.links.len(),
            ..Self::default()
        };

        let mut total = 0.0;
        for node in &graph.nodes {
            total += node.mastery_score;
            match node.level {
                MasteryLevel::Low => stats.low += 1,
                MasteryLevel::Medium => stats.medium += 1,
                MasteryLevel::High => stats.high += 1,
            }
        }

        if !graph.nodes.is_empty() {
            stats.average_mastery = total / graph.nodes.len() as f64;
        }
        stats
    }
}
