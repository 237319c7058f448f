//! Knowledge graph entities
//!
//! Nodes and edges arrive from two independently serialized collections, so
//! nothing here assumes referential integrity. The assembler in
//! [`crate::graph`] is what closes the graph.

use serde::{Deserialize, Serialize};

/// Mastery the server reports when a learner has no relationship with a node yet
pub const DEFAULT_MASTERY: f64 = 0.2;

/// A concept in a knowledge graph together with the learner's mastery of it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeNode {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Estimated competence in `[0, 1]`
    pub mastery_score: f64,
}

impl KnowledgeNode {
    /// Create a node; the mastery score is clamped into `[0, 1]`
    pub fn new(id: impl Into<String>, name: impl Into<String>, mastery_score: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            mastery_score: normalize_mastery(mastery_score),
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Clamp a score into `[0, 1]`; non-finite scores fall back to [`DEFAULT_MASTERY`]
pub fn normalize_mastery(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        DEFAULT_MASTERY
    }
}

/// Relationship between two knowledge nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    /// Source must be learned before target
    Prerequisite,
    /// Target is a subtopic of source
    Subtopic,
}

impl EdgeType {
    /// Wire name used by the visualization endpoint
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Prerequisite => "IS_PREREQUISITE_FOR",
            Self::Subtopic => "HAS_SUBTOPIC",
        }
    }

    /// Parse the wire name
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "IS_PREREQUISITE_FOR" => Some(Self::Prerequisite),
            "HAS_SUBTOPIC" => Some(Self::Subtopic),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prerequisite => "prerequisite",
            Self::Subtopic => "subtopic",
        }
    }
}

impl std::fmt::Display for EdgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A directed edge between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEdge {
    pub source_id: String,
    pub target_id: String,
    pub edge_type: EdgeType,
}

impl KnowledgeEdge {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        edge_type: EdgeType,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            edge_type,
        }
    }
}

/// Raw node and edge collections for one graph, as received
///
/// A new fetch replaces the whole value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    pub nodes: Vec<KnowledgeNode>,
    pub edges: Vec<KnowledgeEdge>,
}

impl KnowledgeGraph {
    pub fn new(nodes: Vec<KnowledgeNode>, edges: Vec<KnowledgeEdge>) -> Self {
        Self { nodes, edges }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node by id
    pub fn node(&self, id: &str) -> Option<&KnowledgeNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}
