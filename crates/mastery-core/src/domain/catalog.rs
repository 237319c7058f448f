//! Course and graph summaries
//!
//! Light catalog entries shown in list and detail views. They are distinct
//! from the full [`KnowledgeGraph`](super::KnowledgeGraph) and are only ever
//! mutated by the query cache when an enrollment succeeds.

use serde::{Deserialize, Serialize};

/// A catalog entry that a learner can enroll in
pub trait Enrollable {
    /// Identifier used in cache keys and endpoints
    fn id(&self) -> &str;

    /// Whether the current learner is enrolled
    fn is_enrolled(&self) -> bool;

    /// Mark the entry as enrolled
    fn mark_enrolled(&mut self);
}

/// A course summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub name: String,
    pub node_count: u32,
    pub is_enrolled: bool,
    pub is_primary: bool,
}

/// A knowledge graph summary (template or owned graph)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub id: String,
    pub name: String,
    pub node_count: u32,
    pub is_enrolled: bool,
    /// Primary graphs are the published templates learners enroll in
    pub is_primary: bool,
}

impl Enrollable for Course {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_enrolled(&self) -> bool {
        self.is_enrolled
    }

    fn mark_enrolled(&mut self) {
        self.is_enrolled = true;
    }
}

impl Enrollable for GraphSummary {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_enrolled(&self) -> bool {
        self.is_enrolled
    }

    fn mark_enrolled(&mut self) {
        self.is_enrolled = true;
    }
}
