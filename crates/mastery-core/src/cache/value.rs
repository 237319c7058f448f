//! Values stored in the query cache

use crate::domain::{Course, GraphSummary, NextQuestionSelection};
use crate::graph::AssembledGraph;

/// Every shape the cache can hold under a key
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    Courses(Vec<Course>),
    Course(Course),
    Graphs(Vec<GraphSummary>),
    Graph(GraphSummary),
    KnowledgeGraph(AssembledGraph),
    NextQuestion(NextQuestionSelection),
}

impl CacheValue {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Courses(_) => "courses",
            Self::Course(_) => "course",
            Self::Graphs(_) => "graphs",
            Self::Graph(_) => "graph",
            Self::KnowledgeGraph(_) => "knowledge_graph",
            Self::NextQuestion(_) => "next_question",
        }
    }
}

/// A type that can be stored under a query key
pub trait Cacheable: Clone + Send + Sync + 'static {
    fn into_value(self) -> CacheValue;

    /// Borrowing read; `None` when the value holds another type
    fn from_value(value: &CacheValue) -> Option<Self>;
}

macro_rules! cacheable {
    ($ty:ty, $variant:ident) => {
        impl Cacheable for $ty {
            fn into_value(self) -> CacheValue {
                CacheValue::$variant(self)
            }

            fn from_value(value: &CacheValue) -> Option<Self> {
                match value {
                    CacheValue::$variant(inner) => Some(inner.clone()),
                    _ => None,
                }
            }
        }
    };
}

cacheable!(Vec<Course>, Courses);
cacheable!(Course, Course);
cacheable!(Vec<GraphSummary>, Graphs);
cacheable!(GraphSummary, Graph);
cacheable!(AssembledGraph, KnowledgeGraph);
cacheable!(NextQuestionSelection, NextQuestion);
