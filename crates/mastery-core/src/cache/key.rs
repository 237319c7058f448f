//! Query keys

use std::fmt;

use crate::domain::QuestionRoute;

/// Ordered tuple identifying one cached collection or entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// `["courses"]`
    pub fn courses() -> Self {
        Self::new(["courses"])
    }

    /// `["courses", id]`
    pub fn course(id: &str) -> Self {
        Self::new(["courses", id])
    }

    /// `["graphs"]`
    pub fn graphs() -> Self {
        Self::new(["graphs"])
    }

    /// `["graphs", id]`
    pub fn graph(id: &str) -> Self {
        Self::new(["graphs", id])
    }

    /// `["knowledgeGraph", graph_id]`
    pub fn knowledge_graph(graph_id: &str) -> Self {
        Self::new(["knowledgeGraph", graph_id])
    }

    /// `["nextQuestion", graph_id, route]`
    pub fn next_question(graph_id: &str, route: QuestionRoute) -> Self {
        Self::new(["nextQuestion", graph_id, route.as_str()])
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Whether this key begins with all of `prefix`
    pub fn starts_with(&self, prefix: &[&str]) -> bool {
        prefix.len() <= self.0.len() && prefix.iter().zip(&self.0).all(|(p, s)| s.as_str() == *p)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?}", segment)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        assert_eq!(QueryKey::courses().to_string(), r#"["courses"]"#);
        assert_eq!(QueryKey::course("c1").to_string(), r#"["courses", "c1"]"#);
    }

    #[test]
    fn test_list_and_detail_keys_differ() {
        assert_ne!(QueryKey::graphs(), QueryKey::graph("g1"));
        assert_ne!(QueryKey::course("g1"), QueryKey::graph("g1"));
        assert_ne!(
            QueryKey::next_question("g1", QuestionRoute::Owner),
            QueryKey::next_question("g1", QuestionRoute::Learner)
        );
    }

    #[test]
    fn test_starts_with() {
        let key = QueryKey::knowledge_graph("g1");
        assert!(key.starts_with(&["knowledgeGraph"]));
        assert!(key.starts_with(&["knowledgeGraph", "g1"]));
        assert!(!key.starts_with(&["knowledgeGraph", "g2"]));
        assert!(!QueryKey::courses().starts_with(&["courses", "c1"]));
    }
}
