//! Endpoint paths

use crate::domain::QuestionRoute;

/// One API endpoint, relative to the configured base URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint<'a> {
    Courses,
    Course(&'a str),
    CourseEnrollments(&'a str),
    GraphTemplates,
    Graph(&'a str),
    GraphEnrollments(&'a str),
    Visualization(&'a str),
    NextQuestion(&'a str, QuestionRoute),
    Answers(&'a str),
}

impl<'a> Endpoint<'a> {
    /// Unencoded path segments; a trailing `""` yields a trailing slash
    ///
    /// Ids are kept as single segments so a `/` or `?` inside one is
    /// percent-encoded instead of changing the path.
    pub fn segments(&self) -> Vec<&'a str> {
        match *self {
            Self::Courses => vec!["courses", ""],
            Self::Course(id) => vec!["courses", id, ""],
            Self::CourseEnrollments(id) => vec!["courses", id, "enrollments", ""],
            Self::GraphTemplates => vec!["graphs", "templates"],
            Self::Graph(id) => vec!["graphs", id, ""],
            Self::GraphEnrollments(id) => vec!["graphs", id, "enrollments", ""],
            Self::Visualization(id) => vec!["graphs", id, "visualization"],
            Self::NextQuestion(id, QuestionRoute::Owner) => vec!["graphs", id, "next-question"],
            Self::NextQuestion(id, QuestionRoute::Learner) => {
                vec!["me", "graphs", id, "next-question"]
            }
            Self::Answers(id) => vec!["graphs", id, "answers"],
        }
    }
}
