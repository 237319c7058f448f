//! Transport to the learning platform API
//!
//! This module provides:
//! - The [`LearningApi`] trait, one method per endpoint, returning wire payloads
//! - [`HttpApi`], the reqwest implementation
//! - [`Endpoint`], the path table shared by both

mod endpoint;
mod http;

use async_trait::async_trait;

use crate::domain::QuestionRoute;
use crate::dto::{
    CourseDto, GraphDto, NextQuestionDto, SubmissionResultDto, SubmitAnswerDto, VisualizationDto,
};
use crate::error::Result;

pub use endpoint::Endpoint;
pub use http::{HttpApi, HttpApiBuilder};

/// Learning platform endpoints
///
/// Implementations perform no retries and no caching; a failure is
/// reported once as [`crate::Error::Transport`] or [`crate::Error::Http`].
#[async_trait]
pub trait LearningApi: Send + Sync {
    /// `GET /courses/`
    async fn list_courses(&self) -> Result<Vec<CourseDto>>;

    /// `GET /courses/{id}/`
    async fn get_course(&self, course_id: &str) -> Result<CourseDto>;

    /// `POST /courses/{id}/enrollments/`
    async fn enroll_course(&self, course_id: &str) -> Result<()>;

    /// `GET /graphs/templates`
    async fn list_graph_templates(&self) -> Result<Vec<GraphDto>>;

    /// `GET /graphs/{id}/`
    async fn get_graph(&self, graph_id: &str) -> Result<GraphDto>;

    /// `POST /graphs/{id}/enrollments/`
    async fn enroll_graph(&self, graph_id: &str) -> Result<()>;

    /// `GET /graphs/{id}/visualization`
    async fn graph_visualization(&self, graph_id: &str) -> Result<VisualizationDto>;

    /// Next question from the owner or the enrolled-learner route
    async fn next_question(&self, graph_id: &str, route: QuestionRoute)
    -> Result<NextQuestionDto>;

    /// Grade an answer
    async fn submit_answer(
        &self,
        graph_id: &str,
        submission: &SubmitAnswerDto,
    ) -> Result<SubmissionResultDto>;
}
