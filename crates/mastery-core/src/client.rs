//! Learning client
//!
//! Wires the transport, the DTO mapper and the query cache together. Every
//! read goes through a cache key; every mutation that succeeds patches or
//! invalidates the keys it affects, and a failed mutation writes nothing.

use std::sync::Arc;

use tracing::info;

use crate::api::{HttpApi, LearningApi};
use crate::cache::{EnrollmentPatch, QueryCache, QueryKey};
use crate::config::Config;
use crate::domain::{
    Course, GraphSummary, NextQuestionSelection, QuestionRoute, Submission, SubmissionResult,
};
use crate::dto::{
    course_from_dto, courses_from_dto, graph_summaries_from_dto, graph_summary_from_dto,
    knowledge_graph_from_dto, selection_from_dto, submission_result_from_dto, submission_to_dto,
};
use crate::error::Result;
use crate::graph::{AssembledGraph, assemble};

/// Client for one learning platform, sharing one query cache
pub struct LearningClient<A: LearningApi + 'static> {
    api: Arc<A>,
    cache: Arc<QueryCache>,
}

impl<A: LearningApi + 'static> Clone for LearningClient<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<A: LearningApi + 'static> std::fmt::Debug for LearningClient<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LearningClient")
            .field("cache", &self.cache)
            .finish()
    }
}

impl LearningClient<HttpApi> {
    /// HTTP client and a fresh cache built from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            HttpApi::new(&config.api)?,
            QueryCache::from_config(&config.cache),
        ))
    }
}

impl<A: LearningApi + 'static> LearningClient<A> {
    pub fn new(api: A, cache: QueryCache) -> Self {
        Self::with_shared(Arc::new(api), Arc::new(cache))
    }

    pub fn with_shared(api: Arc<A>, cache: Arc<QueryCache>) -> Self {
        Self { api, cache }
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    // ========== Courses ==========

    /// `["courses"]`
    pub async fn courses(&self) -> Result<Vec<Course>> {
        let api = Arc::clone(&self.api);
        self.cache
            .query(QueryKey::courses(), move || async move {
                courses_from_dto(api.list_courses().await?)
            })
            .await
    }

    /// `["courses", id]`
    pub async fn course(&self, course_id: &str) -> Result<Course> {
        let api = Arc::clone(&self.api);
        let id = course_id.to_string();
        self.cache
            .query(QueryKey::course(course_id), move || async move {
                course_from_dto(api.get_course(&id).await?)
            })
            .await
    }

    /// Enroll in a course and mark it enrolled in the list and detail entries
    pub async fn enroll_course(&self, course_id: &str) -> Result<EnrollmentPatch> {
        self.api.enroll_course(course_id).await?;
        info!(course_id = %course_id, "Enrolled in course");

        Ok(self
            .cache
            .patch_enrollment::<Course>(&QueryKey::courses(), &QueryKey::course(course_id), course_id)
            .await)
    }

    // ========== Graphs ==========

    /// `["graphs"]`, the published templates
    pub async fn graph_templates(&self) -> Result<Vec<GraphSummary>> {
        let api = Arc::clone(&self.api);
        self.cache
            .query(QueryKey::graphs(), move || async move {
                graph_summaries_from_dto(api.list_graph_templates().await?)
            })
            .await
    }

    /// `["graphs", id]`
    pub async fn graph(&self, graph_id: &str) -> Result<GraphSummary> {
        let api = Arc::clone(&self.api);
        let id = graph_id.to_string();
        self.cache
            .query(QueryKey::graph(graph_id), move || async move {
                graph_summary_from_dto(api.get_graph(&id).await?)
            })
            .await
    }

    /// Enroll in a graph and mark it enrolled in the list and detail entries
    pub async fn enroll_graph(&self, graph_id: &str) -> Result<EnrollmentPatch> {
        self.api.enroll_graph(graph_id).await?;
        info!(graph_id = %graph_id, "Enrolled in graph");

        Ok(self
            .cache
            .patch_enrollment::<GraphSummary>(&QueryKey::graphs(), &QueryKey::graph(graph_id), graph_id)
            .await)
    }

    /// `["knowledgeGraph", id]`, assembled and ready to render
    pub async fn knowledge_graph(&self, graph_id: &str) -> Result<AssembledGraph> {
        let api = Arc::clone(&self.api);
        let id = graph_id.to_string();
        self.cache
            .query(QueryKey::knowledge_graph(graph_id), move || async move {
                let graph = knowledge_graph_from_dto(api.graph_visualization(&id).await?)?;
                Ok(assemble(&graph))
            })
            .await
    }

    // ========== Questions ==========

    /// Ask the selection service for the next question
    ///
    /// Always goes to the network; a newer request for the same graph and
    /// route supersedes an older one still in flight.
    pub async fn next_question(
        &self,
        graph_id: &str,
        route: QuestionRoute,
    ) -> Result<NextQuestionSelection> {
        let api = Arc::clone(&self.api);
        let id = graph_id.to_string();
        self.cache
            .refetch(QueryKey::next_question(graph_id, route), move || async move {
                selection_from_dto(api.next_question(&id, route).await?)
            })
            .await
    }

    /// Grade a submission; on success the graph's mastery view is marked stale
    pub async fn submit_answer(
        &self,
        graph_id: &str,
        submission: &Submission,
    ) -> Result<SubmissionResult> {
        let dto = submission_to_dto(submission);
        let result = submission_result_from_dto(self.api.submit_answer(graph_id, &dto).await?)?;

        info!(
            graph_id = %graph_id,
            question_id = %submission.question_id(),
            correct = result.is_correct,
            "Answer graded"
        );
        self.cache
            .invalidate(&QueryKey::knowledge_graph(graph_id))
            .await;

        Ok(result)
    }
}
