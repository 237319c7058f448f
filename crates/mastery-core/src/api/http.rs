//! HTTP implementation of the learning API
//!
//! Thin reqwest glue: builds URLs from [`Endpoint`] segments (ids are
//! percent-encoded), sends JSON and decodes JSON. Timeouts are enforced by
//! the underlying HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ApiConfig;
use crate::domain::QuestionRoute;
use crate::dto::{
    CourseDto, GraphDto, NextQuestionDto, SubmissionResultDto, SubmitAnswerDto, VisualizationDto,
};
use crate::error::{Error, Result};

use super::LearningApi;
use super::endpoint::Endpoint;

/// Learning API over HTTP
#[derive(Clone)]
pub struct HttpApi {
    http_client: HttpClient,
    base_url: Url,
    timeout: Duration,
}

impl std::fmt::Debug for HttpApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApi")
            .field("base_url", &self.base_url())
            .field("timeout", &self.timeout)
            .finish()
    }
}

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Builder for creating an HttpApi
pub struct HttpApiBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl Default for HttpApiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpApiBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            timeout: None,
        }
    }

    /// Set the base URL (required)
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout (default 30s)
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<HttpApi> {
        let base_url = self
            .base_url
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .ok_or_else(|| Error::ConfigError("API base URL is required".to_string()))?;

        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::ConfigError(format!(
                "API base URL must start with http:// or https:// (got '{}')",
                base_url
            )));
        }

        let base_url = Url::parse(&base_url).map_err(|e| {
            Error::ConfigError(format!("Invalid API base URL '{}': {}", base_url, e))
        })?;

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(HttpApi {
            http_client,
            base_url,
            timeout,
        })
    }
}

impl HttpApi {
    /// Create an HttpApi from configuration
    pub fn new(config: &ApiConfig) -> Result<Self> {
        HttpApiBuilder::new()
            .base_url(config.resolved_base_url())
            .timeout(config.timeout())
            .build()
    }

    pub fn builder() -> HttpApiBuilder {
        HttpApiBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Absolute URL of an endpoint
    pub fn url(&self, endpoint: Endpoint<'_>) -> Url {
        let mut url = self.base_url.clone();
        // http(s) URLs always have a path
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(endpoint.segments());
        }
        url
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: Endpoint<'_>) -> Result<T> {
        let url = self.url(endpoint);
        debug!(url = %url, "GET");

        let response = self.http_client.get(url).send().await?;
        Self::decode(response).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        endpoint: Endpoint<'_>,
        body: &B,
    ) -> Result<T> {
        let url = self.url(endpoint);
        debug!(url = %url, "POST");

        let response = self.http_client.post(url).json(body).send().await?;
        Self::decode(response).await
    }

    /// POST without a meaningful response body
    async fn post_empty(&self, endpoint: Endpoint<'_>) -> Result<()> {
        let url = self.url(endpoint);
        debug!(url = %url, "POST");

        let response = self
            .http_client
            .post(url)
            .json(&serde_json::json!({}))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Self::handle_error_response(status, response).await;
        }
        Ok(())
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            return Self::handle_error_response(status, response).await;
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| Error::InvalidPayload(format!("Failed to parse response: {}", e)))
    }

    /// Map a non-2xx response to an error carrying the server's message
    async fn handle_error_response<T>(
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> Result<T> {
        let body = response.text().await.unwrap_or_default();
        Err(Error::Http {
            status: status.as_u16(),
            message: extract_error_message(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string()),
        })
    }
}

/// Pull a human-readable message out of an error body
///
/// Understands `{"detail": ...}`, `{"error": ...}` and `{"message": ...}`;
/// falls back to the raw body when it is short plain text.
fn extract_error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        for field in ["detail", "error", "message"] {
            match json.get(field) {
                Some(serde_json::Value::String(s)) => return Some(s.clone()),
                Some(serde_json::Value::Object(obj)) => {
                    if let Some(serde_json::Value::String(s)) = obj.get("message") {
                        return Some(s.clone());
                    }
                }
                _ => {}
            }
        }
        return None;
    }

    (body.len() <= 200).then(|| body.to_string())
}

#[async_trait]
impl LearningApi for HttpApi {
    async fn list_courses(&self) -> Result<Vec<CourseDto>> {
        self.get(Endpoint::Courses).await
    }

    async fn get_course(&self, course_id: &str) -> Result<CourseDto> {
        self.get(Endpoint::Course(course_id)).await
    }

    async fn enroll_course(&self, course_id: &str) -> Result<()> {
        self.post_empty(Endpoint::CourseEnrollments(course_id)).await
    }

    async fn list_graph_templates(&self) -> Result<Vec<GraphDto>> {
        self.get(Endpoint::GraphTemplates).await
    }

    async fn get_graph(&self, graph_id: &str) -> Result<GraphDto> {
        self.get(Endpoint::Graph(graph_id)).await
    }

    async fn enroll_graph(&self, graph_id: &str) -> Result<()> {
        self.post_empty(Endpoint::GraphEnrollments(graph_id)).await
    }

    async fn graph_visualization(&self, graph_id: &str) -> Result<VisualizationDto> {
        self.get(Endpoint::Visualization(graph_id)).await
    }

    async fn next_question(
        &self,
        graph_id: &str,
        route: QuestionRoute,
    ) -> Result<NextQuestionDto> {
        self.get(Endpoint::NextQuestion(graph_id, route)).await
    }

    async fn submit_answer(
        &self,
        graph_id: &str,
        submission: &SubmitAnswerDto,
    ) -> Result<SubmissionResultDto> {
        self.post(Endpoint::Answers(graph_id), submission).await
    }
}
