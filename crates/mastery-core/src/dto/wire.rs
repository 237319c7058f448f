//! Wire payloads
//!
//! Field names here are the server's JSON contract and must not be renamed.
//! Identifiers and discriminants are `Option` so that their absence reaches
//! the mapper as a typed shape error instead of a generic decode failure.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `GET /courses/` element and `GET /courses/{id}/`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseDto {
    pub course_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub node_count: Option<u32>,
    #[serde(default)]
    pub is_enrolled: Option<bool>,
    #[serde(default)]
    pub is_primary: Option<bool>,
    /// Older servers flag the primary course as a template
    #[serde(default)]
    pub is_template: Option<bool>,
}

/// `GET /graphs/templates` element and `GET /graphs/{id}/`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDto {
    pub graph_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub node_count: Option<u32>,
    #[serde(default)]
    pub is_enrolled: Option<bool>,
    #[serde(default)]
    pub is_template: Option<bool>,
}

/// Node inside a visualization payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeDto {
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub mastery_score: Option<f64>,
}

/// Edge inside a visualization payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeDto {
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(rename = "type", default)]
    pub edge_type: Option<String>,
}

/// `GET /graphs/{id}/visualization`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualizationDto {
    #[serde(default)]
    pub nodes: Option<Vec<NodeDto>>,
    #[serde(default)]
    pub edges: Option<Vec<EdgeDto>>,
}

/// Variant payload of a question; may also carry the discriminant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionDetailsDto {
    #[serde(default)]
    pub question_type: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    /// Index or option text
    #[serde(default)]
    pub correct_answer: Option<Value>,
    /// Strings or numbers
    #[serde(default)]
    pub expected_answers: Option<Vec<Value>>,
    #[serde(default)]
    pub precision: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionDto {
    pub question_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub question_type: Option<String>,
    #[serde(default)]
    pub details: Option<QuestionDetailsDto>,
}

/// Next-question response for both owner and learner routes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NextQuestionDto {
    #[serde(default)]
    pub question: Option<QuestionDto>,
    #[serde(default)]
    pub node_id: Option<String>,
    #[serde(default)]
    pub selection_reason: Option<String>,
    #[serde(default)]
    pub priority_score: Option<f64>,
}

/// Answer body, discriminated by `question_type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "question_type", rename_all = "snake_case")]
pub enum AnswerDto {
    MultipleChoice { selected_option: usize },
    FillInTheBlank { text_answer: String },
    Calculation { numeric_answer: f64 },
}

/// Answer submission request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitAnswerDto {
    pub question_id: String,
    pub answer: AnswerDto,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MasteryUpdateDto {
    pub node_id: Option<String>,
    #[serde(alias = "mastery_score")]
    pub new_mastery_score: Option<f64>,
}

/// Answer submission response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResultDto {
    #[serde(default)]
    pub is_correct: Option<bool>,
    #[serde(default, alias = "explanation")]
    pub feedback: Option<String>,
    #[serde(default)]
    pub correct_answer: Option<Value>,
    #[serde(default)]
    pub mastery_update: Option<MasteryUpdateDto>,
}
