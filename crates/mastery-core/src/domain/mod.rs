//! Domain layer
//!
//! UI-shaped values produced by the DTO mapper. Everything here is an owned
//! value; shared state lives in the query cache.

pub mod catalog;
pub mod graph;
pub mod question;

pub use catalog::{Course, Enrollable, GraphSummary};
pub use graph::{DEFAULT_MASTERY, EdgeType, KnowledgeEdge, KnowledgeGraph, KnowledgeNode};
pub use question::{
    Answer, AnswerDetail, Calculation, Difficulty, FillInTheBlank, MAX_PRECISION, MasteryUpdate,
    MultipleChoice, NextQuestionSelection, Question, QuestionBody, QuestionRoute, QuestionType,
    Submission, SubmissionResult,
};
