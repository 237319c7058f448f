//! Wire payloads and their mapping into domain values
//!
//! This module provides:
//! - Serde types that mirror the server's JSON field names exactly
//! - Pure mapping functions that rename fields, apply defaults and reject
//!   payloads missing an identifier or discriminant

mod mapper;
mod wire;

pub use mapper::{
    DEFAULT_PRECISION, course_from_dto, courses_from_dto, graph_summaries_from_dto,
    graph_summary_from_dto, knowledge_graph_from_dto, question_from_dto, selection_from_dto,
    submission_result_from_dto, submission_to_dto,
};
pub use wire::{
    AnswerDto, CourseDto, EdgeDto, GraphDto, MasteryUpdateDto, NextQuestionDto, NodeDto,
    QuestionDetailsDto, QuestionDto, SubmissionResultDto, SubmitAnswerDto, VisualizationDto,
};
