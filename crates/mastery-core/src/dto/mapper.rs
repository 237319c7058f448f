//! Wire payload → domain value mapping
//!
//! Every function is pure. A missing identifier or discriminant is rejected
//! before any domain value is built; optional display fields get defaults.

use std::collections::HashSet;

use serde_json::Value;
use tracing::warn;

use crate::domain::graph::normalize_mastery;
use crate::domain::{
    Answer, Calculation, Course, DEFAULT_MASTERY, Difficulty, EdgeType, FillInTheBlank,
    GraphSummary, KnowledgeEdge, KnowledgeGraph, KnowledgeNode, MAX_PRECISION, MasteryUpdate,
    MultipleChoice, NextQuestionSelection, Question, QuestionBody, QuestionType, Submission,
    SubmissionResult,
};
use crate::error::{Error, Result};

use super::wire::{
    AnswerDto, CourseDto, GraphDto, NextQuestionDto, QuestionDetailsDto, QuestionDto,
    SubmissionResultDto, SubmitAnswerDto, VisualizationDto,
};

/// Decimal places used when a calculation question does not state a precision
pub const DEFAULT_PRECISION: u32 = 2;

fn require(value: Option<String>, entity: &'static str, field: &'static str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::MissingField { entity, field }),
    }
}

pub fn course_from_dto(dto: CourseDto) -> Result<Course> {
    Ok(Course {
        id: require(dto.course_id, "course", "course_id")?,
        name: dto.name.unwrap_or_default(),
        node_count: dto.node_count.unwrap_or(0),
        is_enrolled: dto.is_enrolled.unwrap_or(false),
        is_primary: dto.is_primary.or(dto.is_template).unwrap_or(false),
    })
}

pub fn courses_from_dto(dtos: Vec<CourseDto>) -> Result<Vec<Course>> {
    dtos.into_iter().map(course_from_dto).collect()
}

pub fn graph_summary_from_dto(dto: GraphDto) -> Result<GraphSummary> {
    Ok(GraphSummary {
        id: require(dto.graph_id, "graph", "graph_id")?,
        name: dto.name.unwrap_or_default(),
        node_count: dto.node_count.unwrap_or(0),
        is_enrolled: dto.is_enrolled.unwrap_or(false),
        is_primary: dto.is_template.unwrap_or(false),
    })
}

pub fn graph_summaries_from_dto(dtos: Vec<GraphDto>) -> Result<Vec<GraphSummary>> {
    dtos.into_iter().map(graph_summary_from_dto).collect()
}

/// Map a visualization payload
///
/// Nodes without an id fail the whole payload. Edges with a missing endpoint
/// or an unknown relation type are skipped; dangling edges are left for the
/// assembler to drop. Duplicate node ids keep the first occurrence.
pub fn knowledge_graph_from_dto(dto: VisualizationDto) -> Result<KnowledgeGraph> {
    let mut seen = HashSet::new();
    let mut nodes = Vec::new();

    for node in dto.nodes.unwrap_or_default() {
        let id = require(node.id, "node", "id")?;
        if !seen.insert(id.clone()) {
            warn!(node_id = %id, "Duplicate node id in visualization payload, keeping first");
            continue;
        }
        nodes.push(KnowledgeNode {
            id,
            name: node.name.unwrap_or_default(),
            description: node.description.unwrap_or_default(),
            mastery_score: node.mastery_score.map_or(DEFAULT_MASTERY, normalize_mastery),
        });
    }

    let mut edges = Vec::new();
    for edge in dto.edges.unwrap_or_default() {
        let (Some(source_id), Some(target_id)) = (edge.source_id, edge.target_id) else {
            warn!("Edge without both endpoints in visualization payload, skipping");
            continue;
        };
        let Some(edge_type) = edge.edge_type.as_deref().and_then(EdgeType::from_wire) else {
            warn!(
                source = %source_id,
                target = %target_id,
                edge_type = ?edge.edge_type,
                "Unknown edge type, skipping"
            );
            continue;
        };
        edges.push(KnowledgeEdge {
            source_id,
            target_id,
            edge_type,
        });
    }

    Ok(KnowledgeGraph { nodes, edges })
}

/// Map a question payload into the tagged union
///
/// The discriminant is read from `question_type`, falling back to
/// `details.question_type`. Neither being present is a shape error.
pub fn question_from_dto(dto: QuestionDto) -> Result<Question> {
    let question_id = require(dto.question_id, "question", "question_id")?;
    let details = dto.details.unwrap_or_default();

    let raw_type = dto
        .question_type
        .or_else(|| details.question_type.clone())
        .ok_or(Error::MissingField {
            entity: "question",
            field: "question_type",
        })?;
    let question_type = QuestionType::parse(&raw_type).ok_or_else(|| {
        Error::InvalidPayload(format!("unknown question_type '{}'", raw_type))
    })?;

    let difficulty = match dto.difficulty.as_deref() {
        None => Difficulty::default(),
        Some(raw) => Difficulty::parse(raw)
            .ok_or_else(|| Error::InvalidPayload(format!("unknown difficulty '{}'", raw)))?,
    };

    let body = match question_type {
        QuestionType::MultipleChoice => QuestionBody::MultipleChoice(multiple_choice(details)?),
        QuestionType::FillInTheBlank => QuestionBody::FillInTheBlank(FillInTheBlank {
            expected_answers: answer_strings(details.expected_answers),
        }),
        QuestionType::Calculation => {
            let precision = details.precision.unwrap_or(DEFAULT_PRECISION);
            if precision > MAX_PRECISION {
                return Err(Error::InvalidPayload(format!(
                    "precision {} exceeds {} decimal places",
                    precision, MAX_PRECISION
                )));
            }
            QuestionBody::Calculation(Calculation {
                expected_answers: answer_strings(details.expected_answers),
                precision,
            })
        }
    };

    Ok(Question {
        question_id,
        text: dto.text.unwrap_or_default(),
        difficulty,
        body,
    })
}

fn multiple_choice(details: QuestionDetailsDto) -> Result<MultipleChoice> {
    let options = details.options.unwrap_or_default();
    if options.is_empty() {
        return Err(Error::InvalidPayload(
            "multiple_choice question has no options".to_string(),
        ));
    }

    let correct_answer = details
        .correct_answer
        .as_ref()
        .and_then(|value| option_index(value, &options));

    Ok(MultipleChoice {
        options,
        correct_answer,
    })
}

/// Resolve a correct answer given either as an index or as the option text
fn option_index(value: &Value, options: &[String]) -> Option<usize> {
    let index = match value {
        Value::Number(n) => n.as_u64().map(|i| i as usize),
        Value::String(s) => options.iter().position(|o| o == s),
        _ => None,
    }?;
    (index < options.len()).then_some(index)
}

fn answer_strings(values: Option<Vec<Value>>) -> Vec<String> {
    values
        .unwrap_or_default()
        .iter()
        .filter_map(value_to_string)
        .collect()
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

pub fn selection_from_dto(dto: NextQuestionDto) -> Result<NextQuestionSelection> {
    Ok(NextQuestionSelection {
        question: dto.question.map(question_from_dto).transpose()?,
        node_id: dto.node_id,
        selection_reason: dto.selection_reason.unwrap_or_default(),
        priority_score: dto.priority_score,
    })
}

pub fn submission_to_dto(submission: &Submission) -> SubmitAnswerDto {
    let answer = match submission.answer() {
        Answer::MultipleChoice { selected_option } => AnswerDto::MultipleChoice {
            selected_option: *selected_option,
        },
        Answer::FillInTheBlank { text } => AnswerDto::FillInTheBlank {
            text_answer: text.clone(),
        },
        Answer::Calculation { value } => AnswerDto::Calculation {
            numeric_answer: *value,
        },
    };

    SubmitAnswerDto {
        question_id: submission.question_id().to_string(),
        answer,
    }
}

pub fn submission_result_from_dto(dto: SubmissionResultDto) -> Result<SubmissionResult> {
    let is_correct = dto.is_correct.ok_or(Error::MissingField {
        entity: "submission result",
        field: "is_correct",
    })?;

    let mastery_update = match dto.mastery_update {
        None => None,
        Some(update) => Some(MasteryUpdate {
            node_id: require(update.node_id, "mastery update", "node_id")?,
            mastery_score: normalize_mastery(update.new_mastery_score.ok_or(
                Error::MissingField {
                    entity: "mastery update",
                    field: "new_mastery_score",
                },
            )?),
        }),
    };

    Ok(SubmissionResult {
        is_correct,
        feedback: dto.feedback,
        correct_answer: dto.correct_answer.as_ref().and_then(value_to_string),
        mastery_update,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Enrollable;
    use serde_json::json;

    fn question(value: Value) -> Result<Question> {
        question_from_dto(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn test_course_defaults() {
        let dto: CourseDto =
            serde_json::from_value(json!({"course_id": "c1", "name": "Algebra", "node_count": 12}))
                .unwrap();
        let course = course_from_dto(dto).unwrap();

        assert_eq!(course.id(), "c1");
        assert_eq!(course.node_count, 12);
        assert!(!course.is_enrolled);
        assert!(!course.is_primary);
    }

    #[test]
    fn test_course_primary_falls_back_to_template_flag() {
        let template: CourseDto =
            serde_json::from_value(json!({"course_id": "c1", "is_template": true})).unwrap();
        assert!(course_from_dto(template).unwrap().is_primary);

        let explicit: CourseDto = serde_json::from_value(
            json!({"course_id": "c1", "is_primary": false, "is_template": true}),
        )
        .unwrap();
        assert!(!course_from_dto(explicit).unwrap().is_primary);
    }

    #[test]
    fn test_null_display_fields_default_to_empty() {
        let course: CourseDto =
            serde_json::from_value(json!({"course_id": "c1", "name": null})).unwrap();
        assert_eq!(course_from_dto(course).unwrap().name, "");

        let graph: GraphDto =
            serde_json::from_value(json!({"graph_id": "g1", "name": null})).unwrap();
        assert_eq!(graph_summary_from_dto(graph).unwrap().name, "");

        let viz: VisualizationDto =
            serde_json::from_value(json!({"nodes": [{"id": "a", "name": null}]})).unwrap();
        assert_eq!(knowledge_graph_from_dto(viz).unwrap().nodes[0].name, "");

        let q = question(json!({
            "question_id": "q1",
            "text": null,
            "question_type": "fill_in_the_blank"
        }))
        .unwrap();
        assert_eq!(q.text, "");
    }

    #[test]
    fn test_course_without_id_is_rejected() {
        let dto: CourseDto = serde_json::from_value(json!({"name": "Algebra"})).unwrap();
        assert_eq!(
            course_from_dto(dto).unwrap_err(),
            Error::MissingField {
                entity: "course",
                field: "course_id"
            }
        );
    }

    #[test]
    fn test_graph_primary_comes_from_template_flag() {
        let dto: GraphDto = serde_json::from_value(
            json!({"graph_id": "g1", "name": "Physics", "is_template": true, "is_enrolled": true}),
        )
        .unwrap();
        let graph = graph_summary_from_dto(dto).unwrap();

        assert!(graph.is_primary);
        assert!(graph.is_enrolled);
        assert_eq!(graph.node_count, 0);
    }

    #[test]
    fn test_knowledge_graph_mapping() {
        let dto: VisualizationDto = serde_json::from_value(json!({
            "nodes": [
                {"id": "a", "name": "Sets", "mastery_score": 0.7},
                {"id": "b", "name": "Functions"},
                {"id": "a", "name": "Duplicate", "mastery_score": 0.1}
            ],
            "edges": [
                {"source_id": "a", "target_id": "b", "type": "IS_PREREQUISITE_FOR"},
                {"source_id": "a", "target_id": "b", "type": "RELATED_TO"},
                {"source_id": "a", "type": "HAS_SUBTOPIC"}
            ]
        }))
        .unwrap();

        let graph = knowledge_graph_from_dto(dto).unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.node("a").unwrap().name, "Sets");
        assert_eq!(graph.node("b").unwrap().mastery_score, DEFAULT_MASTERY);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].edge_type, EdgeType::Prerequisite);
    }

    #[test]
    fn test_knowledge_graph_missing_edges_is_empty() {
        let dto: VisualizationDto =
            serde_json::from_value(json!({"nodes": [{"id": "a"}], "edges": null})).unwrap();
        let graph = knowledge_graph_from_dto(dto).unwrap();
        assert!(graph.edges.is_empty());

        let dto: VisualizationDto = serde_json::from_value(json!({})).unwrap();
        assert!(knowledge_graph_from_dto(dto).unwrap().is_empty());
    }

    #[test]
    fn test_knowledge_graph_node_without_id_is_rejected() {
        let dto: VisualizationDto =
            serde_json::from_value(json!({"nodes": [{"name": "Orphan"}]})).unwrap();
        assert!(knowledge_graph_from_dto(dto).unwrap_err().is_shape());
    }

    #[test]
    fn test_question_discriminant_from_details() {
        let q = question(json!({
            "question_id": "q1",
            "text": "2 + 2",
            "difficulty": "easy",
            "details": {"question_type": "calculation", "expected_answers": [4], "precision": 0}
        }))
        .unwrap();

        assert_eq!(q.question_type(), QuestionType::Calculation);
        assert_eq!(q.difficulty, Difficulty::Easy);
        match q.body {
            QuestionBody::Calculation(calc) => {
                assert_eq!(calc.expected_answers, vec!["4".to_string()]);
                assert_eq!(calc.precision, 0);
            }
            other => panic!("unexpected body: {:?}", other),
        }
    }

    #[test]
    fn test_question_precision_is_bounded() {
        let err = question(json!({
            "question_id": "q1",
            "question_type": "calculation",
            "details": {"expected_answers": [1], "precision": 100000000}
        }))
        .unwrap_err();
        assert!(matches!(err, Error::InvalidPayload(_)));
        assert!(err.is_shape());

        let q = question(json!({
            "question_id": "q1",
            "question_type": "calculation",
            "details": {"precision": MAX_PRECISION}
        }))
        .unwrap();
        match q.body {
            QuestionBody::Calculation(calc) => assert_eq!(calc.precision, MAX_PRECISION),
            other => panic!("unexpected body: {:?}", other),
        }
    }

    #[test]
    fn test_question_without_discriminant_is_rejected() {
        let err = question(json!({
            "question_id": "q1",
            "text": "?",
            "details": {"options": ["a", "b"]}
        }))
        .unwrap_err();

        assert_eq!(
            err,
            Error::MissingField {
                entity: "question",
                field: "question_type"
            }
        );
    }

    #[test]
    fn test_question_with_unknown_discriminant_is_rejected() {
        let err = question(json!({"question_id": "q1", "question_type": "essay"})).unwrap_err();
        assert!(matches!(err, Error::InvalidPayload(_)));
    }

    #[test]
    fn test_multiple_choice_requires_options() {
        let err = question(json!({"question_id": "q1", "question_type": "multiple_choice"}))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPayload(_)));
    }

    #[test]
    fn test_multiple_choice_correct_answer_by_text_or_index() {
        let by_text = question(json!({
            "question_id": "q1",
            "question_type": "multiple_choice",
            "details": {"options": ["x", "y"], "correct_answer": "y"}
        }))
        .unwrap();
        let by_index = question(json!({
            "question_id": "q1",
            "question_type": "multiple_choice",
            "details": {"options": ["x", "y"], "correct_answer": 0}
        }))
        .unwrap();

        match (by_text.body, by_index.body) {
            (QuestionBody::MultipleChoice(a), QuestionBody::MultipleChoice(b)) => {
                assert_eq!(a.correct_answer, Some(1));
                assert_eq!(b.correct_answer, Some(0));
            }
            other => panic!("unexpected bodies: {:?}", other),
        }
    }

    #[test]
    fn test_selection_without_question() {
        let dto: NextQuestionDto = serde_json::from_value(
            json!({"question": null, "selection_reason": "mastery_complete"}),
        )
        .unwrap();
        let selection = selection_from_dto(dto).unwrap();

        assert!(selection.is_exhausted());
        assert_eq!(selection.selection_reason, "mastery_complete");
        assert_eq!(selection.priority_score, None);
    }

    #[test]
    fn test_submission_wire_format() {
        let q = question(json!({
            "question_id": "q9",
            "question_type": "multiple_choice",
            "details": {"options": ["a", "b", "c"]}
        }))
        .unwrap();
        let submission = Submission::new(&q, q.answer_from_input("3").unwrap()).unwrap();

        let wire = serde_json::to_value(submission_to_dto(&submission)).unwrap();
        assert_eq!(
            wire,
            json!({
                "question_id": "q9",
                "answer": {"question_type": "multiple_choice", "selected_option": 2}
            })
        );
    }

    #[test]
    fn test_submission_result_mapping() {
        let dto: SubmissionResultDto = serde_json::from_value(json!({
            "is_correct": true,
            "explanation": "Well done",
            "correct_answer": 4,
            "mastery_update": {"node_id": "n1", "mastery_score": 0.72}
        }))
        .unwrap();
        let result = submission_result_from_dto(dto).unwrap();

        assert!(result.is_correct);
        assert_eq!(result.feedback.as_deref(), Some("Well done"));
        assert_eq!(result.correct_answer.as_deref(), Some("4"));
        assert_eq!(
            result.mastery_update,
            Some(MasteryUpdate {
                node_id: "n1".to_string(),
                mastery_score: 0.72
            })
        );
    }

    #[test]
    fn test_submission_result_requires_verdict() {
        let dto: SubmissionResultDto = serde_json::from_value(json!({"feedback": "?"})).unwrap();
        assert!(submission_result_from_dto(dto).unwrap_err().is_shape());
    }
}
