//! Mastery Core Integration Tests
//!
//! The client, cache and session run against an in-memory `LearningApi`.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use mastery_core::{
    Error, LearningClient, Result,
    api::LearningApi,
    cache::{QueryCache, QueryKey, QueryState},
    domain::{Answer, AnswerDetail, Course, QuestionRoute},
    dto::{
        CourseDto, EdgeDto, GraphDto, MasteryUpdateDto, NextQuestionDto, NodeDto,
        QuestionDetailsDto, QuestionDto, SubmissionResultDto, SubmitAnswerDto, VisualizationDto,
    },
    graph::MasteryLevel,
    session::{QuestionSession, SlotState, SubmitOutcome},
};

// ========== Fake API ==========

#[derive(Default)]
struct FakeApi {
    courses: Mutex<Vec<CourseDto>>,
    graphs: Mutex<Vec<GraphDto>>,
    visualization: Mutex<VisualizationDto>,
    questions: Mutex<VecDeque<NextQuestionDto>>,
    result: Mutex<SubmissionResultDto>,
    submitted: Mutex<Vec<SubmitAnswerDto>>,
    calls: Mutex<Vec<String>>,
    latency: Option<Duration>,
    fail_enroll: AtomicBool,
    fail_next: AtomicBool,
    fail_submit: AtomicBool,
}

impl FakeApi {
    fn new() -> Self {
        Self {
            courses: Mutex::new(vec![course_dto("c1"), course_dto("c2")]),
            graphs: Mutex::new(vec![graph_dto("g1")]),
            visualization: Mutex::new(visualization_dto()),
            result: Mutex::new(correct_result_dto()),
            ..Default::default()
        }
    }

    fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn with_questions(self, questions: Vec<NextQuestionDto>) -> Self {
        *self.questions.lock().unwrap() = questions.into();
        self
    }

    async fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn count(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

fn not_found(what: &str) -> Error {
    Error::Http {
        status: 404,
        message: format!("{} not found", what),
    }
}

#[async_trait]
impl LearningApi for FakeApi {
    async fn list_courses(&self) -> Result<Vec<CourseDto>> {
        self.record("list_courses".to_string()).await;
        Ok(self.courses.lock().unwrap().clone())
    }

    async fn get_course(&self, course_id: &str) -> Result<CourseDto> {
        self.record(format!("get_course:{}", course_id)).await;
        self.courses
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.course_id.as_deref() == Some(course_id))
            .cloned()
            .ok_or_else(|| not_found("Course"))
    }

    async fn enroll_course(&self, course_id: &str) -> Result<()> {
        self.record(format!("enroll_course:{}", course_id)).await;
        if self.fail_enroll.load(Ordering::SeqCst) {
            return Err(Error::Http {
                status: 500,
                message: "enrollment failed".to_string(),
            });
        }
        for course in self.courses.lock().unwrap().iter_mut() {
            if course.course_id.as_deref() == Some(course_id) {
                course.is_enrolled = Some(true);
            }
        }
        Ok(())
    }

    async fn list_graph_templates(&self) -> Result<Vec<GraphDto>> {
        self.record("list_graph_templates".to_string()).await;
        Ok(self.graphs.lock().unwrap().clone())
    }

    async fn get_graph(&self, graph_id: &str) -> Result<GraphDto> {
        self.record(format!("get_graph:{}", graph_id)).await;
        self.graphs
            .lock()
            .unwrap()
            .iter()
            .find(|g| g.graph_id.as_deref() == Some(graph_id))
            .cloned()
            .ok_or_else(|| not_found("Graph"))
    }

    async fn enroll_graph(&self, graph_id: &str) -> Result<()> {
        self.record(format!("enroll_graph:{}", graph_id)).await;
        if self.fail_enroll.load(Ordering::SeqCst) {
            return Err(Error::Transport("connection reset".to_string()));
        }
        for graph in self.graphs.lock().unwrap().iter_mut() {
            if graph.graph_id.as_deref() == Some(graph_id) {
                graph.is_enrolled = Some(true);
            }
        }
        Ok(())
    }

    async fn graph_visualization(&self, graph_id: &str) -> Result<VisualizationDto> {
        self.record(format!("graph_visualization:{}", graph_id)).await;
        Ok(self.visualization.lock().unwrap().clone())
    }

    async fn next_question(
        &self,
        graph_id: &str,
        route: QuestionRoute,
    ) -> Result<NextQuestionDto> {
        self.record(format!("next_question:{}:{}", graph_id, route.as_str()))
            .await;
        if self.fail_next.load(Ordering::SeqCst) {
            return Err(Error::Transport("connection refused".to_string()));
        }
        Ok(self
            .questions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(exhausted_dto))
    }

    async fn submit_answer(
        &self,
        graph_id: &str,
        submission: &SubmitAnswerDto,
    ) -> Result<SubmissionResultDto> {
        self.record(format!("submit_answer:{}", graph_id)).await;
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(Error::Transport("timed out".to_string()));
        }
        self.submitted.lock().unwrap().push(submission.clone());
        Ok(self.result.lock().unwrap().clone())
    }
}

// ========== Payload builders ==========

fn course_dto(id: &str) -> CourseDto {
    CourseDto {
        course_id: Some(id.to_string()),
        name: Some(format!("Course {}", id)),
        node_count: Some(4),
        is_enrolled: Some(false),
        is_primary: None,
        is_template: None,
    }
}

fn graph_dto(id: &str) -> GraphDto {
    GraphDto {
        graph_id: Some(id.to_string()),
        name: Some(format!("Graph {}", id)),
        node_count: Some(3),
        is_enrolled: Some(false),
        is_template: Some(true),
    }
}

fn node_dto(id: &str, mastery: Option<f64>) -> NodeDto {
    NodeDto {
        id: Some(id.to_string()),
        name: Some(id.to_uppercase()),
        description: None,
        mastery_score: mastery,
    }
}

fn edge_dto(source: &str, target: &str, edge_type: &str) -> EdgeDto {
    EdgeDto {
        source_id: Some(source.to_string()),
        target_id: Some(target.to_string()),
        edge_type: Some(edge_type.to_string()),
    }
}

fn visualization_dto() -> VisualizationDto {
    VisualizationDto {
        nodes: Some(vec![
            node_dto("n1", Some(0.9)),
            node_dto("n2", Some(0.5)),
            node_dto("n3", None),
        ]),
        edges: Some(vec![
            edge_dto("n1", "n2", "IS_PREREQUISITE_FOR"),
            edge_dto("n2", "n3", "HAS_SUBTOPIC"),
            edge_dto("n3", "n9", "IS_PREREQUISITE_FOR"),
        ]),
    }
}

fn mc_question_dto(id: &str) -> QuestionDto {
    QuestionDto {
        question_id: Some(id.to_string()),
        text: Some("What is 2 + 2?".to_string()),
        difficulty: Some("easy".to_string()),
        question_type: Some("multiple_choice".to_string()),
        details: Some(QuestionDetailsDto {
            options: Some(vec!["3".to_string(), "4".to_string(), "5".to_string()]),
            correct_answer: Some(json!(1)),
            ..Default::default()
        }),
    }
}

fn calc_question_dto(id: &str) -> QuestionDto {
    QuestionDto {
        question_id: Some(id.to_string()),
        text: Some("Compute pi to two places".to_string()),
        difficulty: None,
        question_type: None,
        details: Some(QuestionDetailsDto {
            question_type: Some("calculation".to_string()),
            expected_answers: Some(vec![json!(3.14)]),
            precision: Some(2),
            ..Default::default()
        }),
    }
}

fn selection_dto(question: QuestionDto) -> NextQuestionDto {
    NextQuestionDto {
        question: Some(question),
        node_id: Some("n1".to_string()),
        selection_reason: Some("lowest_mastery".to_string()),
        priority_score: Some(0.8),
    }
}

fn exhausted_dto() -> NextQuestionDto {
    NextQuestionDto {
        question: None,
        node_id: None,
        selection_reason: Some("mastery_complete".to_string()),
        priority_score: None,
    }
}

fn correct_result_dto() -> SubmissionResultDto {
    SubmissionResultDto {
        is_correct: Some(true),
        feedback: Some("Well done".to_string()),
        correct_answer: Some(json!("4")),
        mastery_update: Some(MasteryUpdateDto {
            node_id: Some("n1".to_string()),
            new_mastery_score: Some(0.55),
        }),
    }
}

fn client(api: FakeApi) -> LearningClient<FakeApi> {
    LearningClient::new(api, QueryCache::new(Duration::from_secs(300)))
}

// ========== Catalog and enrollment ==========

#[tokio::test]
async fn test_course_reads_are_cached() {
    let client = client(FakeApi::new());

    let first = client.courses().await.unwrap();
    let second = client.courses().await.unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
    assert_eq!(client.api().count("list_courses"), 1);
}

#[tokio::test]
async fn test_enroll_course_patches_list_and_detail() {
    let client = client(FakeApi::new());
    client.courses().await.unwrap();
    client.course("c1").await.unwrap();

    let patch = client.enroll_course("c1").await.unwrap();
    assert!(patch.list_patched);
    assert!(patch.detail_patched);

    // Served from the patched cache, no refetch
    let list = client.courses().await.unwrap();
    let detail = client.course("c1").await.unwrap();
    assert!(list.iter().find(|c| c.id == "c1").unwrap().is_enrolled);
    assert!(!list.iter().find(|c| c.id == "c2").unwrap().is_enrolled);
    assert!(detail.is_enrolled);
    assert_eq!(client.api().count("list_courses"), 1);
    assert_eq!(client.api().count("get_course"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_pending_enrollment_leaves_cache_unchanged() {
    let client = client(FakeApi::new().with_latency(Duration::from_millis(20)));
    client.courses().await.unwrap();
    client.course("c1").await.unwrap();

    let (patch, during) = tokio::join!(client.enroll_course("c1"), async {
        tokio::time::sleep(Duration::from_millis(5)).await;
        let list: Vec<Course> = client
            .cache()
            .get(&QueryKey::courses())
            .await
            .unwrap()
            .unwrap();
        let detail: Course = client
            .cache()
            .get(&QueryKey::course("c1"))
            .await
            .unwrap()
            .unwrap();
        (list, detail)
    });

    let (list, detail) = during;
    assert!(!list[0].is_enrolled);
    assert!(!detail.is_enrolled);

    assert!(patch.unwrap().detail_patched);
    let detail = client.course("c1").await.unwrap();
    assert!(detail.is_enrolled);
}

#[tokio::test]
async fn test_failed_enrollment_changes_nothing() {
    let api = FakeApi::new();
    api.fail_enroll.store(true, Ordering::SeqCst);
    let client = client(api);
    client.courses().await.unwrap();
    client.course("c1").await.unwrap();
    let list_version = client.cache().version(&QueryKey::courses()).await;
    let detail_version = client.cache().version(&QueryKey::course("c1")).await;

    let err = client.enroll_course("c1").await.unwrap_err();
    assert_eq!(err.code(), "E101");

    let list: Vec<Course> = client
        .cache()
        .get(&QueryKey::courses())
        .await
        .unwrap()
        .unwrap();
    assert!(list.iter().all(|c| !c.is_enrolled));
    assert_eq!(client.cache().version(&QueryKey::courses()).await, list_version);
    assert_eq!(
        client.cache().version(&QueryKey::course("c1")).await,
        detail_version
    );
}

#[tokio::test]
async fn test_enroll_graph_without_cached_detail() {
    let client = client(FakeApi::new());
    let templates = client.graph_templates().await.unwrap();
    assert!(templates[0].is_primary);
    assert!(!templates[0].is_enrolled);

    let patch = client.enroll_graph("g1").await.unwrap();
    assert!(patch.list_patched);
    assert!(!patch.detail_patched);

    let templates = client.graph_templates().await.unwrap();
    assert!(templates[0].is_enrolled);

    // The detail was never cached, so it is fetched now
    let detail = client.graph("g1").await.unwrap();
    assert!(detail.is_enrolled);
    assert_eq!(client.api().count("get_graph:g1"), 1);
}

#[tokio::test]
async fn test_unknown_course_is_http_404() {
    let client = client(FakeApi::new());
    let err = client.course("missing").await.unwrap_err();

    assert!(err.is_transport());
    assert!(matches!(err, Error::Http { status: 404, .. }));
    assert!(matches!(
        client.cache().state::<Course>(&QueryKey::course("missing")).await,
        QueryState::Error(_)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_reads_issue_one_request() {
    let client = client(FakeApi::new().with_latency(Duration::from_millis(20)));

    let (a, b, c) = tokio::join!(client.graph("g1"), client.graph("g1"), client.course("c1"));

    assert_eq!(a.unwrap(), b.unwrap());
    assert!(c.is_ok());
    assert_eq!(client.api().count("get_graph:g1"), 1);
    assert_eq!(client.api().count("get_course:c1"), 1);
}

// ========== Knowledge graph ==========

#[tokio::test]
async fn test_knowledge_graph_is_assembled_and_closed() {
    let client = client(FakeApi::new());
    let graph = client.knowledge_graph("g1").await.unwrap();

    assert_eq!(graph.nodes.len(), 3);
    assert_eq!(graph.links.len(), 2);
    assert_eq!(graph.dropped_edges, 1);
    assert!(graph.is_closed());

    assert_eq!(graph.node("n1").unwrap().level, MasteryLevel::High);
    assert_eq!(graph.node("n2").unwrap().level, MasteryLevel::Medium);
    let defaulted = graph.node("n3").unwrap();
    assert_eq!(defaulted.mastery_score, 0.2);
    assert_eq!(defaulted.level, MasteryLevel::Low);
}

#[tokio::test]
async fn test_shape_error_does_not_touch_other_keys() {
    let api = FakeApi::new();
    api.visualization.lock().unwrap().nodes = Some(vec![NodeDto {
        id: None,
        name: Some("nameless".to_string()),
        ..Default::default()
    }]);
    let client = client(api);
    client.courses().await.unwrap();

    let err = client.knowledge_graph("g1").await.unwrap_err();
    assert!(err.is_shape());

    let courses: Option<Vec<Course>> = client.cache().get(&QueryKey::courses()).await.unwrap();
    assert_eq!(courses.unwrap().len(), 2);
    assert!(
        client
            .cache()
            .snapshot(&QueryKey::knowledge_graph("g1"))
            .await
            .is_none()
    );
}

// ========== Question sessions ==========

#[tokio::test]
async fn test_session_answer_flow() {
    let api = FakeApi::new().with_questions(vec![selection_dto(mc_question_dto("q1"))]);
    let client = client(api);
    client.knowledge_graph("g1").await.unwrap();
    let mut session = QuestionSession::new(client.clone(), "g1", false);

    let state = session.fetch_next().await.unwrap();
    let SlotState::Unanswered(active) = state else {
        panic!("expected an unanswered question, got {}", state.name());
    };
    assert_eq!(active.question.question_id, "q1");
    assert_eq!(active.selection_reason, "lowest_mastery");
    assert_eq!(active.priority_score, Some(0.8));

    let outcome = session.submit_input("b").await.unwrap();
    let SubmitOutcome::Accepted(result) = outcome else {
        panic!("expected the answer to be graded");
    };
    assert!(result.is_correct);
    assert_eq!(result.mastery_update.unwrap().mastery_score, 0.55);

    let SlotState::Submitted { detail, .. } = session.state() else {
        panic!("expected submitted state");
    };
    assert_eq!(
        detail,
        &AnswerDetail::MultipleChoice {
            selected: Some("4".to_string()),
            correct: Some("4".to_string()),
        }
    );

    let submitted = client.api().submitted.lock().unwrap().clone();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].question_id, "q1");

    // Grading marks the mastery view stale
    assert!(
        client
            .cache()
            .snapshot(&QueryKey::knowledge_graph("g1"))
            .await
            .unwrap()
            .is_stale
    );
    assert_eq!(session.stats().answered, 1);
    assert_eq!(session.stats().correct, 1);
}

#[tokio::test]
async fn test_second_submit_is_ignored() {
    let api = FakeApi::new().with_questions(vec![selection_dto(mc_question_dto("q1"))]);
    let mut session = QuestionSession::new(client(api), "g1", false);
    session.fetch_next().await.unwrap();

    let first = session
        .submit(Answer::MultipleChoice { selected_option: 1 })
        .await
        .unwrap();
    let second = session
        .submit(Answer::MultipleChoice { selected_option: 0 })
        .await
        .unwrap();

    assert!(matches!(first, SubmitOutcome::Accepted(_)));
    assert_eq!(second, SubmitOutcome::Ignored);
    assert_eq!(session.stats().answered, 1);
}

#[tokio::test]
async fn test_mismatched_answer_is_rejected_before_sending() {
    let api = FakeApi::new().with_questions(vec![selection_dto(mc_question_dto("q1"))]);
    let client = client(api);
    let mut session = QuestionSession::new(client.clone(), "g1", false);
    session.fetch_next().await.unwrap();

    let err = session
        .submit(Answer::Calculation { value: 4.0 })
        .await
        .unwrap_err();
    assert_eq!(
        err,
        Error::VariantMismatch {
            expected: "multiple_choice",
            found: "calculation",
        }
    );

    let err = session
        .submit(Answer::MultipleChoice { selected_option: 7 })
        .await
        .unwrap_err();
    assert_eq!(err.code(), "E301");

    assert_eq!(client.api().count("submit_answer"), 0);
    assert_eq!(session.state().name(), "unanswered");
}

#[tokio::test]
async fn test_failed_submit_keeps_question_open() {
    let api = FakeApi::new().with_questions(vec![selection_dto(calc_question_dto("q2"))]);
    api.fail_submit.store(true, Ordering::SeqCst);
    let client = client(api);
    let mut session = QuestionSession::new(client.clone(), "g1", true);
    session.fetch_next().await.unwrap();

    let err = session.submit_input("3.14159").await.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(session.state().name(), "unanswered");

    client.api().fail_submit.store(false, Ordering::SeqCst);
    let outcome = session.submit_input("3.14159").await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Accepted(_)));

    let SlotState::Submitted { detail, .. } = session.state() else {
        panic!("expected submitted state");
    };
    assert_eq!(
        detail,
        &AnswerDetail::Calculation {
            submitted: "3.14".to_string(),
            expected: vec!["3.14".to_string()],
            precision: 2,
        }
    );
}

#[tokio::test]
async fn test_exhausted_then_advance_fetches_once() {
    let client = client(FakeApi::new());
    let mut session = QuestionSession::new(client.clone(), "g1", false);

    let state = session.fetch_next().await.unwrap();
    let SlotState::Exhausted(selection) = state else {
        panic!("expected exhausted state, got {}", state.name());
    };
    assert_eq!(selection.selection_reason, "mastery_complete");

    // Submitting with nothing on display sends nothing
    assert_eq!(
        session.submit_input("a").await.unwrap(),
        SubmitOutcome::Ignored
    );

    let before = client.api().count("next_question");
    session.advance().await.unwrap();
    assert_eq!(client.api().count("next_question"), before + 1);
    assert_eq!(session.state().name(), "exhausted");
    assert_eq!(client.api().count("submit_answer"), 0);
}

#[tokio::test]
async fn test_advance_after_submit_shows_next_question() {
    let api = FakeApi::new().with_questions(vec![
        selection_dto(mc_question_dto("q1")),
        selection_dto(calc_question_dto("q2")),
    ]);
    let mut session = QuestionSession::new(client(api), "g1", false);
    session.fetch_next().await.unwrap();
    session.submit_input("2").await.unwrap();

    let state = session.advance().await.unwrap();
    assert_eq!(state.question().unwrap().question_id, "q2");
    assert_eq!(session.stats().fetches, 2);
}

#[tokio::test]
async fn test_fetch_failure_leaves_slot_idle() {
    let api = FakeApi::new();
    api.fail_next.store(true, Ordering::SeqCst);
    let mut session = QuestionSession::new(client(api), "g1", false);

    let err = session.fetch_next().await.unwrap_err();
    assert_eq!(err.code(), "E100");
    assert_eq!(session.state(), &SlotState::Idle);
}

#[tokio::test]
async fn test_session_route_follows_ownership() {
    let client = client(FakeApi::new());

    let mut owner = QuestionSession::new(client.clone(), "g1", true);
    owner.fetch_next().await.unwrap();
    let mut learner = QuestionSession::new(client.clone(), "g2", false);
    learner.fetch_next().await.unwrap();

    assert_eq!(owner.route(), QuestionRoute::Owner);
    assert_eq!(learner.route(), QuestionRoute::Learner);
    assert_eq!(
        client.api().calls(),
        vec![
            "next_question:g1:owner".to_string(),
            "next_question:g2:learner".to_string(),
        ]
    );
}
