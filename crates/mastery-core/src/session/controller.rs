//! Adaptive question session
//!
//! One question slot per session, driven through
//! `Idle → Unanswered | Exhausted → Submitted → (advance) → Unanswered | Exhausted`.
//! Methods take `&mut self`, so two submissions for the same slot can never
//! overlap; a submission outside the Unanswered state is ignored.

use serde::Serialize;
use tracing::{debug, info};

use crate::api::LearningApi;
use crate::client::LearningClient;
use crate::domain::{
    Answer, AnswerDetail, NextQuestionSelection, Question, QuestionRoute, Submission,
    SubmissionResult,
};
use crate::error::Result;

/// A question currently offered to the learner
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveQuestion {
    pub question: Question,
    pub node_id: Option<String>,
    pub selection_reason: String,
    pub priority_score: Option<f64>,
}

/// State of the question slot
#[derive(Debug, Clone, PartialEq)]
pub enum SlotState {
    /// Nothing fetched yet, or the last fetch after `advance` failed
    Idle,
    /// A question is displayed and awaits an answer
    Unanswered(ActiveQuestion),
    /// The answer was graded
    Submitted {
        active: ActiveQuestion,
        submission: Submission,
        result: SubmissionResult,
        detail: AnswerDetail,
    },
    /// The selection service had no question to offer
    Exhausted(NextQuestionSelection),
}

impl SlotState {
    fn from_selection(selection: NextQuestionSelection) -> Self {
        match selection.question {
            Some(question) => Self::Unanswered(ActiveQuestion {
                question,
                node_id: selection.node_id,
                selection_reason: selection.selection_reason,
                priority_score: selection.priority_score,
            }),
            None => Self::Exhausted(selection),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Unanswered(_) => "unanswered",
            Self::Submitted { .. } => "submitted",
            Self::Exhausted(_) => "exhausted",
        }
    }

    /// The question on display, if any
    pub fn question(&self) -> Option<&Question> {
        match self {
            Self::Unanswered(active) | Self::Submitted { active, .. } => Some(&active.question),
            Self::Idle | Self::Exhausted(_) => None,
        }
    }
}

/// What happened to a submit call
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The answer was graded
    Accepted(SubmissionResult),
    /// The slot was not awaiting an answer; nothing was sent
    Ignored,
}

/// Running tally for one session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub fetches: u32,
    pub answered: u32,
    pub correct: u32,
}

/// Drives the fetch → submit → advance loop for one graph
pub struct QuestionSession<A: LearningApi + 'static> {
    client: LearningClient<A>,
    graph_id: String,
    route: QuestionRoute,
    state: SlotState,
    stats: SessionStats,
}

impl<A: LearningApi + 'static> std::fmt::Debug for QuestionSession<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuestionSession")
            .field("graph_id", &self.graph_id)
            .field("route", &self.route)
            .field("state", &self.state.name())
            .finish()
    }
}

impl<A: LearningApi + 'static> QuestionSession<A> {
    /// Create an idle session; `is_owner` selects the owner or learner route
    pub fn new(client: LearningClient<A>, graph_id: impl Into<String>, is_owner: bool) -> Self {
        Self {
            client,
            graph_id: graph_id.into(),
            route: QuestionRoute::for_caller(is_owner),
            state: SlotState::Idle,
            stats: SessionStats::default(),
        }
    }

    pub fn graph_id(&self) -> &str {
        &self.graph_id
    }

    pub fn route(&self) -> QuestionRoute {
        self.route
    }

    pub fn state(&self) -> &SlotState {
        &self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Fetch the next question into the slot
    ///
    /// On failure the slot keeps its previous state and the error is returned;
    /// nothing is retried.
    pub async fn fetch_next(&mut self) -> Result<&SlotState> {
        debug!(graph_id = %self.graph_id, route = self.route.as_str(), "Fetching next question");
        self.stats.fetches += 1;

        let selection = self.client.next_question(&self.graph_id, self.route).await?;
        self.state = SlotState::from_selection(selection);

        if let SlotState::Exhausted(selection) = &self.state {
            info!(
                graph_id = %self.graph_id,
                reason = %selection.selection_reason,
                "No question available"
            );
        }
        Ok(&self.state)
    }

    /// Submit an answer for the displayed question
    ///
    /// Only valid while Unanswered; otherwise returns [`SubmitOutcome::Ignored`]
    /// without contacting the server. An answer of another variant is
    /// rejected before anything is sent. If grading fails the slot stays
    /// Unanswered.
    pub async fn submit(&mut self, answer: Answer) -> Result<SubmitOutcome> {
        let SlotState::Unanswered(active) = &self.state else {
            debug!(state = self.state.name(), "Ignoring submit outside unanswered state");
            return Ok(SubmitOutcome::Ignored);
        };

        let submission = Submission::new(&active.question, answer)?;
        let result = self.client.submit_answer(&self.graph_id, &submission).await?;
        let detail = AnswerDetail::new(&active.question, &submission, &result);

        self.stats.answered += 1;
        if result.is_correct {
            self.stats.correct += 1;
        }

        self.state = SlotState::Submitted {
            active: active.clone(),
            submission,
            result: result.clone(),
            detail,
        };
        Ok(SubmitOutcome::Accepted(result))
    }

    /// Parse raw input with the displayed question's control, then submit it
    pub async fn submit_input(&mut self, input: &str) -> Result<SubmitOutcome> {
        let answer = match &self.state {
            SlotState::Unanswered(active) => active.question.answer_from_input(input)?,
            SlotState::Idle | SlotState::Submitted { .. } | SlotState::Exhausted(_) => {
                return Ok(SubmitOutcome::Ignored);
            }
        };
        self.submit(answer).await
    }

    /// Discard the current slot and fetch a new question
    ///
    /// Valid from every state, including Exhausted, and issues exactly one
    /// fetch.
    pub async fn advance(&mut self) -> Result<&SlotState> {
        self.state = SlotState::Idle;
        self.fetch_next().await
    }
}
