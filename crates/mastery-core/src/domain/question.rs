//! Questions, answers and submissions
//!
//! Questions and answers are closed sum types sharing one discriminant
//! ([`QuestionType`]). A [`Submission`] can only be built from a question and
//! an answer of the same variant, so a cross-variant answer never reaches the
//! transport.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Discriminant shared by [`QuestionBody`] and [`Answer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    FillInTheBlank,
    Calculation,
}

impl QuestionType {
    /// Wire representation (`question_type`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MultipleChoice => "multiple_choice",
            Self::FillInTheBlank => "fill_in_the_blank",
            Self::Calculation => "calculation",
        }
    }

    /// Parse the wire representation
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "multiple_choice" => Some(Self::MultipleChoice),
            "fill_in_the_blank" => Some(Self::FillInTheBlank),
            "calculation" => Some(Self::Calculation),
            _ => None,
        }
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Question difficulty
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pick one of an ordered list of options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultipleChoice {
    pub options: Vec<String>,
    /// Index of the correct option, when the server discloses it up front
    pub correct_answer: Option<usize>,
}

impl MultipleChoice {
    /// Build an answer selecting the option at `index` (zero-based)
    pub fn select(&self, index: usize) -> Result<Answer> {
        if index >= self.options.len() {
            return Err(Error::OptionOutOfRange {
                index,
                available: self.options.len(),
            });
        }
        Ok(Answer::MultipleChoice {
            selected_option: index,
        })
    }

    /// Text of the option at `index`
    pub fn option(&self, index: usize) -> Option<&str> {
        self.options.get(index).map(String::as_str)
    }
}

/// Free-text answer compared against accepted spellings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillInTheBlank {
    pub expected_answers: Vec<String>,
}

impl FillInTheBlank {
    pub fn answer(&self, text: impl Into<String>) -> Answer {
        Answer::FillInTheBlank {
            text: text.into().trim().to_string(),
        }
    }
}

/// Largest number of decimal places a calculation question may grade to
pub const MAX_PRECISION: u32 = 15;

/// Numeric answer graded to a number of decimal places
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calculation {
    pub expected_answers: Vec<String>,
    /// Decimal places the answer is graded to
    pub precision: u32,
}

impl Calculation {
    pub fn answer(&self, value: f64) -> Answer {
        Answer::Calculation { value }
    }

    /// Format a value to this question's precision, capped at [`MAX_PRECISION`]
    pub fn format(&self, value: f64) -> String {
        format!("{:.*}", self.precision.min(MAX_PRECISION) as usize, value)
    }
}

/// Variant-specific part of a question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "question_type", rename_all = "snake_case")]
pub enum QuestionBody {
    MultipleChoice(MultipleChoice),
    FillInTheBlank(FillInTheBlank),
    Calculation(Calculation),
}

impl QuestionBody {
    pub fn question_type(&self) -> QuestionType {
        match self {
            Self::MultipleChoice(_) => QuestionType::MultipleChoice,
            Self::FillInTheBlank(_) => QuestionType::FillInTheBlank,
            Self::Calculation(_) => QuestionType::Calculation,
        }
    }
}

/// A quiz question. Its variant is fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question_id: String,
    pub text: String,
    pub difficulty: Difficulty,
    pub body: QuestionBody,
}

impl Question {
    pub fn question_type(&self) -> QuestionType {
        self.body.question_type()
    }

    /// Interpret raw user input with the control that matches this variant
    ///
    /// Multiple choice accepts a 1-based option number or an option letter
    /// (`a`, `b`, ...); calculation accepts any finite number.
    pub fn answer_from_input(&self, input: &str) -> Result<Answer> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::InvalidInput("answer is empty".to_string()));
        }

        match &self.body {
            QuestionBody::MultipleChoice(mc) => {
                let index = parse_option_index(input).ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "'{}' is not an option number or letter",
                        input
                    ))
                })?;
                mc.select(index)
            }
            QuestionBody::FillInTheBlank(fib) => Ok(fib.answer(input)),
            QuestionBody::Calculation(calc) => {
                let value: f64 = input
                    .parse()
                    .map_err(|_| Error::InvalidInput(format!("'{}' is not a number", input)))?;
                if !value.is_finite() {
                    return Err(Error::InvalidInput(format!("'{}' is not finite", input)));
                }
                Ok(calc.answer(value))
            }
        }
    }
}

fn parse_option_index(input: &str) -> Option<usize> {
    if let Ok(n) = input.parse::<usize>() {
        return n.checked_sub(1);
    }
    let mut chars = input.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => {
            Some((c.to_ascii_lowercase() as u8 - b'a') as usize)
        }
        _ => None,
    }
}

/// An answer to one question variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "question_type", rename_all = "snake_case")]
pub enum Answer {
    MultipleChoice { selected_option: usize },
    FillInTheBlank { text: String },
    Calculation { value: f64 },
}

impl Answer {
    pub fn question_type(&self) -> QuestionType {
        match self {
            Self::MultipleChoice { .. } => QuestionType::MultipleChoice,
            Self::FillInTheBlank { .. } => QuestionType::FillInTheBlank,
            Self::Calculation { .. } => QuestionType::Calculation,
        }
    }
}

/// A variant-checked answer bound to its question
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    question_id: String,
    answer: Answer,
}

impl Submission {
    /// Pair an answer with the question it answers
    ///
    /// Fails with [`Error::VariantMismatch`] when the discriminants differ and
    /// with [`Error::OptionOutOfRange`] for an unknown multiple choice option.
    pub fn new(question: &Question, answer: Answer) -> Result<Self> {
        match (&question.body, &answer) {
            (QuestionBody::MultipleChoice(mc), Answer::MultipleChoice { selected_option }) => {
                mc.select(*selected_option)?;
            }
            (QuestionBody::FillInTheBlank(_), Answer::FillInTheBlank { .. })
            | (QuestionBody::Calculation(_), Answer::Calculation { .. }) => {}
            (body, answer) => {
                return Err(Error::VariantMismatch {
                    expected: body.question_type().as_str(),
                    found: answer.question_type().as_str(),
                });
            }
        }

        Ok(Self {
            question_id: question.question_id.clone(),
            answer,
        })
    }

    pub fn question_id(&self) -> &str {
        &self.question_id
    }

    pub fn answer(&self) -> &Answer {
        &self.answer
    }
}

/// Which endpoint selects the next question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionRoute {
    /// The caller owns the graph
    Owner,
    /// The caller is an enrolled learner
    Learner,
}

impl QuestionRoute {
    pub fn for_caller(is_owner: bool) -> Self {
        if is_owner { Self::Owner } else { Self::Learner }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Learner => "learner",
        }
    }
}

/// Result of asking the selection service for the next question
///
/// `question == None` means no question is available for now. That is a
/// normal terminal value and not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextQuestionSelection {
    pub question: Option<Question>,
    pub node_id: Option<String>,
    /// Opaque explanation from the selection service, displayed as-is
    pub selection_reason: String,
    /// Opaque diagnostic score
    pub priority_score: Option<f64>,
}

impl NextQuestionSelection {
    pub fn is_exhausted(&self) -> bool {
        self.question.is_none()
    }
}

/// New mastery estimate reported after grading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteryUpdate {
    pub node_id: String,
    pub mastery_score: f64,
}

/// Outcome of grading a submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub is_correct: bool,
    pub feedback: Option<String>,
    /// Correct answer as rendered by the server
    pub correct_answer: Option<String>,
    pub mastery_update: Option<MasteryUpdate>,
}

/// Variant-specific explanation shown after a submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "question_type", rename_all = "snake_case")]
pub enum AnswerDetail {
    MultipleChoice {
        selected: Option<String>,
        correct: Option<String>,
    },
    FillInTheBlank {
        submitted: String,
        accepted: Vec<String>,
    },
    Calculation {
        submitted: String,
        expected: Vec<String>,
        precision: u32,
    },
}

impl AnswerDetail {
    /// Select the detail variant matching the answered question
    pub fn new(question: &Question, submission: &Submission, result: &SubmissionResult) -> Self {
        match &question.body {
            QuestionBody::MultipleChoice(mc) => {
                let selected = match submission.answer() {
                    Answer::MultipleChoice { selected_option } => {
                        mc.option(*selected_option).map(str::to_string)
                    }
                    Answer::FillInTheBlank { .. } | Answer::Calculation { .. } => None,
                };
                let correct = mc
                    .correct_answer
                    .and_then(|i| mc.option(i).map(str::to_string))
                    .or_else(|| result.correct_answer.clone());
                Self::MultipleChoice { selected, correct }
            }
            QuestionBody::FillInTheBlank(fib) => {
                let submitted = match submission.answer() {
                    Answer::FillInTheBlank { text } => text.clone(),
                    Answer::MultipleChoice { .. } | Answer::Calculation { .. } => String::new(),
                };
                let mut accepted = fib.expected_answers.clone();
                if accepted.is_empty()
                    && let Some(correct) = &result.correct_answer
                {
                    accepted.push(correct.clone());
                }
                Self::FillInTheBlank { submitted, accepted }
            }
            QuestionBody::Calculation(calc) => {
                let submitted = match submission.answer() {
                    Answer::Calculation { value } => calc.format(*value),
                    Answer::MultipleChoice { .. } | Answer::FillInTheBlank { .. } => String::new(),
                };
                let mut expected = calc.expected_answers.clone();
                if expected.is_empty()
                    && let Some(correct) = &result.correct_answer
                {
                    expected.push(correct.clone());
                }
                Self::Calculation {
                    submitted,
                    expected,
                    precision: calc.precision,
                }
            }
        }
    }
}
