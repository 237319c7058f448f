//! Adaptive quiz sessions

mod controller;

pub use controller::{ActiveQuestion, QuestionSession, SessionStats, SlotState, SubmitOutcome};
