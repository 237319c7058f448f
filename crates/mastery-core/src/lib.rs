//! Mastery Core Library
//!
//! This crate provides the client-side model of an adaptive learning platform:
//! - Domain types (courses, knowledge graphs, questions, answers)
//! - DTO mapping from the platform's JSON payloads
//! - Knowledge graph assembly for force-layout rendering
//! - Adaptive question sessions (fetch → submit → advance)
//! - A key-addressed query cache with de-duplication and atomic patches
//! - HTTP transport

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod domain;
pub mod dto;
pub mod error;
pub mod graph;
pub mod session;

pub use client::LearningClient;
pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::api::{HttpApi, LearningApi};
    pub use crate::cache::{QueryCache, QueryKey, QueryState};
    pub use crate::client::LearningClient;
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::session::{QuestionSession, SlotState, SubmitOutcome};
}

#[cfg(test)]
mod error_tests;
