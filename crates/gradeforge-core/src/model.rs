//! Core data model types for gradeforge.
//!
//! Assignments and submissions are created by the course-management layer
//! and handed to the engine by reference. The engine only ever produces a
//! fresh [`EvaluationResult`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EngineError;
use crate::schema::{CodeContent, QuizContent};
use crate::scoring;

/// The closed set of assignment types this build knows about.
///
/// Not every type has a handler; which ones are gradable is decided by the
/// [`HandlerRegistry`](crate::registry::HandlerRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentType {
    #[serde(alias = "quiz")]
    Quiz,
    #[serde(alias = "code")]
    Code,
    #[serde(alias = "essay")]
    Essay,
    #[serde(alias = "project")]
    Project,
    #[serde(alias = "upload")]
    Upload,
    #[serde(alias = "peer_review")]
    PeerReview,
}

impl AssignmentType {
    pub const ALL: [AssignmentType; 6] = [
        AssignmentType::Quiz,
        AssignmentType::Code,
        AssignmentType::Essay,
        AssignmentType::Project,
        AssignmentType::Upload,
        AssignmentType::PeerReview,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentType::Quiz => "QUIZ",
            AssignmentType::Code => "CODE",
            AssignmentType::Essay => "ESSAY",
            AssignmentType::Project => "PROJECT",
            AssignmentType::Upload => "UPLOAD",
            AssignmentType::PeerReview => "PEER_REVIEW",
        }
    }
}

impl fmt::Display for AssignmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignmentType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        AssignmentType::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| EngineError::UnknownAssignmentType(s.to_string()))
    }
}

/// Type tag plus the content schema that belongs to it.
///
/// Serialized as `"type": "QUIZ", "content": {...}` next to the other
/// assignment fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentContent {
    #[serde(alias = "quiz")]
    Quiz(QuizContent),
    #[serde(alias = "code")]
    Code(CodeContent),
    #[serde(alias = "essay")]
    Essay(Value),
    #[serde(alias = "project")]
    Project(Value),
    #[serde(alias = "upload")]
    Upload(Value),
    #[serde(alias = "peer_review")]
    PeerReview(Value),
}

impl AssignmentContent {
    pub fn assignment_type(&self) -> AssignmentType {
        match self {
            AssignmentContent::Quiz(_) => AssignmentType::Quiz,
            AssignmentContent::Code(_) => AssignmentType::Code,
            AssignmentContent::Essay(_) => AssignmentType::Essay,
            AssignmentContent::Project(_) => AssignmentType::Project,
            AssignmentContent::Upload(_) => AssignmentType::Upload,
            AssignmentContent::PeerReview(_) => AssignmentType::PeerReview,
        }
    }
}

/// A gradable unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: String,
    #[serde(flatten)]
    pub content: AssignmentContent,
    /// Points the assignment is worth on the course gradebook.
    #[serde(default = "default_max_score")]
    pub max_score: u32,
    /// Minimum 0–100 score that counts as a pass.
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: u8,
}

impl Assignment {
    pub fn new(id: &str, content: AssignmentContent) -> Self {
        Self {
            id: id.to_string(),
            content,
            max_score: default_max_score(),
            pass_threshold: default_pass_threshold(),
        }
    }

    pub fn with_pass_threshold(mut self, threshold: u8) -> Self {
        self.pass_threshold = threshold;
        self
    }

    pub fn assignment_type(&self) -> AssignmentType {
        self.content.assignment_type()
    }
}

fn default_max_score() -> u32 {
    100
}

fn default_pass_threshold() -> u8 {
    60
}

/// A learner's attempt at an assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub assignment_id: String,
    #[serde(default, alias = "userId")]
    pub submitter_id: String,
    /// Raw learner payload; its shape is checked by the handler's `validate`.
    #[serde(default)]
    pub content: Value,
    #[serde(default = "Utc::now")]
    pub submitted_at: DateTime<Utc>,
}

impl Submission {
    pub fn new(id: &str, assignment_id: &str, content: Value) -> Self {
        Self {
            id: id.to_string(),
            assignment_id: assignment_id.to_string(),
            submitter_id: String::new(),
            content,
            submitted_at: Utc::now(),
        }
    }
}

/// Outcome of grading one submission against its assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    /// Integer score in `[0, 100]`.
    pub score: u8,
    pub passed: bool,
    pub evaluated_at: DateTime<Utc>,
    /// Why scoring could not run as requested, if it could not.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl EvaluationResult {
    pub(crate) fn graded(score: u8, pass_threshold: u8, reason: Option<String>) -> Self {
        Self {
            score,
            passed: score >= pass_threshold,
            evaluated_at: Utc::now(),
            reason,
        }
    }

    pub(crate) fn rejected(reason: &str) -> Self {
        Self {
            score: 0,
            passed: false,
            evaluated_at: Utc::now(),
            reason: Some(reason.to_string()),
        }
    }

    /// The score rescaled onto an assignment's `max_score`.
    pub fn points(&self, max_score: u32) -> u32 {
        scoring::scale_to(self.score, max_score)
    }
}
