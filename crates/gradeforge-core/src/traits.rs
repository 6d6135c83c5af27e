//! Core trait definitions for assignment handlers and execution strategies.
//!
//! [`AssignmentHandler`] is the extension point for new assignment types.
//! [`ExecutionStrategy`] is the sandbox seam the code handler delegates to;
//! `gradeforge-runner` provides a local implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::ExecutionFault;
use crate::model::{Assignment, Submission};
use crate::schema::TestCase;

// ---------------------------------------------------------------------------
// Assignment handler trait
// ---------------------------------------------------------------------------

/// Validation and scoring for one assignment type.
#[async_trait]
pub trait AssignmentHandler: Send + Sync {
    /// Human-readable handler name (e.g. "quiz").
    fn name(&self) -> &str;

    /// Whether submission content has the shape this handler can score.
    fn validate(&self, content: &Value) -> bool;

    /// Score a submission whose content already passed [`validate`](Self::validate).
    ///
    /// Implementations should stop early once `cancel` fires.
    async fn score(
        &self,
        submission: &Submission,
        assignment: &Assignment,
        cancel: &CancellationToken,
    ) -> Grade;

    /// Problems with an assignment definition that would make grading
    /// meaningless. Empty by default.
    fn check_assignment(&self, _assignment: &Assignment) -> Vec<ContentIssue> {
        Vec::new()
    }
}

/// Raw handler output, before the engine clamps it into `[0, 100]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grade {
    pub points: i64,
    pub reason: Option<String>,
}

impl Grade {
    pub fn new(points: impl Into<i64>) -> Self {
        Self {
            points: points.into(),
            reason: None,
        }
    }

    /// Zero points, with the reason scoring could not run.
    pub fn zero(reason: impl Into<String>) -> Self {
        Self {
            points: 0,
            reason: Some(reason.into()),
        }
    }
}

/// A problem found in an assignment definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentIssue {
    /// Question or test case the issue refers to, if any.
    pub location: Option<String>,
    pub message: String,
}

impl ContentIssue {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            location: None,
            message: message.into(),
        }
    }

    pub fn at(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: Some(location.into()),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Execution strategy trait
// ---------------------------------------------------------------------------

/// Runs submitted source against test cases in an isolated, time-boxed sandbox.
///
/// The engine treats implementations as untrusted: counts are sanity-checked
/// and the call is always wrapped in its own timeout.
#[async_trait]
pub trait ExecutionStrategy: Send + Sync {
    /// Human-readable strategy name (e.g. "local").
    fn name(&self) -> &str;

    /// Run the request once. Must not retry internally.
    async fn run(&self, request: &ExecutionRequest) -> Result<ExecutionOutcome, ExecutionFault>;
}

/// Request to run submitted code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    /// The submitted source text.
    pub source: String,
    /// Language to run it as, if the assignment or submission names one.
    #[serde(default)]
    pub language: Option<String>,
    /// Test cases to run, in order.
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    /// Budget for the whole run.
    pub timeout: Duration,
}

/// How many test cases passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub passed: u32,
    pub total: u32,
}

impl ExecutionOutcome {
    pub fn new(passed: u32, total: u32) -> Self {
        Self { passed, total }
    }
}
