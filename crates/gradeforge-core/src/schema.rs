//! Per-type content schemas.
//!
//! Assignment-side content arrives from the course-management layer and is
//! deserialized straight into these types. Submission-side content is learner
//! supplied, so it stays a raw [`serde_json::Value`] until a handler's
//! `validate` has accepted its shape; only then is it decoded into
//! [`QuizAnswers`] or [`CodeSubmission`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Quiz
// ---------------------------------------------------------------------------

/// Assignment content for a quiz: an ordered list of questions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizContent {
    #[serde(default)]
    pub questions: Vec<QuizQuestion>,
}

/// A single quiz question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    /// Optional stable identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Question text shown to the learner.
    #[serde(default)]
    pub question: String,
    /// The answer a submission must match exactly at this position.
    #[serde(default)]
    pub correct_answer: Value,
    /// Optional explanation of the correct answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl QuizQuestion {
    pub fn new(correct_answer: impl Into<Value>) -> Self {
        Self {
            id: None,
            question: String::new(),
            correct_answer: correct_answer.into(),
            explanation: None,
        }
    }
}

/// Decoded quiz submission: answers aligned with questions by position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuizAnswers {
    pub answers: Vec<Value>,
}

// ---------------------------------------------------------------------------
// Code
// ---------------------------------------------------------------------------

/// Assignment content for a programming task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeContent {
    /// Problem statement.
    #[serde(default, alias = "description")]
    pub statement: String,
    /// Language the submission must be written in (e.g. "python").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Ordered test cases run by the execution strategy.
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    /// Overall execution budget for one evaluation, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_execution_time_ms: Option<u64>,
}

/// One input/expected-output pair for a code assignment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Fed to the program on stdin.
    #[serde(default)]
    pub input: Value,
    /// What the program must print.
    #[serde(default)]
    pub expected_output: Value,
    /// Hidden tests are never shown to learners.
    #[serde(default)]
    pub hidden: bool,
    /// Per-test limit in milliseconds, capped by the overall budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit_ms: Option<u64>,
}

impl TestCase {
    pub fn new(id: &str, input: impl Into<Value>, expected_output: impl Into<Value>) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            input: input.into(),
            expected_output: expected_output.into(),
            hidden: false,
            time_limit_ms: None,
        }
    }
}

/// Decoded code submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeSubmission {
    pub code: String,
    #[serde(default)]
    pub language: Option<String>,
}

impl CodeSubmission {
    /// Decode a learner payload. Only `code` must be a string; a `language`
    /// that is not a string is ignored rather than rejecting the submission.
    pub fn from_content(content: &Value) -> Option<Self> {
        let code = content.get("code")?.as_str()?;
        Some(Self {
            code: code.to_string(),
            language: content
                .get("language")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}
