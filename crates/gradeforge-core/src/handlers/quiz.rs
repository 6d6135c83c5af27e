//! Quiz grading by positional exact match.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::model::{Assignment, AssignmentContent, Submission};
use crate::schema::{QuizAnswers, QuizContent};
use crate::scoring;
use crate::traits::{AssignmentHandler, ContentIssue, Grade};

/// Handler for `QUIZ` assignments.
///
/// Answer `i` is compared with question `i`'s correct answer using JSON
/// equality: no case folding, no numeric coercion (`"1" != 1`, `1 != 1.0`).
/// A `null` answer is never correct.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuizHandler;

impl QuizHandler {
    /// Score answers against a quiz. A quiz with no questions scores 0;
    /// missing trailing answers count as wrong.
    pub fn grade(content: &QuizContent, answers: &[Value]) -> u8 {
        let total = content.questions.len();
        if total == 0 {
            return 0;
        }
        let correct = content
            .questions
            .iter()
            .enumerate()
            .filter(|(i, question)| {
                answers
                    .get(*i)
                    .is_some_and(|answer| !answer.is_null() && *answer == question.correct_answer)
            })
            .count();
        scoring::percent(saturating_u32(correct), saturating_u32(total))
    }
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[async_trait]
impl AssignmentHandler for QuizHandler {
    fn name(&self) -> &str {
        "quiz"
    }

    fn validate(&self, content: &Value) -> bool {
        content
            .as_object()
            .and_then(|fields| fields.get("answers"))
            .is_some_and(Value::is_array)
    }

    async fn score(
        &self,
        submission: &Submission,
        assignment: &Assignment,
        _cancel: &CancellationToken,
    ) -> Grade {
        let AssignmentContent::Quiz(content) = &assignment.content else {
            return Grade::zero("assignment content is not a quiz");
        };
        match QuizAnswers::deserialize(&submission.content) {
            Ok(submitted) => Grade::new(Self::grade(content, &submitted.answers)),
            Err(_) => Grade::zero("invalid submission shape"),
        }
    }

    fn check_assignment(&self, assignment: &Assignment) -> Vec<ContentIssue> {
        let AssignmentContent::Quiz(content) = &assignment.content else {
            return vec![ContentIssue::new("assignment content is not a quiz")];
        };

        let mut issues = Vec::new();
        if content.questions.is_empty() {
            issues.push(ContentIssue::new(
                "quiz has no questions; every submission will score 0",
            ));
        }

        let mut seen_ids = HashSet::new();
        for (index, question) in content.questions.iter().enumerate() {
            let location = question
                .id
                .clone()
                .unwrap_or_else(|| format!("question {}", index + 1));
            if question.correct_answer.is_null() {
                issues.push(ContentIssue::at(&location, "no correct answer given"));
            }
            if let Some(id) = &question.id {
                if !seen_ids.insert(id.as_str()) {
                    issues.push(ContentIssue::at(
                        &location,
                        format!("duplicate question id: {id}"),
                    ));
                }
            }
        }
        issues
    }
}
