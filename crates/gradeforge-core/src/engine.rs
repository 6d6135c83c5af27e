//! Evaluation service: the single entry point external collaborators call.
//!
//! Resolves the handler for an assignment's type, validates the submission
//! shape, scores it, and clamps the result into `[0, 100]`. Never persists,
//! never logs scores, never mutates its inputs.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::error::EngineError;
use crate::model::{Assignment, EvaluationResult, Submission};
use crate::registry::HandlerRegistry;
use crate::scoring;
use crate::traits::ContentIssue;

/// Reason attached to results for content that failed `validate`.
pub const INVALID_SHAPE_REASON: &str = "invalid submission shape";

/// Grades submissions using a frozen [`HandlerRegistry`].
#[derive(Debug, Clone)]
pub struct EvaluationService {
    registry: Arc<HandlerRegistry>,
}

impl EvaluationService {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Evaluate one submission.
    ///
    /// Only an unregistered assignment type is an error; every problem with
    /// the submission itself is reported through the returned result.
    pub async fn evaluate(
        &self,
        submission: &Submission,
        assignment: &Assignment,
    ) -> Result<EvaluationResult, EngineError> {
        self.evaluate_with_cancel(submission, assignment, &CancellationToken::new())
            .await
    }

    /// Evaluate one submission, abandoning any sandboxed run once `cancel`
    /// fires. A cancelled run scores 0.
    pub async fn evaluate_with_cancel(
        &self,
        submission: &Submission,
        assignment: &Assignment,
        cancel: &CancellationToken,
    ) -> Result<EvaluationResult, EngineError> {
        let handler = self.registry.lookup(assignment.assignment_type())?;

        if !handler.validate(&submission.content) {
            tracing::debug!(
                "submission {} rejected by '{}' handler: invalid shape",
                submission.id,
                handler.name()
            );
            return Ok(EvaluationResult::rejected(INVALID_SHAPE_REASON));
        }

        let grade = handler.score(submission, assignment, cancel).await;
        let score = scoring::clamp(grade.points);
        if i64::from(score) != grade.points {
            tracing::warn!(
                "'{}' handler returned an out-of-range score for submission {}; clamped",
                handler.name(),
                submission.id
            );
        }

        Ok(EvaluationResult::graded(
            score,
            assignment.pass_threshold,
            grade.reason,
        ))
    }

    /// Evaluate many independent submissions concurrently.
    ///
    /// At most `parallelism` evaluations run at once. Results come back in
    /// the order of `pairs`.
    pub async fn evaluate_many(
        &self,
        pairs: &[(Submission, Assignment)],
        parallelism: usize,
        cancel: &CancellationToken,
    ) -> Vec<Result<EvaluationResult, EngineError>> {
        let semaphore = Arc::new(Semaphore::new(parallelism.max(1)));
        let mut futures = FuturesUnordered::new();

        for (index, (submission, assignment)) in pairs.iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            futures.push(async move {
                // The semaphore is never closed, so acquire cannot fail.
                let _permit = semaphore.acquire().await.ok();
                (
                    index,
                    self.evaluate_with_cancel(submission, assignment, cancel)
                        .await,
                )
            });
        }

        let mut results: Vec<Option<Result<EvaluationResult, EngineError>>> =
            vec![None; pairs.len()];
        while let Some((index, result)) = futures.next().await {
            results[index] = Some(result);
        }
        results.into_iter().flatten().collect()
    }

    /// Problems with an assignment definition: the handler's own checks plus
    /// engine-level ones.
    pub fn check_assignment(
        &self,
        assignment: &Assignment,
    ) -> Result<Vec<ContentIssue>, EngineError> {
        let handler = self.registry.lookup(assignment.assignment_type())?;
        let mut issues = Vec::new();
        if assignment.pass_threshold > scoring::MAX_SCORE {
            issues.push(ContentIssue::new(format!(
                "passThreshold {} is above 100; no submission can pass",
                assignment.pass_threshold
            )));
        }
        if assignment.max_score == 0 {
            issues.push(ContentIssue::new("maxScore is 0"));
        }
        issues.extend(handler.check_assignment(assignment));
        Ok(issues)
    }
}
