//! Code grading delegated to an execution strategy.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::ExecutionFault;
use crate::model::{Assignment, AssignmentContent, Submission};
use crate::schema::{CodeContent, CodeSubmission};
use crate::scoring;
use crate::traits::{
    AssignmentHandler, ContentIssue, ExecutionOutcome, ExecutionRequest, ExecutionStrategy, Grade,
};

/// Handler for `CODE` assignments.
///
/// Runs the submission once through its [`ExecutionStrategy`] under a hard
/// timeout and turns the pass rate into a score. Any fault becomes a zero
/// with a reason; nothing is retried.
pub struct CodeHandler {
    strategy: Arc<dyn ExecutionStrategy>,
    timeout: Duration,
}

impl CodeHandler {
    pub fn new(strategy: Arc<dyn ExecutionStrategy>, timeout: Duration) -> Self {
        Self { strategy, timeout }
    }

    /// The configured bound, tightened by the assignment's own budget.
    fn budget(&self, content: &CodeContent) -> Duration {
        content
            .max_execution_time_ms
            .map(Duration::from_millis)
            .map_or(self.timeout, |limit| limit.min(self.timeout))
    }

    async fn execute(
        &self,
        request: &ExecutionRequest,
        cancel: &CancellationToken,
    ) -> Result<ExecutionOutcome, ExecutionFault> {
        let run = tokio::time::timeout(request.timeout, self.strategy.run(request));
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ExecutionFault::Cancelled),
            finished = run => finished.map_err(|_| ExecutionFault::Timeout(request.timeout))??,
        };

        let sent = u32::try_from(request.test_cases.len()).unwrap_or(u32::MAX);
        if outcome.passed > outcome.total || outcome.total != sent {
            return Err(ExecutionFault::InconsistentReport {
                passed: outcome.passed,
                total: outcome.total,
            });
        }
        Ok(outcome)
    }
}

#[async_trait]
impl AssignmentHandler for CodeHandler {
    fn name(&self) -> &str {
        "code"
    }

    fn validate(&self, content: &Value) -> bool {
        content
            .as_object()
            .and_then(|fields| fields.get("code"))
            .is_some_and(Value::is_string)
    }

    async fn score(
        &self,
        submission: &Submission,
        assignment: &Assignment,
        cancel: &CancellationToken,
    ) -> Grade {
        let AssignmentContent::Code(content) = &assignment.content else {
            return Grade::zero("assignment content is not a code task");
        };
        let Some(submitted) = CodeSubmission::from_content(&submission.content) else {
            return Grade::zero("invalid submission shape");
        };
        if content.test_cases.is_empty() {
            return Grade::zero("assignment defines no test cases");
        }

        let request = ExecutionRequest {
            source: submitted.code,
            language: content.language.clone().or(submitted.language),
            test_cases: content.test_cases.clone(),
            timeout: self.budget(content),
        };

        match self.execute(&request, cancel).await {
            Ok(outcome) => Grade::new(scoring::percent(outcome.passed, outcome.total)),
            Err(fault) => {
                tracing::warn!(
                    "code execution via '{}' failed for submission {}: {fault}",
                    self.strategy.name(),
                    submission.id
                );
                Grade::zero(format!("execution fault: {fault}"))
            }
        }
    }

    fn check_assignment(&self, assignment: &Assignment) -> Vec<ContentIssue> {
        let AssignmentContent::Code(content) = &assignment.content else {
            return vec![ContentIssue::new("assignment content is not a code task")];
        };

        let mut issues = Vec::new();
        if content.statement.trim().is_empty() {
            issues.push(ContentIssue::new("problem statement is empty"));
        }
        if content.test_cases.is_empty() {
            issues.push(ContentIssue::new(
                "no test cases; every submission will score 0",
            ));
        } else if content.test_cases.iter().all(|t| t.hidden) {
            issues.push(ContentIssue::new(
                "every test case is hidden; learners see no examples",
            ));
        }
        if content.max_execution_time_ms == Some(0) {
            issues.push(ContentIssue::new("maxExecutionTimeMs is 0"));
        }

        let mut seen_ids = HashSet::new();
        for (index, test) in content.test_cases.iter().enumerate() {
            let location = if test.id.is_empty() {
                format!("test {}", index + 1)
            } else {
                test.id.clone()
            };
            if test.expected_output.is_null() {
                issues.push(ContentIssue::at(&location, "no expected output given"));
            }
            if test.time_limit_ms == Some(0) {
                issues.push(ContentIssue::at(&location, "timeLimitMs is 0"));
            }
            if !test.id.is_empty() && !seen_ids.insert(test.id.as_str()) {
                issues.push(ContentIssue::at(
                    &location,
                    format!("duplicate test id: {}", test.id),
                ));
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TestCase;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Strategy that returns a canned result after an optional delay.
    struct Scripted {
        result: Result<ExecutionOutcome, ExecutionFault>,
        delay: Duration,
        calls: AtomicU32,
        last_request: Mutex<Option<ExecutionRequest>>,
    }

    impl Scripted {
        fn new(result: Result<ExecutionOutcome, ExecutionFault>) -> Arc<Self> {
            Arc::new(Self {
                result,
                delay: Duration::ZERO,
                calls: AtomicU32::new(0),
                last_request: Mutex::new(None),
            })
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                result: Ok(ExecutionOutcome::new(1, 1)),
                delay,
                calls: AtomicU32::new(0),
                last_request: Mutex::new(None),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ExecutionStrategy for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn run(
            &self,
            request: &ExecutionRequest,
        ) -> Result<ExecutionOutcome, ExecutionFault> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.result.clone()
        }
    }

    fn code_assignment(tests: usize) -> Assignment {
        Assignment::new(
            "code-1",
            AssignmentContent::Code(CodeContent {
                statement: "Double n".into(),
                language: Some("python".into()),
                test_cases: (0..tests)
                    .map(|i| TestCase::new(&format!("t{i}"), i as i64, 2 * i as i64))
                    .collect(),
                max_execution_time_ms: None,
            }),
        )
    }

    fn idle_handler() -> CodeHandler {
        CodeHandler::new(
            Scripted::new(Ok(ExecutionOutcome::new(0, 0))),
            Duration::from_secs(1),
        )
    }

    fn submission(code: &str) -> Submission {
        Submission::new("s1", "code-1", json!({ "code": code }))
    }

    async fn score_with(strategy: Arc<Scripted>, tests: usize) -> Grade {
        let handler = CodeHandler::new(strategy, Duration::from_secs(5));
        handler
            .score(
                &submission("print(int(input()) * 2)"),
                &code_assignment(tests),
                &CancellationToken::new(),
            )
            .await
    }

    #[test]
    fn validate_requires_code_string() {
        let handler = idle_handler();
        assert!(handler.validate(&json!({ "code": "print(1)" })));
        assert!(handler.validate(&json!({ "code": "" })));
        assert!(!handler.validate(&json!({})));
        assert!(!handler.validate(&json!({ "code": 42 })));
        assert!(!handler.validate(&json!({ "code": null })));
        assert!(!handler.validate(&json!("print(1)")));
        assert!(!handler.validate(&Value::Null));
    }

    #[tokio::test]
    async fn pass_rate_becomes_score() {
        let strategy = Scripted::new(Ok(ExecutionOutcome::new(3, 4)));
        let grade = score_with(Arc::clone(&strategy), 4).await;
        assert_eq!(grade, Grade::new(75));
        assert_eq!(strategy.calls(), 1);
    }

    #[tokio::test]
    async fn pass_rate_rounds_half_up() {
        let grade = score_with(Scripted::new(Ok(ExecutionOutcome::new(1, 8))), 8).await;
        assert_eq!(grade.points, 13);
    }

    #[tokio::test]
    async fn request_carries_source_tests_and_language() {
        let strategy = Scripted::new(Ok(ExecutionOutcome::new(2, 2)));
        score_with(Arc::clone(&strategy), 2).await;
        let request = strategy.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.source, "print(int(input()) * 2)");
        assert_eq!(request.language.as_deref(), Some("python"));
        assert_eq!(request.test_cases.len(), 2);
        assert_eq!(request.timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn assignment_budget_tightens_timeout() {
        let strategy = Scripted::new(Ok(ExecutionOutcome::new(1, 1)));
        let handler = CodeHandler::new(
            Arc::clone(&strategy) as Arc<dyn ExecutionStrategy>,
            Duration::from_secs(5),
        );
        let mut assignment = code_assignment(1);
        if let AssignmentContent::Code(content) = &mut assignment.content {
            content.max_execution_time_ms = Some(250);
        }
        handler
            .score(&submission("x"), &assignment, &CancellationToken::new())
            .await;
        let request = strategy.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.timeout, Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_strategy_times_out_to_zero() {
        let strategy = Scripted::slow(Duration::from_secs(3600));
        let handler = CodeHandler::new(
            Arc::clone(&strategy) as Arc<dyn ExecutionStrategy>,
            Duration::from_secs(2),
        );
        let grade = handler
            .score(
                &submission("while True: pass"),
                &code_assignment(1),
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(grade.points, 0);
        let reason = grade.reason.unwrap();
        assert!(reason.contains("execution fault"), "{reason}");
        assert!(reason.contains("timed out"), "{reason}");
        assert_eq!(strategy.calls(), 1);
    }

    #[tokio::test]
    async fn strategy_faults_map_to_zero_with_reason() {
        for fault in [
            ExecutionFault::Crashed("segfault".into()),
            ExecutionFault::Unavailable("no python".into()),
            ExecutionFault::Timeout(Duration::from_secs(1)),
        ] {
            let strategy = Scripted::new(Err(fault.clone()));
            let grade = score_with(Arc::clone(&strategy), 2).await;
            assert_eq!(grade.points, 0);
            assert_eq!(grade.reason, Some(format!("execution fault: {fault}")));
            assert_eq!(strategy.calls(), 1, "faults must not be retried");
        }
    }

    #[tokio::test]
    async fn impossible_counts_are_a_fault() {
        let grade = score_with(Scripted::new(Ok(ExecutionOutcome::new(5, 3))), 3).await;
        assert_eq!(grade.points, 0);
        assert!(grade.reason.unwrap().contains("5 passed out of 3"));
    }

    #[tokio::test]
    async fn total_must_match_the_test_cases_sent() {
        let grade = score_with(Scripted::new(Ok(ExecutionOutcome::new(1, 1))), 10).await;
        assert_eq!(grade.points, 0);
        assert!(grade.reason.unwrap().contains("1 passed out of 1"));

        let grade = score_with(Scripted::new(Ok(ExecutionOutcome::new(4, 12))), 10).await;
        assert_eq!(grade.points, 0);
    }

    #[tokio::test]
    async fn non_string_language_is_ignored() {
        let strategy = Scripted::new(Ok(ExecutionOutcome::new(2, 2)));
        let handler = CodeHandler::new(
            Arc::clone(&strategy) as Arc<dyn ExecutionStrategy>,
            Duration::from_secs(5),
        );
        let mut assignment = code_assignment(2);
        if let AssignmentContent::Code(content) = &mut assignment.content {
            content.language = None;
        }
        let content = json!({ "code": "print(2)", "language": 3 });
        assert!(handler.validate(&content));

        let grade = handler
            .score(
                &Submission::new("s1", "code-1", content),
                &assignment,
                &CancellationToken::new(),
            )
            .await;
        assert_eq!(grade, Grade::new(100));
        assert_eq!(strategy.calls(), 1);
        let request = strategy.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.source, "print(2)");
        assert_eq!(request.language, None);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_abandons_the_run() {
        let strategy = Scripted::slow(Duration::from_secs(3600));
        let handler = CodeHandler::new(
            Arc::clone(&strategy) as Arc<dyn ExecutionStrategy>,
            Duration::from_secs(7200),
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });
        let grade = handler
            .score(&submission("x"), &code_assignment(1), &cancel)
            .await;
        assert_eq!(grade, Grade::zero("execution fault: execution cancelled"));
    }

    #[tokio::test]
    async fn no_test_cases_skips_the_sandbox() {
        let strategy = Scripted::new(Ok(ExecutionOutcome::new(1, 1)));
        let grade = score_with(Arc::clone(&strategy), 0).await;
        assert_eq!(grade, Grade::zero("assignment defines no test cases"));
        assert_eq!(strategy.calls(), 0);
    }

    #[test]
    fn check_reports_content_problems() {
        let handler = idle_handler();

        let issues = handler.check_assignment(&code_assignment(0));
        assert!(issues.iter().any(|i| i.message.contains("no test cases")));

        let mut assignment = code_assignment(2);
        if let AssignmentContent::Code(content) = &mut assignment.content {
            content.statement = "  ".into();
            content.test_cases[1].id = "t0".into();
            content.test_cases[1].expected_output = Value::Null;
            for test in &mut content.test_cases {
                test.hidden = true;
            }
        }
        let issues = handler.check_assignment(&assignment);
        assert!(issues.iter().any(|i| i.message.contains("statement is empty")));
        assert!(issues.iter().any(|i| i.message.contains("hidden")));
        assert!(issues.iter().any(|i| i.message.contains("no expected output")));
        assert!(issues.iter().any(|i| i.message.contains("duplicate test id")));
    }

    #[test]
    fn check_accepts_well_formed_task() {
        let handler = idle_handler();
        assert!(handler.check_assignment(&code_assignment(3)).is_empty());
    }
}
