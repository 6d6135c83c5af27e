//! gradeforge-runner: local sandboxed execution of code submissions.
//!
//! Writes each submission into a throwaway scratch directory, runs it with
//! a configured interpreter once per test case, and reports how many cases
//! passed.

pub mod config;
pub mod sandbox;
pub mod test_runner;

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use uuid::Uuid;

use gradeforge_core::error::ExecutionFault;
use gradeforge_core::traits::{ExecutionOutcome, ExecutionRequest, ExecutionStrategy};

use crate::config::SandboxConfig;
use crate::sandbox::Sandbox;
use crate::test_runner::CaseVerdict;

/// Per-case limit for test cases that do not set `timeLimitMs`.
pub const DEFAULT_CASE_TIME_LIMIT: Duration = Duration::from_millis(5000);

/// Execution strategy that runs submissions as local child processes.
#[derive(Debug, Clone, Default)]
pub struct LocalRunner {
    config: SandboxConfig,
}

impl LocalRunner {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }
}

#[async_trait]
impl ExecutionStrategy for LocalRunner {
    fn name(&self) -> &str {
        "local"
    }

    async fn run(&self, request: &ExecutionRequest) -> Result<ExecutionOutcome, ExecutionFault> {
        let deadline = Instant::now() + request.timeout;
        let run_id = Uuid::new_v4();

        let requested = request
            .language
            .as_deref()
            .unwrap_or(&self.config.default_language);
        let (language_name, language) =
            self.config.resolve_language(requested).ok_or_else(|| {
                ExecutionFault::Unavailable(format!(
                    "no interpreter configured for language '{requested}'"
                ))
            })?;

        let sandbox = Sandbox::new(language, self.config.scratch_dir.as_deref())
            .and_then(|sandbox| sandbox.write_source(&request.source).map(|()| sandbox))
            .map_err(|e| ExecutionFault::Crashed(format!("{e:#}")))?;

        tracing::debug!(
            %run_id,
            "running {} test cases as {language_name} in {}",
            request.test_cases.len(),
            sandbox.work_dir().display()
        );

        let total = u32::try_from(request.test_cases.len()).unwrap_or(u32::MAX);
        let mut passed = 0u32;
        for case in &request.test_cases {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ExecutionFault::Timeout(request.timeout));
            }
            let case_limit = case
                .time_limit_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_CASE_TIME_LIMIT);
            let limit = case_limit.min(remaining);

            let verdict =
                test_runner::run_case(&sandbox, case, limit, self.config.max_output_bytes).await?;
            if verdict.passed() {
                passed += 1;
            } else if verdict == CaseVerdict::TimedOut && limit == remaining {
                return Err(ExecutionFault::Timeout(request.timeout));
            } else {
                tracing::debug!(%run_id, "test case {} failed: {verdict:?}", case.id);
            }
        }

        Ok(ExecutionOutcome::new(passed, total))
    }
}
