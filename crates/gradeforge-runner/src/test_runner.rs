//! Running one test case against a sandboxed submission.

use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use gradeforge_core::error::ExecutionFault;
use gradeforge_core::schema::TestCase;

use crate::sandbox::Sandbox;

/// Numeric outputs within this distance of the expected value match.
pub const FLOAT_TOLERANCE: f64 = 1e-9;

/// What happened when one test case ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseVerdict {
    Passed,
    WrongOutput,
    /// Exited unsuccessfully; `None` when killed by a signal.
    NonZeroExit(Option<i32>),
    TimedOut,
    OutputLimitExceeded,
}

impl CaseVerdict {
    pub fn passed(&self) -> bool {
        matches!(self, CaseVerdict::Passed)
    }
}

/// Run `case` once, feeding its input on stdin and comparing stdout.
///
/// Program misbehaviour is a verdict. Only a sandbox that cannot start the
/// interpreter or talk to the child is a fault.
pub async fn run_case(
    sandbox: &Sandbox,
    case: &TestCase,
    limit: Duration,
    max_output_bytes: usize,
) -> Result<CaseVerdict, ExecutionFault> {
    let mut cmd = sandbox.command()?;
    let mut child = cmd.spawn().map_err(|e| {
        ExecutionFault::Unavailable(format!("failed to start interpreter: {e}"))
    })?;

    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let input = stdin_bytes(&case.input);

    let feed = async move {
        if let Some(mut stdin) = stdin {
            // The program may exit without reading its input.
            let _ = stdin.write_all(&input).await;
        }
    };
    let collect = async move {
        let mut buf = Vec::new();
        if let Some(stdout) = stdout {
            let cap = u64::try_from(max_output_bytes).unwrap_or(u64::MAX);
            stdout
                .take(cap.saturating_add(1))
                .read_to_end(&mut buf)
                .await?;
        }
        Ok::<_, std::io::Error>(buf)
    };
    let waiter = &mut child;
    let io = async move {
        let ((), output) = tokio::join!(feed, collect);
        let output = output?;
        if output.len() > max_output_bytes {
            return Ok(None);
        }
        let status = waiter.wait().await?;
        Ok::<_, std::io::Error>(Some((status, output)))
    };

    // Dropping `child` on any early return kills the process.
    let verdict = match tokio::time::timeout(limit, io).await {
        Err(_) => CaseVerdict::TimedOut,
        Ok(Err(e)) => {
            return Err(ExecutionFault::Crashed(format!(
                "i/o error running test {}: {e}",
                case.id
            )))
        }
        Ok(Ok(None)) => CaseVerdict::OutputLimitExceeded,
        Ok(Ok(Some((status, _)))) if !status.success() => CaseVerdict::NonZeroExit(status.code()),
        Ok(Ok(Some((_, output)))) => {
            if outputs_match(&case.expected_output, &String::from_utf8_lossy(&output)) {
                CaseVerdict::Passed
            } else {
                CaseVerdict::WrongOutput
            }
        }
    };
    Ok(verdict)
}

/// Bytes written to the program's stdin for a test input.
///
/// Strings are passed verbatim, `null` as nothing, anything else as JSON.
pub fn stdin_bytes(input: &Value) -> Vec<u8> {
    match input {
        Value::Null => Vec::new(),
        Value::String(s) => s.as_bytes().to_vec(),
        other => other.to_string().into_bytes(),
    }
}

/// Whether program output matches an expected value.
///
/// Output is trimmed first. A string expects that exact text, a number
/// expects a number within [`FLOAT_TOLERANCE`], and any other JSON value
/// expects output that parses to an equal value.
pub fn outputs_match(expected: &Value, actual: &str) -> bool {
    let actual = actual.trim();
    match expected {
        Value::String(s) => s.trim() == actual,
        Value::Number(n) => match (n.as_f64(), actual.parse::<f64>()) {
            (Some(expected), Ok(actual)) => (expected - actual).abs() < FLOAT_TOLERANCE,
            _ => false,
        },
        Value::Null => actual.is_empty(),
        other => serde_json::from_str::<Value>(actual).is_ok_and(|parsed| &parsed == other),
    }
}
