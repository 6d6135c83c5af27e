//! The `gradeforge evaluate` command.

use std::path::PathBuf;

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use gradeforge_core::model::{Assignment, EvaluationResult, Submission};
use gradeforge_core::parser;
use gradeforge_runner::config::load_config_from;

use super::build_service;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Summary table
    Text,
    /// One JSON object per line
    Json,
}

/// One line of `--format json` output.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResultLine<'a> {
    submission_id: &'a str,
    assignment_id: &'a str,
    submitter_id: &'a str,
    points: u32,
    max_score: u32,
    #[serde(flatten)]
    result: &'a EvaluationResult,
}

pub async fn execute(
    assignment_path: PathBuf,
    submission_path: PathBuf,
    format: OutputFormat,
    parallelism: Option<usize>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let parallelism = parallelism.unwrap_or(config.parallelism);
    anyhow::ensure!(parallelism >= 1, "parallelism must be at least 1");

    let assignment = parser::parse_assignment(&assignment_path)?;
    let submissions = if submission_path.is_dir() {
        parser::load_submission_directory(&submission_path)?
    } else {
        vec![parser::parse_submission(&submission_path)?]
    };

    let service = build_service(&config)?;
    // Fail before grading anything if the type has no handler.
    service.registry().lookup(assignment.assignment_type())?;

    for submission in &submissions {
        if submission.assignment_id != assignment.id {
            eprintln!(
                "Warning: submission {} targets assignment '{}', grading against '{}'",
                submission.id, submission.assignment_id, assignment.id
            );
        }
    }

    tracing::info!(
        "grading {} submission(s) against '{}' (parallelism {parallelism})",
        submissions.len(),
        assignment.id
    );

    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("Interrupted, cancelling running evaluations");
                cancel.cancel();
            }
        }
    });

    let pairs: Vec<(Submission, Assignment)> = submissions
        .into_iter()
        .map(|submission| (submission, assignment.clone()))
        .collect();
    let results = service.evaluate_many(&pairs, parallelism, &cancel).await;
    interrupt.abort();

    let results = results.into_iter().collect::<Result<Vec<_>, _>>()?;

    match format {
        OutputFormat::Text => print_table(&assignment, &pairs, &results),
        OutputFormat::Json => {
            for ((submission, _), result) in pairs.iter().zip(&results) {
                let line = ResultLine {
                    submission_id: &submission.id,
                    assignment_id: &assignment.id,
                    submitter_id: &submission.submitter_id,
                    points: result.points(assignment.max_score),
                    max_score: assignment.max_score,
                    result,
                };
                println!("{}", serde_json::to_string(&line)?);
            }
        }
    }

    if cancel.is_cancelled() {
        anyhow::bail!("evaluation interrupted");
    }
    Ok(())
}

fn print_table(
    assignment: &Assignment,
    pairs: &[(Submission, Assignment)],
    results: &[EvaluationResult],
) {
    use comfy_table::{Cell, Table};

    let mut table = Table::new();
    table.set_header(vec![
        "Submission",
        "Submitter",
        "Score",
        "Points",
        "Passed",
        "Reason",
    ]);

    for ((submission, _), result) in pairs.iter().zip(results) {
        table.add_row(vec![
            Cell::new(&submission.id),
            Cell::new(&submission.submitter_id),
            Cell::new(format!("{}%", result.score)),
            Cell::new(format!(
                "{}/{}",
                result.points(assignment.max_score),
                assignment.max_score
            )),
            Cell::new(if result.passed { "yes" } else { "no" }),
            Cell::new(result.reason.as_deref().unwrap_or("")),
        ]);
    }

    let passed = results.iter().filter(|r| r.passed).count();
    println!(
        "Assignment: {} ({}, pass at {}%)",
        assignment.id,
        assignment.assignment_type(),
        assignment.pass_threshold
    );
    println!("{table}");
    println!("{passed}/{} submissions passed.", results.len());
}
