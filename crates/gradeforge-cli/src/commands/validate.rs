//! The `gradeforge validate` command.

use std::path::PathBuf;

use anyhow::Result;

use gradeforge_core::parser;
use gradeforge_runner::config::GradeforgeConfig;

use super::build_service;

pub fn execute(assignment_path: PathBuf) -> Result<()> {
    let assignments = if assignment_path.is_dir() {
        parser::load_assignment_directory(&assignment_path)?
    } else {
        vec![parser::parse_assignment(&assignment_path)?]
    };
    anyhow::ensure!(
        !assignments.is_empty(),
        "no assignments found in {}",
        assignment_path.display()
    );

    let service = build_service(&GradeforgeConfig::default())?;

    let mut total_issues = 0;
    let mut ungradable = 0;

    for assignment in &assignments {
        println!(
            "Assignment: {} ({})",
            assignment.id,
            assignment.assignment_type()
        );

        let issues = match service.check_assignment(assignment) {
            Ok(issues) => issues,
            Err(e) => {
                println!("  ERROR: {e}");
                ungradable += 1;
                continue;
            }
        };
        for issue in &issues {
            let prefix = issue
                .location
                .as_ref()
                .map(|location| format!("  [{location}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", issue.message);
        }
        total_issues += issues.len();
    }

    if total_issues == 0 && ungradable == 0 {
        println!("All assignments valid.");
    } else if total_issues > 0 {
        println!("\n{total_issues} warning(s) found.");
    }

    if ungradable > 0 {
        anyhow::bail!("{ungradable} assignment(s) have no registered handler");
    }
    Ok(())
}
