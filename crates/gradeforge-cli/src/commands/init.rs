//! The `gradeforge init` command.

use std::path::Path;

use anyhow::{Context, Result};

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("gradeforge.toml"), SAMPLE_CONFIG)?;

    std::fs::create_dir_all("assignments").context("failed to create assignments/")?;
    write_if_missing(Path::new("assignments/example-quiz.toml"), EXAMPLE_QUIZ)?;

    println!("\nNext steps:");
    println!("  1. Edit gradeforge.toml to point at your interpreters");
    println!("  2. Run: gradeforge validate --assignment assignments/example-quiz.toml");
    println!(
        "  3. Run: gradeforge evaluate --assignment assignments/example-quiz.toml \
         --submission <file or dir>"
    );

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# gradeforge configuration

# Upper bound on one code evaluation, in seconds.
code_timeout_secs = 10
# Max concurrent evaluations when grading a directory of submissions.
parallelism = 4

[sandbox]
default_language = "python"
max_output_bytes = 65536
# scratch_dir = "/var/tmp/gradeforge"

[sandbox.languages.python]
command = ["python3", "{file}"]
file_name = "main.py"
aliases = ["python3", "py"]

[sandbox.languages.javascript]
command = ["node", "{file}"]
file_name = "main.js"
aliases = ["js", "node"]
"#;

const EXAMPLE_QUIZ: &str = r#"id = "example-quiz"
type = "QUIZ"
maxScore = 10
passThreshold = 50

[[content.questions]]
id = "capital"
question = "What is the capital of France?"
correctAnswer = "Paris"

[[content.questions]]
id = "sum"
question = "What is 2 + 2?"
correctAnswer = 4

[[content.questions]]
id = "rust-ownership"
question = "Can a value have two owners at once in Rust?"
correctAnswer = false
explanation = "Each value has exactly one owner; shared ownership goes through Rc or Arc."
"#;
