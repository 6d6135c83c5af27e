//! The `gradeforge types` command.

use std::path::PathBuf;

use anyhow::Result;

use gradeforge_core::model::AssignmentType;
use gradeforge_runner::config::load_config_from;

use super::build_service;

pub fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let service = build_service(&config)?;
    let registry = service.registry();

    println!("Gradable assignment types:");
    for tag in registry.supported_types() {
        let handler = registry.lookup(tag)?;
        println!("  {tag} ({})", handler.name());
    }

    let ungraded: Vec<String> = AssignmentType::ALL
        .iter()
        .filter(|tag| registry.lookup(**tag).is_err())
        .map(|tag| tag.to_string())
        .collect();
    if !ungraded.is_empty() {
        println!("\nRecognised but not gradable: {}", ungraded.join(", "));
    }

    let mut languages: Vec<&String> = config.sandbox.languages.keys().collect();
    languages.sort();
    println!(
        "\nCode languages: {} (default: {})",
        languages
            .iter()
            .map(|l| l.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        config.sandbox.default_language
    );

    Ok(())
}
