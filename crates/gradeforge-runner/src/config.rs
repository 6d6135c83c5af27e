//! Engine and sandbox configuration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Placeholder in an interpreter command that is replaced with the source path.
pub const FILE_PLACEHOLDER: &str = "{file}";

/// Top-level gradeforge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeforgeConfig {
    /// Upper bound on a single code evaluation, in seconds.
    #[serde(default = "default_code_timeout_secs")]
    pub code_timeout_secs: u64,
    /// Max concurrent evaluations in batch mode.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    #[serde(default)]
    pub sandbox: SandboxConfig,
}

/// How the local runner executes submitted code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Interpreters keyed by language name.
    #[serde(default = "default_languages")]
    pub languages: HashMap<String, LanguageConfig>,
    /// Language used when neither the assignment nor the submission names one.
    #[serde(default = "default_language")]
    pub default_language: String,
    /// Parent directory for scratch directories. System temp dir if unset.
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
    /// Stdout beyond this many bytes fails the test case.
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
}

/// One interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Program and arguments; `{file}` is replaced with the source path.
    pub command: Vec<String>,
    /// Name the source is written to inside the scratch directory.
    pub file_name: String,
    /// Other names this language is known by.
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl LanguageConfig {
    fn new(command: &[&str], file_name: &str, aliases: &[&str]) -> Self {
        Self {
            command: command.iter().map(|s| s.to_string()).collect(),
            file_name: file_name.to_string(),
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
        }
    }
}

fn default_code_timeout_secs() -> u64 {
    10
}
fn default_parallelism() -> usize {
    4
}
fn default_language() -> String {
    "python".to_string()
}
fn default_max_output_bytes() -> usize {
    64 * 1024
}

fn default_languages() -> HashMap<String, LanguageConfig> {
    HashMap::from([
        (
            "python".to_string(),
            LanguageConfig::new(&["python3", FILE_PLACEHOLDER], "main.py", &["python3", "py"]),
        ),
        (
            "javascript".to_string(),
            LanguageConfig::new(&["node", FILE_PLACEHOLDER], "main.js", &["js", "node"]),
        ),
        (
            "sh".to_string(),
            LanguageConfig::new(&["sh", FILE_PLACEHOLDER], "main.sh", &["shell"]),
        ),
    ])
}

impl Default for GradeforgeConfig {
    fn default() -> Self {
        Self {
            code_timeout_secs: default_code_timeout_secs(),
            parallelism: default_parallelism(),
            sandbox: SandboxConfig::default(),
        }
    }
}

impl GradeforgeConfig {
    pub fn code_timeout(&self) -> Duration {
        Duration::from_secs(self.code_timeout_secs)
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            languages: default_languages(),
            default_language: default_language(),
            scratch_dir: None,
            max_output_bytes: default_max_output_bytes(),
        }
    }
}

impl SandboxConfig {
    /// Find the interpreter for `name`, matching keys and aliases
    /// case-insensitively.
    pub fn resolve_language(&self, name: &str) -> Option<(&str, &LanguageConfig)> {
        let wanted = name.trim().to_lowercase();
        if let Some((key, language)) = self.languages.get_key_value(&wanted) {
            return Some((key.as_str(), language));
        }
        self.languages
            .iter()
            .find(|(key, language)| {
                key.to_lowercase() == wanted
                    || language.aliases.iter().any(|a| a.to_lowercase() == wanted)
            })
            .map(|(key, language)| (key.as_str(), language))
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let mut from = 0;
    while let Some(offset) = result[from..].find("${") {
        let start = from + offset;
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let var_name = &result[start + 2..start + end];
        let value = std::env::var(var_name).unwrap_or_default();
        result = format!(
            "{}{}{}",
            &result[..start],
            value,
            &result[start + end + 1..]
        );
        from = start + value.len();
    }
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `gradeforge.toml` in the current directory
/// 2. `~/.config/gradeforge/config.toml`
///
/// Environment variable overrides: `GRADEFORGE_SCRATCH_DIR`,
/// `GRADEFORGE_CODE_TIMEOUT_SECS`.
pub fn load_config() -> Result<GradeforgeConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<GradeforgeConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("gradeforge.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let config = match config_path {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => GradeforgeConfig::default(),
    };

    apply_env_overrides(config, |name| std::env::var(name).ok())
}

/// Parse a config document, keeping the built-in interpreters for any
/// language the document does not redefine.
pub fn parse_config(content: &str) -> Result<GradeforgeConfig> {
    let mut config: GradeforgeConfig = toml::from_str(content)?;
    for (name, language) in default_languages() {
        config.sandbox.languages.entry(name).or_insert(language);
    }
    for language in config.sandbox.languages.values_mut() {
        for part in &mut language.command {
            *part = resolve_env_vars(part);
        }
    }
    Ok(config)
}

fn apply_env_overrides(
    mut config: GradeforgeConfig,
    var: impl Fn(&str) -> Option<String>,
) -> Result<GradeforgeConfig> {
    if let Some(dir) = var("GRADEFORGE_SCRATCH_DIR") {
        config.sandbox.scratch_dir = Some(PathBuf::from(dir));
    }
    if let Some(secs) = var("GRADEFORGE_CODE_TIMEOUT_SECS") {
        config.code_timeout_secs = secs
            .trim()
            .parse()
            .with_context(|| format!("invalid GRADEFORGE_CODE_TIMEOUT_SECS: {secs}"))?;
    }
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("gradeforge"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_GRADEFORGE_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_GRADEFORGE_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_GRADEFORGE_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("${_GRADEFORGE_UNSET_VAR}"), "");
        assert_eq!(resolve_env_vars("no vars, {file}"), "no vars, {file}");
        assert_eq!(resolve_env_vars("dangling ${"), "dangling ${");
        std::env::remove_var("_GRADEFORGE_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = GradeforgeConfig::default();
        assert_eq!(config.code_timeout_secs, 10);
        assert_eq!(config.parallelism, 4);
        assert_eq!(config.sandbox.default_language, "python");
        assert_eq!(config.sandbox.max_output_bytes, 64 * 1024);
        assert!(config.sandbox.scratch_dir.is_none());
        assert_eq!(config.sandbox.languages.len(), 3);
    }

    #[test]
    fn resolve_language_by_key_and_alias() {
        let sandbox = SandboxConfig::default();
        assert_eq!(sandbox.resolve_language("python").unwrap().0, "python");
        assert_eq!(sandbox.resolve_language("Python3").unwrap().0, "python");
        assert_eq!(sandbox.resolve_language(" JS ").unwrap().0, "javascript");
        assert_eq!(sandbox.resolve_language("shell").unwrap().0, "sh");
        assert!(sandbox.resolve_language("cobol").is_none());
    }

    #[test]
    fn parse_sandbox_config() {
        let toml_str = r#"
code_timeout_secs = 30
parallelism = 8

[sandbox]
default_language = "ruby"
max_output_bytes = 1024

[sandbox.languages.ruby]
command = ["ruby", "{file}"]
file_name = "main.rb"
aliases = ["rb"]
"#;
        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.code_timeout(), Duration::from_secs(30));
        assert_eq!(config.parallelism, 8);
        assert_eq!(config.sandbox.max_output_bytes, 1024);

        let (name, ruby) = config.sandbox.resolve_language("rb").unwrap();
        assert_eq!(name, "ruby");
        assert_eq!(ruby.command, vec!["ruby", "{file}"]);
        // Built-in interpreters survive a partial languages table.
        assert!(config.sandbox.resolve_language("python").is_some());
    }

    #[test]
    fn parse_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.code_timeout_secs, 10);
        assert_eq!(config.sandbox.languages, SandboxConfig::default().languages);
    }

    #[test]
    fn parse_expands_env_vars_in_commands() {
        std::env::set_var("_GRADEFORGE_PYTHON", "/opt/python/bin/python3");
        let config = parse_config(
            r#"
[sandbox.languages.python]
command = ["${_GRADEFORGE_PYTHON}", "-I", "{file}"]
file_name = "main.py"
"#,
        )
        .unwrap();
        std::env::remove_var("_GRADEFORGE_PYTHON");
        assert_eq!(
            config.sandbox.languages["python"].command,
            vec!["/opt/python/bin/python3", "-I", "{file}"]
        );
    }

    #[test]
    fn env_overrides_apply() {
        let config = apply_env_overrides(GradeforgeConfig::default(), |name| match name {
            "GRADEFORGE_SCRATCH_DIR" => Some("/var/tmp/gradeforge".into()),
            "GRADEFORGE_CODE_TIMEOUT_SECS" => Some("3".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(
            config.sandbox.scratch_dir.as_deref(),
            Some(Path::new("/var/tmp/gradeforge"))
        );
        assert_eq!(config.code_timeout_secs, 3);
    }

    #[test]
    fn invalid_timeout_override_is_an_error() {
        let result = apply_env_overrides(GradeforgeConfig::default(), |name| {
            (name == "GRADEFORGE_CODE_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn load_explicit_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gradeforge.toml");
        std::fs::write(&path, "parallelism = 2\n").unwrap();
        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.parallelism, 2);
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let err = load_config_from(Some(Path::new("/nonexistent/gradeforge.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }
}
