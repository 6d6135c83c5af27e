//! Scratch directory for running one submission.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};
use tempfile::TempDir;
use tokio::process::Command;

use gradeforge_core::error::ExecutionFault;

use crate::config::{LanguageConfig, FILE_PLACEHOLDER};

/// A throwaway directory holding submitted source, plus the interpreter
/// that runs it.
///
/// On drop, the directory and everything the submission wrote into it are
/// removed.
pub struct Sandbox {
    work_dir: TempDir,
    source_path: PathBuf,
    language: LanguageConfig,
}

impl Sandbox {
    /// Create an empty scratch directory under `scratch_root`, or the
    /// system temp dir when `None`.
    pub fn new(language: &LanguageConfig, scratch_root: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("gradeforge-");
        let work_dir = match scratch_root {
            Some(root) => {
                std::fs::create_dir_all(root).with_context(|| {
                    format!("failed to create scratch root: {}", root.display())
                })?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .context("failed to create scratch directory")?;

        let source_path = work_dir.path().join(&language.file_name);
        Ok(Self {
            work_dir,
            source_path,
            language: language.clone(),
        })
    }

    pub fn work_dir(&self) -> &Path {
        self.work_dir.path()
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Write submitted source to the language's file name.
    pub fn write_source(&self, code: &str) -> Result<()> {
        std::fs::write(&self.source_path, code)
            .with_context(|| format!("failed to write {}", self.language.file_name))
    }

    /// Interpreter command for the written source, with piped stdio and a
    /// scrubbed environment. The child is killed if the command's handle is
    /// dropped.
    pub fn command(&self) -> Result<Command, ExecutionFault> {
        let (program, args) = self
            .language
            .command
            .split_first()
            .ok_or_else(|| ExecutionFault::Unavailable("interpreter command is empty".into()))?;

        let source = self.source_path.to_string_lossy();
        let mut cmd = Command::new(program);
        cmd.args(args.iter().map(|arg| arg.replace(FILE_PLACEHOLDER, &source)))
            .current_dir(self.work_dir())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .env_clear()
            .kill_on_drop(true);

        for (key, val) in self.build_env() {
            cmd.env(key, val);
        }
        Ok(cmd)
    }

    /// Environment for child processes.
    ///
    /// Nothing is inherited except `PATH`, so credentials in the grader's
    /// environment never reach submitted code.
    pub fn build_env(&self) -> Vec<(String, String)> {
        let scratch = self.work_dir().to_string_lossy().to_string();
        let mut env = vec![
            ("HOME".to_string(), scratch.clone()),
            ("TMPDIR".to_string(), scratch),
            ("LANG".to_string(), "C.UTF-8".to_string()),
            ("PYTHONDONTWRITEBYTECODE".to_string(), "1".to_string()),
        ];
        if let Ok(path) = std::env::var("PATH") {
            env.push(("PATH".to_string(), path));
        }
        env
    }
}
