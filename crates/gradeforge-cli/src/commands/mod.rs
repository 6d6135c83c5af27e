pub mod evaluate;
pub mod init;
pub mod types;
pub mod validate;

use std::sync::Arc;

use anyhow::Result;

use gradeforge_core::engine::EvaluationService;
use gradeforge_core::registry::HandlerRegistry;
use gradeforge_runner::config::GradeforgeConfig;
use gradeforge_runner::LocalRunner;

/// Evaluation service with the built-in handlers, running code locally.
pub fn build_service(config: &GradeforgeConfig) -> Result<EvaluationService> {
    let runner = Arc::new(LocalRunner::new(config.sandbox.clone()));
    let registry = HandlerRegistry::with_builtin_handlers(runner, config.code_timeout())?;
    Ok(EvaluationService::new(Arc::new(registry)))
}
