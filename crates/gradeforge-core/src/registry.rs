//! Type tag → handler registry.
//!
//! Built once during start-up with `&mut` access, then frozen behind an
//! `Arc` and read concurrently without locks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::EngineError;
use crate::handlers::{CodeHandler, QuizHandler};
use crate::model::AssignmentType;
use crate::traits::{AssignmentHandler, ExecutionStrategy};

/// Maps each assignment type to exactly one handler.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<AssignmentType, Arc<dyn AssignmentHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in QUIZ and CODE handlers.
    pub fn with_builtin_handlers(
        strategy: Arc<dyn ExecutionStrategy>,
        code_timeout: Duration,
    ) -> Result<Self, EngineError> {
        let mut registry = Self::new();
        registry.register(AssignmentType::Quiz, Arc::new(QuizHandler))?;
        registry.register(
            AssignmentType::Code,
            Arc::new(CodeHandler::new(strategy, code_timeout)),
        )?;
        Ok(registry)
    }

    /// Register `handler` for `tag`. Fails if the tag already has one.
    pub fn register(
        &mut self,
        tag: AssignmentType,
        handler: Arc<dyn AssignmentHandler>,
    ) -> Result<(), EngineError> {
        if self.handlers.contains_key(&tag) {
            return Err(EngineError::DuplicateType(tag));
        }
        tracing::debug!("registered '{}' handler for {tag}", handler.name());
        self.handlers.insert(tag, handler);
        Ok(())
    }

    /// The handler for `tag`.
    pub fn lookup(&self, tag: AssignmentType) -> Result<&Arc<dyn AssignmentHandler>, EngineError> {
        self.handlers
            .get(&tag)
            .ok_or_else(|| EngineError::UnknownAssignmentType(tag.to_string()))
    }

    /// Look up by a raw tag string, as received from outside the engine.
    pub fn lookup_str(&self, tag: &str) -> Result<&Arc<dyn AssignmentHandler>, EngineError> {
        self.lookup(tag.parse()?)
    }

    /// Registered tags, in declaration order of [`AssignmentType`].
    pub fn supported_types(&self) -> Vec<AssignmentType> {
        let mut types: Vec<_> = self.handlers.keys().copied().collect();
        types.sort();
        types
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("types", &self.supported_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExecutionFault;
    use crate::traits::{ExecutionOutcome, ExecutionRequest};
    use async_trait::async_trait;

    struct NeverRuns;

    #[async_trait]
    impl ExecutionStrategy for NeverRuns {
        fn name(&self) -> &str {
            "never"
        }

        async fn run(&self, _: &ExecutionRequest) -> Result<ExecutionOutcome, ExecutionFault> {
            Err(ExecutionFault::Unavailable("test strategy".into()))
        }
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = HandlerRegistry::new();
        registry
            .register(AssignmentType::Quiz, Arc::new(QuizHandler))
            .unwrap();
        let err = registry
            .register(AssignmentType::Quiz, Arc::new(QuizHandler))
            .unwrap_err();
        assert_eq!(err, EngineError::DuplicateType(AssignmentType::Quiz));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn lookup_unregistered_type_fails() {
        let registry =
            HandlerRegistry::with_builtin_handlers(Arc::new(NeverRuns), Duration::from_secs(1))
                .unwrap();
        for tag in [
            AssignmentType::Essay,
            AssignmentType::Project,
            AssignmentType::Upload,
            AssignmentType::PeerReview,
        ] {
            assert_eq!(
                registry.lookup(tag).err(),
                Some(EngineError::UnknownAssignmentType(tag.to_string()))
            );
        }
    }

    #[test]
    fn lookup_on_empty_registry_fails() {
        let registry = HandlerRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.lookup(AssignmentType::Quiz).is_err());
    }

    #[test]
    fn lookup_by_string() {
        let registry =
            HandlerRegistry::with_builtin_handlers(Arc::new(NeverRuns), Duration::from_secs(1))
                .unwrap();
        assert_eq!(registry.lookup_str("quiz").unwrap().name(), "quiz");
        assert_eq!(registry.lookup_str("CODE").unwrap().name(), "code");
        assert_eq!(
            registry.lookup_str("MATCHING").err(),
            Some(EngineError::UnknownAssignmentType("MATCHING".into()))
        );
    }

    #[test]
    fn builtin_types_are_sorted() {
        let registry =
            HandlerRegistry::with_builtin_handlers(Arc::new(NeverRuns), Duration::from_secs(1))
                .unwrap();
        assert_eq!(
            registry.supported_types(),
            vec![AssignmentType::Quiz, AssignmentType::Code]
        );
    }
}
