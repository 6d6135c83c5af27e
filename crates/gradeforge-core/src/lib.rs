//! gradeforge-core: assignment evaluation engine, handlers, and scoring.
//!
//! This crate defines the assignment and submission model, the per-type
//! grading handlers, the handler registry, and the evaluation service that
//! every other gradeforge crate builds on.

pub mod engine;
pub mod error;
pub mod handlers;
pub mod model;
pub mod parser;
pub mod registry;
pub mod schema;
pub mod scoring;
pub mod traits;
