//! Built-in assignment type handlers.

mod code;
mod quiz;

pub use code::CodeHandler;
pub use quiz::QuizHandler;
