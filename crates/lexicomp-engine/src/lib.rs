//! Completion engine for lexicomp
//!
//! [`context`] samples the editor into immutable snapshots and gates runs on
//! them; [`orchestrator`] drives admitted runs through the configured UI,
//! sources, and filter chains with per-extension fault isolation.

pub mod context;
pub mod orchestrator;

pub use context::{complete_prefix, is_negligible, keyword_char_class, ContextBuilder, RunInput};
pub use orchestrator::Pipeline;
