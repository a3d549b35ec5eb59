//! Shared data model for the lexicomp completion pipeline
//!
//! This crate carries the types every other lexicomp crate agrees on:
//!
//! - candidate items and the editor events that trigger runs ([`types`])
//! - the effective and partial option records ([`options`])
//! - the asynchronous editor-host collaborator surface ([`host`])
//! - the pipeline error taxonomy ([`error`])
//!
//! It deliberately contains no behavior beyond small conversions; the merge
//! engine, registries, and orchestration live in the sibling crates.

pub mod error;
pub mod host;
pub mod options;
pub mod types;

pub use error::{PipelineError, Result};
pub use host::EditorHost;
pub use options::{
    FilterOptions, Options, Params, PartialFilterOptions, PartialSourceOptions, PartialUiOptions,
    SourceOptions, SourceSpec, UiOptions, UserOptions, DEFAULT_KEY,
};
pub use types::{
    BufferId, Context, EditorEvent, ExtensionKind, Item, MessageLevel, Mode, World,
    SOURCE_NAME_KEY,
};
