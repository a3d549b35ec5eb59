//! Hierarchical configuration merge engine for lexicomp
//!
//! Two pieces live here:
//!
//! - [`merge`]: the pure fold/overwrite/patch operations that combine sparse
//!   option records into effective ones
//! - [`custom`]: the per-session layer store folding
//!   global → filetype → dynamic-context → buffer
//!
//! Merging is deterministic and associative; the properties the rest of the
//! pipeline relies on are exercised in `tests/merge_properties.rs`.

pub mod custom;
pub mod merge;

pub use custom::Custom;
pub use merge::{
    filter_options, filter_params, fold_merge, merge, merge_each_keys, source_options,
    source_params, ui_options, ui_params, Overwrite, Patch,
};
