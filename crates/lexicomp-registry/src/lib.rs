//! Extension registry for lexicomp
//!
//! [`extension`] defines the three capability traits every pluggable piece
//! implements; [`loader`] resolves configured names to singleton instances
//! with alias indirection, serialized at-most-once path loading, and a
//! pluggable [`ExtensionResolver`] instantiation seam.

pub mod extension;
pub mod loader;

pub use extension::{
    BaseFilter, BaseSource, BaseUi, CompleteDoneArgs, EventArgs, FilterArgs, GatherArgs, InitArgs,
    UiHideArgs, UiShowArgs,
};
pub use loader::{Entry, Extension, ExtensionResolver, Loader};
