//! Extension capability traits
//!
//! Every pluggable piece of the pipeline implements one of three capability
//! traits: a UI renders candidates, a source produces them, a filter
//! matches/sorts/converts them. Lifecycle hooks default to no-ops so a
//! variant only implements what it needs; names are assigned by the loader,
//! never self-chosen.

use async_trait::async_trait;

use lexicomp_callback::WaiterFactory;
use lexicomp_core::options::{FilterOptions, Options, Params, SourceOptions, UiOptions};
use lexicomp_core::types::{Context, EditorEvent, Item};
use lexicomp_core::{EditorHost, Result};

/// Arguments for the one-time `on_init` hook
pub struct InitArgs<'a> {
    pub host: &'a dyn EditorHost,
    pub params: &'a Params,
}

/// Arguments for a source's `on_event` hook
pub struct EventArgs<'a> {
    pub host: &'a dyn EditorHost,
    pub context: &'a Context,
    pub options: &'a Options,
    pub source_options: &'a SourceOptions,
    pub params: &'a Params,
    pub callback: &'a WaiterFactory,
}

/// Arguments for a source's `gather` operation
pub struct GatherArgs<'a> {
    pub host: &'a dyn EditorHost,
    pub context: &'a Context,
    pub options: &'a Options,
    pub source_options: &'a SourceOptions,
    pub params: &'a Params,
    pub callback: &'a WaiterFactory,
    /// The keyword prefix the run is completing
    pub complete_str: &'a str,
}

/// Arguments for a source's `on_complete_done` hook
pub struct CompleteDoneArgs<'a> {
    pub host: &'a dyn EditorHost,
    pub context: &'a Context,
    pub options: &'a Options,
    pub source_options: &'a SourceOptions,
    pub params: &'a Params,
    pub callback: &'a WaiterFactory,
    /// Opaque payload the source attached to the completed item
    pub user_data: &'a serde_json::Value,
}

/// Arguments for a filter invocation
pub struct FilterArgs<'a> {
    pub host: &'a dyn EditorHost,
    pub context: &'a Context,
    pub options: &'a Options,
    pub filter_options: &'a FilterOptions,
    pub params: &'a Params,
    /// The text being completed against
    pub complete_str: &'a str,
    pub items: Vec<Item>,
}

/// Arguments for showing the candidate UI
pub struct UiShowArgs<'a> {
    pub host: &'a dyn EditorHost,
    pub context: &'a Context,
    pub options: &'a Options,
    pub ui_options: &'a UiOptions,
    pub params: &'a Params,
    pub items: &'a [Item],
}

/// Arguments for hiding the candidate UI
pub struct UiHideArgs<'a> {
    pub host: &'a dyn EditorHost,
    pub context: &'a Context,
    pub options: &'a Options,
}

/// A candidate-producing extension
#[async_trait]
pub trait BaseSource: Send + Sync {
    /// Events this source wants `on_event` for
    fn events(&self) -> Vec<EditorEvent> {
        Vec::new()
    }

    /// Default parameters, overridable through the keyed param layers
    fn params(&self) -> Params {
        Params::new()
    }

    /// One-time initialization, guarded by the loader's per-instance flag
    async fn on_init(&self, _args: InitArgs<'_>) -> Result<()> {
        Ok(())
    }

    /// Called for declared events before gathering starts
    async fn on_event(&self, _args: EventArgs<'_>) -> Result<()> {
        Ok(())
    }

    /// Produce candidate items for the current context
    async fn gather(&self, args: GatherArgs<'_>) -> Result<Vec<Item>>;

    /// Called after the host inserted one of this source's items
    async fn on_complete_done(&self, _args: CompleteDoneArgs<'_>) -> Result<()> {
        Ok(())
    }
}

/// A candidate-transforming extension (matcher, sorter, or converter)
#[async_trait]
pub trait BaseFilter: Send + Sync {
    fn params(&self) -> Params {
        Params::new()
    }

    async fn on_init(&self, _args: InitArgs<'_>) -> Result<()> {
        Ok(())
    }

    /// Return a new item list; ordering and content are filter-defined
    async fn filter(&self, args: FilterArgs<'_>) -> Result<Vec<Item>>;
}

/// A candidate-rendering extension
#[async_trait]
pub trait BaseUi: Send + Sync {
    fn params(&self) -> Params {
        Params::new()
    }

    async fn on_init(&self, _args: InitArgs<'_>) -> Result<()> {
        Ok(())
    }

    /// Render the candidate set
    async fn show(&self, args: UiShowArgs<'_>) -> Result<()>;

    /// Hide any visible rendering
    async fn hide(&self, args: UiHideArgs<'_>) -> Result<()>;
}
