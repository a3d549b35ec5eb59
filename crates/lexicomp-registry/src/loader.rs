//! Lazy extension loader
//!
//! Resolves named extensions to their implementations with alias indirection
//! and at-most-once load per path. The load path is serialized through one
//! async mutex regardless of caller concurrency; lookups are synchronous.
//! Absence is a valid, checkable result here; autoload-then-retry and user
//! diagnostics belong to the orchestrator.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, warn};

use lexicomp_core::types::ExtensionKind;
use lexicomp_core::{PipelineError, Result};

use crate::extension::{BaseFilter, BaseSource, BaseUi};

/// A registered extension instance plus the per-instance lifecycle state the
/// loader owns for it.
///
/// Aliases get their own `Entry`, so initialization flags are per-alias.
pub struct Entry<T: ?Sized> {
    name: String,
    initialized: AtomicBool,
    extension: Arc<T>,
}

impl<T: ?Sized> Entry<T> {
    fn new(name: String, extension: Arc<T>) -> Arc<Self> {
        Arc::new(Entry {
            name,
            initialized: AtomicBool::new(false),
            extension,
        })
    }

    /// Name the loader assigned to this instance
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extension(&self) -> &T {
        &self.extension
    }

    /// Flip the once-only initialization flag; true exactly once.
    pub fn mark_initialized(&self) -> bool {
        !self.initialized.swap(true, Ordering::SeqCst)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }
}

/// One instantiated extension implementation
pub enum Extension {
    Ui(Arc<dyn BaseUi>),
    Source(Arc<dyn BaseSource>),
    Filter(Arc<dyn BaseFilter>),
}

impl std::fmt::Debug for Extension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Extension::Ui(_) => f.write_str("Extension::Ui"),
            Extension::Source(_) => f.write_str("Extension::Source"),
            Extension::Filter(_) => f.write_str("Extension::Filter"),
        }
    }
}

impl Extension {
    pub fn kind(&self) -> ExtensionKind {
        match self {
            Extension::Ui(_) => ExtensionKind::Ui,
            Extension::Source(_) => ExtensionKind::Source,
            Extension::Filter(_) => ExtensionKind::Filter,
        }
    }
}

/// Instantiation seam for the loader.
///
/// Production backs this with host-side discovery; tests use a static table.
#[async_trait]
pub trait ExtensionResolver: Send + Sync {
    /// Locate a loadable path for a named extension, if one exists
    async fn find_path(&self, kind: ExtensionKind, name: &str) -> Option<String>;

    /// Instantiate a fresh implementation of the extension at `path`
    async fn instantiate(&self, kind: ExtensionKind, path: &str) -> Result<Extension>;
}

#[derive(Default)]
struct Registered {
    uis: HashMap<String, Arc<Entry<dyn BaseUi>>>,
    sources: HashMap<String, Arc<Entry<dyn BaseSource>>>,
    filters: HashMap<String, Arc<Entry<dyn BaseFilter>>>,
    aliases: HashMap<(ExtensionKind, String), String>,
    loaded_paths: HashSet<(ExtensionKind, String)>,
}

/// Lazily resolves named extensions to singleton instances
pub struct Loader {
    resolver: Arc<dyn ExtensionResolver>,
    registered: RwLock<Registered>,
    /// Serializes the whole load path: at most one load in flight
    load_lock: tokio::sync::Mutex<()>,
}

impl Loader {
    pub fn new(resolver: Arc<dyn ExtensionResolver>) -> Self {
        Loader {
            resolver,
            registered: RwLock::new(Registered::default()),
            load_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Record a name indirection: resolving `alias` loads and instantiates
    /// `base`, but under its own instance and lifecycle flags.
    pub fn register_alias(&self, kind: ExtensionKind, alias: &str, base: &str) {
        self.registered
            .write()
            .aliases
            .insert((kind, alias.to_string()), base.to_string());
    }

    /// Load the extension at `path` and register it (plus one independent
    /// instance per alias that maps to its derived name).
    ///
    /// Serialized and idempotent: a path already loaded is a no-op.
    pub async fn register_path(&self, kind: ExtensionKind, path: &str) -> Result<()> {
        let _guard = self.load_lock.lock().await;

        if self
            .registered
            .read()
            .loaded_paths
            .contains(&(kind, path.to_string()))
        {
            return Ok(());
        }

        let name = name_from_path(path);
        let extension = self.resolver.instantiate(kind, path).await?;
        self.register(kind, &name, extension)?;

        // Each alias of this base gets its own instance so lifecycle state
        // stays per-alias.
        let aliases: Vec<String> = {
            let registered = self.registered.read();
            registered
                .aliases
                .iter()
                .filter(|((alias_kind, _), base)| *alias_kind == kind && *base == &name)
                .map(|((_, alias), _)| alias.clone())
                .collect()
        };
        for alias in aliases {
            let instance = self.resolver.instantiate(kind, path).await?;
            self.register(kind, &alias, instance)?;
        }

        self.registered
            .write()
            .loaded_paths
            .insert((kind, path.to_string()));
        debug!(kind = %kind, path, "registered extension path");
        Ok(())
    }

    /// Resolve `name` through the alias table and attempt to load it.
    ///
    /// Returns whether the name is registered afterwards.
    pub async fn autoload(&self, kind: ExtensionKind, name: &str) -> bool {
        let base = {
            let registered = self.registered.read();
            registered
                .aliases
                .get(&(kind, name.to_string()))
                .cloned()
                .unwrap_or_else(|| name.to_string())
        };
        let Some(path) = self.resolver.find_path(kind, &base).await else {
            return false;
        };
        if let Err(error) = self.register_path(kind, &path).await {
            warn!(kind = %kind, name, %error, "autoload failed");
            return false;
        }
        self.contains(kind, name)
    }

    pub fn get_ui(&self, name: &str) -> Option<Arc<Entry<dyn BaseUi>>> {
        self.registered.read().uis.get(name).cloned()
    }

    pub fn get_source(&self, name: &str) -> Option<Arc<Entry<dyn BaseSource>>> {
        self.registered.read().sources.get(name).cloned()
    }

    pub fn get_filter(&self, name: &str) -> Option<Arc<Entry<dyn BaseFilter>>> {
        self.registered.read().filters.get(name).cloned()
    }

    /// Evict a source by name for hot-reload scenarios
    pub fn remove_source(&self, name: &str) {
        self.registered.write().sources.remove(name);
    }

    /// Evict a filter by name for hot-reload scenarios
    pub fn remove_filter(&self, name: &str) {
        self.registered.write().filters.remove(name);
    }

    fn contains(&self, kind: ExtensionKind, name: &str) -> bool {
        let registered = self.registered.read();
        match kind {
            ExtensionKind::Ui => registered.uis.contains_key(name),
            ExtensionKind::Source => registered.sources.contains_key(name),
            ExtensionKind::Filter => registered.filters.contains_key(name),
        }
    }

    fn register(&self, kind: ExtensionKind, name: &str, extension: Extension) -> Result<()> {
        if extension.kind() != kind {
            return Err(PipelineError::Configuration(format!(
                "resolver produced a {} while loading a {}",
                extension.kind(),
                kind
            )));
        }
        let mut registered = self.registered.write();
        // Re-registration under the same name replaces the singleton.
        match extension {
            Extension::Ui(ui) => {
                registered
                    .uis
                    .insert(name.to_string(), Entry::new(name.to_string(), ui));
            }
            Extension::Source(source) => {
                registered
                    .sources
                    .insert(name.to_string(), Entry::new(name.to_string(), source));
            }
            Extension::Filter(filter) => {
                registered
                    .filters
                    .insert(name.to_string(), Entry::new(name.to_string(), filter));
            }
        }
        Ok(())
    }
}

/// Extension names derive from the path stem: `plugins/around.ext` → `around`
fn name_from_path(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}
