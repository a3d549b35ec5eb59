//! Static extension resolver
//!
//! Maps extension names to in-process constructors. Production embedders
//! that load extensions from disk supply their own resolver; this one covers
//! the bundled set and anything registered on top of it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use lexicomp_core::types::ExtensionKind;
use lexicomp_core::{PipelineError, Result};
use lexicomp_registry::{Extension, ExtensionResolver};

use crate::filters::{ConverterTruncate, MatcherHead, SorterRank};
use crate::source_around::AroundSource;
use crate::ui_popup::PopupUi;

type Factory = Box<dyn Fn() -> Extension + Send + Sync>;

/// Resolver backed by a name→constructor table
#[derive(Default)]
pub struct StaticResolver {
    factories: RwLock<HashMap<(ExtensionKind, String), Arc<Factory>>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// A resolver preloaded with every bundled extension
    pub fn with_builtins() -> Self {
        let resolver = Self::new();
        resolver.register(ExtensionKind::Source, "around", || {
            Extension::Source(Arc::new(AroundSource))
        });
        resolver.register(ExtensionKind::Filter, "matcher_head", || {
            Extension::Filter(Arc::new(MatcherHead))
        });
        resolver.register(ExtensionKind::Filter, "sorter_rank", || {
            Extension::Filter(Arc::new(SorterRank))
        });
        resolver.register(ExtensionKind::Filter, "converter_truncate", || {
            Extension::Filter(Arc::new(ConverterTruncate))
        });
        resolver.register(ExtensionKind::Ui, "popup", || Extension::Ui(Arc::new(PopupUi)));
        resolver
    }

    /// Register a constructor for `name`; later registrations replace
    /// earlier ones.
    pub fn register(
        &self,
        kind: ExtensionKind,
        name: &str,
        factory: impl Fn() -> Extension + Send + Sync + 'static,
    ) {
        self.factories
            .write()
            .insert((kind, name.to_string()), Arc::new(Box::new(factory)));
    }
}

#[async_trait]
impl ExtensionResolver for StaticResolver {
    async fn find_path(&self, kind: ExtensionKind, name: &str) -> Option<String> {
        self.factories
            .read()
            .contains_key(&(kind, name.to_string()))
            .then(|| format!("builtin/{name}"))
    }

    async fn instantiate(&self, kind: ExtensionKind, path: &str) -> Result<Extension> {
        let name = path.strip_prefix("builtin/").unwrap_or(path);
        let factory = self
            .factories
            .read()
            .get(&(kind, name.to_string()))
            .cloned();
        match factory {
            Some(factory) => Ok((*factory)()),
            None => Err(PipelineError::Resolution {
                kind,
                name: name.to_string(),
            }),
        }
    }
}
