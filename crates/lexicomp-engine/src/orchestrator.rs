//! Pipeline orchestration
//!
//! [`Pipeline`] owns the loader, the layered configuration store, and the
//! callback registry, and drives one completion run per admitted editor
//! event: resolve the UI, gather from every configured source under its
//! deadline, push candidates through the per-source filter chains, then the
//! post filters, then the UI. Every extension call is isolated; a faulting
//! extension costs its own contribution, never the run.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::timeout;
use tracing::{debug, error};

use lexicomp_callback::{CallbackRegistry, WaiterFactory};
use lexicomp_config::{self as config, Custom};
use lexicomp_core::options::{Params, SourceSpec, UiOptions, UserOptions};
use lexicomp_core::types::{Context, EditorEvent, ExtensionKind, Item, MessageLevel};
use lexicomp_core::{BufferId, EditorHost, Options, PipelineError, Result};
use lexicomp_registry::{
    BaseFilter, BaseSource, BaseUi, CompleteDoneArgs, Entry, EventArgs, ExtensionResolver,
    FilterArgs, GatherArgs, InitArgs, Loader, UiHideArgs, UiShowArgs,
};

use crate::context::{complete_prefix, ContextBuilder, RunInput};

/// Deadline for every lifecycle hook that is not a gather
const HOOK_DEADLINE: Duration = Duration::from_millis(1000);

/// Key under which an item's original word is stashed while a matcher key
/// substitution is in effect
const SHADOW_WORD_KEY: &str = "__word";

/// The completion pipeline driver
pub struct Pipeline {
    host: Arc<dyn EditorHost>,
    loader: Arc<Loader>,
    callbacks: CallbackRegistry,
    custom: Mutex<Custom>,
    context_builder: tokio::sync::Mutex<ContextBuilder>,
    current_ui: Mutex<Option<String>>,
    missing_reported: Mutex<HashSet<(ExtensionKind, String)>>,
}

impl Pipeline {
    pub fn new(host: Arc<dyn EditorHost>, resolver: Arc<dyn ExtensionResolver>) -> Self {
        Pipeline {
            host,
            loader: Arc::new(Loader::new(resolver)),
            callbacks: CallbackRegistry::new(),
            custom: Mutex::new(Custom::new()),
            context_builder: tokio::sync::Mutex::new(ContextBuilder::new()),
            current_ui: Mutex::new(None),
            missing_reported: Mutex::new(HashSet::new()),
        }
    }

    pub fn loader(&self) -> &Loader {
        &self.loader
    }

    /// Registry for host-delivered asynchronous responses
    pub fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }

    pub fn set_global(&self, options: UserOptions) {
        self.custom.lock().set_global(options);
    }

    pub fn patch_global(&self, partial: &UserOptions) {
        self.custom.lock().patch_global(partial);
    }

    pub fn set_filetype(&self, filetype: &str, options: UserOptions) {
        self.custom.lock().set_filetype(filetype, options);
    }

    pub fn patch_filetype(&self, filetype: &str, partial: &UserOptions) {
        self.custom.lock().patch_filetype(filetype, partial);
    }

    pub fn set_buffer(&self, bufnr: BufferId, options: UserOptions) {
        self.custom.lock().set_buffer(bufnr, options);
    }

    pub fn patch_buffer(&self, bufnr: BufferId, partial: &UserOptions) {
        self.custom.lock().patch_buffer(bufnr, partial);
    }

    /// Bind a dynamic-context evaluator to a filetype
    pub fn set_context(&self, filetype: &str, evaluator_id: &str) {
        self.custom.lock().set_context(filetype, evaluator_id);
    }

    /// Handle one triggering editor event.
    ///
    /// Skipped events return without touching any extension. An admitted
    /// event revokes all in-flight callbacks before starting its own run.
    pub async fn on_event(&self, event: EditorEvent) -> Result<()> {
        let run = self.sample(event).await?;
        if run.skip {
            return Ok(());
        }
        if !event.bypasses_negligibility() && !run.options.auto_complete_events.contains(&event) {
            return Ok(());
        }
        if run.options.auto_complete_delay > 0 && event != EditorEvent::Manual {
            tokio::time::sleep(Duration::from_millis(run.options.auto_complete_delay as u64))
                .await;
        }

        self.callbacks.revoke();
        let factory = self.callbacks.waiter_factory();
        self.run_completion(&run.context, &run.options, &factory)
            .await;
        Ok(())
    }

    /// Dispatch the completion-done hook to the source that produced the
    /// inserted item.
    ///
    /// Items without a recorded producing source are ignored.
    pub async fn on_complete_done(&self) -> Result<()> {
        let run = self.sample(EditorEvent::CompleteDone).await?;
        let Some(item) = self.host.completed_item().await? else {
            return Ok(());
        };
        let Some(name) = item.source_name().map(str::to_string) else {
            return Ok(());
        };
        let Some(user_data) = item.user_data else {
            return Ok(());
        };
        let Some(entry) = self.loader.get_source(&name) else {
            return Ok(());
        };

        let source_options = config::source_options(&run.options, &name, None);
        let params = config::source_params(&run.options, &name, entry.extension().params(), None);
        let factory = self.callbacks.waiter_factory();
        let args = CompleteDoneArgs {
            host: self.host.as_ref(),
            context: &run.context,
            options: &run.options,
            source_options: &source_options,
            params: &params,
            callback: &factory,
            user_data: &user_data,
        };
        match timeout(HOOK_DEADLINE, entry.extension().on_complete_done(args)).await {
            Ok(Ok(())) => {}
            Ok(Err(cause)) => {
                self.report(PipelineError::extension_fault(
                    ExtensionKind::Source,
                    &name,
                    "on_complete_done",
                    cause,
                ))
                .await;
            }
            Err(_) => debug!(source = %name, "on_complete_done timed out"),
        }
        Ok(())
    }

    async fn sample(&self, event: EditorEvent) -> Result<RunInput> {
        let custom = self.custom.lock().clone();
        let mut builder = self.context_builder.lock().await;
        builder
            .create_context(self.host.as_ref(), event, &custom)
            .await
    }

    async fn run_completion(&self, context: &Context, options: &Options, factory: &WaiterFactory) {
        let ui = self.resolve_ui(context, options).await;
        let complete_str = complete_prefix(&options.keyword_pattern, &context.input);

        let mut merged: Vec<Item> = Vec::new();
        for spec in &options.sources {
            let items = self
                .process_source(spec, context, options, factory, &complete_str)
                .await;
            merged.extend(items);
        }

        let merged = self
            .apply_filters(&options.post_filters, context, options, merged, &complete_str)
            .await;

        if let Some((entry, ui_options, params)) = ui {
            let args = UiShowArgs {
                host: self.host.as_ref(),
                context,
                options,
                ui_options: &ui_options,
                params: &params,
                items: &merged,
            };
            match timeout(HOOK_DEADLINE, entry.extension().show(args)).await {
                Ok(Ok(())) => {}
                Ok(Err(cause)) => {
                    self.report(PipelineError::extension_fault(
                        ExtensionKind::Ui,
                        entry.name(),
                        "show",
                        cause,
                    ))
                    .await;
                }
                Err(_) => debug!(ui = entry.name(), "show timed out"),
            }
        }
    }

    /// Run one source through its gather and per-source filter chains.
    ///
    /// Any failure costs only this source's contribution.
    async fn process_source(
        &self,
        spec: &SourceSpec,
        context: &Context,
        options: &Options,
        factory: &WaiterFactory,
        complete_str: &str,
    ) -> Vec<Item> {
        let name = spec.name();
        let Some(entry) = self.resolve_source(name).await else {
            return Vec::new();
        };
        let source_options = config::source_options(options, name, spec.options());

        if !source_options.enabled_if.is_empty() {
            match self.host.eval_condition(&source_options.enabled_if).await {
                Ok(true) => {}
                Ok(false) => return Vec::new(),
                Err(cause) => {
                    self.report(cause).await;
                    return Vec::new();
                }
            }
        }

        let params = config::source_params(options, name, entry.extension().params(), spec.params());
        self.init_source(&entry, &params).await;

        if entry.extension().events().contains(&context.event) {
            let args = EventArgs {
                host: self.host.as_ref(),
                context,
                options,
                source_options: &source_options,
                params: &params,
                callback: factory,
            };
            match timeout(HOOK_DEADLINE, entry.extension().on_event(args)).await {
                Ok(Ok(())) => {}
                Ok(Err(cause)) => {
                    self.report(PipelineError::extension_fault(
                        ExtensionKind::Source,
                        entry.name(),
                        "on_event",
                        cause,
                    ))
                    .await;
                }
                Err(_) => debug!(source = entry.name(), "on_event timed out"),
            }
        }

        if context.event != EditorEvent::Manual
            && complete_str.chars().count() < source_options.min_auto_complete_length
        {
            return Vec::new();
        }

        let args = GatherArgs {
            host: self.host.as_ref(),
            context,
            options,
            source_options: &source_options,
            params: &params,
            callback: factory,
            complete_str,
        };
        let gathered = match timeout(
            Duration::from_millis(source_options.timeout_ms),
            entry.extension().gather(args),
        )
        .await
        {
            Ok(Ok(items)) => items,
            Ok(Err(cause)) if cause.is_silent() => Vec::new(),
            Ok(Err(cause)) => {
                self.report(PipelineError::extension_fault(
                    ExtensionKind::Source,
                    entry.name(),
                    "gather",
                    cause,
                ))
                .await;
                Vec::new()
            }
            Err(_) => {
                debug!(source = entry.name(), "gather timed out");
                Vec::new()
            }
        };

        let mut items: Vec<Item> = gathered
            .into_iter()
            .filter(|item| {
                let length = item.word.chars().count();
                (source_options.max_keyword_length == 0
                    || length <= source_options.max_keyword_length)
                    && (source_options.min_keyword_length == 0
                        || length >= source_options.min_keyword_length)
            })
            .collect();

        if !source_options.matcher_key.is_empty() {
            for item in &mut items {
                shadow_word(item, &source_options.matcher_key);
            }
        }
        items = self
            .apply_filters(&source_options.matchers, context, options, items, complete_str)
            .await;
        if !source_options.matcher_key.is_empty() {
            for item in &mut items {
                restore_word(item);
            }
        }
        items = self
            .apply_filters(&source_options.sorters, context, options, items, complete_str)
            .await;
        items.truncate(source_options.max_items);
        items = self
            .apply_filters(
                &source_options.converters,
                context,
                options,
                items,
                complete_str,
            )
            .await;

        for item in &mut items {
            item.tag_source(entry.name());
            if !source_options.mark.is_empty() {
                item.menu = Some(match item.menu.take() {
                    Some(menu) => format!("{} {}", source_options.mark, menu),
                    None => source_options.mark.clone(),
                });
            }
        }
        items
    }

    /// Push items through a named filter chain in order.
    ///
    /// A missing filter name is skipped; a faulting or timed-out filter
    /// empties its own stage and the chain continues.
    async fn apply_filters(
        &self,
        names: &[String],
        context: &Context,
        options: &Options,
        mut items: Vec<Item>,
        complete_str: &str,
    ) -> Vec<Item> {
        for name in names {
            let Some(entry) = self.resolve_filter(name).await else {
                continue;
            };
            let filter_options = config::filter_options(options, name);
            if !filter_options.enabled {
                continue;
            }
            let params = config::filter_params(options, name, entry.extension().params());
            self.init_filter(&entry, &params).await;

            let args = FilterArgs {
                host: self.host.as_ref(),
                context,
                options,
                filter_options: &filter_options,
                params: &params,
                complete_str,
                items,
            };
            items = match timeout(HOOK_DEADLINE, entry.extension().filter(args)).await {
                Ok(Ok(next)) => next,
                Ok(Err(cause)) if cause.is_silent() => Vec::new(),
                Ok(Err(cause)) => {
                    self.report(PipelineError::extension_fault(
                        ExtensionKind::Filter,
                        entry.name(),
                        "filter",
                        cause,
                    ))
                    .await;
                    Vec::new()
                }
                Err(_) => {
                    debug!(filter = entry.name(), "filter timed out");
                    Vec::new()
                }
            };
        }
        items
    }

    /// Resolve and initialize the configured UI, hiding the outgoing one
    /// first when the name changed.
    async fn resolve_ui(
        &self,
        context: &Context,
        options: &Options,
    ) -> Option<(Arc<Entry<dyn BaseUi>>, UiOptions, Params)> {
        if options.ui.is_empty() {
            return None;
        }

        let previous = self.current_ui.lock().clone();
        if previous.as_deref() != Some(options.ui.as_str()) {
            if let Some(previous) = previous {
                if let Some(entry) = self.loader.get_ui(&previous) {
                    let args = UiHideArgs {
                        host: self.host.as_ref(),
                        context,
                        options,
                    };
                    // Best effort; a UI that cannot hide does not block the
                    // swap.
                    if let Ok(Err(cause)) =
                        timeout(HOOK_DEADLINE, entry.extension().hide(args)).await
                    {
                        debug!(ui = %previous, %cause, "outgoing ui failed to hide");
                    }
                }
            }
            *self.current_ui.lock() = Some(options.ui.clone());
        }

        let entry = match self.loader.get_ui(&options.ui) {
            Some(entry) => Some(entry),
            None => {
                if self.loader.autoload(ExtensionKind::Ui, &options.ui).await {
                    self.loader.get_ui(&options.ui)
                } else {
                    None
                }
            }
        };
        let Some(entry) = entry else {
            self.report_missing(ExtensionKind::Ui, &options.ui).await;
            return None;
        };

        let ui_options = config::ui_options(options, &options.ui);
        if !ui_options.enabled {
            return None;
        }
        let params = config::ui_params(options, &options.ui, entry.extension().params());
        self.init_ui(&entry, &params).await;
        Some((entry, ui_options, params))
    }

    async fn resolve_source(&self, name: &str) -> Option<Arc<Entry<dyn BaseSource>>> {
        if let Some(entry) = self.loader.get_source(name) {
            return Some(entry);
        }
        if self.loader.autoload(ExtensionKind::Source, name).await {
            return self.loader.get_source(name);
        }
        self.report_missing(ExtensionKind::Source, name).await;
        None
    }

    async fn resolve_filter(&self, name: &str) -> Option<Arc<Entry<dyn BaseFilter>>> {
        if let Some(entry) = self.loader.get_filter(name) {
            return Some(entry);
        }
        if self.loader.autoload(ExtensionKind::Filter, name).await {
            return self.loader.get_filter(name);
        }
        self.report_missing(ExtensionKind::Filter, name).await;
        None
    }

    async fn init_source(&self, entry: &Entry<dyn BaseSource>, params: &Params) {
        if entry.is_initialized() {
            return;
        }
        let args = InitArgs {
            host: self.host.as_ref(),
            params,
        };
        match timeout(HOOK_DEADLINE, entry.extension().on_init(args)).await {
            Ok(Ok(())) => {
                entry.mark_initialized();
            }
            Ok(Err(cause)) => {
                self.report(PipelineError::extension_fault(
                    ExtensionKind::Source,
                    entry.name(),
                    "on_init",
                    cause,
                ))
                .await;
            }
            Err(_) => debug!(source = entry.name(), "on_init timed out"),
        }
    }

    async fn init_filter(&self, entry: &Entry<dyn BaseFilter>, params: &Params) {
        if entry.is_initialized() {
            return;
        }
        let args = InitArgs {
            host: self.host.as_ref(),
            params,
        };
        match timeout(HOOK_DEADLINE, entry.extension().on_init(args)).await {
            Ok(Ok(())) => {
                entry.mark_initialized();
            }
            Ok(Err(cause)) => {
                self.report(PipelineError::extension_fault(
                    ExtensionKind::Filter,
                    entry.name(),
                    "on_init",
                    cause,
                ))
                .await;
            }
            Err(_) => debug!(filter = entry.name(), "on_init timed out"),
        }
    }

    async fn init_ui(&self, entry: &Entry<dyn BaseUi>, params: &Params) {
        if entry.is_initialized() {
            return;
        }
        let args = InitArgs {
            host: self.host.as_ref(),
            params,
        };
        match timeout(HOOK_DEADLINE, entry.extension().on_init(args)).await {
            Ok(Ok(())) => {
                entry.mark_initialized();
            }
            Ok(Err(cause)) => {
                self.report(PipelineError::extension_fault(
                    ExtensionKind::Ui,
                    entry.name(),
                    "on_init",
                    cause,
                ))
                .await;
            }
            Err(_) => debug!(ui = entry.name(), "on_init timed out"),
        }
    }

    /// A missing name is diagnosed once per session, then silently skipped.
    async fn report_missing(&self, kind: ExtensionKind, name: &str) {
        let first = self
            .missing_reported
            .lock()
            .insert((kind, name.to_string()));
        if first {
            self.report(PipelineError::Resolution {
                kind,
                name: name.to_string(),
            })
            .await;
        }
    }

    async fn report(&self, cause: PipelineError) {
        if cause.is_silent() {
            debug!(%cause, "absorbed silent pipeline outcome");
            return;
        }
        error!(%cause, "pipeline fault");
        self.host
            .notify_user(MessageLevel::Error, &cause.to_string())
            .await;
    }
}

/// Substitute an alternate item field as the match text, stashing the
/// original word for [`restore_word`].
fn shadow_word(item: &mut Item, key: &str) {
    let substitute = match key {
        "abbr" => item.abbr.clone(),
        "kind" => item.kind.clone(),
        "menu" => item.menu.clone(),
        "info" => item.info.clone(),
        other => item
            .user_data
            .as_ref()
            .and_then(|data| data.get(other))
            .and_then(|value| value.as_str().map(str::to_string)),
    };
    let Some(substitute) = substitute else {
        return;
    };
    let original = std::mem::replace(&mut item.word, substitute);

    let mut map = match item.user_data.take() {
        Some(serde_json::Value::Object(map)) => map,
        Some(other) => {
            let mut map = serde_json::Map::new();
            map.insert("payload".to_string(), other);
            map
        }
        None => serde_json::Map::new(),
    };
    map.insert(
        SHADOW_WORD_KEY.to_string(),
        serde_json::Value::String(original),
    );
    item.user_data = Some(serde_json::Value::Object(map));
}

/// Undo [`shadow_word`] after the matchers have run
fn restore_word(item: &mut Item) {
    if let Some(serde_json::Value::Object(map)) = &mut item.user_data {
        if let Some(serde_json::Value::String(original)) = map.remove(SHADOW_WORD_KEY) {
            item.word = original;
        }
        if map.is_empty() {
            item.user_data = None;
        }
    }
}
