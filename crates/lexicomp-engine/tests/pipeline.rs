//! End-to-end pipeline runs against a scripted host

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use lexicomp_builtins::{ScriptedHost, StaticResolver};
use lexicomp_core::options::{PartialSourceOptions, SourceSpec, UserOptions};
use lexicomp_core::types::{EditorEvent, ExtensionKind, Item, MessageLevel};
use lexicomp_core::{PipelineError, Result};
use lexicomp_engine::Pipeline;
use lexicomp_registry::{BaseSource, CompleteDoneArgs, Extension, GatherArgs};

struct FailingSource;

#[async_trait]
impl BaseSource for FailingSource {
    async fn gather(&self, _args: GatherArgs<'_>) -> Result<Vec<Item>> {
        Err(PipelineError::Host("backend unavailable".to_string()))
    }
}

struct SlowSource;

#[async_trait]
impl BaseSource for SlowSource {
    async fn gather(&self, _args: GatherArgs<'_>) -> Result<Vec<Item>> {
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(vec![Item::new("too_late")])
    }
}

struct RecordingSource {
    done_called: Arc<AtomicBool>,
}

#[async_trait]
impl BaseSource for RecordingSource {
    async fn gather(&self, _args: GatherArgs<'_>) -> Result<Vec<Item>> {
        Ok(vec![Item::new("memo")])
    }

    async fn on_complete_done(&self, _args: CompleteDoneArgs<'_>) -> Result<()> {
        self.done_called.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn base_options(sources: Vec<SourceSpec>) -> UserOptions {
    let mut source_options = HashMap::new();
    source_options.insert(
        "_".to_string(),
        PartialSourceOptions {
            matchers: Some(vec!["matcher_head".to_string()]),
            sorters: Some(vec!["sorter_rank".to_string()]),
            min_auto_complete_length: Some(1),
            ..Default::default()
        },
    );
    UserOptions {
        ui: Some("popup".to_string()),
        sources: Some(sources),
        source_options,
        ..Default::default()
    }
}

fn pipeline_with(host: Arc<ScriptedHost>, resolver: StaticResolver) -> Pipeline {
    Pipeline::new(host, Arc::new(resolver))
}

#[tokio::test]
async fn completion_run_renders_matched_and_sorted_candidates() {
    let host = Arc::new(ScriptedHost::with_lines(&["alpha alien bar"]));
    host.set_input("al");
    let pipeline = pipeline_with(Arc::clone(&host), StaticResolver::with_builtins());
    pipeline.set_global(base_options(vec![SourceSpec::from("around")]));

    pipeline.on_event(EditorEvent::Manual).await.unwrap();

    let rendered = host.rendered.lock();
    assert_eq!(rendered.len(), 1);
    let words: Vec<&str> = rendered[0].1.iter().map(|item| item.word.as_str()).collect();
    assert_eq!(words, vec!["alien", "alpha"]);
    assert!(rendered[0]
        .1
        .iter()
        .all(|item| item.source_name() == Some("around")));
}

#[tokio::test]
async fn layered_configuration_reaches_the_run() {
    let mut scripted = ScriptedHost::with_lines(&["alpha"]);
    scripted.filetype = "cpp".to_string();
    scripted.set_input("a");
    let host = Arc::new(scripted);
    let pipeline = pipeline_with(Arc::clone(&host), StaticResolver::with_builtins());

    pipeline.set_global(base_options(vec![SourceSpec::from("around")]));
    // Filetype layer sets a mark, buffer layer overrides it.
    let mut filetype_partial = UserOptions::default();
    filetype_partial.source_options.insert(
        "around".to_string(),
        PartialSourceOptions {
            mark: Some("F".to_string()),
            ..Default::default()
        },
    );
    pipeline.patch_filetype("cpp", &filetype_partial);
    let mut buffer_partial = UserOptions::default();
    buffer_partial.source_options.insert(
        "around".to_string(),
        PartialSourceOptions {
            mark: Some("B".to_string()),
            ..Default::default()
        },
    );
    pipeline.patch_buffer(1, &buffer_partial);

    pipeline.on_event(EditorEvent::TextChangedI).await.unwrap();
    assert_eq!(host.rendered.lock().len(), 1);

    // Only the input differs from the previous world, so the run is admitted
    // and the layered options apply to it.
    host.set_input("al");
    pipeline.on_event(EditorEvent::TextChangedI).await.unwrap();

    let rendered = host.rendered.lock();
    assert_eq!(rendered.len(), 2);
    assert_eq!(rendered[1].1[0].menu.as_deref(), Some("B"));
}

#[tokio::test]
async fn unchanged_worlds_are_skipped_until_the_input_moves() {
    let host = Arc::new(ScriptedHost::with_lines(&["alpha alien"]));
    host.set_input("al");
    let pipeline = pipeline_with(Arc::clone(&host), StaticResolver::with_builtins());
    pipeline.set_global(base_options(vec![SourceSpec::from("around")]));

    pipeline.on_event(EditorEvent::TextChangedI).await.unwrap();
    assert_eq!(host.rendered.lock().len(), 1);

    // Identical world: dropped without another run.
    pipeline.on_event(EditorEvent::TextChangedI).await.unwrap();
    assert_eq!(host.rendered.lock().len(), 1);

    host.set_input("ali");
    pipeline.on_event(EditorEvent::TextChangedI).await.unwrap();
    assert_eq!(host.rendered.lock().len(), 2);
}

#[tokio::test]
async fn active_input_method_suppresses_runs() {
    let mut scripted = ScriptedHost::with_lines(&["alpha"]);
    scripted.enabled_plugins.insert("skk".to_string());
    scripted.set_input("al");
    let host = Arc::new(scripted);
    let pipeline = pipeline_with(Arc::clone(&host), StaticResolver::with_builtins());
    pipeline.set_global(base_options(vec![SourceSpec::from("around")]));

    pipeline.on_event(EditorEvent::Manual).await.unwrap();
    assert!(host.rendered.lock().is_empty());
    assert_eq!(*host.hides.lock(), 0);
}

#[tokio::test]
async fn faulty_source_costs_only_its_own_contribution() {
    let host = Arc::new(ScriptedHost::with_lines(&["alpha"]));
    host.set_input("al");
    let resolver = StaticResolver::with_builtins();
    resolver.register(ExtensionKind::Source, "broken", || {
        Extension::Source(Arc::new(FailingSource))
    });
    let pipeline = pipeline_with(Arc::clone(&host), resolver);
    pipeline.set_global(base_options(vec![
        SourceSpec::from("broken"),
        SourceSpec::from("around"),
    ]));

    pipeline.on_event(EditorEvent::Manual).await.unwrap();

    let rendered = host.rendered.lock();
    assert_eq!(rendered.len(), 1);
    assert_eq!(rendered[0].1[0].word, "alpha");

    let notifications = host.notifications.lock();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].0, MessageLevel::Error);
    assert!(notifications[0].1.contains("broken"));
    assert!(notifications[0].1.contains("gather"));
}

#[tokio::test]
async fn missing_source_is_reported_once_per_session() {
    let host = Arc::new(ScriptedHost::with_lines(&["alpha"]));
    host.set_input("al");
    let pipeline = pipeline_with(Arc::clone(&host), StaticResolver::with_builtins());
    pipeline.set_global(base_options(vec![
        SourceSpec::from("nonexistent"),
        SourceSpec::from("around"),
    ]));

    pipeline.on_event(EditorEvent::Manual).await.unwrap();
    host.set_input("alp");
    pipeline.on_event(EditorEvent::Manual).await.unwrap();

    assert_eq!(host.rendered.lock().len(), 2);
    let notifications = host.notifications.lock();
    assert_eq!(notifications.len(), 1);
    assert!(notifications[0].1.contains("nonexistent"));
}

#[tokio::test]
async fn gather_deadline_is_absorbed_silently() {
    let host = Arc::new(ScriptedHost::with_lines(&["alpha"]));
    host.set_input("al");
    let resolver = StaticResolver::with_builtins();
    resolver.register(ExtensionKind::Source, "slow", || {
        Extension::Source(Arc::new(SlowSource))
    });
    let pipeline = pipeline_with(Arc::clone(&host), resolver);

    let spec = SourceSpec::WithOverrides {
        name: "slow".to_string(),
        options: Some(PartialSourceOptions {
            timeout_ms: Some(50),
            ..Default::default()
        }),
        params: None,
    };
    pipeline.set_global(base_options(vec![spec]));

    pipeline.on_event(EditorEvent::Manual).await.unwrap();

    // Nothing gathered in time: the popup is hidden, nobody is notified.
    assert!(host.rendered.lock().is_empty());
    assert_eq!(*host.hides.lock(), 1);
    assert!(host.notifications.lock().is_empty());
}

#[tokio::test]
async fn call_site_overrides_win_over_keyed_layers() {
    let host = Arc::new(ScriptedHost::with_lines(&["alpha"]));
    host.set_input("al");
    let pipeline = pipeline_with(Arc::clone(&host), StaticResolver::with_builtins());

    let mut global = base_options(Vec::new());
    global.source_options.insert(
        "around".to_string(),
        PartialSourceOptions {
            mark: Some("keyed".to_string()),
            ..Default::default()
        },
    );
    global.sources = Some(vec![SourceSpec::WithOverrides {
        name: "around".to_string(),
        options: Some(PartialSourceOptions {
            mark: Some("call-site".to_string()),
            ..Default::default()
        }),
        params: None,
    }]);
    pipeline.set_global(global);

    pipeline.on_event(EditorEvent::Manual).await.unwrap();

    let rendered = host.rendered.lock();
    assert_eq!(rendered[0].1[0].menu.as_deref(), Some("call-site"));
}

#[tokio::test]
async fn complete_done_reaches_the_producing_source() {
    let done_called = Arc::new(AtomicBool::new(false));
    let host = Arc::new(ScriptedHost::with_lines(&["memo"]));
    host.set_input("me");
    let resolver = StaticResolver::with_builtins();
    let recorder_flag = Arc::clone(&done_called);
    resolver.register(ExtensionKind::Source, "recorder", move || {
        Extension::Source(Arc::new(RecordingSource {
            done_called: Arc::clone(&recorder_flag),
        }))
    });
    let pipeline = pipeline_with(Arc::clone(&host), resolver);
    pipeline.set_global(base_options(vec![SourceSpec::from("recorder")]));

    // Run once so the source is loaded and its items are tagged.
    pipeline.on_event(EditorEvent::Manual).await.unwrap();
    let inserted = host.rendered.lock()[0].1[0].clone();
    assert_eq!(inserted.source_name(), Some("recorder"));

    *host.completed_item.lock() = Some(inserted);
    pipeline.on_complete_done().await.unwrap();
    assert!(done_called.load(Ordering::SeqCst));
}

#[tokio::test]
async fn revoked_callbacks_fail_stale_waiters() {
    let host = Arc::new(ScriptedHost::with_lines(&["alpha"]));
    host.set_input("al");
    let pipeline = pipeline_with(Arc::clone(&host), StaticResolver::with_builtins());
    pipeline.set_global(base_options(vec![SourceSpec::from("around")]));

    let stale = pipeline.callbacks().waiter_factory();
    pipeline.on_event(EditorEvent::Manual).await.unwrap();

    // The admitted run revoked everything issued before it.
    let outcome = stale.wait("host-response").await;
    assert_eq!(outcome.unwrap_err(), PipelineError::Cancelled);
}
