//! Core data model for the completion pipeline
//!
//! `World` is a point-in-time snapshot of editor state used to decide whether
//! to run the pipeline; `Context` is its externally visible subset handed to
//! every extension call. Both are immutable for the duration of one run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Buffer identifier assigned by the host
pub type BufferId = i64;

/// The three extension capability kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionKind {
    Ui,
    Source,
    Filter,
}

impl ExtensionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtensionKind::Ui => "ui",
            ExtensionKind::Source => "source",
            ExtensionKind::Filter => "filter",
        }
    }
}

impl fmt::Display for ExtensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Editor events that can trigger a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EditorEvent {
    /// Explicit user request; never skipped as negligible
    Manual,
    /// First event after startup
    Initialize,
    InsertEnter,
    TextChangedI,
    TextChangedP,
    /// Fired by the host after a candidate was inserted
    CompleteDone,
}

impl EditorEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            EditorEvent::Manual => "Manual",
            EditorEvent::Initialize => "Initialize",
            EditorEvent::InsertEnter => "InsertEnter",
            EditorEvent::TextChangedI => "TextChangedI",
            EditorEvent::TextChangedP => "TextChangedP",
            EditorEvent::CompleteDone => "CompleteDone",
        }
    }

    /// Events that are admitted even when the observed world is unchanged
    pub fn bypasses_negligibility(&self) -> bool {
        matches!(
            self,
            EditorEvent::Manual | EditorEvent::Initialize | EditorEvent::CompleteDone
        )
    }
}

impl fmt::Display for EditorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host editing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Normal,
    Insert,
    Command,
}

/// Severity for user-visible host notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Warn,
    Error,
}

/// Immutable snapshot of editor state at one instant.
///
/// Exactly one previous `World` is retained for negligibility comparison;
/// there is no history beyond one step.
#[derive(Debug, Clone, PartialEq)]
pub struct World {
    pub bufnr: BufferId,
    pub changed_by_completion: bool,
    pub changed_tick: u64,
    pub event: EditorEvent,
    pub filetype: String,
    /// Raw input text before the cursor
    pub input: String,
    pub input_method_active: bool,
    pub line_nr: u64,
    pub mode: Mode,
    /// Text after the cursor on the current line
    pub next_input: String,
}

impl World {
    /// Drop host-internal flags, keeping the subset extensions may observe.
    pub fn to_context(&self) -> Context {
        Context {
            changed_tick: self.changed_tick,
            event: self.event,
            filetype: self.filetype.clone(),
            input: self.input.clone(),
            line_nr: self.line_nr,
            mode: self.mode,
            next_input: self.next_input.clone(),
        }
    }
}

/// The externally visible subset of a `World`, passed to every extension call
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    pub changed_tick: u64,
    pub event: EditorEvent,
    pub filetype: String,
    pub input: String,
    pub line_nr: u64,
    pub mode: Mode,
    pub next_input: String,
}

/// Key under which the orchestrator records the producing source in an item's
/// opaque user data.
pub const SOURCE_NAME_KEY: &str = "__source";

/// One completion candidate
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Item {
    pub word: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abbr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub menu: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    /// Opaque payload round-tripped through the host and back on
    /// completion-done
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<serde_json::Value>,
}

impl Item {
    pub fn new(word: impl Into<String>) -> Self {
        Item {
            word: word.into(),
            ..Default::default()
        }
    }

    pub fn with_abbr(mut self, abbr: impl Into<String>) -> Self {
        self.abbr = Some(abbr.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_menu(mut self, menu: impl Into<String>) -> Self {
        self.menu = Some(menu.into());
        self
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }

    /// Record the producing source inside `user_data`, preserving any payload
    /// the source attached.
    pub fn tag_source(&mut self, source: &str) {
        let map = match self.user_data.take() {
            Some(serde_json::Value::Object(map)) => Some(map),
            Some(other) => {
                // Non-object payloads are kept under their own key.
                let mut map = serde_json::Map::new();
                map.insert("payload".to_string(), other);
                Some(map)
            }
            None => Some(serde_json::Map::new()),
        };
        let mut map = map.unwrap_or_default();
        map.insert(
            SOURCE_NAME_KEY.to_string(),
            serde_json::Value::String(source.to_string()),
        );
        self.user_data = Some(serde_json::Value::Object(map));
    }

    /// The producing source recorded by `tag_source`, if any.
    pub fn source_name(&self) -> Option<&str> {
        self.user_data
            .as_ref()?
            .get(SOURCE_NAME_KEY)?
            .as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world(event: EditorEvent, input: &str) -> World {
        World {
            bufnr: 1,
            changed_by_completion: false,
            changed_tick: 10,
            event,
            filetype: "rust".to_string(),
            input: input.to_string(),
            input_method_active: false,
            line_nr: 3,
            mode: Mode::Insert,
            next_input: String::new(),
        }
    }

    #[test]
    fn context_drops_host_internal_flags() {
        let w = world(EditorEvent::TextChangedI, "ab");
        let ctx = w.to_context();
        assert_eq!(ctx.input, "ab");
        assert_eq!(ctx.event, EditorEvent::TextChangedI);
        assert_eq!(ctx.filetype, "rust");
    }

    #[test]
    fn source_tagging_round_trips() {
        let mut item = Item::new("foo").with_kind("word");
        item.tag_source("around");
        assert_eq!(item.source_name(), Some("around"));

        // An existing payload survives tagging.
        let mut item = Item::new("bar");
        item.user_data = Some(serde_json::json!({ "snippet": true }));
        item.tag_source("snip");
        assert_eq!(item.source_name(), Some("snip"));
        assert_eq!(
            item.user_data.as_ref().unwrap().get("snippet"),
            Some(&serde_json::Value::Bool(true))
        );
    }

    #[test]
    fn negligibility_bypass_events() {
        assert!(EditorEvent::Manual.bypasses_negligibility());
        assert!(EditorEvent::Initialize.bypasses_negligibility());
        assert!(EditorEvent::CompleteDone.bypasses_negligibility());
        assert!(!EditorEvent::TextChangedI.bypasses_negligibility());
    }
}
