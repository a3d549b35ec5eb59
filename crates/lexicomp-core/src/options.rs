//! Effective and partial option records
//!
//! `Options` is the single effective configuration a pipeline run receives.
//! The `User*`/`Partial*` counterparts are sparse records settable by the
//! user; the merge engine in `lexicomp-config` folds them into the effective
//! forms. The reserved key `"_"` in every keyed map supplies defaults applied
//! to every extension name.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::EditorEvent;

/// Reserved keyed-map key carrying defaults for every extension name
pub const DEFAULT_KEY: &str = "_";

/// Free-form extension parameters
pub type Params = serde_json::Map<String, serde_json::Value>;

/// A configured source: either a bare name or a name with call-site
/// overrides that take precedence over the keyed option layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceSpec {
    Name(String),
    WithOverrides {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        options: Option<PartialSourceOptions>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        params: Option<Params>,
    },
}

impl SourceSpec {
    pub fn name(&self) -> &str {
        match self {
            SourceSpec::Name(name) => name,
            SourceSpec::WithOverrides { name, .. } => name,
        }
    }

    /// Call-site option overrides, if any
    pub fn options(&self) -> Option<&PartialSourceOptions> {
        match self {
            SourceSpec::Name(_) => None,
            SourceSpec::WithOverrides { options, .. } => options.as_ref(),
        }
    }

    /// Call-site param overrides, if any
    pub fn params(&self) -> Option<&Params> {
        match self {
            SourceSpec::Name(_) => None,
            SourceSpec::WithOverrides { params, .. } => params.as_ref(),
        }
    }
}

impl From<&str> for SourceSpec {
    fn from(name: &str) -> Self {
        SourceSpec::Name(name.to_string())
    }
}

/// Effective configuration for one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub ui: String,
    pub sources: Vec<SourceSpec>,
    pub post_filters: Vec<String>,
    pub auto_complete_delay: i64,
    pub auto_complete_events: Vec<EditorEvent>,
    pub backspace_completion: bool,
    /// May contain the `\k` placeholder, expanded from the buffer's keyword
    /// class before the run starts
    pub keyword_pattern: String,
    pub special_buffer_completion: bool,
    pub source_options: HashMap<String, PartialSourceOptions>,
    pub source_params: HashMap<String, Params>,
    pub filter_options: HashMap<String, PartialFilterOptions>,
    pub filter_params: HashMap<String, Params>,
    pub ui_options: HashMap<String, PartialUiOptions>,
    pub ui_params: HashMap<String, Params>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            ui: String::new(),
            sources: Vec::new(),
            post_filters: Vec::new(),
            auto_complete_delay: 0,
            auto_complete_events: vec![EditorEvent::TextChangedI, EditorEvent::TextChangedP],
            backspace_completion: false,
            keyword_pattern: "\\k*".to_string(),
            special_buffer_completion: false,
            source_options: HashMap::new(),
            source_params: HashMap::new(),
            filter_options: HashMap::new(),
            filter_params: HashMap::new(),
            ui_options: HashMap::new(),
            ui_params: HashMap::new(),
        }
    }
}

/// Sparse user-facing counterpart of [`Options`].
///
/// Scalars overwrite when present; keyed maps merge per key and never lose
/// keys present on only one side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserOptions {
    pub ui: Option<String>,
    pub sources: Option<Vec<SourceSpec>>,
    pub post_filters: Option<Vec<String>>,
    pub auto_complete_delay: Option<i64>,
    pub auto_complete_events: Option<Vec<EditorEvent>>,
    pub backspace_completion: Option<bool>,
    pub keyword_pattern: Option<String>,
    pub special_buffer_completion: Option<bool>,
    pub source_options: HashMap<String, PartialSourceOptions>,
    pub source_params: HashMap<String, Params>,
    pub filter_options: HashMap<String, PartialFilterOptions>,
    pub filter_params: HashMap<String, Params>,
    pub ui_options: HashMap<String, PartialUiOptions>,
    pub ui_params: HashMap<String, Params>,
}

/// Effective per-source options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceOptions {
    pub converters: Vec<String>,
    /// Host-evaluated condition gating the source; empty means always enabled
    pub enabled_if: String,
    pub ignore_case: bool,
    /// Menu mark displayed next to candidates from this source
    pub mark: String,
    /// Alternate item field temporarily substituted as the match text while
    /// matchers run; empty disables the substitution
    pub matcher_key: String,
    pub matchers: Vec<String>,
    pub max_items: usize,
    /// 0 means unbounded
    pub max_keyword_length: usize,
    pub min_auto_complete_length: usize,
    /// 0 means no lower bound
    pub min_keyword_length: usize,
    pub sorters: Vec<String>,
    /// Per-call gather deadline
    pub timeout_ms: u64,
}

impl Default for SourceOptions {
    fn default() -> Self {
        SourceOptions {
            converters: Vec::new(),
            enabled_if: String::new(),
            ignore_case: false,
            mark: String::new(),
            matcher_key: String::new(),
            matchers: Vec::new(),
            max_items: 500,
            max_keyword_length: 0,
            min_auto_complete_length: 2,
            min_keyword_length: 0,
            sorters: Vec::new(),
            timeout_ms: 2000,
        }
    }
}

/// Sparse counterpart of [`SourceOptions`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialSourceOptions {
    pub converters: Option<Vec<String>>,
    pub enabled_if: Option<String>,
    pub ignore_case: Option<bool>,
    pub mark: Option<String>,
    pub matcher_key: Option<String>,
    pub matchers: Option<Vec<String>>,
    pub max_items: Option<usize>,
    pub max_keyword_length: Option<usize>,
    pub min_auto_complete_length: Option<usize>,
    pub min_keyword_length: Option<usize>,
    pub sorters: Option<Vec<String>>,
    pub timeout_ms: Option<u64>,
}

/// Effective per-filter options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterOptions {
    pub enabled: bool,
}

impl Default for FilterOptions {
    fn default() -> Self {
        FilterOptions { enabled: true }
    }
}

/// Sparse counterpart of [`FilterOptions`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialFilterOptions {
    pub enabled: Option<bool>,
}

/// Effective per-UI options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiOptions {
    pub enabled: bool,
}

impl Default for UiOptions {
    fn default() -> Self {
        UiOptions { enabled: true }
    }
}

/// Sparse counterpart of [`UiOptions`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialUiOptions {
    pub enabled: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_conservative() {
        let opts = Options::default();
        assert!(opts.sources.is_empty());
        assert_eq!(opts.keyword_pattern, "\\k*");
        assert_eq!(
            opts.auto_complete_events,
            vec![EditorEvent::TextChangedI, EditorEvent::TextChangedP]
        );

        let source = SourceOptions::default();
        assert_eq!(source.max_items, 500);
        assert_eq!(source.timeout_ms, 2000);
        assert_eq!(source.max_keyword_length, 0);
    }

    #[test]
    fn user_options_deserialize_sparsely() {
        let parsed: UserOptions =
            serde_json::from_str(r#"{ "sources": ["around"], "source_params": { "around": { "max_size": 300 } } }"#)
                .unwrap();
        assert_eq!(
            parsed.sources.as_deref(),
            Some(&[SourceSpec::from("around")][..])
        );
        assert!(parsed.ui.is_none());
        assert_eq!(
            parsed.source_params["around"]["max_size"],
            serde_json::json!(300)
        );
    }
}
