//! Option merge engine
//!
//! Merging is right-biased and associative: scalar fields overwrite, keyed
//! maps merge per key and never lose keys present on only one side. All
//! operations are total over well-typed inputs; there are no error paths
//! here. Deletion is not supported: patching a key with an empty partial is
//! a no-op merge that keeps existing nested values.

use std::collections::HashMap;

use lexicomp_core::options::{
    FilterOptions, Options, Params, PartialFilterOptions, PartialSourceOptions, PartialUiOptions,
    SourceOptions, UiOptions, UserOptions, DEFAULT_KEY,
};

/// Shallow overwrite of a total record by a sparse partial
pub trait Overwrite {
    type Partial;

    /// Overwrite every field of `self` that is present in `partial`
    fn overwrite(&mut self, partial: &Self::Partial);
}

/// Right-biased combination of two sparse partials of the same shape
pub trait Patch: Sized {
    /// Combine `self` with `newer`; fields present in `newer` win, keyed
    /// maps merge per key
    fn patch(&self, newer: &Self) -> Self;
}

/// Apply one partial to a total record, returning the merged record
pub fn merge<T: Overwrite>(mut base: T, partial: &T::Partial) -> T {
    base.overwrite(partial);
    base
}

/// Reduce `[base, partials...]` left-to-right; absent partials are no-ops
pub fn fold_merge<'a, T, I>(mut base: T, partials: I) -> T
where
    T: Overwrite,
    T::Partial: 'a,
    I: IntoIterator<Item = Option<&'a T::Partial>>,
{
    for partial in partials.into_iter().flatten() {
        base.overwrite(partial);
    }
    base
}

/// Merge two key→partial maps.
///
/// Keys present in exactly one input pass through unchanged; keys present in
/// both are combined with `combine`. No key is ever dropped.
pub fn merge_each_keys<P: Clone>(
    older: &HashMap<String, P>,
    newer: &HashMap<String, P>,
    combine: impl Fn(&P, &P) -> P,
) -> HashMap<String, P> {
    let mut merged = older.clone();
    for (key, value) in newer {
        match merged.get(key) {
            Some(existing) => {
                let combined = combine(existing, value);
                merged.insert(key.clone(), combined);
            }
            None => {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    merged
}

macro_rules! overwrite_scalars {
    ($base:ident, $partial:ident, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = &$partial.$field {
                $base.$field = value.clone();
            }
        )+
    };
}

macro_rules! patch_scalars {
    ($older:ident, $newer:ident, $out:ident, $($field:ident),+ $(,)?) => {
        $(
            $out.$field = $newer.$field.clone().or_else(|| $older.$field.clone());
        )+
    };
}

impl Overwrite for SourceOptions {
    type Partial = PartialSourceOptions;

    fn overwrite(&mut self, partial: &PartialSourceOptions) {
        overwrite_scalars!(
            self, partial, converters, enabled_if, ignore_case, mark, matcher_key, matchers,
            max_items, max_keyword_length, min_auto_complete_length, min_keyword_length, sorters,
            timeout_ms,
        );
    }
}

impl Patch for PartialSourceOptions {
    fn patch(&self, newer: &Self) -> Self {
        let mut out = PartialSourceOptions::default();
        patch_scalars!(
            self, newer, out, converters, enabled_if, ignore_case, mark, matcher_key, matchers,
            max_items, max_keyword_length, min_auto_complete_length, min_keyword_length, sorters,
            timeout_ms,
        );
        out
    }
}

impl Overwrite for FilterOptions {
    type Partial = PartialFilterOptions;

    fn overwrite(&mut self, partial: &PartialFilterOptions) {
        overwrite_scalars!(self, partial, enabled);
    }
}

impl Patch for PartialFilterOptions {
    fn patch(&self, newer: &Self) -> Self {
        let mut out = PartialFilterOptions::default();
        patch_scalars!(self, newer, out, enabled);
        out
    }
}

impl Overwrite for UiOptions {
    type Partial = PartialUiOptions;

    fn overwrite(&mut self, partial: &PartialUiOptions) {
        overwrite_scalars!(self, partial, enabled);
    }
}

impl Patch for PartialUiOptions {
    fn patch(&self, newer: &Self) -> Self {
        let mut out = PartialUiOptions::default();
        patch_scalars!(self, newer, out, enabled);
        out
    }
}

// Params records are their own partial shape: a param map applied to another
// overwrites key by key.
impl Overwrite for Params {
    type Partial = Params;

    fn overwrite(&mut self, partial: &Params) {
        for (key, value) in partial {
            self.insert(key.clone(), value.clone());
        }
    }
}

impl Patch for Params {
    fn patch(&self, newer: &Self) -> Self {
        let mut out = self.clone();
        out.overwrite(newer);
        out
    }
}

impl Overwrite for Options {
    type Partial = UserOptions;

    fn overwrite(&mut self, partial: &UserOptions) {
        overwrite_scalars!(
            self,
            partial,
            ui,
            sources,
            post_filters,
            auto_complete_delay,
            auto_complete_events,
            backspace_completion,
            keyword_pattern,
            special_buffer_completion,
        );
        self.source_options =
            merge_each_keys(&self.source_options, &partial.source_options, Patch::patch);
        self.source_params =
            merge_each_keys(&self.source_params, &partial.source_params, Patch::patch);
        self.filter_options =
            merge_each_keys(&self.filter_options, &partial.filter_options, Patch::patch);
        self.filter_params =
            merge_each_keys(&self.filter_params, &partial.filter_params, Patch::patch);
        self.ui_options = merge_each_keys(&self.ui_options, &partial.ui_options, Patch::patch);
        self.ui_params = merge_each_keys(&self.ui_params, &partial.ui_params, Patch::patch);
    }
}

impl Patch for UserOptions {
    fn patch(&self, newer: &Self) -> Self {
        let mut out = UserOptions::default();
        patch_scalars!(
            self,
            newer,
            out,
            ui,
            sources,
            post_filters,
            auto_complete_delay,
            auto_complete_events,
            backspace_completion,
            keyword_pattern,
            special_buffer_completion,
        );
        out.source_options =
            merge_each_keys(&self.source_options, &newer.source_options, Patch::patch);
        out.source_params =
            merge_each_keys(&self.source_params, &newer.source_params, Patch::patch);
        out.filter_options =
            merge_each_keys(&self.filter_options, &newer.filter_options, Patch::patch);
        out.filter_params =
            merge_each_keys(&self.filter_params, &newer.filter_params, Patch::patch);
        out.ui_options = merge_each_keys(&self.ui_options, &newer.ui_options, Patch::patch);
        out.ui_params = merge_each_keys(&self.ui_params, &newer.ui_params, Patch::patch);
        out
    }
}

/// Effective options for one source invocation.
///
/// Precedence: defaults, then the reserved `"_"` layer, then the per-name
/// layer, then the call-site override.
pub fn source_options(
    options: &Options,
    name: &str,
    call_site: Option<&PartialSourceOptions>,
) -> SourceOptions {
    fold_merge(
        SourceOptions::default(),
        [
            options.source_options.get(DEFAULT_KEY),
            options.source_options.get(name),
            call_site,
        ],
    )
}

/// Effective params for one source invocation, starting from the extension's
/// declared defaults
pub fn source_params(
    options: &Options,
    name: &str,
    defaults: Params,
    call_site: Option<&Params>,
) -> Params {
    fold_merge(
        defaults,
        [
            options.source_params.get(DEFAULT_KEY),
            options.source_params.get(name),
            call_site,
        ],
    )
}

/// Effective options for one filter invocation
pub fn filter_options(options: &Options, name: &str) -> FilterOptions {
    fold_merge(
        FilterOptions::default(),
        [
            options.filter_options.get(DEFAULT_KEY),
            options.filter_options.get(name),
        ],
    )
}

/// Effective params for one filter invocation
pub fn filter_params(options: &Options, name: &str, defaults: Params) -> Params {
    fold_merge(
        defaults,
        [
            options.filter_params.get(DEFAULT_KEY),
            options.filter_params.get(name),
        ],
    )
}

/// Effective options for the active UI. The UI has no call-site override.
pub fn ui_options(options: &Options, name: &str) -> UiOptions {
    fold_merge(
        UiOptions::default(),
        [
            options.ui_options.get(DEFAULT_KEY),
            options.ui_options.get(name),
        ],
    )
}

/// Effective params for the active UI
pub fn ui_params(options: &Options, name: &str, defaults: Params) -> Params {
    fold_merge(
        defaults,
        [
            options.ui_params.get(DEFAULT_KEY),
            options.ui_params.get(name),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexicomp_core::options::SourceSpec;
    use serde_json::json;

    fn params(pairs: &[(&str, serde_json::Value)]) -> Params {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn scalar_overwrite_is_right_biased() {
        let a = UserOptions {
            ui: Some("native".to_string()),
            auto_complete_delay: Some(10),
            ..Default::default()
        };
        let b = UserOptions {
            ui: Some("pum".to_string()),
            ..Default::default()
        };
        let merged = a.patch(&b);
        assert_eq!(merged.ui.as_deref(), Some("pum"));
        assert_eq!(merged.auto_complete_delay, Some(10));
    }

    #[test]
    fn patching_global_keeps_earlier_keys() {
        // Layers global = {sources: ["around"], source_params: {around: {max_size: 300}}}
        // patched with {sources: ["around", "baz"], source_params: {baz: {foo: "bar"}}}.
        let global = UserOptions {
            sources: Some(vec![SourceSpec::from("around")]),
            source_params: [("around".to_string(), params(&[("max_size", json!(300))]))]
                .into_iter()
                .collect(),
            ..Default::default()
        };
        let patch = UserOptions {
            sources: Some(vec![SourceSpec::from("around"), SourceSpec::from("baz")]),
            source_params: [("baz".to_string(), params(&[("foo", json!("bar"))]))]
                .into_iter()
                .collect(),
            ..Default::default()
        };

        let merged = global.patch(&patch);
        assert_eq!(
            merged.sources,
            Some(vec![SourceSpec::from("around"), SourceSpec::from("baz")])
        );
        assert_eq!(merged.source_params["around"]["max_size"], json!(300));
        assert_eq!(merged.source_params["baz"]["foo"], json!("bar"));
    }

    #[test]
    fn sequential_patches_merge_nested_keys() {
        // Later key wins, earlier untouched keys survive.
        let first = UserOptions {
            filter_params: [("hoge".to_string(), params(&[("foo", json!("bar"))]))]
                .into_iter()
                .collect(),
            ..Default::default()
        };
        let second = UserOptions {
            filter_params: [(
                "hoge".to_string(),
                params(&[("foo", json!("baz")), ("alice", json!("bob"))]),
            )]
            .into_iter()
            .collect(),
            ..Default::default()
        };

        let merged = first.patch(&second);
        assert_eq!(merged.filter_params["hoge"]["foo"], json!("baz"));
        assert_eq!(merged.filter_params["hoge"]["alice"], json!("bob"));
    }

    #[test]
    fn empty_partial_patch_is_a_noop() {
        let base = UserOptions {
            source_options: [(
                "around".to_string(),
                PartialSourceOptions {
                    max_items: Some(20),
                    ..Default::default()
                },
            )]
            .into_iter()
            .collect(),
            ..Default::default()
        };
        let patch = UserOptions {
            source_options: [("around".to_string(), PartialSourceOptions::default())]
                .into_iter()
                .collect(),
            ..Default::default()
        };

        let merged = base.patch(&patch);
        assert_eq!(merged.source_options["around"].max_items, Some(20));
    }

    #[test]
    fn keyed_fold_precedence_default_then_name_then_call_site() {
        let mut options = Options::default();
        options.source_options.insert(
            DEFAULT_KEY.to_string(),
            PartialSourceOptions {
                max_items: Some(100),
                mark: Some("D".to_string()),
                ..Default::default()
            },
        );
        options.source_options.insert(
            "around".to_string(),
            PartialSourceOptions {
                max_items: Some(50),
                ..Default::default()
            },
        );

        let effective = source_options(&options, "around", None);
        assert_eq!(effective.max_items, 50);
        assert_eq!(effective.mark, "D");

        let call_site = PartialSourceOptions {
            max_items: Some(5),
            ..Default::default()
        };
        let effective = source_options(&options, "around", Some(&call_site));
        assert_eq!(effective.max_items, 5);
    }

    #[test]
    fn params_fold_starts_from_extension_defaults() {
        let mut options = Options::default();
        options
            .source_params
            .insert("around".to_string(), params(&[("max_size", json!(100))]));

        let defaults = params(&[("max_size", json!(500)), ("whole_buffer", json!(false))]);
        let effective = source_params(&options, "around", defaults, None);
        assert_eq!(effective["max_size"], json!(100));
        assert_eq!(effective["whole_buffer"], json!(false));
    }
}
