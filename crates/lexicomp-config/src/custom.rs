//! Layered option store
//!
//! One `Custom` instance exists per editor session. It owns the four option
//! layers and folds them in fixed precedence order:
//! global → filetype → dynamic-context-result → buffer. `set_*` replaces a
//! layer wholesale, `patch_*` merges into it associatively.
//!
//! The dynamic-context layer stores evaluator ids only; evaluation happens in
//! the engine through the host, and the resulting partial is passed into
//! [`Custom::get`] so this store stays host-free.

use std::collections::HashMap;

use lexicomp_core::options::{Options, UserOptions};
use lexicomp_core::types::BufferId;

use crate::merge::{fold_merge, Patch};

/// Process-wide mutable store of the four option layers
#[derive(Debug, Clone, Default)]
pub struct Custom {
    global: UserOptions,
    filetype: HashMap<String, UserOptions>,
    context: HashMap<String, String>,
    buffer: HashMap<BufferId, UserOptions>,
}

impl Custom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the global layer wholesale
    pub fn set_global(&mut self, options: UserOptions) {
        self.global = options;
    }

    /// Merge a partial into the global layer
    pub fn patch_global(&mut self, partial: &UserOptions) {
        self.global = self.global.patch(partial);
    }

    /// Replace one filetype layer wholesale
    pub fn set_filetype(&mut self, filetype: &str, options: UserOptions) {
        self.filetype.insert(filetype.to_string(), options);
    }

    /// Merge a partial into one filetype layer
    pub fn patch_filetype(&mut self, filetype: &str, partial: &UserOptions) {
        let merged = match self.filetype.get(filetype) {
            Some(existing) => existing.patch(partial),
            None => UserOptions::default().patch(partial),
        };
        self.filetype.insert(filetype.to_string(), merged);
    }

    /// Replace one buffer layer wholesale
    pub fn set_buffer(&mut self, bufnr: BufferId, options: UserOptions) {
        self.buffer.insert(bufnr, options);
    }

    /// Merge a partial into one buffer layer
    pub fn patch_buffer(&mut self, bufnr: BufferId, partial: &UserOptions) {
        let merged = match self.buffer.get(&bufnr) {
            Some(existing) => existing.patch(partial),
            None => UserOptions::default().patch(partial),
        };
        self.buffer.insert(bufnr, merged);
    }

    /// Register a dynamic-context evaluator id for a filetype
    pub fn set_context(&mut self, filetype: &str, evaluator_id: &str) {
        self.context
            .insert(filetype.to_string(), evaluator_id.to_string());
    }

    /// The registered evaluator id for a filetype, if any
    pub fn context_evaluator(&self, filetype: &str) -> Option<&str> {
        self.context.get(filetype).map(String::as_str)
    }

    /// Fold the layers into one effective option set.
    ///
    /// `context_partial` is the already-evaluated result of the filetype's
    /// dynamic-context evaluator; it sits between the filetype and buffer
    /// layers in precedence.
    pub fn get(
        &self,
        filetype: &str,
        bufnr: BufferId,
        context_partial: Option<&UserOptions>,
    ) -> Options {
        fold_merge(
            Options::default(),
            [
                Some(&self.global),
                self.filetype.get(filetype),
                context_partial,
                self.buffer.get(&bufnr),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexicomp_core::options::SourceSpec;

    #[test]
    fn precedence_global_filetype_context_buffer() {
        let mut custom = Custom::new();
        custom.set_global(UserOptions {
            ui: Some("native".to_string()),
            auto_complete_delay: Some(100),
            sources: Some(vec![SourceSpec::from("around")]),
            ..Default::default()
        });
        custom.set_filetype(
            "rust",
            UserOptions {
                auto_complete_delay: Some(50),
                ..Default::default()
            },
        );
        custom.set_buffer(
            7,
            UserOptions {
                ui: Some("inline".to_string()),
                ..Default::default()
            },
        );

        let context = UserOptions {
            sources: Some(vec![SourceSpec::from("snippet")]),
            ..Default::default()
        };

        let effective = custom.get("rust", 7, Some(&context));
        assert_eq!(effective.ui, "inline");
        assert_eq!(effective.auto_complete_delay, 50);
        assert_eq!(effective.sources, vec![SourceSpec::from("snippet")]);

        // A different buffer falls back to the lower layers.
        let effective = custom.get("rust", 8, None);
        assert_eq!(effective.ui, "native");
        assert_eq!(effective.sources, vec![SourceSpec::from("around")]);
    }

    #[test]
    fn patch_creates_missing_layers() {
        let mut custom = Custom::new();
        custom.patch_filetype(
            "cpp",
            &UserOptions {
                auto_complete_delay: Some(5),
                ..Default::default()
            },
        );
        let effective = custom.get("cpp", 1, None);
        assert_eq!(effective.auto_complete_delay, 5);
    }

    #[test]
    fn set_replaces_patch_merges() {
        let mut custom = Custom::new();
        custom.patch_global(&UserOptions {
            ui: Some("native".to_string()),
            auto_complete_delay: Some(100),
            ..Default::default()
        });
        custom.patch_global(&UserOptions {
            ui: Some("pum".to_string()),
            ..Default::default()
        });
        let effective = custom.get("", 1, None);
        assert_eq!(effective.ui, "pum");
        assert_eq!(effective.auto_complete_delay, 100);

        custom.set_global(UserOptions {
            ui: Some("inline".to_string()),
            ..Default::default()
        });
        let effective = custom.get("", 1, None);
        assert_eq!(effective.ui, "inline");
        // The wholesale replacement discarded the patched delay.
        assert_eq!(effective.auto_complete_delay, 0);
    }

    #[test]
    fn context_layer_stores_evaluator_ids() {
        let mut custom = Custom::new();
        custom.set_context("markdown", "ctx-markdown");
        assert_eq!(custom.context_evaluator("markdown"), Some("ctx-markdown"));
        assert_eq!(custom.context_evaluator("rust"), None);
    }
}
