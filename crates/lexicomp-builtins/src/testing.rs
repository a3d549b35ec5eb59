//! Scripted editor host for tests
//!
//! A fully in-memory [`EditorHost`] whose answers are set up front and whose
//! outward calls (popups, notifications) are recorded for assertions. Used
//! by the test suites of the downstream crates; not intended for production.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;

use lexicomp_core::options::UserOptions;
use lexicomp_core::types::{BufferId, Item, MessageLevel, Mode};
use lexicomp_core::{EditorHost, PipelineError, Result};

/// Scripted [`EditorHost`] with recorded outputs
pub struct ScriptedHost {
    pub bufnr: BufferId,
    pub changed_tick: u64,
    pub filetype: String,
    pub filetype_override: Option<String>,
    pub completed_item: Mutex<Option<Item>>,
    pub input: Mutex<String>,
    pub next_input: String,
    pub cursor: (u64, u64),
    pub mode: Mode,
    pub keyword_class: String,
    pub buffer_type: String,
    pub enabled_plugins: HashSet<String>,
    pub lines: Vec<String>,
    pub context_evaluators: HashMap<String, UserOptions>,
    pub conditions: HashMap<String, bool>,
    /// Recorded `(position, items)` of every popup render
    pub rendered: Mutex<Vec<((u64, u64), Vec<Item>)>>,
    /// Number of times the popup was hidden
    pub hides: Mutex<usize>,
    /// Recorded user notifications
    pub notifications: Mutex<Vec<(MessageLevel, String)>>,
}

impl Default for ScriptedHost {
    fn default() -> Self {
        ScriptedHost {
            bufnr: 1,
            changed_tick: 1,
            filetype: String::new(),
            filetype_override: None,
            completed_item: Mutex::new(None),
            input: Mutex::new(String::new()),
            next_input: String::new(),
            cursor: (1, 1),
            mode: Mode::Insert,
            keyword_class: "48-57,_,@".to_string(),
            buffer_type: String::new(),
            enabled_plugins: HashSet::new(),
            lines: Vec::new(),
            context_evaluators: HashMap::new(),
            conditions: HashMap::new(),
            rendered: Mutex::new(Vec::new()),
            hides: Mutex::new(0),
            notifications: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedHost {
    pub fn with_lines(lines: &[&str]) -> Self {
        ScriptedHost {
            lines: lines.iter().map(|line| line.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn set_input(&self, input: &str) {
        *self.input.lock() = input.to_string();
    }
}

#[async_trait]
impl EditorHost for ScriptedHost {
    async fn current_buffer(&self) -> Result<BufferId> {
        Ok(self.bufnr)
    }

    async fn changed_tick(&self, _bufnr: BufferId) -> Result<u64> {
        Ok(self.changed_tick)
    }

    async fn filetype(&self, _bufnr: BufferId) -> Result<String> {
        Ok(self.filetype.clone())
    }

    async fn filetype_override(&self) -> Result<Option<String>> {
        Ok(self.filetype_override.clone())
    }

    async fn completed_item(&self) -> Result<Option<Item>> {
        Ok(self.completed_item.lock().clone())
    }

    async fn input_before_cursor(&self) -> Result<String> {
        Ok(self.input.lock().clone())
    }

    async fn input_after_cursor(&self) -> Result<String> {
        Ok(self.next_input.clone())
    }

    async fn cursor(&self) -> Result<(u64, u64)> {
        Ok(self.cursor)
    }

    async fn mode(&self) -> Result<Mode> {
        Ok(self.mode)
    }

    async fn keyword_class(&self, _bufnr: BufferId) -> Result<String> {
        Ok(self.keyword_class.clone())
    }

    async fn buffer_type(&self, _bufnr: BufferId) -> Result<String> {
        Ok(self.buffer_type.clone())
    }

    async fn is_plugin_enabled(&self, name: &str) -> Result<bool> {
        Ok(self.enabled_plugins.contains(name))
    }

    async fn get_lines(&self, _bufnr: BufferId, start: u64, end: u64) -> Result<Vec<String>> {
        let start = start.max(1) as usize;
        let end = (end as usize).min(self.lines.len());
        if start > end {
            return Ok(Vec::new());
        }
        Ok(self.lines[start - 1..end].to_vec())
    }

    async fn line_count(&self, _bufnr: BufferId) -> Result<u64> {
        Ok(self.lines.len() as u64)
    }

    async fn eval_context(&self, id: &str) -> Result<UserOptions> {
        self.context_evaluators
            .get(id)
            .cloned()
            .ok_or_else(|| PipelineError::Host(format!("no context evaluator {id}")))
    }

    async fn eval_condition(&self, expr: &str) -> Result<bool> {
        Ok(self.conditions.get(expr).copied().unwrap_or(false))
    }

    async fn render_popup(&self, pos: (u64, u64), items: &[Item]) -> Result<()> {
        self.rendered.lock().push((pos, items.to_vec()));
        Ok(())
    }

    async fn hide_popup(&self) -> Result<()> {
        *self.hides.lock() += 1;
        Ok(())
    }

    async fn notify_user(&self, level: MessageLevel, message: &str) {
        self.notifications
            .lock()
            .push((level, message.to_string()));
    }
}
