//! Editor-host collaborator surface
//!
//! Everything the pipeline needs from the editor goes through this trait so
//! the engine can be driven by a remote-call transport in production and a
//! scripted host in tests. Every method is a suspension point.

use async_trait::async_trait;

use crate::error::Result;
use crate::options::UserOptions;
use crate::types::{BufferId, Item, MessageLevel, Mode};

/// Asynchronous view of the editor consumed by the pipeline
#[async_trait]
pub trait EditorHost: Send + Sync {
    /// Buffer the cursor is currently in
    async fn current_buffer(&self) -> Result<BufferId>;

    /// Monotonic change counter for a buffer
    async fn changed_tick(&self, bufnr: BufferId) -> Result<u64>;

    /// Filetype option of a buffer
    async fn filetype(&self, bufnr: BufferId) -> Result<String>;

    /// Filetype supplied by a context-detection plugin, when one is active.
    /// Takes precedence over the buffer's own filetype option.
    async fn filetype_override(&self) -> Result<Option<String>>;

    /// The item the host just inserted, present only directly after a
    /// completion was accepted
    async fn completed_item(&self) -> Result<Option<Item>>;

    /// Text on the current line before the cursor
    async fn input_before_cursor(&self) -> Result<String>;

    /// Text on the current line after the cursor
    async fn input_after_cursor(&self) -> Result<String>;

    /// Cursor position as (line, column), 1-based line
    async fn cursor(&self) -> Result<(u64, u64)>;

    /// Current editing mode. May race with mode transitions; the snapshotter
    /// special-cases the enter-insert event instead of trusting this.
    async fn mode(&self) -> Result<Mode>;

    /// The buffer's keyword character-class definition (`48-57,_,@` style)
    async fn keyword_class(&self, bufnr: BufferId) -> Result<String>;

    /// The buffer's type marker; empty for an ordinary file buffer
    async fn buffer_type(&self, bufnr: BufferId) -> Result<String>;

    /// Whether a named host plugin is loaded and active
    async fn is_plugin_enabled(&self, name: &str) -> Result<bool>;

    /// Read a range of lines from a buffer, 1-based and inclusive
    async fn get_lines(&self, bufnr: BufferId, start: u64, end: u64) -> Result<Vec<String>>;

    /// Total line count of a buffer
    async fn line_count(&self, bufnr: BufferId) -> Result<u64>;

    /// Invoke a registered dynamic-context evaluator and return the partial
    /// options it produced
    async fn eval_context(&self, id: &str) -> Result<UserOptions>;

    /// Evaluate a host-side boolean condition (`enabled_if` expressions)
    async fn eval_condition(&self, expr: &str) -> Result<bool>;

    /// Render the candidate popup at a position
    async fn render_popup(&self, pos: (u64, u64), items: &[Item]) -> Result<()>;

    /// Hide the candidate popup if it is showing
    async fn hide_popup(&self) -> Result<()>;

    /// Surface a message to the user
    async fn notify_user(&self, level: MessageLevel, message: &str);
}
