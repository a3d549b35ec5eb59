//! Buffer-words source
//!
//! Gathers keyword runs from the lines surrounding the cursor. The scan
//! window is bounded by the `max_size` parameter (total lines, centered on
//! the cursor) so huge buffers stay cheap.

use std::collections::HashSet;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use lexicomp_core::options::Params;
use lexicomp_core::types::Item;
use lexicomp_core::Result;
use lexicomp_registry::{BaseSource, GatherArgs};

const DEFAULT_MAX_SIZE: u64 = 200;

/// Completion source backed by the words already present around the cursor
pub struct AroundSource;

#[async_trait]
impl BaseSource for AroundSource {
    fn params(&self) -> Params {
        let mut params = Params::new();
        params.insert("max_size".to_string(), DEFAULT_MAX_SIZE.into());
        params
    }

    async fn gather(&self, args: GatherArgs<'_>) -> Result<Vec<Item>> {
        let max_size = args
            .params
            .get("max_size")
            .and_then(|value| value.as_u64())
            .unwrap_or(DEFAULT_MAX_SIZE);
        let half = max_size / 2;

        let bufnr = args.host.current_buffer().await?;
        let line_count = args.host.line_count(bufnr).await?;
        let start = args.context.line_nr.saturating_sub(half).max(1);
        let end = (args.context.line_nr + half).min(line_count);
        let lines = args.host.get_lines(bufnr, start, end).await?;

        let pattern = match Regex::new(&args.options.keyword_pattern) {
            Ok(pattern) => pattern,
            Err(error) => {
                debug!(%error, "keyword pattern does not compile, no candidates");
                return Ok(Vec::new());
            }
        };

        let mut seen = HashSet::new();
        let mut items = Vec::new();
        for line in lines {
            for found in pattern.find_iter(&line) {
                let word = found.as_str();
                if word.is_empty() || !seen.insert(word.to_string()) {
                    continue;
                }
                items.push(Item::new(word));
            }
        }
        Ok(items)
    }
}
