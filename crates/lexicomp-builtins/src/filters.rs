//! Bundled filters
//!
//! One of each filter role: a prefix matcher, a rank sorter, and an
//! abbreviation-truncating converter. Filters receive and return owned item
//! lists; ordering and content are theirs to define.

use async_trait::async_trait;

use lexicomp_core::options::Params;
use lexicomp_core::types::Item;
use lexicomp_core::Result;
use lexicomp_registry::{BaseFilter, FilterArgs};

/// Keeps items whose word starts with the text being completed
pub struct MatcherHead;

#[async_trait]
impl BaseFilter for MatcherHead {
    async fn filter(&self, args: FilterArgs<'_>) -> Result<Vec<Item>> {
        if args.complete_str.is_empty() {
            return Ok(args.items);
        }
        let ignore_case = args
            .params
            .get("ignore_case")
            .and_then(|value| value.as_bool())
            .unwrap_or(false);
        let needle = if ignore_case {
            args.complete_str.to_lowercase()
        } else {
            args.complete_str.to_string()
        };
        Ok(args
            .items
            .into_iter()
            .filter(|item| {
                if ignore_case {
                    item.word.to_lowercase().starts_with(&needle)
                } else {
                    item.word.starts_with(&needle)
                }
            })
            .collect())
    }
}

/// Orders items by where the completed text occurs in the word, earlier
/// occurrences first, ties broken lexicographically
pub struct SorterRank;

#[async_trait]
impl BaseFilter for SorterRank {
    async fn filter(&self, args: FilterArgs<'_>) -> Result<Vec<Item>> {
        let mut items = args.items;
        let needle = args.complete_str;
        items.sort_by(|a, b| {
            let rank_a = rank(&a.word, needle);
            let rank_b = rank(&b.word, needle);
            rank_a.cmp(&rank_b).then_with(|| a.word.cmp(&b.word))
        });
        Ok(items)
    }
}

/// Match position of `needle` in `word`; misses sort last.
fn rank(word: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    word.find(needle).unwrap_or(usize::MAX)
}

const DEFAULT_MAX_ABBR_WIDTH: u64 = 80;

/// Truncates long abbreviations so the popup stays narrow
pub struct ConverterTruncate;

#[async_trait]
impl BaseFilter for ConverterTruncate {
    fn params(&self) -> Params {
        let mut params = Params::new();
        params.insert(
            "max_abbr_width".to_string(),
            DEFAULT_MAX_ABBR_WIDTH.into(),
        );
        params
    }

    async fn filter(&self, args: FilterArgs<'_>) -> Result<Vec<Item>> {
        let max_width = args
            .params
            .get("max_abbr_width")
            .and_then(|value| value.as_u64())
            .unwrap_or(DEFAULT_MAX_ABBR_WIDTH) as usize;
        if max_width == 0 {
            return Ok(args.items);
        }
        let mut items = args.items;
        for item in &mut items {
            let abbr = item.abbr.as_deref().unwrap_or(&item.word);
            if abbr.chars().count() > max_width {
                let truncated: String = abbr.chars().take(max_width.saturating_sub(1)).collect();
                item.abbr = Some(format!("{truncated}…"));
            }
        }
        Ok(items)
    }
}
