//! Editor-state snapshotting and run admission
//!
//! [`ContextBuilder`] samples the host into an immutable [`World`], compares
//! it against the one previous snapshot, and decides whether a triggering
//! event deserves a pipeline run. The previous snapshot is replaced on every
//! sample, including skipped ones, so negligibility always compares against
//! the latest observation.

use regex::Regex;
use tracing::{debug, warn};

use lexicomp_config::Custom;
use lexicomp_core::types::{Context, EditorEvent, Mode, World};
use lexicomp_core::{EditorHost, Options, Result};

/// Host plugins whose presence marks an active input-method session
const INPUT_METHOD_PLUGINS: [&str; 2] = ["skk", "ime"];

/// Outcome of sampling the editor for one triggering event
pub struct RunInput {
    /// When true the event is dropped without touching any extension
    pub skip: bool,
    pub context: Context,
    pub options: Options,
}

/// Samples editor state and gates pipeline runs on it
#[derive(Default)]
pub struct ContextBuilder {
    last_world: Option<World>,
}

impl ContextBuilder {
    pub fn new() -> Self {
        ContextBuilder { last_world: None }
    }

    /// Snapshot the host into a `World`.
    ///
    /// Independent host queries run concurrently. The enter-insert event
    /// forces insert mode without asking the host, which may still report
    /// the outgoing mode at that instant.
    pub async fn cache_world(&self, host: &dyn EditorHost, event: EditorEvent) -> Result<World> {
        let bufnr = host.current_buffer().await?;
        let mode_query = async {
            if event == EditorEvent::InsertEnter {
                Ok(Mode::Insert)
            } else {
                host.mode().await
            }
        };
        let (
            changed_tick,
            filetype,
            filetype_override,
            completed_item,
            input,
            next_input,
            cursor,
            mode,
            im_primary,
            im_secondary,
        ) = tokio::join!(
            host.changed_tick(bufnr),
            host.filetype(bufnr),
            host.filetype_override(),
            host.completed_item(),
            host.input_before_cursor(),
            host.input_after_cursor(),
            host.cursor(),
            mode_query,
            host.is_plugin_enabled(INPUT_METHOD_PLUGINS[0]),
            host.is_plugin_enabled(INPUT_METHOD_PLUGINS[1]),
        );

        let filetype = match filetype_override? {
            Some(detected) => detected,
            None => filetype?,
        };
        let changed_by_completion = event == EditorEvent::CompleteDone
            && completed_item?.map_or(false, |item| !item.word.is_empty());
        let (line_nr, _) = cursor?;

        Ok(World {
            bufnr,
            changed_by_completion,
            changed_tick: changed_tick?,
            event,
            filetype,
            input: input?,
            input_method_active: im_primary? || im_secondary?,
            line_nr,
            mode: mode?,
            next_input: next_input?,
        })
    }

    /// Sample the host, resolve effective options, and decide admission.
    ///
    /// The snapshot replaces the retained previous world unconditionally,
    /// even when the event is skipped.
    pub async fn create_context(
        &mut self,
        host: &dyn EditorHost,
        event: EditorEvent,
        custom: &Custom,
    ) -> Result<RunInput> {
        let world = self.cache_world(host, event).await?;

        let context_partial = match custom.context_evaluator(&world.filetype) {
            Some(id) => match host.eval_context(id).await {
                Ok(partial) => Some(partial),
                Err(error) => {
                    warn!(evaluator = id, %error, "dynamic context evaluation failed");
                    None
                }
            },
            None => None,
        };
        let mut options = custom.get(&world.filetype, world.bufnr, context_partial.as_ref());

        let negligible = self
            .last_world
            .as_ref()
            .map_or(false, |older| is_negligible(older, &world));
        let mut skip = (!event.bypasses_negligibility() && negligible)
            || world.input_method_active
            || world.changed_by_completion;

        // Deleting text only re-triggers when backspace completion is on.
        if !skip && !options.backspace_completion && !event.bypasses_negligibility() {
            if let Some(older) = &self.last_world {
                if older.bufnr == world.bufnr
                    && world.input.len() < older.input.len()
                    && older.input.starts_with(&world.input)
                {
                    skip = true;
                }
            }
        }

        // Prompt, terminal, and other special buffers are opted out by
        // default.
        if !skip && !options.special_buffer_completion {
            let buffer_type = host.buffer_type(world.bufnr).await?;
            if !buffer_type.is_empty() {
                skip = true;
            }
        }

        if skip {
            debug!(event = %event, input = %world.input, "dropping completion trigger");
        }

        if options.keyword_pattern.contains("\\k") {
            let class = host.keyword_class(world.bufnr).await?;
            let expanded = format!("[{}]", keyword_char_class(&class));
            options.keyword_pattern = options.keyword_pattern.replace("\\k", &expanded);
        }

        let context = world.to_context();
        self.last_world = Some(world);
        Ok(RunInput {
            skip,
            context,
            options,
        })
    }
}

/// Whether two snapshots are indistinguishable for admission purposes.
///
/// Only buffer, filetype, input, and event participate; cursor movement and
/// tick changes alone never make an event significant.
pub fn is_negligible(older: &World, newer: &World) -> bool {
    older.bufnr == newer.bufnr
        && older.filetype == newer.filetype
        && older.input == newer.input
        && older.event == newer.event
}

/// The keyword run immediately before the cursor, per the effective pattern
pub fn complete_prefix(keyword_pattern: &str, input: &str) -> String {
    let anchored = format!("(?:{keyword_pattern})$");
    let pattern = match Regex::new(&anchored) {
        Ok(pattern) => pattern,
        Err(error) => {
            warn!(%error, "invalid keyword pattern, falling back to word characters");
            match Regex::new(r"\w*$") {
                Ok(pattern) => pattern,
                Err(_) => return String::new(),
            }
        }
    };
    pattern
        .find(input)
        .map(|found| found.as_str().to_string())
        .unwrap_or_default()
}

/// Translate an editor keyword-class definition into the inside of a regex
/// character class.
///
/// Supported tokens: decimal codepoints and codepoint ranges (`48-57`),
/// single characters and character ranges (`a-z`), `@` for the letter
/// ranges, backslash-escaped literals, a lone `-` (deferred to the end of
/// the class), and an empty token for a literal comma. Exclusion tokens
/// (`^...`) are not representable in a plain class and are dropped.
pub fn keyword_char_class(class: &str) -> String {
    let mut out = String::new();
    let mut trailing_dash = false;
    let mut literal_comma = false;

    for token in class.split(',') {
        if token.is_empty() {
            literal_comma = true;
            continue;
        }
        if token.starts_with('^') {
            debug!(token, "dropping keyword-class exclusion token");
            continue;
        }
        if token == "@" {
            out.push_str("a-zA-Z");
            continue;
        }
        if token == "-" {
            trailing_dash = true;
            continue;
        }
        // A '-' after the first character splits the token into a range.
        let range_at = token
            .char_indices()
            .skip(1)
            .find(|&(_, c)| c == '-')
            .map(|(i, _)| i);
        if let Some(at) = range_at {
            let (low, high) = (&token[..at], &token[at + 1..]);
            if !high.is_empty() {
                if let (Some(low), Some(high)) = (parse_endpoint(low), parse_endpoint(high)) {
                    push_literal(&mut out, low);
                    out.push('-');
                    push_literal(&mut out, high);
                    continue;
                }
            }
        }
        match parse_endpoint(token) {
            Some(ch) => push_literal(&mut out, ch),
            None => debug!(token, "dropping unsupported keyword-class token"),
        }
    }

    if literal_comma {
        push_literal(&mut out, ',');
    }
    if trailing_dash {
        out.push('-');
    }
    out
}

/// One endpoint of a keyword-class token: a decimal codepoint, a single
/// character, or a backslash-escaped character.
fn parse_endpoint(token: &str) -> Option<char> {
    if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
        return char::from_u32(token.parse().ok()?);
    }
    if let Some(rest) = token.strip_prefix('\\') {
        let mut chars = rest.chars();
        let ch = chars.next()?;
        return chars.next().is_none().then_some(ch);
    }
    let mut chars = token.chars();
    let ch = chars.next()?;
    chars.next().is_none().then_some(ch)
}

fn push_literal(out: &mut String, ch: char) {
    if matches!(ch, '\\' | ']' | '^' | '-') {
        out.push('\\');
    }
    out.push(ch);
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexicomp_core::types::Mode;

    fn world(input: &str, event: EditorEvent) -> World {
        World {
            bufnr: 1,
            changed_by_completion: false,
            changed_tick: 42,
            event,
            filetype: "rust".to_string(),
            input: input.to_string(),
            input_method_active: false,
            line_nr: 7,
            mode: Mode::Insert,
            next_input: String::new(),
        }
    }

    #[test]
    fn identical_worlds_are_negligible() {
        let w = world("ab", EditorEvent::TextChangedI);
        assert!(is_negligible(&w, &w.clone()));
    }

    #[test]
    fn input_change_breaks_negligibility() {
        let older = world("ab", EditorEvent::TextChangedI);
        let newer = world("abc", EditorEvent::TextChangedI);
        assert!(!is_negligible(&older, &newer));
    }

    #[test]
    fn cursor_and_mode_do_not_participate() {
        let older = world("ab", EditorEvent::TextChangedI);
        let mut newer = older.clone();
        newer.line_nr = 99;
        newer.changed_tick = 1000;
        newer.mode = Mode::Normal;
        assert!(is_negligible(&older, &newer));
    }

    #[test]
    fn event_change_breaks_negligibility() {
        let older = world("ab", EditorEvent::TextChangedI);
        let newer = world("ab", EditorEvent::TextChangedP);
        assert!(!is_negligible(&older, &newer));
    }

    #[test]
    fn numeric_ranges_and_literals() {
        assert_eq!(keyword_char_class("48-57,_,@"), "0-9_a-zA-Z");
        assert_eq!(keyword_char_class("95"), "_");
        assert_eq!(keyword_char_class("a-z"), "a-z");
    }

    #[test]
    fn dash_is_deferred_to_the_end() {
        assert_eq!(keyword_char_class("-,48-57"), "0-9-");
        assert_eq!(keyword_char_class("48-57,-"), "0-9-");
    }

    #[test]
    fn empty_token_is_a_literal_comma() {
        assert_eq!(keyword_char_class("48-57,,"), "0-9,");
    }

    #[test]
    fn at_range_means_literal_at() {
        assert_eq!(keyword_char_class("@-@"), "@-@");
    }

    #[test]
    fn escaped_and_special_literals_are_regex_safe() {
        assert_eq!(keyword_char_class("\\]"), "\\]");
        assert_eq!(keyword_char_class("^x,48-57"), "0-9");
    }

    #[test]
    fn prefix_is_the_trailing_keyword_run() {
        assert_eq!(complete_prefix("[0-9a-zA-Z_]*", "let foo_ba"), "foo_ba");
        assert_eq!(complete_prefix("[0-9a-zA-Z_]*", "let "), "");
        assert_eq!(complete_prefix("[a-z]*", "foo Bar"), "ar");
    }

    #[test]
    fn invalid_pattern_falls_back_to_word_characters() {
        assert_eq!(complete_prefix("[unclosed", "let foo"), "foo");
    }
}
