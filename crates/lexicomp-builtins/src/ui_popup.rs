//! Popup UI
//!
//! Thin candidate renderer delegating to the host's popup primitives. An
//! empty candidate set hides the popup instead of drawing an empty frame.

use async_trait::async_trait;

use lexicomp_core::Result;
use lexicomp_registry::{BaseUi, UiHideArgs, UiShowArgs};

pub struct PopupUi;

#[async_trait]
impl BaseUi for PopupUi {
    async fn show(&self, args: UiShowArgs<'_>) -> Result<()> {
        if args.items.is_empty() {
            return args.host.hide_popup().await;
        }
        let col = args.context.input.chars().count() as u64 + 1;
        args.host
            .render_popup((args.context.line_nr, col), args.items)
            .await
    }

    async fn hide(&self, args: UiHideArgs<'_>) -> Result<()> {
        args.host.hide_popup().await
    }
}
