//! Bundled extensions for lexicomp
//!
//! The out-of-the-box extension set: a buffer-words source, a prefix
//! matcher, a rank sorter, a truncating converter, and a popup UI, plus the
//! [`StaticResolver`] that makes them loadable by name. [`testing`] carries
//! a scripted host shared by the workspace test suites.

pub mod filters;
pub mod resolver;
pub mod source_around;
pub mod testing;
pub mod ui_popup;

pub use filters::{ConverterTruncate, MatcherHead, SorterRank};
pub use resolver::StaticResolver;
pub use source_around::AroundSource;
pub use testing::ScriptedHost;
pub use ui_popup::PopupUi;
