//! File watcher for continuous recompilation
//!
//! Implements the `--watch` flag with:
//! - Per-key debouncing (100ms by default)
//! - Trigger paths that force full recompilation
//! - Content-hash filtering of editor noise
//! - Graceful Ctrl+C shutdown
//! - NDJSON output for CI

mod event;
mod scheduler;

pub use event::{WatchEvent, WatchOptions, DEBOUNCE_MS};
pub use scheduler::watch;
