//! rescomp - KeyValues resource compiler
//!
//! rescomp flattens a tree of KeyValues configuration files (a root file
//! plus everything it pulls in via `#base`/`#include` directives) into a
//! single pretty-printed output. Directives whose targets are absent on
//! disk are preserved as literal lines so they can still resolve on a
//! deployment machine, and a watch mode recompiles incrementally on
//! filesystem change with per-key debouncing.

pub mod batch;
pub mod compiler;
pub mod config;
pub mod directive;
pub mod error;
pub mod keyvalues;
pub mod paths;
pub mod resolver;
pub mod watcher;

// Re-exports for convenience
pub use batch::{pair_jobs, BatchEvent, BatchJob, BatchRunner, BatchSummary};
pub use compiler::{compile, CompileOptions, CompiledFile};
pub use config::{Config, ConfigWarning};
pub use directive::{scan_directives, Directive, DirectiveKind};
pub use error::{RescompError, RescompResult};
pub use keyvalues::{deserialize, fold_identifiers, serialize, KvNode};
pub use resolver::{DirectiveCatalog, InclusionFrame, PathResolver};
pub use watcher::{watch, WatchEvent, WatchOptions};
