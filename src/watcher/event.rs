//! Watch event types, options, and the per-key debounce queue

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::batch::BatchJob;
use crate::compiler::CompileOptions;
use crate::config::Config;

/// Default debounce window in milliseconds
pub const DEBOUNCE_MS: u64 = 100;

/// Watch options
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Configured input/output pairs
    pub jobs: Vec<BatchJob>,
    /// Extra watched paths; a change to one forces full recompilation
    pub triggers: Vec<PathBuf>,
    /// Compile options shared by every recompilation
    pub compile: CompileOptions,
    /// Loaded configuration (debounce window, eligibility, format)
    pub config: Config,
}

/// Watch event types for NDJSON output
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WatchEvent {
    WatchStarted {
        inputs: Vec<String>,
    },
    FileChanged {
        path: String,
    },
    TriggerFired {
        path: String,
    },
    MissingDirective {
        line: String,
    },
    PassComplete {
        compiled: usize,
        copied: usize,
        missing: usize,
    },
    Error {
        message: String,
    },
    Shutdown,
}

impl WatchEvent {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Work an expired key maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TaskKind {
    /// Recompile (or re-copy) one affected file of one job
    Single { job: usize },
    /// A trigger fired: recompile every configured input in full
    Full,
}

/// Per-key pending-task map: at most one cancellable delayed task per
/// watched path at any instant.
///
/// Owned by the single coordinating loop, which serializes all scheduling
/// decisions; replace-if-pending is therefore atomic. Cancellation only
/// ever prevents an unstarted task from starting.
#[derive(Debug)]
pub(crate) struct DebounceQueue {
    delay: Duration,
    pending: HashMap<PathBuf, (TaskKind, Instant)>,
}

impl DebounceQueue {
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: HashMap::new(),
        }
    }

    /// Arm (or re-arm) the task for `key`, opening a fresh debounce
    /// window. Returns true when an existing pending task was cancelled
    /// and replaced.
    pub(crate) fn schedule(&mut self, key: PathBuf, kind: TaskKind) -> bool {
        self.pending
            .insert(key, (kind, Instant::now() + self.delay))
            .is_some()
    }

    /// Remove and return every task whose window closed uncancelled,
    /// in deterministic key order.
    pub(crate) fn take_due(&mut self, now: Instant) -> Vec<(PathBuf, TaskKind)> {
        let mut due: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, (_, deadline))| *deadline <= now)
            .map(|(key, _)| key.clone())
            .collect();
        due.sort();
        due.into_iter()
            .map(|key| {
                let (kind, _) = self.pending.remove(&key).expect("key was just listed");
                (key, kind)
            })
            .collect()
    }

    /// Earliest pending deadline, if any.
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|(_, deadline)| *deadline).min()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}
