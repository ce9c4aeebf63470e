//! Watch loop: filesystem events in, debounced recompilations out
//!
//! A notify watcher forwards raw event paths over a channel; this single
//! coordinating loop classifies them against the configured inputs and
//! triggers, filters editor noise by content hash, and arms one cancellable
//! delayed task per key. An uncancelled expiry recompiles the affected file
//! (or, for a trigger, the full batch).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::channel;
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use sha2::{Digest, Sha256};

use crate::batch::{enumerate_files, BatchEvent, BatchJob, BatchRunner, BatchSummary};
use crate::directive::Directive;
use crate::error::RescompResult;
use crate::paths;

use super::event::{DebounceQueue, TaskKind, WatchEvent, WatchOptions};

/// Channel poll interval while idle
const POLL: Duration = Duration::from_millis(50);

/// How long to drain the spurious events some notify backends emit right
/// after a watch is registered
const STARTUP_COOLDOWN: Duration = Duration::from_millis(500);

/// Start watching for file changes. Blocks until `running` goes false.
pub fn watch(
    options: WatchOptions,
    running: Arc<AtomicBool>,
    event_callback: impl Fn(WatchEvent),
) -> RescompResult<()> {
    // Canonicalize what exists so event paths from the OS compare equal
    // even when the watched tree is reached through a symlink.
    let jobs: Vec<BatchJob> = options
        .jobs
        .iter()
        .map(|job| BatchJob {
            input: canonical(&job.input),
            output: job.output.as_deref().map(paths::absolutize),
        })
        .collect();
    let triggers: Vec<PathBuf> = options.triggers.iter().map(|t| canonical(t)).collect();

    event_callback(WatchEvent::WatchStarted {
        inputs: jobs
            .iter()
            .map(|job| job.input.display().to_string())
            .collect(),
    });

    let runner = BatchRunner::new(&jobs, options.compile, &options.config);

    // Initial full pass, then remember what everything looked like so
    // only real changes schedule work.
    run_full(&runner, &event_callback)?;
    let mut hashes = seed_hashes(&jobs, &triggers);

    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                for path in event.paths {
                    let _ = tx.send(path);
                }
            }
        },
        NotifyConfig::default(),
    )
    .map_err(notify_io)?;

    for job in &jobs {
        watcher
            .watch(&job.input, recursion_for(&job.input))
            .map_err(notify_io)?;
    }
    for trigger in &triggers {
        if trigger.exists() {
            watcher
                .watch(trigger, recursion_for(trigger))
                .map_err(notify_io)?;
        } else {
            event_callback(WatchEvent::Error {
                message: format!("trigger path does not exist: {}", trigger.display()),
            });
        }
    }

    // Startup cooldown: drain initial events without processing them.
    let cooldown_end = Instant::now() + STARTUP_COOLDOWN;
    while Instant::now() < cooldown_end {
        let _ = rx.recv_timeout(POLL);
    }

    let delay = Duration::from_millis(options.config.watch.debounce_ms);
    let mut queue = DebounceQueue::new(delay);

    while running.load(Ordering::SeqCst) {
        let timeout = queue
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()).min(POLL))
            .unwrap_or(POLL);

        if let Ok(path) = rx.recv_timeout(timeout) {
            let path = canonical(&path);
            if let Some((key, kind)) = classify(&path, &jobs, &triggers) {
                if content_changed(&path, &mut hashes) {
                    let replaced = queue.schedule(key, kind);
                    if !replaced {
                        event_callback(WatchEvent::FileChanged {
                            path: path.display().to_string(),
                        });
                    }
                }
            }
        }

        for (key, kind) in queue.take_due(Instant::now()) {
            match kind {
                TaskKind::Full => {
                    event_callback(WatchEvent::TriggerFired {
                        path: key.display().to_string(),
                    });
                    run_full(&runner, &event_callback)?;
                }
                TaskKind::Single { job } => {
                    run_single(&runner, job, &key, &event_callback)?;
                }
            }
        }
    }

    event_callback(WatchEvent::Shutdown);
    Ok(())
}

/// Map an event path onto its debounce key.
///
/// Trigger paths win over input membership; anything under a job's output
/// tree is ignored so our own writes never feed back into the loop.
pub(crate) fn classify(
    path: &Path,
    jobs: &[BatchJob],
    triggers: &[PathBuf],
) -> Option<(PathBuf, TaskKind)> {
    if path.is_dir() {
        return None;
    }

    for trigger in triggers {
        if path.starts_with(trigger) {
            return Some((trigger.clone(), TaskKind::Full));
        }
    }

    for job in jobs {
        if let Some(output) = &job.output {
            if path.starts_with(output) {
                return None;
            }
        }
    }

    for (index, job) in jobs.iter().enumerate() {
        if path.starts_with(&job.input) {
            return Some((path.to_path_buf(), TaskKind::Single { job: index }));
        }
    }

    None
}

fn run_full(runner: &BatchRunner, event_callback: &impl Fn(WatchEvent)) -> RescompResult<()> {
    let forward = forwarder(event_callback);
    let summary = match runner.run(&forward) {
        Ok(summary) => summary,
        Err(err) => {
            event_callback(WatchEvent::Error {
                message: err.to_string(),
            });
            return Err(err);
        }
    };
    emit_pass_complete(&summary, event_callback);
    Ok(())
}

fn run_single(
    runner: &BatchRunner,
    job: usize,
    path: &Path,
    event_callback: &impl Fn(WatchEvent),
) -> RescompResult<()> {
    // The file can vanish between the event and the window closing
    // (deletes, rename halves); there is nothing to rebuild then.
    if !path.is_file() {
        return Ok(());
    }

    let mut summary = BatchSummary::default();
    let forward = forwarder(event_callback);
    if let Err(err) = runner.process_file(job, path, &forward, &mut summary) {
        event_callback(WatchEvent::Error {
            message: err.to_string(),
        });
        return Err(err);
    }
    emit_pass_complete(&summary, event_callback);
    Ok(())
}

fn forwarder(event_callback: &impl Fn(WatchEvent)) -> impl Fn(BatchEvent) + '_ {
    move |batch_event| {
        if let BatchEvent::Compiled { missing, .. } = &batch_event {
            for (path, kind) in missing {
                event_callback(WatchEvent::MissingDirective {
                    line: Directive::render(*kind, path),
                });
            }
        }
    }
}

fn emit_pass_complete(summary: &BatchSummary, event_callback: &impl Fn(WatchEvent)) {
    event_callback(WatchEvent::PassComplete {
        compiled: summary.compiled,
        copied: summary.copied,
        missing: summary.missing_directives,
    });
}

/// Hash every watched file so pre-existing content never schedules work.
fn seed_hashes(jobs: &[BatchJob], triggers: &[PathBuf]) -> HashMap<PathBuf, String> {
    let mut hashes = HashMap::new();
    let roots = jobs
        .iter()
        .map(|job| job.input.clone())
        .chain(triggers.iter().cloned());
    for root in roots {
        if root.is_file() {
            insert_hash(&mut hashes, &root);
        } else if root.is_dir() {
            if let Ok(files) = enumerate_files(&root) {
                for file in files {
                    insert_hash(&mut hashes, &file);
                }
            }
        }
    }
    hashes
}

fn insert_hash(hashes: &mut HashMap<PathBuf, String>, path: &Path) {
    if let Ok(bytes) = std::fs::read(path) {
        hashes.insert(path.to_path_buf(), content_hash(&bytes));
    }
}

/// Did the file's content actually change since we last saw it?
///
/// Unreadable paths count as changed (deletion and rename events matter).
fn content_changed(path: &Path, hashes: &mut HashMap<PathBuf, String>) -> bool {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(_) => return true,
    };
    let new_hash = content_hash(&bytes);
    match hashes.get(path) {
        Some(old_hash) if *old_hash == new_hash => false,
        _ => {
            hashes.insert(path.to_path_buf(), new_hash);
            true
        }
    }
}

fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| paths::absolutize(path))
}

fn recursion_for(path: &Path) -> RecursiveMode {
    if path.is_dir() {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    }
}

fn notify_io(err: notify::Error) -> crate::error::RescompError {
    crate::error::RescompError::Io(std::io::Error::other(err.to_string()))
}
