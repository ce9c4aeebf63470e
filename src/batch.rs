//! Batch processing of configured inputs
//!
//! Maps each (input, output) pair onto compile or copy work: single files
//! go straight through, directories are enumerated recursively and
//! mirrored. Compile-eligible files run through the compile engine and are
//! written atomically (tempfile + rename); everything else is copied
//! byte-for-byte. An output of `None` prints compiled text to stdout.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::compiler::{compile, CompileOptions, CompiledFile};
use crate::config::Config;
use crate::directive::DirectiveKind;
use crate::error::{RescompError, RescompResult};

/// One configured input/output pairing. `output: None` means console.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
}

/// Progress callback events emitted while a batch runs.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Compiled {
        input: PathBuf,
        output: Option<PathBuf>,
        missing: Vec<(String, DirectiveKind)>,
    },
    Copied {
        input: PathBuf,
        output: PathBuf,
    },
    CopySkippedLocked {
        path: PathBuf,
    },
}

/// Totals for one batch pass.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub compiled: usize,
    pub copied: usize,
    pub skipped_locked: usize,
    pub missing_directives: usize,
}

/// Pair positional inputs with outputs.
///
/// An empty output list sends everything to the console; otherwise the
/// lists must be the same length, and a directory input cannot map onto an
/// existing file.
pub fn pair_jobs(inputs: &[PathBuf], outputs: &[PathBuf]) -> RescompResult<Vec<BatchJob>> {
    if outputs.is_empty() {
        return Ok(inputs
            .iter()
            .map(|input| BatchJob {
                input: input.clone(),
                output: None,
            })
            .collect());
    }

    if inputs.len() != outputs.len() {
        return Err(RescompError::ArgumentCountMismatch {
            inputs: inputs.len(),
            outputs: outputs.len(),
        });
    }

    let jobs: Vec<BatchJob> = inputs
        .iter()
        .zip(outputs)
        .map(|(input, output)| BatchJob {
            input: input.clone(),
            output: Some(output.clone()),
        })
        .collect();

    for job in &jobs {
        if let Some(output) = &job.output {
            if job.input.is_dir() && output.is_file() {
                return Err(RescompError::OutputPathConflict {
                    input: job.input.clone(),
                    output: output.clone(),
                });
            }
        }
    }

    Ok(jobs)
}

/// Dispatches configured jobs to the compile engine or the copier.
pub struct BatchRunner<'a> {
    jobs: &'a [BatchJob],
    options: CompileOptions,
    config: &'a Config,
}

impl<'a> BatchRunner<'a> {
    pub fn new(jobs: &'a [BatchJob], options: CompileOptions, config: &'a Config) -> Self {
        Self {
            jobs,
            options,
            config,
        }
    }

    /// Process every job in order. Fatal errors abort the whole run.
    pub fn run(&self, on_event: &impl Fn(BatchEvent)) -> RescompResult<BatchSummary> {
        let mut summary = BatchSummary::default();
        for index in 0..self.jobs.len() {
            self.run_job(index, on_event, &mut summary)?;
        }
        Ok(summary)
    }

    /// Process one job in full.
    pub fn run_job(
        &self,
        index: usize,
        on_event: &impl Fn(BatchEvent),
        summary: &mut BatchSummary,
    ) -> RescompResult<()> {
        let job = &self.jobs[index];
        if job.input.is_dir() {
            for file in enumerate_files(&job.input)? {
                self.process_file(index, &file, on_event, summary)?;
            }
        } else {
            let input = job.input.clone();
            self.process_file(index, &input, on_event, summary)?;
        }
        Ok(())
    }

    /// Process one file belonging to job `index`: compile when eligible,
    /// copy otherwise.
    pub fn process_file(
        &self,
        index: usize,
        file: &Path,
        on_event: &impl Fn(BatchEvent),
        summary: &mut BatchSummary,
    ) -> RescompResult<()> {
        let job = &self.jobs[index];
        let output = self.output_for(job, file);

        if self.config.is_compile_eligible(file) {
            let compiled = compile(file, output.as_deref(), &self.options, self.config)?;
            summary.compiled += 1;
            summary.missing_directives += compiled.missing.len();
            self.emit_compiled(file, output, compiled, on_event)?;
            return Ok(());
        }

        // Not compile-eligible; console jobs have nowhere to put raw
        // bytes, so only mirrored outputs copy.
        if let Some(output) = output {
            match copy_verbatim(file, &output) {
                Ok(()) => {
                    summary.copied += 1;
                    on_event(BatchEvent::Copied {
                        input: file.to_path_buf(),
                        output,
                    });
                }
                Err(RescompError::LockedResourceDuringCopy { path })
                    if self.config.is_lockable(file) =>
                {
                    summary.skipped_locked += 1;
                    on_event(BatchEvent::CopySkippedLocked { path });
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// The mirrored output path for `file` under job `index`, or `None`
    /// for console jobs.
    pub fn output_for(&self, job: &BatchJob, file: &Path) -> Option<PathBuf> {
        let output = job.output.as_ref()?;
        if job.input.is_dir() {
            match file.strip_prefix(&job.input) {
                Ok(rel) => Some(output.join(rel)),
                Err(_) => Some(output.join(file.file_name()?)),
            }
        } else {
            Some(output.clone())
        }
    }

    fn emit_compiled(
        &self,
        file: &Path,
        output: Option<PathBuf>,
        compiled: CompiledFile,
        on_event: &impl Fn(BatchEvent),
    ) -> RescompResult<()> {
        match &output {
            Some(path) => atomic_write(path, compiled.text.as_bytes())?,
            None => print!("{}", compiled.text),
        }
        on_event(BatchEvent::Compiled {
            input: file.to_path_buf(),
            output,
            missing: compiled
                .missing
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
        });
        Ok(())
    }
}

/// All files under `dir`, recursively, in sorted order.
pub(crate) fn enumerate_files(dir: &Path) -> RescompResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkBuilder::new(dir).standard_filters(false).build() {
        let entry = entry.map_err(|e| io::Error::other(e.to_string()))?;
        let path = entry.path();
        if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

/// Write content atomically: tempfile in the target directory + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> RescompResult<()> {
    let dir = path.parent().ok_or_else(|| RescompError::InvalidPath {
        path: path.to_path_buf(),
    })?;
    fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    io::Write::write_all(&mut tmp, content)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Copy one file byte-for-byte, creating intermediate directories.
fn copy_verbatim(input: &Path, output: &Path) -> RescompResult<()> {
    if let Some(dir) = output.parent() {
        fs::create_dir_all(dir)?;
    }
    match fs::copy(input, output) {
        Ok(_) => Ok(()),
        Err(err) if is_locked_error(&err) => Err(RescompError::LockedResourceDuringCopy {
            path: output.to_path_buf(),
        }),
        Err(err) => Err(err.into()),
    }
}

/// Does this IO error mean "in use by another process"?
///
/// Windows reports sharing violations as raw OS errors 32/33; elsewhere a
/// locked target typically surfaces as a permission error.
fn is_locked_error(err: &io::Error) -> bool {
    matches!(err.raw_os_error(), Some(32) | Some(33))
        || err.kind() == io::ErrorKind::PermissionDenied
}
