//! Directive resolution: inclusion frames, scope climbing, catalogs
//!
//! The deserializer's file-loader callback carries no caller identity: it
//! only says "open this relative path". [`PathResolver`] reconstructs which
//! currently-open ancestor issued each request by testing, innermost first,
//! whether an open file's text contains the matching directive line. That
//! works because document traversal is depth-first, so the true includer is
//! almost always the most recently opened file still on the stack.
//!
//! Known limitation, inherent to the inference: when two open ancestors
//! both contain an identical directive string, the innermost one is chosen
//! even if the actual includer is an outer frame.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::directive::{find_directive, scan_directives, Directive, DirectiveKind};
use crate::error::{RescompError, RescompResult};
use crate::keyvalues::fold_identifiers;
use crate::paths;

/// One open file during a single deserialization pass.
#[derive(Debug)]
pub struct InclusionFrame {
    /// Directory the frame's file lives in; directive targets resolve
    /// against this.
    pub directory: PathBuf,
    /// Absolute path of the open file.
    pub file_path: PathBuf,
    /// Raw text of the open file.
    pub contents: String,
    /// Directives scanned from `contents` at push time.
    directives: Vec<Directive>,
}

impl InclusionFrame {
    fn new(file_path: PathBuf, contents: String) -> RescompResult<Self> {
        let directory = file_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| RescompError::InvalidPath {
                path: file_path.clone(),
            })?
            .to_path_buf();
        let directives = scan_directives(&contents);
        Ok(Self {
            directory,
            file_path,
            contents,
            directives,
        })
    }
}

/// Directives found during one compile invocation, keyed by path
/// normalized relative to the root file with forward slashes.
#[derive(Debug, Default)]
pub struct DirectiveCatalog {
    discovered: BTreeMap<String, DirectiveKind>,
    missing: BTreeMap<String, DirectiveKind>,
}

impl DirectiveCatalog {
    /// Record a resolved target. First write wins.
    pub fn record_discovered(&mut self, key: String, kind: DirectiveKind) {
        self.discovered.entry(key).or_insert(kind);
    }

    /// Record a target absent on disk. First write wins.
    pub fn record_missing(&mut self, key: String, kind: DirectiveKind) {
        self.missing.entry(key).or_insert(kind);
    }

    pub fn discovered(&self) -> &BTreeMap<String, DirectiveKind> {
        &self.discovered
    }

    pub fn missing(&self) -> &BTreeMap<String, DirectiveKind> {
        &self.missing
    }
}

/// Infers which ancestor issued each file-open request and resolves it.
///
/// Owned by one compile job; the frame stack is mutated only during that
/// job's single, sequential deserialization pass.
#[derive(Debug)]
pub struct PathResolver {
    root_dir: PathBuf,
    stack: Vec<InclusionFrame>,
    catalog: DirectiveCatalog,
    skip_missing: bool,
}

impl PathResolver {
    /// Seed the stack with the root file.
    pub fn new(root_path: &Path, contents: &str, skip_missing: bool) -> RescompResult<Self> {
        let root = InclusionFrame::new(root_path.to_path_buf(), contents.to_string())?;
        Ok(Self {
            root_dir: root.directory.clone(),
            stack: vec![root],
            catalog: DirectiveCatalog::default(),
            skip_missing,
        })
    }

    /// Resolve one file-open request from the deserializer.
    ///
    /// On success returns the target's contents with identifiers
    /// case-folded. On failure, returns an empty stream and catalogs the
    /// target as missing (`skip_missing`), or fails the job
    /// (`MissingRequiredFile`).
    pub fn resolve(&mut self, requested: &str) -> RescompResult<Vec<u8>> {
        loop {
            let top = self.stack.last().expect("stack always holds the root");
            let matched = find_directive(&top.directives, requested).map(|d| d.kind);

            if let Some(kind) = matched {
                let candidate = top.directory.join(requested);
                if candidate.is_file() {
                    return self.open(candidate, kind);
                }
                // Attributed to the top frame, but absent on disk.
                let key = self.catalog_key(&candidate);
                return self.miss(key, kind);
            }

            if self.stack.len() > 1 {
                // This ancestor never named the path; it cannot be the
                // includer. Climb out one scope.
                self.stack.pop();
            } else {
                // Nothing matched anywhere: fall back to a root-relative
                // candidate.
                let candidate = self.root_dir.join(requested);
                let key = self.catalog_key(&candidate);
                return self.miss(key, DirectiveKind::Include);
            }
        }
    }

    /// Consume the resolver, yielding everything it catalogued.
    pub fn into_catalog(self) -> DirectiveCatalog {
        self.catalog
    }

    /// Current nesting depth (the root counts as one).
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn open(&mut self, candidate: PathBuf, kind: DirectiveKind) -> RescompResult<Vec<u8>> {
        let contents = fs::read_to_string(&candidate)?;
        let frame = InclusionFrame::new(paths::lexical_normalize(&candidate), contents)?;

        // Catalog the new file's own dangling directives right away, so
        // they surface even if the deserializer never asks for them.
        for directive in &frame.directives {
            let target = frame.directory.join(&directive.target);
            if !target.is_file() {
                let key = self.catalog_key(&target);
                self.catalog.record_missing(key, directive.kind);
            }
        }

        let key = self.catalog_key(&frame.file_path);
        self.catalog.record_discovered(key, kind);

        let folded = fold_identifiers(&frame.contents);
        self.stack.push(frame);
        Ok(folded.into_bytes())
    }

    fn miss(&mut self, key: String, kind: DirectiveKind) -> RescompResult<Vec<u8>> {
        if self.skip_missing {
            self.catalog.record_missing(key, kind);
            Ok(Vec::new())
        } else {
            Err(RescompError::MissingRequiredFile { path: key })
        }
    }

    fn catalog_key(&self, target: &Path) -> String {
        paths::catalog_key(target, &self.root_dir)
    }
}
