//! Compile one KeyValues file into a flattened document
//!
//! Drives the deserializer with a [`PathResolver`] as its file loader,
//! merges root-level and transitively-discovered directive information,
//! re-emits directives whose targets are absent on disk, and serializes
//! the parsed tree. The engine never prints; callers surface notices from
//! the returned [`CompiledFile`].

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::directive::{scan_directives, Directive, DirectiveKind};
use crate::error::{RescompError, RescompResult};
use crate::keyvalues;
use crate::paths;
use crate::resolver::PathResolver;

/// Per-job compile options, shared by every file of a batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    /// Fail the job on a missing directive target instead of preserving
    /// the directive (`--error-on-missing`)
    pub error_on_missing: bool,
    /// Drop unresolved directives from the output entirely
    pub omit_missing_directives: bool,
}

/// Result of compiling one file.
#[derive(Debug)]
pub struct CompiledFile {
    /// Full output text: missing-directive block, then the serialized body.
    pub text: String,
    /// Missing directives, keyed relative to the input's directory.
    pub missing: BTreeMap<String, DirectiveKind>,
    /// Every directive seen, discovered transitively or scanned at the
    /// root. Root-scanned entries win on key collision.
    pub directives: BTreeMap<String, DirectiveKind>,
}

/// Compile `input`, resolving directives relative to its directory.
///
/// `output` only affects how preserved directive paths are spelled: given
/// an output path they are rewritten relative to its directory; compiling
/// to console keeps them relative to the input's directory.
pub fn compile(
    input: &Path,
    output: Option<&Path>,
    options: &CompileOptions,
    config: &Config,
) -> RescompResult<CompiledFile> {
    let input = paths::absolutize(input);
    let input_dir = parent_dir(&input)?;

    let raw = fs::read_to_string(&input)?;
    let root_directives = scan_directives(&raw);

    let mut resolver = PathResolver::new(&input, &raw, !options.error_on_missing)?;
    let conditions = config.condition_set();
    let folded = keyvalues::fold_identifiers(&raw);
    let tree = {
        let mut loader = |path: &str| resolver.resolve(path);
        keyvalues::deserialize(&folded, &mut loader, &conditions)?
    };
    let catalog = resolver.into_catalog();

    // Union of everything seen; the root scan wins over transitive
    // discovery on key collisions.
    let mut directives: BTreeMap<String, DirectiveKind> = catalog.discovered().clone();
    for d in &root_directives {
        directives.insert(root_key(&input_dir, d), d.kind);
    }

    let mut missing: BTreeMap<String, DirectiveKind> = BTreeMap::new();
    for d in &root_directives {
        if !input_dir.join(&d.target).is_file() {
            missing.entry(root_key(&input_dir, d)).or_insert(d.kind);
        }
    }
    for (key, kind) in catalog.missing() {
        missing.entry(key.clone()).or_insert(*kind);
    }

    if options.error_on_missing {
        if let Some(path) = missing.keys().next() {
            return Err(RescompError::MissingRequiredFile { path: path.clone() });
        }
    }

    let mut text = String::new();
    if !options.omit_missing_directives && !missing.is_empty() {
        let output_dir = match output {
            Some(output) => Some(parent_dir(&paths::absolutize(output))?),
            None => None,
        };
        for (key, kind) in &missing {
            let spelled = match &output_dir {
                Some(output_dir) => paths::forward_slashes(&paths::relative_to(
                    &input_dir.join(key),
                    output_dir,
                )),
                None => key.clone(),
            };
            text.push_str(&Directive::render(*kind, &spelled));
            text.push('\n');
        }
        text.push('\n');
    }

    text.push_str(&keyvalues::serialize(&tree, &config.format));

    Ok(CompiledFile {
        text,
        missing,
        directives,
    })
}

fn parent_dir(path: &Path) -> RescompResult<PathBuf> {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .ok_or_else(|| RescompError::InvalidPath {
            path: path.to_path_buf(),
        })
}

fn root_key(input_dir: &Path, directive: &Directive) -> String {
    paths::catalog_key(&input_dir.join(&directive.target), input_dir)
}
