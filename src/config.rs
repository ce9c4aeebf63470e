//! Configuration for rescomp
//!
//! Loaded from `rescomp.toml` when present, with built-in defaults and
//! `RESCOMP_*` environment overrides. Unknown keys are collected as
//! non-fatal warnings rather than rejected.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RescompError, RescompResult};

/// Compilation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Compile-eligible file extensions (lowercase, no dot)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Build-condition set handed to the deserializer (`[$WIN32]` matches
    /// when "WIN32" is present)
    #[serde(default = "default_conditions")]
    pub conditions: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            conditions: default_conditions(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec!["res".to_string()]
}

fn default_conditions() -> Vec<String> {
    vec!["WIN32".to_string()]
}

/// Pretty-printer settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FormatConfig {
    /// Spaces per nesting level
    #[serde(default = "default_tab_width")]
    pub tab_width: usize,

    /// Column where a scalar's value starts
    #[serde(default = "default_value_column")]
    pub value_column: usize,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            tab_width: default_tab_width(),
            value_column: default_value_column(),
        }
    }
}

fn default_tab_width() -> usize {
    4
}

fn default_value_column() -> usize {
    40
}

/// Copy-through settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyConfig {
    /// Extensions whose copy failures are tolerated when the target is held
    /// open by another process (fonts, typically)
    #[serde(default = "default_lockable")]
    pub lockable_extensions: Vec<String>,
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            lockable_extensions: default_lockable(),
        }
    }
}

fn default_lockable() -> Vec<String> {
    vec!["ttf".to_string(), "otf".to_string(), "fon".to_string()]
}

/// Watch-mode settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Debounce window in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    crate::watcher::DEBOUNCE_MS
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub format: FormatConfig,

    #[serde(default)]
    pub copy: CopyConfig,

    #[serde(default)]
    pub watch: WatchConfig,
}

/// Non-fatal configuration warning surfaced to CLI users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub key: String,
    pub file: PathBuf,
    pub line: Option<usize>,
    pub suggestion: Option<String>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> RescompResult<Self> {
        let (config, _warnings) = Self::load_with_warnings(path)?;
        Ok(config)
    }

    /// Load configuration and collect non-fatal warnings (unknown keys).
    pub fn load_with_warnings(path: &Path) -> RescompResult<(Self, Vec<ConfigWarning>)> {
        let content = fs::read_to_string(path)?;

        let mut unknown_paths: Vec<String> = Vec::new();
        let deserializer = toml::de::Deserializer::new(&content);

        let config: Self = serde_ignored::deserialize(deserializer, |path| {
            unknown_paths.push(path.to_string());
        })
        .map_err(|e| RescompError::InvalidConfig {
            file: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let warnings = unknown_paths
            .into_iter()
            .map(|path_str| {
                let key = path_str
                    .rsplit('.')
                    .next()
                    .unwrap_or(path_str.as_str())
                    .to_string();
                ConfigWarning {
                    line: find_line_number(&content, &key),
                    suggestion: suggest_key(&key),
                    key,
                    file: path.to_path_buf(),
                }
            })
            .collect();

        Ok((config, warnings))
    }

    /// Load `rescomp.toml` from the working directory when present, else
    /// defaults. Environment overrides apply either way.
    pub fn load_or_default(explicit: Option<&Path>) -> RescompResult<Self> {
        if let Some(path) = explicit {
            return Ok(Self::load(path)?.with_env_overrides());
        }
        let default_path = Path::new("rescomp.toml");
        if default_path.exists() {
            return Ok(Self::load(default_path)?.with_env_overrides());
        }
        Ok(Self::default().with_env_overrides())
    }

    /// Apply environment variable overrides (RESCOMP_* prefix).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(ms) = std::env::var("RESCOMP_DEBOUNCE_MS") {
            if let Ok(parsed) = ms.parse() {
                self.watch.debounce_ms = parsed;
            }
        }

        if let Ok(conditions) = std::env::var("RESCOMP_CONDITIONS") {
            let parsed: Vec<String> = conditions
                .split(',')
                .map(|s| s.trim().to_ascii_uppercase())
                .filter(|s| !s.is_empty())
                .collect();
            if !parsed.is_empty() {
                self.build.conditions = parsed;
            }
        }

        self
    }

    /// The condition set in the form the deserializer consumes.
    pub fn condition_set(&self) -> HashSet<String> {
        self.build
            .conditions
            .iter()
            .map(|c| c.to_ascii_uppercase())
            .collect()
    }

    /// Whether a path's extension is compile-eligible.
    pub fn is_compile_eligible(&self, path: &Path) -> bool {
        extension_in(path, &self.build.extensions)
    }

    /// Whether a path's extension is tolerated when locked during copy.
    pub fn is_lockable(&self, path: &Path) -> bool {
        extension_in(path, &self.copy.lockable_extensions)
    }
}

fn extension_in(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            extensions.iter().any(|x| x.eq_ignore_ascii_case(&e))
        })
        .unwrap_or(false)
}

fn find_line_number(content: &str, needle: &str) -> Option<usize> {
    content
        .lines()
        .position(|line| line.contains(needle))
        .map(|i| i + 1)
}

fn suggest_key(unknown: &str) -> Option<String> {
    const CANDIDATES: &[&str] = &[
        "build",
        "extensions",
        "conditions",
        "format",
        "tab_width",
        "value_column",
        "copy",
        "lockable_extensions",
        "watch",
        "debounce_ms",
    ];

    CANDIDATES
        .iter()
        .map(|candidate| (*candidate, edit_distance(unknown, candidate)))
        .min_by_key(|(_, dist)| *dist)
        .filter(|(_, dist)| *dist <= 2)
        .map(|(candidate, _)| candidate.to_string())
}

fn edit_distance(a: &str, b: &str) -> usize {
    let b_len = b.chars().count();
    let mut row: Vec<usize> = (0..=b_len).collect();

    for (i, ac) in a.chars().enumerate() {
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, bc) in b.chars().enumerate() {
            let substitution = diagonal + usize::from(ac != bc);
            diagonal = row[j + 1];
            row[j + 1] = substitution.min(row[j] + 1).min(diagonal + 1);
        }
    }

    row[b_len]
}
