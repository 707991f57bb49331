// src/config.rs
//! Run configuration: which sources to compare, which sheet to read from
//! each workbook, and how to run. Loaded from YAML and/or command-line flags.

use glob::glob;
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, HashSet},
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::compare::Source;
use crate::load::source_name;
use crate::output::Format;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config `{path}`")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config `{path}`")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid sheet mapping `{0}`, expected NAME=SHEET")]
    SheetMapping(String),
    #[error("invalid source pattern `{pattern}`: {reason}")]
    Pattern { pattern: String, reason: String },
    #[error("at least two sources are required, got {0}")]
    TooFewSources(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Paths or glob patterns, in comparison order.
    pub sources: Vec<String>,
    /// Sheet per workbook, keyed by the workbook's base file name.
    pub sheets: BTreeMap<String, String>,
    pub jobs: Option<usize>,
    pub format: Option<Format>,
}

impl RunConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    /// Layer `overrides` on top of `self`: non-empty source lists replace,
    /// sheet entries are merged key by key, options replace when set.
    pub fn merge(mut self, overrides: RunConfig) -> Self {
        if !overrides.sources.is_empty() {
            self.sources = overrides.sources;
        }
        self.sheets.extend(overrides.sheets);
        self.jobs = overrides.jobs.or(self.jobs);
        self.format = overrides.format.or(self.format);
        self
    }

    /// Expand patterns, drop duplicates, attach sheet selectors, and require
    /// at least two sources.
    pub fn resolve_sources(&self) -> Result<Vec<Source>, ConfigError> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();

        for pattern in &self.sources {
            for path in expand_pattern(pattern)? {
                if !seen.insert(path.clone()) {
                    warn!(path = %path.display(), "duplicate source ignored");
                    continue;
                }
                let mut source = Source::new(path);
                if let Some(sheet) = self.sheets.get(&source_name(&source.path)) {
                    source = source.with_sheet(sheet.clone());
                }
                out.push(source);
            }
        }

        for name in self.sheets.keys() {
            if !out.iter().any(|s| &s.name() == name) {
                warn!(source = %name, "sheet mapping does not match any source");
            }
        }

        if out.len() < 2 {
            return Err(ConfigError::TooFewSources(out.len()));
        }
        debug!(sources = out.len(), "resolved sources");
        Ok(out)
    }
}

/// Parse a `NAME=SHEET` command-line entry.
pub fn parse_sheet_arg(arg: &str) -> Result<(String, String), ConfigError> {
    match arg.split_once('=') {
        Some((name, sheet)) if !name.trim().is_empty() && !sheet.is_empty() => {
            Ok((name.trim().to_string(), sheet.to_string()))
        }
        _ => Err(ConfigError::SheetMapping(arg.to_string())),
    }
}

fn is_pattern(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

/// Literal paths pass through untouched (a missing file is reported by the
/// loader, per pair); glob patterns expand in sorted order.
fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>, ConfigError> {
    if !is_pattern(pattern) {
        return Ok(vec![PathBuf::from(pattern)]);
    }
    let paths = glob(pattern)
        .map_err(|e| ConfigError::Pattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?
        .filter_map(|entry| match entry {
            Ok(p) => Some(p),
            Err(e) => {
                warn!(error = %e, "skipping unreadable glob match");
                None
            }
        })
        .filter(|p| p.is_file())
        .collect::<Vec<_>>();
    if paths.is_empty() {
        warn!(pattern, "pattern matched no files");
    }
    Ok(paths)
}
