//! Rules file validation.
//!
//! Loads every RON rules file under a path through [`RulesEngine`] and
//! collects the problems per file instead of stopping at the first one.

use std::path::{Path, PathBuf};

use hexwar_core::error::GameError;
use hexwar_core::rules::RulesEngine;
use serde::Serialize;

use crate::error::{Result, ToolError};

/// Outcome for a single rules file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    /// File that was checked.
    pub path: PathBuf,
    /// Unit definitions found (zero if the file did not load).
    pub units: usize,
    /// Terrain definitions found (zero if the file did not load).
    pub terrains: usize,
    /// Everything wrong with the file.
    pub errors: Vec<String>,
}

impl FileReport {
    /// Whether the file loaded cleanly.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Outcome for a directory (or a single file).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// One entry per file, sorted by path.
    pub files: Vec<FileReport>,
}

impl ValidationReport {
    /// Number of files with errors.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.files.iter().filter(|f| !f.is_valid()).count()
    }

    /// Turn a failing report into [`ToolError::ValidationFailed`].
    pub fn into_result(self) -> Result<Self> {
        match self.failed() {
            0 => Ok(self),
            failed => Err(ToolError::ValidationFailed {
                failed,
                total: self.files.len(),
            }),
        }
    }
}

/// Validate one rules file.
pub fn validate_rules_file(path: &Path) -> FileReport {
    match RulesEngine::load_ron_file(path) {
        Ok(rules) => FileReport {
            path: path.to_path_buf(),
            units: rules.units().count(),
            terrains: rules.terrains().count(),
            errors: Vec::new(),
        },
        Err(e) => {
            let errors = match e {
                GameError::RulesInvalid { errors } => errors,
                other => vec![other.to_string()],
            };
            FileReport {
                path: path.to_path_buf(),
                units: 0,
                terrains: 0,
                errors,
            }
        }
    }
}

/// Validate all RON data files in a directory, or a single file.
///
/// # Errors
///
/// Returns [`ToolError::Io`] if the directory cannot be listed. Invalid files
/// are reported, not returned as errors.
pub fn validate_data_directory(path: &Path) -> Result<ValidationReport> {
    if path.is_file() {
        return Ok(ValidationReport {
            files: vec![validate_rules_file(path)],
        });
    }

    let io_err = |source| ToolError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(path).map_err(io_err)? {
        let entry_path = entry.map_err(io_err)?.path();
        if entry_path.extension().is_some_and(|ext| ext == "ron") {
            paths.push(entry_path);
        }
    }
    paths.sort();

    let files: Vec<FileReport> = paths.iter().map(|p| validate_rules_file(p)).collect();
    for report in &files {
        if report.is_valid() {
            tracing::debug!(path = %report.path.display(), units = report.units, "rules ok");
        } else {
            tracing::warn!(path = %report.path.display(), errors = report.errors.len(), "rules invalid");
        }
    }
    Ok(ValidationReport { files })
}
