//! Batch import of license templates into a resource tree.
//!
//! Import validates every template before writing it, so a resource tree only
//! ever holds templates whose compiled pattern matched their reference text.
//! Per-template failures are collected into an [`ImportReport`] instead of
//! aborting the batch.

mod custom;
mod spdx;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use thiserror::Error;

use crate::license_detection::{CompileOptions, ValidationError};

pub use custom::import_custom;
pub use spdx::import_spdx;

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Ids whose validation failure is recorded but not counted as an error.
    pub allow_invalid: HashSet<String>,
    pub compile: CompileOptions,
}

/// Why a template was not imported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportFailure {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("template {id} has no reference text at {}", .path.display())]
    MissingReference { id: String, path: PathBuf },
}

impl ImportFailure {
    pub fn id(&self) -> &str {
        match self {
            ImportFailure::Validation(e) => &e.id,
            ImportFailure::MissingReference { id, .. } => id,
        }
    }
}

/// Outcome of one import run.
#[derive(Debug, Default)]
pub struct ImportReport {
    /// Ids written to the destination, in import order.
    pub imported: Vec<String>,
    /// Failures that make the import fail.
    pub failures: Vec<ImportFailure>,
    /// Failures of ids listed in [`ImportOptions::allow_invalid`].
    pub allowed_failures: Vec<ImportFailure>,
}

impl ImportReport {
    pub fn error_count(&self) -> usize {
        self.failures.len()
    }

    fn record_failure(&mut self, failure: ImportFailure, options: &ImportOptions) {
        if options.allow_invalid.contains(failure.id()) {
            self.allowed_failures.push(failure);
        } else {
            self.failures.push(failure);
        }
    }

    /// Fails when any template that is not explicitly allowed to fail could
    /// not be imported.
    pub fn into_result(self) -> Result<Self> {
        if !self.failures.is_empty() {
            bail!("{} templates could not be validated", self.failures.len());
        }
        Ok(self)
    }
}

/// Creates each destination subdirectory and checks that it is empty.
fn prepare_destination(root: &Path, dirs: &[&str]) -> Result<()> {
    for dir in dirs {
        let path = root.join(dir);
        fs::create_dir_all(&path)
            .with_context(|| format!("Cannot create destination dir {}", path.display()))?;
        let mut entries = fs::read_dir(&path)
            .with_context(|| format!("Cannot read destination dir {}", path.display()))?;
        if entries.next().is_some() {
            bail!("Destination dir {} is not empty", path.display());
        }
    }
    Ok(())
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}
