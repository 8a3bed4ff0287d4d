//! License Detection Engine
//!
//! This module compiles license templates into validated matchers and scans
//! documents against the resulting catalog.

pub mod catalog;
pub mod error;
pub mod models;
pub mod normalize;
pub mod scan;
pub mod static_blocks;
pub mod template;
pub mod validator;

use std::sync::Arc;

use anyhow::Result;

use crate::resources::Resources;

pub use catalog::{LicenseCatalog, LicenseCatalogEntry};
pub use error::{CatalogError, CompileError, Divergence, ValidationError, ValidationStage};
pub use models::{MatchResult, Namespace, PatternKind, ScanStats};
pub use normalize::{CaseMode, NormalizationData, NormalizeOptions, normalize_text};
pub use scan::{ScanOutcome, scan, scan_with_stats};
pub use static_blocks::{
    MIN_STATIC_BLOCK_CHARS, StaticBlock, extract_static_blocks, stored_static_blocks,
};
pub use template::{
    CompileOptions, CompiledPattern, CompiledTemplate, TemplateSegment, TemplateVariable,
    compile_template, compile_template_with,
};
pub use validator::{ValidatedTemplate, validate, validate_with};

/// License detection engine holding a published catalog.
///
/// Cloning the engine shares the catalog. Loading resources again produces a
/// new engine; existing engines keep scanning their own snapshot.
#[derive(Debug, Clone)]
pub struct LicenseDetectionEngine {
    catalog: Arc<LicenseCatalog>,
}

impl LicenseDetectionEngine {
    pub fn new(catalog: LicenseCatalog) -> Self {
        Self {
            catalog: Arc::new(catalog),
        }
    }

    /// Builds an engine from every SPDX and custom template in `resources`.
    pub fn from_resources(resources: &Resources, options: &CompileOptions) -> Result<Self> {
        Ok(Self::new(resources.load_catalog(options)?))
    }

    pub fn catalog(&self) -> &Arc<LicenseCatalog> {
        &self.catalog
    }

    /// Detects licenses in the given document.
    pub fn detect(&self, document: &[u8]) -> Vec<MatchResult> {
        scan(document, &self.catalog)
    }

    pub fn detect_with_stats(&self, document: &[u8]) -> ScanOutcome {
        scan_with_stats(document, &self.catalog)
    }
}
