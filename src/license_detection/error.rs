//! Error types for template compilation, validation and catalog publication.
//!
//! Normalization never fails, so there is no error type for it. Compilation
//! and validation failures are always scoped to a single template.

use std::fmt;

use thiserror::Error;

use crate::license_detection::static_blocks::StaticBlock;

/// A template could not be turned into a matcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("template is empty")]
    EmptyTemplate,

    #[error("unterminated variable starting at byte {offset}")]
    UnterminatedVariable { offset: usize },

    #[error("marker opened at byte {offset} inside the marker starting at byte {enclosing}")]
    NestedMarker { offset: usize, enclosing: usize },

    #[error("unknown marker kind '{kind}' at byte {offset}")]
    UnknownMarker { kind: String, offset: usize },

    #[error("malformed attribute '{attribute}' in marker at byte {offset}")]
    MalformedAttribute { attribute: String, offset: usize },

    #[error("<<endOptional>> at byte {offset} has no matching <<beginOptional>>")]
    UnexpectedEndOptional { offset: usize },

    #[error("<<beginOptional>> at byte {offset} is never closed")]
    UnclosedOptional { offset: usize },

    #[error("invalid match pattern '{fragment}' at byte {offset}: {message}")]
    InvalidMatchPattern {
        fragment: String,
        offset: usize,
        message: String,
    },

    #[error("composed pattern could not be compiled: {message}")]
    InvalidPattern { message: String },
}

/// Where the normalized reference text stopped following the compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divergence {
    /// Index of the first segment that could not be matched, `None` when every
    /// segment matched but the text after them exceeded the trailing slack.
    pub segment_index: Option<usize>,
    /// Human readable description of the expected segment.
    pub expected: String,
    /// Byte offset in the normalized reference text where matching stopped.
    pub reference_offset: usize,
    /// A short excerpt of the normalized reference text at `reference_offset`.
    pub reference_context: String,
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.segment_index {
            Some(index) => write!(
                f,
                "segment {} ({}) not found at normalized offset {}: \"{}\"",
                index, self.expected, self.reference_offset, self.reference_context
            ),
            None => write!(
                f,
                "unmatched trailing text at normalized offset {}: \"{}\"",
                self.reference_offset, self.reference_context
            ),
        }
    }
}

/// The step of validation that failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationStage {
    #[error("compile: {0}")]
    Compile(#[from] CompileError),

    #[error("match: {0}")]
    Match(Divergence),

    /// Internal invariant violation: the extractor produced a block the
    /// compiled pattern does not guarantee.
    #[error("static block consistency: block \"{}\" is not in the normalized reference text", .block.as_str())]
    StaticBlockConsistency { block: StaticBlock },
}

/// A template was not admitted into the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("template {id} ({template_path}) failed validation at {stage}")]
pub struct ValidationError {
    pub id: String,
    pub template_path: String,
    pub stage: ValidationStage,
}

impl ValidationError {
    /// True when the failure points at a defect in this crate rather than at
    /// the template or its reference text.
    pub fn is_internal(&self) -> bool {
        matches!(self.stage, ValidationStage::StaticBlockConsistency { .. })
    }
}

/// Errors raised while publishing entries into a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("duplicate catalog identifier '{0}'")]
    DuplicateId(String),
}
