//! Static-block extraction.
//!
//! A static block is text every instance of a template contains verbatim once
//! normalized. Blocks are cheap substring prechecks run before the compiled
//! pattern.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::license_detection::error::CompileError;
use crate::license_detection::normalize::CaseMode;
use crate::license_detection::template::{
    CompileOptions, CompiledTemplate, TemplateSegment, compile_template_with,
};

/// Blocks shorter than this (in characters) are too common to prune anything.
pub const MIN_STATIC_BLOCK_CHARS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticBlock(String);

impl StaticBlock {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }
}

impl fmt::Display for StaticBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StaticBlock {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// Derives the static blocks of a compiled template, in template order.
///
/// Every literal segment is a candidate; the compiler already merged literals
/// that were only separated by an empty optional region. A non-optional
/// variable whose `match` is plain text contributes that text. Optional
/// regions and free variables contribute nothing.
pub fn extract_static_blocks(segments: &[TemplateSegment]) -> Vec<StaticBlock> {
    segments
        .iter()
        .filter_map(|segment| match segment {
            TemplateSegment::Literal(text) => Some(text.as_str()),
            TemplateSegment::Variable(var) if !var.is_optional => var.fixed_text.as_deref(),
            TemplateSegment::Variable(_) => None,
        })
        .map(StaticBlock::from)
        .filter(|block| block.char_len() >= MIN_STATIC_BLOCK_CHARS)
        .collect()
}

/// Static blocks to persist as a precheck artifact.
///
/// Stored prechecks are always case-preserved, whatever mode `compiled` was
/// built with. Folded catalogs ignore them and extract their own at load.
pub fn stored_static_blocks(
    template: &[u8],
    compiled: &CompiledTemplate,
) -> Result<Vec<StaticBlock>, CompileError> {
    if compiled.options.case_mode == CaseMode::Preserve {
        return Ok(extract_static_blocks(&compiled.segments));
    }
    let options = CompileOptions {
        case_mode: CaseMode::Preserve,
        ..compiled.options
    };
    let preserved = compile_template_with(template, &options)?;
    Ok(extract_static_blocks(&preserved.segments))
}

/// True when every block occurs in `normalized`. Stops at the first absent block.
pub fn contains_all(normalized: &str, blocks: &[StaticBlock]) -> bool {
    blocks.iter().all(|block| normalized.contains(block.as_str()))
}
