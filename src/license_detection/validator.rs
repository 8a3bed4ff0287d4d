//! Template validation against reference license text.
//!
//! A template is only admitted into a catalog once its compiled pattern
//! matches the normalized reference text of the same license and every
//! extracted static block occurs in that text.

use log::debug;

use crate::license_detection::error::{Divergence, ValidationError, ValidationStage};
use crate::license_detection::normalize::NormalizationData;
use crate::license_detection::static_blocks::{StaticBlock, extract_static_blocks};
use crate::license_detection::template::compiler::{build_regex, compose};
use crate::license_detection::template::{
    CompileOptions, CompiledTemplate, TemplateSegment, compile_template_with,
};

const CONTEXT_CHARS: usize = 60;

/// A template that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedTemplate {
    pub id: String,
    pub template: CompiledTemplate,
    pub static_blocks: Vec<StaticBlock>,
}

/// Validates a template with default compile options and returns its static
/// blocks.
pub fn validate(
    id: &str,
    template: &[u8],
    reference: &[u8],
    template_path: &str,
) -> Result<Vec<StaticBlock>, ValidationError> {
    validate_with(
        id,
        template,
        reference,
        template_path,
        &CompileOptions::default(),
    )
    .map(|validated| validated.static_blocks)
}

pub fn validate_with(
    id: &str,
    template: &[u8],
    reference: &[u8],
    template_path: &str,
    options: &CompileOptions,
) -> Result<ValidatedTemplate, ValidationError> {
    let fail = |stage: ValidationStage| ValidationError {
        id: id.to_string(),
        template_path: template_path.to_string(),
        stage,
    };

    let compiled = compile_template_with(template, options).map_err(|e| fail(e.into()))?;

    let reference = NormalizationData::new(reference, options.normalize_options());
    let normalized = reference.normalized_text();
    if !compiled.pattern.is_match(normalized) {
        let divergence = diagnose(&compiled.segments, options, normalized);
        debug!("{}: reference text diverges: {}", id, divergence);
        return Err(fail(ValidationStage::Match(divergence)));
    }

    let static_blocks = extract_static_blocks(&compiled.segments);
    check_consistency(&static_blocks, normalized)
        .map_err(|block| fail(ValidationStage::StaticBlockConsistency { block }))?;

    debug!(
        "{}: validated with {} literals, {} variables and {} static blocks",
        id,
        compiled.literal_count(),
        compiled.variable_count(),
        static_blocks.len()
    );
    Ok(ValidatedTemplate {
        id: id.to_string(),
        template: compiled,
        static_blocks,
    })
}

/// Returns the first block that is not a substring of `normalized`.
fn check_consistency(blocks: &[StaticBlock], normalized: &str) -> Result<(), StaticBlock> {
    match blocks
        .iter()
        .find(|block| !normalized.contains(block.as_str()))
    {
        Some(block) => Err(block.clone()),
        None => Ok(()),
    }
}

/// Finds the first segment the normalized text stops following.
///
/// Binary-searches the longest prefix of segments that still matches from the
/// start of the text (within the leading slack).
fn diagnose(segments: &[TemplateSegment], options: &CompileOptions, normalized: &str) -> Divergence {
    let mut matched = 0;
    let mut matched_end = 0;
    let mut lo = 1;
    let mut hi = segments.len();
    while lo <= hi {
        let mid = lo + (hi - lo) / 2;
        match prefix_match_end(&segments[..mid], options, normalized) {
            Some(end) => {
                matched = mid;
                matched_end = end;
                lo = mid + 1;
            }
            None => hi = mid - 1,
        }
    }

    let (segment_index, expected) = match segments.get(matched) {
        Some(segment) => (Some(matched), segment.describe()),
        None => (None, "end of text".to_string()),
    };
    Divergence {
        segment_index,
        expected,
        reference_offset: matched_end,
        reference_context: context_at(normalized, matched_end),
    }
}

fn prefix_match_end(
    segments: &[TemplateSegment],
    options: &CompileOptions,
    normalized: &str,
) -> Option<usize> {
    let source = format!(
        r"(?s)\A.{{0,{}}}?(?:{})",
        options.leading_slack,
        compose(segments, options)
    );
    build_regex(&source)
        .ok()?
        .find(normalized)
        .map(|m| m.end())
}

fn context_at(normalized: &str, offset: usize) -> String {
    normalized
        .get(offset..)
        .unwrap_or_default()
        .trim_start()
        .chars()
        .take(CONTEXT_CHARS)
        .collect()
}
