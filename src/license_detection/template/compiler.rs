//! Compiles license template markup into a single anchored regex.
//!
//! Literal runs are normalized the same way scanned documents are, then
//! escaped. Variables contribute their `match` fragment (or a bounded
//! wildcard) wrapped in a non-capturing group, and optional regions become
//! `(?:...)?`. Segments are joined by an optional space so a variable that
//! matches nothing does not leave a doubled space behind.
//!
//! The final pattern has exactly one capturing group, `body`, which spans the
//! matched template text. Leading and trailing slack bound how much unrelated
//! text may surround it.

use std::ops::Range;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::license_detection::error::CompileError;
use crate::license_detection::normalize::{
    CaseMode, FragmentContext, NormalizeOptions, normalize_fragment,
};
use crate::license_detection::template::parser::{
    Marker, RawToken, VarAttributes, parse_marker, tokenize_markup,
};
use crate::license_detection::template::{TemplateSegment, TemplateVariable};

pub const DEFAULT_FREE_VARIABLE_MAX: usize = 500;
pub const DEFAULT_LEADING_SLACK: usize = 128;
pub const DEFAULT_TRAILING_SLACK: usize = 128;

pub(crate) const BODY_GROUP: &str = "body";
const SEGMENT_JOINT: &str = " ?";
const OPTIONAL_DEFAULT_NAME: &str = "optional";

// Large license texts with many bounded repetitions exceed the regex crate's
// default limits.
const REGEX_SIZE_LIMIT: usize = 1 << 26;
const REGEX_DFA_SIZE_LIMIT: usize = 1 << 25;

const REGEX_META: &[char] = &[
    '\\', '.', '+', '*', '?', '(', ')', '|', '[', ']', '{', '}', '^', '$',
];

/// Knobs that change the compiled pattern.
///
/// The same options must be used for every template in a catalog; the
/// catalog records them so documents are normalized to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    pub case_mode: CaseMode,
    /// Upper bound on characters a variable without `match` may consume.
    pub free_variable_max: usize,
    /// Characters of unrelated text allowed before the template body.
    pub leading_slack: usize,
    /// Characters of unrelated text allowed after the template body.
    pub trailing_slack: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            case_mode: CaseMode::Preserve,
            free_variable_max: DEFAULT_FREE_VARIABLE_MAX,
            leading_slack: DEFAULT_LEADING_SLACK,
            trailing_slack: DEFAULT_TRAILING_SLACK,
        }
    }
}

impl CompileOptions {
    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions::text().with_case_mode(self.case_mode)
    }
}

/// The compiled regex of a template, applied to normalized text.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    regex: Regex,
}

impl CompiledPattern {
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, normalized: &str) -> bool {
        self.regex.is_match(normalized)
    }

    /// Byte range of the template body within `normalized`, if it matches.
    pub fn find(&self, normalized: &str) -> Option<Range<usize>> {
        self.regex
            .captures(normalized)
            .and_then(|caps| caps.name(BODY_GROUP))
            .map(|m| m.range())
    }

    /// Number of capturing groups, which is always one (`body`).
    pub fn structural_groups(&self) -> usize {
        self.regex.captures_len() - 1
    }
}

/// Result of compiling a template.
#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    pub pattern: CompiledPattern,
    pub segments: Vec<TemplateSegment>,
    pub options: CompileOptions,
}

impl CompiledTemplate {
    pub fn literal_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_literal()).count()
    }

    pub fn variable_count(&self) -> usize {
        self.segments.len() - self.literal_count()
    }
}

/// Compiles a template with default options.
pub fn compile_template(template: &[u8]) -> Result<CompiledTemplate, CompileError> {
    compile_template_with(template, &CompileOptions::default())
}

pub fn compile_template_with(
    template: &[u8],
    options: &CompileOptions,
) -> Result<CompiledTemplate, CompileError> {
    let text = String::from_utf8_lossy(template);
    let segments = build_segments(&text, options)?;
    if segments.is_empty() {
        return Err(CompileError::EmptyTemplate);
    }

    let body = compose(&segments, options);
    let source = format!(
        r"(?s)\A.{{0,{}}}?(?P<{}>{}).{{0,{}}}\z",
        options.leading_slack, BODY_GROUP, body, options.trailing_slack
    );
    let regex = build_regex(&source).map_err(|e| CompileError::InvalidPattern {
        message: e.to_string(),
    })?;

    Ok(CompiledTemplate {
        pattern: CompiledPattern { regex },
        segments,
        options: *options,
    })
}

pub(crate) fn build_regex(source: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(source)
        .size_limit(REGEX_SIZE_LIMIT)
        .dfa_size_limit(REGEX_DFA_SIZE_LIMIT)
        .build()
}

/// Joins the fragments of `segments` into one regex source.
pub(crate) fn compose(segments: &[TemplateSegment], options: &CompileOptions) -> String {
    segments
        .iter()
        .map(|segment| segment_fragment(segment, options))
        .collect::<Vec<_>>()
        .join(SEGMENT_JOINT)
}

pub(crate) fn segment_fragment(segment: &TemplateSegment, options: &CompileOptions) -> String {
    match segment {
        TemplateSegment::Literal(text) => regex::escape(text),
        TemplateSegment::Variable(var) => {
            let inner = match &var.match_regex {
                Some(fragment) => embed_match_fragment(fragment, options.case_mode),
                None => format!(".{{0,{}}}?", options.free_variable_max),
            };
            if var.is_optional {
                format!("(?:{})?", inner)
            } else {
                format!("(?:{})", inner)
            }
        }
    }
}

/// Open optional region while building segments.
struct Frame {
    segments: Vec<TemplateSegment>,
    name: Option<String>,
    offset: usize,
}

impl Frame {
    fn new(name: Option<String>, offset: usize) -> Self {
        Self {
            segments: Vec::new(),
            name,
            offset,
        }
    }
}

fn build_segments(
    text: &str,
    options: &CompileOptions,
) -> Result<Vec<TemplateSegment>, CompileError> {
    let tokens = tokenize_markup(text)?;
    let markers = tokens
        .iter()
        .map(|token| match token {
            RawToken::Marker { body, offset } => parse_marker(body, *offset).map(Some),
            RawToken::Literal { .. } => Ok(None),
        })
        .collect::<Result<Vec<_>, _>>()?;
    let contexts = line_contexts(&tokens, &markers);
    let normalize_options = NormalizeOptions::pattern().with_case_mode(options.case_mode);

    let mut root = Frame::new(None, 0);
    let mut open: Vec<Frame> = Vec::new();
    // Whitespace in the raw template since the last non-blank literal.
    let mut trailing_space = false;

    for ((token, marker), context) in tokens.iter().zip(markers).zip(contexts) {
        match (token, marker) {
            (RawToken::Literal { text, .. }, _) => {
                let leading_space = trailing_space || text.starts_with(char::is_whitespace);
                if is_blank(text) {
                    trailing_space |= !text.is_empty();
                } else {
                    trailing_space = text.ends_with(char::is_whitespace);
                }

                let normalized = normalize_fragment(text, normalize_options, context);
                if !normalized.is_empty() {
                    let separator = if leading_space { " " } else { "" };
                    push_literal(&mut root, &mut open, normalized, separator, normalize_options);
                }
            }
            (RawToken::Marker { offset, .. }, Some(Marker::Var(attributes))) => {
                let variable = compile_variable(attributes, *offset, options)?;
                push_segment(&mut root, &mut open, TemplateSegment::Variable(variable));
            }
            (RawToken::Marker { offset, .. }, Some(Marker::BeginOptional { name })) => {
                open.push(Frame::new(name, *offset));
            }
            (RawToken::Marker { offset, .. }, Some(Marker::EndOptional)) => {
                let Some(frame) = open.pop() else {
                    return Err(CompileError::UnexpectedEndOptional { offset: *offset });
                };
                if let Some(segment) = close_optional(frame, options) {
                    push_segment(&mut root, &mut open, segment);
                }
            }
            (RawToken::Marker { .. }, None) => {}
        }
    }

    if let Some(frame) = open.last() {
        return Err(CompileError::UnclosedOptional {
            offset: frame.offset,
        });
    }
    Ok(root.segments)
}

fn push_segment(root: &mut Frame, open: &mut [Frame], segment: TemplateSegment) {
    open.last_mut().unwrap_or(root).segments.push(segment);
}

/// Appends a literal, merging it into a directly preceding literal. That only
/// happens when an empty optional region between the two was dropped.
fn push_literal(
    root: &mut Frame,
    open: &mut [Frame],
    text: String,
    separator: &str,
    options: NormalizeOptions,
) {
    let segments = &mut open.last_mut().unwrap_or(root).segments;
    if let Some(TemplateSegment::Literal(previous)) = segments.last_mut() {
        let joined = format!("{}{}{}", previous, separator, text);
        *previous = normalize_fragment(&joined, options, FragmentContext::INLINE);
    } else {
        segments.push(TemplateSegment::Literal(text));
    }
}

fn compile_variable(
    attributes: VarAttributes,
    offset: usize,
    options: &CompileOptions,
) -> Result<TemplateVariable, CompileError> {
    let normalize_options = NormalizeOptions::pattern().with_case_mode(options.case_mode);
    let original_text =
        normalize_fragment(&attributes.original, normalize_options, FragmentContext::INLINE);

    let mut fixed_text = None;
    if let Some(fragment) = &attributes.match_regex {
        let embedded = embed_match_fragment(fragment, options.case_mode);
        build_regex(&embedded).map_err(|e| CompileError::InvalidMatchPattern {
            fragment: fragment.clone(),
            offset,
            message: e.to_string(),
        })?;
        fixed_text = literal_fragment_text(fragment, options.case_mode);
    }

    Ok(TemplateVariable {
        name: attributes.name,
        original_text,
        match_regex: attributes.match_regex,
        is_optional: false,
        fixed_text,
        offset,
    })
}

/// Turns a closed optional region into a single optional variable. Empty
/// regions contribute nothing.
fn close_optional(frame: Frame, options: &CompileOptions) -> Option<TemplateSegment> {
    if frame.segments.is_empty() {
        return None;
    }
    let original_text = frame
        .segments
        .iter()
        .map(TemplateSegment::text)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    Some(TemplateSegment::Variable(TemplateVariable {
        name: frame
            .name
            .unwrap_or_else(|| OPTIONAL_DEFAULT_NAME.to_string()),
        original_text,
        match_regex: Some(compose(&frame.segments, options)),
        is_optional: true,
        fixed_text: None,
        offset: frame.offset,
    }))
}

/// Works out for each literal run whether it begins and ends a line of the
/// template. Comment and bullet prefixes are only stripped at line starts, so
/// a `# Title` placed right after `<<beginOptional>>` still loses its `#`
/// while `a # b` after a variable keeps it.
fn line_contexts(tokens: &[RawToken<'_>], markers: &[Option<Marker>]) -> Vec<FragmentContext> {
    let mut contexts = vec![FragmentContext::INLINE; tokens.len()];

    let mut clean = true;
    for (i, token) in tokens.iter().enumerate() {
        match token {
            RawToken::Literal { text, .. } => {
                contexts[i].starts_line = clean;
                clean = match text.rfind('\n') {
                    Some(pos) => is_blank(&text[pos + 1..]),
                    None => clean && is_blank(text),
                };
            }
            RawToken::Marker { .. } => {
                if matches!(markers[i], Some(Marker::Var(_))) {
                    clean = false;
                }
            }
        }
    }

    let mut clean = true;
    for (i, token) in tokens.iter().enumerate().rev() {
        match token {
            RawToken::Literal { text, .. } => {
                contexts[i].ends_line = clean;
                clean = match text.find('\n') {
                    Some(pos) => is_blank(&text[..pos]),
                    None => clean && is_blank(text),
                };
            }
            RawToken::Marker { .. } => {
                if matches!(markers[i], Some(Marker::Var(_))) {
                    clean = false;
                }
            }
        }
    }

    contexts
}

fn is_blank(text: &str) -> bool {
    text.chars().all(char::is_whitespace)
}

/// Rewrites a `match` fragment so it can be embedded in the composed pattern.
///
/// - `\<` and `\>` become plain `<` and `>`; templates escape angle brackets
///   that the regex crate treats as unknown escapes.
/// - Capturing and named groups become non-capturing so the composed pattern
///   keeps a single structural group.
/// - In fold mode the fragment is matched case-insensitively.
pub(crate) fn embed_match_fragment(fragment: &str, case_mode: CaseMode) -> String {
    let chars: Vec<char> = fragment.chars().collect();
    let mut out = String::with_capacity(fragment.len() + 8);
    let mut class_depth = 0usize;
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            '\\' => {
                match chars.get(i + 1) {
                    Some(&next @ ('<' | '>')) => out.push(next),
                    Some(&next) => {
                        out.push('\\');
                        out.push(next);
                    }
                    None => out.push('\\'),
                }
                i += 2;
                continue;
            }
            '[' => {
                out.push('[');
                class_depth += 1;
                i += 1;
                // `]` right after the opening bracket (or `[^`) is a literal.
                if chars.get(i) == Some(&'^') {
                    out.push('^');
                    i += 1;
                }
                if chars.get(i) == Some(&']') {
                    out.push(']');
                    i += 1;
                }
                continue;
            }
            ']' if class_depth > 0 => class_depth -= 1,
            '(' if class_depth == 0 => {
                if chars.get(i + 1) != Some(&'?') {
                    out.push_str("(?:");
                    i += 1;
                    continue;
                }
                if let Some(len) = named_group_prefix_len(&chars[i..]) {
                    out.push_str("(?:");
                    i += len;
                    continue;
                }
            }
            _ => {}
        }
        out.push(ch);
        i += 1;
    }

    match case_mode {
        CaseMode::Preserve => out,
        CaseMode::Fold => format!("(?i:{})", out),
    }
}

/// Length of a `(?P<name>` or `(?<name>` prefix at the start of `chars`.
fn named_group_prefix_len(chars: &[char]) -> Option<usize> {
    let name_start = match chars {
        ['(', '?', 'P', '<', ..] => 4,
        ['(', '?', '<', next, ..] if *next != '=' && *next != '!' => 3,
        _ => return None,
    };
    chars[name_start..]
        .iter()
        .position(|&c| c == '>')
        .map(|pos| name_start + pos + 1)
}

/// The text a `match` fragment always matches, when it has no regex syntax.
///
/// Only fragments that normalization leaves unchanged qualify. In fold mode
/// the text is folded by the same per-character rule applied to documents.
fn literal_fragment_text(fragment: &str, case_mode: CaseMode) -> Option<String> {
    if fragment.is_empty() || fragment.contains(REGEX_META) {
        return None;
    }
    let preserved = normalize_fragment(fragment, NormalizeOptions::text(), FragmentContext::INLINE);
    if preserved != fragment {
        return None;
    }
    Some(match case_mode {
        CaseMode::Preserve => preserved,
        CaseMode::Fold => normalize_fragment(
            fragment,
            NormalizeOptions::text().with_case_mode(CaseMode::Fold),
            FragmentContext::INLINE,
        ),
    })
}
