//! Text normalization for template compilation and document scanning.
//!
//! Normalizes raw license text into a single-line canonical form so that a
//! template and a real-world copy of the same license compare equal:
//! - Malformed UTF-8 becomes U+FFFD instead of failing
//! - Compatibility forms, quotes and dashes collapse to one canonical form
//! - Leading comment and bullet markers are stripped per line (`//`, `#`, `##`, `*`, ...)
//! - Whitespace runs, including line breaks, collapse to a single space
//! - Spacing around commas and periods is made uniform
//! - Optional case folding
//!
//! Every normalized byte maps back to the raw byte offset it came from.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::license_detection::template::parser::marker_spans;

/// Whether normalization folds case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseMode {
    #[default]
    Preserve,
    Fold,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Pattern mode keeps `<<...>>` template markers verbatim.
    pub is_pattern: bool,
    pub case_mode: CaseMode,
}

impl NormalizeOptions {
    pub fn text() -> Self {
        Self::default()
    }

    pub fn pattern() -> Self {
        Self {
            is_pattern: true,
            ..Self::default()
        }
    }

    pub fn with_case_mode(mut self, case_mode: CaseMode) -> Self {
        self.case_mode = case_mode;
        self
    }
}

/// Line context of a text fragment cut out of a larger document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FragmentContext {
    pub starts_line: bool,
    pub ends_line: bool,
}

impl FragmentContext {
    pub const WHOLE: FragmentContext = FragmentContext {
        starts_line: true,
        ends_line: true,
    };
    pub const INLINE: FragmentContext = FragmentContext {
        starts_line: false,
        ends_line: false,
    };
}

/// Raw text, its normalized form and the offset map between the two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizationData {
    raw: Vec<u8>,
    normalized: String,
    /// Raw byte offset for every byte of `normalized`.
    offsets: Vec<usize>,
}

impl NormalizationData {
    pub fn new(raw: impl AsRef<[u8]>, options: NormalizeOptions) -> Self {
        let raw = raw.as_ref().to_vec();
        let units = normalize_units(&raw, options, FragmentContext::WHOLE);

        let mut normalized = String::with_capacity(units.len());
        let mut offsets = Vec::with_capacity(units.len());
        for unit in &units {
            normalized.push(unit.ch);
            offsets.extend(std::iter::repeat_n(unit.raw, unit.ch.len_utf8()));
        }

        Self {
            raw,
            normalized,
            offsets,
        }
    }

    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw
    }

    pub fn normalized_text(&self) -> &str {
        &self.normalized
    }

    /// Raw byte offset of the character that produced the normalized byte at
    /// `normalized_offset`.
    pub fn raw_offset(&self, normalized_offset: usize) -> Option<usize> {
        self.offsets.get(normalized_offset).copied()
    }

    /// Maps a normalized byte range to the raw byte range that covers it.
    pub fn raw_span(&self, normalized: Range<usize>) -> Option<Range<usize>> {
        if normalized.is_empty() || normalized.end > self.offsets.len() {
            return None;
        }
        let start = self.offsets[normalized.start];
        let last = self.offsets[normalized.end - 1];
        Some(start..last + raw_char_len(&self.raw, last))
    }

    pub fn into_normalized(self) -> String {
        self.normalized
    }
}

/// Normalizes `raw` and returns only the normalized text.
pub fn normalize_text(raw: &str, is_pattern: bool) -> String {
    let options = if is_pattern {
        NormalizeOptions::pattern()
    } else {
        NormalizeOptions::text()
    };
    NormalizationData::new(raw, options).into_normalized()
}

/// Normalizes a piece of a template whose line context is known.
pub(crate) fn normalize_fragment(
    raw: &str,
    options: NormalizeOptions,
    context: FragmentContext,
) -> String {
    normalize_units(raw.as_bytes(), options, context)
        .into_iter()
        .map(|unit| unit.ch)
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct Unit {
    ch: char,
    raw: usize,
    /// Template markup, left untouched by every rule.
    opaque: bool,
}

impl Unit {
    fn is(&self, ch: char) -> bool {
        !self.opaque && self.ch == ch
    }

    fn is_space(&self) -> bool {
        !self.opaque && (self.ch == ' ' || self.ch == '\t')
    }
}

fn normalize_units(raw: &[u8], options: NormalizeOptions, context: FragmentContext) -> Vec<Unit> {
    let mut units = decode(raw);
    if options.is_pattern {
        protect_markup(&mut units);
    }
    let units = canonicalize_chars(units);
    let units = strip_line_markers(units, context);
    let units = collapse_whitespace(units);
    let units = normalize_punctuation_spacing(units);
    match options.case_mode {
        CaseMode::Preserve => units,
        CaseMode::Fold => fold_case(units),
    }
}

/// Decodes UTF-8, replacing each malformed sequence with U+FFFD.
fn decode(raw: &[u8]) -> Vec<Unit> {
    let mut units = Vec::with_capacity(raw.len());
    let mut offset = 0;
    for chunk in raw.utf8_chunks() {
        for (i, ch) in chunk.valid().char_indices() {
            units.push(Unit {
                ch,
                raw: offset + i,
                opaque: false,
            });
        }
        offset += chunk.valid().len();
        if !chunk.invalid().is_empty() {
            units.push(Unit {
                ch: char::REPLACEMENT_CHARACTER,
                raw: offset,
                opaque: false,
            });
            offset += chunk.invalid().len();
        }
    }
    units
}

fn protect_markup(units: &mut [Unit]) {
    let text: String = units.iter().map(|u| u.ch).collect();
    let spans = marker_spans(&text);
    if spans.is_empty() {
        return;
    }
    let mut byte = 0;
    let mut spans = spans.into_iter().peekable();
    for unit in units.iter_mut() {
        while spans.peek().is_some_and(|span| span.end <= byte) {
            spans.next();
        }
        if spans.peek().is_some_and(|span| span.contains(&byte)) {
            unit.opaque = true;
        }
        byte += unit.ch.len_utf8();
    }
}

fn canonicalize_chars(units: Vec<Unit>) -> Vec<Unit> {
    let mut out: Vec<Unit> = Vec::with_capacity(units.len());
    for unit in units {
        if unit.opaque {
            out.push(unit);
            continue;
        }
        // Quotes, dashes and invisibles map directly; NFKC would decompose
        // some of them (U+00B4 becomes a space and a combining accent).
        let mapped: Vec<char> = match canonical_char(unit.ch) {
            Some(ch) if ch == unit.ch => std::iter::once(ch)
                .nfkc()
                .filter_map(canonical_char)
                .collect(),
            mapped => mapped.into_iter().collect(),
        };
        for ch in mapped {
            // Runs of quotes ('' or ``) and of dashes (--) are one mark.
            if (ch == '\'' || ch == '-') && out.last().is_some_and(|prev| prev.is(ch)) {
                continue;
            }
            out.push(Unit { ch, ..unit });
        }
    }
    out
}

/// Maps one character to its canonical form, `None` drops it.
fn canonical_char(ch: char) -> Option<char> {
    match ch {
        '\n' | '\r' | '\u{0B}' | '\u{0C}' | '\u{85}' | '\u{2028}' | '\u{2029}' => Some('\n'),
        '\u{AD}' | '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}' => None,
        '"' | '\'' | '`' | '\u{B4}' | '\u{AB}' | '\u{BB}' | '\u{2018}'..='\u{201F}'
        | '\u{2032}'..='\u{2037}' | '\u{2039}' | '\u{203A}' | '\u{301D}'..='\u{301F}' => {
            Some('\'')
        }
        '\u{2010}'..='\u{2015}' | '\u{2212}' | '\u{2E3A}' | '\u{2E3B}' | '\u{FE58}'
        | '\u{FE63}' | '\u{FF0D}' => Some('-'),
        c if c.is_whitespace() => Some(' '),
        c if c.is_control() => None,
        c => Some(c),
    }
}

const BULLETS: &[char] = &[
    '\u{2022}', '\u{2023}', '\u{2043}', '\u{2219}', '\u{25AA}', '\u{25A0}', '\u{25CF}',
    '\u{25E6}',
];

/// Strips comment and bullet markers at the start of each line, and trailing
/// block-comment closers at the end of each line.
///
/// Repeated markers are equivalent to a single one, so a markdown heading
/// `## Title` normalizes like `// Title` and `# Title`.
fn strip_line_markers(units: Vec<Unit>, context: FragmentContext) -> Vec<Unit> {
    let mut out = Vec::with_capacity(units.len());
    let lines: Vec<&[Unit]> = units.split_inclusive(|u| u.is('\n')).collect();
    let last = lines.len().saturating_sub(1);

    for (index, line) in lines.into_iter().enumerate() {
        let (body, newline) = match line.split_last() {
            Some((end, body)) if end.is('\n') => (body, Some(*end)),
            _ => (line, None),
        };

        let starts_line = index > 0 || context.starts_line;
        let ends_line = newline.is_some() || (index == last && context.ends_line);

        // Closers go first: `-*/` must not leave a bare `-` marker behind.
        let end = if ends_line {
            body.len() - trailing_closer_len(body)
        } else {
            body.len()
        };
        let start = if starts_line {
            leading_marker_len(&body[..end])
        } else {
            0
        };

        out.extend_from_slice(&body[start..end]);
        out.extend(newline);
    }
    out
}

fn leading_marker_len(line: &[Unit]) -> usize {
    let mut i = skip_spaces(line, 0);
    loop {
        let marker = marker_len(&line[i..]);
        if marker == 0 {
            return i;
        }
        i = skip_spaces(line, i + marker);
    }
}

fn marker_len(rest: &[Unit]) -> usize {
    let Some(first) = rest.first().filter(|u| !u.opaque) else {
        return 0;
    };
    let run = |ch: char| rest.iter().take_while(|u| u.is(ch)).count();
    let followed_by_space = |len: usize| rest.get(len).is_none_or(|u| u.is_space());

    match first.ch {
        '/' if rest.get(1).is_some_and(|u| u.is('/')) => run('/'),
        '/' if rest.get(1).is_some_and(|u| u.is('*')) => 1 + rest[1..].iter().take_while(|u| u.is('*')).count(),
        '*' if rest.get(1).is_some_and(|u| u.is('/')) => 2,
        '*' => run('*'),
        '#' => run('#'),
        ';' => run(';'),
        '%' => run('%'),
        '-' | '+' if followed_by_space(1) => 1,
        c if BULLETS.contains(&c) => 1,
        _ => 0,
    }
}

fn trailing_closer_len(line: &[Unit]) -> usize {
    let mut end = line.len();
    loop {
        let trimmed = line[..end].iter().rposition(|u| !u.is_space()).map_or(0, |p| p + 1);
        if trimmed >= 2 && line[trimmed - 2].is('*') && line[trimmed - 1].is('/') {
            end = trimmed - 2;
        } else {
            return line.len() - end;
        }
    }
}

fn skip_spaces(line: &[Unit], from: usize) -> usize {
    from + line[from..].iter().take_while(|u| u.is_space()).count()
}

fn collapse_whitespace(units: Vec<Unit>) -> Vec<Unit> {
    let mut out: Vec<Unit> = Vec::with_capacity(units.len());
    let mut pending: Option<Unit> = None;
    for unit in units {
        if !unit.opaque && unit.ch.is_whitespace() {
            pending.get_or_insert(Unit { ch: ' ', ..unit });
            continue;
        }
        if let Some(space) = pending.take()
            && !out.is_empty()
        {
            out.push(space);
        }
        out.push(unit);
    }
    out
}

/// Drops a space before `,` or `.` and a space after `,`.
///
/// `(iv) ,` and `(iv),` normalize identically, as do `X, and` and `X,and`.
fn normalize_punctuation_spacing(units: Vec<Unit>) -> Vec<Unit> {
    let mut out: Vec<Unit> = Vec::with_capacity(units.len());
    for (i, unit) in units.iter().enumerate() {
        if unit.is(' ') {
            let before_mark = units
                .get(i + 1)
                .is_some_and(|next| next.is(',') || next.is('.'));
            let after_comma = out.last().is_some_and(|prev| prev.is(','));
            if before_mark || after_comma {
                continue;
            }
        }
        out.push(*unit);
    }
    out
}

fn fold_case(units: Vec<Unit>) -> Vec<Unit> {
    let mut out = Vec::with_capacity(units.len());
    for unit in units {
        if unit.opaque {
            out.push(unit);
        } else {
            out.extend(unit.ch.to_lowercase().map(|ch| Unit { ch, ..unit }));
        }
    }
    out
}

/// Byte length of the raw character starting at `offset`; 1 for malformed input.
fn raw_char_len(raw: &[u8], offset: usize) -> usize {
    let end = (offset + 4).min(raw.len());
    match raw.get(offset..end).map(|bytes| bytes.utf8_chunks().next()) {
        Some(Some(chunk)) => chunk
            .valid()
            .chars()
            .next()
            .map_or_else(|| chunk.invalid().len().max(1), char::len_utf8),
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(text: &str) -> String {
        normalize_text(text, false)
    }

    #[test]
    fn test_whitespace_collapse() {
        assert_eq!(norm("  Hello \t  World \n\n  again  "), "Hello World again");
    }

    #[test]
    fn test_empty_and_blank_input() {
        assert_eq!(norm(""), "");
        assert_eq!(norm(" \n\t \r\n"), "");
    }

    #[test]
    fn test_line_comment_prefixes_are_equivalent() {
        let expected = "Licensed under the terms below";
        assert_eq!(norm("// Licensed under the terms below"), expected);
        assert_eq!(norm("# Licensed under the terms below"), expected);
        assert_eq!(norm("## Licensed under the terms below"), expected);
        assert_eq!(norm(" * Licensed under the terms below"), expected);
        assert_eq!(norm("/* Licensed under the terms below */"), expected);
        assert_eq!(norm("-- Licensed under the terms below"), expected);
        assert_eq!(norm(";; Licensed under the terms below"), expected);
    }

    #[test]
    fn test_markdown_heading_matches_plain_heading() {
        assert_eq!(norm("## Purpose\n\nThis license"), norm("Purpose\nThis license"));
        assert_eq!(norm("# Blue Model License"), "Blue Model License");
    }

    #[test]
    fn test_comment_prefix_only_at_line_start() {
        assert_eq!(norm("a # b // c"), "a # b // c");
        assert_eq!(norm("x - y"), "x - y");
    }

    #[test]
    fn test_dash_without_space_is_kept() {
        assert_eq!(norm("-x"), "-x");
        assert_eq!(norm("- x"), "x");
    }

    #[test]
    fn test_block_comment_lines() {
        let text = "/*\n * Copyright notice\n * goes here.\n */\n";
        assert_eq!(norm(text), "Copyright notice goes here.");
    }

    #[test]
    fn test_marker_glued_to_closer() {
        assert_eq!(norm("-*/"), "");
        assert_eq!(norm(";+*/"), "");
        assert_eq!(norm("//\u{2014}*/\n*/aa,B"), "aa,B");
        assert_eq!(norm("/*/"), "/");
    }

    #[test]
    fn test_space_before_comma() {
        assert_eq!(norm("(iv) , and"), norm("(iv), and"));
        assert_eq!(norm("(iv) ,"), "(iv),");
    }

    #[test]
    fn test_space_after_comma() {
        assert_eq!(norm("Adobe, and"), norm("Adobe,and"));
        assert_eq!(norm("Adobe, and"), "Adobe,and");
    }

    #[test]
    fn test_space_before_period() {
        assert_eq!(norm("the end . Next"), "the end. Next");
        assert_eq!(norm("the end .\n"), "the end.");
    }

    #[test]
    fn test_quotes_and_dashes() {
        assert_eq!(norm("\u{201C}AS IS\u{201D}"), "'AS IS'");
        assert_eq!(norm("\"AS IS\""), "'AS IS'");
        assert_eq!(norm("``AS IS''"), "'AS IS'");
        assert_eq!(norm("non\u{2013}infringement"), "non-infringement");
        assert_eq!(norm("a \u{2014} b -- c"), "a - b - c");
    }

    #[test]
    fn test_bullet_marker_on_its_own_line() {
        let split = "Scope for:\n1)\nthe Licensed Work";
        let joined = "Scope for: 1) the Licensed Work";
        assert_eq!(norm(split), norm(joined));

        let roman = "subject to:\n(ii)\nthe conditions";
        assert_eq!(norm(roman), "subject to: (ii) the conditions");
    }

    #[test]
    fn test_unicode_bullets_stripped() {
        assert_eq!(norm("\u{2022} first\n\u{2022} second"), "first second");
    }

    #[test]
    fn test_compatibility_forms() {
        assert_eq!(norm("\u{FB01}le"), "file");
        assert_eq!(norm("a\u{00A0}b"), "a b");
        assert_eq!(norm("zero\u{200B}width"), "zerowidth");
    }

    #[test]
    fn test_malformed_utf8_is_replaced() {
        let data = NormalizationData::new(b"ok \xFF\xFE done", NormalizeOptions::text());
        assert_eq!(data.normalized_text(), "ok \u{FFFD}\u{FFFD} done");
    }

    #[test]
    fn test_case_folding_is_opt_in() {
        assert_eq!(norm("MIT License"), "MIT License");
        let data = NormalizationData::new(
            "MIT License",
            NormalizeOptions::text().with_case_mode(CaseMode::Fold),
        );
        assert_eq!(data.normalized_text(), "mit license");
    }

    #[test]
    fn test_pattern_mode_keeps_markers() {
        let template = r#"Copyright  <<var;name="c";original="X  ,  Y";match=".+">>  ,  all"#;
        assert_eq!(
            normalize_text(template, true),
            r#"Copyright <<var;name="c";original="X  ,  Y";match=".+">>,all"#
        );
        assert_eq!(
            normalize_text(template, false),
            r#"Copyright <<var;name='c';original='X,Y';match='.+'>>,all"#
        );
    }

    #[test]
    fn test_pattern_mode_keeps_escaped_delimiters() {
        let template = r#"A <<var;name="p";original="";match="(\)\>|\))?">> B"#;
        assert_eq!(normalize_text(template, true), template);
    }

    #[test]
    fn test_fragment_context() {
        let options = NormalizeOptions::pattern();
        assert_eq!(
            normalize_fragment("# heading", options, FragmentContext::INLINE),
            "# heading"
        );
        assert_eq!(
            normalize_fragment("# heading", options, FragmentContext::WHOLE),
            "heading"
        );
        assert_eq!(
            normalize_fragment(" tail\n# next", options, FragmentContext::INLINE),
            "tail next"
        );
    }

    #[test]
    fn test_idempotence() {
        let samples = [
            "## Title\n\n* item one ,\n* item two,and more\n",
            "/*\n * \u{201C}Quoted\u{201D} text \u{2014} dash .\n */",
            "-\n foo",
            "x\n- - y",
            "Scope:\n(i)\nfirst\n(ii)\nsecond",
            "a , , b . . c",
            "end */ */",
            "\u{0130}stanbul \u{212A}elvin",
            "''' quotes `` here",
            "-*/",
            ";+*/",
            "//\u{2014}*/\n*/aa,B",
            "x\n+ */\n- -*/ tail",
        ];
        for sample in samples {
            for mode in [CaseMode::Preserve, CaseMode::Fold] {
                let options = NormalizeOptions::text().with_case_mode(mode);
                let once = NormalizationData::new(sample, options).into_normalized();
                let twice = NormalizationData::new(&once, options).into_normalized();
                assert_eq!(once, twice, "not a fixed point for {sample:?} ({mode:?})");
            }
        }
    }

    #[test]
    fn test_offset_map_points_at_source_characters() {
        let raw = "// Hello,\n//   W\u{00F6}rld \u{201C}x\u{201D}";
        let data = NormalizationData::new(raw, NormalizeOptions::text());
        assert_eq!(data.normalized_text(), "Hello,W\u{00F6}rld 'x'");

        for (pos, ch) in data.normalized_text().char_indices() {
            let raw_offset = data.raw_offset(pos).unwrap();
            let raw_ch = raw[raw_offset..].chars().next().unwrap();
            if ch.is_alphanumeric() {
                let alone = normalize_text(&raw_ch.to_string(), false);
                assert!(alone.contains(ch), "{ch:?} not reproduced by {raw_ch:?}");
            }
        }
    }

    #[test]
    fn test_raw_span() {
        let raw = "  # The W\u{00F6}rld\n  # ends";
        let data = NormalizationData::new(raw, NormalizeOptions::text());
        let normalized = data.normalized_text();
        let start = normalized.find("W").unwrap();
        let end = normalized.find(" ends").unwrap();
        let span = data.raw_span(start..end).unwrap();
        assert_eq!(&raw[span], "W\u{00F6}rld");

        let all = data.raw_span(0..normalized.len()).unwrap();
        assert_eq!(&raw[all], "The W\u{00F6}rld\n  # ends");
        assert_eq!(data.raw_span(0..0), None);
    }
}
