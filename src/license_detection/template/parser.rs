//! Escape-aware scanner for SPDX template markup.
//!
//! Templates interleave literal text with markers such as
//! `<<var;name="copyright";original="Copyright (c) <year>";match=".+">>` and
//! `<<beginOptional>> ... <<endOptional>>`. A marker ends at the first `>>`
//! that is outside a quoted attribute value and not escaped, so a `match`
//! fragment like `(\)|\>)?` never terminates the marker early.

use std::ops::Range;

use crate::license_detection::error::CompileError;

pub(crate) const MARKER_OPEN: &str = "<<";
const VAR_KIND: &str = "var";
const BEGIN_OPTIONAL_KIND: &str = "beginOptional";
const END_OPTIONAL_KIND: &str = "endOptional";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    InLiteral,
    InMarker { quoted: bool },
    InMarkerEscaped { quoted: bool },
}

/// A raw piece of template text, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RawToken<'a> {
    Literal { text: &'a str, offset: usize },
    Marker { body: &'a str, offset: usize },
}

/// Attributes of a `<<var ...>>` marker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct VarAttributes {
    pub name: String,
    pub original: String,
    pub match_regex: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Marker {
    Var(VarAttributes),
    BeginOptional { name: Option<String> },
    EndOptional,
}

/// Splits template text into literal runs and marker bodies.
pub(crate) fn tokenize_markup(text: &str) -> Result<Vec<RawToken<'_>>, CompileError> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut state = ScanState::InLiteral;
    let mut literal_start = 0;
    let mut marker_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match state {
            ScanState::InLiteral => {
                if bytes[i..].starts_with(MARKER_OPEN.as_bytes()) {
                    if i > literal_start {
                        tokens.push(RawToken::Literal {
                            text: &text[literal_start..i],
                            offset: literal_start,
                        });
                    }
                    marker_start = i;
                    state = ScanState::InMarker { quoted: false };
                    i += MARKER_OPEN.len();
                    continue;
                }
            }
            ScanState::InMarker { quoted } => match bytes[i] {
                b'\\' => state = ScanState::InMarkerEscaped { quoted },
                b'"' => state = ScanState::InMarker { quoted: !quoted },
                b'>' if !quoted && bytes.get(i + 1) == Some(&b'>') => {
                    tokens.push(RawToken::Marker {
                        body: &text[marker_start + MARKER_OPEN.len()..i],
                        offset: marker_start,
                    });
                    i += 2;
                    literal_start = i;
                    state = ScanState::InLiteral;
                    continue;
                }
                b'<' if opens_marker(&bytes[i..], quoted) => {
                    return Err(CompileError::NestedMarker {
                        offset: i,
                        enclosing: marker_start,
                    });
                }
                _ => {}
            },
            ScanState::InMarkerEscaped { quoted } => {
                state = ScanState::InMarker { quoted };
            }
        }
        i += 1;
    }

    match state {
        ScanState::InLiteral => {
            if literal_start < bytes.len() {
                tokens.push(RawToken::Literal {
                    text: &text[literal_start..],
                    offset: literal_start,
                });
            }
            Ok(tokens)
        }
        ScanState::InMarker { .. } | ScanState::InMarkerEscaped { .. } => {
            Err(CompileError::UnterminatedVariable {
                offset: marker_start,
            })
        }
    }
}

/// Inside a marker, `<<` only counts as a new marker when it cannot be part
/// of an attribute value: unquoted, or quoted and followed by a marker kind.
fn opens_marker(rest: &[u8], quoted: bool) -> bool {
    if !rest.starts_with(MARKER_OPEN.as_bytes()) {
        return false;
    }
    if !quoted {
        return true;
    }
    let after = &rest[MARKER_OPEN.len()..];
    [VAR_KIND, BEGIN_OPTIONAL_KIND, END_OPTIONAL_KIND]
        .iter()
        .any(|kind| after.starts_with(kind.as_bytes()))
}

/// Byte ranges of well-formed markers, including their `<<` and `>>`.
///
/// Scanning stops quietly at the first malformed marker; whatever follows is
/// reported as literal text. Used by the normalizer, which must never fail.
pub(crate) fn marker_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut base = 0;

    while let Some(found) = text[base..].find(MARKER_OPEN) {
        let start = base + found;
        let candidate = &text[start..];
        let (scanned, resume) = match tokenize_markup(candidate) {
            Ok(_) => (candidate.len(), None),
            // Keep the markers before the nested one and resume from it.
            Err(CompileError::NestedMarker { offset, .. }) => {
                (closed_prefix(&candidate[..offset]), Some(start + offset))
            }
            Err(_) => (closed_prefix(candidate), None),
        };

        if let Ok(tokens) = tokenize_markup(&candidate[..scanned]) {
            for token in tokens {
                if let RawToken::Marker { body, offset } = token {
                    let marker_start = start + offset;
                    spans.push(marker_start..marker_start + body.len() + 2 * MARKER_OPEN.len());
                }
            }
        }

        match resume {
            Some(next) => base = next,
            None => break,
        }
    }

    spans
}

/// Length of the prefix of `text` that ends right after the last marker
/// which closed cleanly.
fn closed_prefix(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut state = ScanState::InLiteral;
    let mut closed = 0;
    let mut i = 0;
    while i < bytes.len() {
        match state {
            ScanState::InLiteral if bytes[i..].starts_with(MARKER_OPEN.as_bytes()) => {
                state = ScanState::InMarker { quoted: false };
                i += MARKER_OPEN.len();
                continue;
            }
            ScanState::InLiteral => {}
            ScanState::InMarker { quoted } => match bytes[i] {
                b'\\' => state = ScanState::InMarkerEscaped { quoted },
                b'"' => state = ScanState::InMarker { quoted: !quoted },
                b'>' if !quoted && bytes.get(i + 1) == Some(&b'>') => {
                    i += 2;
                    closed = i;
                    state = ScanState::InLiteral;
                    continue;
                }
                _ => {}
            },
            ScanState::InMarkerEscaped { quoted } => state = ScanState::InMarker { quoted },
        }
        i += 1;
    }
    closed
}

/// Parses the body of a marker (the text between `<<` and `>>`).
pub(crate) fn parse_marker(body: &str, offset: usize) -> Result<Marker, CompileError> {
    let fields = split_fields(body);
    let mut fields = fields.into_iter();
    let kind = fields.next().unwrap_or_default();
    let kind = kind.trim();

    let mut attributes = Vec::new();
    for field in fields {
        let field = field.trim();
        if field.is_empty() {
            continue;
        }
        let Some((key, value)) = field.split_once('=') else {
            return Err(CompileError::MalformedAttribute {
                attribute: field.to_string(),
                offset,
            });
        };
        attributes.push((key.trim().to_string(), value.trim().to_string()));
    }

    match kind {
        VAR_KIND => {
            let mut var = VarAttributes::default();
            for (key, value) in attributes {
                match key.as_str() {
                    "name" => var.name = unescape(unquote(&value)),
                    "original" => var.original = unescape(unquote(&value)),
                    "match" => var.match_regex = Some(unquote(&value).to_string()),
                    _ => {}
                }
            }
            Ok(Marker::Var(var))
        }
        BEGIN_OPTIONAL_KIND => {
            let name = attributes
                .into_iter()
                .find(|(key, _)| key == "name")
                .map(|(_, value)| unescape(unquote(&value)));
            Ok(Marker::BeginOptional { name })
        }
        END_OPTIONAL_KIND => Ok(Marker::EndOptional),
        other => Err(CompileError::UnknownMarker {
            kind: other.to_string(),
            offset,
        }),
    }
}

/// Splits on `;` outside quotes, honoring backslash escapes.
fn split_fields(body: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut quoted = false;
    let mut escaped = false;
    let mut start = 0;
    for (i, b) in body.bytes().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match b {
            b'\\' => escaped = true,
            b'"' => quoted = !quoted,
            b';' if !quoted => {
                fields.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    fields.push(&body[start..]);
    fields
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next @ ('"' | '\\')) => out.push(next),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}
