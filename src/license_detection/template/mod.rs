//! License template parsing and compilation.
//!
//! A template is literal license wording interleaved with `<<var ...>>` and
//! `<<beginOptional>>`/`<<endOptional>>` markup. Compilation turns it into an
//! ordered list of [`TemplateSegment`]s and a single [`CompiledPattern`] that
//! matches normalized text.

pub mod compiler;
pub(crate) mod parser;

pub use compiler::{
    CompileOptions, CompiledPattern, CompiledTemplate, compile_template, compile_template_with,
};

const DESCRIBE_MAX_CHARS: usize = 40;

/// One piece of a compiled template, in matching order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSegment {
    /// Fixed wording, already normalized.
    Literal(String),
    Variable(TemplateVariable),
}

/// A region of the template that may vary between license instances.
///
/// Optional regions are represented as variables with `is_optional` set;
/// their `match_regex` is the composed pattern of the region's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateVariable {
    pub name: String,
    /// Normalized text the variable stands for in the reference license.
    pub original_text: String,
    /// Regex fragment constraining the variable; `None` matches any text.
    pub match_regex: Option<String>,
    pub is_optional: bool,
    /// Text every match of this variable contains verbatim, when the
    /// `match` fragment is a plain literal.
    pub fixed_text: Option<String>,
    /// Byte offset of the marker in the raw template.
    pub offset: usize,
}

impl TemplateSegment {
    /// The literal text, or the variable's normalized original text.
    pub fn text(&self) -> &str {
        match self {
            TemplateSegment::Literal(text) => text,
            TemplateSegment::Variable(var) => &var.original_text,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, TemplateSegment::Literal(_))
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            TemplateSegment::Literal(text) => {
                let mut excerpt: String = text.chars().take(DESCRIBE_MAX_CHARS).collect();
                if excerpt.len() < text.len() {
                    excerpt.push_str("...");
                }
                format!("literal \"{}\"", excerpt)
            }
            TemplateSegment::Variable(var) if var.is_optional => {
                format!("optional '{}' at byte {}", var.name, var.offset)
            }
            TemplateSegment::Variable(var) => {
                format!("variable '{}' at byte {}", var.name, var.offset)
            }
        }
    }
}
