//! Core data structures shared by the catalog and the matching engine.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Metadata file of a custom license directory. Shares the `license_` prefix
/// with primary pattern files but is not a pattern.
pub const LICENSE_INFO_FILE: &str = "license_info.json";

/// Where a catalog entry comes from. Identifiers are unique per catalog, the
/// namespace only tells SPDX and custom entries apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Spdx,
    Custom,
}

/// Role of a pattern within its license.
///
/// SPDX templates are always `Primary`. Custom licenses may ship additional
/// patterns for associated notices and optional wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Primary,
    Associated,
    Optional,
}

impl PatternKind {
    /// File name prefix of custom pattern files of this kind.
    pub fn file_prefix(self) -> &'static str {
        match self {
            PatternKind::Primary => "license_",
            PatternKind::Associated => "associated_",
            PatternKind::Optional => "optional_",
        }
    }

    /// Classifies a custom pattern file by its name.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        if file_name == LICENSE_INFO_FILE {
            return None;
        }
        [
            PatternKind::Primary,
            PatternKind::Associated,
            PatternKind::Optional,
        ]
        .into_iter()
        .find(|kind| file_name.starts_with(kind.file_prefix()))
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::Spdx => f.write_str("spdx"),
            Namespace::Custom => f.write_str("custom"),
        }
    }
}

/// A confirmed license match in a scanned document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Catalog identifier of the matching entry.
    pub id: String,

    /// License identifier the entry belongs to.
    pub license_id: String,

    pub namespace: Namespace,

    pub kind: PatternKind,

    pub deprecated: bool,

    /// Byte span of the matched license body in the raw document.
    pub span: Range<usize>,

    /// Byte span of the matched license body in the normalized document.
    pub normalized_span: Range<usize>,
}

/// Counters from one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Catalog entries considered.
    pub entries: usize,

    /// Entries skipped because a static block was absent.
    pub pruned: usize,

    /// Entries whose compiled pattern was run.
    pub evaluated: usize,
}
