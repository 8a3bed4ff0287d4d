//! The published set of validated templates a document is scanned against.
//!
//! A catalog is built once per import or resource load and shared read-only
//! (usually behind an `Arc`). Loading again produces a new catalog.

use std::collections::HashMap;

use crate::license_detection::error::CatalogError;
use crate::license_detection::models::{Namespace, PatternKind};
use crate::license_detection::static_blocks::{StaticBlock, contains_all};
use crate::license_detection::template::{CompileOptions, CompiledPattern};
use crate::license_detection::validator::ValidatedTemplate;

/// A validated template ready for scanning.
#[derive(Debug, Clone)]
pub struct LicenseCatalogEntry {
    /// Unique catalog key. SPDX entries use the license id, custom entries
    /// `<license id>/<pattern file stem>`.
    pub id: String,

    /// License the pattern identifies.
    pub license_id: String,

    pub namespace: Namespace,

    pub kind: PatternKind,

    pub deprecated: bool,

    pub pattern: CompiledPattern,

    /// Prechecks in template order.
    pub static_blocks: Vec<StaticBlock>,
}

impl LicenseCatalogEntry {
    /// Builds an SPDX entry from a validated template.
    pub fn spdx(validated: ValidatedTemplate, deprecated: bool) -> Self {
        Self {
            license_id: validated.id.clone(),
            id: validated.id,
            namespace: Namespace::Spdx,
            kind: PatternKind::Primary,
            deprecated,
            pattern: validated.template.pattern,
            static_blocks: validated.static_blocks,
        }
    }

    /// True when every static block occurs in the normalized document. An
    /// entry that fails the precheck cannot match.
    pub fn passes_precheck(&self, normalized: &str) -> bool {
        contains_all(normalized, &self.static_blocks)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LicenseCatalog {
    options: CompileOptions,
    entries: Vec<LicenseCatalogEntry>,
    by_id: HashMap<String, usize>,
}

impl LicenseCatalog {
    /// Creates an empty catalog whose entries were compiled with `options`.
    pub fn new(options: CompileOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn from_entries(
        options: CompileOptions,
        entries: impl IntoIterator<Item = LicenseCatalogEntry>,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Self::new(options);
        for entry in entries {
            catalog.insert(entry)?;
        }
        Ok(catalog)
    }

    /// Adds an entry, rejecting a second entry with the same id.
    pub fn insert(&mut self, entry: LicenseCatalogEntry) -> Result<(), CatalogError> {
        if self.by_id.contains_key(&entry.id) {
            return Err(CatalogError::DuplicateId(entry.id));
        }
        self.by_id.insert(entry.id.clone(), self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    /// Options every entry was compiled with. Documents must be normalized
    /// with the same case mode.
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn get(&self, id: &str) -> Option<&LicenseCatalogEntry> {
        self.by_id.get(id).map(|&index| &self.entries[index])
    }

    pub fn entries(&self) -> &[LicenseCatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license_detection::validator::validate_with;

    fn entry(id: &str, text: &str) -> LicenseCatalogEntry {
        let validated = validate_with(
            id,
            text.as_bytes(),
            text.as_bytes(),
            id,
            &CompileOptions::default(),
        )
        .unwrap();
        LicenseCatalogEntry::spdx(validated, false)
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut catalog = LicenseCatalog::new(CompileOptions::default());
        catalog.insert(entry("A", "First license text.")).unwrap();
        catalog.insert(entry("B", "Second license text.")).unwrap();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("B").map(|e| e.license_id.as_str()), Some("B"));
        assert!(catalog.get("C").is_none());
        assert_eq!(catalog.entries()[0].id, "A");
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let err = LicenseCatalog::from_entries(
            CompileOptions::default(),
            vec![entry("A", "First license text."), entry("A", "Other text here.")],
        )
        .unwrap_err();
        assert_eq!(err, CatalogError::DuplicateId("A".to_string()));
    }

    #[test]
    fn test_passes_precheck() {
        let e = entry("A", "Alpha wording. Beta wording.");
        assert!(e.passes_precheck("prefix Alpha wording. Beta wording. suffix"));
        assert!(!e.passes_precheck("Gamma wording."));
    }
}
