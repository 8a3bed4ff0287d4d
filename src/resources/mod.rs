//! Resource store for license templates, prechecks and license lists.
//!
//! SPDX resources are laid out as `template/`, `precheck/` and `json/`
//! subdirectories. Custom resources keep one directory per license under
//! `license_patterns/`. Either tree is read from the embedded bundle or from
//! a directory on disk, selected by [`ResourceConfig`].

pub mod license_info;
pub mod source;
pub mod spdx_list;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::license_detection::models::{LICENSE_INFO_FILE, Namespace, PatternKind};
use crate::license_detection::{
    CaseMode, CompileOptions, LicenseCatalog, LicenseCatalogEntry, StaticBlock,
    compile_template_with, extract_static_blocks,
};

pub use license_info::LicenseInfo;
pub use source::{EmbeddedResourceSource, FilesystemResourceSource, ResourceEntry, ResourceSource};
pub use spdx_list::{SpdxLicenseList, SpdxTemplateId};

use source::join;

pub const DEFAULT_RESOURCE: &str = "default";
pub const LICENSE_PATTERNS_DIR: &str = "license_patterns";
pub const JSON_DIR: &str = "json";
pub const TEMPLATE_DIR: &str = "template";
pub const PRECHECK_DIR: &str = "precheck";
pub const TESTDATA_DIR: &str = "testdata";
pub const INVALID_DIR: &str = "invalid";
pub const LICENSES_JSON: &str = "licenses.json";
pub const EXCEPTIONS_JSON: &str = "exceptions.json";
pub const DEPRECATED_PREFIX: &str = "deprecated_";
pub const TEMPLATE_SUFFIX: &str = ".template.txt";
pub const CUSTOM_PRECHECK_PREFIX: &str = "prechecks_";

const SPDX_EMBEDDED_ROOT: &str = "spdx";
const CUSTOM_EMBEDDED_ROOT: &str = "custom";

/// Where one resource tree is read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceLocation {
    /// A named bundle compiled into the binary.
    Embedded { name: String },
    /// A directory on disk.
    Path(PathBuf),
}

impl Default for ResourceLocation {
    fn default() -> Self {
        ResourceLocation::Embedded {
            name: DEFAULT_RESOURCE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    pub spdx: ResourceLocation,
    pub custom: ResourceLocation,
}

/// File name of an SPDX template.
pub fn spdx_template_file_name(id: &str, deprecated: bool) -> String {
    with_deprecated_prefix(format!("{}{}", id, TEMPLATE_SUFFIX), deprecated)
}

/// File name of an SPDX precheck.
pub fn spdx_precheck_file_name(id: &str, deprecated: bool) -> String {
    with_deprecated_prefix(format!("{}.json", id), deprecated)
}

/// File name of the precheck stored next to a custom pattern file.
pub fn custom_precheck_file_name(pattern_file_name: &str) -> String {
    format!("{}{}.json", CUSTOM_PRECHECK_PREFIX, file_stem(pattern_file_name))
}

fn with_deprecated_prefix(file_name: String, deprecated: bool) -> String {
    if deprecated {
        format!("{}{}", DEPRECATED_PREFIX, file_name)
    } else {
        file_name
    }
}

fn file_stem(file_name: &str) -> &str {
    Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name)
}

/// Parses a precheck artifact: a JSON array of static-block strings.
pub fn parse_prechecks(bytes: &[u8]) -> Result<Vec<StaticBlock>> {
    serde_json::from_slice(bytes).context("Failed to parse precheck JSON")
}

/// Serializes static blocks as a pretty-printed JSON array.
pub fn prechecks_to_json(blocks: &[StaticBlock]) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(blocks).context("Failed to serialize prechecks")
}

/// A custom pattern file to compile.
#[derive(Debug, Clone)]
struct CustomPattern {
    license_id: String,
    file_name: String,
    path: PathBuf,
    kind: PatternKind,
    deprecated: bool,
}

/// Reads SPDX and custom resources through the configured sources.
#[derive(Debug)]
pub struct Resources {
    spdx_source: Box<dyn ResourceSource>,
    spdx_root: PathBuf,
    custom_source: Box<dyn ResourceSource>,
    custom_root: PathBuf,
}

impl Default for Resources {
    fn default() -> Self {
        Self::new(&ResourceConfig::default())
    }
}

impl Resources {
    pub fn new(config: &ResourceConfig) -> Self {
        let (spdx_source, spdx_root) = select_source(&config.spdx, SPDX_EMBEDDED_ROOT);
        let (custom_source, custom_root) = select_source(&config.custom, CUSTOM_EMBEDDED_ROOT);
        Self {
            spdx_source,
            spdx_root,
            custom_source,
            custom_root,
        }
    }

    /// Reads an SPDX template and returns it with the path it was read from.
    pub fn read_spdx_template(&self, id: &str, deprecated: bool) -> Result<(Vec<u8>, PathBuf)> {
        let path = join(
            &self.spdx_root,
            &[TEMPLATE_DIR, &spdx_template_file_name(id, deprecated)],
        );
        let bytes = self.spdx_source.read_file(&path)?;
        Ok((bytes, path))
    }

    /// Reads the stored prechecks of an SPDX template, if there are any.
    pub fn read_spdx_precheck(&self, id: &str, deprecated: bool) -> Result<Option<Vec<StaticBlock>>> {
        let path = join(
            &self.spdx_root,
            &[PRECHECK_DIR, &spdx_precheck_file_name(id, deprecated)],
        );
        if !self.spdx_source.is_file(&path) {
            return Ok(None);
        }
        let bytes = self.spdx_source.read_file(&path)?;
        parse_prechecks(&bytes)
            .with_context(|| format!("Invalid precheck file: {}", path.display()))
            .map(Some)
    }

    /// Raw bytes of `licenses.json` and `exceptions.json`.
    pub fn read_spdx_list_json(&self) -> Result<(Vec<u8>, Vec<u8>)> {
        let licenses = self
            .spdx_source
            .read_file(&join(&self.spdx_root, &[JSON_DIR, LICENSES_JSON]))?;
        let exceptions = self
            .spdx_source
            .read_file(&join(&self.spdx_root, &[JSON_DIR, EXCEPTIONS_JSON]))?;
        Ok((licenses, exceptions))
    }

    pub fn read_spdx_lists(&self) -> Result<(SpdxLicenseList, SpdxLicenseList)> {
        let (licenses, exceptions) = self.read_spdx_list_json()?;
        let licenses = SpdxLicenseList::from_json(&licenses)
            .with_context(|| format!("Invalid {} in {}", LICENSES_JSON, self.spdx_root.display()))?;
        let exceptions = SpdxLicenseList::from_json(&exceptions).with_context(|| {
            format!("Invalid {} in {}", EXCEPTIONS_JSON, self.spdx_root.display())
        })?;
        Ok((licenses, exceptions))
    }

    /// Ids of the custom licenses, one per `license_patterns/` subdirectory.
    pub fn read_custom_pattern_ids(&self) -> Result<Vec<String>> {
        let path = join(&self.custom_root, &[LICENSE_PATTERNS_DIR]);
        Ok(self
            .custom_source
            .read_dir(&path)?
            .into_iter()
            .filter(|entry| entry.is_dir)
            .map(|entry| entry.name)
            .collect())
    }

    /// Lists the directory of one custom license and returns its path.
    pub fn read_custom_patterns_dir(&self, id: &str) -> Result<(Vec<ResourceEntry>, PathBuf)> {
        let path = join(&self.custom_root, &[LICENSE_PATTERNS_DIR, id]);
        let entries = self.custom_source.read_dir(&path)?;
        Ok((entries, path))
    }

    /// Reads a file by a path returned from [`Self::read_custom_patterns_dir`].
    pub fn read_custom_file(&self, path: &Path) -> Result<Vec<u8>> {
        self.custom_source.read_file(path)
    }

    pub fn read_custom_license_info(&self, id: &str) -> Result<LicenseInfo> {
        let path = join(
            &self.custom_root,
            &[LICENSE_PATTERNS_DIR, id, LICENSE_INFO_FILE],
        );
        let bytes = self.custom_source.read_file(&path)?;
        LicenseInfo::from_json(&bytes).with_context(|| format!("Invalid {}", path.display()))
    }

    /// Builds a catalog from every SPDX and custom template.
    ///
    /// Stored prechecks are used when present and the catalog preserves case.
    /// Otherwise static blocks are extracted from the compiled template.
    /// Templates that fail to compile are skipped with a warning.
    pub fn load_catalog(&self, options: &CompileOptions) -> Result<LicenseCatalog> {
        let (licenses, exceptions) = self.read_spdx_lists()?;
        let spdx_ids: Vec<SpdxTemplateId> = licenses
            .template_ids()
            .chain(exceptions.template_ids())
            .collect();

        let spdx_entries = spdx_ids
            .par_iter()
            .map(|template_id| self.load_spdx_entry(template_id, options))
            .collect::<Result<Vec<_>>>()?;

        let custom_patterns = self.custom_patterns()?;
        let custom_entries = custom_patterns
            .par_iter()
            .map(|pattern| self.load_custom_entry(pattern, options))
            .collect::<Result<Vec<_>>>()?;

        let catalog = LicenseCatalog::from_entries(
            *options,
            spdx_entries
                .into_iter()
                .chain(custom_entries)
                .flatten(),
        )?;
        info!(
            "Loaded license catalog with {} entries ({} SPDX ids, {} custom patterns)",
            catalog.len(),
            spdx_ids.len(),
            custom_patterns.len()
        );
        Ok(catalog)
    }

    fn load_spdx_entry(
        &self,
        template_id: &SpdxTemplateId,
        options: &CompileOptions,
    ) -> Result<Option<LicenseCatalogEntry>> {
        let SpdxTemplateId { id, deprecated } = template_id;
        let template_path = join(
            &self.spdx_root,
            &[TEMPLATE_DIR, &spdx_template_file_name(id, *deprecated)],
        );
        if !self.spdx_source.is_file(&template_path) {
            debug!("No template for SPDX id {}", id);
            return Ok(None);
        }
        let (template, _) = self.read_spdx_template(id, *deprecated)?;

        let compiled = match compile_template_with(&template, options) {
            Ok(compiled) => compiled,
            Err(e) => {
                warn!("Skipping SPDX template {}: {}", template_path.display(), e);
                return Ok(None);
            }
        };

        let stored = if options.case_mode == CaseMode::Preserve {
            self.read_spdx_precheck(id, *deprecated)?
        } else {
            None
        };
        let static_blocks = stored.unwrap_or_else(|| extract_static_blocks(&compiled.segments));

        Ok(Some(LicenseCatalogEntry {
            id: id.clone(),
            license_id: id.clone(),
            namespace: Namespace::Spdx,
            kind: PatternKind::Primary,
            deprecated: *deprecated,
            pattern: compiled.pattern,
            static_blocks,
        }))
    }

    fn custom_patterns(&self) -> Result<Vec<CustomPattern>> {
        let patterns_dir = join(&self.custom_root, &[LICENSE_PATTERNS_DIR]);
        if self.custom_source.read_dir(&patterns_dir).is_err() {
            debug!("No custom license patterns in {}", patterns_dir.display());
            return Ok(Vec::new());
        }

        let mut patterns = Vec::new();
        for license_id in self.read_custom_pattern_ids()? {
            let info = self.read_custom_license_info(&license_id)?;
            let (entries, dir) = self.read_custom_patterns_dir(&license_id)?;
            for entry in entries.into_iter().filter(|entry| !entry.is_dir) {
                let Some(kind) = PatternKind::from_file_name(&entry.name.to_lowercase()) else {
                    continue;
                };
                patterns.push(CustomPattern {
                    license_id: license_id.clone(),
                    path: dir.join(&entry.name),
                    file_name: entry.name,
                    kind,
                    deprecated: info.is_deprecated,
                });
            }
        }
        Ok(patterns)
    }

    fn load_custom_entry(
        &self,
        pattern: &CustomPattern,
        options: &CompileOptions,
    ) -> Result<Option<LicenseCatalogEntry>> {
        let template = self.read_custom_file(&pattern.path)?;
        let compiled = match compile_template_with(&template, options) {
            Ok(compiled) => compiled,
            Err(e) => {
                warn!("Skipping custom pattern {}: {}", pattern.path.display(), e);
                return Ok(None);
            }
        };

        let precheck_path = pattern
            .path
            .with_file_name(custom_precheck_file_name(&pattern.file_name));
        let stored = if options.case_mode == CaseMode::Preserve
            && self.custom_source.is_file(&precheck_path)
        {
            let bytes = self.read_custom_file(&precheck_path)?;
            Some(
                parse_prechecks(&bytes)
                    .with_context(|| format!("Invalid precheck file: {}", precheck_path.display()))?,
            )
        } else {
            None
        };
        let static_blocks = stored.unwrap_or_else(|| extract_static_blocks(&compiled.segments));

        Ok(Some(LicenseCatalogEntry {
            id: format!("{}/{}", pattern.license_id, file_stem(&pattern.file_name)),
            license_id: pattern.license_id.clone(),
            namespace: Namespace::Custom,
            kind: pattern.kind,
            deprecated: pattern.deprecated,
            pattern: compiled.pattern,
            static_blocks,
        }))
    }
}

fn select_source(
    location: &ResourceLocation,
    embedded_root: &str,
) -> (Box<dyn ResourceSource>, PathBuf) {
    match location {
        ResourceLocation::Embedded { name } => (
            Box::new(EmbeddedResourceSource),
            Path::new(embedded_root).join(name),
        ),
        ResourceLocation::Path(path) => (Box::new(FilesystemResourceSource), path.clone()),
    }
}

/// Resolves a CLI-style resource argument: a path when it names an existing
/// directory, otherwise the name of an embedded bundle.
pub fn resource_location(value: &str) -> Result<ResourceLocation> {
    let path = Path::new(value);
    if path.is_dir() {
        return Ok(ResourceLocation::Path(path.to_path_buf()));
    }
    if value.contains(std::path::MAIN_SEPARATOR) {
        return Err(anyhow!("Resource directory does not exist: {}", value));
    }
    Ok(ResourceLocation::Embedded {
        name: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::importer::{ImportOptions, import_custom, import_spdx};
    use crate::license_detection::{NormalizationData, scan};
    use std::fs;
    use tempfile::tempdir;

    const HOLDER_TEMPLATE: &str = r#"Copyright <<var;name="copyright";original="(c) <year> <holder>";match=".{0,80}">>
Everyone may use this test license text for any purpose whatsoever."#;

    fn write(path: &Path, contents: &[u8]) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn write_spdx_tree(root: &Path) {
        write(
            &root.join("json/licenses.json"),
            br#"{"licenseListVersion": "3.21", "licenses": [
                {"licenseId": "Test-1.0", "name": "Test", "isDeprecatedLicenseId": false},
                {"licenseId": "Old-1.0", "name": "Old", "isDeprecatedLicenseId": true},
                {"licenseId": "NoTemplate", "name": "Missing", "isDeprecatedLicenseId": false}
            ]}"#,
        );
        write(
            &root.join("json/exceptions.json"),
            br#"{"licenseListVersion": "3.21", "exceptions": []}"#,
        );
        write(
            &root.join("template/Test-1.0.template.txt"),
            HOLDER_TEMPLATE.as_bytes(),
        );
        write(
            &root.join("template/deprecated_Old-1.0.template.txt"),
            b"This old license is kept only for historical reasons.",
        );
    }

    fn filesystem_config(spdx: &Path, custom: &Path) -> ResourceConfig {
        ResourceConfig {
            spdx: ResourceLocation::Path(spdx.to_path_buf()),
            custom: ResourceLocation::Path(custom.to_path_buf()),
        }
    }

    #[test]
    fn test_file_names() {
        assert_eq!(spdx_template_file_name("MIT", false), "MIT.template.txt");
        assert_eq!(
            spdx_template_file_name("Nunit", true),
            "deprecated_Nunit.template.txt"
        );
        assert_eq!(spdx_precheck_file_name("MIT", false), "MIT.json");
        assert_eq!(spdx_precheck_file_name("Nunit", true), "deprecated_Nunit.json");
        assert_eq!(
            custom_precheck_file_name("license_notice.txt"),
            "prechecks_license_notice.json"
        );
    }

    #[test]
    fn test_prechecks_json_format() {
        let blocks = vec![StaticBlock::from("first block")];
        let json = prechecks_to_json(&blocks).unwrap();
        assert_eq!(String::from_utf8(json.clone()).unwrap(), "[\n  \"first block\"\n]");
        assert_eq!(parse_prechecks(&json).unwrap(), blocks);
    }

    #[test]
    fn test_embedded_default_catalog() {
        let resources = Resources::default();
        let catalog = resources.load_catalog(&CompileOptions::default()).unwrap();
        assert!(catalog.get("MIT").is_some());
        assert!(catalog.get("0BSD").is_some());
        assert!(
            catalog
                .entries()
                .iter()
                .any(|entry| entry.namespace == Namespace::Custom)
        );
    }

    #[test]
    fn test_filesystem_catalog_with_deprecated_and_missing_templates() {
        let spdx = tempdir().unwrap();
        let custom = tempdir().unwrap();
        write_spdx_tree(spdx.path());

        let resources = Resources::new(&filesystem_config(spdx.path(), custom.path()));
        let catalog = resources.load_catalog(&CompileOptions::default()).unwrap();

        assert_eq!(catalog.len(), 2);
        assert!(!catalog.get("Test-1.0").unwrap().deprecated);
        assert!(catalog.get("Old-1.0").unwrap().deprecated);
        assert!(catalog.get("NoTemplate").is_none());
    }

    #[test]
    fn test_stored_prechecks_are_used() {
        let spdx = tempdir().unwrap();
        let custom = tempdir().unwrap();
        write_spdx_tree(spdx.path());
        write(
            &spdx.path().join("precheck/Test-1.0.json"),
            br#"["Everyone may use"]"#,
        );

        let resources = Resources::new(&filesystem_config(spdx.path(), custom.path()));
        let catalog = resources.load_catalog(&CompileOptions::default()).unwrap();
        assert_eq!(
            catalog.get("Test-1.0").unwrap().static_blocks,
            vec![StaticBlock::from("Everyone may use")]
        );

        let folded = resources
            .load_catalog(&CompileOptions {
                case_mode: CaseMode::Fold,
                ..CompileOptions::default()
            })
            .unwrap();
        assert_eq!(
            folded.get("Test-1.0").unwrap().static_blocks,
            vec![
                StaticBlock::from("copyright"),
                StaticBlock::from("everyone may use this test license text for any purpose whatsoever.")
            ]
        );
    }

    #[test]
    fn test_custom_patterns_are_loaded() {
        let spdx = tempdir().unwrap();
        let custom = tempdir().unwrap();
        write_spdx_tree(spdx.path());
        let dir = custom.path().join("license_patterns/Acme-Notice");
        write(
            &dir.join("license_info.json"),
            br#"{"name": "Acme Notice", "is_deprecated": true}"#,
        );
        write(
            &dir.join("license_acme.txt"),
            b"This file is distributed under the Acme notice.",
        );
        write(
            &dir.join("associated_short.txt"),
            b"Refer to the Acme notice for terms.",
        );
        write(&dir.join("README.md"), b"not a pattern");

        let resources = Resources::new(&filesystem_config(spdx.path(), custom.path()));
        assert_eq!(resources.read_custom_pattern_ids().unwrap(), vec!["Acme-Notice"]);

        let catalog = resources.load_catalog(&CompileOptions::default()).unwrap();
        let primary = catalog.get("Acme-Notice/license_acme").unwrap();
        assert_eq!(primary.kind, PatternKind::Primary);
        assert_eq!(primary.namespace, Namespace::Custom);
        assert!(primary.deprecated);
        assert_eq!(
            catalog.get("Acme-Notice/associated_short").unwrap().kind,
            PatternKind::Associated
        );
        assert_eq!(catalog.len(), 4);

        let matches = scan(
            b"// This file is distributed under the Acme notice.\n",
            &catalog,
        );
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].license_id, "Acme-Notice");
    }

    #[test]
    fn test_missing_license_list_is_an_error() {
        let spdx = tempdir().unwrap();
        let custom = tempdir().unwrap();
        let resources = Resources::new(&filesystem_config(spdx.path(), custom.path()));
        assert!(resources.load_catalog(&CompileOptions::default()).is_err());
    }

    #[test]
    fn test_resource_location() {
        let dir = tempdir().unwrap();
        assert_eq!(
            resource_location(dir.path().to_str().unwrap()).unwrap(),
            ResourceLocation::Path(dir.path().to_path_buf())
        );
        assert_eq!(
            resource_location("default").unwrap(),
            ResourceLocation::Embedded {
                name: "default".to_string()
            }
        );
    }
    const NOMOS_TEMPLATE: &str = "The licensed work <<var;name=\"w\";original=\"\u{039D}\u{039F}\u{039C}\u{039F}\u{03A3}\";match=\"\u{039D}\u{039F}\u{039C}\u{039F}\u{03A3}\">> is provided here under these terms.";
    const NOMOS_TEXT: &str =
        "The licensed work \u{039D}\u{039F}\u{039C}\u{039F}\u{03A3} is provided here under these terms.";

    /// SPDX import input built from the embedded bundle plus a template whose
    /// only fixed variable text changes under case folding.
    fn write_import_input(input: &Path) {
        write(
            &input.join("json/licenses.json"),
            br#"{"licenseListVersion": "3.21", "licenses": [
                {"licenseId": "MIT", "name": "MIT License", "isDeprecatedLicenseId": false},
                {"licenseId": "0BSD", "name": "BSD Zero Clause License", "isDeprecatedLicenseId": false},
                {"licenseId": "Nomos-1.0", "name": "Nomos", "isDeprecatedLicenseId": false}
            ]}"#,
        );
        write(
            &input.join("json/exceptions.json"),
            br#"{"licenseListVersion": "3.21", "exceptions": []}"#,
        );
        for id in ["MIT", "0BSD"] {
            let template = fs::read(format!("resources/spdx/default/template/{}.template.txt", id)).unwrap();
            write(&input.join(format!("template/{}.template.txt", id)), &template);
            let text = fs::read(format!("testdata/validator/{}.txt", id)).unwrap();
            write(&input.join(format!("text/{}.txt", id)), &text);
        }
        write(
            &input.join("template/Nomos-1.0.template.txt"),
            NOMOS_TEMPLATE.as_bytes(),
        );
        write(&input.join("text/Nomos-1.0.txt"), NOMOS_TEXT.as_bytes());
    }

    #[test]
    fn test_precheck_soundness_across_case_modes() {
        let input = tempdir().unwrap();
        let spdx_dest = tempdir().unwrap();
        let custom_dest = tempdir().unwrap();
        write_import_input(input.path());

        let fold_import = ImportOptions {
            compile: CompileOptions {
                case_mode: CaseMode::Fold,
                ..CompileOptions::default()
            },
            ..ImportOptions::default()
        };
        import_spdx(input.path(), spdx_dest.path(), &fold_import)
            .unwrap()
            .into_result()
            .unwrap();
        import_custom(
            Path::new("resources/custom/default"),
            custom_dest.path(),
            &fold_import,
        )
        .unwrap()
        .into_result()
        .unwrap();

        let mit = String::from_utf8(fs::read("testdata/validator/MIT.txt").unwrap()).unwrap();
        let documents = vec![
            mit.clone(),
            mit.to_uppercase(),
            String::from_utf8(fs::read("testdata/validator/0BSD.txt").unwrap()).unwrap(),
            NOMOS_TEXT.to_string(),
            NOMOS_TEXT.to_lowercase(),
            "This software is hereby released into the public domain.".to_string(),
        ];

        let configs = [
            ResourceConfig::default(),
            filesystem_config(spdx_dest.path(), custom_dest.path()),
        ];
        for config in &configs {
            for case_mode in [CaseMode::Preserve, CaseMode::Fold] {
                let options = CompileOptions {
                    case_mode,
                    ..CompileOptions::default()
                };
                let catalog = Resources::new(config).load_catalog(&options).unwrap();

                let mut matched = 0;
                for document in &documents {
                    let data = NormalizationData::new(document, options.normalize_options());
                    let normalized = data.normalized_text();
                    for entry in catalog.entries() {
                        if entry.pattern.is_match(normalized) {
                            matched += 1;
                            assert!(
                                entry.passes_precheck(normalized),
                                "{} matches but fails its precheck ({:?}, {:?})",
                                entry.id,
                                case_mode,
                                config
                            );
                        }
                    }
                }
                assert!(matched >= 3, "only {} matches ({:?}, {:?})", matched, case_mode, config);
            }
        }

        let stored: Vec<String> = serde_json::from_slice(
            &fs::read(spdx_dest.path().join("precheck/Nomos-1.0.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(stored[1], "\u{039D}\u{039F}\u{039C}\u{039F}\u{03A3}");
    }
}
