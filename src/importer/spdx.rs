//! Import of an SPDX license-list-data checkout.
//!
//! Input layout: `json/licenses.json`, `json/exceptions.json`,
//! `template/<id>.template.txt` and reference texts `text/<id>.txt`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::{error, info, warn};
use rayon::prelude::*;

use crate::importer::{ImportFailure, ImportOptions, ImportReport, prepare_destination, write_file};
use crate::license_detection::{
    StaticBlock, ValidationError, stored_static_blocks, validate_with,
};
use crate::resources::{
    DEPRECATED_PREFIX, EXCEPTIONS_JSON, INVALID_DIR, JSON_DIR, LICENSES_JSON, PRECHECK_DIR,
    SpdxLicenseList, TEMPLATE_DIR, TEMPLATE_SUFFIX, TESTDATA_DIR, prechecks_to_json,
};

const TEXT_DIR: &str = "text";

/// Everything read and derived for one template.
struct TemplateImport {
    id: String,
    template_name: String,
    template: Vec<u8>,
    text_name: String,
    text: Vec<u8>,
    result: Result<Vec<StaticBlock>, ImportFailure>,
}

/// Imports SPDX templates from `input` into the resource tree at `dest`.
///
/// The destination `template`, `precheck`, `json`, `testdata` and
/// `testdata/invalid` directories must be empty or absent. Templates that fail
/// validation are stashed under `testdata/invalid` for inspection. Call
/// [`ImportReport::into_result`] to turn remaining failures into an error.
pub fn import_spdx(input: &Path, dest: &Path, options: &ImportOptions) -> Result<ImportReport> {
    let licenses_path = input.join(JSON_DIR).join(LICENSES_JSON);
    let exceptions_path = input.join(JSON_DIR).join(EXCEPTIONS_JSON);
    let template_dir = input.join(TEMPLATE_DIR);

    let licenses_bytes = fs::read(&licenses_path)
        .with_context(|| format!("Failed to read {}", licenses_path.display()))?;
    let licenses = SpdxLicenseList::from_json(&licenses_bytes)
        .with_context(|| format!("Invalid license list {}", licenses_path.display()))?;
    let exceptions_bytes = fs::read(&exceptions_path)
        .with_context(|| format!("Failed to read {}", exceptions_path.display()))?;
    let exceptions = SpdxLicenseList::from_json(&exceptions_bytes)
        .with_context(|| format!("Invalid exception list {}", exceptions_path.display()))?;

    if licenses.license_list_version != exceptions.license_list_version {
        bail!(
            "License list version '{}' does not match exception list version '{}'",
            licenses.license_list_version,
            exceptions.license_list_version
        );
    }

    let template_names = list_templates(&template_dir)?;
    if template_names.is_empty() {
        bail!("Template source dir {} is empty", template_dir.display());
    }

    let invalid_dir = format!("{}/{}", TESTDATA_DIR, INVALID_DIR);
    prepare_destination(
        dest,
        &[TEMPLATE_DIR, PRECHECK_DIR, JSON_DIR, TESTDATA_DIR, &invalid_dir],
    )?;
    write_file(&dest.join(JSON_DIR).join(LICENSES_JSON), &licenses_bytes)?;
    write_file(&dest.join(JSON_DIR).join(EXCEPTIONS_JSON), &exceptions_bytes)?;

    info!(
        "Importing {} SPDX templates (license list {})",
        template_names.len(),
        licenses.license_list_version
    );

    let imports = template_names
        .par_iter()
        .map(|name| import_template(input, name, options))
        .collect::<Result<Vec<_>>>()?;

    let mut report = ImportReport::default();
    for import in imports {
        match &import.result {
            Ok(blocks) => {
                write_valid(dest, &import, blocks)?;
                report.imported.push(import.id.clone());
            }
            Err(failure) => {
                error!("{}", failure);
                write_invalid(dest, &import);
                report.record_failure(failure.clone(), options);
            }
        }
    }

    info!(
        "Imported {} SPDX templates, {} invalid, {} allowed invalid",
        report.imported.len(),
        report.failures.len(),
        report.allowed_failures.len()
    );
    Ok(report)
}

/// Template file names in `dir`, sorted.
fn list_templates(dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read template directory: {}", dir.display()))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry =
            entry.with_context(|| format!("Failed to read directory entry in: {}", dir.display()))?;
        let path = entry.path();
        if let Some(name) = path.file_name().and_then(|n| n.to_str())
            && path.is_file()
            && name.ends_with(TEMPLATE_SUFFIX)
        {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

fn import_template(input: &Path, template_name: &str, options: &ImportOptions) -> Result<TemplateImport> {
    let id = template_name
        .strip_suffix(TEMPLATE_SUFFIX)
        .unwrap_or(template_name)
        .to_string();
    let template_path = input.join(TEMPLATE_DIR).join(template_name);
    let template = fs::read(&template_path)
        .with_context(|| format!("Failed to read template {}", template_path.display()))?;
    let text_name = format!("{}.txt", id);
    let text_path = input.join(TEXT_DIR).join(&text_name);
    let template_display = template_path.display().to_string();

    let (text, result) = match fs::read(&text_path) {
        Ok(text) => {
            let result = validate_for_import(&id, &template, &text, &template_display, options);
            match result {
                Err(e) if id.starts_with(DEPRECATED_PREFIX) => {
                    retry_with_unprefixed_reference(input, &id, &template, &template_display, options)
                        .unwrap_or((text, Err(e.into())))
                }
                result => (text, result.map_err(ImportFailure::from)),
            }
        }
        Err(_) if id.starts_with(DEPRECATED_PREFIX) => {
            retry_with_unprefixed_reference(input, &id, &template, &template_display, options)
                .unwrap_or_else(|| missing_reference(&id, text_path))
        }
        Err(_) => missing_reference(&id, text_path),
    };

    Ok(TemplateImport {
        id,
        template_name: template_name.to_string(),
        template,
        text_name,
        text,
        result,
    })
}

type Validation = (Vec<u8>, Result<Vec<StaticBlock>, ImportFailure>);

fn missing_reference(id: &str, path: PathBuf) -> Validation {
    (
        Vec::new(),
        Err(ImportFailure::MissingReference {
            id: id.to_string(),
            path,
        }),
    )
}

/// Deprecated ids are stored as `deprecated_<id>`, but their reference text
/// may only exist under the plain `<id>`. Validates against that text instead.
/// Returns `None` when there is no unprefixed reference text.
fn retry_with_unprefixed_reference(
    input: &Path,
    id: &str,
    template: &[u8],
    template_path: &str,
    options: &ImportOptions,
) -> Option<Validation> {
    let unprefixed = id.strip_prefix(DEPRECATED_PREFIX)?;
    let text_path = input.join(TEXT_DIR).join(format!("{}.txt", unprefixed));
    let text = fs::read(&text_path).ok()?;
    info!(
        "Template {} is not valid against its own reference text, retrying with {}",
        id,
        text_path.display()
    );
    let result = validate_for_import(id, template, &text, template_path, options);
    Some((text, result.map_err(ImportFailure::from)))
}

/// Validates a template with the import options and returns the static blocks
/// to store as its precheck.
fn validate_for_import(
    id: &str,
    template: &[u8],
    text: &[u8],
    template_path: &str,
    options: &ImportOptions,
) -> Result<Vec<StaticBlock>, ValidationError> {
    let validated = validate_with(id, template, text, template_path, &options.compile)?;
    stored_static_blocks(template, &validated.template).map_err(|e| ValidationError {
        id: id.to_string(),
        template_path: template_path.to_string(),
        stage: e.into(),
    })
}

fn write_valid(dest: &Path, import: &TemplateImport, blocks: &[StaticBlock]) -> Result<()> {
    write_file(
        &dest.join(TEMPLATE_DIR).join(&import.template_name),
        &import.template,
    )?;
    write_file(&dest.join(TESTDATA_DIR).join(&import.text_name), &import.text)?;
    let prechecks = prechecks_to_json(blocks)
        .with_context(|| format!("Failed to build prechecks for {}", import.id))?;
    write_file(
        &dest.join(PRECHECK_DIR).join(format!("{}.json", import.id)),
        &prechecks,
    )
}

/// Stashes an invalid template and its text for manual examination.
fn write_invalid(dest: &Path, import: &TemplateImport) {
    let invalid = dest.join(TESTDATA_DIR).join(INVALID_DIR);
    if let Err(e) = write_file(&invalid.join(&import.template_name), &import.template) {
        warn!("{:#}", e);
    }
    if !import.text.is_empty()
        && let Err(e) = write_file(&invalid.join(&import.text_name), &import.text)
    {
        warn!("{:#}", e);
    }
}
