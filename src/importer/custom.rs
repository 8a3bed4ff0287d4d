//! Import of custom (non-SPDX) license patterns.
//!
//! Input layout: `license_patterns/<id>/` holding `license_info.json` and
//! pattern files prefixed `license_`, `associated_` or `optional_`. Custom
//! patterns have no reference text, so they are compiled but not matched.

use std::path::Path;

use anyhow::{Context, Result};
use log::{error, info};

use crate::importer::{ImportFailure, ImportOptions, ImportReport, prepare_destination, write_file};
use crate::license_detection::models::{LICENSE_INFO_FILE, PatternKind};
use crate::license_detection::{
    ValidationError, ValidationStage, compile_template_with, stored_static_blocks,
};
use crate::resources::{
    LICENSE_PATTERNS_DIR, LicenseInfo, ResourceConfig, ResourceLocation, Resources,
    custom_precheck_file_name, prechecks_to_json,
};

/// Imports custom license patterns from `input` into the resource tree at
/// `dest`. Each destination `license_patterns/<id>` directory must be empty or
/// absent.
pub fn import_custom(input: &Path, dest: &Path, options: &ImportOptions) -> Result<ImportReport> {
    let source = Resources::new(&ResourceConfig {
        custom: ResourceLocation::Path(input.to_path_buf()),
        ..ResourceConfig::default()
    });

    let mut report = ImportReport::default();
    for id in source.read_custom_pattern_ids()? {
        let (entries, id_path) = source.read_custom_patterns_dir(&id)?;
        let id_dir = format!("{}/{}", LICENSE_PATTERNS_DIR, id);
        prepare_destination(dest, &[&id_dir])?;
        let dest_dir = dest.join(&id_dir);

        for entry in entries.into_iter().filter(|entry| !entry.is_dir) {
            let file_name = entry.name;
            let file_path = id_path.join(&file_name);
            let lower = file_name.to_lowercase();

            if lower == LICENSE_INFO_FILE {
                let bytes = source.read_custom_file(&file_path)?;
                LicenseInfo::from_json(&bytes)
                    .with_context(|| format!("Invalid {}", file_path.display()))?;
                write_file(&dest_dir.join(&file_name), &bytes)?;
                continue;
            }
            if PatternKind::from_file_name(&lower).is_none() {
                continue;
            }

            let bytes = source.read_custom_file(&file_path)?;
            let extracted = compile_template_with(&bytes, &options.compile)
                .and_then(|compiled| stored_static_blocks(&bytes, &compiled));
            let blocks = match extracted {
                Ok(blocks) => blocks,
                Err(e) => {
                    let failure = ImportFailure::from(ValidationError {
                        id: id.clone(),
                        template_path: file_path.display().to_string(),
                        stage: ValidationStage::Compile(e),
                    });
                    error!("{}", failure);
                    report.record_failure(failure, options);
                    continue;
                }
            };

            write_file(&dest_dir.join(&file_name), &bytes)?;
            let prechecks = prechecks_to_json(&blocks)?;
            write_file(
                &dest_dir.join(custom_precheck_file_name(&file_name)),
                &prechecks,
            )?;
            report.imported.push(format!(
                "{}/{}",
                id,
                file_name.rsplit_once('.').map_or(file_name.as_str(), |(stem, _)| stem)
            ));
        }
    }

    info!(
        "Imported {} custom patterns, {} invalid",
        report.imported.len(),
        report.failures.len()
    );
    Ok(report)
}
