use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use serde::Serialize;

use license_templates::cli::{Cli, Command};
use license_templates::importer::{ImportOptions, import_custom, import_spdx};
use license_templates::license_detection::{
    LicenseDetectionEngine, MatchResult, ScanStats, validate_with,
};
use license_templates::resources::Resources;

#[derive(Debug, Serialize)]
struct FileScan {
    path: String,
    matches: Vec<MatchResult>,
    stats: ScanStats,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let options = cli.compile_options();

    match &cli.command {
        Command::ImportSpdx {
            input,
            dest,
            allow_invalid,
        } => {
            let import_options = ImportOptions {
                allow_invalid: allow_invalid.iter().cloned().collect::<HashSet<_>>(),
                compile: options,
            };
            let report = import_spdx(input, dest, &import_options)?.into_result()?;
            for failure in &report.allowed_failures {
                info!("Allowed invalid template: {}", failure);
            }
            println!(
                "Imported {} SPDX templates into {}",
                report.imported.len(),
                dest.display()
            );
        }
        Command::ImportCustom { input, dest } => {
            let import_options = ImportOptions {
                compile: options,
                ..ImportOptions::default()
            };
            let report = import_custom(input, dest, &import_options)?.into_result()?;
            println!(
                "Imported {} custom patterns into {}",
                report.imported.len(),
                dest.display()
            );
        }
        Command::Validate {
            template,
            reference,
            id,
        } => {
            let id = id.clone().unwrap_or_else(|| template_id(template));
            let template_bytes = fs::read(template)
                .with_context(|| format!("Failed to read {}", template.display()))?;
            let reference_bytes = fs::read(reference)
                .with_context(|| format!("Failed to read {}", reference.display()))?;
            let validated = validate_with(
                &id,
                &template_bytes,
                &reference_bytes,
                &template.display().to_string(),
                &options,
            )?;
            println!("{}", serde_json::to_string_pretty(&validated.static_blocks)?);
        }
        Command::Scan { files, output } => {
            let resources = Resources::new(&cli.resource_config()?);
            let engine = LicenseDetectionEngine::from_resources(&resources, &options)?;
            let scans = files
                .iter()
                .map(|path| scan_file(&engine, path))
                .collect::<Result<Vec<_>>>()?;
            write_output(output.as_deref(), &scans)?;
        }
    }
    Ok(())
}

fn template_id(template: &Path) -> String {
    let name = template
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    name.strip_suffix(license_templates::resources::TEMPLATE_SUFFIX)
        .unwrap_or(name)
        .to_string()
}

fn scan_file(engine: &LicenseDetectionEngine, path: &Path) -> Result<FileScan> {
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let outcome = engine.detect_with_stats(&bytes);
    Ok(FileScan {
        path: path.display().to_string(),
        matches: outcome.matches,
        stats: outcome.stats,
    })
}

fn write_output(output: Option<&Path>, scans: &[FileScan]) -> Result<()> {
    let json = serde_json::to_string_pretty(scans)?;
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            println!("JSON output written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
