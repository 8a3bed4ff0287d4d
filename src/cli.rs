use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::license_detection::{CaseMode, CompileOptions};
use crate::resources::{ResourceConfig, resource_location};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// SPDX resources: an embedded bundle name or a directory
    #[arg(long, global = true, default_value = "default")]
    pub spdx: String,

    /// Custom resources: an embedded bundle name or a directory
    #[arg(long, global = true, default_value = "default")]
    pub custom: String,

    /// Compare license text case-insensitively
    #[arg(long, global = true)]
    pub ignore_case: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate and import an SPDX license-list-data directory
    ImportSpdx {
        /// Directory with json/, template/ and text/
        input: PathBuf,

        /// Destination resource directory
        dest: PathBuf,

        /// Ids whose validation failure does not fail the import
        #[arg(long, value_delimiter = ',')]
        allow_invalid: Vec<String>,
    },

    /// Import custom license patterns
    ImportCustom {
        /// Directory with license_patterns/<id>/
        input: PathBuf,

        /// Destination resource directory
        dest: PathBuf,
    },

    /// Validate one template against its reference text
    Validate {
        template: PathBuf,

        reference: PathBuf,

        /// Identifier used in diagnostics (defaults to the template file stem)
        #[arg(long)]
        id: Option<String>,
    },

    /// Scan files for licenses
    Scan {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output file path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Cli {
    pub fn resource_config(&self) -> Result<ResourceConfig> {
        Ok(ResourceConfig {
            spdx: resource_location(&self.spdx)?,
            custom: resource_location(&self.custom)?,
        })
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            case_mode: if self.ignore_case {
                CaseMode::Fold
            } else {
                CaseMode::Preserve
            },
            ..CompileOptions::default()
        }
    }
}
