pub mod cli;
pub mod importer;
pub mod license_detection;
pub mod resources;

pub use importer::{ImportFailure, ImportOptions, ImportReport, import_custom, import_spdx};
pub use license_detection::{
    CompileOptions, LicenseCatalog, LicenseDetectionEngine, MatchResult, compile_template,
    normalize_text, scan, validate,
};
pub use resources::{ResourceConfig, ResourceLocation, Resources};
