//! `license_info.json` of a custom license directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Metadata of a custom (non-SPDX) license.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseInfo {
    /// Display name of the license
    pub name: String,

    /// License family, e.g. "BSD"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,

    #[serde(default)]
    pub spdx_standard: bool,

    #[serde(default)]
    pub spdx_exception: bool,

    #[serde(default)]
    pub osi_approved: bool,

    #[serde(default)]
    pub is_deprecated: bool,

    /// Other names this license is known by
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
}

impl LicenseInfo {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).context("Failed to parse license_info.json")
    }
}
