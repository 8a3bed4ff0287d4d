//! SPDX license list JSON (`licenses.json` and `exceptions.json`).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Either SPDX list file. `licenses.json` fills `licenses`, `exceptions.json`
/// fills `exceptions`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpdxLicenseList {
    pub license_list_version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,

    #[serde(default)]
    pub licenses: Vec<SpdxLicense>,

    #[serde(default)]
    pub exceptions: Vec<SpdxException>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpdxLicense {
    pub license_id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub is_deprecated_license_id: bool,

    #[serde(default)]
    pub is_osi_approved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpdxException {
    pub license_exception_id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub is_deprecated_license_id: bool,
}

/// An identifier that has a template in an SPDX resource tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpdxTemplateId {
    pub id: String,
    pub deprecated: bool,
}

impl SpdxLicenseList {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).context("Failed to parse SPDX license list JSON")
    }

    /// Every license and exception id in list order.
    pub fn template_ids(&self) -> impl Iterator<Item = SpdxTemplateId> + '_ {
        let licenses = self.licenses.iter().map(|license| SpdxTemplateId {
            id: license.license_id.clone(),
            deprecated: license.is_deprecated_license_id,
        });
        let exceptions = self.exceptions.iter().map(|exception| SpdxTemplateId {
            id: exception.license_exception_id.clone(),
            deprecated: exception.is_deprecated_license_id,
        });
        licenses.chain(exceptions)
    }
}
