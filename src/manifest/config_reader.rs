use crate::manifest::*;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// The configuration file of a deployment.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentConfig {
    pub county: Option<String>,
    pub scanners: Option<Vec<String>>,
    #[serde(rename = "manifestPath")]
    pub manifest_path: Option<String>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

impl DeploymentConfig {
    pub fn rules(&self) -> BManifestResult<ManifestRules> {
        let rules = ManifestRules {
            county: self
                .county
                .clone()
                .unwrap_or_else(|| ManifestRules::DEFAULT_COUNTY.to_string()),
            scanners: self
                .scanners
                .clone()
                .unwrap_or_else(ManifestRules::default_scanners),
        };
        validate_rules(&rules)?;
        Ok(rules)
    }

    /// The manifest path, relative to the directory of the configuration file.
    pub fn manifest_path_from(&self, config_path: Option<&str>) -> Option<String> {
        let manifest_path = self.manifest_path.clone()?;
        let parent = config_path
            .and_then(|p| Path::new(p).parent())
            .map(|p| p.to_path_buf())
            .unwrap_or_default();
        let p: PathBuf = parent.join(manifest_path);
        Some(p.as_path().display().to_string())
    }
}

pub fn read_config(path: &str) -> BManifestResult<DeploymentConfig> {
    info!("Attempting to read configuration file {:?}", path);
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: DeploymentConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

pub fn validate_rules(rules: &ManifestRules) -> BManifestResult<()> {
    if rules.county.trim().is_empty() {
        return Err(Box::new(ManifestIoError::InvalidConfig {
            reason: "the county cannot be empty".to_string(),
        }));
    }
    if rules.scanners.is_empty() {
        return Err(Box::new(ManifestIoError::InvalidConfig {
            reason: "at least one scanner is required".to_string(),
        }));
    }
    if let Some(s) = rules
        .scanners
        .iter()
        .find(|s| s.chars().count() != 2 || !s.chars().all(|c| c.is_ascii_digit()))
    {
        return Err(Box::new(ManifestIoError::InvalidConfig {
            reason: format!("scanner {:?} is not a two-digit station code", s),
        }));
    }
    Ok(())
}
