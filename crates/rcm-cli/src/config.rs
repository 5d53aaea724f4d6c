//! Run configuration from `rcm.toml`.
//!
//! Every path has a default matching the conventional `data/` layout, so the
//! file is optional. Relative paths resolve against the working directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use rcm_ingest::{HospitalSource, SourceLayout};

pub const DEFAULT_CONFIG_FILE: &str = "rcm.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceConfig {
    /// Tag written to `source_db`.
    pub name: String,
    pub dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RcmConfig {
    pub sources: Vec<SourceConfig>,
    pub claims_dir: PathBuf,
    pub cpt_file: PathBuf,
    /// Root of the bronze, silver and gold layers.
    pub output_dir: PathBuf,
    pub state_dir: PathBuf,
}

impl Default for RcmConfig {
    fn default() -> Self {
        Self::with_raw_dir(Path::new("data/raw"), Path::new("data"))
    }
}

impl RcmConfig {
    /// Default layout under a raw data directory and an output root.
    pub fn with_raw_dir(raw: &Path, output: &Path) -> Self {
        Self {
            sources: ["hospital_a", "hospital_b"]
                .into_iter()
                .map(|name| SourceConfig {
                    name: name.to_string(),
                    dir: raw.join(name),
                })
                .collect(),
            claims_dir: raw.join("claims"),
            cpt_file: raw.join("reference").join("cptcodes.csv"),
            output_dir: output.to_path_buf(),
            state_dir: output.join("state"),
        }
    }

    /// Load `path`, or `rcm.toml` in the working directory when present.
    ///
    /// An explicit path must exist; the implicit one may not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        if !required && !path.exists() {
            debug!("no {DEFAULT_CONFIG_FILE}, using default layout");
            return Ok(Self::default());
        }
        let text =
            fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parse {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn source_layout(&self) -> SourceLayout {
        SourceLayout {
            hospitals: self
                .sources
                .iter()
                .map(|source| HospitalSource::new(source.name.clone(), source.dir.clone()))
                .collect(),
            claims_dir: self.claims_dir.clone(),
            cpt_file: self.cpt_file.clone(),
        }
    }
}
