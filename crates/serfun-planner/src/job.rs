//! YAML job manifests: a program, its arguments and engine overrides in one file.
//!
//! Example:
//! ```yaml
//! config:
//!   store_uri: "file:///var/lib/serfun"
//!   page_size: 500
//! program: smooth.sf            # relative to the manifest
//! args:
//!   - { type: stream, path: "acme/px" }
//!   - { type: long, value: 3 }
//! output: out/smooth.txt
//! ```
//!
//! Instead of `program`, a manifest may carry the program text inline under `source`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use serfun_core::error::{Error, Result};
use serfun_core::EngineConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub config: Option<JobConfig>,
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub args: Vec<ArgSpec>,
    /// File that receives one line per result value; stdout when absent.
    #[serde(default)]
    pub output: Option<String>,
}

/// Engine overrides. Unset fields keep whatever the environment provided.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    pub page_size: Option<usize>,
    pub store_uri: Option<String>,
    pub store_dir: Option<String>,
}

/// One positional program argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum ArgSpec {
    /// A stored series, read through `load`.
    Stream { path: String },
    Long { value: i64 },
    Decimal { value: f64 },
    String { value: String },
    Boolean { value: bool },
}

pub fn parse_job(yaml_src: &str) -> Result<Job> {
    serde_yaml::from_str(yaml_src).map_err(|e| Error::Config(format!("invalid job manifest: {e}")))
}

impl Job {
    /// Program text, reading `program` relative to `base_dir` when it is not inline.
    pub fn program_source(&self, base_dir: &Path) -> Result<String> {
        match (&self.program, &self.source) {
            (Some(_), Some(_)) => Err(Error::Config(
                "job manifest sets both 'program' and 'source'".into(),
            )),
            (None, Some(src)) => Ok(src.clone()),
            (Some(path), None) => Ok(std::fs::read_to_string(base_dir.join(path))?),
            (None, None) => Err(Error::Config(
                "job manifest needs 'program' or 'source'".into(),
            )),
        }
    }
}

impl JobConfig {
    pub fn apply(&self, cfg: &mut EngineConfig) -> Result<()> {
        if let Some(n) = self.page_size {
            if n == 0 {
                return Err(Error::Config("page_size must be positive".into()));
            }
            cfg.page_size = n;
        }
        if let Some(uri) = &self.store_uri {
            cfg.store_uri = Some(uri.clone());
        }
        if let Some(dir) = &self.store_dir {
            cfg.store_dir = dir.clone();
        }
        Ok(())
    }
}
