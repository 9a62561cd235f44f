//! Engine configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

/// Points fetched per storage round trip by `load`.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of points requested from the store per page.
    pub page_size: usize,

    /// Optional fully-qualified store URI (e.g., `memory://`, `file:///var/series`).
    pub store_uri: Option<String>,

    /// Root directory for the file store when no URI is configured.
    pub store_dir: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            store_uri: None,
            store_dir: "/tmp/serfun-store".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub uri: Option<String>,
    pub root: String,
}

impl StoreConfig {
    pub fn scheme(&self) -> Option<&str> {
        self.uri
            .as_deref()
            .and_then(|uri| uri.split("://").next())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }
}

impl EngineConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `SERFUN_PAGE_SIZE`: points per `load` page
    /// - `SERFUN_STORE_URI`: store URI (`memory://` or `file:///path`)
    /// - `SERFUN_STORE_DIR`: file store root when no URI is given
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("SERFUN_PAGE_SIZE") {
            if let Ok(v) = s.parse::<usize>() {
                if v > 0 {
                    cfg.page_size = v;
                }
            }
        }

        if let Ok(s) = std::env::var("SERFUN_STORE_URI") {
            cfg.store_uri = Some(s);
        }

        if let Ok(s) = std::env::var("SERFUN_STORE_DIR") {
            cfg.store_dir = s;
        }

        cfg
    }

    /// Produce a store configuration snapshot used by the IO layer.
    pub fn store_config(&self) -> StoreConfig {
        let root = match self.store_uri.as_deref() {
            Some(uri) if uri.starts_with("file://") => {
                file_uri_to_path(uri).unwrap_or_else(|| self.store_dir.clone())
            }
            _ => self.store_dir.clone(),
        };

        StoreConfig {
            uri: self.store_uri.clone(),
            root,
        }
    }
}

fn file_uri_to_path(uri: &str) -> Option<String> {
    let stripped = uri.strip_prefix("file://")?;
    if stripped.is_empty() {
        None
    } else if stripped.starts_with('/') {
        Some(stripped.to_string())
    } else {
        Some(format!("/{}", stripped))
    }
}
