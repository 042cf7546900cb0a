use crate::credential::Credential;
use crate::error::SecurityError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Persists the credential map to a single JSON document (spec §6.3):
/// `{"<id>": {...}}`. Writes are atomic via temp-file + rename so a crash
/// mid-write never leaves a half-written store on disk.
pub struct CredentialStorePath {
    path: PathBuf,
}

impl CredentialStorePath {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load on startup; a missing file is an empty store, not an error.
    /// Unknown JSON fields are ignored for forward compatibility (spec §6.3).
    pub fn load(&self) -> Result<HashMap<String, Credential>, SecurityError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| SecurityError::Persistence(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| SecurityError::Persistence(e.to_string()))
    }

    pub fn save(&self, credentials: &HashMap<String, Credential>) -> Result<(), SecurityError> {
        let body = serde_json::to_string_pretty(credentials).map_err(|e| SecurityError::Persistence(e.to_string()))?;
        atomic_write(&self.path, &body).map_err(|e| SecurityError::Persistence(e.to_string()))
    }
}

fn atomic_write(path: &Path, content: &str) -> std::io::Result<()> {
    let tmp_path = path.with_extension("tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
