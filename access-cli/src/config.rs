//! CLI configuration persisted under the operator's home directory.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::CliError;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_ROLE: &str = "CloudCliAccess";

/// Directory under the home dir holding config and cached credentials.
const STORE_DIR: &str = ".cca";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SsoConfig {
    pub sso_start_url: String,
    pub sso_region: String,
    pub account_id: String,
    pub role_name: String,
}

/// Reads and writes `config.json` in the store directory.
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    pub fn default_location() -> Result<Self, CliError> {
        Ok(Self::at(store_dir()?))
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self) -> PathBuf {
        self.dir.join("config.json")
    }

    pub fn load(&self) -> Result<Option<SsoConfig>, CliError> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    pub fn save(&self, config: &SsoConfig) -> Result<(), CliError> {
        ensure_private_dir(&self.dir)?;
        let path = self.path();
        fs::write(&path, serde_json::to_string_pretty(config)?)?;
        set_owner_only(&path)?;
        Ok(())
    }
}

pub(crate) fn store_dir() -> Result<PathBuf, CliError> {
    let home = dirs::home_dir()
        .ok_or_else(|| CliError::Config("could not determine home directory".to_string()))?;
    Ok(home.join(STORE_DIR))
}

pub(crate) fn ensure_private_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
    }
    Ok(())
}

pub(crate) fn set_owner_only(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}
