use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::fs::{config_dir, state_dir};

const FILE_NAME: &str = "core.toml";
const DATA_FILE_NAME: &str = "certificates.toml";

/// Handle to the core configuration
pub type Cfg = Arc<RwLock<CoreConfig>>;

/// The core configuration, serialized to TOML.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Where the certificate list is persisted. Defaults to the state directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_file: Option<PathBuf>,
}

impl CoreConfig {
    /// Load the configuration from the config directory, writing the defaults if no file exists
    /// yet.
    pub fn load() -> io::Result<Self> {
        Self::load_from(&config_dir()?.join(FILE_NAME))
    }

    pub fn load_from(path: &Path) -> io::Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            Ok(toml::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring invalid config {}: {err}", path.display());
                Self::default()
            }))
        } else {
            let cfg = Self::default();
            cfg.save_to(path)?;
            Ok(cfg)
        }
    }

    pub fn save(&self) -> io::Result<()> {
        self.save_to(&config_dir()?.join(FILE_NAME))
    }

    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        let contents = toml::to_string_pretty(self).map_err(io::Error::other)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, contents)
    }

    /// The effective path of the certificate list
    pub fn data_file(&self) -> io::Result<PathBuf> {
        match &self.data_file {
            Some(path) => Ok(path.clone()),
            None => Ok(state_dir()?.join(DATA_FILE_NAME)),
        }
    }

    pub fn handle(self) -> Cfg {
        Arc::new(RwLock::new(self))
    }
}

#[cfg(test)]
mod test {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_load_writes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join(FILE_NAME);

        let cfg = CoreConfig::load_from(&path).unwrap();

        assert_eq!(cfg, CoreConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(FILE_NAME);
        let cfg = CoreConfig {
            data_file: Some(dir.path().join("wallet.toml")),
        };

        cfg.save_to(&path).unwrap();

        assert_eq!(CoreConfig::load_from(&path).unwrap(), cfg);
        assert_eq!(cfg.data_file().unwrap(), dir.path().join("wallet.toml"));
    }

    #[test]
    fn test_invalid_config_falls_back_to_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(FILE_NAME);
        fs::write(&path, "data_file = [").unwrap();

        assert_eq!(CoreConfig::load_from(&path).unwrap(), CoreConfig::default());
    }
}
