use meshdir_core::{MeshError, Result};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::schema::MeshdirConfig;

/// Loads and reloads the directory client configuration.
pub struct ConfigLoader {
    config: Arc<RwLock<MeshdirConfig>>,
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Resolve the config path: explicit path > MESHDIR_CONFIG env > ~/.meshdir/meshdir.toml
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("MESHDIR_CONFIG") {
            return PathBuf::from(p);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".meshdir")
            .join("meshdir.toml")
    }

    /// Load the config from disk, falling back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = Self::resolve_path(path);
        let config = if config_path.exists() {
            info!(?config_path, "loading configuration");
            Self::parse_file(&config_path)?
        } else {
            warn!(?config_path, "config file not found, using defaults");
            MeshdirConfig::default()
        };

        let config = Self::apply_env_overrides(config);
        Self::check(&config)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
        })
    }

    /// Get a read snapshot of the current config.
    pub fn get(&self) -> MeshdirConfig {
        self.config.read().clone()
    }

    /// Get a shared reference for subscription.
    pub fn shared(&self) -> Arc<RwLock<MeshdirConfig>> {
        Arc::clone(&self.config)
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Reload the config from disk. The current snapshot is kept if the new one is invalid.
    pub fn reload(&self) -> Result<()> {
        if !self.config_path.exists() {
            return Err(MeshError::Config(format!(
                "config file not found: {}",
                self.config_path.display()
            )));
        }
        let new_config = Self::apply_env_overrides(Self::parse_file(&self.config_path)?);
        Self::check(&new_config)?;
        *self.config.write() = new_config;
        info!("configuration reloaded");
        Ok(())
    }

    fn parse_file(path: &Path) -> Result<MeshdirConfig> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str::<MeshdirConfig>(&raw)
            .map_err(|e| MeshError::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Log warnings, fail on errors.
    fn check(config: &MeshdirConfig) -> Result<()> {
        let warnings = config.validate().map_err(MeshError::Config)?;
        for w in &warnings {
            warn!("{}", w);
        }
        Ok(())
    }

    /// Apply env var overrides (MESHDIR_BASE_URL, MESHDIR_LOG_LEVEL, etc.)
    fn apply_env_overrides(mut config: MeshdirConfig) -> MeshdirConfig {
        if let Ok(v) = std::env::var("MESHDIR_BASE_URL") {
            config.directory.base_url = v;
        }
        if let Ok(v) = std::env::var("MESHDIR_USER_AGENT") {
            config.directory.user_agent = v;
        }
        if let Ok(v) = std::env::var("MESHDIR_TIMEOUT_SECS") {
            match v.parse::<u64>() {
                Ok(secs) => config.directory.timeout_secs = secs,
                Err(_) => warn!(value = %v, "ignoring non-numeric MESHDIR_TIMEOUT_SECS"),
            }
        }
        if let Ok(v) = std::env::var("MESHDIR_LOG_LEVEL") {
            config.logging.level = v;
        }
        if let Ok(v) = std::env::var("MESHDIR_LOG_FORMAT") {
            config.logging.format = v;
        }
        config
    }
}
