//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `relay.toml`.
//!     loads configuration from file or falls back to defaults, then applies
//!     environment overrides.
//!
//! structure:
//!     - ServerConfig: listen port and the static client bundle directory.
//!     - FirebaseConfig: project, realtime database url, credentials and
//!       rest endpoints (overridable for the emulator suite).
//!     - LoggingConfig: default tracing filter when RUST_LOG is unset.
//!
//! environment overrides:
//!     PORT, GOOGLE_APPLICATION_CREDENTIALS, FIREBASE_DATABASE_URL,
//!     FIREBASE_PROJECT_ID. RELAY_CONFIG points at an explicit config file.
//!
//! ==============================================================================

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RelayConfig {
    pub server: ServerConfig,
    pub firebase: FirebaseConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FirebaseConfig {
    /// defaults to the project of the service account key
    pub project_id: Option<String>,
    pub database_url: String,
    pub credentials_path: PathBuf,
    /// bearer token used instead of the key file (emulator suite: "owner")
    pub static_token: Option<String>,
    pub firestore_url: String,
    pub fcm_url: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            static_dir: PathBuf::from("public"),
        }
    }
}

impl Default for FirebaseConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            database_url: "https://greenhouse-ctrl-system-default-rtdb.europe-west1.firebasedatabase.app"
                .to_string(),
            credentials_path: PathBuf::from("service-account.json"),
            static_token: None,
            firestore_url: "https://firestore.googleapis.com".to_string(),
            fcm_url: "https://fcm.googleapis.com".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Where the effective configuration came from, reported once logging is up.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigOrigin {
    File(PathBuf),
    Defaults { rejected: Vec<(PathBuf, String)> },
}

impl RelayConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file {}", path.as_ref().display()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| anyhow!("Failed to parse config: {}", e))
    }

    /// Load the first readable config file (or defaults), then apply env overrides.
    pub fn load_or_default() -> Result<(Self, ConfigOrigin)> {
        let mut paths = Vec::new();
        if let Ok(explicit) = std::env::var("RELAY_CONFIG") {
            paths.push(PathBuf::from(explicit));
        }
        paths.push(PathBuf::from("config").join("relay.toml"));
        paths.push(PathBuf::from("..").join("config").join("relay.toml"));

        let (mut config, origin) = Self::first_loadable(&paths);
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok((config, origin))
    }

    fn first_loadable(paths: &[PathBuf]) -> (Self, ConfigOrigin) {
        let mut rejected = Vec::new();

        for path in paths {
            if !path.exists() {
                continue;
            }
            match Self::load(path) {
                Ok(config) => return (config, ConfigOrigin::File(path.clone())),
                Err(e) => rejected.push((path.clone(), format!("{:#}", e))),
            }
        }

        (Self::default(), ConfigOrigin::Defaults { rejected })
    }

    fn apply_overrides<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = var("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a port number, got {:?}", port))?;
        }
        if let Some(path) = var("GOOGLE_APPLICATION_CREDENTIALS") {
            self.firebase.credentials_path = PathBuf::from(path);
        }
        if let Some(url) = var("FIREBASE_DATABASE_URL") {
            self.firebase.database_url = url;
        }
        if let Some(project_id) = var("FIREBASE_PROJECT_ID") {
            self.firebase.project_id = Some(project_id);
        }
        Ok(())
    }

    /// Log configuration summary
    pub fn log_summary(&self, origin: &ConfigOrigin) {
        match origin {
            ConfigOrigin::File(path) => info!("loaded config from {}", path.display()),
            ConfigOrigin::Defaults { rejected } => {
                for (path, reason) in rejected {
                    warn!("failed to load {}: {}", path.display(), reason);
                }
                warn!("no config file found - using defaults");
            }
        }

        info!(
            port = self.server.port,
            static_dir = %self.server.static_dir.display(),
            project_id = self.firebase.project_id.as_deref().unwrap_or("<from credentials>"),
            database_url = %self.firebase.database_url,
            auth = if self.firebase.static_token.is_some() { "static token" } else { "service account" },
            log_level = %self.logging.level,
            "relay configuration"
        );
    }
}
