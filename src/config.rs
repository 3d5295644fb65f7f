//! Relay configuration and its live-reloadable store.
//!
//! The file is YAML:
//!
//! ```yaml
//! default: https://chat.example/hook/default
//! branches: [main, dev]
//! groups:
//!   - name: backend
//!     repositories: [api, worker]
//!     destination: https://chat.example/hook/backend
//! ```
//!
//! Readers take an `Arc<Snapshot>` from [`ConfigStore::current`]; a reload
//! builds and validates a whole new snapshot before swapping it in, so a
//! request never sees a half-applied file.

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::Deserialize;
use std::{
    path::{Path, PathBuf},
    sync::{Arc, PoisonError, RwLock},
    time::{Duration, SystemTime},
};
use tracing::{debug, error, info, warn};

use crate::resolver::{Destination, DestinationTable};

pub const DEFAULT_PATH: &str = "config.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("destination for {owner} is not a valid http(s) URL: {url}")]
    InvalidDestination { owner: String, url: String },
    #[error("group {0} lists no repositories")]
    EmptyGroup(String),
    #[error("at least one branch must be watched")]
    NoBranches,
    #[error("configuration was not loaded from a file")]
    NoSource,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub destinations: DestinationTable,
    /// Branches whose pushes and pull requests are forwarded.
    #[serde(default = "default_branches")]
    pub branches: Vec<String>,
}

fn default_branches() -> Vec<String> {
    vec!["main".to_string(), "dev".to_string()]
}

impl Config {
    pub fn from_yaml(source: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&source)
    }

    pub fn watches_branch(&self, branch: &str) -> bool {
        self.branches.iter().any(|watched| watched == branch)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        check_destination("default", &self.destinations.default)?;
        for group in &self.destinations.groups {
            if group.repositories.is_empty() {
                return Err(ConfigError::EmptyGroup(group.name.clone()));
            }
            check_destination(&format!("group {}", group.name), &group.destination)?;
        }
        if self.branches.is_empty() {
            return Err(ConfigError::NoBranches);
        }

        let mut seen = std::collections::HashSet::new();
        for group in &self.destinations.groups {
            for repository in &group.repositories {
                if !seen.insert(repository.as_str()) {
                    warn!(
                        "Repository {} is listed in more than one group, the first one wins",
                        repository
                    );
                }
            }
        }
        Ok(())
    }
}

fn check_destination(owner: &str, destination: &Destination) -> Result<(), ConfigError> {
    match Url::parse(destination.as_str()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(ConfigError::InvalidDestination {
            owner: owner.to_string(),
            url: destination.to_string(),
        }),
    }
}

/// A configuration as it was at one load.
#[derive(Debug)]
pub struct Snapshot {
    pub config: Config,
    pub loaded_at: DateTime<Utc>,
    /// Modification time of the file when it was read, `None` without a file.
    pub modified: Option<SystemTime>,
}

impl Snapshot {
    fn new(config: Config, modified: Option<SystemTime>) -> Self {
        Self {
            config,
            loaded_at: Utc::now(),
            modified,
        }
    }

    /// The mtime is taken before reading, so a write racing the read is
    /// seen as a newer file on the next check.
    fn read(path: &Path) -> Result<Self, ConfigError> {
        let modified = modified_time(path);
        let config = Config::from_file(path)?;
        Ok(Self::new(config, modified))
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[derive(Debug)]
pub struct ConfigStore {
    path: Option<PathBuf>,
    current: RwLock<Arc<Snapshot>>,
}

impl ConfigStore {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let snapshot = Snapshot::read(&path)?;
        Ok(Self {
            path: Some(path),
            current: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// A store with a fixed configuration; [`reload`](Self::reload) fails on it.
    pub fn from_config(config: Config) -> Self {
        Self {
            path: None,
            current: RwLock::new(Arc::new(Snapshot::new(config, None))),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn current(&self) -> Arc<Snapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Re-reads the file. On error the previous snapshot stays current.
    pub fn reload(&self) -> Result<Arc<Snapshot>, ConfigError> {
        let path = self.path.as_deref().ok_or(ConfigError::NoSource)?;
        let snapshot = Arc::new(Snapshot::read(path)?);
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = snapshot.clone();
        info!(
            "Reloaded configuration from {} ({} groups)",
            path.display(),
            snapshot.config.destinations.groups.len()
        );
        Ok(snapshot)
    }

    /// The file's modification time, if it differs from the current snapshot's.
    fn is_stale(&self) -> Option<SystemTime> {
        let modified = modified_time(self.path.as_deref()?)?;
        (Some(modified) != self.current().modified).then_some(modified)
    }
}

/// Reloads the store whenever the process receives SIGHUP.
#[cfg(unix)]
pub fn spawn_reload_on_hangup(store: Arc<ConfigStore>) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(hangup) => hangup,
        Err(err) => {
            warn!("Cannot listen for SIGHUP, reload on signal disabled: {}", err);
            return;
        }
    };
    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            info!("Received SIGHUP, reloading configuration");
            if let Err(err) = store.reload() {
                error!("Failed to reload configuration, keeping the previous one: {}", err);
            }
        }
    });
}

#[cfg(not(unix))]
pub fn spawn_reload_on_hangup(_store: Arc<ConfigStore>) {}

/// Polls the file's modification time and reloads when it differs from the
/// current snapshot's. A file that fails to load is retried on every tick,
/// but the failure is only logged once per modification time.
pub fn spawn_watch(store: Arc<ConfigStore>, interval: Duration) {
    if store.path().is_none() {
        return;
    }
    tokio::spawn(async move {
        let mut failed_at = None;
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(modified) = store.is_stale() else {
                continue;
            };
            match store.reload() {
                Ok(_) => failed_at = None,
                Err(err) if failed_at == Some(modified) => {
                    debug!("Configuration still invalid: {}", err);
                }
                Err(err) => {
                    error!("Failed to reload configuration, keeping the previous one: {}", err);
                    failed_at = Some(modified);
                }
            }
        }
    });
}
