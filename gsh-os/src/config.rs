//! Configuration for a [`Filesystem`](crate::filesystem::Filesystem).
//!
//! Loaded from TOML, e.g.
//!
//! ```toml
//! worker-threads = 4
//! max-handles = 256
//! pool = "rayon"
//! ```
//!
//! and then overridden by the `GSH_WORKER_THREADS` and `GSH_MAX_HANDLES` environment variables.

use std::path::Path;

use serde::Deserialize;
use tokio::sync::Semaphore;

use crate::platform::{FilesystemPlatform, Platform};

/// Environment variable that overrides [`FilesystemConfig::worker_threads`].
pub const WORKER_THREADS_ENV: &str = "GSH_WORKER_THREADS";
/// Environment variable that overrides [`FilesystemConfig::max_handles`].
pub const MAX_HANDLES_ENV: &str = "GSH_MAX_HANDLES";

/// Used when the platform can't tell us how many handles we may open.
const FALLBACK_MAX_HANDLES: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct FilesystemConfig {
    /// Number of blocking filesystem operations that run at once.
    ///
    /// With [`PoolKind::Rayon`] this is the size of the pool. With [`PoolKind::Tokio`] the
    /// operations share the runtime's blocking threads, and at most this many run at a time.
    #[serde(default = "FilesystemConfig::default_worker_threads")]
    pub worker_threads: usize,
    /// Maximum number of handles open at once, defaults to half of what the platform allows.
    #[serde(default)]
    pub max_handles: Option<usize>,
    /// Which pool runs the blocking operations.
    #[serde(default)]
    pub pool: PoolKind,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PoolKind {
    /// A dedicated `rayon` thread pool.
    #[default]
    Rayon,
    /// `spawn_blocking` on the current `tokio` runtime.
    Tokio,
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        FilesystemConfig {
            worker_threads: FilesystemConfig::default_worker_threads(),
            max_handles: None,
            pool: PoolKind::default(),
        }
    }
}

impl FilesystemConfig {
    fn default_worker_threads() -> usize {
        std::thread::available_parallelism()
            .map(|threads| threads.get().min(8))
            .unwrap_or(4)
    }

    pub fn from_toml(s: &str) -> Result<Self, crate::Error> {
        toml::from_str(s).map_err(|err| crate::Error::InvalidConfig(err.to_string()))
    }

    /// Load a config from the TOML file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, crate::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|err| {
            crate::Error::InvalidConfig(format!("reading {}: {err}", path.display()))
        })?;
        let config = Self::from_toml(&contents)?;
        tracing::debug!(?path, ?config, "loaded config");
        Ok(config)
    }

    /// Apply overrides from [`WORKER_THREADS_ENV`] and [`MAX_HANDLES_ENV`].
    pub fn with_env_overrides(mut self) -> Result<Self, crate::Error> {
        if let Some(threads) =
            gsh_ore::env::parse(WORKER_THREADS_ENV).map_err(crate::Error::InvalidConfig)?
        {
            self.worker_threads = threads;
        }
        if let Some(handles) =
            gsh_ore::env::parse(MAX_HANDLES_ENV).map_err(crate::Error::InvalidConfig)?
        {
            self.max_handles = Some(handles);
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.worker_threads == 0 {
            return Err(crate::Error::InvalidConfig(
                "worker-threads must be at least 1".to_string(),
            ));
        }
        if self.worker_threads > Semaphore::MAX_PERMITS {
            return Err(crate::Error::InvalidConfig(format!(
                "worker-threads must be at most {}",
                Semaphore::MAX_PERMITS
            )));
        }
        match self.max_handles {
            Some(0) => {
                return Err(crate::Error::InvalidConfig(
                    "max-handles must be at least 1".to_string(),
                ))
            }
            Some(max) if max > Semaphore::MAX_PERMITS => {
                return Err(crate::Error::InvalidConfig(format!(
                    "max-handles must be at most {}",
                    Semaphore::MAX_PERMITS
                )))
            }
            _ => (),
        }
        Ok(())
    }

    /// [`FilesystemConfig::max_handles`] if set, otherwise half of what the platform allows so
    /// the rest of the process has room too.
    pub fn resolved_max_handles(&self) -> usize {
        if let Some(max_handles) = self.max_handles {
            return max_handles;
        }
        match FilesystemPlatform::file_handle_max() {
            Ok(max) => (max / 2).clamp(1, Semaphore::MAX_PERMITS),
            Err(err) => {
                tracing::warn!(%err, "failed to get file handle limit, using fallback");
                FALLBACK_MAX_HANDLES
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use gsh_ore::assert_err;

    use super::*;

    #[test]
    fn parse_full_config() {
        let config = FilesystemConfig::from_toml(
            r#"
            worker-threads = 3
            max-handles = 64
            pool = "tokio"
            "#,
        )
        .unwrap();
        assert_eq!(
            config,
            FilesystemConfig {
                worker_threads: 3,
                max_handles: Some(64),
                pool: PoolKind::Tokio,
            }
        );
        assert_eq!(config.resolved_max_handles(), 64);
    }

    #[test]
    fn parse_defaults() {
        let config = FilesystemConfig::from_toml("").unwrap();
        assert_eq!(config, FilesystemConfig::default());
        assert!(config.worker_threads >= 1);
        assert!(config.resolved_max_handles() >= 1);
    }

    #[test]
    fn reject_unknown_fields() {
        assert_err!(
            FilesystemConfig::from_toml("threads = 2"),
            crate::Error::InvalidConfig(_)
        );
        assert_err!(
            FilesystemConfig::from_toml(r#"pool = "threads""#),
            crate::Error::InvalidConfig(_)
        );
    }

    #[test]
    fn validate_limits() {
        let config = FilesystemConfig {
            worker_threads: 0,
            ..Default::default()
        };
        assert_err!(config.validate(), crate::Error::InvalidConfig(_));

        let config = FilesystemConfig {
            max_handles: Some(0),
            ..Default::default()
        };
        assert_err!(config.validate(), crate::Error::InvalidConfig(_));
    }

    #[test]
    fn load_from_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("gsh.toml");
        std::fs::write(&path, "max-handles = 9\n").unwrap();

        let config = FilesystemConfig::load(&path).unwrap();
        assert_eq!(config.max_handles, Some(9));

        assert_err!(
            FilesystemConfig::load(temp.path().join("missing.toml")),
            crate::Error::InvalidConfig(_)
        );
    }

    #[test]
    fn env_overrides() {
        std::env::set_var(WORKER_THREADS_ENV, "2");
        std::env::set_var(MAX_HANDLES_ENV, "17");
        let config = FilesystemConfig::default().with_env_overrides();
        std::env::remove_var(WORKER_THREADS_ENV);
        std::env::remove_var(MAX_HANDLES_ENV);

        let config = config.unwrap();
        assert_eq!(config.worker_threads, 2);
        assert_eq!(config.max_handles, Some(17));
    }
}
