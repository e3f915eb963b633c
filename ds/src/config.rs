//! digitsort configuration types and loading

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::order::SortOrder;

/// Main digitsort configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// What to sort and with how many ranks
    pub sort: SortConfig,

    /// How ranks talk to each other
    pub transport: TransportConfig,

    /// Where run files go
    pub output: OutputConfig,
}

impl Config {
    /// Validate configuration before use
    pub fn validate(&self) -> Result<()> {
        if self.sort.world_size < 2 {
            return Err(eyre::eyre!(
                "world-size must be at least 2 (one coordinator plus workers), got {}",
                self.sort.world_size
            ));
        }
        if self.transport.channel_buffer == 0 {
            return Err(eyre::eyre!("channel-buffer must be greater than 0"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .digitsort.yml
        let local_config = PathBuf::from(".digitsort.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/digitsort/digitsort.yml
        if let Some(user_config) = user_config_path() {
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    ///
    /// Errors are swallowed here; [`Config::load`] reports them once logging works.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => [Some(PathBuf::from(".digitsort.yml")), user_config_path()]
                .into_iter()
                .flatten()
                .collect(),
        };

        candidates
            .iter()
            .find(|path| path.exists())
            .and_then(|path| fs::read_to_string(path).ok())
            .and_then(|content| serde_yaml::from_str::<Config>(&content).ok())
            .and_then(|config| config.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("digitsort").join("digitsort.yml"))
}

/// Array size when neither the CLI nor a config file gives one
pub const DEFAULT_ARRAY_SIZE: usize = 100;

/// Sort parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SortConfig {
    /// Number of elements in the generated array
    #[serde(rename = "array-size")]
    pub array_size: usize,

    /// Ranks in the world, coordinator included
    #[serde(rename = "world-size")]
    pub world_size: usize,

    /// Bucket reassembly order
    pub order: SortOrder,

    /// Shuffle seed; random when unset
    pub seed: Option<u64>,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            array_size: DEFAULT_ARRAY_SIZE,
            world_size: 4,
            order: SortOrder::Descending,
            seed: None,
        }
    }
}

/// Which transport carries messages between ranks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Every rank is a tokio task in this process
    #[default]
    Local,
    /// Every worker rank is a child process connected over a Unix socket
    Socket,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Local => write!(f, "local"),
            TransportKind::Socket => write!(f, "socket"),
        }
    }
}

/// Transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub kind: TransportKind,

    /// Capacity of each rank's inbound message queue
    #[serde(rename = "channel-buffer")]
    pub channel_buffer: usize,

    /// How long the coordinator waits for worker processes to connect
    #[serde(rename = "connect-timeout-ms")]
    pub connect_timeout_ms: u64,

    /// Directory for the coordinator's socket (runtime dir when unset)
    #[serde(rename = "socket-dir")]
    pub socket_dir: Option<PathBuf>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::Local,
            channel_buffer: 1024,
            connect_timeout_ms: 10_000,
            socket_dir: None,
        }
    }
}

impl TransportConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving the array files
    pub dir: PathBuf,

    /// Write shuffled and sorted arrays to files
    #[serde(rename = "write-files")]
    pub write_files: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            write_files: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.sort.array_size, 100);
        assert_eq!(config.sort.world_size, 4);
        assert_eq!(config.sort.order, SortOrder::Descending);
        assert_eq!(config.transport.kind, TransportKind::Local);
        assert_eq!(config.transport.channel_buffer, 1024);
        assert!(config.output.write_files);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
log-level: debug

sort:
  array-size: 5000
  world-size: 6
  order: ascending
  seed: 17

transport:
  kind: socket
  channel-buffer: 64
  connect-timeout-ms: 2500

output:
  dir: /tmp/digitsort
  write-files: false
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.sort.array_size, 5000);
        assert_eq!(config.sort.world_size, 6);
        assert_eq!(config.sort.order, SortOrder::Ascending);
        assert_eq!(config.sort.seed, Some(17));
        assert_eq!(config.transport.kind, TransportKind::Socket);
        assert_eq!(config.transport.connect_timeout(), Duration::from_millis(2500));
        assert_eq!(config.output.dir, PathBuf::from("/tmp/digitsort"));
        assert!(!config.output.write_files);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
sort:
  world-size: 11
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.sort.world_size, 11);
        assert_eq!(config.sort.array_size, 100);
        assert_eq!(config.transport.kind, TransportKind::Local);
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_validate_rejects_lone_coordinator() {
        let mut config = Config::default();
        config.sort.world_size = 1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("at least 2"));
    }

    #[test]
    fn test_load_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("digitsort.yml");
        fs::write(&path, "log-level: warn\nsort:\n  array-size: 7\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.sort.array_size, 7);
        assert_eq!(Config::load_log_level(Some(&path)).as_deref(), Some("warn"));
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing.yml");
        assert!(Config::load(Some(&path)).is_err());
        assert!(Config::load_log_level(Some(&path)).is_none());
    }
}
