use super::types::*;
use crate::data_capture::recorder::DEFAULT_CAPTURE_INTERVAL;
use crate::error_handling::types::ConfigError;
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration structure that defines all runtime parameters.
///
/// The configuration is read once at startup: first from an optional TOML file, then
/// overridden by command-line flags or their environment variables (see [`CliArgs`]). Every
/// field has a default so an empty file, or no file at all, is a valid configuration.
///
/// # Examples
///
/// ```
/// use capserve::configuration::config::Config;
///
/// let config = Config::from_toml_str("port = 8080\nquality = 50").unwrap();
/// assert_eq!(config.port, 8080);
/// assert_eq!(config.capture_interval_secs, 180);
/// ```
///
/// # Fields Overview
///
/// - `bind_address`: IP address the artifact server listens on
/// - `port`: TCP port of the artifact server, never silently changed
/// - `content_dir`: flat directory holding the captured artifacts
/// - `capture_interval_secs`: delay between two capture ticks
/// - `quality`: image quality factor, 0 (smallest) to 100 (lossless)
/// - `purge_on_exit`: delete every artifact when the service shuts down
/// - `screen`: frame geometry requested from the screen
#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub bind_address: IpAddr,
    pub port: u16,
    pub content_dir: PathBuf,
    pub capture_interval_secs: u64,
    pub quality: u8,
    pub purge_on_exit: bool,
    pub screen: ScreenConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3333,
            content_dir: PathBuf::from("./captures"),
            capture_interval_secs: DEFAULT_CAPTURE_INTERVAL.as_secs(),
            quality: 30,
            purge_on_exit: true,
            screen: ScreenConfig::default(),
        }
    }
}

/// Command line of the `capserve` binary.
///
/// Every flag overrides the matching field of the configuration file and can also be given
/// through the environment variable named next to it.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "capserve")]
#[command(version)]
#[command(about = "Periodically captures the screen and serves the captures over HTTP")]
pub struct CliArgs {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "CAPSERVE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address the artifact server binds to
    #[arg(long, env = "CAPSERVE_BIND_ADDRESS")]
    pub bind_address: Option<IpAddr>,

    /// Port of the artifact server
    #[arg(long, env = "CAPSERVE_PORT")]
    pub port: Option<u16>,

    /// Directory the captures are written to and served from
    #[arg(long, env = "CAPSERVE_CONTENT_DIR")]
    pub content_dir: Option<PathBuf>,

    /// Seconds between two captures
    #[arg(long, env = "CAPSERVE_INTERVAL_SECS")]
    pub interval_secs: Option<u64>,

    /// Image quality factor, 0 to 100
    #[arg(long, env = "CAPSERVE_QUALITY")]
    pub quality: Option<u8>,

    /// Keep the captured files when the service exits
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub keep_artifacts: bool,
}

impl Config {
    /// Parses a configuration from TOML text. Missing keys take their default value.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::TomlError(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Builds the runtime configuration from the command line.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if the merged result does
    /// not pass [`Config::validate`].
    pub fn load(args: &CliArgs) -> Result<Self, ConfigError> {
        let mut config = match &args.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(args);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, args: &CliArgs) {
        if let Some(bind_address) = args.bind_address {
            self.bind_address = bind_address;
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(content_dir) = &args.content_dir {
            self.content_dir = content_dir.clone();
        }
        if let Some(interval) = args.interval_secs {
            self.capture_interval_secs = interval;
        }
        if let Some(quality) = args.quality {
            self.quality = quality;
        }
        if args.keep_artifacts {
            self.purge_on_exit = false;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.quality > 100 {
            return Err(ConfigError::NotInRange(format!(
                "quality must be between 0 and 100, got {}",
                self.quality
            )));
        }
        if self.capture_interval_secs == 0 {
            return Err(ConfigError::NotInRange(
                "capture_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.screen.width == 0 || self.screen.height == 0 {
            return Err(ConfigError::NotInRange(format!(
                "screen geometry {}x{} is empty",
                self.screen.width, self.screen.height
            )));
        }
        if self.content_dir.exists() && !self.content_dir.is_dir() {
            return Err(ConfigError::NotADirectory(format!(
                "{} exists and is not a directory",
                self.content_dir.display()
            )));
        }
        Ok(())
    }

    pub fn capture_interval(&self) -> Duration {
        Duration::from_secs(self.capture_interval_secs)
    }
}
