use std::path::{Path, PathBuf};
use std::time::Duration;
use serde::Deserialize;
use anyhow::{bail, Context, Result};
use shared::types::AggregationMode;
use crate::cli::Cli;

/// Loaded when `--config` is not given and the file exists
pub const DEFAULT_CONFIG_PATH: &str = "/etc/gatewatch/gatewatchd.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub mode: AggregationMode,
    #[serde(default)]
    pub capture: CaptureConfig,
    #[serde(default)]
    pub window: WindowConfig,
}

/// Where capture lines come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Spawn the capture command and read its stdout
    #[default]
    Tcpdump,
    /// Read lines from our own stdin
    Stdin,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    #[serde(default)]
    pub source: SourceKind,
    /// Passed through to the capture command untouched
    #[serde(default = "default_interface")]
    pub interface: String,
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default)]
    pub sudo: bool,
    /// Capture filter; when unset the mode picks one
    #[serde(default)]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    /// Destinations listed per source in pair-sum mode
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_interface() -> String {
    "any".to_string()
}

fn default_command() -> String {
    "tcpdump".to_string()
}

fn default_interval() -> u64 {
    30
}

fn default_top_n() -> usize {
    10
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::default(),
            interface: default_interface(),
            command: default_command(),
            sudo: false,
            filter: None,
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            top_n: default_top_n(),
        }
    }
}

impl WindowConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load an explicit path, else the default path if present, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::load(&default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Command-line flags win over file values
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(mode) = cli.mode {
            self.mode = mode;
        }
        if let Some(interface) = &cli.interface {
            self.capture.interface = interface.clone();
        }
        if let Some(interval) = cli.interval {
            self.window.interval_secs = interval;
        }
        if let Some(top) = cli.top {
            self.window.top_n = top;
        }
        if cli.stdin {
            self.capture.source = SourceKind::Stdin;
        }
        if cli.sudo {
            self.capture.sudo = true;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.window.interval_secs == 0 {
            bail!("window.interval_secs must be > 0");
        }
        if self.window.top_n == 0 {
            bail!("window.top_n must be > 0");
        }
        if self.capture.source == SourceKind::Tcpdump {
            if self.capture.interface.trim().is_empty() {
                bail!("capture.interface must not be empty");
            }
            if self.capture.command.trim().is_empty() {
                bail!("capture.command must not be empty");
            }
        }
        Ok(())
    }

    /// Capture filter in effect: explicit, or the mode's default
    pub fn capture_filter(&self) -> &str {
        self.capture
            .filter
            .as_deref()
            .unwrap_or_else(|| self.mode.capture_filter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_defaults_from_empty_file() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config.mode, AggregationMode::UniqueSet);
        assert_eq!(config.capture.source, SourceKind::Tcpdump);
        assert_eq!(config.capture.interface, "any");
        assert_eq!(config.window.interval(), Duration::from_secs(30));
        assert_eq!(config.window.top_n, 10);
        assert_eq!(config.capture_filter(), "udp port 53");
        config.validate().unwrap();
    }

    #[test]
    fn test_full_file() {
        let config: Config = toml::from_str(
            r#"
            mode = "pair-sum"

            [capture]
            source = "stdin"
            interface = "wlan0"
            sudo = true

            [window]
            interval_secs = 60
            top_n = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.mode, AggregationMode::PairSum);
        assert_eq!(config.capture.source, SourceKind::Stdin);
        assert_eq!(config.capture.interface, "wlan0");
        assert!(config.capture.sudo);
        assert_eq!(config.window.interval_secs, 60);
        assert_eq!(config.window.top_n, 5);
        assert_eq!(config.capture_filter(), "ip");
    }

    #[test]
    fn test_explicit_filter_wins() {
        let config: Config = toml::from_str(
            r#"
            [capture]
            filter = "udp port 53 and host 10.0.0.5"
            "#,
        )
        .unwrap();
        assert_eq!(config.capture_filter(), "udp port 53 and host 10.0.0.5");
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(toml::from_str::<Config>(r#"mode = "histogram""#).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_interval_and_top_n() {
        let mut config = Config::default();
        config.window.interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.window.top_n = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_interface_only_needed_for_capture() {
        let mut config = Config::default();
        config.capture.interface = " ".to_string();
        assert!(config.validate().is_err());

        config.capture.source = SourceKind::Stdin;
        config.validate().unwrap();
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut config = Config::default();
        let cli = Cli::parse_from([
            "gatewatchd", "--mode", "count", "--interface", "eth1", "--interval", "5", "--top", "3", "--stdin",
        ]);
        config.apply_overrides(&cli);

        assert_eq!(config.mode, AggregationMode::Count);
        assert_eq!(config.capture.interface, "eth1");
        assert_eq!(config.window.interval_secs, 5);
        assert_eq!(config.window.top_n, 3);
        assert_eq!(config.capture.source, SourceKind::Stdin);
        assert!(!config.capture.sudo);
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let err = Config::load("/nonexistent/gatewatchd.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/gatewatchd.toml"));
    }
}
