//! Network Settings
//!
//! Loads [`NetworkSettings`] from an optional TOML file overlaid by
//! environment variables, then validates the result.

use anyhow::{ensure, Context, Result};
use config_crate::{Config, Environment, File, FileFormat, Map};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable prefix; nested keys use `__`
/// (`ORBITLINK__PROTOCOL__MAX_DECOMPRESSED_SIZE`)
pub const ENV_PREFIX: &str = "ORBITLINK";

const ENV_SEPARATOR: &str = "__";

/// Largest UDP payload over IPv4
const MAX_UDP_PAYLOAD: usize = 65_507;

/// `[kind][category][sequence u32]` prepended to every datagram
const TRANSPORT_FRAME_SIZE: usize = 6;

/// Settings for one peer's transport, dispatcher and sender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// Dispatcher sleep when the transport has nothing pending
    pub receive_interval_ms: u64,
    /// Ask the pipeline to compress outbound bodies (kept only when smaller)
    pub compress_outbound: bool,
    /// Local socket address for UDP transports
    pub bind_address: SocketAddr,
    /// Connected peer; `None` for a listening server
    pub remote_address: Option<SocketAddr>,
    pub max_datagram_size: usize,
    /// Sleep between empty polls of a subsystem queue
    pub consumer_poll_ms: u64,
    pub protocol: ProtocolSettings,
}

/// Codec limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolSettings {
    /// Upper bound on a decompressed body; larger claims are corrupt
    pub max_decompressed_size: usize,
    /// Instances created per shape when the pool is built
    pub pool_prewarm_per_shape: usize,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            receive_interval_ms: 1,
            compress_outbound: true,
            bind_address: SocketAddr::from(([0, 0, 0, 0], 0)),
            remote_address: None,
            max_datagram_size: MAX_UDP_PAYLOAD,
            consumer_poll_ms: 5,
            protocol: ProtocolSettings::default(),
        }
    }
}

impl Default for ProtocolSettings {
    fn default() -> Self {
        Self {
            max_decompressed_size: 64 * 1024 * 1024,
            pool_prewarm_per_shape: 0,
        }
    }
}

impl NetworkSettings {
    /// Load defaults, then `path` (if given and present), then the
    /// process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// As [`load`](Self::load) but reading environment overrides from
    /// `vars` instead of the process environment
    pub fn load_with_env(path: Option<&Path>, vars: Option<Map<String, String>>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            info!("Loading network settings from {}", path.display());
            builder = builder.add_source(
                File::from(path)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator(ENV_SEPARATOR)
                .try_parsing(true)
                .source(vars),
        );

        let settings: Self = builder
            .build()
            .context("Failed to build network settings")?
            .try_deserialize()
            .context("Failed to deserialize network settings")?;

        settings.validate()?;
        debug!(?settings, "Network settings loaded");
        Ok(settings)
    }

    /// Parse settings from a TOML string, without environment overrides
    pub fn from_toml(text: &str) -> Result<Self> {
        let settings: Self = toml::from_str(text).context("Failed to parse network settings")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.receive_interval_ms > 0,
            "receive_interval_ms must be greater than zero"
        );
        ensure!(
            self.consumer_poll_ms > 0,
            "consumer_poll_ms must be greater than zero"
        );
        ensure!(
            self.max_datagram_size > TRANSPORT_FRAME_SIZE
                && self.max_datagram_size <= MAX_UDP_PAYLOAD,
            "max_datagram_size must be between {} and {MAX_UDP_PAYLOAD}, got {}",
            TRANSPORT_FRAME_SIZE + 1,
            self.max_datagram_size
        );
        ensure!(
            self.protocol.max_decompressed_size > 0,
            "protocol.max_decompressed_size must be greater than zero"
        );
        Ok(())
    }

    pub fn receive_interval(&self) -> Duration {
        Duration::from_millis(self.receive_interval_ms)
    }

    pub fn consumer_poll(&self) -> Duration {
        Duration::from_millis(self.consumer_poll_ms)
    }
}

/// Convenience wrapper around [`NetworkSettings::load`]
pub fn load_settings(path: Option<&Path>) -> Result<NetworkSettings> {
    NetworkSettings::load(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> Option<Map<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn toml_file(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_without_sources() {
        let settings = NetworkSettings::load_with_env(None, env(&[])).unwrap();
        assert_eq!(settings, NetworkSettings::default());
        assert_eq!(settings.receive_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = toml_file(
            r#"
            receive_interval_ms = 10
            compress_outbound = false
            remote_address = "127.0.0.1:6702"

            [protocol]
            pool_prewarm_per_shape = 4
            "#,
        );

        let settings = NetworkSettings::load_with_env(Some(file.path()), env(&[])).unwrap();
        assert_eq!(settings.receive_interval_ms, 10);
        assert!(!settings.compress_outbound);
        assert_eq!(settings.remote_address, Some("127.0.0.1:6702".parse().unwrap()));
        assert_eq!(settings.protocol.pool_prewarm_per_shape, 4);
        // Untouched keys keep their defaults
        assert_eq!(settings.consumer_poll_ms, 5);
        assert_eq!(settings.protocol.max_decompressed_size, 64 * 1024 * 1024);
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = toml_file("receive_interval_ms = 10\n");
        let settings = NetworkSettings::load_with_env(
            Some(file.path()),
            env(&[
                ("ORBITLINK__RECEIVE_INTERVAL_MS", "25"),
                ("ORBITLINK__PROTOCOL__MAX_DECOMPRESSED_SIZE", "1024"),
            ]),
        )
        .unwrap();
        assert_eq!(settings.receive_interval_ms, 25);
        assert_eq!(settings.protocol.max_decompressed_size, 1024);
    }

    #[test]
    fn test_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let settings = NetworkSettings::load_with_env(Some(&path), env(&[])).unwrap();
        assert_eq!(settings, NetworkSettings::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = NetworkSettings::from_toml("receive_interval_ms = 0").unwrap_err();
        assert!(err.to_string().contains("receive_interval_ms"));

        let err = NetworkSettings::from_toml("max_datagram_size = 70000").unwrap_err();
        assert!(err.to_string().contains("max_datagram_size"));

        let result = NetworkSettings::load_with_env(
            None,
            env(&[("ORBITLINK__CONSUMER_POLL_MS", "0")]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_datagram_size_must_leave_room_past_frame() {
        for size in [1, 6] {
            let err = NetworkSettings::from_toml(&format!("max_datagram_size = {size}")).unwrap_err();
            assert!(err.to_string().contains("between 7 and"), "{err}");
        }
        let settings = NetworkSettings::from_toml("max_datagram_size = 7").unwrap();
        assert_eq!(settings.max_datagram_size, 7);
    }

    #[test]
    fn test_malformed_address_has_context() {
        let err = NetworkSettings::from_toml(r#"bind_address = "not-an-address""#).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse network settings"));
    }
}
