//! # Orbitlink Configuration
//!
//! Settings shared by every Orbitlink peer: receive loop cadence, outbound
//! compression, socket addresses and protocol limits.
//!
//! ## Sources
//!
//! Layered lowest to highest priority:
//!
//! 1. Built-in defaults ([`NetworkSettings::default`])
//! 2. An optional TOML file
//! 3. `ORBITLINK__*` environment variables, `__` separating nested keys
//!
//! ## Usage
//!
//! ```rust
//! use orbitlink_config::NetworkSettings;
//!
//! let settings = NetworkSettings::load(None).unwrap();
//! assert!(settings.receive_interval().as_millis() > 0);
//! ```

pub mod settings;

pub use settings::{load_settings, NetworkSettings, ProtocolSettings, ENV_PREFIX};
