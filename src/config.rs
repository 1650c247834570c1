// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Application configuration management.
//!
//! Settings live in a TOML file managed by `confy`. Command-line flags and
//! environment variables are layered on top with [`AppConfig::apply`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use status_probe::{ProbeTarget, ProtocolVariant};

use crate::error::AppError;

const APP_NAME: &str = "cubewatch";
const CONFIG_NAME: &str = "config";

/// Known-good public server used to tell a dead server from a dead network.
pub const DEFAULT_REFERENCE_HOST: &str = "best.fadecloud.com";
pub const DEFAULT_REFERENCE_PORT: u16 = 19132;

/// One Minecraft server to probe.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Display name used in messages
    #[serde(default)]
    pub name: String,

    /// Host name, `host:port` or `[v6]:port`
    #[serde(default)]
    pub address: String,

    /// Port override; wins over any port in `address`
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub edition: ProtocolVariant,
}

impl ServerConfig {
    pub fn new(name: impl Into<String>, address: impl Into<String>, edition: ProtocolVariant) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            port: None,
            edition,
        }
    }

    /// The public Bedrock server used as a network reference.
    pub fn default_reference() -> Self {
        Self {
            port: Some(DEFAULT_REFERENCE_PORT),
            ..Self::new("Test server", DEFAULT_REFERENCE_HOST, ProtocolVariant::Bedrock)
        }
    }

    /// Resolve this entry into a validated probe target.
    pub fn target(&self) -> Result<ProbeTarget, AppError> {
        if self.address.trim().is_empty() {
            return Err(AppError::NoServer);
        }

        let parsed = ProbeTarget::parse(&self.address, self.edition)?;
        match self.port {
            Some(port) => Ok(ProbeTarget::new(parsed.host(), port, self.edition)?),
            None => Ok(parsed),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("Your server", "", ProtocolVariant::Java)
    }
}

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// The server being monitored
    #[serde(default)]
    pub primary: ServerConfig,

    /// Server probed alongside the primary by `test`
    #[serde(default = "ServerConfig::default_reference")]
    pub reference: ServerConfig,

    /// Overall budget for one probe, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Budget for establishing the connection, in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Delay between probes in `watch` mode, in seconds
    #[serde(default = "default_watch_interval_secs")]
    pub watch_interval_secs: u64,

    /// Append log records to this file instead of stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

// Default value functions for serde
fn default_timeout_secs() -> u64 {
    5
}

fn default_connect_timeout_secs() -> u64 {
    3
}

fn default_watch_interval_secs() -> u64 {
    60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            primary: ServerConfig::default(),
            reference: ServerConfig::default_reference(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            watch_interval_secs: default_watch_interval_secs(),
            log_file: None,
        }
    }
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub server: Option<String>,
    pub port: Option<u16>,
    pub edition: Option<ProtocolVariant>,
    pub timeout_secs: Option<u64>,
    pub log_file: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from `path`, or from the default location.
    ///
    /// A missing file is created with default values.
    pub fn load(path: Option<&Path>) -> Result<Self, confy::ConfyError> {
        match path {
            Some(path) => confy::load_path(path),
            None => confy::load(APP_NAME, CONFIG_NAME),
        }
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    /// Layer command-line and environment values over the file.
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(server) = overrides.server {
            // A port written into the address outranks the file's port field.
            if has_explicit_port(&server) {
                self.primary.port = None;
            }
            self.primary.address = server;
        }
        if let Some(port) = overrides.port {
            self.primary.port = Some(port);
        }
        if let Some(edition) = overrides.edition {
            self.primary.edition = edition;
        }
        if let Some(timeout) = overrides.timeout_secs {
            self.timeout_secs = timeout;
        }
        if overrides.log_file.is_some() {
            self.log_file = overrides.log_file;
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Watch interval, never shorter than one second.
    #[must_use]
    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch_interval_secs.max(1))
    }
}

/// Whether `address` carries its own port (`host:port` or `[v6]:port`).
fn has_explicit_port(address: &str) -> bool {
    let address = address.trim();
    match address.strip_prefix('[') {
        Some(rest) => rest.split_once(']').is_some_and(|(_, tail)| tail.starts_with(':')),
        None => address.matches(':').count() == 1,
    }
}
