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

//! Probe targets and protocol variants.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::transport::TransportKind;

/// Longest host name accepted in a handshake (DNS limit).
pub const MAX_HOST_LEN: usize = 253;

/// Errors raised while building a [`ProbeTarget`].
///
/// These are contract violations, not probe outcomes: they surface at
/// construction time and never reach the prober.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TargetError {
    #[error("host must not be empty")]
    EmptyHost,

    #[error("host name is {len} bytes, longer than the {max} byte limit")]
    HostTooLong { len: usize, max: usize },

    #[error("invalid port '{0}': expected a number in 1-65535")]
    InvalidPort(String),

    #[error("unknown protocol variant '{0}' (expected java, bedrock or legacy)")]
    UnknownVariant(String),
}

/// Wire-format flavor of the status query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVariant {
    /// Modern Java edition Server List Ping (TCP, VarInt framed JSON).
    #[default]
    Java,
    /// Bedrock edition RakNet unconnected ping (UDP, `;` delimited text).
    Bedrock,
    /// Java 1.4 - 1.6 legacy ping (TCP, UTF-16 `\0` delimited text).
    Legacy,
}

impl ProtocolVariant {
    /// Port the game server listens on when none is configured.
    #[must_use]
    pub fn default_port(self) -> u16 {
        match self {
            Self::Java | Self::Legacy => 25565,
            Self::Bedrock => 19132,
        }
    }

    /// Transport the variant runs over.
    #[must_use]
    pub fn transport(self) -> TransportKind {
        match self {
            Self::Java | Self::Legacy => TransportKind::Stream,
            Self::Bedrock => TransportKind::Datagram,
        }
    }
}

impl fmt::Display for ProtocolVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Java => "java",
            Self::Bedrock => "bedrock",
            Self::Legacy => "legacy",
        };
        f.write_str(name)
    }
}

impl FromStr for ProtocolVariant {
    type Err = TargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "java" | "je" => Ok(Self::Java),
            "bedrock" | "be" | "pe" => Ok(Self::Bedrock),
            "legacy" => Ok(Self::Legacy),
            other => Err(TargetError::UnknownVariant(other.to_string())),
        }
    }
}

/// A validated host, port and protocol variant to probe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ProbeTarget {
    host: String,
    port: u16,
    variant: ProtocolVariant,
}

impl ProbeTarget {
    /// Build a target, rejecting empty or oversized hosts and port 0.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        variant: ProtocolVariant,
    ) -> Result<Self, TargetError> {
        let host = host.into().trim().to_string();
        if host.is_empty() {
            return Err(TargetError::EmptyHost);
        }
        if host.len() > MAX_HOST_LEN {
            return Err(TargetError::HostTooLong {
                len: host.len(),
                max: MAX_HOST_LEN,
            });
        }
        if port == 0 {
            return Err(TargetError::InvalidPort(port.to_string()));
        }

        Ok(Self {
            host,
            port,
            variant,
        })
    }

    /// Build a target on the variant's default port.
    pub fn with_default_port(
        host: impl Into<String>,
        variant: ProtocolVariant,
    ) -> Result<Self, TargetError> {
        Self::new(host, variant.default_port(), variant)
    }

    /// Parse `host`, `host:port`, `[v6]` or `[v6]:port`.
    ///
    /// A bare IPv6 literal without brackets is treated as a host with the
    /// default port.
    pub fn parse(address: &str, variant: ProtocolVariant) -> Result<Self, TargetError> {
        let address = address.trim();

        if let Some(rest) = address.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| TargetError::InvalidPort(address.to_string()))?;
            return match tail.strip_prefix(':') {
                Some(port) => Self::new(host, parse_port(port)?, variant),
                None if tail.is_empty() => Self::with_default_port(host, variant),
                None => Err(TargetError::InvalidPort(tail.to_string())),
            };
        }

        match address.split_once(':') {
            Some((host, port)) if !port.contains(':') => {
                Self::new(host, parse_port(port)?, variant)
            }
            _ => Self::with_default_port(address, variant),
        }
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    #[must_use]
    pub fn variant(&self) -> ProtocolVariant {
        self.variant
    }

    /// `host:port`, bracketing IPv6 literals.
    #[must_use]
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl fmt::Display for ProbeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.address(), self.variant)
    }
}

fn parse_port(raw: &str) -> Result<u16, TargetError> {
    match raw.trim().parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(TargetError::InvalidPort(raw.to_string())),
    }
}
