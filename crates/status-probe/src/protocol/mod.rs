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

//! Handshake codecs for the server list status protocols.
//!
//! This module provides a trait-based abstraction so the prober never sees
//! wire formats. Each [`ProtocolVariant`] maps to one [`Codec`]:
//!
//! - [`JavaCodec`]: modern Server List Ping, VarInt length-prefixed frames
//!   carrying a JSON document.
//! - [`BedrockCodec`]: RakNet unconnected ping/pong with a `;` delimited
//!   status string.
//! - [`LegacyCodec`]: the 1.4 - 1.6 `0xFE 0x01` ping answered with a UTF-16
//!   `\0` delimited kick packet.

pub(crate) mod bedrock;
pub(crate) mod java;
pub(crate) mod legacy;

pub use bedrock::BedrockCodec;
pub use java::JavaCodec;
pub use legacy::LegacyCodec;

use serde::Serialize;
use thiserror::Error;

use crate::target::{ProbeTarget, ProtocolVariant};
use crate::transport::TransportKind;

/// Errors that can occur while decoding a status response.
///
/// Every variant means "bytes arrived but are not a valid status record".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("empty response")]
    Empty,

    #[error("truncated response: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("unexpected packet id {0:#04x}")]
    UnexpectedPacket(i32),

    #[error("VarInt is longer than 5 bytes")]
    VarIntTooLong,

    #[error("response frame of {len} bytes exceeds the {limit} byte limit")]
    TooLarge { len: usize, limit: usize },

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid value for field '{field}': {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("invalid text encoding in {0}")]
    InvalidText(&'static str),

    #[error("invalid status JSON: {0}")]
    Json(String),
}

/// Structured status decoded from one response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusRecord {
    /// Whether the server reported itself as accepting status queries.
    pub server_online: bool,
    /// Connected players.
    pub player_count: u32,
    /// Player slots, best-effort.
    pub max_players: u32,
    /// Message of the day with formatting codes removed.
    pub motd: String,
    /// Server version string, when the variant reports one.
    pub version: Option<String>,
}

/// How much of a response the prober has buffered so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// The first `n` buffered bytes form a complete response.
    Complete(usize),
    /// More bytes are needed.
    Incomplete,
}

/// Trait for status handshake codecs.
///
/// Implement this trait to add a protocol variant; the prober drives any
/// implementation through the same connect / send / read / decode cycle.
pub trait Codec: Send + Sync {
    /// Transport the request is sent over.
    fn transport(&self) -> TransportKind;

    /// Encode the probe request for `target`.
    fn encode_request(&self, target: &ProbeTarget) -> Vec<u8>;

    /// Inspect buffered bytes and report whether a full response is present.
    ///
    /// Returns an error as soon as the prefix is known to be invalid, so the
    /// prober does not wait for bytes that can never form a response.
    fn frame(&self, buffered: &[u8]) -> Result<Frame, DecodeError>;

    /// Decode a complete response.
    fn decode_response(&self, response: &[u8]) -> Result<StatusRecord, DecodeError>;
}

/// Codec for a protocol variant.
#[must_use]
pub fn codec_for(variant: ProtocolVariant) -> Box<dyn Codec> {
    match variant {
        ProtocolVariant::Java => Box::new(JavaCodec::new()),
        ProtocolVariant::Bedrock => Box::new(BedrockCodec::new()),
        ProtocolVariant::Legacy => Box::new(LegacyCodec::new()),
    }
}

/// Remove `§x` formatting codes and surrounding whitespace.
#[must_use]
pub fn strip_formatting(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '§' {
            chars.next();
        } else {
            out.push(c);
        }
    }
    out.trim().to_string()
}

/// Parse a numeric player field.
pub(crate) fn parse_count(field: &'static str, raw: &str) -> Result<u32, DecodeError> {
    raw.trim().parse::<u32>().map_err(|_| DecodeError::InvalidValue {
        field,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_formatting() {
        assert_eq!(strip_formatting("§aHello §lWorld§r "), "Hello World");
        assert_eq!(strip_formatting("plain"), "plain");
        assert_eq!(strip_formatting("trailing§"), "trailing");
    }

    #[test]
    fn test_codec_for_transport() {
        assert_eq!(
            codec_for(ProtocolVariant::Java).transport(),
            TransportKind::Stream
        );
        assert_eq!(
            codec_for(ProtocolVariant::Bedrock).transport(),
            TransportKind::Datagram
        );
        assert_eq!(
            codec_for(ProtocolVariant::Legacy).transport(),
            TransportKind::Stream
        );
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("players", " 12 "), Ok(12));
        assert_eq!(
            parse_count("players", "-3"),
            Err(DecodeError::InvalidValue {
                field: "players",
                value: "-3".to_string()
            })
        );
    }
}
