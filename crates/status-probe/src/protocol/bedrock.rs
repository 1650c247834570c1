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

//! Bedrock edition RakNet unconnected ping.
//!
//! Request:
//! ```text
//! 0x01 <i64 time> <16 byte magic> <i64 client guid>
//! ```
//!
//! Response:
//! ```text
//! 0x1C <i64 time> <i64 server guid> <16 byte magic> <u16 len> <status string>
//! ```
//!
//! The status string is `;` delimited:
//! `MCPE;motd;protocol;version;players;max;server id;sub motd;game mode;...`

use chrono::Utc;

use super::{parse_count, strip_formatting, Codec, DecodeError, Frame, StatusRecord};
use crate::target::ProbeTarget;
use crate::transport::TransportKind;

const UNCONNECTED_PING: u8 = 0x01;
const UNCONNECTED_PONG: u8 = 0x1C;

/// RakNet offline message identifier.
pub const OFFLINE_MAGIC: [u8; 16] = [
    0x00, 0xFF, 0xFF, 0x00, 0xFE, 0xFE, 0xFE, 0xFE, 0xFD, 0xFD, 0xFD, 0xFD, 0x12, 0x34, 0x56, 0x78,
];

// id + time + guid + magic + string length
const PONG_HEADER_LEN: usize = 1 + 8 + 8 + 16 + 2;
const MIN_STATUS_FIELDS: usize = 6;

/// Codec for the Bedrock edition unconnected ping.
#[derive(Debug, Clone, Copy)]
pub struct BedrockCodec {
    client_guid: i64,
}

impl BedrockCodec {
    /// Create a codec with a random client GUID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_guid(rand::random())
    }

    #[must_use]
    pub fn with_guid(client_guid: i64) -> Self {
        Self { client_guid }
    }
}

impl Default for BedrockCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for BedrockCodec {
    fn transport(&self) -> TransportKind {
        TransportKind::Datagram
    }

    fn encode_request(&self, _target: &ProbeTarget) -> Vec<u8> {
        let mut request = Vec::with_capacity(1 + 8 + 16 + 8);
        request.push(UNCONNECTED_PING);
        request.extend_from_slice(&Utc::now().timestamp_millis().to_be_bytes());
        request.extend_from_slice(&OFFLINE_MAGIC);
        request.extend_from_slice(&self.client_guid.to_be_bytes());
        request
    }

    fn frame(&self, buffered: &[u8]) -> Result<Frame, DecodeError> {
        // One datagram is one response, whatever its size.
        Ok(Frame::Complete(buffered.len()))
    }

    fn decode_response(&self, response: &[u8]) -> Result<StatusRecord, DecodeError> {
        let Some(&id) = response.first() else {
            return Err(DecodeError::Empty);
        };
        if id != UNCONNECTED_PONG {
            return Err(DecodeError::UnexpectedPacket(i32::from(id)));
        }
        if response.len() < PONG_HEADER_LEN {
            return Err(DecodeError::Truncated {
                expected: PONG_HEADER_LEN,
                actual: response.len(),
            });
        }
        if response[17..33] != OFFLINE_MAGIC {
            return Err(DecodeError::InvalidValue {
                field: "magic",
                value: format!("{:02x?}", &response[17..33]),
            });
        }

        let len = usize::from(u16::from_be_bytes([response[33], response[34]]));
        let payload = response
            .get(PONG_HEADER_LEN..PONG_HEADER_LEN + len)
            .ok_or(DecodeError::Truncated {
                expected: PONG_HEADER_LEN + len,
                actual: response.len(),
            })?;
        let status =
            std::str::from_utf8(payload).map_err(|_| DecodeError::InvalidText("status string"))?;

        parse_status_string(status)
    }
}

fn parse_status_string(status: &str) -> Result<StatusRecord, DecodeError> {
    let fields: Vec<&str> = status.split(';').collect();
    if fields.len() < MIN_STATUS_FIELDS {
        return Err(DecodeError::MissingField("player counts"));
    }

    let edition = fields[0];
    if edition != "MCPE" && edition != "MCEE" {
        return Err(DecodeError::InvalidValue {
            field: "edition",
            value: edition.to_string(),
        });
    }

    let player_count = parse_count("players", fields[4])?;
    let max_players = parse_count("max players", fields[5])?;
    let version = Some(fields[3].trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    Ok(StatusRecord {
        server_online: true,
        player_count,
        max_players,
        motd: strip_formatting(fields[1]),
        version,
    })
}
