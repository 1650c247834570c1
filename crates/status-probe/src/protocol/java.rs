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

//! Java edition Server List Ping.
//!
//! Request (two packets, each prefixed by its VarInt length):
//! ```text
//! handshake: 0x00 <VarInt protocol> <String host> <u16 port> <VarInt 1>
//! status:    0x00
//! ```
//!
//! Response:
//! ```text
//! <VarInt length> 0x00 <VarInt json length> <json>
//! ```

use serde::Deserialize;
use serde_json::Value;

use super::{strip_formatting, Codec, DecodeError, Frame, StatusRecord};
use crate::target::ProbeTarget;
use crate::transport::TransportKind;

/// Protocol number sent in the handshake. Servers answer status requests
/// regardless of the value; 47 (1.8) is understood by every modern release.
const PROTOCOL_VERSION: i32 = 47;
const NEXT_STATE_STATUS: i32 = 1;
const STATUS_PACKET_ID: i32 = 0x00;
const MAX_VARINT_LEN: usize = 5;

/// Largest frame a server may send (3-byte VarInt length limit).
pub const MAX_FRAME_LEN: usize = 2_097_151;

/// Codec for the modern Java edition status ping.
#[derive(Debug, Default, Clone, Copy)]
pub struct JavaCodec;

impl JavaCodec {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    players: Option<Players>,
    version: Option<Version>,
    #[serde(default)]
    description: Value,
}

#[derive(Debug, Deserialize)]
struct Players {
    online: u32,
    max: u32,
}

#[derive(Debug, Deserialize)]
struct Version {
    name: String,
}

impl Codec for JavaCodec {
    fn transport(&self) -> TransportKind {
        TransportKind::Stream
    }

    fn encode_request(&self, target: &ProbeTarget) -> Vec<u8> {
        let mut handshake = Vec::with_capacity(target.host().len() + 16);
        write_varint(&mut handshake, 0x00);
        write_varint(&mut handshake, PROTOCOL_VERSION);
        write_string(&mut handshake, target.host());
        handshake.extend_from_slice(&target.port().to_be_bytes());
        write_varint(&mut handshake, NEXT_STATE_STATUS);

        let mut request = Vec::with_capacity(handshake.len() + MAX_VARINT_LEN + 2);
        write_varint(&mut request, len_as_varint(handshake.len()));
        request.extend_from_slice(&handshake);
        // status request: length 1, packet id 0
        request.extend_from_slice(&[0x01, 0x00]);
        request
    }

    fn frame(&self, buffered: &[u8]) -> Result<Frame, DecodeError> {
        let Some((length, header)) = read_varint(buffered)? else {
            return Ok(Frame::Incomplete);
        };
        let length = frame_length(length)?;

        let total = header + length;
        if buffered.len() >= total {
            Ok(Frame::Complete(total))
        } else {
            Ok(Frame::Incomplete)
        }
    }

    fn decode_response(&self, response: &[u8]) -> Result<StatusRecord, DecodeError> {
        if response.is_empty() {
            return Err(DecodeError::Empty);
        }

        let (length, header) = require_varint(response)?;
        let length = frame_length(length)?;
        let body = response
            .get(header..header + length)
            .ok_or(DecodeError::Truncated {
                expected: header + length,
                actual: response.len(),
            })?;

        let (packet_id, id_len) = require_varint(body)?;
        if packet_id != STATUS_PACKET_ID {
            return Err(DecodeError::UnexpectedPacket(packet_id));
        }

        let body = &body[id_len..];
        let (json_len, prefix) = require_varint(body)?;
        let json_len = usize::try_from(json_len).map_err(|_| DecodeError::InvalidValue {
            field: "json length",
            value: json_len.to_string(),
        })?;
        let json = body
            .get(prefix..prefix + json_len)
            .ok_or(DecodeError::Truncated {
                expected: prefix + json_len,
                actual: body.len(),
            })?;
        let json = std::str::from_utf8(json).map_err(|_| DecodeError::InvalidText("status JSON"))?;

        parse_status_json(json)
    }
}

fn parse_status_json(json: &str) -> Result<StatusRecord, DecodeError> {
    let status: StatusResponse =
        serde_json::from_str(json).map_err(|e| DecodeError::Json(e.to_string()))?;
    let players = status.players.ok_or(DecodeError::MissingField("players"))?;

    let mut motd = String::new();
    flatten_chat(&status.description, &mut motd);

    Ok(StatusRecord {
        server_online: true,
        player_count: players.online,
        max_players: players.max,
        motd: strip_formatting(&motd),
        version: status.version.map(|v| v.name),
    })
}

/// Flatten a chat component (string, `{text, extra}` object or array).
fn flatten_chat(component: &Value, out: &mut String) {
    match component {
        Value::String(text) => out.push_str(text),
        Value::Array(parts) => {
            for part in parts {
                flatten_chat(part, out);
            }
        }
        Value::Object(fields) => {
            if let Some(Value::String(text)) = fields.get("text") {
                out.push_str(text);
            }
            if let Some(extra) = fields.get("extra") {
                flatten_chat(extra, out);
            }
        }
        _ => {}
    }
}

fn frame_length(length: i32) -> Result<usize, DecodeError> {
    match usize::try_from(length) {
        Ok(0) => Err(DecodeError::Empty),
        Ok(len) if len > MAX_FRAME_LEN => Err(DecodeError::TooLarge {
            len,
            limit: MAX_FRAME_LEN,
        }),
        Ok(len) => Ok(len),
        Err(_) => Err(DecodeError::InvalidValue {
            field: "frame length",
            value: length.to_string(),
        }),
    }
}

fn len_as_varint(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

/// Append `value` as a protocol VarInt (7 bits per byte, little-endian groups).
pub(crate) fn write_varint(buf: &mut Vec<u8>, value: i32) {
    let mut remaining = u32::from_ne_bytes(value.to_ne_bytes());
    loop {
        let byte = (remaining & 0x7F) as u8;
        remaining >>= 7;
        if remaining == 0 {
            buf.push(byte);
            return;
        }
        buf.push(byte | 0x80);
    }
}

/// Read a VarInt from the start of `input`.
///
/// Returns `Ok(None)` when `input` ends mid-VarInt, otherwise the value and
/// the number of bytes consumed.
pub(crate) fn read_varint(input: &[u8]) -> Result<Option<(i32, usize)>, DecodeError> {
    let mut value: u32 = 0;
    for (i, byte) in input.iter().take(MAX_VARINT_LEN).enumerate() {
        value |= u32::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(Some((i32::from_ne_bytes(value.to_ne_bytes()), i + 1)));
        }
    }

    if input.len() >= MAX_VARINT_LEN {
        Err(DecodeError::VarIntTooLong)
    } else {
        Ok(None)
    }
}

fn require_varint(input: &[u8]) -> Result<(i32, usize), DecodeError> {
    read_varint(input)?.ok_or(DecodeError::Truncated {
        expected: input.len() + 1,
        actual: input.len(),
    })
}

fn write_string(buf: &mut Vec<u8>, value: &str) {
    write_varint(buf, len_as_varint(value.len()));
    buf.extend_from_slice(value.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::ProtocolVariant;
    use crate::testing::{java_status_frame, java_status_json};

    fn varint(value: i32) -> Vec<u8> {
        let mut buf = Vec::new();
        write_varint(&mut buf, value);
        buf
    }

    #[test]
    fn test_varint_encoding() {
        assert_eq!(varint(0), [0x00]);
        assert_eq!(varint(1), [0x01]);
        assert_eq!(varint(127), [0x7F]);
        assert_eq!(varint(128), [0x80, 0x01]);
        assert_eq!(varint(255), [0xFF, 0x01]);
        assert_eq!(varint(25565), [0xDD, 0xC7, 0x01]);
        assert_eq!(varint(2_147_483_647), [0xFF, 0xFF, 0xFF, 0xFF, 0x07]);
        assert_eq!(varint(-1), [0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
    }

    #[test]
    fn test_varint_decoding() {
        assert_eq!(read_varint(&[0xDD, 0xC7, 0x01, 0x42]), Ok(Some((25565, 3))));
        assert_eq!(read_varint(&[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]), Ok(Some((-1, 5))));
        assert_eq!(read_varint(&[0x80, 0x80]), Ok(None));
        assert_eq!(read_varint(&[]), Ok(None));
        assert_eq!(
            read_varint(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01]),
            Err(DecodeError::VarIntTooLong)
        );
    }

    #[test]
    fn test_encode_request() {
        let target = ProbeTarget::new("localhost", 25565, ProtocolVariant::Java).unwrap();
        let request = JavaCodec::new().encode_request(&target);

        let mut expected = vec![
            0x0F, // handshake length
            0x00, // packet id
            0x2F, // protocol 47
            0x09, // host length
        ];
        expected.extend_from_slice(b"localhost");
        expected.extend_from_slice(&[0x63, 0xDD]); // port 25565
        expected.push(0x01); // next state
        expected.extend_from_slice(&[0x01, 0x00]); // status request

        assert_eq!(request, expected);
    }

    #[test]
    fn test_decode_status() {
        let frame = java_status_frame(&java_status_json(7, 20));
        let record = JavaCodec::new().decode_response(&frame).unwrap();

        assert!(record.server_online);
        assert_eq!(record.player_count, 7);
        assert_eq!(record.max_players, 20);
        assert_eq!(record.motd, "A Minecraft Server");
        assert_eq!(record.version.as_deref(), Some("1.21.1"));
    }

    #[test]
    fn test_decode_chat_component_description() {
        let json = r#"{"players":{"max":10,"online":0},"description":{"text":"§6Hello ","extra":[{"text":"there"},"!"]}}"#;
        let record = JavaCodec::new()
            .decode_response(&java_status_frame(json))
            .unwrap();
        assert_eq!(record.motd, "Hello there!");
        assert_eq!(record.player_count, 0);
        assert_eq!(record.version, None);
    }

    #[test]
    fn test_decode_plain_string_description() {
        let json = r#"{"players":{"max":5,"online":1},"description":"Survival"}"#;
        let record = JavaCodec::new()
            .decode_response(&java_status_frame(json))
            .unwrap();
        assert_eq!(record.motd, "Survival");
    }

    #[test]
    fn test_decode_rejects_missing_players() {
        let json = r#"{"version":{"name":"1.20","protocol":763},"description":"x"}"#;
        assert_eq!(
            JavaCodec::new().decode_response(&java_status_frame(json)),
            Err(DecodeError::MissingField("players"))
        );
    }

    #[test]
    fn test_decode_rejects_negative_players() {
        let json = r#"{"players":{"max":20,"online":-4}}"#;
        assert!(matches!(
            JavaCodec::new().decode_response(&java_status_frame(json)),
            Err(DecodeError::Json(_))
        ));
    }

    #[test]
    fn test_decode_rejects_invalid_json() {
        assert!(matches!(
            JavaCodec::new().decode_response(&java_status_frame("{not json")),
            Err(DecodeError::Json(_))
        ));
    }

    #[test]
    fn test_decode_rejects_wrong_packet_id() {
        let frame = [0x02, 0x07, 0x00];
        assert_eq!(
            JavaCodec::new().decode_response(&frame),
            Err(DecodeError::UnexpectedPacket(7))
        );
    }

    #[test]
    fn test_decode_rejects_truncated() {
        let frame = java_status_frame(&java_status_json(3, 10));
        let truncated = &frame[..frame.len() - 5];
        assert!(matches!(
            JavaCodec::new().decode_response(truncated),
            Err(DecodeError::Truncated { .. })
        ));
        assert_eq!(JavaCodec::new().decode_response(&[]), Err(DecodeError::Empty));
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let mut body = vec![0x00, 0x02, 0xC3, 0x28];
        let mut frame = Vec::new();
        write_varint(&mut frame, i32::try_from(body.len()).unwrap());
        frame.append(&mut body);

        assert_eq!(
            JavaCodec::new().decode_response(&frame),
            Err(DecodeError::InvalidText("status JSON"))
        );
    }

    #[test]
    fn test_frame_detection() {
        let codec = JavaCodec::new();
        let frame = java_status_frame(&java_status_json(1, 2));

        assert_eq!(codec.frame(&[]), Ok(Frame::Incomplete));
        assert_eq!(codec.frame(&frame[..4]), Ok(Frame::Incomplete));
        assert_eq!(codec.frame(&frame), Ok(Frame::Complete(frame.len())));

        let mut trailing = frame.clone();
        trailing.extend_from_slice(b"junk");
        assert_eq!(codec.frame(&trailing), Ok(Frame::Complete(frame.len())));
    }

    #[test]
    fn test_frame_rejects_oversized_and_empty() {
        let codec = JavaCodec::new();
        assert!(matches!(
            codec.frame(&varint(i32::MAX)),
            Err(DecodeError::TooLarge { .. })
        ));
        assert!(matches!(
            codec.frame(&varint(-5)),
            Err(DecodeError::InvalidValue { .. })
        ));
        assert_eq!(codec.frame(&[0x00]), Err(DecodeError::Empty));
    }
}
