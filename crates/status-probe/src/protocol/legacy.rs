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

//! Legacy Java server list ping (1.4 - 1.6, still answered by newer servers).
//!
//! Request is `0xFE 0x01`. The server replies with a kick packet:
//! ```text
//! 0xFF <u16 length in UTF-16 code units> <UTF-16BE text>
//! ```
//!
//! 1.4+ servers send `§1\0<protocol>\0<version>\0<motd>\0<players>\0<max>`;
//! older (beta 1.8 - 1.3) servers send `<motd>§<players>§<max>`.

use super::{parse_count, strip_formatting, Codec, DecodeError, Frame, StatusRecord};
use crate::target::ProbeTarget;
use crate::transport::TransportKind;

const PING_REQUEST: [u8; 2] = [0xFE, 0x01];
const KICK_PACKET: u8 = 0xFF;
const HEADER_LEN: usize = 3;
const MODERN_PREFIX: &str = "§1\0";

/// Codec for the legacy `0xFE 0x01` ping.
#[derive(Debug, Default, Clone, Copy)]
pub struct LegacyCodec;

impl LegacyCodec {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Codec for LegacyCodec {
    fn transport(&self) -> TransportKind {
        TransportKind::Stream
    }

    fn encode_request(&self, _target: &ProbeTarget) -> Vec<u8> {
        PING_REQUEST.to_vec()
    }

    fn frame(&self, buffered: &[u8]) -> Result<Frame, DecodeError> {
        match buffered.first() {
            None => return Ok(Frame::Incomplete),
            Some(&id) if id != KICK_PACKET => {
                return Err(DecodeError::UnexpectedPacket(i32::from(id)))
            }
            Some(_) => {}
        }
        if buffered.len() < HEADER_LEN {
            return Ok(Frame::Incomplete);
        }

        let total = HEADER_LEN + text_len(buffered);
        if buffered.len() >= total {
            Ok(Frame::Complete(total))
        } else {
            Ok(Frame::Incomplete)
        }
    }

    fn decode_response(&self, response: &[u8]) -> Result<StatusRecord, DecodeError> {
        let Some(&id) = response.first() else {
            return Err(DecodeError::Empty);
        };
        if id != KICK_PACKET {
            return Err(DecodeError::UnexpectedPacket(i32::from(id)));
        }
        if response.len() < HEADER_LEN {
            return Err(DecodeError::Truncated {
                expected: HEADER_LEN,
                actual: response.len(),
            });
        }

        let expected = HEADER_LEN + text_len(response);
        let text = response
            .get(HEADER_LEN..expected)
            .ok_or(DecodeError::Truncated {
                expected,
                actual: response.len(),
            })?;

        let units = text
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
        let text: String = char::decode_utf16(units)
            .collect::<Result<_, _>>()
            .map_err(|_| DecodeError::InvalidText("kick message"))?;

        parse_kick_text(&text)
    }
}

fn text_len(buffered: &[u8]) -> usize {
    usize::from(u16::from_be_bytes([buffered[1], buffered[2]])) * 2
}

fn parse_kick_text(text: &str) -> Result<StatusRecord, DecodeError> {
    if let Some(rest) = text.strip_prefix(MODERN_PREFIX) {
        let fields: Vec<&str> = rest.split('\0').collect();
        let [_protocol, version, motd, players, max, ..] = fields.as_slice() else {
            return Err(DecodeError::MissingField("player counts"));
        };

        return Ok(StatusRecord {
            server_online: true,
            player_count: parse_count("players", players)?,
            max_players: parse_count("max players", max)?,
            motd: strip_formatting(motd),
            version: Some((*version).to_string()),
        });
    }

    // Pre-1.4 servers: the motd may itself not contain '§'.
    let mut fields = text.rsplitn(3, '§');
    let (Some(max), Some(players), Some(motd)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(DecodeError::MissingField("player counts"));
    };

    Ok(StatusRecord {
        server_online: true,
        player_count: parse_count("players", players)?,
        max_players: parse_count("max players", max)?,
        motd: strip_formatting(motd),
        version: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::ProtocolVariant;
    use crate::testing::legacy_kick;

    #[test]
    fn test_encode_request() {
        let target = ProbeTarget::new("localhost", 25565, ProtocolVariant::Legacy).unwrap();
        assert_eq!(LegacyCodec::new().encode_request(&target), vec![0xFE, 0x01]);
    }

    #[test]
    fn test_decode_modern_kick() {
        let packet = legacy_kick("§1\x0074\x001.6.4\x00A §aLegacy§r Server\x005\x0020");
        let record = LegacyCodec::new().decode_response(&packet).unwrap();

        assert!(record.server_online);
        assert_eq!(record.player_count, 5);
        assert_eq!(record.max_players, 20);
        assert_eq!(record.motd, "A Legacy Server");
        assert_eq!(record.version.as_deref(), Some("1.6.4"));
    }

    #[test]
    fn test_decode_beta_kick() {
        let packet = legacy_kick("Old Server§2§16");
        let record = LegacyCodec::new().decode_response(&packet).unwrap();

        assert_eq!(record.player_count, 2);
        assert_eq!(record.max_players, 16);
        assert_eq!(record.motd, "Old Server");
        assert_eq!(record.version, None);
    }

    #[test]
    fn test_decode_rejects_missing_fields() {
        assert_eq!(
            LegacyCodec::new().decode_response(&legacy_kick("§1\x0074\x001.6.4")),
            Err(DecodeError::MissingField("player counts"))
        );
        assert_eq!(
            LegacyCodec::new().decode_response(&legacy_kick("just a kick")),
            Err(DecodeError::MissingField("player counts"))
        );
    }

    #[test]
    fn test_decode_rejects_truncated() {
        let packet = legacy_kick("Old Server§2§16");
        assert!(matches!(
            LegacyCodec::new().decode_response(&packet[..packet.len() - 1]),
            Err(DecodeError::Truncated { .. })
        ));
        assert!(matches!(
            LegacyCodec::new().decode_response(&[0xFF, 0x00]),
            Err(DecodeError::Truncated { .. })
        ));
        assert_eq!(LegacyCodec::new().decode_response(&[]), Err(DecodeError::Empty));
    }

    #[test]
    fn test_decode_rejects_lone_surrogate() {
        let packet = [0xFF, 0x00, 0x01, 0xD8, 0x00];
        assert_eq!(
            LegacyCodec::new().decode_response(&packet),
            Err(DecodeError::InvalidText("kick message"))
        );
    }

    #[test]
    fn test_frame_detection() {
        let codec = LegacyCodec::new();
        let packet = legacy_kick("Old Server§2§16");

        assert_eq!(codec.frame(&[]), Ok(Frame::Incomplete));
        assert_eq!(codec.frame(&packet[..2]), Ok(Frame::Incomplete));
        assert_eq!(codec.frame(&packet[..10]), Ok(Frame::Incomplete));
        assert_eq!(codec.frame(&packet), Ok(Frame::Complete(packet.len())));
        assert_eq!(
            codec.frame(b"HTTP/1.1 400"),
            Err(DecodeError::UnexpectedPacket(i32::from(b'H')))
        );
    }
}
