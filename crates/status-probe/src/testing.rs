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

//! Loopback fake servers shared by the unit tests.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};

use crate::protocol::bedrock::OFFLINE_MAGIC;
use crate::protocol::java::write_varint;

/// Port that had a listener a moment ago and now refuses connections.
pub(crate) async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

/// TCP server that answers every connection with `response`, then half-closes.
pub(crate) async fn tcp_responder(response: Vec<u8>) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let response = response.clone();
            tokio::spawn(async move {
                let mut request = [0u8; 512];
                if stream.read(&mut request).await.is_err() {
                    return;
                }
                let _ = stream.write_all(&response).await;
                let _ = stream.shutdown().await;
                drain(stream).await;
            });
        }
    });

    port
}

/// TCP server that answers with `prefix` and then stalls with the socket open.
pub(crate) async fn partial_tcp(prefix: Vec<u8>) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let prefix = prefix.clone();
            tokio::spawn(async move {
                let mut request = [0u8; 512];
                if stream.read(&mut request).await.is_err() {
                    return;
                }
                let _ = stream.write_all(&prefix).await;
                drain(stream).await;
            });
        }
    });

    port
}

/// TCP server that accepts connections and never writes anything.
pub(crate) async fn silent_tcp() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(drain(stream));
        }
    });

    port
}

/// UDP server that answers every datagram with `response`.
pub(crate) async fn udp_responder(response: Vec<u8>) -> u16 {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = socket.local_addr().unwrap().port();

    tokio::spawn(async move {
        let mut buf = [0u8; 1500];
        while let Ok((_, peer)) = socket.recv_from(&mut buf).await {
            let _ = socket.send_to(&response, peer).await;
        }
    });

    port
}

/// A complete Java status response frame carrying `json`.
pub(crate) fn java_status_frame(json: &str) -> Vec<u8> {
    let mut body = Vec::new();
    write_varint(&mut body, 0x00);
    write_varint(&mut body, i32::try_from(json.len()).unwrap());
    body.extend_from_slice(json.as_bytes());

    let mut frame = Vec::new();
    write_varint(&mut frame, i32::try_from(body.len()).unwrap());
    frame.extend_from_slice(&body);
    frame
}

/// Java status JSON reporting `online` of `max` players.
pub(crate) fn java_status_json(online: u32, max: u32) -> String {
    format!(
        r#"{{"version":{{"name":"1.21.1","protocol":767}},"players":{{"max":{max},"online":{online}}},"description":{{"text":"A Minecraft Server"}}}}"#
    )
}

/// A Bedrock unconnected pong carrying `status`.
pub(crate) fn bedrock_pong(status: &str) -> Vec<u8> {
    let mut packet = vec![0x1C];
    packet.extend_from_slice(&1_700_000_000_000_i64.to_be_bytes());
    packet.extend_from_slice(&0x1234_5678_i64.to_be_bytes());
    packet.extend_from_slice(&OFFLINE_MAGIC);
    packet.extend_from_slice(&u16::try_from(status.len()).unwrap().to_be_bytes());
    packet.extend_from_slice(status.as_bytes());
    packet
}

/// A legacy (1.4 - 1.6) kick packet carrying `text`.
pub(crate) fn legacy_kick(text: &str) -> Vec<u8> {
    let units: Vec<u16> = text.encode_utf16().collect();
    let mut packet = vec![0xFF];
    packet.extend_from_slice(&u16::try_from(units.len()).unwrap().to_be_bytes());
    for unit in units {
        packet.extend_from_slice(&unit.to_be_bytes());
    }
    packet
}

async fn drain(mut stream: TcpStream) {
    let mut buf = [0u8; 512];
    while let Ok(n) = stream.read(&mut buf).await {
        if n == 0 {
            break;
        }
    }
}
