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

//! Single-shot async transport for status probes.
//!
//! A [`Connection`] wraps either a TCP stream or a connected UDP socket. It
//! performs no retries and holds no background task: dropping it (including
//! when the owning future is cancelled by a timeout) releases the socket.

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use log::{debug, trace};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{lookup_host, TcpStream, UdpSocket};
use tokio::time::timeout;

/// Socket flavor a protocol variant runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Connection-oriented byte stream (TCP).
    Stream,
    /// Connected datagram socket (UDP).
    Datagram,
}

/// Errors raised by the transport layer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to resolve {address}: {source}")]
    Resolve {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("connecting to {address} timed out after {timeout:?}")]
    ConnectTimeout { address: String, timeout: Duration },

    #[error("no data received within {0:?}")]
    ReadTimeout(Duration),

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug)]
enum Socket {
    Stream(TcpStream),
    Datagram(UdpSocket),
}

/// An open connection to one probe target.
#[derive(Debug)]
pub struct Connection {
    socket: Socket,
    peer: SocketAddr,
    closed: bool,
}

/// Resolve `host` and connect to it within `connect_timeout`.
///
/// Every resolved address is tried in order; the error of the last attempt
/// is reported if none succeeds. For datagram transports "connecting" only
/// binds a local socket and fixes its peer, so an unreachable UDP host is
/// usually detected on the first receive instead.
pub async fn open(
    host: &str,
    port: u16,
    kind: TransportKind,
    connect_timeout: Duration,
) -> Result<Connection, TransportError> {
    let address = display_address(host, port);

    match timeout(connect_timeout, connect(host, port, kind, &address)).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::ConnectTimeout {
            address,
            timeout: connect_timeout,
        }),
    }
}

async fn connect(
    host: &str,
    port: u16,
    kind: TransportKind,
    address: &str,
) -> Result<Connection, TransportError> {
    let candidates: Vec<SocketAddr> = lookup_host((host, port))
        .await
        .map_err(|source| TransportError::Resolve {
            address: address.to_string(),
            source,
        })?
        .collect();

    if candidates.is_empty() {
        return Err(TransportError::Resolve {
            address: address.to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no addresses returned"),
        });
    }

    let mut last_error = None;
    for peer in candidates {
        trace!("Trying {} for {}", peer, address);
        let attempt = match kind {
            TransportKind::Stream => TcpStream::connect(peer).await.map(Socket::Stream),
            TransportKind::Datagram => connect_datagram(peer).await.map(Socket::Datagram),
        };

        match attempt {
            Ok(socket) => {
                debug!("Connected to {} ({:?})", peer, kind);
                return Ok(Connection {
                    socket,
                    peer,
                    closed: false,
                });
            }
            Err(e) => {
                debug!("Connection attempt to {} failed: {}", peer, e);
                last_error = Some(e);
            }
        }
    }

    Err(TransportError::Connect {
        address: address.to_string(),
        source: last_error.unwrap_or_else(|| io::Error::other("no usable address")),
    })
}

async fn connect_datagram(peer: SocketAddr) -> io::Result<UdpSocket> {
    let local: SocketAddr = if peer.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = UdpSocket::bind(local).await?;
    socket.connect(peer).await?;
    Ok(socket)
}

fn display_address(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

impl Connection {
    /// Address of the remote peer actually connected to.
    #[must_use]
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    #[must_use]
    pub fn kind(&self) -> TransportKind {
        match self.socket {
            Socket::Stream(_) => TransportKind::Stream,
            Socket::Datagram(_) => TransportKind::Datagram,
        }
    }

    /// Send `bytes` in full (one datagram for UDP).
    pub async fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::ConnectionClosed);
        }

        match &mut self.socket {
            Socket::Stream(stream) => {
                stream.write_all(bytes).await?;
                stream.flush().await?;
            }
            Socket::Datagram(socket) => {
                socket.send(bytes).await?;
            }
        }
        trace!("Sent {} bytes to {}", bytes.len(), self.peer);
        Ok(())
    }

    /// Receive at most `max_bytes`, waiting no longer than `read_timeout`.
    ///
    /// A stream read of zero bytes means the peer closed its side and is
    /// reported as [`TransportError::ConnectionClosed`]. For datagrams the
    /// whole datagram is returned, truncated to `max_bytes`.
    pub async fn receive_up_to(
        &mut self,
        max_bytes: usize,
        read_timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        if self.closed {
            return Err(TransportError::ConnectionClosed);
        }

        let mut buf = vec![0u8; max_bytes];
        let read = match &mut self.socket {
            Socket::Stream(stream) => timeout(read_timeout, stream.read(&mut buf)).await,
            Socket::Datagram(socket) => timeout(read_timeout, socket.recv(&mut buf)).await,
        };
        let received = read.map_err(|_| TransportError::ReadTimeout(read_timeout))??;

        if received == 0 && self.kind() == TransportKind::Stream && max_bytes > 0 {
            return Err(TransportError::ConnectionClosed);
        }

        buf.truncate(received);
        trace!("Received {} bytes from {}", received, self.peer);
        Ok(buf)
    }

    /// Close the connection. Calling this more than once is a no-op.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Socket::Stream(stream) = &mut self.socket {
            if let Err(e) = stream.shutdown().await {
                debug!("Shutdown of {} failed: {}", self.peer, e);
            }
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}
