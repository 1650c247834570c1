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

//! Single status probes.
//!
//! [`StatusProber::probe`] runs one connect / handshake / read / decode cycle
//! under an overall deadline and folds every failure into the returned
//! [`ProbeResult`]. A down server is an ordinary outcome, not an error.

use std::fmt;
use std::future::Future;
use std::io;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;
use tokio::time::{timeout_at, Instant};

use crate::protocol::{codec_for, Codec, DecodeError, Frame, StatusRecord};
use crate::target::ProbeTarget;
use crate::transport::{self, Connection, TransportError};

const READ_CHUNK: usize = 16 * 1024;
// Deadline used when the requested timeout does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Why a probe did not produce a status record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Host unreachable, connection refused or DNS failure.
    Connect,
    /// No complete response within the time budget.
    Timeout,
    /// The peer closed the connection before sending anything.
    ConnectionClosed,
    /// Bytes arrived but do not form a valid status response.
    MalformedResponse,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Connect => "connection failed",
            Self::Timeout => "timed out",
            Self::ConnectionClosed => "connection closed",
            Self::MalformedResponse => "malformed response",
        };
        f.write_str(text)
    }
}

/// Outcome of one probe.
///
/// Built once per probe and never mutated. The player count is only exposed
/// when the target is online.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    target: ProbeTarget,
    online: bool,
    status: Option<StatusRecord>,
    latency: Duration,
    error: Option<ErrorKind>,
    error_detail: Option<String>,
    checked_at: DateTime<Utc>,
}

impl ProbeResult {
    /// Result for a target that answered with a status record.
    #[must_use]
    pub fn from_record(target: ProbeTarget, record: StatusRecord, latency: Duration) -> Self {
        Self {
            target,
            online: record.server_online,
            status: Some(record),
            latency,
            error: None,
            error_detail: None,
            checked_at: Utc::now(),
        }
    }

    /// Result for a probe that failed with `kind`.
    #[must_use]
    pub fn failure(
        target: ProbeTarget,
        kind: ErrorKind,
        detail: impl Into<String>,
        latency: Duration,
    ) -> Self {
        Self {
            target,
            online: false,
            status: None,
            latency,
            error: Some(kind),
            error_detail: Some(detail.into()),
            checked_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn target(&self) -> &ProbeTarget {
        &self.target
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Connected players; `None` unless the target is online.
    #[must_use]
    pub fn player_count(&self) -> Option<u32> {
        self.online_status().map(|s| s.player_count)
    }

    #[must_use]
    pub fn max_players(&self) -> Option<u32> {
        self.online_status().map(|s| s.max_players)
    }

    #[must_use]
    pub fn motd(&self) -> Option<&str> {
        self.status.as_ref().map(|s| s.motd.as_str())
    }

    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| s.version.as_deref())
    }

    /// Time from the start of the probe to its outcome.
    #[must_use]
    pub fn latency(&self) -> Duration {
        self.latency
    }

    #[must_use]
    pub fn error(&self) -> Option<ErrorKind> {
        self.error
    }

    /// Human-readable cause of the failure, if any.
    #[must_use]
    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }

    #[must_use]
    pub fn checked_at(&self) -> DateTime<Utc> {
        self.checked_at
    }

    fn online_status(&self) -> Option<&StatusRecord> {
        self.status.as_ref().filter(|_| self.online)
    }
}

// The status record is only written for online targets, so an offline
// result never carries a player count.
impl Serialize for ProbeResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ProbeResult", 7)?;
        state.serialize_field("target", &self.target)?;
        state.serialize_field("online", &self.online)?;
        match self.online_status() {
            Some(status) => state.serialize_field("status", status)?,
            None => state.skip_field("status")?,
        }
        state.serialize_field("latency_ms", &self.latency.as_millis())?;
        state.serialize_field("error", &self.error)?;
        state.serialize_field("error_detail", &self.error_detail)?;
        state.serialize_field("checked_at", &self.checked_at)?;
        state.end()
    }
}

/// Internal failure of one probe, before it is folded into a result.
#[derive(Debug, Error)]
enum ProbeError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("malformed response: {0}")]
    Decode(#[from] DecodeError),

    #[error("no complete response within {0:?}")]
    Deadline(Duration),
}

impl ProbeError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(err) => transport_kind(err),
            Self::Decode(_) => ErrorKind::MalformedResponse,
            Self::Deadline(_) => ErrorKind::Timeout,
        }
    }
}

fn transport_kind(err: &TransportError) -> ErrorKind {
    match err {
        TransportError::Resolve { .. } | TransportError::Connect { .. } => ErrorKind::Connect,
        TransportError::ConnectTimeout { .. } | TransportError::ReadTimeout(_) => {
            ErrorKind::Timeout
        }
        TransportError::ConnectionClosed => ErrorKind::ConnectionClosed,
        TransportError::Io(e) => match e.kind() {
            // ICMP port unreachable on a connected UDP socket
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::HostUnreachable
            | io::ErrorKind::NetworkUnreachable => ErrorKind::Connect,
            _ => ErrorKind::ConnectionClosed,
        },
    }
}

/// Something that can probe a target. Implemented by [`StatusProber`];
/// the comparator is generic over it.
pub trait Probe: Send + Sync {
    fn probe(
        &self,
        target: &ProbeTarget,
        overall_timeout: Duration,
    ) -> impl Future<Output = ProbeResult> + Send;
}

/// Tuning for a [`StatusProber`].
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Upper bound for resolving and connecting. The overall timeout still
    /// applies when it is shorter.
    pub connect_timeout: Duration,
    /// Largest response the prober buffers before giving up.
    pub max_response_bytes: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            max_response_bytes: crate::protocol::java::MAX_FRAME_LEN + 8,
        }
    }
}

/// Runs status probes. Holds no connection state between calls.
#[derive(Debug, Clone, Default)]
pub struct StatusProber {
    config: ProbeConfig,
}

impl StatusProber {
    #[must_use]
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Probe `target` once with the codec for its protocol variant.
    pub async fn probe(&self, target: &ProbeTarget, overall_timeout: Duration) -> ProbeResult {
        let codec = codec_for(target.variant());
        self.probe_with(codec.as_ref(), target, overall_timeout).await
    }

    /// Probe `target` once with a caller-supplied codec.
    ///
    /// Never fails: every error is reported through the result. Returns no
    /// later than `overall_timeout` plus scheduling slack; on expiry the
    /// in-flight I/O is dropped, which closes the socket.
    pub async fn probe_with(
        &self,
        codec: &dyn Codec,
        target: &ProbeTarget,
        overall_timeout: Duration,
    ) -> ProbeResult {
        let started = Instant::now();
        let deadline = started
            .checked_add(overall_timeout)
            .unwrap_or_else(|| started + FAR_FUTURE);

        let outcome = match timeout_at(deadline, self.exchange(codec, target, deadline)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProbeError::Deadline(overall_timeout)),
        };
        let latency = started.elapsed();

        match outcome {
            Ok(record) => {
                debug!(
                    "{} answered in {:?}: online={} players={}/{}",
                    target, latency, record.server_online, record.player_count, record.max_players
                );
                if !record.server_online {
                    info!("{} reports itself offline", target);
                }
                ProbeResult::from_record(target.clone(), record, latency)
            }
            Err(err) => {
                let kind = err.kind();
                warn!("Probe of {} failed after {:?}: {}", target, latency, err);
                ProbeResult::failure(target.clone(), kind, err.to_string(), latency)
            }
        }
    }

    async fn exchange(
        &self,
        codec: &dyn Codec,
        target: &ProbeTarget,
        deadline: Instant,
    ) -> Result<StatusRecord, ProbeError> {
        let connect_budget = self
            .config
            .connect_timeout
            .min(deadline.saturating_duration_since(Instant::now()));
        let mut connection =
            transport::open(target.host(), target.port(), codec.transport(), connect_budget)
                .await?;

        let outcome = self
            .converse(&mut connection, codec, target, deadline)
            .await;
        connection.close().await;
        outcome
    }

    async fn converse(
        &self,
        connection: &mut Connection,
        codec: &dyn Codec,
        target: &ProbeTarget,
        deadline: Instant,
    ) -> Result<StatusRecord, ProbeError> {
        connection.send(&codec.encode_request(target)).await?;

        let mut response = Vec::new();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TransportError::ReadTimeout(remaining).into());
            }

            let room = self.config.max_response_bytes.saturating_sub(response.len());
            if room == 0 {
                return Err(DecodeError::TooLarge {
                    len: response.len(),
                    limit: self.config.max_response_bytes,
                }
                .into());
            }

            match connection.receive_up_to(room.min(READ_CHUNK), remaining).await {
                Ok(chunk) => response.extend_from_slice(&chunk),
                // Peer hung up mid-frame: what we have is a truncated response.
                Err(TransportError::ConnectionClosed) if !response.is_empty() => {
                    return Ok(codec.decode_response(&response)?);
                }
                Err(e) => return Err(e.into()),
            }

            if let Frame::Complete(len) = codec.frame(&response)? {
                return Ok(codec.decode_response(&response[..len])?);
            }
        }
    }
}

impl Probe for StatusProber {
    async fn probe(&self, target: &ProbeTarget, overall_timeout: Duration) -> ProbeResult {
        StatusProber::probe(self, target, overall_timeout).await
    }
}

/// Probe `target` once with default settings.
pub async fn probe(target: &ProbeTarget, overall_timeout: Duration) -> ProbeResult {
    StatusProber::default().probe(target, overall_timeout).await
}
