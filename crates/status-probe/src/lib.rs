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

//! Status-probe client for Minecraft servers.
//!
//! This library answers one question per call: is a server reachable, and if
//! so how many players are online? It is split into layers that can be used
//! independently:
//!
//! - **Transport layer**: single-shot TCP or UDP connection with a connect
//!   timeout and bounded reads
//! - **Protocol layer**: handshake codecs (Java Server List Ping, Bedrock
//!   RakNet ping, legacy `0xFE` ping)
//! - **Prober**: one probe under an overall deadline, every failure folded
//!   into a [`ProbeResult`]
//! - **Comparator**: concurrent probes of a monitored host and a reference
//!   host, classified into a [`Classification`]
//!
//! # Quick Start
//!
//! ```no_run
//! use status_probe::{probe, ProbeTarget, ProtocolVariant};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let target = ProbeTarget::parse("mc.example.net", ProtocolVariant::Java)
//!         .expect("valid target");
//!     let result = probe(&target, Duration::from_secs(5)).await;
//!
//!     match result.player_count() {
//!         Some(count) => println!("{count} players online"),
//!         None => println!("offline: {:?}", result.error()),
//!     }
//! }
//! ```
//!
//! # Cross-checking a failure
//!
//! ```no_run
//! use status_probe::{compare, Classification, ProbeTarget, ProtocolVariant};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), status_probe::TargetError> {
//! let primary = ProbeTarget::parse("mc.example.net", ProtocolVariant::Java)?;
//! let reference = ProbeTarget::parse("play.example.org", ProtocolVariant::Bedrock)?;
//!
//! let verdict = compare(&primary, &reference, Duration::from_secs(5)).await;
//! if verdict.classification() == Classification::NetworkSideFault {
//!     println!("check your internet connection");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Protocol Layer Only
//!
//! ```
//! use status_probe::protocol::{Codec, JavaCodec};
//! use status_probe::{ProbeTarget, ProtocolVariant};
//!
//! let target = ProbeTarget::new("localhost", 25565, ProtocolVariant::Java).unwrap();
//! let request = JavaCodec::new().encode_request(&target);
//! assert_eq!(request[1], 0x00); // handshake packet id
//! ```

pub mod comparator;
pub mod prober;
pub mod protocol;
pub mod transport;

mod target;
#[cfg(test)]
mod testing;

pub use comparator::{compare, Classification, Comparator, ComparatorVerdict};
pub use prober::{probe, ErrorKind, Probe, ProbeConfig, ProbeResult, StatusProber};
pub use protocol::{codec_for, Codec, DecodeError, Frame, StatusRecord};
pub use target::{ProbeTarget, ProtocolVariant, TargetError, MAX_HOST_LEN};
pub use transport::{Connection, TransportError, TransportKind};
