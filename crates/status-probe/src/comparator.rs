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

//! Cross-checks a monitored host against a known-good reference host.

use std::fmt;
use std::time::Duration;

use log::info;
use serde::Serialize;

use crate::prober::{Probe, ProbeResult, StatusProber};
use crate::target::ProbeTarget;

/// Diagnostic label derived from a primary/reference probe pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Both hosts answered.
    BothOnline,
    /// Only the reference answered: the monitored server is at fault.
    ServerSideFault,
    /// Neither answered: the local network path is at fault.
    NetworkSideFault,
    /// Only the primary answered; nothing can be concluded.
    Indeterminate,
}

impl Classification {
    #[must_use]
    pub fn from_status(primary_online: bool, reference_online: bool) -> Self {
        match (primary_online, reference_online) {
            (true, true) => Self::BothOnline,
            (false, true) => Self::ServerSideFault,
            (false, false) => Self::NetworkSideFault,
            (true, false) => Self::Indeterminate,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::BothOnline => "both online",
            Self::ServerSideFault => "server-side fault",
            Self::NetworkSideFault => "network-side fault",
            Self::Indeterminate => "indeterminate",
        };
        f.write_str(text)
    }
}

/// Results of both probes plus the verdict drawn from them.
#[derive(Debug, Clone, Serialize)]
pub struct ComparatorVerdict {
    primary: ProbeResult,
    reference: ProbeResult,
    classification: Classification,
}

impl ComparatorVerdict {
    /// Classify a pair of results. `primary` is the monitored host.
    #[must_use]
    pub fn new(primary: ProbeResult, reference: ProbeResult) -> Self {
        let classification =
            Classification::from_status(primary.is_online(), reference.is_online());
        Self {
            primary,
            reference,
            classification,
        }
    }

    #[must_use]
    pub fn primary(&self) -> &ProbeResult {
        &self.primary
    }

    #[must_use]
    pub fn reference(&self) -> &ProbeResult {
        &self.reference
    }

    #[must_use]
    pub fn classification(&self) -> Classification {
        self.classification
    }
}

/// Runs two probes concurrently and classifies the pair.
#[derive(Debug, Clone, Default)]
pub struct Comparator<P = StatusProber> {
    prober: P,
}

impl<P: Probe> Comparator<P> {
    #[must_use]
    pub fn new(prober: P) -> Self {
        Self { prober }
    }

    /// Probe both targets at once; completes when both have finished or
    /// timed out, so the wall time is the slower of the two.
    pub async fn compare(
        &self,
        primary: &ProbeTarget,
        reference: &ProbeTarget,
        timeout: Duration,
    ) -> ComparatorVerdict {
        let (primary_result, reference_result) = tokio::join!(
            self.prober.probe(primary, timeout),
            self.prober.probe(reference, timeout)
        );

        let verdict = ComparatorVerdict::new(primary_result, reference_result);
        info!(
            "Compared {} with {}: {}",
            primary,
            reference,
            verdict.classification()
        );
        verdict
    }
}

/// Compare two targets with a default [`StatusProber`].
pub async fn compare(
    primary: &ProbeTarget,
    reference: &ProbeTarget,
    timeout: Duration,
) -> ComparatorVerdict {
    Comparator::new(StatusProber::default())
        .compare(primary, reference, timeout)
        .await
}
