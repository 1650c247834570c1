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

//! Periodic re-probing for `watch` mode.

use std::time::Duration;

use log::{info, warn};
use status_probe::{Probe, ProbeResult, ProbeTarget};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Probe `target` every `period` until `cancel_token` fires.
///
/// Each result is handed to `on_result`. Transitions between online and
/// offline are logged. Returns the number of completed probes.
pub async fn watch<P, F>(
    prober: &P,
    target: &ProbeTarget,
    probe_timeout: Duration,
    period: Duration,
    cancel_token: CancellationToken,
    mut on_result: F,
) -> usize
where
    P: Probe,
    F: FnMut(&ProbeResult),
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut last_online: Option<bool> = None;
    let mut completed = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            () = cancel_token.cancelled() => {
                info!("Watch of {target} cancelled after {completed} probe(s)");
                return completed;
            }
        }

        let result = tokio::select! {
            result = prober.probe(target, probe_timeout) => result,
            () = cancel_token.cancelled() => {
                info!("Watch of {target} cancelled during probe");
                return completed;
            }
        };
        completed += 1;

        let online = result.is_online();
        match last_online {
            Some(previous) if previous == online => {}
            _ if online => info!("{target} is online"),
            _ => warn!(
                "{target} is offline: {}",
                result.error_detail().unwrap_or("no detail")
            ),
        }
        last_online = Some(online);

        on_result(&result);
    }
}
