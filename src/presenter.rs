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

//! User-facing text for probe results and verdicts.

use rand::seq::IndexedRandom;
use rand::Rng;
use status_probe::{Classification, ComparatorVerdict, ProbeResult};

const EMPTY_SERVER: &str = "😶 Hmm, there's no cubers online… Might as well invite them.\n\
                            📣 Tell them to stop working too hard and play some games! 🎮";
const PLAYERS_OFFLINE: &str = "❌ Server is offline or not responding. 💤";
const STATUS_OFFLINE: &str = "🔴 Server is offline or unreachable at the moment. Try again later.";
const UNEXPECTED: &str = "⚠️ Unexpected result while testing. Try again later.";

// `{count}` is replaced with the number of players online.
const PLAYER_LINES: [&str; 7] = [
    "🎉 Hooray! {count} player(s) online!",
    "👀 Stop bothering me, go bother {count} person(s) on the server!",
    "🔥 The blocky world has {count} explorer(s) right now!",
    "🌍 There's a gathering of {count} cube-head(s)!",
    "😎 {count} people are crafting their destinies online!",
    "🧱 Whoa! {count} brick lovers online!",
    "💻 Server buzzin' with {count} player(s)! Join in!",
];

const ONLINE_LINES: [&str; 5] = [
    "🟢 Server is alive and kicking!",
    "🎮 All systems go, time to play!",
    "🌟 The server is up! Get your pickaxe ready!",
    "💡 Green light, server's online!",
    "🏰 The realm awaits, server is running fine!",
];

/// How many players are on, or that the server is unreachable.
pub fn player_message<R: Rng + ?Sized>(result: &ProbeResult, rng: &mut R) -> String {
    match result.player_count() {
        Some(0) => EMPTY_SERVER.to_string(),
        Some(count) => pick(&PLAYER_LINES, rng).replace("{count}", &count.to_string()),
        None => PLAYERS_OFFLINE.to_string(),
    }
}

/// Whether the server is up.
pub fn status_message<R: Rng + ?Sized>(result: &ProbeResult, rng: &mut R) -> String {
    if result.is_online() {
        pick(&ONLINE_LINES, rng).to_string()
    } else {
        STATUS_OFFLINE.to_string()
    }
}

/// Diagnosis of a primary/reference comparison.
#[must_use]
pub fn test_message(verdict: &ComparatorVerdict) -> String {
    let primary = verdict.primary().target().address();
    let reference = verdict.reference().target().address();

    match verdict.classification() {
        Classification::ServerSideFault => format!(
            "🧪 Test complete!\n\
             🔴 Your server (`{primary}`) is **offline**.\n\
             🟢 But the test server (`{reference}`) is **online**.\n\
             ❗ This might indicate an issue with **your Minecraft server** configuration."
        ),
        Classification::NetworkSideFault => format!(
            "🧪 Test complete!\n\
             🔴 Both your server (`{primary}`) and the test server (`{reference}`) are offline.\n\
             📶 This might be a **network issue** on your side. Check your internet connection."
        ),
        Classification::BothOnline => "🧪 Test complete!\n\
                                       ✅ Both servers are **online**!\n\
                                       🎉 Looks like everything is working perfectly."
            .to_string(),
        Classification::Indeterminate => UNEXPECTED.to_string(),
    }
}

/// One-line summary used by `watch`.
#[must_use]
pub fn status_line(result: &ProbeResult) -> String {
    let stamp = result.checked_at().format("%Y-%m-%d %H:%M:%S");
    let target = result.target();
    let latency = result.latency().as_millis();

    match (result.player_count(), result.error()) {
        (Some(count), _) => {
            let max = result.max_players().unwrap_or_default();
            format!("[{stamp}] {target}: online, {count}/{max} players, {latency} ms")
        }
        (None, Some(kind)) => {
            let detail = result.error_detail().unwrap_or_default();
            format!("[{stamp}] {target}: offline ({kind}: {detail}), {latency} ms")
        }
        (None, None) => format!("[{stamp}] {target}: offline, {latency} ms"),
    }
}

fn pick<'a, R: Rng + ?Sized>(lines: &[&'a str], rng: &mut R) -> &'a str {
    lines.choose(rng).copied().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use status_probe::{ErrorKind, ProbeTarget, ProtocolVariant, StatusRecord};

    use super::*;

    fn target(host: &str) -> ProbeTarget {
        ProbeTarget::new(host, 25565, ProtocolVariant::Java).unwrap()
    }

    fn online(host: &str, players: u32) -> ProbeResult {
        let record = StatusRecord {
            server_online: true,
            player_count: players,
            max_players: 20,
            motd: "A Minecraft Server".into(),
            version: Some("1.21.1".into()),
        };
        ProbeResult::from_record(target(host), record, Duration::from_millis(12))
    }

    fn offline(host: &str) -> ProbeResult {
        ProbeResult::failure(
            target(host),
            ErrorKind::Connect,
            "connection refused",
            Duration::from_millis(3),
        )
    }

    #[test]
    fn test_player_message_mentions_count() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let message = player_message(&online("a", 13), &mut rng);
            assert!(message.contains("13"), "{message}");
            assert!(!message.contains("{count}"));
        }
    }

    #[test]
    fn test_player_message_for_empty_server() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(player_message(&online("a", 0), &mut rng), EMPTY_SERVER);
    }

    #[test]
    fn test_offline_messages_carry_no_count() {
        let mut rng = StdRng::seed_from_u64(7);
        let result = offline("a");

        assert_eq!(player_message(&result, &mut rng), PLAYERS_OFFLINE);
        assert_eq!(status_message(&result, &mut rng), STATUS_OFFLINE);
        assert!(!status_line(&result).contains("players"));
    }

    #[test]
    fn test_status_message_when_online() {
        let mut rng = StdRng::seed_from_u64(1);
        let message = status_message(&online("a", 2), &mut rng);
        assert!(ONLINE_LINES.contains(&message.as_str()));
    }

    #[test]
    fn test_test_message_per_classification() {
        let server_fault = ComparatorVerdict::new(offline("mine"), online("ref", 1));
        let text = test_message(&server_fault);
        assert!(text.contains("(`mine:25565`) is **offline**"), "{text}");
        assert!(text.contains("your Minecraft server"));

        let network = ComparatorVerdict::new(offline("mine"), offline("ref"));
        assert!(test_message(&network).contains("network issue"));

        let fine = ComparatorVerdict::new(online("mine", 1), online("ref", 1));
        assert!(test_message(&fine).contains("Both servers are **online**"));

        let odd = ComparatorVerdict::new(online("mine", 1), offline("ref"));
        assert_eq!(test_message(&odd), UNEXPECTED);
    }

    #[test]
    fn test_status_line() {
        let line = status_line(&online("mc.example.net", 4));
        assert!(line.ends_with("mc.example.net:25565 (java): online, 4/20 players, 12 ms"), "{line}");

        let line = status_line(&offline("mc.example.net"));
        assert!(line.contains("offline (connection failed: connection refused)"), "{line}");
    }
}
