use std::collections::HashMap;
use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hasher};

use crate::config::Platform;

use super::protocol::{PROTOCOL_1_20_0, ServerPacket};

pub type AckCallback = Box<dyn FnOnce() + Send + 'static>;

/// How probe tokens are transformed on their way to a client and back.
///
/// Legacy clients echo the token itself, modern ones echo a scaled
/// timestamp, and the Orbis builds disagree with everyone about which side
/// of the trip carries the factor of a thousand. Unrecognized platforms get
/// the identity row so their echoes are matched untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AckScaling {
    issue_multiplier: i64,
    send_divisor: i64,
    echo_divisor: i64,
}

fn scaling_for(protocol_version: u32, platform: Platform) -> AckScaling {
    let legacy = protocol_version <= PROTOCOL_1_20_0;
    match (legacy, platform) {
        (_, Platform::Unknown) => AckScaling {
            issue_multiplier: 1,
            send_divisor: 1,
            echo_divisor: 1,
        },
        (true, Platform::Orbis) => AckScaling {
            issue_multiplier: 1000,
            send_divisor: 1000,
            echo_divisor: 1,
        },
        (true, _) => AckScaling {
            issue_multiplier: 1000,
            send_divisor: 1,
            echo_divisor: 1,
        },
        (false, Platform::Orbis) => AckScaling {
            issue_multiplier: 1,
            send_divisor: 1,
            echo_divisor: 1000,
        },
        (false, _) => AckScaling {
            issue_multiplier: 1,
            send_divisor: 1,
            echo_divisor: 1_000_000,
        },
    }
}

fn random_token_base() -> u32 {
    let state = RandomState::new();
    let mut hasher = state.build_hasher();
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    hasher.write_u128(now.as_nanos());
    hasher.finish() as u32
}

/// Pending-probe table. Callbacks registered under the current token run,
/// in registration order, once the client echoes that token back.
pub struct AckEngine {
    pending: HashMap<i64, Vec<AckCallback>>,
    current: i64,
    scaling: AckScaling,
    liveness_window: u32,
    ticks_waiting: u32,
}

impl AckEngine {
    pub fn new(protocol_version: u32, platform: Platform, liveness_window: u32) -> Self {
        let mut engine = Self {
            pending: HashMap::new(),
            current: 0,
            scaling: scaling_for(protocol_version, platform),
            liveness_window: liveness_window.max(1),
            ticks_waiting: 0,
        };
        engine.refresh();
        engine
    }

    /// Registers `callback` under the token the next probe will carry.
    pub fn schedule(&mut self, callback: AckCallback) {
        self.pending.entry(self.current).or_default().push(callback);
    }

    /// Matches an echoed timestamp against the pending table. Returns the
    /// callback batch for the caller to run outside any lock; a second echo
    /// of the same token finds nothing.
    pub fn execute(&mut self, received: i64) -> Option<Vec<AckCallback>> {
        let token = received / self.scaling.echo_divisor;
        let batch = self.pending.remove(&token)?;
        self.ticks_waiting = 0;
        Some(batch)
    }

    /// Picks a fresh token distinct from every token still in flight.
    pub fn refresh(&mut self) {
        loop {
            let token = i64::from(random_token_base()) * self.scaling.issue_multiplier;
            if token != self.current && !self.pending.contains_key(&token) {
                self.current = token;
                return;
            }
        }
    }

    /// Probe packet for the current token, or `None` when no callback is
    /// waiting on it.
    pub fn probe(&self) -> Option<ServerPacket> {
        if !self.pending.contains_key(&self.current) {
            return None;
        }
        Some(ServerPacket::LatencyProbe {
            timestamp: self.current / self.scaling.send_divisor,
            needs_response: true,
        })
    }

    /// Per-tick liveness check. Returns `false` when probes have gone
    /// unanswered for the whole window, then resets so the failure is
    /// signaled once per window rather than every following tick.
    pub fn validate(&mut self) -> bool {
        if self.pending.is_empty() {
            self.ticks_waiting = 0;
            return true;
        }
        self.ticks_waiting += 1;
        if self.ticks_waiting >= self.liveness_window {
            self.ticks_waiting = 0;
            return false;
        }
        true
    }

    /// Drops every pending callback and rolls the token. Used at transfer
    /// boundaries where in-flight probes can no longer be answered.
    pub fn invalidate(&mut self) {
        self.pending.clear();
        self.ticks_waiting = 0;
        self.refresh();
    }

    pub fn current_token(&self) -> i64 {
        self.current
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::Mutex;

    fn engine(protocol_version: u32, platform: Platform) -> AckEngine {
        AckEngine::new(protocol_version, platform, 100)
    }

    #[test]
    fn callbacks_run_in_registration_order() {
        let mut acks = engine(600, Platform::Windows);
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let order = Arc::clone(&order);
            acks.schedule(Box::new(move || order.lock().unwrap().push(i)));
        }

        let token = acks.current_token();
        let batch = acks.execute(token * 1_000_000).expect("token should match");
        for callback in batch {
            callback();
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn execute_consumes_the_token() {
        let mut acks = engine(600, Platform::Windows);
        acks.schedule(Box::new(|| {}));

        let echo = acks.current_token() * 1_000_000;
        assert!(acks.execute(echo).is_some());
        assert!(acks.execute(echo).is_none());
    }

    #[test]
    fn legacy_tokens_echo_unscaled() {
        let mut acks = engine(PROTOCOL_1_20_0, Platform::Windows);
        acks.schedule(Box::new(|| {}));

        let token = acks.current_token();
        assert_eq!(token % 1000, 0);
        match acks.probe() {
            Some(ServerPacket::LatencyProbe { timestamp, .. }) => assert_eq!(timestamp, token),
            other => panic!("expected probe, got {:?}", other),
        }
        assert!(acks.execute(token).is_some());
    }

    #[test]
    fn legacy_orbis_sends_reduced_timestamp() {
        let mut acks = engine(PROTOCOL_1_20_0, Platform::Orbis);
        acks.schedule(Box::new(|| {}));

        let token = acks.current_token();
        match acks.probe() {
            Some(ServerPacket::LatencyProbe { timestamp, .. }) => {
                assert_eq!(timestamp, token / 1000)
            }
            other => panic!("expected probe, got {:?}", other),
        }
        assert!(acks.execute(token).is_some());
    }

    #[test]
    fn modern_orbis_echo_divides_by_thousand() {
        let mut acks = engine(600, Platform::Orbis);
        acks.schedule(Box::new(|| {}));

        let token = acks.current_token();
        assert!(acks.execute(token * 1000).is_some());
    }

    #[test]
    fn unknown_platform_matches_raw() {
        let mut acks = engine(600, Platform::Unknown);
        acks.schedule(Box::new(|| {}));

        let token = acks.current_token();
        assert!(acks.execute(token).is_some());
    }

    #[test]
    fn probe_absent_without_callbacks() {
        let acks = engine(600, Platform::Windows);
        assert!(acks.probe().is_none());
    }

    #[test]
    fn validate_fails_once_per_window() {
        let mut acks = AckEngine::new(600, Platform::Windows, 5);
        acks.schedule(Box::new(|| {}));

        for _ in 0..4 {
            assert!(acks.validate());
        }
        assert!(!acks.validate());

        for _ in 0..4 {
            assert!(acks.validate());
        }
        assert!(!acks.validate());
    }

    #[test]
    fn validate_resets_after_response() {
        let mut acks = AckEngine::new(600, Platform::Windows, 5);
        acks.schedule(Box::new(|| {}));

        for _ in 0..3 {
            assert!(acks.validate());
        }
        let echo = acks.current_token() * 1_000_000;
        acks.execute(echo);

        acks.schedule(Box::new(|| {}));
        for _ in 0..4 {
            assert!(acks.validate());
        }
        assert!(!acks.validate());
    }

    #[test]
    fn invalidate_clears_pending_and_rolls_token() {
        let mut acks = engine(600, Platform::Windows);
        acks.schedule(Box::new(|| {}));
        let before = acks.current_token();

        acks.invalidate();

        assert_eq!(acks.pending_count(), 0);
        assert_ne!(acks.current_token(), before);
        assert!(acks.execute(before * 1_000_000).is_none());
    }

    #[test]
    fn refresh_keeps_pending_tokens_alive() {
        let mut acks = engine(600, Platform::Windows);
        acks.schedule(Box::new(|| {}));
        let first = acks.current_token();

        acks.refresh();
        acks.schedule(Box::new(|| {}));
        let second = acks.current_token();

        assert_ne!(first, second);
        assert!(acks.execute(first * 1_000_000).is_some());
        assert!(acks.execute(second * 1_000_000).is_some());
    }
}
