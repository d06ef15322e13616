use super::{DetectionEvent, Detector, DetectorDescriptor, Observation};

static AUTOCLICKER_A: DetectorDescriptor = DetectorDescriptor {
    category: "autoclicker",
    variant: "A",
    max_violations: 10.0,
    trust_duration: 100,
    fail_buffer: 3.0,
    max_buffer: 6.0,
    punishable: true,
};

/// Raw clicks-per-second ceiling. Nobody sustains this by hand.
pub struct AutoClickerA;

impl Detector for AutoClickerA {
    fn descriptor(&self) -> &'static DetectorDescriptor {
        &AUTOCLICKER_A
    }

    fn observe(&mut self, event: &DetectionEvent) -> Option<Observation> {
        let DetectionEvent::Click(click) = event else {
            return None;
        };
        if click.cps > 22 {
            Some(Observation::Fail {
                magnitude: 1.0,
                params: vec![("cps", click.cps.to_string())],
            })
        } else {
            None
        }
    }
}

static AUTOCLICKER_B: DetectorDescriptor = DetectorDescriptor {
    category: "autoclicker",
    variant: "B",
    max_violations: 10.0,
    trust_duration: 100,
    fail_buffer: 2.0,
    max_buffer: 4.0,
    punishable: true,
};

/// Catches metronome clicking: a full window of byte-identical delays at a
/// rate worth caring about. Human cadence always jitters.
pub struct AutoClickerB;

impl Detector for AutoClickerB {
    fn descriptor(&self) -> &'static DetectorDescriptor {
        &AUTOCLICKER_B
    }

    fn observe(&mut self, event: &DetectionEvent) -> Option<Observation> {
        let DetectionEvent::Click(click) = event else {
            return None;
        };
        if click.delays.len() < 20 || click.cps < 10 {
            return None;
        }
        let first = click.delays[0];
        if click.delays.iter().all(|d| *d == first) {
            Some(Observation::Fail {
                magnitude: 1.0,
                params: vec![("delay", format!("{first}ms"))],
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::ClickSnapshot;

    fn click(cps: usize, delays: Vec<u64>) -> ClickSnapshot {
        ClickSnapshot {
            client_tick: 40,
            cps,
            delay_ms: delays.last().copied(),
            delays,
        }
    }

    #[test]
    fn inhuman_cps_fails() {
        let mut detector = AutoClickerA;
        let snap = click(28, vec![50; 20]);
        assert!(matches!(
            detector.observe(&DetectionEvent::Click(&snap)),
            Some(Observation::Fail { .. })
        ));
    }

    #[test]
    fn fast_but_plausible_cps_passes() {
        let mut detector = AutoClickerA;
        let snap = click(18, vec![50; 20]);
        assert!(detector.observe(&DetectionEvent::Click(&snap)).is_none());
    }

    #[test]
    fn metronome_delays_fail() {
        let mut detector = AutoClickerB;
        let snap = click(12, vec![100; 20]);
        assert!(matches!(
            detector.observe(&DetectionEvent::Click(&snap)),
            Some(Observation::Fail { .. })
        ));
    }

    #[test]
    fn jittery_delays_pass() {
        let mut detector = AutoClickerB;
        let mut delays = vec![100; 20];
        delays[7] = 150;
        let snap = click(12, delays);
        assert!(detector.observe(&DetectionEvent::Click(&snap)).is_none());
    }

    #[test]
    fn slow_metronomes_are_ignored() {
        let mut detector = AutoClickerB;
        let snap = click(4, vec![250; 20]);
        assert!(detector.observe(&DetectionEvent::Click(&snap)).is_none());
    }
}
