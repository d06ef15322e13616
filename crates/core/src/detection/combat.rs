use crate::physics::round_to;

use super::{DetectionEvent, Detector, DetectorDescriptor, Observation};

/// Farthest a vanilla client can land a melee hit from.
const REACH_LIMIT: f32 = 3.0;
/// Raw closest-distance ceiling, slightly looser than the ray-based limit to
/// absorb the endpoint sampling.
const RAW_REACH_LIMIT: f32 = 3.1;

static REACH_A: DetectorDescriptor = DetectorDescriptor {
    category: "reach",
    variant: "A",
    max_violations: 15.0,
    trust_duration: 200,
    fail_buffer: 5.0,
    max_buffer: 10.0,
    punishable: true,
};

/// Judges the view ray against the target's hitbox along its path. An empty
/// intercept set means the client attacked something it was not looking at.
pub struct ReachA;

impl Detector for ReachA {
    fn descriptor(&self) -> &'static DetectorDescriptor {
        &REACH_A
    }

    fn observe(&mut self, event: &DetectionEvent) -> Option<Observation> {
        let DetectionEvent::CombatResolved(results) = event else {
            return None;
        };
        let hits = results.hits.as_ref()?;

        if hits.is_empty() {
            return Some(Observation::Fail {
                magnitude: 1.0,
                params: vec![("hits", "none".to_string())],
            });
        }

        let nearest = hits.iter().copied().fold(f32::MAX, f32::min);
        if nearest > REACH_LIMIT {
            Some(Observation::Fail {
                magnitude: round_to(nearest, 2),
                params: vec![("distance", format!("{nearest:.2}"))],
            })
        } else {
            Some(Observation::Debuff(0.1))
        }
    }
}

static REACH_B: DetectorDescriptor = DetectorDescriptor {
    category: "reach",
    variant: "B",
    max_violations: 15.0,
    trust_duration: 200,
    fail_buffer: 8.0,
    max_buffer: 16.0,
    punishable: true,
};

/// Backstop on the raw eye-to-hitbox distance at attack time. Works for
/// every input mode, including the aim-exempt ones.
pub struct ReachB;

impl Detector for ReachB {
    fn descriptor(&self) -> &'static DetectorDescriptor {
        &REACH_B
    }

    fn observe(&mut self, event: &DetectionEvent) -> Option<Observation> {
        let DetectionEvent::Attack(attack) = event else {
            return None;
        };
        if attack.closest_raw > RAW_REACH_LIMIT {
            Some(Observation::Fail {
                magnitude: round_to(attack.closest_raw, 2),
                params: vec![("distance", format!("{:.2}", attack.closest_raw))],
            })
        } else {
            Some(Observation::Debuff(0.1))
        }
    }
}

static KILLAURA_A: DetectorDescriptor = DetectorDescriptor {
    category: "killaura",
    variant: "A",
    max_violations: 5.0,
    trust_duration: 300,
    fail_buffer: 1.0,
    max_buffer: 2.0,
    punishable: true,
};

/// A mouse points at one thing at a time; attacking two different targets
/// inside a single simulation frame is not something a hand does.
pub struct KillAuraA {
    tick: u64,
    targets: Vec<u64>,
}

impl KillAuraA {
    pub fn new() -> Self {
        Self {
            tick: 0,
            targets: Vec::new(),
        }
    }
}

impl Default for KillAuraA {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for KillAuraA {
    fn descriptor(&self) -> &'static DetectorDescriptor {
        &KILLAURA_A
    }

    fn observe(&mut self, event: &DetectionEvent) -> Option<Observation> {
        let DetectionEvent::Attack(attack) = event else {
            return None;
        };
        if attack.client_tick != self.tick {
            self.tick = attack.client_tick;
            self.targets.clear();
        }
        if self.targets.contains(&attack.target) {
            return None;
        }
        let crowded = !self.targets.is_empty();
        self.targets.push(attack.target);
        if crowded {
            Some(Observation::Fail {
                magnitude: 1.0,
                params: vec![("targets", self.targets.len().to_string())],
            })
        } else {
            None
        }
    }

    fn reset(&mut self) {
        self.tick = 0;
        self.targets.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::{AttackSnapshot, CombatResults};
    use crate::net::InputMode;
    use glam::Vec3;

    fn results(hits: Option<Vec<f32>>) -> CombatResults {
        CombatResults {
            client_tick: 30,
            target: 7,
            closest_raw: 2.5,
            hits,
            input_mode: InputMode::Mouse,
        }
    }

    fn attack(target: u64, tick: u64, closest_raw: f32) -> AttackSnapshot {
        AttackSnapshot {
            client_tick: tick,
            target,
            attack_position: Vec3::new(0.0, 1.62, 0.0),
            prev_attack_position: Vec3::new(0.0, 1.62, 0.0),
            rotation: Vec3::ZERO,
            entity_position: Vec3::new(0.0, 0.0, closest_raw),
            entity_prev_position: Vec3::new(0.0, 0.0, closest_raw),
            entity_width: 0.6,
            entity_height: 1.8,
            closest_raw,
            input_mode: InputMode::Mouse,
        }
    }

    #[test]
    fn close_ray_hits_debuff() {
        let mut detector = ReachA;
        let r = results(Some(vec![2.4, 2.6]));
        assert!(matches!(
            detector.observe(&DetectionEvent::CombatResolved(&r)),
            Some(Observation::Debuff(_))
        ));
    }

    #[test]
    fn long_ray_hits_fail() {
        let mut detector = ReachA;
        let r = results(Some(vec![3.6, 3.8]));
        match detector.observe(&DetectionEvent::CombatResolved(&r)) {
            Some(Observation::Fail { magnitude, .. }) => {
                assert!((magnitude - 3.6).abs() < 1e-5)
            }
            other => panic!("expected fail, got {:?}", other),
        }
    }

    #[test]
    fn attacking_without_aiming_fails() {
        let mut detector = ReachA;
        let r = results(Some(vec![]));
        assert!(matches!(
            detector.observe(&DetectionEvent::CombatResolved(&r)),
            Some(Observation::Fail { .. })
        ));
    }

    #[test]
    fn aim_exempt_results_are_skipped() {
        let mut detector = ReachA;
        let r = results(None);
        assert!(detector.observe(&DetectionEvent::CombatResolved(&r)).is_none());
    }

    #[test]
    fn raw_distance_over_limit_fails() {
        let mut detector = ReachB;
        let a = attack(7, 30, 3.4);
        assert!(matches!(
            detector.observe(&DetectionEvent::Attack(&a)),
            Some(Observation::Fail { .. })
        ));
    }

    #[test]
    fn two_targets_in_one_tick_fail() {
        let mut detector = KillAuraA::new();
        assert!(detector.observe(&DetectionEvent::Attack(&attack(7, 30, 2.0))).is_none());
        assert!(matches!(
            detector.observe(&DetectionEvent::Attack(&attack(9, 30, 2.0))),
            Some(Observation::Fail { .. })
        ));
    }

    #[test]
    fn repeat_hits_on_the_same_target_pass() {
        let mut detector = KillAuraA::new();
        assert!(detector.observe(&DetectionEvent::Attack(&attack(7, 30, 2.0))).is_none());
        assert!(detector.observe(&DetectionEvent::Attack(&attack(7, 30, 2.0))).is_none());
        assert!(detector.observe(&DetectionEvent::Attack(&attack(7, 31, 2.0))).is_none());
    }
}
