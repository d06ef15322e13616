use crate::physics::round_to;

use super::{DetectionEvent, Detector, DetectorDescriptor, Observation};

static VELOCITY_A: DetectorDescriptor = DetectorDescriptor {
    category: "velocity",
    variant: "A",
    max_violations: 15.0,
    trust_duration: 150,
    fail_buffer: 5.0,
    max_buffer: 10.0,
    punishable: true,
};

/// Checks that the client actually absorbed server knockback. The input that
/// consumed the knockback must move vertically by the full amount; taking
/// less is anti-knockback, taking more is its own kind of wrong.
pub struct VelocityA;

impl Detector for VelocityA {
    fn descriptor(&self) -> &'static DetectorDescriptor {
        &VELOCITY_A
    }

    fn observe(&mut self, event: &DetectionEvent) -> Option<Observation> {
        let DetectionEvent::Input(s) = event else {
            return None;
        };
        let knockback = s.knockback_applied?;
        if s.exempt || knockback.y.abs() <= 0.005 || s.collided_vertically {
            return None;
        }

        let client_dy = s.client_position.y - s.prev_client_position.y;
        let ratio = client_dy / knockback.y;

        if (0.9999..=1.1).contains(&ratio) {
            Some(Observation::Debuff(0.1))
        } else {
            Some(Observation::Fail {
                magnitude: 1.0,
                params: vec![("ratio", format!("{:.1}%", round_to(ratio, 3) * 100.0))],
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthorityMode;
    use crate::net::{InputFlags, InputMode};
    use crate::player::MovementSnapshot;
    use glam::Vec3;

    fn knocked(client_dy: f32) -> MovementSnapshot {
        MovementSnapshot {
            client_tick: 60,
            position: Vec3::new(0.0, 10.5, 0.0),
            prev_position: Vec3::new(0.0, 10.0, 0.0),
            client_position: Vec3::new(0.0, 10.0 + client_dy, 0.0),
            prev_client_position: Vec3::new(0.0, 10.0, 0.0),
            velocity: Vec3::ZERO,
            client_velocity: Vec3::new(0.0, client_dy, 0.0),
            rotation: Vec3::ZERO,
            prev_rotation: Vec3::ZERO,
            deviation: Vec3::ZERO,
            on_ground: false,
            flags: InputFlags::empty(),
            input_mode: InputMode::Mouse,
            off_ground_ticks: 1,
            step_clip_offset: 0.0,
            outgoing_corrections: 0,
            ticks_since_teleport: 50,
            ticks_since_knockback: 0,
            knockback_applied: Some(Vec3::new(0.0, 0.5, 0.0)),
            collided_vertically: false,
            collided_horizontally: false,
            exempt: false,
            jump_pressed: false,
            missed_swing: false,
            movement_authority: AuthorityMode::Semi,
            correction: None,
        }
    }

    #[test]
    fn full_knockback_debuffs() {
        let mut detector = VelocityA;
        let snap = knocked(0.5);
        assert!(matches!(
            detector.observe(&DetectionEvent::Input(&snap)),
            Some(Observation::Debuff(_))
        ));
    }

    #[test]
    fn reduced_knockback_fails() {
        let mut detector = VelocityA;
        let snap = knocked(0.35);
        assert!(matches!(
            detector.observe(&DetectionEvent::Input(&snap)),
            Some(Observation::Fail { .. })
        ));
    }

    #[test]
    fn ceiling_contact_is_exempt() {
        let mut detector = VelocityA;
        let mut snap = knocked(0.1);
        snap.collided_vertically = true;
        assert!(detector.observe(&DetectionEvent::Input(&snap)).is_none());
    }

    #[test]
    fn tiny_knockback_is_ignored() {
        let mut detector = VelocityA;
        let mut snap = knocked(0.0);
        snap.knockback_applied = Some(Vec3::new(0.3, 0.002, 0.0));
        assert!(detector.observe(&DetectionEvent::Input(&snap)).is_none());
    }

    #[test]
    fn inputs_without_knockback_are_skipped() {
        let mut detector = VelocityA;
        let mut snap = knocked(0.5);
        snap.knockback_applied = None;
        assert!(detector.observe(&DetectionEvent::Input(&snap)).is_none());
    }
}
