use crate::physics::round_to;

use super::{DetectionEvent, Detector, DetectorDescriptor, Observation};

static MOVEMENT_A: DetectorDescriptor = DetectorDescriptor {
    category: "movement",
    variant: "A",
    max_violations: 20.0,
    trust_duration: 200,
    fail_buffer: 5.0,
    max_buffer: 10.0,
    punishable: true,
};

/// Compares the client's vertical motion against the simulated one. Vertical
/// physics has no player input term, so the gap between claim and prediction
/// is a direct fly/glide signal.
pub struct MovementA;

impl Detector for MovementA {
    fn descriptor(&self) -> &'static DetectorDescriptor {
        &MOVEMENT_A
    }

    fn observe(&mut self, event: &DetectionEvent) -> Option<Observation> {
        let DetectionEvent::Input(s) = event else {
            return None;
        };
        if s.exempt || s.on_ground || s.step_clip_offset > 0.0 || s.outgoing_corrections > 0 {
            return None;
        }

        let client_dy = s.client_position.y - s.prev_client_position.y;
        let simulated_dy = s.position.y - s.prev_position.y;
        let deviation = (client_dy - simulated_dy).abs();

        if deviation < 0.03 {
            Some(Observation::Debuff(0.1))
        } else {
            Some(Observation::Fail {
                magnitude: round_to(deviation, 3),
                params: vec![("deviation", format!("{:.4}", deviation))],
            })
        }
    }
}

static MOVEMENT_B: DetectorDescriptor = DetectorDescriptor {
    category: "movement",
    variant: "B",
    max_violations: 20.0,
    trust_duration: 200,
    fail_buffer: 5.0,
    max_buffer: 10.0,
    punishable: true,
};

/// Horizontal counterpart of [`MovementA`]. Looser threshold, since strafe
/// input and wall contact leave more legitimate wiggle room.
pub struct MovementB;

impl Detector for MovementB {
    fn descriptor(&self) -> &'static DetectorDescriptor {
        &MOVEMENT_B
    }

    fn observe(&mut self, event: &DetectionEvent) -> Option<Observation> {
        let DetectionEvent::Input(s) = event else {
            return None;
        };
        if s.exempt
            || s.step_clip_offset > 0.0
            || s.outgoing_corrections > 0
            || s.collided_horizontally
        {
            return None;
        }

        let client = s.client_position - s.prev_client_position;
        let simulated = s.position - s.prev_position;
        let dx = client.x - simulated.x;
        let dz = client.z - simulated.z;
        let deviation = (dx * dx + dz * dz).sqrt();

        if deviation < 0.05 {
            Some(Observation::Debuff(0.1))
        } else {
            Some(Observation::Fail {
                magnitude: round_to(deviation, 3),
                params: vec![("deviation", format!("{:.4}", deviation))],
            })
        }
    }
}

static MOVEMENT_C: DetectorDescriptor = DetectorDescriptor {
    category: "movement",
    variant: "C",
    max_violations: 2.0,
    trust_duration: -1,
    fail_buffer: 2.0,
    max_buffer: 3.0,
    punishable: true,
};

/// Flags jump presses that happen long after the player left the ground.
/// Honest clients can buffer a jump shortly before landing; pressing it ten
/// ticks up means the client believes it can jump on air.
pub struct MovementC;

impl Detector for MovementC {
    fn descriptor(&self) -> &'static DetectorDescriptor {
        &MOVEMENT_C
    }

    fn observe(&mut self, event: &DetectionEvent) -> Option<Observation> {
        let DetectionEvent::Input(s) = event else {
            return None;
        };
        if s.exempt
            || s.ticks_since_teleport == -1
            || !s.jump_pressed
            || s.outgoing_corrections > 0
        {
            return None;
        }

        if s.off_ground_ticks >= 10 {
            Some(Observation::Fail {
                magnitude: 1.0,
                params: vec![("airborne", format!("{}t", s.off_ground_ticks))],
            })
        } else {
            Some(Observation::Debuff(1.0))
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

    fn snapshot() -> MovementSnapshot {
        MovementSnapshot {
            client_tick: 50,
            position: Vec3::new(0.0, 10.0, 0.0),
            prev_position: Vec3::new(0.0, 10.0784, 0.0),
            client_position: Vec3::new(0.0, 10.0, 0.0),
            prev_client_position: Vec3::new(0.0, 10.0784, 0.0),
            velocity: Vec3::ZERO,
            client_velocity: Vec3::ZERO,
            rotation: Vec3::ZERO,
            prev_rotation: Vec3::ZERO,
            deviation: Vec3::ZERO,
            on_ground: false,
            flags: InputFlags::empty(),
            input_mode: InputMode::Mouse,
            off_ground_ticks: 4,
            step_clip_offset: 0.0,
            outgoing_corrections: 0,
            ticks_since_teleport: 100,
            ticks_since_knockback: -1,
            knockback_applied: None,
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
    fn matching_vertical_motion_debuffs() {
        let mut detector = MovementA;
        let snap = snapshot();
        match detector.observe(&DetectionEvent::Input(&snap)) {
            Some(Observation::Debuff(_)) => {}
            other => panic!("expected debuff, got {:?}", other),
        }
    }

    #[test]
    fn hovering_fails_the_vertical_check() {
        let mut detector = MovementA;
        let mut snap = snapshot();
        // client claims to hang mid-air while the simulation falls
        snap.client_position.y = snap.prev_client_position.y;
        match detector.observe(&DetectionEvent::Input(&snap)) {
            Some(Observation::Fail { magnitude, .. }) => {
                assert!((magnitude - 0.078).abs() < 1e-4);
            }
            other => panic!("expected fail, got {:?}", other),
        }
    }

    #[test]
    fn vertical_check_skips_on_ground() {
        let mut detector = MovementA;
        let mut snap = snapshot();
        snap.on_ground = true;
        snap.client_position.y += 5.0;
        assert!(detector.observe(&DetectionEvent::Input(&snap)).is_none());
    }

    #[test]
    fn speeding_fails_the_horizontal_check() {
        let mut detector = MovementB;
        let mut snap = snapshot();
        snap.client_position.x += 0.5;
        match detector.observe(&DetectionEvent::Input(&snap)) {
            Some(Observation::Fail { magnitude, .. }) => assert!(magnitude > 0.4),
            other => panic!("expected fail, got {:?}", other),
        }
    }

    #[test]
    fn horizontal_check_skips_wall_contact() {
        let mut detector = MovementB;
        let mut snap = snapshot();
        snap.collided_horizontally = true;
        snap.client_position.x += 0.5;
        assert!(detector.observe(&DetectionEvent::Input(&snap)).is_none());
    }

    #[test]
    fn air_jump_fails_after_ten_ticks() {
        let mut detector = MovementC;
        let mut snap = snapshot();
        snap.jump_pressed = true;
        snap.off_ground_ticks = 12;
        match detector.observe(&DetectionEvent::Input(&snap)) {
            Some(Observation::Fail { magnitude, .. }) => assert_eq!(magnitude, 1.0),
            other => panic!("expected fail, got {:?}", other),
        }
    }

    #[test]
    fn buffered_jump_near_landing_debuffs() {
        let mut detector = MovementC;
        let mut snap = snapshot();
        snap.jump_pressed = true;
        snap.off_ground_ticks = 3;
        match detector.observe(&DetectionEvent::Input(&snap)) {
            Some(Observation::Debuff(amount)) => assert_eq!(amount, 1.0),
            other => panic!("expected debuff, got {:?}", other),
        }
    }

    #[test]
    fn jump_check_waits_for_the_first_teleport() {
        let mut detector = MovementC;
        let mut snap = snapshot();
        snap.jump_pressed = true;
        snap.off_ground_ticks = 12;
        snap.ticks_since_teleport = -1;
        assert!(detector.observe(&DetectionEvent::Input(&snap)).is_none());
    }
}
