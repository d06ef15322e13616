use super::{DetectionEvent, Detector, DetectorDescriptor, Observation};

static TIMER_A: DetectorDescriptor = DetectorDescriptor {
    category: "timer",
    variant: "A",
    max_violations: 10.0,
    trust_duration: 100,
    fail_buffer: 2.0,
    max_buffer: 4.0,
    punishable: true,
};

/// Books one credit per client input and one debit per server tick. A client
/// running its simulation clock fast banks credits until the balance bursts;
/// the floor keeps a slow or lagging client from banking debits instead.
pub struct TimerA {
    balance: f32,
}

impl TimerA {
    pub fn new() -> Self {
        Self { balance: 0.0 }
    }
}

impl Default for TimerA {
    fn default() -> Self {
        Self::new()
    }
}

impl Detector for TimerA {
    fn descriptor(&self) -> &'static DetectorDescriptor {
        &TIMER_A
    }

    fn observe(&mut self, event: &DetectionEvent) -> Option<Observation> {
        match event {
            DetectionEvent::Input(_) => {
                self.balance += 1.0;
                if self.balance > 5.0 {
                    self.balance = 0.0;
                    Some(Observation::Fail {
                        magnitude: 1.0,
                        params: vec![],
                    })
                } else {
                    None
                }
            }
            DetectionEvent::Tick(_) => {
                self.balance = (self.balance - 1.0).max(-5.0);
                None
            }
            _ => None,
        }
    }

    fn reset(&mut self) {
        self.balance = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthorityMode;
    use crate::net::{InputFlags, InputMode};
    use crate::player::MovementSnapshot;
    use super::super::TickSnapshot;
    use glam::Vec3;

    fn input() -> MovementSnapshot {
        MovementSnapshot {
            client_tick: 10,
            position: Vec3::ZERO,
            prev_position: Vec3::ZERO,
            client_position: Vec3::ZERO,
            prev_client_position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            client_velocity: Vec3::ZERO,
            rotation: Vec3::ZERO,
            prev_rotation: Vec3::ZERO,
            deviation: Vec3::ZERO,
            on_ground: true,
            flags: InputFlags::empty(),
            input_mode: InputMode::Mouse,
            off_ground_ticks: 0,
            step_clip_offset: 0.0,
            outgoing_corrections: 0,
            ticks_since_teleport: 10,
            ticks_since_knockback: -1,
            knockback_applied: None,
            collided_vertically: true,
            collided_horizontally: false,
            exempt: false,
            jump_pressed: false,
            missed_swing: false,
            movement_authority: AuthorityMode::Semi,
            correction: None,
        }
    }

    fn tick() -> TickSnapshot {
        TickSnapshot {
            server_tick: 10,
            client_tick: 10,
        }
    }

    #[test]
    fn balanced_pacing_never_fails() {
        let mut detector = TimerA::new();
        let snap = input();
        let t = tick();
        for _ in 0..200 {
            assert!(detector.observe(&DetectionEvent::Input(&snap)).is_none());
            assert!(detector.observe(&DetectionEvent::Tick(&t)).is_none());
        }
    }

    #[test]
    fn fast_clients_burst_the_balance() {
        let mut detector = TimerA::new();
        let snap = input();
        let t = tick();
        let mut failed = false;
        // three inputs for every two ticks, a 30 Hz client
        for _ in 0..20 {
            for _ in 0..3 {
                if detector.observe(&DetectionEvent::Input(&snap)).is_some() {
                    failed = true;
                }
            }
            detector.observe(&DetectionEvent::Tick(&t));
            detector.observe(&DetectionEvent::Tick(&t));
        }
        assert!(failed, "timer never caught the fast client");
    }

    #[test]
    fn lag_spikes_are_floored() {
        let mut detector = TimerA::new();
        let snap = input();
        let t = tick();
        // a long stall banks at most five debits
        for _ in 0..50 {
            detector.observe(&DetectionEvent::Tick(&t));
        }
        // a ten input catch-up burst stays inside the floor plus burst cap
        let mut failed = false;
        for _ in 0..10 {
            if detector.observe(&DetectionEvent::Input(&snap)).is_some() {
                failed = true;
            }
        }
        assert!(!failed, "catch-up after a stall should not fail");
    }
}
