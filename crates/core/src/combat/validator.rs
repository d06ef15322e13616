use glam::Vec3;

use crate::entity::RewindSample;
use crate::net::InputMode;
use crate::physics::{Aabb, direction_vector};

use super::clicks::{ClickSnapshot, ClickTracker};

/// View rays are traced this far, well past any legitimate melee range, so
/// the detection layer sees the real aim distance instead of a clipped one.
pub const ATTACK_RAY_LENGTH: f32 = 14.0;

const RAY_STEPS: u32 = 10;
const HITBOX_GROWTH: f32 = 0.1;
const TELEPORT_GRACE_TICKS: i64 = 20;
const MAX_ROTATION_DELTA: f32 = 180.0;

/// What the proxy should do with the packet that was just validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Forward,
    Drop,
}

/// Everything the validator needs to judge one attack transaction. Entity
/// coordinates are feet positions; `rewound` is only present under full
/// combat authority.
#[derive(Debug, Clone)]
pub struct AttackContext {
    pub target: u64,
    pub client_tick: u64,
    pub eye_position: Vec3,
    pub prev_eye_position: Vec3,
    pub rotation: Vec3,
    pub input_mode: InputMode,
    pub attacker_ticks_since_teleport: i64,
    pub entity_position: Vec3,
    pub entity_prev_position: Vec3,
    pub entity_width: f32,
    pub entity_height: f32,
    pub entity_ticks_since_teleport: i64,
    pub rewound: Option<RewindSample>,
}

/// Raw geometry of an accepted attack, dispatched to detectors immediately.
#[derive(Debug, Clone)]
pub struct AttackSnapshot {
    pub client_tick: u64,
    pub target: u64,
    pub attack_position: Vec3,
    pub prev_attack_position: Vec3,
    pub rotation: Vec3,
    pub entity_position: Vec3,
    pub entity_prev_position: Vec3,
    pub entity_width: f32,
    pub entity_height: f32,
    /// Shortest eye-to-hitbox distance over both endpoints of both paths.
    pub closest_raw: f32,
    pub input_mode: InputMode,
}

/// Raycast outcome for an attack, produced once the input frame carrying the
/// attack rotation arrives.
#[derive(Debug, Clone)]
pub struct CombatResults {
    pub client_tick: u64,
    pub target: u64,
    pub closest_raw: f32,
    /// Intercept distances of the view ray against the target's hitbox along
    /// its path. `None` when the input mode is exempt from aim validation.
    pub hits: Option<Vec<f32>>,
    pub input_mode: InputMode,
}

pub struct AttackOutcome {
    pub verdict: Verdict,
    pub snapshot: Option<AttackSnapshot>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CombatPhase {
    Idle,
    /// Attack transaction seen, waiting for the input frame that carries the
    /// rotation it was aimed with.
    Pending,
    /// Raycasts done, results handed out, waiting for the tick to close.
    Ticked,
}

#[derive(Debug, Clone)]
struct PendingAttack {
    target: u64,
    client_tick: u64,
    attack_position: Vec3,
    prev_attack_position: Vec3,
    start_rotation: Vec3,
    entity_position: Vec3,
    entity_prev_position: Vec3,
    entity_width: f32,
    entity_height: f32,
    closest_raw: f32,
    input_mode: InputMode,
}

/// Validates attack transactions against where the target actually was. Under
/// full authority invalid attacks are dropped outright; under semi authority
/// the geometry is measured and handed to the detection layer.
pub struct CombatValidator {
    phase: CombatPhase,
    pending: Option<PendingAttack>,
    clicks: ClickTracker,
    full_authority: bool,
    reach_limit: f32,
}

impl CombatValidator {
    pub fn new(full_authority: bool, reach_limit: f32) -> Self {
        Self {
            phase: CombatPhase::Idle,
            pending: None,
            clicks: ClickTracker::new(),
            full_authority,
            reach_limit,
        }
    }

    pub fn is_clicking(&self) -> bool {
        self.clicks.is_clicking()
    }

    pub fn register_click(&mut self, client_tick: u64) -> ClickSnapshot {
        self.clicks.register(client_tick)
    }

    /// Handles an attack transaction. A freshly teleported position, on
    /// either side of the swing, is not a reliable window for hit
    /// validation; those attacks pass through unjudged.
    pub fn begin_attack(&mut self, ctx: AttackContext) -> AttackOutcome {
        if (0..=TELEPORT_GRACE_TICKS).contains(&ctx.entity_ticks_since_teleport)
            || ctx.attacker_ticks_since_teleport <= TELEPORT_GRACE_TICKS
        {
            return AttackOutcome {
                verdict: Verdict::Forward,
                snapshot: None,
            };
        }

        if self.full_authority {
            return self.judge_rewound(&ctx);
        }

        let closest_raw = closest_distance(
            ctx.eye_position,
            ctx.prev_eye_position,
            ctx.entity_position,
            ctx.entity_prev_position,
            ctx.entity_width,
            ctx.entity_height,
        );

        let snapshot = AttackSnapshot {
            client_tick: ctx.client_tick,
            target: ctx.target,
            attack_position: ctx.eye_position,
            prev_attack_position: ctx.prev_eye_position,
            rotation: ctx.rotation,
            entity_position: ctx.entity_position,
            entity_prev_position: ctx.entity_prev_position,
            entity_width: ctx.entity_width,
            entity_height: ctx.entity_height,
            closest_raw,
            input_mode: ctx.input_mode,
        };

        self.pending = Some(PendingAttack {
            target: ctx.target,
            client_tick: ctx.client_tick,
            attack_position: ctx.eye_position,
            prev_attack_position: ctx.prev_eye_position,
            start_rotation: ctx.rotation,
            entity_position: ctx.entity_position,
            entity_prev_position: ctx.entity_prev_position,
            entity_width: ctx.entity_width,
            entity_height: ctx.entity_height,
            closest_raw,
            input_mode: ctx.input_mode,
        });
        self.phase = CombatPhase::Pending;

        AttackOutcome {
            verdict: Verdict::Forward,
            snapshot: Some(snapshot),
        }
    }

    fn judge_rewound(&self, ctx: &AttackContext) -> AttackOutcome {
        // No sample for the claimed tick means the entity history cannot
        // confirm or deny the hit; let it through rather than punish lag.
        let Some(sample) = ctx.rewound else {
            return AttackOutcome {
                verdict: Verdict::Forward,
                snapshot: None,
            };
        };

        let distance = closest_distance(
            ctx.eye_position,
            ctx.prev_eye_position,
            sample.position,
            sample.prev_position,
            ctx.entity_width,
            ctx.entity_height,
        );

        let verdict = if distance > self.reach_limit {
            Verdict::Drop
        } else {
            Verdict::Forward
        };

        AttackOutcome {
            verdict,
            snapshot: None,
        }
    }

    /// Target of the attack staged this tick, if judgment is still waiting
    /// on its input frame.
    pub fn pending_target(&self) -> Option<u64> {
        match self.phase {
            CombatPhase::Pending => self.pending.as_ref().map(|p| p.target),
            _ => None,
        }
    }

    /// Consumes the staged attack once the input frame carrying its rotation
    /// arrives. `entity_now` is where the target's record stands by the time
    /// that frame lands, which may have interpolated past the staged path.
    /// A rotation that flipped half a circle between the transaction and the
    /// input is a replay artifact and discards the attack.
    pub fn on_input(
        &mut self,
        rotation: Vec3,
        entity_now: Option<(Vec3, Vec3)>,
    ) -> Option<CombatResults> {
        if self.phase != CombatPhase::Pending {
            return None;
        }
        let pending = self.pending.take()?;

        if (rotation - pending.start_rotation).length() >= MAX_ROTATION_DELTA {
            self.phase = CombatPhase::Idle;
            return None;
        }

        let hits = if pending.input_mode == InputMode::Touch {
            None
        } else {
            Some(trace_attack(&pending, rotation, entity_now))
        };

        self.phase = CombatPhase::Ticked;
        Some(CombatResults {
            client_tick: pending.client_tick,
            target: pending.target,
            closest_raw: pending.closest_raw,
            hits,
            input_mode: pending.input_mode,
        })
    }

    /// Closes the combat tick: resolved attacks are forgotten and the click
    /// state settles.
    pub fn settle_tick(&mut self) {
        if self.phase == CombatPhase::Ticked {
            self.phase = CombatPhase::Idle;
        }
        self.clicks.settle();
    }

    pub fn reset(&mut self) {
        self.phase = CombatPhase::Idle;
        self.pending = None;
        self.clicks.reset();
    }
}

/// Shortest point-to-hitbox distance across both endpoints of the attacker's
/// and the target's last move.
fn closest_distance(
    eye: Vec3,
    prev_eye: Vec3,
    entity_position: Vec3,
    entity_prev_position: Vec3,
    width: f32,
    height: f32,
) -> f32 {
    let current = Aabb::from_base_size(entity_position, width, height).grow(HITBOX_GROWTH);
    let previous = Aabb::from_base_size(entity_prev_position, width, height).grow(HITBOX_GROWTH);

    let mut closest = f32::MAX;
    for bb in [&current, &previous] {
        for origin in [eye, prev_eye] {
            closest = closest.min(bb.distance_to_point(origin));
        }
    }
    closest
}

/// Traces the view ray against the target's hitbox, walking the attacker's
/// eye, the aim rotation, and the hitbox along the paths both sides took
/// over the attack window. Every step is rayed twice, once against the
/// staged entity path and once against the path its record holds now.
fn trace_attack(
    pending: &PendingAttack,
    end_rotation: Vec3,
    entity_now: Option<(Vec3, Vec3)>,
) -> Vec<f32> {
    let (now_prev, now_pos) =
        entity_now.unwrap_or((pending.entity_prev_position, pending.entity_position));

    let mut hits = Vec::new();
    for step in 0..=RAY_STEPS {
        let alpha = step as f32 / RAY_STEPS as f32;
        let attack_position = pending
            .prev_attack_position
            .lerp(pending.attack_position, alpha);
        let rotation = pending.start_rotation.lerp(end_rotation, alpha);
        let direction = direction_vector(rotation.z, rotation.x) * ATTACK_RAY_LENGTH;

        let staged = Aabb::from_base_size(
            pending
                .entity_prev_position
                .lerp(pending.entity_position, alpha),
            pending.entity_width,
            pending.entity_height,
        )
        .grow(HITBOX_GROWTH);
        if let Some(distance) = staged.ray_intercept(attack_position, direction) {
            hits.push(distance);
        }

        let current = Aabb::from_base_size(
            now_prev.lerp(now_pos, alpha),
            pending.entity_width,
            pending.entity_height,
        )
        .grow(HITBOX_GROWTH);
        if let Some(distance) = current.ray_intercept(attack_position, direction) {
            hits.push(distance);
        }
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_at(entity_z: f32) -> AttackContext {
        AttackContext {
            target: 7,
            client_tick: 100,
            eye_position: Vec3::new(0.0, 1.62, 0.0),
            prev_eye_position: Vec3::new(0.0, 1.62, 0.0),
            rotation: Vec3::ZERO,
            input_mode: InputMode::Mouse,
            attacker_ticks_since_teleport: 200,
            entity_position: Vec3::new(0.0, 0.0, entity_z),
            entity_prev_position: Vec3::new(0.0, 0.0, entity_z),
            entity_width: 0.6,
            entity_height: 1.8,
            entity_ticks_since_teleport: 200,
            rewound: None,
        }
    }

    #[test]
    fn attack_then_input_produces_results() {
        let mut validator = CombatValidator::new(false, 3.0);
        let outcome = validator.begin_attack(context_at(3.0));
        assert_eq!(outcome.verdict, Verdict::Forward);
        let snapshot = outcome.snapshot.unwrap();
        assert!((snapshot.closest_raw - 2.6).abs() < 1e-5);

        let results = validator.on_input(Vec3::ZERO, None).unwrap();
        let hits = results.hits.unwrap();
        assert!(!hits.is_empty());
        let min = hits.iter().cloned().fold(f32::MAX, f32::min);
        assert!((min - 2.6).abs() < 1e-4, "nearest intercept {}", min);
    }

    #[test]
    fn aim_far_off_target_yields_no_hits() {
        let mut validator = CombatValidator::new(false, 3.0);
        let mut ctx = context_at(3.0);
        // looking straight behind the target for the whole window
        ctx.rotation = Vec3::new(0.0, 0.0, 179.0);
        validator.begin_attack(ctx);

        let results = validator
            .on_input(Vec3::new(0.0, 0.0, 179.0), None)
            .unwrap();
        assert!(results.hits.unwrap().is_empty());
    }

    #[test]
    fn resolution_entity_path_is_rayed_too() {
        let mut validator = CombatValidator::new(false, 3.0);
        // staged path sits off to the side of the view ray
        let mut ctx = context_at(3.0);
        ctx.entity_position = Vec3::new(2.0, 0.0, 3.0);
        ctx.entity_prev_position = Vec3::new(2.0, 0.0, 3.0);
        validator.begin_attack(ctx);

        // by the input frame the record has the target dead ahead
        let now = (Vec3::new(0.0, 0.0, 3.0), Vec3::new(0.0, 0.0, 3.0));
        let results = validator.on_input(Vec3::ZERO, Some(now)).unwrap();
        let hits = results.hits.unwrap();
        let min = hits.iter().cloned().fold(f32::MAX, f32::min);
        assert!((min - 2.6).abs() < 1e-4, "nearest intercept {}", min);
    }

    #[test]
    fn touch_input_is_exempt_from_aim_checks() {
        let mut validator = CombatValidator::new(false, 3.0);
        let mut ctx = context_at(3.0);
        ctx.input_mode = InputMode::Touch;
        validator.begin_attack(ctx);

        let results = validator.on_input(Vec3::ZERO, None).unwrap();
        assert!(results.hits.is_none());
    }

    #[test]
    fn half_circle_rotation_discards_the_attack() {
        let mut validator = CombatValidator::new(false, 3.0);
        validator.begin_attack(context_at(3.0));

        let results = validator.on_input(Vec3::new(0.0, 0.0, 185.0), None);
        assert!(results.is_none());
        // the staged attack is gone
        assert!(validator.on_input(Vec3::ZERO, None).is_none());
    }

    #[test]
    fn recently_teleported_targets_pass_unjudged() {
        let mut validator = CombatValidator::new(false, 3.0);
        let mut ctx = context_at(3.0);
        ctx.entity_ticks_since_teleport = 5;

        let outcome = validator.begin_attack(ctx);
        assert_eq!(outcome.verdict, Verdict::Forward);
        assert!(outcome.snapshot.is_none());
        assert!(validator.on_input(Vec3::ZERO, None).is_none());
    }

    #[test]
    fn recently_teleported_attackers_pass_unjudged() {
        let mut validator = CombatValidator::new(false, 3.0);
        let mut ctx = context_at(3.0);
        ctx.attacker_ticks_since_teleport = 12;

        let outcome = validator.begin_attack(ctx);
        assert_eq!(outcome.verdict, Verdict::Forward);
        assert!(outcome.snapshot.is_none());
    }

    #[test]
    fn full_authority_drops_attacks_beyond_reach() {
        let mut validator = CombatValidator::new(true, 3.0);
        let mut ctx = context_at(8.0);
        ctx.rewound = Some(RewindSample {
            position: Vec3::new(0.0, 0.0, 8.0),
            prev_position: Vec3::new(0.0, 0.0, 8.0),
        });

        let outcome = validator.begin_attack(ctx);
        assert_eq!(outcome.verdict, Verdict::Drop);
    }

    #[test]
    fn full_authority_accepts_attacks_where_the_target_was() {
        let mut validator = CombatValidator::new(true, 3.0);
        let mut ctx = context_at(8.0);
        // the rewind shows the target used to be in range
        ctx.rewound = Some(RewindSample {
            position: Vec3::new(0.0, 0.0, 2.5),
            prev_position: Vec3::new(0.0, 0.0, 2.4),
        });

        let outcome = validator.begin_attack(ctx);
        assert_eq!(outcome.verdict, Verdict::Forward);
    }

    #[test]
    fn full_authority_without_history_forwards() {
        let mut validator = CombatValidator::new(true, 3.0);
        let outcome = validator.begin_attack(context_at(9.0));
        assert_eq!(outcome.verdict, Verdict::Forward);
    }

    #[test]
    fn settle_closes_the_resolved_phase() {
        let mut validator = CombatValidator::new(false, 3.0);
        validator.begin_attack(context_at(3.0));
        validator.register_click(100);
        assert!(validator.is_clicking());

        validator.on_input(Vec3::ZERO, None).unwrap();
        validator.settle_tick();
        assert!(!validator.is_clicking());
        assert!(validator.on_input(Vec3::ZERO, None).is_none());
    }
}
