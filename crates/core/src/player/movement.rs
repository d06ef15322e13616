use glam::Vec3;

use crate::config::AuthorityMode;
use crate::net::{InputCommand, InputFlags};
use crate::physics::{Aabb, BlockWorld};

use super::effects::EffectModifiers;
use super::state::{EYE_HEIGHT, MovementSnapshot, MovementState, STEP_HEIGHT, TELEPORT_Y_NUDGE};

const GROUND_SLIPPERINESS: f32 = 0.6;
const AIR_DRAG: f32 = 0.91;
const VERTICAL_DRAG: f32 = 0.98;
const GROUND_ACCEL_BASE: f32 = 0.16277136;
const AIR_ACCEL: f32 = 0.02;
const SPRINT_AIR_ACCEL: f32 = 0.026;
const SPRINT_SPEED_MULTIPLIER: f32 = 1.3;
const SPRINT_JUMP_BOOST: f32 = 0.2;
const STEP_CLIP_DECAY: f32 = 0.4;

struct MoveResult {
    motion: Vec3,
    collided_x: bool,
    collided_y: bool,
    collided_z: bool,
}

/// Axis-separated collision clip, Y first so the player lands before walls
/// shorten the horizontal axes.
fn clip_motion(world: &dyn BlockWorld, start: &Aabb, requested: Vec3) -> MoveResult {
    let boxes = world.collision_boxes(&start.extend(requested).grow(1e-4));
    let mut dx = requested.x;
    let mut dy = requested.y;
    let mut dz = requested.z;

    let mut moving = *start;
    for b in &boxes {
        dy = b.clip_y_offset(&moving, dy);
    }
    moving = moving.translate(Vec3::new(0.0, dy, 0.0));
    for b in &boxes {
        dx = b.clip_x_offset(&moving, dx);
    }
    moving = moving.translate(Vec3::new(dx, 0.0, 0.0));
    for b in &boxes {
        dz = b.clip_z_offset(&moving, dz);
    }

    MoveResult {
        motion: Vec3::new(dx, dy, dz),
        collided_x: (dx - requested.x).abs() > 1e-7,
        collided_y: (dy - requested.y).abs() > 1e-7,
        collided_z: (dz - requested.z).abs() > 1e-7,
    }
}

/// Replays every client input through the authoritative movement model and
/// decides, per authority mode, whose view of the player wins.
pub struct MovementTracker {
    state: MovementState,
    authority: AuthorityMode,
    acceptance_threshold: f32,
}

impl MovementTracker {
    pub fn new(authority: AuthorityMode, acceptance_threshold: f32) -> Self {
        Self {
            state: MovementState::default(),
            authority,
            acceptance_threshold,
        }
    }

    pub fn state(&self) -> &MovementState {
        &self.state
    }

    pub fn authority(&self) -> AuthorityMode {
        self.authority
    }

    pub fn set_authority(&mut self, authority: AuthorityMode) {
        self.authority = authority;
    }

    pub fn set_movement_speed(&mut self, speed: f32) {
        self.state.movement_speed = speed;
    }

    pub fn set_immobile(&mut self, immobile: bool) {
        self.state.immobile = immobile;
    }

    pub fn set_knockback(&mut self, motion: Vec3) {
        self.state.pending_knockback = Some(motion);
    }

    pub fn correction_acknowledged(&mut self) {
        self.state.outgoing_corrections = self.state.outgoing_corrections.saturating_sub(1);
    }

    /// Moves the authoritative position to a server teleport target. The
    /// target arrives eye-relative; the simulation keeps feet coordinates,
    /// nudged up slightly so the client's first fall tick settles cleanly.
    pub fn teleport(&mut self, eye_position: Vec3, on_ground: bool) {
        let s = &mut self.state;
        let target =
            eye_position - Vec3::new(0.0, EYE_HEIGHT, 0.0) + Vec3::new(0.0, TELEPORT_Y_NUDGE, 0.0);
        s.position = target;
        s.prev_position = target;
        s.client_position = target;
        s.prev_client_position = target;
        s.velocity = Vec3::ZERO;
        s.on_ground = on_ground;
        s.teleporting = true;
        s.ticks_since_teleport = 0;
        s.pending_knockback = None;
        s.step_clip_offset = 0.0;
    }

    pub fn reset(&mut self) {
        self.state = MovementState::default();
    }

    /// Runs one client input through the simulation and returns the frozen
    /// view the detection layer consumes. The snapshot always carries the
    /// simulated result; rebasing onto the client's view happens after.
    pub fn process_input(
        &mut self,
        command: &InputCommand,
        modifiers: EffectModifiers,
        world: &dyn BlockWorld,
        client_tick: u64,
        allow_missed_swing: bool,
    ) -> MovementSnapshot {
        let flags = command.flags();
        let s = &mut self.state;

        s.prev_rotation = s.rotation;
        s.rotation = Vec3::new(command.pitch, command.head_yaw, command.yaw);
        s.input_mode = command.input_mode;

        s.prev_client_position = s.client_position;
        s.client_position = Vec3::from(command.position) - Vec3::new(0.0, EYE_HEIGHT, 0.0);
        s.client_velocity = s.client_position - s.prev_client_position;

        if flags.contains(InputFlags::START_SPRINT) {
            s.sprinting = true;
        }
        if flags.contains(InputFlags::STOP_SPRINT) {
            s.sprinting = false;
        }
        if flags.contains(InputFlags::START_SNEAK) {
            s.sneaking = true;
        }
        if flags.contains(InputFlags::STOP_SNEAK) {
            s.sneaking = false;
        }
        if flags.contains(InputFlags::START_FLYING) {
            s.flying = true;
        }
        if flags.contains(InputFlags::STOP_FLYING) {
            s.flying = false;
        }

        if s.ticks_since_teleport >= 0 {
            s.ticks_since_teleport += 1;
        }
        if s.ticks_since_knockback >= 0 {
            s.ticks_since_knockback += 1;
        }

        if s.teleporting && s.client_position.distance(s.position) < self.acceptance_threshold {
            s.teleporting = false;
        }

        let knockback_applied = s.pending_knockback.take();
        if let Some(k) = knockback_applied {
            s.velocity = k;
            s.ticks_since_knockback = 0;
        }

        let exempt = s.teleporting || s.immobile || s.flying || !world.is_loaded(s.position);
        let jump_pressed = flags.contains(InputFlags::START_JUMP);
        let missed_swing = allow_missed_swing && flags.contains(InputFlags::MISSED_SWING);

        let mut collided_horizontally = false;
        let mut collided_vertically = false;

        if s.teleporting {
            // Hold at the target until the client arrives.
            s.prev_position = s.position;
            s.velocity = Vec3::ZERO;
            s.off_ground_ticks = 0;
        } else if exempt {
            s.prev_position = s.position;
            s.position = s.client_position;
            s.velocity = s.client_velocity;
            s.off_ground_ticks = 0;
        } else {
            let (h, v) = self.step_physics(command, &modifiers, world, jump_pressed);
            collided_horizontally = h;
            collided_vertically = v;
        }

        let s = &mut self.state;
        let simulated_position = s.position;
        let simulated_prev = s.prev_position;
        let simulated_velocity = s.velocity;
        let deviation = s.client_position - s.position;

        let mut correction = None;
        if !exempt {
            match self.authority {
                AuthorityMode::Client | AuthorityMode::Semi => {
                    Self::rebase_on_client(s, &modifiers);
                }
                AuthorityMode::Full => {
                    if deviation.length() <= self.acceptance_threshold {
                        Self::rebase_on_client(s, &modifiers);
                    } else if s.outgoing_corrections == 0 {
                        correction = Some(simulated_position);
                        s.outgoing_corrections += 1;
                    }
                }
            }
        }

        MovementSnapshot {
            client_tick,
            position: simulated_position,
            prev_position: simulated_prev,
            client_position: s.client_position,
            prev_client_position: s.prev_client_position,
            velocity: simulated_velocity,
            client_velocity: s.client_velocity,
            rotation: s.rotation,
            prev_rotation: s.prev_rotation,
            deviation,
            on_ground: s.on_ground,
            flags,
            input_mode: command.input_mode,
            off_ground_ticks: s.off_ground_ticks,
            step_clip_offset: s.step_clip_offset,
            outgoing_corrections: s.outgoing_corrections,
            ticks_since_teleport: s.ticks_since_teleport,
            ticks_since_knockback: s.ticks_since_knockback,
            knockback_applied,
            collided_vertically,
            collided_horizontally,
            exempt,
            jump_pressed,
            missed_swing,
            movement_authority: self.authority,
            correction,
        }
    }

    /// Restarts the simulation from the client's accepted view, with end of
    /// tick drag applied so next tick's prediction chains correctly.
    fn rebase_on_client(s: &mut MovementState, modifiers: &EffectModifiers) {
        s.position = s.client_position;
        let mut v = s.client_velocity;
        v.y = (v.y - modifiers.gravity) * VERTICAL_DRAG;
        let friction = AIR_DRAG * if s.on_ground { GROUND_SLIPPERINESS } else { 1.0 };
        v.x *= friction;
        v.z *= friction;
        s.velocity = v;
    }

    fn step_physics(
        &mut self,
        command: &InputCommand,
        modifiers: &EffectModifiers,
        world: &dyn BlockWorld,
        jump_pressed: bool,
    ) -> (bool, bool) {
        let s = &mut self.state;

        s.step_clip_offset *= STEP_CLIP_DECAY;
        if s.step_clip_offset < 1e-4 {
            s.step_clip_offset = 0.0;
        }

        if jump_pressed && s.on_ground {
            s.velocity.y = modifiers.jump_velocity;
            if s.sprinting {
                let yaw = s.rotation.z.to_radians();
                s.velocity.x += -yaw.sin() * SPRINT_JUMP_BOOST;
                s.velocity.z += yaw.cos() * SPRINT_JUMP_BOOST;
            }
        }

        let accel = if s.on_ground {
            let speed = modifiers.movement_speed
                * if s.sprinting { SPRINT_SPEED_MULTIPLIER } else { 1.0 };
            speed * GROUND_ACCEL_BASE / (AIR_DRAG * GROUND_SLIPPERINESS).powi(3)
        } else if s.sprinting {
            SPRINT_AIR_ACCEL
        } else {
            AIR_ACCEL
        };

        let strafe = command.move_vector[0];
        let forward = command.move_vector[1];
        let input_sq = strafe * strafe + forward * forward;
        if input_sq >= 1e-4 {
            let scale = accel / input_sq.sqrt().max(1.0);
            let si = strafe * scale;
            let fo = forward * scale;
            let yaw = s.rotation.z.to_radians();
            s.velocity.x += si * yaw.cos() - fo * yaw.sin();
            s.velocity.z += fo * yaw.cos() + si * yaw.sin();
        }

        let bb = s.bounding_box();
        let requested = s.velocity;
        let first = clip_motion(world, &bb, requested);

        let mut applied = first.motion;
        let mut collided_x = first.collided_x;
        let mut collided_y = first.collided_y;
        let mut collided_z = first.collided_z;
        let mut grounded = first.collided_y && requested.y < 0.0;

        if (first.collided_x || first.collided_z) && (s.on_ground || grounded) {
            let up = clip_motion(world, &bb, Vec3::new(requested.x, STEP_HEIGHT, requested.z));
            let raised = bb.translate(up.motion);
            let down = clip_motion(world, &raised, Vec3::new(0.0, -STEP_HEIGHT, 0.0));
            let stepped = up.motion + down.motion;

            let stepped_sq = stepped.x * stepped.x + stepped.z * stepped.z;
            let flat_sq = applied.x * applied.x + applied.z * applied.z;
            if stepped_sq > flat_sq {
                applied = stepped;
                collided_x = up.collided_x;
                collided_z = up.collided_z;
                collided_y = down.collided_y;
                grounded = down.collided_y;
                if applied.y > 0.0 {
                    s.step_clip_offset += applied.y;
                }
            }
        }

        s.prev_position = s.position;
        s.position += applied;
        s.on_ground = grounded;
        s.off_ground_ticks = if grounded { 0 } else { s.off_ground_ticks + 1 };

        if collided_x {
            s.velocity.x = 0.0;
        }
        if collided_y {
            s.velocity.y = 0.0;
        }
        if collided_z {
            s.velocity.z = 0.0;
        }

        s.velocity.y = (s.velocity.y - modifiers.gravity) * VERTICAL_DRAG;
        let friction = AIR_DRAG * if grounded { GROUND_SLIPPERINESS } else { 1.0 };
        s.velocity.x *= friction;
        s.velocity.z *= friction;

        (collided_x || collided_z, collided_y)
    }
}
