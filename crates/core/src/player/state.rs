use glam::Vec3;

use crate::config::AuthorityMode;
use crate::net::{InputFlags, InputMode};
use crate::physics::Aabb;

pub const EYE_HEIGHT: f32 = 1.62;
pub const SNEAK_EYE_HEIGHT: f32 = 1.54;
pub const TELEPORT_Y_NUDGE: f32 = 5e-3;
pub const PLAYER_WIDTH: f32 = 0.6;
pub const PLAYER_HEIGHT: f32 = 1.8;
pub const STEP_HEIGHT: f32 = 0.6;

pub fn eye_height(sneaking: bool) -> f32 {
    if sneaking { SNEAK_EYE_HEIGHT } else { EYE_HEIGHT }
}

/// Live simulation state for the session's own player. The tracker mutates
/// this in place every input; [`MovementSnapshot`] is the frozen view handed
/// to detectors.
#[derive(Debug, Clone)]
pub struct MovementState {
    /// Authoritative feet position after the last simulation step.
    pub position: Vec3,
    pub prev_position: Vec3,
    /// Feet position as the client reported it, eye offset already removed.
    pub client_position: Vec3,
    pub prev_client_position: Vec3,
    pub velocity: Vec3,
    pub client_velocity: Vec3,
    /// x = pitch, y = head yaw, z = yaw, all in degrees.
    pub rotation: Vec3,
    pub prev_rotation: Vec3,
    pub input_mode: InputMode,
    pub movement_speed: f32,
    pub on_ground: bool,
    pub sprinting: bool,
    pub sneaking: bool,
    pub flying: bool,
    pub immobile: bool,
    pub teleporting: bool,
    /// -1 until the first teleport, then ticks elapsed since it.
    pub ticks_since_teleport: i64,
    pub ticks_since_knockback: i64,
    pub off_ground_ticks: u32,
    /// Residual upward offset from stepping onto a block, decayed each tick.
    pub step_clip_offset: f32,
    /// Corrections sent but not yet acknowledged by the client.
    pub outgoing_corrections: u32,
    pub pending_knockback: Option<Vec3>,
}

impl Default for MovementState {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            prev_position: Vec3::ZERO,
            client_position: Vec3::ZERO,
            prev_client_position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            client_velocity: Vec3::ZERO,
            rotation: Vec3::ZERO,
            prev_rotation: Vec3::ZERO,
            input_mode: InputMode::Mouse,
            movement_speed: 0.1,
            on_ground: false,
            sprinting: false,
            sneaking: false,
            flying: false,
            immobile: false,
            teleporting: false,
            ticks_since_teleport: -1,
            ticks_since_knockback: -1,
            off_ground_ticks: 0,
            step_clip_offset: 0.0,
            outgoing_corrections: 0,
            pending_knockback: None,
        }
    }
}

impl MovementState {
    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_base_size(self.position, PLAYER_WIDTH, PLAYER_HEIGHT)
    }

    pub fn eye_position(&self) -> Vec3 {
        self.position + Vec3::new(0.0, eye_height(self.sneaking), 0.0)
    }
}

/// Everything the detection layer sees about one processed input.
#[derive(Debug, Clone)]
pub struct MovementSnapshot {
    pub client_tick: u64,
    pub position: Vec3,
    pub prev_position: Vec3,
    pub client_position: Vec3,
    pub prev_client_position: Vec3,
    pub velocity: Vec3,
    pub client_velocity: Vec3,
    /// x = pitch, y = head yaw, z = yaw, degrees.
    pub rotation: Vec3,
    pub prev_rotation: Vec3,
    /// client position minus simulated position, taken before any rebase.
    pub deviation: Vec3,
    pub on_ground: bool,
    pub flags: InputFlags,
    pub input_mode: InputMode,
    pub off_ground_ticks: u32,
    pub step_clip_offset: f32,
    pub outgoing_corrections: u32,
    pub ticks_since_teleport: i64,
    pub ticks_since_knockback: i64,
    /// Knockback consumed by this very input, if any.
    pub knockback_applied: Option<Vec3>,
    pub collided_vertically: bool,
    pub collided_horizontally: bool,
    /// Set while the simulation cannot be trusted (immobile, flying,
    /// standing in unloaded terrain).
    pub exempt: bool,
    pub jump_pressed: bool,
    pub missed_swing: bool,
    pub movement_authority: AuthorityMode,
    /// Correction the session must send for this input, if one was issued.
    pub correction: Option<Vec3>,
}
