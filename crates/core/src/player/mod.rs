mod effects;
mod movement;
mod state;

pub use effects::{
    DEFAULT_JUMP_VELOCITY, Effect, EffectModifiers, EffectTable, NORMAL_GRAVITY,
    SLOW_FALLING_GRAVITY,
};
pub use movement::MovementTracker;
pub use state::{
    EYE_HEIGHT, MovementSnapshot, MovementState, PLAYER_HEIGHT, PLAYER_WIDTH, SNEAK_EYE_HEIGHT,
    STEP_HEIGHT, TELEPORT_Y_NUDGE, eye_height,
};
