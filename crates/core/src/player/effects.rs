use std::collections::HashMap;

use crate::net::{EffectKind, EffectOperation};

pub const NORMAL_GRAVITY: f32 = 0.08;
pub const SLOW_FALLING_GRAVITY: f32 = 0.01;
pub const DEFAULT_JUMP_VELOCITY: f32 = 0.42;

/// Physics inputs for one simulation step, recomputed from the base values
/// and the active effect table every time. Nothing here accumulates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectModifiers {
    pub movement_speed: f32,
    pub gravity: f32,
    pub jump_velocity: f32,
}

impl EffectModifiers {
    pub fn base(movement_speed: f32) -> Self {
        Self {
            movement_speed,
            gravity: NORMAL_GRAVITY,
            jump_velocity: DEFAULT_JUMP_VELOCITY,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Effect {
    /// One-based strength, so amplifier 0 on the wire is level 1.
    pub level: u8,
    pub duration_ticks: i32,
}

/// Active status effects on the session's own player.
#[derive(Debug, Default)]
pub struct EffectTable {
    effects: HashMap<EffectKind, Effect>,
}

impl EffectTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&mut self, kind: EffectKind, operation: EffectOperation, amplifier: u8, duration_ticks: i32) {
        match operation {
            EffectOperation::Add | EffectOperation::Modify => {
                self.effects.insert(
                    kind,
                    Effect {
                        level: amplifier.saturating_add(1),
                        duration_ticks,
                    },
                );
            }
            EffectOperation::Remove => {
                self.effects.remove(&kind);
            }
        }
    }

    pub fn get(&self, kind: EffectKind) -> Option<Effect> {
        self.effects.get(&kind).copied()
    }

    /// Counts durations down one tick and drops whatever expired.
    pub fn tick(&mut self) {
        for effect in self.effects.values_mut() {
            effect.duration_ticks -= 1;
        }
        self.effects.retain(|_, effect| effect.duration_ticks > 0);
    }

    pub fn modifiers(&self, base_movement_speed: f32) -> EffectModifiers {
        let mut modifiers = EffectModifiers::base(base_movement_speed);
        for (kind, effect) in &self.effects {
            let level = f32::from(effect.level);
            match kind {
                EffectKind::Speed => modifiers.movement_speed += 0.02 * level,
                EffectKind::Slowness => modifiers.movement_speed -= 0.015 * level,
                EffectKind::JumpBoost => {
                    modifiers.jump_velocity = DEFAULT_JUMP_VELOCITY + level / 10.0
                }
                EffectKind::SlowFalling => modifiers.gravity = SLOW_FALLING_GRAVITY,
            }
        }
        modifiers.movement_speed = modifiers.movement_speed.max(0.0);
        modifiers
    }

    pub fn clear(&mut self) {
        self.effects.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_and_slowness_stack() {
        let mut table = EffectTable::new();
        table.handle(EffectKind::Speed, EffectOperation::Add, 1, 100);
        table.handle(EffectKind::Slowness, EffectOperation::Add, 0, 100);

        let m = table.modifiers(0.1);
        // speed II adds 0.04, slowness I removes 0.015
        assert!((m.movement_speed - 0.125).abs() < 1e-6);
        assert_eq!(m.gravity, NORMAL_GRAVITY);
    }

    #[test]
    fn jump_boost_raises_jump_velocity() {
        let mut table = EffectTable::new();
        table.handle(EffectKind::JumpBoost, EffectOperation::Add, 1, 100);

        let m = table.modifiers(0.1);
        assert!((m.jump_velocity - 0.62).abs() < 1e-6);
    }

    #[test]
    fn slow_falling_swaps_gravity() {
        let mut table = EffectTable::new();
        table.handle(EffectKind::SlowFalling, EffectOperation::Add, 0, 100);

        assert_eq!(table.modifiers(0.1).gravity, SLOW_FALLING_GRAVITY);
    }

    #[test]
    fn effects_expire_after_duration() {
        let mut table = EffectTable::new();
        table.handle(EffectKind::Speed, EffectOperation::Add, 0, 3);

        for _ in 0..2 {
            table.tick();
            assert!(table.get(EffectKind::Speed).is_some());
        }
        table.tick();
        assert!(table.get(EffectKind::Speed).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn remove_operation_clears_effect() {
        let mut table = EffectTable::new();
        table.handle(EffectKind::Speed, EffectOperation::Add, 0, 100);
        table.handle(EffectKind::Speed, EffectOperation::Remove, 0, 0);
        assert!(table.get(EffectKind::Speed).is_none());
    }
}
