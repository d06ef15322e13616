use std::collections::HashMap;

use glam::Vec3;

use crate::physics::Aabb;
use crate::player::EYE_HEIGHT;

use super::rewind::{RewindBuffer, RewindSample};

/// Ticks a non-teleport move is spread over before the entity settles on the
/// new position, mirroring the client's own render interpolation.
const INTERPOLATION_TICKS: u32 = 3;

#[derive(Debug, Clone, Copy)]
struct MoveTarget {
    position: Vec3,
    remaining: u32,
}

/// Server-side view of one entity near the player. Player entities report
/// positions eye-relative on the wire; the record keeps feet coordinates.
#[derive(Debug)]
pub struct Entity {
    pub position: Vec3,
    pub prev_position: Vec3,
    pub width: f32,
    pub height: f32,
    pub is_player: bool,
    /// Ticks since the entity last teleported. Spawning counts.
    pub ticks_since_teleport: i64,
    target: Option<MoveTarget>,
    history: RewindBuffer,
}

impl Entity {
    pub fn new(
        raw_position: Vec3,
        width: f32,
        height: f32,
        is_player: bool,
        rewind_capacity: usize,
    ) -> Self {
        let position = Self::intake(raw_position, is_player);
        Self {
            position,
            prev_position: position,
            width,
            height,
            is_player,
            ticks_since_teleport: 0,
            target: None,
            history: RewindBuffer::new(rewind_capacity),
        }
    }

    fn intake(raw_position: Vec3, is_player: bool) -> Vec3 {
        if is_player {
            raw_position - Vec3::new(0.0, EYE_HEIGHT, 0.0)
        } else {
            raw_position
        }
    }

    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_base_size(self.position, self.width, self.height)
    }

    /// Applies a server move. Teleports snap and restart the teleport timer;
    /// interpolated moves settle over the next few ticks.
    pub fn update_position(&mut self, raw_position: Vec3, teleport: bool, interpolate: bool) {
        let position = Self::intake(raw_position, self.is_player);
        if teleport {
            self.position = position;
            self.prev_position = position;
            self.target = None;
            self.ticks_since_teleport = 0;
        } else if interpolate {
            self.target = Some(MoveTarget {
                position,
                remaining: INTERPOLATION_TICKS,
            });
        } else {
            self.prev_position = self.position;
            self.position = position;
            self.target = None;
        }
    }

    /// Advances one server tick: steps any pending interpolation and commits
    /// the result to the rewind history.
    pub fn tick(&mut self, server_tick: u64) {
        self.ticks_since_teleport += 1;

        if let Some(target) = &mut self.target {
            self.prev_position = self.position;
            self.position += (target.position - self.position) / target.remaining as f32;
            target.remaining -= 1;
            if target.remaining == 0 {
                self.position = target.position;
                self.target = None;
            }
        } else {
            self.prev_position = self.position;
        }

        self.history.commit(
            server_tick,
            RewindSample {
                position: self.position,
                prev_position: self.prev_position,
            },
        );
    }

    pub fn rewind(&self, tick: u64) -> Option<RewindSample> {
        self.history.at(tick)
    }
}

/// All entities currently visible to one session, keyed by runtime id.
#[derive(Debug, Default)]
pub struct EntityTracker {
    entities: HashMap<u64, Entity>,
    rewind_capacity: usize,
}

impl EntityTracker {
    pub fn new(rewind_capacity: usize) -> Self {
        Self {
            entities: HashMap::new(),
            rewind_capacity,
        }
    }

    pub fn add(&mut self, runtime_id: u64, raw_position: Vec3, width: f32, height: f32, is_player: bool) {
        self.entities.insert(
            runtime_id,
            Entity::new(raw_position, width, height, is_player, self.rewind_capacity),
        );
    }

    pub fn remove(&mut self, runtime_id: u64) {
        self.entities.remove(&runtime_id);
    }

    pub fn get(&self, runtime_id: u64) -> Option<&Entity> {
        self.entities.get(&runtime_id)
    }

    pub fn get_mut(&mut self, runtime_id: u64) -> Option<&mut Entity> {
        self.entities.get_mut(&runtime_id)
    }

    pub fn tick(&mut self, server_tick: u64) {
        for entity in self.entities.values_mut() {
            entity.tick(server_tick);
        }
    }

    pub fn clear(&mut self) {
        self.entities.clear();
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
