use std::collections::{HashMap, HashSet};

use glam::{IVec3, Vec3};

use super::math::Aabb;

/// Identifier of a block within the embedder's palette. Zero is air.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub u32);

impl BlockId {
    pub const AIR: BlockId = BlockId(0);

    pub fn is_air(&self) -> bool {
        self.0 == 0
    }
}

/// Collision-side view of the chunk store the embedding proxy maintains.
///
/// `block_at` returning `None` means the containing chunk column is not
/// loaded. Movement validation treats positions in unloaded columns as
/// exempt rather than guessing at geometry.
pub trait BlockWorld: Send + Sync {
    fn block_at(&self, pos: IVec3) -> Option<BlockId>;

    /// All solid collision boxes intersecting `volume`.
    fn collision_boxes(&self, volume: &Aabb) -> Vec<Aabb>;

    fn is_loaded(&self, position: Vec3) -> bool {
        self.block_at(IVec3::new(
            position.x.floor() as i32,
            position.y.floor() as i32,
            position.z.floor() as i32,
        ))
        .is_some()
    }
}

/// In-memory block store used by the harness and tests. Full cubes only,
/// which is all the validation paths need.
#[derive(Debug, Default)]
pub struct MemoryWorld {
    blocks: HashMap<IVec3, BlockId>,
    loaded_columns: HashSet<(i32, i32)>,
}

impl MemoryWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flat platform of stone-like blocks at `floor_y`, spanning
    /// `-half_extent..=half_extent` on both horizontal axes.
    pub fn flat(half_extent: i32, floor_y: i32) -> Self {
        let mut world = Self::new();
        world.fill(
            IVec3::new(-half_extent, floor_y, -half_extent),
            IVec3::new(half_extent, floor_y, half_extent),
            BlockId(1),
        );
        world
    }

    pub fn load_column(&mut self, column_x: i32, column_z: i32) {
        self.loaded_columns.insert((column_x, column_z));
    }

    pub fn set_block(&mut self, pos: IVec3, block: BlockId) {
        self.load_column(pos.x >> 4, pos.z >> 4);
        if block.is_air() {
            self.blocks.remove(&pos);
        } else {
            self.blocks.insert(pos, block);
        }
    }

    pub fn fill(&mut self, min: IVec3, max: IVec3, block: BlockId) {
        for x in min.x..=max.x {
            for y in min.y..=max.y {
                for z in min.z..=max.z {
                    self.set_block(IVec3::new(x, y, z), block);
                }
            }
        }
    }
}

impl BlockWorld for MemoryWorld {
    fn block_at(&self, pos: IVec3) -> Option<BlockId> {
        if !self.loaded_columns.contains(&(pos.x >> 4, pos.z >> 4)) {
            return None;
        }
        Some(self.blocks.get(&pos).copied().unwrap_or(BlockId::AIR))
    }

    fn collision_boxes(&self, volume: &Aabb) -> Vec<Aabb> {
        let mut boxes = Vec::new();
        for x in volume.min.x.floor() as i32..=volume.max.x.ceil() as i32 {
            for y in volume.min.y.floor() as i32..=volume.max.y.ceil() as i32 {
                for z in volume.min.z.floor() as i32..=volume.max.z.ceil() as i32 {
                    let pos = IVec3::new(x, y, z);
                    match self.block_at(pos) {
                        Some(block) if !block.is_air() => {
                            let bb = Aabb::unit_block(x, y, z);
                            if bb.intersects(volume) {
                                boxes.push(bb);
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
        boxes
    }
}
