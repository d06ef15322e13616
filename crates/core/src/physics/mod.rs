mod math;
mod world;

pub use math::{Aabb, direction_vector, round_to};
pub use world::{BlockId, BlockWorld, MemoryWorld};
