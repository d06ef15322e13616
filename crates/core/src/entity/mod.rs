mod record;
mod rewind;

pub use record::{Entity, EntityTracker};
pub use rewind::{MAX_REWIND_TICKS, RewindBuffer, RewindSample};
