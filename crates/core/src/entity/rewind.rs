use glam::Vec3;

/// Hard cap on how far back combat validation may rewind an entity.
pub const MAX_REWIND_TICKS: usize = 40;

const EMPTY_TICK: u64 = u64::MAX;

/// Entity position at one server tick, with the previous tick's position so
/// hit validation can trace the path between the two.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewindSample {
    pub position: Vec3,
    pub prev_position: Vec3,
}

/// Fixed-size ring of per-tick entity positions. A slot holds the sample for
/// exactly one tick; committing a tick that maps to an occupied slot evicts
/// the old sample, so lookups older than the capacity miss explicitly.
#[derive(Debug)]
pub struct RewindBuffer {
    samples: Vec<Option<RewindSample>>,
    ticks: Vec<u64>,
    capacity: usize,
}

impl RewindBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, MAX_REWIND_TICKS);
        Self {
            samples: vec![None; capacity],
            ticks: vec![EMPTY_TICK; capacity],
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn commit(&mut self, tick: u64, sample: RewindSample) {
        let slot = (tick as usize) % self.capacity;
        self.samples[slot] = Some(sample);
        self.ticks[slot] = tick;
    }

    /// Sample recorded for `tick`, or `None` if that tick was never recorded
    /// or has already been evicted.
    pub fn at(&self, tick: u64) -> Option<RewindSample> {
        let slot = (tick as usize) % self.capacity;
        if self.ticks[slot] == tick {
            self.samples[slot]
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.samples.fill(None);
        self.ticks.fill(EMPTY_TICK);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(x: f32) -> RewindSample {
        RewindSample {
            position: Vec3::new(x, 0.0, 0.0),
            prev_position: Vec3::new(x - 1.0, 0.0, 0.0),
        }
    }

    #[test]
    fn committed_ticks_are_retrievable() {
        let mut buffer = RewindBuffer::new(8);
        buffer.commit(5, sample(5.0));
        buffer.commit(6, sample(6.0));

        assert_eq!(buffer.at(5).unwrap().position.x, 5.0);
        assert_eq!(buffer.at(6).unwrap().position.x, 6.0);
        assert!(buffer.at(7).is_none());
    }

    #[test]
    fn old_ticks_are_evicted_by_the_ring() {
        let mut buffer = RewindBuffer::new(4);
        for tick in 0..10 {
            buffer.commit(tick, sample(tick as f32));
        }

        assert!(buffer.at(5).is_none(), "tick 5 should have been evicted");
        for tick in 6..10 {
            assert_eq!(buffer.at(tick).unwrap().position.x, tick as f32);
        }
    }

    #[test]
    fn capacity_is_clamped() {
        assert_eq!(RewindBuffer::new(0).capacity(), 1);
        assert_eq!(RewindBuffer::new(500).capacity(), MAX_REWIND_TICKS);
    }

    #[test]
    fn clear_forgets_everything() {
        let mut buffer = RewindBuffer::new(4);
        buffer.commit(3, sample(3.0));
        buffer.clear();
        assert!(buffer.at(3).is_none());
    }
}
