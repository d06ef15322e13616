use glam::Vec3;

/// Truncating decimal rounding. `round_to(0.1267, 2)` is `0.12`, matching the
/// arithmetic the detection layer reports deviations with.
pub fn round_to(value: f32, precision: u32) -> f32 {
    let p = 10_f32.powi(precision as i32);
    (value * p).trunc() / p
}

/// Unit view vector for a yaw/pitch pair given in degrees.
///
/// Yaw 0 looks toward +Z, pitch is positive looking down.
pub fn direction_vector(yaw_degrees: f32, pitch_degrees: f32) -> Vec3 {
    let yaw = yaw_degrees.to_radians();
    let pitch = pitch_degrees.to_radians();
    Vec3::new(
        -pitch.cos() * yaw.sin(),
        -pitch.sin(),
        pitch.cos() * yaw.cos(),
    )
}

/// Axis-aligned box. All collision and hitbox math in the crate runs on these.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box for an entity standing at `base` (feet position).
    pub fn from_base_size(base: Vec3, width: f32, height: f32) -> Self {
        let half = width / 2.0;
        Self {
            min: Vec3::new(base.x - half, base.y, base.z - half),
            max: Vec3::new(base.x + half, base.y + height, base.z + half),
        }
    }

    pub fn unit_block(x: i32, y: i32, z: i32) -> Self {
        let min = Vec3::new(x as f32, y as f32, z as f32);
        Self {
            min,
            max: min + Vec3::ONE,
        }
    }

    pub fn grow(&self, amount: f32) -> Self {
        let d = Vec3::splat(amount);
        Self {
            min: self.min - d,
            max: self.max + d,
        }
    }

    pub fn translate(&self, delta: Vec3) -> Self {
        Self {
            min: self.min + delta,
            max: self.max + delta,
        }
    }

    /// Expands the box toward `delta`, covering the volume a move would sweep.
    pub fn extend(&self, delta: Vec3) -> Self {
        let mut min = self.min;
        let mut max = self.max;
        if delta.x < 0.0 {
            min.x += delta.x;
        } else {
            max.x += delta.x;
        }
        if delta.y < 0.0 {
            min.y += delta.y;
        } else {
            max.y += delta.y;
        }
        if delta.z < 0.0 {
            min.z += delta.z;
        } else {
            max.z += delta.z;
        }
        Self { min, max }
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
            && self.min.z < other.max.z
            && self.max.z > other.min.z
    }

    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        point.clamp(self.min, self.max)
    }

    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.closest_point(point).distance(point)
    }

    /// Clips a vertical move of `moving` by this box, returning the allowed
    /// portion of `dy`. The boxes must already overlap on both horizontal
    /// axes for the clip to apply.
    pub fn clip_y_offset(&self, moving: &Aabb, dy: f32) -> f32 {
        if moving.max.x <= self.min.x
            || moving.min.x >= self.max.x
            || moving.max.z <= self.min.z
            || moving.min.z >= self.max.z
        {
            return dy;
        }
        if dy > 0.0 && moving.max.y <= self.min.y {
            dy.min(self.min.y - moving.max.y)
        } else if dy < 0.0 && moving.min.y >= self.max.y {
            dy.max(self.max.y - moving.min.y)
        } else {
            dy
        }
    }

    pub fn clip_x_offset(&self, moving: &Aabb, dx: f32) -> f32 {
        if moving.max.y <= self.min.y
            || moving.min.y >= self.max.y
            || moving.max.z <= self.min.z
            || moving.min.z >= self.max.z
        {
            return dx;
        }
        if dx > 0.0 && moving.max.x <= self.min.x {
            dx.min(self.min.x - moving.max.x)
        } else if dx < 0.0 && moving.min.x >= self.max.x {
            dx.max(self.max.x - moving.min.x)
        } else {
            dx
        }
    }

    pub fn clip_z_offset(&self, moving: &Aabb, dz: f32) -> f32 {
        if moving.max.x <= self.min.x
            || moving.min.x >= self.max.x
            || moving.max.y <= self.min.y
            || moving.min.y >= self.max.y
        {
            return dz;
        }
        if dz > 0.0 && moving.max.z <= self.min.z {
            dz.min(self.min.z - moving.max.z)
        } else if dz < 0.0 && moving.min.z >= self.max.z {
            dz.max(self.max.z - moving.min.z)
        } else {
            dz
        }
    }

    /// Intersects the segment `origin..origin + delta` with the box and
    /// returns the distance from the origin to the entry point. An origin
    /// already inside the box intercepts at distance zero.
    pub fn ray_intercept(&self, origin: Vec3, delta: Vec3) -> Option<f32> {
        let mut t_min = 0.0_f32;
        let mut t_max = 1.0_f32;
        for axis in 0..3 {
            let o = origin[axis];
            let d = delta[axis];
            if d.abs() < f32::EPSILON {
                if o < self.min[axis] || o > self.max[axis] {
                    return None;
                }
                continue;
            }
            let mut t1 = (self.min[axis] - o) / d;
            let mut t2 = (self.max[axis] - o) / d;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min * delta.length())
    }
}
