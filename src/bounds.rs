use glam::Vec3;

/// Axis-aligned box, stored as center + half extents.
///
/// Used both for the simulation volume and for every octree node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub center: Vec3,
    pub half: Vec3,
}

impl Aabb {
    pub fn new(center: Vec3, half: Vec3) -> Self {
        Self { center, half }
    }

    /// Box from a center and a uniform half extent.
    pub fn cube(center: Vec3, half: f32) -> Self {
        Self {
            center,
            half: Vec3::splat(half),
        }
    }

    pub fn min(&self) -> Vec3 {
        self.center - self.half
    }

    pub fn max(&self) -> Vec3 {
        self.center + self.half
    }

    /// Full edge length along x. Nodes are cubes in practice but we only
    /// ever compare x, matching the subdivision size check.
    pub fn size_x(&self) -> f32 {
        self.half.x * 2.0
    }

    /// Closed containment test (points on the face count as inside).
    pub fn contains(&self, p: Vec3) -> bool {
        let d = (p - self.center).abs();
        d.x <= self.half.x && d.y <= self.half.y && d.z <= self.half.z
    }

    /// Closest point on (or in) the box to `p`.
    pub fn closest_point(&self, p: Vec3) -> Vec3 {
        p.clamp(self.min(), self.max())
    }

    /// Squared distance from `p` to the box surface; zero if inside.
    pub fn dist_sq(&self, p: Vec3) -> f32 {
        (self.closest_point(p) - p).length_squared()
    }

    /// One of the eight half-size octants. Bit 0 picks the x side,
    /// bit 1 the y side, bit 2 the z side (set = positive).
    pub fn octant(&self, i: usize) -> Aabb {
        debug_assert!(i < 8);
        let h = self.half * 0.5;
        let offset = Vec3::new(
            if i & 1 == 0 { -h.x } else { h.x },
            if i & 2 == 0 { -h.y } else { h.y },
            if i & 4 == 0 { -h.z } else { h.z },
        );
        Aabb::new(self.center + offset, h)
    }

    /// How far past the interior margin `p` sits, normalized so 0.0 means
    /// at the margin and 1.0 means at the wall. `margin` is the fraction
    /// of each half extent considered safe interior (e.g. 0.8).
    ///
    /// Returns the worst axis; 0.0 when fully inside the margin. Values
    /// above 1.0 mean the point is outside the box entirely.
    pub fn margin_overshoot(&self, p: Vec3, margin: f32) -> f32 {
        let d = (p - self.center).abs();
        let mut worst = 0.0f32;
        for axis in 0..3 {
            let safe = self.half[axis] * margin;
            let band = self.half[axis] - safe;
            if band <= f32::EPSILON {
                continue;
            }
            let over = (d[axis] - safe) / band;
            worst = worst.max(over);
        }
        worst
    }
}
