use std::error::Error;
use std::fmt;

use glam::Vec3;

use crate::bounds::Aabb;

/// How neighbor sets are discovered each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborMode {
    /// Bounded-radius octree query. Authoritative default.
    Octree,
    /// Approximate fast path: a contiguous window of the flat fish array
    /// centered on the querying fish stands in for its neighborhood.
    /// Trades correctness for speed at very large populations.
    WindowSample { window: usize },
}

/// All simulation tuning in one place. Validated on every set, never
/// per tick. Applied from the next tick onward.
#[derive(Debug, Clone, Copy)]
pub struct Params {
    /// Neighbor discovery radius.
    pub vision_distance: f32,
    /// Full vision cone angle in degrees; neighbors outside the half-angle
    /// around the forward axis are ignored.
    pub vision_angle_deg: f32,

    pub separation_weight: f32,
    pub alignment_weight: f32,
    pub cohesion_weight: f32,
    /// Neighbors closer than this push away regardless of weights.
    pub separation_distance: f32,

    /// Cruise speed range; each fish redraws within it occasionally.
    pub min_speed: f32,
    pub max_speed: f32,
    /// Slerp fraction per second toward the steering target.
    pub turn_rate: f32,

    /// Attraction point the school orbits.
    pub goal: Vec3,
    /// Scales how strongly distance from the goal biases steering home.
    pub goal_strength: f32,
    /// Distance at which goal bias reaches full strength.
    pub school_radius: f32,

    /// The tank. Also the octree root bounds.
    pub volume: Aabb,

    /// Octree: max fish per node before subdivision.
    pub max_occupancy: usize,
    /// Octree: nodes at or below twice this size never subdivide.
    pub min_node_size: f32,

    pub neighbor_mode: NeighborMode,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            vision_distance: 5.0,
            vision_angle_deg: 270.0,
            separation_weight: 5.0,
            alignment_weight: 2.0,
            cohesion_weight: 3.0,
            separation_distance: 1.0,
            min_speed: 1.0,
            max_speed: 3.0,
            turn_rate: 2.5,
            goal: Vec3::ZERO,
            goal_strength: 1.0,
            school_radius: 10.0,
            volume: Aabb::cube(Vec3::ZERO, 10.0),
            max_occupancy: 10,
            min_node_size: 0.5,
            neighbor_mode: NeighborMode::Octree,
        }
    }
}

impl Params {
    /// Reject malformed configurations before they reach a tick.
    pub fn validate(&self) -> Result<(), ParamError> {
        fn positive(name: &'static str, v: f32) -> Result<(), ParamError> {
            if v > 0.0 && v.is_finite() {
                Ok(())
            } else {
                Err(ParamError::NonPositive(name))
            }
        }
        fn non_negative(name: &'static str, v: f32) -> Result<(), ParamError> {
            if v >= 0.0 && v.is_finite() {
                Ok(())
            } else {
                Err(ParamError::Negative(name))
            }
        }

        positive("vision_distance", self.vision_distance)?;
        if !(self.vision_angle_deg > 0.0 && self.vision_angle_deg <= 360.0) {
            return Err(ParamError::AngleOutOfRange(self.vision_angle_deg));
        }
        non_negative("separation_weight", self.separation_weight)?;
        non_negative("alignment_weight", self.alignment_weight)?;
        non_negative("cohesion_weight", self.cohesion_weight)?;
        positive("separation_distance", self.separation_distance)?;
        positive("min_speed", self.min_speed)?;
        positive("max_speed", self.max_speed)?;
        if self.min_speed > self.max_speed {
            return Err(ParamError::SpeedRangeInverted);
        }
        positive("turn_rate", self.turn_rate)?;
        non_negative("goal_strength", self.goal_strength)?;
        positive("school_radius", self.school_radius)?;
        positive("volume.half.x", self.volume.half.x)?;
        positive("volume.half.y", self.volume.half.y)?;
        positive("volume.half.z", self.volume.half.z)?;
        if self.max_occupancy == 0 {
            return Err(ParamError::NonPositive("max_occupancy"));
        }
        positive("min_node_size", self.min_node_size)?;
        if let NeighborMode::WindowSample { window } = self.neighbor_mode {
            if window == 0 {
                return Err(ParamError::NonPositive("neighbor window"));
            }
        }
        Ok(())
    }

    /// Cosine of the vision half-angle, precomputed for the cone test.
    pub fn vision_cos_half_angle(&self) -> f32 {
        (self.vision_angle_deg.to_radians() * 0.5).cos()
    }

    /// True when a change from `old` requires rebuilding the octree.
    pub fn index_changed(&self, old: &Params) -> bool {
        self.max_occupancy != old.max_occupancy
            || self.min_node_size != old.min_node_size
            || self.volume != old.volume
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamError {
    NonPositive(&'static str),
    Negative(&'static str),
    SpeedRangeInverted,
    AngleOutOfRange(f32),
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositive(name) => write!(f, "{name} must be positive and finite"),
            Self::Negative(name) => write!(f, "{name} must be non-negative and finite"),
            Self::SpeedRangeInverted => write!(f, "min_speed exceeds max_speed"),
            Self::AngleOutOfRange(v) => {
                write!(f, "vision_angle_deg must be in (0, 360], got {v}")
            }
        }
    }
}

impl Error for ParamError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(Params::default().validate(), Ok(()));
    }

    #[test]
    fn negative_radius_rejected() {
        let p = Params {
            vision_distance: -1.0,
            ..Params::default()
        };
        assert_eq!(p.validate(), Err(ParamError::NonPositive("vision_distance")));
    }

    #[test]
    fn inverted_speed_range_rejected() {
        let p = Params {
            min_speed: 4.0,
            max_speed: 2.0,
            ..Params::default()
        };
        assert_eq!(p.validate(), Err(ParamError::SpeedRangeInverted));
    }

    #[test]
    fn nan_weight_rejected() {
        let p = Params {
            cohesion_weight: f32::NAN,
            ..Params::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn full_circle_vision_allowed() {
        let p = Params {
            vision_angle_deg: 360.0,
            ..Params::default()
        };
        assert_eq!(p.validate(), Ok(()));
        // cos(180 deg): everything passes the cone test.
        assert!(p.vision_cos_half_angle() <= -0.999);
    }
}
