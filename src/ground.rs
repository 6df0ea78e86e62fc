use crate::prelude::*;

/// Anything that can answer "how far along this ray is the first hit?".
///
/// Implemented for closures so systems can wrap a [`SpatialQuery`] together with its filter.
pub trait RayProbe {
    fn cast(&self, origin: Vec3, direction: Dir3, max_distance: f32) -> Option<f32>;
}

impl<F> RayProbe for F
where
    F: Fn(Vec3, Dir3, f32) -> Option<f32>,
{
    fn cast(&self, origin: Vec3, direction: Dir3, max_distance: f32) -> Option<f32> {
        self(origin, direction, max_distance)
    }
}

/// Probes the ground under the feet with a center ray and four lateral ones, so standing on a
/// ledge with the center hanging over the edge still counts as supported.
#[derive(Clone, Copy, Reflect, Debug, PartialEq)]
pub struct GroundSensor {
    pub check_distance: f32,
    pub probe_radius: f32,
}

impl Default for GroundSensor {
    fn default() -> Self {
        Self {
            check_distance: 0.1,
            probe_radius: 0.2,
        }
    }
}

impl GroundSensor {
    pub fn probe_origins(&self, foot: Vec3, gravity: Dir3) -> [Vec3; 5] {
        let (a, b) = gravity.any_orthonormal_pair();
        let r = self.probe_radius;
        [foot, foot + a * r, foot - a * r, foot + b * r, foot - b * r]
    }

    pub fn is_grounded(&self, caster: &impl RayProbe, foot: Vec3, gravity: Dir3) -> bool {
        self.probe_origins(foot, gravity)
            .into_iter()
            .any(|origin| caster.cast(origin, gravity, self.check_distance).is_some())
    }
}
