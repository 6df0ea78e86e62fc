use crate::prelude::*;

/// A resumable spherical interpolation between two rotations.
///
/// Owners call [`RotationTween::advance`] once per frame. Replacing a tween with a new one is the
/// only way to cancel it.
#[derive(Clone, Copy, Reflect, Debug, PartialEq)]
pub struct RotationTween {
    from: Quat,
    to: Quat,
    duration: f32,
    elapsed: f32,
}

impl RotationTween {
    pub fn new(from: Quat, to: Quat, duration: f32) -> Self {
        Self {
            from,
            to,
            duration: duration.max(0.0),
            elapsed: 0.0,
        }
    }

    pub fn target(&self) -> Quat {
        self.to
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Moves the tween forward by `dt` seconds and returns the rotation for this frame.
    /// The last sample is exactly the target.
    pub fn advance(&mut self, dt: f32) -> Quat {
        self.elapsed = (self.elapsed + dt.max(0.0)).min(self.duration);
        if self.is_finished() {
            return self.to;
        }
        self.from.slerp(self.to, self.elapsed / self.duration)
    }
}
