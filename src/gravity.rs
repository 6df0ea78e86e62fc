//! The gravity frame: conversions between world space and the basis whose up axis is the
//! character's current anti-gravity direction.

use bevy_ecs::{intern::Interned, schedule::ScheduleLabel};

use crate::{
    GravityCharacter, TumbleError,
    prelude::*,
    state::{CharacterStateMachine, StateKind},
    tween::RotationTween,
};

pub(super) fn plugin(schedule: Interned<dyn ScheduleLabel>) -> impl Fn(&mut App) {
    move |app: &mut App| {
        app.add_systems(schedule, apply_gravity.in_set(TumbleSystems::ApplyGravity))
            .add_systems(Update, align_to_gravity.in_set(TumbleSystems::Animate));
    }
}

/// Returns the unit up axis for `gravity`, i.e. `-gravity` normalized.
pub fn up_axis(gravity: Vec3) -> Result<Dir3, TumbleError> {
    Dir3::new(-gravity).map_err(|_| TumbleError::InvalidGravityDirection(gravity))
}

/// Rotation that maps world up onto the up axis of `gravity`.
pub fn frame_rotation(gravity: Vec3) -> Result<Quat, TumbleError> {
    let up = up_axis(gravity)?;
    Ok(Quat::from_rotation_arc(Vec3::Y, *up))
}

/// Reprojects planar stick input into a world-space movement vector valid in the gravity frame.
///
/// Vertical input maps to forward (-Z) before the frame rotation is applied.
pub fn project_input_to_world(
    horizontal: f32,
    vertical: f32,
    gravity: Vec3,
) -> Result<Vec3, TumbleError> {
    Ok(frame_rotation(gravity)? * planar(horizontal, vertical))
}

fn planar(horizontal: f32, vertical: f32) -> Vec3 {
    vec3(horizontal, 0.0, -vertical)
}

/// Rotation whose forward (-Z) points along `forward` with `up` as the reference up.
pub fn look_rotation(forward: Dir3, up: Dir3) -> Quat {
    Transform::default().looking_to(forward, up).rotation
}

/// The direction gravity pulls the owning character. Always a unit vector.
#[derive(Component, Clone, Copy, Reflect, Debug, PartialEq)]
#[reflect(Component)]
pub struct GravityDirection(Dir3);

impl Default for GravityDirection {
    fn default() -> Self {
        Self(Dir3::NEG_Y)
    }
}

impl GravityDirection {
    pub fn new(direction: Vec3) -> Result<Self, TumbleError> {
        Dir3::new(direction)
            .map(Self)
            .map_err(|_| TumbleError::InvalidGravityDirection(direction))
    }

    pub fn get(self) -> Dir3 {
        self.0
    }

    pub fn set(&mut self, direction: Dir3) {
        self.0 = direction;
    }

    pub fn up(self) -> Dir3 {
        -self.0
    }

    pub fn frame(self) -> Quat {
        Quat::from_rotation_arc(Vec3::Y, *self.up())
    }

    /// Same as [`project_input_to_world`], infallible because the direction is never zero.
    pub fn project(self, horizontal: f32, vertical: f32) -> Vec3 {
        self.frame() * planar(horizontal, vertical)
    }
}

impl From<Dir3> for GravityDirection {
    fn from(direction: Dir3) -> Self {
        Self(direction)
    }
}

/// One of the four candidate directions offered while selecting gravity.
#[derive(Clone, Copy, Reflect, Debug, PartialEq, Eq, Hash)]
pub enum GravityArrow {
    Up,
    Down,
    Left,
    Right,
}

impl GravityArrow {
    pub fn planar(self) -> Vec2 {
        match self {
            Self::Up => Vec2::Y,
            Self::Down => Vec2::NEG_Y,
            Self::Left => Vec2::NEG_X,
            Self::Right => Vec2::X,
        }
    }

    /// The world direction this arrow selects when `gravity` is the committed frame.
    pub fn resolve(self, gravity: GravityDirection) -> Dir3 {
        let local = self.planar();
        gravity.frame() * Dir3::new_unchecked(planar(local.x, local.y))
    }
}

/// The body re-orientation currently in flight, if any. Only one may run at a time; starting a
/// new one replaces the old one.
#[derive(Component, Clone, Copy, Reflect, Default, Debug, Deref, DerefMut)]
#[reflect(Component)]
pub struct GravityAlignment(pub Option<RotationTween>);

impl GravityAlignment {
    pub fn start(&mut self, rotation: Quat, new_up: Dir3, duration: f32) {
        let current_up = rotation * Vec3::Y;
        let target = Quat::from_rotation_arc(current_up.normalize(), *new_up) * rotation;
        self.0 = Some(RotationTween::new(rotation, target, duration));
    }

    pub fn is_active(&self) -> bool {
        self.0.is_some()
    }
}

fn apply_gravity(
    mut bodies: Query<(
        Forces,
        &GravityCharacter,
        &GravityDirection,
        &CharacterStateMachine,
    )>,
) {
    for (mut forces, cfg, gravity, machine) in &mut bodies {
        if let Some(acceleration) = gravity_acceleration(cfg, *gravity, machine.current().kind()) {
            forces.apply_linear_acceleration(acceleration);
        }
    }
}

/// Gravity's pull on a character in `state`, or `None` while it hangs in gravity selection
/// with [`GravityCharacter::gravity_while_selecting`] off.
pub fn gravity_acceleration(
    cfg: &GravityCharacter,
    gravity: GravityDirection,
    state: StateKind,
) -> Option<Vec3> {
    if state == StateKind::GravitySelect && !cfg.gravity_while_selecting {
        return None;
    }
    Some(*gravity.get() * cfg.gravity_strength)
}

fn align_to_gravity(
    mut characters: Query<(&mut Transform, &mut GravityAlignment)>,
    time: Res<Time>,
) {
    for (mut transform, mut alignment) in &mut characters {
        let Some(tween) = alignment.0.as_mut() else {
            continue;
        };
        transform.rotation = tween.advance(time.delta_secs());
        if tween.is_finished() {
            alignment.0 = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_directions() -> Vec<Vec3> {
        let mut dirs = vec![
            Vec3::X,
            Vec3::NEG_X,
            Vec3::Y,
            Vec3::NEG_Y,
            Vec3::Z,
            Vec3::NEG_Z,
        ];
        for i in 0..24 {
            let theta = i as f32 * 0.37;
            let phi = i as f32 * 0.91;
            dirs.push(vec3(
                theta.sin() * phi.cos(),
                theta.cos(),
                theta.sin() * phi.sin(),
            ));
        }
        dirs
    }

    #[test]
    fn up_axis_is_unit_and_antiparallel() {
        for g in sample_directions() {
            let up = up_axis(g).unwrap();
            assert!((up.length() - 1.0).abs() < 1e-5);
            assert!((up.dot(g.normalize()) + 1.0).abs() < 1e-5, "{g}");
        }
    }

    #[test]
    fn zero_gravity_is_rejected() {
        assert_eq!(
            up_axis(Vec3::ZERO),
            Err(TumbleError::InvalidGravityDirection(Vec3::ZERO))
        );
        assert!(project_input_to_world(1.0, 0.0, Vec3::ZERO).is_err());
        assert!(GravityDirection::new(Vec3::splat(f32::NAN)).is_err());
    }

    #[test]
    fn default_gravity_leaves_input_untouched() {
        let moved = project_input_to_world(0.5, 1.0, Vec3::NEG_Y).unwrap();
        assert!((moved - vec3(0.5, 0.0, -1.0)).length() < 1e-6);
    }

    #[test]
    fn projected_input_is_perpendicular_to_gravity() {
        for g in sample_directions() {
            let moved = project_input_to_world(0.3, -0.8, g).unwrap();
            assert!(moved.dot(g.normalize()).abs() < 1e-5, "{g}");
            assert!((moved.length() - vec2(0.3, 0.8).length()).abs() < 1e-5);
        }
    }

    #[test]
    fn wall_gravity_turns_forward_into_up() {
        // Standing on the +Z wall: up is -Z, so forward input climbs along world +Y or -Y,
        // never along the wall normal.
        let gravity = GravityDirection::new(Vec3::Z).unwrap();
        let forward = gravity.project(0.0, 1.0);
        assert!(forward.z.abs() < 1e-6);
        assert!((forward.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn arrows_resolve_to_orthogonal_axes() {
        let gravity = GravityDirection::default();
        assert_eq!(GravityArrow::Up.resolve(gravity), Dir3::NEG_Z);
        assert_eq!(GravityArrow::Down.resolve(gravity), Dir3::Z);
        assert_eq!(GravityArrow::Left.resolve(gravity), Dir3::NEG_X);
        assert_eq!(GravityArrow::Right.resolve(gravity), Dir3::X);
    }

    #[test]
    fn look_rotation_points_forward() {
        let rotation = look_rotation(Dir3::X, Dir3::Y);
        assert!((rotation * Vec3::NEG_Z - Vec3::X).length() < 1e-5);
        assert!((rotation * Vec3::Y - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn selection_may_suspend_gravity() {
        let wall = GravityDirection::new(Vec3::X).unwrap();
        let falling = GravityCharacter::default();
        assert_eq!(
            gravity_acceleration(&falling, wall, StateKind::GravitySelect),
            Some(Vec3::X * falling.gravity_strength)
        );

        let hovering = GravityCharacter {
            gravity_while_selecting: false,
            ..default()
        };
        assert_eq!(
            gravity_acceleration(&hovering, wall, StateKind::GravitySelect),
            None
        );
        for state in [StateKind::Idle, StateKind::Walking, StateKind::Jumping] {
            assert_eq!(
                gravity_acceleration(&hovering, wall, state),
                Some(Vec3::X * hovering.gravity_strength)
            );
        }
    }

    #[test]
    fn alignment_targets_new_up() {
        let mut alignment = GravityAlignment::default();
        alignment.start(Quat::IDENTITY, Dir3::X, 0.1);
        let target = alignment.0.unwrap().target();
        assert!((target * Vec3::Y - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn restarting_alignment_overwrites_target() {
        let mut alignment = GravityAlignment::default();
        alignment.start(Quat::IDENTITY, Dir3::X, 0.1);
        let midway = alignment.0.as_mut().unwrap().advance(0.05);
        alignment.start(midway, Dir3::Z, 0.1);
        let target = alignment.0.unwrap().target();
        assert!((target * Vec3::Y - Vec3::Z).length() < 1e-5);
    }
}
