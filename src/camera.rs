use tracing::warn;

use crate::{
    GravityCharacter, TumbleError, ground::RayProbe, input::CharacterInput, prelude::*,
};

pub(super) fn plugin(app: &mut App) {
    app.add_systems(
        PostUpdate,
        (validate_cameras, update_orbit_cameras)
            .chain()
            .in_set(TumbleSystems::UpdateCamera),
    );
}

#[derive(Component, Clone, Copy)]
#[relationship(relationship_target = CharacterCamera)]
pub struct OrbitCameraOf(pub Entity);

#[derive(Component, Clone, Copy)]
#[relationship_target(relationship = OrbitCameraOf)]
pub struct CharacterCamera(Entity);

impl CharacterCamera {
    pub fn get(self) -> Entity {
        self.0
    }
}

/// Third-person camera orbiting a [`GravityCharacter`]. Angles are in degrees; a positive pitch
/// puts the camera above its target.
#[derive(Component, Clone, Reflect, Debug)]
#[reflect(Component)]
#[require(Transform)]
pub struct OrbitCamera {
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_pitch: f32,
    pub max_pitch: f32,
    pub zoom_speed: f32,
    /// Roughly the time the camera takes to reach its desired position.
    pub smooth_time: f32,
    /// How far in front of an obstruction the camera stops.
    pub collision_offset: f32,
    /// How strongly an unobstructed camera is held back toward its last valid position.
    pub recovery_blend: f32,
    /// Height of the look-at point above the target's origin, along its up axis.
    pub focus_height: f32,
    /// Whether the camera's up follows the target's gravity.
    pub follow_gravity: bool,
    pub filter: SpatialQueryFilter,
    velocity: Vec3,
    last_valid: Option<Vec3>,
    initialized: bool,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 15.0,
            distance: 5.0,
            min_distance: 2.0,
            max_distance: 10.0,
            min_pitch: -45.0,
            max_pitch: 45.0,
            zoom_speed: 2.0,
            smooth_time: 0.125,
            collision_offset: 0.2,
            recovery_blend: 0.125,
            focus_height: 1.0,
            follow_gravity: true,
            filter: SpatialQueryFilter::default(),
            velocity: Vec3::ZERO,
            last_valid: None,
            initialized: false,
        }
    }
}

impl OrbitCamera {
    pub fn last_valid_position(&self) -> Option<Vec3> {
        self.last_valid
    }

    /// Folds one frame of look and zoom input into the orbit, keeping pitch and distance within
    /// their limits.
    pub fn apply_input(&mut self, look: Vec2, zoom: f32) {
        if look.is_finite() {
            self.yaw -= look.x;
            self.pitch -= look.y;
        } else {
            warn!("look input is not finite: {look}, ignoring");
        }
        self.pitch = self.pitch.clamp(self.min_pitch, self.max_pitch);

        if zoom.is_finite() {
            self.distance -= zoom * self.zoom_speed;
        } else {
            warn!("zoom input is not finite: {zoom}, ignoring");
        }
        self.distance = self.distance.clamp(self.min_distance, self.max_distance);
    }

    /// Orbit rotation, tilted so that its up is `up` when following gravity.
    pub fn orientation(&self, up: Dir3) -> Quat {
        let orbit = Quat::from_rotation_y(self.yaw.to_radians())
            * Quat::from_rotation_x(-self.pitch.to_radians());
        if self.follow_gravity {
            Quat::from_rotation_arc(Vec3::Y, *up) * orbit
        } else {
            orbit
        }
    }

    pub fn desired_position(&self, focus: Vec3, up: Dir3) -> Vec3 {
        focus + self.orientation(up) * Vec3::Z * self.distance
    }

    /// Moves the camera one frame from `current` toward its desired place around `focus`,
    /// pulling it in front of anything `probe` reports between the two.
    pub fn resolve(
        &mut self,
        current: Vec3,
        focus: Vec3,
        up: Dir3,
        dt: f32,
        probe: &impl RayProbe,
    ) -> Transform {
        let desired = self.desired_position(focus, up);
        let current = if self.initialized {
            current
        } else {
            self.initialized = true;
            self.velocity = Vec3::ZERO;
            desired
        };
        let smoothed = smooth_damp(current, desired, &mut self.velocity, self.smooth_time, dt);

        let offset = smoothed - focus;
        let position = match Dir3::new_and_length(offset) {
            Ok((back, length)) => match probe.cast(focus, back, length) {
                Some(hit) => {
                    let clamped = focus + back * (hit - self.collision_offset).max(0.0);
                    self.last_valid = Some(clamped);
                    clamped
                }
                None => {
                    let eased = match self.last_valid {
                        Some(last) => smoothed.lerp(last, self.recovery_blend),
                        None => smoothed,
                    };
                    self.last_valid = Some(eased);
                    eased
                }
            },
            Err(_) => smoothed,
        };

        let up = if self.follow_gravity { up } else { Dir3::Y };
        Transform::from_translation(position).looking_at(focus, up)
    }
}

/// Critically damped spring toward `target`. Never overshoots.
pub fn smooth_damp(
    current: Vec3,
    target: Vec3,
    velocity: &mut Vec3,
    smooth_time: f32,
    dt: f32,
) -> Vec3 {
    if dt <= 0.0 {
        return current;
    }
    let smooth_time = smooth_time.max(1.0e-4);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);
    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * decay;
    let output = target + (change + temp) * decay;

    if (target - current).dot(output - target) > 0.0 {
        *velocity = Vec3::ZERO;
        return target;
    }
    output
}

fn validate_cameras(
    mut cameras: Query<(Entity, &mut OrbitCamera, Option<&OrbitCameraOf>), Added<OrbitCamera>>,
    characters: Query<(), With<GravityCharacter>>,
) -> Result {
    for (entity, mut camera, camera_of) in &mut cameras {
        let Some(camera_of) = camera_of else {
            return Err(TumbleError::MissingDependency {
                entity,
                dependency: "camera target",
            }
            .into());
        };
        if !characters.contains(camera_of.0) {
            return Err(TumbleError::MissingDependency {
                entity,
                dependency: "camera target character",
            }
            .into());
        }
        if camera.min_distance > camera.max_distance || camera.min_pitch > camera.max_pitch {
            return Err(TumbleError::InvalidCameraLimits { entity }.into());
        }
        camera.filter.excluded_entities.insert(camera_of.0);
    }
    Ok(())
}

fn update_orbit_cameras(
    mut cameras: Query<(&mut OrbitCamera, &OrbitCameraOf, &mut Transform), Without<GravityCharacter>>,
    characters: Query<(&Transform, &GravityDirection, &CharacterInput), With<GravityCharacter>>,
    spatial: SpatialQuery,
    time: Res<Time>,
) {
    for (mut camera, camera_of, mut transform) in &mut cameras {
        let Ok((target, gravity, input)) = characters.get(camera_of.0) else {
            continue;
        };
        camera.apply_input(input.look, input.zoom);

        let up = gravity.up();
        let focus = target.translation + *up * camera.focus_height;
        let filter = camera.filter.clone();
        let probe = |origin: Vec3, direction: Dir3, max_distance: f32| {
            spatial
                .cast_ray(origin, direction, max_distance, true, &filter)
                .map(|hit| hit.distance)
        };
        *transform = camera.resolve(
            transform.translation,
            focus,
            up,
            time.delta_secs(),
            &probe,
        );
    }
}
