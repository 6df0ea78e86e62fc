#![doc = include_str!("../readme.md")]

/// Everything you need to get started with `bevy_tumble`
pub mod prelude {
    pub(crate) use {
        avian3d::prelude::*,
        bevy_app::prelude::*,
        bevy_derive::{Deref, DerefMut},
        bevy_ecs::prelude::*,
        bevy_enhanced_input::prelude::*,
        bevy_math::prelude::*,
        bevy_reflect::prelude::*,
        bevy_time::prelude::*,
        bevy_transform::prelude::*,
        bevy_utils::prelude::*,
    };

    pub use crate::{
        CharacterStatus, GravityCharacter, TumbleError, TumblePlugin, TumbleSystems,
        camera::{CharacterCamera, OrbitCamera, OrbitCameraOf},
        controller::{GravityChanged, PlayAnimation},
        gravity::{GravityAlignment, GravityArrow, GravityDirection},
        hologram::{CharacterHologram, Hologram, HologramOf},
        input::{
            CharacterInput, ConfirmGravity, GravityDown, GravityLeft, GravityRight, GravityUp,
            Jump, Movement, RotateCamera, ZoomCamera,
        },
        session::{
            CollectSequence, Collected, Collectible, GameOver, GameOverCause, GameSession,
            GameVictory, SessionOutcome,
        },
        state::{CharacterState, CharacterStateMachine, StateKind},
        timer::{Countdown, FallTracker},
    };
}

use crate::prelude::*;
use bevy_ecs::{
    intern::Interned, lifecycle::HookContext, schedule::ScheduleLabel, world::DeferredWorld,
};

pub mod camera;
mod controller;
mod error;
pub mod gravity;
pub mod ground;
pub mod hologram;
pub mod input;
pub mod session;
pub mod state;
pub mod timer;
pub mod tween;

pub use error::TumbleError;

/// Also requires you to add [`PhysicsPlugins`] and [`EnhancedInputPlugin`] to work properly.
pub struct TumblePlugin {
    gravity_schedule: Interned<dyn ScheduleLabel>,
}

impl TumblePlugin {
    /// Create a new plugin that applies gravity in the given schedule. The default is
    /// [`FixedUpdate`].
    pub fn new(gravity_schedule: impl ScheduleLabel) -> Self {
        Self {
            gravity_schedule: gravity_schedule.intern(),
        }
    }
}

impl Default for TumblePlugin {
    fn default() -> Self {
        Self {
            gravity_schedule: FixedUpdate.intern(),
        }
    }
}

impl Plugin for TumblePlugin {
    fn build(&self, app: &mut App) {
        app.configure_sets(
            Update,
            (TumbleSystems::UpdateCharacters, TumbleSystems::Animate).chain(),
        )
        .configure_sets(
            PostUpdate,
            TumbleSystems::UpdateCamera.before(TransformSystems::Propagate),
        )
        .configure_sets(
            self.gravity_schedule,
            TumbleSystems::ApplyGravity.before(PhysicsSystems::First),
        )
        .add_plugins((
            camera::plugin,
            controller::plugin,
            gravity::plugin(self.gravity_schedule),
            hologram::plugin,
            input::plugin,
            session::plugin,
        ));
    }
}

/// System sets used by all systems of `bevy_tumble`.
#[derive(SystemSet, Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum TumbleSystems {
    /// Ground probing, fall tracking and the state machines.
    UpdateCharacters,
    /// Body alignment, hologram turns and collect sequences.
    Animate,
    UpdateCamera,
    ApplyGravity,
}

/// A dynamic rigid body whose gravity direction can be changed at runtime.
#[derive(Component, Clone, Reflect, Debug)]
#[reflect(Component)]
#[require(
    CharacterInput,
    CharacterStatus,
    CharacterStateMachine,
    FallTracker,
    GravityDirection,
    GravityAlignment,
    RigidBody = RigidBody::Dynamic,
    Collider = Collider::capsule(0.4, 1.0),
    LockedAxes = LockedAxes::ROTATION_LOCKED,
    GravityScale = GravityScale(0.0),
    TranslationInterpolation,
    Transform,
)]
#[component(on_add=GravityCharacter::on_add)]
pub struct GravityCharacter {
    pub movement_speed: f32,
    /// Degrees per second.
    pub rotation_speed: f32,
    pub air_speed: f32,
    /// Degrees per second.
    pub air_rotation_speed: f32,
    pub jump_power: f32,
    pub gravity_strength: f32,
    pub ground: ground::GroundSensor,
    pub ground_filter: SpatialQueryFilter,
    /// Seconds the hologram takes to turn toward a new candidate direction.
    pub hologram_speed: f32,
    /// Seconds the body takes to line up with a newly committed gravity.
    pub align_duration: f32,
    /// Whether gravity keeps pulling while the player is picking a new direction.
    pub gravity_while_selecting: bool,
}

impl Default for GravityCharacter {
    fn default() -> Self {
        Self {
            movement_speed: 5.0,
            rotation_speed: 720.0,
            air_speed: 1.0,
            air_rotation_speed: 200.0,
            jump_power: 5.0,
            gravity_strength: 9.81,
            ground: default(),
            ground_filter: SpatialQueryFilter::default(),
            hologram_speed: 0.5,
            align_duration: 0.1,
            gravity_while_selecting: true,
        }
    }
}

impl GravityCharacter {
    pub fn on_add(mut world: DeferredWorld, ctx: HookContext) {
        {
            let Some(mut character) = world.get_mut::<Self>(ctx.entity) else {
                return;
            };
            character.ground_filter.excluded_entities.insert(ctx.entity);
        }

        let Some(collider) = world.entity(ctx.entity).get::<Collider>().cloned() else {
            return;
        };
        // The feet sit at the bottom of the collider we spawned with.
        let aabb = collider.aabb(default(), Rotation::default());
        let height = aabb.max.y - aabb.min.y;

        let Some(mut status) = world.get_mut::<CharacterStatus>(ctx.entity) else {
            return;
        };
        status.foot_distance = height / 2.0;
    }
}

#[derive(Component, Clone, Reflect, Default, Debug)]
#[reflect(Component)]
pub struct CharacterStatus {
    pub grounded: bool,
    /// Linear velocity along the current up axis.
    pub up_speed: f32,
    /// Distance from the body origin to the feet, along the up axis.
    pub foot_distance: f32,
}
