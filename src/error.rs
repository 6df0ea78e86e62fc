use bevy_ecs::entity::Entity;
use bevy_math::Vec3;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum TumbleError {
    #[error("gravity direction {0} is zero or not finite")]
    InvalidGravityDirection(Vec3),
    #[error("{entity} is missing its {dependency}")]
    MissingDependency {
        entity: Entity,
        dependency: &'static str,
    },
    #[error("{entity} has a camera limit whose minimum exceeds its maximum")]
    InvalidCameraLimits { entity: Entity },
}
