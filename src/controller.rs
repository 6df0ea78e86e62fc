use core::time::Duration;
use tracing::{debug, info};

use crate::{
    CharacterStatus, GravityCharacter,
    gravity::{GravityAlignment, GravityDirection, look_rotation},
    hologram::{CharacterHologram, Hologram},
    input::CharacterInput,
    prelude::*,
    session::{GameOver, GameOverCause},
    state::{CharacterStateMachine, FrameSnapshot, Gait, StateEffect},
    timer::FallTracker,
};

pub(super) fn plugin(app: &mut App) {
    app.add_systems(
        Update,
        run_characters.in_set(TumbleSystems::UpdateCharacters),
    );
}

/// Fire-and-forget request to play an animation clip on a character.
#[derive(EntityEvent, Clone, Copy, Debug)]
pub struct PlayAnimation {
    pub entity: Entity,
    pub clip: &'static str,
}

/// A character committed a new gravity direction.
#[derive(EntityEvent, Clone, Copy, Debug)]
pub struct GravityChanged {
    pub entity: Entity,
    pub direction: Dir3,
}

#[derive(Debug)]
struct Ctx {
    entity: Entity,
    cfg: GravityCharacter,
    input: CharacterInput,
    dt: f32,
    dt_duration: Duration,
}

fn run_characters(
    mut characters: Query<(
        Entity,
        &GravityCharacter,
        &mut CharacterStatus,
        &mut CharacterStateMachine,
        &mut FallTracker,
        &mut GravityDirection,
        &mut GravityAlignment,
        &CharacterInput,
        &mut Transform,
        Forces,
        Option<&CharacterHologram>,
    )>,
    mut holograms: Query<(&mut Hologram, &mut Transform), Without<GravityCharacter>>,
    spatial: SpatialQuery,
    time: Res<Time>,
    mut effects: Local<Vec<StateEffect>>,
    mut commands: Commands,
) {
    for (
        entity,
        cfg,
        mut status,
        mut machine,
        mut fall,
        mut gravity,
        mut alignment,
        input,
        mut transform,
        mut forces,
        hologram,
    ) in &mut characters
    {
        if machine.is_finished() {
            continue;
        }

        let ctx = Ctx {
            entity,
            cfg: cfg.clone(),
            input: input.clone(),
            dt: time.delta_secs(),
            dt_duration: time.delta(),
        };

        update_grounded(
            &transform,
            *gravity,
            forces.linear_velocity(),
            &spatial,
            &mut status,
            &ctx,
        );

        if fall.observe(status.grounded, ctx.dt_duration) {
            info!("{entity} has been falling for too long");
            commands.trigger(GameOver {
                cause: GameOverCause::Fell(entity),
            });
        }

        let frame = FrameSnapshot {
            movement: ctx.input.movement,
            jump_pressed: ctx.input.jump,
            gravity_pressed: ctx.input.gravity_pressed,
            gravity_held: ctx.input.gravity_held.dominant(),
            confirm_pressed: ctx.input.confirm_gravity,
            grounded: status.grounded,
            up_speed: status.up_speed,
            gravity: *gravity,
        };
        effects.clear();
        machine.step(&frame, &mut effects);

        let mut hologram = hologram.and_then(|h| holograms.get_mut(h.get()).ok());
        for effect in effects.drain(..) {
            match effect {
                StateEffect::PlayAnimation(clip) => {
                    debug!("{entity} entering {clip} state");
                    commands.trigger(PlayAnimation { entity, clip });
                }
                StateEffect::JumpImpulse => {
                    forces.apply_linear_impulse(*gravity.up() * ctx.cfg.jump_power);
                }
                StateEffect::Move(gait) => {
                    move_character(&mut transform, &alignment, *gravity, gait, &ctx);
                }
                StateEffect::ShowHologram => {
                    if let Some((holo, holo_transform)) = hologram.as_mut() {
                        holo.show();
                        holo_transform.rotation = transform.rotation;
                    }
                }
                StateEffect::PreviewGravity(direction) => {
                    if let Some((holo, holo_transform)) = hologram.as_mut() {
                        let target = look_rotation(direction, gravity.up());
                        holo.turn(holo_transform.rotation, target, ctx.cfg.hologram_speed);
                    }
                }
                StateEffect::HideHologram => {
                    if let Some((holo, _)) = hologram.as_mut() {
                        holo.hide();
                    }
                }
                StateEffect::CommitGravity(direction) => {
                    commit_gravity(
                        &mut gravity,
                        &mut alignment,
                        &transform,
                        direction,
                        &mut commands,
                        &ctx,
                    );
                }
            }
        }
    }
}

fn update_grounded(
    transform: &Transform,
    gravity: GravityDirection,
    velocity: Vec3,
    spatial: &SpatialQuery,
    status: &mut CharacterStatus,
    ctx: &Ctx,
) {
    let up = gravity.up();
    let foot = transform.translation - *up * status.foot_distance;
    let probe = |origin: Vec3, direction: Dir3, max_distance: f32| {
        spatial
            .cast_ray(origin, direction, max_distance, true, &ctx.cfg.ground_filter)
            .map(|hit| hit.distance)
    };
    status.grounded = ctx.cfg.ground.is_grounded(&probe, foot, gravity.get());
    status.up_speed = velocity.dot(*up);
}

fn move_character(
    transform: &mut Transform,
    alignment: &GravityAlignment,
    gravity: GravityDirection,
    gait: Gait,
    ctx: &Ctx,
) {
    let (speed, turn_speed) = match gait {
        Gait::Ground => (ctx.cfg.movement_speed, ctx.cfg.rotation_speed),
        Gait::Air => (ctx.cfg.air_speed, ctx.cfg.air_rotation_speed),
    };
    let input = ctx.input.movement.clamp_length_max(1.0);
    let movement = gravity.project(input.x, input.y);
    transform.translation += movement * speed * ctx.dt;

    // The gravity alignment owns the body rotation until it finishes.
    if alignment.is_active() {
        return;
    }
    let Ok(direction) = Dir3::new(movement) else {
        return;
    };
    let target = look_rotation(direction, gravity.up());
    transform.rotation = transform
        .rotation
        .rotate_towards(target, turn_speed.to_radians() * ctx.dt);
}

fn commit_gravity(
    gravity: &mut GravityDirection,
    alignment: &mut GravityAlignment,
    transform: &Transform,
    direction: Dir3,
    commands: &mut Commands,
    ctx: &Ctx,
) {
    info!("{} changing gravity direction to {}", ctx.entity, *direction);
    gravity.set(direction);
    alignment.start(transform.rotation, gravity.up(), ctx.cfg.align_duration);
    commands.trigger(GravityChanged {
        entity: ctx.entity,
        direction,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::world::CommandQueue;

    const DT: f32 = 1.0 / 60.0;

    fn ctx(entity: Entity, movement: Vec2) -> Ctx {
        Ctx {
            entity,
            cfg: GravityCharacter::default(),
            input: CharacterInput {
                movement,
                ..default()
            },
            dt: DT,
            dt_duration: Duration::from_secs_f32(DT),
        }
    }

    #[test]
    fn wall_walking_stays_in_ground_plane() {
        let gravity = GravityDirection::new(Vec3::X).unwrap();
        let ctx = ctx(Entity::PLACEHOLDER, vec2(0.6, 0.8));
        let mut transform = Transform::default();
        move_character(
            &mut transform,
            &GravityAlignment::default(),
            gravity,
            Gait::Ground,
            &ctx,
        );
        let moved = transform.translation;
        assert!(moved.dot(Vec3::X).abs() < 1e-6);
        assert!((moved.length() - ctx.cfg.movement_speed * DT).abs() < 1e-5);
        assert!((moved.normalize() - gravity.project(0.6, 0.8)).length() < 1e-5);
    }

    #[test]
    fn movement_follows_current_gravity() {
        let ctx = ctx(Entity::PLACEHOLDER, Vec2::Y);
        let mut moves = Vec::new();
        for direction in [Vec3::NEG_Y, Vec3::Z, Vec3::NEG_X] {
            let gravity = GravityDirection::new(direction).unwrap();
            let mut transform = Transform::default();
            move_character(
                &mut transform,
                &GravityAlignment::default(),
                gravity,
                Gait::Air,
                &ctx,
            );
            assert!(transform.translation.dot(direction).abs() < 1e-6);
            moves.push(transform.translation);
        }
        assert!(moves[0].distance(moves[1]) > 1e-3);
        assert!(moves[1].distance(moves[2]) > 1e-3);
    }

    #[test]
    fn locomotion_does_not_turn_during_alignment() {
        let ctx = ctx(Entity::PLACEHOLDER, Vec2::X);
        let gravity = GravityDirection::default();

        let mut aligning = GravityAlignment::default();
        aligning.start(Quat::IDENTITY, Dir3::Y, 0.1);
        let mut transform = Transform::default();
        move_character(&mut transform, &aligning, gravity, Gait::Ground, &ctx);
        assert_eq!(transform.rotation, Quat::IDENTITY);
        assert!(transform.translation.x > 0.0);

        let mut transform = Transform::default();
        move_character(
            &mut transform,
            &GravityAlignment::default(),
            gravity,
            Gait::Ground,
            &ctx,
        );
        assert!(transform.rotation.angle_between(Quat::IDENTITY) > 1e-3);
    }

    #[derive(Resource, Default)]
    struct Changes(Vec<(Entity, Dir3)>);

    #[test]
    fn commit_sets_gravity_and_starts_alignment() {
        let mut world = World::new();
        world.init_resource::<Changes>();
        world.add_observer(|changed: On<GravityChanged>, mut changes: ResMut<Changes>| {
            changes.0.push((changed.entity, changed.direction));
        });
        let character = world.spawn_empty().id();
        let ctx = ctx(character, Vec2::ZERO);

        let mut gravity = GravityDirection::default();
        let mut alignment = GravityAlignment::default();
        let mut queue = CommandQueue::default();
        commit_gravity(
            &mut gravity,
            &mut alignment,
            &Transform::default(),
            Dir3::X,
            &mut Commands::new(&mut queue, &world),
            &ctx,
        );
        queue.apply(&mut world);

        assert_eq!(gravity.get(), Dir3::X);
        assert_eq!(gravity.up(), Dir3::NEG_X);
        assert!(alignment.is_active());
        let target = alignment.0.unwrap().target();
        assert!((target * Vec3::Y - Vec3::NEG_X).length() < 1e-5);
        assert_eq!(world.resource::<Changes>().0, vec![(character, Dir3::X)]);
    }
}
