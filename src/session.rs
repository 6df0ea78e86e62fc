use core::f32::consts::TAU;
use core::time::Duration;

use bevy_ecs::entity::EntityHashSet;
use tracing::info;

use crate::{GravityCharacter, prelude::*, state::CharacterStateMachine, timer::Countdown};

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<GameSession>()
        .add_observer(register_collectible)
        .add_observer(forget_collectible)
        .add_observer(end_session)
        .add_observer(win_session)
        .add_systems(
            Update,
            (tick_session, collect_items).in_set(TumbleSystems::UpdateCharacters),
        )
        .add_systems(
            Update,
            animate_collect_sequences.in_set(TumbleSystems::Animate),
        );
}

/// Score, pending collectibles, time limit and outcome of the current round.
#[derive(Resource, Reflect, Debug)]
#[reflect(Resource)]
pub struct GameSession {
    collected: u32,
    #[reflect(ignore)]
    pending: EntityHashSet,
    timer: Countdown,
    outcome: Option<SessionOutcome>,
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new(Duration::from_secs(120))
    }
}

impl GameSession {
    /// Creates a session whose time limit is already running.
    pub fn new(time_limit: Duration) -> Self {
        let mut timer = Countdown::new(time_limit);
        timer.start();
        Self {
            collected: 0,
            pending: EntityHashSet::default(),
            timer,
            outcome: None,
        }
    }

    pub fn collected(&self) -> u32 {
        self.collected
    }

    pub fn remaining_collectables(&self) -> usize {
        self.pending.len()
    }

    pub fn outcome(&self) -> Option<SessionOutcome> {
        self.outcome
    }

    pub fn timer(&self) -> &Countdown {
        &self.timer
    }

    pub fn register(&mut self, item: Entity) {
        self.pending.insert(item);
    }

    pub fn forget(&mut self, item: Entity) {
        self.pending.remove(&item);
    }

    /// Records the pickup of a pending item and returns how many remain. Items that are not
    /// pending, or a session that is already decided, yield `None`.
    pub fn collect(&mut self, item: Entity) -> Option<usize> {
        if self.outcome.is_some() || !self.pending.remove(&item) {
            return None;
        }
        self.collected += 1;
        Some(self.pending.len())
    }

    /// Returns `false` if the outcome was already decided.
    pub fn declare_game_over(&mut self, cause: GameOverCause) -> bool {
        self.decide(SessionOutcome::Lost(cause))
    }

    /// Returns `false` if the outcome was already decided.
    pub fn declare_victory(&mut self) -> bool {
        self.decide(SessionOutcome::Victory)
    }

    fn decide(&mut self, outcome: SessionOutcome) -> bool {
        if self.outcome.is_some() {
            return false;
        }
        self.outcome = Some(outcome);
        self.timer.stop();
        true
    }
}

#[derive(Clone, Copy, Reflect, Debug, PartialEq, Eq)]
pub enum SessionOutcome {
    Victory,
    Lost(GameOverCause),
}

#[derive(Clone, Copy, Reflect, Debug, PartialEq, Eq)]
pub enum GameOverCause {
    /// The character stayed airborne longer than its [`FallTracker`] allows.
    Fell(Entity),
    TimeUp,
}

#[derive(Event, Clone, Copy, Debug)]
pub struct GameOver {
    pub cause: GameOverCause,
}

/// Every collectible has been picked up.
#[derive(Event, Clone, Copy, Debug, Default)]
pub struct GameVictory;

/// A character picked up a collectible.
#[derive(EntityEvent, Clone, Copy, Debug)]
pub struct Collected {
    pub entity: Entity,
    pub item: Entity,
    pub amount: u32,
}

/// Item picked up when a character's body touches it. Give it a [`Collider`], usually a
/// [`Sensor`].
#[derive(Component, Clone, Copy, Reflect, Default, Debug)]
#[reflect(Component)]
#[require(CollisionEventsEnabled, Transform)]
pub struct Collectible;

/// Pickup animation: the item flies to its collector, spins one turn about world up and shrinks
/// away. The entity is despawned when it finishes.
#[derive(Component, Clone, Copy, Reflect, Debug)]
#[reflect(Component)]
pub struct CollectSequence {
    pub collector: Entity,
    from: Transform,
    duration: f32,
    elapsed: f32,
}

impl CollectSequence {
    pub const DURATION: f32 = 1.5;

    pub fn new(collector: Entity, from: Transform) -> Self {
        Self {
            collector,
            from,
            duration: Self::DURATION,
            elapsed: 0.0,
        }
    }

    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (self.elapsed / self.duration).min(1.0)
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Steps the animation toward `target` and returns the item's transform for this frame.
    pub fn advance(&mut self, dt: f32, target: Vec3) -> Transform {
        self.elapsed = (self.elapsed + dt).min(self.duration);
        let t = self.progress();
        Transform {
            translation: self.from.translation.lerp(target, t),
            rotation: Quat::from_rotation_y(TAU * t) * self.from.rotation,
            scale: self.from.scale * (1.0 - t),
        }
    }
}

fn register_collectible(add: On<Add, Collectible>, mut session: ResMut<GameSession>) {
    session.register(add.entity);
}

fn forget_collectible(remove: On<Remove, Collectible>, mut session: ResMut<GameSession>) {
    session.forget(remove.entity);
}

fn end_session(game_over: On<GameOver>, mut session: ResMut<GameSession>) {
    if session.declare_game_over(game_over.cause) {
        info!("game over: {:?}", game_over.cause);
    }
}

fn win_session(
    _victory: On<GameVictory>,
    mut session: ResMut<GameSession>,
    mut machines: Query<&mut CharacterStateMachine>,
) {
    if !session.declare_victory() {
        return;
    }
    info!("all {} collectibles gathered", session.collected());
    for mut machine in &mut machines {
        machine.declare_victory();
    }
}

fn tick_session(mut session: ResMut<GameSession>, time: Res<Time>, mut commands: Commands) {
    if session.timer.advance(time.delta()) {
        commands.trigger(GameOver {
            cause: GameOverCause::TimeUp,
        });
    }
}

fn collect_items(
    mut collisions: MessageReader<CollisionStart>,
    collectibles: Query<&Transform, With<Collectible>>,
    characters: Query<(), With<GravityCharacter>>,
    mut session: ResMut<GameSession>,
    mut commands: Commands,
) {
    for collision in collisions.read() {
        let pairs = [
            (collision.collider1, collision.body2),
            (collision.collider2, collision.body1),
        ];
        for (item, body) in pairs {
            let Some(collector) = body.filter(|body| characters.contains(*body)) else {
                continue;
            };
            let Ok(transform) = collectibles.get(item) else {
                continue;
            };
            let Some(remaining) = session.collect(item) else {
                continue;
            };
            info!("{collector} collected {item}, {remaining} left");
            begin_collect(&mut commands, item, collector, *transform);
            if remaining == 0 {
                commands.trigger(GameVictory);
            }
        }
    }
}

/// The item may be despawned by someone else before these commands apply, in which case the
/// pickup is silently dropped.
fn begin_collect(commands: &mut Commands, item: Entity, collector: Entity, from: Transform) {
    commands
        .entity(item)
        .try_remove::<Collectible>()
        .try_insert((ColliderDisabled, CollectSequence::new(collector, from)));
    commands.trigger(Collected {
        entity: collector,
        item,
        amount: 1,
    });
}

fn animate_collect_sequences(
    mut items: Query<(Entity, &mut CollectSequence, &mut Transform)>,
    collectors: Query<&Transform, Without<CollectSequence>>,
    time: Res<Time>,
    mut commands: Commands,
) {
    for (entity, mut sequence, mut transform) in &mut items {
        let target = collectors
            .get(sequence.collector)
            .map_or(sequence.from.translation, |collector| collector.translation);
        *transform = sequence.advance(time.delta_secs(), target);
        if sequence.is_finished() {
            commands.entity(entity).try_despawn();
        }
    }
}
