use crate::{GravityCharacter, prelude::*, tween::RotationTween};

pub(super) fn plugin(app: &mut App) {
    app.add_systems(Update, animate_holograms.in_set(TumbleSystems::Animate));
}

/// Preview proxy shown while the player picks a new gravity direction. Its rotation is driven
/// independently of the character's body.
///
/// Rendering code should mirror [`Hologram::is_active`] into visibility.
#[derive(Component, Clone, Copy, Reflect, Default, Debug)]
#[reflect(Component)]
#[require(Transform)]
pub struct Hologram {
    active: bool,
    tween: Option<RotationTween>,
}

impl Hologram {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn show(&mut self) {
        self.active = true;
        self.tween = None;
    }

    pub fn hide(&mut self) {
        self.active = false;
        self.tween = None;
    }

    /// Starts turning from `from` toward `to`, replacing any turn still in flight.
    pub fn turn(&mut self, from: Quat, to: Quat, duration: f32) {
        self.tween = Some(RotationTween::new(from, to, duration));
    }

    pub fn is_turning(&self) -> bool {
        self.tween.is_some()
    }

    fn advance(&mut self, dt: f32) -> Option<Quat> {
        let tween = self.tween.as_mut()?;
        let rotation = tween.advance(dt);
        if tween.is_finished() {
            self.tween = None;
        }
        Some(rotation)
    }
}

#[derive(Component, Clone, Copy)]
#[relationship(relationship_target = CharacterHologram)]
pub struct HologramOf(pub Entity);

#[derive(Component, Clone, Copy)]
#[relationship_target(relationship = HologramOf)]
pub struct CharacterHologram(Entity);

impl CharacterHologram {
    pub fn get(self) -> Entity {
        self.0
    }
}

fn animate_holograms(
    mut holograms: Query<(&mut Hologram, &HologramOf, &mut Transform), Without<GravityCharacter>>,
    characters: Query<&Transform, With<GravityCharacter>>,
    time: Res<Time>,
) {
    for (mut hologram, hologram_of, mut transform) in &mut holograms {
        if let Ok(character) = characters.get(hologram_of.0) {
            transform.translation = character.translation;
        }
        if let Some(rotation) = hologram.advance(time.delta_secs()) {
            transform.rotation = rotation;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hiding_cancels_turn() {
        let mut hologram = Hologram::default();
        hologram.show();
        hologram.turn(Quat::IDENTITY, Quat::from_rotation_y(1.0), 0.5);
        assert!(hologram.is_active() && hologram.is_turning());
        hologram.hide();
        assert!(!hologram.is_active());
        assert!(!hologram.is_turning());
    }

    #[test]
    fn turn_finishes_on_target() {
        let target = Quat::from_rotation_y(1.0);
        let mut hologram = Hologram::default();
        hologram.turn(Quat::IDENTITY, target, 0.5);
        let mut last = None;
        for _ in 0..5 {
            last = hologram.advance(0.2).or(last);
        }
        assert_eq!(last, Some(target));
        assert!(!hologram.is_turning());
    }
}
