//! The character's behavior state machine.
//!
//! The machine never touches the world. Every tick it reads a [`FrameSnapshot`], performs at most
//! one transition (old exit hook, then new enter hook) and runs the active state's update. Anything
//! that has to happen to the character is pushed as a [`StateEffect`] for the caller to apply.

use crate::{
    gravity::{GravityArrow, GravityDirection},
    prelude::*,
};

/// Stick deflection below this counts as no movement input.
pub const MOVE_EPSILON: f32 = f32::EPSILON;

/// Everything the machine may look at during one tick.
#[derive(Clone, Copy, Default, Debug, PartialEq)]
pub struct FrameSnapshot {
    pub movement: Vec2,
    pub jump_pressed: bool,
    pub gravity_pressed: bool,
    pub gravity_held: Option<GravityArrow>,
    pub confirm_pressed: bool,
    pub grounded: bool,
    /// Linear velocity projected on the current up axis.
    pub up_speed: f32,
    pub gravity: GravityDirection,
}

impl FrameSnapshot {
    pub fn is_moving(&self) -> bool {
        self.movement.x.abs() > MOVE_EPSILON || self.movement.y.abs() > MOVE_EPSILON
    }
}

/// Which speed profile a moving state uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gait {
    Ground,
    Air,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StateEffect {
    PlayAnimation(&'static str),
    /// Impulse of the character's jump power along its up axis.
    JumpImpulse,
    Move(Gait),
    ShowHologram,
    /// The provisional gravity changed; re-orient the hologram toward it.
    PreviewGravity(Dir3),
    HideHologram,
    CommitGravity(Dir3),
}

#[derive(Clone, Copy, Reflect, Debug, PartialEq, Eq, Hash)]
pub enum StateKind {
    Idle,
    Walking,
    Jumping,
    GravitySelect,
    Victory,
}

#[derive(Clone, Copy, Reflect, Debug, PartialEq)]
pub enum CharacterState {
    Idle,
    Walking,
    Jumping {
        /// Set once an airborne frame with upward velocity was seen. Landing is only checked
        /// afterwards, so the frame that applies the impulse cannot count as a landing.
        left_ground: bool,
    },
    GravitySelect {
        /// Committed gravity when selection began. Arrows are resolved against this frame.
        entry: GravityDirection,
        provisional: Dir3,
        previewed: Dir3,
    },
    Victory,
}

impl CharacterState {
    pub fn kind(&self) -> StateKind {
        match self {
            Self::Idle => StateKind::Idle,
            Self::Walking => StateKind::Walking,
            Self::Jumping { .. } => StateKind::Jumping,
            Self::GravitySelect { .. } => StateKind::GravitySelect,
            Self::Victory => StateKind::Victory,
        }
    }

    pub fn animation(&self) -> Option<&'static str> {
        match self {
            Self::Idle => Some("Idle"),
            Self::Walking => Some("Walk"),
            Self::Jumping { .. } => Some("Jump"),
            Self::GravitySelect { .. } => None,
            Self::Victory => Some("Dance"),
        }
    }

    fn select_from(gravity: GravityDirection) -> Self {
        Self::GravitySelect {
            entry: gravity,
            provisional: gravity.get(),
            previewed: gravity.get(),
        }
    }

    fn enter(&self, effects: &mut Vec<StateEffect>) {
        if let Some(clip) = self.animation() {
            effects.push(StateEffect::PlayAnimation(clip));
        }
        match self {
            Self::Jumping { .. } => effects.push(StateEffect::JumpImpulse),
            Self::GravitySelect { .. } => effects.push(StateEffect::ShowHologram),
            _ => {}
        }
    }

    fn exit(&self, effects: &mut Vec<StateEffect>) {
        if let Self::GravitySelect { provisional, .. } = self {
            effects.push(StateEffect::CommitGravity(*provisional));
            effects.push(StateEffect::HideHologram);
        }
    }
}

#[derive(Component, Clone, Reflect, Debug)]
#[reflect(Component)]
pub struct CharacterStateMachine {
    current: CharacterState,
    previous: Option<StateKind>,
    entered: bool,
    victory_pending: bool,
}

impl Default for CharacterStateMachine {
    fn default() -> Self {
        Self {
            current: CharacterState::Idle,
            previous: None,
            entered: false,
            victory_pending: false,
        }
    }
}

impl CharacterStateMachine {
    pub fn current(&self) -> CharacterState {
        self.current
    }

    pub fn previous(&self) -> Option<StateKind> {
        self.previous
    }

    /// Victory is entered on the next [`Self::step`], through the usual exit and enter hooks.
    pub fn declare_victory(&mut self) {
        self.victory_pending = true;
    }

    pub fn is_finished(&self) -> bool {
        self.current == CharacterState::Victory
    }

    pub fn step(&mut self, frame: &FrameSnapshot, effects: &mut Vec<StateEffect>) {
        if !self.entered {
            self.entered = true;
            self.current.enter(effects);
        }
        if let Some(next) = self.next_state(frame) {
            self.set_state(next, effects);
        }
        self.update(frame, effects);
    }

    /// Runs the current state's exit hook fully, records it as the previous state, then enters
    /// `next`.
    pub fn set_state(&mut self, next: CharacterState, effects: &mut Vec<StateEffect>) {
        self.current.exit(effects);
        self.previous = Some(self.current.kind());
        self.current = next;
        self.entered = true;
        self.current.enter(effects);
    }

    fn next_state(&self, frame: &FrameSnapshot) -> Option<CharacterState> {
        use CharacterState::*;

        if self.victory_pending && self.current != Victory {
            return Some(Victory);
        }
        let jump = frame.jump_pressed && frame.grounded;
        let select = frame.gravity_pressed;
        match self.current {
            Idle if jump => Some(Jumping { left_ground: false }),
            Idle if select => Some(CharacterState::select_from(frame.gravity)),
            Idle if frame.is_moving() && frame.grounded => Some(Walking),
            Walking if jump => Some(Jumping { left_ground: false }),
            Walking if select => Some(CharacterState::select_from(frame.gravity)),
            Walking if !frame.is_moving() => Some(Idle),
            Jumping { left_ground } => {
                (left_ground && frame.grounded && frame.up_speed <= 0.0).then_some(Idle)
            }
            GravitySelect { .. } => frame.confirm_pressed.then_some(Idle),
            _ => None,
        }
    }

    fn update(&mut self, frame: &FrameSnapshot, effects: &mut Vec<StateEffect>) {
        match &mut self.current {
            CharacterState::Walking => effects.push(StateEffect::Move(Gait::Ground)),
            CharacterState::Jumping { left_ground } => {
                effects.push(StateEffect::Move(Gait::Air));
                if !*left_ground && !frame.grounded && frame.up_speed > 0.0 {
                    *left_ground = true;
                }
            }
            CharacterState::GravitySelect {
                entry,
                provisional,
                previewed,
            } => {
                if let Some(arrow) = frame.gravity_held {
                    *provisional = arrow.resolve(*entry);
                }
                if provisional != previewed {
                    *previewed = *provisional;
                    effects.push(StateEffect::PreviewGravity(*provisional));
                }
            }
            CharacterState::Idle | CharacterState::Victory => {}
        }
    }
}
