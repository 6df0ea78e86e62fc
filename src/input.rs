use crate::{gravity::GravityArrow, prelude::*};

pub(super) fn plugin(app: &mut App) {
    app.add_observer(apply_movement)
        .add_observer(apply_jump)
        .add_observer(apply_confirm)
        .add_observer(press_gravity::<GravityUp>)
        .add_observer(press_gravity::<GravityDown>)
        .add_observer(press_gravity::<GravityLeft>)
        .add_observer(press_gravity::<GravityRight>)
        .add_observer(hold_gravity::<GravityUp>)
        .add_observer(hold_gravity::<GravityDown>)
        .add_observer(hold_gravity::<GravityLeft>)
        .add_observer(hold_gravity::<GravityRight>)
        .add_observer(apply_rotate_camera)
        .add_observer(apply_zoom)
        .add_systems(Last, clear_frame_input);
}

#[derive(Debug, InputAction)]
#[action_output(Vec2)]
pub struct Movement;

#[derive(Debug, InputAction)]
#[action_output(bool)]
pub struct Jump;

#[derive(Debug, InputAction)]
#[action_output(bool)]
pub struct ConfirmGravity;

#[derive(Debug, InputAction)]
#[action_output(bool)]
pub struct GravityUp;

#[derive(Debug, InputAction)]
#[action_output(bool)]
pub struct GravityDown;

#[derive(Debug, InputAction)]
#[action_output(bool)]
pub struct GravityLeft;

#[derive(Debug, InputAction)]
#[action_output(bool)]
pub struct GravityRight;

/// Look delta in degrees. Use a `DeltaScale` modifier for stick bindings.
#[derive(Debug, InputAction)]
#[action_output(Vec2)]
pub struct RotateCamera;

#[derive(Debug, InputAction)]
#[action_output(f32)]
pub struct ZoomCamera;

pub trait GravityAction: InputAction {
    const ARROW: GravityArrow;
}

impl GravityAction for GravityUp {
    const ARROW: GravityArrow = GravityArrow::Up;
}

impl GravityAction for GravityDown {
    const ARROW: GravityArrow = GravityArrow::Down;
}

impl GravityAction for GravityLeft {
    const ARROW: GravityArrow = GravityArrow::Left;
}

impl GravityAction for GravityRight {
    const ARROW: GravityArrow = GravityArrow::Right;
}

/// Which gravity arrows are held this frame.
#[derive(Clone, Copy, Reflect, Default, Debug, PartialEq, Eq)]
pub struct GravityArrows {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl GravityArrows {
    pub fn hold(&mut self, arrow: GravityArrow) {
        match arrow {
            GravityArrow::Up => self.up = true,
            GravityArrow::Down => self.down = true,
            GravityArrow::Left => self.left = true,
            GravityArrow::Right => self.right = true,
        }
    }

    /// The arrow that wins when several are held: up, then down, then left, then right.
    pub fn dominant(&self) -> Option<GravityArrow> {
        [
            (self.up, GravityArrow::Up),
            (self.down, GravityArrow::Down),
            (self.left, GravityArrow::Left),
            (self.right, GravityArrow::Right),
        ]
        .into_iter()
        .find_map(|(held, arrow)| held.then_some(arrow))
    }
}

/// Input gathered during the current frame. Cleared in [`Last`].
#[derive(Component, Clone, Reflect, Default, Debug)]
#[reflect(Component)]
pub struct CharacterInput {
    pub movement: Vec2,
    // Pressed this frame
    pub jump: bool,
    pub confirm_gravity: bool,
    pub gravity_pressed: bool,
    // Held this frame
    pub gravity_held: GravityArrows,
    // Accumulated over the frame
    pub look: Vec2,
    pub zoom: f32,
}

fn apply_movement(movement: On<Fire<Movement>>, mut inputs: Query<&mut CharacterInput>) {
    if let Ok(mut input) = inputs.get_mut(movement.context) {
        input.movement = movement.value;
    }
}

fn apply_jump(jump: On<Start<Jump>>, mut inputs: Query<&mut CharacterInput>) {
    if let Ok(mut input) = inputs.get_mut(jump.context) {
        input.jump = true;
    }
}

fn apply_confirm(confirm: On<Start<ConfirmGravity>>, mut inputs: Query<&mut CharacterInput>) {
    if let Ok(mut input) = inputs.get_mut(confirm.context) {
        input.confirm_gravity = true;
    }
}

fn press_gravity<A: GravityAction>(press: On<Start<A>>, mut inputs: Query<&mut CharacterInput>) {
    if let Ok(mut input) = inputs.get_mut(press.context) {
        input.gravity_pressed = true;
        input.gravity_held.hold(A::ARROW);
    }
}

fn hold_gravity<A: GravityAction>(hold: On<Fire<A>>, mut inputs: Query<&mut CharacterInput>) {
    if let Ok(mut input) = inputs.get_mut(hold.context) {
        input.gravity_held.hold(A::ARROW);
    }
}

fn apply_rotate_camera(rotate: On<Fire<RotateCamera>>, mut inputs: Query<&mut CharacterInput>) {
    if let Ok(mut input) = inputs.get_mut(rotate.context) {
        input.look += rotate.value;
    }
}

fn apply_zoom(zoom: On<Fire<ZoomCamera>>, mut inputs: Query<&mut CharacterInput>) {
    if let Ok(mut input) = inputs.get_mut(zoom.context) {
        input.zoom += zoom.value;
    }
}

fn clear_frame_input(mut inputs: Query<&mut CharacterInput>) {
    for mut input in &mut inputs {
        *input = CharacterInput::default();
    }
}
