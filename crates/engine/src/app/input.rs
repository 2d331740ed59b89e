use crate::world::{Direction, InputEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Confirm,
    ToggleFullscreen,
    Quit,
}

const ACTION_COUNT: usize = 7;

const MOVE_ACTIONS: [(InputAction, Direction); 4] = [
    (InputAction::MoveUp, Direction::Up),
    (InputAction::MoveDown, Direction::Down),
    (InputAction::MoveLeft, Direction::Left),
    (InputAction::MoveRight, Direction::Right),
];

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::Confirm => 4,
            InputAction::ToggleFullscreen => 5,
            InputAction::Quit => 6,
        }
    }

    /// Whether a held key's auto-repeat counts as a fresh press.
    pub(crate) const fn repeats(self) -> bool {
        !matches!(self, InputAction::ToggleFullscreen | InputAction::Quit)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }
}

/// Input gathered between two fixed ticks: held keys plus press edges.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    held: ActionStates,
    pressed: ActionStates,
    quit_requested: bool,
}

impl InputSnapshot {
    pub(crate) fn new(held: ActionStates, pressed: ActionStates, quit_requested: bool) -> Self {
        Self {
            held,
            pressed,
            quit_requested,
        }
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.held.is_down(action)
    }

    pub fn was_pressed(&self, action: InputAction) -> bool {
        self.pressed.is_down(action)
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    /// Press edges translated into world events. Confirm goes first so a
    /// dialogue closed this tick does not swallow a movement press.
    pub fn world_events(&self) -> Vec<InputEvent> {
        let mut events = Vec::new();
        if self.was_pressed(InputAction::Confirm) {
            events.push(InputEvent::Confirm);
        }
        for (action, direction) in MOVE_ACTIONS {
            if self.was_pressed(action) {
                events.push(InputEvent::Move(direction));
            }
        }
        events
    }
}
