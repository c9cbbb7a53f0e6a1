//! Player intent
//!
//! Hosts translate keys or touches into held intents and discrete actions
//! on an `InputState`. Each tick takes one snapshot of it.

use serde::{Deserialize, Serialize};

use super::state::UpgradeKind;

/// Held intents for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickInput {
    pub left: bool,
    pub right: bool,
    /// Starts a ground pound while airborne
    pub down: bool,
    /// Softens gravity on the way up
    pub jump_held: bool,
}

/// Continuous intents a host can press and release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    Left,
    Right,
    Down,
    JumpHeld,
}

/// Edge-triggered commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Jump,
    Pulse,
    DropBomb,
    SelectUpgrade(UpgradeKind),
    Restart,
}

/// Input shared between the host and the tick loop
#[derive(Debug, Clone, Default)]
pub struct InputState {
    held: TickInput,
    queued: Vec<Action>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, intent: Intent, pressed: bool) {
        match intent {
            Intent::Left => self.held.left = pressed,
            Intent::Right => self.held.right = pressed,
            Intent::Down => self.held.down = pressed,
            Intent::JumpHeld => self.held.jump_held = pressed,
        }
    }

    pub fn push(&mut self, action: Action) {
        self.queued.push(action);
    }

    /// Release everything, e.g. when the window loses focus
    pub fn clear(&mut self) {
        self.held = TickInput::default();
        self.queued.clear();
    }

    pub fn held(&self) -> TickInput {
        self.held
    }

    /// Held intents plus every action queued since the last snapshot
    pub fn snapshot(&mut self) -> (TickInput, Vec<Action>) {
        (self.held, std::mem::take(&mut self.queued))
    }
}
