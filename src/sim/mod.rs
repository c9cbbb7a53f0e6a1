//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod actions;
pub mod collision;
pub mod effects;
pub mod entities;
pub mod generator;
pub mod geom;
pub mod input;
pub mod levels;
pub mod state;
pub mod tick;

pub use actions::{ActionError, apply_action};
pub use generator::{GenerationCursor, generate_batch};
pub use geom::Rect;
pub use input::{Action, InputState, Intent, TickInput};
pub use levels::{LevelReward, PlatformType, RewardKind, TierDefinition};
pub use state::{
    ActiveBomb, Collectible, CrumblePhase, Enemy, EnemyKind, GameEvent, GamePhase, Platform,
    PlatformId, PlatformKind, Player, RunStats, SimConfig, Surface, UpgradeKind, Upgrades,
    Viewport, World,
};
pub use tick::tick;
