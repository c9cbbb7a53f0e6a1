//! Echo Runner - a procedurally generated side-scrolling platformer
//!
//! Core modules:
//! - `sim`: Deterministic simulation (physics, generation, game state)
//! - `session`: Host-facing fixed timestep driver and input snapshotting
//! - `palette`: Opaque color tokens attached to entities
//! - `settings`: Player preferences that shape the simulation config
//! - `highscores` / `persistence`: Best-effort storage of finished runs

pub mod highscores;
pub mod palette;
pub mod persistence;
pub mod session;
pub mod settings;
pub mod sim;

pub use highscores::HighScores;
pub use palette::{Color, Palette};
pub use session::Session;
pub use settings::{QualityPreset, Settings};

/// Game configuration constants
///
/// All rates are per simulation tick; the session runs ticks at `SIM_HZ`.
pub mod consts {
    /// Fixed simulation rate (ticks per second)
    pub const SIM_HZ: f32 = 60.0;
    /// Fixed simulation timestep in seconds
    pub const SIM_DT: f32 = 1.0 / SIM_HZ;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Downward acceleration (px/tick²)
    pub const GRAVITY: f32 = 0.7;
    /// Gravity multiplier while jump is held on the way up
    pub const JUMP_HOLD_GRAVITY_MULT: f32 = 0.5;
    /// Gravity multiplier while ground-pounding
    pub const GROUND_POUND_GRAVITY_MULT: f32 = 3.0;
    /// Horizontal acceleration per tick of held input
    pub const ACCEL: f32 = 0.8;
    /// Extra damping applied to grounded acceleration
    pub const GROUND_ACCEL_DRAG: f32 = 0.88;
    /// Horizontal speed cap
    pub const MAX_SPEED: f32 = 5.5;
    /// Velocity retained per tick with no input
    pub const GROUND_FRICTION: f32 = 0.85;
    pub const AIR_FRICTION: f32 = 0.75;
    pub const ICE_FRICTION: f32 = 0.99;

    /// Base jump impulse (negative is up)
    pub const JUMP_FORCE: f32 = -15.0;
    /// Jump boost per aero upgrade
    pub const AERO_JUMP_BONUS: f32 = 0.1;
    /// Double jump impulse as a fraction of `JUMP_FORCE`
    pub const DOUBLE_JUMP_FACTOR: f32 = 0.8;
    /// Stomp bounce as a fraction of `JUMP_FORCE`
    pub const STOMP_BOUNCE_FACTOR: f32 = 0.6;
    /// Air jumps granted by a grounded jump
    pub const MAX_AIR_JUMPS: u8 = 1;

    /// Ground-pound entry velocity
    pub const GROUND_POUND_SPEED: f32 = 22.0;
    /// Horizontal speed kept when a ground pound starts
    pub const GROUND_POUND_VX_KEEP: f32 = 0.3;

    /// Landing tolerance above a platform top
    pub const LANDING_TOLERANCE: f32 = 5.0;
    /// Stomp tolerance below an enemy top
    pub const STOMP_TOLERANCE: f32 = 10.0;
    /// Only platforms this far outside the camera window are collision-tested
    pub const COLLISION_CULL_MARGIN: f32 = 1000.0;
    /// Impact speed above which a landing shakes the camera
    pub const HARD_LANDING_SPEED: f32 = 12.0;

    /// Distance below the camera bottom that counts as a fall death
    pub const FALL_DEATH_MARGIN: f32 = 100.0;
    /// Camera easing factor (fraction of remaining distance per tick)
    pub const CAMERA_SMOOTHING: f32 = 0.1;
    /// Squash/stretch relaxation factor per tick
    pub const SCALE_RELAX: f32 = 0.1;

    /// Player box size
    pub const PLAYER_SIZE: f32 = 25.0;
    pub const PLAYER_START_HEALTH: i32 = 3;
    /// Ticks of invincibility after taking damage
    pub const INVINCIBILITY_TICKS: u32 = 60;
    /// Knockback applied when hurt by an enemy
    pub const KNOCKBACK_VX: f32 = 10.0;
    pub const KNOCKBACK_VY: f32 = -5.0;

    /// Upgrade caps
    pub const AERO_LIMIT: u8 = 5;
    pub const VITAL_LIMIT: u8 = 3;
    pub const PULSE_LIMIT: u8 = 5;
    /// Ticks the upgrade panel flashes after an invalid choice
    pub const UPGRADE_ERROR_TICKS: u32 = 30;

    /// Pulse kill radius around the player center
    pub const PULSE_RADIUS: f32 = 300.0;

    /// Bomb blast radius; the player is launched within twice this
    pub const BOMB_BLAST_RADIUS: f32 = 80.0;
    pub const BOMB_SIZE: f32 = 12.0;
    pub const BOMB_GRAVITY_MULT: f32 = 1.2;
    pub const BOMB_THROW_VY: f32 = -6.0;
    /// Bombs explode once this far below the camera bottom
    pub const BOMB_FALLOUT_MARGIN: f32 = 300.0;

    /// Combo window in ticks
    pub const COMBO_TIMEOUT: u32 = 300;
    pub const COMBO_MAX: u32 = 5;
    /// Score per kill before the combo multiplier
    pub const KILL_SCORE: u64 = 10;

    /// Score milestones that trigger a one-shot banner
    pub const MILESTONES: [u64; 5] = [500, 1000, 2000, 3500, 5000];
    pub const MILESTONE_BANNER_TICKS: u32 = 120;

    /// Ticks behind the player that the ghost trails
    pub const GHOST_DELAY: usize = 30;
    pub const HISTORY_CAPACITY: usize = GHOST_DELAY * 2;

    /// Shard lifetimes
    pub const SNAP_SHARD_LIFE: f32 = 45.0;
    /// Snap shards drift for this many life units, then free-fall
    pub const SNAP_DRIFT_UNITS: f32 = 15.0;
}

/// Normalized angle to [0, 2π)
#[inline]
pub fn wrap_angle(angle: f32) -> f32 {
    angle.rem_euclid(std::f32::consts::TAU)
}

/// Shortest angular distance between two angles
#[inline]
pub fn angle_distance(a: f32, b: f32) -> f32 {
    let diff = (wrap_angle(a) - wrap_angle(b)).abs();
    diff.min(std::f32::consts::TAU - diff)
}
