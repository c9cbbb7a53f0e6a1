//! Game state and core simulation types
//!
//! Everything a single run mutates lives in one `World`. Restarting a run
//! replaces the whole value, so no partial reset is ever observable.

use std::collections::{BTreeSet, VecDeque};

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::entities;
use super::generator::{self, GenerationCursor};
use super::geom::Rect;
use super::levels::{self, LevelReward, PlatformType, RewardKind};
use crate::consts::*;
use crate::palette::{Color, Palette};

/// Stable identifier of a platform in the arena
pub type PlatformId = u32;

/// Upper bound on undrained events kept in the world
pub const MAX_PENDING_EVENTS: usize = 256;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Waiting for an upgrade choice; motion is frozen
    LevelUp,
    /// Run ended; terminal until restart
    Dead,
}

/// Visible area the camera frames, in world pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

/// Host-provided configuration fixed for the duration of a run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimConfig {
    pub viewport: Viewport,
    pub palette: Palette,
    /// Cap on live shards
    pub max_particles: usize,
    /// Camera shake enabled (off under reduced motion)
    pub screen_shake: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            palette: Palette::standard(),
            max_particles: 500,
            screen_shake: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpgradeKind {
    /// Higher jumps
    Aero,
    /// More health
    Vital,
    /// Unlocks and strengthens the pulse
    Pulse,
}

impl UpgradeKind {
    pub const ALL: [UpgradeKind; 3] = [UpgradeKind::Aero, UpgradeKind::Vital, UpgradeKind::Pulse];

    pub fn limit(self) -> u8 {
        match self {
            UpgradeKind::Aero => AERO_LIMIT,
            UpgradeKind::Vital => VITAL_LIMIT,
            UpgradeKind::Pulse => PULSE_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upgrades {
    pub aero: u8,
    pub vital: u8,
    pub pulse: u8,
}

impl Upgrades {
    pub fn get(&self, kind: UpgradeKind) -> u8 {
        match kind {
            UpgradeKind::Aero => self.aero,
            UpgradeKind::Vital => self.vital,
            UpgradeKind::Pulse => self.pulse,
        }
    }

    pub fn get_mut(&mut self, kind: UpgradeKind) -> &mut u8 {
        match kind {
            UpgradeKind::Aero => &mut self.aero,
            UpgradeKind::Vital => &mut self.vital,
            UpgradeKind::Pulse => &mut self.pulse,
        }
    }

    pub fn total(&self) -> u32 {
        self.aero as u32 + self.vital as u32 + self.pulse as u32
    }
}

/// Player position relative to a rotating platform's center
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationAnchor {
    /// Angle relative to the platform's own rotation
    pub angle: f32,
    pub distance: f32,
}

/// Surface material under the player's feet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Surface {
    #[default]
    Normal,
    /// Almost no friction
    Ice,
}

/// The player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub pos: Vec2,
    pub vel: Vec2,
    pub size: Vec2,
    /// Squash/stretch, relaxes toward 1
    pub scale: Vec2,
    pub health: i32,
    pub max_health: i32,
    pub invincible_timer: u32,
    pub grounded: bool,
    pub upgrades: Upgrades,
    /// Displayed polygon vertex count (3 + upgrades)
    pub vertices: u32,
    pub rotation: f32,
    /// Platform stood on, looked up by id; never owned
    pub standing_on: Option<PlatformId>,
    /// Surface of the platform stood on this tick
    pub surface: Option<Surface>,
    /// Set while grounded on a rotating platform
    pub anchor: Option<RotationAnchor>,
    /// Standing platform position last tick (displacement carry)
    pub platform_last_pos: Vec2,
    /// First-landing latch, cleared whenever airborne
    pub has_landed: bool,
    pub bombs: u32,
    pub ground_pounding: bool,
    pub air_jumps: u8,
    pub color: Color,
}

impl Player {
    #[inline]
    pub fn rect(&self) -> Rect {
        Rect {
            pos: self.pos,
            size: self.size,
        }
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.pos + self.size * 0.5
    }

    /// Restore health by `amount`, or grow max health when already full
    pub fn heal_or_grow(&mut self, amount: i32) {
        if self.health < self.max_health {
            self.health = (self.health + amount).min(self.max_health);
        } else {
            self.max_health += amount;
            self.health = self.max_health;
        }
    }

    pub fn set_airborne(&mut self) {
        self.grounded = false;
        self.has_landed = false;
        self.standing_on = None;
        self.anchor = None;
    }
}

/// Crumble platform lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CrumblePhase {
    Intact,
    /// Counting down after first contact
    Shaking { timer: u32, jitter: Vec2 },
    /// Collapsed; no longer collidable
    Falling { vy: f32 },
}

/// Platform behavior with the data only that behavior needs
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PlatformKind {
    Static,
    /// Oscillates between `start_x` and `end_x`
    Horizontal { start_x: f32, end_x: f32, speed: f32 },
    /// Oscillates between `start_y` and `end_y` (`end_y` is above)
    Vertical { start_y: f32, end_y: f32, speed: f32 },
    Crumble { phase: CrumblePhase },
    Rotating { angle: f32, speed: f32 },
    /// Cycles collidability on a fixed period
    Phasing { phased_out: bool, opacity: f32 },
}

/// Crumble countdown after first contact
pub const CRUMBLE_TICKS: u32 = 30;
/// Gravity applied to collapsed crumble platforms
pub const CRUMBLE_FALL_GRAVITY: f32 = 0.5;
/// Phasing period and the flicker window before turning solid
pub const PHASE_CYCLE_TICKS: u64 = 180;
pub const PHASE_WARNING_START: u64 = 150;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Platform {
    pub id: PlatformId,
    pub rect: Rect,
    pub kind: PlatformKind,
    pub color: Color,
    pub surface: Surface,
    /// The run's starting platform
    pub neutral: bool,
}

impl Platform {
    pub fn platform_type(&self) -> PlatformType {
        match self.kind {
            PlatformKind::Static => PlatformType::Static,
            PlatformKind::Horizontal { .. } => PlatformType::Horizontal,
            PlatformKind::Vertical { .. } => PlatformType::Vertical,
            PlatformKind::Crumble { .. } => PlatformType::Crumble,
            PlatformKind::Rotating { .. } => PlatformType::Rotating,
            PlatformKind::Phasing { .. } => PlatformType::Phasing,
        }
    }

    /// Whether the player and bombs can land on it this tick
    pub fn is_collidable(&self) -> bool {
        !matches!(
            self.kind,
            PlatformKind::Crumble {
                phase: CrumblePhase::Falling { .. }
            } | PlatformKind::Phasing {
                phased_out: true,
                ..
            }
        )
    }

    pub fn is_falling(&self) -> bool {
        matches!(
            self.kind,
            PlatformKind::Crumble {
                phase: CrumblePhase::Falling { .. }
            }
        )
    }

    /// Area the platform can occupy over its motion cycle
    pub fn envelope(&self) -> Rect {
        match self.kind {
            PlatformKind::Horizontal { start_x, end_x, speed } => Rect::new(
                start_x - speed.abs(),
                self.rect.top(),
                end_x - start_x + self.rect.size.x + 2.0 * speed.abs(),
                self.rect.size.y,
            ),
            PlatformKind::Vertical { start_y, end_y, speed } => Rect::new(
                self.rect.left(),
                end_y - speed.abs(),
                self.rect.size.x,
                start_y - end_y + self.rect.size.y + 2.0 * speed.abs(),
            ),
            _ => self.rect,
        }
    }

    /// Angular velocity for rotating platforms
    pub fn angular_speed(&self) -> Option<f32> {
        match self.kind {
            PlatformKind::Rotating { speed, .. } => Some(speed),
            _ => None,
        }
    }

    pub fn angle(&self) -> f32 {
        match self.kind {
            PlatformKind::Rotating { angle, .. } => angle,
            _ => 0.0,
        }
    }

    /// Start the collapse countdown; no-op unless an intact crumble platform
    pub fn start_crumble(&mut self) {
        if let PlatformKind::Crumble { phase } = &mut self.kind
            && *phase == CrumblePhase::Intact
        {
            *phase = CrumblePhase::Shaking {
                timer: CRUMBLE_TICKS,
                jitter: Vec2::ZERO,
            };
        }
    }
}

/// Enemy movement pattern
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EnemyKind {
    /// Patrols the top of a platform
    OnPlatform,
    /// Patrols a gap while hovering around `base_y`
    MidAir { base_y: f32, hover_offset: f32 },
}

pub const ENEMY_SIZE: f32 = 25.0;
pub const HOVER_RATE: f32 = 0.05;
pub const HOVER_AMPLITUDE: f32 = 75.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub id: u32,
    pub rect: Rect,
    pub vx: f32,
    pub patrol_min: f32,
    pub patrol_max: f32,
    pub kind: EnemyKind,
}

/// A stationary pickup (fragment, bomb or heart)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collectible {
    pub id: u32,
    pub rect: Rect,
    pub collected: bool,
}

/// A thrown bomb in flight
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveBomb {
    pub rect: Rect,
    pub vel: Vec2,
}

/// Shard decay behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShardRegime {
    /// Drifts with drag for the first units of life, then free-falls
    Snap,
    /// Constant gravity, fractional life decay
    Drift,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shard {
    pub pos: Vec2,
    pub vel: Vec2,
    pub life: f32,
    pub regime: ShardRegime,
    pub color: Color,
}

/// Expanding light-reveal ring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ripple {
    pub pos: Vec2,
    pub radius: f32,
    pub max_radius: f32,
    /// 1.0 fading to 0
    pub life: f32,
    pub color: Color,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloatingLabel {
    pub pos: Vec2,
    pub text: String,
    pub life: u32,
    pub max_life: u32,
    pub color: Color,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightSource {
    pub pos: Vec2,
    pub radius: f32,
    /// 1.0 fading to 0
    pub life: f32,
}

/// Parallax background star (presentation only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Star {
    pub pos: Vec2,
    pub size: f32,
    pub speed: f32,
    pub opacity: f32,
}

/// One entry of the ghost trail history
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub pos: Vec2,
    pub rotation: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboState {
    pub count: u32,
    pub timer: u32,
    pub multiplier: u32,
}

impl Default for ComboState {
    fn default() -> Self {
        Self {
            count: 0,
            timer: 0,
            multiplier: 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneState {
    pub active: bool,
    pub timer: u32,
    pub score: u64,
    /// Thresholds already celebrated this run
    pub triggered: BTreeSet<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LevelState {
    pub current: u32,
    pub previous: u32,
    pub tier: u8,
    pub just_leveled_up: bool,
    pub is_tier_transition: bool,
    pub level_up_timer: u32,
    pub tier_transition_timer: u32,
    pub reward_display_timer: u32,
    /// Rewards announced but not yet applied, oldest first
    pub pending_rewards: VecDeque<LevelReward>,
    /// Reward levels already scheduled this run
    pub triggered_rewards: BTreeSet<u32>,
}

impl Default for LevelState {
    fn default() -> Self {
        Self {
            current: 1,
            previous: 1,
            tier: 1,
            just_leveled_up: false,
            is_tier_transition: false,
            level_up_timer: 0,
            tier_transition_timer: 0,
            reward_display_timer: 0,
            pending_rewards: VecDeque::new(),
            triggered_rewards: BTreeSet::new(),
        }
    }
}

/// End-of-run summary handed to persistence
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub score: u64,
    pub enemies_defeated: u32,
    pub fragments_collected: u32,
    pub upgrades_acquired: u32,
    pub distance_traveled: u64,
    pub highest_level: u32,
    pub rewards_collected: u32,
}

/// Notable things that happened during a tick (audio, haptics, UI)
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Jumped,
    DoubleJumped,
    Landed { impact: f32 },
    GroundPoundImpact,
    EnemyStomped { combo: u32 },
    PlayerDamaged { health: i32 },
    FragmentCollected,
    UpgradeChosen(UpgradeKind),
    BombCollected,
    BombThrown,
    BombExploded { kills: u32 },
    HeartCollected,
    Pulse { kills: u32 },
    MilestoneReached(u64),
    LevelUp { level: u32, tier_transition: bool },
    RewardGranted(RewardKind),
    Died,
}

/// Complete state of one run
#[derive(Debug, Clone)]
pub struct World {
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    pub config: SimConfig,
    pub phase: GamePhase,
    /// Ticks since the run started (advances while playing or choosing)
    pub time: u64,
    pub player: Player,
    /// Ordered by id, which is also generation (x) order
    pub platforms: Vec<Platform>,
    pub enemies: Vec<Enemy>,
    pub fragments: Vec<Collectible>,
    pub bomb_pickups: Vec<Collectible>,
    pub heart_pickups: Vec<Collectible>,
    pub active_bombs: Vec<ActiveBomb>,
    pub shards: Vec<Shard>,
    pub ripples: Vec<Ripple>,
    pub labels: Vec<FloatingLabel>,
    pub lights: Vec<LightSource>,
    pub stars: Vec<Star>,
    /// Recent player poses, newest last
    pub history: VecDeque<PositionSnapshot>,
    /// Top-left of the camera window
    pub camera: Vec2,
    pub screen_shake: f32,
    pub glitch_timer: u32,
    pub upgrade_error_timer: u32,
    pub score: u64,
    pub cursor: GenerationCursor,
    pub combo: ComboState,
    pub milestone: MilestoneState,
    pub level: LevelState,
    pub stats: RunStats,
    pub events: Vec<GameEvent>,
    /// Set exactly once, on the transition to `Dead`
    finished_run: Option<RunStats>,
    next_id: u32,
}

impl World {
    /// Build a fresh run: start platform, player on it, initial terrain
    pub fn new(seed: u64, config: SimConfig) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let viewport = config.viewport;
        let stars = entities::generate_stars(&mut rng, viewport);
        let mut world = Self {
            seed,
            rng,
            config,
            phase: GamePhase::Playing,
            time: 0,
            player: entities::create_player(viewport, config.palette.player),
            platforms: Vec::new(),
            enemies: Vec::new(),
            fragments: Vec::new(),
            bomb_pickups: Vec::new(),
            heart_pickups: Vec::new(),
            active_bombs: Vec::new(),
            shards: Vec::new(),
            ripples: Vec::new(),
            labels: Vec::new(),
            lights: Vec::new(),
            stars,
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
            camera: Vec2::ZERO,
            screen_shake: 0.0,
            glitch_timer: 0,
            upgrade_error_timer: 0,
            score: 0,
            cursor: GenerationCursor::default(),
            combo: ComboState::default(),
            milestone: MilestoneState::default(),
            level: LevelState::default(),
            stats: RunStats {
                highest_level: 1,
                ..Default::default()
            },
            events: Vec::new(),
            finished_run: None,
            next_id: 1,
        };

        let id = world.next_entity_id();
        let start = entities::start_platform(id, viewport, &config.palette);
        world.player.pos = Vec2::new(start.rect.center().x - world.player.size.x / 2.0, start.rect.top() - world.player.size.y);
        world.player.grounded = true;
        world.player.has_landed = true;
        world.player.standing_on = Some(start.id);
        world.player.platform_last_pos = start.rect.pos;
        world.cursor = GenerationCursor::after(&start);
        world.platforms.push(start);

        let target = viewport.width * 1.5;
        while world.cursor.frontier_x < target {
            generator::generate_batch(&mut world);
        }

        log::info!(
            "Run started: seed={} platforms={} frontier={:.0}",
            seed,
            world.platforms.len(),
            world.cursor.frontier_x
        );
        world
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn platform(&self, id: PlatformId) -> Option<&Platform> {
        self.platforms
            .binary_search_by_key(&id, |p| p.id)
            .ok()
            .map(|i| &self.platforms[i])
    }

    pub fn platform_mut(&mut self, id: PlatformId) -> Option<&mut Platform> {
        self.platforms
            .binary_search_by_key(&id, |p| p.id)
            .ok()
            .map(|i| &mut self.platforms[i])
    }

    /// Pose 30 ticks behind the player, once enough history exists
    pub fn ghost(&self) -> Option<PositionSnapshot> {
        let len = self.history.len();
        if len > GHOST_DELAY {
            self.history.get(len - 1 - GHOST_DELAY).copied()
        } else {
            None
        }
    }

    pub fn tier(&self) -> &'static levels::TierDefinition {
        levels::tier_definition(self.level.current)
    }

    pub fn push_event(&mut self, event: GameEvent) {
        if self.events.len() >= MAX_PENDING_EVENTS {
            self.events.remove(0);
        }
        self.events.push(event);
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Close the run; only the first call records stats
    pub(crate) fn finish_run(&mut self) {
        if self.finished_run.is_none() {
            self.stats.score = self.score;
            self.finished_run = Some(self.stats.clone());
        }
    }

    /// Stats of the finished run, handed out once
    pub fn take_finished_run(&mut self) -> Option<RunStats> {
        self.finished_run.take()
    }

    /// Bottom edge of the camera window
    #[inline]
    pub fn camera_bottom(&self) -> f32 {
        self.camera.y + self.config.viewport.height
    }

    pub fn shake(&mut self, amount: f32) {
        if self.config.screen_shake {
            self.screen_shake = self.screen_shake.max(amount);
        }
    }
}
