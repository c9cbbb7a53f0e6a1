//! Level and difficulty tier model
//!
//! Cumulative score maps to a level (1..=100) through a precomputed
//! threshold table; every 20 levels form a tier that selects the generation
//! parameters. Selected levels grant a one-shot reward.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::palette::Color;

pub const MAX_LEVEL: u32 = 100;
pub const LEVELS_PER_TIER: u32 = 20;
pub const MAX_TIER: u8 = 5;

/// Levels that open a new tier
pub const TIER_TRANSITION_LEVELS: [u32; 5] = [20, 40, 60, 80, 100];

/// Banner durations (ticks)
pub const LEVEL_BANNER_TICKS: u32 = 150;
pub const TIER_BANNER_TICKS: u32 = 240;
/// Delay between a reward being scheduled and its effect applying
pub const REWARD_DISPLAY_TICKS: u32 = 60;
/// Camera shake applied when a tier opens
pub const TIER_SHAKE: f32 = 12.0;

/// Score needed to reach each level; index 0 is level 1
static LEVEL_THRESHOLDS: LazyLock<[u64; MAX_LEVEL as usize]> = LazyLock::new(|| {
    let mut table = [0u64; MAX_LEVEL as usize];
    for (i, slot) in table.iter_mut().enumerate().skip(1) {
        *slot = (60.0 * (i as f64).powf(1.65)).round() as u64;
    }
    table
});

/// Minimum score for `level` (clamped to 1..=100)
pub fn threshold(level: u32) -> u64 {
    let level = level.clamp(1, MAX_LEVEL);
    LEVEL_THRESHOLDS[(level - 1) as usize]
}

/// Highest level whose threshold `score` meets
pub fn score_to_level(score: u64) -> u32 {
    let reached = LEVEL_THRESHOLDS.partition_point(|&t| t <= score);
    (reached as u32).clamp(1, MAX_LEVEL)
}

/// Difficulty tier (1..=5) for a level
pub fn level_to_tier(level: u32) -> u8 {
    match level {
        0..=20 => 1,
        21..=40 => 2,
        41..=60 => 3,
        61..=80 => 4,
        _ => 5,
    }
}

pub fn is_tier_transition(level: u32) -> bool {
    TIER_TRANSITION_LEVELS.contains(&level)
}

/// Fraction of the way from the current level threshold to the next
pub fn level_progress(score: u64, level: u32) -> f32 {
    if level >= MAX_LEVEL {
        return 1.0;
    }
    let current = threshold(level);
    let next = threshold(level + 1);
    (score.saturating_sub(current) as f32 / (next - current) as f32).min(1.0)
}

/// Platform archetypes the generator can roll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlatformType {
    Static,
    Horizontal,
    Vertical,
    Crumble,
    Rotating,
    Phasing,
}

/// Per-tier generation parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierDefinition {
    pub tier: u8,
    pub name: &'static str,
    pub description: &'static str,
    pub color: Color,
    /// Weighted by repetition; sampled uniformly
    pub platform_pool: &'static [PlatformType],
    pub enemy_spawn_base: f32,
    pub enemy_speed_mult: f32,
    pub min_platform_width: f32,
    pub max_platform_width: f32,
    pub min_x_gap: f32,
    pub max_x_gap: f32,
    pub min_y_gap: f32,
    pub max_y_gap: f32,
    /// Every Nth platform uses `challenge_gap_size` as its vertical gap
    pub challenge_gap_every: u32,
    pub challenge_gap_size: f32,
    pub mid_air_enemy_chance: f32,
}

use PlatformType::*;

pub static TIER_DEFINITIONS: [TierDefinition; MAX_TIER as usize] = [
    TierDefinition {
        tier: 1,
        name: "BASICS",
        description: "Learn to move and jump",
        color: Color::rgb(0x00ffff),
        platform_pool: &[Static, Static, Static, Crumble],
        enemy_spawn_base: 0.08,
        enemy_speed_mult: 1.0,
        min_platform_width: 150.0,
        max_platform_width: 250.0,
        min_x_gap: 80.0,
        max_x_gap: 220.0,
        min_y_gap: 100.0,
        max_y_gap: 200.0,
        challenge_gap_every: 8,
        challenge_gap_size: 300.0,
        mid_air_enemy_chance: 0.05,
    },
    TierDefinition {
        tier: 2,
        name: "ADAPT",
        description: "Moving terrain, aerial threats",
        color: Color::rgb(0x39ff14),
        platform_pool: &[Static, Static, Crumble, Horizontal, Vertical],
        enemy_spawn_base: 0.22,
        enemy_speed_mult: 1.2,
        min_platform_width: 110.0,
        max_platform_width: 220.0,
        min_x_gap: 100.0,
        max_x_gap: 270.0,
        min_y_gap: 120.0,
        max_y_gap: 240.0,
        challenge_gap_every: 6,
        challenge_gap_size: 340.0,
        mid_air_enemy_chance: 0.2,
    },
    TierDefinition {
        tier: 3,
        name: "MASTERY",
        description: "All platform types, dense enemies",
        color: Color::rgb(0xffcc00),
        platform_pool: &[Static, Static, Crumble, Horizontal, Vertical, Rotating, Phasing],
        enemy_spawn_base: 0.38,
        enemy_speed_mult: 1.45,
        min_platform_width: 90.0,
        max_platform_width: 190.0,
        min_x_gap: 120.0,
        max_x_gap: 300.0,
        min_y_gap: 130.0,
        max_y_gap: 260.0,
        challenge_gap_every: 4,
        challenge_gap_size: 380.0,
        mid_air_enemy_chance: 0.35,
    },
    TierDefinition {
        tier: 4,
        name: "SURVIVAL",
        description: "Relentless pace, precision required",
        color: Color::rgb(0xff6600),
        platform_pool: &[Static, Crumble, Horizontal, Vertical, Rotating, Phasing],
        enemy_spawn_base: 0.54,
        enemy_speed_mult: 1.75,
        min_platform_width: 70.0,
        max_platform_width: 160.0,
        min_x_gap: 140.0,
        max_x_gap: 330.0,
        min_y_gap: 140.0,
        max_y_gap: 280.0,
        challenge_gap_every: 3,
        challenge_gap_size: 420.0,
        mid_air_enemy_chance: 0.5,
    },
    TierDefinition {
        tier: 5,
        name: "ENDGAME",
        description: "Maximum chaos - prove yourself",
        color: Color::rgb(0xff2244),
        platform_pool: &[Static, Crumble, Horizontal, Vertical, Rotating, Phasing, Phasing],
        enemy_spawn_base: 0.72,
        enemy_speed_mult: 2.1,
        min_platform_width: 55.0,
        max_platform_width: 140.0,
        min_x_gap: 160.0,
        max_x_gap: 360.0,
        min_y_gap: 150.0,
        max_y_gap: 300.0,
        challenge_gap_every: 3,
        challenge_gap_size: 460.0,
        mid_air_enemy_chance: 0.65,
    },
];

/// Generation parameters for the tier containing `level`
pub fn tier_definition(level: u32) -> &'static TierDefinition {
    &TIER_DEFINITIONS[(level_to_tier(level) - 1) as usize]
}

/// Pickup odds per generated platform, by 20-level bracket
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickupOdds {
    pub fragment: f32,
    pub bomb: f32,
    pub heart: f32,
}

/// Deeper brackets trade upgrade fragments for survival pickups
pub fn pickup_odds(level: u32) -> PickupOdds {
    let bracket = (level_to_tier(level) - 1) as f32;
    PickupOdds {
        fragment: 0.20 - 0.02 * bracket,
        bomb: 0.12 + 0.02 * bracket,
        heart: 0.03 + 0.01 * bracket,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RewardKind {
    /// Heal, or raise max health when already full
    Life,
    Bomb,
    /// Spawns a fragment just ahead of the player
    UpgradeFragment,
    ScoreBonus,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelReward {
    pub level: u32,
    pub kind: RewardKind,
    pub amount: u32,
    pub label: &'static str,
    pub color: Color,
}

const LIFE: Color = Color::rgb(0xff4444);
const BOMB: Color = Color::rgb(0xff6600);
const EVOLVE: Color = Color::rgb(0xcccccc);
const BONUS: Color = Color::rgb(0xffcc00);

const fn reward(level: u32, kind: RewardKind, amount: u32, label: &'static str, color: Color) -> LevelReward {
    LevelReward {
        level,
        kind,
        amount,
        label,
        color,
    }
}

use RewardKind::*;

pub static LEVEL_REWARDS: [LevelReward; 39] = [
    reward(5, Life, 1, "+LIFE", LIFE),
    reward(8, Bomb, 2, "+2 BOMBS", BOMB),
    reward(10, UpgradeFragment, 1, "EVOLVE", EVOLVE),
    reward(13, ScoreBonus, 500, "+500 PTS", BONUS),
    reward(15, Life, 1, "+LIFE", LIFE),
    reward(18, Bomb, 2, "+2 BOMBS", BOMB),
    reward(20, UpgradeFragment, 1, "EVOLVE", EVOLVE),
    reward(22, ScoreBonus, 800, "+800 PTS", BONUS),
    reward(25, Life, 1, "+LIFE", LIFE),
    reward(28, Bomb, 2, "+2 BOMBS", BOMB),
    reward(30, UpgradeFragment, 1, "EVOLVE", EVOLVE),
    reward(33, ScoreBonus, 1200, "+1200 PTS", BONUS),
    reward(35, Life, 1, "+LIFE", LIFE),
    reward(38, Bomb, 2, "+2 BOMBS", BOMB),
    reward(40, UpgradeFragment, 1, "EVOLVE", EVOLVE),
    reward(43, ScoreBonus, 1800, "+1800 PTS", BONUS),
    reward(45, Life, 1, "+LIFE", LIFE),
    reward(48, Bomb, 2, "+2 BOMBS", BOMB),
    reward(50, UpgradeFragment, 1, "EVOLVE", EVOLVE),
    reward(53, ScoreBonus, 2500, "+2500 PTS", BONUS),
    reward(55, Life, 1, "+LIFE", LIFE),
    reward(58, Bomb, 2, "+2 BOMBS", BOMB),
    reward(60, UpgradeFragment, 1, "EVOLVE", EVOLVE),
    reward(63, ScoreBonus, 3500, "+3500 PTS", BONUS),
    reward(65, Life, 1, "+LIFE", LIFE),
    reward(68, Bomb, 3, "+3 BOMBS", BOMB),
    reward(70, UpgradeFragment, 1, "EVOLVE", EVOLVE),
    reward(73, ScoreBonus, 5000, "+5000 PTS", BONUS),
    reward(75, Life, 1, "+LIFE", LIFE),
    reward(78, Bomb, 3, "+3 BOMBS", BOMB),
    reward(80, UpgradeFragment, 1, "EVOLVE", EVOLVE),
    reward(83, ScoreBonus, 7000, "+7000 PTS", BONUS),
    reward(85, Life, 1, "+LIFE", LIFE),
    reward(88, Bomb, 3, "+3 BOMBS", BOMB),
    reward(90, UpgradeFragment, 1, "EVOLVE", EVOLVE),
    reward(93, ScoreBonus, 10000, "+10000 PTS", BONUS),
    reward(95, Life, 1, "+LIFE", LIFE),
    reward(98, Bomb, 3, "+3 BOMBS", BOMB),
    reward(100, UpgradeFragment, 1, "ECHO COMPLETE", Color::rgb(0xffffff)),
];

/// Scheduled reward for `level`, if any
pub fn reward_for_level(level: u32) -> Option<&'static LevelReward> {
    LEVEL_REWARDS.iter().find(|r| r.level == level)
}
