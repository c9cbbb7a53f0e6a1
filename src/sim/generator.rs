//! Procedural terrain generation
//!
//! Platforms are appended left to right in batches. Each placement is
//! sampled from the current tier's parameters and rejection-tested against
//! the travel envelopes of what already exists.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

use super::entities::{self, PLATFORM_HEIGHT};
use super::geom::{Rect, random_between, random_sign};
use super::levels::{self, PlatformType, TierDefinition};
use super::state::{
    CrumblePhase, ENEMY_SIZE, Enemy, EnemyKind, Platform, PlatformKind, Surface, World,
};
use crate::palette::Palette;

pub const PLATFORMS_PER_BATCH: usize = 5;
pub const MAX_PLACEMENT_ATTEMPTS: u32 = 20;
/// Leading platforms that are always flat, wide and enemy-free
pub const SAFE_START_PLATFORMS: u32 = 3;
pub const SAFE_X_GAP: f32 = 100.0;
pub const SAFE_Y_GAP: f32 = 120.0;
pub const SAFE_WIDTH: f32 = 200.0;
/// Chance a platform is tinted with the player color
pub const CAMOUFLAGE_CHANCE: f64 = 0.1;
/// Chance a static platform past tier 1 is icy
pub const ICE_CHANCE: f64 = 0.1;
/// Mid-air enemies patrol this far either side of the gap center
pub const MID_AIR_PATROL: f32 = 50.0;

/// Where the next platform goes
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationCursor {
    /// Right edge of the last platform's travel envelope
    pub frontier_x: f32,
    /// Rest y of the last platform
    pub base_y: f32,
    /// Platforms placed so far, excluding the start platform
    pub placed: u32,
}

impl GenerationCursor {
    pub fn after(platform: &Platform) -> Self {
        Self {
            frontier_x: platform.envelope().right(),
            base_y: platform.rect.top(),
            placed: 0,
        }
    }
}

/// Whether the player is close enough to the frontier to need more terrain
pub fn needs_more(world: &World) -> bool {
    world.player.rect().right() + world.config.viewport.width > world.cursor.frontier_x
}

/// Append up to one batch of platforms with their enemies and pickups
pub fn generate_batch(world: &mut World) {
    let tier = world.tier();
    let odds = levels::pickup_odds(world.level.current);
    let palette = world.config.palette;

    for _ in 0..PLATFORMS_PER_BATCH {
        world.cursor.placed += 1;
        let index = world.cursor.placed;
        let safe = index <= SAFE_START_PLATFORMS;

        let mut attempts = 0;
        let candidate = loop {
            attempts += 1;
            let candidate = roll_platform(&mut world.rng, tier, &palette, &world.cursor);
            let envelope = candidate.envelope();
            let blocked = world
                .platforms
                .iter()
                .any(|p| p.envelope().intersects(&envelope));
            if !blocked {
                break candidate;
            }
            if attempts >= MAX_PLACEMENT_ATTEMPTS {
                log::debug!(
                    "Placement exhausted after {} attempts at x={:.0}; accepting overlap",
                    attempts,
                    candidate.rect.left()
                );
                break candidate;
            }
        };

        let mut platform = candidate;
        platform.id = world.next_entity_id();
        let previous_frontier = world.cursor.frontier_x;
        let previous_base_y = world.cursor.base_y;
        world.cursor.frontier_x = platform.envelope().right();
        world.cursor.base_y = platform.rect.top();
        let rect = platform.rect;
        world.platforms.push(platform);

        if !safe && world.rng.random_bool(tier.enemy_spawn_base as f64) {
            let speed = random_between(&mut world.rng, 0.75, 1.75) * tier.enemy_speed_mult;
            let vx = speed * random_sign(&mut world.rng);
            let id = world.next_entity_id();
            let enemy = if world.rng.random_bool(tier.mid_air_enemy_chance as f64) {
                let mid = Vec2::new(
                    (previous_frontier + rect.left()) / 2.0,
                    (previous_base_y + rect.top()) / 2.0,
                );
                let base_y = mid.y - ENEMY_SIZE / 2.0;
                Enemy {
                    id,
                    rect: Rect::new(mid.x - ENEMY_SIZE / 2.0, base_y, ENEMY_SIZE, ENEMY_SIZE),
                    vx,
                    patrol_min: mid.x - MID_AIR_PATROL,
                    patrol_max: mid.x + MID_AIR_PATROL,
                    kind: EnemyKind::MidAir {
                        base_y,
                        hover_offset: world.rng.random::<f32>() * TAU,
                    },
                }
            } else {
                Enemy {
                    id,
                    rect: Rect::new(
                        rect.center().x - ENEMY_SIZE / 2.0,
                        rect.top() - ENEMY_SIZE,
                        ENEMY_SIZE,
                        ENEMY_SIZE,
                    ),
                    vx,
                    patrol_min: rect.left(),
                    patrol_max: rect.right(),
                    kind: EnemyKind::OnPlatform,
                }
            };
            world.enemies.push(enemy);
        }

        if world.rng.random_bool(odds.fragment as f64) {
            let id = world.next_entity_id();
            world.fragments.push(entities::fragment_above(id, &rect));
        }
        if safe {
            continue;
        }
        let has_bomb = world.rng.random_bool(odds.bomb as f64);
        if has_bomb {
            let id = world.next_entity_id();
            world.bomb_pickups.push(entities::pickup_above(id, &rect, 0.0));
        }
        if world.rng.random_bool(odds.heart as f64) {
            let id = world.next_entity_id();
            let offset = if has_bomb { 30.0 } else { 0.0 };
            world.heart_pickups.push(entities::pickup_above(id, &rect, offset));
        }
    }
}

/// Sample one candidate placement (id assigned on acceptance)
fn roll_platform<R: Rng + ?Sized>(
    rng: &mut R,
    tier: &TierDefinition,
    palette: &Palette,
    cursor: &GenerationCursor,
) -> Platform {
    let index = cursor.placed;
    let safe = index <= SAFE_START_PLATFORMS;

    let x_gap = if safe {
        SAFE_X_GAP
    } else {
        random_between(rng, tier.min_x_gap, tier.max_x_gap)
    };
    let y_gap = if safe {
        SAFE_Y_GAP
    } else if index % tier.challenge_gap_every == 0 {
        tier.challenge_gap_size
    } else {
        random_between(rng, tier.min_y_gap, tier.max_y_gap)
    };
    let (kind_type, width) = if safe {
        (PlatformType::Static, SAFE_WIDTH)
    } else {
        let pick = rng.random_range(0..tier.platform_pool.len());
        (
            tier.platform_pool[pick],
            random_between(rng, tier.min_platform_width, tier.max_platform_width),
        )
    };

    let x = cursor.frontier_x + x_gap;
    let y = cursor.base_y - y_gap;
    let mut surface = Surface::Normal;
    let (kind, mut color) = match kind_type {
        PlatformType::Static => {
            if !safe && tier.tier >= 2 && rng.random_bool(ICE_CHANCE) {
                surface = Surface::Ice;
                (PlatformKind::Static, palette.ice)
            } else {
                (PlatformKind::Static, palette.static_platform)
            }
        }
        PlatformType::Horizontal => {
            let travel = random_between(rng, 100.0, 300.0);
            let speed = random_between(rng, 0.5, 1.5);
            (
                PlatformKind::Horizontal {
                    start_x: x,
                    end_x: x + travel,
                    speed,
                },
                palette.moving,
            )
        }
        PlatformType::Vertical => {
            let travel = random_between(rng, 100.0, 300.0);
            let speed = random_between(rng, 0.5, 1.5);
            (
                PlatformKind::Vertical {
                    start_y: y,
                    end_y: y - travel,
                    speed: -speed,
                },
                palette.moving,
            )
        }
        PlatformType::Crumble => (
            PlatformKind::Crumble {
                phase: CrumblePhase::Intact,
            },
            palette.crumble,
        ),
        PlatformType::Rotating => {
            let speed = random_between(rng, 0.0174, 0.0349) * random_sign(rng);
            (PlatformKind::Rotating { angle: 0.0, speed }, palette.rotating)
        }
        PlatformType::Phasing => (
            PlatformKind::Phasing {
                phased_out: false,
                opacity: 0.8,
            },
            palette.phasing,
        ),
    };

    if rng.random_bool(CAMOUFLAGE_CHANCE) {
        color = palette.player;
    }

    Platform {
        id: 0,
        rect: Rect::new(x, y, width, PLATFORM_HEIGHT),
        kind,
        color,
        surface,
        neutral: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::SimConfig;
    use proptest::prelude::*;

    #[test]
    fn test_first_platforms_are_safe() {
        let world = World::new(5, SimConfig::default());
        for p in world.platforms.iter().skip(1).take(SAFE_START_PLATFORMS as usize) {
            assert_eq!(p.kind, PlatformKind::Static);
            assert_eq!(p.rect.size.x, SAFE_WIDTH);
        }
        let safe_right = world.platforms[SAFE_START_PLATFORMS as usize].rect.right();
        assert!(
            world.enemies.iter().all(|e| e.rect.left() > safe_right),
            "no enemies on the opening platforms"
        );
    }

    #[test]
    fn test_opening_gaps_are_fixed() {
        let world = World::new(9, SimConfig::default());
        let p = &world.platforms;
        for pair in p.windows(2).take(SAFE_START_PLATFORMS as usize) {
            assert!((pair[1].rect.left() - pair[0].rect.right() - SAFE_X_GAP).abs() < 1e-3);
            assert!((pair[0].rect.top() - pair[1].rect.top() - SAFE_Y_GAP).abs() < 1e-3);
        }
    }

    #[test]
    fn test_batch_appends_five() {
        let mut world = World::new(21, SimConfig::default());
        let before = world.platforms.len();
        generate_batch(&mut world);
        assert_eq!(world.platforms.len(), before + PLATFORMS_PER_BATCH);
    }

    #[test]
    fn test_platform_ids_ascend() {
        let mut world = World::new(8, SimConfig::default());
        generate_batch(&mut world);
        assert!(world.platforms.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn test_deep_tiers_use_their_pool() {
        let mut world = World::new(13, SimConfig::default());
        world.level.current = 85;
        for _ in 0..10 {
            generate_batch(&mut world);
        }
        let tier = levels::tier_definition(85);
        for p in world.platforms.iter().skip(16) {
            assert!(tier.platform_pool.contains(&p.platform_type()));
        }
    }

    proptest! {
        #[test]
        fn frontier_always_advances(seed in 0u64..5_000, level in 1u32..=100) {
            let mut world = World::new(seed, SimConfig::default());
            world.level.current = level;
            for _ in 0..4 {
                let before = world.cursor.frontier_x;
                let count = world.platforms.len();
                generate_batch(&mut world);
                prop_assert!(world.cursor.frontier_x > before);
                prop_assert_eq!(world.platforms.len(), count + PLATFORMS_PER_BATCH);
            }

            // Every platform starts past the trailing edge of all earlier ones
            let mut trailing = f32::NEG_INFINITY;
            for p in &world.platforms {
                prop_assert!(p.rect.left() > trailing, "platform {} starts at {} behind {}", p.id, p.rect.left(), trailing);
                trailing = trailing.max(p.envelope().right());
            }
        }
    }
}
