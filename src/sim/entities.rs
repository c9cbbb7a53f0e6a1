//! Entity factories and particle spawners

use glam::Vec2;
use rand::Rng;
use std::f32::consts::TAU;

use super::geom::{Rect, random_between};
use super::state::{
    Collectible, Player, Platform, PlatformId, PlatformKind, Ripple, Shard, ShardRegime, Star,
    Surface, Upgrades, Viewport,
};
use crate::consts::*;
use crate::palette::{Color, Palette};

pub const STAR_COUNT: usize = 200;
pub const START_PLATFORM_X: f32 = 50.0;
/// Start platform sits this far above the viewport bottom
pub const START_PLATFORM_LIFT: f32 = 100.0;
pub const START_PLATFORM_WIDTH: f32 = 200.0;
pub const PLATFORM_HEIGHT: f32 = 10.0;
pub const FRAGMENT_SIZE: f32 = 25.0;
pub const PICKUP_SIZE: f32 = 18.0;

pub fn create_player(viewport: Viewport, color: Color) -> Player {
    Player {
        pos: Vec2::new(START_PLATFORM_X, viewport.height - START_PLATFORM_LIFT - PLAYER_SIZE),
        vel: Vec2::ZERO,
        size: Vec2::splat(PLAYER_SIZE),
        scale: Vec2::ONE,
        health: PLAYER_START_HEALTH,
        max_health: PLAYER_START_HEALTH,
        invincible_timer: 0,
        grounded: false,
        upgrades: Upgrades::default(),
        vertices: 3,
        rotation: 0.0,
        standing_on: None,
        surface: None,
        anchor: None,
        platform_last_pos: Vec2::ZERO,
        has_landed: false,
        bombs: 0,
        ground_pounding: false,
        air_jumps: 0,
        color,
    }
}

/// Neutral static platform the run begins on
pub fn start_platform(id: PlatformId, viewport: Viewport, palette: &Palette) -> Platform {
    Platform {
        id,
        rect: Rect::new(
            START_PLATFORM_X,
            viewport.height - START_PLATFORM_LIFT,
            START_PLATFORM_WIDTH,
            PLATFORM_HEIGHT,
        ),
        kind: PlatformKind::Static,
        color: palette.neutral_platform,
        surface: Surface::Normal,
        neutral: true,
    }
}

pub fn generate_stars<R: Rng + ?Sized>(rng: &mut R, viewport: Viewport) -> Vec<Star> {
    (0..STAR_COUNT)
        .map(|_| Star {
            pos: Vec2::new(
                rng.random::<f32>() * viewport.width * 3.0,
                rng.random::<f32>() * viewport.height,
            ),
            size: random_between(rng, 0.5, 2.0),
            speed: random_between(rng, 0.1, 0.5),
            opacity: random_between(rng, 0.2, 0.8),
        })
        .collect()
}

/// Fragment hovering above a platform's center
pub fn fragment_above(id: u32, platform: &Rect) -> Collectible {
    Collectible {
        id,
        rect: Rect::new(
            platform.center().x - FRAGMENT_SIZE / 2.0,
            platform.top() - 80.0,
            FRAGMENT_SIZE,
            FRAGMENT_SIZE,
        ),
        collected: false,
    }
}

/// Small pickup resting above a platform, nudged sideways by `offset_x`
pub fn pickup_above(id: u32, platform: &Rect, offset_x: f32) -> Collectible {
    Collectible {
        id,
        rect: Rect::new(
            platform.center().x - PICKUP_SIZE / 2.0 + offset_x,
            platform.top() - 55.0,
            PICKUP_SIZE,
            PICKUP_SIZE,
        ),
        collected: false,
    }
}

/// Burst of snap shards flying outward from `pos`
///
/// Stops early once `cap` live shards exist.
pub fn spawn_shatter<R: Rng + ?Sized>(
    shards: &mut Vec<Shard>,
    rng: &mut R,
    pos: Vec2,
    count: usize,
    color: Color,
    cap: usize,
) {
    for _ in 0..count {
        if shards.len() >= cap {
            break;
        }
        let angle = rng.random::<f32>() * TAU;
        let speed = random_between(rng, 2.0, 8.0);
        shards.push(Shard {
            pos,
            vel: Vec2::new(angle.cos(), angle.sin()) * speed,
            life: SNAP_SHARD_LIFE,
            regime: ShardRegime::Snap,
            color,
        });
    }
}

/// Slow falling debris, used for death and pulse bursts
pub fn spawn_debris<R: Rng + ?Sized>(
    shards: &mut Vec<Shard>,
    rng: &mut R,
    pos: Vec2,
    count: usize,
    color: Color,
    cap: usize,
) {
    for _ in 0..count {
        if shards.len() >= cap {
            break;
        }
        shards.push(Shard {
            pos,
            vel: Vec2::new((rng.random::<f32>() - 0.5) * 10.0, (rng.random::<f32>() - 0.5) * 10.0),
            life: 1.0,
            regime: ShardRegime::Drift,
            color,
        });
    }
}

pub fn spawn_ripple(ripples: &mut Vec<Ripple>, pos: Vec2, max_radius: f32, color: Color) {
    ripples.push(Ripple {
        pos,
        radius: 0.0,
        max_radius,
        life: 1.0,
        color,
    });
}
