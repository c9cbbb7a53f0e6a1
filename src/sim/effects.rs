//! Cosmetic effects: shards, ripples, floating labels and light sources
//!
//! None of these feed back into gameplay. They keep advancing while the
//! game waits for an upgrade choice and after death.

use glam::Vec2;

use super::entities;
use super::geom::lerp;
use super::state::{FloatingLabel, LightSource, ShardRegime, World};
use crate::consts::{SNAP_DRIFT_UNITS, SNAP_SHARD_LIFE};
use crate::palette::Color;

pub const SNAP_DRAG: f32 = 0.95;
pub const SNAP_FALL_GRAVITY: f32 = 0.25;
pub const DRIFT_GRAVITY: f32 = 0.5;
pub const DRIFT_DECAY: f32 = 0.02;
pub const RIPPLE_EASE: f32 = 0.1;
pub const RIPPLE_DECAY: f32 = 0.02;
pub const LABEL_RISE: f32 = 0.8;
pub const LABEL_TICKS: u32 = 60;
pub const LIGHT_DECAY: f32 = 0.01;

impl World {
    /// Snap-shard burst, capped by the configured particle budget
    pub fn burst(&mut self, pos: Vec2, count: usize, color: Color) {
        let cap = self.config.max_particles;
        entities::spawn_shatter(&mut self.shards, &mut self.rng, pos, count, color, cap);
    }

    pub fn debris(&mut self, pos: Vec2, count: usize, color: Color) {
        let cap = self.config.max_particles;
        entities::spawn_debris(&mut self.shards, &mut self.rng, pos, count, color, cap);
    }

    pub fn ripple(&mut self, pos: Vec2, max_radius: f32, color: Color) {
        entities::spawn_ripple(&mut self.ripples, pos, max_radius, color);
    }

    pub fn label(&mut self, pos: Vec2, text: impl Into<String>, color: Color, life: u32) {
        self.labels.push(FloatingLabel {
            pos,
            text: text.into(),
            life,
            max_life: life,
            color,
        });
    }

    pub fn light(&mut self, pos: Vec2, radius: f32) {
        self.lights.push(LightSource { pos, radius, life: 1.0 });
    }
}

/// Advance every cosmetic effect by one tick and drop the expired ones
pub fn update_effects(world: &mut World) {
    for shard in &mut world.shards {
        match shard.regime {
            ShardRegime::Snap => {
                if shard.life > SNAP_SHARD_LIFE - SNAP_DRIFT_UNITS {
                    shard.vel *= SNAP_DRAG;
                } else {
                    shard.vel.y += SNAP_FALL_GRAVITY;
                }
                shard.life -= 1.0;
            }
            ShardRegime::Drift => {
                shard.vel.y += DRIFT_GRAVITY;
                shard.life -= DRIFT_DECAY;
            }
        }
        shard.pos += shard.vel;
    }
    world.shards.retain(|s| s.life > 0.0);
    let cap = world.config.max_particles;
    if world.shards.len() > cap {
        let excess = world.shards.len() - cap;
        world.shards.drain(..excess);
    }

    for ripple in &mut world.ripples {
        ripple.radius = lerp(ripple.radius, ripple.max_radius, RIPPLE_EASE);
        ripple.life -= RIPPLE_DECAY;
    }
    world.ripples.retain(|r| r.life > 0.0);

    for label in &mut world.labels {
        label.pos.y -= LABEL_RISE;
        label.life = label.life.saturating_sub(1);
    }
    world.labels.retain(|l| l.life > 0);

    for light in &mut world.lights {
        light.life -= LIGHT_DECAY;
    }
    world.lights.retain(|l| l.life > 0.0);
}
