//! Contact tests between moving boxes and the terrain
//!
//! Landing uses a one-tick sweep: a body lands only if its bottom edge was at
//! or above the surface (within tolerance) before this tick's integration and
//! is at or below it after. This keeps fast falls from tunnelling through
//! thin platforms.

use glam::Vec2;
use std::f32::consts::TAU;

use super::geom::Rect;
use crate::consts::{LANDING_TOLERANCE, STOMP_TOLERANCE};
use crate::angle_distance;

/// Result of a landing sweep
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Whether the body landed this tick
    pub hit: bool,
    /// Vertical speed at impact
    pub impact: f32,
}

impl Contact {
    pub fn miss() -> Self {
        Self {
            hit: false,
            impact: 0.0,
        }
    }
}

/// Sweep a falling body (already integrated by `vy`) against a surface
pub fn landing_sweep(body: &Rect, vy: f32, surface: &Rect) -> Contact {
    if vy < 0.0 || !body.overlaps_x(surface) {
        return Contact::miss();
    }
    let bottom = body.bottom();
    let prev_bottom = bottom - vy;
    if prev_bottom <= surface.top() + LANDING_TOLERANCE && bottom >= surface.top() {
        Contact { hit: true, impact: vy }
    } else {
        Contact::miss()
    }
}

/// Whether an overlapping player came down on top of an enemy
pub fn is_stomp(player: &Rect, vy: f32, enemy: &Rect) -> bool {
    vy > 0.0 && player.bottom() - vy <= enemy.top() + STOMP_TOLERANCE
}

/// Blast falloff: 1 at the center, 0 at `radius` and beyond
pub fn proximity(a: Vec2, b: Vec2, radius: f32) -> f32 {
    (1.0 - a.distance(b) / radius).max(0.0)
}

/// Nearest of the triangle's three resting orientations
pub fn snap_rotation(rotation: f32) -> f32 {
    const STABLE: [f32; 3] = [0.0, TAU / 3.0, 2.0 * TAU / 3.0];
    STABLE
        .into_iter()
        .min_by(|a, b| angle_distance(rotation, *a).total_cmp(&angle_distance(rotation, *b)))
        .unwrap_or(0.0)
}
