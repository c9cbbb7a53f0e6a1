//! Color palettes
//!
//! The simulation never interprets colors. Entities carry a `Color` token
//! chosen from the active palette and the presentation layer draws it.

use serde::{Deserialize, Serialize};

/// Opaque RGBA color token (0xRRGGBBAA)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    /// Fully opaque color from 0xRRGGBB
    pub const fn rgb(hex: u32) -> Self {
        Self((hex << 8) | 0xff)
    }

    /// Color from 0xRRGGBB with explicit alpha
    pub const fn rgba(hex: u32, alpha: u8) -> Self {
        Self((hex << 8) | alpha as u32)
    }

    pub const fn alpha(self) -> u8 {
        (self.0 & 0xff) as u8
    }
}

/// Full set of entity colors, swapped wholesale by settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Palette {
    pub background: Color,
    pub player: Color,
    pub enemy: Color,
    pub fragment: Color,
    pub static_platform: Color,
    pub neutral_platform: Color,
    pub moving: Color,
    pub rotating: Color,
    pub crumble: Color,
    /// Crumble platforms about to give way
    pub crumble_hot: Color,
    pub ice: Color,
    pub phasing: Color,
    pub double_jump: Color,
    pub bomb: Color,
    pub heart: Color,
    pub blast: Color,
    pub smoke: Color,
}

impl Palette {
    pub const fn standard() -> Self {
        Self {
            background: Color::rgb(0x0a0a0a),
            player: Color::rgb(0x00ffff),
            enemy: Color::rgb(0xffcc00),
            fragment: Color::rgb(0xcccccc),
            static_platform: Color::rgb(0xffffff),
            neutral_platform: Color::rgb(0xcccccc),
            moving: Color::rgb(0x00ffff),
            rotating: Color::rgb(0x39ff14),
            crumble: Color::rgb(0xffaa00),
            crumble_hot: Color::rgb(0xff4500),
            ice: Color::rgb(0x88ddff),
            phasing: Color::rgb(0xcc88ff),
            double_jump: Color::rgba(0x00aaff, 0x80),
            bomb: Color::rgb(0xff6600),
            heart: Color::rgb(0xff4444),
            blast: Color::rgb(0xffcc00),
            smoke: Color::rgba(0xff4500, 0x80),
        }
    }

    /// Palette avoiding red/green and cyan/yellow pairings
    pub const fn color_blind() -> Self {
        Self {
            background: Color::rgb(0x0a0a0a),
            player: Color::rgb(0x1e90ff),
            enemy: Color::rgb(0xff6600),
            fragment: Color::rgb(0xcccccc),
            static_platform: Color::rgb(0xffffff),
            neutral_platform: Color::rgb(0xcccccc),
            moving: Color::rgb(0x1e90ff),
            rotating: Color::rgb(0x00cc44),
            crumble: Color::rgb(0xff6600),
            crumble_hot: Color::rgb(0xff4500),
            ice: Color::rgb(0x88ddff),
            phasing: Color::rgb(0xaaccff),
            double_jump: Color::rgba(0x1e90ff, 0x80),
            bomb: Color::rgb(0xff6600),
            heart: Color::rgb(0xff4444),
            blast: Color::rgb(0xffcc00),
            smoke: Color::rgba(0xff4500, 0x80),
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_packing() {
        let c = Color::rgb(0x123456);
        assert_eq!(c.0, 0x123456ff);
        assert_eq!(Color::rgba(0x00aaff, 0x80).alpha(), 0x80);
    }

    #[test]
    fn test_palettes_differ_only_where_needed() {
        let std = Palette::standard();
        let cb = Palette::color_blind();
        assert_ne!(std.player, cb.player);
        assert_ne!(std.enemy, cb.enemy);
        assert_eq!(std.background, cb.background);
    }
}
