//! Game settings and preferences
//!
//! Persisted as JSON next to the high score table. Settings are read when a
//! run starts; changing them mid-run takes effect on the next restart.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::palette::Palette;
use crate::persistence;
use crate::sim::{SimConfig, Viewport};

/// Quality preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QualityPreset {
    Low,
    #[default]
    Medium,
    High,
}

impl QualityPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityPreset::Low => "Low",
            QualityPreset::Medium => "Medium",
            QualityPreset::High => "High",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(QualityPreset::Low),
            "medium" | "med" => Some(QualityPreset::Medium),
            "high" => Some(QualityPreset::High),
            _ => None,
        }
    }

    /// Maximum particles for this preset
    pub fn max_particles(&self) -> usize {
        match self {
            QualityPreset::Low => 100,
            QualityPreset::Medium => 500,
            QualityPreset::High => 2000,
        }
    }

    /// Whether the host should draw `World::stars`; the simulation always
    /// generates them so a preset change needs no new run
    pub fn starfield_enabled(&self) -> bool {
        !matches!(self, QualityPreset::Low)
    }
}

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Graphics quality preset
    pub quality: QualityPreset,

    // === Visual Effects ===
    /// Screen shake on impacts and explosions
    pub screen_shake: bool,
    /// Shards and debris
    pub particles: bool,
    /// Ghost trail behind the player. Host-side only: `World::ghost` is
    /// always recorded, this decides whether it is drawn
    pub ghost_trail: bool,
    /// Debug grid overlay, drawn by the host
    pub show_grid: bool,

    // === Accessibility ===
    /// Reduced motion (no shake)
    pub reduced_motion: bool,
    /// Palette without red/green or cyan/yellow pairings
    pub color_blind: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityPreset::Medium,
            screen_shake: true,
            particles: true,
            ghost_trail: true,
            show_grid: false,
            reduced_motion: false,
            color_blind: false,
        }
    }
}

impl Settings {
    /// Create settings from a quality preset
    pub fn from_preset(preset: QualityPreset) -> Self {
        Self {
            quality: preset,
            ..Self::default()
        }
    }

    /// Effective screen shake (respects reduced_motion)
    pub fn effective_screen_shake(&self) -> bool {
        self.screen_shake && !self.reduced_motion
    }

    /// Effective particle count cap
    pub fn max_particles(&self) -> usize {
        if !self.particles {
            0
        } else {
            self.quality.max_particles()
        }
    }

    pub fn palette(&self) -> Palette {
        if self.color_blind {
            Palette::color_blind()
        } else {
            Palette::standard()
        }
    }

    /// Simulation config for a run framed by `viewport`
    pub fn sim_config(&self, viewport: Viewport) -> SimConfig {
        SimConfig {
            viewport,
            palette: self.palette(),
            max_particles: self.max_particles(),
            screen_shake: self.effective_screen_shake(),
        }
    }

    pub fn load(path: &Path) -> Self {
        let settings: Self = persistence::load_or_default(path);
        log::info!("Settings: quality={} color_blind={}", settings.quality.as_str(), settings.color_blind);
        settings
    }

    pub fn save(&self, path: &Path) {
        match persistence::save_json(path, self) {
            Ok(()) => log::info!("Settings saved"),
            Err(e) => log::warn!("Failed to save settings: {}", e),
        }
    }
}
