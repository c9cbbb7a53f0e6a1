//! Discrete player actions
//!
//! Actions are validated against the current phase. An action that is not
//! valid right now changes nothing and reports why.

use glam::Vec2;
use rand::Rng;
use std::f32::consts::TAU;

use super::input::Action;
use super::state::{GameEvent, GamePhase, UpgradeKind, World};
use super::tick::throw_bomb;
use crate::consts::*;

/// Why an action was ignored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionError {
    /// Only valid during active play
    NotPlaying,
    /// Only valid while an upgrade is being chosen
    NotChoosingUpgrade,
    /// Airborne with no air jump left
    NoJumpAvailable,
    /// Pulse has not been unlocked
    PulseLocked,
    NoBombs,
    UpgradeMaxed(UpgradeKind),
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionError::NotPlaying => write!(f, "action requires active play"),
            ActionError::NotChoosingUpgrade => write!(f, "no upgrade is being offered"),
            ActionError::NoJumpAvailable => write!(f, "no jump available"),
            ActionError::PulseLocked => write!(f, "pulse is not unlocked"),
            ActionError::NoBombs => write!(f, "no bombs left"),
            ActionError::UpgradeMaxed(kind) => write!(f, "{:?} upgrade is already at its limit", kind),
        }
    }
}

impl std::error::Error for ActionError {}

/// Apply one discrete action to the world
pub fn apply_action(world: &mut World, action: Action) -> Result<(), ActionError> {
    match action {
        Action::Jump => jump(world),
        Action::Pulse => pulse(world),
        Action::DropBomb => drop_bomb(world),
        Action::SelectUpgrade(kind) => select_upgrade(world, kind),
        Action::Restart => {
            restart(world);
            Ok(())
        }
    }
}

fn require_playing(world: &World) -> Result<(), ActionError> {
    if world.phase == GamePhase::Playing {
        Ok(())
    } else {
        Err(ActionError::NotPlaying)
    }
}

fn jump(world: &mut World) -> Result<(), ActionError> {
    require_playing(world)?;
    let palette = world.config.palette;

    if world.player.grounded {
        // Rotating platforms fling the player along their surface
        let fling = world
            .player
            .standing_on
            .and_then(|id| world.platform(id))
            .and_then(|p| p.angular_speed().map(|speed| (p.rect.center(), speed)))
            .map(|(center, speed)| {
                let d = world.player.center() - center;
                Vec2::new(-d.y * speed * 2.5, d.x * speed)
            })
            .unwrap_or(Vec2::ZERO);

        let rotation = world.rng.random::<f32>() * TAU;
        let player = &mut world.player;
        let aero = 1.0 + player.upgrades.aero as f32 * AERO_JUMP_BONUS;
        player.vel.x += fling.x;
        player.vel.y = JUMP_FORCE * aero + fling.y;
        player.set_airborne();
        player.ground_pounding = false;
        player.air_jumps = MAX_AIR_JUMPS;
        player.scale = Vec2::new(0.6, 1.4);
        player.rotation = rotation;
        let foot = Vec2::new(player.center().x, player.rect().bottom());
        let center = player.center();
        world.ripple(foot, 300.0, palette.player);
        world.burst(center, 10, palette.player);
        world.push_event(GameEvent::Jumped);
        return Ok(());
    }

    if world.player.air_jumps == 0 {
        return Err(ActionError::NoJumpAvailable);
    }
    let player = &mut world.player;
    player.vel.y = JUMP_FORCE * DOUBLE_JUMP_FACTOR;
    player.air_jumps -= 1;
    player.ground_pounding = false;
    player.set_airborne();
    player.scale = Vec2::new(0.7, 1.3);
    let center = player.center();
    world.ripple(center, 150.0, palette.double_jump);
    world.burst(center, 6, palette.double_jump);
    world.push_event(GameEvent::DoubleJumped);
    Ok(())
}

fn pulse(world: &mut World) -> Result<(), ActionError> {
    require_playing(world)?;
    if world.player.upgrades.pulse == 0 {
        return Err(ActionError::PulseLocked);
    }
    let palette = world.config.palette;
    let center = world.player.center();
    world.ripple(center, PULSE_RADIUS, palette.player);

    let mut kills = 0;
    let mut i = world.enemies.len();
    while i > 0 {
        i -= 1;
        let at = world.enemies[i].rect.center();
        if at.distance(center) < PULSE_RADIUS {
            world.enemies.remove(i);
            world.debris(at, 15, palette.enemy);
            world.stats.enemies_defeated += 1;
            kills += 1;
        }
    }
    log::debug!("Pulse cleared {} enemies", kills);
    world.push_event(GameEvent::Pulse { kills });
    Ok(())
}

fn drop_bomb(world: &mut World) -> Result<(), ActionError> {
    require_playing(world)?;
    if world.player.bombs == 0 {
        return Err(ActionError::NoBombs);
    }
    world.player.bombs -= 1;
    throw_bomb(world);
    world.push_event(GameEvent::BombThrown);
    Ok(())
}

fn select_upgrade(world: &mut World, kind: UpgradeKind) -> Result<(), ActionError> {
    if world.phase != GamePhase::LevelUp {
        return Err(ActionError::NotChoosingUpgrade);
    }
    let player = &mut world.player;
    let level = player.upgrades.get_mut(kind);
    if *level >= kind.limit() {
        world.upgrade_error_timer = UPGRADE_ERROR_TICKS;
        return Err(ActionError::UpgradeMaxed(kind));
    }
    *level += 1;
    if kind == UpgradeKind::Vital {
        player.max_health += 1;
        player.health += 1;
    }
    player.vertices = 3 + player.upgrades.total();
    world.stats.upgrades_acquired += 1;
    world.phase = GamePhase::Playing;
    log::info!("Upgrade chosen: {:?}", kind);
    world.push_event(GameEvent::UpgradeChosen(kind));
    Ok(())
}

/// Replace the world with a fresh run, seeded from the current one
fn restart(world: &mut World) {
    let seed = world.rng.random::<u64>();
    let config = world.config;
    *world = World::new(seed, config);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::SimConfig;

    fn world() -> World {
        World::new(77, SimConfig::default())
    }

    #[test]
    fn test_actions_rejected_outside_playing() {
        let mut w = world();
        w.phase = GamePhase::LevelUp;
        assert_eq!(apply_action(&mut w, Action::Jump), Err(ActionError::NotPlaying));
        w.phase = GamePhase::Dead;
        assert_eq!(apply_action(&mut w, Action::DropBomb), Err(ActionError::NotPlaying));
        assert_eq!(
            apply_action(&mut w, Action::SelectUpgrade(UpgradeKind::Aero)),
            Err(ActionError::NotChoosingUpgrade)
        );
    }

    #[test]
    fn test_aero_raises_jump() {
        let mut w = world();
        w.player.upgrades.aero = 2;
        apply_action(&mut w, Action::Jump).unwrap();
        assert!((w.player.vel.y - JUMP_FORCE * 1.2).abs() < 1e-4);
        assert_eq!(w.player.air_jumps, MAX_AIR_JUMPS);
    }

    #[test]
    fn test_pulse_requires_upgrade() {
        let mut w = world();
        assert_eq!(apply_action(&mut w, Action::Pulse), Err(ActionError::PulseLocked));
    }

    #[test]
    fn test_pulse_clears_nearby_enemies_without_score() {
        let mut w = world();
        w.player.upgrades.pulse = 1;
        let near = w.player.center() + Vec2::new(100.0, 0.0);
        w.enemies.clear();
        w.enemies.push(crate::sim::state::Enemy {
            id: 500,
            rect: crate::sim::geom::Rect::new(near.x, near.y, 25.0, 25.0),
            vx: 0.0,
            patrol_min: 0.0,
            patrol_max: 1.0,
            kind: crate::sim::state::EnemyKind::OnPlatform,
        });
        apply_action(&mut w, Action::Pulse).unwrap();
        assert!(w.enemies.is_empty());
        assert_eq!(w.stats.enemies_defeated, 1);
        assert_eq!(w.score, 0);
        assert_eq!(w.combo.count, 0);
    }

    #[test]
    fn test_drop_bomb_consumes_inventory() {
        let mut w = world();
        assert_eq!(apply_action(&mut w, Action::DropBomb), Err(ActionError::NoBombs));
        w.player.bombs = 1;
        w.player.vel.x = 3.0;
        apply_action(&mut w, Action::DropBomb).unwrap();
        assert_eq!(w.player.bombs, 0);
        assert_eq!(w.active_bombs.len(), 1);
        assert_eq!(w.active_bombs[0].vel, Vec2::new(3.0, BOMB_THROW_VY));
    }

    #[test]
    fn test_upgrade_at_cap_flags_error() {
        let mut w = world();
        w.phase = GamePhase::LevelUp;
        w.player.upgrades.vital = VITAL_LIMIT;
        let err = apply_action(&mut w, Action::SelectUpgrade(UpgradeKind::Vital));
        assert_eq!(err, Err(ActionError::UpgradeMaxed(UpgradeKind::Vital)));
        assert_eq!(w.upgrade_error_timer, UPGRADE_ERROR_TICKS);
        assert_eq!(w.phase, GamePhase::LevelUp);
        assert_eq!(w.stats.upgrades_acquired, 0);
    }

    #[test]
    fn test_vital_upgrade_grows_health() {
        let mut w = world();
        w.phase = GamePhase::LevelUp;
        apply_action(&mut w, Action::SelectUpgrade(UpgradeKind::Vital)).unwrap();
        assert_eq!(w.player.max_health, PLAYER_START_HEALTH + 1);
        assert_eq!(w.player.health, PLAYER_START_HEALTH + 1);
        assert_eq!(w.stats.upgrades_acquired, 1);
    }

    #[test]
    fn test_restart_replaces_world() {
        let mut w = world();
        w.score = 900;
        w.phase = GamePhase::Dead;
        apply_action(&mut w, Action::Restart).unwrap();
        assert_eq!(w.phase, GamePhase::Playing);
        assert_eq!(w.score, 0);
        assert_eq!(w.player.health, PLAYER_START_HEALTH);
        assert!(w.level.triggered_rewards.is_empty());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(ActionError::NoBombs.to_string(), "no bombs left");
        assert_eq!(
            ActionError::UpgradeMaxed(UpgradeKind::Pulse).to_string(),
            "Pulse upgrade is already at its limit"
        );
    }
}
