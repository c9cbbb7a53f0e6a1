//! Fixed timestep simulation tick
//!
//! Core game loop that advances the world deterministically. One call is one
//! tick; all rates are per tick and no wall-clock time enters here.

use glam::Vec2;
use rand::Rng;

use super::collision::{is_stomp, landing_sweep, proximity, snap_rotation};
use super::effects::{LABEL_TICKS, update_effects};
use super::entities;
use super::generator;
use super::geom::Rect;
use super::input::TickInput;
use super::levels::{self, LevelReward, RewardKind};
use super::state::{
    ActiveBomb, CRUMBLE_FALL_GRAVITY, CrumblePhase, EnemyKind, GameEvent, GamePhase, HOVER_AMPLITUDE,
    HOVER_RATE, PHASE_CYCLE_TICKS, PHASE_WARNING_START, PlatformId, PlatformKind, PositionSnapshot,
    RotationAnchor, Shard, ShardRegime, Surface, World,
};
use crate::consts::*;

/// Advance the world by one fixed timestep
pub fn tick(world: &mut World, input: &TickInput) {
    world.upgrade_error_timer = world.upgrade_error_timer.saturating_sub(1);

    match world.phase {
        GamePhase::Dead => {
            update_effects(world);
            return;
        }
        GamePhase::LevelUp => {
            // Frozen while the upgrade panel is up; only cosmetics move
            world.time += 1;
            decay_banners(world);
            decay_camera_effects(world);
            update_effects(world);
            return;
        }
        GamePhase::Playing => {}
    }
    world.time += 1;

    record_history(world);
    apply_horizontal(world, input);

    // Ground pound
    let player = &mut world.player;
    if input.down && !player.grounded && !player.ground_pounding {
        player.vel.x *= GROUND_POUND_VX_KEEP;
        player.vel.y = GROUND_POUND_SPEED;
        player.ground_pounding = true;
    }

    // Gravity
    let mut gravity = GRAVITY;
    if player.ground_pounding {
        gravity *= GROUND_POUND_GRAVITY_MULT;
    } else if input.jump_held && player.vel.y < 0.0 {
        gravity *= JUMP_HOLD_GRAVITY_MULT;
    }
    player.vel.y += gravity;

    carry_with_platform(world);

    let player = &mut world.player;
    player.pos += player.vel;
    player.grounded = false;

    resolve_landing(world);
    if !world.player.grounded {
        let player = &mut world.player;
        player.has_landed = false;
        player.standing_on = None;
        player.surface = None;
        player.anchor = None;
    }

    update_platforms(world);
    apply_sticky_rotation(world);

    if check_death(world) {
        return;
    }

    let player = &mut world.player;
    player.scale += (Vec2::ONE - player.scale) * SCALE_RELAX;
    player.invincible_timer = player.invincible_timer.saturating_sub(1);

    update_enemies(world);
    // Contact damage can end the run before anything is collected
    if check_death(world) {
        return;
    }
    collect_fragments(world);
    collect_bomb_pickups(world);
    collect_heart_pickups(world);
    update_active_bombs(world);
    update_combo(world);
    update_milestone(world);
    update_level(world);

    // Distance score
    let distance = (world.player.pos.x.max(0.0) / 10.0).floor() as u64;
    world.score = world.score.max(distance);
    world.stats.distance_traveled = world.stats.distance_traveled.max(distance);

    if generator::needs_more(world) {
        generator::generate_batch(world);
    }

    despawn_offscreen(world);
    update_effects(world);
    update_camera(world);
}

fn record_history(world: &mut World) {
    if world.history.len() >= HISTORY_CAPACITY {
        world.history.pop_front();
    }
    world.history.push_back(PositionSnapshot {
        pos: world.player.pos,
        rotation: world.player.rotation,
    });
}

fn apply_horizontal(world: &mut World, input: &TickInput) {
    let player = &mut world.player;
    let dir = input.right as i32 - input.left as i32;
    if dir != 0 {
        player.vel.x += dir as f32 * ACCEL;
        if player.grounded {
            player.vel.x *= GROUND_ACCEL_DRAG;
        }
    } else {
        let friction = match (player.grounded, player.surface) {
            (true, Some(Surface::Ice)) => ICE_FRICTION,
            (true, _) => GROUND_FRICTION,
            (false, _) => AIR_FRICTION,
        };
        player.vel.x *= friction;
    }
    player.vel.x = player.vel.x.clamp(-MAX_SPEED, MAX_SPEED);
}

/// Move a grounded player by how far their platform moved last tick
fn carry_with_platform(world: &mut World) {
    if !world.player.grounded {
        return;
    }
    let Some(id) = world.player.standing_on else {
        return;
    };
    if let Some(pos) = world.platform(id).map(|p| p.rect.pos) {
        let player = &mut world.player;
        player.pos += pos - player.platform_last_pos;
        player.platform_last_pos = pos;
    }
}

fn resolve_landing(world: &mut World) {
    let body = world.player.rect();
    let vy = world.player.vel.y;
    let left = world.camera.x - COLLISION_CULL_MARGIN;
    let right = world.camera.x + world.config.viewport.width + COLLISION_CULL_MARGIN;

    let hit = world
        .platforms
        .iter()
        .filter(|p| p.rect.right() >= left && p.rect.left() <= right && p.is_collidable())
        .find_map(|p| {
            let contact = landing_sweep(&body, vy, &p.rect);
            contact.hit.then_some((p.id, contact.impact))
        });

    if let Some((id, impact)) = hit {
        land(world, id, impact);
    }
}

fn land(world: &mut World, id: PlatformId, impact: f32) {
    let Some(platform) = world.platform(id) else {
        return;
    };
    let rect = platform.rect;
    let surface = platform.surface;
    let platform_color = platform.color;
    let rotating = platform.angular_speed().is_some();
    let platform_angle = platform.angle();
    let color = world.config.palette.player;

    let player = &mut world.player;
    player.pos.y = rect.top() - player.size.y;
    player.vel.y = 0.0;
    player.grounded = true;
    player.standing_on = Some(id);
    player.platform_last_pos = rect.pos;
    player.surface = Some(surface);
    player.air_jumps = 0;
    let offset = player.center() - rect.center();
    player.anchor = rotating.then_some(RotationAnchor {
        angle: offset.y.atan2(offset.x) - platform_angle,
        distance: offset.length(),
    });
    let foot = Vec2::new(player.center().x, rect.top());

    if player.ground_pounding {
        player.ground_pounding = false;
        player.has_landed = true;
        world.shake(20.0);
        world.ripple(foot, 600.0, color);
        world.burst(foot, 18, color);
        world.push_event(GameEvent::GroundPoundImpact);
    } else if !player.has_landed {
        player.has_landed = true;
        player.rotation = snap_rotation(player.rotation);
        let center = player.center();
        world.ripple(foot, 400.0, platform_color);
        world.light(center, 300.0);
        let count = ((impact.abs() * 5.0).floor() as usize).min(10);
        world.burst(foot, count, color);
        if impact.abs() > HARD_LANDING_SPEED {
            world.shake(15.0);
        }
        world.push_event(GameEvent::Landed { impact });
    }

    if let Some(platform) = world.platform_mut(id) {
        platform.start_crumble();
    }
}

fn update_platforms(world: &mut World) {
    let time = world.time;
    let hot = world.config.palette.crumble_hot;
    let mut smoke = Vec::new();

    for platform in world.platforms.iter_mut() {
        match &mut platform.kind {
            PlatformKind::Static => {}
            PlatformKind::Rotating { angle, speed } => *angle += *speed,
            PlatformKind::Horizontal { start_x, end_x, speed } => {
                platform.rect.pos.x += *speed;
                if platform.rect.pos.x < *start_x || platform.rect.pos.x > *end_x {
                    *speed = -*speed;
                }
            }
            PlatformKind::Vertical { start_y, end_y, speed } => {
                platform.rect.pos.y += *speed;
                if platform.rect.pos.y < *end_y || platform.rect.pos.y > *start_y {
                    *speed = -*speed;
                }
            }
            PlatformKind::Crumble { phase } => match phase {
                CrumblePhase::Intact => {}
                CrumblePhase::Shaking { timer, jitter } => {
                    *timer = timer.saturating_sub(1);
                    *jitter = Vec2::new(world.rng.random::<f32>() - 0.5, world.rng.random::<f32>() - 0.5) * 2.0;
                    platform.color = hot;
                    if time % 10 == 0 {
                        smoke.push(Vec2::new(
                            platform.rect.left() + world.rng.random::<f32>() * platform.rect.size.x,
                            platform.rect.top(),
                        ));
                    }
                    if *timer == 0 {
                        *phase = CrumblePhase::Falling { vy: 0.0 };
                    }
                }
                CrumblePhase::Falling { vy } => {
                    *vy += CRUMBLE_FALL_GRAVITY;
                    platform.rect.pos.y += *vy;
                }
            },
            PlatformKind::Phasing { phased_out, opacity } => {
                let frame = time % PHASE_CYCLE_TICKS;
                let wave = (time as f32 * std::f32::consts::TAU / PHASE_CYCLE_TICKS as f32).sin();
                *phased_out = wave <= 0.0;
                *opacity = if !*phased_out {
                    0.8
                } else if frame >= PHASE_WARNING_START && time % 4 < 2 {
                    0.5
                } else {
                    0.2
                };
            }
        }
    }

    let color = world.config.palette.smoke;
    let cap = world.config.max_particles;
    for pos in smoke {
        if world.shards.len() >= cap {
            break;
        }
        let vel = Vec2::new(world.rng.random::<f32>() - 0.5, -world.rng.random::<f32>() * 2.0);
        world.shards.push(Shard {
            pos,
            vel,
            life: SNAP_SHARD_LIFE - SNAP_DRIFT_UNITS,
            regime: ShardRegime::Snap,
            color,
        });
    }
}

/// Keep a player standing on a rotating platform fixed to its surface
fn apply_sticky_rotation(world: &mut World) {
    let player = &world.player;
    if !player.grounded {
        return;
    }
    let (Some(id), Some(anchor)) = (player.standing_on, player.anchor) else {
        return;
    };
    let Some(platform) = world.platform(id) else {
        return;
    };
    let angle = platform.angle() + anchor.angle;
    let center = platform.rect.center();
    let player = &mut world.player;
    player.pos = center + Vec2::from_angle(angle) * anchor.distance - player.size * 0.5;
}

/// Returns true when this tick ended the run
fn check_death(world: &mut World) -> bool {
    if world.player.pos.y > world.camera_bottom() + FALL_DEATH_MARGIN {
        world.player.health = 0;
    }
    if world.player.health > 0 {
        return false;
    }

    world.phase = GamePhase::Dead;
    let center = world.player.center();
    let palette = world.config.palette;
    world.burst(center, 10, palette.player);
    world.ripple(center, 500.0, palette.enemy);
    world.finish_run();
    world.push_event(GameEvent::Died);
    log::info!(
        "Run over: score={} level={} enemies={} distance={}",
        world.score,
        world.level.current,
        world.stats.enemies_defeated,
        world.stats.distance_traveled
    );
    true
}

/// Count a kill toward the combo; returns the multiplier it scored at
pub(crate) fn register_kill(world: &mut World) -> u32 {
    let combo = &mut world.combo;
    let multiplier = (1 + combo.count / 2).min(COMBO_MAX);
    combo.count += 1;
    combo.timer = COMBO_TIMEOUT;
    combo.multiplier = multiplier;
    world.score += KILL_SCORE * multiplier as u64;
    world.stats.enemies_defeated += 1;
    multiplier
}

fn reset_combo(world: &mut World) {
    world.combo.count = 0;
    world.combo.multiplier = 1;
    world.combo.timer = 0;
}

fn update_enemies(world: &mut World) {
    let time = world.time as f32;
    for enemy in world.enemies.iter_mut() {
        enemy.rect.pos.x += enemy.vx;
        if enemy.rect.left() < enemy.patrol_min || enemy.rect.right() > enemy.patrol_max {
            enemy.vx = -enemy.vx;
        }
        if let EnemyKind::MidAir { base_y, hover_offset } = enemy.kind {
            enemy.rect.pos.y = base_y + (time * HOVER_RATE + hover_offset).sin() * HOVER_AMPLITUDE;
        }
    }

    let palette = world.config.palette;
    let mut i = world.enemies.len();
    while i > 0 {
        i -= 1;
        let enemy = world.enemies[i].rect;
        let body = world.player.rect();
        if !body.overlaps(&enemy) {
            continue;
        }

        if is_stomp(&body, world.player.vel.y, &enemy) {
            world.enemies.remove(i);
            world.player.vel.y = JUMP_FORCE * STOMP_BOUNCE_FACTOR;
            register_kill(world);
            let center = enemy.center();
            let ripple = 300.0 + world.player.upgrades.pulse as f32 * 50.0;
            world.burst(center, 10, palette.enemy);
            world.ripple(enemy.pos, ripple, palette.enemy);
            let count = world.combo.count;
            if count >= 2 {
                world.label(Vec2::new(center.x, enemy.top()), format!("x{count} COMBO!"), palette.enemy, LABEL_TICKS);
            }
            world.push_event(GameEvent::EnemyStomped { combo: count });
        } else if world.player.invincible_timer == 0 {
            let player = &mut world.player;
            player.health = (player.health - 1).max(0);
            player.invincible_timer = INVINCIBILITY_TICKS;
            player.vel.x = if player.pos.x < enemy.left() { -KNOCKBACK_VX } else { KNOCKBACK_VX };
            player.vel.y = KNOCKBACK_VY;
            let health = player.health;
            world.glitch_timer = 10;
            reset_combo(world);
            world.push_event(GameEvent::PlayerDamaged { health });
        }
    }
}

fn collect_fragments(world: &mut World) {
    let body = world.player.rect();
    if let Some(i) = world.fragments.iter().position(|f| body.overlaps(&f.rect)) {
        world.fragments.remove(i);
        world.stats.fragments_collected += 1;
        world.phase = GamePhase::LevelUp;
        world.push_event(GameEvent::FragmentCollected);
        log::debug!("Fragment collected at tick {}", world.time);
    }
}

fn collect_bomb_pickups(world: &mut World) {
    let body = world.player.rect();
    let color = world.config.palette.bomb;
    let mut hits = Vec::new();
    for pickup in world.bomb_pickups.iter_mut() {
        if !pickup.collected && body.overlaps(&pickup.rect) {
            pickup.collected = true;
            hits.push(pickup.rect);
        }
    }
    for rect in hits {
        world.player.bombs += 1;
        world.burst(rect.center(), 8, color);
        world.label(Vec2::new(rect.center().x, rect.top()), "+BOMB", color, LABEL_TICKS);
        world.push_event(GameEvent::BombCollected);
    }
}

fn collect_heart_pickups(world: &mut World) {
    let body = world.player.rect();
    let color = world.config.palette.heart;
    let mut hits = Vec::new();
    for pickup in world.heart_pickups.iter_mut() {
        if !pickup.collected && body.overlaps(&pickup.rect) {
            pickup.collected = true;
            hits.push(pickup.rect);
        }
    }
    for rect in hits {
        world.player.heal_or_grow(1);
        world.stats.rewards_collected += 1;
        world.burst(rect.center(), 10, color);
        world.label(Vec2::new(rect.center().x, rect.top() - 10.0), "+LIFE", color, 80);
        world.push_event(GameEvent::HeartCollected);
    }
}

fn update_active_bombs(world: &mut World) {
    let fallout = world.camera_bottom() + BOMB_FALLOUT_MARGIN;
    let mut blasts = Vec::new();

    world.active_bombs.retain_mut(|bomb| {
        bomb.vel.y += GRAVITY * BOMB_GRAVITY_MULT;
        bomb.rect.pos += bomb.vel;
        let hit = bomb.vel.y >= 0.0
            && world
                .platforms
                .iter()
                .filter(|p| p.is_collidable())
                .any(|p| landing_sweep(&bomb.rect, bomb.vel.y, &p.rect).hit);
        if hit || bomb.rect.top() > fallout {
            blasts.push(bomb.rect.center());
            false
        } else {
            true
        }
    });

    for at in blasts {
        explode(world, at);
    }
}

fn explode(world: &mut World, at: Vec2) {
    let palette = world.config.palette;
    world.shake(25.0);
    world.ripple(at, BOMB_BLAST_RADIUS * 3.0, palette.bomb);
    world.ripple(at, BOMB_BLAST_RADIUS * 2.0, palette.blast);
    world.burst(at, 24, palette.bomb);
    world.burst(at, 12, palette.blast);

    let mut kills = 0;
    let mut i = world.enemies.len();
    while i > 0 {
        i -= 1;
        let center = world.enemies[i].rect.center();
        if center.distance(at) < BOMB_BLAST_RADIUS {
            world.enemies.remove(i);
            world.burst(center, 10, palette.enemy);
            register_kill(world);
            kills += 1;
        }
    }
    if kills >= 2 {
        world.label(at - Vec2::new(0.0, 20.0), format!("BOOM x{kills}!"), palette.bomb, 80);
    }

    let player = &mut world.player;
    let offset = player.center() - at;
    let launch = proximity(player.center(), at, BOMB_BLAST_RADIUS * 2.0);
    if launch > 0.0 {
        player.vel.y = player.vel.y.min(JUMP_FORCE * 2.0 * launch);
        if offset.x != 0.0 {
            player.vel.x += offset.x.signum() * 4.0 * launch;
        }
        player.set_airborne();
    }
    world.push_event(GameEvent::BombExploded { kills });
}

/// Launch a bomb from the player's center
pub(crate) fn throw_bomb(world: &mut World) {
    let player = &world.player;
    let half = Vec2::splat(BOMB_SIZE / 2.0);
    let bomb = ActiveBomb {
        rect: Rect {
            pos: player.center() - half,
            size: half * 2.0,
        },
        vel: Vec2::new(player.vel.x, BOMB_THROW_VY),
    };
    world.active_bombs.push(bomb);
}

fn update_combo(world: &mut World) {
    if world.combo.timer > 0 {
        world.combo.timer -= 1;
    } else {
        world.combo.count = 0;
        world.combo.multiplier = 1;
    }
}

fn update_milestone(world: &mut World) {
    let milestone = &mut world.milestone;
    if milestone.active {
        milestone.timer = milestone.timer.saturating_sub(1);
        if milestone.timer == 0 {
            milestone.active = false;
        }
        return;
    }
    let reached = MILESTONES
        .into_iter()
        .find(|m| world.score >= *m && !milestone.triggered.contains(m));
    if let Some(m) = reached {
        milestone.triggered.insert(m);
        milestone.active = true;
        milestone.timer = MILESTONE_BANNER_TICKS;
        milestone.score = m;
        world.push_event(GameEvent::MilestoneReached(m));
    }
}

fn decay_banners(world: &mut World) {
    let level = &mut world.level;
    level.level_up_timer = level.level_up_timer.saturating_sub(1);
    level.tier_transition_timer = level.tier_transition_timer.saturating_sub(1);
}

fn update_level(world: &mut World) {
    decay_banners(world);

    if world.level.reward_display_timer > 0 {
        world.level.reward_display_timer -= 1;
    } else if let Some(reward) = world.level.pending_rewards.pop_front() {
        grant_reward(world, &reward);
        if !world.level.pending_rewards.is_empty() {
            world.level.reward_display_timer = levels::REWARD_DISPLAY_TICKS;
        }
    }

    let new_level = levels::score_to_level(world.score);
    let level = &mut world.level;
    if new_level <= level.current {
        level.just_leveled_up = false;
        return;
    }

    let crossed = level.current + 1..=new_level;
    let transition = crossed.clone().any(levels::is_tier_transition);
    level.previous = level.current;
    level.current = new_level;
    level.tier = levels::level_to_tier(new_level);
    level.just_leveled_up = true;
    level.is_tier_transition = transition;
    level.level_up_timer = if transition {
        levels::TIER_BANNER_TICKS
    } else {
        levels::LEVEL_BANNER_TICKS
    };
    if transition {
        level.tier_transition_timer = levels::TIER_BANNER_TICKS;
    }

    for crossed_level in crossed {
        let Some(reward) = levels::reward_for_level(crossed_level) else {
            continue;
        };
        if level.triggered_rewards.insert(crossed_level) {
            if level.pending_rewards.is_empty() && level.reward_display_timer == 0 {
                level.reward_display_timer = levels::REWARD_DISPLAY_TICKS;
            }
            level.pending_rewards.push_back(*reward);
        }
    }

    world.stats.highest_level = world.stats.highest_level.max(new_level);
    if transition {
        world.shake(levels::TIER_SHAKE);
    }
    log::info!("Level {} reached (tier {})", new_level, world.level.tier);
    world.push_event(GameEvent::LevelUp {
        level: new_level,
        tier_transition: transition,
    });
}

fn grant_reward(world: &mut World, reward: &LevelReward) {
    let player = &mut world.player;
    match reward.kind {
        RewardKind::Life => player.heal_or_grow(reward.amount as i32),
        RewardKind::Bomb => player.bombs += reward.amount,
        RewardKind::UpgradeFragment => {
            let anchor = Rect::new(player.center().x + 60.0, player.pos.y, 0.0, 0.0);
            let id = world.next_entity_id();
            world.fragments.push(entities::fragment_above(id, &anchor));
        }
        RewardKind::ScoreBonus => world.score += reward.amount as u64,
    }
    world.stats.rewards_collected += 1;
    let at = world.player.center() - Vec2::new(0.0, 40.0);
    world.label(at, reward.label, reward.color, 100);
    world.push_event(GameEvent::RewardGranted(reward.kind));
}

fn despawn_offscreen(world: &mut World) {
    let left = world.camera.x;
    let floor = world.camera_bottom() + 500.0;
    world
        .platforms
        .retain(|p| p.rect.right() > left && !(p.is_falling() && p.rect.top() > floor));
    world.enemies.retain(|e| e.rect.right() > left);
    world.fragments.retain(|f| f.rect.right() > left);
    world.bomb_pickups.retain(|b| b.rect.right() > left && !b.collected);
    world.heart_pickups.retain(|h| h.rect.right() > left && !h.collected);
}

fn decay_camera_effects(world: &mut World) {
    world.glitch_timer = world.glitch_timer.saturating_sub(1);
    world.screen_shake = (world.screen_shake - 1.0).max(0.0);
}

fn update_camera(world: &mut World) {
    decay_camera_effects(world);
    let viewport = world.config.viewport;
    let player = world.player.pos;
    let target = Vec2::new(player.x - viewport.width / 3.0, player.y - viewport.height / 2.0);
    world.camera += (target - world.camera) * CAMERA_SMOOTHING;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::actions::apply_action;
    use crate::sim::input::Action;
    use crate::sim::state::{Enemy, SimConfig, UpgradeKind};
    use proptest::prelude::*;

    fn world() -> World {
        World::new(12345, SimConfig::default())
    }

    fn idle(world: &mut World, ticks: usize) {
        for _ in 0..ticks {
            tick(world, &TickInput::default());
        }
    }

    #[test]
    fn test_player_settles_on_start_platform() {
        let mut w = world();
        idle(&mut w, 30);
        assert!(w.player.grounded);
        assert_eq!(w.phase, GamePhase::Playing);
        assert_eq!(w.history.len(), 30);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut w = world();
        idle(&mut w, 200);
        assert_eq!(w.history.len(), HISTORY_CAPACITY);
        assert!(w.ghost().is_some());
    }

    #[test]
    fn test_double_jump_then_nothing() {
        let mut w = world();
        idle(&mut w, 5);
        assert!(w.player.grounded);

        apply_action(&mut w, Action::Jump).unwrap();
        assert_eq!(w.player.air_jumps, 1);
        tick(&mut w, &TickInput::default());
        assert!(!w.player.grounded);

        apply_action(&mut w, Action::Jump).unwrap();
        assert_eq!(w.player.air_jumps, 0);
        assert_eq!(w.player.vel.y, JUMP_FORCE * DOUBLE_JUMP_FACTOR);

        let vy = w.player.vel.y;
        assert!(apply_action(&mut w, Action::Jump).is_err());
        assert_eq!(w.player.vel.y, vy);
    }

    #[test]
    fn test_combo_multiplier_sequence() {
        let mut w = world();
        let mults: Vec<u32> = (0..3).map(|_| register_kill(&mut w)).collect();
        assert_eq!(mults, vec![1, 1, 2]);
        assert_eq!(w.score, 40);
        assert_eq!(w.stats.enemies_defeated, 3);
    }

    #[test]
    fn test_combo_caps_at_max() {
        let mut w = world();
        let last = (0..20).map(|_| register_kill(&mut w)).last();
        assert_eq!(last, Some(COMBO_MAX));
    }

    #[test]
    fn test_combo_expires_after_timeout() {
        let mut w = world();
        register_kill(&mut w);
        register_kill(&mut w);
        for _ in 0..=COMBO_TIMEOUT {
            update_combo(&mut w);
        }
        assert_eq!(w.combo.count, 0);
        assert_eq!(register_kill(&mut w), 1);
    }

    #[test]
    fn test_stomp_kills_and_bounces() {
        let mut w = world();
        w.enemies.clear();
        w.player.grounded = false;
        w.player.standing_on = None;
        w.player.pos = Vec2::new(500.0, 100.0);
        w.player.vel = Vec2::new(0.0, 6.0);
        w.enemies.push(Enemy {
            id: 999,
            rect: Rect::new(500.0, 120.0, 25.0, 25.0),
            vx: 0.0,
            patrol_min: 0.0,
            patrol_max: 10_000.0,
            kind: EnemyKind::OnPlatform,
        });
        update_enemies(&mut w);
        assert!(w.enemies.is_empty());
        assert_eq!(w.player.vel.y, JUMP_FORCE * STOMP_BOUNCE_FACTOR);
        assert_eq!(w.score, KILL_SCORE);
        assert_eq!(w.player.health, PLAYER_START_HEALTH);
    }

    #[test]
    fn test_side_contact_damages_once() {
        let mut w = world();
        w.enemies.clear();
        w.player.pos = Vec2::new(500.0, 100.0);
        w.player.vel = Vec2::ZERO;
        w.enemies.push(Enemy {
            id: 999,
            rect: Rect::new(510.0, 100.0, 25.0, 25.0),
            vx: 0.0,
            patrol_min: 0.0,
            patrol_max: 10_000.0,
            kind: EnemyKind::OnPlatform,
        });
        update_enemies(&mut w);
        assert_eq!(w.player.health, PLAYER_START_HEALTH - 1);
        assert_eq!(w.player.invincible_timer, INVINCIBILITY_TICKS);
        assert_eq!(w.player.vel.x, -KNOCKBACK_VX);
        update_enemies(&mut w);
        assert_eq!(w.player.health, PLAYER_START_HEALTH - 1, "invincible");
    }

    #[test]
    fn test_fall_death_transitions_once() {
        let mut w = world();
        w.player.pos.y = w.camera_bottom() + FALL_DEATH_MARGIN + 50.0;
        w.player.grounded = false;
        tick(&mut w, &TickInput::default());
        assert_eq!(w.phase, GamePhase::Dead);
        assert_eq!(w.player.health, 0);
        let died = w.events.iter().filter(|e| **e == GameEvent::Died).count();
        assert_eq!(died, 1);

        let stats = w.take_finished_run();
        assert!(stats.is_some());
        idle(&mut w, 60);
        assert!(w.take_finished_run().is_none());
        assert_eq!(w.drain_events().iter().filter(|e| **e == GameEvent::Died).count(), 1);
    }

    #[test]
    fn test_dead_world_only_decays_effects() {
        let mut w = world();
        w.player.health = 0;
        tick(&mut w, &TickInput::default());
        let pos = w.player.pos;
        let time = w.time;
        idle(&mut w, 10);
        assert_eq!(w.player.pos, pos);
        assert_eq!(w.time, time);
    }

    #[test]
    fn test_fragment_enters_level_up() {
        let mut w = world();
        let body = w.player.rect();
        w.fragments.push(crate::sim::state::Collectible {
            id: 777,
            rect: Rect::new(body.left(), body.top(), 25.0, 25.0),
            collected: false,
        });
        tick(&mut w, &TickInput::default());
        assert_eq!(w.phase, GamePhase::LevelUp);
        assert_eq!(w.stats.fragments_collected, 1);

        let pos = w.player.pos;
        idle(&mut w, 10);
        assert_eq!(w.player.pos, pos, "motion frozen while choosing");

        apply_action(&mut w, Action::SelectUpgrade(UpgradeKind::Aero)).unwrap();
        assert_eq!(w.phase, GamePhase::Playing);
        assert_eq!(w.player.upgrades.aero, 1);
        assert_eq!(w.player.vertices, 4);
    }

    #[test]
    fn test_level_rewards_are_idempotent() {
        let mut w = world();
        w.score = levels::threshold(5);
        update_level(&mut w);
        assert_eq!(w.level.current, 5);
        assert_eq!(w.level.pending_rewards.len(), 1);

        // Force the same crossing again
        w.level.current = 1;
        update_level(&mut w);
        assert_eq!(w.level.pending_rewards.len(), 1);
        assert!(w.level.triggered_rewards.contains(&5));
    }

    #[test]
    fn test_reward_applied_after_display_delay() {
        let mut w = world();
        w.score = levels::threshold(5);
        update_level(&mut w);
        let granted = w.stats.rewards_collected;
        for _ in 0..levels::REWARD_DISPLAY_TICKS {
            update_level(&mut w);
        }
        assert_eq!(w.stats.rewards_collected, granted);
        update_level(&mut w);
        assert_eq!(w.stats.rewards_collected, granted + 1);
        assert!(w.level.pending_rewards.is_empty());
    }

    #[test]
    fn test_multi_level_jump_queues_every_reward() {
        let mut w = world();
        w.score = levels::threshold(20);
        update_level(&mut w);
        assert_eq!(w.level.current, 20);
        assert!(w.level.is_tier_transition);
        let expected = (2..=20).filter(|l| levels::reward_for_level(*l).is_some()).count();
        assert_eq!(w.level.pending_rewards.len(), expected);
        assert_eq!(w.stats.highest_level, 20);
    }

    #[test]
    fn test_milestone_fires_once() {
        let mut w = world();
        w.score = 600;
        update_milestone(&mut w);
        assert!(w.milestone.active);
        assert_eq!(w.milestone.score, 500);
        for _ in 0..MILESTONE_BANNER_TICKS {
            update_milestone(&mut w);
        }
        assert!(!w.milestone.active);
        update_milestone(&mut w);
        assert!(!w.milestone.active);
        assert_eq!(w.milestone.triggered.len(), 1);
    }

    #[test]
    fn test_bomb_blast_kills_and_launches() {
        let mut w = world();
        w.enemies.clear();
        let at = w.player.center() + Vec2::new(40.0, 0.0);
        w.enemies.push(Enemy {
            id: 999,
            rect: Rect::new(at.x - 12.5, at.y - 12.5, 25.0, 25.0),
            vx: 0.0,
            patrol_min: 0.0,
            patrol_max: 10_000.0,
            kind: EnemyKind::OnPlatform,
        });
        explode(&mut w, at);
        assert!(w.enemies.is_empty());
        assert_eq!(w.score, KILL_SCORE);
        assert!(w.player.vel.y < 0.0);
        assert!(w.player.vel.x < 0.0);
        assert!(!w.player.grounded);
    }

    #[test]
    fn test_ground_pound_dives() {
        let mut w = world();
        idle(&mut w, 3);
        apply_action(&mut w, Action::Jump).unwrap();
        idle(&mut w, 10);
        assert!(!w.player.ground_pounding);
        tick(
            &mut w,
            &TickInput {
                down: true,
                ..Default::default()
            },
        );
        assert!(w.player.ground_pounding);
        assert!(w.player.vel.y > GROUND_POUND_SPEED);
    }

    #[test]
    fn test_phasing_cycle() {
        let mut w = world();
        let id = w.next_entity_id();
        w.platforms.push(crate::sim::state::Platform {
            id,
            rect: Rect::new(-5000.0, 0.0, 100.0, 10.0),
            kind: PlatformKind::Phasing {
                phased_out: false,
                opacity: 0.8,
            },
            color: w.config.palette.phasing,
            surface: Surface::Normal,
            neutral: false,
        });
        let phase_at = |w: &mut World, time: u64| {
            w.time = time;
            update_platforms(w);
            w.platform(id).map(|p| p.is_collidable())
        };
        assert_eq!(phase_at(&mut w, 45), Some(true));
        assert_eq!(phase_at(&mut w, 120), Some(false));
        assert_eq!(phase_at(&mut w, 180 + 45), Some(true));
    }

    /// A world whose player has come to rest on the start platform
    fn settled() -> (World, PlatformId) {
        let mut w = world();
        idle(&mut w, 5);
        let id = w.player.standing_on.unwrap();
        (w, id)
    }

    #[test]
    fn test_contact_death_beats_fragment_pickup() {
        let (mut w, _) = settled();
        w.enemies.clear();
        w.player.health = 1;
        w.player.invincible_timer = 0;
        let body = w.player.rect();
        w.enemies.push(Enemy {
            id: 999,
            rect: Rect::new(body.right() - 5.0, body.top(), 25.0, 25.0),
            vx: 0.0,
            patrol_min: 0.0,
            patrol_max: 10_000.0,
            kind: EnemyKind::OnPlatform,
        });
        w.fragments.push(crate::sim::state::Collectible {
            id: 777,
            rect: Rect::new(body.left(), body.top(), 25.0, 25.0),
            collected: false,
        });

        tick(&mut w, &TickInput::default());
        assert_eq!(w.phase, GamePhase::Dead);
        assert_eq!(w.player.health, 0);
        assert_eq!(w.stats.fragments_collected, 0);
        assert_eq!(
            apply_action(&mut w, Action::SelectUpgrade(UpgradeKind::Vital)),
            Err(crate::sim::actions::ActionError::NotChoosingUpgrade)
        );
        assert_eq!(w.player.health, 0);
    }

    #[test]
    fn test_moving_platform_carries_player() {
        let (mut w, id) = settled();
        let start = w.platform(id).unwrap().rect.pos.x;
        w.platform_mut(id).unwrap().kind = PlatformKind::Horizontal {
            start_x: start,
            end_x: start + 1000.0,
            speed: 2.0,
        };
        let x = w.player.pos.x;
        idle(&mut w, 20);

        let moved = w.platform(id).unwrap().rect.pos.x - start;
        assert_eq!(moved, 40.0);
        assert!(w.player.grounded);
        assert_eq!(w.player.standing_on, Some(id));
        // Carry lags the platform by one tick
        assert!((w.player.pos.x - x - (moved - 2.0)).abs() < 1e-3);
    }

    #[test]
    fn test_rotating_platform_keeps_player_anchored() {
        let (mut w, id) = settled();
        w.platform_mut(id).unwrap().kind = PlatformKind::Rotating { angle: 0.0, speed: 0.1 };
        let before = w.player.pos;
        tick(&mut w, &TickInput::default());

        let platform = w.platform(id).unwrap();
        assert!((platform.angle() - 0.1).abs() < 1e-6);
        let anchor = w.player.anchor.unwrap();
        let offset = w.player.center() - platform.rect.center();
        let expected = Vec2::from_angle(platform.angle() + anchor.angle) * anchor.distance;
        assert!((offset - expected).length() < 1e-3);
        assert!(w.player.pos.distance(before) > 0.1, "swung with the platform");
    }

    #[test]
    fn test_jump_from_rotating_platform_is_flung() {
        let (mut w, id) = settled();
        let speed = 0.05;
        w.platform_mut(id).unwrap().kind = PlatformKind::Rotating { angle: 0.0, speed };
        tick(&mut w, &TickInput::default());
        assert!(w.player.grounded);

        let d = w.player.center() - w.platform(id).unwrap().rect.center();
        let vx = w.player.vel.x;
        apply_action(&mut w, Action::Jump).unwrap();
        assert!((w.player.vel.x - (vx - d.y * speed * 2.5)).abs() < 1e-4);
        assert!((w.player.vel.y - (JUMP_FORCE + d.x * speed)).abs() < 1e-4);
    }

    #[test]
    fn test_crumble_collapses_then_despawns() {
        let (mut w, id) = settled();
        w.platform_mut(id).unwrap().kind = PlatformKind::Crumble {
            phase: CrumblePhase::Intact,
        };
        tick(&mut w, &TickInput::default());
        assert!(matches!(
            w.platform(id).unwrap().kind,
            PlatformKind::Crumble {
                phase: CrumblePhase::Shaking { .. }
            }
        ));

        idle(&mut w, crate::sim::state::CRUMBLE_TICKS as usize - 1);
        let platform = w.platform(id).unwrap();
        assert!(platform.is_falling());
        assert!(!platform.is_collidable());

        let floor = w.camera_bottom() + 500.0;
        let mut steps = 0;
        while let Some(platform) = w.platform(id) {
            assert!(platform.rect.top() <= floor + 100.0, "kept too long");
            update_platforms(&mut w);
            despawn_offscreen(&mut w);
            steps += 1;
            assert!(steps < 500);
        }
    }

    #[test]
    fn test_despawn_behind_camera() {
        let mut w = world();
        w.enemies.clear();
        w.camera.x = 1000.0;
        for (id, x) in [(1, 900.0), (2, 990.0), (3, 1100.0)] {
            w.enemies.push(Enemy {
                id,
                rect: Rect::new(x, 0.0, 25.0, 25.0),
                vx: 0.0,
                patrol_min: 0.0,
                patrol_max: 10_000.0,
                kind: EnemyKind::OnPlatform,
            });
        }
        despawn_offscreen(&mut w);
        let left: Vec<u32> = w.enemies.iter().map(|e| e.id).collect();
        assert_eq!(left, vec![2, 3]);
        assert!(w.platforms.iter().all(|p| p.rect.right() > 1000.0));
    }

    #[test]
    fn test_camera_eases_toward_player() {
        let mut w = world();
        w.camera = Vec2::ZERO;
        w.player.pos = Vec2::new(1000.0, 500.0);
        let viewport = w.config.viewport;
        let target = Vec2::new(1000.0 - viewport.width / 3.0, 500.0 - viewport.height / 2.0);
        update_camera(&mut w);
        assert!((w.camera - target * CAMERA_SMOOTHING).length() < 1e-3);
        update_camera(&mut w);
        assert!(w.camera.distance(target) < target.length() * (1.0 - CAMERA_SMOOTHING));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn score_and_level_never_decrease(seed in 0u64..1_000, presses in prop::collection::vec(0u8..6, 50..300)) {
            let mut w = World::new(seed, SimConfig::default());
            let mut last_score = 0;
            let mut last_level = 1;
            for p in presses {
                let input = TickInput {
                    right: p != 0,
                    left: p == 5,
                    down: p == 4,
                    jump_held: p == 1 || p == 2,
                };
                if p == 1 {
                    let _ = apply_action(&mut w, Action::Jump);
                }
                if w.phase == GamePhase::LevelUp {
                    let _ = apply_action(&mut w, Action::SelectUpgrade(UpgradeKind::Vital));
                }
                tick(&mut w, &input);
                prop_assert!(w.score >= last_score);
                prop_assert!(w.level.current >= last_level);
                prop_assert!(w.player.health >= 0);
                prop_assert!(w.player.health <= w.player.max_health);
                last_score = w.score;
                last_level = w.level.current;
            }
        }
    }
}
