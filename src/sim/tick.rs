//! Fixed timestep simulation tick
//!
//! Core game loop that advances simulation deterministically.

use glam::Vec2;
use log::info;
use rand::Rng;

use super::ball::{BallSpeed, BallState, BallType, GameBall};
use super::beam::Beam;
use super::boss::BossContext;
use super::collision::{CollisionResult, aabbs_overlap};
use super::item;
use super::level::LevelFeedback;
use super::paddle::{LASER_BULLET_COOLDOWN, PaddleType, PlayerPaddle};
use super::piece::{DestructionMethod, PieceCoord};
use super::projectile::{Collidee, Projectile, ProjectileKind, ProjectileSpawn, split_scale_factor};
use super::state::{GameEvent, GamePhase, GameState};
use crate::consts::*;
use crate::{rotate_deg, sign_of};

/// Launch spread (degrees either side of straight up) off a still paddle
const LAUNCH_SPREAD_STILL_DEG: f32 = 20.0;
/// Launch spread off a moving paddle
const LAUNCH_SPREAD_MOVING_DEG: f32 = 10.0;
/// Seconds between paddle mines
const MINE_COOLDOWN: f32 = 1.0;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Target paddle x (from mouse/touch position)
    pub paddle_target_x: Option<f32>,
    /// Launch ball (click/tap/space)
    pub launch: bool,
    /// Pause toggle
    pub pause: bool,
    /// Fire whatever weapon the paddle carries
    pub fire_weapon: bool,
    /// Idle/demo mode - AI plays the game
    pub idle_mode: bool,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    // Handle pause toggle
    if input.pause {
        match state.phase {
            GamePhase::BallOnPaddle | GamePhase::BallInPlay | GamePhase::BossBattle => {
                state.paused_from = Some(state.phase);
                state.phase = GamePhase::Paused;
                info!("Paused");
                return;
            }
            GamePhase::Paused => {
                state.phase = state.paused_from.take().unwrap_or(GamePhase::BallOnPaddle);
                info!("Resumed in {:?}", state.phase);
            }
            _ => {}
        }
    }

    // Don't tick if paused or finished
    match state.phase {
        GamePhase::Paused | GamePhase::GameOver | GamePhase::LevelComplete => return,
        _ => {}
    }

    state.time_ticks += 1;

    let input = if input.idle_mode {
        autopilot(state, input)
    } else {
        input.clone()
    };

    // Paddle follows its target
    let target_x = input.paddle_target_x.unwrap_or(state.paddle.center.x);
    state.paddle.move_toward(target_x, dt, state.settings.paddle_speed);
    state.paddle.tick(dt);

    let mut fb = LevelFeedback::default();
    state.level.tick(dt, &mut state.balls, &mut fb);

    // Balls held by the paddle ride along until launched
    let in_play = state.is_in_play();
    carry_balls_on_paddle(state);
    if input.launch {
        launch_balls(state);
    }
    if in_play {
        for i in 0..state.balls.len() {
            step_ball(state, i, dt, &mut fb);
        }
        collide_balls(&mut state.balls);
        tick_ball_powers(state, dt, &mut fb);
    }

    if input.fire_weapon {
        fire_paddle_weapon(state, &mut fb);
    }
    let splits = tick_projectiles(state, dt, &mut fb);
    tick_beams(state, dt, &mut fb);
    tick_boss(state, dt, &mut fb);

    state.absorb(fb);
    for mut p in splits {
        p.id = state.next_entity_id();
        state.push_event(GameEvent::ProjectileSpawned { id: p.id, kind: p.kind });
        state.projectiles.push(p);
    }
    item::tick_items(state, dt);

    handle_ball_deaths(state);
    check_level_complete(state);

    // Normalize ordering for determinism
    state.normalize_order();
}

/// Steer the paddle under the lowest falling ball
fn autopilot(state: &GameState, input: &TickInput) -> TickInput {
    let mut input = input.clone();

    // Auto-launch anything resting on the paddle
    if state.balls.iter().any(|b| matches!(b.state, BallState::OnPaddle { .. })) {
        input.launch = true;
    }

    let in_play = state.balls.iter().filter(|b| b.state == BallState::InPlay);
    let falling = in_play
        .clone()
        .filter(|b| b.velocity().y < 0.0)
        .min_by(|a, b| a.center().y.total_cmp(&b.center().y));
    let lowest = falling.or_else(|| in_play.min_by(|a, b| a.center().y.total_cmp(&b.center().y)));

    if let Some(ball) = lowest {
        let width = state.level.unit_width();
        let vel = ball.velocity();
        let paddle_top = state.paddle.top_center().y + ball.radius();
        let mut x = ball.center().x;
        if vel.y < 0.0 {
            // Predict where the ball reaches paddle height, folding off the walls
            let t = (ball.center().y - paddle_top).max(0.0) / -vel.y;
            let m = (x + vel.x * t).rem_euclid(2.0 * width);
            x = if m > width { 2.0 * width - m } else { m };
        }
        // Vary the contact point so the ball does not loop forever
        let time_factor = state.time_ticks as f32 * 0.01;
        let offset = time_factor.sin() * state.paddle.half_width() * 0.5;
        input.paddle_target_x = Some(x + offset);

        // Go for an item while the ball is safely on its way up
        let safe = vel.y > 0.0 && ball.center().y > state.level.unit_height() * 0.5;
        if safe && let Some(item) = state.items.iter().min_by(|a, b| a.center.y.total_cmp(&b.center.y)) {
            input.paddle_target_x = Some(item.center.x);
        }
    }

    let armed = [
        PaddleType::LASER_BULLET,
        PaddleType::LASER_BEAM,
        PaddleType::ROCKET,
        PaddleType::MINE,
    ];
    if armed.iter().any(|t| state.paddle.has_type(*t)) {
        input.fire_weapon = true;
    }
    input
}

fn carry_balls_on_paddle(state: &mut GameState) {
    let top = state.paddle.top_center();
    for ball in state.balls.iter_mut() {
        if let BallState::OnPaddle { offset } = ball.state {
            let r = ball.radius();
            ball.set_center(top + Vec2::new(offset, r));
        }
    }
}

fn launch_balls(state: &mut GameState) {
    let moving = state.paddle.avg_vel_x.abs() > EPSILON;
    let mut launched = 0;
    for ball in state.balls.iter_mut() {
        if !matches!(ball.state, BallState::OnPaddle { .. }) {
            continue;
        }
        let deg = if moving {
            // Lean against the paddle's motion
            let lean = -sign_of(state.paddle.avg_vel_x) * LAUNCH_SPREAD_MOVING_DEG * 0.5;
            lean + state.rng.random_range(-LAUNCH_SPREAD_MOVING_DEG..LAUNCH_SPREAD_MOVING_DEG) * 0.5
        } else {
            state.rng.random_range(-LAUNCH_SPREAD_STILL_DEG..LAUNCH_SPREAD_STILL_DEG)
        };
        // Slow and fast items outlast a catch and relaunch
        let speed = if ball.ball_type.contains(BallType::SLOW) {
            BallSpeed::Slow
        } else if ball.ball_type.contains(BallType::FAST) {
            BallSpeed::Fast
        } else {
            state.settings.ball_start_speed
        };
        ball.state = BallState::InPlay;
        ball.set_velocity(speed, rotate_deg(Vec2::Y, deg));
        launched += 1;
    }
    if launched > 0 {
        state.phase = state.play_phase();
        info!("Launched {} ball(s), now {:?}", launched, state.phase);
    }
}

/// What a moving ball runs into first this tick
enum BallContact {
    Level(Option<PieceCoord>, CollisionResult),
    TeslaArc(CollisionResult),
    Boss(usize, CollisionResult),
}

impl BallContact {
    fn time(&self) -> f32 {
        match self {
            BallContact::Level(_, r) | BallContact::TeslaArc(r) | BallContact::Boss(_, r) => r.time,
        }
    }
}

/// Move one ball, resolving its earliest collision
fn step_ball(state: &mut GameState, i: usize, dt: f32, fb: &mut LevelFeedback) {
    let gravity = state.gravity_dir;
    let Some(ball) = state.balls.get(i) else {
        return;
    };
    if ball.state != BallState::InPlay {
        state.balls[i].tick(dt, gravity);
        return;
    }

    // Paddle first
    if let Some(res) = state.paddle.collide_ball(ball, dt) {
        let ball = &mut state.balls[i];
        ball.bounce(&res, dt);
        state.paddle.modify_ball_on_hit(ball);
        ball.set_last_piece(None);
        state.paddle.catch_ball(ball);
        fb.events.push(GameEvent::BallPaddleCollision { ball: ball.id });
        return;
    }

    let mut contact = state
        .level
        .collide_ball(ball, dt)
        .map(|hit| BallContact::Level(hit.piece, hit.result));
    for other in [
        state.level.collide_tesla_arcs(ball, dt).map(BallContact::TeslaArc),
        state
            .boss
            .as_ref()
            .and_then(|boss| boss.collide_ball(ball, dt))
            .map(|(part, res)| BallContact::Boss(part, res)),
    ]
    .into_iter()
    .flatten()
    {
        if contact.as_ref().is_none_or(|c| other.time() < c.time()) {
            contact = Some(other);
        }
    }

    let ball = &mut state.balls[i];
    match contact {
        None => ball.tick(dt, gravity),
        Some(BallContact::Level(None, res)) | Some(BallContact::TeslaArc(res)) => {
            ball.bounce(&res, dt);
            ball.set_last_piece(None);
        }
        Some(BallContact::Level(Some(coord), res)) => {
            fb.events.push(GameEvent::BallBlockCollision { w: coord.0, h: coord.1 });
            let bounces = state.level.ball_hit(ball, coord, &mut state.rng, fb);
            if bounces {
                ball.bounce(&res, dt);
            } else if ball.state == BallState::InPlay {
                ball.tick(dt, gravity);
            }
        }
        Some(BallContact::Boss(part, res)) => {
            ball.bounce(&res, dt);
            ball.set_last_piece(None);
            if let Some(boss) = state.boss.as_mut() {
                boss.ball_hit(part, &mut fb.events);
            }
        }
    }
}

/// Elastic bounces between overlapping balls
fn collide_balls(balls: &mut [GameBall]) {
    for i in 0..balls.len() {
        let (head, tail) = balls.split_at_mut(i + 1);
        let a = &mut head[i];
        for b in tail.iter_mut() {
            if a.state != BallState::InPlay || b.state != BallState::InPlay || !a.ball_collides_with(b) {
                continue;
            }
            let n = (b.center() - a.center()).normalize_or(Vec2::X);
            let (va, vb) = (a.velocity(), b.velocity());
            if (va - vb).dot(n) <= 0.0 {
                continue;
            }
            // Swap the velocity components along the line of centres
            let swap = n * (va - vb).dot(n);
            a.set_direction(va - swap);
            b.set_direction(vb + swap);

            let overlap = a.radius() + b.radius() - a.center().distance(b.center());
            if overlap > 0.0 {
                let push = n * (overlap * 0.5 + EPSILON);
                a.set_center(a.center() - push);
                b.set_center(b.center() + push);
            }
        }
    }
}

/// Crazy balls swerve, omni-laser balls spray bullets, magnets pull
fn tick_ball_powers(state: &mut GameState, dt: f32, fb: &mut LevelFeedback) {
    for ball in state.balls.iter_mut().filter(|b| b.state == BallState::InPlay) {
        if ball.ball_type.contains(BallType::CRAZY) {
            ball.tick_crazy(dt, &mut state.rng);
        }
        if ball.ball_type.contains(BallType::OMNI_LASER) {
            for dir in ball.tick_omni_laser(dt, &mut state.rng) {
                fb.spawns.push(ProjectileSpawn {
                    kind: ProjectileKind::BallLaserBullet,
                    position: ball.center() + dir * (ball.radius() + 0.5),
                    dir,
                });
            }
        }
        state.paddle.magnet_pull(ball, dt);
    }
}

/// A hostile hit on the paddle: shrink it unless it is shielded
fn hurt_paddle(paddle: &mut PlayerPaddle, events: &mut Vec<GameEvent>) {
    if paddle.has_type(PaddleType::SHIELD) {
        return;
    }
    paddle.shrink();
    events.push(GameEvent::PaddleHit);
}

fn fire_paddle_weapon(state: &mut GameState, fb: &mut LevelFeedback) {
    let paddle = &mut state.paddle;
    let from = paddle.top_center();

    if paddle.has_type(PaddleType::LASER_BEAM) {
        paddle.remove_type(PaddleType::LASER_BEAM);
        if state.beams.is_empty() {
            state.beams.push(Beam::paddle_laser(state.settings.beam_damage_per_sec));
            info!("Paddle laser beam fired");
        }
    }
    if paddle.has_type(PaddleType::ROCKET) {
        paddle.remove_type(PaddleType::ROCKET);
        fb.spawns.push(ProjectileSpawn {
            kind: ProjectileKind::PaddleRocket,
            position: from,
            dir: Vec2::Y,
        });
    }
    if paddle.weapon_cooldown > 0.0 {
        return;
    }
    if paddle.has_type(PaddleType::LASER_BULLET) {
        fb.spawns.push(ProjectileSpawn {
            kind: ProjectileKind::PaddleLaserBullet,
            position: from,
            dir: Vec2::Y,
        });
        paddle.weapon_cooldown = LASER_BULLET_COOLDOWN;
    } else if paddle.has_type(PaddleType::MINE) {
        fb.spawns.push(ProjectileSpawn {
            kind: ProjectileKind::PaddleMine,
            position: from,
            dir: Vec2::Y,
        });
        paddle.weapon_cooldown = MINE_COOLDOWN;
    }
}

/// Move and collide projectiles; returns the copies split off by prisms
fn tick_projectiles(state: &mut GameState, dt: f32, fb: &mut LevelFeedback) -> Vec<Projectile> {
    let mut splits = Vec::new();
    let bounds = state.level.bounds_aabb();
    let mut projectiles = std::mem::take(&mut state.projectiles);

    projectiles.retain_mut(|p| {
        if p.is_resting() {
            if p.tick(dt) {
                if let Some(Collidee::Piece(coord)) = p.last_collided {
                    state.level.explode_around(coord, DestructionMethod::Bomb, fb);
                }
                return false;
            }
            return true;
        }

        // Paddle
        if p.kind.is_hostile() && p.last_collided != Some(Collidee::Paddle) && aabbs_overlap(&p.aabb(), &state.paddle.aabb()) {
            hurt_paddle(&mut state.paddle, &mut fb.events);
            return false;
        }

        // Boss
        if p.kind.can_hit_boss()
            && let Some(boss) = state.boss.as_mut()
            && let Some(part) = boss.hits_aabb(&p.aabb())
            && p.last_collided != Some(Collidee::BossPart(part))
        {
            boss.projectile_hit(part, p.kind, &mut fb.events);
            if p.kind != ProjectileKind::CollateralBlock {
                return false;
            }
            p.last_collided = Some(Collidee::BossPart(part));
        }

        // Level pieces along the path covered this tick
        let ignore: Vec<PieceCoord> = match p.last_collided {
            Some(Collidee::Piece(c)) => vec![c],
            _ => Vec::new(),
        };
        if let Some((coord, t)) = state.level.first_collider(&p.tail_ray(), &ignore)
            && t <= p.reach(dt)
        {
            let hit = state.level.projectile_hit(p, coord, fb);
            if hit.remove {
                return false;
            }
            if !hit.splits.is_empty() {
                let scale = split_scale_factor(hit.splits.len() + 1);
                p.width *= scale;
                p.height *= scale;
                for ray in &hit.splits {
                    let mut copy = p.split_copy(0, ray, 1.0);
                    copy.last_collided = p.last_collided;
                    splits.push(copy);
                }
            }
            if p.is_resting() {
                return true;
            }
        }

        p.tick(dt);
        bounds.contains(p.position)
    });

    state.projectiles = projectiles;
    splits
}

fn tick_beams(state: &mut GameState, dt: f32, fb: &mut LevelFeedback) {
    let mut beams = std::mem::take(&mut state.beams);
    let before = beams.len();
    beams.retain_mut(|beam| !beam.tick(dt));
    if beams.len() != before {
        fb.events.push(GameEvent::BeamChanged);
    }

    for beam in beams.iter_mut() {
        let initial = beam.paddle_origin_segments(&state.paddle);
        beam.build_and_update(initial, &state.level, state.boss.as_ref(), &mut state.paddle, &mut fb.events);
        beam.apply_damage(dt, &mut state.level, state.boss.as_mut(), fb);
    }
    state.beams = beams;
}

fn tick_boss(state: &mut GameState, dt: f32, fb: &mut LevelFeedback) {
    let Some(boss) = state.boss.as_mut() else {
        return;
    };
    let mut ctx = BossContext {
        level: &state.level,
        paddle_center: state.paddle.center,
        rng: &mut state.rng,
        speed_scale: state.settings.boss_speed_scale(),
        spawns: &mut fb.spawns,
        drops: &mut fb.drops,
        events: &mut fb.events,
    };
    boss.tick(dt, &mut ctx);

    if boss.can_hurt_paddle_with_body()
        && let Some(part) = boss.hits_aabb(&state.paddle.aabb())
        && boss.paddle_hit(part)
    {
        hurt_paddle(&mut state.paddle, &mut fb.events);
    }
}

fn handle_ball_deaths(state: &mut GameState) {
    if !state.is_in_play() {
        return;
    }
    let mut dead = Vec::new();
    state.balls.retain(|b| {
        let alive = b.state != BallState::InPlay || b.center().y >= DEATH_Y;
        if !alive {
            dead.push(b.id);
        }
        alive
    });
    for id in dead {
        state.push_event(GameEvent::BallDeath { ball: id });
    }
    if !state.balls.is_empty() {
        return;
    }

    state.lives = state.lives.saturating_sub(1);
    state.push_event(GameEvent::LifeLost { lives_left: state.lives });
    state.projectiles.clear();
    state.beams.clear();
    item::clear_items(state);
    if state.lives == 0 {
        info!("Game over with {} points", state.score);
        state.phase = GamePhase::GameOver;
        state.push_event(GameEvent::GameOver);
    } else {
        info!("Life lost, {} left", state.lives);
        state.phase = GamePhase::BallOnPaddle;
        state.spawn_ball_on_paddle();
    }
}

fn check_level_complete(state: &mut GameState) {
    if !state.is_in_play() {
        return;
    }
    let boss_done = state.boss.as_ref().is_none_or(|b| b.is_dead());
    if boss_done && state.level.is_complete() {
        info!("Level complete with {} points", state.score);
        state.phase = GamePhase::LevelComplete;
        state.push_event(GameEvent::LevelCompleted);
    } else if state.phase == GamePhase::BossBattle && boss_done {
        state.phase = GamePhase::BallInPlay;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::sim::ball::BallType;
    use crate::sim::boss::Boss;
    use crate::sim::item::{GameItem, ItemKind};
    use crate::sim::level::GameLevel;

    fn level() -> GameLevel {
        GameLevel::from_layout(&[
            "..........",
            "rrrrrrrrrr",
            "oooooooooo",
            "..........",
            "..........",
            "..........",
            "..........",
            "..........",
            "..........",
            "..........",
        ])
        .expect("valid layout")
    }

    fn new_state(seed: u64) -> GameState {
        // Random drops would land on the paddle mid-test
        let settings = Settings {
            item_drop_chance: 0.0,
            ..Settings::default()
        };
        GameState::new(seed, level(), settings)
    }

    fn launch() -> TickInput {
        TickInput {
            launch: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_tick_serve_to_playing() {
        let mut state = new_state(12345);
        assert_eq!(state.phase, GamePhase::BallOnPaddle);
        assert_eq!(state.balls.len(), 1);

        // Tick without launch - should stay on the paddle
        let input = TickInput::default();
        tick(&mut state, &input, SIM_DT);
        assert_eq!(state.phase, GamePhase::BallOnPaddle);

        tick(&mut state, &launch(), SIM_DT);
        assert_eq!(state.phase, GamePhase::BallInPlay);
        assert_eq!(state.balls[0].state, BallState::InPlay);
        let dir = state.balls[0].direction();
        assert!(dir.y > 0.0);
        assert!(90.0 - dir.y.asin().to_degrees() <= LAUNCH_SPREAD_STILL_DEG + 1e-3);
    }

    #[test]
    fn test_tick_pause() {
        let mut state = new_state(12345);
        tick(&mut state, &launch(), SIM_DT);
        assert_eq!(state.phase, GamePhase::BallInPlay);

        let input = TickInput {
            pause: true,
            ..Default::default()
        };
        tick(&mut state, &input, SIM_DT);
        assert_eq!(state.phase, GamePhase::Paused);
        let frozen = state.balls[0].center();
        tick(&mut state, &TickInput::default(), SIM_DT);
        assert_eq!(state.balls[0].center(), frozen);

        // Unpause
        tick(&mut state, &input, SIM_DT);
        assert_eq!(state.phase, GamePhase::BallInPlay);
    }

    #[test]
    fn test_paddle_follows_target() {
        let mut state = new_state(1);
        let input = TickInput {
            paddle_target_x: Some(2.0),
            ..Default::default()
        };
        for _ in 0..240 {
            tick(&mut state, &input, SIM_DT);
        }
        assert!((state.paddle.center.x - 2.0).abs() < 1e-3);
        let ball = &state.balls[0];
        assert!((ball.center().x - state.paddle.center.x).abs() < 1e-4);

        // Past the left wall the paddle stops flush against it
        let input = TickInput {
            paddle_target_x: Some(0.0),
            ..Default::default()
        };
        for _ in 0..240 {
            tick(&mut state, &input, SIM_DT);
        }
        let left = state.paddle.center.x - state.paddle.half_width();
        assert!((left - state.paddle.min_x).abs() < 1e-3);
        assert!((state.balls[0].center().x - state.paddle.center.x).abs() < 1e-4);
    }

    #[test]
    fn test_ball_breaks_block_and_scores() {
        let mut state = new_state(7);
        tick(&mut state, &launch(), SIM_DT);
        state.drain_events();
        // Straight up into the orange row
        state.balls[0].set_velocity(state.settings.ball_start_speed, Vec2::Y);

        let mut hit = false;
        for _ in 0..240 {
            tick(&mut state, &TickInput::default(), SIM_DT);
            if state
                .drain_events()
                .iter()
                .any(|e| matches!(e, GameEvent::BallBlockCollision { .. }))
            {
                hit = true;
                break;
            }
        }
        assert!(hit);
        assert!(state.score > 0);
        assert!(state.balls[0].direction().y < 0.0);
    }

    #[test]
    fn test_losing_last_ball_costs_a_life() {
        let mut state = new_state(3);
        tick(&mut state, &launch(), SIM_DT);
        let lives = state.lives;
        state.balls[0].set_center(Vec2::new(1.0, DEATH_Y - 1.0));
        state.balls[0].set_velocity(state.settings.ball_start_speed, Vec2::NEG_Y);
        tick(&mut state, &TickInput::default(), SIM_DT);

        assert_eq!(state.lives, lives - 1);
        assert_eq!(state.phase, GamePhase::BallOnPaddle);
        assert_eq!(state.balls.len(), 1);
        let events = state.drain_events();
        assert!(events.iter().any(|e| matches!(e, GameEvent::BallDeath { .. })));
        assert!(events.contains(&GameEvent::LifeLost { lives_left: lives - 1 }));
    }

    #[test]
    fn test_game_over_when_out_of_lives() {
        let mut state = new_state(3);
        state.lives = 1;
        tick(&mut state, &launch(), SIM_DT);
        state.balls[0].set_center(Vec2::new(1.0, DEATH_Y - 1.0));
        tick(&mut state, &TickInput::default(), SIM_DT);
        assert_eq!(state.phase, GamePhase::GameOver);
        assert!(state.drain_events().contains(&GameEvent::GameOver));

        // Nothing moves after the run ends
        let ticks = state.time_ticks;
        tick(&mut state, &launch(), SIM_DT);
        assert_eq!(state.time_ticks, ticks);
    }

    #[test]
    fn test_level_complete_when_required_pieces_gone() {
        let level = GameLevel::from_layout(&["s...", "....", "...."]).expect("valid layout");
        let mut state = GameState::new(1, level, Settings::default());
        tick(&mut state, &launch(), SIM_DT);
        assert_eq!(state.phase, GamePhase::LevelComplete);
        assert!(state.drain_events().contains(&GameEvent::LevelCompleted));
    }

    #[test]
    fn test_boss_level_needs_dead_boss() {
        let level = GameLevel::from_layout(&["............"; 24]).expect("valid layout");
        let boss = Boss::gothic_romantic(&level);
        let mut state = GameState::new(1, level, Settings::default()).with_boss(boss);
        tick(&mut state, &launch(), SIM_DT);
        assert_eq!(state.phase, GamePhase::BossBattle);
        for _ in 0..120 {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }
        assert!(matches!(state.phase, GamePhase::BossBattle | GamePhase::BallOnPaddle));
    }

    #[test]
    fn test_laser_bullets_fire_with_cooldown() {
        let mut state = new_state(5);
        state.paddle.add_type(PaddleType::LASER_BULLET);
        let fire = TickInput {
            fire_weapon: true,
            ..Default::default()
        };
        tick(&mut state, &fire, SIM_DT);
        tick(&mut state, &fire, SIM_DT);
        let bullets = state
            .projectiles
            .iter()
            .filter(|p| p.kind == ProjectileKind::PaddleLaserBullet)
            .count();
        assert_eq!(bullets, 1);
    }

    #[test]
    fn test_laser_bullet_breaks_block() {
        let mut state = new_state(5);
        state.paddle.add_type(PaddleType::LASER_BULLET);
        let fire = TickInput {
            fire_weapon: true,
            ..Default::default()
        };
        tick(&mut state, &fire, SIM_DT);
        for _ in 0..120 {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }
        assert!(state.projectiles.is_empty());
        assert!(state.score > 0);
    }

    #[test]
    fn test_hostile_shot_shrinks_paddle() {
        let mut state = new_state(5);
        let before = state.paddle.half_width();
        let at = state.paddle.top_center() + Vec2::new(0.0, 2.0);
        state.spawn_projectile(ProjectileSpawn {
            kind: ProjectileKind::BossLaserBullet,
            position: at,
            dir: Vec2::NEG_Y,
        });
        for _ in 0..60 {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }
        assert!(state.paddle.half_width() < before);
        assert!(state.drain_events().contains(&GameEvent::PaddleHit));

        state.paddle.add_type(PaddleType::SHIELD);
        let shrunk = state.paddle.half_width();
        state.spawn_projectile(ProjectileSpawn {
            kind: ProjectileKind::BossOrb,
            position: at,
            dir: Vec2::NEG_Y,
        });
        for _ in 0..60 {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }
        assert_eq!(state.paddle.half_width(), shrunk);
    }

    #[test]
    fn test_paddle_beam_expires() {
        let mut state = new_state(5);
        state.paddle.add_type(PaddleType::LASER_BEAM);
        let fire = TickInput {
            fire_weapon: true,
            ..Default::default()
        };
        tick(&mut state, &fire, SIM_DT);
        assert_eq!(state.beams.len(), 1);
        assert!(!state.beams[0].parts.is_empty());
        assert!(!state.paddle.has_type(PaddleType::LASER_BEAM));

        let secs = state.beams[0].total_life + 0.1;
        for _ in 0..(secs / SIM_DT) as usize + 2 {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }
        assert!(state.beams.is_empty());
        assert!(state.score > 0);
    }

    #[test]
    fn test_sticky_paddle_holds_ball_until_launch() {
        let mut state = new_state(8);
        tick(&mut state, &launch(), SIM_DT);
        state.paddle.add_type(PaddleType::STICKY);
        let above = state.paddle.top_center() + Vec2::new(0.5, 1.0);
        state.balls[0].set_center(above);
        state.balls[0].set_velocity(state.settings.ball_start_speed, Vec2::NEG_Y);
        for _ in 0..30 {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }
        assert!(matches!(state.balls[0].state, BallState::OnPaddle { .. }));
        assert_eq!(state.phase, GamePhase::BallInPlay);

        tick(&mut state, &launch(), SIM_DT);
        assert_eq!(state.balls[0].state, BallState::InPlay);
        assert!(state.balls[0].direction().y > 0.0);
    }

    #[test]
    fn test_ball_bounces_off_ball() {
        let mut a = GameBall::new(1, Vec2::new(0.0, 0.0));
        let mut b = GameBall::new(2, Vec2::new(0.8, 0.0));
        for (ball, dir) in [(&mut a, Vec2::X), (&mut b, Vec2::NEG_X)] {
            ball.state = BallState::InPlay;
            ball.set_velocity(crate::sim::ball::BallSpeed::Normal, dir);
        }
        let mut balls = vec![a, b];
        collide_balls(&mut balls);
        assert!(balls[0].direction().x < 0.0);
        assert!(balls[1].direction().x > 0.0);
        assert!(balls[0].center().distance(balls[1].center()) >= 1.0 - 1e-4);
    }

    #[test]
    fn test_fire_ball_leaves_fire_glob() {
        let mut state = new_state(11);
        tick(&mut state, &launch(), SIM_DT);
        state.balls[0].ball_type.insert(BallType::FIRE);
        state.balls[0].set_velocity(state.settings.ball_start_speed, Vec2::Y);
        state.drain_events();
        let mut spawned = false;
        for _ in 0..240 {
            tick(&mut state, &TickInput::default(), SIM_DT);
            if state.drain_events().iter().any(|e| {
                matches!(
                    e,
                    GameEvent::ProjectileSpawned {
                        kind: ProjectileKind::FireGlob,
                        ..
                    }
                )
            }) {
                spawned = true;
                break;
            }
        }
        assert!(spawned);
    }

    #[test]
    fn test_paddle_catches_falling_item() {
        let mut state = new_state(6);
        tick(&mut state, &launch(), SIM_DT);
        let above = state.paddle.top_center() + Vec2::new(0.0, 2.0);
        state.items.push(GameItem::new(500, ItemKind::UberBall, above));
        let mut caught = false;
        for _ in 0..120 {
            tick(&mut state, &TickInput::default(), SIM_DT);
            if state
                .drain_events()
                .contains(&GameEvent::ItemCollected { kind: ItemKind::UberBall })
            {
                caught = true;
                break;
            }
        }
        assert!(caught);
        assert!(state.items.is_empty());
        assert!(state.balls[0].ball_type.contains(BallType::UBER));
    }

    #[test]
    fn test_life_lost_clears_items() {
        let mut state = new_state(3);
        tick(&mut state, &launch(), SIM_DT);
        item::activate(&mut state, ItemKind::ShieldPaddle);
        state.items.push(GameItem::new(500, ItemKind::LifeUp, Vec2::new(12.0, 6.0)));
        state.balls[0].set_center(Vec2::new(1.0, DEATH_Y - 1.0));
        tick(&mut state, &TickInput::default(), SIM_DT);
        assert!(state.items.is_empty());
        assert!(state.item_timers.is_empty());
        assert!(!state.paddle.has_type(PaddleType::SHIELD));
    }

    #[test]
    fn test_omni_laser_ball_sprays_bullets() {
        let mut state = new_state(21);
        let idle = TickInput {
            idle_mode: true,
            ..Default::default()
        };
        tick(&mut state, &idle, SIM_DT);
        state.balls[0].ball_type.insert(BallType::OMNI_LASER);
        let mut bullets = 0;
        for _ in 0..(4.0 / SIM_DT) as usize {
            tick(&mut state, &idle, SIM_DT);
            bullets += state
                .drain_events()
                .iter()
                .filter(|e| {
                    matches!(
                        e,
                        GameEvent::ProjectileSpawned {
                            kind: ProjectileKind::BallLaserBullet,
                            ..
                        }
                    )
                })
                .count();
        }
        assert!(bullets > 0);
    }

    #[test]
    fn test_slow_ball_relaunches_slow() {
        let mut state = new_state(8);
        tick(&mut state, &launch(), SIM_DT);
        item::activate(&mut state, ItemKind::BallSlowDown);
        item::activate(&mut state, ItemKind::StickyPaddle);
        let above = state.paddle.top_center() + Vec2::new(0.5, 1.0);
        state.balls[0].set_center(above);
        state.balls[0].set_velocity(BallSpeed::Slow, Vec2::NEG_Y);
        for _ in 0..60 {
            tick(&mut state, &TickInput::default(), SIM_DT);
        }
        assert!(matches!(state.balls[0].state, BallState::OnPaddle { .. }));
        tick(&mut state, &launch(), SIM_DT);
        assert_eq!(state.balls[0].speed(), BallSpeed::Slow);
    }

    #[test]
    fn test_idle_mode_keeps_ball_alive() {
        let mut state = new_state(2024);
        let idle = TickInput {
            idle_mode: true,
            ..Default::default()
        };
        for _ in 0..(10.0 / SIM_DT) as usize {
            tick(&mut state, &idle, SIM_DT);
        }
        assert_ne!(state.phase, GamePhase::GameOver);
        assert!(state.time_ticks > 0);
    }

    #[test]
    fn test_determinism() {
        // Two states with same seed should produce identical results
        let mut state1 = new_state(99999);
        let mut state2 = new_state(99999);

        let inputs = [
            TickInput {
                paddle_target_x: Some(5.0),
                ..Default::default()
            },
            launch(),
            TickInput {
                paddle_target_x: Some(18.0),
                ..Default::default()
            },
            TickInput::default(),
        ];

        for _ in 0..200 {
            for input in &inputs {
                tick(&mut state1, input, SIM_DT);
                tick(&mut state2, input, SIM_DT);
            }
        }

        assert_eq!(state1.time_ticks, state2.time_ticks);
        assert_eq!(state1.score, state2.score);
        assert_eq!(state1.balls.len(), state2.balls.len());
        for (a, b) in state1.balls.iter().zip(&state2.balls) {
            assert_eq!(a.center(), b.center());
        }
        assert_eq!(state1.drain_events(), state2.drain_events());
    }
}
