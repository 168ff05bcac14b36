//! The Classical boss: a temple facade with two striking arms
//!
//! Stage one is fought against the arm squares. Once both arms are lost the
//! boss falls back to a second stage where only its eye can be hurt.

use std::f32::consts::PI;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::body::{BossBody, WeakpointHit, diamond, triangle};
use super::{BossAi, BossContext, Mover};
use crate::consts::HALF_PIECE_WIDTH;
use crate::rotate_deg;
use crate::sim::bounds::BoundingLines;
use crate::sim::level::GameLevel;
use crate::sim::projectile::ProjectileKind;

pub const MAX_SPEED: f32 = 5.0;
pub const ACCELERATION: f32 = 10.0;
/// Root y of the resting boss, measured down from the top of the level
const TOP_OFFSET: f32 = 7.0;
/// Root y the boss drops to before swinging an arm
const ATTACK_HEIGHT: f32 = 10.5;
const STRIKE_DEPTH: f32 = 4.5;

const ARM_LIFE: f32 = 300.0;
const ARM_BALL_DAMAGE: f32 = 100.0;
const EYE_LIFE: f32 = 500.0;
const EYE_BALL_DAMAGE: f32 = 100.0;

const LASER_SPRAY_COUNT: usize = 5;
const LASER_SPRAY_SPREAD_DEG: f32 = 15.0;
const SPRAY_RESET_SECS: f32 = 1.5;
const BODY_HEAD_SPRAY_RESET_SECS: f32 = 1.0;
const BARRAGE_SPRAY_RESET_SECS: f32 = 0.25;

const SHAKE_SECS: f32 = 1.0;
const STRIKE_SECS: f32 = 2.5;
const PREP_LASER_SECS: f32 = 1.25;
const BARRAGE_SECS: f32 = 4.0;
const HURT_SECS: f32 = 2.0;
const ANGRY_SECS: f32 = 2.0;

const ARM_X: f32 = 10.246;

/// Indices of the Classical boss's parts in its body arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassicalParts {
    pub alive: usize,
    pub dead: usize,
    pub eye: usize,
    pub pediment: usize,
    pub base: usize,
    pub columns: [usize; 6],
    pub left_arm: usize,
    pub left_square: usize,
    pub right_arm: usize,
    pub right_square: usize,
}

fn rect(center: Vec2, width: f32, height: f32) -> BoundingLines {
    BoundingLines::rectangle(center, width * 0.5, height * 0.5)
}

/// One arm: two supports and a column, with the square between the supports
fn build_arm(body: &mut BossBody, parent: usize, x: f32) -> (usize, usize) {
    let arm = body.add_composite(parent);
    let rest = body.add_composite(arm);
    body.add_basic(rest, rect(Vec2::new(0.0, 3.097 + 0.326), 3.097, 0.652));
    body.add_basic(rest, rect(Vec2::new(0.0, 0.326), 3.097, 0.652));
    body.add_basic(rest, rect(Vec2::new(0.0, -2.9555), 2.589, 5.911));
    let square = body.add_basic(arm, rect(Vec2::new(0.0, 0.652 + 1.2225), 2.445, 2.445));
    body.translate(arm, Vec2::new(x, 0.0));
    (arm, square)
}

/// Build the facade centred near the top of `level`
pub fn build_body(level: &GameLevel) -> (BossBody, ClassicalParts) {
    let mut body = BossBody::new();
    let alive = body.add_composite(BossBody::ROOT);
    let dead = body.add_composite(BossBody::ROOT);

    let eye = body.add_basic(alive, diamond(3.15, 1.575).translated(Vec2::new(0.0, 5.081)));
    let pediment = body.add_basic(
        alive,
        triangle(17.823, -1.58, 1.58, true).translated(Vec2::new(0.0, 5.0905)),
    );
    let base = body.add_basic(alive, rect(Vec2::new(0.0, -4.596), 18.355, 2.15));
    let column_xs = [-7.275, -5.101, -2.927, 2.927, 5.101, 7.275];
    let columns = column_xs.map(|x| body.add_basic(alive, rect(Vec2::new(x, -1.3345), 1.704, 4.373)));

    let (left_arm, left_square) = build_arm(&mut body, alive, -ARM_X);
    let (right_arm, right_square) = build_arm(&mut body, alive, ARM_X);

    let start = Vec2::new(level.unit_width() * 0.5, level.unit_height() - TOP_OFFSET);
    body.translate(alive, start);
    body.translate(dead, start);

    let parts = ClassicalParts {
        alive,
        dead,
        eye,
        pediment,
        base,
        columns,
        left_arm,
        left_square,
        right_arm,
        right_square,
    };
    (body, parts)
}

/// Five boss lasers fanned around the line from the eye to the paddle
fn laser_spray(body: &BossBody, parts: &ClassicalParts, ctx: &mut BossContext) {
    let Some(eye) = body.part(parts.eye).map(|p| p.translation()) else {
        return;
    };
    let aim = (ctx.paddle_center - eye).normalize_or(Vec2::NEG_Y);
    let half = (LASER_SPRAY_COUNT / 2) as f32;
    for i in 0..LASER_SPRAY_COUNT {
        let deg = (i as f32 - half) * LASER_SPRAY_SPREAD_DEG;
        ctx.shoot(ProjectileKind::BossLaserBullet, eye, rotate_deg(aim, deg));
    }
}

/// Drift left and right along the top of the level
fn side_to_side(
    mover: &mut Mover,
    dir_x: &mut f32,
    body: &BossBody,
    parts: &ClassicalParts,
    speed: f32,
    level: &GameLevel,
) {
    let aabb = body.world_aabb(parts.alive);
    if aabb.min.x <= HALF_PIECE_WIDTH {
        *dir_x = 1.0;
    } else if aabb.max.x >= level.unit_width() - HALF_PIECE_WIDTH {
        *dir_x = -1.0;
    }
    let y = root_pos(body, parts).y;
    let top = level.unit_height() - TOP_OFFSET;
    mover.desired = Vec2::new(*dir_x * speed, (top - y).clamp(-speed, speed));
}

fn root_pos(body: &BossBody, parts: &ClassicalParts) -> Vec2 {
    body.part(parts.alive).map_or(Vec2::ZERO, |p| p.translation())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArmsBodyHeadState {
    BasicMoveAndLaserSpray,
    ChasePaddle,
    AttackLeftArm,
    AttackRightArm,
    AttackBothArms,
    PrepLaser,
    MoveAndBarrageWithLaser,
    Hurt,
    LostArmsAngry,
}

/// Stage one: fought against the two arm squares
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmsBodyHeadAi {
    parts: ClassicalParts,
    state: ArmsBodyHeadState,
    mover: Mover,
    state_timer: f32,
    spray_countdown: f32,
    dir_x: f32,
    /// Seconds into the current arm attack
    attack_elapsed: f32,
    /// How far the attacking arms are currently lowered
    strike_offset: f32,
    paddle_hit_this_attack: bool,
    arm_lost: bool,
}

impl ArmsBodyHeadAi {
    pub fn new(body: &mut BossBody, parts: ClassicalParts) -> Self {
        body.convert_to_weakpoint(parts.left_square, ARM_LIFE, ARM_BALL_DAMAGE);
        body.convert_to_weakpoint(parts.right_square, ARM_LIFE, ARM_BALL_DAMAGE);
        Self {
            parts,
            state: ArmsBodyHeadState::BasicMoveAndLaserSpray,
            mover: Mover::new(ACCELERATION),
            state_timer: 5.0,
            spray_countdown: SPRAY_RESET_SECS,
            dir_x: 1.0,
            attack_elapsed: 0.0,
            strike_offset: 0.0,
            paddle_hit_this_attack: false,
            arm_lost: false,
        }
    }

    pub fn state(&self) -> ArmsBodyHeadState {
        self.state
    }

    fn enter(&mut self, state: ArmsBodyHeadState, secs: f32) {
        self.state = state;
        self.state_timer = secs;
    }

    fn enter_basic_move(&mut self, ctx: &mut BossContext) {
        let secs = ctx.rng.random_range(4.0..7.0);
        self.enter(ArmsBodyHeadState::BasicMoveAndLaserSpray, secs);
        self.spray_countdown = SPRAY_RESET_SECS;
    }

    fn arm_alive(&self, body: &BossBody, arm: usize) -> bool {
        !body.is_destroyed(arm) && body.part(arm).and_then(|p| p.parent) == Some(self.parts.alive)
    }

    /// Mean remaining life over both arm squares
    fn life_fraction(&self, body: &BossBody) -> f32 {
        0.5 * (body.life_fraction(self.parts.left_square) + body.life_fraction(self.parts.right_square))
    }

    fn attacking_arms(&self) -> Vec<usize> {
        match self.state {
            ArmsBodyHeadState::AttackLeftArm => vec![self.parts.left_arm],
            ArmsBodyHeadState::AttackRightArm => vec![self.parts.right_arm],
            ArmsBodyHeadState::AttackBothArms => vec![self.parts.left_arm, self.parts.right_arm],
            _ => Vec::new(),
        }
    }

    fn is_attacking(&self) -> bool {
        matches!(
            self.state,
            ArmsBodyHeadState::AttackLeftArm
                | ArmsBodyHeadState::AttackRightArm
                | ArmsBodyHeadState::AttackBothArms
        )
    }

    /// Put any lowered arms back in place
    fn end_attack(&mut self, body: &mut BossBody) {
        for arm in self.attacking_arms() {
            body.translate(arm, Vec2::new(0.0, self.strike_offset));
            body.set_collision_velocity(arm, Vec2::ZERO);
        }
        self.strike_offset = 0.0;
        self.attack_elapsed = 0.0;
        self.paddle_hit_this_attack = false;
    }

    fn choose_attack(&mut self, body: &BossBody, ctx: &mut BossContext) {
        let left = self.arm_alive(body, self.parts.left_arm);
        let right = self.arm_alive(body, self.parts.right_arm);
        let life = self.life_fraction(body);
        let x = root_pos(body, &self.parts).x;

        let state = if left && right && ctx.rng.random::<f32>() >= life - 0.05 {
            ArmsBodyHeadState::AttackBothArms
        } else if left && (!right || ctx.paddle_center.x < x) {
            ArmsBodyHeadState::AttackLeftArm
        } else {
            ArmsBodyHeadState::AttackRightArm
        };
        self.enter(state, SHAKE_SECS + STRIKE_SECS);
        self.attack_elapsed = 0.0;
        self.strike_offset = 0.0;
        self.paddle_hit_this_attack = false;
    }

    /// Root x that lines the nearest living arm up with the paddle
    fn chase_target_x(&self, body: &BossBody, paddle_x: f32) -> f32 {
        let root_x = root_pos(body, &self.parts).x;
        [self.parts.left_arm, self.parts.right_arm]
            .into_iter()
            .filter(|&arm| self.arm_alive(body, arm))
            .filter_map(|arm| body.part(arm).map(|p| p.translation().x - root_x))
            .map(|offset| paddle_x - offset)
            .min_by(|a, b| (a - root_x).abs().total_cmp(&(b - root_x).abs()))
            .unwrap_or(paddle_x)
    }

    pub fn tick(&mut self, body: &mut BossBody, dt: f32, ctx: &mut BossContext) -> Option<BossAi> {
        if self.arm_lost {
            self.arm_lost = false;
            self.end_attack(body);
            self.mover.desired = Vec2::ZERO;
            self.enter(ArmsBodyHeadState::Hurt, HURT_SECS);
        }

        let speed = MAX_SPEED * ctx.speed_scale;
        self.state_timer -= dt;

        match self.state {
            ArmsBodyHeadState::BasicMoveAndLaserSpray => {
                side_to_side(&mut self.mover, &mut self.dir_x, body, &self.parts, speed / 1.25, ctx.level);
                self.spray_countdown -= dt;
                if self.spray_countdown <= 0.0 {
                    laser_spray(body, &self.parts, ctx);
                    self.spray_countdown = SPRAY_RESET_SECS;
                }
                if self.state_timer <= 0.0 {
                    let life = self.life_fraction(body);
                    if ctx.rng.random::<f32>() >= life - 0.1 {
                        self.enter(ArmsBodyHeadState::PrepLaser, PREP_LASER_SECS);
                    } else {
                        let secs = ctx.rng.random_range(3.0..5.0);
                        self.enter(ArmsBodyHeadState::ChasePaddle, secs);
                    }
                }
            }
            ArmsBodyHeadState::ChasePaddle => {
                let pos = root_pos(body, &self.parts);
                let target = Vec2::new(self.chase_target_x(body, ctx.paddle_center.x), ATTACK_HEIGHT);
                self.mover.desired = ((target - pos) * 2.0).clamp_length_max(speed);
                let aligned = (target.x - pos.x).abs() < HALF_PIECE_WIDTH && (target.y - pos.y).abs() < 0.5;
                if aligned || self.state_timer <= 0.0 {
                    self.mover.stop();
                    self.choose_attack(body, ctx);
                }
            }
            ArmsBodyHeadState::AttackLeftArm
            | ArmsBodyHeadState::AttackRightArm
            | ArmsBodyHeadState::AttackBothArms => {
                self.mover.stop();
                self.attack_elapsed += dt;
                if self.attack_elapsed > SHAKE_SECS {
                    let t = ((self.attack_elapsed - SHAKE_SECS) / STRIKE_SECS).min(1.0);
                    let offset = STRIKE_DEPTH * (PI * t).sin();
                    let delta = offset - self.strike_offset;
                    let vel = Vec2::new(0.0, -delta / dt.max(f32::EPSILON));
                    for arm in self.attacking_arms() {
                        body.translate(arm, Vec2::new(0.0, -delta));
                        body.set_collision_velocity(arm, vel);
                    }
                    self.strike_offset = offset;
                    if t >= 1.0 {
                        self.end_attack(body);
                        self.enter_basic_move(ctx);
                    }
                }
            }
            ArmsBodyHeadState::PrepLaser => {
                self.mover.desired = Vec2::ZERO;
                if self.state_timer <= 0.0 {
                    self.enter(ArmsBodyHeadState::MoveAndBarrageWithLaser, BARRAGE_SECS);
                    self.spray_countdown = 0.0;
                }
            }
            ArmsBodyHeadState::MoveAndBarrageWithLaser => {
                side_to_side(&mut self.mover, &mut self.dir_x, body, &self.parts, speed, ctx.level);
                self.spray_countdown -= dt;
                if self.spray_countdown <= 0.0 {
                    laser_spray(body, &self.parts, ctx);
                    self.spray_countdown = BARRAGE_SPRAY_RESET_SECS;
                }
                if self.state_timer <= 0.0 {
                    self.enter_basic_move(ctx);
                }
            }
            ArmsBodyHeadState::Hurt => {
                self.mover.desired = Vec2::ZERO;
                if self.state_timer <= 0.0 {
                    let left = self.arm_alive(body, self.parts.left_arm);
                    let right = self.arm_alive(body, self.parts.right_arm);
                    if !left && !right {
                        self.enter(ArmsBodyHeadState::LostArmsAngry, ANGRY_SECS);
                    } else {
                        self.enter_basic_move(ctx);
                    }
                }
            }
            ArmsBodyHeadState::LostArmsAngry => {
                self.mover.desired = Vec2::ZERO;
                if self.state_timer <= 0.0 {
                    self.mover.stop();
                    body.set_collision_velocity(self.parts.alive, Vec2::ZERO);
                    return Some(BossAi::ClassicalBodyHead(BodyHeadAi::new(body, self.parts)));
                }
            }
        }

        if !self.is_attacking() {
            self.mover.apply(body, self.parts.alive, dt, ctx.level);
        }
        None
    }

    pub fn weakpoint_hit(&mut self, body: &mut BossBody, part: usize, hit: WeakpointHit) {
        if hit != WeakpointHit::Destroyed {
            return;
        }
        let arm = if part == self.parts.left_square {
            self.parts.left_arm
        } else if part == self.parts.right_square {
            self.parts.right_arm
        } else {
            return;
        };
        // Lowered arms must be raised before one is detached
        if self.is_attacking() {
            self.end_attack(body);
            self.state = ArmsBodyHeadState::Hurt;
        }
        body.set_destroyed(arm);
        body.reparent(arm, self.parts.dead);
        self.arm_lost = true;
    }

    /// Only a striking arm hurts the paddle, and only once per strike
    pub fn paddle_hit(&mut self, _part: usize) -> bool {
        if !self.can_hurt_paddle_with_body() || self.paddle_hit_this_attack {
            return false;
        }
        self.paddle_hit_this_attack = true;
        true
    }

    pub fn can_hurt_paddle_with_body(&self) -> bool {
        self.is_attacking() && self.attack_elapsed > SHAKE_SECS
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyHeadState {
    BasicMoveAndLaserSpray,
    EyeDestroyed,
}

/// Stage two: the armless facade, hurt only through its eye
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyHeadAi {
    parts: ClassicalParts,
    state: BodyHeadState,
    mover: Mover,
    spray_countdown: f32,
    dir_x: f32,
}

impl BodyHeadAi {
    pub fn new(body: &mut BossBody, parts: ClassicalParts) -> Self {
        body.convert_to_weakpoint(parts.eye, EYE_LIFE, EYE_BALL_DAMAGE);
        Self {
            parts,
            state: BodyHeadState::BasicMoveAndLaserSpray,
            mover: Mover::new(ACCELERATION),
            spray_countdown: BODY_HEAD_SPRAY_RESET_SECS,
            dir_x: 1.0,
        }
    }

    pub fn state(&self) -> BodyHeadState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == BodyHeadState::EyeDestroyed
    }

    pub fn tick(&mut self, body: &mut BossBody, dt: f32, ctx: &mut BossContext) -> Option<BossAi> {
        if self.is_finished() {
            return None;
        }
        let speed = MAX_SPEED * ctx.speed_scale / 1.25;
        side_to_side(&mut self.mover, &mut self.dir_x, body, &self.parts, speed, ctx.level);
        self.spray_countdown -= dt;
        if self.spray_countdown <= 0.0 {
            laser_spray(body, &self.parts, ctx);
            self.spray_countdown = BODY_HEAD_SPRAY_RESET_SECS;
        }
        self.mover.apply(body, self.parts.alive, dt, ctx.level);
        None
    }

    pub fn weakpoint_hit(&mut self, part: usize, hit: WeakpointHit) {
        if part == self.parts.eye && hit == WeakpointHit::Destroyed {
            self.state = BodyHeadState::EyeDestroyed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::projectile::ProjectileSpawn;
    use crate::sim::state::GameEvent;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn arena() -> GameLevel {
        GameLevel::from_layout(&[".........."; 24]).expect("valid layout")
    }

    fn run(
        ai: &mut ArmsBodyHeadAi,
        body: &mut BossBody,
        level: &GameLevel,
        rng: &mut Pcg32,
        spawns: &mut Vec<ProjectileSpawn>,
        secs: f32,
    ) -> Option<BossAi> {
        let mut events: Vec<GameEvent> = Vec::new();
        let mut drops = Vec::new();
        let dt = 1.0 / 60.0;
        let steps = (secs / dt).round() as usize;
        for _ in 0..steps {
            let mut ctx = BossContext {
                level,
                paddle_center: Vec2::new(12.5, -0.5),
                rng,
                speed_scale: 1.0,
                spawns,
                drops: &mut drops,
                events: &mut events,
            };
            if let Some(next) = ai.tick(body, dt, &mut ctx) {
                return Some(next);
            }
        }
        None
    }

    #[test]
    fn test_body_starts_inside_level() {
        let level = arena();
        let (body, parts) = build_body(&level);
        let aabb = body.world_aabb(parts.alive);
        assert!(aabb.min.x >= 0.0 && aabb.max.x <= level.unit_width());
        assert!(aabb.max.y <= level.unit_height());
        assert!(body.world_aabb(parts.left_square).center().x < body.world_aabb(parts.eye).center().x);
    }

    #[test]
    fn test_basic_move_sprays_five_lasers() {
        let level = arena();
        let (mut body, parts) = build_body(&level);
        let mut ai = ArmsBodyHeadAi::new(&mut body, parts);
        let mut rng = Pcg32::seed_from_u64(1);
        let mut spawns = Vec::new();
        run(&mut ai, &mut body, &level, &mut rng, &mut spawns, 1.6);
        assert_eq!(spawns.len(), LASER_SPRAY_COUNT);
        assert!(spawns.iter().all(|s| s.kind == ProjectileKind::BossLaserBullet));
        assert!(spawns.iter().all(|s| s.dir.y < 0.0));
    }

    #[test]
    fn test_losing_both_arms_moves_to_body_head() {
        let level = arena();
        let (mut body, parts) = build_body(&level);
        let mut ai = ArmsBodyHeadAi::new(&mut body, parts);
        let mut rng = Pcg32::seed_from_u64(2);
        let mut spawns = Vec::new();

        let hit = body.diminish(parts.left_square, ARM_LIFE, false);
        ai.weakpoint_hit(&mut body, parts.left_square, hit);
        assert!(body.is_destroyed(parts.left_arm));
        run(&mut ai, &mut body, &level, &mut rng, &mut spawns, 0.1);
        assert_eq!(ai.state(), ArmsBodyHeadState::Hurt);

        let hit = body.diminish(parts.right_square, ARM_LIFE, false);
        ai.weakpoint_hit(&mut body, parts.right_square, hit);
        assert!(run(&mut ai, &mut body, &level, &mut rng, &mut spawns, HURT_SECS + 0.1).is_none());
        assert_eq!(ai.state(), ArmsBodyHeadState::LostArmsAngry);

        let next = run(&mut ai, &mut body, &level, &mut rng, &mut spawns, ANGRY_SECS + 0.1);
        assert!(matches!(next, Some(BossAi::ClassicalBodyHead(_))));
        assert!(body.part(parts.eye).and_then(|p| p.weakpoint()).is_some());
    }

    #[test]
    fn test_strike_hurts_paddle_once() {
        let level = arena();
        let (mut body, parts) = build_body(&level);
        let mut ai = ArmsBodyHeadAi::new(&mut body, parts);
        let mut rng = Pcg32::seed_from_u64(4);
        let before = body.world_aabb(parts.left_arm);

        ai.enter(ArmsBodyHeadState::AttackLeftArm, SHAKE_SECS + STRIKE_SECS);
        assert!(!ai.can_hurt_paddle_with_body());
        let mut spawns = Vec::new();
        run(&mut ai, &mut body, &level, &mut rng, &mut spawns, SHAKE_SECS + STRIKE_SECS * 0.5);
        assert!(ai.can_hurt_paddle_with_body());
        assert!(body.world_aabb(parts.left_arm).min.y < before.min.y - STRIKE_DEPTH * 0.9);
        assert!(ai.paddle_hit(parts.left_square));
        assert!(!ai.paddle_hit(parts.left_square));

        run(&mut ai, &mut body, &level, &mut rng, &mut spawns, STRIKE_SECS * 0.5 + 0.1);
        assert_eq!(ai.state(), ArmsBodyHeadState::BasicMoveAndLaserSpray);
        assert!((body.world_aabb(parts.left_arm).min.y - before.min.y).abs() < 1e-3);
    }

    #[test]
    fn test_body_head_finishes_when_eye_destroyed() {
        let level = arena();
        let (mut body, parts) = build_body(&level);
        let mut ai = BodyHeadAi::new(&mut body, parts);
        assert!(!ai.is_finished());
        let hit = body.diminish(parts.eye, EYE_LIFE, true);
        assert_eq!(hit, WeakpointHit::Destroyed);
        ai.weakpoint_hit(parts.eye, hit);
        assert!(ai.is_finished());
    }
}
