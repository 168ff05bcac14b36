//! The Gothic Romantic boss: a spinning fire ball that hops around a grid
//!
//! Only the point on top can be hurt, and only by fire globs raining down
//! from burning blocks overhead.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::body::{BossBody, WeakpointHit, triangle};
use super::{BossAi, BossContext, Mover};
use crate::consts::{HALF_PIECE_HEIGHT, HALF_PIECE_WIDTH, PIECE_WIDTH};
use crate::rotate_deg;
use crate::sim::bounds::BoundingLines;
use crate::sim::item::ItemDrop;
use crate::sim::level::GameLevel;
use crate::sim::projectile::ProjectileKind;
use crate::sim::state::GameEvent;

const BODY_WIDTH: f32 = 3.45;
const BODY_HEIGHT: f32 = 7.0;

const TOP_POINT_LIFE: f32 = 300.0;
const TOP_POINT_HITS_TO_DESTROY: f32 = 5.0;

const MOVE_X_BORDER: f32 = HALF_PIECE_WIDTH;
const MOVE_Y_BORDER: f32 = HALF_PIECE_HEIGHT;
/// Fraction of the level height kept clear below the move grid
const CONFINE_BOTTOM_FRACTION: f32 = 0.35;
const ACCELERATION: f32 = 20.0;

const SPIN_DEG_PER_SEC: f32 = 360.0;
const HURT_SECS: f32 = 2.5;
const SUMMON_SECS: f32 = 1.5;
const NUM_ORBS: u32 = 3;
const ORB_GAP_SECS: f32 = 0.5;

const BODY_SHOT_SPREAD_DEG: f32 = 22.5;
const LEG_SHOT_SPREAD_DEG: f32 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovePosition {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

impl MovePosition {
    pub const ALL: [MovePosition; 5] = [
        MovePosition::TopLeft,
        MovePosition::TopRight,
        MovePosition::BottomLeft,
        MovePosition::BottomRight,
        MovePosition::Center,
    ];
    pub const CORNERS: [MovePosition; 4] = [
        MovePosition::TopLeft,
        MovePosition::TopRight,
        MovePosition::BottomLeft,
        MovePosition::BottomRight,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// Chance of an orb attack over a spin, by remaining life
pub fn orb_probability(life_fraction: f32) -> f32 {
    0.33 + 0.33 * life_fraction.clamp(0.0, 1.0)
}

/// Chance of summoning from the center, by attacks since the last summon
pub fn summon_probability(attacks_since_summon: u32) -> f32 {
    match attacks_since_summon {
        0 | 1 => 0.0,
        2 => 0.7,
        _ => 1.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GothicParts {
    pub alive: usize,
    pub dead: usize,
    pub body: usize,
    pub top_point: usize,
    pub bottom_point: usize,
    pub legs: [usize; 4],
}

pub fn build_body(level: &GameLevel) -> (BossBody, GothicParts) {
    let mut body = BossBody::new();
    let alive = body.add_composite(BossBody::ROOT);
    let dead = body.add_composite(BossBody::ROOT);

    let half_h = BODY_HEIGHT * 0.5;
    let core = body.add_basic(alive, BoundingLines::rectangle(Vec2::ZERO, BODY_WIDTH * 0.5, half_h));
    let top_point = body.add_basic(
        alive,
        triangle(2.644, -0.284, 0.458, true).translated(Vec2::new(0.0, half_h + 0.284)),
    );
    let bottom_point = body.add_basic(
        alive,
        triangle(3.75, -0.569, 0.447, false).translated(Vec2::new(0.0, -half_h - 0.447)),
    );
    let leg_at = [
        Vec2::new(-2.1, 0.75),
        Vec2::new(2.1, 0.75),
        Vec2::new(-2.1, -1.75),
        Vec2::new(2.1, -1.75),
    ];
    let legs = leg_at.map(|at| {
        let leg = body.add_basic(alive, BoundingLines::rectangle(Vec2::ZERO, 0.375, 0.8));
        body.translate(leg, at);
        leg
    });

    let parts = GothicParts {
        alive,
        dead,
        body: core,
        top_point,
        bottom_point,
        legs,
    };
    let center = move_positions(&body, &parts, level)[MovePosition::Center.index()];
    body.translate(alive, center);
    body.translate(dead, center);
    (body, parts)
}

/// Root positions of the move grid, keeping the unrotated body inside the confines
fn move_positions(body: &BossBody, parts: &GothicParts, level: &GameLevel) -> [Vec2; 5] {
    let root = body.part(parts.alive).map_or(Vec2::ZERO, |p| p.translation());
    let aabb = body.world_aabb(parts.alive);
    let (lo, hi) = (aabb.min - root, aabb.max - root);
    let min_y = level.unit_height() * CONFINE_BOTTOM_FRACTION;
    let left = MOVE_X_BORDER - lo.x;
    let right = level.unit_width() - MOVE_X_BORDER - hi.x;
    let top = level.unit_height() - MOVE_Y_BORDER - hi.y;
    let bottom = min_y + MOVE_Y_BORDER - lo.y;
    [
        Vec2::new(left, top),
        Vec2::new(right, top),
        Vec2::new(left, bottom),
        Vec2::new(right, bottom),
        Vec2::new((left + right) * 0.5, (top + bottom) * 0.5),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FireBallState {
    BasicMoveAndShoot,
    SpinLaserAttack,
    SummonItems,
    OrbProjectileAttack,
    HurtTop,
    Finished,
}

/// The one stage of the Gothic Romantic fight
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FireBallAi {
    parts: GothicParts,
    state: FireBallState,
    positions: [Vec2; 5],
    curr_pos: MovePosition,
    target_pos: Option<MovePosition>,
    mover: Mover,
    state_timer: f32,
    shoot_countdown: f32,
    /// Degrees spun so far in the current spin attack
    spun_deg: f32,
    orbs_left: u32,
    attacks_since_summon: u32,
    top_hit: Option<WeakpointHit>,
}

impl FireBallAi {
    pub fn new(body: &mut BossBody, parts: GothicParts, level: &GameLevel) -> Self {
        body.convert_to_weakpoint(parts.top_point, TOP_POINT_LIFE, 0.0);
        Self {
            parts,
            state: FireBallState::BasicMoveAndShoot,
            positions: move_positions(body, &parts, level),
            curr_pos: MovePosition::Center,
            target_pos: None,
            mover: Mover::new(ACCELERATION),
            state_timer: 0.0,
            // The first move is made without firing
            shoot_countdown: f32::INFINITY,
            spun_deg: 0.0,
            orbs_left: 0,
            attacks_since_summon: 0,
            top_hit: None,
        }
    }

    pub fn state(&self) -> FireBallState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == FireBallState::Finished
    }

    /// Fire globs chip the top point off in a fixed number of hits
    pub fn projectile_damage(kind: ProjectileKind) -> f32 {
        match kind {
            ProjectileKind::FireGlob => TOP_POINT_LIFE / TOP_POINT_HITS_TO_DESTROY,
            _ => 0.0,
        }
    }

    fn root(&self, body: &BossBody) -> Vec2 {
        body.part(self.parts.alive).map_or(Vec2::ZERO, |p| p.translation())
    }

    fn part_pos(body: &BossBody, idx: usize) -> Vec2 {
        body.part(idx).map_or(Vec2::ZERO, |p| p.translation())
    }

    fn enter(&mut self, state: FireBallState, secs: f32) {
        self.state = state;
        self.state_timer = secs;
    }

    fn unspin(&mut self, body: &mut BossBody) {
        if self.spun_deg != 0.0 {
            body.rotate_z(self.parts.alive, -self.spun_deg);
            self.spun_deg = 0.0;
        }
    }

    /// Pick the next grid position and start moving toward it
    fn setup_next_move(&mut self, ctx: &mut BossContext) {
        let next = if self.curr_pos == MovePosition::Center {
            MovePosition::CORNERS[ctx.rng.random_range(0..4)]
        } else {
            MovePosition::ALL[(self.curr_pos.index() + 1 + ctx.rng.random_range(0..4)) % 5]
        };
        self.target_pos = Some(next);
        self.enter(FireBallState::BasicMoveAndShoot, 0.0);
        self.shoot_countdown = 0.2 + ctx.rng.random::<f32>() * 0.25;
    }

    fn start_attack(&mut self, body: &BossBody, ctx: &mut BossContext) {
        let p = orb_probability(body.life_fraction(self.parts.top_point));
        let roll = ctx.rng.random::<f32>();
        let attack = match self.curr_pos {
            MovePosition::Center => {
                if roll < summon_probability(self.attacks_since_summon) {
                    FireBallState::SummonItems
                } else if ctx.rng.random::<f32>() <= p {
                    FireBallState::OrbProjectileAttack
                } else {
                    FireBallState::SpinLaserAttack
                }
            }
            MovePosition::TopLeft | MovePosition::TopRight if roll <= 1.25 * p => FireBallState::OrbProjectileAttack,
            MovePosition::BottomLeft | MovePosition::BottomRight if roll <= p => FireBallState::OrbProjectileAttack,
            _ => FireBallState::SpinLaserAttack,
        };

        match attack {
            FireBallState::SummonItems => {
                self.attacks_since_summon = 0;
                let count = 1 + ctx.rng.random_range(0..2);
                let from = Self::part_pos(body, self.parts.body);
                for _ in 0..count {
                    ctx.drops.push(ItemDrop::any(from));
                }
                ctx.events.push(GameEvent::ItemsSummoned { count });
                self.enter(attack, SUMMON_SECS);
            }
            FireBallState::OrbProjectileAttack => {
                self.attacks_since_summon += 1;
                self.orbs_left = NUM_ORBS;
                self.shoot_countdown = 0.0;
                self.enter(attack, ORB_GAP_SECS * NUM_ORBS as f32);
            }
            _ => {
                self.attacks_since_summon += 1;
                self.spun_deg = 0.0;
                self.shoot_countdown = 0.075 + ctx.rng.random::<f32>() * 0.2;
                let secs = 5.0 + ctx.rng.random::<f32>() * 4.0;
                self.enter(FireBallState::SpinLaserAttack, secs);
            }
        }
    }

    /// One laser at the paddle, from the bottom point or a leg
    fn shoot_at_paddle(&self, body: &BossBody, ctx: &mut BossContext) {
        let (from, spread) = if ctx.rng.random_bool(0.5) {
            (Self::part_pos(body, self.parts.bottom_point), BODY_SHOT_SPREAD_DEG)
        } else {
            let leg = self.parts.legs[ctx.rng.random_range(0..self.parts.legs.len())];
            (Self::part_pos(body, leg), LEG_SHOT_SPREAD_DEG)
        };
        let aim = (ctx.paddle_center - from).normalize_or(Vec2::NEG_Y);
        let deg = ctx.rng.random_range(-1.0..1.0) * spread;
        ctx.shoot(ProjectileKind::BossLaserBullet, from, rotate_deg(aim, deg));
    }

    pub fn tick(&mut self, body: &mut BossBody, dt: f32, ctx: &mut BossContext) -> Option<BossAi> {
        if let Some(hit) = self.top_hit.take() {
            self.unspin(body);
            self.mover.stop();
            body.set_collision_velocity(self.parts.alive, Vec2::ZERO);
            let secs = if hit == WeakpointHit::Destroyed { HURT_SECS } else { HURT_SECS * 0.5 };
            self.enter(FireBallState::HurtTop, secs);
        }

        self.state_timer -= dt;
        match self.state {
            FireBallState::BasicMoveAndShoot => {
                let target = match self.target_pos {
                    Some(t) => t,
                    None => {
                        let corner = MovePosition::CORNERS[ctx.rng.random_range(0..4)];
                        self.target_pos = Some(corner);
                        corner
                    }
                };
                let to = self.positions[target.index()] - self.root(body);
                let dist = to.length();
                if dist < HALF_PIECE_WIDTH {
                    self.mover.stop();
                    body.set_collision_velocity(self.parts.alive, Vec2::ZERO);
                    self.curr_pos = target;
                    self.target_pos = None;
                    self.start_attack(body, ctx);
                } else {
                    let speed = (dist * 0.5).max(PIECE_WIDTH) * ctx.speed_scale;
                    self.mover.desired = to / dist * speed;
                    self.mover.apply(body, self.parts.alive, dt, ctx.level);

                    self.shoot_countdown -= dt;
                    if self.shoot_countdown <= 0.0 {
                        self.shoot_at_paddle(body, ctx);
                        self.shoot_countdown = 0.2 + ctx.rng.random::<f32>() * 0.25;
                    }
                }
            }
            FireBallState::SpinLaserAttack => {
                let deg = SPIN_DEG_PER_SEC * dt;
                body.rotate_z(self.parts.alive, deg);
                self.spun_deg += deg;

                self.shoot_countdown -= dt;
                if self.shoot_countdown <= 0.0 {
                    let center = self.root(body);
                    for leg in self.parts.legs {
                        let from = Self::part_pos(body, leg);
                        ctx.shoot(ProjectileKind::BossLaserBullet, from, from - center);
                    }
                    self.shoot_countdown = 0.075 + ctx.rng.random::<f32>() * 0.2;
                }
                if self.state_timer <= 0.0 {
                    self.unspin(body);
                    self.setup_next_move(ctx);
                }
            }
            FireBallState::SummonItems => {
                if self.state_timer <= 0.0 {
                    self.setup_next_move(ctx);
                }
            }
            FireBallState::OrbProjectileAttack => {
                self.shoot_countdown -= dt;
                if self.orbs_left > 0 && self.shoot_countdown <= 0.0 {
                    let from = Self::part_pos(body, self.parts.bottom_point);
                    let aim = (ctx.paddle_center - from).normalize_or(Vec2::NEG_Y);
                    ctx.shoot(ProjectileKind::BossOrb, from, aim);
                    self.orbs_left -= 1;
                    self.shoot_countdown = ORB_GAP_SECS;
                }
                if self.orbs_left == 0 && self.state_timer <= 0.0 {
                    self.setup_next_move(ctx);
                }
            }
            FireBallState::HurtTop => {
                if self.state_timer <= 0.0 {
                    if body.is_destroyed(self.parts.top_point) {
                        self.state = FireBallState::Finished;
                    } else {
                        self.setup_next_move(ctx);
                    }
                }
            }
            FireBallState::Finished => {}
        }
        None
    }

    pub fn weakpoint_hit(&mut self, body: &mut BossBody, part: usize, hit: WeakpointHit) {
        if part != self.parts.top_point {
            return;
        }
        if hit == WeakpointHit::Destroyed {
            body.reparent(part, self.parts.dead);
        }
        self.top_hit = Some(hit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::item::DropChance;
    use crate::sim::projectile::ProjectileSpawn;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    const DT: f32 = 1.0 / 60.0;

    fn arena() -> GameLevel {
        GameLevel::from_layout(&["............"; 24]).expect("valid layout")
    }

    struct Fight {
        level: GameLevel,
        body: BossBody,
        parts: GothicParts,
        ai: FireBallAi,
        rng: Pcg32,
        spawns: Vec<ProjectileSpawn>,
        drops: Vec<ItemDrop>,
        events: Vec<GameEvent>,
    }

    impl Fight {
        fn new(seed: u64) -> Self {
            let level = arena();
            let (mut body, parts) = build_body(&level);
            let ai = FireBallAi::new(&mut body, parts, &level);
            Self {
                level,
                body,
                parts,
                ai,
                rng: Pcg32::seed_from_u64(seed),
                spawns: Vec::new(),
                drops: Vec::new(),
                events: Vec::new(),
            }
        }

        fn step(&mut self) {
            let mut ctx = BossContext {
                level: &self.level,
                paddle_center: Vec2::new(15.0, -0.5),
                rng: &mut self.rng,
                speed_scale: 1.0,
                spawns: &mut self.spawns,
                drops: &mut self.drops,
                events: &mut self.events,
            };
            self.ai.tick(&mut self.body, DT, &mut ctx);
        }

        fn run_until(&mut self, secs: f32, done: impl Fn(&FireBallAi) -> bool) -> bool {
            let steps = (secs / DT) as usize;
            for _ in 0..steps {
                self.step();
                if done(&self.ai) {
                    return true;
                }
            }
            false
        }
    }

    #[test]
    fn test_probabilities() {
        assert!((orb_probability(1.0) - 0.66).abs() < 1e-6);
        assert!((orb_probability(0.0) - 0.33).abs() < 1e-6);
        assert_eq!(summon_probability(0), 0.0);
        assert_eq!(summon_probability(1), 0.0);
        assert_eq!(summon_probability(2), 0.7);
        assert_eq!(summon_probability(5), 1.0);
    }

    #[test]
    fn test_grid_stays_inside_level() {
        let f = Fight::new(1);
        let center = f.ai.positions[MovePosition::Center.index()];
        assert!((f.ai.root(&f.body) - center).length() < 1e-4);
        for pos in f.ai.positions {
            assert!(pos.x > 0.0 && pos.x < f.level.unit_width());
            assert!(pos.y > 0.0 && pos.y < f.level.unit_height());
        }
        let tl = f.ai.positions[MovePosition::TopLeft.index()];
        let br = f.ai.positions[MovePosition::BottomRight.index()];
        assert!(tl.x < br.x && tl.y > br.y);
    }

    #[test]
    fn test_first_move_reaches_corner_without_firing() {
        let mut f = Fight::new(7);
        let arrived = f.run_until(15.0, |ai| ai.state() != FireBallState::BasicMoveAndShoot);
        assert!(arrived);
        assert!(MovePosition::CORNERS.contains(&f.ai.curr_pos));
        assert!(f.spawns.is_empty());
    }

    #[test]
    fn test_spin_unwinds_and_fires_from_legs() {
        let mut f = Fight::new(3);
        f.ai.enter(FireBallState::SpinLaserAttack, 1.3);
        f.ai.shoot_countdown = 0.1;
        let done = f.run_until(2.0, |ai| ai.state() == FireBallState::BasicMoveAndShoot);
        assert!(done);
        assert!(f.spawns.len() >= f.parts.legs.len());
        let rot = f.body.part(f.parts.body).map_or(1.0, |p| p.rotation_deg());
        assert!(rot.abs() < 1e-3);
    }

    #[test]
    fn test_summon_throws_items_from_body() {
        let mut f = Fight::new(8);
        f.ai.curr_pos = MovePosition::Center;
        f.ai.attacks_since_summon = 3;
        let mut ctx = BossContext {
            level: &f.level,
            paddle_center: Vec2::new(15.0, -0.5),
            rng: &mut f.rng,
            speed_scale: 1.0,
            spawns: &mut f.spawns,
            drops: &mut f.drops,
            events: &mut f.events,
        };
        f.ai.start_attack(&f.body, &mut ctx);
        assert_eq!(f.ai.state(), FireBallState::SummonItems);
        let count = f
            .events
            .iter()
            .find_map(|e| match e {
                GameEvent::ItemsSummoned { count } => Some(*count as usize),
                _ => None,
            })
            .expect("summon event");
        assert!((1..=2).contains(&count));
        assert_eq!(f.drops.len(), count);
        let body_pos = FireBallAi::part_pos(&f.body, f.parts.body);
        assert!(f.drops.iter().all(|d| d.position == body_pos && d.chance == DropChance::AnyItem));
    }

    #[test]
    fn test_orb_attack_fires_three_orbs() {
        let mut f = Fight::new(5);
        f.ai.orbs_left = NUM_ORBS;
        f.ai.shoot_countdown = 0.0;
        f.ai.enter(FireBallState::OrbProjectileAttack, ORB_GAP_SECS * NUM_ORBS as f32);
        f.run_until(2.0, |ai| ai.state() == FireBallState::BasicMoveAndShoot);
        let orbs = f.spawns.iter().filter(|s| s.kind == ProjectileKind::BossOrb).count();
        assert_eq!(orbs, NUM_ORBS as usize);
    }

    #[test]
    fn test_five_fire_globs_finish_the_fight() {
        let mut f = Fight::new(9);
        let dmg = FireBallAi::projectile_damage(ProjectileKind::FireGlob);
        assert_eq!(FireBallAi::projectile_damage(ProjectileKind::PaddleRocket), 0.0);

        for i in 0..5 {
            let hit = f.body.diminish(f.parts.top_point, dmg, false);
            let expected = if i == 4 { WeakpointHit::Destroyed } else { WeakpointHit::Hurt };
            assert_eq!(hit, expected);
            f.ai.weakpoint_hit(&mut f.body, f.parts.top_point, hit);
            f.step();
            assert_eq!(f.ai.state(), FireBallState::HurtTop);
            f.body.tick(2.0);
        }
        assert!(f.run_until(HURT_SECS + 0.1, FireBallAi::is_finished));
    }
}
