//! Bosses: a body of parts driven by a per-boss AI state machine
//!
//! Each AI stage is one [`BossAi`] variant. A stage runs its own sub-states
//! and, when it is done, hands back the stage that replaces it.

pub mod body;
pub mod classical;
pub mod gothic;

use glam::Vec2;
use log::info;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::ball::GameBall;
use super::collision::{Aabb2D, CollisionResult, Ray2D};
use super::item::ItemDrop;
use super::level::GameLevel;
use super::projectile::{ProjectileKind, ProjectileSpawn};
use super::state::GameEvent;
pub use body::{BodyPart, BossBody, PartKind, Weakpoint, WeakpointHit};
pub use classical::{ArmsBodyHeadAi, BodyHeadAi, ClassicalParts};
pub use gothic::{FireBallAi, GothicParts};

/// Seconds between a boss's defeat and its removal
pub const BOSS_DYING_SECS: f32 = 3.0;

/// What a boss can see and affect while it thinks
pub struct BossContext<'a> {
    pub level: &'a GameLevel,
    pub paddle_center: Vec2,
    pub rng: &'a mut Pcg32,
    /// Multiplies every boss's top speed
    pub speed_scale: f32,
    pub spawns: &'a mut Vec<ProjectileSpawn>,
    /// Items the boss throws into the level
    pub drops: &'a mut Vec<ItemDrop>,
    pub events: &'a mut Vec<GameEvent>,
}

impl BossContext<'_> {
    pub fn shoot(&mut self, kind: ProjectileKind, position: Vec2, dir: Vec2) {
        self.spawns.push(ProjectileSpawn { kind, position, dir });
    }
}

/// Accelerates a boss toward a desired velocity and keeps it in the level
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Mover {
    pub vel: Vec2,
    pub desired: Vec2,
    pub accel: f32,
}

impl Mover {
    pub fn new(accel: f32) -> Self {
        Self {
            vel: Vec2::ZERO,
            desired: Vec2::ZERO,
            accel,
        }
    }

    pub fn stop(&mut self) {
        self.vel = Vec2::ZERO;
        self.desired = Vec2::ZERO;
    }

    /// Move `root` one step; returns the wall correction that was applied
    pub fn apply(&mut self, body: &mut BossBody, root: usize, dt: f32, level: &GameLevel) -> Vec2 {
        let diff = self.desired - self.vel;
        self.vel += diff.clamp_length_max(self.accel * dt);
        body.translate(root, self.vel * dt);

        let fix = level.collide_boss_aabb(&body.world_aabb(root));
        if fix != Vec2::ZERO {
            body.translate(root, fix);
            if fix.x != 0.0 {
                self.vel.x = 0.0;
            }
            if fix.y != 0.0 {
                self.vel.y = 0.0;
            }
        }
        body.set_collision_velocity(root, self.vel);
        fix
    }
}

/// Emit the hurt event for a weakpoint hit that landed
fn report_hit(part: usize, hit: WeakpointHit, events: &mut Vec<GameEvent>) {
    if hit != WeakpointHit::Ignored {
        events.push(GameEvent::BossHurt { part });
    }
}

/// One stage of a boss fight
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BossAi {
    ClassicalArmsBodyHead(ArmsBodyHeadAi),
    ClassicalBodyHead(BodyHeadAi),
    GothicFireBall(FireBallAi),
    Finished,
}

impl BossAi {
    /// Run one step; `Some` carries the stage that takes over
    pub fn tick(&mut self, body: &mut BossBody, dt: f32, ctx: &mut BossContext) -> Option<BossAi> {
        match self {
            BossAi::ClassicalArmsBodyHead(ai) => ai.tick(body, dt, ctx),
            BossAi::ClassicalBodyHead(ai) => ai.tick(body, dt, ctx),
            BossAi::GothicFireBall(ai) => ai.tick(body, dt, ctx),
            BossAi::Finished => None,
        }
    }

    pub fn ball_hit(&mut self, body: &mut BossBody, part: usize, events: &mut Vec<GameEvent>) {
        let dmg = body.dmg_on_ball_hit(part);
        let hit = body.diminish(part, dmg, false);
        report_hit(part, hit, events);
        self.weakpoint_hit(body, part, hit);
    }

    pub fn projectile_hit(
        &mut self,
        body: &mut BossBody,
        part: usize,
        kind: ProjectileKind,
        events: &mut Vec<GameEvent>,
    ) {
        let dmg = match self {
            BossAi::GothicFireBall(_) => FireBallAi::projectile_damage(kind),
            _ if kind.hurts_boss() => kind.damage(),
            _ => 0.0,
        };
        let hit = body.diminish(part, dmg, false);
        report_hit(part, hit, events);
        self.weakpoint_hit(body, part, hit);
    }

    pub fn beam_hit(&mut self, body: &mut BossBody, part: usize, amount: f32, events: &mut Vec<GameEvent>) {
        let hit = body.diminish(part, amount, true);
        report_hit(part, hit, events);
        self.weakpoint_hit(body, part, hit);
    }

    fn weakpoint_hit(&mut self, body: &mut BossBody, part: usize, hit: WeakpointHit) {
        if hit == WeakpointHit::Ignored {
            return;
        }
        match self {
            BossAi::ClassicalArmsBodyHead(ai) => ai.weakpoint_hit(body, part, hit),
            BossAi::ClassicalBodyHead(ai) => ai.weakpoint_hit(part, hit),
            BossAi::GothicFireBall(ai) => ai.weakpoint_hit(body, part, hit),
            BossAi::Finished => {}
        }
    }

    /// The paddle touched `part`; true if the paddle should be hurt
    pub fn paddle_hit(&mut self, part: usize) -> bool {
        match self {
            BossAi::ClassicalArmsBodyHead(ai) => ai.paddle_hit(part),
            _ => false,
        }
    }

    pub fn can_hurt_paddle_with_body(&self) -> bool {
        match self {
            BossAi::ClassicalArmsBodyHead(ai) => ai.can_hurt_paddle_with_body(),
            _ => false,
        }
    }

    pub fn is_finished(&self) -> bool {
        match self {
            BossAi::ClassicalArmsBodyHead(_) => false,
            BossAi::ClassicalBodyHead(ai) => ai.is_finished(),
            BossAi::GothicFireBall(ai) => ai.is_finished(),
            BossAi::Finished => true,
        }
    }

    /// Stage and sub-state, for logs and events
    pub fn state_name(&self) -> String {
        match self {
            BossAi::ClassicalArmsBodyHead(ai) => format!("ArmsBodyHead::{:?}", ai.state()),
            BossAi::ClassicalBodyHead(ai) => format!("BodyHead::{:?}", ai.state()),
            BossAi::GothicFireBall(ai) => format!("FireBall::{:?}", ai.state()),
            BossAi::Finished => "Finished".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BossKind {
    Classical,
    GothicRomantic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Boss {
    pub kind: BossKind,
    pub body: BossBody,
    pub alive_root: usize,
    pub dead_root: usize,
    ai: BossAi,
    dying_timer: Option<f32>,
    dead: bool,
}

impl Boss {
    pub fn classical(level: &GameLevel) -> Self {
        let (mut body, parts) = classical::build_body(level);
        let ai = ArmsBodyHeadAi::new(&mut body, parts);
        Self {
            kind: BossKind::Classical,
            body,
            alive_root: parts.alive,
            dead_root: parts.dead,
            ai: BossAi::ClassicalArmsBodyHead(ai),
            dying_timer: None,
            dead: false,
        }
    }

    pub fn gothic_romantic(level: &GameLevel) -> Self {
        let (mut body, parts) = gothic::build_body(level);
        let ai = FireBallAi::new(&mut body, parts, level);
        Self {
            kind: BossKind::GothicRomantic,
            body,
            alive_root: parts.alive,
            dead_root: parts.dead,
            ai: BossAi::GothicFireBall(ai),
            dying_timer: None,
            dead: false,
        }
    }

    pub fn ai(&self) -> &BossAi {
        &self.ai
    }

    pub fn center(&self) -> Vec2 {
        self.body.part(self.alive_root).map_or(Vec2::ZERO, BodyPart::translation)
    }

    pub fn is_dying(&self) -> bool {
        self.dying_timer.is_some() && !self.dead
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn tick(&mut self, dt: f32, ctx: &mut BossContext) {
        if self.dead {
            return;
        }
        self.body.tick(dt);

        if let Some(timer) = self.dying_timer.as_mut() {
            *timer -= dt;
            if *timer <= 0.0 {
                self.dead = true;
                info!("{:?} boss defeated", self.kind);
                ctx.events.push(GameEvent::BossDefeated);
            }
            return;
        }

        let before = self.ai.state_name();
        if let Some(next) = self.ai.tick(&mut self.body, dt, ctx) {
            self.ai = next;
        }
        let after = self.ai.state_name();
        if before != after {
            info!("{:?} boss AI: {} -> {}", self.kind, before, after);
            ctx.events.push(GameEvent::BossAiStateChanged { state: after });
        }

        if self.ai.is_finished() {
            self.dying_timer = Some(BOSS_DYING_SECS);
            self.body.set_collisions_disabled(self.alive_root, true);
        }
    }

    /// Earliest ball contact with a live part
    pub fn collide_ball(&self, ball: &GameBall, dt: f32) -> Option<(usize, CollisionResult)> {
        if self.dying_timer.is_some() {
            return None;
        }
        self.body.collide_ball(self.alive_root, ball, dt)
    }

    pub fn ray_hit(&self, ray: &Ray2D) -> Option<(usize, f32)> {
        if self.dying_timer.is_some() {
            return None;
        }
        self.body.ray_hit(self.alive_root, ray)
    }

    /// Live part touching `aabb`, if any
    pub fn hits_aabb(&self, aabb: &Aabb2D) -> Option<usize> {
        if self.dying_timer.is_some() {
            return None;
        }
        self.body.hits_aabb(self.alive_root, aabb)
    }

    pub fn ball_hit(&mut self, part: usize, events: &mut Vec<GameEvent>) {
        self.ai.ball_hit(&mut self.body, part, events);
    }

    pub fn projectile_hit(&mut self, part: usize, kind: ProjectileKind, events: &mut Vec<GameEvent>) {
        self.ai.projectile_hit(&mut self.body, part, kind, events);
    }

    pub fn beam_damage(&mut self, part: usize, amount: f32, events: &mut Vec<GameEvent>) {
        self.ai.beam_hit(&mut self.body, part, amount, events);
    }

    /// The paddle touched a body part; true if the paddle gets hurt
    pub fn paddle_hit(&mut self, part: usize) -> bool {
        self.can_hurt_paddle_with_body() && self.ai.paddle_hit(part)
    }

    pub fn can_hurt_paddle_with_body(&self) -> bool {
        self.dying_timer.is_none() && self.ai.can_hurt_paddle_with_body()
    }
}
