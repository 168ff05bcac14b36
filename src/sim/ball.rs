//! Game ball: position, speed tiers, size tiers and status flags

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::collision::{Circle2D, CollisionResult, circles_overlap};
use super::piece::PieceCoord;
use crate::consts::*;
use crate::{reflect, rotate_deg};

/// Crazy balls swerve every 1 to 3 seconds
const CRAZY_MIN_SECS: f32 = 1.0;
const CRAZY_EXTRA_SECS: f32 = 2.0;
const CRAZY_MIN_SWERVE_DEG: f32 = 45.0;
const CRAZY_EXTRA_SWERVE_DEG: f32 = 115.0;
/// Wait between omni-laser volleys
pub const OMNI_LASER_WAIT_SECS: f32 = 0.6;
const OMNI_LASER_MAX_BULLETS: usize = 3;
/// Base damage a ball does to pieces that take damage instead of a colour step
pub const BALL_COLLISION_DAMAGE: f32 = 20.0;

/// Discrete ball speeds (units/s)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BallSpeed {
    Zero,
    Slow,
    Normal,
    Fast,
}

impl BallSpeed {
    pub fn value(self) -> f32 {
        match self {
            BallSpeed::Zero => 0.0,
            BallSpeed::Slow => 12.0,
            BallSpeed::Normal => 17.0,
            BallSpeed::Fast => 24.0,
        }
    }

    /// Next speed up; saturates at `Fast`
    pub fn increased(self) -> Self {
        match self {
            BallSpeed::Zero => BallSpeed::Zero,
            BallSpeed::Slow => BallSpeed::Normal,
            BallSpeed::Normal | BallSpeed::Fast => BallSpeed::Fast,
        }
    }

    /// Next speed down; saturates at `Slow`
    pub fn decreased(self) -> Self {
        match self {
            BallSpeed::Zero => BallSpeed::Zero,
            BallSpeed::Fast => BallSpeed::Normal,
            BallSpeed::Normal | BallSpeed::Slow => BallSpeed::Slow,
        }
    }
}

/// Discrete ball sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BallSize {
    Smallest,
    Smaller,
    Normal,
    Bigger,
    Biggest,
}

impl BallSize {
    pub fn radius(self) -> f32 {
        let steps = self as i32 - BallSize::Normal as i32;
        DEFAULT_BALL_RADIUS + steps as f32 * BALL_RADIUS_DIFF_PER_SIZE
    }

    fn step(self, up: bool) -> Option<Self> {
        use BallSize::*;
        match (self, up) {
            (Smallest, true) => Some(Smaller),
            (Smaller, true) => Some(Normal),
            (Normal, true) => Some(Bigger),
            (Bigger, true) => Some(Biggest),
            (Smaller, false) => Some(Smallest),
            (Normal, false) => Some(Smaller),
            (Bigger, false) => Some(Normal),
            (Biggest, false) => Some(Bigger),
            _ => None,
        }
    }
}

/// Bitmask of ball power-up types
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BallType(u32);

impl BallType {
    pub const NORMAL: BallType = BallType(0);
    pub const UBER: BallType = BallType(1 << 0);
    /// Drawn invisible by the host; the simulation treats it as normal
    pub const INVISI: BallType = BallType(1 << 1);
    pub const GHOST: BallType = BallType(1 << 2);
    pub const GRAVITY: BallType = BallType(1 << 3);
    pub const CRAZY: BallType = BallType(1 << 4);
    pub const FIRE: BallType = BallType(1 << 5);
    pub const ICE: BallType = BallType(1 << 6);
    pub const SLOW: BallType = BallType(1 << 7);
    pub const FAST: BallType = BallType(1 << 8);
    /// Sprays laser bullets in random directions
    pub const OMNI_LASER: BallType = BallType(1 << 9);

    pub fn contains(self, other: BallType) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: BallType) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: BallType) {
        self.0 &= !other.0;
    }

    pub fn bits(self) -> u32 {
        self.0
    }
}

impl std::ops::BitOr for BallType {
    type Output = BallType;

    fn bitor(self, rhs: BallType) -> BallType {
        BallType(self.0 | rhs.0)
    }
}

/// Where the ball currently is
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BallState {
    /// Resting on the paddle at an x offset from its center
    OnPaddle { offset: f32 },
    /// Moving freely
    InPlay,
    /// Loaded in the cannon at the given grid cell
    InCannon { cannon: PieceCoord },
}

/// A ball entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameBall {
    pub id: u32,
    pub bounds: Circle2D,
    /// Unit direction of travel (zero while resting)
    dir: Vec2,
    speed: BallSpeed,
    /// Extra velocity accumulated by gravity balls
    #[serde(default)]
    gravity_vel: Vec2,
    pub ball_type: BallType,
    size: BallSize,
    pub state: BallState,
    /// Seconds left with collisions off; infinite until re-enabled
    collision_disabled_for: f32,
    /// Set while a piece has taken control of the ball (e.g. a cannon)
    pub block_collisions_disabled: bool,
    last_piece: Option<PieceCoord>,
    /// Seconds left ignoring other balls, e.g. right after a multi-ball split
    #[serde(default)]
    ball_collisions_off_for: f32,
    #[serde(default)]
    crazy_countdown: f32,
    #[serde(default)]
    omni_laser_countdown: f32,
}

impl GameBall {
    pub fn new(id: u32, center: Vec2) -> Self {
        Self {
            id,
            bounds: Circle2D::new(center, DEFAULT_BALL_RADIUS),
            dir: Vec2::ZERO,
            speed: BallSpeed::Normal,
            gravity_vel: Vec2::ZERO,
            ball_type: BallType::NORMAL,
            size: BallSize::Normal,
            state: BallState::OnPaddle { offset: 0.0 },
            collision_disabled_for: 0.0,
            block_collisions_disabled: false,
            last_piece: None,
            ball_collisions_off_for: 0.0,
            crazy_countdown: 0.0,
            omni_laser_countdown: 0.0,
        }
    }

    pub fn center(&self) -> Vec2 {
        self.bounds.center
    }

    pub fn set_center(&mut self, p: Vec2) {
        self.bounds.center = p;
    }

    pub fn radius(&self) -> f32 {
        self.bounds.radius
    }

    pub fn direction(&self) -> Vec2 {
        self.dir
    }

    pub fn speed(&self) -> BallSpeed {
        self.speed
    }

    pub fn set_speed(&mut self, speed: BallSpeed) {
        self.speed = speed;
    }

    pub fn increase_speed(&mut self) {
        self.speed = self.speed.increased();
    }

    pub fn decrease_speed(&mut self) {
        self.speed = self.speed.decreased();
    }

    pub fn velocity(&self) -> Vec2 {
        self.dir * self.speed.value() + self.gravity_vel
    }

    /// Set the travel direction and speed tier
    pub fn set_velocity(&mut self, speed: BallSpeed, dir: Vec2) {
        self.speed = speed;
        self.dir = dir.normalize_or_zero();
        self.gravity_vel = Vec2::ZERO;
    }

    /// Replace the velocity with an arbitrary vector, keeping the speed tier
    pub fn set_direction(&mut self, dir: Vec2) {
        self.dir = dir.normalize_or_zero();
        self.gravity_vel = Vec2::ZERO;
    }

    pub fn size(&self) -> BallSize {
        self.size
    }

    pub fn set_size(&mut self, size: BallSize) {
        self.size = size;
        self.bounds.radius = size.radius();
    }

    /// Grow one size; false when already biggest
    pub fn grow(&mut self) -> bool {
        match self.size.step(true) {
            Some(s) => {
                self.set_size(s);
                true
            }
            None => false,
        }
    }

    /// Shrink one size; false when already smallest
    pub fn shrink(&mut self) -> bool {
        match self.size.step(false) {
            Some(s) => {
                self.set_size(s);
                true
            }
            None => false,
        }
    }

    pub fn can_collide(&self) -> bool {
        self.collision_disabled_for <= 0.0
    }

    pub fn disable_collisions_for(&mut self, secs: f32) {
        self.collision_disabled_for = secs;
    }

    pub fn disable_collisions(&mut self) {
        self.collision_disabled_for = f32::INFINITY;
    }

    pub fn enable_collisions(&mut self) {
        self.collision_disabled_for = 0.0;
    }

    pub fn last_piece(&self) -> Option<PieceCoord> {
        self.last_piece
    }

    pub fn set_last_piece(&mut self, piece: Option<PieceCoord>) {
        self.last_piece = piece;
    }

    pub fn is_last_piece_collided_with(&self, piece: PieceCoord) -> bool {
        self.last_piece == Some(piece)
    }

    pub fn disable_ball_collisions_for(&mut self, secs: f32) {
        self.ball_collisions_off_for = self.ball_collisions_off_for.max(secs);
    }

    /// Ball-ball overlap; false if either has collisions off
    pub fn ball_collides_with(&self, other: &GameBall) -> bool {
        if !self.can_collide() || !other.can_collide() {
            return false;
        }
        if self.ball_collisions_off_for > 0.0 || other.ball_collisions_off_for > 0.0 {
            return false;
        }
        circles_overlap(&self.bounds, &other.bounds)
    }

    /// Damage dealt to a piece that wears down instead of changing colour
    pub fn collision_damage(&self) -> f32 {
        let damage = BALL_COLLISION_DAMAGE * self.radius() / DEFAULT_BALL_RADIUS;
        if self.ball_type.contains(BallType::UBER) {
            damage * 2.0
        } else {
            damage
        }
    }

    /// Swerve a crazy ball when its countdown runs out; true if it swerved
    pub fn tick_crazy<R: Rng>(&mut self, dt: f32, rng: &mut R) -> bool {
        self.crazy_countdown -= dt;
        if self.crazy_countdown > 0.0 {
            return false;
        }
        self.crazy_countdown = CRAZY_MIN_SECS + rng.random::<f32>() * CRAZY_EXTRA_SECS;
        let side = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
        let deg = side * (CRAZY_MIN_SWERVE_DEG + rng.random::<f32>() * CRAZY_EXTRA_SWERVE_DEG);
        self.set_direction(rotate_deg(self.velocity(), deg));
        true
    }

    /// Directions of the laser bullets an omni-laser ball fires this tick
    pub fn tick_omni_laser<R: Rng>(&mut self, dt: f32, rng: &mut R) -> Vec<Vec2> {
        if self.omni_laser_countdown > 0.0 {
            self.omni_laser_countdown -= dt;
            return Vec::new();
        }
        self.omni_laser_countdown = OMNI_LASER_WAIT_SECS;
        let count = rng.random_range(0..=OMNI_LASER_MAX_BULLETS);
        (0..count)
            .map(|_| rotate_deg(Vec2::Y, rng.random_range(0.0..360.0)))
            .collect()
    }

    /// Advance position and timers
    pub fn tick(&mut self, dt: f32, gravity_dir: Vec2) {
        if self.collision_disabled_for.is_finite() && self.collision_disabled_for > 0.0 {
            self.collision_disabled_for = (self.collision_disabled_for - dt).max(0.0);
        }
        self.ball_collisions_off_for = (self.ball_collisions_off_for - dt).max(0.0);
        if self.state != BallState::InPlay {
            return;
        }
        if self.ball_type.contains(BallType::GRAVITY) {
            self.gravity_vel += gravity_dir * BALL_GRAVITY * dt;
        }
        self.bounds.center += self.velocity() * dt;
    }

    /// Move to the point of contact and bounce off the collision line
    ///
    /// The ball is pushed clear of the line, reflected if it was heading into
    /// it, and never leaves flatter than the minimum ball angle.
    pub fn bounce(&mut self, res: &CollisionResult, dt: f32) {
        let vel = self.velocity();
        let n = res.normal;
        let mut c = self.center() + vel * res.time.min(dt);
        let from_line = (c - res.line.p1).dot(n);
        if from_line < self.radius() {
            c += n * (self.radius() - from_line + EPSILON);
        }
        self.bounds.center = c;

        let dir = if vel.dot(n) < 0.0 { reflect(vel, n) } else { vel };
        let mut dir = dir.normalize_or(n);
        let min = MIN_BALL_ANGLE_DEG.to_radians();
        if dir.dot(n) < min.sin() {
            let along = n.perp();
            let side = if dir.dot(along) < 0.0 { -1.0 } else { 1.0 };
            dir = along * side * min.cos() + n * min.sin();
        }
        self.set_direction(dir);
    }

    /// Hand the ball to a cannon: center it and stop all collisions
    pub fn load_into_cannon(&mut self, cannon: PieceCoord, cannon_center: Vec2) {
        self.state = BallState::InCannon { cannon };
        self.bounds.center = cannon_center;
        self.block_collisions_disabled = true;
        self.disable_collisions();
        self.last_piece = Some(cannon);
    }

    /// Release the ball from a cannon barrel end along `dir`
    pub fn fire_from_cannon(&mut self, dir: Vec2, barrel_end: Vec2) {
        self.state = BallState::InPlay;
        self.bounds.center = barrel_end;
        self.set_direction(dir);
        self.block_collisions_disabled = false;
        self.enable_collisions();
    }
}
