//! Player paddle
//!
//! The paddle slides along a fixed y between the level walls. Its outline is
//! a flat top with bevelled corners so balls clipping an edge get deflected
//! outward instead of straight up.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::ball::{BallState, GameBall};
use super::bounds::BoundingLines;
use super::collision::{Aabb2D, CollisionResult, LineSeg2D, Ray2D, ray_aabb};
use crate::consts::*;
use crate::{angle_between_deg, rotate_deg, sign_of};

/// Paddle sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PaddleSize {
    Smallest,
    Smaller,
    Normal,
    Bigger,
    Biggest,
}

impl PaddleSize {
    pub fn half_width(self) -> f32 {
        let steps = self as i32 - PaddleSize::Normal as i32;
        PADDLE_DEFAULT_HALF_WIDTH + steps as f32 * PADDLE_HALF_WIDTH_DIFF_PER_SIZE
    }
}

/// Bitmask of active paddle power-ups
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaddleType(u32);

impl PaddleType {
    pub const NORMAL: PaddleType = PaddleType(0);
    pub const LASER_BULLET: PaddleType = PaddleType(1 << 0);
    pub const LASER_BEAM: PaddleType = PaddleType(1 << 1);
    pub const ROCKET: PaddleType = PaddleType(1 << 2);
    pub const SHIELD: PaddleType = PaddleType(1 << 3);
    pub const STICKY: PaddleType = PaddleType(1 << 4);
    pub const MAGNET: PaddleType = PaddleType(1 << 5);
    pub const MINE: PaddleType = PaddleType(1 << 6);

    pub fn contains(self, other: PaddleType) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: PaddleType) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: PaddleType) {
        self.0 &= !other.0;
    }
}

/// Seconds between paddle laser bullets
pub const LASER_BULLET_COOLDOWN: f32 = 0.25;
/// How far the bevelled corners cut into the top and sides
const BEVEL: f32 = 0.25;
/// Fastest a magnet paddle turns a falling ball, degrees per second
pub const MAGNET_TURN_DEG_PER_SEC: f32 = 80.0;

/// The player's paddle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerPaddle {
    pub center: Vec2,
    /// Last frame's x velocity
    pub avg_vel_x: f32,
    /// Left and right walls the paddle's edges may not cross
    pub min_x: f32,
    pub max_x: f32,
    size: PaddleSize,
    pub paddle_type: PaddleType,
    local_bounds: BoundingLines,
    /// Seconds until the next laser bullet may fire
    pub weapon_cooldown: f32,
    /// Beam segments that stopped on the paddle this tick
    #[serde(default)]
    pub beams_blocked: u32,
}

impl PlayerPaddle {
    pub fn new(min_x: f32, max_x: f32) -> Self {
        let mut paddle = Self {
            center: Vec2::new((min_x + max_x) * 0.5, PADDLE_Y),
            avg_vel_x: 0.0,
            min_x,
            max_x,
            size: PaddleSize::Normal,
            paddle_type: PaddleType::NORMAL,
            local_bounds: BoundingLines::default(),
            weapon_cooldown: 0.0,
            beams_blocked: 0,
        };
        paddle.rebuild_bounds();
        paddle
    }

    pub fn half_width(&self) -> f32 {
        self.size.half_width()
    }

    pub fn half_height(&self) -> f32 {
        PADDLE_HALF_HEIGHT
    }

    pub fn size(&self) -> PaddleSize {
        self.size
    }

    /// Top-centre point, where shots leave the paddle
    pub fn top_center(&self) -> Vec2 {
        self.center + Vec2::new(0.0, PADDLE_HALF_HEIGHT)
    }

    fn rebuild_bounds(&mut self) {
        let hw = self.half_width();
        let hh = PADDLE_HALF_HEIGHT;
        let mut b = BoundingLines::default();

        let top_l = Vec2::new(-hw + BEVEL, hh);
        let top_r = Vec2::new(hw - BEVEL, hh);
        let side_lt = Vec2::new(-hw, hh - BEVEL);
        let side_rt = Vec2::new(hw, hh - BEVEL);
        let bot_l = Vec2::new(-hw, -hh);
        let bot_r = Vec2::new(hw, -hh);

        b.push(LineSeg2D::new(top_r, top_l), Vec2::Y);
        b.push(LineSeg2D::new(top_l, side_lt), Vec2::new(-1.0, 1.0).normalize());
        b.push(LineSeg2D::new(side_rt, top_r), Vec2::new(1.0, 1.0).normalize());
        b.push(LineSeg2D::new(side_lt, bot_l), Vec2::NEG_X);
        b.push(LineSeg2D::new(bot_r, side_rt), Vec2::X);
        b.push(LineSeg2D::new(bot_l, bot_r), Vec2::NEG_Y);
        self.local_bounds = b;
        self.clamp_to_walls();
    }

    fn clamp_to_walls(&mut self) {
        let hw = self.half_width();
        let lo = self.min_x + hw;
        let hi = self.max_x - hw;
        self.center.x = if lo <= hi {
            self.center.x.clamp(lo, hi)
        } else {
            (self.min_x + self.max_x) * 0.5
        };
    }

    pub fn world_bounds(&self) -> BoundingLines {
        self.local_bounds.translated(self.center)
    }

    pub fn aabb(&self) -> Aabb2D {
        Aabb2D::from_center(self.center, Vec2::new(self.half_width(), PADDLE_HALF_HEIGHT))
    }

    /// Slide toward `target_x` at no more than `max_speed`
    pub fn move_toward(&mut self, target_x: f32, dt: f32, max_speed: f32) {
        if dt <= 0.0 {
            return;
        }
        let before = self.center.x;
        let delta = (target_x - before).clamp(-max_speed * dt, max_speed * dt);
        self.center.x += delta;
        self.clamp_to_walls();
        self.avg_vel_x = (self.center.x - before) / dt;
    }

    pub fn tick(&mut self, dt: f32) {
        self.weapon_cooldown = (self.weapon_cooldown - dt).max(0.0);
        self.beams_blocked = 0;
    }

    /// Swept test of a ball against the moving paddle
    pub fn collide_ball(&self, ball: &GameBall, dt: f32) -> Option<CollisionResult> {
        if !ball.can_collide() {
            return None;
        }
        let velocity = ball.velocity();
        // Balls moving up through the paddle from below are ignored
        if velocity.y > 0.0 && ball.center().y < self.center.y {
            return None;
        }
        let self_velocity = Vec2::new(self.avg_vel_x, 0.0);
        self.world_bounds()
            .collide_moving(dt, &ball.bounds, velocity, self_velocity)
            .filter(|res| (velocity - self_velocity).dot(res.normal) < 0.0)
    }

    /// Box test for beams and projectiles
    pub fn ray_hit(&self, ray: &Ray2D) -> Option<f32> {
        ray_aabb(ray, &self.aabb()).filter(|t| *t > 0.0)
    }

    /// Transfer some of the paddle's momentum to a ball that just bounced off it
    ///
    /// A moving paddle rotates the ball against its direction of travel, scaled
    /// by how fast it moved. The ball always leaves upward and never flatter than
    /// the minimum launch angle.
    pub fn modify_ball_on_hit(&self, ball: &mut GameBall) {
        let mut dir = ball.direction();
        if self.avg_vel_x.abs() > EPSILON {
            let fraction = self.avg_vel_x.abs() / PADDLE_DEFAULT_SPEED;
            let change = -sign_of(self.avg_vel_x) * fraction * PADDLE_RAND_DEG_ANG;
            dir = rotate_deg(dir, change);
        }

        if dir.y < 0.0 {
            dir.y = -dir.y;
        }
        let from_horizontal = 90.0 - angle_between_deg(dir, Vec2::Y);
        if from_horizontal < MIN_BALL_ANGLE_DEG {
            let side = if dir.x < 0.0 { -1.0 } else { 1.0 };
            dir = rotate_deg(Vec2::new(side, 0.0), side * MIN_BALL_ANGLE_DEG);
        }

        // Sit the ball on top of the paddle if it sank into it
        let top = self.center.y + PADDLE_HALF_HEIGHT + ball.radius();
        if ball.center().y < top && (ball.center().x - self.center.x).abs() <= self.half_width() {
            let mut c = ball.center();
            c.y = top;
            ball.set_center(c);
        }
        ball.set_direction(dir);
    }

    /// A sticky paddle holds a ball that lands on it until the next launch
    pub fn catch_ball(&self, ball: &mut GameBall) -> bool {
        if !self.has_type(PaddleType::STICKY) {
            return false;
        }
        let hw = self.half_width();
        let offset = (ball.center().x - self.center.x).clamp(-hw, hw);
        ball.state = BallState::OnPaddle { offset };
        ball.set_center(self.top_center() + Vec2::new(offset, ball.radius()));
        true
    }

    /// A magnet paddle bends balls falling toward it onto its centre
    pub fn magnet_pull(&self, ball: &mut GameBall, dt: f32) {
        if !self.has_type(PaddleType::MAGNET) || ball.state != BallState::InPlay {
            return;
        }
        let dir = ball.direction();
        let to_paddle = (self.top_center() - ball.center()).normalize_or_zero();
        if dir.y >= 0.0 || to_paddle.y >= 0.0 {
            return;
        }
        let max_turn = MAGNET_TURN_DEG_PER_SEC * dt;
        let turn = dir.angle_to(to_paddle).to_degrees().clamp(-max_turn, max_turn);
        ball.set_direction(rotate_deg(dir, turn));
    }

    /// Record that a beam segment stopped on the paddle
    pub fn hit_by_beam(&mut self) {
        self.beams_blocked += 1;
    }

    pub fn grow(&mut self) -> bool {
        let next = match self.size {
            PaddleSize::Smallest => PaddleSize::Smaller,
            PaddleSize::Smaller => PaddleSize::Normal,
            PaddleSize::Normal => PaddleSize::Bigger,
            PaddleSize::Bigger => PaddleSize::Biggest,
            PaddleSize::Biggest => return false,
        };
        self.size = next;
        self.rebuild_bounds();
        true
    }

    pub fn shrink(&mut self) -> bool {
        let next = match self.size {
            PaddleSize::Smallest => return false,
            PaddleSize::Smaller => PaddleSize::Smallest,
            PaddleSize::Normal => PaddleSize::Smaller,
            PaddleSize::Bigger => PaddleSize::Normal,
            PaddleSize::Biggest => PaddleSize::Bigger,
        };
        self.size = next;
        self.rebuild_bounds();
        true
    }

    pub fn add_type(&mut self, t: PaddleType) {
        self.paddle_type.insert(t);
    }

    pub fn remove_type(&mut self, t: PaddleType) {
        self.paddle_type.remove(t);
    }

    pub fn has_type(&self, t: PaddleType) -> bool {
        self.paddle_type.contains(t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::ball::BallSpeed;

    fn paddle() -> PlayerPaddle {
        PlayerPaddle::new(0.0, 25.0)
    }

    #[test]
    fn test_move_clamps_to_walls() {
        let mut p = paddle();
        for _ in 0..200 {
            p.move_toward(-100.0, 0.1, PADDLE_DEFAULT_SPEED);
        }
        assert!((p.center.x - p.half_width()).abs() < 1e-4);
        assert_eq!(p.avg_vel_x, 0.0);
    }

    #[test]
    fn test_move_records_velocity() {
        let mut p = paddle();
        p.move_toward(p.center.x + 10.0, 0.1, PADDLE_DEFAULT_SPEED);
        assert!((p.avg_vel_x - PADDLE_DEFAULT_SPEED).abs() < 1e-3);
    }

    #[test]
    fn test_ball_bounces_off_top() {
        let p = paddle();
        let mut ball = GameBall::new(1, p.center + Vec2::new(0.0, 1.5));
        ball.state = BallState::InPlay;
        ball.set_velocity(BallSpeed::Normal, Vec2::NEG_Y);
        let hit = p.collide_ball(&ball, 0.1).unwrap();
        assert!((hit.normal - Vec2::Y).length() < 1e-4);

        // Leaving the paddle is not a hit
        ball.set_center(p.top_center() + Vec2::new(0.0, ball.radius()));
        ball.set_velocity(BallSpeed::Normal, Vec2::Y);
        assert!(p.collide_ball(&ball, 0.1).is_none());
    }

    #[test]
    fn test_moving_paddle_rotates_ball() {
        let mut p = paddle();
        p.avg_vel_x = PADDLE_DEFAULT_SPEED;
        let mut ball = GameBall::new(1, p.top_center() + Vec2::new(0.0, 0.5));
        ball.set_velocity(BallSpeed::Normal, Vec2::Y);
        p.modify_ball_on_hit(&mut ball);
        // Full speed to the right turns the ball clockwise by the full angle
        let expected = rotate_deg(Vec2::Y, -PADDLE_RAND_DEG_ANG);
        assert!((ball.direction() - expected).length() < 1e-4);
    }

    #[test]
    fn test_min_angle_enforced() {
        let p = paddle();
        let mut ball = GameBall::new(1, p.top_center() + Vec2::new(0.0, 0.5));
        ball.set_velocity(BallSpeed::Normal, Vec2::new(1.0, 0.01));
        p.modify_ball_on_hit(&mut ball);
        let angle = 90.0 - angle_between_deg(ball.direction(), Vec2::Y);
        assert!(angle >= MIN_BALL_ANGLE_DEG - 1e-3);
        assert!(ball.direction().y > 0.0);
    }

    #[test]
    fn test_grow_shrink() {
        let mut p = paddle();
        let w = p.half_width();
        assert!(p.grow());
        assert!(p.half_width() > w);
        assert!(p.shrink());
        assert!(p.shrink());
        assert!(p.shrink());
        assert!(!p.shrink());
        assert_eq!(p.size(), PaddleSize::Smallest);
    }

    #[test]
    fn test_ray_hits_paddle() {
        let p = paddle();
        let ray = Ray2D::new(p.center + Vec2::new(0.0, 5.0), Vec2::NEG_Y);
        let t = p.ray_hit(&ray).unwrap();
        assert!((t - (5.0 - PADDLE_HALF_HEIGHT)).abs() < 1e-4);
    }

    #[test]
    fn test_sticky_paddle_catches_ball() {
        let mut p = paddle();
        let mut ball = GameBall::new(1, p.top_center() + Vec2::new(0.75, 0.4));
        ball.state = BallState::InPlay;
        assert!(!p.catch_ball(&mut ball));
        assert_eq!(ball.state, BallState::InPlay);

        p.add_type(PaddleType::STICKY);
        assert!(p.catch_ball(&mut ball));
        assert_eq!(ball.state, BallState::OnPaddle { offset: 0.75 });
        assert!((ball.center().y - (p.top_center().y + ball.radius())).abs() < 1e-5);
    }

    #[test]
    fn test_magnet_bends_falling_ball() {
        let mut p = paddle();
        let mut ball = GameBall::new(1, p.top_center() + Vec2::new(-6.0, 6.0));
        ball.state = BallState::InPlay;
        ball.set_velocity(BallSpeed::Normal, Vec2::NEG_Y);

        p.magnet_pull(&mut ball, 0.1);
        assert_eq!(ball.direction(), Vec2::NEG_Y, "no magnet, no pull");

        p.add_type(PaddleType::MAGNET);
        p.magnet_pull(&mut ball, 0.1);
        let turned = angle_between_deg(Vec2::NEG_Y, ball.direction());
        assert!(ball.direction().x > 0.0);
        assert!((turned - MAGNET_TURN_DEG_PER_SEC * 0.1).abs() < 0.01);

        // Rising balls are left alone
        ball.set_velocity(BallSpeed::Normal, Vec2::Y);
        p.magnet_pull(&mut ball, 0.1);
        assert_eq!(ball.direction(), Vec2::Y);
    }
}
