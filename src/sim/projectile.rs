//! Projectiles: bullets, rockets, mines, fire globs, collateral blocks and boss shots

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::bounds::BoundingLines;
use super::collision::{Aabb2D, LineSeg2D, Ray2D};
use super::piece::PieceCoord;

/// Downward pull on fire globs
const FIRE_GLOB_ACCEL: f32 = 9.8;
/// Seconds a resting mine waits before it detonates
pub const MINE_FUSE_SECS: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectileKind {
    PaddleLaserBullet,
    BallLaserBullet,
    PaddleRocket,
    PaddleMine,
    FireGlob,
    CollateralBlock,
    BossLaserBullet,
    BossOrb,
}

impl ProjectileKind {
    /// (width, height) before any split scaling
    pub fn default_size(self) -> Vec2 {
        match self {
            ProjectileKind::PaddleLaserBullet | ProjectileKind::BallLaserBullet => Vec2::new(0.2, 1.0),
            ProjectileKind::BossLaserBullet => Vec2::new(0.25, 1.2),
            ProjectileKind::PaddleRocket => Vec2::new(0.5, 1.2),
            ProjectileKind::PaddleMine => Vec2::new(0.5, 0.5),
            ProjectileKind::FireGlob => Vec2::new(0.4, 0.4),
            ProjectileKind::CollateralBlock => Vec2::new(2.5, 1.0),
            ProjectileKind::BossOrb => Vec2::new(0.8, 0.8),
        }
    }

    pub fn default_speed(self) -> f32 {
        match self {
            ProjectileKind::PaddleLaserBullet | ProjectileKind::BallLaserBullet => 20.0,
            ProjectileKind::BossLaserBullet => 14.0,
            ProjectileKind::PaddleRocket => 8.0,
            ProjectileKind::PaddleMine => 10.0,
            ProjectileKind::FireGlob => 2.0,
            ProjectileKind::CollateralBlock => 6.0,
            ProjectileKind::BossOrb => 7.0,
        }
    }

    /// Damage dealt to boss weakpoints
    pub fn damage(self) -> f32 {
        match self {
            ProjectileKind::PaddleLaserBullet => 50.0,
            ProjectileKind::BallLaserBullet => 40.0,
            ProjectileKind::PaddleRocket => 400.0,
            ProjectileKind::CollateralBlock => 150.0,
            ProjectileKind::FireGlob => 10.0,
            ProjectileKind::PaddleMine | ProjectileKind::BossLaserBullet | ProjectileKind::BossOrb => 0.0,
        }
    }

    pub fn is_laser(self) -> bool {
        matches!(
            self,
            ProjectileKind::PaddleLaserBullet
                | ProjectileKind::BallLaserBullet
                | ProjectileKind::BossLaserBullet
        )
    }

    /// Shots that come from the boss or level and can hurt the paddle
    pub fn is_hostile(self) -> bool {
        matches!(
            self,
            ProjectileKind::BossLaserBullet
                | ProjectileKind::BossOrb
                | ProjectileKind::FireGlob
                | ProjectileKind::CollateralBlock
        )
    }

    /// Whether hitting a boss weakpoint with this kind does anything
    pub fn hurts_boss(self) -> bool {
        self.damage() > 0.0 && !self.is_hostile_only()
    }

    /// Everything but the boss's own shots can strike a boss part
    pub fn can_hit_boss(self) -> bool {
        !self.is_hostile_only()
    }

    fn is_hostile_only(self) -> bool {
        matches!(self, ProjectileKind::BossLaserBullet | ProjectileKind::BossOrb)
    }
}

/// Last thing a projectile touched, so it does not hit it twice in a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Collidee {
    Piece(PieceCoord),
    BossPart(usize),
    Paddle,
}

/// A projectile requested by the level or a boss; the game state assigns its id
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectileSpawn {
    pub kind: ProjectileKind,
    pub position: Vec2,
    pub dir: Vec2,
}

/// Size multiplier for each of `n` projectiles produced by a split
pub fn split_scale_factor(n: usize) -> f32 {
    if n <= 1 {
        return 1.0;
    }
    (1.0 / (n as f32).sqrt()).max(0.5)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub id: u32,
    pub kind: ProjectileKind,
    pub position: Vec2,
    dir: Vec2,
    pub speed: f32,
    pub width: f32,
    pub height: f32,
    pub last_collided: Option<Collidee>,
    /// Mines stop on the first thing they hit and start their fuse
    pub fuse: Option<f32>,
}

impl Projectile {
    pub fn new(id: u32, kind: ProjectileKind, position: Vec2, dir: Vec2) -> Self {
        let size = kind.default_size();
        Self {
            id,
            kind,
            position,
            dir: dir.normalize_or(Vec2::Y),
            speed: kind.default_speed(),
            width: size.x,
            height: size.y,
            last_collided: None,
            fuse: None,
        }
    }

    pub fn direction(&self) -> Vec2 {
        self.dir
    }

    pub fn set_direction(&mut self, dir: Vec2) {
        self.dir = dir.normalize_or(self.dir);
    }

    pub fn half_height(&self) -> f32 {
        self.height * 0.5
    }

    pub fn velocity(&self) -> Vec2 {
        self.dir * self.speed
    }

    pub fn is_resting(&self) -> bool {
        self.fuse.is_some()
    }

    /// Stop moving and light the fuse
    pub fn rest(&mut self) {
        self.speed = 0.0;
        if self.fuse.is_none() {
            self.fuse = Some(MINE_FUSE_SECS);
        }
    }

    /// Move one step; returns true when a lit fuse burns out
    pub fn tick(&mut self, dt: f32) -> bool {
        if let Some(fuse) = self.fuse.as_mut() {
            *fuse -= dt;
            return *fuse <= 0.0;
        }
        if self.kind == ProjectileKind::FireGlob {
            let v = self.velocity() + Vec2::NEG_Y * FIRE_GLOB_ACCEL * dt;
            self.speed = v.length();
            self.dir = v.normalize_or(Vec2::NEG_Y);
        }
        self.position += self.velocity() * dt;
        false
    }

    /// Ray from the projectile's tail through its nose
    pub fn tail_ray(&self) -> Ray2D {
        Ray2D::new(self.position - self.dir * self.half_height(), self.dir)
    }

    /// Distance along [`tail_ray`](Self::tail_ray) within which a hit counts this tick
    pub fn reach(&self, dt: f32) -> f32 {
        self.height + self.speed * dt
    }

    /// Oriented rectangle along the direction of travel
    pub fn bounds(&self) -> BoundingLines {
        let up = self.dir;
        let right = up.perp() * -1.0;
        let hw = self.width * 0.5;
        let hh = self.half_height();
        let c = self.position;
        let tl = c - right * hw + up * hh;
        let tr = c + right * hw + up * hh;
        let br = c + right * hw - up * hh;
        let bl = c - right * hw - up * hh;
        let mut b = BoundingLines::default();
        b.push(LineSeg2D::new(tl, bl), -right);
        b.push(LineSeg2D::new(bl, br), -up);
        b.push(LineSeg2D::new(br, tr), right);
        b.push(LineSeg2D::new(tr, tl), up);
        b
    }

    pub fn aabb(&self) -> Aabb2D {
        self.bounds().aabb()
    }

    /// A copy sent off along a split ray, shrunk by `scale`
    pub fn split_copy(&self, id: u32, ray: &Ray2D, scale: f32) -> Projectile {
        let mut p = self.clone();
        p.id = id;
        p.width *= scale;
        p.height *= scale;
        p.dir = ray.unit_dir();
        p.position = ray.origin + p.dir * p.half_height();
        p
    }

    /// Point the projectile along `ray`, nose clear of the ray origin
    pub fn redirect(&mut self, ray: &Ray2D) {
        self.dir = ray.unit_dir();
        self.position = ray.origin + self.dir * self.half_height();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_scale_factor() {
        assert_eq!(split_scale_factor(1), 1.0);
        assert!((split_scale_factor(2) - 1.0 / 2f32.sqrt()).abs() < 1e-6);
        assert_eq!(split_scale_factor(3), 1.0 / 3f32.sqrt());
        assert_eq!(split_scale_factor(9), 0.5);
    }

    #[test]
    fn test_laser_moves_straight() {
        let mut p = Projectile::new(1, ProjectileKind::PaddleLaserBullet, Vec2::ZERO, Vec2::Y);
        assert!(!p.tick(0.5));
        assert!((p.position - Vec2::new(0.0, 10.0)).length() < 1e-5);
    }

    #[test]
    fn test_fire_glob_accelerates_down() {
        let mut p = Projectile::new(1, ProjectileKind::FireGlob, Vec2::ZERO, Vec2::NEG_Y);
        let s0 = p.speed;
        p.tick(0.1);
        assert!(p.speed > s0);
        assert!(p.direction().y < 0.0);
    }

    #[test]
    fn test_mine_fuse() {
        let mut p = Projectile::new(1, ProjectileKind::PaddleMine, Vec2::ZERO, Vec2::Y);
        p.rest();
        let at = p.position;
        assert!(!p.tick(1.0));
        assert_eq!(p.position, at);
        assert!(p.tick(1.5));
    }

    #[test]
    fn test_bounds_follow_direction() {
        let p = Projectile::new(1, ProjectileKind::PaddleLaserBullet, Vec2::new(1.0, 1.0), Vec2::X);
        let aabb = p.aabb();
        assert!((aabb.width() - 1.0).abs() < 1e-5);
        assert!((aabb.height() - 0.2).abs() < 1e-5);
    }

    #[test]
    fn test_split_copy_scales_and_redirects() {
        let p = Projectile::new(1, ProjectileKind::PaddleLaserBullet, Vec2::ZERO, Vec2::Y);
        let ray = Ray2D::new(Vec2::new(2.0, 2.0), Vec2::X);
        let c = p.split_copy(7, &ray, 0.5);
        assert_eq!(c.id, 7);
        assert_eq!(c.height, 0.5);
        assert!((c.position - Vec2::new(2.25, 2.0)).length() < 1e-5);
    }

    #[test]
    fn test_boss_shots_do_not_hurt_boss() {
        assert!(!ProjectileKind::BossLaserBullet.hurts_boss());
        assert!(!ProjectileKind::PaddleMine.hurts_boss());
        assert!(ProjectileKind::PaddleRocket.hurts_boss());
        assert!(ProjectileKind::FireGlob.can_hit_boss());
        assert!(!ProjectileKind::BossOrb.can_hit_boss());
    }
}
