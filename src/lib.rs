//! Biff Bam Blammo - a Breakout-style arcade game simulation core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (collision geometry, level pieces, beams, bosses)
//! - `settings`: Player-facing configuration loaded from JSON
//! - `leaderboard`: Arcade top-five table and per-level highscores
//! - `error`: Error type for everything that touches the filesystem

pub mod error;
pub mod leaderboard;
pub mod settings;
pub mod sim;

pub use error::{BlammoError, Result};
pub use leaderboard::Leaderboard;
pub use settings::{Difficulty, Settings};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (120 Hz for stable sampled sweeps)
    pub const SIM_DT: f32 = 1.0 / 120.0;

    /// General floating point tolerance for geometry
    pub const EPSILON: f32 = 1e-5;

    /// Level piece dimensions, in level units
    pub const PIECE_WIDTH: f32 = 2.5;
    pub const PIECE_HEIGHT: f32 = 1.0;
    pub const HALF_PIECE_WIDTH: f32 = PIECE_WIDTH / 2.0;
    pub const HALF_PIECE_HEIGHT: f32 = PIECE_HEIGHT / 2.0;

    /// Ball defaults
    pub const DEFAULT_BALL_RADIUS: f32 = 0.5;
    pub const BALL_RADIUS_DIFF_PER_SIZE: f32 = 0.15;
    /// Gravity ball acceleration (units/s²)
    pub const BALL_GRAVITY: f32 = 9.8;

    /// Paddle defaults
    pub const PADDLE_DEFAULT_HALF_WIDTH: f32 = 1.75;
    pub const PADDLE_HALF_WIDTH_DIFF_PER_SIZE: f32 = 0.5;
    pub const PADDLE_HALF_HEIGHT: f32 = 0.5;
    pub const PADDLE_DEFAULT_SPEED: f32 = 24.0;
    /// Paddle sits this far below the first row of pieces
    pub const PADDLE_Y: f32 = -0.5;
    /// Max rotation (degrees) applied to a ball by a moving paddle
    pub const PADDLE_RAND_DEG_ANG: f32 = 20.0;
    /// Smallest angle (degrees) a ball may leave the paddle at
    pub const MIN_BALL_ANGLE_DEG: f32 = 10.0;

    /// Balls below this y are lost
    pub const DEATH_Y: f32 = -2.0;

    /// Starting lives
    pub const DEFAULT_LIVES: u32 = 3;
}

/// Rotate a vector counter-clockwise by `deg` degrees
#[inline]
pub fn rotate_deg(v: Vec2, deg: f32) -> Vec2 {
    Vec2::from_angle(deg.to_radians()).rotate(v)
}

/// Rotate a point about `center` by `deg` degrees
#[inline]
pub fn rotate_about(p: Vec2, center: Vec2, deg: f32) -> Vec2 {
    center + rotate_deg(p - center, deg)
}

/// Reflect a direction off a surface with unit normal `n`
///
/// v' = v - 2(v·n)n
#[inline]
pub fn reflect(v: Vec2, n: Vec2) -> Vec2 {
    v - 2.0 * v.dot(n) * n
}

/// Sign of `x` with zero mapping to zero
#[inline]
pub fn sign_of(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Angle in degrees between two non-zero vectors, in [0, 180]
#[inline]
pub fn angle_between_deg(a: Vec2, b: Vec2) -> f32 {
    let denom = a.length() * b.length();
    if denom <= 0.0 {
        return 0.0;
    }
    (a.dot(b) / denom).clamp(-1.0, 1.0).acos().to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotate_deg_quarter_turn() {
        let v = rotate_deg(Vec2::X, 90.0);
        assert!((v - Vec2::Y).length() < 1e-5);
    }

    #[test]
    fn test_reflect_off_floor() {
        let v = reflect(Vec2::new(1.0, -1.0), Vec2::Y);
        assert!((v - Vec2::new(1.0, 1.0)).length() < 1e-6);
    }

    #[test]
    fn test_angle_between() {
        assert!((angle_between_deg(Vec2::X, Vec2::Y) - 90.0).abs() < 1e-3);
        assert!((angle_between_deg(Vec2::X, -Vec2::X) - 180.0).abs() < 1e-3);
    }
}
