//! Cannon block: captures a ball, spins for a random time, then fires it
//!
//! The cannon owns only its rotation state. The level keeps the barrel's
//! bounding lines in step with the rotation and moves the loaded ball.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::bounds::BoundingLines;
use crate::rotate_deg;

pub const CANNON_BARREL_LENGTH: f32 = 1.2;
pub const HALF_CANNON_BARREL_LENGTH: f32 = CANNON_BARREL_LENGTH / 2.0;
pub const CANNON_BARREL_HEIGHT: f32 = 0.8;
pub const HALF_CANNON_BARREL_HEIGHT: f32 = CANNON_BARREL_HEIGHT / 2.0;

/// Spin time is chosen uniformly in this range
pub const MIN_ROTATION_TIME_SECS: f32 = 1.0;
pub const MAX_ROTATION_TIME_SECS: f32 = 2.5;
/// Spin speed magnitude is chosen uniformly in this range
pub const MIN_ROTATION_SPD_DEG_PER_SEC: f32 = 150.0;
pub const MAX_ROTATION_SPD_DEG_PER_SEC: f32 = 450.0;

/// Outcome of one cannon update
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CannonTick {
    /// Nothing loaded
    Idle,
    /// Still spinning; barrel turned by this many degrees
    Rotated(f32),
    /// Spin finished; fire the ball with this id
    Fire(u32),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CannonState {
    /// Barrel angle from +x, kept within (-360, 360)
    pub rotation_deg: f32,
    pub rotation_speed: f32,
    pub elapsed: f32,
    pub total: f32,
    pub loaded_ball: Option<u32>,
}

impl CannonState {
    pub fn is_loaded(&self) -> bool {
        self.loaded_ball.is_some()
    }

    /// Load a ball and pick a random spin
    ///
    /// Returns false if a ball is already loaded.
    pub fn capture<R: Rng>(&mut self, ball_id: u32, rng: &mut R) -> bool {
        if self.is_loaded() {
            return false;
        }
        self.elapsed = 0.0;
        let speed = rng.random_range(MIN_ROTATION_SPD_DEG_PER_SEC..=MAX_ROTATION_SPD_DEG_PER_SEC);
        self.rotation_speed = if rng.random_bool(0.5) { speed } else { -speed };
        self.total = rng.random_range(MIN_ROTATION_TIME_SECS..=MAX_ROTATION_TIME_SECS);
        self.loaded_ball = Some(ball_id);
        true
    }

    /// Spin while loaded; fires once the spin time has elapsed
    pub fn rotate_and_fire(&mut self, dt: f32) -> CannonTick {
        let Some(ball_id) = self.loaded_ball else {
            return CannonTick::Idle;
        };

        if self.elapsed >= self.total {
            self.elapsed = self.total;
            self.loaded_ball = None;
            return CannonTick::Fire(ball_id);
        }

        let increment = self.rotation_speed * dt;
        self.rotation_deg += increment;
        if self.rotation_deg >= 360.0 {
            self.rotation_deg -= 360.0;
        } else if self.rotation_deg <= -360.0 {
            self.rotation_deg += 360.0;
        }
        self.elapsed += dt;
        CannonTick::Rotated(increment)
    }

    /// Unit direction the barrel points
    pub fn fire_direction(&self) -> Vec2 {
        rotate_deg(Vec2::X, self.rotation_deg).normalize()
    }

    /// Where a fired ball leaves the barrel
    pub fn barrel_end(&self, center: Vec2) -> Vec2 {
        center + HALF_CANNON_BARREL_LENGTH * self.fire_direction()
    }

    /// Barrel outline at the current rotation
    pub fn barrel_bounds(&self, center: Vec2) -> BoundingLines {
        BoundingLines::rectangle(center, HALF_CANNON_BARREL_LENGTH, HALF_CANNON_BARREL_HEIGHT)
            .rotated(self.rotation_deg, center)
    }
}
