//! Laser beams built from straight segments
//!
//! Every tick a firing beam is rebuilt from its origin segments: each segment
//! is cast into the level, and prisms or portals it strikes spawn further
//! segments. The rebuilt beam only replaces the old one when its shape changed.

use std::collections::{BTreeSet, VecDeque};

use glam::Vec2;
use log::debug;
use serde::{Deserialize, Serialize};

use super::boss::Boss;
use super::collision::Ray2D;
use super::level::{GameLevel, LevelFeedback};
use super::paddle::PlayerPaddle;
use super::piece::{LevelPiece, PieceCoord, PieceKind};
use super::state::GameEvent;

/// A beam never lives shorter than its fade-out
pub const MIN_ALLOWED_LIFETIME: f32 = 0.75;
pub const MIN_BEAM_RADIUS: f32 = 0.05;
pub const MIN_DAMAGE_PER_SEC: f32 = 25.0;
/// Below this alpha a fading beam no longer interacts with the paddle
const MIN_ALPHA_FOR_PADDLE: f32 = 0.33;
/// Segments with lengths closer than this count as unchanged
const LENGTH_TOLERANCE: f32 = 0.001;
const PULSE_FREQ: f32 = 6.0;

pub const PADDLE_BEAM_RADIUS_FRACTION: f32 = 0.4;
pub const PADDLE_BEAM_DAMAGE_PER_SEC: f32 = 50.0;
pub const PADDLE_BEAM_LIFETIME: f32 = 5.0;
pub const PADDLE_BEAM_NUM_BASE_SEGMENTS: usize = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeamSegment {
    pub ray: Ray2D,
    pub radius: f32,
    pub damage_per_sec: f32,
    pub ignore_piece: Option<PieceCoord>,
    pub colliding_piece: Option<PieceCoord>,
    pub colliding_boss_part: Option<usize>,
    /// Ray parameter where the segment stops
    pub end_t: f32,
    pub time_since_fired: f32,
    /// Origin segments of a paddle beam start inside the paddle
    #[serde(default)]
    pub from_paddle: bool,
}

impl BeamSegment {
    pub fn new(ray: Ray2D, radius: f32, damage_per_sec: f32, ignore_piece: Option<PieceCoord>) -> Self {
        Self {
            ray,
            radius,
            damage_per_sec,
            ignore_piece,
            colliding_piece: None,
            colliding_boss_part: None,
            end_t: 0.0,
            time_since_fired: 0.0,
            from_paddle: false,
        }
    }

    pub fn start_point(&self) -> Vec2 {
        self.ray.origin
    }

    pub fn end_point(&self) -> Vec2 {
        self.ray.point_at(self.end_t)
    }

    pub fn length(&self) -> f32 {
        self.end_t
    }

    /// Radius including the pulse animation, between 75% and 95% of the base
    pub fn current_radius(&self) -> f32 {
        let phase = (self.time_since_fired * PULSE_FREQ).sin() * 0.5 + 0.5;
        self.radius * (0.75 + 0.2 * phase)
    }

    pub fn tick(&mut self, dt: f32) {
        self.time_since_fired += dt;
    }

    /// Cast into the level (and boss) and set where the segment stops
    pub fn fire_into_level(&mut self, level: &GameLevel, boss: Option<&Boss>) {
        let ignore: Vec<PieceCoord> = self.ignore_piece.into_iter().collect();
        let piece_hit = level.first_collider(&self.ray, &ignore);
        let boss_hit = boss.and_then(|b| b.ray_hit(&self.ray));

        self.colliding_piece = None;
        self.colliding_boss_part = None;
        match (piece_hit, boss_hit) {
            (Some((_, pt)), Some((part, bt))) if bt < pt => {
                self.colliding_boss_part = Some(part);
                self.end_t = bt.max(0.0);
            }
            (None, Some((part, bt))) => {
                self.colliding_boss_part = Some(part);
                self.end_t = bt.max(0.0);
            }
            (Some((coord, t)), _) => {
                self.colliding_piece = Some(coord);
                self.end_t = t.max(0.0);
            }
            (None, None) => {
                self.end_t = level.unit_width().max(level.unit_height());
            }
        }
    }

    pub fn same_as(&self, other: &BeamSegment) -> bool {
        self.start_point() == other.start_point()
            && self.end_point() == other.end_point()
            && (self.length() - other.length()).abs() <= LENGTH_TOLERANCE
            && self.colliding_piece == other.colliding_piece
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Beam {
    pub base_damage_per_sec: f32,
    pub total_life: f32,
    pub elapsed: f32,
    pub alpha: f32,
    pub alpha_dirty: bool,
    pub parts: Vec<BeamSegment>,
}

impl Beam {
    pub fn new(base_damage_per_sec: f32, total_life: f32) -> Self {
        debug_assert!(total_life >= MIN_ALLOWED_LIFETIME);
        Self {
            base_damage_per_sec,
            total_life: total_life.max(MIN_ALLOWED_LIFETIME),
            elapsed: 0.0,
            alpha: 1.0,
            alpha_dirty: false,
            parts: Vec::new(),
        }
    }

    /// The paddle's laser beam
    pub fn paddle_laser(damage_per_sec: f32) -> Self {
        Self::new(damage_per_sec, PADDLE_BEAM_LIFETIME)
    }

    /// Upward origin segment from the paddle's top centre
    pub fn paddle_origin_segments(&self, paddle: &PlayerPaddle) -> Vec<BeamSegment> {
        let radius = PADDLE_BEAM_RADIUS_FRACTION * paddle.half_width();
        (0..PADDLE_BEAM_NUM_BASE_SEGMENTS)
            .map(|_| {
                let mut seg = BeamSegment::new(
                    Ray2D::new(paddle.top_center(), Vec2::Y),
                    radius,
                    self.base_damage_per_sec,
                    None,
                );
                seg.from_paddle = true;
                seg
            })
            .collect()
    }

    /// Rebuild the beam from `initial` segments; returns whether it changed
    pub fn build_and_update(
        &mut self,
        initial: Vec<BeamSegment>,
        level: &GameLevel,
        boss: Option<&Boss>,
        paddle: &mut PlayerPaddle,
        events: &mut Vec<GameEvent>,
    ) -> bool {
        let mut queue: VecDeque<BeamSegment> = initial.into();
        let mut visited: BTreeSet<PieceCoord> = BTreeSet::new();
        let mut new_parts = Vec::new();

        while let Some(mut seg) = queue.pop_front() {
            seg.fire_into_level(level, boss);

            // Segments leaving the paddle never stop on it
            let test_paddle = !seg.from_paddle && self.alpha >= MIN_ALPHA_FOR_PADDLE;
            if test_paddle && let Some(t) = paddle_hit_t(&seg, paddle) {
                if t <= seg.end_t {
                    seg.end_t = t;
                    seg.colliding_piece = None;
                    seg.colliding_boss_part = None;
                    paddle.hit_by_beam();
                    new_parts.push(seg);
                    continue;
                }
            }

            if let Some(coord) = seg.colliding_piece
                && visited.insert(coord)
                && let Some(piece) = level.piece(coord.0, coord.1)
                && piece.kind.is_light_reflector_refractor()
            {
                let (sibling_center, ignore) = match piece.kind {
                    PieceKind::Portal { sibling } => {
                        visited.insert(sibling);
                        (Some(LevelPiece::center_of(sibling.0, sibling.1)), sibling)
                    }
                    _ => (None, coord),
                };
                let rays = piece.reflection_refraction_rays(seg.end_point(), seg.ray.unit_dir(), sibling_center);
                let n = rays.len().max(1) as f32;
                for ray in rays {
                    let radius = self.alpha * (seg.radius / n).max(MIN_BEAM_RADIUS);
                    let dmg = self.alpha * (seg.damage_per_sec / n).max(MIN_DAMAGE_PER_SEC);
                    queue.push_back(BeamSegment::new(ray, radius, dmg, Some(ignore)));
                }
            }
            new_parts.push(seg);
        }

        let changed = self.alpha_dirty
            || new_parts.len() != self.parts.len()
            || new_parts.iter().zip(&self.parts).any(|(a, b)| !a.same_as(b));
        if changed {
            debug!("Beam rebuilt with {} segments", new_parts.len());
            self.parts = new_parts;
            self.alpha_dirty = false;
            events.push(GameEvent::BeamChanged);
        }
        changed
    }

    /// Advance the beam's life; returns true once it has expired
    pub fn tick(&mut self, dt: f32) -> bool {
        if self.elapsed >= self.total_life {
            return true;
        }
        for part in self.parts.iter_mut() {
            part.tick(dt);
        }
        self.elapsed = (self.elapsed + dt).min(self.total_life);

        let fade_start = self.total_life - MIN_ALLOWED_LIFETIME;
        let alpha = if self.elapsed <= fade_start {
            1.0
        } else {
            1.0 - (self.elapsed - fade_start) / MIN_ALLOWED_LIFETIME
        };
        if alpha != self.alpha {
            self.alpha = alpha.clamp(0.0, 1.0);
            self.alpha_dirty = true;
        }
        false
    }

    /// Apply one tick of damage to whatever each segment is resting on
    pub fn apply_damage(&self, dt: f32, level: &mut GameLevel, boss: Option<&mut Boss>, fb: &mut LevelFeedback) {
        for part in &self.parts {
            if let Some(coord) = part.colliding_piece {
                level.tick_beam_damage(coord, dt * part.damage_per_sec, fb);
            }
        }
        if let Some(boss) = boss {
            for part in &self.parts {
                if let Some(idx) = part.colliding_boss_part {
                    boss.beam_damage(idx, dt * part.damage_per_sec, &mut fb.events);
                }
            }
        }
    }
}

/// Nearest hit of the centre ray and the two edge rays against the paddle
fn paddle_hit_t(seg: &BeamSegment, paddle: &PlayerPaddle) -> Option<f32> {
    let side = seg.ray.unit_dir().perp() * seg.radius;
    [Vec2::ZERO, side, -side]
        .into_iter()
        .filter_map(|offset| paddle.ray_hit(&Ray2D::new(seg.ray.origin + offset, seg.ray.unit_dir())))
        .min_by(f32::total_cmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;

    fn paddle_for(level: &GameLevel) -> PlayerPaddle {
        PlayerPaddle::new(0.0, level.unit_width())
    }

    #[test]
    fn test_beam_stops_at_block() {
        let level = GameLevel::from_layout(&["...", ".r.", "...", "...", "..."]).expect("valid layout");
        let mut paddle = paddle_for(&level);
        let mut beam = Beam::paddle_laser(PADDLE_BEAM_DAMAGE_PER_SEC);
        let origin = beam.paddle_origin_segments(&paddle);
        let mut events = Vec::new();
        assert!(beam.build_and_update(origin, &level, None, &mut paddle, &mut events));
        assert_eq!(beam.parts.len(), 1);
        assert_eq!(beam.parts[0].colliding_piece, Some((1, 3)));
        assert_eq!(events, vec![GameEvent::BeamChanged]);
    }

    #[test]
    fn test_unchanged_rebuild_keeps_parts() {
        let level = GameLevel::from_layout(&["...", ".r.", "..."]).expect("valid layout");
        let mut paddle = paddle_for(&level);
        let mut beam = Beam::paddle_laser(PADDLE_BEAM_DAMAGE_PER_SEC);
        let mut events = Vec::new();
        let origin = beam.paddle_origin_segments(&paddle);
        beam.build_and_update(origin, &level, None, &mut paddle, &mut events);
        beam.tick(0.1);
        let origin = beam.paddle_origin_segments(&paddle);
        assert!(!beam.build_and_update(origin, &level, None, &mut paddle, &mut events));
        assert!(beam.parts[0].time_since_fired > 0.0);
    }

    #[test]
    fn test_prism_splits_beam() {
        let level = GameLevel::from_layout(&["......", "......", "..p...", "......", "......"]).expect("valid layout");
        let mut paddle = paddle_for(&level);
        paddle.center.x = LevelPiece::center_of(2, 2).x;
        let mut beam = Beam::paddle_laser(PADDLE_BEAM_DAMAGE_PER_SEC);
        let origin = beam.paddle_origin_segments(&paddle);
        let mut events = Vec::new();
        beam.build_and_update(origin, &level, None, &mut paddle, &mut events);

        assert_eq!(beam.parts.len(), 4);
        let split = &beam.parts[2];
        assert_eq!(split.ignore_piece, Some((2, 2)));
        assert!((split.radius - (beam.parts[0].radius / 3.0).max(MIN_BEAM_RADIUS)).abs() < 1e-5);
        assert!((split.damage_per_sec - MIN_DAMAGE_PER_SEC).abs() < 1e-5);
    }

    #[test]
    fn test_reflected_beam_blocked_by_paddle() {
        let level = GameLevel::from_layout(&["....", "....", "....", "....", "...."]).expect("valid layout");
        let mut paddle = paddle_for(&level);
        // A split heading back down, as if a prism above had bent it
        let mut beam = Beam::paddle_laser(40.0);
        let seg = BeamSegment::new(
            Ray2D::new(Vec2::new(paddle.center.x, 4.0), Vec2::NEG_Y),
            0.3,
            40.0,
            None,
        );
        let mut events = Vec::new();
        beam.build_and_update(vec![seg], &level, None, &mut paddle, &mut events);
        assert_eq!(beam.parts.len(), 1);
        assert!((beam.parts[0].end_point().y - (PADDLE_Y + PADDLE_HALF_HEIGHT)).abs() < 1e-4);
        assert_eq!(paddle.beams_blocked, 1);
    }

    #[test]
    fn test_alpha_fades_at_end() {
        let mut beam = Beam::new(50.0, 1.0);
        assert!(!beam.tick(0.2));
        assert_eq!(beam.alpha, 1.0);
        assert!(!beam.tick(0.4));
        assert!(beam.alpha < 1.0 && beam.alpha > 0.0);
        assert!(beam.alpha_dirty);
        assert!(!beam.tick(0.5));
        assert_eq!(beam.alpha, 0.0);
        assert!(beam.tick(0.1));
    }

    #[test]
    fn test_beam_damage_reaches_block() {
        let mut level = GameLevel::from_layout(&["...", ".r.", "...", "..."]).expect("valid layout");
        let mut paddle = paddle_for(&level);
        let mut beam = Beam::paddle_laser(PADDLE_BEAM_DAMAGE_PER_SEC);
        let origin = beam.paddle_origin_segments(&paddle);
        let mut events = Vec::new();
        beam.build_and_update(origin, &level, None, &mut paddle, &mut events);
        let mut fb = LevelFeedback::default();
        for _ in 0..25 {
            beam.apply_damage(0.1, &mut level, None, &mut fb);
        }
        assert!(fb.events.contains(&GameEvent::PieceChanged { w: 1, h: 2 }));
    }
}
