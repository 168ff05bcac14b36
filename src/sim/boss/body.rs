//! Boss bodies: an arena of parts linked by parent and child indices
//!
//! Index 0 is always the root composite. Composite parts only group children;
//! basic parts and weakpoints carry bounding lines in their local frame.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::rotate_about;
use crate::sim::ball::GameBall;
use crate::sim::bounds::BoundingLines;
use crate::sim::collision::{Aabb2D, CollisionResult, LineSeg2D, Ray2D};

/// Seconds a weakpoint ignores further hits after taking damage
pub const WEAKPOINT_INVULNERABLE_SECS: f32 = 1.5;

/// Closed outline through counter-clockwise `points`, normals facing out
pub fn polygon(points: &[Vec2]) -> BoundingLines {
    let mut b = BoundingLines::default();
    for (i, &p1) in points.iter().enumerate() {
        let p2 = points[(i + 1) % points.len()];
        let edge = p2 - p1;
        b.push(LineSeg2D::new(p1, p2), Vec2::new(edge.y, -edge.x).normalize_or_zero());
    }
    b
}

/// Diamond with its points on the axes
pub fn diamond(width: f32, height: f32) -> BoundingLines {
    let (hw, hh) = (width * 0.5, height * 0.5);
    polygon(&[
        Vec2::new(0.0, -hh),
        Vec2::new(hw, 0.0),
        Vec2::new(0.0, hh),
        Vec2::new(-hw, 0.0),
    ])
}

/// Isosceles triangle spanning `bottom..top` in y; the apex is at `top`
/// when `apex_up`, at `bottom` otherwise
pub fn triangle(width: f32, bottom: f32, top: f32, apex_up: bool) -> BoundingLines {
    let hw = width * 0.5;
    if apex_up {
        polygon(&[Vec2::new(-hw, bottom), Vec2::new(hw, bottom), Vec2::new(0.0, top)])
    } else {
        polygon(&[Vec2::new(0.0, bottom), Vec2::new(hw, top), Vec2::new(-hw, top)])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weakpoint {
    pub total_life: f32,
    pub curr_life: f32,
    pub dmg_on_ball_hit: f32,
    pub invulnerable_timer: f32,
    pub total_invulnerable: f32,
}

impl Weakpoint {
    pub fn new(life: f32, dmg_on_ball_hit: f32) -> Self {
        Self {
            total_life: life,
            curr_life: life,
            dmg_on_ball_hit,
            invulnerable_timer: 0.0,
            total_invulnerable: WEAKPOINT_INVULNERABLE_SECS,
        }
    }

    pub fn is_invulnerable(&self) -> bool {
        self.invulnerable_timer > 0.0
    }

    pub fn life_fraction(&self) -> f32 {
        if self.total_life <= 0.0 {
            return 0.0;
        }
        self.curr_life / self.total_life
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PartKind {
    Composite,
    Basic,
    Weakpoint(Weakpoint),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyPart {
    pub kind: PartKind,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    local_bounds: BoundingLines,
    translation: Vec2,
    rotation_deg: f32,
    pub destroyed: bool,
    pub collisions_disabled: bool,
    /// Velocity used when sweeping balls against this part
    pub collision_velocity: Vec2,
}

impl BodyPart {
    fn new(kind: PartKind, parent: Option<usize>, local_bounds: BoundingLines) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
            local_bounds,
            translation: Vec2::ZERO,
            rotation_deg: 0.0,
            destroyed: false,
            collisions_disabled: false,
            collision_velocity: Vec2::ZERO,
        }
    }

    pub fn translation(&self) -> Vec2 {
        self.translation
    }

    pub fn rotation_deg(&self) -> f32 {
        self.rotation_deg
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.kind, PartKind::Composite)
    }

    pub fn weakpoint(&self) -> Option<&Weakpoint> {
        match &self.kind {
            PartKind::Weakpoint(w) => Some(w),
            _ => None,
        }
    }

    /// Local bounds spun by the part's rotation, then moved into place
    pub fn world_bounds(&self) -> BoundingLines {
        self.local_bounds
            .rotated(self.rotation_deg, Vec2::ZERO)
            .translated(self.translation)
    }

    fn collidable(&self) -> bool {
        !self.is_composite() && !self.destroyed && !self.collisions_disabled
    }
}

/// Outcome of trying to hurt a weakpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeakpointHit {
    /// Not a weakpoint, invulnerable, or no damage
    Ignored,
    Hurt,
    Destroyed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BossBody {
    parts: Vec<BodyPart>,
}

impl Default for BossBody {
    fn default() -> Self {
        Self::new()
    }
}

impl BossBody {
    pub const ROOT: usize = 0;

    pub fn new() -> Self {
        Self {
            parts: vec![BodyPart::new(PartKind::Composite, None, BoundingLines::default())],
        }
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn part(&self, idx: usize) -> Option<&BodyPart> {
        self.parts.get(idx)
    }

    fn push(&mut self, parent: usize, part: BodyPart) -> usize {
        let idx = self.parts.len();
        self.parts.push(part);
        if let Some(p) = self.parts.get_mut(parent) {
            p.children.push(idx);
        }
        idx
    }

    pub fn add_composite(&mut self, parent: usize) -> usize {
        self.push(parent, BodyPart::new(PartKind::Composite, Some(parent), BoundingLines::default()))
    }

    pub fn add_basic(&mut self, parent: usize, local_bounds: BoundingLines) -> usize {
        self.push(parent, BodyPart::new(PartKind::Basic, Some(parent), local_bounds))
    }

    /// `idx` followed by all of its descendants, depth first
    fn subtree(&self, idx: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack = vec![idx];
        while let Some(i) = stack.pop() {
            if let Some(p) = self.parts.get(i) {
                out.push(i);
                stack.extend(p.children.iter().rev());
            }
        }
        out
    }

    pub fn translate(&mut self, idx: usize, v: Vec2) {
        for i in self.subtree(idx) {
            self.parts[i].translation += v;
        }
    }

    /// Spin a part and everything under it about the part's own position
    pub fn rotate_z(&mut self, idx: usize, deg: f32) {
        let Some(pivot) = self.parts.get(idx).map(|p| p.translation) else {
            return;
        };
        for i in self.subtree(idx) {
            let part = &mut self.parts[i];
            part.rotation_deg += deg;
            part.translation = rotate_about(part.translation, pivot, deg);
        }
    }

    pub fn world_bounds(&self, idx: usize) -> BoundingLines {
        let mut out = BoundingLines::default();
        for i in self.subtree(idx) {
            let p = &self.parts[i];
            if !p.is_composite() && !p.destroyed {
                out.extend(&p.world_bounds());
            }
        }
        out
    }

    pub fn world_aabb(&self, idx: usize) -> Aabb2D {
        self.world_bounds(idx).aabb()
    }

    pub fn set_collision_velocity(&mut self, idx: usize, v: Vec2) {
        for i in self.subtree(idx) {
            self.parts[i].collision_velocity = v;
        }
    }

    pub fn set_destroyed(&mut self, idx: usize) {
        for i in self.subtree(idx) {
            self.parts[i].destroyed = true;
        }
    }

    pub fn set_collisions_disabled(&mut self, idx: usize, disabled: bool) {
        for i in self.subtree(idx) {
            self.parts[i].collisions_disabled = disabled;
        }
    }

    /// A composite is destroyed once every non-composite part under it is
    pub fn is_destroyed(&self, idx: usize) -> bool {
        let Some(part) = self.parts.get(idx) else {
            return true;
        };
        if !part.is_composite() {
            return part.destroyed;
        }
        self.subtree(idx)
            .into_iter()
            .filter(|&i| !self.parts[i].is_composite())
            .all(|i| self.parts[i].destroyed)
    }

    /// Move a part from the alive tree under `new_parent`
    pub fn reparent(&mut self, idx: usize, new_parent: usize) {
        let Some(old) = self.parts.get(idx).and_then(|p| p.parent) else {
            return;
        };
        self.parts[old].children.retain(|&c| c != idx);
        self.parts[idx].parent = Some(new_parent);
        self.parts[new_parent].children.push(idx);
    }

    /// Earliest ball contact with any live part under `idx`
    pub fn collide_ball(&self, idx: usize, ball: &GameBall, dt: f32) -> Option<(usize, CollisionResult)> {
        let mut best: Option<(usize, CollisionResult)> = None;
        for i in self.subtree(idx) {
            let p = &self.parts[i];
            if !p.collidable() {
                continue;
            }
            let hit = p
                .world_bounds()
                .collide_moving(dt, &ball.bounds, ball.velocity(), p.collision_velocity);
            if let Some(res) = hit
                && best.is_none_or(|(_, b)| res.time < b.time)
            {
                best = Some((i, res));
            }
        }
        best
    }

    /// Part with the smallest ray parameter under `idx`
    pub fn ray_hit(&self, idx: usize, ray: &Ray2D) -> Option<(usize, f32)> {
        let mut best: Option<(usize, f32)> = None;
        for i in self.subtree(idx) {
            let p = &self.parts[i];
            if !p.collidable() {
                continue;
            }
            if let Some(t) = p.world_bounds().ray_hit(ray)
                && best.is_none_or(|(_, bt)| t < bt)
            {
                best = Some((i, t));
            }
        }
        best
    }

    /// Parts under `idx` whose bounds touch `aabb`
    pub fn hits_aabb(&self, idx: usize, aabb: &Aabb2D) -> Option<usize> {
        self.subtree(idx)
            .into_iter()
            .find(|&i| self.parts[i].collidable() && self.parts[i].world_bounds().hits_aabb(aabb))
    }

    pub fn convert_to_weakpoint(&mut self, idx: usize, life: f32, dmg_on_ball_hit: f32) {
        if let Some(p) = self.parts.get_mut(idx)
            && !p.is_composite()
        {
            p.kind = PartKind::Weakpoint(Weakpoint::new(life, dmg_on_ball_hit));
        }
    }

    /// Take `amount` off a weakpoint's life
    ///
    /// Beams pass `ignore_invulnerable` and leave the invulnerable timer alone.
    pub fn diminish(&mut self, idx: usize, amount: f32, ignore_invulnerable: bool) -> WeakpointHit {
        let Some(part) = self.parts.get_mut(idx) else {
            return WeakpointHit::Ignored;
        };
        if part.destroyed {
            return WeakpointHit::Ignored;
        }
        let PartKind::Weakpoint(wp) = &mut part.kind else {
            return WeakpointHit::Ignored;
        };
        if amount <= 0.0 || (!ignore_invulnerable && wp.is_invulnerable()) {
            return WeakpointHit::Ignored;
        }
        wp.curr_life = (wp.curr_life - amount).max(0.0);
        if wp.curr_life <= 0.0 {
            part.destroyed = true;
            return WeakpointHit::Destroyed;
        }
        if !ignore_invulnerable {
            wp.invulnerable_timer = wp.total_invulnerable;
        }
        WeakpointHit::Hurt
    }

    pub fn dmg_on_ball_hit(&self, idx: usize) -> f32 {
        self.parts
            .get(idx)
            .and_then(BodyPart::weakpoint)
            .map_or(0.0, |w| w.dmg_on_ball_hit)
    }

    pub fn life_fraction(&self, idx: usize) -> f32 {
        self.parts
            .get(idx)
            .and_then(BodyPart::weakpoint)
            .map_or(0.0, Weakpoint::life_fraction)
    }

    /// Count down weakpoint invulnerability
    pub fn tick(&mut self, dt: f32) {
        for part in self.parts.iter_mut() {
            if let PartKind::Weakpoint(wp) = &mut part.kind {
                wp.invulnerable_timer = (wp.invulnerable_timer - dt).max(0.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::ball::{BallSpeed, BallState};

    fn square() -> BoundingLines {
        BoundingLines::rectangle(Vec2::ZERO, 1.0, 1.0)
    }

    #[test]
    fn test_polygon_normals_face_out() {
        for b in [diamond(3.0, 1.5), triangle(4.0, -1.0, 1.0, true), triangle(4.0, -1.0, 1.0, false)] {
            let c = b.aabb().center();
            for (l, n) in b.lines().iter().zip(b.normals()) {
                assert!((l.midpoint() - c).dot(*n) > 0.0);
            }
        }
    }

    #[test]
    fn test_translate_is_recursive() {
        let mut body = BossBody::new();
        let arm = body.add_composite(BossBody::ROOT);
        let hand = body.add_basic(arm, square());
        body.translate(BossBody::ROOT, Vec2::new(5.0, 0.0));
        body.translate(arm, Vec2::new(0.0, 2.0));
        assert_eq!(body.part(hand).map(BodyPart::translation), Some(Vec2::new(5.0, 2.0)));
        let aabb = body.world_aabb(arm);
        assert!((aabb.center() - Vec2::new(5.0, 2.0)).length() < 1e-5);
    }

    #[test]
    fn test_rotate_about_part() {
        let mut body = BossBody::new();
        let arm = body.add_composite(BossBody::ROOT);
        let hand = body.add_basic(arm, square());
        body.translate(hand, Vec2::new(2.0, 0.0));
        body.rotate_z(arm, 90.0);
        let t = body.part(hand).map(BodyPart::translation).unwrap_or_default();
        assert!((t - Vec2::new(0.0, 2.0)).length() < 1e-5);
    }

    #[test]
    fn test_weakpoint_invulnerability() {
        let mut body = BossBody::new();
        let eye = body.add_basic(BossBody::ROOT, square());
        assert_eq!(body.diminish(eye, 50.0, false), WeakpointHit::Ignored);

        body.convert_to_weakpoint(eye, 200.0, 100.0);
        assert_eq!(body.diminish(eye, 100.0, false), WeakpointHit::Hurt);
        assert_eq!(body.diminish(eye, 100.0, false), WeakpointHit::Ignored);
        assert_eq!(body.diminish(eye, 0.0, true), WeakpointHit::Ignored);

        body.tick(WEAKPOINT_INVULNERABLE_SECS);
        assert_eq!(body.diminish(eye, 150.0, false), WeakpointHit::Destroyed);
        assert_eq!(body.life_fraction(eye), 0.0);
        assert!(body.is_destroyed(eye));
    }

    #[test]
    fn test_beam_damage_ignores_invulnerability() {
        let mut body = BossBody::new();
        let eye = body.add_basic(BossBody::ROOT, square());
        body.convert_to_weakpoint(eye, 100.0, 50.0);
        body.diminish(eye, 10.0, false);
        assert_eq!(body.diminish(eye, 10.0, true), WeakpointHit::Hurt);
        assert!((body.life_fraction(eye) - 0.8).abs() < 1e-5);
    }

    #[test]
    fn test_weakpoint_hit_serializes_by_name() {
        let json = serde_json::to_string(&WeakpointHit::Destroyed).expect("serialize");
        assert_eq!(json, "\"Destroyed\"");
        let back: WeakpointHit = serde_json::from_str("\"Hurt\"").expect("deserialize");
        assert_eq!(back, WeakpointHit::Hurt);
    }

    #[test]
    fn test_composite_destroyed_when_children_are() {
        let mut body = BossBody::new();
        let arm = body.add_composite(BossBody::ROOT);
        let a = body.add_basic(arm, square());
        let b = body.add_basic(arm, square());
        body.set_destroyed(a);
        assert!(!body.is_destroyed(arm));
        body.set_destroyed(b);
        assert!(body.is_destroyed(arm));
    }

    #[test]
    fn test_ball_and_ray_skip_destroyed_parts() {
        let mut body = BossBody::new();
        let near = body.add_basic(BossBody::ROOT, square());
        let far = body.add_basic(BossBody::ROOT, square());
        body.translate(far, Vec2::new(0.0, 4.0));

        let ray = Ray2D::new(Vec2::new(0.0, -5.0), Vec2::Y);
        assert_eq!(body.ray_hit(BossBody::ROOT, &ray).map(|(i, _)| i), Some(near));
        body.set_destroyed(near);
        assert_eq!(body.ray_hit(BossBody::ROOT, &ray).map(|(i, _)| i), Some(far));

        let mut ball = GameBall::new(1, Vec2::new(0.0, 1.8));
        ball.state = BallState::InPlay;
        ball.set_velocity(BallSpeed::Normal, Vec2::Y);
        let (idx, res) = body.collide_ball(BossBody::ROOT, &ball, 0.1).expect("hit");
        assert_eq!(idx, far);
        assert!((res.normal - Vec2::NEG_Y).length() < 1e-4);
    }
}
