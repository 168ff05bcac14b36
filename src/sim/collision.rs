//! 2D collision geometry
//!
//! Every physical interaction in the game reduces to a handful of shapes:
//! line segments (piece and paddle edges), circles (balls), rays (beams,
//! level queries) and axis-aligned boxes (broad phase). This module holds
//! those shapes and the tests between them.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::EPSILON;
use crate::{rotate_about, rotate_deg};

/// Result of a swept ball collision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionResult {
    /// Unit surface normal to reflect off
    pub normal: Vec2,
    /// Tangent line through the contact, perpendicular to `normal`
    pub line: LineSeg2D,
    /// Seconds from the start of the sweep until contact
    pub time: f32,
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb2D {
    pub min: Vec2,
    pub max: Vec2,
}

impl Default for Aabb2D {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb2D {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// An inverted box that any added point will replace
    pub fn empty() -> Self {
        Self {
            min: Vec2::splat(f32::MAX),
            max: Vec2::splat(f32::MIN),
        }
    }

    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn add_point(&mut self, p: Vec2) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn add_aabb(&mut self, other: &Aabb2D) {
        if other.is_empty() {
            return;
        }
        self.add_point(other.min);
        self.add_point(other.max);
    }

    pub fn add_circle(&mut self, c: &Circle2D) {
        self.add_point(c.center - Vec2::splat(c.radius));
        self.add_point(c.center + Vec2::splat(c.radius));
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn translate(&mut self, v: Vec2) {
        self.min += v;
        self.max += v;
    }

    /// Corners in counter-clockwise order starting bottom-left
    pub fn corners(&self) -> [Vec2; 4] {
        [
            self.min,
            Vec2::new(self.max.x, self.min.y),
            self.max,
            Vec2::new(self.min.x, self.max.y),
        ]
    }
}

/// Line segment from `p1` to `p2`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineSeg2D {
    pub p1: Vec2,
    pub p2: Vec2,
}

impl LineSeg2D {
    pub fn new(p1: Vec2, p2: Vec2) -> Self {
        Self { p1, p2 }
    }

    /// Unit normal: `p1 - p2` rotated a quarter turn counter-clockwise
    pub fn normal_to_line(&self) -> Vec2 {
        (self.p1 - self.p2).perp().normalize_or_zero()
    }

    pub fn length(&self) -> f32 {
        (self.p2 - self.p1).length()
    }

    pub fn midpoint(&self) -> Vec2 {
        (self.p1 + self.p2) * 0.5
    }

    pub fn rotate(&mut self, deg: f32, center: Vec2) {
        self.p1 = rotate_about(self.p1, center, deg);
        self.p2 = rotate_about(self.p2, center, deg);
    }

    pub fn translate(&mut self, v: Vec2) {
        self.p1 += v;
        self.p2 += v;
    }

    pub fn translated(&self, v: Vec2) -> Self {
        Self::new(self.p1 + v, self.p2 + v)
    }

    /// Mirror both endpoints across the y axis
    pub fn reflect_x(&mut self) {
        self.p1.x = -self.p1.x;
        self.p2.x = -self.p2.x;
    }
}

/// Ray with a unit direction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ray2D {
    pub origin: Vec2,
    unit_dir: Vec2,
}

impl Ray2D {
    pub fn new(origin: Vec2, unit_dir: Vec2) -> Self {
        debug_assert!(
            (unit_dir.length() - 1.0).abs() < 1e-3,
            "ray direction must be unit length"
        );
        Self { origin, unit_dir }
    }

    pub fn unit_dir(&self) -> Vec2 {
        self.unit_dir
    }

    pub fn set_unit_dir(&mut self, dir: Vec2) {
        debug_assert!((dir.length() - 1.0).abs() < 1e-3);
        self.unit_dir = dir;
    }

    pub fn point_at(&self, t: f32) -> Vec2 {
        self.origin + t * self.unit_dir
    }

    /// Same ray rotated about its origin
    pub fn rotated(&self, deg: f32) -> Self {
        Self::new(self.origin, rotate_deg(self.unit_dir, deg).normalize())
    }
}

/// Circle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle2D {
    pub center: Vec2,
    pub radius: f32,
}

impl Circle2D {
    pub fn new(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Where a circle `c` moving by `velocity * dt` first touches this one
    ///
    /// Returns the contact center of `c`, the distance travelled to reach it and
    /// the full move distance.
    fn sweep_contact(&self, dt: f32, c: &Circle2D, velocity: Vec2) -> Option<(Vec2, f32, f32)> {
        debug_assert!(c.radius > 0.0);
        let move_vec = dt * velocity;
        if move_vec == Vec2::ZERO {
            return None;
        }

        let move_dist = move_vec.length();
        let sum_radii = c.radius + self.radius;
        let gap = (c.center - self.center).length() - sum_radii;
        if move_dist < gap {
            return None;
        }

        let move_dir = move_vec / move_dist;
        let c_vec = self.center - c.center;
        let d = move_dir.dot(c_vec);
        if d <= 0.0 {
            // Moving apart
            return None;
        }

        let f = c_vec.length_squared() - d * d;
        let sq_sum_radii = sum_radii * sum_radii;
        if f >= sq_sum_radii {
            return None;
        }

        let t = sq_sum_radii - f;
        let contact_dist = d - t.sqrt();
        if move_dist < contact_dist {
            return None;
        }

        Some((c.center + contact_dist * move_dir, contact_dist, move_dist))
    }

    /// Sweep a circle `c` at `velocity` against this static circle
    ///
    /// Returns the collision and the center of `c` at contact.
    pub fn sweep_collide(&self, dt: f32, c: &Circle2D, velocity: Vec2) -> Option<(CollisionResult, Vec2)> {
        let (c_center, contact_dist, _) = self.sweep_contact(dt, c, velocity)?;
        let normal = (c_center - self.center).normalize_or_zero();
        if normal == Vec2::ZERO {
            return None;
        }
        let line = tangent_line(c_center - c.radius * normal, normal);
        Some((
            CollisionResult {
                normal,
                line,
                time: contact_dist / velocity.length(),
            },
            c_center,
        ))
    }

    /// Sweep a circle `c` at `velocity` against this circle moving at `self_velocity`
    ///
    /// Solved in the frame of this circle, then mapped back. Returns the
    /// collision plus both centers at contact (`c` first).
    pub fn sweep_collide_moving(
        &self,
        dt: f32,
        c: &Circle2D,
        velocity: Vec2,
        self_velocity: Vec2,
    ) -> Option<(CollisionResult, Vec2, Vec2)> {
        if self_velocity == Vec2::ZERO {
            return self
                .sweep_collide(dt, c, velocity)
                .map(|(hit, c_center)| (hit, c_center, self.center));
        }
        if velocity == Vec2::ZERO {
            return None;
        }

        let relative = velocity - self_velocity;
        let (_, contact_dist, move_dist) = self.sweep_contact(dt, c, relative)?;
        let fract = if move_dist >= EPSILON { contact_dist / move_dist } else { 0.0 };

        let c_center = c.center + fract * dt * velocity;
        let self_center = self.center + fract * dt * self_velocity;
        let normal = (c_center - self_center).normalize_or_zero();
        if normal == Vec2::ZERO {
            return None;
        }
        let line = tangent_line(c_center - c.radius * normal, normal);
        Some((
            CollisionResult {
                normal,
                line,
                time: fract * dt,
            },
            c_center,
            self_center,
        ))
    }
}

/// Unit-length line through `at` perpendicular to `normal`
pub fn tangent_line(at: Vec2, normal: Vec2) -> LineSeg2D {
    let dir = normal.perp();
    LineSeg2D::new(at + dir, at - dir)
}

/// Twice the signed area of triangle (a, b, c)
///
/// Positive when counter-clockwise.
#[inline]
pub fn signed_tri_area2(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (a.x - c.x) * (b.y - c.y) - (a.y - c.y) * (b.x - c.x)
}

/// Squared distance from a point to a line segment
pub fn sq_dist_point_to_segment(seg: &LineSeg2D, p: Vec2) -> f32 {
    let ab = seg.p2 - seg.p1;
    let ac = p - seg.p1;
    let bc = p - seg.p2;

    let e = ac.dot(ab);
    if e <= EPSILON {
        return ac.dot(ac);
    }
    let f = ab.dot(ab);
    if e >= f {
        return bc.dot(bc);
    }
    (ac.dot(ac) - e * e / f).abs()
}

/// Squared distance from a point to a box (zero inside)
pub fn sq_dist_point_to_aabb(aabb: &Aabb2D, p: Vec2) -> f32 {
    let below = (aabb.min - p).max(Vec2::ZERO);
    let above = (p - aabb.max).max(Vec2::ZERO);
    below.length_squared() + above.length_squared()
}

pub fn aabbs_overlap(a: &Aabb2D, b: &Aabb2D) -> bool {
    !(a.max.x < b.min.x || a.min.x > b.max.x || a.max.y < b.min.y || a.min.y > b.max.y)
}

pub fn circles_overlap(a: &Circle2D, b: &Circle2D) -> bool {
    let r = a.radius + b.radius;
    (a.center - b.center).length_squared() <= r * r
}

pub fn aabb_circle_overlap(aabb: &Aabb2D, c: &Circle2D) -> bool {
    sq_dist_point_to_aabb(aabb, c.center) <= c.radius * c.radius
}

/// Whether two segments properly cross
///
/// Touching endpoints and collinear overlap do not count.
pub fn segments_intersect(l1: &LineSeg2D, l2: &LineSeg2D) -> bool {
    segment_intersection(l1, l2).is_some()
}

/// Crossing point of two segments, if they properly cross
pub fn segment_intersection(l1: &LineSeg2D, l2: &LineSeg2D) -> Option<Vec2> {
    let a1 = signed_tri_area2(l1.p1, l1.p2, l2.p2);
    let a2 = signed_tri_area2(l1.p1, l1.p2, l2.p1);
    if a1 == 0.0 || a2 == 0.0 || a1 * a2 >= 0.0 {
        return None;
    }
    let a3 = signed_tri_area2(l2.p1, l2.p2, l1.p1);
    let a4 = a3 + a2 - a1;
    if a3 == 0.0 || a4 == 0.0 || a3 * a4 >= 0.0 {
        return None;
    }
    let t = a3 / (a3 - a4);
    Some(l1.p1 + t * (l1.p2 - l1.p1))
}

/// First point along a segment (from `p1`) that lies in a circle
pub fn circle_segment_first_point(c: &Circle2D, seg: &LineSeg2D) -> Option<Vec2> {
    let d = seg.p2 - seg.p1;
    let len = d.length();
    if len <= 0.0 {
        return None;
    }
    let d = d / len;

    let m = seg.p1 - c.center;
    let b = m.dot(d);
    let cc = m.dot(m) - c.radius * c.radius;
    if cc > 0.0 && b > 0.0 {
        return None;
    }
    let discr = b * b - cc;
    if discr < 0.0 {
        return None;
    }

    let t = -b - discr.sqrt();
    if t > len {
        return None;
    }
    Some(seg.p1 + t.max(0.0) * d)
}

/// Slab test of a ray against a box, returning the entry parameter
///
/// A ray starting inside the box hits at `t = 0`.
pub fn ray_aabb(ray: &Ray2D, aabb: &Aabb2D) -> Option<f32> {
    let origin = ray.origin.to_array();
    let dir = ray.unit_dir().to_array();
    let min = aabb.min.to_array();
    let max = aabb.max.to_array();

    let mut t_min = 0.0_f32;
    let mut t_max = f32::MAX;
    for i in 0..2 {
        if dir[i].abs() < EPSILON {
            if origin[i] < min[i] || origin[i] > max[i] {
                return None;
            }
        } else {
            let ood = 1.0 / dir[i];
            let mut t1 = (min[i] - origin[i]) * ood;
            let mut t2 = (max[i] - origin[i]) * ood;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }
    }
    Some(t_min)
}

/// Where a segment first enters a box
pub fn segment_aabb_point(aabb: &Aabb2D, seg: &LineSeg2D) -> Option<Vec2> {
    let len = seg.length();
    if len <= 0.0 {
        return None;
    }
    let ray = Ray2D::new(seg.p1, (seg.p2 - seg.p1) / len);
    let t = ray_aabb(&ray, aabb)?;
    (t <= len).then(|| ray.point_at(t))
}

pub fn segment_hits_aabb(seg: &LineSeg2D, aabb: &Aabb2D) -> bool {
    segment_aabb_point(aabb, seg).is_some()
}

/// Ray against segment, returning `(ray_t, line_t)`
///
/// Parallel rays never hit. `line_t` is allowed a small tolerance past each
/// end so beams do not slip between adjoining edges.
pub fn ray_segment(ray: &Ray2D, seg: &LineSeg2D) -> Option<(f32, f32)> {
    let d1 = seg.p2 - seg.p1;
    let d0 = ray.unit_dir();

    let perp_d1 = Vec2::new(d1.y, -d1.x);
    let denom = perp_d1.dot(d0);
    if denom.abs() < EPSILON {
        return None;
    }

    let perp_d0 = Vec2::new(d0.y, -d0.x);
    let p1_minus_p0 = seg.p1 - ray.origin;
    let ray_t = perp_d1.dot(p1_minus_p0) / denom;
    let line_t = perp_d0.dot(p1_minus_p0) / denom;

    (ray_t >= 0.0 && line_t >= -EPSILON && line_t <= 1.0 + EPSILON).then_some((ray_t, line_t))
}

/// Ray against circle; origins inside the circle hit at `t = 0`
pub fn ray_circle(ray: &Ray2D, c: &Circle2D) -> Option<f32> {
    let m = ray.origin - c.center;
    let b = m.dot(ray.unit_dir());
    let cc = m.dot(m) - c.radius * c.radius;
    if cc > 0.0 && b > 0.0 {
        return None;
    }
    let discr = b * b - cc;
    if discr < 0.0 {
        return None;
    }
    Some((-b - discr.sqrt()).max(0.0))
}

/// Closest point on a segment to `p`
pub fn closest_point_on_segment(p: Vec2, seg: &LineSeg2D) -> Vec2 {
    closest_point_must_be_on_segment(p, seg).0
}

/// Closest point on a segment to `p`, and whether the projection of `p`
/// already fell within the segment (no clamping needed)
pub fn closest_point_must_be_on_segment(p: Vec2, seg: &LineSeg2D) -> (Vec2, bool) {
    let dir = seg.p2 - seg.p1;
    let len_sq = dir.dot(dir);
    if len_sq <= 0.0 {
        return (seg.p1, false);
    }
    let t = (p - seg.p1).dot(dir) / len_sq;
    let on_segment = (0.0..=1.0).contains(&t);
    (seg.p1 + t.clamp(0.0, 1.0) * dir, on_segment)
}

/// Closest points between two segments and their squared distance
pub fn closest_points_between_segments(s1: &LineSeg2D, s2: &LineSeg2D) -> (f32, Vec2, Vec2) {
    let d1 = s1.p2 - s1.p1;
    let d2 = s2.p2 - s2.p1;
    let r = s1.p1 - s2.p1;

    let a = d1.dot(d1);
    let e = d2.dot(d2);
    let f = d2.dot(r);

    if a <= EPSILON && e <= EPSILON {
        return ((s1.p1 - s2.p1).length_squared(), s1.p1, s2.p1);
    }

    let (s, t);
    if a <= EPSILON {
        s = 0.0;
        t = (f / e).clamp(0.0, 1.0);
    } else {
        let c = d1.dot(r);
        if e <= EPSILON {
            t = 0.0;
            s = (-c / a).clamp(0.0, 1.0);
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            let s0 = if denom != 0.0 {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let t0 = (b * s0 + f) / e;
            if t0 < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t0 > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            } else {
                t = t0;
                s = s0;
            }
        }
    }

    let c1 = s1.p1 + s * d1;
    let c2 = s2.p1 + t * d2;
    ((c1 - c2).length_squared(), c1, c2)
}
