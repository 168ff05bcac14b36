//! Bounding lines: polygon-like outlines made of segments with outward normals
//!
//! Pieces, the paddle and boss body parts all collide through these. Lines
//! are not required to form a closed loop; pieces only emit the edges that
//! face open space.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::{
    Aabb2D, Circle2D, CollisionResult, LineSeg2D, Ray2D, circle_segment_first_point,
    closest_point_on_segment, ray_segment, segment_aabb_point, segment_hits_aabb,
    segment_intersection, segments_intersect, sq_dist_point_to_segment, tangent_line,
};
use crate::rotate_deg;

/// Samples taken along a ball's movement per collision test
const NUM_COLLISION_SAMPLES: usize = 16;
/// Lines whose closest point is within this radius of the nearest one also
/// contribute their normal (corner hits average two edges)
const SQR_EPSILON_RADIUS: f32 = 0.08 * 0.08;

/// Segments paired with their outward unit normals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingLines {
    lines: Vec<LineSeg2D>,
    normals: Vec<Vec2>,
}

impl BoundingLines {
    pub fn new(lines: Vec<LineSeg2D>, normals: Vec<Vec2>) -> Self {
        debug_assert_eq!(lines.len(), normals.len(), "every line needs a normal");
        Self { lines, normals }
    }

    /// Closed axis-aligned rectangle with normals facing out
    pub fn rectangle(center: Vec2, half_w: f32, half_h: f32) -> Self {
        let mut b = Self::default();
        let bl = center + Vec2::new(-half_w, -half_h);
        let br = center + Vec2::new(half_w, -half_h);
        let tr = center + Vec2::new(half_w, half_h);
        let tl = center + Vec2::new(-half_w, half_h);
        b.push(LineSeg2D::new(tl, bl), Vec2::NEG_X);
        b.push(LineSeg2D::new(bl, br), Vec2::NEG_Y);
        b.push(LineSeg2D::new(br, tr), Vec2::X);
        b.push(LineSeg2D::new(tr, tl), Vec2::Y);
        b
    }

    pub fn push(&mut self, line: LineSeg2D, normal: Vec2) {
        self.lines.push(line);
        self.normals.push(normal);
    }

    pub fn extend(&mut self, other: &BoundingLines) {
        self.lines.extend_from_slice(&other.lines);
        self.normals.extend_from_slice(&other.normals);
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.normals.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn lines(&self) -> &[LineSeg2D] {
        &self.lines
    }

    pub fn normals(&self) -> &[Vec2] {
        &self.normals
    }

    pub fn line(&self, idx: usize) -> Option<&LineSeg2D> {
        self.lines.get(idx)
    }

    pub fn normal(&self, idx: usize) -> Option<Vec2> {
        self.normals.get(idx).copied()
    }

    /// Box around every endpoint; empty for no lines
    pub fn aabb(&self) -> Aabb2D {
        let mut aabb = Aabb2D::empty();
        for l in &self.lines {
            aabb.add_point(l.p1);
            aabb.add_point(l.p2);
        }
        aabb
    }

    /// Approximate bounding circle spanning the widest axis
    pub fn bounding_circle(&self) -> Circle2D {
        let Some(first) = self.lines.first() else {
            return Circle2D::new(Vec2::ZERO, 0.0);
        };

        let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.p1, first.p1, first.p1, first.p1);
        for p in self.lines.iter().flat_map(|l| [l.p1, l.p2]) {
            if p.x < min_x.x {
                min_x = p;
            }
            if p.x > max_x.x {
                max_x = p;
            }
            if p.y < min_y.y {
                min_y = p;
            }
            if p.y > max_y.y {
                max_y = p;
            }
        }

        let (min, max) = if (max_y - min_y).length_squared() > (max_x - min_x).length_squared() {
            (min_y, max_y)
        } else {
            (min_x, max_x)
        };
        let center = 0.5 * (min + max);
        Circle2D::new(center, (max - center).length())
    }

    /// Sampled sweep of a circle moving at `velocity` over `dt`
    ///
    /// Walks the movement in fixed samples from the circle's current center and
    /// stops at the first sample touching any line. Among the touched lines,
    /// those nearly as close as the nearest contribute to an averaged normal.
    pub fn collide(&self, dt: f32, c: &Circle2D, velocity: Vec2) -> Option<CollisionResult> {
        let zero_velocity = velocity == Vec2::ZERO;
        let samples = if zero_velocity { 1 } else { NUM_COLLISION_SAMPLES };
        let step = dt * velocity / samples as f32;
        let step_time = dt / samples as f32;

        let mut sample_pt = c.center;
        let mut elapsed = 0.0;
        let mut touched: Vec<(usize, Vec2)> = Vec::new();
        let mut contact = Vec2::ZERO;

        for _ in 0..samples {
            let sample = Circle2D::new(sample_pt, c.radius);
            for (idx, line) in self.lines.iter().enumerate() {
                if let Some(p) = circle_segment_first_point(&sample, line) {
                    contact = p;
                    touched.push((idx, closest_point_on_segment(sample_pt, line)));
                }
            }
            if !touched.is_empty() {
                break;
            }
            sample_pt += step;
            elapsed += step_time;
        }

        let (first_idx, _) = *touched.first()?;

        let normal = if zero_velocity {
            self.normals[first_idx]
        } else {
            let lowest = touched
                .iter()
                .map(|(_, p)| sample_pt.distance_squared(*p))
                .fold(f32::MAX, f32::min)
                + SQR_EPSILON_RADIUS;
            touched
                .iter()
                .filter(|(_, p)| sample_pt.distance_squared(*p) <= lowest)
                .map(|(idx, _)| self.normals[*idx])
                .sum::<Vec2>()
        };

        if normal == Vec2::ZERO {
            return None;
        }
        let normal = normal.normalize();
        Some(CollisionResult {
            normal,
            line: tangent_line(contact, normal),
            time: elapsed,
        })
    }

    /// Sweep against these lines while they move at `self_velocity`
    ///
    /// The moving-lines case is solved in the lines' frame of reference.
    pub fn collide_moving(
        &self,
        dt: f32,
        c: &Circle2D,
        velocity: Vec2,
        self_velocity: Vec2,
    ) -> Option<CollisionResult> {
        self.collide(dt, c, velocity - self_velocity)
    }

    /// Closest point on any line; `pt` itself when there are no lines
    pub fn closest_point(&self, pt: Vec2) -> Vec2 {
        self.lines
            .iter()
            .map(|l| closest_point_on_segment(pt, l))
            .min_by(|a, b| a.distance_squared(pt).total_cmp(&b.distance_squared(pt)))
            .unwrap_or(pt)
    }

    /// Half-plane test: inside when strictly behind every normal
    pub fn is_inside(&self, pt: Vec2) -> bool {
        self.lines.iter().zip(&self.normals).all(|(line, n)| {
            let mut from_line = pt - line.p1;
            if from_line == Vec2::ZERO {
                from_line = pt - line.p2;
            }
            from_line.dot(*n) < 0.0
        })
    }

    pub fn hits_circle(&self, c: &Circle2D) -> bool {
        let sq_r = c.radius * c.radius;
        self.lines
            .iter()
            .any(|l| closest_point_on_segment(c.center, l).distance_squared(c.center) <= sq_r)
    }

    pub fn hits_aabb(&self, aabb: &Aabb2D) -> bool {
        self.lines.iter().any(|l| segment_hits_aabb(l, aabb))
    }

    pub fn hits_lines(&self, other: &BoundingLines) -> bool {
        self.first_hit_index(other).is_some()
    }

    pub fn hits_segment(&self, seg: &LineSeg2D) -> bool {
        self.lines.iter().any(|l| segments_intersect(l, seg))
    }

    /// Index of the first line here that crosses any line in `other`
    pub fn first_hit_index(&self, other: &BoundingLines) -> Option<usize> {
        self.lines
            .iter()
            .position(|l| other.lines.iter().any(|o| segments_intersect(l, o)))
    }

    /// Sorted indices of every line here that crosses a line in `other`
    pub fn hit_indices(&self, other: &BoundingLines) -> Vec<usize> {
        (0..self.lines.len())
            .filter(|&i| other.lines.iter().any(|o| segments_intersect(&self.lines[i], o)))
            .collect()
    }

    pub fn hit_indices_segment(&self, seg: &LineSeg2D) -> Vec<usize> {
        (0..self.lines.len())
            .filter(|&i| segments_intersect(&self.lines[i], seg))
            .collect()
    }

    /// Indices of the line(s) nearest `pt`, ties within `tolerance`
    pub fn closest_indices(&self, pt: Vec2, tolerance: f32) -> Vec<usize> {
        let mut closest = f32::MAX;
        let mut indices = Vec::new();
        for (i, line) in self.lines.iter().enumerate() {
            let d = sq_dist_point_to_segment(line, pt);
            if d < closest {
                indices.clear();
                indices.push(i);
                closest = d;
            } else if (d - closest).abs() < tolerance {
                indices.push(i);
            }
        }
        indices
    }

    pub fn collision_points_lines(&self, other: &BoundingLines) -> Vec<Vec2> {
        self.lines
            .iter()
            .flat_map(|l| other.lines.iter().filter_map(move |o| segment_intersection(l, o)))
            .collect()
    }

    pub fn collision_points_circle(&self, c: &Circle2D) -> Vec<Vec2> {
        self.lines
            .iter()
            .filter_map(|l| circle_segment_first_point(c, l))
            .collect()
    }

    pub fn collision_points_aabb(&self, aabb: &Aabb2D) -> Vec<Vec2> {
        self.lines
            .iter()
            .filter_map(|l| segment_aabb_point(aabb, l))
            .collect()
    }

    /// Nearest ray parameter over all lines
    pub fn ray_hit(&self, ray: &Ray2D) -> Option<f32> {
        self.lines
            .iter()
            .filter_map(|l| ray_segment(ray, l).map(|(t, _)| t))
            .min_by(f32::total_cmp)
    }

    /// Rotate lines about `center` and normals about the origin
    pub fn rotate(&mut self, deg: f32, center: Vec2) {
        for l in &mut self.lines {
            l.rotate(deg, center);
        }
        for n in &mut self.normals {
            *n = rotate_deg(*n, deg);
        }
    }

    pub fn translate(&mut self, v: Vec2) {
        for l in &mut self.lines {
            l.translate(v);
        }
    }

    pub fn translated(&self, v: Vec2) -> Self {
        let mut b = self.clone();
        b.translate(v);
        b
    }

    pub fn rotated(&self, deg: f32, center: Vec2) -> Self {
        let mut b = self.clone();
        b.rotate(deg, center);
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> BoundingLines {
        BoundingLines::rectangle(Vec2::ZERO, 1.0, 1.0)
    }

    #[test]
    fn test_aabb_and_circle() {
        let b = unit_box();
        let aabb = b.aabb();
        assert_eq!(aabb.min, Vec2::splat(-1.0));
        assert_eq!(aabb.max, Vec2::splat(1.0));
        assert!(b.bounding_circle().radius >= 1.0);

        let empty = BoundingLines::default();
        assert!(empty.aabb().is_empty());
        assert_eq!(empty.bounding_circle().radius, 0.0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "every line needs a normal")]
    fn test_new_rejects_missing_normals() {
        let line = LineSeg2D::new(Vec2::ZERO, Vec2::X);
        BoundingLines::new(vec![line], Vec::new());
    }

    #[test]
    fn test_is_inside() {
        let b = unit_box();
        assert!(b.is_inside(Vec2::ZERO));
        assert!(!b.is_inside(Vec2::new(2.0, 0.0)));
        assert!(!b.is_inside(Vec2::new(1.0, 0.0)));
    }

    #[test]
    fn test_collide_from_above() {
        let b = unit_box();
        let ball = Circle2D::new(Vec2::new(0.0, 2.0), 0.5);
        let hit = b.collide(0.1, &ball, Vec2::new(0.0, -10.0)).unwrap();
        assert!((hit.normal - Vec2::Y).length() < 1e-5);
        assert!(hit.time > 0.0 && hit.time <= 0.1);
    }

    #[test]
    fn test_collide_corner_averages_normals() {
        let b = unit_box();
        // Aim diagonally at the top-right corner
        let ball = Circle2D::new(Vec2::new(1.6, 1.6), 0.5);
        let hit = b.collide(0.1, &ball, Vec2::new(-3.0, -3.0)).unwrap();
        let expected = Vec2::new(1.0, 1.0).normalize();
        assert!((hit.normal - expected).length() < 1e-3);
    }

    #[test]
    fn test_collide_miss() {
        let b = unit_box();
        let ball = Circle2D::new(Vec2::new(0.0, 5.0), 0.5);
        assert!(b.collide(0.1, &ball, Vec2::new(0.0, 10.0)).is_none());
    }

    #[test]
    fn test_collide_zero_velocity_uses_first_line() {
        let b = unit_box();
        let ball = Circle2D::new(Vec2::new(-1.2, 0.0), 0.5);
        let hit = b.collide(0.1, &ball, Vec2::ZERO).unwrap();
        assert_eq!(hit.normal, Vec2::NEG_X);
        assert_eq!(hit.time, 0.0);
    }

    #[test]
    fn test_ray_hit_takes_nearest() {
        let b = unit_box();
        let ray = Ray2D::new(Vec2::new(-5.0, 0.0), Vec2::X);
        assert!((b.ray_hit(&ray).unwrap() - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_rotate_keeps_normals_outward() {
        let mut b = unit_box();
        b.rotate(90.0, Vec2::ZERO);
        for (l, n) in b.lines().iter().zip(b.normals()) {
            assert!(l.midpoint().dot(*n) > 0.0);
        }
    }

    #[test]
    fn test_closest_indices_ties() {
        let b = unit_box();
        let idx = b.closest_indices(Vec2::new(2.0, 2.0), 1e-4);
        assert_eq!(idx.len(), 2);
    }

    #[test]
    fn test_line_queries() {
        let b = unit_box();
        let seg = LineSeg2D::new(Vec2::new(-2.0, 0.0), Vec2::new(2.0, 0.0));
        assert!(b.hits_segment(&seg));
        assert_eq!(b.hit_indices_segment(&seg), vec![0, 2]);
        let other = BoundingLines::rectangle(Vec2::new(1.5, 0.0), 1.0, 0.25);
        assert!(b.hits_lines(&other));
        assert_eq!(b.collision_points_lines(&other).len(), 2);
    }
}
