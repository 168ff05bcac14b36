//! Level pieces: one cell of the level grid
//!
//! A piece knows its own geometry and how it reacts in isolation (colour
//! ladders, life points, prism optics). Anything that touches neighbours or
//! other entities (explosions, portals, cannons firing, tesla arcs) is driven
//! by [`GameLevel`](super::level::GameLevel).

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::ball::GameBall;
use super::bounds::BoundingLines;
use super::cannon::CannonState;
use super::collision::{Aabb2D, CollisionResult, LineSeg2D, Ray2D, ray_aabb};
use crate::consts::*;
use crate::{angle_between_deg, reflect};

/// Grid coordinate `(w, h)`; `h = 0` is the bottom row
pub type PieceCoord = (usize, usize);

/// Life points a piece has against beam damage before it diminishes
pub const PIECE_STARTING_LIFE_POINTS: f32 = 100.0;
/// Beam damage needed to toggle a tesla or switch
pub const TOGGLE_ON_OFF_LIFE_POINTS: f32 = 150.0;
/// Minimum time between two tesla toggles
pub const TESLA_MIN_TOGGLE_INTERVAL: f32 = 0.1;
/// Time before a switch can be pressed again
pub const SWITCH_RESET_TIME: f32 = 4.0;
pub const SWITCH_WIDTH: f32 = 1.5;
pub const SWITCH_HEIGHT: f32 = 0.3;
/// Angle to a face's normal inside which a prism splits a ray
pub const REFLECTION_REFRACTION_SPLIT_ANGLE: f32 = 25.0;
/// Full health of a regen block
pub const REGEN_MAX_LIFE_POINTS: f32 = 100.0;
pub const REGEN_LIFE_POINTS_PER_SEC: f32 = 6.0;
/// Burn taken per second by a regen block that is on fire
pub const FIRE_DAMAGE_PER_SEC: f32 = 15.0;

/// Breakable block colours from strongest to weakest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Colour {
    Red,
    Orange,
    Yellow,
    Green,
}

impl Colour {
    /// One step weaker; `None` means the block is gone
    pub fn decremented(self) -> Option<Colour> {
        match self {
            Colour::Red => Some(Colour::Orange),
            Colour::Orange => Some(Colour::Yellow),
            Colour::Yellow => Some(Colour::Green),
            Colour::Green => None,
        }
    }
}

/// How a piece is being destroyed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DestructionMethod {
    Regular,
    Bomb,
    Rocket,
    Collateral,
    Tesla,
    Beam,
    Fire,
    /// A frozen block struck by a ball
    IceShatter,
}

/// Direction a one-way block lets things through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OneWayDir {
    Up,
    Down,
    Left,
    Right,
}

impl OneWayDir {
    pub fn unit(self) -> Vec2 {
        match self {
            OneWayDir::Up => Vec2::Y,
            OneWayDir::Down => Vec2::NEG_Y,
            OneWayDir::Left => Vec2::NEG_X,
            OneWayDir::Right => Vec2::X,
        }
    }

    /// Whether something moving along `dir` may pass
    pub fn allows(self, dir: Vec2) -> bool {
        self.unit().dot(dir) > EPSILON
    }
}

/// Identifier a switch uses to find the pieces it triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriggerId(pub u32);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeslaState {
    pub active: bool,
    pub changeable: bool,
    pub life_until_toggle: f32,
    /// Seconds since the last toggle
    pub since_toggle: f32,
    /// Teslas this one arcs to when both are active
    pub connected: Vec<PieceCoord>,
}

impl TeslaState {
    pub fn new(active: bool) -> Self {
        Self {
            active,
            changeable: true,
            life_until_toggle: TOGGLE_ON_OFF_LIFE_POINTS,
            since_toggle: TESLA_MIN_TOGGLE_INTERVAL,
            connected: Vec::new(),
        }
    }

    /// Flip the electricity if allowed; returns whether it flipped
    pub fn toggle(&mut self) -> bool {
        if !self.changeable || self.since_toggle < TESLA_MIN_TOGGLE_INTERVAL {
            return false;
        }
        self.active = !self.active;
        self.since_toggle = 0.0;
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchState {
    pub trigger: TriggerId,
    /// Seconds until the switch can be pressed again
    pub cooldown: f32,
    pub life_until_toggle: f32,
}

impl SwitchState {
    pub fn new(trigger: TriggerId) -> Self {
        Self {
            trigger,
            cooldown: 0.0,
            life_until_toggle: TOGGLE_ON_OFF_LIFE_POINTS,
        }
    }

    /// Press the switch; false while it is still resetting
    pub fn press(&mut self) -> bool {
        if self.cooldown > 0.0 {
            return false;
        }
        self.cooldown = SWITCH_RESET_TIME;
        true
    }
}

/// Per-kind data of a piece
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PieceKind {
    Empty,
    Breakable(Colour),
    Solid,
    Bomb,
    Prism,
    Cannon(CannonState),
    Portal { sibling: PieceCoord },
    Tesla(TeslaState),
    Switch(SwitchState),
    Ink,
    /// Passable only in its direction, unless frozen
    OneWay(OneWayDir),
    /// Balls bounce off it, projectiles and light pass straight through
    NoEntry,
    /// Heals over time; an infinite one never needs destroying
    Regen { infinite: bool },
    /// A breakable that always leaves an item behind
    AlwaysDrop,
}

impl PieceKind {
    /// Neighbours of these leave their shared edge open
    pub fn is_no_bounds(&self) -> bool {
        matches!(self, PieceKind::Empty | PieceKind::Cannon(_) | PieceKind::Portal { .. })
    }

    pub fn must_be_destroyed_to_end_level(&self) -> bool {
        matches!(
            self,
            PieceKind::Breakable(_)
                | PieceKind::Bomb
                | PieceKind::Ink
                | PieceKind::AlwaysDrop
                | PieceKind::Regen { infinite: false }
        )
    }

    pub fn can_be_destroyed_by_ball(&self) -> bool {
        matches!(
            self,
            PieceKind::Breakable(_) | PieceKind::Bomb | PieceKind::Ink | PieceKind::AlwaysDrop
        )
    }

    pub fn ball_bounces_off(&self) -> bool {
        !matches!(self, PieceKind::Empty | PieceKind::Cannon(_) | PieceKind::Portal { .. })
    }

    pub fn is_light_reflector_refractor(&self) -> bool {
        matches!(self, PieceKind::Prism | PieceKind::Portal { .. })
    }

    pub fn ghost_ball_passes_through(&self) -> bool {
        matches!(
            self,
            PieceKind::Breakable(_)
                | PieceKind::Bomb
                | PieceKind::Ink
                | PieceKind::Prism
                | PieceKind::AlwaysDrop
                | PieceKind::Regen { .. }
        )
    }

    /// Projectiles fly over these without reacting
    pub fn projectile_passes_through(&self) -> bool {
        matches!(self, PieceKind::Empty | PieceKind::Cannon(_) | PieceKind::NoEntry)
    }

    pub fn is_solid_like(&self) -> bool {
        matches!(self, PieceKind::Solid | PieceKind::Tesla(_))
    }
}

/// Neighbouring kinds around a piece; `None` means outside the level
#[derive(Debug, Clone, Copy, Default)]
pub struct Neighbours<'a> {
    pub left: Option<&'a PieceKind>,
    pub bottom: Option<&'a PieceKind>,
    pub right: Option<&'a PieceKind>,
    pub top: Option<&'a PieceKind>,
    pub top_right: Option<&'a PieceKind>,
    pub top_left: Option<&'a PieceKind>,
    pub bottom_right: Option<&'a PieceKind>,
    pub bottom_left: Option<&'a PieceKind>,
}

fn open(n: Option<&PieceKind>) -> bool {
    n.is_some_and(PieceKind::is_no_bounds)
}

/// Status effects applied by fire and ice balls
///
/// Only regen blocks catch fire; the rest are destroyed outright by a fire ball.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceStatus {
    pub on_fire: bool,
    pub frozen: bool,
}

/// A single cell of the level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelPiece {
    pub w: usize,
    pub h: usize,
    pub center: Vec2,
    pub kind: PieceKind,
    pub trigger_id: Option<TriggerId>,
    pub bounds: BoundingLines,
    pub life_points: f32,
    pub status: PieceStatus,
}

impl LevelPiece {
    pub fn new(w: usize, h: usize, kind: PieceKind) -> Self {
        Self {
            w,
            h,
            center: Self::center_of(w, h),
            kind,
            trigger_id: None,
            bounds: BoundingLines::default(),
            life_points: PIECE_STARTING_LIFE_POINTS,
            status: PieceStatus::default(),
        }
    }

    pub fn center_of(w: usize, h: usize) -> Vec2 {
        Vec2::new(
            w as f32 * PIECE_WIDTH + HALF_PIECE_WIDTH,
            h as f32 * PIECE_HEIGHT + HALF_PIECE_HEIGHT,
        )
    }

    pub fn coord(&self) -> PieceCoord {
        (self.w, self.h)
    }

    pub fn full_aabb(&self) -> Aabb2D {
        Aabb2D::from_center(self.center, Vec2::new(HALF_PIECE_WIDTH, HALF_PIECE_HEIGHT))
    }

    /// Rebuild bounding lines from the neighbouring pieces
    pub fn update_bounds(&mut self, n: &Neighbours) {
        let c = self.center;
        let hw = HALF_PIECE_WIDTH;
        let hh = HALF_PIECE_HEIGHT;
        let bl = c + Vec2::new(-hw, -hh);
        let br = c + Vec2::new(hw, -hh);
        let tr = c + Vec2::new(hw, hh);
        let tl = c + Vec2::new(-hw, hh);

        match &self.kind {
            PieceKind::Empty => self.bounds.clear(),
            PieceKind::Cannon(state) => {
                // Built once; rotation keeps them current afterwards
                if self.bounds.is_empty() {
                    self.bounds = state.barrel_bounds(c);
                }
            }
            PieceKind::Switch(_) => {
                self.bounds = BoundingLines::rectangle(c, hw, hh);
            }
            PieceKind::Portal { .. } => {
                self.bounds = BoundingLines::rectangle(c, hw * 0.5, hh * 0.8);
            }
            PieceKind::Prism => {
                let mut b = BoundingLines::default();
                let left = c + Vec2::new(-hw, 0.0);
                let right = c + Vec2::new(hw, 0.0);
                let top = c + Vec2::new(0.0, hh);
                let bottom = c + Vec2::new(0.0, -hh);
                let corner_open = |a: Option<&PieceKind>, b: Option<&PieceKind>, d: Option<&PieceKind>| {
                    open(a) || open(b) || open(d) || a.is_none() || b.is_none() || d.is_none()
                };
                if corner_open(n.left, n.bottom_left, n.bottom) {
                    b.push(LineSeg2D::new(left, bottom), Vec2::new(-hh, -hw).normalize());
                }
                if corner_open(n.right, n.bottom_right, n.bottom) {
                    b.push(LineSeg2D::new(right, bottom), Vec2::new(hh, -hw).normalize());
                }
                if corner_open(n.left, n.top_left, n.top) {
                    b.push(LineSeg2D::new(left, top), Vec2::new(-hh, hw).normalize());
                }
                if corner_open(n.right, n.top_right, n.top) {
                    b.push(LineSeg2D::new(right, top), Vec2::new(hh, hw).normalize());
                }
                self.bounds = b;
            }
            kind if kind.is_solid_like() => {
                // Solid and tesla pieces close every side except against each other
                let exposed = |k: Option<&PieceKind>| k.is_some_and(|k| !k.is_solid_like());
                let mut b = BoundingLines::default();
                if exposed(n.left) {
                    b.push(LineSeg2D::new(tl, bl), Vec2::NEG_X);
                }
                if exposed(n.bottom) {
                    b.push(LineSeg2D::new(bl, br), Vec2::NEG_Y);
                }
                if exposed(n.right) {
                    b.push(LineSeg2D::new(br, tr), Vec2::X);
                }
                if exposed(n.top) {
                    b.push(LineSeg2D::new(tr, tl), Vec2::Y);
                }
                self.bounds = b;
            }
            _ => {
                let mut b = BoundingLines::default();
                if open(n.left) {
                    b.push(LineSeg2D::new(tl, bl), Vec2::NEG_X);
                }
                if open(n.bottom) {
                    b.push(LineSeg2D::new(bl, br), Vec2::NEG_Y);
                }
                if open(n.right) {
                    b.push(LineSeg2D::new(br, tr), Vec2::X);
                }
                if open(n.top) {
                    b.push(LineSeg2D::new(tr, tl), Vec2::Y);
                }
                self.bounds = b;
            }
        }
    }

    /// Swept ball test against this piece's bounds
    pub fn collide_ball(&self, ball: &GameBall, dt: f32) -> Option<CollisionResult> {
        if matches!(self.kind, PieceKind::Empty) || self.bounds.is_empty() {
            return None;
        }
        self.bounds.collide(dt, &ball.bounds, ball.velocity())
    }

    /// Ray parameter where the ray first meets this piece
    ///
    /// Pieces that light travels into (prisms, portals) and pieces with
    /// rotating or inset geometry use the whole cell box.
    pub fn ray_hit(&self, ray: &Ray2D) -> Option<f32> {
        match self.kind {
            PieceKind::Empty | PieceKind::NoEntry => None,
            PieceKind::OneWay(dir) if !self.status.frozen && dir.allows(ray.unit_dir()) => None,
            PieceKind::Prism
            | PieceKind::Portal { .. }
            | PieceKind::Cannon(_)
            | PieceKind::Tesla(_)
            | PieceKind::Switch(_) => ray_aabb(ray, &self.full_aabb()),
            _ => self.bounds.ray_hit(ray),
        }
    }

    /// Rays leaving this piece for light that hit it at `hit_point` going `dir`
    ///
    /// The first ray always continues the original light (through, reflected or
    /// teleported); any further rays are splits. Non-optical pieces return none.
    pub fn reflection_refraction_rays(
        &self,
        hit_point: Vec2,
        dir: Vec2,
        sibling_center: Option<Vec2>,
    ) -> Vec<Ray2D> {
        match self.kind {
            PieceKind::Prism => prism_rays(self.center, hit_point, dir),
            PieceKind::Portal { .. } => match sibling_center {
                Some(sib) => vec![Ray2D::new(sib + (hit_point - self.center), dir)],
                None => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    /// Whether a ball moving along `dir` slips through this piece
    pub fn lets_ball_through(&self, dir: Vec2) -> bool {
        match self.kind {
            PieceKind::OneWay(way) => !self.status.frozen && way.allows(dir),
            _ => false,
        }
    }

    /// Take beam damage; true once the life points run out (they reset)
    pub fn drain_life(&mut self, amount: f32, reset_to: f32) -> bool {
        self.life_points -= amount;
        if self.life_points <= 0.0 {
            self.life_points = reset_to;
            true
        } else {
            false
        }
    }

    /// Score for this piece changing into `next`
    pub fn points_on_change(&self, next: &PieceKind) -> u64 {
        match (&self.kind, next) {
            (PieceKind::Breakable(_), PieceKind::Empty) => 25,
            (PieceKind::Breakable(_), PieceKind::Breakable(_)) => 10,
            (PieceKind::Bomb, PieceKind::Empty) => 50,
            (PieceKind::Ink, PieceKind::Empty) => 30,
            (PieceKind::Prism, PieceKind::Empty) => 100,
            (PieceKind::OneWay(_) | PieceKind::NoEntry, PieceKind::Empty) => 70,
            (PieceKind::Regen { .. }, PieceKind::Empty) => 50,
            (PieceKind::AlwaysDrop, PieceKind::Empty) => 25,
            _ => 0,
        }
    }
}

/// Prism optics
///
/// Light striking the middle of a face nearly head-on splits into the
/// through-ray plus two diagonals out the far side. Light hitting a slanted
/// face reflects if it comes in at a shallow enough angle and otherwise passes
/// straight through.
pub fn prism_rays(center: Vec2, hit_point: Vec2, dir: Vec2) -> Vec<Ray2D> {
    let mut default_ray = Ray2D::new(hit_point, dir);
    let mut extra = Vec::new();

    let delta = hit_point - center;
    let mid_half_x = PIECE_WIDTH / 5.2;
    let mid_half_y = PIECE_HEIGHT / 3.5;
    let diag = |x: f32, y: f32| Vec2::new(x, y).normalize();
    let within = |normal: Vec2| angle_between_deg(-dir, normal) <= REFLECTION_REFRACTION_SPLIT_ANGLE;

    if delta.x.abs() <= mid_half_x {
        if delta.y <= EPSILON {
            if within(Vec2::NEG_Y) {
                extra.push(Ray2D::new(hit_point, diag(1.0, 1.0)));
                extra.push(Ray2D::new(hit_point, diag(-1.0, 1.0)));
            }
        } else if within(Vec2::Y) {
            extra.push(Ray2D::new(hit_point, diag(1.0, -1.0)));
            extra.push(Ray2D::new(hit_point, diag(-1.0, -1.0)));
        }
    } else {
        let side = if delta.x <= EPSILON { -1.0 } else { 1.0 };
        if delta.y.abs() <= mid_half_y {
            let normal = Vec2::new(side, 0.0);
            if angle_between_deg(-dir, normal) < REFLECTION_REFRACTION_SPLIT_ANGLE {
                extra.push(Ray2D::new(center, diag(-side, -1.0)));
                extra.push(Ray2D::new(center, diag(-side, 1.0)));
                default_ray.origin = center;
            }
        } else {
            let vertical = if delta.y <= EPSILON { -1.0 } else { 1.0 };
            let normal = diag(side, vertical);
            if angle_between_deg(-dir, normal) >= REFLECTION_REFRACTION_SPLIT_ANGLE {
                default_ray.set_unit_dir(reflect(dir, normal).normalize());
            }
        }
    }

    let mut rays = Vec::with_capacity(1 + extra.len());
    rays.push(default_ray);
    rays.extend(extra);
    rays
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY: PieceKind = PieceKind::Empty;
    const SOLID: PieceKind = PieceKind::Solid;

    fn all(k: &PieceKind) -> Neighbours<'_> {
        Neighbours {
            left: Some(k),
            bottom: Some(k),
            right: Some(k),
            top: Some(k),
            top_right: Some(k),
            top_left: Some(k),
            bottom_right: Some(k),
            bottom_left: Some(k),
        }
    }

    #[test]
    fn test_center_of() {
        assert_eq!(LevelPiece::center_of(0, 0), Vec2::new(1.25, 0.5));
        assert_eq!(LevelPiece::center_of(2, 3), Vec2::new(6.25, 3.5));
    }

    #[test]
    fn test_breakable_bounds_follow_open_neighbours() {
        let mut p = LevelPiece::new(1, 1, PieceKind::Breakable(Colour::Red));
        p.update_bounds(&all(&EMPTY));
        assert_eq!(p.bounds.len(), 4);

        p.update_bounds(&all(&SOLID));
        assert!(p.bounds.is_empty());

        let mut n = all(&SOLID);
        n.top = Some(&EMPTY);
        p.update_bounds(&n);
        assert_eq!(p.bounds.normals(), &[Vec2::Y]);

        // Outside the level never gets a boundary
        p.update_bounds(&Neighbours::default());
        assert!(p.bounds.is_empty());
    }

    #[test]
    fn test_solid_bounds_face_non_solid() {
        let mut p = LevelPiece::new(0, 0, PieceKind::Solid);
        let breakable = PieceKind::Breakable(Colour::Green);
        let mut n = all(&SOLID);
        n.right = Some(&breakable);
        p.update_bounds(&n);
        assert_eq!(p.bounds.normals(), &[Vec2::X]);
    }

    #[test]
    fn test_prism_diamond() {
        let mut p = LevelPiece::new(0, 0, PieceKind::Prism);
        p.update_bounds(&all(&EMPTY));
        assert_eq!(p.bounds.len(), 4);
        for n in p.bounds.normals() {
            assert!((n.length() - 1.0).abs() < 1e-5);
        }
        p.update_bounds(&all(&SOLID));
        assert!(p.bounds.is_empty());
    }

    #[test]
    fn test_colour_ladder() {
        assert_eq!(Colour::Red.decremented(), Some(Colour::Orange));
        assert_eq!(Colour::Yellow.decremented(), Some(Colour::Green));
        assert_eq!(Colour::Green.decremented(), None);
    }

    #[test]
    fn test_prism_head_on_bottom_splits_three_ways() {
        let c = Vec2::new(1.25, 0.5);
        let hit = c + Vec2::new(0.0, -HALF_PIECE_HEIGHT);
        let rays = prism_rays(c, hit, Vec2::Y);
        assert_eq!(rays.len(), 3);
        assert_eq!(rays[0].unit_dir(), Vec2::Y);
        assert!(rays[1].unit_dir().y > 0.0 && rays[1].unit_dir().x > 0.0);
        assert!(rays[2].unit_dir().y > 0.0 && rays[2].unit_dir().x < 0.0);
    }

    #[test]
    fn test_prism_oblique_bottom_passes_through() {
        let c = Vec2::new(1.25, 0.5);
        let hit = c + Vec2::new(0.1, -HALF_PIECE_HEIGHT);
        let dir = crate::rotate_deg(Vec2::Y, 40.0);
        let rays = prism_rays(c, hit, dir);
        assert_eq!(rays.len(), 1);
        assert_eq!(rays[0].unit_dir(), dir);
    }

    #[test]
    fn test_prism_side_split_moves_origin_to_center() {
        let c = Vec2::new(1.25, 0.5);
        let hit = c + Vec2::new(-HALF_PIECE_WIDTH, 0.0);
        let rays = prism_rays(c, hit, Vec2::X);
        assert_eq!(rays.len(), 3);
        assert!(rays.iter().all(|r| r.origin == c));
        assert!(rays[1].unit_dir().x > 0.0 && rays[2].unit_dir().x > 0.0);
    }

    #[test]
    fn test_prism_diagonal_face_reflects_shallow() {
        let c = Vec2::new(1.25, 0.5);
        // Lower-left facet, hit going straight right
        let hit = c + Vec2::new(-0.9, -0.4);
        let rays = prism_rays(c, hit, Vec2::X);
        assert_eq!(rays.len(), 1);
        let expected = reflect(Vec2::X, Vec2::new(-1.0, -1.0).normalize());
        assert!((rays[0].unit_dir() - expected).length() < 1e-5);
    }

    #[test]
    fn test_portal_ray_keeps_offset() {
        let p = LevelPiece::new(0, 0, PieceKind::Portal { sibling: (3, 2) });
        let sib = LevelPiece::center_of(3, 2);
        let hit = p.center + Vec2::new(0.2, -0.3);
        let rays = p.reflection_refraction_rays(hit, Vec2::Y, Some(sib));
        assert_eq!(rays.len(), 1);
        assert!((rays[0].origin - (sib + Vec2::new(0.2, -0.3))).length() < 1e-5);
    }

    #[test]
    fn test_tesla_toggle_interval() {
        let mut t = TeslaState::new(false);
        assert!(t.toggle());
        assert!(!t.toggle(), "too soon after the last toggle");
        t.since_toggle = 1.0;
        assert!(t.toggle());
        t.changeable = false;
        t.since_toggle = 1.0;
        assert!(!t.toggle());
    }

    #[test]
    fn test_one_way_rays() {
        let mut p = LevelPiece::new(0, 0, PieceKind::OneWay(OneWayDir::Up));
        p.update_bounds(&all(&EMPTY));
        let below = Ray2D::new(p.center - Vec2::new(0.0, 2.0), Vec2::Y);
        let above = Ray2D::new(p.center + Vec2::new(0.0, 2.0), Vec2::NEG_Y);
        assert_eq!(p.ray_hit(&below), None);
        assert!(p.ray_hit(&above).is_some());
        assert!(p.lets_ball_through(Vec2::new(0.3, 1.0).normalize()));
        assert!(!p.lets_ball_through(Vec2::X));

        p.status.frozen = true;
        assert!(p.ray_hit(&below).is_some(), "ice seals a one-way block");
        assert!(!p.lets_ball_through(Vec2::Y));
    }

    #[test]
    fn test_no_entry_is_invisible_to_rays() {
        let mut p = LevelPiece::new(0, 0, PieceKind::NoEntry);
        p.update_bounds(&all(&EMPTY));
        assert_eq!(p.bounds.len(), 4);
        assert_eq!(p.ray_hit(&Ray2D::new(p.center - Vec2::new(0.0, 2.0), Vec2::Y)), None);
        assert!(PieceKind::NoEntry.projectile_passes_through());
        assert!(PieceKind::NoEntry.ball_bounces_off());
    }

    #[test]
    fn test_regen_end_of_level_rules() {
        assert!(PieceKind::Regen { infinite: false }.must_be_destroyed_to_end_level());
        assert!(!PieceKind::Regen { infinite: true }.must_be_destroyed_to_end_level());
        assert!(PieceKind::AlwaysDrop.must_be_destroyed_to_end_level());
    }

    #[test]
    fn test_switch_cooldown() {
        let mut s = SwitchState::new(TriggerId(1));
        assert!(s.press());
        assert!(!s.press());
        s.cooldown = 0.0;
        assert!(s.press());
    }
}
