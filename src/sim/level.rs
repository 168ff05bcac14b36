//! The level grid and everything that happens between pieces
//!
//! Pieces are stored row-major with row 0 at the bottom. Any change to a
//! piece goes through [`GameLevel::piece_changed`] so the bounding lines of
//! it and its neighbours stay consistent.

use std::collections::{BTreeSet, VecDeque};

use glam::Vec2;
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::ball::{BallState, BallType, GameBall};
use super::bounds::BoundingLines;
use super::cannon::{CannonState, CannonTick};
use super::collision::{
    Aabb2D, CollisionResult, LineSeg2D, Ray2D, closest_point_on_segment, tangent_line,
};
use super::item::ItemDrop;
use super::piece::{
    Colour, DestructionMethod, FIRE_DAMAGE_PER_SEC, LevelPiece, Neighbours, OneWayDir,
    PIECE_STARTING_LIFE_POINTS, PieceCoord, PieceKind, REGEN_LIFE_POINTS_PER_SEC, REGEN_MAX_LIFE_POINTS,
    SwitchState, TOGGLE_ON_OFF_LIFE_POINTS, TeslaState, TriggerId,
};
use super::projectile::{Collidee, Projectile, ProjectileKind, ProjectileSpawn};
use super::state::GameEvent;
use crate::consts::*;
use crate::error::{BlammoError, Result};

/// Half thickness of the lightning between two teslas
pub const TESLA_ARC_HALF_WIDTH: f32 = 0.1;
const ARC_SAMPLES: usize = 8;

/// Side effects of a level operation, collected for the game state
#[derive(Debug, Default)]
pub struct LevelFeedback {
    pub events: Vec<GameEvent>,
    pub points: u64,
    pub spawns: Vec<ProjectileSpawn>,
    /// Items destroyed pieces asked to drop
    pub drops: Vec<ItemDrop>,
}

/// Where a ball struck the level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallLevelHit {
    /// `None` for the outer walls
    pub piece: Option<PieceCoord>,
    pub result: CollisionResult,
}

/// What to do with a projectile after it hit a piece
#[derive(Debug, Default, PartialEq)]
pub struct ProjectileHit {
    pub remove: bool,
    /// Extra rays a prism split the projectile into
    pub splits: Vec<Ray2D>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameLevel {
    width: usize,
    height: usize,
    pieces: Vec<LevelPiece>,
    /// Left, right and top walls facing inward
    walls: BoundingLines,
}

impl GameLevel {
    /// Build a level from kinds listed row-major from the bottom row
    pub fn new(width: usize, height: usize, kinds: Vec<PieceKind>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(BlammoError::InvalidLayout {
                row: 0,
                reason: "level must have at least one piece".to_string(),
            });
        }
        if kinds.len() != width * height {
            return Err(BlammoError::InvalidLayout {
                row: 0,
                reason: format!("expected {} pieces, got {}", width * height, kinds.len()),
            });
        }

        let pieces = kinds
            .into_iter()
            .enumerate()
            .map(|(i, kind)| LevelPiece::new(i % width, i / width, kind))
            .collect();

        let uw = width as f32 * PIECE_WIDTH;
        let uh = height as f32 * PIECE_HEIGHT;
        // Walls run well below the paddle so balls cannot slip round their ends
        let floor = DEATH_Y * 2.0;
        let mut walls = BoundingLines::default();
        walls.push(LineSeg2D::new(Vec2::new(0.0, floor), Vec2::new(0.0, uh)), Vec2::X);
        walls.push(LineSeg2D::new(Vec2::new(uw, uh), Vec2::new(uw, floor)), Vec2::NEG_X);
        walls.push(LineSeg2D::new(Vec2::new(0.0, uh), Vec2::new(uw, uh)), Vec2::NEG_Y);

        let mut level = Self {
            width,
            height,
            pieces,
            walls,
        };
        level.connect_teslas();
        level.rebuild_all_bounds();
        Ok(level)
    }

    /// Build a level from text rows, top row first
    ///
    /// `.` empty, `s` solid, `r o y g` breakables, `b` bomb, `p` prism,
    /// `c` cannon, `t` tesla (active), `k` ink, `P` portal (paired in reading
    /// order), `w` switch that toggles every tesla, `^ v < >` one-way blocks,
    /// `n` no-entry, `e` regen, `E` infinite regen, `a` always-drop.
    pub fn from_layout(rows: &[&str]) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.chars().count());
        if width == 0 {
            return Err(BlammoError::InvalidLayout {
                row: 0,
                reason: "empty layout".to_string(),
            });
        }

        let mut kinds = vec![PieceKind::Empty; width * height];
        let mut portals: Vec<PieceCoord> = Vec::new();
        let mut has_switch = false;

        for (row_idx, row) in rows.iter().enumerate() {
            if row.chars().count() != width {
                return Err(BlammoError::InvalidLayout {
                    row: row_idx,
                    reason: format!("expected {width} columns, got {}", row.chars().count()),
                });
            }
            let h = height - 1 - row_idx;
            for (w, ch) in row.chars().enumerate() {
                let kind = match ch {
                    '.' => PieceKind::Empty,
                    's' => PieceKind::Solid,
                    'r' => PieceKind::Breakable(Colour::Red),
                    'o' => PieceKind::Breakable(Colour::Orange),
                    'y' => PieceKind::Breakable(Colour::Yellow),
                    'g' => PieceKind::Breakable(Colour::Green),
                    'b' => PieceKind::Bomb,
                    'p' => PieceKind::Prism,
                    'c' => PieceKind::Cannon(CannonState::default()),
                    't' => PieceKind::Tesla(TeslaState::new(true)),
                    'k' => PieceKind::Ink,
                    '^' => PieceKind::OneWay(OneWayDir::Up),
                    'v' => PieceKind::OneWay(OneWayDir::Down),
                    '<' => PieceKind::OneWay(OneWayDir::Left),
                    '>' => PieceKind::OneWay(OneWayDir::Right),
                    'n' => PieceKind::NoEntry,
                    'e' => PieceKind::Regen { infinite: false },
                    'E' => PieceKind::Regen { infinite: true },
                    'a' => PieceKind::AlwaysDrop,
                    'P' => {
                        portals.push((w, h));
                        PieceKind::Portal { sibling: (w, h) }
                    }
                    'w' => {
                        has_switch = true;
                        PieceKind::Switch(SwitchState::new(TriggerId(1)))
                    }
                    other => {
                        return Err(BlammoError::InvalidLayout {
                            row: row_idx,
                            reason: format!("unknown piece '{other}' at column {w}"),
                        });
                    }
                };
                kinds[h * width + w] = kind;
            }
        }

        if portals.len() % 2 != 0 {
            return Err(BlammoError::InvalidLayout {
                row: 0,
                reason: "portals must come in pairs".to_string(),
            });
        }
        for pair in portals.chunks(2) {
            let (a, b) = (pair[0], pair[1]);
            kinds[a.1 * width + a.0] = PieceKind::Portal { sibling: b };
            kinds[b.1 * width + b.0] = PieceKind::Portal { sibling: a };
        }

        let mut level = Self::new(width, height, kinds)?;
        if has_switch {
            for piece in level.pieces.iter_mut() {
                if matches!(piece.kind, PieceKind::Tesla(_)) {
                    piece.trigger_id = Some(TriggerId(1));
                }
            }
        }
        Ok(level)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn unit_width(&self) -> f32 {
        self.width as f32 * PIECE_WIDTH
    }

    pub fn unit_height(&self) -> f32 {
        self.height as f32 * PIECE_HEIGHT
    }

    pub fn pieces(&self) -> &[LevelPiece] {
        &self.pieces
    }

    pub fn piece(&self, w: usize, h: usize) -> Option<&LevelPiece> {
        if w >= self.width || h >= self.height {
            return None;
        }
        self.pieces.get(h * self.width + w)
    }

    pub fn piece_mut(&mut self, w: usize, h: usize) -> Option<&mut LevelPiece> {
        if w >= self.width || h >= self.height {
            return None;
        }
        self.pieces.get_mut(h * self.width + w)
    }

    fn kind_at(&self, w: isize, h: isize) -> Option<&PieceKind> {
        if w < 0 || h < 0 {
            return None;
        }
        self.piece(w as usize, h as usize).map(|p| &p.kind)
    }

    fn neighbours(&self, w: usize, h: usize) -> Neighbours<'_> {
        let (w, h) = (w as isize, h as isize);
        Neighbours {
            left: self.kind_at(w - 1, h),
            bottom: self.kind_at(w, h - 1),
            right: self.kind_at(w + 1, h),
            top: self.kind_at(w, h + 1),
            top_right: self.kind_at(w + 1, h + 1),
            top_left: self.kind_at(w - 1, h + 1),
            bottom_right: self.kind_at(w + 1, h - 1),
            bottom_left: self.kind_at(w - 1, h - 1),
        }
    }

    /// In-level coordinates of the 3x3 block around `(w, h)`, centre included
    fn block_around(&self, (w, h): PieceCoord) -> Vec<PieceCoord> {
        let mut out = Vec::with_capacity(9);
        for dh in -1isize..=1 {
            for dw in -1isize..=1 {
                let nw = w as isize + dw;
                let nh = h as isize + dh;
                if nw >= 0 && nh >= 0 && (nw as usize) < self.width && (nh as usize) < self.height {
                    out.push((nw as usize, nh as usize));
                }
            }
        }
        out
    }

    fn update_piece_bounds(&mut self, w: usize, h: usize) {
        let idx = h * self.width + w;
        let mut piece = std::mem::replace(&mut self.pieces[idx], LevelPiece::new(w, h, PieceKind::Empty));
        piece.update_bounds(&self.neighbours(w, h));
        self.pieces[idx] = piece;
    }

    fn rebuild_all_bounds(&mut self) {
        for h in 0..self.height {
            for w in 0..self.width {
                self.update_piece_bounds(w, h);
            }
        }
    }

    /// Link each tesla to the nearest tesla to its right and above
    fn connect_teslas(&mut self) {
        let mut links = Vec::new();
        for h in 0..self.height {
            for w in 0..self.width {
                if !matches!(self.kind_at(w as isize, h as isize), Some(PieceKind::Tesla(_))) {
                    continue;
                }
                if let Some(rw) = (w + 1..self.width)
                    .find(|&x| matches!(self.kind_at(x as isize, h as isize), Some(PieceKind::Tesla(_))))
                {
                    links.push(((w, h), (rw, h)));
                }
                if let Some(uh) = (h + 1..self.height)
                    .find(|&y| matches!(self.kind_at(w as isize, y as isize), Some(PieceKind::Tesla(_))))
                {
                    links.push(((w, h), (w, uh)));
                }
            }
        }
        for (a, b) in links {
            if let Some(PieceKind::Tesla(t)) = self.piece_mut(a.0, a.1).map(|p| &mut p.kind) {
                t.connected.push(b);
            }
            if let Some(PieceKind::Tesla(t)) = self.piece_mut(b.0, b.1).map(|p| &mut p.kind) {
                t.connected.push(a);
            }
        }
    }

    /// Replace a piece's kind and refresh the bounds around it
    pub fn piece_changed(&mut self, (w, h): PieceCoord, new_kind: PieceKind, fb: &mut LevelFeedback) {
        let Some(piece) = self.piece_mut(w, h) else {
            return;
        };
        fb.points += piece.points_on_change(&new_kind);
        let destroyed = matches!(new_kind, PieceKind::Empty);
        piece.kind = new_kind;
        piece.life_points = PIECE_STARTING_LIFE_POINTS;
        if destroyed {
            piece.trigger_id = None;
            piece.status = Default::default();
        }

        for (nw, nh) in self.block_around((w, h)) {
            self.update_piece_bounds(nw, nh);
        }
        fb.events.push(if destroyed {
            GameEvent::BlockDestroyed { w, h }
        } else {
            GameEvent::PieceChanged { w, h }
        });
    }

    /// Piece with the smallest ray parameter, skipping `ignore`
    pub fn first_collider(&self, ray: &Ray2D, ignore: &[PieceCoord]) -> Option<(PieceCoord, f32)> {
        let mut best: Option<(PieceCoord, f32)> = None;
        for piece in &self.pieces {
            if ignore.contains(&piece.coord()) {
                continue;
            }
            if let Some(t) = piece.ray_hit(ray)
                && best.is_none_or(|(_, bt)| t < bt)
            {
                best = Some((piece.coord(), t));
            }
        }
        best
    }

    /// Earliest collision of a ball with a piece or wall over `dt`
    pub fn collide_ball(&self, ball: &GameBall, dt: f32) -> Option<BallLevelHit> {
        if !ball.can_collide() {
            return None;
        }
        let mut best = self
            .walls
            .collide(dt, &ball.bounds, ball.velocity())
            .map(|result| BallLevelHit { piece: None, result });

        if ball.block_collisions_disabled {
            return best;
        }
        let ghost = ball.ball_type.contains(BallType::GHOST);
        let heading = ball.velocity().normalize_or_zero();

        for piece in &self.pieces {
            let kind = &piece.kind;
            if ghost && kind.ghost_ball_passes_through() {
                continue;
            }
            if piece.lets_ball_through(heading) {
                continue;
            }
            if !kind.ball_bounces_off() && ball.is_last_piece_collided_with(piece.coord()) {
                continue;
            }
            if let PieceKind::Cannon(c) = kind
                && c.is_loaded()
            {
                continue;
            }
            if let Some(result) = piece.collide_ball(ball, dt)
                && best.is_none_or(|b| result.time < b.result.time)
            {
                best = Some(BallLevelHit {
                    piece: Some(piece.coord()),
                    result,
                });
            }
        }
        best
    }

    /// React to a ball striking the piece at `coord`
    ///
    /// Returns whether the ball should bounce off it.
    pub fn ball_hit<R: Rng>(
        &mut self,
        ball: &mut GameBall,
        coord: PieceCoord,
        rng: &mut R,
        fb: &mut LevelFeedback,
    ) -> bool {
        let Some(piece) = self.piece(coord.0, coord.1) else {
            return true;
        };
        let bounces = piece.kind.ball_bounces_off();
        let center = piece.center;
        let frozen = piece.status.frozen;

        let fire = ball.ball_type.contains(BallType::FIRE);
        let ice = ball.ball_type.contains(BallType::ICE);

        match piece.kind.clone() {
            PieceKind::Empty | PieceKind::Solid | PieceKind::Prism => {}
            kind @ (PieceKind::Breakable(_) | PieceKind::AlwaysDrop) => {
                if fire {
                    if frozen {
                        self.set_frozen(coord, false);
                    } else {
                        self.destroy_piece(coord, DestructionMethod::Fire, fb);
                    }
                } else if ice && !frozen {
                    self.set_frozen(coord, true);
                } else if frozen {
                    self.destroy_piece(coord, DestructionMethod::IceShatter, fb);
                } else {
                    let uber = ball.ball_type.contains(BallType::UBER);
                    let steps = if uber && matches!(kind, PieceKind::Breakable(c) if c != Colour::Green) {
                        2
                    } else {
                        1
                    };
                    self.diminish(coord, steps, fb);
                }
            }
            PieceKind::OneWay(_) | PieceKind::NoEntry => {
                if ice {
                    self.set_frozen(coord, true);
                } else if frozen {
                    self.set_frozen(coord, false);
                }
            }
            PieceKind::Regen { .. } => {
                if fire {
                    if frozen {
                        self.set_frozen(coord, false);
                    } else {
                        self.set_on_fire(coord);
                    }
                } else if ice && !frozen {
                    self.set_frozen(coord, true);
                } else if frozen {
                    self.destroy_piece(coord, DestructionMethod::IceShatter, fb);
                } else {
                    self.hurt_regen(coord, ball.collision_damage(), DestructionMethod::Regular, fb);
                }
            }
            PieceKind::Bomb | PieceKind::Ink => {
                self.destroy_piece(coord, DestructionMethod::Regular, fb);
            }
            PieceKind::Cannon(_) => {
                let already_in_cannon = matches!(ball.state, BallState::InCannon { .. });
                if !already_in_cannon
                    && !ball.is_last_piece_collided_with(coord)
                    && let Some(PieceKind::Cannon(c)) = self.piece_mut(coord.0, coord.1).map(|p| &mut p.kind)
                    && c.capture(ball.id, rng)
                {
                    ball.load_into_cannon(coord, center);
                    debug!("Ball {} loaded into cannon at {:?}", ball.id, coord);
                }
            }
            PieceKind::Portal { sibling } => {
                let offset = ball.center() - center;
                ball.set_center(LevelPiece::center_of(sibling.0, sibling.1) + offset);
                ball.set_last_piece(Some(sibling));
                return false;
            }
            PieceKind::Tesla(_) => {
                self.toggle_tesla(coord, fb);
            }
            PieceKind::Switch(_) => {
                self.press_switch(coord, fb);
            }
        }

        if bounces {
            ball.set_last_piece(Some(coord));
        }
        bounces
    }

    fn set_frozen(&mut self, (w, h): PieceCoord, frozen: bool) {
        if let Some(p) = self.piece_mut(w, h) {
            p.status.frozen = frozen;
            p.status.on_fire = false;
        }
    }

    fn set_on_fire(&mut self, (w, h): PieceCoord) {
        if let Some(p) = self.piece_mut(w, h) {
            p.status.on_fire = true;
            p.status.frozen = false;
        }
    }

    /// Wear down a finite regen block, destroying it once its life runs out
    fn hurt_regen(&mut self, coord: PieceCoord, damage: f32, method: DestructionMethod, fb: &mut LevelFeedback) {
        let Some(piece) = self.piece_mut(coord.0, coord.1) else {
            return;
        };
        if piece.kind != (PieceKind::Regen { infinite: false }) {
            return;
        }
        piece.life_points -= damage;
        if piece.life_points <= 0.0 {
            self.destroy_piece(coord, method, fb);
        }
    }

    /// Step a breakable down its colour ladder `steps` times
    fn diminish(&mut self, coord: PieceCoord, steps: usize, fb: &mut LevelFeedback) {
        let Some(PieceKind::Breakable(mut colour)) = self.piece(coord.0, coord.1).map(|p| p.kind.clone())
        else {
            if self
                .piece(coord.0, coord.1)
                .is_some_and(|p| p.kind.can_be_destroyed_by_ball())
            {
                self.destroy_piece(coord, DestructionMethod::Regular, fb);
            }
            return;
        };
        for _ in 0..steps {
            match colour.decremented() {
                Some(next) => colour = next,
                None => {
                    self.destroy_piece(coord, DestructionMethod::Regular, fb);
                    return;
                }
            }
        }
        self.piece_changed(coord, PieceKind::Breakable(colour), fb);
    }

    /// Destroy a piece, chaining through any bombs caught in the blast
    pub fn destroy_piece(&mut self, coord: PieceCoord, method: DestructionMethod, fb: &mut LevelFeedback) {
        self.destroy_many(vec![(coord, method)], fb);
    }

    /// Destroy everything in the 3x3 block around `coord`
    pub fn explode_around(&mut self, coord: PieceCoord, method: DestructionMethod, fb: &mut LevelFeedback) {
        let seeds = self.block_around(coord).into_iter().map(|c| (c, method)).collect();
        self.destroy_many(seeds, fb);
    }

    fn destroy_many(&mut self, seeds: Vec<(PieceCoord, DestructionMethod)>, fb: &mut LevelFeedback) {
        let mut pending: VecDeque<_> = seeds.into();
        let mut visited = BTreeSet::new();

        while let Some((coord, method)) = pending.pop_front() {
            if !visited.insert(coord) {
                continue;
            }
            let Some(piece) = self.piece(coord.0, coord.1) else {
                continue;
            };
            let center = piece.center;
            let frozen = piece.status.frozen;
            match piece.kind {
                PieceKind::Empty
                | PieceKind::Solid
                | PieceKind::Cannon(_)
                | PieceKind::Portal { .. }
                | PieceKind::Switch(_) => {}
                PieceKind::Tesla(_) => {
                    self.toggle_tesla(coord, fb);
                }
                PieceKind::Prism => {
                    if matches!(method, DestructionMethod::Collateral | DestructionMethod::Tesla) {
                        self.piece_changed(coord, PieceKind::Empty, fb);
                    }
                }
                PieceKind::Bomb => {
                    self.piece_changed(coord, PieceKind::Empty, fb);
                    for n in self.block_around(coord) {
                        pending.push_back((n, DestructionMethod::Bomb));
                    }
                }
                PieceKind::Ink => {
                    self.piece_changed(coord, PieceKind::Empty, fb);
                    fb.events.push(GameEvent::InkSplatter {
                        w: coord.0,
                        h: coord.1,
                    });
                }
                PieceKind::OneWay(_) | PieceKind::NoEntry => {
                    if matches!(method, DestructionMethod::Collateral | DestructionMethod::Tesla) {
                        self.piece_changed(coord, PieceKind::Empty, fb);
                        fb.drops.push(ItemDrop::roll(center));
                    } else if frozen {
                        self.set_frozen(coord, false);
                    }
                }
                PieceKind::Regen { infinite } => {
                    let dies = !infinite
                        || matches!(
                            method,
                            DestructionMethod::IceShatter
                                | DestructionMethod::Collateral
                                | DestructionMethod::Tesla
                                | DestructionMethod::Rocket
                        );
                    if dies {
                        self.piece_changed(coord, PieceKind::Empty, fb);
                        if !infinite {
                            fb.drops.push(ItemDrop::roll(center));
                        }
                    }
                }
                PieceKind::AlwaysDrop => {
                    self.piece_changed(coord, PieceKind::Empty, fb);
                    fb.drops.push(ItemDrop::any(center));
                }
                PieceKind::Breakable(_) => {
                    self.piece_changed(coord, PieceKind::Empty, fb);
                    fb.drops.push(ItemDrop::roll(center));
                    if method == DestructionMethod::Fire {
                        fb.spawns.push(ProjectileSpawn {
                            kind: ProjectileKind::FireGlob,
                            position: center,
                            dir: Vec2::NEG_Y,
                        });
                    }
                }
            }
        }
    }

    /// Flip a tesla; switching on burns away whatever its arcs cross
    pub fn toggle_tesla(&mut self, coord: PieceCoord, fb: &mut LevelFeedback) -> bool {
        let Some(PieceKind::Tesla(t)) = self.piece_mut(coord.0, coord.1).map(|p| &mut p.kind) else {
            return false;
        };
        if !t.toggle() {
            return false;
        }
        let active = t.active;
        let partners = t.connected.clone();
        fb.events.push(GameEvent::TeslaToggled {
            w: coord.0,
            h: coord.1,
            active,
        });
        debug!("Tesla at {:?} now {}", coord, if active { "on" } else { "off" });

        if active {
            let mut seeds = Vec::new();
            for other in partners {
                if !self.tesla_active(other) {
                    continue;
                }
                for c in cells_between(coord, other) {
                    if self
                        .piece(c.0, c.1)
                        .is_some_and(|p| !matches!(p.kind, PieceKind::Empty | PieceKind::Tesla(_)))
                    {
                        seeds.push((c, DestructionMethod::Tesla));
                    }
                }
            }
            self.destroy_many(seeds, fb);
        }
        true
    }

    fn tesla_active(&self, (w, h): PieceCoord) -> bool {
        matches!(self.piece(w, h).map(|p| &p.kind), Some(PieceKind::Tesla(t)) if t.active)
    }

    /// Lightning segments between pairs of active connected teslas
    pub fn tesla_arcs(&self) -> Vec<(PieceCoord, PieceCoord, LineSeg2D)> {
        let mut arcs = Vec::new();
        for piece in &self.pieces {
            let PieceKind::Tesla(t) = &piece.kind else {
                continue;
            };
            if !t.active {
                continue;
            }
            let here = piece.coord();
            for &other in &t.connected {
                // Each pair once, from its lower-indexed end, and only over open cells
                if (other.1, other.0) > (here.1, here.0) && self.tesla_active(other) && self.clear_between(here, other) {
                    let end = LevelPiece::center_of(other.0, other.1);
                    arcs.push((here, other, LineSeg2D::new(piece.center, end)));
                }
            }
        }
        arcs
    }

    fn clear_between(&self, a: PieceCoord, b: PieceCoord) -> bool {
        cells_between(a, b)
            .into_iter()
            .all(|(w, h)| self.piece(w, h).is_some_and(|p| p.kind == PieceKind::Empty))
    }

    /// Earliest contact of a ball with any lightning arc over `dt`
    pub fn collide_tesla_arcs(&self, ball: &GameBall, dt: f32) -> Option<CollisionResult> {
        if !ball.can_collide() {
            return None;
        }
        let arcs = self.tesla_arcs();
        if arcs.is_empty() {
            return None;
        }
        let vel = ball.velocity();
        let reach = ball.radius() + TESLA_ARC_HALF_WIDTH;
        let step_time = dt / ARC_SAMPLES as f32;

        for i in 0..=ARC_SAMPLES {
            let time = step_time * i as f32;
            let pt = ball.center() + vel * time;
            for (_, _, seg) in &arcs {
                let closest = closest_point_on_segment(pt, seg);
                let away = pt - closest;
                if away.length_squared() < reach * reach && vel.dot(away) < 0.0 {
                    let normal = away.normalize_or(-vel.normalize_or_zero());
                    return Some(CollisionResult {
                        normal,
                        line: tangent_line(closest, normal),
                        time,
                    });
                }
            }
        }
        None
    }

    fn press_switch(&mut self, coord: PieceCoord, fb: &mut LevelFeedback) {
        let Some(PieceKind::Switch(s)) = self.piece_mut(coord.0, coord.1).map(|p| &mut p.kind) else {
            return;
        };
        if !s.press() {
            return;
        }
        let trigger = s.trigger;
        fb.events.push(GameEvent::PieceChanged {
            w: coord.0,
            h: coord.1,
        });
        self.trigger(trigger, fb);
    }

    /// Activate every piece carrying `trigger`
    pub fn trigger(&mut self, trigger: TriggerId, fb: &mut LevelFeedback) {
        let targets: Vec<PieceCoord> = self
            .pieces
            .iter()
            .filter(|p| p.trigger_id == Some(trigger))
            .map(LevelPiece::coord)
            .collect();
        for coord in targets {
            match self.piece(coord.0, coord.1).map(|p| &p.kind) {
                Some(PieceKind::Tesla(_)) => {
                    self.toggle_tesla(coord, fb);
                }
                Some(PieceKind::Breakable(_)) => self.diminish(coord, 1, fb),
                Some(kind) if kind.must_be_destroyed_to_end_level() => {
                    self.destroy_piece(coord, DestructionMethod::Regular, fb);
                }
                _ => {}
            }
        }
    }

    /// Respond to a projectile striking the piece at `coord`
    pub fn projectile_hit(
        &mut self,
        proj: &mut Projectile,
        coord: PieceCoord,
        fb: &mut LevelFeedback,
    ) -> ProjectileHit {
        let Some(piece) = self.piece(coord.0, coord.1) else {
            return ProjectileHit::default();
        };
        let kind = piece.kind.clone();
        if kind.projectile_passes_through() {
            proj.last_collided = Some(Collidee::Piece(coord));
            return ProjectileHit::default();
        }
        let center = piece.center;
        let remove = ProjectileHit {
            remove: true,
            splits: Vec::new(),
        };

        match proj.kind {
            ProjectileKind::PaddleRocket => {
                self.explode_around(coord, DestructionMethod::Rocket, fb);
                return remove;
            }
            ProjectileKind::PaddleMine => {
                proj.rest();
                proj.last_collided = Some(Collidee::Piece(coord));
                return ProjectileHit::default();
            }
            ProjectileKind::FireGlob | ProjectileKind::BossOrb => return remove,
            ProjectileKind::CollateralBlock => {
                self.destroy_piece(coord, DestructionMethod::Collateral, fb);
                proj.last_collided = Some(Collidee::Piece(coord));
                return ProjectileHit::default();
            }
            _ => {}
        }

        // Laser bullets from here on
        match kind {
            PieceKind::Empty | PieceKind::Cannon(_) => ProjectileHit::default(),
            PieceKind::Prism => {
                let impact = proj.position + proj.direction() * proj.half_height();
                let mut rays = super::piece::prism_rays(center, impact, proj.direction());
                let extra = rays.split_off(1);
                if let Some(first) = rays.first() {
                    proj.redirect(first);
                }
                proj.last_collided = Some(Collidee::Piece(coord));
                ProjectileHit {
                    remove: false,
                    splits: extra,
                }
            }
            PieceKind::Portal { sibling } => {
                proj.position = LevelPiece::center_of(sibling.0, sibling.1) + (proj.position - center);
                proj.last_collided = Some(Collidee::Piece(sibling));
                ProjectileHit::default()
            }
            PieceKind::Breakable(_) | PieceKind::AlwaysDrop => {
                if matches!(
                    proj.kind,
                    ProjectileKind::PaddleLaserBullet | ProjectileKind::BallLaserBullet
                ) {
                    self.diminish(coord, 1, fb);
                }
                remove
            }
            PieceKind::Regen { .. } => {
                if !proj.kind.is_hostile() {
                    self.hurt_regen(coord, proj.kind.damage(), DestructionMethod::Regular, fb);
                }
                remove
            }
            PieceKind::Bomb | PieceKind::Ink => {
                if !proj.kind.is_hostile() {
                    self.destroy_piece(coord, DestructionMethod::Regular, fb);
                }
                remove
            }
            PieceKind::Tesla(_) => {
                self.toggle_tesla(coord, fb);
                remove
            }
            PieceKind::Switch(_) => {
                self.press_switch(coord, fb);
                remove
            }
            PieceKind::Solid | PieceKind::OneWay(_) | PieceKind::NoEntry => remove,
        }
    }

    /// Apply `amount` of beam damage to a piece
    pub fn tick_beam_damage(&mut self, coord: PieceCoord, amount: f32, fb: &mut LevelFeedback) {
        let Some(piece) = self.piece_mut(coord.0, coord.1) else {
            return;
        };
        match &mut piece.kind {
            PieceKind::Breakable(_) => {
                if piece.drain_life(amount, PIECE_STARTING_LIFE_POINTS) {
                    self.diminish(coord, 1, fb);
                }
            }
            PieceKind::Bomb | PieceKind::Ink | PieceKind::AlwaysDrop => {
                if piece.drain_life(amount, PIECE_STARTING_LIFE_POINTS) {
                    self.destroy_piece(coord, DestructionMethod::Beam, fb);
                }
            }
            PieceKind::Regen { .. } => self.hurt_regen(coord, amount, DestructionMethod::Beam, fb),
            PieceKind::Tesla(t) => {
                if !t.changeable {
                    return;
                }
                t.life_until_toggle -= amount;
                if t.life_until_toggle <= 0.0 {
                    t.life_until_toggle = TOGGLE_ON_OFF_LIFE_POINTS;
                    self.toggle_tesla(coord, fb);
                }
            }
            PieceKind::Switch(s) => {
                s.life_until_toggle -= amount;
                if s.life_until_toggle <= 0.0 {
                    s.life_until_toggle = TOGGLE_ON_OFF_LIFE_POINTS;
                    self.press_switch(coord, fb);
                }
            }
            _ => {}
        }
    }

    /// Advance piece timers, heal or burn regen blocks and spin loaded cannons
    pub fn tick(&mut self, dt: f32, balls: &mut [GameBall], fb: &mut LevelFeedback) {
        let mut burning = Vec::new();
        for piece in self.pieces.iter_mut() {
            let center = piece.center;
            match &mut piece.kind {
                PieceKind::Regen { infinite: false } => {
                    if piece.status.on_fire {
                        burning.push((piece.w, piece.h));
                    } else if !piece.status.frozen && piece.life_points < REGEN_MAX_LIFE_POINTS {
                        piece.life_points = (piece.life_points + REGEN_LIFE_POINTS_PER_SEC * dt).min(REGEN_MAX_LIFE_POINTS);
                    }
                }
                PieceKind::Tesla(t) => t.since_toggle += dt,
                PieceKind::Switch(s) => s.cooldown = (s.cooldown - dt).max(0.0),
                PieceKind::Cannon(c) => match c.rotate_and_fire(dt) {
                    CannonTick::Idle => {}
                    CannonTick::Rotated(deg) => {
                        piece.bounds.rotate(deg, center);
                        if let Some(ball) = c.loaded_ball.and_then(|id| balls.iter_mut().find(|b| b.id == id)) {
                            ball.set_center(center);
                        }
                    }
                    CannonTick::Fire(id) => {
                        if let Some(ball) = balls.iter_mut().find(|b| b.id == id) {
                            ball.fire_from_cannon(c.fire_direction(), c.barrel_end(center));
                            ball.set_last_piece(Some((piece.w, piece.h)));
                        }
                        fb.events.push(GameEvent::BallFiredFromCannon {
                            w: piece.w,
                            h: piece.h,
                        });
                    }
                },
                _ => {}
            }
        }
        for coord in burning {
            self.hurt_regen(coord, FIRE_DAMAGE_PER_SEC * dt, DestructionMethod::Fire, fb);
        }
    }

    /// True once nothing that must be destroyed remains
    pub fn is_complete(&self) -> bool {
        !self
            .pieces
            .iter()
            .any(|p| p.kind.must_be_destroyed_to_end_level())
    }

    /// Outline of the playfield padded by one piece height
    pub fn bounds_aabb(&self) -> Aabb2D {
        Aabb2D::new(
            Vec2::new(-PIECE_HEIGHT, DEATH_Y - PIECE_HEIGHT),
            Vec2::new(self.unit_width() + PIECE_HEIGHT, self.unit_height() + PIECE_HEIGHT),
        )
    }

    /// Translation that moves `aabb` back inside the level walls
    pub fn collide_boss_aabb(&self, aabb: &Aabb2D) -> Vec2 {
        let mut fix = Vec2::ZERO;
        if aabb.min.x < 0.0 {
            fix.x = -aabb.min.x;
        } else if aabb.max.x > self.unit_width() {
            fix.x = self.unit_width() - aabb.max.x;
        }
        if aabb.max.y > self.unit_height() {
            fix.y = self.unit_height() - aabb.max.y;
        } else if aabb.min.y < 0.0 {
            fix.y = -aabb.min.y;
        }
        fix
    }
}

/// Cells strictly between two cells sharing a row or column
fn cells_between(a: PieceCoord, b: PieceCoord) -> Vec<PieceCoord> {
    if a.1 == b.1 {
        let (lo, hi) = (a.0.min(b.0), a.0.max(b.0));
        (lo + 1..hi).map(|w| (w, a.1)).collect()
    } else if a.0 == b.0 {
        let (lo, hi) = (a.1.min(b.1), a.1.max(b.1));
        (lo + 1..hi).map(|h| (a.0, h)).collect()
    } else {
        Vec::new()
    }
}
