//! Power-up items that fall out of the level
//!
//! Destroyed blocks ask for a drop through [`LevelFeedback`](super::level::LevelFeedback).
//! The game state settles each request with its own RNG, spawns a falling
//! [`GameItem`], and applies the item once the paddle catches it. Items with
//! a lasting effect run on an [`ItemTimer`] until they wear off.

use glam::Vec2;
use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::ball::{BallSpeed, BallState, BallType};
use super::collision::{Aabb2D, aabbs_overlap};
use super::paddle::PaddleType;
use super::state::{GameEvent, GameState};
use crate::consts::*;
use crate::rotate_deg;

pub const ITEM_HALF_WIDTH: f32 = 1.0;
pub const ITEM_HALF_HEIGHT: f32 = 0.5;
pub const ITEM_FALL_SPEED: f32 = 4.0;
/// How long a timed item lasts once caught
pub const ITEM_DURATION_SECS: f32 = 20.0;
/// Angle between the balls a multi-ball item fans out into
const MULTI_BALL_SPREAD_DEG: f32 = 72.0;
/// Fresh copies ignore each other for this long
const MULTI_BALL_SEPARATION_SECS: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    BallGrow,
    BallShrink,
    BallSlowDown,
    BallSpeedUp,
    CrazyBall,
    FireBall,
    GhostBall,
    GravityBall,
    IceBall,
    InvisiBall,
    OmniLaserBall,
    UberBall,
    LaserBulletPaddle,
    LaserBeamPaddle,
    RocketPaddle,
    MineLauncherPaddle,
    ShieldPaddle,
    StickyPaddle,
    MagnetPaddle,
    PaddleGrow,
    PaddleShrink,
    LifeUp,
    MultiBall3,
    MultiBall5,
}

impl ItemKind {
    pub const ALL: [ItemKind; 24] = [
        ItemKind::BallGrow,
        ItemKind::BallShrink,
        ItemKind::BallSlowDown,
        ItemKind::BallSpeedUp,
        ItemKind::CrazyBall,
        ItemKind::FireBall,
        ItemKind::GhostBall,
        ItemKind::GravityBall,
        ItemKind::IceBall,
        ItemKind::InvisiBall,
        ItemKind::OmniLaserBall,
        ItemKind::UberBall,
        ItemKind::LaserBulletPaddle,
        ItemKind::LaserBeamPaddle,
        ItemKind::RocketPaddle,
        ItemKind::MineLauncherPaddle,
        ItemKind::ShieldPaddle,
        ItemKind::StickyPaddle,
        ItemKind::MagnetPaddle,
        ItemKind::PaddleGrow,
        ItemKind::PaddleShrink,
        ItemKind::LifeUp,
        ItemKind::MultiBall3,
        ItemKind::MultiBall5,
    ];

    /// Seconds the effect lasts; `None` for one-off items
    pub fn duration(self) -> Option<f32> {
        match self {
            ItemKind::BallGrow
            | ItemKind::BallShrink
            | ItemKind::PaddleGrow
            | ItemKind::PaddleShrink
            | ItemKind::LifeUp
            | ItemKind::MultiBall3
            | ItemKind::MultiBall5
            | ItemKind::LaserBeamPaddle
            | ItemKind::RocketPaddle => None,
            _ => Some(ITEM_DURATION_SECS),
        }
    }

    /// Flag set on every ball while the item is active
    pub fn ball_type(self) -> Option<BallType> {
        match self {
            ItemKind::BallSlowDown => Some(BallType::SLOW),
            ItemKind::BallSpeedUp => Some(BallType::FAST),
            ItemKind::CrazyBall => Some(BallType::CRAZY),
            ItemKind::FireBall => Some(BallType::FIRE),
            ItemKind::GhostBall => Some(BallType::GHOST),
            ItemKind::GravityBall => Some(BallType::GRAVITY),
            ItemKind::IceBall => Some(BallType::ICE),
            ItemKind::InvisiBall => Some(BallType::INVISI),
            ItemKind::OmniLaserBall => Some(BallType::OMNI_LASER),
            ItemKind::UberBall => Some(BallType::UBER),
            _ => None,
        }
    }

    /// Paddle type held while the item is active
    pub fn paddle_type(self) -> Option<PaddleType> {
        match self {
            ItemKind::LaserBulletPaddle => Some(PaddleType::LASER_BULLET),
            ItemKind::MineLauncherPaddle => Some(PaddleType::MINE),
            ItemKind::ShieldPaddle => Some(PaddleType::SHIELD),
            ItemKind::StickyPaddle => Some(PaddleType::STICKY),
            ItemKind::MagnetPaddle => Some(PaddleType::MAGNET),
            _ => None,
        }
    }

    /// The item this one cancels when caught
    pub fn opposite(self) -> Option<ItemKind> {
        match self {
            ItemKind::FireBall => Some(ItemKind::IceBall),
            ItemKind::IceBall => Some(ItemKind::FireBall),
            ItemKind::BallSlowDown => Some(ItemKind::BallSpeedUp),
            ItemKind::BallSpeedUp => Some(ItemKind::BallSlowDown),
            _ => None,
        }
    }
}

/// How a drop request picks its item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropChance {
    /// Drops at the settings' item chance, if at all
    Roll,
    /// Always drops something
    AnyItem,
    Always(ItemKind),
}

/// Request for an item to appear at `position`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemDrop {
    pub position: Vec2,
    pub chance: DropChance,
}

impl ItemDrop {
    pub fn roll(position: Vec2) -> Self {
        Self {
            position,
            chance: DropChance::Roll,
        }
    }

    pub fn any(position: Vec2) -> Self {
        Self {
            position,
            chance: DropChance::AnyItem,
        }
    }
}

/// An item falling toward the paddle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameItem {
    pub id: u32,
    pub kind: ItemKind,
    pub center: Vec2,
}

impl GameItem {
    pub fn new(id: u32, kind: ItemKind, center: Vec2) -> Self {
        Self { id, kind, center }
    }

    pub fn aabb(&self) -> Aabb2D {
        Aabb2D::from_center(self.center, Vec2::new(ITEM_HALF_WIDTH, ITEM_HALF_HEIGHT))
    }

    /// Fall one step; false once it has dropped out of the level
    pub fn tick(&mut self, dt: f32) -> bool {
        self.center.y -= ITEM_FALL_SPEED * dt;
        self.center.y + ITEM_HALF_HEIGHT >= DEATH_Y
    }
}

/// Time left on a caught item's effect
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemTimer {
    pub kind: ItemKind,
    pub remaining: f32,
}

/// Pick the item a drop request produces, if any
pub fn resolve_drop<R: Rng>(chance: DropChance, drop_chance: f32, rng: &mut R) -> Option<ItemKind> {
    match chance {
        DropChance::Always(kind) => Some(kind),
        DropChance::AnyItem => Some(random_item(rng)),
        DropChance::Roll => {
            if rng.random_bool(drop_chance.clamp(0.0, 1.0) as f64) {
                Some(random_item(rng))
            } else {
                None
            }
        }
    }
}

fn random_item<R: Rng>(rng: &mut R) -> ItemKind {
    ItemKind::ALL[rng.random_range(0..ItemKind::ALL.len())]
}

/// Move falling items, hand the caught ones to the paddle and run down timers
pub fn tick_items(state: &mut GameState, dt: f32) {
    let paddle = state.paddle.aabb();
    let mut caught = Vec::new();
    state.items.retain_mut(|item| {
        if aabbs_overlap(&item.aabb(), &paddle) {
            caught.push(item.kind);
            return false;
        }
        item.tick(dt)
    });
    for kind in caught {
        activate(state, kind);
    }

    let mut expired = Vec::new();
    state.item_timers.retain_mut(|timer| {
        timer.remaining -= dt;
        if timer.remaining <= 0.0 {
            expired.push(timer.kind);
            false
        } else {
            true
        }
    });
    for kind in expired {
        deactivate(state, kind);
    }
}

/// Apply a caught item
pub fn activate(state: &mut GameState, kind: ItemKind) {
    info!("Caught {:?}", kind);
    state.push_event(GameEvent::ItemCollected { kind });
    if let Some(opposite) = kind.opposite() {
        end_timer(state, opposite);
    }

    match kind {
        ItemKind::BallGrow => {
            for ball in state.balls.iter_mut() {
                ball.grow();
            }
        }
        ItemKind::BallShrink => {
            for ball in state.balls.iter_mut() {
                ball.shrink();
            }
        }
        ItemKind::BallSlowDown => set_moving_speed(state, BallSpeed::Slow),
        ItemKind::BallSpeedUp => set_moving_speed(state, BallSpeed::Fast),
        ItemKind::PaddleGrow => {
            state.paddle.grow();
        }
        ItemKind::PaddleShrink => {
            state.paddle.shrink();
        }
        ItemKind::LifeUp => state.lives += 1,
        ItemKind::MultiBall3 => split_balls(state, 2),
        ItemKind::MultiBall5 => split_balls(state, 4),
        ItemKind::LaserBeamPaddle => state.paddle.add_type(PaddleType::LASER_BEAM),
        ItemKind::RocketPaddle => state.paddle.add_type(PaddleType::ROCKET),
        _ => {}
    }
    if let Some(flag) = kind.ball_type() {
        for ball in state.balls.iter_mut() {
            ball.ball_type.insert(flag);
        }
    }
    if let Some(flag) = kind.paddle_type() {
        state.paddle.add_type(flag);
    }

    if let Some(secs) = kind.duration() {
        match state.item_timers.iter_mut().find(|t| t.kind == kind) {
            Some(timer) => timer.remaining = secs,
            None => state.item_timers.push(ItemTimer { kind, remaining: secs }),
        }
    }
}

/// Undo a timed item's effect
fn deactivate(state: &mut GameState, kind: ItemKind) {
    debug!("{:?} wore off", kind);
    if let Some(flag) = kind.ball_type() {
        for ball in state.balls.iter_mut() {
            ball.ball_type.remove(flag);
        }
    }
    if let Some(flag) = kind.paddle_type() {
        state.paddle.remove_type(flag);
    }
    if matches!(kind, ItemKind::BallSlowDown | ItemKind::BallSpeedUp) {
        let speed = state.settings.ball_start_speed;
        set_moving_speed(state, speed);
    }
    state.push_event(GameEvent::ItemExpired { kind });
}

fn end_timer(state: &mut GameState, kind: ItemKind) {
    if let Some(idx) = state.item_timers.iter().position(|t| t.kind == kind) {
        state.item_timers.remove(idx);
        deactivate(state, kind);
    }
}

/// Drop every falling item and let every timer run out
pub fn clear_items(state: &mut GameState) {
    state.items.clear();
    for timer in std::mem::take(&mut state.item_timers) {
        deactivate(state, timer.kind);
    }
}

fn set_moving_speed(state: &mut GameState, speed: BallSpeed) {
    for ball in state.balls.iter_mut() {
        if ball.speed() != BallSpeed::Zero {
            ball.set_speed(speed);
        }
    }
}

/// Fan copies of the first ball in play out around its direction
fn split_balls(state: &mut GameState, copies: usize) {
    let Some(source) = state.balls.iter().find(|b| b.state == BallState::InPlay).cloned() else {
        return;
    };
    let dir = source.direction().normalize_or(Vec2::Y);
    for i in 1..=copies {
        let mut ball = source.clone();
        ball.id = state.next_entity_id();
        ball.set_velocity(source.speed(), rotate_deg(dir, MULTI_BALL_SPREAD_DEG * i as f32));
        state.balls.push(ball);
    }
    for ball in state.balls.iter_mut() {
        ball.disable_ball_collisions_for(MULTI_BALL_SEPARATION_SECS);
    }
    info!("Split into {} balls", state.balls.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use crate::sim::level::GameLevel;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn state() -> GameState {
        let level = GameLevel::from_layout(&["rrrr", "....", "....", "...."]).expect("valid layout");
        GameState::new(5, level, Settings::default())
    }

    fn launch(state: &mut GameState) {
        state.balls[0].state = BallState::InPlay;
        state.balls[0].set_velocity(BallSpeed::Normal, Vec2::Y);
    }

    #[test]
    fn test_resolve_drop() {
        let mut rng = Pcg32::seed_from_u64(4);
        assert_eq!(resolve_drop(DropChance::Roll, 0.0, &mut rng), None);
        assert!(resolve_drop(DropChance::Roll, 1.0, &mut rng).is_some());
        assert!(resolve_drop(DropChance::AnyItem, 0.0, &mut rng).is_some());
        assert_eq!(
            resolve_drop(DropChance::Always(ItemKind::LifeUp), 0.0, &mut rng),
            Some(ItemKind::LifeUp)
        );
    }

    #[test]
    fn test_item_falls_and_is_caught() {
        let mut s = state();
        let start = s.paddle.top_center() + Vec2::new(0.0, 3.0);
        s.items.push(GameItem::new(99, ItemKind::StickyPaddle, start));
        tick_items(&mut s, 0.1);
        assert!(s.items[0].center.y < start.y);

        for _ in 0..20 {
            tick_items(&mut s, 0.1);
        }
        assert!(s.items.is_empty());
        assert!(s.paddle.has_type(PaddleType::STICKY));
        assert!(s.events().contains(&GameEvent::ItemCollected { kind: ItemKind::StickyPaddle }));
    }

    #[test]
    fn test_missed_item_falls_out() {
        let mut s = state();
        let far_side = Vec2::new(s.paddle.center.x + 8.0, 1.0);
        s.items.push(GameItem::new(99, ItemKind::LifeUp, far_side));
        for _ in 0..20 {
            tick_items(&mut s, 0.1);
        }
        assert!(s.items.is_empty());
        assert_eq!(s.lives, Settings::default().starting_lives);
    }

    #[test]
    fn test_timed_item_wears_off() {
        let mut s = state();
        activate(&mut s, ItemKind::GhostBall);
        assert!(s.balls[0].ball_type.contains(BallType::GHOST));

        tick_items(&mut s, ITEM_DURATION_SECS - 1.0);
        assert!(s.balls[0].ball_type.contains(BallType::GHOST));
        tick_items(&mut s, 1.5);
        assert!(!s.balls[0].ball_type.contains(BallType::GHOST));
        assert!(s.item_timers.is_empty());
        assert!(s.events().contains(&GameEvent::ItemExpired { kind: ItemKind::GhostBall }));
    }

    #[test]
    fn test_opposites_cancel() {
        let mut s = state();
        activate(&mut s, ItemKind::FireBall);
        activate(&mut s, ItemKind::IceBall);
        let t = s.balls[0].ball_type;
        assert!(t.contains(BallType::ICE) && !t.contains(BallType::FIRE));
        assert_eq!(s.item_timers.len(), 1);
    }

    #[test]
    fn test_slow_down_and_restore() {
        let mut s = state();
        launch(&mut s);
        activate(&mut s, ItemKind::BallSlowDown);
        assert_eq!(s.balls[0].speed(), BallSpeed::Slow);
        tick_items(&mut s, ITEM_DURATION_SECS + 0.1);
        assert_eq!(s.balls[0].speed(), s.settings.ball_start_speed);
        assert!(!s.balls[0].ball_type.contains(BallType::SLOW));
    }

    #[test]
    fn test_multi_ball_fans_out() {
        let mut s = state();
        launch(&mut s);
        activate(&mut s, ItemKind::MultiBall5);
        assert_eq!(s.balls.len(), 5);
        let mut ids: Vec<u32> = s.balls.iter().map(|b| b.id).collect();
        ids.dedup();
        assert_eq!(ids.len(), 5);
        for pair in s.balls.windows(2) {
            assert!(!pair[0].ball_collides_with(&pair[1]), "fresh copies pass through each other");
        }
        let dirs: Vec<Vec2> = s.balls.iter().map(|b| b.direction()).collect();
        assert!((dirs[1] - rotate_deg(Vec2::Y, 72.0)).length() < 1e-4);
    }

    #[test]
    fn test_multi_ball_needs_ball_in_play() {
        let mut s = state();
        activate(&mut s, ItemKind::MultiBall3);
        assert_eq!(s.balls.len(), 1);
    }

    #[test]
    fn test_clear_items_ends_effects() {
        let mut s = state();
        activate(&mut s, ItemKind::ShieldPaddle);
        s.items.push(GameItem::new(50, ItemKind::LifeUp, Vec2::new(3.0, 3.0)));
        clear_items(&mut s);
        assert!(s.items.is_empty() && s.item_timers.is_empty());
        assert!(!s.paddle.has_type(PaddleType::SHIELD));
    }
}
