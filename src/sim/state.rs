//! Game state and the events it reports
//!
//! Everything one run needs between ticks lives here, so a state can be
//! serialized and resumed with identical results.

use glam::Vec2;
use log::debug;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::ball::{BallState, GameBall};
use super::beam::Beam;
use super::boss::Boss;
use super::item::{GameItem, ItemDrop, ItemKind, ItemTimer, resolve_drop};
use super::level::{GameLevel, LevelFeedback};
use super::paddle::PlayerPaddle;
use super::projectile::{Projectile, ProjectileKind, ProjectileSpawn};
use crate::settings::Settings;

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Ball resting on the paddle, waiting for launch input
    BallOnPaddle,
    /// Active gameplay
    BallInPlay,
    /// Game is paused
    Paused,
    /// Every required piece is gone (and the boss, if any, is dead)
    LevelComplete,
    /// Run ended
    GameOver,
    /// In play with a live boss
    BossBattle,
}

/// Something the host may want to react to (sound, effects, UI)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    BallPaddleCollision { ball: u32 },
    BallBlockCollision { w: usize, h: usize },
    BlockDestroyed { w: usize, h: usize },
    PieceChanged { w: usize, h: usize },
    BallFiredFromCannon { w: usize, h: usize },
    BallDeath { ball: u32 },
    LifeLost { lives_left: u32 },
    BeamChanged,
    BossHurt { part: usize },
    BossAiStateChanged { state: String },
    BossDefeated,
    LevelCompleted,
    GameOver,
    ProjectileSpawned { id: u32, kind: ProjectileKind },
    TeslaToggled { w: usize, h: usize, active: bool },
    InkSplatter { w: usize, h: usize },
    /// A boss shot or strike reached the paddle
    PaddleHit,
    ItemsSummoned { count: u32 },
    ItemDropped { id: u32, kind: ItemKind },
    ItemCollected { kind: ItemKind },
    ItemExpired { kind: ItemKind },
}

/// Complete game state (deterministic, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub(super) rng: Pcg32,
    pub settings: Settings,
    pub level: GameLevel,
    pub paddle: PlayerPaddle,
    /// Active balls (sorted by id for determinism)
    pub balls: Vec<GameBall>,
    /// Active projectiles (sorted by id for determinism)
    pub projectiles: Vec<Projectile>,
    pub beams: Vec<Beam>,
    /// Falling items (sorted by id for determinism)
    #[serde(default)]
    pub items: Vec<GameItem>,
    /// Effects of caught items still running
    #[serde(default)]
    pub item_timers: Vec<ItemTimer>,
    pub boss: Option<Boss>,
    pub score: u64,
    pub lives: u32,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub phase: GamePhase,
    /// Phase to resume once unpaused
    #[serde(default)]
    pub(super) paused_from: Option<GamePhase>,
    /// Pull applied to gravity balls
    pub gravity_dir: Vec2,
    /// Events since the last drain
    #[serde(skip)]
    events: Vec<GameEvent>,
    /// Next entity ID
    next_id: u32,
}

impl GameState {
    /// Create a new game state on `level` with the given seed
    pub fn new(seed: u64, level: GameLevel, settings: Settings) -> Self {
        let paddle = PlayerPaddle::new(0.0, level.unit_width());
        let mut state = Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            lives: settings.starting_lives,
            settings,
            level,
            paddle,
            balls: Vec::new(),
            projectiles: Vec::new(),
            beams: Vec::new(),
            items: Vec::new(),
            item_timers: Vec::new(),
            boss: None,
            score: 0,
            time_ticks: 0,
            phase: GamePhase::BallOnPaddle,
            paused_from: None,
            gravity_dir: Vec2::NEG_Y,
            events: Vec::new(),
            next_id: 1,
        };

        // Spawn initial ball on the paddle
        state.spawn_ball_on_paddle();

        state
    }

    /// Put a boss into the level
    pub fn with_boss(mut self, boss: Boss) -> Self {
        self.boss = Some(boss);
        self
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Spawn a ball resting on the paddle's centre
    pub fn spawn_ball_on_paddle(&mut self) {
        let id = self.next_entity_id();
        let mut ball = GameBall::new(id, self.paddle.top_center());
        ball.state = BallState::OnPaddle { offset: 0.0 };
        ball.set_center(self.paddle.top_center() + Vec2::new(0.0, ball.radius()));
        self.balls.push(ball);
    }

    pub fn spawn_projectile(&mut self, spawn: ProjectileSpawn) -> u32 {
        let id = self.next_entity_id();
        self.projectiles
            .push(Projectile::new(id, spawn.kind, spawn.position, spawn.dir));
        self.events.push(GameEvent::ProjectileSpawned { id, kind: spawn.kind });
        id
    }

    /// Fold a level operation's side effects into the run
    pub fn absorb(&mut self, fb: LevelFeedback) {
        if fb.points > 0 {
            debug!("+{} points", fb.points);
        }
        self.score += fb.points;
        self.events.extend(fb.events);
        for spawn in fb.spawns {
            self.spawn_projectile(spawn);
        }
        for drop in fb.drops {
            self.drop_item(drop);
        }
    }

    /// Settle a drop request, spawning the item if the roll allows
    pub fn drop_item(&mut self, drop: ItemDrop) -> Option<u32> {
        let kind = resolve_drop(drop.chance, self.settings.item_drop_chance, &mut self.rng)?;
        let id = self.next_entity_id();
        self.items.push(GameItem::new(id, kind, drop.position));
        self.events.push(GameEvent::ItemDropped { id, kind });
        debug!("Dropped {:?} at {:?}", kind, drop.position);
        Some(id)
    }

    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    /// Hand every pending event to the caller
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Phases in which balls move and collide
    pub fn is_in_play(&self) -> bool {
        matches!(self.phase, GamePhase::BallInPlay | GamePhase::BossBattle)
    }

    /// Phase to enter once a ball is launched
    pub fn play_phase(&self) -> GamePhase {
        match &self.boss {
            Some(boss) if !boss.is_dead() => GamePhase::BossBattle,
            _ => GamePhase::BallInPlay,
        }
    }

    /// Ensure entities are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.balls.sort_by_key(|b| b.id);
        self.projectiles.sort_by_key(|p| p.id);
        self.items.sort_by_key(|i| i.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level() -> GameLevel {
        GameLevel::from_layout(&["rrrr", "....", "...."]).expect("valid layout")
    }

    #[test]
    fn test_new_state_has_ball_on_paddle() {
        let state = GameState::new(1, level(), Settings::default());
        assert_eq!(state.phase, GamePhase::BallOnPaddle);
        assert_eq!(state.balls.len(), 1);
        assert!(matches!(state.balls[0].state, BallState::OnPaddle { .. }));
        assert!(state.balls[0].center().y > state.paddle.top_center().y);
        assert_eq!(state.lives, Settings::default().starting_lives);
    }

    #[test]
    fn test_absorb_feedback() {
        let mut state = GameState::new(1, level(), Settings::default());
        let fb = LevelFeedback {
            events: vec![GameEvent::BlockDestroyed { w: 0, h: 2 }],
            points: 25,
            spawns: vec![ProjectileSpawn {
                kind: ProjectileKind::FireGlob,
                position: Vec2::new(1.0, 2.0),
                dir: Vec2::NEG_Y,
            }],
            drops: vec![ItemDrop {
                position: Vec2::new(5.0, 2.0),
                chance: super::super::item::DropChance::Always(ItemKind::LifeUp),
            }],
        };
        state.absorb(fb);
        assert_eq!(state.score, 25);
        assert_eq!(state.projectiles.len(), 1);
        assert_eq!(state.items.len(), 1);
        assert_eq!(state.items[0].center, Vec2::new(5.0, 2.0));

        let events = state.drain_events();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[1], GameEvent::ProjectileSpawned { kind: ProjectileKind::FireGlob, .. }));
        assert!(matches!(events[2], GameEvent::ItemDropped { kind: ItemKind::LifeUp, .. }));
        assert!(state.events().is_empty());
    }

    #[test]
    fn test_drop_roll_follows_settings() {
        let mut state = GameState::new(1, level(), Settings::default());
        state.settings.item_drop_chance = 0.0;
        assert_eq!(state.drop_item(ItemDrop::roll(Vec2::ZERO)), None);
        assert!(state.drop_item(ItemDrop::any(Vec2::ZERO)).is_some());
        state.settings.item_drop_chance = 1.0;
        assert!(state.drop_item(ItemDrop::roll(Vec2::ZERO)).is_some());
        assert_eq!(state.items.len(), 2);
    }

    #[test]
    fn test_entity_ids_increase() {
        let mut state = GameState::new(1, level(), Settings::default());
        let a = state.next_entity_id();
        let b = state.next_entity_id();
        assert!(b > a);
        assert!(a > state.balls[0].id);
    }
}
