//! Game settings and preferences
//!
//! Persisted as JSON next to the leaderboard.

use std::fs;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_LIVES, PADDLE_DEFAULT_SPEED};
use crate::error::Result;
use crate::sim::ball::BallSpeed;
use crate::sim::beam::PADDLE_BEAM_DAMAGE_PER_SEC;

/// Difficulty levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" | "med" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Speed tier a freshly launched ball starts at
    pub fn ball_speed(&self) -> BallSpeed {
        match self {
            Difficulty::Easy => BallSpeed::Slow,
            Difficulty::Medium => BallSpeed::Normal,
            Difficulty::Hard => BallSpeed::Fast,
        }
    }

    /// Multiplier on boss top speeds
    pub fn boss_speed_scale(&self) -> f32 {
        match self {
            Difficulty::Easy => 0.75,
            Difficulty::Medium => 1.0,
            Difficulty::Hard => 1.3,
        }
    }

    /// Lives handed out at the start of a run
    pub fn lives(&self) -> u32 {
        match self {
            Difficulty::Easy => DEFAULT_LIVES + 2,
            Difficulty::Medium => DEFAULT_LIVES,
            Difficulty::Hard => DEFAULT_LIVES - 1,
        }
    }
}

/// Game settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub difficulty: Difficulty,

    // === Run ===
    /// Lives at the start of a run
    pub starting_lives: u32,
    /// Speed tier for launched balls
    pub ball_start_speed: BallSpeed,

    // === Paddle ===
    /// Damage per second of the paddle's laser beam
    pub beam_damage_per_sec: f32,
    /// Paddle top speed (units/s)
    pub paddle_speed: f32,

    // === Items ===
    /// Chance a destroyed block drops an item
    pub item_drop_chance: f32,
}

/// Chance of an item falling out of an ordinary destroyed block
pub const DEFAULT_ITEM_DROP_CHANCE: f32 = 0.1;

impl Default for Settings {
    fn default() -> Self {
        Self::from_difficulty(Difficulty::Medium)
    }
}

impl Settings {
    /// Create settings from a difficulty (applies its defaults)
    pub fn from_difficulty(difficulty: Difficulty) -> Self {
        let mut settings = Self {
            difficulty,
            starting_lives: DEFAULT_LIVES,
            ball_start_speed: BallSpeed::Normal,
            beam_damage_per_sec: PADDLE_BEAM_DAMAGE_PER_SEC,
            paddle_speed: PADDLE_DEFAULT_SPEED,
            item_drop_chance: DEFAULT_ITEM_DROP_CHANCE,
        };
        settings.apply_difficulty(difficulty);
        settings
    }

    /// Apply a difficulty (updates difficulty-dependent settings)
    pub fn apply_difficulty(&mut self, difficulty: Difficulty) {
        self.difficulty = difficulty;
        self.starting_lives = difficulty.lives();
        self.ball_start_speed = difficulty.ball_speed();
    }

    pub fn boss_speed_scale(&self) -> f32 {
        self.difficulty.boss_speed_scale()
    }

    /// Load settings, falling back to the defaults when the file is missing or bad
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::try_load(path) {
            Ok(settings) => {
                info!("Loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                warn!("Using default settings ({}: {})", path.display(), e);
                Self::default()
            }
        }
    }

    fn try_load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!("Settings saved to {}", path.display());
        Ok(())
    }
}
