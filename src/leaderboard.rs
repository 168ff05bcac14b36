//! Arcade leaderboard
//!
//! A fixed top-five table plus the best score seen on each level, persisted
//! as JSON.

use std::fs;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{BlammoError, Result};

/// Number of entries on the table
pub const NUM_ENTRIES: usize = 5;

/// Players that fill a fresh table
const DEFAULT_NAMES: [&str; NUM_ENTRIES] = ["BIF", "BAM", "BLM", "BIP", "BOP"];

/// A single leaderboard entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Three letter player tag
    pub name: String,
    pub score: u64,
}

/// Best score recorded for one level of one world
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelHighscore {
    pub world: u32,
    pub level: u32,
    pub score: u64,
}

/// Top-five leaderboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaderboard {
    /// Sorted descending by score
    pub entries: Vec<LeaderboardEntry>,
    /// Sorted by (world, level)
    #[serde(default)]
    pub level_highscores: Vec<LevelHighscore>,
}

impl Leaderboard {
    /// Fill the table with the default players, scaled from `top_score`
    ///
    /// Each place down divides the top score by a further 0.2 and rounds
    /// down to the hundred.
    pub fn new(top_score: u64) -> Self {
        let entries = DEFAULT_NAMES
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let divider = 1.0 + 0.2 * i as f64;
                let score = (top_score as f64 / divider) as u64;
                LeaderboardEntry {
                    name: name.to_string(),
                    score: score / 100 * 100,
                }
            })
            .collect();
        Self {
            entries,
            level_highscores: Vec::new(),
        }
    }

    /// Check if a score qualifies for the leaderboard
    pub fn qualifies(&self, score: u64) -> bool {
        if score == 0 {
            return false;
        }
        if self.entries.len() < NUM_ENTRIES {
            return true;
        }
        // Check if score beats the lowest entry
        self.entries.last().is_none_or(|e| score > e.score)
    }

    /// Get the rank a score would achieve (1-indexed, None if doesn't qualify)
    pub fn potential_rank(&self, score: u64) -> Option<usize> {
        if !self.qualifies(score) {
            return None;
        }
        let rank = self.entries.iter().position(|e| score > e.score);
        Some(rank.unwrap_or(self.entries.len()) + 1)
    }

    /// Add a new score to the leaderboard (if it qualifies)
    /// Returns the rank achieved (1-indexed) or None if didn't qualify
    pub fn add_score(&mut self, name: &str, score: u64) -> Option<usize> {
        let rank = self.potential_rank(score)?;
        let entry = LeaderboardEntry {
            name: normalize_name(name),
            score,
        };
        self.entries.insert(rank - 1, entry);
        self.entries.truncate(NUM_ENTRIES);
        info!("{} placed #{} with {}", self.entries[rank - 1].name, rank, score);
        Some(rank)
    }

    /// Get the top score (if any)
    pub fn top_score(&self) -> Option<u64> {
        self.entries.first().map(|e| e.score)
    }

    pub fn level_highscore(&self, world: u32, level: u32) -> Option<u64> {
        self.level_highscores
            .iter()
            .find(|h| h.world == world && h.level == level)
            .map(|h| h.score)
    }

    /// Record a level result; returns true if it is a new best for that level
    pub fn record_level_score(&mut self, world: u32, level: u32, score: u64) -> bool {
        match self
            .level_highscores
            .binary_search_by_key(&(world, level), |h| (h.world, h.level))
        {
            Ok(i) => {
                let best = &mut self.level_highscores[i];
                if score <= best.score {
                    return false;
                }
                best.score = score;
            }
            Err(i) => self.level_highscores.insert(i, LevelHighscore { world, level, score }),
        }
        true
    }

    /// Load a leaderboard, rejecting files that do not hold a full table
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let mut board: Leaderboard = serde_json::from_str(&json)?;
        if board.entries.len() != NUM_ENTRIES {
            return Err(BlammoError::InvalidLeaderboard {
                expected: NUM_ENTRIES,
                found: board.entries.len(),
            });
        }
        board.entries.sort_by(|a, b| b.score.cmp(&a.score));
        board.level_highscores.sort_by_key(|h| (h.world, h.level));
        info!("Loaded leaderboard from {}", path.display());
        Ok(board)
    }

    /// Load a leaderboard, or start a fresh one from `top_score`
    pub fn load_or_new(path: impl AsRef<Path>, top_score: u64) -> Self {
        let path = path.as_ref();
        Self::load(path).unwrap_or_else(|e| {
            info!("Starting a fresh leaderboard ({}: {})", path.display(), e);
            Self::new(top_score)
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!("Leaderboard saved ({} level highscores)", self.level_highscores.len());
        Ok(())
    }
}

/// Upper-case a tag and cut it to three letters
fn normalize_name(name: &str) -> String {
    let tag: String = name
        .chars()
        .filter(|c| !c.is_whitespace())
        .take(3)
        .collect::<String>()
        .to_uppercase();
    if tag.is_empty() { "???".to_string() } else { tag }
}
