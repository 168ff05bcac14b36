//! Biff Bam Blammo headless runner
//!
//! Plays a demo level with the idle-mode autopilot and records the score.
//!
//! Usage: `blammo --seed 7 --seconds 30 --settings settings.json --boss gothic`

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use log::{debug, info};

use blammo::consts::SIM_DT;
use blammo::sim::{Boss, GameEvent, GameLevel, GamePhase, GameState, TickInput, tick};
use blammo::{Leaderboard, Settings};

const LEADERBOARD_FILE: &str = "blammo_leaderboard.json";
/// Top score the default leaderboard is scaled from
const LEADERBOARD_TOP_SCORE: u64 = 20_000;

/// Demo level, top row first
const DEMO_LAYOUT: &[&str] = &[
    "..........",
    "rrrrbbrrrr",
    "oooooooooo",
    "yyyk..kyyy",
    "gggggggggg",
    "s..t..t..s",
    "....pp....",
    "..........",
    "...c..c...",
    "..........",
    "P........P",
    "..........",
    "..........",
    "..........",
];

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BossChoice {
    Classical,
    Gothic,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Run a Biff Bam Blammo level on autopilot", long_about=None)]
struct Args {
    /// Seed for the run's random number generator
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    /// Simulated seconds to play before stopping
    #[arg(long, default_value_t = 60.0)]
    seconds: f32,

    /// Settings JSON; the leaderboard is kept next to it
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Fight a boss instead of playing the demo level
    #[arg(long, value_enum)]
    boss: Option<BossChoice>,
}

/// Boss arena: one breakable row along the top, open space below
fn boss_level() -> anyhow::Result<GameLevel> {
    let mut layout = vec!["............"; 24];
    layout[0] = "rrrrrrrrrrrr";
    Ok(GameLevel::from_layout(&layout)?)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let seed = args.seed;
    let seconds = args.seconds;
    let settings_path = args.settings;
    let settings = match &settings_path {
        Some(path) => Settings::load(path),
        None => Settings::default(),
    };

    let state = match args.boss {
        None => GameState::new(seed, GameLevel::from_layout(DEMO_LAYOUT)?, settings),
        Some(BossChoice::Classical) => {
            let level = boss_level()?;
            let boss = Boss::classical(&level);
            GameState::new(seed, level, settings).with_boss(boss)
        }
        Some(BossChoice::Gothic) => {
            let level = boss_level()?;
            let boss = Boss::gothic_romantic(&level);
            GameState::new(seed, level, settings).with_boss(boss)
        }
    };

    info!(
        "Biff Bam Blammo (headless) seed={} seconds={} difficulty={}",
        seed,
        seconds,
        state.settings.difficulty.as_str()
    );
    let state = run(state, seconds);

    let dir = settings_path
        .as_deref()
        .and_then(Path::parent)
        .unwrap_or(Path::new("."));
    let board_path = dir.join(LEADERBOARD_FILE);
    let mut board = Leaderboard::load_or_new(&board_path, LEADERBOARD_TOP_SCORE);
    match board.add_score("CPU", state.score) {
        Some(rank) => info!("Autopilot placed #{} on the leaderboard", rank),
        None => info!("Score {} did not make the leaderboard", state.score),
    }
    if state.phase == GamePhase::LevelComplete {
        board.record_level_score(0, 0, state.score);
    }
    board
        .save(&board_path)
        .with_context(|| format!("saving {}", board_path.display()))?;

    println!(
        "seed {} finished in {:?} after {:.1}s: score {}, lives {}",
        seed,
        state.phase,
        state.time_ticks as f32 * SIM_DT,
        state.score,
        state.lives
    );
    Ok(())
}

/// Tick the autopilot until time runs out or the run ends
fn run(mut state: GameState, seconds: f32) -> GameState {
    let input = TickInput {
        idle_mode: true,
        ..Default::default()
    };
    let ticks = (seconds / SIM_DT).ceil() as u64;
    for _ in 0..ticks {
        tick(&mut state, &input, SIM_DT);
        for event in state.drain_events() {
            log_event(&event);
        }
        if matches!(state.phase, GamePhase::GameOver | GamePhase::LevelComplete) {
            break;
        }
    }
    state
}

fn log_event(event: &GameEvent) {
    match event {
        GameEvent::BallPaddleCollision { .. }
        | GameEvent::BallBlockCollision { .. }
        | GameEvent::PieceChanged { .. }
        | GameEvent::ProjectileSpawned { .. } => debug!("{:?}", event),
        _ => info!("{:?}", event),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blammo::sim::PieceKind;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["blammo"]).expect("defaults parse");
        assert_eq!(args.seed, 12345);
        assert_eq!(args.seconds, 60.0);
        assert!(args.settings.is_none());
        assert!(args.boss.is_none());
    }

    #[test]
    fn test_args_pick_a_boss() {
        let args = Args::try_parse_from(["blammo", "--seed", "7", "--seconds", "30", "--boss", "gothic"])
            .expect("args parse");
        assert_eq!(args.seed, 7);
        assert_eq!(args.seconds, 30.0);
        assert!(matches!(args.boss, Some(BossChoice::Gothic)));
        assert!(Args::try_parse_from(["blammo", "--boss", "dragon"]).is_err());
    }

    #[test]
    fn test_boss_arena_top_row_breaks() {
        let level = boss_level().expect("arena builds");
        let top = level.height() - 1;
        for w in 0..level.width() {
            let piece = level.piece(w, top).expect("top row piece");
            assert!(piece.kind.can_be_destroyed_by_ball());
        }
        for h in 0..top {
            assert!((0..level.width()).all(|w| level.piece(w, h).is_some_and(|p| p.kind == PieceKind::Empty)));
        }
    }
}
