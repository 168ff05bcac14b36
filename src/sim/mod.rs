//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering or platform dependencies

pub mod ball;
pub mod beam;
pub mod boss;
pub mod bounds;
pub mod cannon;
pub mod collision;
pub mod item;
pub mod level;
pub mod paddle;
pub mod piece;
pub mod projectile;
pub mod state;
pub mod tick;

pub use ball::{BallSize, BallSpeed, BallState, BallType, GameBall};
pub use beam::{Beam, BeamSegment};
pub use boss::{Boss, BossAi, BossKind};
pub use bounds::BoundingLines;
pub use collision::{Aabb2D, Circle2D, CollisionResult, LineSeg2D, Ray2D};
pub use item::{GameItem, ItemDrop, ItemKind};
pub use level::{GameLevel, LevelFeedback};
pub use paddle::{PaddleSize, PaddleType, PlayerPaddle};
pub use piece::{Colour, DestructionMethod, LevelPiece, PieceCoord, PieceKind};
pub use projectile::{Projectile, ProjectileKind, ProjectileSpawn};
pub use state::{GameEvent, GamePhase, GameState};
pub use tick::{TickInput, tick};
