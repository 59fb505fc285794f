//! Two-seat dice duel engine: a seeded game controller, reroll strategies,
//! flat key-value snapshot persistence and an arena runner for
//! strategy-vs-strategy experiments.

pub mod engine;

pub use engine::controller::{CommandError, GameController};
pub use engine::models::{Die, EngineConfig, GameState};
pub use engine::storage::{JsonFileStore, MemoryStore, StateStore};
pub use engine::strategy::{AdaptiveStrategy, CoinFlipStrategy, RerollStrategy};
