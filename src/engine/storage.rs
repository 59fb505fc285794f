//! Key-value snapshot persistence for game state.
//!
//! The whole snapshot is stored flat, one key per field, so a store can be
//! inspected or repaired with ordinary JSON tooling. Restoring applies a
//! per-key default for anything missing, which also makes a brand-new store
//! restore to a freshly dealt game.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use rand::RngCore;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::engine::models::{fresh_hand, Die, GameState, DICE_PER_SIDE};

/// Store keys, one per persisted field. Roll values are derived and never
/// stored.
pub mod keys {
    pub const PLAYER_DICE: &str = "player_dice";
    pub const COMPUTER_DICE: &str = "computer_dice";
    pub const PLAYER_SCORE: &str = "player_score";
    pub const COMPUTER_SCORE: &str = "computer_score";
    pub const TARGET_SCORE: &str = "target_score";
    pub const CURRENT_ROLL: &str = "current_roll";
    pub const PLAYER_ATTEMPTS: &str = "player_attempts";
    pub const COMPUTER_ATTEMPTS: &str = "computer_attempts";
    pub const IS_GAME_OVER: &str = "is_game_over";
    pub const IS_PLAYER_WINNER: &str = "is_player_winner";
    pub const IS_TIE: &str = "is_tie";
    pub const IS_TIEBREAKING: &str = "is_tiebreaking";
    pub const PLAYER_WINS: &str = "player_wins";
    pub const COMPUTER_WINS: &str = "computer_wins";
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage i/o failed")]
    Io(#[from] io::Error),
    #[error("stored value under {key:?} does not match its schema")]
    Malformed {
        key: &'static str,
        source: serde_json::Error,
    },
    #[error("state payload is not valid JSON")]
    Payload(#[from] serde_json::Error),
}

/// Flat key-value storage for snapshots.
///
/// `put` may buffer; `flush` commits. [`save_state`] writes every key and
/// flushes once at the end.
pub trait StateStore: Send {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError>;

    fn put(&mut self, key: &str, value: Value) -> Result<(), StorageError>;

    fn flush(&mut self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Write a full snapshot into the store.
pub fn save_state(store: &mut dyn StateStore, state: &GameState) -> Result<(), StorageError> {
    store.put(keys::PLAYER_DICE, serde_json::to_value(&state.player_dice)?)?;
    store.put(
        keys::COMPUTER_DICE,
        serde_json::to_value(&state.computer_dice)?,
    )?;
    store.put(keys::PLAYER_SCORE, Value::from(state.player_score))?;
    store.put(keys::COMPUTER_SCORE, Value::from(state.computer_score))?;
    store.put(keys::TARGET_SCORE, Value::from(state.target_score))?;
    store.put(keys::CURRENT_ROLL, Value::from(state.current_roll_number))?;
    store.put(keys::PLAYER_ATTEMPTS, Value::from(state.player_attempts))?;
    store.put(
        keys::COMPUTER_ATTEMPTS,
        Value::from(state.computer_attempts),
    )?;
    store.put(keys::IS_GAME_OVER, Value::from(state.is_game_over))?;
    store.put(keys::IS_PLAYER_WINNER, Value::from(state.is_player_winner))?;
    store.put(keys::IS_TIE, Value::from(state.is_tie))?;
    store.put(keys::IS_TIEBREAKING, Value::from(state.is_tiebreaking))?;
    store.put(keys::PLAYER_WINS, Value::from(state.player_wins))?;
    store.put(keys::COMPUTER_WINS, Value::from(state.computer_wins))?;
    store.flush()
}

/// Rebuild a snapshot from the store. Missing keys fall back per field:
/// scores and counters to zero, the roll number to 1, the target to
/// `default_target`, hands to a fresh deal from `rng`. A present key that
/// fails to decode is an error, not a fallback.
pub fn restore_state(
    store: &dyn StateStore,
    rng: &mut dyn RngCore,
    default_target: u32,
) -> Result<GameState, StorageError> {
    let mut state = GameState {
        player_dice: read_hand(store, keys::PLAYER_DICE, rng)?,
        computer_dice: read_hand(store, keys::COMPUTER_DICE, rng)?,
        player_score: read_key(store, keys::PLAYER_SCORE, 0)?,
        computer_score: read_key(store, keys::COMPUTER_SCORE, 0)?,
        player_roll_value: 0,
        computer_roll_value: 0,
        target_score: read_key(store, keys::TARGET_SCORE, default_target)?,
        current_roll_number: read_key(store, keys::CURRENT_ROLL, 1)?,
        player_attempts: read_key(store, keys::PLAYER_ATTEMPTS, 0)?,
        computer_attempts: read_key(store, keys::COMPUTER_ATTEMPTS, 0)?,
        is_game_over: read_key(store, keys::IS_GAME_OVER, false)?,
        is_player_winner: read_key(store, keys::IS_PLAYER_WINNER, false)?,
        is_tie: read_key(store, keys::IS_TIE, false)?,
        is_tiebreaking: read_key(store, keys::IS_TIEBREAKING, false)?,
        player_wins: read_key(store, keys::PLAYER_WINS, 0)?,
        computer_wins: read_key(store, keys::COMPUTER_WINS, 0)?,
    };
    state.recompute_roll_values();
    Ok(state)
}

fn read_key<T: DeserializeOwned>(
    store: &dyn StateStore,
    key: &'static str,
    default: T,
) -> Result<T, StorageError> {
    match store.get(key)? {
        Some(value) => {
            serde_json::from_value(value).map_err(|source| StorageError::Malformed { key, source })
        }
        None => Ok(default),
    }
}

/// A stored hand must hold exactly five dice; anything else is replaced by a
/// fresh deal so the rest of the engine can rely on the hand size.
fn read_hand(
    store: &dyn StateStore,
    key: &'static str,
    rng: &mut dyn RngCore,
) -> Result<Vec<Die>, StorageError> {
    let dice: Vec<Die> = read_key(store, key, Vec::new())?;
    if dice.len() == DICE_PER_SIDE {
        return Ok(dice);
    }
    if !dice.is_empty() {
        warn!(key, len = dice.len(), "stored hand has wrong size, dealing fresh dice");
    }
    Ok(fresh_hand(rng))
}

/// Volatile store, used in tests and by the arena.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: Value) -> Result<(), StorageError> {
        self.entries.insert(key.to_owned(), value);
        Ok(())
    }
}

/// Store backed by a single JSON file. Writes buffer in memory and `flush`
/// replaces the file through a rename, so a crash mid-write leaves the
/// previous snapshot intact.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: HashMap<String, Value>,
}

impl JsonFileStore {
    /// Open the store at `path`, loading any existing snapshot. A missing
    /// file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(StorageError::Io(err)),
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl StateStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: Value) -> Result<(), StorageError> {
        self.entries.insert(key.to_owned(), value);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StorageError> {
        let payload = serde_json::to_vec_pretty(&self.entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, payload)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::models::{dice_value, DEFAULT_TARGET_SCORE};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample_state(rng: &mut StdRng) -> GameState {
        let mut state = GameState::deal(rng, DEFAULT_TARGET_SCORE);
        state.player_score = 42;
        state.computer_score = 37;
        state.player_attempts = 4;
        state.computer_attempts = 4;
        state.player_wins = 2;
        state.computer_wins = 1;
        state.current_roll_number = 2;
        state.player_dice[1].is_selected = true;
        state
    }

    #[test]
    fn memory_store_round_trips_a_snapshot() {
        let mut rng = StdRng::seed_from_u64(11);
        let state = sample_state(&mut rng);

        let mut store = MemoryStore::new();
        save_state(&mut store, &state).unwrap();
        let restored = restore_state(&store, &mut rng, DEFAULT_TARGET_SCORE).unwrap();

        assert_eq!(restored, state);
    }

    #[test]
    fn empty_store_restores_to_a_fresh_game() {
        let mut rng = StdRng::seed_from_u64(5);
        let store = MemoryStore::new();
        let state = restore_state(&store, &mut rng, 55).unwrap();

        assert_eq!(state.player_dice.len(), DICE_PER_SIDE);
        assert_eq!(state.computer_dice.len(), DICE_PER_SIDE);
        assert_eq!(state.player_score, 0);
        assert_eq!(state.target_score, 55);
        assert_eq!(state.current_roll_number, 1);
        assert!(!state.is_game_over);
        assert_eq!(state.player_roll_value, dice_value(&state.player_dice));
    }

    #[test]
    fn missing_keys_fall_back_individually() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut store = MemoryStore::new();
        store.put(keys::PLAYER_SCORE, Value::from(90)).unwrap();
        store.put(keys::PLAYER_WINS, Value::from(3)).unwrap();

        let state = restore_state(&store, &mut rng, DEFAULT_TARGET_SCORE).unwrap();
        assert_eq!(state.player_score, 90);
        assert_eq!(state.player_wins, 3);
        assert_eq!(state.computer_score, 0);
        assert_eq!(state.target_score, DEFAULT_TARGET_SCORE);
    }

    #[test]
    fn malformed_value_is_an_error_not_a_default() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut store = MemoryStore::new();
        store
            .put(keys::PLAYER_SCORE, Value::from("ninety"))
            .unwrap();

        let err = restore_state(&store, &mut rng, DEFAULT_TARGET_SCORE).unwrap_err();
        assert!(matches!(
            err,
            StorageError::Malformed {
                key: keys::PLAYER_SCORE,
                ..
            }
        ));
    }

    #[test]
    fn undersized_hand_is_replaced_by_a_fresh_deal() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut store = MemoryStore::new();
        let short_hand = vec![Die {
            value: 6,
            is_selected: false,
        }];
        store
            .put(keys::PLAYER_DICE, serde_json::to_value(short_hand).unwrap())
            .unwrap();

        let state = restore_state(&store, &mut rng, DEFAULT_TARGET_SCORE).unwrap();
        assert_eq!(state.player_dice.len(), DICE_PER_SIDE);
    }

    #[test]
    fn json_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("duel_state.json");
        let mut rng = StdRng::seed_from_u64(12);
        let state = sample_state(&mut rng);

        let mut store = JsonFileStore::open(&path).unwrap();
        save_state(&mut store, &state).unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).unwrap();
        let restored = restore_state(&reopened, &mut rng, DEFAULT_TARGET_SCORE).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn json_file_store_opens_empty_when_file_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("absent.json")).unwrap();
        assert!(store.get(keys::PLAYER_SCORE).unwrap().is_none());
    }
}
