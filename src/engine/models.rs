//! Core state types for the dice duel engine.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Dice held by each side throughout the whole game.
pub const DICE_PER_SIDE: usize = 5;

/// Rolls allowed per turn; the third roll is always scored.
pub const MAX_ROLLS_PER_TURN: u8 = 3;

pub const DEFAULT_TARGET_SCORE: u32 = 101;

/// One six-sided die. Immutable: rerolling replaces the die, it never
/// mutates in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Die {
    pub value: u8,
    #[serde(default)]
    pub is_selected: bool,
}

impl Die {
    /// Draw a fresh die uniformly from 1..=6, unselected.
    pub fn roll(rng: &mut dyn RngCore) -> Self {
        Self {
            value: rng.gen_range(1..=6),
            is_selected: false,
        }
    }
}

/// Deal a full hand of five fresh dice.
pub fn fresh_hand(rng: &mut dyn RngCore) -> Vec<Die> {
    (0..DICE_PER_SIDE).map(|_| Die::roll(rng)).collect()
}

/// Sum of face values across a hand.
pub fn dice_value(dice: &[Die]) -> u32 {
    dice.iter().map(|d| d.value as u32).sum()
}

/// Immutable snapshot of the whole game. The controller replaces it
/// wholesale on every operation; consumers only ever receive clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub player_dice: Vec<Die>,
    pub computer_dice: Vec<Die>,

    pub player_score: u32,
    pub computer_score: u32,

    /// Sums of the current hands, kept in sync by the controller.
    pub player_roll_value: u32,
    pub computer_roll_value: u32,

    pub target_score: u32,

    /// 1..=3 during active play; a throw that pushes past 3 scores the
    /// turn and resets to 1 before the new snapshot is published.
    pub current_roll_number: u8,

    /// Completed turns per side. Both counters advance together on every
    /// scored turn; they diverge only through restored snapshots.
    pub player_attempts: u32,
    pub computer_attempts: u32,

    pub is_game_over: bool,
    pub is_player_winner: bool,
    pub is_tie: bool,
    pub is_tiebreaking: bool,

    /// Match-level win counters, preserved across new games.
    pub player_wins: u32,
    pub computer_wins: u32,
}

impl GameState {
    /// Fresh game at the given target: new hands, everything else zeroed.
    pub fn deal(rng: &mut dyn RngCore, target_score: u32) -> Self {
        let mut state = Self {
            player_dice: fresh_hand(rng),
            computer_dice: fresh_hand(rng),
            player_score: 0,
            computer_score: 0,
            player_roll_value: 0,
            computer_roll_value: 0,
            target_score,
            current_roll_number: 1,
            player_attempts: 0,
            computer_attempts: 0,
            is_game_over: false,
            is_player_winner: false,
            is_tie: false,
            is_tiebreaking: false,
            player_wins: 0,
            computer_wins: 0,
        };
        state.recompute_roll_values();
        state
    }

    pub fn recompute_roll_values(&mut self) {
        self.player_roll_value = dice_value(&self.player_dice);
        self.computer_roll_value = dice_value(&self.computer_dice);
    }
}

/// Engine construction options. A fixed seed makes every roll of the game
/// reproducible; without one the controller draws from OS entropy.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub random_seed: Option<u64>,
    pub target_score: u32,
    /// Cosmetic delay between tiebreak rounds. `None` (the default, and
    /// always in tests) runs the tiebreak loop back to back.
    pub tiebreak_pacing: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            random_seed: None,
            target_score: DEFAULT_TARGET_SCORE,
            tiebreak_pacing: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn rolled_dice_stay_in_face_range() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            let die = Die::roll(&mut rng);
            assert!((1..=6).contains(&die.value));
            assert!(!die.is_selected);
        }
    }

    #[test]
    fn rolled_dice_cover_all_faces_roughly_uniformly() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut counts = [0usize; 6];
        let trials = 6000;
        for _ in 0..trials {
            counts[(Die::roll(&mut rng).value - 1) as usize] += 1;
        }
        for (face, &count) in counts.iter().enumerate() {
            assert!(
                (800..=1200).contains(&count),
                "face {} appeared {} times in {} trials",
                face + 1,
                count,
                trials
            );
        }
    }

    #[test]
    fn dice_value_sums_faces() {
        let dice: Vec<Die> = [6, 5, 4, 3, 2]
            .iter()
            .map(|&value| Die {
                value,
                is_selected: false,
            })
            .collect();
        assert_eq!(dice_value(&dice), 20);
    }

    #[test]
    fn deal_produces_full_hands_with_roll_values() {
        let mut rng = StdRng::seed_from_u64(3);
        let state = GameState::deal(&mut rng, DEFAULT_TARGET_SCORE);
        assert_eq!(state.player_dice.len(), DICE_PER_SIDE);
        assert_eq!(state.computer_dice.len(), DICE_PER_SIDE);
        assert_eq!(state.player_roll_value, dice_value(&state.player_dice));
        assert_eq!(state.computer_roll_value, dice_value(&state.computer_dice));
        assert_eq!(state.current_roll_number, 1);
        assert!(!state.is_game_over);
    }
}
