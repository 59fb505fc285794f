//! The game controller: single owner of the state machine.
//!
//! Every operation validates the current phase, builds the next snapshot,
//! persists it and notifies subscribers. Callers never mutate state
//! directly; they receive clones of the published snapshot.

use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::engine::models::{fresh_hand, Die, EngineConfig, GameState, MAX_ROLLS_PER_TURN};
use crate::engine::storage::{restore_state, save_state, StateStore, StorageError};
use crate::engine::strategy::{RerollStrategy, StrategyContext};

/// A command arrived in a phase where it cannot apply. State is never
/// modified when one of these is returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("the game is over, start a new game first")]
    GameOver,
    #[error("roll limit reached for this turn")]
    RollLimitReached,
    #[error("dice can only be selected before the final throw of a turn")]
    SelectionLocked,
    #[error("die index {0} is out of range")]
    InvalidDieIndex(usize),
    #[error("target score must be at least 1")]
    InvalidTargetScore,
}

type Observer = Box<dyn FnMut(&GameState) + Send>;

/// Drives a full duel: both seats throw together, the computer seat decides
/// its rerolls through the injected [`RerollStrategy`], and every published
/// snapshot is written through the injected [`StateStore`].
pub struct GameController {
    state: GameState,
    rng: StdRng,
    strategy: Box<dyn RerollStrategy>,
    store: Box<dyn StateStore>,
    tiebreak_pacing: Option<Duration>,
    observers: Vec<Observer>,
}

impl GameController {
    /// Build a controller, restoring any snapshot the store holds. An empty
    /// store yields a freshly dealt game at `config.target_score`.
    pub fn new(
        config: EngineConfig,
        strategy: Box<dyn RerollStrategy>,
        mut store: Box<dyn StateStore>,
    ) -> Result<Self, StorageError> {
        let mut rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let state = restore_state(store.as_ref(), &mut rng, config.target_score)?;
        info!(
            strategy = strategy.name(),
            seeded = config.random_seed.is_some(),
            target = state.target_score,
            "game controller ready"
        );
        Ok(Self {
            state,
            rng,
            strategy,
            store,
            tiebreak_pacing: config.tiebreak_pacing,
            observers: Vec::new(),
        })
    }

    /// Current snapshot.
    pub fn state(&self) -> GameState {
        self.state.clone()
    }

    /// Register an observer called with every published snapshot, including
    /// the transient tie snapshot and each tiebreak round.
    pub fn subscribe(&mut self, observer: impl FnMut(&GameState) + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Deal a fresh game at the given target. Match-level win counters carry
    /// over; everything else resets.
    pub fn start_new_game(&mut self, target_score: u32) -> Result<GameState, CommandError> {
        if target_score == 0 {
            return Err(CommandError::InvalidTargetScore);
        }
        let (player_wins, computer_wins) = (self.state.player_wins, self.state.computer_wins);
        self.state = GameState::deal(&mut self.rng, target_score);
        self.state.player_wins = player_wins;
        self.state.computer_wins = computer_wins;
        info!(target_score, "new game started");
        self.publish();
        Ok(self.state.clone())
    }

    /// Throw for both seats. The player seat rerolls every unselected die;
    /// the computer seat asks its strategy. The throw that passes the roll
    /// limit scores the turn immediately.
    pub fn throw_dice(&mut self) -> Result<GameState, CommandError> {
        if self.state.is_game_over {
            return Err(CommandError::GameOver);
        }
        if self.state.current_roll_number > MAX_ROLLS_PER_TURN {
            return Err(CommandError::RollLimitReached);
        }

        let player_dice: Vec<Die> = self
            .state
            .player_dice
            .iter()
            .map(|die| {
                if die.is_selected {
                    *die
                } else {
                    Die::roll(&mut self.rng)
                }
            })
            .collect();

        let computer_dice = {
            let ctx = StrategyContext {
                dice: &self.state.computer_dice,
                own_score: self.state.computer_score,
                opponent_score: self.state.player_score,
                target_score: self.state.target_score,
                roll_number: self.state.current_roll_number,
            };
            self.strategy.decide(&ctx, &mut self.rng)
        };

        self.state.player_dice = player_dice;
        self.state.computer_dice = computer_dice;
        self.state.current_roll_number += 1;
        self.state.recompute_roll_values();
        debug!(
            roll = self.state.current_roll_number,
            player = self.state.player_roll_value,
            computer = self.state.computer_roll_value,
            "dice thrown"
        );

        if self.state.current_roll_number > MAX_ROLLS_PER_TURN {
            return Ok(self.settle_turn());
        }
        self.publish();
        Ok(self.state.clone())
    }

    /// Flip the keep flag on one player die. Selection is open between the
    /// deal and the final throw of the turn.
    pub fn toggle_die_selection(&mut self, index: usize) -> Result<GameState, CommandError> {
        if self.state.is_game_over {
            return Err(CommandError::GameOver);
        }
        if self.state.current_roll_number >= MAX_ROLLS_PER_TURN {
            return Err(CommandError::SelectionLocked);
        }
        let die = self
            .state
            .player_dice
            .get_mut(index)
            .ok_or(CommandError::InvalidDieIndex(index))?;
        die.is_selected = !die.is_selected;
        self.publish();
        Ok(self.state.clone())
    }

    /// Clear every keep flag on the player hand.
    pub fn reset_die_selections(&mut self) -> GameState {
        for die in &mut self.state.player_dice {
            die.is_selected = false;
        }
        self.publish();
        self.state.clone()
    }

    /// Bank the current hands for both seats and resolve the turn.
    pub fn score_roll(&mut self) -> Result<GameState, CommandError> {
        if self.state.is_game_over {
            return Err(CommandError::GameOver);
        }
        Ok(self.settle_turn())
    }

    /// Change the target score mid-match.
    pub fn update_target_score(&mut self, target_score: u32) -> Result<GameState, CommandError> {
        if target_score == 0 {
            return Err(CommandError::InvalidTargetScore);
        }
        self.state.target_score = target_score;
        self.publish();
        Ok(self.state.clone())
    }

    /// Add both roll values to the running scores, advance the attempt
    /// counters and resolve the outcome. A win needs the target reached and
    /// either fewer attempts than the opponent or, on equal attempts, the
    /// higher score. Equal scores on equal attempts go to a tiebreak.
    fn settle_turn(&mut self) -> GameState {
        let player_score = self.state.player_score + self.state.player_roll_value;
        let computer_score = self.state.computer_score + self.state.computer_roll_value;
        let player_attempts = self.state.player_attempts + 1;
        let computer_attempts = self.state.computer_attempts + 1;

        let player_reached = player_score >= self.state.target_score;
        let computer_reached = computer_score >= self.state.target_score;

        let round_over = player_reached || computer_reached;
        let is_tie = player_reached
            && computer_reached
            && player_score == computer_score
            && player_attempts == computer_attempts;

        let is_player_winner =
            if player_reached && computer_reached && player_attempts == computer_attempts {
                player_score > computer_score
            } else {
                player_reached && (!computer_reached || player_attempts < computer_attempts)
            };

        self.state.player_score = player_score;
        self.state.computer_score = computer_score;
        self.state.player_attempts = player_attempts;
        self.state.computer_attempts = computer_attempts;
        self.state.is_game_over = round_over && !is_tie;
        self.state.is_player_winner = is_player_winner;
        self.state.is_tie = is_tie;
        self.state.is_tiebreaking = false;
        self.state.current_roll_number = 1;
        if round_over && !is_tie {
            if is_player_winner {
                self.state.player_wins += 1;
            } else {
                self.state.computer_wins += 1;
            }
        }
        if !round_over {
            self.state.player_dice = fresh_hand(&mut self.rng);
            self.state.computer_dice = fresh_hand(&mut self.rng);
        }
        self.state.recompute_roll_values();
        info!(
            player = player_score,
            computer = computer_score,
            attempts = player_attempts,
            game_over = self.state.is_game_over,
            tie = is_tie,
            "turn scored"
        );
        self.publish();

        if self.state.is_tie {
            self.run_tiebreak();
        }
        self.state.clone()
    }

    /// Single-throw sudden-death rounds until the sums differ. Each round is
    /// published with `is_tiebreaking` set and the roll number pinned at the
    /// limit so no reroll can be requested.
    fn run_tiebreak(&mut self) {
        loop {
            self.state.is_tiebreaking = true;
            self.state.player_dice = fresh_hand(&mut self.rng);
            self.state.computer_dice = fresh_hand(&mut self.rng);
            self.state.current_roll_number = MAX_ROLLS_PER_TURN;
            self.state.recompute_roll_values();
            self.publish();

            let player = self.state.player_roll_value;
            let computer = self.state.computer_roll_value;
            if player != computer {
                let player_won = player > computer;
                self.state.is_game_over = true;
                self.state.is_tie = false;
                self.state.is_tiebreaking = false;
                self.state.is_player_winner = player_won;
                if player_won {
                    self.state.player_wins += 1;
                } else {
                    self.state.computer_wins += 1;
                }
                info!(player, computer, player_won, "tiebreak resolved");
                self.publish();
                return;
            }

            debug!(value = player, "tiebreak round tied, rolling again");
            if let Some(pacing) = self.tiebreak_pacing {
                thread::sleep(pacing);
            }
        }
    }

    fn publish(&mut self) {
        if let Err(error) = save_state(self.store.as_mut(), &self.state) {
            warn!(%error, "failed to persist game state");
        }
        for observer in &mut self.observers {
            observer(&self.state);
        }
    }
}
