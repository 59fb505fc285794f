//! Strategy-vs-strategy arena runner.
//!
//! Each game gets its own seeded controller and store, so games are
//! independent and run in parallel. One profile occupies the player seat
//! and is driven through the public command API; the other rides inside
//! the controller as the computer seat.

use std::collections::HashMap;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::info;

use crate::engine::controller::GameController;
use crate::engine::models::EngineConfig;
use crate::engine::profiles::StrategyProfile;
use crate::engine::storage::MemoryStore;
use crate::engine::strategy::StrategyContext;

/// Commands per game before the runner declares it stuck. A duel to a
/// three-digit target finishes in well under a hundred commands.
const MAX_COMMANDS_PER_GAME: usize = 10_000;

/// Keeps the seat rng decorrelated from the controller rng built off the
/// same game seed.
const SEAT_RNG_OFFSET: u64 = 0x9e37_79b9;

#[derive(Debug, Clone)]
pub struct ArenaOptions {
    pub num_games: usize,
    pub base_seed: u64,
    pub target_score: u32,
    /// Swap which profile holds the player seat on odd games.
    pub alternate_seats: bool,
}

impl Default for ArenaOptions {
    fn default() -> Self {
        Self {
            num_games: 100,
            base_seed: 42,
            target_score: crate::engine::models::DEFAULT_TARGET_SCORE,
            alternate_seats: true,
        }
    }
}

/// Aggregated results from an arena run.
pub struct ArenaResult {
    pub num_games: usize,
    pub wins: HashMap<String, usize>,
    pub total_scores: HashMap<String, Vec<f64>>,
    pub total_attempts: HashMap<String, Vec<f64>>,
    pub game_durations_ms: Vec<f64>,
}

impl ArenaResult {
    pub fn win_rate(&self, name: &str) -> f64 {
        *self.wins.get(name).unwrap_or(&0) as f64 / self.num_games.max(1) as f64
    }

    pub fn avg_score(&self, name: &str) -> f64 {
        match self.total_scores.get(name) {
            Some(s) if !s.is_empty() => s.iter().sum::<f64>() / s.len() as f64,
            _ => 0.0,
        }
    }

    pub fn score_stddev(&self, name: &str) -> f64 {
        let scores = match self.total_scores.get(name) {
            Some(s) if s.len() >= 2 => s,
            _ => return 0.0,
        };
        let avg = self.avg_score(name);
        let variance =
            scores.iter().map(|s| (s - avg).powi(2)).sum::<f64>() / (scores.len() - 1) as f64;
        variance.sqrt()
    }

    /// Average completed turns per game for the named profile.
    pub fn avg_attempts(&self, name: &str) -> f64 {
        match self.total_attempts.get(name) {
            Some(a) if !a.is_empty() => a.iter().sum::<f64>() / a.len() as f64,
            _ => 0.0,
        }
    }

    /// Wilson score interval on the win rate.
    pub fn confidence_interval_95(&self, name: &str) -> (f64, f64) {
        let n = self.num_games;
        if n == 0 {
            return (0.0, 0.0);
        }
        let p = self.win_rate(name);
        let z = 1.96_f64;
        let denom = 1.0 + z * z / n as f64;
        let center = (p + z * z / (2.0 * n as f64)) / denom;
        let margin = z * ((p * (1.0 - p) + z * z / (4.0 * n as f64)) / n as f64).sqrt() / denom;
        ((center - margin).max(0.0), (center + margin).min(1.0))
    }

    pub fn summary(&self) -> String {
        let mut lines = vec![format!("Arena Results ({} games)", self.num_games)];
        lines.push("=".repeat(72));
        for name in self.wins.keys() {
            let wr = self.win_rate(name);
            let (ci_lo, ci_hi) = self.confidence_interval_95(name);
            lines.push(format!(
                "  {:>12}: {:3} wins ({:5.1}%)  [95% CI: {:.1}%-{:.1}%]  avg={:5.1} +/- {:4.1}  turns={:4.1}",
                name,
                self.wins[name],
                wr * 100.0,
                ci_lo * 100.0,
                ci_hi * 100.0,
                self.avg_score(name),
                self.score_stddev(name),
                self.avg_attempts(name),
            ));
        }
        if !self.game_durations_ms.is_empty() {
            let avg_ms =
                self.game_durations_ms.iter().sum::<f64>() / self.game_durations_ms.len() as f64;
            let total_s = self.game_durations_ms.iter().sum::<f64>() / 1000.0;
            lines.push(format!("  Avg game: {avg_ms:.2}ms  |  Total: {total_s:.1}s"));
        }
        lines.join("\n")
    }
}

struct GameRecord {
    winner: String,
    scores: Vec<(String, f64)>,
    attempts: Vec<(String, f64)>,
    duration_ms: f64,
}

/// Run `options.num_games` between two named profiles and return aggregated
/// stats. Game `i` is seeded with `base_seed + i`, so a run is reproducible
/// regardless of thread scheduling.
pub fn run_arena(
    first: (&str, &StrategyProfile),
    second: (&str, &StrategyProfile),
    options: &ArenaOptions,
) -> Result<ArenaResult, String> {
    if first.0 == second.0 {
        return Err("arena contestants need distinct names".into());
    }
    // Fail on a bad profile before spawning any games.
    first.1.build_strategy()?;
    second.1.build_strategy()?;

    let records = (0..options.num_games)
        .into_par_iter()
        .map(|game_idx| {
            let seed = options.base_seed + game_idx as u64;
            let (player_seat, computer_seat) = if options.alternate_seats && game_idx % 2 == 1 {
                (second, first)
            } else {
                (first, second)
            };
            play_one_game(player_seat, computer_seat, seed, options.target_score)
        })
        .collect::<Result<Vec<GameRecord>, String>>()?;

    let mut result = ArenaResult {
        num_games: options.num_games,
        wins: [first.0, second.0]
            .iter()
            .map(|n| (n.to_string(), 0))
            .collect(),
        total_scores: [first.0, second.0]
            .iter()
            .map(|n| (n.to_string(), Vec::new()))
            .collect(),
        total_attempts: [first.0, second.0]
            .iter()
            .map(|n| (n.to_string(), Vec::new()))
            .collect(),
        game_durations_ms: Vec::new(),
    };

    for record in records {
        *result.wins.get_mut(&record.winner).unwrap() += 1;
        for (name, score) in record.scores {
            result.total_scores.get_mut(&name).unwrap().push(score);
        }
        for (name, attempts) in record.attempts {
            result.total_attempts.get_mut(&name).unwrap().push(attempts);
        }
        result.game_durations_ms.push(record.duration_ms);
    }

    info!(
        games = options.num_games,
        first = first.0,
        second = second.0,
        "arena run complete"
    );
    Ok(result)
}

/// Drive a single game through the controller command API. The player-seat
/// strategy scores as soon as it keeps the whole hand; otherwise it lines
/// the selections up with its keep mask and throws. The throw past the roll
/// limit scores on its own.
fn play_one_game(
    player_seat: (&str, &StrategyProfile),
    computer_seat: (&str, &StrategyProfile),
    seed: u64,
    target_score: u32,
) -> Result<GameRecord, String> {
    let config = EngineConfig {
        random_seed: Some(seed),
        target_score,
        tiebreak_pacing: None,
    };
    let mut controller = GameController::new(
        config,
        computer_seat.1.build_strategy()?,
        Box::new(MemoryStore::new()),
    )
    .map_err(|e| format!("controller init failed: {e}"))?;
    let seat_strategy = player_seat.1.build_strategy()?;
    let mut seat_rng = StdRng::seed_from_u64(seed.wrapping_add(SEAT_RNG_OFFSET));

    let t0 = Instant::now();
    let mut state = controller.state();
    let mut commands = 0usize;
    while !state.is_game_over {
        commands += 1;
        if commands > MAX_COMMANDS_PER_GAME {
            return Err(format!("game with seed {seed} did not terminate"));
        }

        let mask = {
            let ctx = StrategyContext {
                dice: &state.player_dice,
                own_score: state.player_score,
                opponent_score: state.computer_score,
                target_score: state.target_score,
                roll_number: state.current_roll_number,
            };
            seat_strategy.keep_mask(&ctx, &mut seat_rng)
        };

        state = if mask.iter().all(|&keep| keep) {
            controller.score_roll().map_err(|e| e.to_string())?
        } else {
            for (index, (die, keep)) in state.player_dice.iter().zip(mask).enumerate() {
                if die.is_selected != keep {
                    controller
                        .toggle_die_selection(index)
                        .map_err(|e| e.to_string())?;
                }
            }
            controller.throw_dice().map_err(|e| e.to_string())?
        };
    }
    let duration_ms = t0.elapsed().as_secs_f64() * 1000.0;

    let winner = if state.is_player_winner {
        player_seat.0
    } else {
        computer_seat.0
    };
    Ok(GameRecord {
        winner: winner.to_owned(),
        scores: vec![
            (player_seat.0.to_owned(), state.player_score as f64),
            (computer_seat.0.to_owned(), state.computer_score as f64),
        ],
        attempts: vec![
            (player_seat.0.to_owned(), state.player_attempts as f64),
            (computer_seat.0.to_owned(), state.computer_attempts as f64),
        ],
        duration_ms,
    })
}
