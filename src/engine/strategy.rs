//! Reroll strategies for the computer seat.

use rand::{Rng, RngCore};

use crate::engine::models::{dice_value, Die, DICE_PER_SIDE, MAX_ROLLS_PER_TURN};

/// Face value at or below which a die counts as "low" for the end-game
/// expected-gain calculation.
const ENDGAME_LOW_FACE: u8 = 3;

/// Expected value of a single uniform d6.
const UNIFORM_DIE_MEAN: f64 = 3.5;

/// Inputs to a reroll decision, viewed from the deciding side: `own_score`
/// belongs to the side holding `dice`, `opponent_score` to the other side.
pub struct StrategyContext<'a> {
    pub dice: &'a [Die],
    pub own_score: u32,
    pub opponent_score: u32,
    pub target_score: u32,
    pub roll_number: u8,
}

/// A reroll strategy picks which dice survive into the next roll.
///
/// `keep_mask` is the decision itself; `decide` applies it, replacing every
/// non-kept die with a fresh roll. Strategies are stateless and side-effect
/// free apart from consuming randomness.
pub trait RerollStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn keep_mask(&self, ctx: &StrategyContext, rng: &mut dyn RngCore) -> [bool; DICE_PER_SIDE];

    fn decide(&self, ctx: &StrategyContext, rng: &mut dyn RngCore) -> Vec<Die> {
        let mask = self.keep_mask(ctx, rng);
        ctx.dice
            .iter()
            .zip(mask)
            .map(|(die, keep)| if keep { *die } else { Die::roll(rng) })
            .collect()
    }
}

/// Tunables for [`AdaptiveStrategy`]. Defaults reproduce the reference
/// policy: keep thresholds 3/4/5/6 by score-gap band, end-game within 10
/// points of the target, reroll low dice when the expected gain reaches 2.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveParams {
    /// Points-to-target at or below which the end-game policy applies.
    pub endgame_margin: u32,
    /// Minimum summed expected gain before low dice are rerolled late.
    pub reroll_gain_threshold: f64,
    /// Keep threshold while ahead of the opponent.
    pub conservative_keep: u8,
    /// Keep threshold in a close game.
    pub standard_keep: u8,
    /// Keep threshold while moderately behind.
    pub moderate_risk_keep: u8,
    /// Keep threshold while far behind.
    pub high_risk_keep: u8,
    /// Score deficit at which the moderate-risk band starts.
    pub moderate_gap: i64,
    /// Score deficit at which the high-risk band starts.
    pub high_gap: i64,
}

impl Default for AdaptiveParams {
    fn default() -> Self {
        Self {
            endgame_margin: 10,
            reroll_gain_threshold: 2.0,
            conservative_keep: 3,
            standard_keep: 4,
            moderate_risk_keep: 5,
            high_risk_keep: 6,
            moderate_gap: 30,
            high_gap: 60,
        }
    }
}

/// Threshold policy that adapts to the score gap: conservative while ahead,
/// increasingly risky while behind, and expected-gain driven near the
/// target.
#[derive(Debug, Clone, Default)]
pub struct AdaptiveStrategy {
    params: AdaptiveParams,
}

impl AdaptiveStrategy {
    pub fn new(params: AdaptiveParams) -> Self {
        Self { params }
    }

    fn threshold_mask(dice: &[Die], keep_at_least: u8) -> [bool; DICE_PER_SIDE] {
        let mut mask = [true; DICE_PER_SIDE];
        for (slot, die) in mask.iter_mut().zip(dice) {
            *slot = die.value >= keep_at_least;
        }
        mask
    }

    fn endgame_mask(&self, dice: &[Die], points_to_target: u32) -> [bool; DICE_PER_SIDE] {
        let low_dice: Vec<&Die> = dice.iter().filter(|d| d.value <= ENDGAME_LOW_FACE).collect();
        if low_dice.is_empty() {
            return [true; DICE_PER_SIDE];
        }

        let expected_gain: f64 = low_dice
            .iter()
            .map(|d| UNIFORM_DIE_MEAN - d.value as f64)
            .sum();

        // The second disjunct cannot fire behind the endgame_margin gate;
        // it is retained to match the reference policy exactly.
        if expected_gain >= self.params.reroll_gain_threshold
            || points_to_target > self.params.endgame_margin
        {
            Self::threshold_mask(dice, ENDGAME_LOW_FACE + 1)
        } else {
            [true; DICE_PER_SIDE]
        }
    }
}

impl RerollStrategy for AdaptiveStrategy {
    fn name(&self) -> &str {
        "adaptive"
    }

    fn keep_mask(&self, ctx: &StrategyContext, _rng: &mut dyn RngCore) -> [bool; DICE_PER_SIDE] {
        // The third roll is always scored; nothing left to decide.
        if ctx.roll_number >= MAX_ROLLS_PER_TURN {
            return [true; DICE_PER_SIDE];
        }

        let roll_value = dice_value(ctx.dice);
        let projected_total = ctx.own_score + roll_value;

        // This roll already wins: bank it.
        if projected_total >= ctx.target_score {
            return [true; DICE_PER_SIDE];
        }

        let points_to_target = ctx.target_score - projected_total;
        if points_to_target <= self.params.endgame_margin {
            return self.endgame_mask(ctx.dice, points_to_target);
        }

        let score_gap = ctx.opponent_score as i64 - ctx.own_score as i64;
        let keep_at_least = if score_gap < 0 {
            self.params.conservative_keep
        } else if score_gap >= self.params.high_gap {
            self.params.high_risk_keep
        } else if score_gap >= self.params.moderate_gap {
            self.params.moderate_risk_keep
        } else {
            self.params.standard_keep
        };
        Self::threshold_mask(ctx.dice, keep_at_least)
    }
}

/// The retained alternate policy: a fair coin decides whether to reroll at
/// all, then each die independently has an even chance of being kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoinFlipStrategy;

impl RerollStrategy for CoinFlipStrategy {
    fn name(&self) -> &str {
        "coin_flip"
    }

    fn keep_mask(&self, ctx: &StrategyContext, rng: &mut dyn RngCore) -> [bool; DICE_PER_SIDE] {
        if ctx.roll_number >= MAX_ROLLS_PER_TURN {
            return [true; DICE_PER_SIDE];
        }
        if !rng.gen_bool(0.5) {
            return [true; DICE_PER_SIDE];
        }
        let mut mask = [true; DICE_PER_SIDE];
        for slot in mask.iter_mut() {
            *slot = rng.gen_bool(0.5);
        }
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn hand(values: [u8; DICE_PER_SIDE]) -> Vec<Die> {
        values
            .iter()
            .map(|&value| Die {
                value,
                is_selected: false,
            })
            .collect()
    }

    fn ctx<'a>(
        dice: &'a [Die],
        own_score: u32,
        opponent_score: u32,
        target_score: u32,
        roll_number: u8,
    ) -> StrategyContext<'a> {
        StrategyContext {
            dice,
            own_score,
            opponent_score,
            target_score,
            roll_number,
        }
    }

    #[test]
    fn standard_band_keeps_four_and_above() {
        let strategy = AdaptiveStrategy::default();
        let dice = hand([6, 5, 4, 3, 2]);
        let mut rng = StdRng::seed_from_u64(7);
        let mask = strategy.keep_mask(&ctx(&dice, 0, 0, 101, 1), &mut rng);
        assert_eq!(mask, [true, true, true, false, false]);
    }

    #[test]
    fn decide_rerolls_exactly_the_unkept_dice() {
        let strategy = AdaptiveStrategy::default();
        let dice = hand([6, 5, 4, 3, 2]);

        let mut rng = StdRng::seed_from_u64(7);
        let result = strategy.decide(&ctx(&dice, 0, 0, 101, 1), &mut rng);

        // Same seed, same draw order: the two rerolled dice take the first
        // two values off the stream.
        let mut expected_rng = StdRng::seed_from_u64(7);
        let expected_a = Die::roll(&mut expected_rng);
        let expected_b = Die::roll(&mut expected_rng);

        assert_eq!(&result[..3], &dice[..3]);
        assert_eq!(result[3], expected_a);
        assert_eq!(result[4], expected_b);
    }

    #[test]
    fn conservative_band_when_ahead() {
        let strategy = AdaptiveStrategy::default();
        let dice = hand([3, 3, 2, 1, 4]);
        let mut rng = StdRng::seed_from_u64(1);
        // Own 50 vs opponent 20: gap is negative, keep everything >= 3.
        let mask = strategy.keep_mask(&ctx(&dice, 50, 20, 101, 1), &mut rng);
        assert_eq!(mask, [true, true, false, false, true]);
    }

    #[test]
    fn moderate_and_high_risk_bands_when_behind() {
        let strategy = AdaptiveStrategy::default();
        let dice = hand([6, 5, 4, 3, 2]);
        let mut rng = StdRng::seed_from_u64(1);

        // 40 behind: keep only 5s and 6s.
        let mask = strategy.keep_mask(&ctx(&dice, 10, 50, 200, 1), &mut rng);
        assert_eq!(mask, [true, true, false, false, false]);

        // 70 behind: keep only 6s.
        let mask = strategy.keep_mask(&ctx(&dice, 10, 80, 200, 1), &mut rng);
        assert_eq!(mask, [true, false, false, false, false]);
    }

    #[test]
    fn winning_roll_is_banked() {
        let strategy = AdaptiveStrategy::default();
        let dice = hand([6, 6, 6, 1, 1]);
        let mut rng = StdRng::seed_from_u64(1);
        // 85 + 20 reaches 101 even while far behind.
        let mask = strategy.keep_mask(&ctx(&dice, 85, 200, 101, 1), &mut rng);
        assert_eq!(mask, [true; DICE_PER_SIDE]);
    }

    #[test]
    fn endgame_keeps_hand_without_low_dice() {
        let strategy = AdaptiveStrategy::default();
        let dice = hand([4, 4, 4, 5, 4]);
        let mut rng = StdRng::seed_from_u64(1);
        // 75 + 21 = 96, five short of 101 and no die is 3 or lower.
        let mask = strategy.keep_mask(&ctx(&dice, 75, 0, 101, 1), &mut rng);
        assert_eq!(mask, [true; DICE_PER_SIDE]);
    }

    #[test]
    fn endgame_rerolls_low_dice_on_sufficient_expected_gain() {
        let strategy = AdaptiveStrategy::default();
        // 80 + 16 = 96. Low dice are the 1 and the 2: expected gain
        // (3.5-1) + (3.5-2) = 4.0 >= 2.0, so both go back in the cup.
        let dice = hand([6, 5, 4, 1, 2]);
        let mut rng = StdRng::seed_from_u64(1);
        let mask = strategy.keep_mask(&ctx(&dice, 80, 0, 101, 1), &mut rng);
        assert_eq!(mask, [true, true, true, false, false]);
    }

    #[test]
    fn endgame_keeps_hand_on_small_expected_gain() {
        let strategy = AdaptiveStrategy::default();
        // 75 + 22 = 97. Only low die is the 3: expected gain 0.5 < 2.0.
        let dice = hand([6, 5, 4, 3, 4]);
        let mut rng = StdRng::seed_from_u64(1);
        let mask = strategy.keep_mask(&ctx(&dice, 75, 0, 101, 1), &mut rng);
        assert_eq!(mask, [true; DICE_PER_SIDE]);
    }

    #[test]
    fn adaptive_keeps_everything_on_final_roll() {
        let strategy = AdaptiveStrategy::default();
        let dice = hand([1, 1, 1, 1, 1]);
        let mut rng = StdRng::seed_from_u64(1);
        for (own, opponent, target) in [(0, 0, 101), (10, 90, 101), (95, 95, 101)] {
            let result = strategy.decide(&ctx(&dice, own, opponent, target, 3), &mut rng);
            assert_eq!(result, dice);
        }
    }

    #[test]
    fn coin_flip_keeps_everything_on_final_roll() {
        let strategy = CoinFlipStrategy;
        let dice = hand([1, 2, 3, 4, 5]);
        let mut rng = StdRng::seed_from_u64(99);
        let result = strategy.decide(&ctx(&dice, 0, 0, 101, 3), &mut rng);
        assert_eq!(result, dice);
    }

    #[test]
    fn coin_flip_only_produces_valid_hands() {
        let strategy = CoinFlipStrategy;
        let dice = hand([1, 2, 3, 4, 5]);
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..200 {
            let result = strategy.decide(&ctx(&dice, 0, 0, 101, 1), &mut rng);
            assert_eq!(result.len(), DICE_PER_SIDE);
            assert!(result.iter().all(|d| (1..=6).contains(&d.value)));
        }
    }
}
