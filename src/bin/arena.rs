//! Arena CLI: run strategy-vs-strategy experiments from the command line.
//!
//! Usage:
//!   cargo run --release --bin arena -- --games 200 --p1-profile balanced --p2-profile coin_flip
//!   cargo run --release --bin arena -- --games 50 --p1-standard-keep 5 --p2-type coin_flip

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use dice_duel_engine::engine::arena::{run_arena, ArenaOptions};
use dice_duel_engine::engine::profiles::{
    find_profile, load_default_profiles, load_profiles, StrategyProfile, StrategyProfilesFile,
    BUILTIN_PROFILES,
};

#[derive(Parser)]
#[command(name = "arena", about = "Run strategy-vs-strategy arena experiments for the dice duel")]
struct Cli {
    /// Number of games to play
    #[arg(long, default_value = "100")]
    games: usize,

    /// Random seed
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Target score both seats race to
    #[arg(long, default_value = "101")]
    target: u32,

    /// Alternate seat positions between games
    #[arg(long, default_value = "true")]
    alternate_seats: bool,

    /// Path to strategy_profiles.toml (default: auto-discover)
    #[arg(long, env = "DICE_DUEL_PROFILES")]
    profiles: Option<PathBuf>,

    // --- Player 1 ---
    /// P1 display name
    #[arg(long, default_value = "p1")]
    p1_name: String,

    /// P1 profile name (from strategy_profiles.toml or built-ins)
    #[arg(long)]
    p1_profile: Option<String>,

    /// P1 strategy type: "adaptive" or "coin_flip"
    #[arg(long, default_value = "adaptive")]
    p1_type: String,

    /// P1 end-game margin (points to target)
    #[arg(long)]
    p1_endgame_margin: Option<u32>,

    /// P1 expected-gain threshold for late rerolls
    #[arg(long)]
    p1_gain_threshold: Option<f64>,

    /// P1 keep threshold while ahead
    #[arg(long)]
    p1_conservative_keep: Option<u8>,

    /// P1 keep threshold in a close game
    #[arg(long)]
    p1_standard_keep: Option<u8>,

    /// P1 keep threshold while moderately behind
    #[arg(long)]
    p1_moderate_risk_keep: Option<u8>,

    /// P1 keep threshold while far behind
    #[arg(long)]
    p1_high_risk_keep: Option<u8>,

    /// P1 score deficit opening the moderate-risk band
    #[arg(long)]
    p1_moderate_gap: Option<i64>,

    /// P1 score deficit opening the high-risk band
    #[arg(long)]
    p1_high_gap: Option<i64>,

    // --- Player 2 ---
    /// P2 display name
    #[arg(long, default_value = "p2")]
    p2_name: String,

    /// P2 profile name (from strategy_profiles.toml or built-ins)
    #[arg(long)]
    p2_profile: Option<String>,

    /// P2 strategy type: "adaptive" or "coin_flip"
    #[arg(long, default_value = "adaptive")]
    p2_type: String,

    /// P2 end-game margin (points to target)
    #[arg(long)]
    p2_endgame_margin: Option<u32>,

    /// P2 expected-gain threshold for late rerolls
    #[arg(long)]
    p2_gain_threshold: Option<f64>,

    /// P2 keep threshold while ahead
    #[arg(long)]
    p2_conservative_keep: Option<u8>,

    /// P2 keep threshold in a close game
    #[arg(long)]
    p2_standard_keep: Option<u8>,

    /// P2 keep threshold while moderately behind
    #[arg(long)]
    p2_moderate_risk_keep: Option<u8>,

    /// P2 keep threshold while far behind
    #[arg(long)]
    p2_high_risk_keep: Option<u8>,

    /// P2 score deficit opening the moderate-risk band
    #[arg(long)]
    p2_moderate_gap: Option<i64>,

    /// P2 score deficit opening the high-risk band
    #[arg(long)]
    p2_high_gap: Option<i64>,
}

struct SeatConfig {
    name: String,
    profile: StrategyProfile,
}

#[allow(clippy::too_many_arguments)]
fn build_seat_config(
    name: &str,
    profile_name: Option<&str>,
    strategy_type: &str,
    endgame_margin: Option<u32>,
    gain_threshold: Option<f64>,
    conservative_keep: Option<u8>,
    standard_keep: Option<u8>,
    moderate_risk_keep: Option<u8>,
    high_risk_keep: Option<u8>,
    moderate_gap: Option<i64>,
    high_gap: Option<i64>,
    profiles: &StrategyProfilesFile,
) -> SeatConfig {
    // Start from profile if specified
    if let Some(prof_name) = profile_name {
        let profile = find_profile(profiles, prof_name).unwrap_or_else(|| {
            eprintln!("Error: profile '{}' not found", prof_name);
            let mut available: Vec<&str> = profiles
                .profiles
                .keys()
                .map(String::as_str)
                .chain(BUILTIN_PROFILES.keys().copied())
                .collect();
            available.sort_unstable();
            available.dedup();
            eprintln!("Available profiles: {:?}", available);
            std::process::exit(1);
        });

        let mut profile = profile.clone();

        // CLI overrides on top of profile
        if let Some(v) = endgame_margin {
            profile.endgame_margin = Some(v);
        }
        if let Some(v) = gain_threshold {
            profile.reroll_gain_threshold = Some(v);
        }
        if let Some(v) = conservative_keep {
            profile.conservative_keep = Some(v);
        }
        if let Some(v) = standard_keep {
            profile.standard_keep = Some(v);
        }
        if let Some(v) = moderate_risk_keep {
            profile.moderate_risk_keep = Some(v);
        }
        if let Some(v) = high_risk_keep {
            profile.high_risk_keep = Some(v);
        }
        if let Some(v) = moderate_gap {
            profile.moderate_gap = Some(v);
        }
        if let Some(v) = high_gap {
            profile.high_gap = Some(v);
        }

        let display_name = if name == "p1" || name == "p2" {
            prof_name.to_string()
        } else {
            name.to_string()
        };

        return SeatConfig {
            name: display_name,
            profile,
        };
    }

    // Build from individual CLI args
    let profile = StrategyProfile {
        description: None,
        strategy_type: strategy_type.to_string(),
        endgame_margin,
        reroll_gain_threshold: gain_threshold,
        conservative_keep,
        standard_keep,
        moderate_risk_keep,
        high_risk_keep,
        moderate_gap,
        high_gap,
    };

    SeatConfig {
        name: name.to_string(),
        profile,
    }
}

fn print_config(label: &str, config: &SeatConfig) {
    let params = config.profile.to_params();
    eprintln!(
        "  {}: type={}, keeps={}/{}/{}/{}, gaps={}/{}, endgame<={} (gain>={})",
        label,
        config.profile.strategy_type,
        params.conservative_keep,
        params.standard_keep,
        params.moderate_risk_keep,
        params.high_risk_keep,
        params.moderate_gap,
        params.high_gap,
        params.endgame_margin,
        params.reroll_gain_threshold,
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();

    // Load profiles
    let profiles = match &cli.profiles {
        Some(path) => load_profiles(path).unwrap_or_else(|e| {
            eprintln!("Error loading profiles: {}", e);
            std::process::exit(1);
        }),
        None => load_default_profiles(),
    };

    let p1 = build_seat_config(
        &cli.p1_name,
        cli.p1_profile.as_deref(),
        &cli.p1_type,
        cli.p1_endgame_margin,
        cli.p1_gain_threshold,
        cli.p1_conservative_keep,
        cli.p1_standard_keep,
        cli.p1_moderate_risk_keep,
        cli.p1_high_risk_keep,
        cli.p1_moderate_gap,
        cli.p1_high_gap,
        &profiles,
    );

    let p2 = build_seat_config(
        &cli.p2_name,
        cli.p2_profile.as_deref(),
        &cli.p2_type,
        cli.p2_endgame_margin,
        cli.p2_gain_threshold,
        cli.p2_conservative_keep,
        cli.p2_standard_keep,
        cli.p2_moderate_risk_keep,
        cli.p2_high_risk_keep,
        cli.p2_moderate_gap,
        cli.p2_high_gap,
        &profiles,
    );

    if p1.name == p2.name {
        eprintln!("Error: contestants need distinct names (set --p1-name/--p2-name)");
        std::process::exit(1);
    }

    eprintln!(
        "Arena: {} games, seed={}, target={}, alternate_seats={}",
        cli.games, cli.seed, cli.target, cli.alternate_seats
    );
    print_config(&p1.name, &p1);
    print_config(&p2.name, &p2);
    eprintln!();

    let options = ArenaOptions {
        num_games: cli.games,
        base_seed: cli.seed,
        target_score: cli.target,
        alternate_seats: cli.alternate_seats,
    };
    let result = run_arena((&p1.name, &p1.profile), (&p2.name, &p2.profile), &options)?;
    println!("{}", result.summary());
    Ok(())
}
