//! Named strategy profiles: bundles of reroll-policy parameters.
//! Loaded from TOML at runtime for the arena CLI.

use std::collections::HashMap;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::engine::strategy::{AdaptiveParams, AdaptiveStrategy, CoinFlipStrategy, RerollStrategy};

/// A named strategy profile. Every parameter is optional; anything left out
/// falls back to [`AdaptiveParams::default`].
#[derive(Debug, Deserialize, Clone)]
pub struct StrategyProfile {
    pub description: Option<String>,
    #[serde(default = "default_strategy_type")]
    pub strategy_type: String,

    pub endgame_margin: Option<u32>,
    pub reroll_gain_threshold: Option<f64>,
    pub conservative_keep: Option<u8>,
    pub standard_keep: Option<u8>,
    pub moderate_risk_keep: Option<u8>,
    pub high_risk_keep: Option<u8>,
    pub moderate_gap: Option<i64>,
    pub high_gap: Option<i64>,
}

fn default_strategy_type() -> String {
    "adaptive".into()
}

impl Default for StrategyProfile {
    fn default() -> Self {
        Self {
            description: None,
            strategy_type: default_strategy_type(),
            endgame_margin: None,
            reroll_gain_threshold: None,
            conservative_keep: None,
            standard_keep: None,
            moderate_risk_keep: None,
            high_risk_keep: None,
            moderate_gap: None,
            high_gap: None,
        }
    }
}

impl StrategyProfile {
    /// Convert to AdaptiveParams, using defaults for any unspecified fields.
    pub fn to_params(&self) -> AdaptiveParams {
        let d = AdaptiveParams::default();
        AdaptiveParams {
            endgame_margin: self.endgame_margin.unwrap_or(d.endgame_margin),
            reroll_gain_threshold: self.reroll_gain_threshold.unwrap_or(d.reroll_gain_threshold),
            conservative_keep: self.conservative_keep.unwrap_or(d.conservative_keep),
            standard_keep: self.standard_keep.unwrap_or(d.standard_keep),
            moderate_risk_keep: self.moderate_risk_keep.unwrap_or(d.moderate_risk_keep),
            high_risk_keep: self.high_risk_keep.unwrap_or(d.high_risk_keep),
            moderate_gap: self.moderate_gap.unwrap_or(d.moderate_gap),
            high_gap: self.high_gap.unwrap_or(d.high_gap),
        }
    }

    /// Instantiate the strategy this profile describes.
    pub fn build_strategy(&self) -> Result<Box<dyn RerollStrategy>, String> {
        match self.strategy_type.as_str() {
            "adaptive" => Ok(Box::new(AdaptiveStrategy::new(self.to_params()))),
            "coin_flip" => Ok(Box::new(CoinFlipStrategy)),
            other => Err(format!("unknown strategy_type {other:?}")),
        }
    }
}

/// Maps difficulty tiers to profile names.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct DifficultyConfig {
    pub easy: Option<String>,
    pub medium: Option<String>,
    pub hard: Option<String>,
    pub default: Option<String>,
}

impl DifficultyConfig {
    /// Resolve a difficulty tier to a profile name.
    pub fn resolve(&self, difficulty: &str) -> Option<&str> {
        match difficulty {
            "easy" => self.easy.as_deref(),
            "medium" => self.medium.as_deref(),
            "hard" => self.hard.as_deref(),
            _ => self.default.as_deref(),
        }
    }
}

/// Top-level TOML file structure.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct StrategyProfilesFile {
    #[serde(default)]
    pub profiles: HashMap<String, StrategyProfile>,
    #[serde(default)]
    pub difficulty: DifficultyConfig,
}

/// Profiles available without any TOML file. A file profile with the same
/// name shadows the built-in one.
pub static BUILTIN_PROFILES: Lazy<HashMap<&'static str, StrategyProfile>> = Lazy::new(|| {
    let mut profiles = HashMap::new();
    profiles.insert(
        "balanced",
        StrategyProfile {
            description: Some("Reference adaptive policy with stock thresholds".into()),
            ..StrategyProfile::default()
        },
    );
    profiles.insert(
        "daring",
        StrategyProfile {
            description: Some("Escalates risk earlier when trailing".into()),
            standard_keep: Some(5),
            moderate_gap: Some(20),
            high_gap: Some(40),
            ..StrategyProfile::default()
        },
    );
    profiles.insert(
        "coin_flip",
        StrategyProfile {
            description: Some("Even-odds reroll decisions, the weak baseline".into()),
            strategy_type: "coin_flip".into(),
            ..StrategyProfile::default()
        },
    );
    profiles
});

/// Look up a profile by name, preferring the loaded file over built-ins.
pub fn find_profile<'a>(file: &'a StrategyProfilesFile, name: &str) -> Option<&'a StrategyProfile> {
    file.profiles.get(name).or_else(|| BUILTIN_PROFILES.get(name))
}

/// Load profiles from a TOML file at the given path.
pub fn load_profiles(path: &Path) -> Result<StrategyProfilesFile, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    toml::from_str(&content).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}

/// Try to load profiles from well-known paths, returning an empty file if
/// none is found.
pub fn load_default_profiles() -> StrategyProfilesFile {
    let candidates = [
        "strategy_profiles.toml",
        "../strategy_profiles.toml",
        "/etc/dice-duel/strategy_profiles.toml",
    ];
    for path in &candidates {
        let p = Path::new(path);
        if p.exists() {
            match load_profiles(p) {
                Ok(profiles) => {
                    tracing::info!(path = %p.display(), count = profiles.profiles.len(), "loaded strategy profiles");
                    return profiles;
                }
                Err(e) => {
                    tracing::warn!(path = %p.display(), error = %e, "failed to load strategy profiles");
                }
            }
        }
    }
    tracing::info!("no strategy_profiles.toml found, using built-in profiles only");
    StrategyProfilesFile::default()
}
