use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::QUERY_LIMIT_CEILING;
use crate::error::{MartError, Result};

/// Run configuration. Every component receives the pieces it needs from here;
/// nothing reads fixed process-wide locations.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub rules: RulesConfig,
    pub pricing: PricingConfig,
    pub reviews: ReviewsConfig,
    pub segments: SegmentsConfig,
    pub query: QueryConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Raw export as delivered by the upstream source
    pub raw_file: PathBuf,
    /// Cleaned record set produced by the clean run
    pub clean_file: PathBuf,
    /// Directory that receives one file per mart
    pub marts_dir: PathBuf,
    /// Directory for rolling JSON logs
    pub log_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_file: PathBuf::from("data/games.csv"),
            clean_file: PathBuf::from("data/games_clean.csv"),
            marts_dir: PathBuf::from("data/marts"),
            log_dir: PathBuf::from("logs"),
        }
    }
}

/// How to treat a source where only part of the mis-aligned column triplet is present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialRemapPolicy {
    /// Skip remapping and use columns at face value
    FaceValue,
    /// Abort with an unsupported-input error
    Reject,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Normalizer rule set version
    pub version: String,
    pub partial_remap: PartialRemapPolicy,
    /// Delimiter of multi-valued text fields (genres, publishers)
    pub genre_delimiter: String,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            version: "v1".to_string(),
            partial_remap: PartialRemapPolicy::FaceValue,
            genre_delimiter: ",".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Exclude free games from price statistics
    pub paid_only: bool,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self { paid_only: true }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReviewsConfig {
    /// Rows with fewer total reviews are too noisy to rate
    pub min_total_reviews: u64,
    pub min_games_per_publisher: usize,
}

impl Default for ReviewsConfig {
    fn default() -> Self {
        Self {
            min_total_reviews: 10,
            min_games_per_publisher: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SegmentsConfig {
    pub min_games_per_genre: usize,
}

impl Default for SegmentsConfig {
    fn default() -> Self {
        Self {
            min_games_per_genre: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: 100,
            max_limit: 1000,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            MartError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve paths relative to a base directory, used for isolated fixtures.
    pub fn rooted_at(base: &Path) -> Self {
        let defaults = PathsConfig::default();
        Self {
            paths: PathsConfig {
                raw_file: base.join(defaults.raw_file),
                clean_file: base.join(defaults.clean_file),
                marts_dir: base.join(defaults.marts_dir),
                log_dir: base.join(defaults.log_dir),
            },
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if self.rules.genre_delimiter.is_empty() {
            return Err(MartError::Config("rules.genre_delimiter must not be empty".to_string()));
        }
        if self.query.max_limit == 0 || self.query.max_limit > QUERY_LIMIT_CEILING {
            return Err(MartError::Config(format!(
                "query.max_limit must be within 1..={}",
                QUERY_LIMIT_CEILING
            )));
        }
        if self.query.default_limit == 0 || self.query.default_limit > self.query.max_limit {
            return Err(MartError::Config(
                "query.default_limit must be within 1..=query.max_limit".to_string(),
            ));
        }
        Ok(())
    }
}
