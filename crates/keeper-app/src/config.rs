// Configuration loading and parsing (league.toml, valuation.toml).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use keeper_core::model::Position;
use keeper_core::settings::{MonthDay, TradeDeadlines};
use keeper_core::trade::{AgeCurve, PickCurve};
use keeper_core::{KeeperSettings, SettingsError, TradeValueWeights};
use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

impl ConfigError {
    fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<SettingsError> for ConfigError {
    fn from(e: SettingsError) -> Self {
        match e {
            SettingsError::Invalid { field, message } => ConfigError::ValidationError { field, message },
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub settings: KeeperSettings,
    pub valuation: TradeValueWeights,
    pub db_path: String,
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct LeagueFile {
    league: LeagueConfig,
    keeper: KeeperSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct KeeperSection {
    max_keepers: u8,
    max_franchise_tags: u8,
    max_regular_keepers: u8,
    regular_keeper_max_years: u8,
    undrafted_round: u8,
    minimum_round: u8,
    cost_reduction_per_year: u8,
    draft_rounds: u8,
    current_season: i32,
    /// `"MM-DD"` applied to seasons missing from `trade_deadlines`.
    #[serde(default)]
    deadline_fallback: Option<String>,
    /// Season (as a string key) to `"YYYY-MM-DD"`.
    #[serde(default)]
    trade_deadlines: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// valuation.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct ValuationFile {
    positions: BTreeMap<String, f64>,
    age: AgeSection,
    keeper_bonus: KeeperBonusSection,
    picks: PicksSection,
    database: DatabaseSection,
}

#[derive(Debug, Clone, Deserialize)]
struct AgeSection {
    peak_age: u8,
    youth_bonus_per_year: f64,
    max_youth_bonus: f64,
    decline_per_year: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct KeeperBonusSection {
    per_round: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct PicksSection {
    round_one_value: f64,
    round_decay: f64,
    year_discount: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/league.toml` and `config/valuation.toml`
/// relative to `base_dir`. Does not copy defaults.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    let league_path = config_dir.join("league.toml");
    let league_file: LeagueFile = parse_file(&league_path)?;

    let valuation_path = config_dir.join("valuation.toml");
    let valuation_file: ValuationFile = parse_file(&valuation_path)?;

    let settings = keeper_settings(league_file.keeper)?;
    let (valuation, db_path) = valuation_weights(valuation_file)?;

    let config = Config {
        league: league_file.league,
        settings,
        valuation,
        db_path,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            // Never overwrite a commissioner's edited config.
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Loads config relative to `base_dir`, copying defaults first.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_files(base_dir)?;
    load_config_from(base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn keeper_settings(section: KeeperSection) -> Result<KeeperSettings, ConfigError> {
    let mut by_season = BTreeMap::new();
    for (season, date) in &section.trade_deadlines {
        let field = format!("keeper.trade_deadlines.{season}");
        let season: i32 = season
            .parse()
            .map_err(|_| ConfigError::invalid(&field, "season key must be a year"))?;
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|e| ConfigError::invalid(&field, format!("expected YYYY-MM-DD, got `{date}`: {e}")))?;
        by_season.insert(season, date);
    }

    let fallback = section
        .deadline_fallback
        .as_deref()
        .map(MonthDay::parse)
        .transpose()
        .map_err(|e| ConfigError::invalid("keeper.deadline_fallback", e.to_string()))?;

    Ok(KeeperSettings {
        max_keepers: section.max_keepers,
        max_franchise_tags: section.max_franchise_tags,
        max_regular_keepers: section.max_regular_keepers,
        regular_keeper_max_years: section.regular_keeper_max_years,
        undrafted_round: section.undrafted_round,
        minimum_round: section.minimum_round,
        cost_reduction_per_year: section.cost_reduction_per_year,
        draft_rounds: section.draft_rounds,
        current_season: section.current_season,
        trade_deadlines: TradeDeadlines { by_season, fallback },
    })
}

fn valuation_weights(file: ValuationFile) -> Result<(TradeValueWeights, String), ConfigError> {
    let mut positions = BTreeMap::new();
    for (key, value) in file.positions {
        let pos = Position::from_str_pos(&key)
            .ok_or_else(|| ConfigError::invalid(format!("positions.{key}"), "unknown position"))?;
        positions.insert(pos, value);
    }

    let weights = TradeValueWeights {
        positions,
        age: AgeCurve {
            peak_age: file.age.peak_age,
            youth_bonus_per_year: file.age.youth_bonus_per_year,
            max_youth_bonus: file.age.max_youth_bonus,
            decline_per_year: file.age.decline_per_year,
        },
        keeper_bonus_per_round: file.keeper_bonus.per_round,
        picks: PickCurve {
            round_one_value: file.picks.round_one_value,
            round_decay: file.picks.round_decay,
            year_discount: file.picks.year_discount,
        },
    };
    Ok((weights, file.database.path))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.league.id.trim().is_empty() {
        return Err(ConfigError::invalid("league.id", "must not be empty"));
    }

    config.settings.validate().map_err(|e| prefixed("keeper", e))?;
    config.valuation.validate()?;

    if config.db_path.trim().is_empty() {
        return Err(ConfigError::invalid("database.path", "must not be empty"));
    }

    Ok(())
}

fn prefixed(section: &str, e: SettingsError) -> ConfigError {
    match e {
        SettingsError::Invalid { field, message } => ConfigError::ValidationError {
            field: format!("{section}.{field}"),
            message,
        },
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn defaults_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("defaults")
    }

    /// Fresh scratch directory holding a `config/` with the shipped defaults.
    fn scratch(name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(format!("keeper_config_{name}"));
        let _ = fs::remove_dir_all(&tmp);
        let config_dir = tmp.join("config");
        fs::create_dir_all(&config_dir).unwrap();
        for file in ["league.toml", "valuation.toml"] {
            fs::copy(defaults_dir().join(file), config_dir.join(file)).unwrap();
        }
        tmp
    }

    fn rewrite(tmp: &Path, file: &str, from: &str, to: &str) {
        let path = tmp.join("config").join(file);
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains(from), "{file} should contain `{from}`");
        fs::write(&path, text.replace(from, to)).unwrap();
    }

    fn expect_field(tmp: &Path, expected: &str) {
        match load_config_from(tmp).unwrap_err() {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, expected),
            other => panic!("expected ValidationError, got: {other}"),
        }
    }

    #[test]
    fn load_shipped_defaults() {
        let tmp = scratch("defaults");
        let config = load_config_from(&tmp).expect("defaults should load");

        assert_eq!(config.league.id, "gridiron-keepers");
        assert_eq!(config.settings.max_keepers, 4);
        assert_eq!(config.settings.max_franchise_tags, 1);
        assert_eq!(config.settings.undrafted_round, 10);
        assert_eq!(config.settings.draft_rounds, 15);
        assert_eq!(
            config.settings.deadline_for(2023),
            NaiveDate::from_ymd_opt(2023, 11, 15)
        );
        assert_eq!(
            config.settings.trade_deadlines.fallback,
            Some(MonthDay { month: 11, day: 20 })
        );
        assert_eq!(config.valuation.base_position_value(Position::RunningBack), 35.0);
        assert_eq!(config.valuation.base_position_value(Position::Defense), 5.0);
        assert!((config.valuation.picks.round_decay - 0.75).abs() < f64::EPSILON);
        assert_eq!(config.db_path, "keeper.db");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_copies_and_preserves() {
        let tmp = std::env::temp_dir().join("keeper_config_ensure");
        let _ = fs::remove_dir_all(&tmp);
        let defaults = tmp.join("defaults");
        fs::create_dir_all(&defaults).unwrap();
        fs::write(defaults.join("league.toml"), "default").unwrap();
        fs::write(defaults.join("valuation.toml"), "default").unwrap();
        fs::write(defaults.join("secrets.toml.example"), "template").unwrap();

        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("config/league.toml"), "edited").unwrap();

        let copied = ensure_config_files(&tmp).unwrap();
        assert_eq!(copied, vec![tmp.join("config/valuation.toml")]);
        assert_eq!(fs::read_to_string(tmp.join("config/league.toml")).unwrap(), "edited");
        assert!(!tmp.join("config/secrets.toml.example").exists());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_defaults_and_config_is_an_error() {
        let tmp = std::env::temp_dir().join("keeper_config_empty");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        assert!(matches!(
            ensure_config_files(&tmp),
            Err(ConfigError::DefaultsCopyError { .. })
        ));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_file_reports_path() {
        let tmp = scratch("missing");
        fs::remove_file(tmp.join("config/valuation.toml")).unwrap();
        match load_config_from(&tmp).unwrap_err() {
            ConfigError::FileNotFound { path } => assert!(path.ends_with("valuation.toml")),
            other => panic!("expected FileNotFound, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let tmp = scratch("malformed");
        fs::write(tmp.join("config/league.toml"), "[league\nname = ").unwrap();
        assert!(matches!(
            load_config_from(&tmp),
            Err(ConfigError::ParseError { .. })
        ));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_minimum_round_above_undrafted() {
        let tmp = scratch("min_round");
        rewrite(&tmp, "league.toml", "minimum_round = 1", "minimum_round = 12");
        expect_field(&tmp, "keeper.minimum_round");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_undrafted_round_beyond_draft() {
        let tmp = scratch("undrafted");
        rewrite(&tmp, "league.toml", "undrafted_round = 10", "undrafted_round = 20");
        expect_field(&tmp, "keeper.undrafted_round");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_bad_deadline_date() {
        let tmp = scratch("bad_deadline");
        rewrite(&tmp, "league.toml", "\"2023-11-15\"", "\"2023-13-15\"");
        expect_field(&tmp, "keeper.trade_deadlines.2023");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_bad_fallback() {
        let tmp = scratch("bad_fallback");
        rewrite(&tmp, "league.toml", "deadline_fallback = \"11-20\"", "deadline_fallback = \"02-30\"");
        expect_field(&tmp, "keeper.deadline_fallback");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_unknown_position() {
        let tmp = scratch("bad_position");
        rewrite(&tmp, "valuation.toml", "TE = 20.0", "LB = 20.0");
        expect_field(&tmp, "positions.LB");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_pick_decay_of_one() {
        let tmp = scratch("decay");
        rewrite(&tmp, "valuation.toml", "round_decay = 0.75", "round_decay = 1.0");
        expect_field(&tmp, "picks.round_decay");
        let _ = fs::remove_dir_all(&tmp);
    }
}
