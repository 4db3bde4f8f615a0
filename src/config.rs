use crate::models::VersionSchedule;
use rust_decimal::Decimal;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Consensus parameters. Every node must run with identical values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainParams {
    /// Odds scale: 10000 = 1.0000
    pub odds_divisor: u32,
    /// House commission on winnings, in permille of the profit
    pub betx_permille: u32,
    pub min_bet: Decimal,
    pub max_bet: Decimal,
    /// Betting closes this many seconds before an event starts
    pub bet_place_timeout_secs: u64,
    pub versions: VersionSchedule,
    pub oracle_addresses: Vec<String>,
}

/// Application configuration for the replay binary
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub chain: ChainParams,
    pub log_level: String,
    pub blocks_file: PathBuf,
    pub audit_dir: PathBuf,
    pub environment: String,
}

fn parse_env<T: FromStr>(key: &str) -> Result<Option<T>, String> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| format!("Invalid value for {}: {}", key, raw)),
        Err(_) => Ok(None),
    }
}

impl ChainParams {
    /// Create chain parameters from environment variables
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let odds_divisor = parse_env::<u32>("ODDS_DIVISOR")?.unwrap_or(defaults.odds_divisor);
        let betx_permille = parse_env::<u32>("BETX_PERMILLE")?.unwrap_or(defaults.betx_permille);
        let min_bet = parse_env::<Decimal>("MIN_BET")?.unwrap_or(defaults.min_bet);
        let max_bet = parse_env::<Decimal>("MAX_BET")?.unwrap_or(defaults.max_bet);
        let bet_place_timeout_secs = parse_env::<u64>("BET_PLACE_TIMEOUT_SECS")?
            .unwrap_or(defaults.bet_place_timeout_secs);

        let versions = match env::var("PROTOCOL_VERSIONS") {
            Ok(schedule) => VersionSchedule::parse(&schedule)?,
            Err(_) => defaults.versions,
        };

        let oracle_addresses = env::var("ORACLE_ADDRESSES")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let params = Self {
            odds_divisor,
            betx_permille,
            min_bet,
            max_bet,
            bet_place_timeout_secs,
            versions,
            oracle_addresses,
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.odds_divisor == 0 {
            return Err("ODDS_DIVISOR must be greater than 0".to_string());
        }

        if self.betx_permille > 1000 {
            return Err("BETX_PERMILLE must not exceed 1000".to_string());
        }

        if self.min_bet <= Decimal::ZERO {
            return Err("MIN_BET must be greater than 0".to_string());
        }

        if self.max_bet < self.min_bet {
            return Err(format!(
                "MAX_BET ({}) must not be below MIN_BET ({})",
                self.max_bet, self.min_bet
            ));
        }

        Ok(())
    }
}

impl Default for ChainParams {
    fn default() -> Self {
        Self {
            odds_divisor: 10_000,
            betx_permille: 0,
            min_bet: Decimal::new(25, 0),
            max_bet: Decimal::new(10_000, 0),
            bet_place_timeout_secs: 1_200, // 20 minutes
            versions: VersionSchedule::default(),
            oracle_addresses: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Create application config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let chain = ChainParams::from_env()?;

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let blocks_file = env::var("BLOCKS_FILE")
            .map(PathBuf::from)
            .map_err(|_| "BLOCKS_FILE environment variable is required")?;

        let audit_dir = env::var("AUDIT_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("audit"));

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        // Validate log level
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_LEVEL: {}. Must be one of: {:?}",
                log_level, valid_log_levels
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&environment.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid ENVIRONMENT: {}. Must be one of: {:?}",
                environment, valid_environments
            ));
        }

        Ok(Self {
            chain,
            log_level: log_level.to_lowercase(),
            blocks_file,
            audit_dir,
            environment: environment.to_lowercase(),
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check if running in development
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            chain: ChainParams::default(),
            log_level: "info".to_string(),
            blocks_file: PathBuf::from("blocks.json"),
            audit_dir: PathBuf::from("audit"),
            environment: "development".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProtocolVersion, VersionResolver};

    #[test]
    fn test_chain_params_default() {
        let params = ChainParams::default();
        assert_eq!(params.odds_divisor, 10_000);
        assert_eq!(params.betx_permille, 0);
        assert_eq!(params.min_bet, Decimal::new(25, 0));
        assert_eq!(params.versions.version_at(0), ProtocolVersion(3));
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_chain_params_validation() {
        let params = ChainParams {
            odds_divisor: 0,
            ..ChainParams::default()
        };
        assert!(params.validate().is_err());

        let params = ChainParams {
            min_bet: Decimal::new(50, 0),
            max_bet: Decimal::new(10, 0),
            ..ChainParams::default()
        };
        assert!(params.validate().is_err());

        let params = ChainParams {
            betx_permille: 1001,
            ..ChainParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert!(config.is_development());
        assert!(!config.is_production());
        assert_eq!(config.audit_dir, PathBuf::from("audit"));
    }
}
