use crate::error::{Error, Result};
use crate::services::grading_service::{MixedWeighting, ScoringPolicy};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub log_format: LogFormat,
    pub scoring: ScoringPolicy,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let mixed_weighting = match get_env_or("SCORING_MIXED_WEIGHTING", "equal")
            .to_ascii_lowercase()
            .as_str()
        {
            "equal" => MixedWeighting::Equal,
            "all_or_nothing" => MixedWeighting::AllOrNothing,
            other => {
                return Err(Error::Config(format!(
                    "Invalid value for SCORING_MIXED_WEIGHTING: {}",
                    other
                )))
            }
        };

        let log_format = match get_env_or("LOG_FORMAT", "text").to_ascii_lowercase().as_str() {
            "text" => LogFormat::Text,
            "json" => LogFormat::Json,
            other => {
                return Err(Error::Config(format!(
                    "Invalid value for LOG_FORMAT: {}",
                    other
                )))
            }
        };

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            database_max_connections: get_env_parse_or("DATABASE_MAX_CONNECTIONS", 20)?,
            jwt_secret: get_env("JWT_SECRET")?,
            log_format,
            scoring: ScoringPolicy {
                case_sensitive: get_env_parse_or("SCORING_CASE_SENSITIVE", true)?,
                partial_credit: get_env_parse_or("SCORING_PARTIAL_CREDIT", false)?,
                mixed_weighting,
            },
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
