use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const HOST_VAR: &str = "CONTROLLER_HOST";
const PORT_VAR: &str = "CONTROLLER_PORT";

#[derive(Debug, Error)]
pub enum ConfigError
{
    #[error("failed to read config {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("invalid config {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
    #[error("CONTROLLER_PORT must be a valid u16, got '{0}'")]
    Port(String),
}

/// Everything the shell and the controller link need. The games never see it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    pub connection: ConnectionConfig,
    pub games: Vec<GameEntry>,
    pub logging: LoggingConfig,
    pub ui: UiConfig,
    pub arduino: ArduinoConfig,
    pub network: NetworkConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig
{
    pub timeout_ms: u64,
    pub max_retry_attempts: u32,
    pub auto_reconnect: bool,
    pub common_ips: Vec<String>,
    pub retry_delay_ms: u64,
    pub port: u16,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameEntry
{
    pub id: usize,
    pub name: String,
    pub color: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig
{
    pub level: String,
    pub export_format: String,
    pub directory: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig
{
    pub animation_duration_ms: u64,
    pub toast_duration_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArduinoConfig
{
    pub button_pins: Vec<u8>,
    pub special_pins: SpecialPins,
    pub led_pin: u8,
    pub debounce_delay_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpecialPins
{
    pub reset: u8,
    pub game_select: u8,
    pub confirm: u8,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig
{
    pub wifi_ssid: String,
    pub ap_ssid: String,
    pub ap_password: String,
}

impl Config
{
    /// Defaults, overlaid by `path` when given, then by the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError>
    {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(env::var(HOST_VAR).ok(), env::var(PORT_VAR).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError>
    {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_env(&mut self, host: Option<String>, port: Option<String>) -> Result<(), ConfigError>
    {
        if let Some(host) = host.filter(|host| !host.trim().is_empty()) {
            self.connection.common_ips = vec![host.trim().to_string()];
        }
        if let Some(port) = port {
            self.connection.port = port
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::Port(port.clone()))?;
        }
        Ok(())
    }

    pub fn game(&self, id: usize) -> Option<&GameEntry>
    {
        self.games.iter().find(|game| game.id == id)
    }
}

impl Default for Config
{
    fn default() -> Self
    {
        Self {
            connection: ConnectionConfig::default(),
            games: default_games(),
            logging: LoggingConfig::default(),
            ui: UiConfig::default(),
            arduino: ArduinoConfig::default(),
            network: NetworkConfig::default(),
        }
    }
}

impl Default for ConnectionConfig
{
    fn default() -> Self
    {
        Self {
            timeout_ms: 8000,
            max_retry_attempts: 3,
            auto_reconnect: true,
            common_ips: vec![
                "192.168.1.100".to_string(),
                "192.168.4.1".to_string(),
                "192.168.0.100".to_string(),
                "192.168.137.200".to_string(),
            ],
            retry_delay_ms: 2000,
            port: 81,
        }
    }
}

impl ConnectionConfig
{
    pub fn timeout(&self) -> Duration
    {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration
    {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for LoggingConfig
{
    fn default() -> Self
    {
        Self {
            level: "info".to_string(),
            export_format: "txt".to_string(),
            directory: PathBuf::from("logs"),
        }
    }
}

impl LoggingConfig
{
    pub fn level_filter(&self) -> log::LevelFilter
    {
        self.level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

impl Default for UiConfig
{
    fn default() -> Self
    {
        Self {
            animation_duration_ms: 300,
            toast_duration_ms: 3000,
        }
    }
}

impl Default for ArduinoConfig
{
    fn default() -> Self
    {
        Self {
            button_pins: vec![16, 17, 18, 19, 21, 22],
            special_pins: SpecialPins {
                reset: 27,
                game_select: 32,
                confirm: 33,
            },
            led_pin: 2,
            debounce_delay_ms: 50,
        }
    }
}

impl Default for NetworkConfig
{
    fn default() -> Self
    {
        Self {
            wifi_ssid: "KAIYAN".to_string(),
            ap_ssid: "Arduino_Game_Controller".to_string(),
            ap_password: "12345678".to_string(),
        }
    }
}

pub fn default_games() -> Vec<GameEntry>
{
    [(0, "Tic-Tac-Toe", "#ffc107"), (1, "Memory", "#17a2b8"), (2, "Reaction", "#dc3545")]
        .into_iter()
        .map(|(id, name, color)| GameEntry {
            id,
            name: name.to_string(),
            color: color.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn defaults_match_the_controller_table()
    {
        let config = Config::default();
        assert_eq!(config.connection.timeout(), Duration::from_secs(8));
        assert_eq!(config.connection.common_ips.len(), 4);
        assert_eq!(config.arduino.special_pins.game_select, 32);
        assert_eq!(config.game(2).map(|game| game.color.as_str()), Some("#dc3545"));
    }

    #[test]
    fn partial_json_keeps_defaults()
    {
        let config: Config =
            serde_json::from_str(r#"{"connection": {"port": 8080}, "ui": {"toast_duration_ms": 1000}}"#)
                .unwrap();
        assert_eq!(config.connection.port, 8080);
        assert_eq!(config.connection.max_retry_attempts, 3);
        assert_eq!(config.ui.toast_duration_ms, 1000);
        assert_eq!(config.ui.animation_duration_ms, 300);
        assert_eq!(config.games.len(), 3);
    }

    #[test]
    fn env_overrides_host_and_port()
    {
        let mut config = Config::default();
        config
            .apply_env(Some("10.0.0.7".to_string()), Some("9000".to_string()))
            .unwrap();
        assert_eq!(config.connection.common_ips, vec!["10.0.0.7".to_string()]);
        assert_eq!(config.connection.port, 9000);

        let err = config.apply_env(None, Some("port".to_string())).unwrap_err();
        assert!(matches!(err, ConfigError::Port(_)));
    }

    #[test]
    fn unknown_log_level_falls_back_to_info()
    {
        let logging = LoggingConfig {
            level: "chatty".to_string(),
            ..LoggingConfig::default()
        };
        assert_eq!(logging.level_filter(), log::LevelFilter::Info);
    }
}
