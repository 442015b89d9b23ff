use crate::infrastructure::bluetooth::protocol;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_true")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_true")]
    pub show_file_line: bool,
    #[serde(default = "default_false")]
    pub show_thread_ids: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_true(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_file_line: default_true(),
            show_thread_ids: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "blesession".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

/// Tunables for one session manager instance.
///
/// All session state is process-lifetime; this struct only carries the
/// parameters the embedder may want to override, with defaults matching the
/// well-known shield service (see [`protocol`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// GATT service resolved after discovery.
    #[serde(default = "default_service_uuid")]
    pub service_uuid: Uuid,
    /// RX characteristic within the service: notification source and write
    /// target for the data path.
    #[serde(default = "default_rx_char_uuid")]
    pub rx_char_uuid: Uuid,
    /// Length of a scan window in milliseconds.
    #[serde(default = "default_scan_duration_ms")]
    pub scan_duration_ms: u64,
    /// Interval between signal-strength reads while connected.
    #[serde(default = "default_rssi_interval_ms")]
    pub rssi_interval_ms: u64,

    #[serde(default)]
    pub log_settings: LogSettings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            service_uuid: default_service_uuid(),
            rx_char_uuid: default_rx_char_uuid(),
            scan_duration_ms: default_scan_duration_ms(),
            rssi_interval_ms: default_rssi_interval_ms(),
            log_settings: LogSettings::default(),
        }
    }
}

fn default_service_uuid() -> Uuid {
    protocol::SHIELD_SERVICE_UUID
}
fn default_rx_char_uuid() -> Uuid {
    protocol::SHIELD_RX_CHAR_UUID
}
fn default_scan_duration_ms() -> u64 {
    3000
}
fn default_rssi_interval_ms() -> u64 {
    500
}

impl SessionConfig {
    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_target_shield_service() {
        let config = SessionConfig::default();
        assert_eq!(config.service_uuid, protocol::SHIELD_SERVICE_UUID);
        assert_eq!(config.rx_char_uuid, protocol::SHIELD_RX_CHAR_UUID);
        assert_eq!(config.scan_duration_ms, 3000);
        assert_eq!(config.rssi_interval_ms, 500);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: SessionConfig = serde_json::from_str(r#"{"scan_duration_ms": 1000}"#).unwrap();
        assert_eq!(config.scan_duration_ms, 1000);
        assert_eq!(config.rssi_interval_ms, 500);
        assert_eq!(config.service_uuid, protocol::SHIELD_SERVICE_UUID);
        assert_eq!(config.log_settings.level, "info");
    }
}
