//! Process configuration, loaded once from JSON at startup and thereafter
//! immutable (spec §5, §6.4). Published behind an [`arc_swap::ArcSwap`] so
//! that a future reload mechanism can swap the whole snapshot atomically
//! without readers ever observing a half-updated config.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub min_name_length: usize,
    pub max_name_length: usize,
    pub min_info_length: usize,
    pub max_info_length: usize,
    pub min_title_length: usize,
    pub max_title_length: usize,
    pub min_signature_length: usize,
    pub max_signature_length: usize,
    pub last_seen_update_precision: i64,
    pub max_users_per_page: usize,
    pub online_users_interval_seconds: i64,
    pub max_logo_binary_size: usize,
    pub max_logo_width: u32,
    pub max_logo_height: u32,
    pub reset_vote_expires_in_seconds: i64,
    pub visitor_online_for_seconds: i64,
}

impl Default for UserConfig {
    fn default() -> Self {
        UserConfig {
            min_name_length: 3,
            max_name_length: 64,
            min_info_length: 0,
            max_info_length: 2048,
            min_title_length: 0,
            max_title_length: 128,
            min_signature_length: 0,
            max_signature_length: 256,
            last_seen_update_precision: 60,
            max_users_per_page: 50,
            online_users_interval_seconds: 300,
            max_logo_binary_size: 65_536,
            max_logo_width: 256,
            max_logo_height: 256,
            reset_vote_expires_in_seconds: 0,
            visitor_online_for_seconds: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityLimitsConfig {
    pub min_name_length: usize,
    pub max_name_length: usize,
    pub min_content_length: usize,
    pub max_content_length: usize,
    pub max_per_page: usize,
}

impl Default for EntityLimitsConfig {
    fn default() -> Self {
        EntityLimitsConfig {
            min_name_length: 3,
            max_name_length: 64,
            min_content_length: 1,
            max_content_length: 16_384,
            max_per_page: 25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub number_of_io_service_threads: usize,
    pub number_of_read_buffers: usize,
    pub number_of_write_buffers: usize,
    pub listen_ip_address: String,
    pub listen_port: u16,
    pub connection_timeout_seconds: u64,
    pub trust_ip_from_x_forwarded_for: bool,
    pub disable_commands: bool,
    pub disable_commands_for_anonymous_users: bool,
    pub disable_throttling: bool,
    pub response_prefix: String,
    pub expected_origin_referer: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            number_of_io_service_threads: 4,
            number_of_read_buffers: 1024,
            number_of_write_buffers: 1024,
            listen_ip_address: "0.0.0.0".to_string(),
            listen_port: 8081,
            connection_timeout_seconds: 30,
            trust_ip_from_x_forwarded_for: false,
            disable_commands: false,
            disable_commands_for_anonymous_users: false,
            disable_throttling: false,
            response_prefix: ")]}',\n".to_string(),
            expected_origin_referer: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub input_folder: String,
    pub output_folder: String,
    pub messages_file: String,
    pub validate_checksum: bool,
    pub create_new_output_file_every_seconds: i64,
    pub persist_ip_addresses: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        PersistenceConfig {
            input_folder: "events".to_string(),
            output_folder: "events".to_string(),
            messages_file: "events/messages.bin".to_string(),
            validate_checksum: true,
            create_new_output_file_every_seconds: 3600,
            persist_ip_addresses: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub user: UserConfig,
    #[serde(default)]
    pub discussion_thread: EntityLimitsConfig,
    #[serde(default)]
    pub discussion_thread_message: EntityLimitsConfig,
    #[serde(default)]
    pub discussion_tag: EntityLimitsConfig,
    #[serde(default)]
    pub discussion_category: EntityLimitsConfig,
    pub service: ServiceConfig,
    pub persistence: PersistenceConfig,
    /// Forum-wide required-privilege values applied once at startup, before
    /// any event log is replayed (spec §6.4 `defaultPrivileges`, collapsed
    /// to this crate's single flat `Privilege` enum — see DESIGN.md). Keys
    /// are `Privilege::name()` strings; unknown keys are ignored.
    #[serde(default)]
    pub default_privileges: HashMap<String, i32>,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;
        let config: Config = serde_json::from_str(&text)
            .map_err(|e| anyhow::anyhow!("failed to parse config file {}: {e}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_json() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.service.listen_port, config.service.listen_port);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: Config = serde_json::from_str("{\"service\": {\"listen_port\": 9000}}").unwrap();
        assert_eq!(config.service.listen_port, 9000);
        assert_eq!(config.user.max_name_length, UserConfig::default().max_name_length);
    }
}
