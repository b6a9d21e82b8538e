//! Application configuration.
//!
//! Loads settings from config.json at startup. Provides the vision API
//! endpoint and credentials, storage locations, and the identity used for
//! batches submitted from the command line.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

/// Global configuration instance, initialized once at startup.
static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Vision API endpoint for text recognition
    #[serde(default = "default_vision_api_url")]
    pub vision_api_url: String,
    /// API key sent in the Authorization header
    #[serde(default)]
    pub vision_api_key: String,
    /// Cloud folder id required by the vision API
    #[serde(default)]
    pub vision_folder_id: String,
    /// Language hints passed to text detection
    #[serde(default = "default_ocr_languages")]
    pub ocr_languages: Vec<String>,
    /// Timeout for one vision API call (seconds)
    #[serde(default = "default_request_timeout_sec")]
    pub request_timeout_sec: u64,
    /// Override for the record-table directory (defaults to the per-user data dir)
    #[serde(default)]
    pub data_dir: Option<String>,
    /// Path to the canonical entity-name dictionary
    #[serde(default = "default_dictionary_path")]
    pub dictionary_path: String,
    /// User id attributed to batches submitted from the command line
    #[serde(default)]
    pub default_user_id: i64,
    /// Username attributed to batches submitted from the command line
    #[serde(default = "default_username")]
    pub default_username: String,
}

fn default_vision_api_url() -> String {
    "https://vision.api.cloud.yandex.net/vision/v1/batchAnalyze".to_string()
}

fn default_ocr_languages() -> Vec<String> {
    vec!["en".to_string(), "ru".to_string()]
}

fn default_request_timeout_sec() -> u64 {
    30
}

fn default_dictionary_path() -> String {
    "resources/dictionary.txt".to_string()
}

fn default_username() -> String {
    "cli".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            vision_api_url: default_vision_api_url(),
            vision_api_key: String::new(),
            vision_folder_id: String::new(),
            ocr_languages: default_ocr_languages(),
            request_timeout_sec: default_request_timeout_sec(),
            data_dir: None,
            dictionary_path: default_dictionary_path(),
            default_user_id: 0,
            default_username: default_username(),
        }
    }
}

/// Loads configuration from config.json or returns defaults.
/// Looks for config.json in the same directory as the executable.
fn load_config() -> AppConfig {
    let config_path = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|p| p.join("config.json")))
        .unwrap_or_else(|| Path::new("config.json").to_path_buf());

    crate::log(&format!("Looking for config at: {}", config_path.display()));

    if config_path.exists() {
        match fs::read_to_string(config_path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    crate::log("Config loaded from config.json");
                    return config;
                }
                Err(e) => {
                    crate::log(&format!(
                        "Failed to parse config.json: {}. Using defaults.",
                        e
                    ));
                }
            },
            Err(e) => {
                crate::log(&format!(
                    "Failed to read config.json: {}. Using defaults.",
                    e
                ));
            }
        }
    } else {
        crate::log("config.json not found. Using default config.");
    }

    AppConfig::default()
}

/// Initializes the global configuration. Call once at startup.
pub fn init_config() {
    let _ = CONFIG.set(load_config());
}

/// Returns a reference to the global configuration.
/// Panics if called before init_config().
pub fn get_config() -> &'static AppConfig {
    CONFIG
        .get()
        .expect("Config not initialized. Call init_config() first.")
}
