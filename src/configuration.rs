// Copyright (c) 2025 Unfolded Circle ApS, Markus Zehnder <markus.z@unfoldedcircle.com>
// SPDX-License-Identifier: MPL-2.0

//! Configuration file handling.

use crate::errors::ServiceError;
use config::Config;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use serde_with::{DurationSeconds, serde_as};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};
use strum::{Display, EnumString};
use url::Url;

/// Default configuration file.
pub const DEF_CONFIG_FILE: &str = "configuration.yaml";

/// Default Neo Smart Blinds cloud API address.
pub const DEF_CLOUD_URL: &str = "https://api.neosmartblinds.com";

const ENV_USER_CFG_FILENAME: &str = "NEO_USER_CFG_FILENAME";
const DEV_USER_CFG_FILENAME: &str = "neo-blinds.json";

/// Environment variable for the user configuration directory.
///
/// The config flow stores the entered credentials in this directory.
const ENV_CONFIG_HOME: &str = "NEO_CONFIG_HOME";

const MIN_POLL_INTERVAL: Duration = Duration::from_secs(10);
const MIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Default, Deserialize, Serialize)]
pub struct Settings {
    pub integration: IntegrationSettings,
    pub cloud: CloudSettings,
}

#[derive(Deserialize, Serialize)]
pub struct IntegrationSettings {
    pub interface: String,
    pub http: WebServerSettings,
}

impl Default for IntegrationSettings {
    fn default() -> Self {
        Self {
            interface: "127.0.0.1".to_string(),
            http: WebServerSettings {
                enabled: true,
                port: 8090,
            },
        }
    }
}

#[derive(Deserialize, Serialize)]
pub struct WebServerSettings {
    pub enabled: bool,
    pub port: u16,
}

/// Debug logging of cloud command payloads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, EnumString, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PayloadLogging {
    /// Only log the request URL.
    None,
    /// Log payloads with controller strings, blind tokens and hashes redacted.
    #[default]
    Redacted,
    /// Log complete payloads.
    ///
    /// **Attention:** this exposes the controller credentials contained in the payload!
    Full,
}

/// How the favorite positions of a blind are exposed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display, EnumString, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FavoriteMode {
    /// Dedicated button entities per favorite, each blind is its own device.
    #[default]
    Buttons,
    /// Legacy mode: tilt open / close of the cover entity recall favorite 1 / 2.
    Tilt,
}

#[serde_as]
#[derive(Clone, Deserialize, Serialize)]
pub struct CloudSettings {
    /// Cloud API base address.
    pub url: Url,
    pub username: String,
    pub password: String,
    /// Unique id of the configured account (user uuid). Set by the config flow.
    // simplifies data migration: missing value in existing configuration will be set with a default!
    #[serde(default)]
    pub entry_id: Option<String>,
    /// HTTP request timeout, including connection establishment.
    #[serde_as(as = "DurationSeconds")]
    #[serde(rename = "request_timeout_sec")]
    pub request_timeout: Duration,
    /// Cloud polling interval.
    #[serde_as(as = "DurationSeconds")]
    #[serde(rename = "poll_interval_sec")]
    pub poll_interval: Duration,
    #[serde(default)]
    pub payload_logging: PayloadLogging,
    #[serde(default)]
    pub favorites: FavoriteMode,
}

impl Default for CloudSettings {
    fn default() -> Self {
        Self {
            url: Url::parse(DEF_CLOUD_URL).expect("valid default cloud url"),
            username: "".to_string(),
            password: "".to_string(),
            entry_id: None,
            request_timeout: Duration::from_secs(15),
            poll_interval: Duration::from_secs(60),
            payload_logging: PayloadLogging::default(),
            favorites: FavoriteMode::default(),
        }
    }
}

impl CloudSettings {
    /// Checks if both username and password are configured.
    pub fn has_credentials(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.is_empty()
    }

    /// Update the account credentials.
    pub fn set_credentials(&mut self, username: impl AsRef<str>, password: impl Into<String>) {
        self.username = username.as_ref().trim().to_string();
        self.password = password.into();
    }
}

/// Load the configuration settings.
///
/// The application provides default values which can be overriden in the following order:
/// 1. Configuration settings in the read-only yaml configuration file specified in `filename`
/// 2. User provided configuration settings from the config flow
/// 3. Environment variables with prefix `NEO_` (works only for cfg keys not containing a `_`!)
///
/// If there's a configuration load error, the configuration will be reloaded without the user
/// provided configuration settings for auto-recovery with default values.
pub fn get_configuration(filename: Option<&str>) -> Result<Settings, config::ConfigError> {
    let user_config = user_settings_path();
    if !user_config.is_file() {
        info!("No user settings file found");
        return load_configuration(filename, None);
    }

    match load_configuration(filename, Some(user_config)) {
        Ok(cfg) => Ok(cfg),
        Err(e) => {
            error!("Error loading configuration, retrying without user configuration. Error: {e}");
            load_configuration(filename, None)
        }
    }
}

fn load_configuration(
    filename: Option<&str>,
    user_config: Option<PathBuf>,
) -> Result<Settings, config::ConfigError> {
    // default configuration
    let mut config = Config::builder().add_source(Config::try_from(&Settings::default())?);
    // read optional configuration file to override defaults
    if let Some(filename) = filename {
        config = config.add_source(config::File::with_name(filename));
    }

    // Overlay user provided configuration file from the config flow.
    if let Some(user_config) = user_config {
        config = config.add_source(config::File::from(user_config));
    }

    // Add in settings from the environment (with a prefix of NEO)
    // E.g. `NEO_CLOUD_USERNAME=foo@bar.com` would set the `cloud.username` key
    // This does NOT WORK for nested configurations! https://github.com/mehcode/config-rs/issues/312
    let config = config
        .add_source(config::Environment::with_prefix("NEO").separator("_"))
        .build()?;

    let settings: Settings = config.try_deserialize()?;

    check_cfg_values(settings)
}

fn check_cfg_values(mut settings: Settings) -> Result<Settings, config::ConfigError> {
    if settings.cloud.poll_interval < MIN_POLL_INTERVAL {
        warn!(
            "Poll interval too short ({:?}), using {MIN_POLL_INTERVAL:?}.",
            settings.cloud.poll_interval
        );
        settings.cloud.poll_interval = MIN_POLL_INTERVAL;
    }

    if settings.cloud.request_timeout < MIN_REQUEST_TIMEOUT {
        warn!("Invalid request timeout, using default.");
        settings.cloud.request_timeout = CloudSettings::default().request_timeout;
    }

    match settings.cloud.url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(config::ConfigError::Message(format!(
                "invalid scheme in cloud.url: {scheme}. Valid: [http, https]"
            )));
        }
    }

    Ok(settings)
}

/// Wrapper to add the `cloud` root property to make it compatible with the main configuration file.
#[derive(Deserialize, Serialize)]
struct UserSettingsWrapper {
    cloud: CloudSettings,
}

/// Store user configuration from the config flow.
pub fn save_user_settings(path: &Path, cfg: &CloudSettings) -> Result<(), ServiceError> {
    let cfg = UserSettingsWrapper { cloud: cfg.clone() };
    fs::write(path, serde_json::to_string_pretty(&cfg)?).map_err(|e| {
        let msg = format!("Error saving user configuration: {e}");
        error!("{msg}");
        ServiceError::InternalServerError(msg)
    })?;
    Ok(())
}

/// Remove the stored user configuration when the integration is removed.
pub fn remove_user_settings(path: &Path) -> Result<(), ServiceError> {
    if path.is_file() {
        fs::remove_file(path).map_err(|e| {
            let msg = format!("Error removing user configuration: {e}");
            error!("{msg}");
            ServiceError::InternalServerError(msg)
        })?;
    }
    Ok(())
}

/// Get user configuration file path.
///
/// This configuration file is updatable with [`save_user_settings`] from the config flow.
///
/// The configuration file is located in the configuration directory specified in the env variable
/// `NEO_CONFIG_HOME`. If not set, the current directory is used.
pub fn user_settings_path() -> PathBuf {
    let file = env::var(ENV_USER_CFG_FILENAME).unwrap_or(DEV_USER_CFG_FILENAME.into());
    Path::new(&env::var(ENV_CONFIG_HOME).unwrap_or_default()).join(file)
}
