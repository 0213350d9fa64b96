use serde::Deserialize;
use std::net::SocketAddr;

use crate::application::aqi_engine::DEFAULT_STALENESS_TOLERANCE_SECS;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub sensor: SensorSettings,
    #[serde(default)]
    pub sources: SourceSettings,
    #[serde(default)]
    pub firebase: Option<FirebaseSettings>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SensorSettings {
    #[serde(default = "default_staleness_tolerance")]
    pub staleness_tolerance_secs: i64,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            staleness_tolerance_secs: default_staleness_tolerance(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Static,
    Firebase,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceSettings {
    #[serde(default)]
    pub kind: SourceKind,
    #[serde(default = "default_static_path")]
    pub static_path: String,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            static_path: default_static_path(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FirebaseSettings {
    pub project_id: String,
    pub database_url: String,
    /// Web API key, sent to Firestore as `key`
    #[serde(default)]
    pub api_key: Option<String>,
    /// ID token or legacy database secret, sent to the realtime database as
    /// `auth`. Omit when the device node is publicly readable.
    #[serde(default)]
    pub database_secret: Option<String>,
    #[serde(default = "default_reading_path")]
    pub reading_path: String,
    #[serde(default = "default_firestore_url")]
    pub firestore_url: String,
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_staleness_tolerance() -> i64 {
    DEFAULT_STALENESS_TOLERANCE_SECS
}

fn default_static_path() -> String {
    "config/reference.toml".to_string()
}

fn default_reading_path() -> String {
    "AirQuality".to_string()
}

fn default_firestore_url() -> String {
    "https://firestore.googleapis.com/v1".to_string()
}

/// Load `config/naqa.{toml,...}` if present, overridden by `NAQA__*`
/// environment variables (e.g. `NAQA__SOURCES__KIND=firebase`).
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/naqa").required(false))
        .add_source(config::Environment::with_prefix("NAQA").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

pub fn parse_app_config(toml: &str) -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_config() {
        let config = parse_app_config("").unwrap();
        assert_eq!(config.server.bind_addr.port(), 8080);
        assert_eq!(config.sensor.staleness_tolerance_secs, 90);
        assert_eq!(config.sources.kind, SourceKind::Static);
        assert_eq!(config.sources.static_path, "config/reference.toml");
        assert!(config.firebase.is_none());
    }

    #[test]
    fn test_firebase_settings() {
        let config = parse_app_config(
            r#"
            [server]
            bind_addr = "127.0.0.1:3000"

            [sources]
            kind = "firebase"

            [firebase]
            project_id = "naqa-demo"
            database_url = "https://naqa-demo.firebaseio.com/"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind_addr.port(), 3000);
        assert_eq!(config.sources.kind, SourceKind::Firebase);
        let firebase = config.firebase.unwrap();
        assert_eq!(firebase.project_id, "naqa-demo");
        assert_eq!(firebase.reading_path, "AirQuality");
        assert!(firebase.api_key.is_none());
        assert!(firebase.database_secret.is_none());
    }

    #[test]
    fn test_firebase_credentials_are_separate() {
        let config = parse_app_config(
            r#"
            [firebase]
            project_id = "naqa-demo"
            database_url = "https://naqa-demo.firebaseio.com"
            api_key = "AIza-demo"
            database_secret = "legacy-secret"
            "#,
        )
        .unwrap();

        let firebase = config.firebase.unwrap();
        assert_eq!(firebase.api_key.as_deref(), Some("AIza-demo"));
        assert_eq!(firebase.database_secret.as_deref(), Some("legacy-secret"));
    }
}
