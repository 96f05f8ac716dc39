use crate::collab::SessionTiming;
use crate::i18n::LocaleRegistry;
use anyhow::{Context, Result};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // Environment
    pub environment: String,
    pub port: u16,
    pub public_base_url: String,

    // Locales
    pub locales: Vec<String>,
    pub default_locale: String,

    // Code execution proxy
    pub piston_api_url: String,
    pub piston_api_key: Option<String>,

    // Collaborative editor
    pub presence_heartbeat_secs: u64,
    pub presence_stale_secs: u64,
    pub push_debounce_ms: u64,
}

pub const DEFAULT_PISTON_URL: &str = "https://emkc.org/api/v2/piston/execute";

impl Config {
    pub fn from_env() -> Result<Self> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let locales: Vec<String> = std::env::var("LOCALES")
            .unwrap_or_else(|_| "es,en".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let default_locale = std::env::var("DEFAULT_LOCALE")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| locales.first().cloned())
            .context("LOCALES is empty and DEFAULT_LOCALE not set")?;

        Ok(Self {
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            port,
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}", port)),

            locales,
            default_locale,

            piston_api_url: std::env::var("PISTON_API_URL")
                .unwrap_or_else(|_| DEFAULT_PISTON_URL.to_string()),
            piston_api_key: std::env::var("PISTON_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),

            presence_heartbeat_secs: std::env::var("COLLAB_PRESENCE_HEARTBEAT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            presence_stale_secs: std::env::var("COLLAB_PRESENCE_STALE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(120),
            push_debounce_ms: std::env::var("COLLAB_PUSH_DEBOUNCE_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
        })
    }

    /// Build the locale registry this configuration describes.
    pub fn locale_registry(&self) -> Result<LocaleRegistry> {
        let codes: Vec<&str> = self.locales.iter().map(String::as_str).collect();
        LocaleRegistry::from_codes(&codes, &self.default_locale)
            .with_context(|| format!("Invalid locale configuration: LOCALES={:?}", self.locales))
    }

    pub fn session_timing(&self) -> SessionTiming {
        SessionTiming {
            presence_heartbeat: Duration::from_secs(self.presence_heartbeat_secs),
            presence_stale_after: Duration::from_secs(self.presence_stale_secs),
            push_debounce: Duration::from_millis(self.push_debounce_ms),
            ..SessionTiming::default()
        }
    }
}
