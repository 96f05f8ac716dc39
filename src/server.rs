//! HTTP surface: shared state, router, and the page-shell handlers.

use crate::config::Config;
use crate::execute::{execute_code, ExecuteClient};
use crate::i18n::{Catalog, Locale, MessageKey};
use crate::middleware::{locale_gate, ExclusionRules};
use crate::navigation::{Alternate, PageLocale};
use crate::routing::LocaleResolver;
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Header navigation targets, before localization.
pub const NAV_LINKS: &[&str] = &[
    "/",
    "#servicios",
    "#faq",
    "#contacto",
    "/asesorias",
    "/agentes",
    "/developer-section/collaborative",
];

/// State shared by every handler. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    pub resolver: LocaleResolver,
    pub catalog: Arc<Catalog>,
    pub executor: ExecuteClient,
    pub rules: ExclusionRules,
    pub public_base_url: String,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self> {
        let registry = Arc::new(config.locale_registry()?);

        let mut catalog = Catalog::builtin();
        catalog
            .validate(&registry)
            .context("Message catalog does not cover the configured locales")?;

        info!(
            "Locales: {} (default: {})",
            config.locales.join(", "),
            registry.default_locale()
        );

        Ok(Self {
            resolver: LocaleResolver::new(registry),
            catalog: Arc::new(catalog),
            executor: ExecuteClient::from_config(config),
            rules: ExclusionRules::default(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/execute-code", post(execute_code))
        .route("/api/health", get(health))
        .route("/:locale", get(page_shell))
        .route("/:locale/*rest", get(page_shell))
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), locale_gate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct NavLink {
    pub target: &'static str,
    pub href: String,
}

/// Everything a page template needs besides its own content.
#[derive(Debug, Serialize)]
pub struct PageContext {
    pub locale: Locale,
    pub path: String,
    pub canonical: String,
    pub alternates: Vec<Alternate>,
    pub nav: Vec<NavLink>,
    pub messages: BTreeMap<MessageKey, String>,
}

async fn page_shell(State(state): State<AppState>, PageLocale(nav): PageLocale) -> Json<PageContext> {
    let locale = nav.locale().clone();

    let links = NAV_LINKS
        .iter()
        .map(|&target| NavLink {
            target,
            href: nav.create_localized_path(target),
        })
        .collect();

    let messages = state
        .catalog
        .bundle(&locale)
        .into_iter()
        .map(|(key, text)| (key, text.to_string()))
        .collect();

    Json(PageContext {
        canonical: format!("{}{}", state.public_base_url, nav.current_path()),
        path: nav.current_path().to_string(),
        alternates: nav.alternates(),
        nav: links,
        messages,
        locale,
    })
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn not_found(State(state): State<AppState>) -> impl IntoResponse {
    let locale = state.resolver.default_locale();
    let message = state.catalog.text(&locale, MessageKey::NotFound).to_string();
    (StatusCode::NOT_FOUND, Json(serde_json::json!({ "message": message })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_state_from_default_config() {
        for var in ["LOCALES", "DEFAULT_LOCALE", "PORT", "PUBLIC_BASE_URL"] {
            std::env::remove_var(var);
        }
        let config = Config::from_env().unwrap();
        let state = AppState::from_config(&config).unwrap();
        assert_eq!(state.resolver.default_locale().code(), "es");
        assert_eq!(state.public_base_url, "http://localhost:3000");
    }

    #[test]
    #[serial]
    fn test_state_rejects_untranslated_locale() {
        std::env::set_var("LOCALES", "es,en,pt");
        std::env::remove_var("DEFAULT_LOCALE");
        let config = Config::from_env().unwrap();
        let err = AppState::from_config(&config).unwrap_err();
        assert!(format!("{:#}", err).contains("pt"));
        std::env::remove_var("LOCALES");
    }
}
