//! Locale-bound link building for page handlers.
//!
//! Every internal link goes through [`LocalizedNav::create_localized_path`]
//! instead of being built by hand, which keeps navigation inside the locale
//! the visitor is browsing.

use crate::i18n::Locale;
use crate::routing::LocaleResolver;
use crate::server::AppState;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// The resolver bound to the path of the current request.
#[derive(Debug, Clone)]
pub struct LocalizedNav {
    resolver: LocaleResolver,
    locale: Locale,
    current_path: String,
}

/// A link to the current page in another locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alternate {
    pub locale: Locale,
    pub native_name: String,
    pub href: String,
}

impl LocalizedNav {
    pub fn new(resolver: &LocaleResolver, current_path: &str) -> Self {
        Self {
            resolver: resolver.clone(),
            locale: resolver.locale_from_path(current_path),
            current_path: current_path.to_string(),
        }
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    /// Qualify an internal path with the current locale. Anchors pass
    /// through, and any locale already on `path` is replaced.
    pub fn create_localized_path(&self, path: &str) -> String {
        if path.starts_with('#') {
            return path.to_string();
        }
        let bare = self.resolver.strip_locale(path);
        self.resolver.qualify(&bare, &self.locale)
    }

    /// The current page in `locale`, for the language switcher.
    pub fn alternate(&self, locale: &Locale) -> String {
        self.resolver.qualify(&self.current_path, locale)
    }

    /// The current page in every configured locale.
    pub fn alternates(&self) -> Vec<Alternate> {
        self.resolver
            .registry()
            .configs()
            .iter()
            .filter_map(|config| {
                let locale = self.resolver.validate_segment(&config.code)?;
                Some(Alternate {
                    href: self.alternate(&locale),
                    native_name: config.native_name.clone(),
                    locale,
                })
            })
            .collect()
    }
}

/// Extractor for page routes: the URL's locale segment must be configured,
/// otherwise the page is not found.
#[derive(Debug, Clone)]
pub struct PageLocale(pub LocalizedNav);

#[derive(Serialize)]
struct NotFoundBody {
    message: String,
}

#[async_trait]
impl FromRequestParts<AppState> for PageLocale {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let path = parts.uri.path();
        let segment = path
            .trim_start_matches('/')
            .split('/')
            .next()
            .unwrap_or("");

        match state.resolver.validate_segment(segment) {
            Some(_) => {
                let current = match parts.uri.query() {
                    Some(q) => format!("{}?{}", path, q),
                    None => path.to_string(),
                };
                Ok(PageLocale(LocalizedNav::new(&state.resolver, &current)))
            }
            None => {
                let locale = state.resolver.default_locale();
                let message = state
                    .catalog
                    .text(&locale, crate::i18n::MessageKey::NotFound)
                    .to_string();
                Err((StatusCode::NOT_FOUND, Json(NotFoundBody { message })).into_response())
            }
        }
    }
}
