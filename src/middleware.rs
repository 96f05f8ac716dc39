use crate::routing::LocaleResolver;
use crate::server::AppState;
use axum::{
    extract::{Request, State},
    http::{header::LOCATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

/// Paths that are served without a locale prefix.
///
/// Static files are recognized by an explicit extension list rather than by
/// the mere presence of a dot, so route segments like `/v1.2-notes` still get
/// localized.
#[derive(Debug, Clone)]
pub struct ExclusionRules {
    pub prefixes: Vec<String>,
    pub exact: Vec<String>,
    pub extensions: Vec<String>,
}

impl Default for ExclusionRules {
    fn default() -> Self {
        Self {
            prefixes: ["/api/", "/_next/", "/static/", "/assets/"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            exact: ["/api", "/favicon.ico", "/robots.txt", "/sitemap.xml"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            extensions: [
                "png", "jpg", "jpeg", "gif", "svg", "webp", "ico", "css", "js", "map", "txt",
                "xml", "json", "woff", "woff2", "ttf", "webmanifest", "pdf",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl ExclusionRules {
    pub fn is_excluded(&self, path: &str) -> bool {
        if self.exact.iter().any(|p| p == path) {
            return true;
        }
        if self.prefixes.iter().any(|p| path.starts_with(p.as_str())) {
            return true;
        }
        self.has_static_extension(path)
    }

    fn has_static_extension(&self, path: &str) -> bool {
        let last = path.rsplit('/').next().unwrap_or("");
        match last.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => self
                .extensions
                .iter()
                .any(|e| e.eq_ignore_ascii_case(ext)),
            _ => false,
        }
    }
}

/// What the gate does with a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    PassThrough,
    Redirect(String),
}

/// Decide whether a request needs a locale prefix.
///
/// `query` is the raw query string without the leading `?`; it is carried
/// over to the redirect target.
pub fn decide(
    resolver: &LocaleResolver,
    rules: &ExclusionRules,
    path: &str,
    query: Option<&str>,
) -> GateDecision {
    if rules.is_excluded(path) {
        return GateDecision::PassThrough;
    }

    if resolver.has_locale(path) {
        // "/en/" has no page route; its canonical form is "/en"
        if path.len() > 1 && path.ends_with('/') && resolver.strip_locale(path) == "/" {
            return GateDecision::Redirect(with_query(path.trim_end_matches('/').to_string(), query));
        }
        return GateDecision::PassThrough;
    }

    let target = resolver.qualify(path, &resolver.default_locale());
    GateDecision::Redirect(with_query(target, query))
}

fn with_query(mut target: String, query: Option<&str>) -> String {
    if let Some(q) = query.filter(|q| !q.is_empty()) {
        target.push('?');
        target.push_str(q);
    }
    target
}

/// Locale-gating middleware.
///
/// Runs ahead of every route: requests without a locale segment (and not
/// excluded) are redirected to the default-locale version of the same path,
/// so page handlers can assume a locale is always present.
pub async fn locale_gate(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let uri = request.uri().clone();
    let decision = decide(&state.resolver, &state.rules, uri.path(), uri.query());

    match decision {
        GateDecision::PassThrough => next.run(request).await,
        GateDecision::Redirect(target) => {
            debug!("Redirecting {} -> {}", uri.path(), target);
            (StatusCode::TEMPORARY_REDIRECT, [(LOCATION, target)]).into_response()
        }
    }
}
