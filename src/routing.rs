//! Locale-aware path resolution.
//!
//! Every routable path carries its locale as the first segment
//! (`/es/pricing`, `/en`). The functions here translate between raw and
//! locale-qualified paths. They run on every link render, so all of them are
//! total: unknown or malformed input degrades to the default locale or to the
//! unchanged path instead of failing.

use crate::i18n::{Locale, LocaleRegistry};
use std::sync::Arc;

/// Pure translation between raw and locale-qualified paths.
#[derive(Debug, Clone)]
pub struct LocaleResolver {
    registry: Arc<LocaleRegistry>,
}

impl LocaleResolver {
    pub fn new(registry: Arc<LocaleRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &LocaleRegistry {
        &self.registry
    }

    pub fn default_locale(&self) -> Locale {
        self.registry.default_locale()
    }

    /// Locale named by the first path segment, or the default locale.
    pub fn locale_from_path(&self, path: &str) -> Locale {
        self.leading_locale(path)
            .map(|(locale, _)| locale)
            .unwrap_or_else(|| self.registry.default_locale())
    }

    /// True iff the first segment exactly equals a configured locale.
    ///
    /// `/english-page` does not carry locale `en`.
    pub fn has_locale(&self, path: &str) -> bool {
        self.leading_locale(path).is_some()
    }

    /// Remove a leading locale segment. `/<locale>` maps to `/`; paths without
    /// a locale segment are returned unchanged.
    pub fn strip_locale(&self, path: &str) -> String {
        match self.leading_locale(path) {
            Some((_, rest)) if rest.is_empty() => "/".to_string(),
            Some((_, rest)) if rest.starts_with('?') || rest.starts_with('#') => {
                format!("/{}", rest)
            }
            Some((_, rest)) => rest.to_string(),
            None => path.to_string(),
        }
    }

    /// Produce `path` with exactly `locale` as its leading segment.
    ///
    /// An existing locale segment is replaced, never stacked. The root maps to
    /// `/<locale>` without a trailing slash. Same-page anchors (`#section`)
    /// are not routes and come back unchanged.
    pub fn qualify(&self, path: &str, locale: &Locale) -> String {
        if path.starts_with('#') {
            return path.to_string();
        }

        let normalized = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };

        let unqualified = self.strip_locale(&normalized);

        if unqualified == "/" {
            format!("/{}", locale)
        } else if unqualified.starts_with("/?") || unqualified.starts_with("/#") {
            format!("/{}{}", locale, &unqualified[1..])
        } else {
            format!("/{}{}", locale, unqualified)
        }
    }

    /// Page-level validation of a `[locale]` route segment. `None` means the
    /// page should render as not found.
    pub fn validate_segment(&self, segment: &str) -> Option<Locale> {
        self.registry.get(segment)
    }

    /// Split off a leading locale segment, returning it and the remainder
    /// (which starts with `/`, `?`, `#`, or is empty).
    fn leading_locale<'a>(&self, path: &'a str) -> Option<(Locale, &'a str)> {
        let (segment, rest) = first_segment(path)?;
        self.registry.get(segment).map(|locale| (locale, rest))
    }
}

/// First segment of an absolute path and everything after it.
fn first_segment(path: &str) -> Option<(&str, &str)> {
    let body = path.strip_prefix('/')?;
    let end = body.find(['/', '?', '#']).unwrap_or(body.len());
    Some((&body[..end], &body[end..]))
}
