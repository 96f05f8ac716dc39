//! Locale registry: the closed set of locales the site is served in.
//!
//! The registry is built once at startup from configuration and handed to
//! every component that needs it (resolver, middleware, message catalog).
//! There is no global instance; callers share it behind an `Arc`.

use crate::i18n::Locale;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// Configuration for a supported locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleConfig {
    /// Path segment used for this locale (e.g., "es", "en", "pt-br")
    pub code: String,

    /// English name of the language (e.g., "Spanish")
    pub name: String,

    /// Native name of the language (e.g., "Español")
    pub native_name: String,

    /// Whether unqualified requests are redirected to this locale (exactly one)
    pub is_default: bool,
}

impl LocaleConfig {
    pub fn new(code: &str, name: &str, native_name: &str, is_default: bool) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            native_name: native_name.to_string(),
            is_default,
        }
    }
}

/// Errors raised while building a registry from configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("at least one locale must be configured")]
    Empty,

    #[error("locale '{0}' is configured more than once")]
    Duplicate(String),

    #[error("'{0}' is not a valid locale path segment")]
    InvalidCode(String),

    #[error("no default locale configured")]
    NoDefault,

    #[error("multiple default locales configured: {0:?}")]
    MultipleDefaults(Vec<String>),

    #[error("default locale '{0}' is not in the configured set")]
    UnknownDefault(String),
}

/// Immutable set of supported locales with exactly one default.
#[derive(Debug, Clone)]
pub struct LocaleRegistry {
    locales: Vec<LocaleConfig>,
    default_index: usize,
}

static CODE_REGEX: OnceLock<Regex> = OnceLock::new();

fn code_regex() -> &'static Regex {
    CODE_REGEX.get_or_init(|| {
        Regex::new(r"^[A-Za-z]{2,3}(-[A-Za-z0-9]{2,8})*$").expect("locale code regex is valid")
    })
}

impl LocaleRegistry {
    /// Build a registry, validating codes and the single-default invariant.
    pub fn new(locales: Vec<LocaleConfig>) -> Result<Self, RegistryError> {
        if locales.is_empty() {
            return Err(RegistryError::Empty);
        }

        for (i, config) in locales.iter().enumerate() {
            if !code_regex().is_match(&config.code) {
                return Err(RegistryError::InvalidCode(config.code.clone()));
            }
            if locales[..i].iter().any(|other| other.code == config.code) {
                return Err(RegistryError::Duplicate(config.code.clone()));
            }
        }

        let defaults: Vec<usize> = locales
            .iter()
            .enumerate()
            .filter(|(_, l)| l.is_default)
            .map(|(i, _)| i)
            .collect();

        let default_index = match defaults.as_slice() {
            [] => return Err(RegistryError::NoDefault),
            [only] => *only,
            many => {
                return Err(RegistryError::MultipleDefaults(
                    many.iter().map(|&i| locales[i].code.clone()).collect(),
                ))
            }
        };

        Ok(Self {
            locales,
            default_index,
        })
    }

    /// Build a registry from bare codes, marking `default` as the default.
    ///
    /// Display names are looked up for the languages the site ships with and
    /// fall back to the code itself for anything else.
    pub fn from_codes(codes: &[&str], default: &str) -> Result<Self, RegistryError> {
        if !codes.contains(&default) {
            return Err(RegistryError::UnknownDefault(default.to_string()));
        }

        let locales = codes
            .iter()
            .map(|code| {
                let (name, native) = known_names(code).unwrap_or((code, code));
                LocaleConfig::new(code, name, native, *code == default)
            })
            .collect();

        Self::new(locales)
    }

    /// The Spanish-first bilingual setup the site ships with.
    pub fn bilingual() -> Self {
        Self {
            locales: vec![
                LocaleConfig::new("es", "Spanish", "Español", true),
                LocaleConfig::new("en", "English", "English", false),
            ],
            default_index: 0,
        }
    }

    /// Get a locale configuration by its code (exact match).
    pub fn get_by_code(&self, code: &str) -> Option<&LocaleConfig> {
        self.locales.iter().find(|l| l.code == code)
    }

    /// Get the validated `Locale` for a code, if configured.
    pub fn get(&self, code: &str) -> Option<Locale> {
        self.get_by_code(code).map(|c| Locale::new(&c.code))
    }

    /// Check if a code is one of the configured locales.
    pub fn contains(&self, code: &str) -> bool {
        self.get_by_code(code).is_some()
    }

    pub fn default_config(&self) -> &LocaleConfig {
        &self.locales[self.default_index]
    }

    pub fn default_locale(&self) -> Locale {
        Locale::new(&self.default_config().code)
    }

    /// All configured locales, in configuration order.
    pub fn locales(&self) -> Vec<Locale> {
        self.locales.iter().map(|c| Locale::new(&c.code)).collect()
    }

    pub fn configs(&self) -> &[LocaleConfig] {
        &self.locales
    }
}

fn known_names(code: &str) -> Option<(&'static str, &'static str)> {
    match code {
        "es" => Some(("Spanish", "Español")),
        "en" => Some(("English", "English")),
        "pt" => Some(("Portuguese", "Português")),
        "fr" => Some(("French", "Français")),
        "de" => Some(("German", "Deutsch")),
        _ => None,
    }
}
