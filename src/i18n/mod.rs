//! Internationalization (i18n) module for locale-aware routing and content.
//!
//! # Architecture
//!
//! - `registry`: The configured locale set, built once at startup
//! - `locale`: Validated `Locale` tag handed out by the registry
//! - `messages`: Typed message keys and per-locale string tables
//!
//! # Example
//!
//! ```rust,ignore
//! use agency_site::i18n::{Catalog, LocaleRegistry, MessageKey};
//!
//! let registry = LocaleRegistry::from_codes(&["es", "en"], "es")?;
//! let mut catalog = Catalog::builtin();
//! catalog.validate(&registry)?;
//!
//! let english = registry.get("en").unwrap();
//! let label = catalog.text(&english, MessageKey::CtaStart);
//! ```

mod locale;
mod messages;
mod registry;

pub use locale::Locale;
pub use messages::{Catalog, MessageKey, MissingEntry, MissingTranslations};
pub use registry::{LocaleConfig, LocaleRegistry, RegistryError};
