//! Locale type: a validated locale tag.
//!
//! A `Locale` can only be obtained from a [`LocaleRegistry`](crate::i18n::LocaleRegistry),
//! so holding one means the code is part of the configured set.

use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// A locale from the configured set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locale {
    /// Path segment for the locale (e.g., "es")
    code: Arc<str>,
}

impl Locale {
    pub(crate) fn new(code: &str) -> Self {
        Self { code: Arc::from(code) }
    }

    /// Get the locale code as used in paths.
    pub fn code(&self) -> &str {
        &self.code
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

impl Serialize for Locale {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.code)
    }
}

impl AsRef<str> for Locale {
    fn as_ref(&self) -> &str {
        &self.code
    }
}
