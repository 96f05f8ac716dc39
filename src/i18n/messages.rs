//! Localized site chrome strings.
//!
//! Every user-facing string is addressed by a [`MessageKey`]. The catalog is
//! checked against the locale registry at startup so a missing translation is
//! a boot-time error, not a silently rendered key.

use crate::i18n::{Locale, LocaleRegistry};
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::warn;

/// Keys for all localized strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MessageKey {
    HeroTitle,
    HeroSubtitle,
    CtaStart,
    CtaServices,
    ServicesTitle,
    ContactButton,
    FooterAbout,
    FooterCopyright,
    CollabRoomLabel,
    CollabShareButton,
    CollabLinkCopied,
    CollabOffline,
    NotFound,
}

impl MessageKey {
    pub const ALL: [MessageKey; 13] = [
        MessageKey::HeroTitle,
        MessageKey::HeroSubtitle,
        MessageKey::CtaStart,
        MessageKey::CtaServices,
        MessageKey::ServicesTitle,
        MessageKey::ContactButton,
        MessageKey::FooterAbout,
        MessageKey::FooterCopyright,
        MessageKey::CollabRoomLabel,
        MessageKey::CollabShareButton,
        MessageKey::CollabLinkCopied,
        MessageKey::CollabOffline,
        MessageKey::NotFound,
    ];

    /// Stable identifier, also the last-resort fallback text.
    pub fn id(&self) -> &'static str {
        match self {
            MessageKey::HeroTitle => "hero-title",
            MessageKey::HeroSubtitle => "hero-subtitle",
            MessageKey::CtaStart => "cta-start",
            MessageKey::CtaServices => "cta-services",
            MessageKey::ServicesTitle => "services-title",
            MessageKey::ContactButton => "contact-btn",
            MessageKey::FooterAbout => "footer-about",
            MessageKey::FooterCopyright => "footer-copyright",
            MessageKey::CollabRoomLabel => "collab-room-label",
            MessageKey::CollabShareButton => "collab-share-button",
            MessageKey::CollabLinkCopied => "collab-link-copied",
            MessageKey::CollabOffline => "collab-offline",
            MessageKey::NotFound => "not-found",
        }
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl Serialize for MessageKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id())
    }
}

// ==================== Spanish Strings ====================

pub const SPANISH_STRINGS: &[(MessageKey, &str)] = &[
    (MessageKey::HeroTitle, "Convierte clics en clientes en 14 días"),
    (MessageKey::HeroSubtitle, "Desarrollo web profesional para tu negocio"),
    (MessageKey::CtaStart, "Empezar mi proyecto"),
    (MessageKey::CtaServices, "Ver nuestros servicios"),
    (MessageKey::ServicesTitle, "Soluciones Digitales a tu Medida"),
    (MessageKey::ContactButton, "Solicitar Propuesta Gratuita"),
    (
        MessageKey::FooterAbout,
        "Transformamos ideas en activos digitales que venden.",
    ),
    (MessageKey::FooterCopyright, "Todos los derechos reservados."),
    (MessageKey::CollabRoomLabel, "Sala"),
    (MessageKey::CollabShareButton, "Compartir enlace"),
    (MessageKey::CollabLinkCopied, "¡Enlace copiado!"),
    (
        MessageKey::CollabOffline,
        "Sin conexión con el servidor de colaboración. Editando en local.",
    ),
    (MessageKey::NotFound, "Página no encontrada"),
];

// ==================== English Strings ====================

pub const ENGLISH_STRINGS: &[(MessageKey, &str)] = &[
    (MessageKey::HeroTitle, "Turn clicks into clients in 14 days"),
    (MessageKey::HeroSubtitle, "Professional web development for your business"),
    (MessageKey::CtaStart, "Start my project"),
    (MessageKey::CtaServices, "See our services"),
    (MessageKey::ServicesTitle, "Digital Solutions Tailored for You"),
    (MessageKey::ContactButton, "Request Free Proposal"),
    (
        MessageKey::FooterAbout,
        "We turn ideas into digital assets that sell.",
    ),
    (MessageKey::FooterCopyright, "All rights reserved."),
    (MessageKey::CollabRoomLabel, "Room"),
    (MessageKey::CollabShareButton, "Share link"),
    (MessageKey::CollabLinkCopied, "Link copied!"),
    (
        MessageKey::CollabOffline,
        "Collaboration server unreachable. Editing locally.",
    ),
    (MessageKey::NotFound, "Page not found"),
];

/// A (locale, key) pair with no translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingEntry {
    pub locale: String,
    pub key: MessageKey,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{} missing translation(s): {}", .0.len(), describe(.0))]
pub struct MissingTranslations(pub Vec<MissingEntry>);

fn describe(missing: &[MissingEntry]) -> String {
    missing
        .iter()
        .map(|m| format!("{}:{}", m.locale, m.key))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Locale code -> key -> text.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: HashMap<String, HashMap<MessageKey, &'static str>>,
    fallback: Option<String>,
}

impl Catalog {
    /// The Spanish and English tables shipped with the site.
    pub fn builtin() -> Self {
        Self::default()
            .with_table("es", SPANISH_STRINGS)
            .with_table("en", ENGLISH_STRINGS)
    }

    pub fn with_table(mut self, code: &str, entries: &[(MessageKey, &'static str)]) -> Self {
        self.tables
            .insert(code.to_string(), entries.iter().copied().collect());
        self
    }

    /// Check every configured locale has every key, and remember the
    /// registry's default locale as the first fallback.
    pub fn validate(&mut self, registry: &LocaleRegistry) -> Result<(), MissingTranslations> {
        let mut missing = Vec::new();

        for config in registry.configs() {
            let table = self.tables.get(&config.code);
            for key in MessageKey::ALL {
                if table.map_or(true, |t| !t.contains_key(&key)) {
                    missing.push(MissingEntry {
                        locale: config.code.clone(),
                        key,
                    });
                }
            }
        }

        self.fallback = Some(registry.default_config().code.clone());

        if missing.is_empty() {
            Ok(())
        } else {
            Err(MissingTranslations(missing))
        }
    }

    /// Look up `key` for `locale`, falling back to the default locale and then
    /// to the key identifier. Each fallback is logged.
    pub fn text(&self, locale: &Locale, key: MessageKey) -> &str {
        if let Some(text) = self.tables.get(locale.code()).and_then(|t| t.get(&key)) {
            return text;
        }

        if let Some(fallback) = &self.fallback {
            if let Some(text) = self.tables.get(fallback).and_then(|t| t.get(&key)) {
                warn!(
                    "Missing '{}' translation for '{}', using '{}'",
                    key, locale, fallback
                );
                return text;
            }
        }

        warn!("Missing '{}' translation for '{}', rendering key", key, locale);
        key.id()
    }

    /// All keys resolved for one locale, for handing to a page template.
    pub fn bundle(&self, locale: &Locale) -> Vec<(MessageKey, &str)> {
        MessageKey::ALL
            .iter()
            .map(|&key| (key, self.text(locale, key)))
            .collect()
    }
}
