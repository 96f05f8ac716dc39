//! Room tokens and the collaborative page's URL contract
//! (`?room=<token>&language=<lang>`).

use chrono::Utc;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub const ROOM_PARAM: &str = "room";
pub const LANGUAGE_PARAM: &str = "language";

/// Shared identifier of one collaborative editing session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomToken(String);

impl RoomToken {
    /// Mint a fresh token: a millisecond timestamp plus 122 random bits.
    pub fn mint() -> Self {
        Self(format!(
            "room-{}-{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        ))
    }

    /// Adopt a token from a URL exactly as given, so the active room always
    /// matches the URL parameter. Blank values are not tokens.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Editor language offered on the collaborative page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorLanguage {
    #[default]
    TypeScript,
    JavaScript,
    Python,
    Java,
    Kotlin,
}

impl EditorLanguage {
    pub const ALL: [EditorLanguage; 5] = [
        EditorLanguage::TypeScript,
        EditorLanguage::JavaScript,
        EditorLanguage::Python,
        EditorLanguage::Java,
        EditorLanguage::Kotlin,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            EditorLanguage::TypeScript => "typescript",
            EditorLanguage::JavaScript => "javascript",
            EditorLanguage::Python => "python",
            EditorLanguage::Java => "java",
            EditorLanguage::Kotlin => "kotlin",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|l| l.tag().eq_ignore_ascii_case(tag.trim()))
    }
}

impl fmt::Display for EditorLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// What the collaborative page resolves from its entry URL.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEntry {
    pub room: RoomToken,
    pub language: EditorLanguage,
    /// Set only when a token had to be minted: the same URL with `room`
    /// added, to be applied in place (no navigation). `None` when the URL
    /// already carried a token, so the rewrite never repeats.
    pub rewritten_url: Option<Url>,
}

impl SessionEntry {
    pub fn from_url(url: &Url) -> Self {
        let room = query_value(url, ROOM_PARAM).and_then(|v| RoomToken::parse(&v));
        let language = query_value(url, LANGUAGE_PARAM)
            .and_then(|v| EditorLanguage::from_tag(&v))
            .unwrap_or_default();

        match room {
            Some(room) => Self {
                room,
                language,
                rewritten_url: None,
            },
            None => {
                let room = RoomToken::mint();
                let rewritten = with_room(url, &room);
                Self {
                    room,
                    language,
                    rewritten_url: Some(rewritten),
                }
            }
        }
    }
}

fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v.into_owned())
}

/// `url` with its `room` parameter set to `room`, keeping every other
/// parameter in order.
pub fn with_room(url: &Url, room: &RoomToken) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| *k != ROOM_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut rewritten = url.clone();
    {
        let mut pairs = rewritten.query_pairs_mut();
        pairs.clear();
        for (k, v) in &kept {
            pairs.append_pair(k, v);
        }
        pairs.append_pair(ROOM_PARAM, room.as_str());
    }
    rewritten
}

/// Absolute link that joins `room`: the page URL with only the room and
/// language parameters.
pub fn share_link(page: &Url, room: &RoomToken, language: EditorLanguage) -> Url {
    let mut link = page.clone();
    link.set_fragment(None);
    link.query_pairs_mut()
        .clear()
        .append_pair(ROOM_PARAM, room.as_str())
        .append_pair(LANGUAGE_PARAM, language.tag());
    link
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    // ==================== RoomToken Tests ====================

    #[test]
    fn test_minted_tokens_are_unique_and_prefixed() {
        let a = RoomToken::mint();
        let b = RoomToken::mint();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("room-"));
        assert_eq!(a.as_str().split('-').count(), 3);
    }

    #[test]
    fn test_parse_rejects_blank() {
        assert!(RoomToken::parse("").is_none());
        assert!(RoomToken::parse("   ").is_none());
        assert_eq!(RoomToken::parse("abc123").unwrap().as_str(), "abc123");
    }

    #[test]
    fn test_padded_room_param_is_adopted_verbatim() {
        let entry = SessionEntry::from_url(&url("https://example.com/en/collab?room=%20abc123"));
        assert_eq!(entry.room.as_str(), " abc123");
        assert!(entry.rewritten_url.is_none());
        assert_eq!(
            query_value(&share_link(&url("https://example.com/en/collab"), &entry.room, entry.language), ROOM_PARAM)
                .as_deref(),
            Some(" abc123")
        );
    }

    // ==================== EditorLanguage Tests ====================

    #[test]
    fn test_language_tags() {
        assert_eq!(EditorLanguage::default(), EditorLanguage::TypeScript);
        assert_eq!(EditorLanguage::from_tag("Python"), Some(EditorLanguage::Python));
        assert_eq!(EditorLanguage::from_tag("cobol"), None);
        for language in EditorLanguage::ALL {
            assert_eq!(EditorLanguage::from_tag(language.tag()), Some(language));
        }
    }

    // ==================== SessionEntry Tests ====================

    #[test]
    fn test_existing_room_is_adopted_unchanged() {
        let entry = SessionEntry::from_url(&url(
            "https://example.com/es/developer-section/collaborative?room=abc123",
        ));
        assert_eq!(entry.room.as_str(), "abc123");
        assert!(entry.rewritten_url.is_none());
    }

    #[test]
    fn test_missing_room_mints_and_rewrites() {
        let entry = SessionEntry::from_url(&url(
            "https://example.com/es/developer-section/collaborative?language=python&ref=nav",
        ));
        let rewritten = entry.rewritten_url.expect("URL should be rewritten");

        assert_eq!(entry.language, EditorLanguage::Python);
        assert_eq!(rewritten.path(), "/es/developer-section/collaborative");
        assert_eq!(query_value(&rewritten, "language").as_deref(), Some("python"));
        assert_eq!(query_value(&rewritten, "ref").as_deref(), Some("nav"));
        assert_eq!(
            query_value(&rewritten, ROOM_PARAM).as_deref(),
            Some(entry.room.as_str())
        );
    }

    #[test]
    fn test_rewritten_url_does_not_rewrite_again() {
        let first = SessionEntry::from_url(&url("https://example.com/en/collab"));
        let rewritten = first.rewritten_url.clone().unwrap();
        let second = SessionEntry::from_url(&rewritten);
        assert!(second.rewritten_url.is_none());
        assert_eq!(second.room, first.room);
    }

    #[test]
    fn test_blank_room_is_treated_as_missing() {
        let entry = SessionEntry::from_url(&url("https://example.com/en/collab?room="));
        let rewritten = entry.rewritten_url.unwrap();
        let rooms: Vec<_> = rewritten
            .query_pairs()
            .filter(|(k, _)| *k == ROOM_PARAM)
            .collect();
        assert_eq!(rooms.len(), 1);
        assert!(!rooms[0].1.is_empty());
    }

    #[test]
    fn test_unknown_language_defaults() {
        let entry = SessionEntry::from_url(&url("https://example.com/en/collab?room=r&language=cobol"));
        assert_eq!(entry.language, EditorLanguage::TypeScript);
    }

    // ==================== share_link Tests ====================

    #[test]
    fn test_share_link_contains_room_and_language() {
        let page = url("https://example.com/en/collab?room=old&debug=1#editor");
        let room = RoomToken::parse("abc123").unwrap();
        let link = share_link(&page, &room, EditorLanguage::Kotlin);
        assert_eq!(
            link.as_str(),
            "https://example.com/en/collab?room=abc123&language=kotlin"
        );
    }
}
