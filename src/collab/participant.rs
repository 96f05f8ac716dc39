use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// `len` random base-36 characters.
pub(crate) fn random_base36(len: usize) -> String {
    let mut n = Uuid::new_v4().as_u128();
    (0..len)
        .map(|_| {
            let c = BASE36[(n % 36) as usize] as char;
            n /= 36;
            c
        })
        .collect()
}

/// A random, readable color for a participant's cursor and avatar.
pub fn random_color() -> String {
    let hue = (Uuid::new_v4().as_u128() % 360) as u16;
    format!("hsl({}, 70%, 50%)", hue)
}

/// One editor tab in a room. Not authenticated and not globally unique by
/// name; the id is unique per tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub color: String,
}

impl Participant {
    pub fn new(name: &str) -> Self {
        Self {
            id: format!("user-{}-{}", Utc::now().timestamp_millis(), random_base36(9)),
            name: name.to_string(),
            color: random_color(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub line: u32,
    pub column: u32,
}

/// Presence document written per participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceRecord {
    pub participant_id: String,
    pub name: Option<String>,
    pub color: Option<String>,
    pub cursor: Option<Cursor>,
    pub last_seen_ms: i64,
}

impl PresenceRecord {
    pub fn for_participant(participant: &Participant, cursor: Option<Cursor>, now_ms: i64) -> Self {
        Self {
            participant_id: participant.id.clone(),
            name: Some(participant.name.clone()),
            color: Some(participant.color.clone()),
            cursor,
            last_seen_ms: now_ms,
        }
    }
}

/// Another participant as shown in the editor's presence bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Peer {
    pub id: String,
    pub name: String,
    pub color: String,
    pub cursor: Option<Cursor>,
}

/// Everyone but `self_id` who has been seen within `stale_after`, sorted by id.
pub fn active_peers(
    records: &[PresenceRecord],
    self_id: &str,
    now_ms: i64,
    stale_after: Duration,
) -> Vec<Peer> {
    let window = stale_after.as_millis() as i64;
    let mut peers: Vec<Peer> = records
        .iter()
        .filter(|r| r.participant_id != self_id && now_ms - r.last_seen_ms < window)
        .map(|r| Peer {
            id: r.participant_id.clone(),
            name: r
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| "Anonymous".to_string()),
            color: r.color.clone().unwrap_or_else(|| "#888".to_string()),
            cursor: r.cursor,
        })
        .collect();
    peers.sort_by(|a, b| a.id.cmp(&b.id));
    peers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, name: Option<&str>, last_seen_ms: i64) -> PresenceRecord {
        PresenceRecord {
            participant_id: id.to_string(),
            name: name.map(str::to_string),
            color: None,
            cursor: None,
            last_seen_ms,
        }
    }

    #[test]
    fn test_random_base36_length_and_alphabet() {
        let s = random_base36(9);
        assert_eq!(s.len(), 9);
        assert!(s.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_participant_ids_are_unique() {
        let a = Participant::new("Ana");
        let b = Participant::new("Ana");
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("user-"));
        assert!(a.color.starts_with("hsl("));
    }

    #[test]
    fn test_active_peers_excludes_self_and_stale() {
        let now = 1_000_000;
        let records = vec![
            record("me", Some("Me"), now),
            record("fresh", Some("Fresh"), now - 5_000),
            record("stale", Some("Stale"), now - 121_000),
        ];
        let peers = active_peers(&records, "me", now, Duration::from_secs(120));
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].id, "fresh");
    }

    #[test]
    fn test_active_peers_fills_missing_fields() {
        let now = 10_000;
        let records = vec![record("b", None, now), record("a", Some("  "), now)];
        let peers = active_peers(&records, "me", now, Duration::from_secs(120));
        assert_eq!(peers[0].id, "a");
        assert_eq!(peers[0].name, "Anonymous");
        assert_eq!(peers[1].color, "#888");
    }

    #[test]
    fn test_presence_record_for_participant() {
        let p = Participant::new("Ana");
        let cursor = Cursor { line: 3, column: 7 };
        let record = PresenceRecord::for_participant(&p, Some(cursor), 42);
        assert_eq!(record.participant_id, p.id);
        assert_eq!(record.name.as_deref(), Some("Ana"));
        assert_eq!(record.cursor, Some(cursor));
        assert_eq!(record.last_seen_ms, 42);
    }
}
