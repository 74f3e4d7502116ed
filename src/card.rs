//! Core data structures for the cardwall application.
//!
//! This module contains the Card record persisted in the collection document.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a single card in our system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Unique identifier for the card
    pub id: String,
    /// Caption shown under the image
    pub text: String,
    /// Reference to the image asset, relative to the public directory
    pub image: String,
    /// When the card was created
    pub created_at: DateTime<Utc>,
}

impl Card {
    /// Creates a new card with a fresh id for an already stored image
    pub fn new(text: String, image: String) -> Self {
        Card {
            id: Uuid::new_v4().to_string(),
            text,
            image,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_cards_get_distinct_ids() {
        let a = Card::new("a".into(), "/uploads/a.png".into());
        let b = Card::new("b".into(), "/uploads/b.png".into());
        assert!(!a.id.is_empty());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn serializes_fields_in_document_order() {
        let card = Card {
            id: "1".into(),
            text: "hello".into(),
            image: "/uploads/1-a.png".into(),
            created_at: "2024-03-01T10:00:00Z".parse().unwrap(),
        };
        let json = serde_json::to_string(&card).unwrap();
        assert_eq!(
            json,
            r#"{"id":"1","text":"hello","image":"/uploads/1-a.png","createdAt":"2024-03-01T10:00:00Z"}"#
        );
    }

    #[test]
    fn reads_millisecond_timestamps() {
        let raw = r#"{"id":"x","text":"t","image":"/uploads/x.png","createdAt":"2024-10-01T08:15:30.123Z"}"#;
        let card: Card = serde_json::from_str(raw).unwrap();
        assert_eq!(card.created_at.timestamp_subsec_millis(), 123);
    }
}
