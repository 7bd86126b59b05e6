//! The serialized form of a cached page: a JSON array of post objects.

use bytes::Bytes;
use thiserror::Error;

use crate::domain::entities::PostRecord;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode cached page: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode cached page: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Encodes and decodes cached post listings.
pub struct PostPageCodec;

impl PostPageCodec {
    pub fn encode(posts: &[PostRecord]) -> Result<Bytes, CodecError> {
        serde_json::to_vec(posts)
            .map(Bytes::from)
            .map_err(CodecError::Encode)
    }

    pub fn decode(payload: &[u8]) -> Result<Vec<PostRecord>, CodecError> {
        serde_json::from_slice(payload).map_err(CodecError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use time::macros::datetime;

    use super::*;

    fn sample_posts() -> Vec<PostRecord> {
        vec![
            PostRecord {
                id: 1,
                title: "First".to_string(),
                body: "Hello \"world\"\n".to_string(),
                created_at: datetime!(2024-03-01 10:00:00 UTC),
                updated_at: datetime!(2024-03-02 11:30:00 UTC),
                deleted_at: None,
            },
            PostRecord {
                id: 2,
                title: "Second – ünïcode".to_string(),
                body: String::new(),
                created_at: datetime!(2024-03-03 09:15:00 UTC),
                updated_at: datetime!(2024-03-03 09:15:00 UTC),
                deleted_at: None,
            },
        ]
    }

    #[test]
    fn round_trip_preserves_posts_and_order() {
        let posts = sample_posts();
        let payload = PostPageCodec::encode(&posts).expect("encode");
        let decoded = PostPageCodec::decode(&payload).expect("decode");
        assert_eq!(decoded, posts);
    }

    #[test]
    fn empty_page_round_trips() {
        let payload = PostPageCodec::encode(&[]).expect("encode");
        assert_eq!(payload.as_ref(), b"[]");
        assert!(PostPageCodec::decode(&payload).expect("decode").is_empty());
    }

    #[test]
    fn payload_is_a_json_array_of_post_objects() {
        let payload = PostPageCodec::encode(&sample_posts()).expect("encode");
        let value: Value = serde_json::from_slice(&payload).expect("valid json");
        let items = value.as_array().expect("array payload");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["id"], 1);
        assert_eq!(items[0]["title"], "First");
        assert_eq!(items[0]["created_at"], "2024-03-01T10:00:00Z");
    }

    #[test]
    fn corrupt_payload_is_a_decode_error() {
        assert!(matches!(
            PostPageCodec::decode(b"{not json"),
            Err(CodecError::Decode(_))
        ));
        assert!(matches!(
            PostPageCodec::decode(br#"{"id": 1}"#),
            Err(CodecError::Decode(_))
        ));
    }
}
