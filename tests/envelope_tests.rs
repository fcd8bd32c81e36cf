/// Envelope tests
///
/// Encode/decode behaviour of keyed records through `Envelope` and
/// `EnvelopeCodec`, in JSON and MessagePack.
/// Run with: cargo test --test envelope_tests

use keyed_envelope::{
    AttributeValue, Envelope, EnvelopeCodec, EnvelopeError, FlatRecord, KeyValue, KeyedRecord,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct User {
    id: Uuid,
    name: String,
    email: String,
    points: i64,
    verified: bool,
}

impl KeyedRecord for User {
    fn partition_key(&self) -> KeyValue {
        format!("USER#{}", self.id.hyphenated().to_string().to_uppercase()).into()
    }

    fn sort_key(&self) -> Option<KeyValue> {
        Some("PROFILE".into())
    }
}

const USER_JSON: &str = r#"{
    "pk": "USER#123E4567-E89B-12D3-A456-426614174000",
    "sk": "PROFILE",
    "id": "123E4567-E89B-12D3-A456-426614174000",
    "name": "John Doe",
    "email": "john.doe@example.com",
    "points": 100,
    "verified": true
}"#;

fn user() -> User {
    User {
        id: Uuid::parse_str("123E4567-E89B-12D3-A456-426614174000").unwrap(),
        name: "John Doe".to_string(),
        email: "john.doe@example.com".to_string(),
        points: 100,
        verified: true,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    name: String,
    points: i64,
    verified: bool,
}

impl KeyedRecord for Profile {
    fn partition_key(&self) -> KeyValue {
        KeyValue::from("USER#123")
    }

    fn sort_key(&self) -> Option<KeyValue> {
        Some(KeyValue::from("PROFILE"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Account {
    pk: String,
    sk: String,
    owner: String,
}

impl KeyedRecord for Account {
    fn partition_key(&self) -> KeyValue {
        format!("OWNER#{}", self.owner).into()
    }

    fn sort_key(&self) -> Option<KeyValue> {
        Some("ACCOUNT".into())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Event {
    stream: String,
    sequence: Option<i64>,
    payload: String,
}

impl KeyedRecord for Event {
    const PARTITION_KEY_NAME: &'static str = "stream_id";
    const SORT_KEY_NAME: Option<&'static str> = Some("seq");

    fn partition_key(&self) -> KeyValue {
        KeyValue::from(self.stream.as_str())
    }

    fn sort_key(&self) -> Option<KeyValue> {
        self.sequence.map(KeyValue::from)
    }
}

#[derive(Debug, Clone, Serialize)]
struct Singleton {
    value: String,
}

impl KeyedRecord for Singleton {
    const SORT_KEY_NAME: Option<&'static str> = None;

    fn partition_key(&self) -> KeyValue {
        KeyValue::from("SINGLETON")
    }

    fn sort_key(&self) -> Option<KeyValue> {
        Some(KeyValue::from(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Draft {
    sk: String,
    v: i64,
}

impl KeyedRecord for Draft {
    fn partition_key(&self) -> KeyValue {
        KeyValue::from("P")
    }

    fn sort_key(&self) -> Option<KeyValue> {
        None
    }
}

#[test]
fn test_profile_encodes_to_exact_flat_record() -> anyhow::Result<()> {
    let profile = Profile {
        name: "John".to_string(),
        points: 100,
        verified: true,
    };

    let json = serde_json::to_value(Envelope::new(profile.clone()))?;

    assert_eq!(
        json,
        json!({
            "pk": "USER#123",
            "sk": "PROFILE",
            "name": "John",
            "points": 100,
            "verified": true
        })
    );

    let decoded: Envelope<Profile> = serde_json::from_value(json)?;
    assert_eq!(decoded.into_inner(), profile);
    Ok(())
}

#[test]
fn test_decode_stored_item() -> anyhow::Result<()> {
    let decoded: Envelope<User> = serde_json::from_str(USER_JSON)?;

    assert_eq!(*decoded, user());
    assert_eq!(decoded.partition_key(), user().partition_key());
    Ok(())
}

#[test]
fn test_encode_matches_stored_item() -> anyhow::Result<()> {
    let encoded = serde_json::to_value(Envelope::new(user()))?;
    let expected: serde_json::Value = serde_json::from_str(USER_JSON)?;

    // Uuid serializes lowercase; everything else is byte-for-byte the same.
    let mut expected = expected;
    expected["id"] = json!("123e4567-e89b-12d3-a456-426614174000");

    assert_eq!(encoded, expected);
    Ok(())
}

#[test]
fn test_round_trip_through_codec() -> anyhow::Result<()> {
    let codec = EnvelopeCodec::default();

    let flat = codec.encode(&user())?;
    let decoded: User = codec.decode(flat)?;

    assert_eq!(decoded, user());
    Ok(())
}

#[test]
fn test_computed_keys_take_precedence() -> anyhow::Result<()> {
    let account = Account {
        pk: "legacy-pk".to_string(),
        sk: "legacy-sk".to_string(),
        owner: "ada".to_string(),
    };

    let flat = EnvelopeCodec::default().encode(&account)?;

    assert_eq!(flat.len(), 3);
    assert_eq!(flat.get("pk"), Some(&AttributeValue::from("OWNER#ada")));
    assert_eq!(flat.get("sk"), Some(&AttributeValue::from("ACCOUNT")));
    assert_eq!(flat.get("owner"), Some(&AttributeValue::from("ada")));
    Ok(())
}

#[test]
fn test_record_consuming_key_fields_reads_computed_values() -> anyhow::Result<()> {
    let account = Account {
        pk: "legacy-pk".to_string(),
        sk: "legacy-sk".to_string(),
        owner: "ada".to_string(),
    };
    let codec = EnvelopeCodec::default();

    let decoded: Account = codec.decode(codec.encode(&account)?)?;

    assert_eq!(decoded.pk, "OWNER#ada");
    assert_eq!(decoded.sk, "ACCOUNT");
    assert_eq!(decoded.owner, "ada");
    Ok(())
}

#[test]
fn test_absent_sort_key_drops_stored_attribute() -> anyhow::Result<()> {
    let draft = Draft {
        sk: "stale".to_string(),
        v: 1,
    };

    let json = serde_json::to_value(Envelope::new(draft))?;

    assert_eq!(json, json!({"pk": "P", "v": 1}));
    Ok(())
}

#[test]
fn test_custom_key_names_and_absent_sort_key() -> anyhow::Result<()> {
    let codec = EnvelopeCodec::default();
    let with_sequence = Event {
        stream: "orders".to_string(),
        sequence: Some(7),
        payload: "created".to_string(),
    };
    let without_sequence = Event {
        sequence: None,
        ..with_sequence.clone()
    };

    let flat = codec.encode(&with_sequence)?;
    assert_eq!(flat.get("stream_id"), Some(&AttributeValue::from("orders")));
    assert_eq!(flat.get("seq"), Some(&AttributeValue::Integer(7)));
    assert!(!flat.contains_key("pk"));
    assert!(!flat.contains_key("sk"));

    let flat = codec.encode(&without_sequence)?;
    assert!(!flat.contains_key("seq"));
    assert!(!flat.contains_key("sequence"));
    assert_eq!(
        flat.keys().collect::<Vec<_>>(),
        vec!["payload", "stream", "stream_id"]
    );

    let decoded: Event = codec.decode(flat)?;
    assert_eq!(decoded, without_sequence);
    Ok(())
}

#[test]
fn test_missing_sort_key_name_produces_no_output() {
    let record = Singleton {
        value: "x".to_string(),
    };

    match EnvelopeCodec::default().encode(&record) {
        Err(EnvelopeError::MissingSortKeyName { value }) => {
            assert_eq!(value, KeyValue::Integer(1));
        }
        other => panic!("expected MissingSortKeyName, got {:?}", other),
    }

    let err = serde_json::to_vec(&Envelope::new(record)).unwrap_err();
    assert!(err.to_string().contains("Sort key '1'"));
}

#[test]
fn test_encoding_is_deterministic() -> anyhow::Result<()> {
    let codec = EnvelopeCodec::default();

    let first = codec.to_json_string(&user())?;
    let second = codec.to_json_string(&user())?;

    assert_eq!(first, second);
    assert_eq!(codec.encode(&user())?, codec.encode(&user())?);
    Ok(())
}

#[test]
fn test_decode_propagates_type_mismatch() {
    let result: Result<User, _> = EnvelopeCodec::default().decode_json(json!({
        "pk": "USER#1",
        "id": "123E4567-E89B-12D3-A456-426614174000",
        "name": "John Doe",
        "email": "john.doe@example.com",
        "points": "lots",
        "verified": true
    }));

    match result {
        Err(EnvelopeError::Deserialization(message)) => {
            assert!(message.contains("invalid type"), "{}", message)
        }
        other => panic!("expected a deserialization error, got {:?}", other),
    }
}

#[test]
fn test_decode_json_rejects_nested_documents() {
    let result: Result<Profile, _> = EnvelopeCodec::default().decode_json(json!({
        "pk": "USER#123",
        "name": {"first": "John"},
        "points": 1,
        "verified": false
    }));

    assert!(matches!(result, Err(EnvelopeError::Json(_))));
}

#[test]
fn test_json_string_helpers() -> anyhow::Result<()> {
    let codec = EnvelopeCodec::default();

    let text = codec.to_json_string(&user())?;
    assert!(text.starts_with(r#"{"email":"john.doe@example.com","id":"#));

    let decoded: User = codec.from_json_str(&text)?;
    assert_eq!(decoded, user());
    Ok(())
}

#[test]
fn test_messagepack_round_trip() -> anyhow::Result<()> {
    let bytes = rmp_serde::to_vec_named(&Envelope::new(user()))?;

    let flat: FlatRecord = rmp_serde::from_slice(&bytes)?;
    assert_eq!(
        flat.get("pk").and_then(|v| v.as_str()),
        Some("USER#123E4567-E89B-12D3-A456-426614174000")
    );

    let decoded: Envelope<User> = rmp_serde::from_slice(&bytes)?;
    assert_eq!(decoded.into_inner(), user());
    Ok(())
}

#[test]
fn test_borrowed_record_envelope() -> anyhow::Result<()> {
    let user = user();

    let borrowed = serde_json::to_value(Envelope::new(&user))?;
    let owned = serde_json::to_value(Envelope::new(user.clone()))?;

    assert_eq!(borrowed, owned);
    Ok(())
}
