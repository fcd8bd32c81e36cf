use std::collections::BTreeMap;

use keyed_envelope::{
    AttributeValue, EnvelopeCodec, EnvelopeError, EnvelopeOptions, KeyedRecord, NullFields,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Address {
    street: String,
    city: String,
    unit: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Plan {
    Free,
    Paid { seats: u32, annual: bool },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, KeyedRecord)]
#[keyed(partition_key = "CUSTOMER#{id}", sort_key = "DETAILS")]
struct Customer {
    id: u64,
    name: String,
    address: Address,
    plan: Plan,
    labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, KeyedRecord)]
#[keyed(partition_key = "NOTE#{id}", no_sort_key)]
struct Note {
    id: u32,
    body: String,
    archived_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, KeyedRecord)]
#[keyed(partition_key = "LIST#{id}", no_sort_key)]
struct Checklist {
    id: u32,
    items: Vec<String>,
}

fn customer() -> Customer {
    let mut labels = BTreeMap::new();
    labels.insert("segment".to_string(), "smb".to_string());

    Customer {
        id: 9,
        name: "Acme".to_string(),
        address: Address {
            street: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            unit: None,
        },
        plan: Plan::Paid {
            seats: 5,
            annual: true,
        },
        labels,
    }
}

#[test]
fn test_nested_struct_rejected_by_default() {
    let err = EnvelopeCodec::default().encode(&customer()).unwrap_err();

    match err {
        EnvelopeError::UnsupportedShape { field, shape } => {
            assert_eq!(field, "address");
            assert_eq!(shape, "struct");
        }
        other => panic!("expected UnsupportedShape, got {:?}", other),
    }
}

#[test]
fn test_joined_paths_flatten_every_level() -> anyhow::Result<()> {
    let codec = EnvelopeCodec::new(EnvelopeOptions::new().join_nested("."));

    let json = codec.encode_json(&customer())?;

    assert_eq!(
        json,
        json!({
            "pk": "CUSTOMER#9",
            "sk": "DETAILS",
            "id": 9,
            "name": "Acme",
            "address.street": "1 Main St",
            "address.city": "Springfield",
            "plan.Paid.seats": 5,
            "plan.Paid.annual": true,
            "labels.segment": "smb"
        })
    );
    Ok(())
}

#[test]
fn test_joined_paths_round_trip() -> anyhow::Result<()> {
    let codec = EnvelopeCodec::new(EnvelopeOptions::new().join_nested("."));
    let mut free = customer();
    free.plan = Plan::Free;
    free.address.unit = Some(4);

    for original in [customer(), free] {
        let flat = codec.encode(&original)?;
        let decoded: Customer = codec.decode(flat)?;
        assert_eq!(decoded, original);
    }
    Ok(())
}

#[test]
fn test_unit_variant_is_text() -> anyhow::Result<()> {
    let codec = EnvelopeCodec::new(EnvelopeOptions::new().join_nested("#"));
    let mut record = customer();
    record.plan = Plan::Free;

    let flat = codec.encode(&record)?;

    assert_eq!(flat.get("plan"), Some(&AttributeValue::from("Free")));
    assert_eq!(
        flat.get("address#city"),
        Some(&AttributeValue::from("Springfield"))
    );
    Ok(())
}

#[test]
fn test_null_fields_policy() -> anyhow::Result<()> {
    let note = Note {
        id: 1,
        body: "hello".to_string(),
        archived_at: None,
    };

    let omitted = EnvelopeCodec::default().encode(&note)?;
    assert!(!omitted.contains_key("archived_at"));

    let keep = EnvelopeCodec::new(EnvelopeOptions::new().null_fields(NullFields::Keep));
    let kept = keep.encode(&note)?;
    assert_eq!(kept.get("archived_at"), Some(&AttributeValue::Null));

    let decoded: Note = keep.decode(kept)?;
    assert_eq!(decoded, note);
    Ok(())
}

#[test]
fn test_sequences_rejected_under_every_policy() {
    let checklist = Checklist {
        id: 2,
        items: vec!["milk".to_string()],
    };

    for options in [EnvelopeOptions::new(), EnvelopeOptions::new().join_nested(".")] {
        let err = EnvelopeCodec::new(options).encode(&checklist).unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::UnsupportedShape { ref field, .. } if field == "items"
        ));
    }
}

#[test]
fn test_empty_separator_is_rejected() {
    let codec = EnvelopeCodec::new(EnvelopeOptions::new().join_nested(""));

    assert!(matches!(
        codec.encode(&customer()),
        Err(EnvelopeError::InvalidOptions(_))
    ));
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Contact {
    phone: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, KeyedRecord)]
#[keyed(partition_key = "RELEASE#{id}", no_sort_key)]
struct Release {
    id: u32,
    versions: BTreeMap<String, String>,
    contact: Contact,
}

fn release() -> Release {
    let mut versions = BTreeMap::new();
    versions.insert("stable".to_string(), "x".to_string());

    Release {
        id: 1,
        versions,
        contact: Contact {
            phone: Some("555".to_string()),
            email: None,
        },
    }
}

#[test]
fn test_empty_composites_rejected_when_joining() {
    let codec = EnvelopeCodec::new(EnvelopeOptions::new().join_nested("."));

    let mut no_versions = release();
    no_versions.versions.clear();
    let err = codec.encode(&no_versions).unwrap_err();
    assert!(matches!(
        err,
        EnvelopeError::UnsupportedShape { ref field, ref shape }
            if field == "versions" && shape == "empty composite"
    ));

    let mut no_contact = release();
    no_contact.contact.phone = None;
    let err = codec.encode(&no_contact).unwrap_err();
    assert!(matches!(
        err,
        EnvelopeError::UnsupportedShape { ref field, .. } if field == "contact"
    ));
}

#[test]
fn test_kept_nulls_make_empty_struct_round_trip() -> anyhow::Result<()> {
    let codec = EnvelopeCodec::new(
        EnvelopeOptions::new()
            .join_nested(".")
            .null_fields(NullFields::Keep),
    );
    let mut record = release();
    record.contact.phone = None;

    let flat = codec.encode(&record)?;
    assert_eq!(flat.get("contact.phone"), Some(&AttributeValue::Null));

    let decoded: Release = codec.decode(flat)?;
    assert_eq!(decoded, record);
    Ok(())
}

#[test]
fn test_map_key_containing_separator_rejected() -> anyhow::Result<()> {
    let codec = EnvelopeCodec::new(EnvelopeOptions::new().join_nested("."));
    let mut record = release();
    record.versions.insert("v1.2".to_string(), "x".to_string());

    let err = codec.encode(&record).unwrap_err();
    assert!(matches!(
        err,
        EnvelopeError::UnsupportedShape { ref field, .. } if field == "versions.v1.2"
    ));

    let hash = EnvelopeCodec::new(EnvelopeOptions::new().join_nested("#"));
    let decoded: Release = hash.decode(hash.encode(&record)?)?;
    assert_eq!(decoded, record);
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Archived;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, KeyedRecord)]
#[keyed(partition_key = "TASK#{id}", no_sort_key)]
struct Task {
    id: u32,
    done: (),
    state: Archived,
}

#[test]
fn test_unit_fields_round_trip_with_omitted_nulls() -> anyhow::Result<()> {
    let codec = EnvelopeCodec::default();
    let task = Task {
        id: 5,
        done: (),
        state: Archived,
    };

    let flat = codec.encode(&task)?;
    assert_eq!(flat.get("done"), Some(&AttributeValue::Null));
    assert_eq!(flat.get("state"), Some(&AttributeValue::Null));

    let decoded: Task = codec.decode(flat)?;
    assert_eq!(decoded, task);
    Ok(())
}
