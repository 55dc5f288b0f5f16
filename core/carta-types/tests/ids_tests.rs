use carta_types::{ObjectId, ObjectPath, SessionId};
use proptest::prelude::*;
use std::collections::HashSet;
use std::str::FromStr;

// ── ObjectId ──────────────────────────────────────────────────────

#[test]
fn object_id_displays_with_prefix() {
    assert_eq!(ObjectId::from_raw(7).to_string(), "c7");
}

#[test]
fn object_id_parse_roundtrip() {
    let id = ObjectId::from_raw(42);
    let parsed = ObjectId::from_str(&id.to_string()).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn object_id_parse_rejects_missing_prefix() {
    assert!(ObjectId::from_str("42").is_err());
    assert!(ObjectId::from_str("c").is_err());
    assert!(ObjectId::from_str("cx1").is_err());
}

#[test]
fn object_id_next_is_monotonic() {
    let id = ObjectId::from_raw(1);
    assert_eq!(id.next().as_raw(), 2);
    assert!(id.next() > id);
}

#[test]
fn object_id_serializes_as_string() {
    let json = serde_json::to_string(&ObjectId::from_raw(3)).unwrap();
    assert_eq!(json, "\"c3\"");
    let parsed: ObjectId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, ObjectId::from_raw(3));
}

#[test]
fn object_id_hash_and_eq() {
    let mut set = HashSet::new();
    set.insert(ObjectId::from_raw(1));
    set.insert(ObjectId::from_raw(1));
    assert_eq!(set.len(), 1);
}

// ── ObjectPath ────────────────────────────────────────────────────

#[test]
fn path_normalizes_duplicate_delimiters() {
    let path = ObjectPath::new("//CartaObjects///c1/").unwrap();
    assert_eq!(path.as_str(), "/CartaObjects/c1");
}

#[test]
fn path_requires_leading_delimiter() {
    assert!(ObjectPath::new("CartaObjects/c1").is_err());
    assert!(ObjectPath::new("/").is_err());
    assert!(ObjectPath::new("").is_err());
}

#[test]
fn path_child_and_parent() {
    let root = ObjectPath::new("/CartaObjects").unwrap();
    let child = root.child("c4");
    assert_eq!(child.as_str(), "/CartaObjects/c4");
    assert_eq!(child.parent(), Some(root.clone()));
    assert_eq!(child.name(), "c4");
    assert_eq!(root.parent(), None);
}

#[test]
fn path_descendant_check_respects_segment_boundaries() {
    let root = ObjectPath::new("/CartaObjects/c1").unwrap();
    let below = ObjectPath::new("/CartaObjects/c1/settings").unwrap();
    let sibling = ObjectPath::new("/CartaObjects/c10").unwrap();
    assert!(below.is_descendant_of(&root));
    assert!(!sibling.is_descendant_of(&root));
    assert!(!root.is_descendant_of(&root));
}

#[test]
fn path_serde_rejects_relative_path() {
    let result: Result<ObjectPath, _> = serde_json::from_str("\"relative/path\"");
    assert!(result.is_err());
}

// ── SessionId ─────────────────────────────────────────────────────

#[test]
fn session_id_new_is_unique() {
    assert_ne!(SessionId::new(), SessionId::new());
}

#[test]
fn session_id_display_and_parse() {
    let id = SessionId::new();
    let parsed = SessionId::parse(&id.to_string()).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn session_id_parse_invalid() {
    assert!(matches!(SessionId::parse("not-a-uuid"), Err(carta_types::Error::InvalidUuid(_))));
    assert!(matches!(
        SessionId::from_str("0192f1a0-zzzz-7000-8000-000000000000"),
        Err(carta_types::Error::InvalidUuid(_))
    ));
}

proptest! {
    #[test]
    fn object_id_display_parse_roundtrip(raw in any::<u64>()) {
        let id = ObjectId::from_raw(raw);
        prop_assert_eq!(ObjectId::from_str(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn child_path_parent_is_original(segment in "[a-zA-Z0-9]{1,12}") {
        let root = ObjectPath::new("/CartaObjects").unwrap();
        let child = root.child(&segment);
        prop_assert_eq!(child.parent(), Some(root));
        prop_assert_eq!(child.name(), segment.as_str());
    }
}
