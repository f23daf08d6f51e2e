use content_ledger::item::{decode_upload, Origin};
use content_ledger::scoring::KeywordTable;
use content_ledger::store::{FailPoint, LedgerStore, MemoryStore};
use content_ledger::types::ContentHash;
use content_ledger::{Ledger, LedgerConfig, LedgerError, ValidationError};

fn open(threshold: usize) -> Ledger<MemoryStore> {
    Ledger::open(MemoryStore::new(), LedgerConfig::v0().with_threshold(threshold)).unwrap()
}

#[test]
fn identical_content_gets_distinct_ids() {
    let mut ledger = open(10);

    let a = ledger.create_item("fusion reactor notes", Origin::Text).unwrap().item;
    let b = ledger.create_item("fusion reactor notes", Origin::Text).unwrap().item;

    assert_ne!(a.id, b.id);
    assert_eq!(a.ordinal, 0);
    assert_eq!(b.ordinal, 1);
    assert_eq!(a.score, b.score);
    assert_eq!(a.value, b.value);
    assert_eq!(a.provenance.content_hash, b.provenance.content_hash);
}

#[test]
fn created_item_is_persisted_and_appended() {
    let mut ledger = open(10);

    let created = ledger.create_item("neural lattice", Origin::Text).unwrap();
    assert!(created.sealed.is_empty());

    let stored = ledger.item(&created.item.id).unwrap().unwrap();
    assert_eq!(stored, created.item);
    assert_eq!(ledger.state().pending_hashes(), &[created.item.id.clone()]);
    assert_eq!(ledger.state().next_index, 1);
    assert_eq!(ledger.store().journal_len(), 1);
}

#[test]
fn provenance_chain_is_auditable() {
    let mut ledger = open(10);
    let item = ledger
        .create_item("photon data", Origin::file("notes.txt"))
        .unwrap()
        .item;
    let p = &item.provenance;

    assert_eq!(p.source_hash, ContentHash::digest(b"notes.txt"));
    assert_eq!(p.content_hash, ContentHash::digest(b"photon data"));
    assert_eq!(p.combined_hash, ContentHash::chain([&p.source_hash, &p.content_hash]));
    assert_eq!(p.master_hash, ContentHash::digest(p.combined_hash.as_str().as_bytes()));
    assert_eq!(p.audit_hash, ContentHash::chain([&p.master_hash, &item.id]));
}

#[test]
fn vector_position_is_unit_cube() {
    let mut ledger = open(10);
    for i in 0..20 {
        let item = ledger.create_item(format!("entry {i}"), Origin::Text).unwrap().item;
        for c in [item.vector.x, item.vector.y, item.vector.z] {
            assert!((0.0..1.0).contains(&c), "coordinate {c} out of range");
        }
    }
}

#[test]
fn revalue_restores_a_tampered_item() {
    let mut ledger = open(10);
    let item = ledger.create_item("quantum entropy", Origin::Text).unwrap().item;

    let mut tampered = item.clone();
    tampered.score = 1.0;
    tampered.value = 1.0;
    ledger.store_mut().put_item(&tampered).unwrap();

    let restored = ledger.revalue_item(&item.id).unwrap();
    assert_eq!(restored.score, item.score);
    assert_eq!(restored.value, item.value);
    assert_eq!(ledger.item(&item.id).unwrap().unwrap(), item);

    // Second pass is a no-op.
    assert_eq!(ledger.revalue_item(&item.id).unwrap(), item);
}

#[test]
fn revalue_all_picks_up_new_weights() {
    let mut ledger = open(10);
    let item = ledger.create_item("widget widget", Origin::Text).unwrap().item;
    ledger.create_item("nothing special", Origin::Text).unwrap();
    let store = ledger.into_store();

    let table: KeywordTable = [("widget", 42.0)].into_iter().collect();
    let config = LedgerConfig::v0().with_threshold(10).with_keywords(table);
    let mut ledger = Ledger::open(store, config).unwrap();

    // Only the item mentioning the new keyword moves.
    assert_eq!(ledger.revalue_all().unwrap(), 1);
    let revalued = ledger.item(&item.id).unwrap().unwrap();
    assert_eq!(revalued.breakdown.keyword_bonus, 84.0);
    assert_eq!(revalued.id, item.id);
    assert_eq!(revalued.created_at, item.created_at);

    assert_eq!(ledger.revalue_all().unwrap(), 0);
}

#[test]
fn revalue_unknown_item_fails() {
    let mut ledger = open(10);
    let missing = ContentHash::digest(b"missing");
    assert!(matches!(
        ledger.revalue_item(&missing),
        Err(LedgerError::Validation(ValidationError::UnknownItem(_)))
    ));
}

#[test]
fn failed_item_write_leaves_state_untouched() {
    let mut ledger = open(10);
    ledger.store().fail_next(FailPoint::PutItem);

    let err = ledger.create_item("plasma", Origin::Text).unwrap_err();
    assert!(matches!(err, LedgerError::Storage(_)));
    assert_eq!(ledger.state().next_index, 0);
    assert!(ledger.state().pending_hashes().is_empty());
    assert_eq!(ledger.store().item_count(), 0);
    assert_eq!(ledger.store().journal_len(), 0);

    let created = ledger.create_item("plasma", Origin::Text).unwrap();
    assert_eq!(created.item.ordinal, 0);
}

#[test]
fn failed_cursor_save_does_not_mark_source_processed() {
    let mut ledger = open(10);
    ledger.store().fail_next(FailPoint::SaveState);

    assert!(ledger.create_item("tensor", Origin::file("a.txt")).is_err());
    assert!(!ledger.state().is_processed("a.txt"));
    assert!(ledger.state().pending_hashes().is_empty());
    assert_eq!(ledger.state().next_index, 0);

    ledger.create_item("tensor", Origin::file("a.txt")).unwrap();
    assert!(ledger.state().is_processed("a.txt"));
    assert_eq!(ledger.state().pending_hashes().len(), 1);
}

#[test]
fn uploads_decode_base64_or_pass_through() {
    assert_eq!(decode_upload("aGVsbG8gd29ybGQ="), "hello world");
    assert_eq!(decode_upload("plain text, not encoded"), "plain text, not encoded");
    // Valid base64 that is not UTF-8 stays as-is.
    assert_eq!(decode_upload("/w=="), "/w==");
}

#[test]
fn origin_serializes_with_kind_tag() {
    let json = serde_json::to_value(Origin::file("a.txt")).unwrap();
    assert_eq!(json, serde_json::json!({"kind": "file", "filename": "a.txt"}));

    let json = serde_json::to_value(Origin::Text).unwrap();
    assert_eq!(json, serde_json::json!({"kind": "text"}));

    assert_eq!(Origin::fetched("https://example.org/a").source_id(), Some("https://example.org/a"));
    assert_eq!(Origin::Text.source_id(), None);
}
