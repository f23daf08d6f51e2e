use std::fs;

use content_ledger::item::Origin;
use content_ledger::store::FsStore;
use content_ledger::{Ledger, LedgerConfig};
use tempfile::tempdir;

fn open(root: &std::path::Path) -> Ledger<FsStore> {
    Ledger::open(FsStore::open(root).unwrap(), LedgerConfig::v0().with_threshold(2)).unwrap()
}

#[test]
fn ingest_creates_items_in_name_order() {
    let dir = tempdir().unwrap();
    let sources = dir.path().join("sources");
    fs::create_dir_all(&sources).unwrap();
    fs::write(sources.join("b.txt"), "neural tensor").unwrap();
    fs::write(sources.join("a.txt"), "quantum fusion").unwrap();
    fs::write(sources.join("blank.txt"), "  \n\t ").unwrap();
    fs::create_dir_all(sources.join("nested")).unwrap();

    let mut ledger = open(&dir.path().join("ledger"));
    let report = ledger.ingest_dir(&sources).unwrap();

    assert_eq!(report.created.len(), 2);
    assert_eq!(report.skipped_empty, 1);
    assert_eq!(report.skipped_processed, 0);
    assert_eq!(report.sealed.len(), 1);

    let first = ledger.item(&report.created[0]).unwrap().unwrap();
    let second = ledger.item(&report.created[1]).unwrap().unwrap();
    assert_eq!(first.origin, Origin::file("a.txt"));
    assert_eq!(second.origin, Origin::file("b.txt"));
    assert_eq!(report.sealed[0].member_hashes, report.created);
}

#[test]
fn ingest_is_idempotent_across_runs_and_restarts() {
    let dir = tempdir().unwrap();
    let sources = dir.path().join("sources");
    fs::create_dir_all(&sources).unwrap();
    fs::write(sources.join("one.md"), "hydrogen plasma").unwrap();
    fs::write(sources.join("two.md"), "photon lattice").unwrap();
    let root = dir.path().join("ledger");

    {
        let mut ledger = open(&root);
        assert_eq!(ledger.ingest_dir(&sources).unwrap().created.len(), 2);

        let again = ledger.ingest_dir(&sources).unwrap();
        assert!(again.created.is_empty());
        assert_eq!(again.skipped_processed, 2);
    }

    fs::write(sources.join("three.md"), "entropy reactor").unwrap();

    let mut ledger = open(&root);
    let report = ledger.ingest_dir(&sources).unwrap();
    assert_eq!(report.created.len(), 1);
    assert_eq!(report.skipped_processed, 2);
    assert!(ledger.state().is_processed("three.md"));
    assert_eq!(ledger.state().next_index, 3);
}

#[test]
fn non_utf8_bytes_are_read_lossily() {
    let dir = tempdir().unwrap();
    let sources = dir.path().join("sources");
    fs::create_dir_all(&sources).unwrap();
    fs::write(sources.join("raw.bin"), [b'o', b'k', 0xff, b' ', b'x']).unwrap();

    let mut ledger = open(&dir.path().join("ledger"));
    let report = ledger.ingest_dir(&sources).unwrap();

    let item = ledger.item(&report.created[0]).unwrap().unwrap();
    assert_eq!(item.raw_content, "ok\u{fffd} x");
}

#[test]
fn unreadable_source_directory_is_a_storage_error() {
    let dir = tempdir().unwrap();
    let mut ledger = open(&dir.path().join("ledger"));

    let err = ledger.ingest_dir(&dir.path().join("absent")).unwrap_err();
    assert!(matches!(err, content_ledger::LedgerError::Storage(_)));
    assert_eq!(ledger.state().next_index, 0);
}
