use content_ledger::ledger::Rollup;
use content_ledger::store::{FailPoint, MemoryStore};
use content_ledger::types::ContentHash;
use content_ledger::{Ledger, LedgerConfig, LedgerError, ValidationError};

fn open(threshold: usize) -> Ledger<MemoryStore> {
    Ledger::open(MemoryStore::new(), LedgerConfig::v0().with_threshold(threshold)).unwrap()
}

fn hashes(tag: &str, n: usize) -> Vec<ContentHash> {
    (0..n)
        .map(|i| ContentHash::digest(format!("{tag}-{i}").as_bytes()))
        .collect()
}

#[test]
fn exactly_threshold_seals_one_batch() {
    let mut ledger = open(4);
    let batch = hashes("a", 4);

    let sealed = ledger.append(&batch).unwrap();

    assert_eq!(sealed.len(), 1);
    let rollup = &sealed[0];
    assert_eq!(rollup.batch_index, 1);
    assert_eq!(rollup.count, 4);
    assert_eq!(rollup.member_hashes, batch);
    assert_eq!(rollup.rollup_id, ContentHash::chain(&batch));
    assert!(rollup.verify());

    assert!(ledger.state().pending_hashes().is_empty());
    assert_eq!(ledger.state().batch_index(), 1);
    assert_eq!(ledger.rollup(1).unwrap().as_ref(), Some(rollup));
}

#[test]
fn overflow_carries_into_next_window() {
    let mut ledger = open(4);
    let input = hashes("a", 6);

    let sealed = ledger.append(&input).unwrap();

    assert_eq!(sealed.len(), 1);
    assert_eq!(sealed[0].member_hashes, input[..4]);
    assert_eq!(ledger.state().pending_hashes(), &input[4..]);
}

#[test]
fn one_at_a_time_seals_on_the_threshold_append() {
    let mut ledger = open(4);
    let input = hashes("a", 4);

    for h in &input[..3] {
        assert!(ledger.append(std::slice::from_ref(h)).unwrap().is_empty());
    }
    assert_eq!(ledger.state().pending_hashes().len(), 3);

    let sealed = ledger.append(&input[3..]).unwrap();
    assert_eq!(sealed.len(), 1);
    assert_eq!(sealed[0].member_hashes, input);
}

#[test]
fn bulk_append_seals_every_full_batch_in_order() {
    let mut ledger = open(4);
    let input = hashes("bulk", 13);

    let sealed = ledger.append(&input).unwrap();

    let indices: Vec<u64> = sealed.iter().map(|r| r.batch_index).collect();
    assert_eq!(indices, vec![1, 2, 3]);
    for (i, rollup) in sealed.iter().enumerate() {
        assert_eq!(rollup.member_hashes, input[i * 4..(i + 1) * 4]);
    }
    assert_eq!(ledger.state().pending_hashes(), &input[12..]);
    assert_eq!(ledger.state().window.sealed_count, 12);
    assert_eq!(ledger.rollups().unwrap(), sealed);
}

#[test]
fn batch_index_is_monotonic_across_appends() {
    let mut ledger = open(2);
    let mut seen = Vec::new();
    for round in 0..5 {
        for rollup in ledger.append(&hashes(&format!("r{round}"), 3)).unwrap() {
            seen.push(rollup.batch_index);
        }
    }
    // 15 hashes at threshold 2: seven sealed batches, one pending.
    assert_eq!(seen, (1..=7).collect::<Vec<u64>>());
    assert_eq!(ledger.state().pending_hashes().len(), 1);
}

#[test]
fn duplicate_hashes_are_accepted() {
    let mut ledger = open(2);
    let h = ContentHash::digest(b"same");
    let sealed = ledger.append(&[h.clone(), h.clone()]).unwrap();
    assert_eq!(sealed[0].member_hashes, vec![h.clone(), h]);
}

#[test]
fn append_hex_validates_input() {
    let mut ledger = open(4);
    let good = ContentHash::digest(b"x");

    ledger.append_hex(&[good.as_str()]).unwrap();
    assert_eq!(ledger.state().pending_hashes(), &[good]);

    let err = ledger.append_hex(&["not-a-hash"]).unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Validation(ValidationError::InvalidHash(_))
    ));
    assert_eq!(ledger.state().pending_hashes().len(), 1);
}

#[test]
fn failed_rollup_write_leaves_window_intact_and_retry_succeeds() {
    let mut ledger = open(4);
    let input = hashes("a", 5);
    ledger.append(&input[..3]).unwrap();

    ledger.store().fail_next(FailPoint::PutRollup);
    assert!(ledger.append(&input[3..]).is_err());
    assert_eq!(ledger.state().pending_hashes(), &input[..3]);
    assert_eq!(ledger.state().batch_index(), 0);
    assert_eq!(ledger.store().rollup_count(), 0);

    let sealed = ledger.append(&input[3..]).unwrap();
    assert_eq!(sealed.len(), 1);
    assert_eq!(sealed[0].member_hashes, input[..4]);
    assert_eq!(ledger.state().pending_hashes(), &input[4..]);
    assert_eq!(ledger.store().journal_len(), 1);
}

#[test]
fn journal_is_pruned_to_the_pending_window_after_each_seal() {
    let mut ledger = open(4);

    ledger.append(&hashes("even", 40)).unwrap();
    assert_eq!(ledger.state().batch_index(), 10);
    assert_eq!(ledger.store().journal_len(), 0);

    for round in 0..7 {
        ledger.append(&hashes(&format!("trickle{round}"), 3)).unwrap();
        assert_eq!(
            ledger.store().journal_len(),
            ledger.state().pending_hashes().len(),
            "round {round}"
        );
    }
    // 61 hashes at threshold 4: fifteen batches, one pending.
    assert_eq!(ledger.state().batch_index(), 15);
    assert_eq!(ledger.store().journal_len(), 1);
}

#[test]
fn journal_is_kept_when_the_cursor_save_fails() {
    let mut ledger = open(4);

    ledger.store().fail_next(FailPoint::SaveState);
    assert!(ledger.append(&hashes("a", 6)).is_err());
    assert_eq!(ledger.store().journal_len(), 6);

    ledger.rebuild_state().unwrap();
    assert_eq!(ledger.state().batch_index(), 1);
    assert_eq!(ledger.state().pending_hashes(), &hashes("a", 6)[4..]);
    assert_eq!(ledger.store().journal_len(), 2);
}

#[test]
fn failed_journal_write_leaves_window_intact() {
    let mut ledger = open(4);
    let input = hashes("a", 3);
    ledger.store().fail_after(FailPoint::PutJournal, 1);

    assert!(ledger.append(&input).is_err());
    assert!(ledger.state().pending_hashes().is_empty());

    ledger.append(&input).unwrap();
    assert_eq!(ledger.state().pending_hashes(), &input[..]);
}

#[test]
fn failed_cursor_save_after_seal_is_retried_without_resealing() {
    let mut ledger = open(4);
    let input = hashes("a", 4);

    ledger.store().fail_next(FailPoint::SaveState);
    assert!(ledger.append(&input).is_err());
    assert_eq!(ledger.state().batch_index(), 0);
    assert!(ledger.state().pending_hashes().is_empty());
    let first = ledger.rollup(1).unwrap().unwrap();

    let sealed = ledger.append(&input).unwrap();
    assert_eq!(sealed, vec![first]);
    assert_eq!(ledger.store().rollup_count(), 1);
    assert_eq!(ledger.state().batch_index(), 1);
}

#[test]
fn partial_multi_seal_failure_resumes_from_the_first_missing_batch() {
    let mut ledger = open(2);
    let input = hashes("m", 6);

    ledger.store().fail_after(FailPoint::PutRollup, 1);
    assert!(ledger.append(&input).is_err());
    assert_eq!(ledger.store().rollup_count(), 1);
    assert_eq!(ledger.state().batch_index(), 0);

    let sealed = ledger.append(&input).unwrap();
    assert_eq!(sealed.len(), 3);
    assert_eq!(ledger.store().rollup_count(), 3);
    for (i, rollup) in sealed.iter().enumerate() {
        assert_eq!(rollup.batch_index, i as u64 + 1);
        assert_eq!(rollup.member_hashes, input[i * 2..(i + 1) * 2]);
    }
}

#[test]
fn conflicting_append_after_a_durable_seal_is_refused_untouched() {
    let mut ledger = open(4);
    let original = hashes("orig", 4);

    ledger.store().fail_next(FailPoint::SaveState);
    assert!(ledger.append(&original).is_err());

    let other = hashes("other", 4);
    let err = ledger.append(&other).unwrap_err();
    assert!(matches!(err, LedgerError::CorruptState(_)));

    // The sealed batch still replays cleanly and wins.
    ledger.rebuild_state().unwrap();
    assert_eq!(ledger.state().batch_index(), 1);
    assert_eq!(
        ledger.rollup(1).unwrap().unwrap().rollup_id,
        Rollup::compute_id(&original)
    );
}
