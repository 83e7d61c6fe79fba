#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use radixkv::primitives::io::MemFileIo;
use radixkv::{Db, RadixError, TxOptions};
use tempfile::tempdir;

#[test]
fn commit_then_reopen_sees_values() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("lifecycle.rkv");
    {
        let db = Db::open(&path, TxOptions::default()).unwrap();
        let mut tx = db.begin_transaction().unwrap();
        tx.put(b"alpha", b"1").unwrap();
        tx.put(b"alphabet", b"2").unwrap();
        tx.put(b"beta", b"3").unwrap();
        assert!(tx.commit().unwrap().is_some());
        assert!(!tx.is_started());
    }

    let db = Db::open(&path, TxOptions::default()).unwrap();
    let mut tx = db.begin_transaction().unwrap();
    assert_eq!(tx.get(b"alpha").unwrap(), Some(&b"1"[..]));
    assert_eq!(tx.get(b"alphabet").unwrap(), Some(&b"2"[..]));
    assert_eq!(tx.get(b"beta").unwrap(), Some(&b"3"[..]));
    assert_eq!(tx.get(b"alph").unwrap(), None);
}

#[test]
fn rollback_leaves_store_untouched() {
    let db = Db::in_memory(TxOptions::default()).unwrap();
    let mut tx = db.begin_transaction().unwrap();
    tx.put(b"kept", b"yes").unwrap();
    tx.commit().unwrap();
    let size = db.store().file_size();

    let mut tx = db.begin_transaction().unwrap();
    tx.put(b"kept", b"overwritten").unwrap();
    tx.put(b"dropped", b"no").unwrap();
    tx.rollback().unwrap();
    assert_eq!(db.store().file_size(), size);

    let mut tx = db.begin_transaction().unwrap();
    assert_eq!(tx.get(b"kept").unwrap(), Some(&b"yes"[..]));
    assert_eq!(tx.get(b"dropped").unwrap(), None);
}

#[test]
fn finished_transaction_rejects_work_until_begun_again() {
    let db = Db::in_memory(TxOptions::default()).unwrap();
    let mut tx = db.begin_transaction().unwrap();
    tx.put(b"k", b"v").unwrap();
    tx.commit().unwrap();

    assert!(matches!(tx.put(b"k", b"w"), Err(RadixError::NotStarted)));
    assert!(matches!(tx.get(b"k"), Err(RadixError::NotStarted)));

    tx.begin().unwrap();
    assert_eq!(tx.trie().node_count(), 0);
    tx.put(b"k", b"w").unwrap();
    tx.commit().unwrap();

    let mut reader = db.begin_transaction().unwrap();
    assert_eq!(reader.get(b"k").unwrap(), Some(&b"w"[..]));
}

#[test]
fn empty_or_read_only_commit_writes_nothing() {
    let db = Db::in_memory(TxOptions::default()).unwrap();
    let mut tx = db.begin_transaction().unwrap();
    assert_eq!(tx.commit().unwrap(), None);
    assert!(db.store().is_empty());

    let mut tx = db.begin_transaction().unwrap();
    tx.put(b"k", b"v").unwrap();
    let root = tx.commit().unwrap();
    let size = db.store().file_size();

    // An untouched root is never loaded, so there is nothing to rewrite.
    tx.begin().unwrap();
    assert_eq!(tx.commit().unwrap(), None);
    assert_eq!(db.store().file_size(), size);
    assert_eq!(db.store().root(), root);
}

#[test]
fn last_commit_wins_between_handles_transactions() {
    let db = Db::in_memory(TxOptions::default()).unwrap();
    let mut first = db.begin_transaction().unwrap();
    let mut second = db.begin_transaction().unwrap();
    assert_ne!(first.id(), second.id());

    first.put(b"key", b"first").unwrap();
    second.put(b"key", b"second").unwrap();
    first.commit().unwrap();
    second.commit().unwrap();

    let mut reader = db.begin_transaction().unwrap();
    assert_eq!(reader.get(b"key").unwrap(), Some(&b"second"[..]));
}

#[test]
fn empty_transaction_builds_on_root_committed_after_begin() {
    let db = Db::in_memory(TxOptions::default()).unwrap();
    let mut late = db.begin_transaction().unwrap();
    let mut early = db.begin_transaction().unwrap();
    early.put(b"x", b"from early").unwrap();
    early.commit().unwrap();
    assert!(!db.store().is_empty());

    late.put(b"y", b"from late").unwrap();
    assert_eq!(late.get(b"x").unwrap(), Some(&b"from early"[..]));
    late.commit().unwrap();

    let mut reader = db.begin_transaction().unwrap();
    assert_eq!(reader.get(b"x").unwrap(), Some(&b"from early"[..]));
    assert_eq!(reader.get(b"y").unwrap(), Some(&b"from late"[..]));
}

#[test]
fn empty_transaction_reads_root_committed_after_begin() {
    let db = Db::in_memory(TxOptions::default()).unwrap();
    let mut reader = db.begin_transaction().unwrap();
    assert_eq!(reader.get(b"k").unwrap(), None);

    let mut writer = db.begin_transaction().unwrap();
    writer.put(b"k", b"v").unwrap();
    writer.commit().unwrap();
    assert_eq!(reader.get(b"k").unwrap(), Some(&b"v"[..]));
}

#[test]
fn metadata_survives_commit() {
    let io = Arc::new(MemFileIo::new());
    let options = TxOptions::default().with_meta_size(3).with_value_align(4);
    {
        let db = Db::with_io(io.clone(), options).unwrap();
        let mut tx = db.begin_transaction().unwrap();
        tx.put(b"key", b"value").unwrap();
        tx.commit().unwrap();
    }
    let db = Db::with_io(io, options).unwrap();
    let mut tx = db.begin_transaction().unwrap();
    assert_eq!(tx.get_meta(b"key").unwrap(), Some(&[0u8; 3][..]));
    tx.put(b"key", b"VALUE").unwrap();
    assert_eq!(tx.stats().in_place_updates(), 1);
}

#[test]
fn fixed_buffer_is_reclaimed_by_commit() {
    let db = Db::in_memory(TxOptions::fixed_buffer(64 * 1024)).unwrap();
    let mut tx = db.begin_transaction().unwrap();
    for round in 0..4u8 {
        for i in 0..8u8 {
            tx.put(&[b'k', round, i], &[i; 16]).unwrap();
        }
        assert!(tx.trie().allocator().used() > 0);
        tx.commit().unwrap();
        assert_eq!(tx.trie().allocator().used(), 0);
        tx.begin().unwrap();
    }
    assert_eq!(tx.get(&[b'k', 3, 7]).unwrap(), Some(&[7u8; 16][..]));
}
