#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use radixkv::{Db, RadixError, TxOptions};

fn seeded(options: TxOptions) -> Db {
    let db = Db::in_memory(options).unwrap();
    let mut tx = db.begin_transaction().unwrap();
    for key in ["prefix", "prepare", "present", "zebra"] {
        tx.put(key.as_bytes(), key.as_bytes()).unwrap();
    }
    tx.commit().unwrap();
    db
}

#[test]
fn failed_put_on_loaded_nodes_is_invisible_and_commit_still_works() {
    for nth in 1..=3 {
        let db = seeded(TxOptions::default());
        let mut tx = db.begin_transaction().unwrap();
        tx.put(b"zebra", b"striped horse").unwrap();
        assert_eq!(tx.get(b"prefix").unwrap(), Some(&b"prefix"[..]));
        let before = format!("{:?}", tx.trie());

        // below the 'p' edge "re" meets "a": head, rest and leaf are allocated
        tx.trie_mut().allocator_mut().fail_nth_allocation(nth);
        let err = tx.put(b"pa", b"new").unwrap_err();
        assert!(matches!(err, RadixError::OutOfMemory), "nth={nth}");
        assert_eq!(format!("{:?}", tx.trie()), before, "nth={nth}");
        assert_eq!(tx.stats().alloc_failures(), 1);

        tx.commit().unwrap();
        let mut reader = db.begin_transaction().unwrap();
        assert_eq!(reader.get(b"zebra").unwrap(), Some(&b"striped horse"[..]));
        assert_eq!(reader.get(b"prepare").unwrap(), Some(&b"prepare"[..]));
        assert_eq!(reader.get(b"pa").unwrap(), None);
    }
}

#[test]
fn dynamic_limit_rejects_growth_but_keeps_existing_data() {
    let db = Db::in_memory(TxOptions::limited(16 * 1024)).unwrap();
    let mut tx = db.begin_transaction().unwrap();
    let mut stored = Vec::new();
    let err = loop {
        let key = format!("key-{:04}", stored.len() * 7919 % 10_000);
        match tx.put(key.as_bytes(), b"v") {
            Ok(()) => stored.push(key),
            Err(err) => break err,
        }
        assert!(stored.len() < 10_000, "limit never reached");
    };
    assert!(matches!(err, RadixError::OutOfMemory));
    assert!(tx.trie().allocator().used() <= 16 * 1024);
    for key in &stored {
        assert_eq!(tx.get(key.as_bytes()).unwrap(), Some(&b"v"[..]), "{key}");
    }

    tx.commit().unwrap();
    let mut reader = db.begin_transaction().unwrap();
    assert_eq!(reader.get(stored[0].as_bytes()).unwrap(), Some(&b"v"[..]));
}

#[test]
fn rollback_after_failure_resets_the_budget() {
    let db = seeded(TxOptions::default());
    let mut tx = db.begin_transaction_with(&TxOptions::fixed_buffer(12 * 1024)).unwrap();
    let mut failed = false;
    for i in 0..64u8 {
        if tx.put(&[b'q', i, b'x'], b"value").is_err() {
            failed = true;
            break;
        }
    }
    assert!(failed);
    tx.rollback().unwrap();
    assert_eq!(tx.trie().allocator().used(), 0);

    tx.begin().unwrap();
    tx.put(b"small", b"fits").unwrap();
    assert_eq!(tx.get(b"small").unwrap(), Some(&b"fits"[..]));
}
