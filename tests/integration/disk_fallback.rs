#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use radixkv::primitives::io::{FileIo, MemFileIo};
use radixkv::storage::trie::ChildSlot;
use radixkv::{Db, RadixError, TxOptions};

const FRUIT: [(&str, &str); 6] = [
    ("apple", "red"),
    ("apricot", "orange"),
    ("avocado", "green"),
    ("banana", "yellow"),
    ("bandana", "cloth"),
    ("cherry", "dark red"),
];

fn seeded() -> (Arc<MemFileIo>, Db) {
    let io = Arc::new(MemFileIo::new());
    let db = Db::with_io(io.clone(), TxOptions::default()).unwrap();
    let mut tx = db.begin_transaction().unwrap();
    for (key, value) in FRUIT {
        tx.put(key.as_bytes(), value.as_bytes()).unwrap();
    }
    tx.commit().unwrap();
    (io, db)
}

#[test]
fn begin_does_not_touch_the_disk() {
    let (_, db) = seeded();
    let tx = db.begin_transaction().unwrap();
    assert!(matches!(tx.trie().root(), ChildSlot::OnDisk(_)));
    assert_eq!(tx.stats().node_loads(), 0);
}

#[test]
fn only_the_visited_path_is_loaded_and_only_once() {
    let (_, db) = seeded();
    let mut tx = db.begin_transaction().unwrap();

    tx.put(b"cherries", b"many").unwrap();
    let after_first = tx.stats().node_loads();
    // root and the "herry" leaf; the leaf is then split into three nodes
    assert_eq!(after_first, 2);
    assert_eq!(tx.trie().node_count(), 4);

    assert_eq!(tx.get(b"cherry").unwrap(), Some(&b"dark red"[..]));
    assert_eq!(tx.get(b"cherries").unwrap(), Some(&b"many"[..]));
    assert_eq!(tx.stats().node_loads(), after_first);

    assert_eq!(tx.get(b"banana").unwrap(), Some(&b"yellow"[..]));
    assert!(tx.stats().node_loads() > after_first);
}

#[test]
fn changes_on_top_of_loaded_nodes_persist() {
    let (io, db) = seeded();
    let mut tx = db.begin_transaction().unwrap();
    tx.put(b"ban", b"prefix of banana").unwrap();
    tx.put(b"apple", b"green apple").unwrap();
    tx.put(b"blueberry", b"blue").unwrap();
    tx.commit().unwrap();
    drop(db);

    let db = Db::with_io(io, TxOptions::default()).unwrap();
    let mut tx = db.begin_transaction().unwrap();
    for (key, value) in [
        ("ban", "prefix of banana"),
        ("apple", "green apple"),
        ("blueberry", "blue"),
        ("apricot", "orange"),
        ("avocado", "green"),
        ("banana", "yellow"),
        ("bandana", "cloth"),
        ("cherry", "dark red"),
    ] {
        assert_eq!(tx.get(key.as_bytes()).unwrap(), Some(value.as_bytes()), "{key}");
    }
    assert_eq!(tx.get(b"b").unwrap(), None);
}

#[test]
fn second_commit_only_appends_touched_nodes() {
    let (_, db) = seeded();
    let first_size = db.store().file_size();

    let mut tx = db.begin_transaction().unwrap();
    tx.put(b"cherry", b"DARK RED").unwrap();
    tx.commit().unwrap();
    let appended = db.store().file_size() - first_size;
    assert!(appended < first_size, "appended {appended} of {first_size}");
}

#[test]
fn damaged_record_surfaces_as_corruption() {
    let (io, db) = seeded();
    let root = db.store().root().unwrap();
    let mut byte = [0u8; 1];
    // flip a byte inside the root record body
    io.read_at(root.0 + 9, &mut byte).unwrap();
    io.write_at(root.0 + 9, &[byte[0] ^ 0x40]).unwrap();

    let mut tx = db.begin_transaction().unwrap();
    assert!(matches!(tx.get(b"apple"), Err(RadixError::Corruption(_))));
    assert!(matches!(tx.put(b"apple", b"x"), Err(RadixError::Corruption(_))));
}
