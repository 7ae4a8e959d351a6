//! Property-Based Tests for the Notes Module
//!
//! Runs the same invariants against both note store implementations.

use proptest::prelude::*;
use uuid::Uuid;

use crate::notes::{MemoryNoteStore, NoteStore, SqliteNoteStore};

// == Strategies ==
fn text_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,64}"
}

#[derive(Debug, Clone)]
enum NoteOp {
    Create { text: String, expiration: u32 },
    Update { index: usize, text: String },
    Delete { index: usize },
    DeleteMissing,
}

fn note_op_strategy() -> impl Strategy<Value = NoteOp> {
    prop_oneof![
        (text_strategy(), 1u32..1000)
            .prop_map(|(text, expiration)| NoteOp::Create { text, expiration }),
        (any::<usize>(), text_strategy()).prop_map(|(index, text)| NoteOp::Update { index, text }),
        any::<usize>().prop_map(|index| NoteOp::Delete { index }),
        Just(NoteOp::DeleteMissing),
    ]
}

fn stores() -> Vec<Box<dyn NoteStore>> {
    vec![
        Box::new(MemoryNoteStore::new()),
        Box::new(SqliteNoteStore::open_in_memory().unwrap()),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    // Update only ever touches the text.
    #[test]
    fn prop_update_preserves_identity(
        text in text_strategy(),
        new_text in text_strategy(),
        expiration in 0u32..10_000
    ) {
        for store in stores() {
            let id = Uuid::new_v4();
            let before = store.create(id, text.clone(), expiration).unwrap();
            let after = store.update(id, new_text.clone()).unwrap().unwrap();

            prop_assert_eq!(after.id, before.id);
            prop_assert_eq!(after.expiration, before.expiration);
            prop_assert_eq!(after.created, before.created);
            prop_assert_eq!(&after.text, &new_text);
        }
    }

    // Any op sequence leaves the store agreeing with a simple model, and a
    // sweep with nothing expired changes nothing.
    #[test]
    fn prop_store_matches_model(ops in prop::collection::vec(note_op_strategy(), 1..40)) {
        for store in stores() {
            let mut model: Vec<(Uuid, String)> = Vec::new();

            for op in ops.clone() {
                match op {
                    NoteOp::Create { text, expiration } => {
                        let id = Uuid::new_v4();
                        store.create(id, text.clone(), expiration).unwrap();
                        model.push((id, text));
                    }
                    NoteOp::Update { index, text } if !model.is_empty() => {
                        let idx = index % model.len();
                        let id = model[idx].0;
                        prop_assert!(store.update(id, text.clone()).unwrap().is_some());
                        model[idx].1 = text;
                    }
                    NoteOp::Delete { index } if !model.is_empty() => {
                        let idx = index % model.len();
                        let (id, text) = model.remove(idx);
                        let removed = store.delete(id).unwrap().unwrap();
                        prop_assert_eq!(removed.text, text);
                    }
                    NoteOp::Update { .. } | NoteOp::Delete { .. } | NoteOp::DeleteMissing => {
                        prop_assert!(store.delete(Uuid::new_v4()).unwrap().is_none());
                    }
                }
            }

            let before = store.list().unwrap();
            prop_assert_eq!(store.clear_expired().unwrap(), 0);
            let after = store.list().unwrap();
            prop_assert_eq!(&before, &after);

            let mut stored: Vec<(Uuid, String)> =
                after.into_iter().map(|n| (n.id, n.text)).collect();
            let mut expected = model.clone();
            stored.sort();
            expected.sort();
            prop_assert_eq!(stored, expected);
        }
    }

    // Zero-minute notes are readable until the sweep and gone after it.
    #[test]
    fn prop_expired_notes_removed_by_sweep(
        texts in prop::collection::vec(text_strategy(), 1..10),
        live in prop::collection::vec(text_strategy(), 0..10)
    ) {
        for store in stores() {
            let dead_ids: Vec<Uuid> = texts
                .iter()
                .map(|t| {
                    let id = Uuid::new_v4();
                    store.create(id, t.clone(), 0).unwrap();
                    id
                })
                .collect();
            for t in &live {
                store.create(Uuid::new_v4(), t.clone(), 60).unwrap();
            }

            for id in &dead_ids {
                prop_assert!(store.get(*id).unwrap().is_some());
            }
            prop_assert_eq!(store.clear_expired().unwrap(), dead_ids.len());
            for id in &dead_ids {
                prop_assert!(store.get(*id).unwrap().is_none());
            }
            prop_assert_eq!(store.len().unwrap(), live.len());
        }
    }
}
