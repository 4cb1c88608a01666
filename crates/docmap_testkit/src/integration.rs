//! Cross-crate integration test helpers.
//!
//! Checks that the diff engine, update application, the CBOR codec and the
//! unit of work agree with each other.

use docmap_codec::Document;
use docmap_core::{Config, CoreResult, DiffEngine, ShapeConflictPolicy, UpdateStatement};

/// Diff engine that replaces subtrees on shape changes, so any pair of
/// records can be diffed.
pub fn permissive_engine() -> DiffEngine {
    DiffEngine::new(&Config::new().shape_conflict(ShapeConflictPolicy::Replace))
}

/// Diffs `old` into `new`, applies the result to `old` and returns the
/// statement.
///
/// Panics if the applied record differs from `new` or if the statement does
/// not survive a CBOR round-trip.
pub fn assert_roundtrip(old: Option<&Document>, new: &Document) -> UpdateStatement {
    let statement = permissive_engine()
        .diff(old, new)
        .expect("Failed to diff records");

    let mut applied = old.cloned().unwrap_or_default();
    statement
        .apply(&mut applied)
        .expect("Failed to apply update");
    assert_eq!(
        &applied, new,
        "Applying {:?} to {:?} did not produce the new record",
        statement, old
    );

    let bytes = statement.encode().expect("Failed to encode update");
    let decoded = UpdateStatement::decode(&bytes).expect("Failed to decode update");
    assert_eq!(decoded, statement, "Update changed across CBOR round-trip");

    statement
}

/// Applies a statement to a copy of a record.
pub fn applied(record: &Document, statement: &UpdateStatement) -> CoreResult<Document> {
    let mut copy = record.clone();
    statement.apply(&mut copy)?;
    Ok(copy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{scenarios, Profile, TestContext};
    use crate::generators::{edited_pair_strategy, null_free_document_strategy, PropTestConfig};
    use docmap_codec::Value;
    use docmap_core::DocumentMapper;
    use proptest::prelude::*;

    #[test]
    fn mixed_scenario_roundtrips() {
        let statement = assert_roundtrip(Some(&scenarios::mixed_old()), &scenarios::mixed_new());
        assert_eq!(statement.len(), 4);
    }

    #[test]
    fn insert_roundtrips() {
        assert_roundtrip(None, &scenarios::nested());
    }

    #[test]
    fn identical_records_need_nothing() {
        let statement = assert_roundtrip(Some(&scenarios::nested()), &scenarios::nested());
        assert!(statement.is_empty());
    }

    #[test]
    fn diff_is_idempotent_after_apply() {
        let old = scenarios::mixed_old();
        let new = scenarios::mixed_new();
        let statement = permissive_engine().diff(Some(&old), &new).unwrap();
        let updated = applied(&old, &statement).unwrap();
        assert!(permissive_engine()
            .diff(Some(&updated), &new)
            .unwrap()
            .is_empty());
    }

    proptest! {
        #![proptest_config(PropTestConfig::default().to_proptest_config())]

        #[test]
        fn unrelated_records_roundtrip(
            old in null_free_document_strategy(),
            new in null_free_document_strategy(),
        ) {
            assert_roundtrip(Some(&old), &new);
        }

        #[test]
        fn edited_records_roundtrip((old, new) in edited_pair_strategy()) {
            assert_roundtrip(Some(&old), &new);
        }

        #[test]
        fn inserts_roundtrip(new in null_free_document_strategy()) {
            assert_roundtrip(None, &new);
        }
    }

    #[test]
    fn profile_lifecycle() {
        let mut ctx = TestContext::new();
        let mut profile = Profile::new("ada");
        profile.address.city = "London".into();
        profile.visit(1);

        ctx.uow.persist(&profile).unwrap();
        assert_eq!(ctx.uow.flush().unwrap().inserted, 1);
        profile.flushed();

        // nested change, array growth and two increments
        profile.address.zip = Some("N1".into());
        profile.tags.push("math".into());
        profile.visit(2);
        let pending = ctx.uow.pending_update(&profile).unwrap();
        assert_eq!(pending.set().unwrap()["address.zip"], Value::from("N1"));
        assert!(pending.push().unwrap().contains_key("tags"));
        assert!(pending.inc().unwrap().contains_key("visits"));

        ctx.uow.persist(&profile).unwrap();
        assert_eq!(ctx.uow.flush().unwrap().updated, 1);
        profile.flushed();

        let stored = ctx.stored(Profile::collection(), profile.id).unwrap();
        assert_eq!(stored["visits"], Value::Integer(3));
        assert_eq!(Profile::from_document(profile.id, &stored).unwrap(), profile);
        assert_eq!(ctx.uow.snapshots().get(&profile.id), Some(stored));

        // a later request loads and edits the same record
        let mut next = ctx.new_unit_of_work(&Config::default());
        let mut loaded: Profile = next.load(profile.id).unwrap();
        loaded.address.zip = None;
        loaded.tags.clear();
        next.persist(&loaded).unwrap();
        assert_eq!(next.flush().unwrap().updated, 1);

        let stored = ctx.stored(Profile::collection(), profile.id).unwrap();
        assert_eq!(stored["tags"], Value::Array(Vec::new()));
        assert!(stored["address"].get("zip").is_none());
        assert_eq!(stored["visits"], Value::Integer(3));
    }

    #[test]
    fn concurrent_increments_add_up() {
        let ctx = TestContext::new();
        let profile = Profile::keyed("shared");
        let mut first = ctx.new_unit_of_work(&Config::default());
        first.persist(&profile).unwrap();
        first.flush().unwrap();

        let mut a = ctx.new_unit_of_work(&Config::default());
        let mut b = ctx.new_unit_of_work(&Config::default());
        let mut pa: Profile = a.load(profile.id).unwrap();
        let mut pb: Profile = b.load(profile.id).unwrap();
        pa.visit(5);
        pb.visit(7);
        a.persist(&pa).unwrap();
        b.persist(&pb).unwrap();
        a.flush().unwrap();
        b.flush().unwrap();

        let stored = ctx.stored(Profile::collection(), profile.id).unwrap();
        assert_eq!(stored["visits"], Value::Integer(12));
    }

    #[test]
    fn expired_snapshot_rewrites_whole_record() {
        let config = Config::new().snapshot_ttl(std::time::Duration::ZERO);
        let mut ctx = TestContext::with_config(&config);
        let mut profile = Profile::new("ada");
        ctx.uow.persist(&profile).unwrap();
        ctx.uow.flush().unwrap();

        profile.name = "ada l".into();
        let pending = ctx.uow.pending_update(&profile).unwrap();
        let set = pending.set().unwrap();
        assert!(set.contains_key("name"));
        assert!(set.contains_key("visits"));
    }
}
