//! Proptest generators for property-based testing.

use proptest::prelude::*;

use stockroom_core::{BitValue, EntityKind, Hierarchy, NodeId, PermissionSchema, PermissionSet};

/// Any two-bit value, including the reserved pattern.
pub fn bit_value() -> impl Strategy<Value = BitValue> {
    prop_oneof![
        Just(BitValue::Disallow),
        Just(BitValue::Allow),
        Just(BitValue::Inherit),
        Just(BitValue::Reserved),
    ]
}

/// Values a principal can hold for an operation.
pub fn permission_value() -> impl Strategy<Value = Option<bool>> {
    prop_oneof![Just(None), Just(Some(true)), Just(Some(false))]
}

/// A valid slot offset: even, `0..=30`.
pub fn bit_offset() -> impl Strategy<Value = i64> {
    (0i64..16).prop_map(|slot| slot * 2)
}

/// An offset that must be rejected: odd, negative or past the last slot.
pub fn invalid_offset() -> impl Strategy<Value = i64> {
    prop_oneof![
        (0i64..16).prop_map(|slot| slot * 2 + 1),
        i64::MIN..0,
        32i64..=i64::MAX,
    ]
}

/// A structural kind other than `Group`.
pub fn element_kind() -> impl Strategy<Value = EntityKind> {
    proptest::sample::select(
        EntityKind::ALL
            .iter()
            .copied()
            .filter(|k| *k != EntityKind::Group)
            .collect::<Vec<_>>(),
    )
}

/// A display name.
pub fn element_name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9 _-]{0,23}".prop_map(String::from)
}

/// A permission set over `schema` with arbitrary raw values in every
/// category.
pub fn permission_set(schema: &PermissionSchema) -> impl Strategy<Value = PermissionSet> {
    let names: Vec<String> = schema
        .categories()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    let base = PermissionSet::for_schema(schema);
    prop::collection::vec(any::<u32>(), names.len()).prop_map(move |raws| {
        let mut set = base.clone();
        for (name, raw) in names.iter().zip(raws) {
            set.set_raw_value(name, raw).expect("category from schema");
        }
        set
    })
}

/// A forest of one kind: node `i` hangs below node `parents[i]` when that
/// index is smaller than `i`, otherwise it is a root.
///
/// Returns the hierarchy and the ids in insertion order.
pub fn hierarchy(kind: EntityKind, max_nodes: usize) -> impl Strategy<Value = (Hierarchy, Vec<NodeId>)> {
    prop::collection::vec(any::<prop::sample::Index>(), 1..=max_nodes).prop_map(move |picks| {
        let mut h = Hierarchy::new();
        let mut ids: Vec<NodeId> = Vec::with_capacity(picks.len());
        for (i, pick) in picks.iter().enumerate() {
            let name = format!("{kind}-{i}");
            // Index into 0..=i, where i itself means "root".
            let parent = pick.index(i + 1);
            let id = if parent < i {
                h.insert_under(kind, name, ids[parent]).expect("same kind")
            } else {
                h.insert(kind, name)
            };
            ids.push(id);
        }
        (h, ids)
    })
}
