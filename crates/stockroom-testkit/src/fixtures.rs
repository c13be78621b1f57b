//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use stockroom_core::{EntityKind, Hierarchy, NodeId, PermissionSchema, UserId};
use stockroom_perms::{GroupTree, PermissionResolver, User};
use stockroom_store::{Result as StoreResult, Store};

/// A small organisation: three groups and four users on the built-in catalog.
///
/// ```text
/// everyone        parts.read = ALLOW
/// └── editors     parts.create, parts.edit, categories.read = ALLOW
/// admins          every operation = ALLOW
/// ```
///
/// `alice` is an editor, `bob` is in `everyone`, `root` is an admin and
/// `guest` has no group.
pub struct PermissionFixture {
    pub schema: Arc<PermissionSchema>,
    pub resolver: PermissionResolver,
    pub groups: GroupTree,
    pub everyone: NodeId,
    pub editors: NodeId,
    pub admins: NodeId,
    pub alice: User,
    pub bob: User,
    pub root: User,
    pub guest: User,
}

impl PermissionFixture {
    pub fn new() -> Self {
        let schema = Arc::new(PermissionSchema::builtin().expect("builtin catalog"));
        let mut groups = GroupTree::new();

        let everyone = groups.add("everyone", None, &schema).expect("add group");
        let editors = groups
            .add("editors", Some(everyone), &schema)
            .expect("add group");
        let admins = groups.add("admins", None, &schema).expect("add group");

        allow(&mut groups, &schema, everyone, &[("parts", "read")]);
        allow(
            &mut groups,
            &schema,
            editors,
            &[("parts", "create"), ("parts", "edit"), ("categories", "read")],
        );
        let everything: Vec<(&str, &str)> = schema
            .categories()
            .iter()
            .flat_map(|c| c.operations().iter().map(move |op| (c.name(), op.name())))
            .collect();
        allow(&mut groups, &schema, admins, &everything);

        let alice = User::new(UserId(1), "alice", &schema)
            .with_names("Alice", "Smith")
            .with_group(editors);
        let bob = User::new(UserId(2), "bob", &schema).with_group(everyone);
        let root = User::new(UserId(3), "root", &schema).with_group(admins);
        let guest = User::new(UserId(4), "guest", &schema);

        Self {
            resolver: PermissionResolver::new(Arc::clone(&schema)),
            schema,
            groups,
            everyone,
            editors,
            admins,
            alice,
            bob,
            root,
            guest,
        }
    }

    pub fn users(&self) -> [&User; 4] {
        [&self.alice, &self.bob, &self.root, &self.guest]
    }

    /// Write every group and user of the fixture to `store`.
    pub async fn seed<S: Store + ?Sized>(&self, store: &S) -> StoreResult<()> {
        for group in self.groups.iter() {
            store.save_group(group.node, group.permissions).await?;
        }
        for user in self.users() {
            store.save_user(user).await?;
        }
        Ok(())
    }
}

impl Default for PermissionFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn allow(groups: &mut GroupTree, schema: &PermissionSchema, group: NodeId, ops: &[(&str, &str)]) {
    let set = groups.permissions_mut(group).expect("fixture group");
    for (permission, operation) in ops {
        set.set_operation(schema, permission, operation, Some(true))
            .expect("fixture operation");
    }
}

/// Elements of a few kinds:
///
/// ```text
/// category   Passives > Resistors, Capacitors > Ceramic; ICs
/// footprint  SMD > 0805, 0603
/// supplier   Mouser
/// ```
pub struct ElementFixture {
    pub hierarchy: Hierarchy,
    pub passives: NodeId,
    pub resistors: NodeId,
    pub capacitors: NodeId,
    pub ceramic: NodeId,
    pub ics: NodeId,
    pub smd: NodeId,
    pub mouser: NodeId,
}

impl ElementFixture {
    pub fn new() -> Self {
        let mut h = Hierarchy::new();
        let passives = h.insert(EntityKind::Category, "Passives");
        let resistors = h
            .insert_under(EntityKind::Category, "Resistors", passives)
            .expect("insert");
        let capacitors = h
            .insert_under(EntityKind::Category, "Capacitors", passives)
            .expect("insert");
        let ceramic = h
            .insert_under(EntityKind::Category, "Ceramic", capacitors)
            .expect("insert");
        let ics = h.insert(EntityKind::Category, "ICs");
        let smd = h.insert(EntityKind::Footprint, "SMD");
        h.insert_under(EntityKind::Footprint, "0805", smd)
            .expect("insert");
        h.insert_under(EntityKind::Footprint, "0603", smd)
            .expect("insert");
        let mouser = h.insert(EntityKind::Supplier, "Mouser");

        Self {
            hierarchy: h,
            passives,
            resistors,
            capacitors,
            ceramic,
            ics,
            smd,
            mouser,
        }
    }

    /// Write every element to `store`.
    pub async fn seed<S: Store + ?Sized>(&self, store: &S) -> StoreResult<()> {
        for node in self.hierarchy.iter() {
            store.insert_element(node).await?;
        }
        Ok(())
    }
}

impl Default for ElementFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_store::{MemoryStore, StoreExt};

    #[test]
    fn test_permission_fixture() {
        let f = PermissionFixture::new();
        let granted = |user: &User, p: &str, o: &str| f.resolver.is_granted(user, &f.groups, p, o).unwrap();

        assert!(granted(&f.alice, "parts", "read"));
        assert!(granted(&f.alice, "parts", "create"));
        assert!(!granted(&f.bob, "parts", "create"));
        assert!(granted(&f.root, "system", "show_logs"));
        assert!(!granted(&f.guest, "parts", "read"));
    }

    #[tokio::test]
    async fn test_seed_round_trip() {
        let f = PermissionFixture::new();
        let e = ElementFixture::new();
        let store = MemoryStore::new();
        f.seed(&store).await.unwrap();
        e.seed(&store).await.unwrap();

        let groups = store.load_group_tree(&f.schema).await.unwrap();
        assert_eq!(groups.len(), 3);
        assert_eq!(store.load_users(&f.schema).await.unwrap().len(), 4);

        let hierarchy = store.load_hierarchy().await.unwrap();
        assert_eq!(hierarchy.len(), e.hierarchy.len());
        assert_eq!(hierarchy.level(e.ceramic).unwrap(), 2);
    }
}
