//! End-to-end tests of the Inventory over both store backends.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use stockroom::core::{CoreError, NodeId, PermissionSet, StructuralNode, UserId};
use stockroom::store::{InsertResult, PermissionOwner, Result as StoreResult, StoreError};
use stockroom::{
    DeletePolicy, EntityKind, Inventory, InventoryConfig, InventoryError, MemoryStore,
    SqliteStore, Store, TreeMode, TreeViewNode, User,
};
use stockroom_testkit::{ElementFixture, PermissionFixture};

async fn seeded<S: Store>(store: S, config: InventoryConfig) -> (Inventory<S>, PermissionFixture, ElementFixture) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let perms = PermissionFixture::new();
    let elements = ElementFixture::new();
    perms.seed(&store).await.unwrap();
    elements.seed(&store).await.unwrap();
    let inventory = Inventory::open(store, config).await.unwrap();
    (inventory, perms, elements)
}

/// A [`MemoryStore`] whose group deletes can be made to fail.
#[derive(Default)]
struct FailingStore {
    inner: MemoryStore,
    fail_group_deletes: AtomicBool,
}

#[async_trait]
impl Store for FailingStore {
    async fn insert_element(&self, node: &StructuralNode) -> StoreResult<InsertResult> {
        self.inner.insert_element(node).await
    }

    async fn update_element(&self, node: &StructuralNode) -> StoreResult<()> {
        self.inner.update_element(node).await
    }

    async fn delete_element(&self, id: NodeId) -> StoreResult<bool> {
        self.inner.delete_element(id).await
    }

    async fn list_elements(&self, kind: Option<EntityKind>) -> StoreResult<Vec<StructuralNode>> {
        self.inner.list_elements(kind).await
    }

    async fn save_group(&self, node: &StructuralNode, permissions: &PermissionSet) -> StoreResult<()> {
        self.inner.save_group(node, permissions).await
    }

    async fn delete_group(&self, id: NodeId) -> StoreResult<bool> {
        if self.fail_group_deletes.load(Ordering::SeqCst) {
            return Err(StoreError::InvalidData(format!("cannot delete group {id}")));
        }
        self.inner.delete_group(id).await
    }

    async fn load_groups(&self) -> StoreResult<Vec<(StructuralNode, PermissionSet)>> {
        self.inner.load_groups().await
    }

    async fn save_user(&self, user: &User) -> StoreResult<()> {
        self.inner.save_user(user).await
    }

    async fn load_user(&self, id: UserId) -> StoreResult<Option<User>> {
        self.inner.load_user(id).await
    }

    async fn find_user_by_name(&self, name: &str) -> StoreResult<Option<User>> {
        self.inner.find_user_by_name(name).await
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        self.inner.list_users().await
    }

    async fn delete_user(&self, id: UserId) -> StoreResult<bool> {
        self.inner.delete_user(id).await
    }

    async fn save_permissions(&self, owner: PermissionOwner, set: &PermissionSet) -> StoreResult<()> {
        self.inner.save_permissions(owner, set).await
    }

    async fn load_permissions(&self, owner: PermissionOwner) -> StoreResult<Option<PermissionSet>> {
        self.inner.load_permissions(owner).await
    }
}

fn texts(nodes: &[TreeViewNode]) -> Vec<&str> {
    nodes.iter().map(|n| n.text.as_str()).collect()
}

#[tokio::test]
async fn test_open_loads_everything() {
    let (inv, f, e) = seeded(MemoryStore::new(), InventoryConfig::default()).await;

    assert_eq!(inv.elements().len(), e.hierarchy.len());
    assert_eq!(inv.groups().len(), 3);
    assert_eq!(inv.users().count(), 4);
    assert_eq!(inv.user_by_name("alice").map(|u| u.id), Some(f.alice.id));
    assert_eq!(
        inv.element_path(e.ceramic).unwrap(),
        "Passives → Capacitors → Ceramic"
    );
    assert_eq!(inv.money().format(1.5, None, 2).unwrap(), "1.50 EUR");
}

#[tokio::test]
async fn test_element_lifecycle() {
    let (mut inv, _, e) = seeded(MemoryStore::new(), InventoryConfig::default()).await;

    let smd_res = inv
        .create_element(EntityKind::Category, "SMD resistors", Some(e.resistors))
        .await
        .unwrap();
    assert_eq!(
        inv.element_path(smd_res).unwrap(),
        "Passives → Resistors → SMD resistors"
    );

    inv.move_element(smd_res, Some(e.ics)).await.unwrap();
    assert_eq!(inv.element(smd_res).unwrap().parent, Some(e.ics));

    inv.rename_element(smd_res, "Drivers").await.unwrap();
    assert_eq!(inv.element_path(smd_res).unwrap(), "ICs → Drivers");

    // The store saw every change.
    let stored = inv.store().list_elements(Some(EntityKind::Category)).await.unwrap();
    let node = stored.iter().find(|n| n.id == smd_res).unwrap();
    assert_eq!(node.name, "Drivers");
    assert_eq!(node.parent, Some(e.ics));
}

#[tokio::test]
async fn test_invalid_moves_leave_state_untouched() {
    let (mut inv, _, e) = seeded(MemoryStore::new(), InventoryConfig::default()).await;

    assert!(matches!(
        inv.move_element(e.passives, Some(e.ceramic)).await,
        Err(InventoryError::Core(CoreError::CycleDetected { .. }))
    ));
    assert!(matches!(
        inv.move_element(e.resistors, Some(e.smd)).await,
        Err(InventoryError::Core(CoreError::TypeMismatch { .. }))
    ));
    assert!(matches!(
        inv.create_element(EntityKind::Supplier, "Digikey", Some(e.passives)).await,
        Err(InventoryError::Core(CoreError::TypeMismatch { .. }))
    ));
    assert!(matches!(
        inv.create_element(EntityKind::Group, "staff", None).await,
        Err(InventoryError::InvalidOperation(_))
    ));

    assert_eq!(inv.element(e.passives).unwrap().parent, None);
    assert_eq!(inv.element(e.resistors).unwrap().parent, Some(e.passives));
    assert_eq!(inv.elements().len(), e.hierarchy.len());
}

#[tokio::test]
async fn test_delete_reassigns_children_by_default() {
    let (mut inv, _, e) = seeded(MemoryStore::new(), InventoryConfig::default()).await;

    let removed = inv.delete_element(e.capacitors).await.unwrap();
    assert_eq!(removed, vec![e.capacitors]);
    assert_eq!(inv.element_path(e.ceramic).unwrap(), "Passives → Ceramic");

    let stored = inv.store().list_elements(None).await.unwrap();
    assert!(stored.iter().all(|n| n.id != e.capacitors));
    let ceramic = stored.iter().find(|n| n.id == e.ceramic).unwrap();
    assert_eq!(ceramic.parent, Some(e.passives));
}

#[tokio::test]
async fn test_delete_cascade() {
    let config = InventoryConfig {
        delete_policy: DeletePolicy::Cascade,
        ..InventoryConfig::default()
    };
    let (mut inv, _, e) = seeded(MemoryStore::new(), config).await;

    let mut removed = inv.delete_element(e.passives).await.unwrap();
    removed.sort();
    let mut expected = vec![e.passives, e.resistors, e.capacitors, e.ceramic];
    expected.sort();
    assert_eq!(removed, expected);

    let categories = inv.store().list_elements(Some(EntityKind::Category)).await.unwrap();
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].id, e.ics);
}

#[tokio::test]
async fn test_element_tree_follows_mutations() {
    let (mut inv, _, e) = seeded(MemoryStore::new(), InventoryConfig::default()).await;

    let tree = inv.element_tree(EntityKind::Category, TreeMode::List).unwrap();
    assert_eq!(texts(&tree), vec!["ICs", "Passives"]);
    assert_eq!(texts(&tree[1].nodes), vec!["Capacitors", "Resistors"]);

    // Served from cache until something changes.
    inv.element_tree(EntityKind::Category, TreeMode::List).unwrap();
    assert_eq!(inv.cache_stats().hits, 1);

    inv.rename_element(e.ics, "Integrated circuits").await.unwrap();
    let tree = inv.element_tree(EntityKind::Category, TreeMode::List).unwrap();
    assert_eq!(texts(&tree), vec!["Integrated circuits", "Passives"]);

    let edit = inv.element_tree(EntityKind::Footprint, TreeMode::Edit).unwrap();
    assert_eq!(texts(&edit), vec!["New element", "SMD"]);
    assert_eq!(edit[0].href.as_deref(), Some("/en/footprint/new"));
}

#[tokio::test]
async fn test_resolution_through_groups() {
    let (mut inv, f, _) = seeded(MemoryStore::new(), InventoryConfig::default()).await;

    // alice inherits parts.read from everyone via editors
    assert!(inv.is_granted(f.alice.id, "parts", "read").unwrap());
    assert!(inv.is_granted(f.alice.id, "parts", "create").unwrap());
    assert!(!inv.is_granted(f.bob.id, "parts", "create").unwrap());
    assert!(!inv.is_granted(f.guest.id, "parts", "read").unwrap());

    // Nearest explicit value wins.
    inv.set_group_permission(f.editors, "parts", "read", Some(false))
        .await
        .unwrap();
    assert!(!inv.is_granted(f.alice.id, "parts", "read").unwrap());
    inv.set_user_permission(f.alice.id, "parts", "read", Some(true))
        .await
        .unwrap();
    assert!(inv.is_granted(f.alice.id, "parts", "read").unwrap());

    // Back to INHERIT on both: everyone's ALLOW shows through again.
    inv.set_user_permission(f.alice.id, "parts", "read", None).await.unwrap();
    inv.set_group_permission(f.editors, "parts", "read", None).await.unwrap();
    assert!(inv.is_granted(f.alice.id, "parts", "read").unwrap());

    assert!(matches!(
        inv.set_group_permission(f.editors, "parts", "fly", Some(true)).await,
        Err(InventoryError::Core(CoreError::UnknownPermission { .. }))
    ));
    assert!(matches!(
        inv.is_granted(stockroom::UserId(99), "parts", "read"),
        Err(InventoryError::UserNotFound(_))
    ));
}

#[tokio::test]
async fn test_tools_menu_per_principal() {
    let (mut inv, f, _) = seeded(MemoryStore::new(), InventoryConfig::default()).await;

    let anonymous = inv.tools_menu(None).unwrap();
    assert!(anonymous[0].nodes.is_empty());
    assert_eq!(texts(&anonymous[1].nodes), vec!["All parts"]);

    let alice = inv.tools_menu(Some(f.alice.id)).unwrap();
    assert_eq!(texts(&alice[0].nodes), vec!["Categories", "New part"]);

    let root = inv.tools_menu(Some(f.root.id)).unwrap();
    assert_eq!(root[0].nodes.len(), 10);
    assert_eq!(texts(&root[2].nodes), vec!["Users", "Groups"]);

    let bob = inv.tools_menu(Some(f.bob.id)).unwrap();
    assert!(bob[0].nodes.is_empty());

    // A group change reaches every member's menu.
    inv.set_group_permission(f.everyone, "parts", "create", Some(true))
        .await
        .unwrap();
    let bob = inv.tools_menu(Some(f.bob.id)).unwrap();
    assert_eq!(texts(&bob[0].nodes), vec!["New part"]);

    inv.set_user_permission(f.bob.id, "parts", "create", Some(false))
        .await
        .unwrap();
    let bob = inv.tools_menu(Some(f.bob.id)).unwrap();
    assert!(bob[0].nodes.is_empty());
}

#[tokio::test]
async fn test_user_and_group_management() {
    let (mut inv, f, _) = seeded(MemoryStore::new(), InventoryConfig::default()).await;

    assert!(matches!(
        inv.create_user("alice", None).await,
        Err(InventoryError::UserExists(_))
    ));

    let interns = inv.create_group("interns", Some(f.editors)).await.unwrap();
    let carol = inv.create_user("carol", Some(interns)).await.unwrap();
    assert!(inv.is_granted(carol, "parts", "create").unwrap());
    assert_eq!(inv.store().load_user(carol).await.unwrap().unwrap().group, Some(interns));

    // Deleting a group hands its members to the parent group.
    inv.delete_group(f.editors).await.unwrap();
    assert_eq!(inv.user(f.alice.id).unwrap().group, Some(f.everyone));
    assert_eq!(inv.groups().hierarchy().get(interns).unwrap().parent, Some(f.everyone));
    assert!(!inv.is_granted(f.alice.id, "parts", "create").unwrap());
    assert!(inv.is_granted(f.alice.id, "parts", "read").unwrap());

    inv.set_user_group(carol, None).await.unwrap();
    assert!(!inv.is_granted(carol, "parts", "read").unwrap());

    inv.delete_user(carol).await.unwrap();
    assert!(inv.user(carol).is_none());
    assert!(inv.store().load_user(carol).await.unwrap().is_none());
}

#[tokio::test]
async fn test_failed_group_delete_keeps_members() {
    let (mut inv, f, _) = seeded(FailingStore::default(), InventoryConfig::default()).await;
    inv.store().fail_group_deletes.store(true, Ordering::SeqCst);

    assert!(matches!(
        inv.delete_group(f.editors).await,
        Err(InventoryError::Store(_))
    ));
    assert_eq!(inv.groups().len(), 3);
    assert_eq!(inv.user(f.alice.id).unwrap().group, Some(f.editors));
    assert!(inv.is_granted(f.alice.id, "parts", "create").unwrap());

    inv.store().fail_group_deletes.store(false, Ordering::SeqCst);
    inv.delete_group(f.editors).await.unwrap();
    assert_eq!(inv.groups().len(), 2);
    assert_eq!(inv.user(f.alice.id).unwrap().group, Some(f.everyone));
}

#[tokio::test]
async fn test_sqlite_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stockroom.db");

    let (carol, resistors) = {
        let store = SqliteStore::open(&path).unwrap();
        let (mut inv, f, e) = seeded(store, InventoryConfig::default()).await;
        let carol = inv.create_user("carol", Some(f.everyone)).await.unwrap();
        inv.set_user_permission(carol, "parts", "read", Some(false))
            .await
            .unwrap();
        inv.rename_element(e.resistors, "Resistor networks").await.unwrap();
        (carol, e.resistors)
    };

    let inv = Inventory::open(SqliteStore::open(&path).unwrap(), InventoryConfig::default())
        .await
        .unwrap();
    assert_eq!(inv.user(carol).unwrap().name, "carol");
    assert!(!inv.is_granted(carol, "parts", "read").unwrap());
    assert_eq!(
        inv.element_path(resistors).unwrap(),
        "Passives → Resistor networks"
    );
}

#[tokio::test]
async fn test_snapshot_restores_into_fresh_store() {
    let (mut source, f, e) = seeded(MemoryStore::new(), InventoryConfig::default()).await;
    source
        .set_user_permission(f.bob.id, "parts", "delete", Some(true))
        .await
        .unwrap();
    let bytes = source.export_snapshot().unwrap();

    let target_store = SqliteStore::open_memory().unwrap();
    let mut target = Inventory::open(target_store, InventoryConfig::default())
        .await
        .unwrap();
    target
        .create_element(EntityKind::Currency, "USD", None)
        .await
        .unwrap();
    target.import_snapshot(&bytes).await.unwrap();

    assert_eq!(target.elements().len(), e.hierarchy.len());
    assert_eq!(
        target.element_path(e.ceramic).unwrap(),
        "Passives → Capacitors → Ceramic"
    );
    assert!(target.is_granted(f.bob.id, "parts", "delete").unwrap());
    assert!(target.is_granted(f.alice.id, "parts", "create").unwrap());
    assert_eq!(target.export_snapshot().unwrap(), bytes);

    // The store holds the imported state, not the old currency.
    let stored = target.store().list_elements(None).await.unwrap();
    assert_eq!(stored.len(), e.hierarchy.len());
    assert!(stored.iter().all(|n| n.kind != EntityKind::Currency));
}

#[tokio::test]
async fn test_bad_snapshot_is_rejected() {
    let (mut inv, _, e) = seeded(MemoryStore::new(), InventoryConfig::default()).await;

    assert!(matches!(
        inv.import_snapshot(b"not cbor").await,
        Err(InventoryError::Snapshot(_))
    ));
    assert_eq!(inv.elements().len(), e.hierarchy.len());
}
