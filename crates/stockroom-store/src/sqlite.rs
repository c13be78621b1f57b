//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled SQLite,
//! wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Transaction};

use stockroom_core::{EntityKind, NodeId, PermissionSet, StructuralNode, UserId};
use stockroom_perms::User;

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::{InsertResult, PermissionOwner, Store};

/// SQLite-based store.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` on the connection in a blocking task.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Poisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn sql_id(id: u64) -> Result<i64> {
    i64::try_from(id).map_err(|_| StoreError::InvalidData(format!("id {} out of range", id)))
}

fn from_sql_id(id: i64) -> Result<u64> {
    u64::try_from(id).map_err(|_| StoreError::InvalidData(format!("negative id {}", id)))
}

/// Raw columns of an `elements` or `user_groups` row.
type NodeRow = (i64, String, String, String, Option<i64>);

fn node_from_row(row: NodeRow) -> Result<StructuralNode> {
    let (id, kind, name, comment, parent) = row;
    let mut node = StructuralNode::new(NodeId(from_sql_id(id)?), kind.parse()?, name);
    node.comment = comment;
    node.parent = parent.map(from_sql_id).transpose()?.map(NodeId);
    Ok(node)
}

fn write_permissions(tx: &Transaction<'_>, owner: PermissionOwner, set: &PermissionSet) -> Result<()> {
    let owner_id = sql_id(owner.id())?;
    tx.execute(
        "DELETE FROM permissions WHERE owner_kind = ?1 AND owner_id = ?2",
        params![owner.kind(), owner_id],
    )?;
    let mut stmt = tx.prepare(
        "INSERT INTO permissions (owner_kind, owner_id, category, raw) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (category, raw) in set.raw_values() {
        stmt.execute(params![owner.kind(), owner_id, category, i64::from(raw)])?;
    }
    Ok(())
}

fn read_permissions(conn: &Connection, owner: PermissionOwner) -> Result<Option<PermissionSet>> {
    let mut stmt = conn.prepare(
        "SELECT category, raw FROM permissions
         WHERE owner_kind = ?1 AND owner_id = ?2 ORDER BY category",
    )?;
    let rows = stmt
        .query_map(params![owner.kind(), sql_id(owner.id())?], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    if rows.is_empty() {
        return Ok(None);
    }

    let mut values = Vec::with_capacity(rows.len());
    for (category, raw) in rows {
        let raw = u32::try_from(raw).map_err(|_| {
            StoreError::InvalidData(format!("permission value {} of {} out of range", raw, category))
        })?;
        values.push((category, raw));
    }
    let mut set = PermissionSet::with_categories(values.iter().map(|(c, _)| c.clone()));
    set.set_raw_values(values)?;
    Ok(Some(set))
}

const USER_COLUMNS: &str = "id, name, first_name, last_name, email, group_id";

type UserRow = (i64, String, String, String, String, Option<i64>);

fn user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn user_from_row(conn: &Connection, row: UserRow) -> Result<User> {
    let (id, name, first_name, last_name, email, group) = row;
    let id = UserId(from_sql_id(id)?);
    let permissions = read_permissions(conn, PermissionOwner::User(id))?.unwrap_or_default();
    Ok(User {
        id,
        name,
        first_name,
        last_name,
        email,
        group: group.map(from_sql_id).transpose()?.map(NodeId),
        permissions,
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_element(&self, node: &StructuralNode) -> Result<InsertResult> {
        if node.kind == EntityKind::Group {
            return Err(StoreError::InvalidData(format!(
                "{} is a group, use save_group",
                node.id
            )));
        }
        let node = node.clone();
        self.with_conn(move |conn| {
            let id = sql_id(node.id.0)?;
            let parent = node.parent.map(|p| sql_id(p.0)).transpose()?;
            let now = now_millis();
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO elements
                    (id, kind, name, comment, parent_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                params![id, node.kind.as_str(), node.name, node.comment, parent, now],
            )?;
            Ok(if inserted == 0 {
                InsertResult::AlreadyExists
            } else {
                InsertResult::Inserted
            })
        })
        .await
    }

    async fn update_element(&self, node: &StructuralNode) -> Result<()> {
        let node = node.clone();
        self.with_conn(move |conn| {
            let id = sql_id(node.id.0)?;
            let stored: Option<String> = conn
                .query_row("SELECT kind FROM elements WHERE id = ?1", params![id], |row| {
                    row.get(0)
                })
                .optional()?;
            match stored {
                None => return Err(StoreError::NotFound(format!("element {}", node.id))),
                Some(kind) if kind != node.kind.as_str() => {
                    return Err(StoreError::InvalidData(format!(
                        "{} is a {}, not a {}",
                        node.id, kind, node.kind
                    )))
                }
                Some(_) => {}
            }
            let parent = node.parent.map(|p| sql_id(p.0)).transpose()?;
            conn.execute(
                "UPDATE elements SET name = ?2, comment = ?3, parent_id = ?4, updated_at = ?5
                 WHERE id = ?1",
                params![id, node.name, node.comment, parent, now_millis()],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete_element(&self, id: NodeId) -> Result<bool> {
        self.with_conn(move |conn| {
            let deleted = conn.execute("DELETE FROM elements WHERE id = ?1", params![sql_id(id.0)?])?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn list_elements(&self, kind: Option<EntityKind>) -> Result<Vec<StructuralNode>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, kind, name, comment, parent_id FROM elements
                 WHERE ?1 IS NULL OR kind = ?1 ORDER BY id",
            )?;
            let rows = stmt
                .query_map(params![kind.map(|k| k.as_str())], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
                })?
                .collect::<std::result::Result<Vec<NodeRow>, _>>()?;
            rows.into_iter().map(node_from_row).collect()
        })
        .await
    }

    async fn save_group(&self, node: &StructuralNode, permissions: &PermissionSet) -> Result<()> {
        if node.kind != EntityKind::Group {
            return Err(StoreError::InvalidData(format!(
                "{} is a {}, not a group",
                node.id, node.kind
            )));
        }
        let node = node.clone();
        let permissions = permissions.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let parent = node.parent.map(|p| sql_id(p.0)).transpose()?;
            let now = now_millis();
            tx.execute(
                "INSERT INTO user_groups (id, name, comment, parent_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    comment = excluded.comment,
                    parent_id = excluded.parent_id,
                    updated_at = excluded.updated_at",
                params![sql_id(node.id.0)?, node.name, node.comment, parent, now],
            )?;
            write_permissions(&tx, PermissionOwner::Group(node.id), &permissions)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn delete_group(&self, id: NodeId) -> Result<bool> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let sql = sql_id(id.0)?;
            tx.execute(
                "DELETE FROM permissions WHERE owner_kind = 'group' AND owner_id = ?1",
                params![sql],
            )?;
            let deleted = tx.execute("DELETE FROM user_groups WHERE id = ?1", params![sql])?;
            tx.commit()?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn load_groups(&self) -> Result<Vec<(StructuralNode, PermissionSet)>> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, 'group', name, comment, parent_id FROM user_groups ORDER BY id",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
                })?
                .collect::<std::result::Result<Vec<NodeRow>, _>>()?;
            let mut out = Vec::with_capacity(rows.len());
            for row in rows {
                let node = node_from_row(row)?;
                let set = read_permissions(conn, PermissionOwner::Group(node.id))?.unwrap_or_default();
                out.push((node, set));
            }
            Ok(out)
        })
        .await
    }

    async fn save_user(&self, user: &User) -> Result<()> {
        let user = user.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let id = sql_id(user.id.0)?;
            let taken: Option<i64> = tx
                .query_row(
                    "SELECT id FROM users WHERE name = ?1 AND id <> ?2",
                    params![user.name, id],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(other) = taken {
                return Err(StoreError::InvalidData(format!(
                    "user name {:?} is taken by user {}",
                    user.name, other
                )));
            }
            let group = user.group.map(|g| sql_id(g.0)).transpose()?;
            tx.execute(
                "INSERT INTO users
                    (id, name, first_name, last_name, email, group_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    first_name = excluded.first_name,
                    last_name = excluded.last_name,
                    email = excluded.email,
                    group_id = excluded.group_id,
                    updated_at = excluded.updated_at",
                params![
                    id,
                    user.name,
                    user.first_name,
                    user.last_name,
                    user.email,
                    group,
                    now_millis()
                ],
            )?;
            write_permissions(&tx, PermissionOwner::User(user.id), &user.permissions)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn load_user(&self, id: UserId) -> Result<Option<User>> {
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
                    params![sql_id(id.0)?],
                    user_row,
                )
                .optional()?;
            row.map(|row| user_from_row(conn, row)).transpose()
        })
        .await
    }

    async fn find_user_by_name(&self, name: &str) -> Result<Option<User>> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {} FROM users WHERE name = ?1", USER_COLUMNS),
                    params![name],
                    user_row,
                )
                .optional()?;
            row.map(|row| user_from_row(conn, row)).transpose()
        })
        .await
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        self.with_conn(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS))?;
            let rows = stmt
                .query_map([], user_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.into_iter().map(|row| user_from_row(conn, row)).collect()
        })
        .await
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let sql = sql_id(id.0)?;
            tx.execute(
                "DELETE FROM permissions WHERE owner_kind = 'user' AND owner_id = ?1",
                params![sql],
            )?;
            let deleted = tx.execute("DELETE FROM users WHERE id = ?1", params![sql])?;
            tx.commit()?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn save_permissions(&self, owner: PermissionOwner, set: &PermissionSet) -> Result<()> {
        let set = set.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            write_permissions(&tx, owner, &set)?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn load_permissions(&self, owner: PermissionOwner) -> Result<Option<PermissionSet>> {
        self.with_conn(move |conn| read_permissions(conn, owner)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::StoreExt;
    use stockroom_core::{BitValue, PermissionSchema};

    #[tokio::test]
    async fn test_element_roundtrip() {
        let store = SqliteStore::open_memory().unwrap();
        let mut root = StructuralNode::new(NodeId(1), EntityKind::Storelocation, "Shelf");
        root.comment = "left wall".into();
        let bin = StructuralNode::new(NodeId(2), EntityKind::Storelocation, "Bin 4")
            .with_parent(NodeId(1));

        assert_eq!(store.insert_element(&root).await.unwrap(), InsertResult::Inserted);
        assert_eq!(store.insert_element(&bin).await.unwrap(), InsertResult::Inserted);
        assert_eq!(
            store.insert_element(&bin).await.unwrap(),
            InsertResult::AlreadyExists
        );

        let listed = store
            .list_elements(Some(EntityKind::Storelocation))
            .await
            .unwrap();
        assert_eq!(listed, vec![root.clone(), bin.clone()]);

        let mut renamed = bin.clone();
        renamed.name = "Bin 5".into();
        renamed.parent = None;
        store.update_element(&renamed).await.unwrap();
        let hierarchy = store.load_hierarchy().await.unwrap();
        assert!(hierarchy.is_root(NodeId(2)).unwrap());
        assert_eq!(hierarchy.get(NodeId(2)).unwrap().name, "Bin 5");

        assert!(store.delete_element(NodeId(2)).await.unwrap());
        assert!(!store.delete_element(NodeId(2)).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_rejects_kind_change() {
        let store = SqliteStore::open_memory().unwrap();
        let node = StructuralNode::new(NodeId(1), EntityKind::Footprint, "SOT-23");
        store.insert_element(&node).await.unwrap();

        let mut other = node.clone();
        other.kind = EntityKind::Manufacturer;
        assert!(matches!(
            store.update_element(&other).await,
            Err(StoreError::InvalidData(_))
        ));

        let missing = StructuralNode::new(NodeId(9), EntityKind::Footprint, "TO-92");
        assert!(matches!(
            store.update_element(&missing).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_permission_values_bit_exact() {
        let store = SqliteStore::open_memory().unwrap();
        let mut set = PermissionSet::with_categories(["parts", "users", "tools"]);
        set.set_raw_value("parts", u32::MAX).unwrap();
        set.set_raw_value("users", 0).unwrap();
        set.set_bit_value("tools", 30, BitValue::Reserved).unwrap();

        let owner = PermissionOwner::Group(NodeId(3));
        assert!(store.load_permissions(owner).await.unwrap().is_none());
        store.save_permissions(owner, &set).await.unwrap();
        assert_eq!(store.load_permissions(owner).await.unwrap(), Some(set));
    }

    #[tokio::test]
    async fn test_users_and_groups() {
        let schema = PermissionSchema::builtin().unwrap();
        let store = SqliteStore::open_memory().unwrap();

        let admins = StructuralNode::new(NodeId(1), EntityKind::Group, "admins");
        let mut perms = PermissionSet::for_schema(&schema);
        perms
            .set_operation(&schema, "parts", "read", Some(true))
            .unwrap();
        store.save_group(&admins, &perms).await.unwrap();

        let mut user = User::new(UserId(1), "jdoe", &schema)
            .with_names("John", "Doe")
            .with_group(NodeId(1));
        user.email = "jdoe@example.com".into();
        store.save_user(&user).await.unwrap();

        assert_eq!(store.load_user(UserId(1)).await.unwrap(), Some(user.clone()));
        assert_eq!(
            store.find_user_by_name("jdoe").await.unwrap().map(|u| u.id),
            Some(UserId(1))
        );
        assert!(store.find_user_by_name("nobody").await.unwrap().is_none());

        let clash = User::new(UserId(2), "jdoe", &schema);
        assert!(matches!(
            store.save_user(&clash).await,
            Err(StoreError::InvalidData(_))
        ));

        let tree = store.load_group_tree(&schema).await.unwrap();
        assert_eq!(
            tree.permissions(NodeId(1))
                .unwrap()
                .operation(&schema, "parts", "read")
                .unwrap(),
            Some(true)
        );
        assert_eq!(store.load_users(&schema).await.unwrap(), vec![user]);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stockroom.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            let node = StructuralNode::new(NodeId(7), EntityKind::Supplier, "Mouser");
            store.insert_element(&node).await.unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let elements = store.list_elements(None).await.unwrap();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].id_string(), "S000007");
    }
}
