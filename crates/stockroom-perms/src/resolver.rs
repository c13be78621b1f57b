//! Permission resolution.
//!
//! A user's effective value for an operation is its own value unless that is
//! INHERIT; then the user's group is consulted, then that group's parent and
//! so on. The nearest non-INHERIT value wins. If the whole chain inherits,
//! the operation is denied.

use std::sync::Arc;

use stockroom_core::{BitValue, NodeId, PermissionSchema, PermissionSet};

use crate::error::{PermsError, Result};
use crate::groups::GroupTree;
use crate::principal::User;

/// Where an effective value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionSource {
    User,
    Group(NodeId),
    /// Nothing on the chain was set; implicit deny.
    Default,
}

/// Resolved value of one operation, for the permission editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectivePermission {
    pub permission: String,
    pub operation: String,
    /// Value stored on the principal itself.
    pub own: Option<bool>,
    pub granted: bool,
    pub source: PermissionSource,
}

/// Evaluates permissions against the shared catalog.
#[derive(Debug, Clone)]
pub struct PermissionResolver {
    schema: Arc<PermissionSchema>,
}

impl PermissionResolver {
    pub fn new(schema: Arc<PermissionSchema>) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &PermissionSchema {
        &self.schema
    }

    pub fn schema_arc(&self) -> Arc<PermissionSchema> {
        Arc::clone(&self.schema)
    }

    /// Value of `permission.operation` for `user`, following group inheritance.
    ///
    /// `None` means nothing on the chain decided.
    pub fn inherit(
        &self,
        user: &User,
        groups: &GroupTree,
        permission: &str,
        operation: &str,
    ) -> Result<Option<bool>> {
        Ok(self
            .resolve(user, groups, permission, operation)?
            .map(|(value, _)| value))
    }

    /// Value of `permission.operation` for a group and its ancestors.
    pub fn inherit_group(
        &self,
        group: NodeId,
        groups: &GroupTree,
        permission: &str,
        operation: &str,
    ) -> Result<Option<bool>> {
        let offset = i64::from(self.schema.resolve(permission, operation)?);
        for id in groups.chain(group)? {
            let set = groups.permissions(id)?;
            if let Some(value) = read(set, permission, offset, operation)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Final decision: INHERIT all the way up means deny.
    pub fn is_granted(
        &self,
        user: &User,
        groups: &GroupTree,
        permission: &str,
        operation: &str,
    ) -> Result<bool> {
        Ok(self
            .inherit(user, groups, permission, operation)?
            .unwrap_or(false))
    }

    /// Every operation of the catalog, resolved for `user`.
    pub fn effective_permissions(
        &self,
        user: &User,
        groups: &GroupTree,
    ) -> Result<Vec<EffectivePermission>> {
        let mut out = Vec::new();
        for category in self.schema.categories() {
            for op in category.operations() {
                let own = user
                    .permissions
                    .permission_value(category.name(), op.offset().into())?;
                let resolved = self.resolve(user, groups, category.name(), op.name())?;
                let (granted, source) = match resolved {
                    Some((value, source)) => (value, source),
                    None => (false, PermissionSource::Default),
                };
                out.push(EffectivePermission {
                    permission: category.name().to_string(),
                    operation: op.name().to_string(),
                    own,
                    granted,
                    source,
                });
            }
        }
        Ok(out)
    }

    fn resolve(
        &self,
        user: &User,
        groups: &GroupTree,
        permission: &str,
        operation: &str,
    ) -> Result<Option<(bool, PermissionSource)>> {
        let offset = i64::from(self.schema.resolve(permission, operation)?);

        if let Some(value) = read(&user.permissions, permission, offset, operation)? {
            return Ok(Some((value, PermissionSource::User)));
        }

        let Some(group) = user.group else {
            return Ok(None);
        };
        if !groups.contains(group) {
            return Err(PermsError::GroupNotFound(group));
        }

        for id in groups.chain(group)? {
            let set = groups.permissions(id)?;
            if let Some(value) = read(set, permission, offset, operation)? {
                return Ok(Some((value, PermissionSource::Group(id))));
            }
        }
        Ok(None)
    }
}

fn read(set: &PermissionSet, permission: &str, offset: i64, operation: &str) -> Result<Option<bool>> {
    let bits = set.bit_value(permission, offset)?;
    if bits == BitValue::Reserved {
        tracing::warn!(
            permission,
            operation,
            "reserved bit pattern found, treating as inherit"
        );
    }
    Ok(bits.as_permission())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_core::UserId;

    struct Setup {
        resolver: PermissionResolver,
        groups: GroupTree,
        admins: NodeId,
        staff: NodeId,
    }

    fn setup() -> Setup {
        let schema = Arc::new(PermissionSchema::builtin().unwrap());
        let mut groups = GroupTree::new();
        let admins = groups.add("admins", None, &schema).unwrap();
        let staff = groups.add("staff", Some(admins), &schema).unwrap();
        Setup {
            resolver: PermissionResolver::new(schema),
            groups,
            admins,
            staff,
        }
    }

    fn user(s: &Setup, group: Option<NodeId>) -> User {
        let mut user = User::new(UserId(7), "jdoe", s.resolver.schema());
        user.group = group;
        user
    }

    #[test]
    fn test_all_inherit_denies() {
        let s = setup();
        let u = user(&s, Some(s.staff));
        assert_eq!(s.resolver.inherit(&u, &s.groups, "parts", "read").unwrap(), None);
        assert!(!s.resolver.is_granted(&u, &s.groups, "parts", "read").unwrap());
    }

    #[test]
    fn test_nearest_ancestor_wins() {
        let mut s = setup();
        let schema = s.resolver.schema_arc();
        s.groups
            .permissions_mut(s.admins)
            .unwrap()
            .set_operation(&schema, "parts", "read", Some(true))
            .unwrap();
        let u = user(&s, Some(s.staff));
        assert!(s.resolver.is_granted(&u, &s.groups, "parts", "read").unwrap());

        s.groups
            .permissions_mut(s.staff)
            .unwrap()
            .set_operation(&schema, "parts", "read", Some(false))
            .unwrap();
        assert!(!s.resolver.is_granted(&u, &s.groups, "parts", "read").unwrap());
        assert_eq!(
            s.resolver
                .inherit_group(s.admins, &s.groups, "parts", "read")
                .unwrap(),
            Some(true)
        );
    }

    #[test]
    fn test_user_value_wins() {
        let mut s = setup();
        let schema = s.resolver.schema_arc();
        s.groups
            .permissions_mut(s.admins)
            .unwrap()
            .set_operation(&schema, "users", "read", Some(false))
            .unwrap();
        let mut u = user(&s, Some(s.staff));
        u.permissions
            .set_operation(&schema, "users", "read", Some(true))
            .unwrap();
        assert!(s.resolver.is_granted(&u, &s.groups, "users", "read").unwrap());
    }

    #[test]
    fn test_reserved_pattern_inherits() {
        let mut s = setup();
        let schema = s.resolver.schema_arc();
        let offset = i64::from(schema.resolve("parts", "read").unwrap());
        s.groups
            .permissions_mut(s.admins)
            .unwrap()
            .set_operation(&schema, "parts", "read", Some(true))
            .unwrap();
        let mut u = user(&s, Some(s.staff));
        u.permissions
            .set_bit_value("parts", offset, BitValue::Reserved)
            .unwrap();
        assert!(s.resolver.is_granted(&u, &s.groups, "parts", "read").unwrap());
    }

    #[test]
    fn test_unknown_permission() {
        let s = setup();
        let u = user(&s, None);
        assert!(s.resolver.is_granted(&u, &s.groups, "parts", "fly").is_err());
    }

    #[test]
    fn test_dangling_group() {
        let s = setup();
        let u = user(&s, Some(NodeId(99)));
        assert!(matches!(
            s.resolver.is_granted(&u, &s.groups, "parts", "read"),
            Err(PermsError::GroupNotFound(_))
        ));
    }

    #[test]
    fn test_effective_permissions_sources() {
        let mut s = setup();
        let schema = s.resolver.schema_arc();
        s.groups
            .permissions_mut(s.admins)
            .unwrap()
            .set_operation(&schema, "groups", "read", Some(true))
            .unwrap();
        let mut u = user(&s, Some(s.staff));
        u.permissions
            .set_operation(&schema, "users", "read", Some(false))
            .unwrap();

        let all = s.resolver.effective_permissions(&u, &s.groups).unwrap();
        let find = |p: &str, o: &str| {
            all.iter()
                .find(|e| e.permission == p && e.operation == o)
                .cloned()
                .unwrap()
        };

        let groups_read = find("groups", "read");
        assert!(groups_read.granted);
        assert_eq!(groups_read.source, PermissionSource::Group(s.admins));
        assert_eq!(groups_read.own, None);

        let users_read = find("users", "read");
        assert!(!users_read.granted);
        assert_eq!(users_read.source, PermissionSource::User);
        assert_eq!(users_read.own, Some(false));

        assert_eq!(find("parts", "edit").source, PermissionSource::Default);
    }
}
