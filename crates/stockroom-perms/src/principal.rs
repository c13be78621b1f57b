//! Principals: users and groups.

use serde::{Deserialize, Serialize};

use stockroom_core::{NodeId, PermissionSchema, PermissionSet, StructuralNode, UserId};

/// A user account.
///
/// Permissions set on the user win over those of its group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Login name.
    pub name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    pub group: Option<NodeId>,
    pub permissions: PermissionSet,
}

impl User {
    /// Create a user with every permission on INHERIT.
    pub fn new(id: UserId, name: impl Into<String>, schema: &PermissionSchema) -> Self {
        Self {
            id,
            name: name.into(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            group: None,
            permissions: PermissionSet::for_schema(schema),
        }
    }

    pub fn with_names(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = first.into();
        self.last_name = last.into();
        self
    }

    pub fn with_group(mut self, group: NodeId) -> Self {
        self.group = Some(group);
        self
    }

    /// `"John Doe"`, or `"John Doe (jdoe)"` with the login name.
    pub fn full_name(&self, with_username: bool) -> String {
        let name = format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string();
        if with_username {
            format!("{} ({})", name, self.name)
        } else {
            name
        }
    }

    /// Id string as shown in the UI, e.g. `U000001`.
    pub fn id_string(&self) -> String {
        format!("U{:06}", self.id.0)
    }
}

/// Borrowed view of a group: its node in the group hierarchy plus its permissions.
#[derive(Debug, Clone, Copy)]
pub struct Group<'a> {
    pub node: &'a StructuralNode,
    pub permissions: &'a PermissionSet,
}

impl Group<'_> {
    pub fn id(&self) -> NodeId {
        self.node.id
    }

    pub fn name(&self) -> &str {
        &self.node.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name() {
        let schema = PermissionSchema::builtin().unwrap();
        let user = User::new(UserId(1), "username", &schema).with_names("John", "Doe");

        assert_eq!(user.full_name(false), "John Doe");
        assert_eq!(user.full_name(true), "John Doe (username)");
        assert_eq!(user.id_string(), "U000001");
    }

    #[test]
    fn test_new_user_inherits_everything() {
        let schema = PermissionSchema::builtin().unwrap();
        let user = User::new(UserId(2), "jane", &schema);
        assert_eq!(
            user.permissions.operation(&schema, "parts", "read").unwrap(),
            None
        );
        assert!(user.group.is_none());
    }
}
