//! The authorization seam consumed by menus and other views.

use stockroom_core::NodeId;

use crate::groups::GroupTree;
use crate::principal::User;
use crate::resolver::PermissionResolver;

/// Answers "may the current principal do this?" for one request.
pub trait Authorizer {
    /// Unknown permissions are denied, never surfaced as errors.
    fn is_granted(&self, permission: &str, operation: &str) -> bool;

    /// Key identifying everything the answers depend on.
    ///
    /// Two authorizers with the same key give the same answers.
    fn cache_key(&self) -> String;

    /// Invalidation tags for results computed with this authorizer.
    fn cache_tags(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Tag attached to cached results that depend on group `id`.
pub fn group_tag(id: NodeId) -> String {
    format!("group_{}", id.0)
}

/// Tag attached to cached results that depend on user `id`.
pub fn user_tag(id: stockroom_core::UserId) -> String {
    format!("user_{}", id.0)
}

/// Authorizer for a logged-in user.
pub struct UserAuthorizer<'a> {
    resolver: &'a PermissionResolver,
    groups: &'a GroupTree,
    user: &'a User,
}

impl<'a> UserAuthorizer<'a> {
    pub fn new(resolver: &'a PermissionResolver, groups: &'a GroupTree, user: &'a User) -> Self {
        Self {
            resolver,
            groups,
            user,
        }
    }

    pub fn user(&self) -> &User {
        self.user
    }

    fn group_chain(&self) -> Vec<NodeId> {
        self.user
            .group
            .and_then(|g| self.groups.chain(g).ok())
            .unwrap_or_default()
    }

    /// BLAKE3 over the group chain and every raw permission value on it.
    fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.user.id.0.to_le_bytes());
        for (category, raw) in self.user.permissions.raw_values() {
            hasher.update(category.as_bytes());
            hasher.update(&raw.to_le_bytes());
        }
        for id in self.group_chain() {
            hasher.update(b"group");
            hasher.update(&id.0.to_le_bytes());
            if let Ok(set) = self.groups.permissions(id) {
                for (category, raw) in set.raw_values() {
                    hasher.update(category.as_bytes());
                    hasher.update(&raw.to_le_bytes());
                }
            }
        }
        let hash = hasher.finalize();
        hex::encode(&hash.as_bytes()[..8])
    }
}

impl Authorizer for UserAuthorizer<'_> {
    fn is_granted(&self, permission: &str, operation: &str) -> bool {
        match self
            .resolver
            .is_granted(self.user, self.groups, permission, operation)
        {
            Ok(granted) => granted,
            Err(e) => {
                tracing::warn!(
                    user = %self.user.id,
                    permission,
                    operation,
                    error = %e,
                    "permission check failed, denying"
                );
                false
            }
        }
    }

    fn cache_key(&self) -> String {
        format!("user{}_{}", self.user.id.0, self.fingerprint())
    }

    fn cache_tags(&self) -> Vec<String> {
        let mut tags = vec![user_tag(self.user.id)];
        tags.extend(self.group_chain().into_iter().map(group_tag));
        tags
    }
}

/// Authorizer for requests without a session. Denies everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousAuthorizer;

impl Authorizer for AnonymousAuthorizer {
    fn is_granted(&self, _permission: &str, _operation: &str) -> bool {
        false
    }

    fn cache_key(&self) -> String {
        "anonymous".to_string()
    }
}
