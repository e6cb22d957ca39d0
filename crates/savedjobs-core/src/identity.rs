//! Active-user resolution
//!
//! The session layer owns authentication; this crate only needs to know who
//! is signed in right now so it can pick the storage partition.

use parking_lot::RwLock;

use crate::types::{PartitionKey, UserId};

/// Supplies the currently active user, if any
pub trait IdentityResolver: Send + Sync {
    fn current_user_id(&self) -> Option<UserId>;

    /// Partition for the active user (anonymous when nobody is signed in).
    fn partition(&self) -> PartitionKey {
        PartitionKey::for_user(self.current_user_id().as_ref())
    }
}

/// Identity fixed at construction time
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(Option<UserId>);

impl StaticIdentity {
    pub fn user(id: impl Into<String>) -> Self {
        Self(Some(UserId::new(id)))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityResolver for StaticIdentity {
    fn current_user_id(&self) -> Option<UserId> {
        self.0.clone()
    }
}

/// Identity that follows login and logout
#[derive(Debug, Default)]
pub struct SessionIdentity {
    current: RwLock<Option<UserId>>,
}

impl SessionIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn login(&self, user: UserId) {
        *self.current.write() = Some(user);
    }

    /// Clears the active user, returning who was signed in.
    pub fn logout(&self) -> Option<UserId> {
        self.current.write().take()
    }
}

impl IdentityResolver for SessionIdentity {
    fn current_user_id(&self) -> Option<UserId> {
        self.current.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_identity_partition() {
        assert_eq!(
            StaticIdentity::user("alice").partition(),
            PartitionKey::User(UserId::new("alice"))
        );
        assert_eq!(StaticIdentity::anonymous().partition(), PartitionKey::Anonymous);
    }

    #[test]
    fn test_session_identity_switches_partition() {
        let session = SessionIdentity::new();
        assert!(session.partition().is_anonymous());

        session.login(UserId::new("bob"));
        assert_eq!(session.partition(), PartitionKey::User(UserId::new("bob")));

        assert_eq!(session.logout(), Some(UserId::new("bob")));
        assert!(session.partition().is_anonymous());
    }
}
