use warehouse_auth::{Identity, Role};

/// Authenticated caller for a request (username + role from a verified token).
///
/// Inserted by the auth gate into the request's extensions; it never outlives
/// the request it was resolved for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityContext {
    identity: Identity,
}

impl IdentityContext {
    pub fn new(identity: Identity) -> Self {
        Self { identity }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn username(&self) -> &str {
        &self.identity.username
    }

    pub fn role(&self) -> Role {
        self.identity.role
    }
}
