//! `warehouse-auth`: identity, tokens and the role/permission policy.
//!
//! This crate is decoupled from HTTP and storage: callers pass in the current
//! time and receive plain values back.

pub mod authorize;
pub mod claims;
pub mod identity;
pub mod password;
pub mod permissions;
pub mod roles;
pub mod token;
pub mod user;

pub use authorize::{authorize, AuthzError};
pub use claims::{validate_claims, TokenClaims};
pub use identity::Identity;
pub use password::{hash_password, verify_password, PasswordError};
pub use permissions::{allows, Action, PermissionMatrix, PermissionSet, RolePermissions};
pub use roles::{Role, UnknownRole};
pub use token::{TokenError, TokenManager};
pub use user::{normalize_username, NewUser, RegistrationError, User, MIN_PASSWORD_LEN};
