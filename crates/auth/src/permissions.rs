//! Static role → permission policy.
//!
//! The matrix is fixed at compile time and never mutated. Everything that needs
//! a permission decision goes through [`allows`] (or [`crate::authorize`]).

use serde::{Deserialize, Serialize};

use crate::Role;

/// Operation a caller may attempt against the inventory.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Update,
    Delete,
    View,
    ViewHistory,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Create,
        Action::Update,
        Action::Delete,
        Action::View,
        Action::ViewHistory,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::View => "view",
            Action::ViewHistory => "view_history",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capabilities granted to one role.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionSet {
    pub can_create: bool,
    pub can_update: bool,
    pub can_delete: bool,
    pub can_view: bool,
    pub can_view_history: bool,
}

impl PermissionSet {
    pub const fn allows(&self, action: Action) -> bool {
        match action {
            Action::Create => self.can_create,
            Action::Update => self.can_update,
            Action::Delete => self.can_delete,
            Action::View => self.can_view,
            Action::ViewHistory => self.can_view_history,
        }
    }
}

const ADMIN: PermissionSet = PermissionSet {
    can_create: true,
    can_update: true,
    can_delete: true,
    can_view: true,
    can_view_history: true,
};

const MANAGER: PermissionSet = PermissionSet {
    can_create: true,
    can_update: true,
    can_delete: false,
    can_view: true,
    can_view_history: true,
};

const VIEWER: PermissionSet = PermissionSet {
    can_create: false,
    can_update: false,
    can_delete: false,
    can_view: true,
    can_view_history: true,
};

impl Role {
    pub const fn permissions(&self) -> PermissionSet {
        match self {
            Role::Admin => ADMIN,
            Role::Manager => MANAGER,
            Role::Viewer => VIEWER,
        }
    }
}

/// Total over every (role, action) pair.
pub const fn allows(role: Role, action: Action) -> bool {
    role.permissions().allows(action)
}

/// One row of the matrix, shaped for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RolePermissions {
    pub role: Role,
    pub permissions: PermissionSet,
    pub actions: Vec<Action>,
}

/// Read-only view over the whole policy (for introspection endpoints).
pub struct PermissionMatrix;

impl PermissionMatrix {
    pub fn rows() -> Vec<RolePermissions> {
        Role::ALL
            .into_iter()
            .map(|role| RolePermissions {
                role,
                permissions: role.permissions(),
                actions: Action::ALL
                    .into_iter()
                    .filter(|a| allows(role, *a))
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_is_exhaustive_and_matches_policy() {
        use Action::*;

        let expected = [
            (Role::Admin, [true, true, true, true, true]),
            (Role::Manager, [true, true, false, true, true]),
            (Role::Viewer, [false, false, false, true, true]),
        ];

        for (role, row) in expected {
            for (action, want) in [Create, Update, Delete, View, ViewHistory].into_iter().zip(row) {
                assert_eq!(allows(role, action), want, "{role} / {action}");
            }
        }
    }

    #[test]
    fn every_role_can_view() {
        for role in Role::ALL {
            assert!(allows(role, Action::View));
            assert!(allows(role, Action::ViewHistory));
        }
    }

    #[test]
    fn only_admin_can_delete() {
        let deleters: Vec<Role> = Role::ALL
            .into_iter()
            .filter(|r| allows(*r, Action::Delete))
            .collect();
        assert_eq!(deleters, vec![Role::Admin]);
    }

    #[test]
    fn rows_list_allowed_actions() {
        let rows = PermissionMatrix::rows();
        assert_eq!(rows.len(), 3);
        let viewer = rows.iter().find(|r| r.role == Role::Viewer).unwrap();
        assert_eq!(viewer.actions, vec![Action::View, Action::ViewHistory]);
    }
}
