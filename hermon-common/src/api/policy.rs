//! Access policy
//!
//! Every authorization decision goes through [`evaluate`]. Callers build a
//! [`Principal`] from the current stored user record (role is re-read on
//! every check) and ask for a [`Capability`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Invalid role: {}", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named admin capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ManageSongs,
    ManageUsers,
    ManagePlaylists,
    ViewActivities,
    ManageSettings,
}

impl Permission {
    pub const ALL: [Permission; 5] = [
        Permission::ManageSongs,
        Permission::ManageUsers,
        Permission::ManagePlaylists,
        Permission::ViewActivities,
        Permission::ManageSettings,
    ];

    /// Key used in the stored permissions map
    pub fn key(&self) -> &'static str {
        match self {
            Permission::ManageSongs => "manageSongs",
            Permission::ManageUsers => "manageUsers",
            Permission::ManagePlaylists => "managePlaylists",
            Permission::ViewActivities => "viewActivities",
            Permission::ManageSettings => "manageSettings",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Stored permission flags keyed by [`Permission::key`]
pub type Permissions = BTreeMap<String, bool>;

/// Full permission set granted on promotion when none is supplied
pub fn all_permissions() -> Permissions {
    Permission::ALL
        .iter()
        .map(|p| (p.key().to_string(), true))
        .collect()
}

/// The caller as seen by the policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
    pub permissions: Permissions,
}

impl Principal {
    fn has(&self, permission: Permission) -> bool {
        self.permissions.get(permission.key()).copied().unwrap_or(false)
    }
}

/// What a route requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Admin,
    Permission(Permission),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Decide whether `principal` holds `capability`
///
/// Permissions are only meaningful for admins: a plain user with a
/// permission flag set is still denied.
pub fn evaluate(principal: &Principal, capability: &Capability) -> Decision {
    if principal.role != Role::Admin {
        return Decision::Deny("Access denied. Admin privileges required.".to_string());
    }

    match capability {
        Capability::Admin => Decision::Allow,
        Capability::Permission(permission) if principal.has(*permission) => Decision::Allow,
        Capability::Permission(permission) => Decision::Deny(format!(
            "Access denied. Permission '{}' required.",
            permission
        )),
    }
}
