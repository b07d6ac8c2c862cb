//! Role-based access control for the school administration screens.
//!
//! A raw role label from the identity provider goes through [`infer_role`], and the
//! resulting id is checked against a [`PermissionTable`] with one of three queries:
//! [`resource_allowed`], [`route_allowed`] or [`menu_allowed`]. Every gating decision
//! in the crate goes through these; nothing compares role strings directly.
//!
//! All queries are total. Unknown roles, resources, actions, routes and menu ids are
//! denied.

mod error;
mod roles;
mod store;
mod table;

use std::sync::LazyLock;

pub use error::{PermissionsError, UnknownAction, UnknownRole};
pub use roles::{JEFE_AUXILIARES, Role, RoleId, RoleObject, RoleSource, UserRecord, infer_role};
pub use store::{PermissionState, PermissionStore, load_table};
pub use table::{Action, PermissionTable, ResourcePermissions, RoleGrants};

static DEFAULT_TABLE: LazyLock<PermissionTable> = LazyLock::new(PermissionTable::builtin);

/// The built-in table. Built on first use and never mutated.
pub fn default_table() -> &'static PermissionTable {
    &DEFAULT_TABLE
}

pub fn resource_allowed(role: &str, resource: &str, action: Action) -> bool {
    DEFAULT_TABLE.resource_allowed(role, resource, action)
}

pub fn route_allowed(role: &str, path: &str) -> bool {
    DEFAULT_TABLE.route_allowed(role, path)
}

pub fn menu_allowed(role: &str, menu_id: &str) -> bool {
    DEFAULT_TABLE.menu_allowed(role, menu_id)
}
