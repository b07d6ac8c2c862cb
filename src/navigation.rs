use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::permissions::PermissionTable;

/// Where the route guard sends a visitor without a resolved role.
pub const LOGIN_PATH: &str = "/login";

/// Landing routes tried, in order, when a role is turned away from a path.
const LANDING_PATHS: [&str; 2] = ["/dashboard", "/"];

/// MenuItem
///
/// One entry of the SPA's navigation menu. Visibility is decided by the menu
/// allow-list, independently of whether the role may open `path`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS, ToSchema)]
#[ts(export)]
pub struct MenuItem {
    pub id: &'static str,
    pub label: &'static str,
    pub path: &'static str,
}

/// Every menu entry the application knows about, in display order.
pub const MENU_CATALOG: [MenuItem; 11] = [
    MenuItem { id: "dashboard", label: "Panel", path: "/dashboard" },
    MenuItem { id: "usuarios", label: "Usuarios", path: "/usuarios" },
    MenuItem { id: "asistencias", label: "Asistencias", path: "/asistencias" },
    MenuItem { id: "materias", label: "Materias", path: "/materias" },
    MenuItem { id: "cursos", label: "Cursos", path: "/cursos" },
    MenuItem { id: "calificaciones", label: "Calificaciones", path: "/calificaciones" },
    MenuItem { id: "roles", label: "Roles", path: "/administracion/roles" },
    MenuItem { id: "notificaciones", label: "Notificaciones", path: "/notificaciones" },
    MenuItem { id: "rendimiento-hijos", label: "Rendimiento de mis hijos", path: "/rendimiento-hijos" },
    MenuItem { id: "mi-rendimiento", label: "Mi rendimiento", path: "/mi-rendimiento" },
    MenuItem { id: "seguimiento-pedagogico", label: "Seguimiento pedagógico", path: "/seguimiento-pedagogico" },
];

/// The catalog entries `role` may see.
pub fn visible_menu(table: &PermissionTable, role: &str) -> Vec<MenuItem> {
    MENU_CATALOG
        .into_iter()
        .filter(|item| table.menu_allowed(role, item.id))
        .collect()
}

/// RouteDecision
///
/// Outcome of a navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(tag = "decision", rename_all = "snake_case")]
#[ts(export)]
pub enum RouteDecision {
    Allow,
    Redirect { to: String },
}

/// guard_route
///
/// Lets the navigation through when the route allow-list contains `path`. Otherwise
/// redirects to the first landing route the role may open, or to the login page
/// when there is no role or the role may open none of them.
pub fn guard_route(table: &PermissionTable, role: Option<&str>, path: &str) -> RouteDecision {
    let Some(role) = role else {
        return RouteDecision::Redirect {
            to: LOGIN_PATH.to_string(),
        };
    };

    if table.route_allowed(role, path) {
        return RouteDecision::Allow;
    }

    let to = LANDING_PATHS
        .into_iter()
        .find(|landing| table.route_allowed(role, landing))
        .unwrap_or(LOGIN_PATH);

    tracing::debug!(role, path, redirect = to, "navigation denied");
    RouteDecision::Redirect { to: to.to_string() }
}
