use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    str::FromStr,
};
use ts_rs::TS;
use utoipa::ToSchema;

use super::{
    error::{PermissionsError, UnknownAction},
    roles::Role,
};

/// Action
///
/// The five resource actions a role can be granted. `List` is the default when a
/// caller does not name one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Action {
    #[default]
    List,
    Show,
    Create,
    Edit,
    Delete,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::List,
        Action::Show,
        Action::Create,
        Action::Edit,
        Action::Delete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::List => "list",
            Action::Show => "show",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == value)
            .ok_or_else(|| UnknownAction(value.to_string()))
    }
}

/// ResourcePermissions
///
/// Five independent grants for one (role, resource) pair. No grant implies another:
/// `edit` without `show` is a legal record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ResourcePermissions {
    pub list: bool,
    pub show: bool,
    pub create: bool,
    pub edit: bool,
    pub delete: bool,
}

impl ResourcePermissions {
    pub const NONE: Self = Self {
        list: false,
        show: false,
        create: false,
        edit: false,
        delete: false,
    };

    pub const ALL: Self = Self {
        list: true,
        show: true,
        create: true,
        edit: true,
        delete: true,
    };

    pub const READ: Self = Self {
        list: true,
        show: true,
        ..Self::NONE
    };

    /// Returns a copy with `action` granted.
    pub const fn with(self, action: Action) -> Self {
        let mut granted = self;
        match action {
            Action::List => granted.list = true,
            Action::Show => granted.show = true,
            Action::Create => granted.create = true,
            Action::Edit => granted.edit = true,
            Action::Delete => granted.delete = true,
        }
        granted
    }

    /// Returns a copy with `action` revoked.
    pub const fn without(self, action: Action) -> Self {
        let mut revoked = self;
        match action {
            Action::List => revoked.list = false,
            Action::Show => revoked.show = false,
            Action::Create => revoked.create = false,
            Action::Edit => revoked.edit = false,
            Action::Delete => revoked.delete = false,
        }
        revoked
    }

    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::List => self.list,
            Action::Show => self.show,
            Action::Create => self.create,
            Action::Edit => self.edit,
            Action::Delete => self.delete,
        }
    }
}

/// RoleGrants
///
/// Everything one role may do: per-resource action grants, the exact route paths it
/// may navigate to, and the menu entries it may see. Anything absent is denied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct RoleGrants {
    pub resources: BTreeMap<String, ResourcePermissions>,
    #[schema(value_type = Vec<String>)]
    pub routes: BTreeSet<String>,
    #[schema(value_type = Vec<String>)]
    pub menu: BTreeSet<String>,
}

impl RoleGrants {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resource(mut self, name: &str, permissions: ResourcePermissions) -> Self {
        self.resources.insert(name.to_string(), permissions);
        self
    }

    pub fn routes<'a>(mut self, routes: impl IntoIterator<Item = &'a str>) -> Self {
        self.routes.extend(routes.into_iter().map(str::to_string));
        self
    }

    pub fn menu<'a>(mut self, items: impl IntoIterator<Item = &'a str>) -> Self {
        self.menu.extend(items.into_iter().map(str::to_string));
        self
    }

    pub fn allows_resource(&self, resource: &str, action: Action) -> bool {
        self.resources
            .get(resource)
            .is_some_and(|permissions| permissions.allows(action))
    }

    pub fn allows_route(&self, path: &str) -> bool {
        self.routes.contains(path)
    }

    pub fn allows_menu(&self, menu_id: &str) -> bool {
        self.menu.contains(menu_id)
    }
}

/// PermissionTable
///
/// Canonical role -> grants. Construction checks that every canonical role has an
/// entry, so a table that exists is complete; lookups by a non-canonical id simply
/// find nothing.
///
/// The JSON form is an object keyed by role id, and deserialization runs the same
/// completeness check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "BTreeMap<Role, RoleGrants>")]
pub struct PermissionTable(BTreeMap<Role, RoleGrants>);

impl TryFrom<BTreeMap<Role, RoleGrants>> for PermissionTable {
    type Error = PermissionsError;

    fn try_from(roles: BTreeMap<Role, RoleGrants>) -> Result<Self, Self::Error> {
        Self::new(roles)
    }
}

impl PermissionTable {
    pub fn new(roles: BTreeMap<Role, RoleGrants>) -> Result<Self, PermissionsError> {
        if let Some(missing) = Role::ALL.into_iter().find(|role| !roles.contains_key(role)) {
            return Err(PermissionsError::MissingRole(missing));
        }
        Ok(Self(roles))
    }

    /// The grants for `role`, or `None` when `role` is not a canonical role id.
    pub fn grants(&self, role: &str) -> Option<&RoleGrants> {
        let role: Role = role.parse().ok()?;
        self.0.get(&role)
    }

    pub fn roles(&self) -> impl Iterator<Item = (Role, &RoleGrants)> {
        self.0.iter().map(|(role, grants)| (*role, grants))
    }

    /// resource_allowed
    ///
    /// Whether `role` may perform `action` on `resource`. Unknown role or resource is
    /// denied.
    pub fn resource_allowed(&self, role: &str, resource: &str, action: Action) -> bool {
        self.grants(role)
            .is_some_and(|grants| grants.allows_resource(resource, action))
    }

    /// Same as `resource_allowed`, taking the action by name as it arrives from a
    /// client. `None` means `list`; an unknown action name is denied.
    pub fn resource_action_allowed(&self, role: &str, resource: &str, action: Option<&str>) -> bool {
        match action.map(str::parse::<Action>) {
            None => self.resource_allowed(role, resource, Action::default()),
            Some(Ok(action)) => self.resource_allowed(role, resource, action),
            Some(Err(_)) => false,
        }
    }

    /// route_allowed
    ///
    /// Exact string match against the role's route allow-list.
    pub fn route_allowed(&self, role: &str, path: &str) -> bool {
        self.grants(role).is_some_and(|grants| grants.allows_route(path))
    }

    /// menu_allowed
    ///
    /// Exact string match against the role's menu allow-list.
    pub fn menu_allowed(&self, role: &str, menu_id: &str) -> bool {
        self.grants(role)
            .is_some_and(|grants| grants.allows_menu(menu_id))
    }

    /// builtin
    ///
    /// The table shipped with the application.
    pub fn builtin() -> Self {
        use ResourcePermissions as P;

        const ALL_RESOURCES: [&str; 7] = [
            "usuarios",
            "asistencias",
            "materias",
            "cursos",
            "calificaciones",
            "roles",
            "notificaciones",
        ];
        const ALL_ROUTES: [&str; 13] = [
            "/",
            "/dashboard",
            "/usuarios",
            "/asistencias",
            "/materias",
            "/cursos",
            "/calificaciones",
            "/administracion/roles",
            "/notificaciones",
            "/perfil",
            "/rendimiento-hijos",
            "/mi-rendimiento",
            "/seguimiento-pedagogico",
        ];
        const ALL_MENU: [&str; 11] = [
            "dashboard",
            "usuarios",
            "asistencias",
            "materias",
            "cursos",
            "calificaciones",
            "roles",
            "notificaciones",
            "rendimiento-hijos",
            "mi-rendimiento",
            "seguimiento-pedagogico",
        ];

        let admin = ALL_RESOURCES
            .into_iter()
            .fold(RoleGrants::new(), |grants, resource| {
                grants.resource(resource, P::ALL)
            })
            .routes(ALL_ROUTES)
            .menu(ALL_MENU);

        let manage = P::ALL.without(Action::Delete);
        let director = RoleGrants::new()
            .resource("usuarios", manage)
            .resource("asistencias", P::READ)
            .resource("materias", manage)
            .resource("cursos", manage)
            .resource("calificaciones", P::READ)
            .resource("notificaciones", P::READ.with(Action::Create))
            .routes([
                "/",
                "/dashboard",
                "/usuarios",
                "/asistencias",
                "/materias",
                "/cursos",
                "/calificaciones",
                "/notificaciones",
                "/perfil",
                "/seguimiento-pedagogico",
            ])
            .menu([
                "dashboard",
                "usuarios",
                "asistencias",
                "materias",
                "cursos",
                "calificaciones",
                "notificaciones",
                "seguimiento-pedagogico",
            ]);

        // Attendance takers record and correct entries from the list view only.
        let auxiliar = RoleGrants::new()
            .resource(
                "asistencias",
                P::NONE
                    .with(Action::List)
                    .with(Action::Create)
                    .with(Action::Edit),
            )
            .resource("cursos", P::READ)
            .resource("usuarios", P::READ)
            .resource("notificaciones", P::READ)
            .routes([
                "/",
                "/dashboard",
                "/asistencias",
                "/cursos",
                "/usuarios",
                "/notificaciones",
                "/perfil",
            ])
            .menu([
                "dashboard",
                "asistencias",
                "cursos",
                "usuarios",
                "notificaciones",
            ]);

        let record = P::READ.with(Action::Create).with(Action::Edit);
        let docente = RoleGrants::new()
            .resource("asistencias", record)
            .resource("calificaciones", record)
            .resource("materias", P::READ)
            .resource("cursos", P::READ)
            .resource("notificaciones", P::READ)
            .routes([
                "/",
                "/dashboard",
                "/asistencias",
                "/calificaciones",
                "/materias",
                "/cursos",
                "/notificaciones",
                "/perfil",
            ])
            .menu([
                "dashboard",
                "asistencias",
                "calificaciones",
                "materias",
                "cursos",
                "notificaciones",
            ]);

        let alumno = RoleGrants::new()
            .resource("asistencias", P::READ)
            .resource("calificaciones", P::READ)
            .resource("materias", P::READ)
            .resource("notificaciones", P::READ)
            .routes([
                "/",
                "/dashboard",
                "/mi-rendimiento",
                "/materias",
                "/notificaciones",
                "/perfil",
            ])
            .menu(["dashboard", "mi-rendimiento", "materias", "notificaciones"]);

        let tutor = RoleGrants::new()
            .resource("asistencias", P::READ)
            .resource("calificaciones", P::READ)
            .resource("notificaciones", P::READ)
            .routes([
                "/",
                "/dashboard",
                "/rendimiento-hijos",
                "/notificaciones",
                "/perfil",
            ])
            .menu(["dashboard", "rendimiento-hijos", "notificaciones"]);

        let asesor_pedagogico = RoleGrants::new()
            .routes(["/", "/dashboard", "/seguimiento-pedagogico", "/perfil"])
            .menu(["dashboard", "seguimiento-pedagogico"]);

        Self(BTreeMap::from([
            (Role::Admin, admin),
            (Role::Director, director),
            (Role::Auxiliar, auxiliar),
            (Role::Docente, docente),
            (Role::Alumno, alumno),
            (Role::Tutor, tutor),
            (Role::AsesorPedagogico, asesor_pedagogico),
        ]))
    }
}
