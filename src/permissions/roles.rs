use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;

use super::error::UnknownRole;

/// Role
///
/// The closed set of canonical roles used as keys into the permission table.
/// No role can be created at runtime.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Role {
    Admin,
    Director,
    Auxiliar,
    Docente,
    Alumno,
    Tutor,
    AsesorPedagogico,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Admin,
        Role::Director,
        Role::Auxiliar,
        Role::Docente,
        Role::Alumno,
        Role::Tutor,
        Role::AsesorPedagogico,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Director => "director",
            Role::Auxiliar => "auxiliar",
            Role::Docente => "docente",
            Role::Alumno => "alumno",
            Role::Tutor => "tutor",
            Role::AsesorPedagogico => "asesor_pedagogico",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == value)
            .ok_or_else(|| UnknownRole(value.to_string()))
    }
}

/// RoleId
///
/// The output of role inference. Usually the identifier of a canonical `Role`, but
/// unrecognized labels pass through verbatim (lower-cased), so this stays an open
/// string. Looking up a non-canonical id in the permission table finds no entry,
/// which every query treats as denied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(transparent)]
#[ts(export)]
pub struct RoleId(String);

impl RoleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The canonical role this id names, if any.
    pub fn canonical(&self) -> Option<Role> {
        self.0.parse().ok()
    }
}

impl From<Role> for RoleId {
    fn from(role: Role) -> Self {
        Self(role.as_str().to_string())
    }
}

impl AsRef<str> for RoleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier produced by the compound "jefe" + "aux" rule. It has no table entry,
/// and under the current rule order it is never produced (see `INFERENCE_RULES`).
pub const JEFE_AUXILIARES: &str = "jefe_auxiliares";

struct InferenceRule {
    matches: fn(&str) -> bool,
    role: &'static str,
}

/// Ordered, first-match-wins. Predicates receive the lower-cased label.
///
/// Known ordering defect: the "jefe" + "aux" rule sits after the "auxil" rule, so any
/// label such as "jefe de auxiliares" is captured as `auxiliar` first. The order is
/// kept as is; changing it must be a deliberate, visible change.
const INFERENCE_RULES: &[InferenceRule] = &[
    InferenceRule {
        matches: |label: &str| label.contains("admin"),
        role: "admin",
    },
    InferenceRule {
        matches: |label: &str| label.contains("director"),
        role: "director",
    },
    InferenceRule {
        matches: |label: &str| label.contains("docen"),
        role: "docente",
    },
    InferenceRule {
        matches: |label: &str| label.contains("auxil"),
        role: "auxiliar",
    },
    InferenceRule {
        matches: |label: &str| label.contains("asesor"),
        role: "asesor_pedagogico",
    },
    InferenceRule {
        matches: |label: &str| label.contains("jefe") && label.contains("aux"),
        role: JEFE_AUXILIARES,
    },
    InferenceRule {
        matches: |label: &str| label.contains("tutor"),
        role: "tutor",
    },
    InferenceRule {
        matches: |label: &str| {
            label.contains("alum") || label.contains("estud") || label.contains("student")
        },
        role: "alumno",
    },
];

/// infer_role
///
/// Maps a free-text role label (display name, compound phrase, any casing) onto a
/// role identifier.
///
/// Returns `None` when the label is absent or empty. A label that matches no rule,
/// whitespace-only labels included, is returned lower-cased rather than rejected.
pub fn infer_role(label: Option<&str>) -> Option<RoleId> {
    let label = label.filter(|label| !label.is_empty())?;
    let lowered = label.to_lowercase();

    match INFERENCE_RULES.iter().find(|rule| (rule.matches)(&lowered)) {
        Some(rule) => Some(RoleId(rule.role.to_string())),
        None => {
            tracing::debug!(label = %label, "role label matched no inference rule, passing through");
            Some(RoleId(lowered))
        }
    }
}

// --- Raw Label Extraction ---

/// RoleObject
///
/// One element of the role array the identity provider attaches to a user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RoleObject {
    /// Descriptive name, e.g. "Docente Titular".
    #[serde(default, alias = "nombre", deserialize_with = "lenient::label")]
    pub name: Option<String>,
}

/// UserRecord
///
/// The user profile delivered by the identity provider. Any combination of the three
/// role-bearing fields may be present.
///
/// Deserialization never fails on the role fields: `null` reads as absent, numbers
/// and booleans are read as their text, and any other shape carries no label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserRecord {
    #[serde(default, deserialize_with = "lenient::role_objects")]
    pub roles: Vec<RoleObject>,
    /// Flat descriptive role name.
    #[serde(
        default,
        alias = "rol_nombre",
        deserialize_with = "lenient::label",
        skip_serializing_if = "Option::is_none"
    )]
    pub role_name: Option<String>,
    /// Generic role field.
    #[serde(
        default,
        alias = "rol",
        deserialize_with = "lenient::label",
        skip_serializing_if = "Option::is_none"
    )]
    pub role: Option<String>,
}

mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::RoleObject;

    pub fn label<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(scalar(Value::deserialize(deserializer)?))
    }

    /// Elements that are not objects keep their position but carry no name, so the
    /// first element still decides whether this source yields a label.
    pub fn role_objects<'de, D>(deserializer: D) -> Result<Vec<RoleObject>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Value::Array(items) = Value::deserialize(deserializer)? else {
            return Ok(Vec::new());
        };
        Ok(items
            .into_iter()
            .map(|item| serde_json::from_value(item).unwrap_or_default())
            .collect())
    }

    fn scalar(value: Value) -> Option<String> {
        match value {
            Value::String(text) => Some(text),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            _ => None,
        }
    }
}

/// RoleSource
///
/// The places a raw role label can come from, in extraction priority order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RoleSource<'a> {
    /// Only the first element's descriptive name is considered.
    RoleObjects(&'a [RoleObject]),
    DescriptiveName(&'a str),
    Generic(&'a str),
}

impl<'a> RoleSource<'a> {
    /// The non-empty label this source carries, if any.
    pub fn label(&self) -> Option<&'a str> {
        let label = match *self {
            RoleSource::RoleObjects(objects) => objects.first()?.name.as_deref()?,
            RoleSource::DescriptiveName(name) => name,
            RoleSource::Generic(role) => role,
        };
        (!label.is_empty()).then_some(label)
    }
}

impl UserRecord {
    /// The sources present on this record, highest priority first.
    pub fn role_sources(&self) -> Vec<RoleSource<'_>> {
        let mut sources = Vec::with_capacity(3);
        if !self.roles.is_empty() {
            sources.push(RoleSource::RoleObjects(&self.roles));
        }
        if let Some(name) = self.role_name.as_deref() {
            sources.push(RoleSource::DescriptiveName(name));
        }
        if let Some(role) = self.role.as_deref() {
            sources.push(RoleSource::Generic(role));
        }
        sources
    }

    /// First non-empty label across the sources.
    pub fn raw_role_label(&self) -> Option<&str> {
        self.role_sources()
            .into_iter()
            .find_map(|source| source.label())
    }

    pub fn infer_role(&self) -> Option<RoleId> {
        infer_role(self.raw_role_label())
    }
}
