use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    navigation::MenuItem,
    permissions::{Role, RoleId},
};

// --- Request Payloads (Input Schemas) ---

/// ResourceQuery
///
/// Input for POST /authorize/resource. `action` defaults to `list` when omitted.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ResourceQuery {
    #[schema(example = "usuarios")]
    pub resource: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "delete")]
    pub action: Option<String>,
}

/// RouteQuery
///
/// Input for POST /authorize/route.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RouteQuery {
    #[schema(example = "/calificaciones")]
    pub path: String,
}

/// MenuQuery
///
/// Input for POST /authorize/menu.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MenuQuery {
    #[schema(example = "rendimiento-hijos")]
    pub menu_id: String,
}

// --- Responses (Output Schemas) ---

/// AuthorizationDecision
///
/// Answer to a resource or menu query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AuthorizationDecision {
    pub allowed: bool,
}

/// InferredRole
///
/// Output of POST /roles/infer. `canonical` is absent when the label passed through
/// unrecognized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct InferredRole {
    pub raw_label: Option<String>,
    pub role: Option<RoleId>,
    pub canonical: Option<Role>,
}

/// SessionProfile
///
/// Output of GET /me: who the caller is and what navigation the SPA should offer.
#[derive(Debug, Clone, Serialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionProfile {
    pub id: Uuid,
    pub role: Option<RoleId>,
    pub canonical: Option<Role>,
    /// When the cached role was last resolved; absent when nothing is cached.
    pub role_resolved_at: Option<DateTime<Utc>>,
    pub routes: Vec<String>,
    pub menu: Vec<MenuItem>,
}
