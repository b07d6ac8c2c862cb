use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    permissions::{RoleId, UserRecord, infer_role},
    session::SessionState,
};

/// Claims
///
/// Payload expected inside the identity provider's JWT. The user's profile fields are
/// flattened into the token, so any of the three role-bearing shapes may appear.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's id, also the session store key.
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
    #[serde(flatten)]
    pub profile: UserRecord,
}

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request. `role` is `None` when nothing
/// usable was found; every authorization query then denies.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Option<RoleId>,
}

impl AuthUser {
    /// The role id to hand to the permission queries. An unresolved role becomes the
    /// empty id, which has no table entry.
    pub fn role_key(&self) -> &str {
        self.role.as_ref().map_or("", RoleId::as_str)
    }
}

/// AuthUser Extractor Implementation
///
/// 1. Local bypass (`Env::Local` only): `x-user-id` identifies the user; the role comes
///    from `x-user-role` (a raw label, inferred and cached) or from the session store.
/// 2. Otherwise a Bearer JWT is required. The role is inferred from the token's
///    profile fields, falling back to the cached session role.
///
/// An inferred role is saved to the session store only when it differs from the cached
/// one. Store failures are logged and do not fail the request. When the request
/// already carries an `AuthUser` extension, that identity is returned as is.
///
/// Rejection: `StatusCode::UNAUTHORIZED` on any authentication failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    SessionState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Already resolved by `auth_middleware` for this request.
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let sessions = SessionState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            if let Some(user) = local_bypass(parts, &sessions).await {
                return Ok(user);
            }
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(StatusCode::UNAUTHORIZED)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let claims = decode::<Claims>(token, &decoding_key, &validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "rejected bearer token");
                StatusCode::UNAUTHORIZED
            })?
            .claims;

        let role = match claims.profile.infer_role() {
            Some(role) => {
                remember_role(&sessions, claims.sub, &role).await;
                Some(role)
            }
            None => cached_role(&sessions, claims.sub).await,
        };

        Ok(AuthUser {
            id: claims.sub,
            role,
        })
    }
}

async fn local_bypass(parts: &Parts, sessions: &SessionState) -> Option<AuthUser> {
    let id = parts
        .headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value).ok())?;

    let label = parts
        .headers
        .get("x-user-role")
        .and_then(|value| value.to_str().ok());

    let role = match infer_role(label) {
        Some(role) => {
            remember_role(sessions, id, &role).await;
            role
        }
        None => cached_role(sessions, id).await?,
    };

    Some(AuthUser {
        id,
        role: Some(role),
    })
}

async fn remember_role(sessions: &SessionState, user_id: Uuid, role: &RoleId) {
    if cached_role(sessions, user_id).await.as_ref() == Some(role) {
        return;
    }
    if let Err(e) = sessions.save_role(user_id, role.clone()).await {
        tracing::error!(%user_id, error = %e, "failed to persist resolved role");
    }
}

async fn cached_role(sessions: &SessionState, user_id: Uuid) -> Option<RoleId> {
    sessions.load_role(user_id).await.unwrap_or_else(|e| {
        tracing::error!(%user_id, error = %e, "failed to load cached role");
        None
    })
}
