//! Permission middleware for the admin routes.
//!
//! The caller is identified by the configured user header. Its profile is
//! loaded, the role resolved, and the request either continues with the
//! [`UserProfile`] in its extensions or is answered with a 303 to the default
//! admin page.

use crate::{
    core::{
        access::{AccessGate, GateState, Permission},
        census::Section,
        directory::{UserProfile, load_profile},
    },
    http::{context::AppContext, response::redirect},
};
use axum::{
    extract::{Path, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

/// Middleware state for a route group that needs one fixed permission
#[derive(Clone)]
pub struct GuardState {
    /// Shared application state
    pub ctx: AppContext,
    /// Permission every route of the group needs
    pub permission: Permission,
}

/// Caller's user id from the configured header, if present and non-blank.
#[must_use]
pub fn caller_id<'h>(ctx: &AppContext, headers: &'h HeaderMap) -> Option<&'h str> {
    headers
        .get(ctx.config.access.user_header.as_str())
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

async fn admit(
    ctx: &AppContext,
    headers: &HeaderMap,
    required: Permission,
) -> Result<UserProfile, Response> {
    let profile = match caller_id(ctx, headers) {
        Some(id) => load_profile(&ctx.db, id)
            .await
            .map_err(IntoResponse::into_response)?,
        None => None,
    };

    let mut gate = AccessGate::new(required, ctx.config.access.default_page.as_str());
    match gate.resolve(profile) {
        GateState::Authorized(profile) => {
            debug!(user_id = %profile.id, permission = %required, "Access granted");
            Ok(profile.clone())
        }
        GateState::Unauthorized {
            redirect_to,
            notice,
        } => {
            warn!(permission = %required, "Access denied, redirecting to {}", redirect_to);
            Err(redirect(redirect_to, notice))
        }
        GateState::Loading => Err(redirect(
            &ctx.config.access.default_page,
            "Could not resolve your profile.",
        )),
    }
}

/// Admits requests whose caller holds the group's permission.
pub async fn require_permission(
    State(guard): State<GuardState>,
    mut request: Request,
    next: Next,
) -> Response {
    match admit(&guard.ctx, request.headers(), guard.permission).await {
        Ok(profile) => {
            request.extensions_mut().insert(profile);
            next.run(request).await
        }
        Err(denied) => denied,
    }
}

/// Admits requests whose caller holds the permission of the `{section}` path segment.
pub async fn require_section_permission(
    State(ctx): State<AppContext>,
    Path((_, section)): Path<(String, String)>,
    mut request: Request,
    next: Next,
) -> Response {
    let section = match section.parse::<Section>() {
        Ok(section) => section,
        Err(e) => return e.into_response(),
    };

    match admit(&ctx, request.headers(), Permission::for_section(section)).await {
        Ok(profile) => {
            request.extensions_mut().insert(profile);
            next.run(request).await
        }
        Err(denied) => denied,
    }
}
