//! HTTP surface of the census service.
//!
//! Public routes serve the census form and the home page; everything under
//! `/api/admin` sits behind the permission guard.

/// Guarded admin handlers
pub mod admin;
/// Public census form and home page handlers
pub mod census;
/// Shared request state
pub mod context;
/// Permission middleware
pub mod guard;
/// Request span middleware
pub mod request_log;
/// Error to response mapping
pub mod response;

pub use context::AppContext;

use crate::core::access::Permission;
use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
};
use guard::{GuardState, require_permission, require_section_permission};

/// Builds the full router over `ctx`.
pub fn build_router(ctx: AppContext) -> Router {
    let guarded = |permission| {
        from_fn_with_state(
            GuardState {
                ctx: ctx.clone(),
                permission,
            },
            require_permission,
        )
    };

    let general = Router::new()
        .route("/api/admin/dashboard", get(admin::dashboard))
        .route("/api/admin/submissions/:id", get(admin::submission_detail))
        .route("/api/admin/schools", get(admin::list_schools))
        .route("/api/admin/schools/import", post(admin::import_schools))
        .route("/api/admin/professionals", get(admin::list_professionals))
        .route("/api/admin/settings/home", put(admin::save_home_page))
        .route(
            "/api/admin/settings/form-schema",
            get(admin::get_form_schema).put(admin::save_form_schema),
        )
        .route_layer(guarded(Permission::General));

    let professionals = Router::new()
        .route(
            "/api/admin/professionals/import",
            post(admin::import_professionals),
        )
        .route_layer(guarded(Permission::Professionals));

    let users = Router::new()
        .route("/api/admin/roles", get(admin::list_roles).post(admin::save_role))
        .route("/api/admin/roles/:id", delete(admin::delete_role))
        .route("/api/admin/users", get(admin::list_users).post(admin::save_user))
        .route("/api/admin/users/:id", delete(admin::delete_user))
        .route_layer(guarded(Permission::Users));

    let sections = Router::new()
        .route(
            "/api/admin/submissions/:id/sections/:section",
            put(admin::update_section_status),
        )
        .route_layer(from_fn_with_state(ctx.clone(), require_section_permission));

    Router::new()
        .route("/healthz", get(census::healthz))
        .route("/api/census/form", get(census::census_form))
        .route("/api/census/submissions", post(census::submit_census))
        .route("/api/settings/home", get(census::home_page))
        .merge(general)
        .merge(professionals)
        .merge(users)
        .merge(sections)
        .layer(from_fn(request_log::trace_requests))
        .with_state(ctx)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::config::AppConfig;
    use crate::core::{
        census::Section,
        directory::{self, RoleInput, UserInput},
        local_cache::temp_cache,
    };
    use crate::errors::Result;
    use crate::test_utils::{create_test_school, create_test_submission, sample_draft, setup_test_db};
    use axum::{
        body::Body,
        http::{Request, Response, StatusCode, header},
    };
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    async fn test_context() -> Result<AppContext> {
        let db = setup_test_db().await?;
        let mut config = AppConfig::default();
        config.storage.local_cache_dir = temp_cache("http").dir().to_path_buf();
        AppContext::new(config, db).await
    }

    /// Creates a role with `permissions` and a user holding it.
    async fn grant(ctx: &AppContext, user_id: &str, permissions: &[Permission]) -> Result<()> {
        let role = directory::save_role(
            &ctx.db,
            &ctx.hub,
            RoleInput {
                id: Some(format!("role-{user_id}")),
                name: format!("Role of {user_id}"),
                permissions: permissions.to_vec(),
            },
        )
        .await?;
        directory::save_user(
            &ctx.db,
            &ctx.hub,
            UserInput {
                id: user_id.to_string(),
                name: user_id.to_string(),
                email: format!("{user_id}@semed.gov.br"),
                role_id: Some(role.id),
            },
        )
        .await?;
        Ok(())
    }

    fn request(method: &str, uri: &str, user: Option<&str>, body: Option<String>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(ctx: &AppContext, req: Request<Body>) -> Response<Body> {
        build_router(ctx.clone()).oneshot(req).await.unwrap()
    }

    async fn json_body(resp: Response<Body>) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_healthz() -> Result<()> {
        let ctx = test_context().await?;
        let resp = send(&ctx, request("GET", "/healthz", None, None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn test_census_form_is_blank() -> Result<()> {
        let ctx = test_context().await?;
        create_test_school(&ctx.db, "1", "Escola A").await?;

        let resp = send(&ctx, request("GET", "/api/census/form", None, None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["draft"]["classrooms"].as_array().unwrap().len(), 1);
        assert_eq!(body["draft"]["teaching_modalities"].as_array().unwrap().len(), 1);
        assert_eq!(body["schools"][0]["name"], "Escola A");
        assert!(body["warning"].is_null());
        Ok(())
    }

    #[tokio::test]
    async fn test_submit_records_caller_or_anonymous() -> Result<()> {
        let ctx = test_context().await?;
        create_test_school(&ctx.db, "1", "Escola A").await?;
        let draft = serde_json::to_string(&sample_draft("1"))?;

        let resp = send(
            &ctx,
            request("POST", "/api/census/submissions", Some("u-42"), Some(draft.clone())),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = json_body(resp).await;
        assert_eq!(body["submission"]["submitted_by"], "u-42");
        assert_eq!(body["draft"]["school_id"], "");

        let resp = send(
            &ctx,
            request("POST", "/api/census/submissions", None, Some(draft)),
        )
        .await;
        let body = json_body(resp).await;
        assert_eq!(body["submission"]["submitted_by"], "anonymous");
        Ok(())
    }

    #[tokio::test]
    async fn test_submit_invalid_draft_is_bad_request() -> Result<()> {
        let ctx = test_context().await?;
        let mut draft = sample_draft("1");
        draft.classrooms[0].name = String::new();

        let resp = send(
            &ctx,
            request(
                "POST",
                "/api/census/submissions",
                None,
                Some(serde_json::to_string(&draft)?),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        assert_eq!(body["error"]["kind"], "validation");
        assert_eq!(body["error"]["retryable"], false);
        Ok(())
    }

    #[tokio::test]
    async fn test_guard_redirects() -> Result<()> {
        let ctx = test_context().await?;
        grant(&ctx, "viewer", &[Permission::Technology]).await?;

        for user in [None, Some("stranger"), Some("viewer")] {
            let resp = send(&ctx, request("GET", "/api/admin/dashboard", user, None)).await;
            assert_eq!(resp.status(), StatusCode::SEE_OTHER);
            assert_eq!(resp.headers()[header::LOCATION], "/admin");
            let body = json_body(resp).await;
            assert!(body["redirect"]["notice"].as_str().unwrap().contains("general"));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_dashboard_for_general_permission() -> Result<()> {
        let ctx = test_context().await?;
        grant(&ctx, "admin", &[Permission::General]).await?;
        create_test_school(&ctx.db, "1", "Escola Aurora").await?;
        create_test_submission(&ctx.db, "1").await?;

        let resp = send(
            &ctx,
            request("GET", "/api/admin/dashboard?q=aurora", Some("admin"), None),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["metrics"]["total_schools"], 1);
        assert_eq!(body["rows"].as_array().unwrap().len(), 1);
        assert_eq!(body["query"], "aurora");
        Ok(())
    }

    #[tokio::test]
    async fn test_section_update_needs_that_section() -> Result<()> {
        let ctx = test_context().await?;
        grant(&ctx, "infra", &[Permission::Infrastructure]).await?;
        create_test_school(&ctx.db, "1", "Escola A").await?;
        let stored = create_test_submission(&ctx.db, "1").await?;
        let body = r#"{"status":"completed"}"#.to_string();

        let uri = format!("/api/admin/submissions/{}/sections/maintenance", stored.id);
        let resp = send(&ctx, request("PUT", &uri, Some("infra"), Some(body.clone()))).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);

        let uri = format!("/api/admin/submissions/{}/sections/infrastructure", stored.id);
        let resp = send(&ctx, request("PUT", &uri, Some("infra"), Some(body.clone()))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let updated = json_body(resp).await;
        assert_eq!(
            updated["section_statuses"][Section::Infrastructure.as_str()],
            "completed"
        );

        let uri = format!("/api/admin/submissions/{}/sections/library", stored.id);
        let resp = send(&ctx, request("PUT", &uri, Some("infra"), Some(body))).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn test_school_import_errors_and_round_trip() -> Result<()> {
        let ctx = test_context().await?;
        grant(&ctx, "admin", &[Permission::General]).await?;

        let resp = send(
            &ctx,
            request("POST", "/api/admin/schools/import", Some("admin"), Some("{}".to_string())),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["error"]["kind"], "invalid_json");

        let rejected = r#"[{"UNIDADE EDUCACIONAL":"A","INEP":"1"},{"INEP":"2"}]"#.to_string();
        let resp = send(
            &ctx,
            request("POST", "/api/admin/schools/import", Some("admin"), Some(rejected)),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["error"]["index"], 1);

        let accepted = r#"[{"UNIDADE EDUCACIONAL":"Escola A","INEP":"1"}]"#.to_string();
        let resp = send(
            &ctx,
            request("POST", "/api/admin/schools/import", Some("admin"), Some(accepted)),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let imported = json_body(resp).await;

        let resp = send(&ctx, request("GET", "/api/admin/schools", Some("admin"), None)).await;
        assert_eq!(json_body(resp).await, imported);
        Ok(())
    }

    #[tokio::test]
    async fn test_professional_import_needs_its_permission() -> Result<()> {
        let ctx = test_context().await?;
        grant(&ctx, "admin", &[Permission::General]).await?;
        let body = r#"[{"name":"Maria"}]"#.to_string();

        let resp = send(
            &ctx,
            request("POST", "/api/admin/professionals/import", Some("admin"), Some(body)),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        Ok(())
    }

    #[tokio::test]
    async fn test_users_listing_follows_live_directory() -> Result<()> {
        let ctx = test_context().await?;
        grant(&ctx, "root", &[Permission::Users]).await?;

        let new_user = r#"{"id":"u-7","name":"Ana","email":"ana@semed.gov.br","role_id":"role-root"}"#;
        let resp = send(
            &ctx,
            request("POST", "/api/admin/users", Some("root"), Some(new_user.to_string())),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let mut listed = Vec::new();
        for _ in 0..50 {
            let resp = send(&ctx, request("GET", "/api/admin/users", Some("root"), None)).await;
            listed = json_body(resp).await.as_array().unwrap().clone();
            if listed.len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().any(|p| p["id"] == "u-7" && p["role"]["id"] == "role-root"));

        let resp = send(&ctx, request("DELETE", "/api/admin/users/u-7", Some("root"), None)).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        let resp = send(&ctx, request("DELETE", "/api/admin/users/u-7", Some("root"), None)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn test_home_page_settings() -> Result<()> {
        let ctx = test_context().await?;
        grant(&ctx, "admin", &[Permission::General]).await?;

        let resp = send(&ctx, request("GET", "/api/settings/home", None, None)).await;
        assert_eq!(json_body(resp).await["appName"], "Censo Escolar");

        let update = r##"{"appName":"Censo 2026","primaryColor":"#00aa00"}"##.to_string();
        let resp = send(
            &ctx,
            request("PUT", "/api/admin/settings/home", Some("admin"), Some(update)),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send(&ctx, request("GET", "/api/settings/home", None, None)).await;
        assert_eq!(json_body(resp).await["appName"], "Censo 2026");

        let bad = r#"{"appName":"x","primaryColor":"red"}"#.to_string();
        let resp = send(&ctx, request("PUT", "/api/admin/settings/home", Some("admin"), Some(bad))).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
