//! Guarded admin routes.
//!
//! Permission checks happen in `http::guard` before any of these run.

use crate::{
    core::{
        aggregate::DashboardView,
        census::{CensusSubmission, Section, SectionStatus},
        directory::{self, RoleInput, RoleRecord, UserInput, UserProfile, UserRecord},
        form_schema::{self, FormSchema},
        reference,
        settings::{self, HomePageSettings},
        submissions::{self, SubmissionDetail},
    },
    errors::Result,
    http::context::AppContext,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

/// Query string of the dashboard page
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    /// School name or INEP filter; blank shows everything
    #[serde(default)]
    pub q: String,
}

/// `GET /api/admin/dashboard`: metrics, daily counts, rows and groups for `?q=`.
pub async fn dashboard(
    State(ctx): State<AppContext>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardView>> {
    let view = submissions::load_dashboard(&ctx.db, &query.q, &ctx.config.dashboard).await?;
    Ok(Json(view))
}

/// `GET /api/admin/submissions/:id`: one submission with its projection tables.
pub async fn submission_detail(
    State(ctx): State<AppContext>,
    Path(submission_id): Path<String>,
) -> Result<Json<SubmissionDetail>> {
    Ok(Json(
        submissions::load_submission_detail(&ctx.db, &submission_id, &ctx.config.census)
            .await?,
    ))
}

/// Body of a section status change
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    /// New status of the section
    pub status: SectionStatus,
}

/// Marks one section of a submission pending or completed.
pub async fn update_section_status(
    State(ctx): State<AppContext>,
    Path((submission_id, section)): Path<(String, String)>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<CensusSubmission>> {
    let section: Section = section.parse()?;
    let updated =
        submissions::update_section_status(&ctx.db, &submission_id, section, update.status)
            .await?;
    Ok(Json(updated))
}

fn json_text(text: String) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], text).into_response()
}

/// Replaces the school list with the posted batch.
///
/// Body is the editor's raw JSON text; the reply is the stored batch re-rendered.
pub async fn import_schools(State(ctx): State<AppContext>, body: String) -> Result<Response> {
    let schools = reference::import_schools(&ctx.db, &body).await?;
    Ok(json_text(reference::to_canonical_json(&schools)?))
}

/// Replaces the professional list with the posted batch.
pub async fn import_professionals(
    State(ctx): State<AppContext>,
    body: String,
) -> Result<Response> {
    let professionals = reference::import_professionals(&ctx.db, &body).await?;
    Ok(json_text(reference::to_canonical_json(&professionals)?))
}

/// Stored schools as canonical JSON text.
pub async fn list_schools(State(ctx): State<AppContext>) -> Result<Response> {
    let schools = reference::list_schools(&ctx.db).await?;
    Ok(json_text(reference::to_canonical_json(&schools)?))
}

/// Stored professionals as canonical JSON text.
pub async fn list_professionals(State(ctx): State<AppContext>) -> Result<Response> {
    let professionals = reference::list_professionals(&ctx.db).await?;
    Ok(json_text(reference::to_canonical_json(&professionals)?))
}

/// All roles, ordered by name.
pub async fn list_roles(State(ctx): State<AppContext>) -> Result<Json<Vec<RoleRecord>>> {
    Ok(Json(directory::list_roles(&ctx.db).await?))
}

/// Creates or overwrites a role.
pub async fn save_role(
    State(ctx): State<AppContext>,
    Json(input): Json<RoleInput>,
) -> Result<Json<RoleRecord>> {
    Ok(Json(directory::save_role(&ctx.db, &ctx.hub, input).await?))
}

/// Deletes a role; users keep the dangling reference.
pub async fn delete_role(
    State(ctx): State<AppContext>,
    Path(role_id): Path<String>,
) -> Result<StatusCode> {
    directory::delete_role(&ctx.db, &ctx.hub, &role_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Users with their roles resolved.
///
/// Served from the live directory rather than a fresh table read.
pub async fn list_users(State(ctx): State<AppContext>) -> Json<Vec<UserProfile>> {
    Json(ctx.directory.profiles().await)
}

/// Creates or overwrites a user; the role must exist.
pub async fn save_user(
    State(ctx): State<AppContext>,
    Json(input): Json<UserInput>,
) -> Result<Json<UserRecord>> {
    Ok(Json(directory::save_user(&ctx.db, &ctx.hub, input).await?))
}

/// Deletes a user.
pub async fn delete_user(
    State(ctx): State<AppContext>,
    Path(user_id): Path<String>,
) -> Result<StatusCode> {
    directory::delete_user(&ctx.db, &ctx.hub, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Stores the home page settings and their local copy.
pub async fn save_home_page(
    State(ctx): State<AppContext>,
    Json(input): Json<HomePageSettings>,
) -> Result<Json<HomePageSettings>> {
    Ok(Json(
        settings::save_home_page(&ctx.db, &ctx.cache, input).await?,
    ))
}

/// Current form-builder schema, falling back to the local copy or the default.
pub async fn get_form_schema(State(ctx): State<AppContext>) -> Result<Json<FormSchema>> {
    Ok(Json(form_schema::load_form_schema(&ctx.db, &ctx.cache).await?))
}

/// Validates and stores a form-builder schema.
pub async fn save_form_schema(
    State(ctx): State<AppContext>,
    Json(schema): Json<FormSchema>,
) -> Result<Json<FormSchema>> {
    Ok(Json(
        form_schema::save_form_schema(&ctx.db, &ctx.cache, schema).await?,
    ))
}
