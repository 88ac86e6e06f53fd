//! Public routes: the census form and the home page.

use crate::{
    core::{
        builder::{self, CensusDraft, SchoolOptions},
        census::CensusSubmission,
        settings::{self, HomePageSettings},
    },
    errors::Result,
    http::{context::AppContext, guard::caller_id},
};
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde::Serialize;

/// Liveness check
pub async fn healthz() -> &'static str {
    "ok"
}

/// Blank form plus the school selector
#[derive(Debug, Serialize)]
pub struct CensusForm {
    /// Blank draft with one classroom and one modality
    pub draft: CensusDraft,
    /// School selector entries
    #[serde(flatten)]
    pub school_options: SchoolOptions,
}

/// `GET /api/census/form`: a blank form and the school selector.
pub async fn census_form(State(ctx): State<AppContext>) -> Json<CensusForm> {
    Json(CensusForm {
        draft: CensusDraft::blank(&ctx.config.census),
        school_options: builder::load_school_options(&ctx.db).await,
    })
}

/// Reply to a successful submission
#[derive(Debug, Serialize)]
pub struct Submitted {
    /// The stored submission
    pub submission: CensusSubmission,
    /// The form reset for the next entry
    pub draft: CensusDraft,
}

/// `POST /api/census/submissions`: validates and stores the draft, then returns it reset.
pub async fn submit_census(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(mut draft): Json<CensusDraft>,
) -> Result<(StatusCode, Json<Submitted>)> {
    let submitter = caller_id(&ctx, &headers);
    let submission =
        builder::submit_census(&ctx.db, &ctx.config.census, &mut draft, submitter).await?;
    Ok((StatusCode::CREATED, Json(Submitted { submission, draft })))
}

/// Public home page content; never fails.
pub async fn home_page(State(ctx): State<AppContext>) -> Json<HomePageSettings> {
    Json(settings::load_home_page(&ctx.db, &ctx.cache).await)
}
