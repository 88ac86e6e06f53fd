//! Submission reads and section status updates.
//!
//! Loads what the dashboard and the detail page need from the database and
//! hands it to the pure functions in `core::aggregate`.

use crate::{
    config::app::{CensusConfig, DashboardConfig},
    core::{
        aggregate::{
            self, DashboardView, GradeProjectionRow, TeacherProjectionRow,
        },
        census::{CensusSubmission, School, Section, SectionStatus},
        reference,
    },
    entities::{School as SchoolEntity, Submission, SubmissionColumn, submission},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, instrument};

/// All submissions, oldest first.
pub async fn list_submissions(db: &DatabaseConnection) -> Result<Vec<CensusSubmission>> {
    Submission::find()
        .order_by_asc(SubmissionColumn::SubmittedAt)
        .all(db)
        .await?
        .into_iter()
        .map(CensusSubmission::try_from)
        .collect()
}

/// One submission by id.
pub async fn get_submission(db: &DatabaseConnection, submission_id: &str) -> Result<CensusSubmission> {
    Submission::find_by_id(submission_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("submission", submission_id))
        .and_then(CensusSubmission::try_from)
}

/// Professional id → display name, for the teacher projection table.
pub async fn professional_names(db: &DatabaseConnection) -> Result<HashMap<String, String>> {
    Ok(reference::list_professionals(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect())
}

/// Loads every submission and school and builds the dashboard for `query`.
#[instrument(skip(db, config))]
pub async fn load_dashboard(
    db: &DatabaseConnection,
    query: &str,
    config: &DashboardConfig,
) -> Result<DashboardView> {
    let submissions = list_submissions(db).await?;
    let schools = reference::list_schools(db).await?;
    Ok(aggregate::build_dashboard(&submissions, &schools, query, config))
}

/// Detail page of one submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionDetail {
    /// The submission itself
    pub submission: CensusSubmission,
    /// `None` when the school was removed from the reference data
    pub school: Option<School>,
    /// Every section completed
    pub fully_complete: bool,
    /// Planning year the projection tables refer to
    pub projection_year: i32,
    /// Grade projection table
    pub grade_projections: Vec<GradeProjectionRow>,
    /// Teacher projection table
    pub teacher_projections: Vec<TeacherProjectionRow>,
}

/// Loads one submission with its school and projection tables.
pub async fn load_submission_detail(
    db: &DatabaseConnection,
    submission_id: &str,
    config: &CensusConfig,
) -> Result<SubmissionDetail> {
    let submission = get_submission(db, submission_id).await?;
    let school = SchoolEntity::find_by_id(submission.school_id.clone())
        .one(db)
        .await?;
    let names = professional_names(db).await?;

    let grade_projections = aggregate::grade_projection_rows(&[&submission]);
    let teacher_projections = aggregate::teacher_projection_rows(&[&submission], &names);

    Ok(SubmissionDetail {
        fully_complete: submission.is_fully_complete(),
        projection_year: config.projection_year,
        school,
        grade_projections,
        teacher_projections,
        submission,
    })
}

/// Sets one section's status and returns the updated submission.
#[instrument(skip(db))]
pub async fn update_section_status(
    db: &DatabaseConnection,
    submission_id: &str,
    section: Section,
    status: SectionStatus,
) -> Result<CensusSubmission> {
    let mut current = get_submission(db, submission_id).await?;
    current.section_statuses.set(section, status);

    let model = submission::ActiveModel {
        id: Set(current.id.clone()),
        section_statuses: Set(serde_json::to_value(current.section_statuses)?),
        ..Default::default()
    };
    model.update(db).await?;

    info!(section = section.as_str(), ?status, "Section status updated");
    Ok(current)
}
