//! Shared test utilities for the census service.
//!
//! This module provides common helper functions for setting up test databases
//! and creating schools, drafts and submissions with sensible defaults.

use crate::{
    core::{
        builder::{self, CensusDraft},
        census::{CensusSubmission, Classroom, GradeSlot, Occupation, School, TeachingModality},
    },
    entities::school,
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Inserts a school whose INEP code equals its id.
pub async fn create_test_school(
    db: &DatabaseConnection,
    id: &str,
    name: &str,
) -> Result<school::Model> {
    let model = school::ActiveModel {
        id: Set(id.to_string()),
        name: Set(name.to_string()),
        inep: Set(id.to_string()),
        address: Set(None),
        city: Set(None),
    };
    Ok(model.insert(db).await?)
}

/// In-memory school value, not persisted.
#[must_use]
pub fn school(id: &str, name: &str, inep: &str) -> School {
    School {
        id: id.to_string(),
        name: name.to_string(),
        inep: inep.to_string(),
        address: None,
        city: None,
    }
}

/// A draft that passes validation.
///
/// # Defaults
/// * one classroom "Sala 1" with capacity 30, 4 outlets, 1 TV, 30 chairs, 2 fans,
///   occupied in the morning by "1º ano" (25 students, "2º ano" projected)
/// * one modality "Fundamental" with 100 students
#[must_use]
pub fn sample_draft(school_id: &str) -> CensusDraft {
    let mut draft = CensusDraft::blank(&crate::config::app::CensusConfig::default());
    draft.school_id = school_id.to_string();
    draft.classrooms = vec![Classroom {
        name: "Sala 1".to_string(),
        student_capacity: 30,
        outlets: 4,
        tv_count: 1,
        chair_count: 30,
        fan_count: 2,
        occupation: Occupation::Turns {
            morning: Some(GradeSlot {
                grade: Some("1º ano".to_string()),
                student_count: 25,
                projected_grade: Some("2º ano".to_string()),
            }),
            afternoon: None,
            night: None,
        },
    }];
    draft.teaching_modalities = vec![TeachingModality {
        name: "Fundamental".to_string(),
        offered: true,
        student_count: 100,
    }];
    draft
}

/// Stores a sample submission for the given school through the builder.
pub async fn create_test_submission(
    db: &DatabaseConnection,
    school_id: &str,
) -> Result<CensusSubmission> {
    let config = crate::config::app::CensusConfig::default();
    let census = sample_draft(school_id).validate(&config)?;
    builder::create_submission(db, census, "test_user").await
}

/// In-memory submission value with a fixed timestamp, not persisted.
#[must_use]
pub fn submission_at(id: &str, school_id: &str, submitted_at: DateTime<Utc>) -> CensusSubmission {
    let draft = sample_draft(school_id);
    CensusSubmission {
        id: id.to_string(),
        school_id: school_id.to_string(),
        classrooms: draft.classrooms,
        teaching_modalities: draft.teaching_modalities,
        technology: crate::core::census::TechnologyData::default(),
        professionals: draft.professionals,
        dynamic_data: draft.dynamic_data,
        section_statuses: crate::core::census::SectionStatuses::default(),
        submitted_at,
        submitted_by: "test_user".to_string(),
    }
}

/// In-memory submission value submitted now.
#[must_use]
pub fn submission(id: &str, school_id: &str) -> CensusSubmission {
    submission_at(id, school_id, Utc::now())
}
