//! Submission entity - One school's census answers.
//!
//! The nested sections (classrooms, modalities, technology, professionals,
//! dynamic data and section statuses) are stored as JSON documents and decoded
//! into the typed structures in `core::census` on read.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Submission database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "submissions")]
pub struct Model {
    /// Generated identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// School this census describes
    pub school_id: String,
    /// `Vec<Classroom>` as JSON
    pub classrooms: Json,
    /// `Vec<TeachingModality>` as JSON
    pub teaching_modalities: Json,
    /// `TechnologyData` as JSON
    pub technology: Json,
    /// `ProfessionalsData` as JSON
    pub professionals: Json,
    /// Per-section dynamic field values as JSON
    pub dynamic_data: Json,
    /// Per-section pending/completed flags as JSON
    pub section_statuses: Json,
    /// Server-assigned submission time
    pub submitted_at: DateTimeUtc,
    /// User id of the submitter, or the anonymous marker
    pub submitted_by: String,
}

/// No foreign key to `schools`: replacing the school list keeps existing
/// submissions, which then show their school as unknown
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
