//! School entity - Reference data for every school that can submit a census.
//!
//! The identifier is the school's INEP code when imported in bulk, so it is a
//! human-assigned string rather than a generated key.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// School database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "schools")]
pub struct Model {
    /// Storage identifier (the INEP code for imported schools)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Display name of the school
    pub name: String,
    /// National school-registry code
    pub inep: String,
    /// Free-text street address
    pub address: Option<String>,
    /// Municipality the school belongs to
    pub city: Option<String>,
}

/// Submissions hold a plain school id, checked when they are created
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
