//! Professional entity - Staff members that can be allocated to classrooms.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Professional database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "professionals")]
pub struct Model {
    /// Identifier from the imported list
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Full name
    pub name: String,
}

/// `Professional` has no relationships; submissions refer to it inside their JSON
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
