//! Role entity - A named set of section permissions.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "roles")]
pub struct Model {
    /// Generated identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Display name, e.g. "Secretaria"
    pub name: String,
    /// Permission names as a JSON array of strings
    pub permissions: Json,
}

/// `Role` has no relationships; users hold a plain role id
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
