//! Setting entity - Stores keyed JSON configuration blobs.
//! Used for the home page settings (`homePage`) and the form-builder
//! schema (`formBuilder`).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Setting database model - one JSON document per key
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "settings")]
pub struct Model {
    /// Setting key (e.g., `"homePage"`)
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,
    /// Stored document
    pub value: Json,
    /// When this setting was last saved
    pub updated_at: DateTimeUtc,
}

/// `Setting` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
