//! User entity - Admin dashboard profiles.
//!
//! The `id` is the identity provider's user id. `role_id` is a plain reference
//! resolved at read time, so a profile may point at a role that no longer exists.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User profile database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Identity provider user id
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Display name
    pub name: String,
    /// Contact e-mail
    pub email: String,
    /// Referenced role, possibly dangling
    pub role_id: Option<String>,
}

/// No database-level relation: the role reference is resolved in `core::directory`
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
