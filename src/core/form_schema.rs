//! Form-builder schema - admin-defined dynamic field groups.
//!
//! The schema describes which extra fields each census section offers. It is
//! stored as a versioned JSON document under the `formBuilder` settings key and
//! validated whenever it is loaded or saved. Submissions are not checked against
//! it.

use crate::{
    core::{
        local_cache::LocalCache,
        settings::{load_setting, save_setting},
    },
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, warn};

/// Settings key of the form-builder document
pub const FORM_SCHEMA_KEY: &str = "formBuilder";

/// Schema version this build reads and writes
pub const FORM_SCHEMA_VERSION: u32 = 1;

/// Kind of input a dynamic field renders as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Boolean,
    Date,
    Select,
    /// Planned, not yet available
    File,
    /// Planned, not yet available
    Rating,
}

impl FieldType {
    /// Whether fields of this type can be added to a schema.
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        !matches!(self, Self::File | Self::Rating)
    }
}

/// One configurable field of a form section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormFieldConfig {
    /// Key the answer is stored under, unique within its section
    pub id: String,
    /// Text shown next to the input
    pub label: String,
    /// Input kind
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Whether an answer is mandatory
    #[serde(default)]
    pub required: bool,
    /// Choices of a `select` field
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// A titled group of fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSectionConfig {
    /// Section key, unique within the schema
    pub id: String,
    /// Heading shown on the form
    pub title: String,
    /// Fields in display order
    #[serde(default)]
    pub fields: Vec<FormFieldConfig>,
}

/// The whole form-builder document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSchema {
    /// Document format version
    pub version: u32,
    /// Sections in display order
    #[serde(default)]
    pub sections: Vec<FormSectionConfig>,
}

impl Default for FormSchema {
    fn default() -> Self {
        Self {
            version: FORM_SCHEMA_VERSION,
            sections: Vec::new(),
        }
    }
}

impl FormSchema {
    /// Checks the document before it is used or stored.
    pub fn validate(&self) -> Result<()> {
        if self.version != FORM_SCHEMA_VERSION {
            return Err(Error::validation(format!(
                "unsupported form schema version {} (expected {FORM_SCHEMA_VERSION})",
                self.version
            )));
        }

        let mut section_ids = HashSet::new();
        for section in &self.sections {
            if section.id.trim().is_empty() {
                return Err(Error::validation("section id must not be empty"));
            }
            if !section_ids.insert(section.id.as_str()) {
                return Err(Error::validation(format!(
                    "duplicate section id {}",
                    section.id
                )));
            }

            let mut field_ids = HashSet::new();
            for field in &section.fields {
                let at = format!("{}.{}", section.id, field.id);
                if field.id.trim().is_empty() {
                    return Err(Error::validation(format!(
                        "field id must not be empty in section {}",
                        section.id
                    )));
                }
                if !field_ids.insert(field.id.as_str()) {
                    return Err(Error::validation(format!("duplicate field id {at}")));
                }
                if field.label.trim().is_empty() {
                    return Err(Error::validation(format!("{at}: label must not be empty")));
                }
                if !field.field_type.is_enabled() {
                    return Err(Error::validation(format!(
                        "{at}: field type {:?} is not available yet",
                        field.field_type
                    )));
                }
                if field.field_type == FieldType::Select && field.options.is_empty() {
                    return Err(Error::validation(format!(
                        "{at}: select fields need at least one option"
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Loads and validates the stored schema.
///
/// When the database is unreachable the local copy is used; with neither, the
/// schema is empty.
///
/// # Errors
/// A stored or cached document that fails validation is an error.
pub async fn load_form_schema(db: &DatabaseConnection, cache: &LocalCache) -> Result<FormSchema> {
    let schema = match load_setting::<FormSchema>(db, FORM_SCHEMA_KEY).await {
        Ok(stored) => stored.unwrap_or_default(),
        Err(e) => {
            warn!("Could not load form schema, trying local copy: {}", e);
            cache.read::<FormSchema>(FORM_SCHEMA_KEY)?.unwrap_or_default()
        }
    };
    schema.validate()?;
    Ok(schema)
}

/// Validates and stores the schema, then refreshes the local copy.
pub async fn save_form_schema(
    db: &DatabaseConnection,
    cache: &LocalCache,
    schema: FormSchema,
) -> Result<FormSchema> {
    schema.validate()?;
    save_setting(db, FORM_SCHEMA_KEY, &schema).await?;
    if let Err(e) = cache.write(FORM_SCHEMA_KEY, &schema) {
        warn!("Saved form schema but could not update the local copy: {}", e);
    }
    info!(sections = schema.sections.len(), "Form schema saved");
    Ok(schema)
}
