//! Reference data editor - bulk import of schools and professionals.
//!
//! Both imports take the raw text of a JSON array, check every element against a
//! minimal shape contract and write the whole batch in one database transaction.
//! A single bad element rejects the batch before anything is written. After a
//! successful write the stored records are rendered back as canonical JSON so the
//! editor can show the assigned identifiers.

use crate::{
    core::census::School,
    entities::{Professional, ProfessionalColumn, School as SchoolEntity, SchoolColumn},
    entities::{professional, school},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, instrument};

/// Accepted spellings of the school name key
pub const SCHOOL_NAME_KEYS: [&str; 2] = ["UNIDADE EDUCACIONAL", "name"];
/// Accepted spellings of the INEP key
pub const SCHOOL_INEP_KEYS: [&str; 2] = ["INEP", "inep"];
const SCHOOL_ADDRESS_KEYS: [&str; 2] = ["ENDEREÇO", "address"];
const SCHOOL_CITY_KEYS: [&str; 2] = ["MUNICÍPIO", "city"];

/// A professional as stored in the reference data
pub type ProfessionalRecord = crate::entities::ProfessionalModel;

/// Parses editor text into the elements of a JSON array.
fn parse_array(text: &str) -> Result<Vec<Value>> {
    let value: Value = serde_json::from_str(text).map_err(|e| Error::InvalidJson {
        message: e.to_string(),
    })?;
    match value {
        Value::Array(items) => Ok(items),
        other => Err(Error::InvalidJson {
            message: format!("expected a JSON array, found {}", json_kind(&other)),
        }),
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// String form of a scalar. Whole numbers render without a fraction, so `1`,
/// `1.0` and `"1"` all read as `"1"`.
#[allow(clippy::cast_possible_truncation)]
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) if n.is_f64() => n.as_f64().map(|f| {
            if f.fract() == 0.0 && f.abs() < 9.0e15 {
                format!("{}", f as i64)
            } else {
                n.to_string()
            }
        }),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First non-empty value under any of the accepted keys.
fn field_text(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find_map(scalar_text)
}

fn as_object(index: usize, item: &Value) -> Result<&Map<String, Value>> {
    item.as_object().ok_or_else(|| Error::ImportRejected {
        index,
        message: format!("expected an object, found {}", json_kind(item)),
    })
}

/// Validates school import text without writing anything.
///
/// Each element needs a name and an INEP code under one of the accepted keys.
/// The INEP code, as text, becomes the storage id, so elements sharing an INEP
/// collapse into one record: the later element wins and keeps the position of
/// the first.
///
/// # Errors
/// [`Error::InvalidJson`] for unparsable text, [`Error::ImportRejected`] naming the
/// first element missing a name or INEP.
pub fn parse_school_import(text: &str) -> Result<Vec<School>> {
    let items = parse_array(text)?;
    let mut schools: Vec<School> = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let object = as_object(index, item)?;
        let name = field_text(object, &SCHOOL_NAME_KEYS).ok_or_else(|| Error::ImportRejected {
            index,
            message: format!("missing school name (expected one of {SCHOOL_NAME_KEYS:?})"),
        })?;
        let inep = field_text(object, &SCHOOL_INEP_KEYS).ok_or_else(|| Error::ImportRejected {
            index,
            message: format!("missing INEP code (expected one of {SCHOOL_INEP_KEYS:?})"),
        })?;

        let record = School {
            id: inep.clone(),
            name,
            inep,
            address: field_text(object, &SCHOOL_ADDRESS_KEYS),
            city: field_text(object, &SCHOOL_CITY_KEYS),
        };

        if let Some(existing) = schools.iter_mut().find(|s| s.id == record.id) {
            *existing = record;
        } else {
            schools.push(record);
        }
    }

    Ok(schools)
}

/// Validates professional import text without writing anything.
///
/// Each element needs a non-empty string `name`. An existing `id` is kept so the
/// import updates that record; elements without one get a fresh id.
pub fn parse_professional_import(text: &str) -> Result<Vec<ProfessionalRecord>> {
    let items = parse_array(text)?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let object = as_object(index, item)?;
            let name = object
                .get("name")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .ok_or_else(|| Error::ImportRejected {
                    index,
                    message: "missing non-empty string `name`".to_string(),
                })?;
            let id = object
                .get("id")
                .and_then(scalar_text)
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

            Ok(ProfessionalRecord {
                id,
                name: name.to_string(),
            })
        })
        .collect()
}

/// Replaces the stored schools with the parsed batch in one transaction.
///
/// Schools missing from the batch are removed; the rest are upserted by id.
/// Submissions of a removed school stay and show it as unknown.
#[instrument(skip(db, text))]
pub async fn import_schools(db: &DatabaseConnection, text: &str) -> Result<Vec<School>> {
    let schools = parse_school_import(text)?;

    let txn = db.begin().await?;
    let removed = SchoolEntity::delete_many()
        .filter(SchoolColumn::Id.is_not_in(schools.iter().map(|s| s.id.clone())))
        .exec(&txn)
        .await?;
    for record in &schools {
        let model = school::ActiveModel {
            id: Set(record.id.clone()),
            name: Set(record.name.clone()),
            inep: Set(record.inep.clone()),
            address: Set(record.address.clone()),
            city: Set(record.city.clone()),
        };
        SchoolEntity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(SchoolColumn::Id)
                    .update_columns([
                        SchoolColumn::Name,
                        SchoolColumn::Inep,
                        SchoolColumn::Address,
                        SchoolColumn::City,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
    }
    txn.commit().await?;

    info!(
        count = schools.len(),
        removed = removed.rows_affected,
        "Imported schools"
    );
    Ok(schools)
}

/// Replaces the stored professionals with the parsed batch in one transaction.
#[instrument(skip(db, text))]
pub async fn import_professionals(
    db: &DatabaseConnection,
    text: &str,
) -> Result<Vec<ProfessionalRecord>> {
    let professionals = parse_professional_import(text)?;

    let txn = db.begin().await?;
    let removed = Professional::delete_many()
        .filter(ProfessionalColumn::Id.is_not_in(professionals.iter().map(|p| p.id.clone())))
        .exec(&txn)
        .await?;
    for record in &professionals {
        let model = professional::ActiveModel {
            id: Set(record.id.clone()),
            name: Set(record.name.clone()),
        };
        Professional::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(ProfessionalColumn::Id)
                    .update_column(ProfessionalColumn::Name)
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
    }
    txn.commit().await?;

    info!(
        count = professionals.len(),
        removed = removed.rows_affected,
        "Imported professionals"
    );
    Ok(professionals)
}

/// All schools, ordered by name.
pub async fn list_schools(db: &DatabaseConnection) -> Result<Vec<School>> {
    SchoolEntity::find()
        .order_by_asc(SchoolColumn::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// All professionals, ordered by name.
pub async fn list_professionals(db: &DatabaseConnection) -> Result<Vec<ProfessionalRecord>> {
    Professional::find()
        .order_by_asc(ProfessionalColumn::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Renders records back into the editor's canonical JSON text.
pub fn to_canonical_json<T: Serialize>(records: &[T]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}
