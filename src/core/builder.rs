//! Census submission builder - form state, validation and submission.
//!
//! A [`CensusDraft`] is the editable state of the public census form. It starts
//! with one blank classroom, one blank teaching modality and every technology
//! toggle switched off. [`submit_census`] validates the draft, checks the school
//! exists and stores one new submission with a server-assigned timestamp. The
//! draft is reset only when the write succeeds, so a failed submission can be
//! retried as-is.

use crate::{
    config::app::CensusConfig,
    core::census::{
        CensusSubmission, Classroom, ProfessionalsData, SectionDynamicData, SectionStatuses,
        TeachingModality, TechnologyData, TechnologyResource,
    },
    entities::{School, SchoolColumn, submission},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

/// One switchable technology resource on the form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnologyToggle {
    /// Resource name from `census.technology_resources`
    pub name: String,
    /// Whether the school has it
    #[serde(default)]
    pub enabled: bool,
    /// How many units
    #[serde(default)]
    pub quantity: u32,
}

/// Editable census form state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CensusDraft {
    /// Selected school, empty until chosen
    #[serde(default)]
    pub school_id: String,
    /// Classrooms, never fewer than one
    pub classrooms: Vec<Classroom>,
    /// Teaching modalities, never fewer than one
    pub teaching_modalities: Vec<TeachingModality>,
    /// One toggle per configured resource
    #[serde(default)]
    pub technologies: Vec<TechnologyToggle>,
    /// Internet access checkbox
    #[serde(default)]
    pub has_internet_access: bool,
    /// Classroom allocations and projections
    #[serde(default)]
    pub professionals: ProfessionalsData,
    /// Free-form answers per section
    #[serde(default)]
    pub dynamic_data: SectionDynamicData,
}

impl CensusDraft {
    /// A blank form: one empty classroom, one empty modality, all toggles off.
    #[must_use]
    pub fn blank(config: &CensusConfig) -> Self {
        Self {
            school_id: String::new(),
            classrooms: vec![Classroom::default()],
            teaching_modalities: vec![TeachingModality::default()],
            technologies: config
                .technology_resources
                .iter()
                .map(|name| TechnologyToggle {
                    name: name.clone(),
                    enabled: false,
                    quantity: 0,
                })
                .collect(),
            has_internet_access: false,
            professionals: ProfessionalsData::default(),
            dynamic_data: SectionDynamicData::default(),
        }
    }

    /// Appends a blank classroom and returns its index.
    pub fn add_classroom(&mut self) -> usize {
        self.classrooms.push(Classroom::default());
        self.classrooms.len() - 1
    }

    /// Removes the classroom at `index`. The last classroom cannot be removed.
    pub fn remove_classroom(&mut self, index: usize) -> Result<Classroom> {
        if index >= self.classrooms.len() {
            return Err(Error::validation(format!("no classroom at index {index}")));
        }
        if self.classrooms.len() == 1 {
            return Err(Error::validation("at least one classroom is required"));
        }
        Ok(self.classrooms.remove(index))
    }

    /// Appends a blank teaching modality and returns its index.
    pub fn add_modality(&mut self) -> usize {
        self.teaching_modalities.push(TeachingModality::default());
        self.teaching_modalities.len() - 1
    }

    /// Removes the modality at `index`. The last modality cannot be removed.
    pub fn remove_modality(&mut self, index: usize) -> Result<TeachingModality> {
        if index >= self.teaching_modalities.len() {
            return Err(Error::validation(format!("no teaching modality at index {index}")));
        }
        if self.teaching_modalities.len() == 1 {
            return Err(Error::validation("at least one teaching modality is required"));
        }
        Ok(self.teaching_modalities.remove(index))
    }

    /// Flips a technology toggle and returns its new state.
    pub fn toggle_technology(&mut self, name: &str) -> Result<bool> {
        let toggle = self
            .technologies
            .iter_mut()
            .find(|t| t.name == name)
            .ok_or_else(|| Error::validation(format!("unknown technology resource: {name}")))?;
        toggle.enabled = !toggle.enabled;
        Ok(toggle.enabled)
    }

    /// Checks every form rule and returns the payload ready to store.
    ///
    /// # Errors
    /// Returns [`Error::Validation`] naming the first offending field.
    pub fn validate(&self, config: &CensusConfig) -> Result<ValidatedCensus> {
        let school_id = self.school_id.trim();
        if school_id.is_empty() {
            return Err(Error::validation("school_id: a school must be selected"));
        }

        if self.classrooms.is_empty() {
            return Err(Error::validation("classrooms: at least one classroom is required"));
        }
        for (index, classroom) in self.classrooms.iter().enumerate() {
            validate_classroom(index, classroom)?;
        }

        if self.teaching_modalities.is_empty() {
            return Err(Error::validation(
                "teaching_modalities: at least one teaching modality is required",
            ));
        }
        for (index, modality) in self.teaching_modalities.iter().enumerate() {
            if modality.name.trim().is_empty() {
                return Err(Error::validation(format!(
                    "teaching_modalities[{index}].name must not be empty"
                )));
            }
            if modality.student_count < 0 {
                return Err(Error::validation(format!(
                    "teaching_modalities[{index}].student_count must not be negative"
                )));
            }
        }

        for toggle in &self.technologies {
            if !config.technology_resources.contains(&toggle.name) {
                return Err(Error::validation(format!(
                    "technologies: unknown resource {}",
                    toggle.name
                )));
            }
        }

        let mut classrooms = self.classrooms.clone();
        for classroom in &mut classrooms {
            classroom.name = classroom.name.trim().to_string();
        }
        let mut teaching_modalities = self.teaching_modalities.clone();
        for modality in &mut teaching_modalities {
            modality.name = modality.name.trim().to_string();
        }

        Ok(ValidatedCensus {
            school_id: school_id.to_string(),
            classrooms,
            teaching_modalities,
            technology: TechnologyData {
                resources: self
                    .technologies
                    .iter()
                    .filter(|t| t.enabled)
                    .map(|t| TechnologyResource {
                        name: t.name.clone(),
                        quantity: t.quantity,
                    })
                    .collect(),
                has_internet_access: self.has_internet_access,
            },
            professionals: self.professionals.clone(),
            dynamic_data: self.dynamic_data.clone(),
        })
    }
}

fn validate_classroom(index: usize, classroom: &Classroom) -> Result<()> {
    if classroom.name.trim().is_empty() {
        return Err(Error::validation(format!(
            "classrooms[{index}].name must not be empty"
        )));
    }

    let counters = [
        ("student_capacity", classroom.student_capacity),
        ("outlets", classroom.outlets),
        ("tv_count", classroom.tv_count),
        ("chair_count", classroom.chair_count),
        ("fan_count", classroom.fan_count),
    ];
    if let Some((field, _)) = counters.iter().find(|(_, value)| *value < 0) {
        return Err(Error::validation(format!(
            "classrooms[{index}].{field} must not be negative"
        )));
    }

    for (turn, slot) in classroom.occupation.slots() {
        if slot.student_count < 0 {
            return Err(Error::validation(format!(
                "classrooms[{index}].{turn}.student_count must not be negative"
            )));
        }
    }

    Ok(())
}

/// A draft that passed every form rule
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedCensus {
    school_id: String,
    classrooms: Vec<Classroom>,
    teaching_modalities: Vec<TeachingModality>,
    technology: TechnologyData,
    professionals: ProfessionalsData,
    dynamic_data: SectionDynamicData,
}

impl ValidatedCensus {
    /// School the census is for
    #[must_use]
    pub fn school_id(&self) -> &str {
        &self.school_id
    }
}

/// Stores a validated census as a new submission.
///
/// The timestamp is taken here, never from the client. New submissions start with
/// every section pending.
#[instrument(skip(db, census), fields(school_id = %census.school_id))]
pub async fn create_submission<C>(
    db: &C,
    census: ValidatedCensus,
    submitted_by: &str,
) -> Result<CensusSubmission>
where
    C: ConnectionTrait,
{
    School::find_by_id(census.school_id.clone())
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("school", census.school_id.clone()))?;

    let model = submission::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        school_id: Set(census.school_id),
        classrooms: Set(serde_json::to_value(&census.classrooms)?),
        teaching_modalities: Set(serde_json::to_value(&census.teaching_modalities)?),
        technology: Set(serde_json::to_value(&census.technology)?),
        professionals: Set(serde_json::to_value(&census.professionals)?),
        dynamic_data: Set(serde_json::to_value(&census.dynamic_data)?),
        section_statuses: Set(serde_json::to_value(SectionStatuses::default())?),
        submitted_at: Set(chrono::Utc::now()),
        submitted_by: Set(submitted_by.to_string()),
    };

    let stored = model.insert(db).await?;
    info!(submission_id = %stored.id, "Census submission stored");
    CensusSubmission::try_from(stored)
}

/// Validates and stores the draft, resetting it to a blank form on success.
///
/// `submitter` is the signed-in user's id; unauthenticated submissions are recorded
/// under the configured anonymous marker. On any error the draft is left untouched.
pub async fn submit_census(
    db: &DatabaseConnection,
    config: &CensusConfig,
    draft: &mut CensusDraft,
    submitter: Option<&str>,
) -> Result<CensusSubmission> {
    let census = draft.validate(config)?;
    let submitted_by = submitter
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(config.anonymous_submitter.as_str());

    match create_submission(db, census, submitted_by).await {
        Ok(stored) => {
            *draft = CensusDraft::blank(config);
            Ok(stored)
        }
        Err(e) => {
            error!("Failed to store census submission: {}", e);
            Err(e)
        }
    }
}

/// Entry of the school selector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolOption {
    /// School id
    pub id: String,
    /// Display name
    pub name: String,
    /// INEP code
    pub inep: String,
}

/// Schools available to the form, with a warning when they could not be fetched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchoolOptions {
    /// Selectable schools, sorted by name
    pub schools: Vec<SchoolOption>,
    /// Set when the list could not be loaded
    pub warning: Option<String>,
}

/// Fetches the school selector options, ordered by name.
///
/// A fetch failure does not fail the form: the list is left empty and a warning
/// describes the problem.
pub async fn load_school_options(db: &DatabaseConnection) -> SchoolOptions {
    match School::find().order_by_asc(SchoolColumn::Name).all(db).await {
        Ok(schools) => SchoolOptions {
            schools: schools
                .into_iter()
                .map(|s| SchoolOption {
                    id: s.id,
                    name: s.name,
                    inep: s.inep,
                })
                .collect(),
            warning: None,
        },
        Err(e) => {
            warn!("Could not load schools for the census form: {}", e);
            SchoolOptions {
                schools: Vec::new(),
                warning: Some(format!("Could not load the school list: {e}")),
            }
        }
    }
}
