//! Census domain types - the typed shape of a school's census submission.
//!
//! The persisted `submissions` rows keep their nested sections as JSON; this
//! module defines what those documents contain and converts stored rows into
//! [`CensusSubmission`] values that the builder and aggregator work with.

use crate::{
    core::dynamic::DynamicData,
    entities::submission,
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// A school as stored in the reference data
pub type School = crate::entities::SchoolModel;

/// Period of the day a classroom is occupied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Turn {
    Morning,
    Afternoon,
    Night,
    /// Whole-day occupation, exclusive with the three turns
    Integral,
}

impl Turn {
    /// Stored name of the shift
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Afternoon => "afternoon",
            Self::Night => "night",
            Self::Integral => "integral",
        }
    }
}

impl fmt::Display for Turn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current grade and head count of one occupation slot, plus its projected grade
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeSlot {
    /// Grade currently taught in the slot; free text
    #[serde(default)]
    pub grade: Option<String>,
    /// Students currently enrolled in the slot
    #[serde(default)]
    pub student_count: i64,
    /// Grade planned for the slot in the projection year; free text
    #[serde(default)]
    pub projected_grade: Option<String>,
}

impl GradeSlot {
    /// The current grade, ignoring blank labels.
    #[must_use]
    pub fn current_grade(&self) -> Option<&str> {
        self.grade.as_deref().map(str::trim).filter(|g| !g.is_empty())
    }
}

/// How a classroom is occupied during the day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Occupation {
    /// One group for the whole day
    Integral {
        slot: GradeSlot,
    },
    /// Up to three groups, one per turn
    Turns {
        #[serde(default)]
        morning: Option<GradeSlot>,
        #[serde(default)]
        afternoon: Option<GradeSlot>,
        #[serde(default)]
        night: Option<GradeSlot>,
    },
}

impl Default for Occupation {
    fn default() -> Self {
        Self::Turns {
            morning: None,
            afternoon: None,
            night: None,
        }
    }
}

impl Occupation {
    /// Populated slots in turn order.
    #[must_use]
    pub fn slots(&self) -> Vec<(Turn, &GradeSlot)> {
        match self {
            Self::Integral { slot } => vec![(Turn::Integral, slot)],
            Self::Turns {
                morning,
                afternoon,
                night,
            } => [
                (Turn::Morning, morning),
                (Turn::Afternoon, afternoon),
                (Turn::Night, night),
            ]
            .into_iter()
            .filter_map(|(turn, slot)| slot.as_ref().map(|s| (turn, s)))
            .collect(),
        }
    }
}

/// One physical classroom of the school
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classroom {
    /// Classroom label
    pub name: String,
    /// Students it seats
    #[serde(default)]
    pub student_capacity: i64,
    /// Power outlets
    #[serde(default)]
    pub outlets: i64,
    /// Televisions
    #[serde(default)]
    pub tv_count: i64,
    /// Chairs
    #[serde(default)]
    pub chair_count: i64,
    /// Fans
    #[serde(default)]
    pub fan_count: i64,
    /// Which shifts use it
    #[serde(default)]
    pub occupation: Occupation,
}

/// A teaching modality the school may offer (e.g. "Fundamental", "EJA")
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeachingModality {
    /// Modality name
    pub name: String,
    /// Whether the school offers it
    #[serde(default)]
    pub offered: bool,
    /// Students enrolled in it
    #[serde(default)]
    pub student_count: i64,
}

/// One technology item and how many the school has
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnologyResource {
    /// Resource name
    pub name: String,
    /// Units available
    pub quantity: u32,
}

/// Technology section of a submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnologyData {
    /// Enabled resources only
    #[serde(default)]
    pub resources: Vec<TechnologyResource>,
    /// Internet access
    #[serde(default)]
    pub has_internet_access: bool,
}

/// A professional currently teaching a classroom/turn
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherAllocation {
    /// Professional reference
    pub professional_id: String,
    /// Contract kind
    #[serde(default)]
    pub contract_type: Option<String>,
    /// Weekly hours
    #[serde(default)]
    pub workload: Option<u32>,
    /// Free-text notes
    #[serde(default)]
    pub observations: Option<String>,
}

/// A professional planned for a classroom/turn in the projection year
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherProjection {
    /// Professional reference
    pub professional_id: String,
    /// Registration number
    #[serde(default)]
    pub matricula: Option<String>,
    /// Class the teacher is planned for
    #[serde(default)]
    pub class_name: Option<String>,
    /// Planned shift
    #[serde(default)]
    pub turn: Option<Turn>,
    /// Contract kind
    #[serde(default)]
    pub contract_type: Option<String>,
    /// Weekly hours
    #[serde(default)]
    pub workload: Option<u32>,
    /// Employment situation
    #[serde(default)]
    pub situation: Option<String>,
    /// Free-text notes
    #[serde(default)]
    pub annotations: Option<String>,
}

/// Staff allocated to one classroom/turn pair, now and projected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassroomAllocation {
    /// Classroom name
    pub classroom: String,
    /// Shift
    pub turn: Turn,
    /// Teachers this year
    #[serde(default)]
    pub teachers: Vec<TeacherAllocation>,
    /// Teachers planned for the projection year
    #[serde(default, rename = "teachers2026")]
    pub projected_teachers: Vec<TeacherProjection>,
}

/// Professionals section of a submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfessionalsData {
    /// One entry per classroom/turn pair
    #[serde(default)]
    pub allocations: Vec<ClassroomAllocation>,
}

/// Thematic section of a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    General,
    Infrastructure,
    Technology,
    Cultural,
    Maintenance,
}

impl Section {
    /// Every section, in form order
    pub const ALL: [Self; 5] = [
        Self::General,
        Self::Infrastructure,
        Self::Technology,
        Self::Cultural,
        Self::Maintenance,
    ];

    /// Stored name of the section
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Infrastructure => "infrastructure",
            Self::Technology => "technology",
            Self::Cultural => "cultural",
            Self::Maintenance => "maintenance",
        }
    }
}

impl FromStr for Section {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|section| section.as_str() == s)
            .ok_or_else(|| Error::not_found("section", s))
    }
}

/// Completion flag of one section
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStatus {
    #[default]
    Pending,
    Completed,
}

/// Completion flags of all five sections
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionStatuses {
    /// General section
    pub general: SectionStatus,
    /// Infrastructure section
    pub infrastructure: SectionStatus,
    /// Technology section
    pub technology: SectionStatus,
    /// Cultural section
    pub cultural: SectionStatus,
    /// Maintenance section
    pub maintenance: SectionStatus,
}

impl SectionStatuses {
    /// Status of one section
    #[must_use]
    pub const fn get(&self, section: Section) -> SectionStatus {
        match section {
            Section::General => self.general,
            Section::Infrastructure => self.infrastructure,
            Section::Technology => self.technology,
            Section::Cultural => self.cultural,
            Section::Maintenance => self.maintenance,
        }
    }

    /// Sets the status of one section.
    pub const fn set(&mut self, section: Section, status: SectionStatus) {
        match section {
            Section::General => self.general = status,
            Section::Infrastructure => self.infrastructure = status,
            Section::Technology => self.technology = status,
            Section::Cultural => self.cultural = status,
            Section::Maintenance => self.maintenance = status,
        }
    }

    /// True only when all five sections are completed.
    #[must_use]
    pub fn is_fully_complete(&self) -> bool {
        Section::ALL
            .into_iter()
            .all(|section| self.get(section) == SectionStatus::Completed)
    }
}

/// Dynamic field answers, one mapping per section
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionDynamicData {
    /// General section
    pub general: DynamicData,
    /// Infrastructure section
    pub infrastructure: DynamicData,
    /// Technology section
    pub technology: DynamicData,
    /// Cultural section
    pub cultural: DynamicData,
    /// Maintenance section
    pub maintenance: DynamicData,
}

impl SectionDynamicData {
    /// Answers of one section
    #[must_use]
    pub const fn section(&self, section: Section) -> &DynamicData {
        match section {
            Section::General => &self.general,
            Section::Infrastructure => &self.infrastructure,
            Section::Technology => &self.technology,
            Section::Cultural => &self.cultural,
            Section::Maintenance => &self.maintenance,
        }
    }
}

/// A stored census submission with its sections decoded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CensusSubmission {
    /// Generated id
    pub id: String,
    /// School the census is for
    pub school_id: String,
    /// Classrooms, at least one
    pub classrooms: Vec<Classroom>,
    /// Teaching modalities, at least one
    pub teaching_modalities: Vec<TeachingModality>,
    /// Technology section
    pub technology: TechnologyData,
    /// Professionals section
    pub professionals: ProfessionalsData,
    /// Free-form answers per section
    pub dynamic_data: SectionDynamicData,
    /// Admin review progress
    pub section_statuses: SectionStatuses,
    /// Submission time
    pub submitted_at: DateTime<Utc>,
    /// Submitting user id, or the anonymous marker
    pub submitted_by: String,
}

impl CensusSubmission {
    /// Whether every section is completed.
    #[must_use]
    pub fn is_fully_complete(&self) -> bool {
        self.section_statuses.is_fully_complete()
    }
}

impl TryFrom<submission::Model> for CensusSubmission {
    type Error = Error;

    fn try_from(model: submission::Model) -> Result<Self> {
        Ok(Self {
            id: model.id,
            school_id: model.school_id,
            classrooms: serde_json::from_value(model.classrooms)?,
            teaching_modalities: serde_json::from_value(model.teaching_modalities)?,
            technology: serde_json::from_value(model.technology)?,
            professionals: serde_json::from_value(model.professionals)?,
            dynamic_data: serde_json::from_value(model.dynamic_data)?,
            section_statuses: serde_json::from_value(model.section_statuses)?,
            submitted_at: model.submitted_at,
            submitted_by: model.submitted_by,
        })
    }
}
