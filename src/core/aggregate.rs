//! Submission aggregation - the read models behind the admin dashboard.
//!
//! Everything here is a pure function over already-loaded submissions and
//! schools: nothing touches the database and nothing mutates its inputs. The
//! functions join submissions to their schools by id, filter them by a free-text
//! query, and derive the metric cards, the per-day chart and the 2026 projection
//! tables.

use crate::{
    config::app::DashboardConfig,
    core::census::{CensusSubmission, ClassroomAllocation, School, Section, Turn},
};
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Shown instead of a school name when a submission's school is missing
pub const UNKNOWN_SCHOOL: &str = "Escola não encontrada";

/// Shown instead of a professional name when the id has no match
pub const PROFESSIONAL_NOT_FOUND: &str = "N/A";

/// School lookup by id. Later duplicates replace earlier ones.
#[derive(Debug, Default)]
pub struct SchoolIndex<'a> {
    by_id: HashMap<&'a str, &'a School>,
}

impl<'a> SchoolIndex<'a> {
    /// Indexes `schools` by id.
    #[must_use]
    pub fn new(schools: &'a [School]) -> Self {
        Self {
            by_id: schools.iter().map(|s| (s.id.as_str(), s)).collect(),
        }
    }

    /// School with this id, if any
    #[must_use]
    pub fn get(&self, school_id: &str) -> Option<&'a School> {
        self.by_id.get(school_id).copied()
    }
}

/// Case-insensitive substring match against the school's name or INEP code.
fn school_matches(school: &School, query_lower: &str) -> bool {
    school.name.to_lowercase().contains(query_lower)
        || school.inep.to_lowercase().contains(query_lower)
}

/// Submissions matching a free-text query.
///
/// A blank query is the unfiltered view and returns every submission. Otherwise
/// only submissions whose school is known and matches the query are kept.
#[must_use]
pub fn filter_submissions<'s>(
    submissions: &'s [CensusSubmission],
    index: &SchoolIndex<'_>,
    query: &str,
) -> Vec<&'s CensusSubmission> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return submissions.iter().collect();
    }

    submissions
        .iter()
        .filter(|submission| {
            index
                .get(&submission.school_id)
                .is_some_and(|school| school_matches(school, &query))
        })
        .collect()
}

/// Dashboard metric cards
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardMetrics {
    /// Distinct schools among the filtered submissions
    pub total_schools: usize,
    /// Classrooms summed over the filtered submissions
    pub total_classrooms: usize,
    /// Sum of the desk field, see [`desk_count`]
    pub total_desks: f64,
    /// Submissions with every section completed
    pub completed_submissions: usize,
}

/// Desk count declared in a submission's general-section dynamic data.
///
/// There is no schema field for desks: the value is found by scanning for the
/// first key that starts with `prefix`. If that value is not numeric the
/// submission contributes nothing. This relies on a naming convention of the
/// form-builder field ids and breaks silently if the field is renamed.
#[must_use]
pub fn desk_count(submission: &CensusSubmission, prefix: &str) -> Option<f64> {
    submission
        .dynamic_data
        .section(Section::General)
        .iter()
        .find(|(key, _)| key.starts_with(prefix))
        .and_then(|(_, value)| value.as_number())
}

/// Computes the metric cards.
#[must_use]
pub fn compute_metrics(
    submissions: &[CensusSubmission],
    schools: &[School],
    desk_prefix: &str,
) -> DashboardMetrics {
    DashboardMetrics {
        total_schools: schools.len(),
        total_classrooms: submissions.iter().map(|s| s.classrooms.len()).sum(),
        total_desks: submissions
            .iter()
            .filter_map(|s| desk_count(s, desk_prefix))
            .sum(),
        completed_submissions: submissions.iter().filter(|s| s.is_fully_complete()).count(),
    }
}

/// Number of submissions received on one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    /// Day formatted as `dd/mm/yyyy`
    pub day: String,
    /// Submissions received that day
    pub count: usize,
}

/// Converts a minute offset from the configuration into a fixed offset, UTC if out of range.
#[must_use]
pub fn offset_from_minutes(minutes: i32) -> FixedOffset {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix())
}

fn local_day(submitted_at: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    submitted_at.with_timezone(&offset).date_naive()
}

/// Submissions per calendar day, oldest day first.
#[must_use]
pub fn submissions_per_day(
    submissions: &[CensusSubmission],
    offset: FixedOffset,
) -> Vec<DailyCount> {
    let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for submission in submissions {
        *per_day
            .entry(local_day(submission.submitted_at, offset))
            .or_default() += 1;
    }

    per_day
        .into_iter()
        .map(|(day, count)| DailyCount {
            day: day.format("%d/%m/%Y").to_string(),
            count,
        })
        .collect()
}

/// Row of the submissions table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionRow {
    /// Submission id
    pub submission_id: String,
    /// School the submission is for
    pub school_id: String,
    /// School name, or a placeholder for unknown schools
    pub school_name: String,
    /// INEP code when the school is known
    pub inep: Option<String>,
    /// Classrooms declared
    pub classroom_count: usize,
    /// Every section completed
    pub completed: bool,
    /// When the census was submitted
    pub submitted_at: DateTime<Utc>,
}

/// Rows of the submissions table for a query, newest first.
///
/// Unmatched schools appear as [`UNKNOWN_SCHOOL`] in the unfiltered view only.
#[must_use]
pub fn submission_rows(
    submissions: &[CensusSubmission],
    index: &SchoolIndex<'_>,
    query: &str,
) -> Vec<SubmissionRow> {
    let mut rows: Vec<SubmissionRow> = filter_submissions(submissions, index, query)
        .into_iter()
        .map(|submission| {
            let school = index.get(&submission.school_id);
            SubmissionRow {
                submission_id: submission.id.clone(),
                school_id: submission.school_id.clone(),
                school_name: school.map_or_else(|| UNKNOWN_SCHOOL.to_string(), |s| s.name.clone()),
                inep: school.map(|s| s.inep.clone()),
                classroom_count: submission.classrooms.len(),
                completed: submission.is_fully_complete(),
                submitted_at: submission.submitted_at,
            }
        })
        .collect();
    rows.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
    rows
}

/// All submissions of one school
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchoolGroup {
    /// Grouped school
    pub school_id: String,
    /// School name, or a placeholder for unknown schools
    pub school_name: String,
    /// Submissions of this school, in input order
    pub submission_ids: Vec<String>,
    /// Newest submission time
    pub latest_submitted_at: DateTime<Utc>,
}

/// Groups submissions by school id, in order of each school's first submission.
#[must_use]
pub fn group_by_school(
    submissions: &[&CensusSubmission],
    index: &SchoolIndex<'_>,
) -> Vec<SchoolGroup> {
    let mut groups: Vec<SchoolGroup> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for submission in submissions {
        if let Some(&position) = positions.get(submission.school_id.as_str()) {
            let group = &mut groups[position];
            group.submission_ids.push(submission.id.clone());
            group.latest_submitted_at = group.latest_submitted_at.max(submission.submitted_at);
        } else {
            positions.insert(submission.school_id.as_str(), groups.len());
            groups.push(SchoolGroup {
                school_id: submission.school_id.clone(),
                school_name: index
                    .get(&submission.school_id)
                    .map_or_else(|| UNKNOWN_SCHOOL.to_string(), |s| s.name.clone()),
                submission_ids: vec![submission.id.clone()],
                latest_submitted_at: submission.submitted_at,
            });
        }
    }

    groups
}

/// One classroom slot: current grade and head count next to the projected grade
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradeProjectionRow {
    /// Source submission
    pub submission_id: String,
    /// School of the submission
    pub school_id: String,
    /// Classroom name
    pub classroom: String,
    /// Shift
    pub turn: Turn,
    /// Grade taught this year
    pub current_grade: String,
    /// Students enrolled
    pub student_count: i64,
    /// Grade planned for the projection year
    pub projected_grade: Option<String>,
}

/// One row per occupied slot that has a current grade.
#[must_use]
pub fn grade_projection_rows(submissions: &[&CensusSubmission]) -> Vec<GradeProjectionRow> {
    submissions
        .iter()
        .flat_map(|submission| {
            submission.classrooms.iter().flat_map(move |classroom| {
                classroom
                    .occupation
                    .slots()
                    .into_iter()
                    .filter_map(move |(turn, slot)| {
                        slot.current_grade().map(|grade| GradeProjectionRow {
                            submission_id: submission.id.clone(),
                            school_id: submission.school_id.clone(),
                            classroom: classroom.name.clone(),
                            turn,
                            current_grade: grade.to_string(),
                            student_count: slot.student_count,
                            projected_grade: slot
                                .projected_grade
                                .as_deref()
                                .map(str::trim)
                                .filter(|g| !g.is_empty())
                                .map(ToString::to_string),
                        })
                    })
            })
        })
        .collect()
}

/// Teacher cells of a projection row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectedTeacher {
    /// Professional reference
    pub professional_id: String,
    /// Resolved name, or `N/A` when the id is unknown
    pub professional_name: String,
    /// Registration number
    pub matricula: Option<String>,
    /// Class the teacher is planned for
    pub class_name: Option<String>,
    /// Planned shift
    pub turn: Option<Turn>,
    /// Contract kind
    pub contract_type: Option<String>,
    /// Weekly hours
    pub workload: Option<u32>,
    /// Employment situation
    pub situation: Option<String>,
    /// Free-text notes
    pub annotations: Option<String>,
}

/// One projected teacher of a classroom/turn, or a placeholder when none is planned
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeacherProjectionRow {
    /// Source submission
    pub submission_id: String,
    /// School of the submission
    pub school_id: String,
    /// Classroom name
    pub classroom: String,
    /// Shift
    pub turn: Turn,
    /// `None` when no teacher is planned
    pub teacher: Option<ProjectedTeacher>,
}

/// Projection rows of a single classroom allocation.
///
/// An allocation without projected teachers still yields one row with no teacher,
/// so every classroom shows up in the planning table.
#[must_use]
pub fn allocation_projection_rows(
    submission: &CensusSubmission,
    allocation: &ClassroomAllocation,
    professional_names: &HashMap<String, String>,
) -> Vec<TeacherProjectionRow> {
    let row = |teacher: Option<ProjectedTeacher>| TeacherProjectionRow {
        submission_id: submission.id.clone(),
        school_id: submission.school_id.clone(),
        classroom: allocation.classroom.clone(),
        turn: allocation.turn,
        teacher,
    };

    if allocation.projected_teachers.is_empty() {
        return vec![row(None)];
    }

    allocation
        .projected_teachers
        .iter()
        .map(|projection| {
            row(Some(ProjectedTeacher {
                professional_id: projection.professional_id.clone(),
                professional_name: professional_names
                    .get(&projection.professional_id)
                    .cloned()
                    .unwrap_or_else(|| PROFESSIONAL_NOT_FOUND.to_string()),
                matricula: projection.matricula.clone(),
                class_name: projection.class_name.clone(),
                turn: projection.turn,
                contract_type: projection.contract_type.clone(),
                workload: projection.workload,
                situation: projection.situation.clone(),
                annotations: projection.annotations.clone(),
            }))
        })
        .collect()
}

/// Projection rows for every allocation of every submission.
#[must_use]
pub fn teacher_projection_rows(
    submissions: &[&CensusSubmission],
    professional_names: &HashMap<String, String>,
) -> Vec<TeacherProjectionRow> {
    submissions
        .iter()
        .flat_map(|submission| {
            submission
                .professionals
                .allocations
                .iter()
                .flat_map(|allocation| {
                    allocation_projection_rows(submission, allocation, professional_names)
                })
        })
        .collect()
}

/// Everything the dashboard page renders
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    /// Filter as typed
    pub query: String,
    /// Metric cards
    pub metrics: DashboardMetrics,
    /// Submissions per day, oldest day first
    pub daily_counts: Vec<DailyCount>,
    /// Submissions table
    pub rows: Vec<SubmissionRow>,
    /// Submissions grouped by school
    pub groups: Vec<SchoolGroup>,
}

/// Builds the dashboard from loaded submissions and schools.
///
/// Metrics and the per-day chart always cover every submission; the table and the
/// school groups follow the query.
#[must_use]
pub fn build_dashboard(
    submissions: &[CensusSubmission],
    schools: &[School],
    query: &str,
    config: &DashboardConfig,
) -> DashboardView {
    let index = SchoolIndex::new(schools);
    let filtered = filter_submissions(submissions, &index, query);

    DashboardView {
        query: query.trim().to_string(),
        metrics: compute_metrics(submissions, schools, &config.desk_field_prefix),
        daily_counts: submissions_per_day(
            submissions,
            offset_from_minutes(config.utc_offset_minutes),
        ),
        rows: submission_rows(submissions, &index, query),
        groups: group_by_school(&filtered, &index),
    }
}
