//! Credit-weighted GPA and CGPA.
//!
//! Everything here accumulates raw `(quality points, credit hours)` pairs and
//! divides only once per requested group. CGPA is never derived from
//! per-semester GPAs.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::error::{AggregateError, Scope};
use crate::grading::GradingPolicy;
use crate::models::{CourseRecord, CumulativeSummary, SemesterSummary, Summary};

/// Running accumulator for the weighted mean.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    pub quality_points: f64,
    pub credit_hours: f64,
}

impl Totals {
    pub const ZERO: Self = Self {
        quality_points: 0.0,
        credit_hours: 0.0,
    };

    #[must_use]
    pub fn combine(self, other: Self) -> Self {
        Self {
            quality_points: self.quality_points + other.quality_points,
            credit_hours: self.credit_hours + other.credit_hours,
        }
    }

    /// Folds `records` into `prior` and returns the new totals. `prior` is
    /// taken by value so a caller streaming semesters threads the result
    /// through explicitly.
    pub fn fold<'a, I>(
        prior: Self,
        records: I,
        policy: &GradingPolicy,
    ) -> Result<Self, AggregateError>
    where
        I: IntoIterator<Item = &'a CourseRecord>,
    {
        records.into_iter().try_fold(prior, |totals, record| -> Result<Self, AggregateError> {
            let (points, credits) = weighted_points(record, policy)?;
            Ok(Self {
                quality_points: totals.quality_points + points * credits,
                credit_hours: totals.credit_hours + credits,
            })
        })
    }

    pub fn ratio(self, scope: Scope) -> Result<f64, AggregateError> {
        if self.credit_hours == 0.0 {
            return Err(AggregateError::ZeroCredit { scope });
        }
        Ok(self.quality_points / self.credit_hours)
    }
}

pub fn compute_semester_gpa(
    records: &[CourseRecord],
    semester: u32,
    policy: &GradingPolicy,
) -> Result<SemesterSummary, AggregateError> {
    let group: Vec<&CourseRecord> = records
        .iter()
        .filter(|record| record.semester == semester)
        .collect();
    summarize_semester(semester, &group, policy).map(|(summary, _)| summary)
}

pub fn compute_cumulative_gpa(
    records: &[CourseRecord],
    upto_semester: u32,
    policy: &GradingPolicy,
) -> Result<CumulativeSummary, AggregateError> {
    let scope = Scope::UpTo(upto_semester);
    let pool: Vec<&CourseRecord> = records
        .iter()
        .filter(|record| record.semester <= upto_semester)
        .collect();
    if pool.is_empty() {
        return Err(AggregateError::EmptySemester { scope });
    }

    if carries_no_credit(&pool) {
        return Err(AggregateError::ZeroCredit { scope });
    }

    let totals = Totals::fold(Totals::ZERO, pool.iter().copied(), policy)?;
    let cgpa = totals.ratio(scope)?;
    let semester_count = pool
        .iter()
        .map(|record| record.semester)
        .collect::<BTreeSet<_>>()
        .len();

    debug!(
        upto_semester,
        cgpa,
        credit_hours = totals.credit_hours,
        "computed cumulative gpa"
    );

    Ok(CumulativeSummary {
        upto_semester,
        cgpa,
        total_credit_hours: totals.credit_hours,
        quality_points: totals.quality_points,
        semester_count,
        course_count: course_count(pool.iter().copied()),
    })
}

/// Per-semester GPAs in ascending semester order plus the CGPA over all
/// records. Semesters without records do not appear.
pub fn summarize_all(
    records: &[CourseRecord],
    policy: &GradingPolicy,
) -> Result<Summary, AggregateError> {
    summarize_with_trend(records, policy).map(|(summary, _)| summary)
}

/// [`summarize_all`] and [`cumulative_trend`] from a single pass, so each
/// record is graded once.
pub fn summarize_with_trend(
    records: &[CourseRecord],
    policy: &GradingPolicy,
) -> Result<(Summary, Vec<CumulativeSummary>), AggregateError> {
    let trend = build_trend(records, policy)?;
    let cumulative = trend
        .cumulative
        .last()
        .cloned()
        .ok_or(AggregateError::EmptySemester {
            scope: Scope::UpTo(0),
        })?;

    let summary = Summary {
        semesters: trend.semesters,
        cumulative,
    };
    Ok((summary, trend.cumulative))
}

/// CGPA after each semester that has records, folded one semester at a time.
pub fn cumulative_trend(
    records: &[CourseRecord],
    policy: &GradingPolicy,
) -> Result<Vec<CumulativeSummary>, AggregateError> {
    build_trend(records, policy).map(|trend| trend.cumulative)
}

/// Number of distinct course identifiers.
pub fn course_count<'a, I>(records: I) -> usize
where
    I: IntoIterator<Item = &'a CourseRecord>,
{
    records
        .into_iter()
        .map(|record| record.course_id.as_str())
        .collect::<BTreeSet<_>>()
        .len()
}

struct Trend {
    semesters: Vec<SemesterSummary>,
    cumulative: Vec<CumulativeSummary>,
}

fn build_trend(records: &[CourseRecord], policy: &GradingPolicy) -> Result<Trend, AggregateError> {
    let mut groups: BTreeMap<u32, Vec<&CourseRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.semester).or_default().push(record);
    }

    let mut trend = Trend {
        semesters: Vec::with_capacity(groups.len()),
        cumulative: Vec::with_capacity(groups.len()),
    };
    let mut running = Totals::ZERO;
    let mut seen_courses: BTreeSet<&str> = BTreeSet::new();

    for (semester, group) in &groups {
        let (summary, totals) = summarize_semester(*semester, group, policy)?;
        running = running.combine(totals);
        seen_courses.extend(group.iter().map(|record| record.course_id.as_str()));

        let scope = Scope::UpTo(*semester);
        trend.cumulative.push(CumulativeSummary {
            upto_semester: *semester,
            cgpa: running.ratio(scope)?,
            total_credit_hours: running.credit_hours,
            quality_points: running.quality_points,
            semester_count: trend.semesters.len() + 1,
            course_count: seen_courses.len(),
        });
        trend.semesters.push(summary);
    }

    Ok(trend)
}

fn summarize_semester(
    semester: u32,
    group: &[&CourseRecord],
    policy: &GradingPolicy,
) -> Result<(SemesterSummary, Totals), AggregateError> {
    let scope = Scope::Semester(semester);
    if group.is_empty() {
        return Err(AggregateError::EmptySemester { scope });
    }
    if carries_no_credit(group) {
        return Err(AggregateError::ZeroCredit { scope });
    }

    let totals = Totals::fold(Totals::ZERO, group.iter().copied(), policy)?;
    let gpa = totals.ratio(scope)?;

    debug!(
        semester,
        gpa,
        credit_hours = totals.credit_hours,
        courses = group.len(),
        "computed semester gpa"
    );

    let summary = SemesterSummary {
        semester,
        gpa,
        total_credit_hours: totals.credit_hours,
        quality_points: totals.quality_points,
        course_count: group.len(),
    };
    Ok((summary, totals))
}

/// A group whose every course is worth 0 credits has no defined GPA. A
/// zero-credit course next to credit-bearing ones is an invalid record.
fn carries_no_credit(group: &[&CourseRecord]) -> bool {
    group.iter().all(|record| record.credit_hours == 0.0)
}

/// Validates one record and returns its `(grade points, credit hours)`.
fn weighted_points(
    record: &CourseRecord,
    policy: &GradingPolicy,
) -> Result<(f64, f64), AggregateError> {
    if record.semester == 0 {
        return Err(AggregateError::InvalidSemester {
            course_id: record.course_id.clone(),
        });
    }
    if !record.credit_hours.is_finite() || record.credit_hours <= 0.0 {
        return Err(AggregateError::InvalidCredit {
            course_id: record.course_id.clone(),
            credit_hours: record.credit_hours,
        });
    }
    let points = policy
        .points_for(&record.score)
        .map_err(|source| AggregateError::Grade {
            course_id: record.course_id.clone(),
            source,
        })?;
    Ok((points, record.credit_hours))
}
