use serde::{Deserialize, Serialize};

/// How a course's result was recorded. Exactly one representation is
/// authoritative per record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Score {
    /// Raw marks on a 0..=100 scale.
    Marks(f64),
    /// A letter from the policy's grade set, e.g. `"B+"`.
    Letter(String),
    /// Grade points assigned upstream.
    Points(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub semester: u32,
    pub course_id: String,
    pub credit_hours: f64,
    pub score: Score,
}

impl CourseRecord {
    pub fn new(
        semester: u32,
        course_id: impl Into<String>,
        credit_hours: f64,
        score: Score,
    ) -> Self {
        Self {
            semester,
            course_id: course_id.into(),
            credit_hours,
            score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SemesterSummary {
    pub semester: u32,
    pub gpa: f64,
    pub total_credit_hours: f64,
    pub quality_points: f64,
    pub course_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CumulativeSummary {
    pub upto_semester: u32,
    pub cgpa: f64,
    pub total_credit_hours: f64,
    pub quality_points: f64,
    pub semester_count: usize,
    /// Distinct course identifiers in the pool.
    pub course_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub semesters: Vec<SemesterSummary>,
    pub cumulative: CumulativeSummary,
}
