use std::fmt;

/// Failures raised while converting a raw score into grade points.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GradeError {
    #[error("marks {marks} are outside 0..=100")]
    OutOfRange { marks: f64 },

    #[error("unknown letter grade {literal:?}")]
    UnknownGrade { literal: String },

    #[error("grade points {points} are outside 0..={ceiling}")]
    PointsOutOfRange { points: f64, ceiling: f64 },

    #[error("invalid grading table: {reason}")]
    InvalidTable { reason: String },
}

/// Which group of records an aggregation was asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Semester(u32),
    UpTo(u32),
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Semester(semester) => write!(f, "semester {semester}"),
            Self::UpTo(semester) => write!(f, "semesters 1..={semester}"),
        }
    }
}

/// Failures raised by the aggregation engine.
///
/// A bad record inside the requested group fails the whole group; records
/// outside the group are never inspected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AggregateError {
    #[error("no course records for {scope}")]
    EmptySemester { scope: Scope },

    #[error("total credit hours for {scope} sum to zero")]
    ZeroCredit { scope: Scope },

    #[error("course {course_id:?} has invalid credit hours {credit_hours}")]
    InvalidCredit { course_id: String, credit_hours: f64 },

    #[error("course {course_id:?} has semester 0; semesters start at 1")]
    InvalidSemester { course_id: String },

    #[error("course {course_id:?}: {source}")]
    Grade {
        course_id: String,
        #[source]
        source: GradeError,
    },
}
