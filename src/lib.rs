//! GPA and CGPA calculation for Group Scholar course records.
//!
//! [`grading`] turns marks, letters or raw points into grade points under a
//! swappable [`GradingPolicy`]; [`aggregate`] folds those into credit-weighted
//! semester GPAs and a cumulative CGPA. [`import`] and [`report`] are the CSV
//! input and text/markdown/JSON output used by the `gpa-calculator` binary.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod grading;
pub mod import;
pub mod models;
pub mod report;

pub use aggregate::{
    compute_cumulative_gpa, compute_semester_gpa, cumulative_trend, summarize_all,
    summarize_with_trend, Totals,
};
pub use error::{AggregateError, GradeError, Scope};
pub use grading::{GradingPolicy, Preset, UnknownLetter};
pub use models::{CourseRecord, CumulativeSummary, Score, SemesterSummary, Summary};
