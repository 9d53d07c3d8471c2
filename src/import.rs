use std::io;
use std::path::Path;

use anyhow::{bail, Context};
use csv::StringRecord;
use tracing::info;

use crate::models::{CourseRecord, Score};

#[derive(serde::Deserialize)]
struct CsvRow {
    semester: u32,
    #[serde(alias = "course_id", alias = "course_title")]
    course: String,
    #[serde(alias = "credits", alias = "credit_hour")]
    credit_hours: f64,
    #[serde(default, alias = "letter")]
    grade: Option<String>,
    #[serde(default, alias = "mark")]
    marks: Option<f64>,
    #[serde(default, alias = "grade_points")]
    points: Option<f64>,
}

impl CsvRow {
    fn into_record(self, line: u64) -> anyhow::Result<CourseRecord> {
        let grade = self.grade.filter(|grade| !grade.trim().is_empty());
        let score = match (grade, self.marks, self.points) {
            (Some(letter), None, None) => Score::Letter(letter),
            (None, Some(marks), None) => Score::Marks(marks),
            (None, None, Some(points)) => Score::Points(points),
            (None, None, None) => {
                bail!("line {line}: course {:?} has no grade, marks or points", self.course)
            }
            _ => bail!(
                "line {line}: course {:?} sets more than one of grade, marks and points",
                self.course
            ),
        };
        Ok(CourseRecord::new(
            self.semester,
            self.course.trim(),
            self.credit_hours,
            score,
        ))
    }
}

/// Accepted spellings for each mandatory column, after normalization.
const REQUIRED_COLUMNS: [(&str, &[&str]); 3] = [
    ("semester", &["semester"]),
    ("course", &["course", "course_id", "course_title"]),
    ("credit_hours", &["credit_hours", "credits", "credit_hour"]),
];

/// `" Credit Hours"` and `"credit-hours"` both become `credit_hours`.
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

pub fn read_records<R: io::Read>(source: R) -> anyhow::Result<Vec<CourseRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers: StringRecord = reader
        .headers()
        .context("failed to read CSV header")?
        .iter()
        .map(normalize_header)
        .collect();
    for (column, accepted) in REQUIRED_COLUMNS {
        if !headers.iter().any(|header| accepted.contains(&header)) {
            let found: Vec<&str> = headers.iter().collect();
            bail!("missing required column {column:?} (found: {})", found.join(", "));
        }
    }
    reader.set_headers(headers);

    let mut records = Vec::new();
    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        // Header is line 1.
        let line = index as u64 + 2;
        let row = result.with_context(|| format!("line {line}: malformed row"))?;
        records.push(row.into_record(line)?);
    }

    Ok(records)
}

pub fn import_csv(path: &Path) -> anyhow::Result<Vec<CourseRecord>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let records =
        read_records(file).with_context(|| format!("failed to import {}", path.display()))?;
    info!(count = records.len(), path = %path.display(), "imported course records");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn headers_are_normalized() {
        assert_eq!(normalize_header(" Credit_Hours "), "credit_hours");
        assert_eq!(normalize_header("Credit Hours"), "credit_hours");
        assert_eq!(normalize_header("GRADE-POINTS"), "grade_points");
        assert_eq!(normalize_header("Semester"), "semester");
    }

    #[test]
    fn reads_letter_grades_with_title_case_headers() {
        let csv = "Semester,Course,Credit_Hours,Grade\n\
                   1,Programming,3,A\n\
                   1,Math,3,B+\n\
                   2,Physics,4, A- \n";
        let records = read_records(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].course_id, "Math");
        assert_eq!(records[1].score, Score::Letter("B+".to_string()));
        assert_eq!(records[2].semester, 2);
        assert_eq!(records[2].credit_hours, 4.0);
    }

    #[test]
    fn reads_mixed_score_columns() {
        let csv = "semester,course,credit hours,grade,marks,points\n\
                   1,CS101,3,,90,\n\
                   1,MA101,2,B,,\n\
                   2,PH201,3,,,2.3\n";
        let records = read_records(csv.as_bytes()).unwrap();
        assert_eq!(records[0].score, Score::Marks(90.0));
        assert_eq!(records[1].score, Score::Letter("B".to_string()));
        assert_eq!(records[2].score, Score::Points(2.3));
    }

    #[test]
    fn rows_need_exactly_one_score() {
        let csv = "semester,course,credit_hours,grade,marks\n1,CS101,3,A,90\n";
        let err = read_records(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("more than one"));

        let csv = "semester,course,credit_hours,grade,marks\n1,CS101,3,,\n";
        let err = read_records(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn missing_columns_are_reported() {
        let csv = "semester,course,grade\n1,CS101,A\n";
        let err = read_records(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("credit_hours"));
    }

    #[test]
    fn imports_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Semester,Course,Credit_Hours,Marks").unwrap();
        writeln!(file, "1,CS101,3,90").unwrap();
        writeln!(file, "1,MA101,2,70").unwrap();

        let records = import_csv(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].score, Score::Marks(90.0));
    }
}
