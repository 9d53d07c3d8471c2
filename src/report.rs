use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::grading::GradingPolicy;
use crate::models::{CumulativeSummary, SemesterSummary, Summary};

/// Rounds for display only; aggregation never calls this.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// Summaries are weighted means of points already checked against the
// policy ceiling, so the lookup only fails on hand-built out-of-range values.
fn display_letter(policy: &GradingPolicy, points: f64) -> &str {
    policy.letter_from_points(points).unwrap_or("?")
}

#[derive(Debug, Serialize)]
pub struct SemesterRow<'a> {
    pub semester: u32,
    pub gpa: f64,
    pub letter: &'a str,
    pub credit_hours: f64,
    pub courses: usize,
}

#[derive(Debug, Serialize)]
pub struct TrendRow {
    pub upto_semester: u32,
    pub cgpa: f64,
    pub credit_hours: f64,
}

#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub policy: &'a str,
    pub semesters: Vec<SemesterRow<'a>>,
    pub trend: Vec<TrendRow>,
    pub cgpa: f64,
    pub letter: &'a str,
    pub total_courses: usize,
    pub total_credit_hours: f64,
}

pub fn semester_rows<'a>(
    policy: &'a GradingPolicy,
    semesters: &[SemesterSummary],
) -> Vec<SemesterRow<'a>> {
    semesters
        .iter()
        .map(|summary| SemesterRow {
            semester: summary.semester,
            gpa: round2(summary.gpa),
            letter: display_letter(policy, summary.gpa),
            credit_hours: summary.total_credit_hours,
            courses: summary.course_count,
        })
        .collect()
}

pub fn build_json<'a>(
    policy: &'a GradingPolicy,
    summary: &Summary,
    trend: &[CumulativeSummary],
) -> JsonReport<'a> {
    JsonReport {
        policy: policy.name(),
        semesters: semester_rows(policy, &summary.semesters),
        trend: trend
            .iter()
            .map(|entry| TrendRow {
                upto_semester: entry.upto_semester,
                cgpa: round2(entry.cgpa),
                credit_hours: entry.total_credit_hours,
            })
            .collect(),
        cgpa: round2(summary.cumulative.cgpa),
        letter: display_letter(policy, summary.cumulative.cgpa),
        total_courses: summary.cumulative.course_count,
        total_credit_hours: summary.cumulative.total_credit_hours,
    }
}

pub fn render_semester(policy: &GradingPolicy, summary: &SemesterSummary) -> String {
    format!(
        "Semester {}: GPA {:.2} ({}) over {} credit hours in {} courses",
        summary.semester,
        round2(summary.gpa),
        display_letter(policy, summary.gpa),
        summary.total_credit_hours,
        summary.course_count
    )
}

pub fn render_cumulative(policy: &GradingPolicy, summary: &CumulativeSummary) -> String {
    format!(
        "CGPA through semester {}: {:.2} ({}) over {} credit hours in {} courses",
        summary.upto_semester,
        round2(summary.cgpa),
        display_letter(policy, summary.cgpa),
        summary.total_credit_hours,
        summary.course_count
    )
}

pub fn render_text(policy: &GradingPolicy, summary: &Summary) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "GPA per semester ({} scale):", policy.name());
    for summary in &summary.semesters {
        let _ = writeln!(output, "- {}", render_semester(policy, summary));
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "{}", render_cumulative(policy, &summary.cumulative));

    output
}

pub fn render_scales(policy: &GradingPolicy) -> String {
    let mut output = String::new();

    let _ = writeln!(
        output,
        "Grading scale: {} (ceiling {:.2}, unknown letters: {:?})",
        policy.name(),
        policy.ceiling(),
        policy.unknown_letter()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "Marks:");
    for band in policy.marks_table().bands() {
        let _ = writeln!(output, "- {:>5.1}+ => {:.2}", band.threshold, band.points);
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "Letters:");
    for (letter, points) in policy.letter_scale().entries() {
        let _ = writeln!(output, "- {letter:<3} => {points:.2}");
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "Display:");
    for band in policy.display_bands().bands() {
        let _ = writeln!(output, "- {:.2}+ => {}", band.min_points, band.letter);
    }

    output
}

pub fn build_report(
    source: &str,
    policy: &GradingPolicy,
    summary: &Summary,
    trend: &[CumulativeSummary],
    generated_at: DateTime<Utc>,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# GPA & CGPA Report");
    let _ = writeln!(
        output,
        "Generated for {} on {} using the {} scale",
        source,
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        policy.name()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Semester GPA");
    let _ = writeln!(output);
    let _ = writeln!(output, "| Semester | GPA | Letter | Credit Hours | Courses |");
    let _ = writeln!(output, "|---|---|---|---|---|");
    for row in semester_rows(policy, &summary.semesters) {
        let _ = writeln!(
            output,
            "| {} | {:.2} | {} | {} | {} |",
            row.semester, row.gpa, row.letter, row.credit_hours, row.courses
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Cumulative CGPA");
    let _ = writeln!(output);
    for entry in trend {
        let _ = writeln!(
            output,
            "- Through semester {}: {:.2} over {} credit hours",
            entry.upto_semester,
            round2(entry.cgpa),
            entry.total_credit_hours
        );
    }

    let cumulative = &summary.cumulative;
    let _ = writeln!(output);
    let _ = writeln!(output, "## Course Summary");
    let _ = writeln!(output);
    let _ = writeln!(output, "- Total courses: {}", cumulative.course_count);
    let _ = writeln!(output, "- Total credit hours: {}", cumulative.total_credit_hours);
    let _ = writeln!(
        output,
        "- CGPA: {:.2} ({})",
        round2(cumulative.cgpa),
        display_letter(policy, cumulative.cgpa)
    );

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::aggregate::{cumulative_trend, summarize_all};
    use crate::models::{CourseRecord, Score};

    fn sample_records() -> Vec<CourseRecord> {
        vec![
            CourseRecord::new(1, "CS101", 3.0, Score::Marks(90.0)),
            CourseRecord::new(1, "MA101", 2.0, Score::Marks(70.0)),
            CourseRecord::new(2, "PH201", 3.0, Score::Marks(60.0)),
        ]
    }

    #[test]
    fn rounds_only_for_display() {
        assert_eq!(round2(3.1125), 3.11);
        assert_eq!(round2(3.6), 3.6);
        assert_eq!(round2(2.675_000_1), 2.68);
    }

    #[test]
    fn report_lists_semesters_trend_and_totals() {
        let policy = GradingPolicy::default();
        let records = sample_records();
        let summary = summarize_all(&records, &policy).unwrap();
        let trend = cumulative_trend(&records, &policy).unwrap();
        let generated_at = Utc.with_ymd_and_hms(2026, 2, 2, 9, 30, 0).unwrap();

        let report = build_report("marks.csv", &policy, &summary, &trend, generated_at);
        assert!(report.contains("Generated for marks.csv on 2026-02-02 09:30 UTC"));
        assert!(report.contains("| 1 | 3.60 | A- | 5 | 2 |"));
        assert!(report.contains("| 2 | 2.30 | C+ | 3 | 1 |"));
        assert!(report.contains("- Through semester 2: 3.11 over 8 credit hours"));
        assert!(report.contains("- Total courses: 3"));
        assert!(report.contains("- CGPA: 3.11 (B)"));
    }

    #[test]
    fn text_summary_shows_cgpa() {
        let policy = GradingPolicy::default();
        let summary = summarize_all(&sample_records(), &policy).unwrap();
        let text = render_text(&policy, &summary);
        assert!(text.contains("Semester 1: GPA 3.60 (A-)"));
        assert!(text.contains("CGPA through semester 2: 3.11"));
    }

    #[test]
    fn json_uses_rounded_values() {
        let policy = GradingPolicy::default();
        let records = sample_records();
        let summary = summarize_all(&records, &policy).unwrap();
        let trend = cumulative_trend(&records, &policy).unwrap();

        let value = serde_json::to_value(build_json(&policy, &summary, &trend)).unwrap();
        assert_eq!(value["policy"], "strict");
        assert_eq!(value["cgpa"], 3.11);
        assert_eq!(value["semesters"][0]["gpa"], 3.6);
        assert_eq!(value["trend"][0]["cgpa"], 3.6);
        assert_eq!(value["total_courses"], 3);
    }

    #[test]
    fn scales_list_every_table() {
        let text = render_scales(&GradingPolicy::default());
        assert!(text.contains(" 85.0+ => 4.00"));
        assert!(text.contains("- B+  => 3.30"));
        assert!(text.contains("- 3.85+ => A"));
    }
}
