//! Grade-point conversion.
//!
//! A [`GradingPolicy`] bundles three read-only tables:
//!
//! - a [`BandTable`] partitioning 0..=100 marks into grade-point bands,
//! - a [`LetterScale`] mapping letter grades to points,
//! - a [`LetterBands`] table mapping points back to a display letter.
//!
//! The display table is not the inverse of the letter scale; presets pick
//! their own band widths for each direction.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::GradeError;
use crate::models::Score;

pub const MAX_MARKS: f64 = 100.0;

/// Marks at or above `threshold` earn `points`, unless a higher band matches first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub threshold: f64,
    pub points: f64,
}

impl Band {
    pub const fn new(threshold: f64, points: f64) -> Self {
        Self { threshold, points }
    }
}

/// Ordered, non-overlapping partition of 0..=100 marks, highest threshold first.
#[derive(Debug, Clone, PartialEq)]
pub struct BandTable {
    bands: Vec<Band>,
}

impl BandTable {
    pub fn new(mut bands: Vec<Band>) -> Result<Self, GradeError> {
        if bands.is_empty() {
            return Err(invalid("marks table has no bands"));
        }
        for band in &bands {
            if !band.threshold.is_finite() || !(0.0..=MAX_MARKS).contains(&band.threshold) {
                return Err(invalid(format!(
                    "band threshold {} is outside 0..=100",
                    band.threshold
                )));
            }
            if !band.points.is_finite() || band.points < 0.0 {
                return Err(invalid(format!("band points {} are negative", band.points)));
            }
        }

        bands.sort_by(|a, b| b.threshold.total_cmp(&a.threshold));

        for pair in bands.windows(2) {
            let (upper, lower) = (pair[0], pair[1]);
            if upper.threshold == lower.threshold {
                return Err(invalid(format!(
                    "duplicate band threshold {}",
                    upper.threshold
                )));
            }
            if upper.points < lower.points {
                return Err(invalid(format!(
                    "band at {} earns fewer points than the band at {}",
                    upper.threshold, lower.threshold
                )));
            }
        }

        match bands.last() {
            Some(lowest) if lowest.threshold == 0.0 => Ok(Self { bands }),
            _ => Err(invalid("lowest band must start at 0 marks")),
        }
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    /// Highest threshold the marks meet or exceed wins; boundaries belong to
    /// the upper band.
    pub fn points_for(&self, marks: f64) -> Result<f64, GradeError> {
        if !(0.0..=MAX_MARKS).contains(&marks) {
            return Err(GradeError::OutOfRange { marks });
        }
        self.bands
            .iter()
            .find(|band| marks >= band.threshold)
            .map(|band| band.points)
            .ok_or(GradeError::OutOfRange { marks })
    }

    fn max_points(&self) -> f64 {
        self.bands.first().map_or(0.0, |band| band.points)
    }
}

/// Letter grade to points, keyed case-insensitively.
#[derive(Debug, Clone, PartialEq)]
pub struct LetterScale {
    points: BTreeMap<String, f64>,
}

impl LetterScale {
    pub fn new<I, S>(entries: I) -> Result<Self, GradeError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut points = BTreeMap::new();
        for (letter, value) in entries {
            let key = normalize_letter(letter.as_ref());
            if key.is_empty() {
                return Err(invalid("letter scale contains an empty letter"));
            }
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("letter {key} has invalid points {value}")));
            }
            if points.insert(key.clone(), value).is_some() {
                return Err(invalid(format!("letter {key} is listed twice")));
            }
        }
        if points.is_empty() {
            return Err(invalid("letter scale has no letters"));
        }
        Ok(Self { points })
    }

    pub fn get(&self, letter: &str) -> Option<f64> {
        self.points.get(&normalize_letter(letter)).copied()
    }

    /// Entries ordered from most to fewest points.
    pub fn entries(&self) -> Vec<(&str, f64)> {
        let mut entries: Vec<(&str, f64)> = self
            .points
            .iter()
            .map(|(letter, points)| (letter.as_str(), *points))
            .collect();
        entries.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        entries
    }

    fn max_points(&self) -> f64 {
        self.points.values().copied().fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LetterBand {
    pub min_points: f64,
    pub letter: String,
}

impl LetterBand {
    pub fn new(min_points: f64, letter: impl Into<String>) -> Self {
        Self {
            min_points,
            letter: letter.into(),
        }
    }
}

/// Points to display letter, highest floor first.
#[derive(Debug, Clone, PartialEq)]
pub struct LetterBands {
    bands: Vec<LetterBand>,
}

impl LetterBands {
    pub fn new(mut bands: Vec<LetterBand>) -> Result<Self, GradeError> {
        if bands.iter().any(|band| !band.min_points.is_finite() || band.min_points < 0.0) {
            return Err(invalid("display band floors must be finite and non-negative"));
        }
        bands.sort_by(|a, b| b.min_points.total_cmp(&a.min_points));
        if bands.windows(2).any(|pair| pair[0].min_points == pair[1].min_points) {
            return Err(invalid("display bands share a floor"));
        }
        match bands.last() {
            Some(lowest) if lowest.min_points == 0.0 => Ok(Self { bands }),
            _ => Err(invalid("lowest display band must start at 0 points")),
        }
    }

    pub fn bands(&self) -> &[LetterBand] {
        &self.bands
    }

    fn letter_for(&self, points: f64) -> Option<&str> {
        self.bands
            .iter()
            .find(|band| points >= band.min_points)
            .map(|band| band.letter.as_str())
    }

    fn max_floor(&self) -> f64 {
        self.bands.first().map_or(0.0, |band| band.min_points)
    }
}

/// What to do with a letter the scale does not know.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownLetter {
    #[default]
    Reject,
    /// Legacy behaviour: count the course at 0.0 points.
    Zero,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradingPolicy {
    name: String,
    ceiling: f64,
    marks: BandTable,
    letters: LetterScale,
    display: LetterBands,
    unknown_letter: UnknownLetter,
}

impl GradingPolicy {
    pub fn new(
        name: impl Into<String>,
        ceiling: f64,
        marks: BandTable,
        letters: LetterScale,
        display: LetterBands,
    ) -> Result<Self, GradeError> {
        if !ceiling.is_finite() || ceiling <= 0.0 {
            return Err(invalid(format!("ceiling {ceiling} must be positive")));
        }
        if marks.max_points() > ceiling {
            return Err(invalid(format!(
                "marks table awards {} points above the {ceiling} ceiling",
                marks.max_points()
            )));
        }
        if letters.max_points() > ceiling {
            return Err(invalid(format!(
                "letter scale awards {} points above the {ceiling} ceiling",
                letters.max_points()
            )));
        }
        if display.max_floor() > ceiling {
            return Err(invalid(format!(
                "display band floor {} is above the {ceiling} ceiling",
                display.max_floor()
            )));
        }

        Ok(Self {
            name: name.into(),
            ceiling,
            marks,
            letters,
            display,
            unknown_letter: UnknownLetter::Reject,
        })
    }

    #[must_use]
    pub fn with_unknown_letter(mut self, unknown_letter: UnknownLetter) -> Self {
        self.unknown_letter = unknown_letter;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ceiling(&self) -> f64 {
        self.ceiling
    }

    pub fn marks_table(&self) -> &BandTable {
        &self.marks
    }

    pub fn letter_scale(&self) -> &LetterScale {
        &self.letters
    }

    pub fn display_bands(&self) -> &LetterBands {
        &self.display
    }

    pub fn unknown_letter(&self) -> UnknownLetter {
        self.unknown_letter
    }

    pub fn points_from_marks(&self, marks: f64) -> Result<f64, GradeError> {
        self.marks.points_for(marks)
    }

    pub fn points_from_letter(&self, letter: &str) -> Result<f64, GradeError> {
        match (self.letters.get(letter), self.unknown_letter) {
            (Some(points), _) => Ok(points),
            (None, UnknownLetter::Zero) => {
                warn!(letter, policy = %self.name, "unknown letter grade counted as 0.0 points");
                Ok(0.0)
            }
            (None, UnknownLetter::Reject) => Err(GradeError::UnknownGrade {
                literal: letter.to_string(),
            }),
        }
    }

    pub fn letter_from_points(&self, points: f64) -> Result<&str, GradeError> {
        self.check_points(points)?;
        self.display
            .letter_for(points)
            .ok_or(GradeError::PointsOutOfRange {
                points,
                ceiling: self.ceiling,
            })
    }

    pub fn points_for(&self, score: &Score) -> Result<f64, GradeError> {
        match score {
            Score::Marks(marks) => self.points_from_marks(*marks),
            Score::Letter(letter) => self.points_from_letter(letter),
            Score::Points(points) => self.check_points(*points).map(|()| *points),
        }
    }

    fn check_points(&self, points: f64) -> Result<(), GradeError> {
        if (0.0..=self.ceiling).contains(&points) {
            Ok(())
        } else {
            Err(GradeError::PointsOutOfRange {
                points,
                ceiling: self.ceiling,
            })
        }
    }
}

impl Default for GradingPolicy {
    fn default() -> Self {
        Preset::default().policy()
    }
}

/// Built-in grading scales. None of them is more correct than the others;
/// `Strict` is the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Top band from 85, passing floor at 50.
    #[default]
    Strict,
    /// Top band from 80, 1.0 points from 45.
    Lenient,
    /// Thirds-of-a-point steps with boundaries at 58 and 61.
    Fine,
}

impl Preset {
    pub const ALL: [Self; 3] = [Self::Strict, Self::Lenient, Self::Fine];

    pub fn name(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Lenient => "lenient",
            Self::Fine => "fine",
        }
    }

    pub fn marks_bands(self) -> Vec<Band> {
        let table: &[(f64, f64)] = match self {
            Self::Strict => &[
                (85.0, 4.00),
                (80.0, 3.70),
                (75.0, 3.30),
                (70.0, 3.00),
                (65.0, 2.70),
                (60.0, 2.30),
                (57.0, 2.00),
                (53.0, 1.70),
                (50.0, 1.00),
                (0.0, 0.00),
            ],
            Self::Lenient => &[
                (80.0, 4.00),
                (75.0, 3.50),
                (70.0, 3.00),
                (65.0, 2.50),
                (60.0, 2.00),
                (55.0, 1.50),
                (45.0, 1.00),
                (0.0, 0.00),
            ],
            Self::Fine => &[
                (85.0, 4.00),
                (80.0, 3.67),
                (75.0, 3.33),
                (71.0, 3.00),
                (68.0, 2.67),
                (64.0, 2.33),
                (61.0, 2.00),
                (58.0, 1.67),
                (54.0, 1.33),
                (50.0, 1.00),
                (0.0, 0.00),
            ],
        };
        table
            .iter()
            .map(|&(threshold, points)| Band::new(threshold, points))
            .collect()
    }

    pub fn letter_points(self) -> Vec<(&'static str, f64)> {
        match self {
            Self::Strict | Self::Lenient => vec![
                ("A", 4.0),
                ("A-", 3.7),
                ("B+", 3.3),
                ("B", 3.0),
                ("B-", 2.7),
                ("C+", 2.3),
                ("C", 2.0),
                ("C-", 1.7),
                ("D+", 1.3),
                ("D", 1.0),
                ("F", 0.0),
            ],
            Self::Fine => vec![
                ("A", 4.0),
                ("A-", 3.67),
                ("B+", 3.33),
                ("B", 3.0),
                ("B-", 2.67),
                ("C+", 2.33),
                ("C", 2.0),
                ("C-", 1.67),
                ("D+", 1.33),
                ("D", 1.0),
                ("F", 0.0),
            ],
        }
    }

    pub fn display_bands(self) -> Vec<LetterBand> {
        let table: &[(f64, &str)] = match self {
            Self::Strict | Self::Fine => &[
                (3.85, "A"),
                (3.50, "A-"),
                (3.15, "B+"),
                (2.85, "B"),
                (2.50, "B-"),
                (2.15, "C+"),
                (1.85, "C"),
                (1.50, "C-"),
                (1.15, "D+"),
                (0.85, "D"),
                (0.0, "F"),
            ],
            Self::Lenient => &[
                (3.75, "A"),
                (3.25, "B+"),
                (2.75, "B"),
                (2.25, "C+"),
                (1.75, "C"),
                (1.25, "D+"),
                (0.75, "D"),
                (0.0, "F"),
            ],
        };
        table
            .iter()
            .map(|&(min_points, letter)| LetterBand::new(min_points, letter))
            .collect()
    }

    /// Builds the preset's policy.
    pub fn policy(self) -> GradingPolicy {
        // The tables above are fixed literals; `every_preset_validates` checks
        // each one passes the same validation, so the error arm cannot be hit.
        let built = BandTable::new(self.marks_bands()).and_then(|marks| {
            let letters = LetterScale::new(self.letter_points())?;
            let display = LetterBands::new(self.display_bands())?;
            GradingPolicy::new(self.name(), 4.0, marks, letters, display)
        });
        match built {
            Ok(policy) => policy,
            Err(err) => unreachable!("built-in {} preset is invalid: {err}", self.name()),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|preset| preset.name() == wanted)
            .ok_or_else(|| {
                format!("unknown grading preset {value:?} (expected strict, lenient or fine)")
            })
    }
}

fn normalize_letter(letter: &str) -> String {
    letter.trim().to_uppercase()
}

fn invalid(reason: impl Into<String>) -> GradeError {
    GradeError::InvalidTable {
        reason: reason.into(),
    }
}
