//! Grading policy selection: a named preset, optionally overridden by a TOML
//! scale file.
//!
//! ```toml
//! name = "faculty-of-science"
//! ceiling = 4.0
//! base = "lenient"
//! unknown_letter = "reject"
//!
//! [[marks]]
//! threshold = 85.0
//! points = 4.0
//!
//! [letters]
//! "A" = 4.0
//!
//! [[display]]
//! min_points = 3.85
//! letter = "A"
//! ```
//!
//! Sections left out of the file fall back to the `base` preset.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::debug;

use crate::grading::{
    Band, BandTable, GradingPolicy, LetterBand, LetterBands, LetterScale, Preset, UnknownLetter,
};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScaleFile {
    pub name: Option<String>,
    pub ceiling: Option<f64>,
    pub base: Option<Preset>,
    pub unknown_letter: Option<UnknownLetter>,
    pub marks: Option<Vec<Band>>,
    pub letters: Option<BTreeMap<String, f64>>,
    pub display: Option<Vec<LetterBand>>,
}

impl ScaleFile {
    /// Resolves the file into a validated policy. `fallback` fills in any
    /// section the file omits when no `base` is named.
    pub fn into_policy(self, fallback: Preset) -> anyhow::Result<GradingPolicy> {
        let base = self.base.unwrap_or(fallback);
        let name = self.name.unwrap_or_else(|| base.name().to_string());

        let marks = BandTable::new(self.marks.unwrap_or_else(|| base.marks_bands()))
            .context("invalid [[marks]] table")?;
        let letters = match self.letters {
            Some(letters) => LetterScale::new(letters),
            None => LetterScale::new(base.letter_points()),
        }
        .context("invalid [letters] table")?;
        let display = LetterBands::new(self.display.unwrap_or_else(|| base.display_bands()))
            .context("invalid [[display]] table")?;

        let policy = GradingPolicy::new(name, self.ceiling.unwrap_or(4.0), marks, letters, display)
            .context("grading scale is inconsistent")?;
        Ok(policy.with_unknown_letter(self.unknown_letter.unwrap_or_default()))
    }
}

pub fn parse_scale(text: &str, fallback: Preset) -> anyhow::Result<GradingPolicy> {
    let file: ScaleFile = toml::from_str(text).context("failed to parse grading scale")?;
    file.into_policy(fallback)
}

/// Builds the active policy from CLI/environment settings.
pub fn load_policy(
    preset: Preset,
    scale: Option<&Path>,
    allow_unknown_letters: bool,
) -> anyhow::Result<GradingPolicy> {
    let policy = match scale {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read grading scale {}", path.display()))?;
            let policy = parse_scale(&text, preset)
                .with_context(|| format!("in grading scale {}", path.display()))?;
            debug!("loaded grading scale {} from {}", policy.name(), path.display());
            policy
        }
        None => preset.policy(),
    };

    if allow_unknown_letters {
        Ok(policy.with_unknown_letter(UnknownLetter::Zero))
    } else {
        Ok(policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn omitted_sections_come_from_base() {
        let policy = parse_scale("base = \"lenient\"\nname = \"arts\"", Preset::Strict).unwrap();
        assert_eq!(policy.name(), "arts");
        assert_eq!(policy.points_from_marks(45.0), Ok(1.0));
        assert_eq!(policy.points_from_letter("B+"), Ok(3.3));
    }

    #[test]
    fn custom_marks_table_replaces_preset() {
        let text = r#"
            name = "pass-fail"
            [[marks]]
            threshold = 40.0
            points = 4.0
            [[marks]]
            threshold = 0.0
            points = 0.0
        "#;
        let policy = parse_scale(text, Preset::Strict).unwrap();
        assert_eq!(policy.points_from_marks(40.0), Ok(4.0));
        assert_eq!(policy.points_from_marks(39.9), Ok(0.0));
    }

    #[test]
    fn higher_ceiling_from_file() {
        let text = r#"
            ceiling = 5.0
            unknown_letter = "zero"
            [[marks]]
            threshold = 90.0
            points = 5.0
            [[marks]]
            threshold = 0.0
            points = 0.0
            [letters]
            "A+" = 5.0
            "F" = 0.0
        "#;
        let policy = parse_scale(text, Preset::Strict).unwrap();
        assert_eq!(policy.ceiling(), 5.0);
        assert_eq!(policy.points_from_letter("a+"), Ok(5.0));
        assert_eq!(policy.points_from_letter("Z"), Ok(0.0));
    }

    #[test]
    fn invalid_tables_are_reported() {
        let text = r#"
            [[marks]]
            threshold = 50.0
            points = 4.0
        "#;
        let err = parse_scale(text, Preset::Strict).unwrap_err();
        assert!(format!("{err:#}").contains("lowest band must start at 0"));

        assert!(parse_scale("colour = \"red\"", Preset::Strict).is_err());
    }

    #[test]
    fn load_policy_reads_file_and_flags() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "base = \"fine\"").unwrap();

        let policy = load_policy(Preset::Strict, Some(file.path()), true).unwrap();
        assert_eq!(policy.name(), "fine");
        assert_eq!(policy.unknown_letter(), UnknownLetter::Zero);

        let policy = load_policy(Preset::Lenient, None, false).unwrap();
        assert_eq!(policy.name(), "lenient");
        assert_eq!(policy.unknown_letter(), UnknownLetter::Reject);

        let missing = file.path().with_extension("missing");
        assert!(load_policy(Preset::Strict, Some(&missing), false).is_err());
    }
}
