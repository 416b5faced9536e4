//! # Reports
//!
//! Plain-text dumps of the analysis, one output line per input line, and a
//! serializable summary.
//!
//! In the per-token dumps, global lines and manipulator lines (including
//! exclusive interpretations) are copied verbatim so the spine layout stays
//! readable; every other spine line prints one tab-separated value per
//! token:
//!
//! ```text
//! **kern   **kern        **kern  **kern
//! *^       *             *^      *
//! 4c  4e   2g            (1)a (1)b  2      <- spine_info_report
//! ```

use serde::Serialize;

use crate::diagnostics::Diagnostic;
use crate::error::HumdrumError;
use crate::file::{HumdrumFile, Stage};
use crate::line::Line;
use crate::rational::Rational;
use crate::token::Token;

/// Spine info of every token: `1`, `(1)a`, `((1)a)b`, `1 2` after a merge.
pub fn spine_info_report(file: &HumdrumFile) -> String {
    per_token_report(file, |token| token.spine_info().to_string())
}

/// Exclusive interpretation of every token, without the `**` prefix.
pub fn data_type_report(file: &HumdrumFile) -> String {
    per_token_report(file, |token| {
        let data_type = token.data_type();
        data_type.strip_prefix("**").unwrap_or(data_type).to_string()
    })
}

/// Track of every token: `2`, or `2.1` for the first sub-spine of track 2.
pub fn track_report(file: &HumdrumFile) -> String {
    per_token_report(file, Token::track_string)
}

/// Duration of every token as a mixed fraction of whole notes (`1_1/2`);
/// tokens without a duration print `.`.
pub fn duration_report(file: &HumdrumFile) -> Result<String, HumdrumError> {
    if !file.has_run(Stage::RhythmAnalyzed) {
        return Err(HumdrumError::NotAnalyzed {
            stage: Stage::RhythmAnalyzed,
        });
    }
    Ok(per_token_report(file, |token| {
        let duration = token.duration();
        if duration.is_finite() {
            duration.to_mixed_string("_")
        } else {
            ".".to_string()
        }
    }))
}

/// Document as comma-separated values.
pub fn csv_report(file: &HumdrumFile) -> String {
    let ending = file.options().line_ending.as_str();
    let mut output = String::new();
    for line in file.lines() {
        let fields: Vec<String> = line.tokens().iter().map(|t| csv_field(t.text())).collect();
        output.push_str(&fields.join(","));
        output.push_str(ending);
    }
    output
}

fn csv_field(text: &str) -> String {
    if text.contains(',') || text.contains('"') {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

fn per_token_report<F>(file: &HumdrumFile, mut value: F) -> String
where
    F: FnMut(&Token) -> String,
{
    let ending = file.options().line_ending.as_str();
    let mut output = String::new();
    for line in file.lines() {
        if echoes_verbatim(line) {
            output.push_str(line.text());
        } else {
            let fields: Vec<String> = line.tokens().iter().map(&mut value).collect();
            output.push_str(&fields.join("\t"));
        }
        output.push_str(ending);
    }
    output
}

fn echoes_verbatim(line: &Line) -> bool {
    line.is_global() || line.is_manipulator()
}

/// Counts and totals for one analyzed document.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
pub struct FileSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub lines: usize,
    pub tracks: usize,
    pub strands: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barlines: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_duration: Option<Rational>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tpq: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strophes: Option<usize>,
    pub diagnostics: Vec<Diagnostic>,
}

impl FileSummary {
    /// Summarize `file`. Values from passes that have not run are left out.
    pub fn from_file(file: &HumdrumFile) -> Self {
        Self {
            name: file.segment_name().map(str::to_string),
            lines: file.line_count(),
            tracks: file.max_track(),
            strands: file.strand_count().unwrap_or(0),
            barlines: file.barline_count().ok(),
            score_duration: file.score_duration().ok(),
            tpq: file.tpq().ok(),
            strophes: file.strophe_count().ok(),
            diagnostics: file.diagnostics().items.clone(),
        }
    }

    pub fn to_yaml(&self) -> Result<String, HumdrumError> {
        serde_yaml::to_string(self).map_err(|e| HumdrumError::Output(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SPLIT: &str = "**kern\t**kern\n*^\t*\n4c\t4e\t2g\n4d\t4f\t.\n*v\t*v\t*\n*-\t*-\n";

    #[test]
    fn test_spine_info_report() {
        let file = HumdrumFile::read_string(SPLIT).unwrap();
        let expected = "**kern\t**kern\n\
                        *^\t*\n\
                        (1)a\t(1)b\t2\n\
                        (1)a\t(1)b\t2\n\
                        *v\t*v\t*\n\
                        *-\t*-\n";
        assert_eq!(spine_info_report(&file), expected);
    }

    #[test]
    fn test_track_report() {
        let file = HumdrumFile::read_string(SPLIT).unwrap();
        let report = track_report(&file);
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[2], "1.1\t1.2\t2");
    }

    #[test]
    fn test_data_type_report() {
        let file = HumdrumFile::read_string("**kern\t**text\n4c\tla\n*-\t*-\n").unwrap();
        let report = data_type_report(&file);
        assert_eq!(report.lines().nth(1), Some("kern\ttext"));
    }

    #[test]
    fn test_duration_report() {
        let file = HumdrumFile::read_string("**kern\t**kern\n2.c\t4d\n.\t2e\n*-\t*-\n").unwrap();
        let report = duration_report(&file).unwrap();
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[1], "3/4\t1/4");
        assert_eq!(lines[2], ".\t1/2");
    }

    #[test]
    fn test_duration_report_needs_rhythm() {
        let file = HumdrumFile::read_string_no_rhythm("**kern\n4c\n*-\n").unwrap();
        assert!(duration_report(&file).is_err());
    }

    #[test]
    fn test_csv_report_quotes_fields() {
        let file = HumdrumFile::read_string("**text\nhello, world\n*-\n").unwrap();
        assert_eq!(csv_report(&file), "**text\n\"hello, world\"\n*-\n");
    }

    #[test]
    fn test_summary_yaml() {
        let file = HumdrumFile::read_string("**kern\n=1\n4c\n4d\n=2\n2e\n*-\n").unwrap();
        let summary = FileSummary::from_file(&file);
        assert_eq!(summary.tracks, 1);
        assert_eq!(summary.barlines, Some(2));
        assert_eq!(summary.strophes, None);
        let yaml = summary.to_yaml().unwrap();
        assert!(yaml.contains("score-duration: '1'") || yaml.contains("score-duration: \"1\""));
        assert!(yaml.contains("tpq: 1"));
        assert!(!yaml.contains("strophes"));
    }
}
