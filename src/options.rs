//! # Read Options
//!
//! Configuration passed explicitly into every read entry point.
//!
//! Options can be built in code or loaded from YAML:
//! ```rust
//! use humdrum::ReadOptions;
//!
//! let options = ReadOptions::from_yaml(r#"
//! analyze-rhythm: false
//! rhythmic-data-types: ["**kern", "**mens"]
//! "#).unwrap();
//! assert!(!options.analyze_rhythm);
//! assert!(options.strict_references);
//! ```

use serde::Deserialize;

use crate::error::HumdrumError;

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    Lf,
    Crlf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::Crlf => "\r\n",
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct ReadOptions {
    /// Run the rhythm pass. `false` gives the no-rhythm variant.
    pub analyze_rhythm: bool,
    /// Run the optional strophe pass after strands.
    pub analyze_strophes: bool,
    /// Exclusive interpretations whose data tokens carry recip durations.
    pub rhythmic_data_types: Vec<String>,
    /// Treat malformed `!!!` reference records as syntax errors.
    pub strict_references: bool,
    /// Line terminator used when writing the document back out.
    pub line_ending: LineEnding,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            analyze_rhythm: true,
            analyze_strophes: false,
            rhythmic_data_types: vec!["**kern".to_string(), "**recip".to_string()],
            strict_references: true,
            line_ending: LineEnding::Lf,
        }
    }
}

impl ReadOptions {
    pub fn from_yaml(content: &str) -> Result<Self, HumdrumError> {
        let options: ReadOptions =
            serde_yaml::from_str(content).map_err(|e| HumdrumError::Config(e.to_string()))?;
        if let Some(bad) = options
            .rhythmic_data_types
            .iter()
            .find(|name| !name.starts_with("**"))
        {
            return Err(HumdrumError::Config(format!(
                "rhythmic data type '{}' must start with '**'",
                bad
            )));
        }
        Ok(options)
    }

    pub fn no_rhythm() -> Self {
        Self {
            analyze_rhythm: false,
            ..Self::default()
        }
    }

    pub fn with_strophes(mut self) -> Self {
        self.analyze_strophes = true;
        self
    }

    pub(crate) fn is_rhythmic(&self, data_type: &str) -> bool {
        self.rhythmic_data_types.iter().any(|name| name == data_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ReadOptions::default();
        assert!(options.analyze_rhythm);
        assert!(!options.analyze_strophes);
        assert!(options.is_rhythmic("**kern"));
        assert!(options.is_rhythmic("**recip"));
        assert!(!options.is_rhythmic("**text"));
        assert_eq!(options.line_ending, LineEnding::Lf);
    }

    #[test]
    fn test_from_yaml_partial() {
        let options = ReadOptions::from_yaml("analyze-strophes: true\nline-ending: crlf\n").unwrap();
        assert!(options.analyze_strophes);
        assert!(options.analyze_rhythm);
        assert_eq!(options.line_ending.as_str(), "\r\n");
    }

    #[test]
    fn test_from_yaml_rejects_bad_data_type() {
        let result = ReadOptions::from_yaml("rhythmic-data-types: [kern]\n");
        assert!(matches!(result, Err(HumdrumError::Config(_))));
    }

    #[test]
    fn test_from_yaml_rejects_unknown_type() {
        let result = ReadOptions::from_yaml("analyze-rhythm: maybe\n");
        assert!(result.is_err());
    }
}
