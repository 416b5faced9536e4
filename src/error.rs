//! # Error Types
//!
//! This module defines all error types for the Humdrum engine.
//!
//! Errors raised while reading a document carry the 1-based line number of
//! the offending line. Semantic problems that do not stop analysis are not
//! errors; they are collected as warnings in [`crate::Diagnostics`].
//!
//! ## Error Types
//! - `Syntax` - Malformed lines (reference records, stray data)
//! - `Spine` - Spine manipulator and field-count errors
//! - `Rhythm` - Inconsistent durations across spines
//! - `NotAnalyzed` - A query or pass that needs an earlier pass
//! - `NoSuchElement` - An out-of-range barline, strand or strophe query
//! - `Config` - Invalid YAML read options
//! - `Output` - Failure rendering a report
//! - `Io` - Failure reading the input
//!
//! ## Usage
//! ```rust
//! use humdrum::{HumdrumError, HumdrumFile};
//!
//! match HumdrumFile::read_string("**kern\n4c\t4d\n*-\n") {
//!     Ok(file) => println!("{} lines", file.line_count()),
//!     Err(HumdrumError::Spine { line, message }) => {
//!         eprintln!("Spine error on line {}: {}", line, message);
//!     }
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

use crate::file::Stage;

#[derive(Error, Debug)]
pub enum HumdrumError {
    /// Malformed line syntax.
    ///
    /// # Example
    /// ```
    /// # use humdrum::HumdrumError;
    /// let err = HumdrumError::Syntax {
    ///     line: 3,
    ///     message: "malformed reference record '!!!COM Bach'".to_string(),
    /// };
    /// assert_eq!(
    ///     err.to_string(),
    ///     "Syntax error on line 3: malformed reference record '!!!COM Bach'"
    /// );
    /// ```
    #[error("Syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// Invalid spine structure: wrong field count, unpaired manipulators,
    /// or an exclusive interpretation with no spine prepared for it.
    #[error("Spine error on line {line}: {message}")]
    Spine { line: usize, message: String },

    /// Spines disagree on the time at which a line starts.
    #[error("Rhythm error on line {line}: {message}")]
    Rhythm { line: usize, message: String },

    /// A pass or query ran before the pass it depends on.
    ///
    /// # Example
    /// ```
    /// # use humdrum::{HumdrumError, Stage};
    /// let err = HumdrumError::NotAnalyzed { stage: Stage::RhythmAnalyzed };
    /// assert_eq!(err.to_string(), "Not analyzed: requires rhythm analysis");
    /// ```
    #[error("Not analyzed: requires {stage}")]
    NotAnalyzed { stage: Stage },

    /// An indexed query was out of range.
    #[error("No {what} at index {index}")]
    NoSuchElement { what: &'static str, index: usize },

    /// Invalid read options.
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HumdrumError {
    /// Line number for errors raised while reading a document.
    pub fn line(&self) -> Option<usize> {
        match self {
            HumdrumError::Syntax { line, .. }
            | HumdrumError::Spine { line, .. }
            | HumdrumError::Rhythm { line, .. } => Some(*line),
            _ => None,
        }
    }
}
