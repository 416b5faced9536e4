//! # humdrum
//!
//! Structural and rhythmic analysis of Humdrum documents.
//!
//! A document is read into a [`HumdrumFile`], which runs a fixed pipeline
//! of passes over its lines: tokenizing, track assignment, spine linking,
//! layout parameter propagation, rhythm, strands and (optionally) strophes.
//! Everything downstream reads the analysis through accessors.
//!
//! ```rust
//! use humdrum::{HumdrumFile, Rational};
//!
//! let file = HumdrumFile::read_string("**kern\n*M2/4\n=1\n4c\n4d\n=2\n2e\n*-\n")?;
//! assert_eq!(file.barline_count()?, 2);
//! assert_eq!(file.barline_duration(1)?, Rational::new(1, 2));
//! assert_eq!(file.score_duration()?, Rational::one());
//! # Ok::<(), humdrum::HumdrumError>(())
//! ```

pub mod diagnostics;
pub mod error;
pub mod file;
pub mod line;
pub mod options;
pub mod parameters;
pub mod rational;
pub mod report;
pub mod rhythm;
pub mod set;
pub mod token;

pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::HumdrumError;
pub use file::{HumdrumFile, Interval, Stage};
pub use line::{Line, LineKind};
pub use options::{LineEnding, ReadOptions};
pub use parameters::{HasParameters, Parameter, ParameterStore};
pub use rational::Rational;
pub use set::HumdrumFileSet;
pub use token::{Address, Token, TokenId};
