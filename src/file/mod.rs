//! # Humdrum Files
//!
//! A whole document and the pipeline of passes that analyze it.
//!
//! ## Purpose
//! [`HumdrumFile`] owns every [`Line`] (which owns every [`Token`]) and runs
//! the structural analysis in a fixed order:
//!
//! ```text
//! Raw -> Tokenized -> TracksAssigned -> SpinesLinked -> ParametersPropagated -> RhythmAnalyzed
//!                                            |
//!                                            +-> StrandsAnalyzed [-> StrophesAnalyzed]
//! ```
//!
//! Strands need only the link graph and are available in no-rhythm reads.
//! A full read runs them after the rhythm pass.
//!
//! Each pass checks that the pass it depends on has completed and returns
//! [`HumdrumError::NotAnalyzed`] otherwise. A pass that fails rolls back
//! everything it wrote, so a file never holds a half-built link graph.
//! Re-running a pass invalidates the passes that depend on it.
//!
//! ## Sub-modules
//! - `tracks` - Spine info, track numbers, track starts and ends
//! - `links` - Token links across spine manipulators, null resolution
//! - `params` - Local and global layout parameter propagation
//! - `rhythm` - Durations, start times, barlines
//! - `strands` - Manipulator-free spine segments
//! - `strophes` - Strophe intervals and strophe membership
//!
//! ## Entry Point
//! [`HumdrumFile::read_string()`] - Parse and fully analyze a document
//!
//! ## Example
//! ```rust
//! use humdrum::{HumdrumFile, Rational};
//!
//! let file = HumdrumFile::read_string("**kern\t**kern\n4c\t8d\n.\t8e\n*-\t*-\n").unwrap();
//!
//! assert_eq!(file.max_track(), 2);
//! assert_eq!(file[2].duration_from_start(), Rational::new(1, 8));
//! assert_eq!(file.score_duration().unwrap(), Rational::new(1, 4));
//! ```
//!
//! ## Related Modules
//! - `line` / `token` - The elements a file owns
//! - `options` - `ReadOptions` controlling which passes run
//! - `diagnostics` - Warnings collected while analyzing

mod links;
mod params;
mod rhythm;
mod strands;
mod strophes;
mod tracks;


use std::fmt;
use std::fs;
use std::io::Read;
use std::ops::Index;
use std::path::Path;

use serde::Serialize;

use crate::diagnostics::Diagnostics;
use crate::error::HumdrumError;
use crate::line::{is_malformed_reference, Line};
use crate::options::ReadOptions;
use crate::token::{Token, TokenId};

/// Analysis passes, in pipeline order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Raw,
    Tokenized,
    TracksAssigned,
    SpinesLinked,
    ParametersPropagated,
    RhythmAnalyzed,
    StrandsAnalyzed,
    StrophesAnalyzed,
}

impl Stage {
    /// The pass that must have completed before this one can run.
    pub fn prerequisite(self) -> Option<Stage> {
        match self {
            Stage::Raw => None,
            Stage::Tokenized => Some(Stage::Raw),
            Stage::TracksAssigned => Some(Stage::Tokenized),
            Stage::SpinesLinked => Some(Stage::TracksAssigned),
            Stage::ParametersPropagated => Some(Stage::SpinesLinked),
            Stage::RhythmAnalyzed => Some(Stage::ParametersPropagated),
            Stage::StrandsAnalyzed => Some(Stage::SpinesLinked),
            Stage::StrophesAnalyzed => Some(Stage::StrandsAnalyzed),
        }
    }

    /// True if `other` is on this stage's prerequisite chain.
    pub fn depends_on(self, other: Stage) -> bool {
        let mut current = self.prerequisite();
        while let Some(stage) = current {
            if stage == other {
                return true;
            }
            current = stage.prerequisite();
        }
        false
    }

    const ALL: [Stage; 8] = [
        Stage::Raw,
        Stage::Tokenized,
        Stage::TracksAssigned,
        Stage::SpinesLinked,
        Stage::ParametersPropagated,
        Stage::RhythmAnalyzed,
        Stage::StrandsAnalyzed,
        Stage::StrophesAnalyzed,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Raw => "raw input",
            Stage::Tokenized => "tokenization",
            Stage::TracksAssigned => "track assignment",
            Stage::SpinesLinked => "spine linking",
            Stage::ParametersPropagated => "parameter propagation",
            Stage::RhythmAnalyzed => "rhythm analysis",
            Stage::StrandsAnalyzed => "strand analysis",
            Stage::StrophesAnalyzed => "strophe analysis",
        };
        f.write_str(name)
    }
}

/// First and last token of a strand or strophe, both inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub first: TokenId,
    pub last: TokenId,
}

#[derive(Clone, Debug)]
pub struct HumdrumFile {
    pub(crate) lines: Vec<Line>,
    pub(crate) options: ReadOptions,
    pub(crate) completed: [bool; 8],
    pub(crate) diagnostics: Diagnostics,
    /// Track `n` starts at `track_starts[n - 1]`.
    pub(crate) track_starts: Vec<TokenId>,
    pub(crate) track_ends: Vec<Vec<TokenId>>,
    pub(crate) barlines: Vec<usize>,
    pub(crate) strands_by_spine: Vec<Vec<Interval>>,
    pub(crate) strands: Vec<Interval>,
    pub(crate) strophes_by_spine: Vec<Vec<Interval>>,
    pub(crate) strophes: Vec<Interval>,
    pub(crate) segment_name: Option<String>,
}

impl HumdrumFile {
    /// Split `contents` into raw lines without analyzing anything.
    pub fn from_text(contents: &str, options: ReadOptions) -> Self {
        let mut texts: Vec<&str> = contents.split('\n').collect();
        if texts.last() == Some(&"") {
            texts.pop();
        }
        let lines = texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| Line::new(index, text))
            .collect();
        let mut completed = [false; 8];
        completed[Stage::Raw as usize] = true;
        Self {
            lines,
            options,
            completed,
            diagnostics: Diagnostics::new(),
            track_starts: Vec::new(),
            track_ends: Vec::new(),
            barlines: Vec::new(),
            strands_by_spine: Vec::new(),
            strands: Vec::new(),
            strophes_by_spine: Vec::new(),
            strophes: Vec::new(),
            segment_name: None,
        }
    }

    /// Parse and analyze a document with default options.
    pub fn read_string(contents: &str) -> Result<Self, HumdrumError> {
        Self::read_string_with(contents, ReadOptions::default())
    }

    /// Parse and analyze everything except rhythm.
    pub fn read_string_no_rhythm(contents: &str) -> Result<Self, HumdrumError> {
        Self::read_string_with(contents, ReadOptions::no_rhythm())
    }

    pub fn read_string_with(contents: &str, options: ReadOptions) -> Result<Self, HumdrumError> {
        let mut file = Self::from_text(contents, options);
        file.analyze()?;
        Ok(file)
    }

    pub fn read<R: Read>(mut reader: R, options: ReadOptions) -> Result<Self, HumdrumError> {
        let mut contents = String::new();
        reader.read_to_string(&mut contents)?;
        Self::read_string_with(&contents, options)
    }

    pub fn read_path<P: AsRef<Path>>(path: P, options: ReadOptions) -> Result<Self, HumdrumError> {
        let contents = fs::read_to_string(path)?;
        Self::read_string_with(&contents, options)
    }

    /// Run every pass the options ask for, stopping at the first failure.
    pub fn analyze(&mut self) -> Result<(), HumdrumError> {
        self.tokenize()?;
        self.assign_tracks()?;
        self.link_spines()?;
        self.propagate_parameters()?;
        if self.options.analyze_rhythm {
            self.analyze_rhythm()?;
        }
        self.analyze_strands()?;
        if self.options.analyze_strophes {
            self.analyze_strophes()?;
        }
        Ok(())
    }

    /// Split every line into tokens.
    ///
    /// Malformed `!!!` reference records are syntax errors when
    /// `strict_references` is set and warnings otherwise.
    pub fn tokenize(&mut self) -> Result<(), HumdrumError> {
        self.begin_pass(Stage::Tokenized)?;
        let result = self.run_tokenize();
        self.finish_pass(Stage::Tokenized, result)
    }

    fn run_tokenize(&mut self) -> Result<(), HumdrumError> {
        for index in 0..self.lines.len() {
            if is_malformed_reference(&self.lines[index].text) {
                let message = format!("malformed reference record '{}'", self.lines[index].text);
                if self.options.strict_references {
                    return Err(HumdrumError::Syntax {
                        line: index + 1,
                        message,
                    });
                }
                self.diagnostics.warn(index + 1, "malformed_reference", message);
            }
            self.lines[index].tokenize();
        }
        Ok(())
    }

    // ---- pass bookkeeping ----

    pub fn has_run(&self, stage: Stage) -> bool {
        self.completed[stage as usize]
    }

    /// Completed passes in pipeline order.
    pub fn completed_stages(&self) -> Vec<Stage> {
        Stage::ALL
            .into_iter()
            .filter(|stage| self.has_run(*stage))
            .collect()
    }

    pub(crate) fn require(&self, stage: Stage) -> Result<(), HumdrumError> {
        if self.has_run(stage) {
            Ok(())
        } else {
            Err(HumdrumError::NotAnalyzed { stage })
        }
    }

    fn begin_pass(&mut self, stage: Stage) -> Result<(), HumdrumError> {
        if let Some(prerequisite) = stage.prerequisite() {
            self.require(prerequisite)?;
        }
        for later in Stage::ALL {
            if (later == stage || later.depends_on(stage)) && self.has_run(later) {
                self.reset(later);
            }
        }
        log::debug!("starting {}", stage);
        Ok(())
    }

    fn finish_pass(
        &mut self,
        stage: Stage,
        result: Result<(), HumdrumError>,
    ) -> Result<(), HumdrumError> {
        match result {
            Ok(()) => {
                self.completed[stage as usize] = true;
                log::debug!("finished {}", stage);
                Ok(())
            }
            Err(e) => {
                log::debug!("{} failed: {}", stage, e);
                self.reset(stage);
                Err(e)
            }
        }
    }

    /// Discard everything a pass produced.
    fn reset(&mut self, stage: Stage) {
        self.completed[stage as usize] = false;
        match stage {
            Stage::Raw => {}
            Stage::Tokenized => {
                for line in &mut self.lines {
                    line.tokens.clear();
                }
                self.diagnostics.retain_except(&["malformed_reference"]);
            }
            Stage::TracksAssigned => {
                self.track_starts.clear();
                self.track_ends.clear();
                for token in self.tokens_mut() {
                    token.address.spine_info.clear();
                    token.address.track = 0;
                    token.address.subtrack = 0;
                    token.address.subtrack_count = 0;
                    token.data_type = "".into();
                    token.rhythmic = false;
                }
                self.diagnostics.retain_except(&["unterminated_spine"]);
            }
            Stage::SpinesLinked => {
                for token in self.tokens_mut() {
                    token.reset_links();
                }
            }
            Stage::ParametersPropagated => {
                for line in &mut self.lines {
                    line.parameters.clear();
                    for token in &mut line.tokens {
                        token.parameters.clear();
                        token.linked_parameters.clear();
                    }
                }
                self.diagnostics
                    .retain_except(&["duplicate_parameter", "orphan_parameter"]);
            }
            Stage::RhythmAnalyzed => {
                self.barlines.clear();
                for line in &mut self.lines {
                    line.reset_durations();
                    for token in &mut line.tokens {
                        token.reset_durations();
                    }
                }
            }
            Stage::StrandsAnalyzed => {
                self.strands.clear();
                self.strands_by_spine.clear();
                for token in self.tokens_mut() {
                    token.strand = None;
                }
            }
            Stage::StrophesAnalyzed => {
                self.strophes.clear();
                self.strophes_by_spine.clear();
                for token in self.tokens_mut() {
                    token.strophe = None;
                }
                self.diagnostics
                    .retain_except(&["unmatched_strophe_end", "unterminated_strophe"]);
            }
        }
    }

    fn tokens_mut(&mut self) -> impl Iterator<Item = &mut Token> {
        self.lines.iter_mut().flat_map(|line| line.tokens.iter_mut())
    }

    // ---- access ----

    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Name given by a `!!!!SEGMENT` marker when read as part of a set.
    pub fn segment_name(&self) -> Option<&str> {
        self.segment_name.as_deref()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, index: usize) -> Option<&Line> {
        self.lines.get(index)
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn token(&self, id: TokenId) -> Option<&Token> {
        self.lines.get(id.line)?.tokens.get(id.field)
    }

    pub fn token_at(&self, line: usize, field: usize) -> Option<&Token> {
        self.token(TokenId::new(line, field))
    }

    /// Token to the left on the same line.
    pub fn previous_field(&self, id: TokenId) -> Option<&Token> {
        let field = id.field.checked_sub(1)?;
        self.token(TokenId::new(id.line, field))
    }

    /// Token to the right on the same line.
    pub fn next_field(&self, id: TokenId) -> Option<&Token> {
        self.token(TokenId::new(id.line, id.field + 1))
    }

    /// Value of the first `!!!key:` reference record.
    pub fn reference_value(&self, key: &str) -> Option<&str> {
        self.lines
            .iter()
            .filter(|line| line.reference_key() == Some(key))
            .find_map(Line::reference_value)
    }

    /// All reference records as `(key, value)` pairs, in file order.
    pub fn reference_records(&self) -> Vec<(&str, &str)> {
        self.lines
            .iter()
            .filter_map(|line| Some((line.reference_key()?, line.reference_value()?)))
            .collect()
    }

    /// The document text, with the configured line ending after every line.
    pub fn to_text(&self) -> String {
        let ending = self.options.line_ending.as_str();
        let mut output = String::new();
        for line in &self.lines {
            output.push_str(line.text());
            output.push_str(ending);
        }
        output
    }

    /// Rebuild every line's text from its tokens.
    pub fn create_lines_from_tokens(&mut self) {
        for line in &mut self.lines {
            if !line.tokens.is_empty() {
                line.create_line_from_tokens();
            }
        }
    }
}

impl Index<usize> for HumdrumFile {
    type Output = Line;

    fn index(&self, index: usize) -> &Line {
        &self.lines[index]
    }
}

impl Index<TokenId> for HumdrumFile {
    type Output = Token;

    fn index(&self, id: TokenId) -> &Token {
        &self.lines[id.line].tokens[id.field]
    }
}

impl fmt::Display for HumdrumFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}
