//! # Lines
//!
//! One physical line of a Humdrum document.
//!
//! ## Line Kinds
//! ```text
//! ""            Empty
//! !!!!text      UniversalComment
//! !!!KEY: val   Reference
//! !!text        GlobalComment
//! !  !          LocalComment
//! **kern **kern Exclusive
//! *^ *          Manipulator     (any split/merge/exchange/add/terminate/**)
//! *clefG2 *     Interpretation
//! =1 =1         Barline
//! 4c 4e         Data
//! ```
//! Empty lines, global/universal comments and reference records are
//! *global*: they hold a single token and take no part in the spine layout.
//!
//! ## Durations
//! The rhythm pass fills four exact durations per line (whole-note units):
//! `duration`, `duration_from_start`, `duration_from_barline` and
//! `duration_to_barline`. Until then they are non-finite.

use std::fmt;

use serde::Serialize;

use crate::file::HumdrumFile;
use crate::parameters::{HasParameters, ParameterStore};
use crate::rational::Rational;
use crate::token::{is_manipulator_text, Token, TokenId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineKind {
    Empty,
    UniversalComment,
    Reference,
    GlobalComment,
    LocalComment,
    Exclusive,
    Manipulator,
    Interpretation,
    Barline,
    Data,
}

impl LineKind {
    /// Classify raw line text.
    pub fn classify(text: &str) -> LineKind {
        if text.is_empty() {
            LineKind::Empty
        } else if text.starts_with("!!!!") {
            LineKind::UniversalComment
        } else if text.starts_with("!!") {
            if is_reference_text(text) {
                LineKind::Reference
            } else {
                LineKind::GlobalComment
            }
        } else if text.starts_with('!') {
            LineKind::LocalComment
        } else if text.starts_with("**") {
            LineKind::Exclusive
        } else if text.starts_with('*') {
            if text.split('\t').any(is_manipulator_text) {
                LineKind::Manipulator
            } else {
                LineKind::Interpretation
            }
        } else if text.starts_with('=') {
            LineKind::Barline
        } else {
            LineKind::Data
        }
    }

    /// Global kinds hold one token and are not part of any spine.
    pub fn is_global(self) -> bool {
        matches!(
            self,
            LineKind::Empty
                | LineKind::UniversalComment
                | LineKind::Reference
                | LineKind::GlobalComment
        )
    }
}

/// A `!!!KEY: value` line: at least five characters, a colon, and no
/// whitespace before the colon.
pub fn is_reference_text(text: &str) -> bool {
    if text.len() < 5 || !text.starts_with("!!!") || text.starts_with("!!!!") {
        return false;
    }
    match text.find(':') {
        Some(colon) => colon > 3 && !text[..colon].contains(|c: char| c == ' ' || c == '\t'),
        None => false,
    }
}

/// A line that begins with exactly three `!` but is not a valid reference record.
pub(crate) fn is_malformed_reference(text: &str) -> bool {
    text.starts_with("!!!") && !text.starts_with("!!!!") && !is_reference_text(text)
}

#[derive(Clone, Debug)]
pub struct Line {
    pub(crate) text: String,
    pub(crate) index: usize,
    pub(crate) kind: LineKind,
    pub(crate) tokens: Vec<Token>,
    pub(crate) duration: Rational,
    pub(crate) duration_from_start: Rational,
    pub(crate) duration_from_barline: Rational,
    pub(crate) duration_to_barline: Rational,
    pub(crate) parameters: ParameterStore,
}

impl Line {
    /// Create an untokenized line. Trailing carriage returns are dropped.
    pub fn new(index: usize, text: &str) -> Self {
        let text = text.trim_end_matches('\r');
        Self {
            text: text.to_string(),
            index,
            kind: LineKind::classify(text),
            tokens: Vec::new(),
            duration: Rational::non_finite(),
            duration_from_start: Rational::non_finite(),
            duration_from_barline: Rational::non_finite(),
            duration_to_barline: Rational::non_finite(),
            parameters: ParameterStore::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn line_number(&self) -> usize {
        self.index + 1
    }

    pub fn kind(&self) -> LineKind {
        self.kind
    }

    /// Split the text into tokens: one per tab-separated field, or a single
    /// token for global lines. A trailing tab does not create an empty field.
    pub fn tokenize(&mut self) {
        let index = self.index;
        let fields: Vec<&str> = if self.kind.is_global() {
            vec![self.text.as_str()]
        } else {
            let mut fields: Vec<&str> = self.text.split('\t').collect();
            if fields.len() > 1 && fields.last() == Some(&"") {
                fields.pop();
            }
            fields
        };
        self.tokens = fields
            .into_iter()
            .enumerate()
            .map(|(field, text)| Token::new(text, index, field))
            .collect();
    }

    /// Rebuild the line text by joining token texts with tabs.
    pub fn create_line_from_tokens(&mut self) {
        self.text = self
            .tokens
            .iter()
            .map(Token::text)
            .collect::<Vec<_>>()
            .join("\t");
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn token(&self, field: usize) -> Option<&Token> {
        self.tokens.get(field)
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token_ids(&self) -> impl Iterator<Item = TokenId> + '_ {
        self.tokens.iter().map(Token::id)
    }

    // ---- classification ----

    pub fn is_empty(&self) -> bool {
        self.kind == LineKind::Empty
    }

    pub fn is_data(&self) -> bool {
        self.kind == LineKind::Data
    }

    pub fn is_barline(&self) -> bool {
        self.kind == LineKind::Barline
    }

    pub fn is_exclusive(&self) -> bool {
        self.kind == LineKind::Exclusive
    }

    /// Any `*` line, including exclusive-interpretation and manipulator lines.
    pub fn is_interpretation(&self) -> bool {
        matches!(
            self.kind,
            LineKind::Exclusive | LineKind::Manipulator | LineKind::Interpretation
        )
    }

    pub fn is_manipulator(&self) -> bool {
        matches!(self.kind, LineKind::Exclusive | LineKind::Manipulator)
    }

    /// Every field is `*-`.
    pub fn is_terminator(&self) -> bool {
        self.kind == LineKind::Manipulator
            && !self.tokens.is_empty()
            && self.tokens.iter().all(Token::is_terminator)
    }

    pub fn is_comment(&self) -> bool {
        matches!(
            self.kind,
            LineKind::LocalComment
                | LineKind::GlobalComment
                | LineKind::UniversalComment
                | LineKind::Reference
        )
    }

    pub fn is_comment_local(&self) -> bool {
        self.kind == LineKind::LocalComment
    }

    pub fn is_comment_global(&self) -> bool {
        matches!(self.kind, LineKind::GlobalComment | LineKind::Reference)
    }

    pub fn is_comment_universal(&self) -> bool {
        self.kind == LineKind::UniversalComment
    }

    pub fn is_reference(&self) -> bool {
        self.kind == LineKind::Reference
    }

    pub fn is_global(&self) -> bool {
        self.kind.is_global()
    }

    pub fn has_spines(&self) -> bool {
        !self.kind.is_global()
    }

    /// Key of a reference record: `COM` in `!!!COM: Bach`.
    pub fn reference_key(&self) -> Option<&str> {
        if !self.is_reference() {
            return None;
        }
        let colon = self.text.find(':')?;
        Some(&self.text[3..colon])
    }

    /// Value of a reference record with surrounding whitespace removed.
    pub fn reference_value(&self) -> Option<&str> {
        if !self.is_reference() {
            return None;
        }
        let colon = self.text.find(':')?;
        Some(self.text[colon + 1..].trim())
    }

    /// Every token is `.`, `*` or `!`.
    pub fn is_all_null(&self) -> bool {
        self.has_spines() && self.tokens.iter().all(Token::is_null)
    }

    /// Every token in a rhythmic spine is null (true when there are none).
    pub fn is_all_rhythmic_null(&self) -> bool {
        self.has_spines()
            && self
                .tokens
                .iter()
                .filter(|t| t.has_rhythm())
                .all(Token::is_null)
    }

    /// A data line on which no `**kern` token is null.
    pub fn is_kern_boundary_start(&self) -> bool {
        self.is_data()
            && self
                .tokens
                .iter()
                .filter(|t| t.is_kern())
                .all(|t| !t.is_null())
    }

    /// True when the next data token in every `**kern` spine is non-null,
    /// i.e. every note sounding on this line ends here.
    pub fn is_kern_boundary_end(&self, file: &HumdrumFile) -> bool {
        if !self.is_data() {
            return false;
        }
        for token in self.tokens.iter().filter(|t| t.is_kern()) {
            let mut current = token.next_token(0);
            while let Some(id) = current {
                let Some(next) = file.token(id) else {
                    break;
                };
                if next.is_data() {
                    if next.is_null() {
                        return false;
                    }
                    break;
                }
                current = next.next_token(0);
            }
        }
        true
    }

    // ---- durations ----

    pub fn duration(&self) -> Rational {
        self.duration.clone()
    }

    pub fn duration_scaled(&self, scale: &Rational) -> Rational {
        &self.duration * scale
    }

    pub fn duration_from_start(&self) -> Rational {
        self.duration_from_start.clone()
    }

    pub fn duration_from_barline(&self) -> Rational {
        self.duration_from_barline.clone()
    }

    pub fn duration_to_barline(&self) -> Rational {
        self.duration_to_barline.clone()
    }

    pub(crate) fn set_duration(&mut self, duration: Rational) {
        self.duration = duration;
    }

    pub(crate) fn set_duration_from_start(&mut self, duration: Rational) {
        self.duration_from_start = duration;
    }

    pub(crate) fn set_duration_from_barline(&mut self, duration: Rational) {
        self.duration_from_barline = duration;
    }

    pub(crate) fn set_duration_to_barline(&mut self, duration: Rational) {
        self.duration_to_barline = duration;
    }

    pub(crate) fn reset_durations(&mut self) {
        self.duration = Rational::non_finite();
        self.duration_from_start = Rational::non_finite();
        self.duration_from_barline = Rational::non_finite();
        self.duration_to_barline = Rational::non_finite();
    }
}

impl HasParameters for Line {
    fn parameters(&self) -> &ParameterStore {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut ParameterStore {
        &mut self.parameters
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenized(text: &str) -> Line {
        let mut line = Line::new(0, text);
        line.tokenize();
        line
    }

    #[test]
    fn test_classify() {
        assert_eq!(LineKind::classify(""), LineKind::Empty);
        assert_eq!(LineKind::classify("!!!!SEGMENT: a"), LineKind::UniversalComment);
        assert_eq!(LineKind::classify("!!!COM: Bach"), LineKind::Reference);
        assert_eq!(LineKind::classify("!!free text"), LineKind::GlobalComment);
        assert_eq!(LineKind::classify("!\t!"), LineKind::LocalComment);
        assert_eq!(LineKind::classify("**kern\t**kern"), LineKind::Exclusive);
        assert_eq!(LineKind::classify("*^\t*"), LineKind::Manipulator);
        assert_eq!(LineKind::classify("*\t**kern"), LineKind::Manipulator);
        assert_eq!(LineKind::classify("*clefG2\t*"), LineKind::Interpretation);
        assert_eq!(LineKind::classify("=1\t=1"), LineKind::Barline);
        assert_eq!(LineKind::classify("4c\t."), LineKind::Data);
    }

    #[test]
    fn test_tokenize_round_trip() {
        let mut line = tokenized("4c\t.\t8e 8g");
        assert_eq!(line.token_count(), 3);
        assert_eq!(line.token(2).map(Token::text), Some("8e 8g"));
        line.create_line_from_tokens();
        assert_eq!(line.text(), "4c\t.\t8e 8g");
    }

    #[test]
    fn test_tokenize_global_line_is_single_token() {
        let line = tokenized("!!global\twith tab");
        assert_eq!(line.token_count(), 1);
        assert!(line.is_global());
        assert!(!line.has_spines());
        let empty = tokenized("");
        assert_eq!(empty.token_count(), 1);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_trailing_tab_and_carriage_return() {
        let line = tokenized("4c\t4d\t\r");
        assert_eq!(line.text(), "4c\t4d\t");
        assert_eq!(line.token_count(), 2);
    }

    #[test]
    fn test_token_ids_carry_line_index() {
        let mut line = Line::new(7, "4c\t4d");
        line.tokenize();
        let ids: Vec<TokenId> = line.token_ids().collect();
        assert_eq!(ids, vec![TokenId::new(7, 0), TokenId::new(7, 1)]);
    }

    #[test]
    fn test_reference_records() {
        let line = tokenized("!!!COM: Bach, Johann Sebastian");
        assert!(line.is_reference());
        assert_eq!(line.reference_key(), Some("COM"));
        assert_eq!(line.reference_value(), Some("Bach, Johann Sebastian"));

        assert!(!is_reference_text("!!!COM Bach"));
        assert!(!is_reference_text("!!!A B: c"));
        assert!(!is_reference_text("!!!:"));
        assert!(is_malformed_reference("!!!COM Bach"));
        assert!(!is_malformed_reference("!!!!universal"));
        assert!(!is_malformed_reference("!!plain"));
    }

    #[test]
    fn test_null_lines() {
        assert!(tokenized(".\t.").is_all_null());
        assert!(tokenized("*\t*").is_all_null());
        assert!(!tokenized(".\t4c").is_all_null());
        assert!(!tokenized("").is_all_null());
    }

    #[test]
    fn test_terminator_line() {
        assert!(tokenized("*-\t*-").is_terminator());
        assert!(!tokenized("*-\t*").is_terminator());
        assert!(tokenized("*-\t*").is_manipulator());
    }

    #[test]
    fn test_unanalyzed_durations() {
        let line = tokenized("4c");
        assert!(!line.duration().is_finite());
        assert!(!line.duration_from_start().is_finite());
    }
}
