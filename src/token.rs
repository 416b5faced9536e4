//! # Tokens
//!
//! One tab-separated field of one line.
//!
//! ## Purpose
//! A [`Token`] carries its text, its position in the spine layout (an
//! [`Address`]), the analysis results attached by the file passes (links,
//! durations, strand and strophe membership), and its layout parameters.
//!
//! ## Handles
//! Tokens live inside their [`crate::Line`], which lives inside the
//! [`crate::HumdrumFile`]. Links between tokens are [`TokenId`] handles
//! (`line`, `field`), resolved through `file.token(id)` or `file[id]`. The
//! graph therefore has no owning cycles and the whole file is `Send + Sync`.
//!
//! ## Classification
//! Token predicates look only at the token text:
//! ```text
//! **kern   exclusive interpretation   (also a manipulator)
//! *^ *v    split / merge              (manipulators)
//! *x *+ *- exchange / add / terminate (manipulators)
//! *clefG2  interpretation
//! !        local comment
//! =1       barline
//! .        null data
//! 4c       data
//! ```

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::parameters::{HasParameters, ParameterStore};
use crate::rational::Rational;
use crate::rhythm;

/// Handle to a token: line index and field index, both 0-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TokenId {
    pub line: usize,
    pub field: usize,
}

impl TokenId {
    pub const fn new(line: usize, field: usize) -> Self {
        Self { line, field }
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.field + 1)
    }
}

/// Where a token sits in the file and in the spine layout.
///
/// `track` and `subtrack` are zero until track assignment has run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Address {
    pub line: usize,
    pub field: usize,
    pub spine_info: String,
    pub track: usize,
    pub subtrack: usize,
    pub subtrack_count: usize,
}

#[derive(Clone, Debug)]
pub struct Token {
    pub(crate) text: String,
    pub(crate) address: Address,
    pub(crate) data_type: Arc<str>,
    pub(crate) rhythmic: bool,
    pub(crate) next: Vec<TokenId>,
    pub(crate) previous: Vec<TokenId>,
    pub(crate) next_non_null: Vec<TokenId>,
    pub(crate) previous_non_null: Vec<TokenId>,
    pub(crate) null_resolution: Option<TokenId>,
    pub(crate) duration: Rational,
    pub(crate) duration_from_start: Rational,
    pub(crate) duration_to_end: Rational,
    pub(crate) strand: Option<usize>,
    pub(crate) strophe: Option<TokenId>,
    pub(crate) linked_parameters: Vec<TokenId>,
    pub(crate) parameters: ParameterStore,
}

impl Token {
    pub(crate) fn new(text: &str, line: usize, field: usize) -> Self {
        Self {
            text: text.to_string(),
            address: Address {
                line,
                field,
                ..Address::default()
            },
            data_type: Arc::from(""),
            rhythmic: false,
            next: Vec::new(),
            previous: Vec::new(),
            next_non_null: Vec::new(),
            previous_non_null: Vec::new(),
            null_resolution: None,
            duration: Rational::non_finite(),
            duration_from_start: Rational::non_finite(),
            duration_to_end: Rational::non_finite(),
            strand: None,
            strophe: None,
            linked_parameters: Vec::new(),
            parameters: ParameterStore::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn id(&self) -> TokenId {
        TokenId::new(self.address.line, self.address.field)
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn line_index(&self) -> usize {
        self.address.line
    }

    /// 1-based line number, as used in diagnostics.
    pub fn line_number(&self) -> usize {
        self.address.line + 1
    }

    pub fn field_index(&self) -> usize {
        self.address.field
    }

    pub fn spine_info(&self) -> &str {
        &self.address.spine_info
    }

    pub fn track(&self) -> usize {
        self.address.track
    }

    pub fn subtrack(&self) -> usize {
        self.address.subtrack
    }

    pub fn subtrack_count(&self) -> usize {
        self.address.subtrack_count
    }

    /// `"2"` for an unsplit spine, `"2.1"` for the first sub-spine of track 2.
    pub fn track_string(&self) -> String {
        if self.address.subtrack > 0 {
            format!("{}.{}", self.address.track, self.address.subtrack)
        } else {
            self.address.track.to_string()
        }
    }

    /// Exclusive interpretation of the spine, such as `**kern`.
    pub fn data_type(&self) -> &str {
        &self.data_type
    }

    /// Matches `"**kern"` as well as `"kern"`.
    pub fn is_data_type(&self, name: &str) -> bool {
        let name = name.strip_prefix("**").unwrap_or(name);
        self.data_type.strip_prefix("**") == Some(name)
    }

    pub fn is_kern(&self) -> bool {
        self.is_data_type("**kern")
    }

    // ---- text classification ----

    pub fn is_exclusive_interpretation(&self) -> bool {
        self.text.starts_with("**")
    }

    pub fn is_interpretation(&self) -> bool {
        self.text.starts_with('*')
    }

    pub fn is_comment(&self) -> bool {
        self.text.starts_with('!')
    }

    pub fn is_comment_local(&self) -> bool {
        self.text.starts_with('!') && !self.text.starts_with("!!")
    }

    pub fn is_comment_global(&self) -> bool {
        self.text.starts_with("!!")
    }

    pub fn is_barline(&self) -> bool {
        self.text.starts_with('=')
    }

    pub fn is_data(&self) -> bool {
        !(self.text.is_empty()
            || self.is_interpretation()
            || self.is_comment()
            || self.is_barline())
    }

    /// `.`, `*` or `!`.
    pub fn is_null(&self) -> bool {
        matches!(self.text.as_str(), "." | "*" | "!")
    }

    pub fn is_null_data(&self) -> bool {
        self.text == "."
    }

    pub fn is_non_null_data(&self) -> bool {
        self.is_data() && !self.is_null()
    }

    pub fn is_split(&self) -> bool {
        self.text == "*^"
    }

    pub fn is_merge(&self) -> bool {
        self.text == "*v"
    }

    pub fn is_exchange(&self) -> bool {
        self.text == "*x"
    }

    pub fn is_add(&self) -> bool {
        self.text == "*+"
    }

    pub fn is_terminator(&self) -> bool {
        self.text == "*-"
    }

    /// Split, merge, exchange, add, terminate or exclusive interpretation.
    pub fn is_manipulator(&self) -> bool {
        is_manipulator_text(&self.text)
    }

    /// Section label such as `*>A`.
    pub fn is_label(&self) -> bool {
        self.text.starts_with("*>") && !self.text.contains('[')
    }

    /// Strophe start label such as `*S/1`.
    pub fn is_strophe_label(&self) -> bool {
        self.text.starts_with("*S/")
    }

    pub fn is_chord(&self) -> bool {
        self.is_non_null_data() && self.text.contains(' ')
    }

    pub fn is_grace(&self) -> bool {
        self.rhythmic && self.is_non_null_data() && self.text.contains('q')
    }

    pub fn is_rest(&self) -> bool {
        self.is_kern() && self.is_non_null_data() && self.text.contains('r')
    }

    pub fn is_note(&self) -> bool {
        self.is_kern()
            && self.is_non_null_data()
            && !self.text.contains('r')
            && self.text.chars().any(|c| matches!(c, 'a'..='g' | 'A'..='G'))
    }

    /// True for tokens of spines whose data carry recip durations.
    pub fn has_rhythm(&self) -> bool {
        self.rhythmic
    }

    // ---- sub-tokens ----

    pub fn subtoken_count(&self, separator: &str) -> usize {
        self.text.split(separator).count()
    }

    pub fn subtoken(&self, index: usize, separator: &str) -> Option<&str> {
        self.text.split(separator).nth(index)
    }

    pub fn subtokens(&self, separator: &str) -> Vec<&str> {
        self.text.split(separator).collect()
    }

    // ---- durations ----

    /// Duration in whole notes; non-finite for non-rhythmic or null tokens.
    pub fn duration(&self) -> Rational {
        self.duration.clone()
    }

    /// Duration multiplied by `scale` (4 gives quarter-note units).
    pub fn duration_scaled(&self, scale: &Rational) -> Rational {
        &self.duration * scale
    }

    /// Duration with augmentation dots removed.
    pub fn duration_no_dots(&self) -> Rational {
        &self.duration / &rhythm::dot_factor(self.dots())
    }

    /// Augmentation dots on a rhythmic data token.
    pub fn dots(&self) -> usize {
        if self.rhythmic && self.is_non_null_data() {
            rhythm::dot_count(&self.text)
        } else {
            0
        }
    }

    pub fn duration_from_start(&self) -> Rational {
        self.duration_from_start.clone()
    }

    pub fn duration_to_end(&self) -> Rational {
        self.duration_to_end.clone()
    }

    // ---- links ----

    pub fn next_tokens(&self) -> &[TokenId] {
        &self.next
    }

    pub fn previous_tokens(&self) -> &[TokenId] {
        &self.previous
    }

    pub fn next_token(&self, index: usize) -> Option<TokenId> {
        self.next.get(index).copied()
    }

    pub fn previous_token(&self, index: usize) -> Option<TokenId> {
        self.previous.get(index).copied()
    }

    pub fn next_token_count(&self) -> usize {
        self.next.len()
    }

    pub fn previous_token_count(&self) -> usize {
        self.previous.len()
    }

    pub fn next_non_null_data_tokens(&self) -> &[TokenId] {
        &self.next_non_null
    }

    pub fn previous_non_null_data_tokens(&self) -> &[TokenId] {
        &self.previous_non_null
    }

    /// The token itself when it is not null, otherwise the non-null token of
    /// the same kind that governs it: the data token for `.`, the latest
    /// interpretation for `*`, the latest local comment for `!`. `None` when
    /// the spine has no such token before it.
    pub fn resolve_null(&self) -> Option<TokenId> {
        if self.is_null() {
            self.null_resolution
        } else {
            Some(self.id())
        }
    }

    /// Index into the file's flattened strand list.
    pub fn strand_index(&self) -> Option<usize> {
        self.strand
    }

    /// The token that opened the strophe containing this token.
    pub fn strophe(&self) -> Option<TokenId> {
        self.strophe
    }

    pub fn has_strophe(&self) -> bool {
        self.strophe.is_some()
    }

    /// Comment tokens whose parameters were propagated onto this token.
    pub fn linked_parameter_tokens(&self) -> &[TokenId] {
        &self.linked_parameters
    }

    pub(crate) fn reset_links(&mut self) {
        self.next.clear();
        self.previous.clear();
        self.next_non_null.clear();
        self.previous_non_null.clear();
        self.null_resolution = None;
    }

    pub(crate) fn reset_durations(&mut self) {
        self.duration = Rational::non_finite();
        self.duration_from_start = Rational::non_finite();
        self.duration_to_end = Rational::non_finite();
    }
}

impl HasParameters for Token {
    fn parameters(&self) -> &ParameterStore {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut ParameterStore {
        &mut self.parameters
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl PartialEq<str> for Token {
    fn eq(&self, other: &str) -> bool {
        self.text == other
    }
}

impl PartialEq<&str> for Token {
    fn eq(&self, other: &&str) -> bool {
        self.text == *other
    }
}

pub(crate) fn is_manipulator_text(text: &str) -> bool {
    matches!(text, "*^" | "*v" | "*x" | "*+" | "*-") || text.starts_with("**")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(text: &str) -> Token {
        Token::new(text, 0, 0)
    }

    #[test]
    fn test_classification() {
        assert!(token("**kern").is_exclusive_interpretation());
        assert!(token("**kern").is_manipulator());
        assert!(token("*clefG2").is_interpretation());
        assert!(!token("*clefG2").is_manipulator());
        assert!(token("!").is_comment_local());
        assert!(token("!!").is_comment_global());
        assert!(token("=1").is_barline());
        assert!(token("4c").is_data());
        assert!(!token("").is_data());
    }

    #[test]
    fn test_null_tokens() {
        assert!(token(".").is_null());
        assert!(token(".").is_null_data());
        assert!(token("*").is_null());
        assert!(token("!").is_null());
        assert!(!token("*").is_null_data());
        assert!(!token("4c").is_null());
        assert!(token("4c").is_non_null_data());
    }

    #[test]
    fn test_manipulators() {
        assert!(token("*^").is_split());
        assert!(token("*v").is_merge());
        assert!(token("*x").is_exchange());
        assert!(token("*+").is_add());
        assert!(token("*-").is_terminator());
        for text in ["*^", "*v", "*x", "*+", "*-"] {
            assert!(token(text).is_manipulator(), "{} is a manipulator", text);
        }
    }

    #[test]
    fn test_labels() {
        assert!(token("*>A").is_label());
        assert!(!token("*>[A,A,B]").is_label());
        assert!(token("*S/1").is_strophe_label());
    }

    #[test]
    fn test_subtokens() {
        let chord = token("4c 4e 4g");
        assert_eq!(chord.subtoken_count(" "), 3);
        assert_eq!(chord.subtoken(1, " "), Some("4e"));
        assert_eq!(chord.subtoken(3, " "), None);
        assert_eq!(chord.subtokens(" "), vec!["4c", "4e", "4g"]);
        assert!(chord.is_chord());
    }

    #[test]
    fn test_kern_predicates() {
        let mut rest = token("4r");
        rest.data_type = Arc::from("**kern");
        rest.rhythmic = true;
        assert!(rest.is_rest());
        assert!(!rest.is_note());

        let mut note = token("8.cc#");
        note.data_type = Arc::from("**kern");
        note.rhythmic = true;
        assert!(note.is_note());
        assert!(note.is_kern());
        assert!(note.is_data_type("kern"));
        assert_eq!(note.dots(), 1);

        let mut grace = token("8qd");
        grace.rhythmic = true;
        assert!(grace.is_grace());
    }

    #[test]
    fn test_track_string() {
        let mut tok = token("4c");
        tok.address.track = 2;
        assert_eq!(tok.track_string(), "2");
        tok.address.subtrack = 1;
        assert_eq!(tok.track_string(), "2.1");
    }

    #[test]
    fn test_unanalyzed_durations_are_non_finite() {
        let tok = token("4c");
        assert!(!tok.duration().is_finite());
        assert!(!tok.duration_from_start().is_finite());
        assert_eq!(tok.resolve_null(), Some(tok.id()));
        assert_eq!(token(".").resolve_null(), None);
    }

    #[test]
    fn test_token_id_display_is_one_based() {
        assert_eq!(TokenId::new(0, 2).to_string(), "1:3");
    }
}
