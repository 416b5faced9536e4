//! # File Sets
//!
//! A stream holding several Humdrum documents, each introduced by a
//! `!!!!SEGMENT: name` universal comment:
//!
//! ```text
//! !!!!SEGMENT: first.krn
//! **kern
//! 4c
//! *-
//! !!!!SEGMENT: second.krn
//! **kern
//! 2d
//! *-
//! ```
//!
//! Each segment becomes an independent [`HumdrumFile`] named after its
//! marker; the marker line itself is not part of the file. Text before the
//! first marker forms an unnamed segment when it holds anything besides
//! empty lines. Files share no state, so segments are analyzed on the rayon
//! thread pool and returned in input order.

use std::ops::Index;

use rayon::prelude::*;

use crate::error::HumdrumError;
use crate::file::HumdrumFile;
use crate::options::ReadOptions;

const SEGMENT_MARKER: &str = "!!!!SEGMENT";

#[derive(Debug, Default)]
pub struct HumdrumFileSet {
    files: Vec<HumdrumFile>,
}

impl HumdrumFileSet {
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    pub fn read_string(contents: &str) -> Result<Self, HumdrumError> {
        Self::read_string_with(contents, &ReadOptions::default())
    }

    /// Split `contents` into segments and analyze each one.
    ///
    /// Fails with the first error in input order.
    pub fn read_string_with(contents: &str, options: &ReadOptions) -> Result<Self, HumdrumError> {
        let segments = split_segments(contents);
        log::debug!("reading {} segments", segments.len());

        let results: Vec<Result<HumdrumFile, HumdrumError>> = segments
            .par_iter()
            .map(|segment| {
                let mut file = HumdrumFile::from_text(&segment.text, options.clone());
                file.segment_name = segment.name.clone();
                file.analyze().map(|_| file)
            })
            .collect();

        let files = results.into_iter().collect::<Result<Vec<_>, _>>()?;
        Ok(Self { files })
    }

    /// Append an already analyzed file.
    pub fn push(&mut self, file: HumdrumFile) {
        self.files.push(file);
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&HumdrumFile> {
        self.files.get(index)
    }

    pub fn files(&self) -> &[HumdrumFile] {
        &self.files
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HumdrumFile> {
        self.files.iter()
    }
}

impl Index<usize> for HumdrumFileSet {
    type Output = HumdrumFile;

    fn index(&self, index: usize) -> &HumdrumFile {
        &self.files[index]
    }
}

impl<'a> IntoIterator for &'a HumdrumFileSet {
    type Item = &'a HumdrumFile;
    type IntoIter = std::slice::Iter<'a, HumdrumFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

#[derive(Debug, PartialEq)]
struct Segment {
    name: Option<String>,
    text: String,
}

fn split_segments(contents: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current = Segment {
        name: None,
        text: String::new(),
    };
    for line in contents.lines() {
        if let Some(name) = segment_name(line) {
            if !current.text.trim().is_empty() {
                segments.push(current);
            }
            current = Segment {
                name: Some(name),
                text: String::new(),
            };
            continue;
        }
        current.text.push_str(line);
        current.text.push('\n');
    }
    if !current.text.trim().is_empty() {
        segments.push(current);
    }
    segments
}

/// Name from `!!!!SEGMENT: name` (an optional level number may precede the
/// colon, as in `!!!!SEGMENT 2: name`).
fn segment_name(line: &str) -> Option<String> {
    let rest = line.strip_prefix(SEGMENT_MARKER)?;
    let colon = rest.find(':')?;
    let level = rest[..colon].trim();
    let level_digits = level.strip_prefix(['+', '-']).unwrap_or(level);
    if !level_digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(rest[colon + 1..].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_SEGMENTS: &str = "!!!!SEGMENT: first.krn\n**kern\n4c\n*-\n!!!!SEGMENT: second.krn\n**kern\n2d\n4e\n*-\n";

    #[test]
    fn test_segment_name() {
        assert_eq!(segment_name("!!!!SEGMENT: a.krn"), Some("a.krn".to_string()));
        assert_eq!(segment_name("!!!!SEGMENT 2: b.krn "), Some("b.krn".to_string()));
        assert_eq!(segment_name("!!!!SEGMENT+1:c"), Some("c".to_string()));
        assert_eq!(segment_name("!!!!SEGMENTS: x"), None);
        assert_eq!(segment_name("!!!COM: Bach"), None);
    }

    #[test]
    fn test_split_segments() {
        let segments = split_segments(TWO_SEGMENTS);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].name.as_deref(), Some("first.krn"));
        assert_eq!(segments[0].text, "**kern\n4c\n*-\n");
        assert_eq!(segments[1].name.as_deref(), Some("second.krn"));
    }

    #[test]
    fn test_unnamed_leading_segment() {
        let segments = split_segments("**kern\n4c\n*-\n!!!!SEGMENT: b\n**kern\n4d\n*-\n");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].name, None);
        assert_eq!(segments[1].name.as_deref(), Some("b"));
    }

    #[test]
    fn test_read_set_keeps_order() {
        let set = HumdrumFileSet::read_string(TWO_SEGMENTS).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set[0].segment_name(), Some("first.krn"));
        assert_eq!(set[1].segment_name(), Some("second.krn"));
        assert_eq!(set[1].line_count(), 4);
        assert_eq!(set[1].score_duration().unwrap().to_string(), "3/4");
    }

    #[test]
    fn test_read_set_reports_first_error() {
        let input = "!!!!SEGMENT: ok\n**kern\n4c\n*-\n!!!!SEGMENT: bad\n**kern\n4c\t4d\n*-\n";
        let err = HumdrumFileSet::read_string(input).unwrap_err();
        assert!(matches!(err, HumdrumError::Spine { line: 2, .. }));
    }

    #[test]
    fn test_read_set_with_many_segments() {
        let mut input = String::new();
        for index in 0..500 {
            input.push_str(&format!("!!!!SEGMENT: part{}.krn\n**kern\n4c\n*-\n", index));
        }
        input.push_str("!!!!SEGMENT: bad1\n**kern\n*v\n*-\n");
        input.push_str("!!!!SEGMENT: bad2\n**kern\n4c\t4d\n*-\n");

        let err = HumdrumFileSet::read_string(&input).unwrap_err();
        match err {
            HumdrumError::Spine { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("'*v'"), "{}", message);
            }
            other => panic!("unexpected error {:?}", other),
        }

        let valid: String = input.split("!!!!SEGMENT: bad1").next().unwrap_or("").to_string();
        let set = HumdrumFileSet::read_string(&valid).unwrap();
        assert_eq!(set.len(), 500);
        assert_eq!(set[0].segment_name(), Some("part0.krn"));
        assert_eq!(set[499].segment_name(), Some("part499.krn"));
    }
}
