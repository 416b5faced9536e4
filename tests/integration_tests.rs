//! Integration tests for the humdrum engine
//!
//! Reads whole documents through the public API and checks the structural
//! properties every analyzed file must satisfy.

use std::collections::HashSet;

use humdrum::report::{spine_info_report, FileSummary};
use humdrum::{
    HasParameters, HumdrumError, HumdrumFile, HumdrumFileSet, Line, Rational, ReadOptions, TokenId,
};
use pretty_assertions::assert_eq;

const CHORALE: &str = "!!!COM: Bach, Johann Sebastian\n\
!!!OTL: Nun lob, mein Seel, den Herren\n\
**kern\t**kern\t**text\n\
*ICvox\t*ICvox\t*\n\
*clefF4\t*clefG2\t*\n\
*M4/4\t*M4/4\t*M4/4\n\
4GG\t4d\tNun\n\
=1\t=1\t=1\n\
4G\t4g\tlob,\n\
*^\t*\t*\n\
4A\t4c\t4f#\tmein\n\
4B\t4d\t4g\tSeel,\n\
*v\t*v\t*\t*\n\
!LO:N:vis=2\t!\t!\n\
4c\t4e\tden\n\
=2\t=2\t=2\n\
2.G\t4d\tHer-\n\
.\t4d\t.\n\
.\t4B\tren\n\
4C\t4c\t.\n\
==\t==\t==\n\
*-\t*-\t*-\n";

fn all_tokens(file: &HumdrumFile) -> Vec<TokenId> {
    file.lines()
        .iter()
        .filter(|line| line.has_spines())
        .flat_map(Line::token_ids)
        .collect()
}

#[test]
fn test_quarter_note_example() {
    let file = HumdrumFile::read_string("**kern\n4c\n4d\n*-\n").unwrap();
    let data: Vec<&Line> = file.lines().iter().filter(|l| l.is_data()).collect();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0].duration(), Rational::new(1, 4));
    assert_eq!(data[1].duration(), Rational::new(1, 4));
    assert_eq!(data[1].duration_from_start(), Rational::new(1, 4));

    let end = file.track_end(1, 0).unwrap();
    assert!(file[end].is_terminator());
}

#[test]
fn test_split_and_remerge_example() {
    let file = HumdrumFile::read_string("**kern\n*^\n*v\t*v\n*-\n").unwrap();
    assert_eq!(file.max_track(), 1);
    assert_eq!(file[2].token(0).unwrap().subtrack(), 1);
    assert_eq!(file[2].token(1).unwrap().subtrack(), 2);
    let terminator = TokenId::new(3, 0);
    assert_eq!(file[TokenId::new(2, 0)].next_tokens(), &[terminator]);
    assert_eq!(file[TokenId::new(2, 1)].next_tokens(), &[terminator]);
    assert_eq!(file.track_end_count(1).unwrap(), 1);
}

#[test]
fn test_parameter_example() {
    let file = HumdrumFile::read_string("**kern\n!LO:N:vis=1\n1c\n*-\n").unwrap();
    assert_eq!(file[TokenId::new(2, 0)].get_parameter("LO", "N", "vis"), Some("1"));

    let file = HumdrumFile::read_string("**kern\n!LO:N:vis=2\n!LO:N:vis=4\n1c\n*-\n").unwrap();
    assert_eq!(file[TokenId::new(3, 0)].get_parameter("LO", "N", "vis"), Some("2"));
    assert_eq!(file.diagnostics().of_kind("duplicate_parameter").count(), 1);
}

#[test]
fn test_chorale_structure() {
    let file = HumdrumFile::read_string(CHORALE).unwrap();
    assert_eq!(file.reference_value("COM"), Some("Bach, Johann Sebastian"));
    assert_eq!(file.max_track(), 3);
    assert_eq!(file.score_duration().unwrap(), Rational::new(9, 4));
    assert_eq!(file.barline_count().unwrap(), 4);
    assert_eq!(file.barline_duration(1).unwrap(), Rational::one());
    assert_eq!(file.tpq().unwrap(), 1);
    assert_eq!(file.strand_count().unwrap(), 4);
    assert!(file.diagnostics().is_empty());

    // The local comment under the merged spine governs the `4c`.
    let target = TokenId::new(14, 0);
    assert_eq!(file[target].text(), "4c");
    assert_eq!(file[target].get_parameter("LO", "N", "vis"), Some("2"));
    assert_eq!(file[TokenId::new(16, 0)].duration(), Rational::new(3, 4));
    assert_eq!(file[16].duration_from_start(), Rational::new(5, 4));
}

#[test]
fn test_round_trip() {
    let file = HumdrumFile::read_string(CHORALE).unwrap();
    assert_eq!(file.to_text(), CHORALE);

    let mut rebuilt = file.clone();
    rebuilt.create_lines_from_tokens();
    let reparsed = HumdrumFile::read_string(&rebuilt.to_text()).unwrap();
    for (a, b) in file.lines().iter().zip(reparsed.lines()) {
        let left: Vec<&str> = a.tokens().iter().map(|t| t.text()).collect();
        let right: Vec<&str> = b.tokens().iter().map(|t| t.text()).collect();
        assert_eq!(left, right);
    }
}

#[test]
fn test_track_invariant() {
    let file = HumdrumFile::read_string(CHORALE).unwrap();
    let starts = file.spine_starts().unwrap();
    for track in 1..=file.max_track() {
        let count = starts.iter().filter(|id| file[**id].track() == track).count();
        assert_eq!(count, 1, "track {} has one start", track);
    }

    // Following `next` from each start stays in its track, and together the
    // starts reach every spine token exactly once.
    let mut reached: HashSet<TokenId> = HashSet::new();
    for start in starts {
        let track = file[*start].track();
        let mut pending = vec![*start];
        let mut visited: HashSet<TokenId> = HashSet::new();
        while let Some(id) = pending.pop() {
            if visited.insert(id) {
                assert_eq!(file[id].track(), track, "token {}", id);
                pending.extend_from_slice(file[id].next_tokens());
            }
        }
        for id in visited {
            assert!(reached.insert(id), "{} reached from two tracks", id);
        }
    }
    let expected: HashSet<TokenId> = all_tokens(&file).into_iter().collect();
    assert_eq!(reached, expected);
}

#[test]
fn test_rhythm_conservation() {
    let file = HumdrumFile::read_string(CHORALE).unwrap();
    let lines = file.lines();
    for pair in lines.windows(2) {
        assert_eq!(
            &pair[0].duration_from_start() + &pair[0].duration(),
            pair[1].duration_from_start(),
            "line {}",
            pair[0].line_number()
        );
    }
}

#[test]
fn test_null_resolution_matches_spine() {
    let file = HumdrumFile::read_string(CHORALE).unwrap();
    for id in all_tokens(&file) {
        let token = &file[id];
        if !token.is_null_data() {
            continue;
        }
        let resolved = token.resolve_null().expect("null token has a governing token");
        let target = &file[resolved];
        assert!(!target.is_null());
        assert_eq!(target.track(), token.track());
    }
}

#[test]
fn test_strand_coverage() {
    let file = HumdrumFile::read_string(CHORALE).unwrap();
    let mut seen: HashSet<TokenId> = HashSet::new();
    for index in 0..file.strand_count().unwrap() {
        for id in file.strand_tokens(index).unwrap() {
            assert!(seen.insert(id), "{} is in two strands", id);
            assert_eq!(file[id].strand_index(), Some(index));
        }
    }
    let expected: HashSet<TokenId> = all_tokens(&file).into_iter().collect();
    assert_eq!(seen, expected);
}

#[test]
fn test_spine_report_for_chorale() {
    let file = HumdrumFile::read_string(CHORALE).unwrap();
    let report = spine_info_report(&file);
    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines[0], "!!!COM: Bach, Johann Sebastian");
    assert_eq!(lines[10], "(1)a\t(1)b\t2\t3");
    assert_eq!(lines[14], "1\t2\t3");
}

#[test]
fn test_summary_for_no_rhythm_read() {
    let file = HumdrumFile::read_string_no_rhythm(CHORALE).unwrap();
    let summary = FileSummary::from_file(&file);
    assert_eq!(summary.tracks, 3);
    assert_eq!(summary.strands, 4);
    assert_eq!(summary.barlines, None);
    assert_eq!(summary.score_duration, None);
}

#[test]
fn test_yaml_options() {
    let options = ReadOptions::from_yaml("analyze-strophes: true\nstrict-references: false\n").unwrap();
    let file = HumdrumFile::read_string_with(
        "!!!bad reference\n**kern\n*strophe\n4c\n*Xstrophe\n*-\n",
        options,
    )
    .unwrap();
    assert_eq!(file.strophe_count().unwrap(), 1);
    assert_eq!(file.diagnostics().of_kind("malformed_reference").count(), 1);

    let err = ReadOptions::from_yaml("rhythmic-data-types: [kern]\n").unwrap_err();
    assert!(matches!(err, HumdrumError::Config(_)));
}

#[test]
fn test_file_set() {
    let input = format!("!!!!SEGMENT: chorale.krn\n{}!!!!SEGMENT: scale.krn\n**kern\n4c\n4d\n*-\n", CHORALE);
    let set = HumdrumFileSet::read_string(&input).unwrap();
    assert_eq!(set.len(), 2);
    let names: Vec<Option<&str>> = set.iter().map(|f| f.segment_name()).collect();
    assert_eq!(names, vec![Some("chorale.krn"), Some("scale.krn")]);
    assert_eq!(set[0].to_text(), CHORALE);
    assert_eq!(set[1].score_duration().unwrap(), Rational::new(1, 2));
}

#[test]
fn test_read_from_reader() {
    let file = HumdrumFile::read(CHORALE.as_bytes(), ReadOptions::no_rhythm()).unwrap();
    assert_eq!(file.line_count(), 22);
    assert!(file.score_duration().is_err());
}
