//! Rhythm analysis.
//!
//! ## Steps
//! 1. Token durations: rhythmic, non-null data tokens get their recip
//!    duration; every other token stays non-finite.
//! 2. Line start times: each rhythmic track is walked from its start,
//!    summing durations; a line reached with two different sums is an
//!    inconsistent-rhythm error. Tracks that start later (added by `*+` or
//!    opened after a full termination) are anchored to the first line with
//!    a known start time.
//! 3. Data lines whose rhythmic tokens are all null are spread evenly
//!    between their neighbours.
//! 4. Remaining lines take the start time of the next timed line (or the
//!    previous one, at the end of the file).
//! 5. Line duration = next line start - this line start; the last line is 0.
//! 6. Barlines, times from/to the nearest barline.
//! 7. Non-rhythmic data tokens last until the next non-null token in their
//!    spine.
//!
//! All times are in whole notes.

use std::collections::HashSet;

use super::{HumdrumFile, Stage};
use crate::error::HumdrumError;
use crate::line::Line;
use crate::rational::{lcm, Rational};
use crate::rhythm::recip_to_duration;
use crate::token::TokenId;

impl HumdrumFile {
    pub fn analyze_rhythm(&mut self) -> Result<(), HumdrumError> {
        self.begin_pass(Stage::RhythmAnalyzed)?;
        let result = self.run_rhythm_analysis();
        self.finish_pass(Stage::RhythmAnalyzed, result)
    }

    fn run_rhythm_analysis(&mut self) -> Result<(), HumdrumError> {
        self.assign_token_durations();

        let rhythmic: Vec<TokenId> = self
            .track_starts
            .iter()
            .copied()
            .filter(|id| self[*id].has_rhythm())
            .collect();

        if rhythmic.is_empty() {
            for line in &mut self.lines {
                line.set_duration_from_start(Rational::zero());
            }
        } else {
            self.assign_line_start_times(&rhythmic)?;
            self.interpolate_null_lines()?;
            self.fill_missing_start_times();
        }

        self.assign_line_durations();
        self.analyze_meter();
        self.assign_non_rhythmic_durations();
        self.copy_times_to_tokens();
        Ok(())
    }

    fn assign_token_durations(&mut self) {
        for line in &mut self.lines {
            for token in &mut line.tokens {
                token.duration = if token.has_rhythm() && token.is_non_null_data() {
                    recip_to_duration(&token.text)
                } else {
                    Rational::non_finite()
                };
            }
        }
    }

    fn assign_line_start_times(&mut self, rhythmic: &[TokenId]) -> Result<(), HumdrumError> {
        let mut visited: Vec<Vec<bool>> = self
            .lines
            .iter()
            .map(|line| vec![false; line.tokens.len()])
            .collect();

        let first_line = self.track_starts.first().map_or(0, |id| id.line);
        for start in rhythmic.iter().filter(|id| id.line == first_line) {
            self.walk_track_durations(*start, Rational::zero(), &mut visited)?;
        }
        for start in rhythmic.iter().filter(|id| id.line != first_line) {
            let offset = self.floating_spine_offset(*start);
            self.walk_track_durations(*start, offset, &mut visited)?;
        }
        Ok(())
    }

    /// Walk a spine from `start`, following the primary branch first and
    /// then each secondary branch, setting line start times on the way.
    fn walk_track_durations(
        &mut self,
        start: TokenId,
        offset: Rational,
        visited: &mut [Vec<bool>],
    ) -> Result<(), HumdrumError> {
        let mut pending = vec![(start, offset)];
        while let Some((first, mut time)) = pending.pop() {
            let mut branches = Vec::new();
            let mut current = Some(first);
            while let Some(id) = current {
                if visited[id.line][id.field] {
                    break;
                }
                visited[id.line][id.field] = true;

                self.set_line_start(id, &time)?;
                let token = &self[id];
                if token.duration.is_positive() {
                    time += &token.duration;
                }
                for next in token.next.iter().skip(1) {
                    branches.push((*next, time.clone()));
                }
                current = token.next_token(0);
            }
            pending.extend(branches);
        }
        Ok(())
    }

    fn set_line_start(&mut self, id: TokenId, time: &Rational) -> Result<(), HumdrumError> {
        let token = &self[id];
        if !token.is_terminator() && !token.duration.is_finite() {
            return Ok(());
        }
        let line = &mut self.lines[id.line];
        if !line.duration_from_start.is_finite() {
            line.set_duration_from_start(time.clone());
            Ok(())
        } else if &line.duration_from_start != time {
            Err(HumdrumError::Rhythm {
                line: id.line + 1,
                message: format!(
                    "inconsistent rhythm: expected the line to start at {} but another spine places it at {}",
                    time, line.duration_from_start
                ),
            })
        } else {
            Ok(())
        }
    }

    /// Start time for a spine that opens after the first spine line.
    fn floating_spine_offset(&self, start: TokenId) -> Rational {
        let mut elapsed = Rational::zero();
        let mut current = Some(start);
        while let Some(id) = current {
            let known = &self.lines[id.line].duration_from_start;
            if known.is_finite() {
                return known - &elapsed;
            }
            let token = &self[id];
            if token.duration.is_positive() {
                elapsed += &token.duration;
            }
            current = token.next_token(0);
        }
        // Nothing in the spine overlaps a timed line: continue from the
        // latest time reached before the spine opens.
        self.lines[..start.line]
            .iter()
            .rev()
            .map(|line| line.duration_from_start.clone())
            .find(Rational::is_finite)
            .unwrap_or_else(Rational::zero)
    }

    fn interpolate_null_lines(&mut self) -> Result<(), HumdrumError> {
        let mut null_lines: Vec<usize> = Vec::new();
        let mut previous: Option<usize> = None;
        for index in 0..self.lines.len() {
            let line = &self.lines[index];
            if !line.has_spines() {
                continue;
            }
            if line.is_all_rhythmic_null() {
                if line.is_data() {
                    null_lines.push(index);
                }
                continue;
            }
            if !line.duration_from_start.is_finite() {
                if line.is_data() {
                    return Err(HumdrumError::Rhythm {
                        line: index + 1,
                        message: "data line has no start time".to_string(),
                    });
                }
                continue;
            }
            if let Some(prev) = previous {
                let start = self.lines[prev].duration_from_start.clone();
                let end = self.lines[index].duration_from_start.clone();
                let step = &(&end - &start) / &Rational::from_integer(null_lines.len() as i64 + 1);
                for (n, null_index) in null_lines.iter().enumerate() {
                    let time = &start + &(&step * &Rational::from_integer(n as i64 + 1));
                    self.lines[*null_index].set_duration_from_start(time);
                }
            }
            previous = Some(index);
            null_lines.clear();
        }
        Ok(())
    }

    fn fill_missing_start_times(&mut self) {
        let mut later = Rational::non_finite();
        for line in self.lines.iter_mut().rev() {
            if line.duration_from_start.is_finite() {
                later = line.duration_from_start.clone();
            } else if later.is_finite() {
                line.set_duration_from_start(later.clone());
            }
        }
        let mut earlier = Rational::zero();
        for line in &mut self.lines {
            if line.duration_from_start.is_finite() {
                earlier = line.duration_from_start.clone();
            } else {
                line.set_duration_from_start(earlier.clone());
            }
        }
    }

    fn assign_line_durations(&mut self) {
        let count = self.lines.len();
        for index in 0..count {
            let duration = if index + 1 < count {
                &self.lines[index + 1].duration_from_start - &self.lines[index].duration_from_start
            } else {
                Rational::zero()
            };
            self.lines[index].set_duration(duration);
        }
    }

    /// Barlines and the time from/to the nearest barline for every line.
    ///
    /// When data appears before the first barline the first line stands in
    /// as barline 0 (a pickup measure).
    fn analyze_meter(&mut self) {
        self.barlines.clear();
        let mut sum = Rational::zero();
        let mut found_barline = false;
        for index in 0..self.lines.len() {
            let line = &mut self.lines[index];
            line.set_duration_from_barline(sum.clone());
            sum += &line.duration;
            if line.is_barline() {
                found_barline = true;
                self.barlines.push(index);
                sum = Rational::zero();
            }
            if line.is_data() && !found_barline {
                self.barlines.push(0);
                found_barline = true;
            }
        }

        let mut sum = Rational::zero();
        for line in self.lines.iter_mut().rev() {
            sum += &line.duration;
            line.set_duration_to_barline(sum.clone());
            if line.is_barline() {
                sum = Rational::zero();
            }
        }
    }

    fn assign_non_rhythmic_durations(&mut self) {
        let ends: Vec<TokenId> = self
            .track_ends
            .iter()
            .flatten()
            .copied()
            .filter(|id| !self[*id].has_rhythm())
            .collect();
        // Terminators first, so a track that merges away is measured through
        // the merged spine when it is reachable from there.
        let (merges, terminators): (Vec<TokenId>, Vec<TokenId>) =
            ends.into_iter().partition(|id| self[*id].is_merge());
        let mut visited = HashSet::new();
        for end in terminators.into_iter().chain(merges) {
            self.walk_non_rhythmic_track(end, &mut visited);
        }
    }

    /// Walk backward from a track end; each non-null data token lasts until
    /// the next non-null data token (or the end) of its spine.
    fn walk_non_rhythmic_track(&mut self, end: TokenId, visited: &mut HashSet<TokenId>) {
        let mut pending = vec![(end, end)];
        while let Some((first, mut following)) = pending.pop() {
            let mut current = Some(first);
            while let Some(id) = current {
                if !visited.insert(id) {
                    break;
                }
                let token = &self[id];
                for previous in token.previous.iter().skip(1) {
                    pending.push((*previous, following));
                }
                let previous = token.previous_token(0);
                if token.is_non_null_data() {
                    let duration = &self.lines[following.line].duration_from_start
                        - &self.lines[id.line].duration_from_start;
                    self.lines[id.line].tokens[id.field].duration = duration;
                    following = id;
                }
                current = previous;
            }
        }
    }

    fn copy_times_to_tokens(&mut self) {
        let total = self.total_duration();
        for line in &mut self.lines {
            let start = line.duration_from_start.clone();
            let to_end = &total - &start;
            for token in &mut line.tokens {
                token.duration_from_start = start.clone();
                token.duration_to_end = to_end.clone();
            }
        }
    }

    fn total_duration(&self) -> Rational {
        self.lines
            .last()
            .map_or_else(Rational::zero, |line| line.duration_from_start.clone())
    }

    // ---- queries ----

    /// Total duration in whole notes: the start time of the last line.
    pub fn score_duration(&self) -> Result<Rational, HumdrumError> {
        self.require(Stage::RhythmAnalyzed)?;
        Ok(self.total_duration())
    }

    /// Time from the start of `line` to the end of the score.
    pub fn line_duration_to_end(&self, line: usize) -> Result<Rational, HumdrumError> {
        self.require(Stage::RhythmAnalyzed)?;
        let line = self.lines.get(line).ok_or(HumdrumError::NoSuchElement {
            what: "line",
            index: line,
        })?;
        Ok(&self.total_duration() - &line.duration_from_start)
    }

    /// Distinct positive line durations, in ascending order.
    pub fn positive_line_durations(&self) -> Result<Vec<Rational>, HumdrumError> {
        self.require(Stage::RhythmAnalyzed)?;
        let mut durations: Vec<Rational> = Vec::new();
        for line in &self.lines {
            if line.duration.is_positive() && !durations.contains(&line.duration) {
                durations.push(line.duration.clone());
            }
        }
        durations.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        Ok(durations)
    }

    /// Ticks per quarter note: the smallest number of equal subdivisions of
    /// a quarter note that expresses every line duration as an integer.
    pub fn tpq(&self) -> Result<u64, HumdrumError> {
        let quarter_scale = Rational::from_integer(4);
        let mut ticks = 1u64;
        for duration in self.positive_line_durations()? {
            let in_quarters = &duration * &quarter_scale;
            if let Some(denominator) = in_quarters.denominator() {
                ticks = lcm(ticks, denominator.unsigned_abs());
            }
        }
        Ok(ticks)
    }

    /// Number of measures; includes the pickup stand-in when present.
    pub fn barline_count(&self) -> Result<usize, HumdrumError> {
        self.require(Stage::RhythmAnalyzed)?;
        Ok(self.barlines.len())
    }

    /// The line opening measure `index` (line 0 for a pickup).
    pub fn barline(&self, index: usize) -> Result<&Line, HumdrumError> {
        self.require(Stage::RhythmAnalyzed)?;
        self.barlines
            .get(index)
            .map(|&line| &self.lines[line])
            .ok_or(HumdrumError::NoSuchElement {
                what: "barline",
                index,
            })
    }

    /// Length of measure `index`: up to the next barline, or to the end of
    /// the score for the last one.
    pub fn barline_duration(&self, index: usize) -> Result<Rational, HumdrumError> {
        let start = self.barline(index)?.duration_from_start.clone();
        let end = match self.barlines.get(index + 1) {
            Some(&next) => self.lines[next].duration_from_start.clone(),
            None => self.total_duration(),
        };
        Ok(&end - &start)
    }

    pub fn barline_duration_from_start(&self, index: usize) -> Result<Rational, HumdrumError> {
        Ok(self.barline(index)?.duration_from_start.clone())
    }

    pub fn barline_duration_to_end(&self, index: usize) -> Result<Rational, HumdrumError> {
        let start = self.barline(index)?.duration_from_start.clone();
        Ok(&self.total_duration() - &start)
    }
}
