//! Strands: runs of linked tokens in one spine with no split or merge
//! inside them.
//!
//! A strand starts at a spine start or at the second branch of a split and
//! follows the primary `next` link until it reaches a terminator, the end of
//! its spine, or a merge that it does not continue through. In a run of
//! merges the leftmost spine continues and every other spine ends its
//! strand on its `*v`.
//!
//! Spine `i` (0-based) holds the strands of track `i + 1`, sorted by start
//! line. The flattened list concatenates them in spine order, and every
//! token records its index in that list.

use super::{HumdrumFile, Interval, Stage};
use crate::error::HumdrumError;
use crate::token::TokenId;

impl HumdrumFile {
    pub fn analyze_strands(&mut self) -> Result<(), HumdrumError> {
        self.begin_pass(Stage::StrandsAnalyzed)?;
        self.run_strand_analysis();
        self.finish_pass(Stage::StrandsAnalyzed, Ok(()))
    }

    fn run_strand_analysis(&mut self) {
        let mut by_spine = Vec::with_capacity(self.track_starts.len());
        for start in self.track_starts.clone() {
            let mut strands = Vec::new();
            let mut pending = vec![start];
            while let Some(first) = pending.pop() {
                strands.push(self.trace_strand(first, &mut pending));
            }
            strands.sort_by_key(|s: &Interval| (s.first.line, s.first.field));
            by_spine.push(strands);
        }

        self.strands = by_spine.iter().flatten().copied().collect();
        self.strands_by_spine = by_spine;

        for index in 0..self.strands.len() {
            for id in self.walk_interval(self.strands[index]) {
                self.lines[id.line].tokens[id.field].strand = Some(index);
            }
        }
        log::debug!("found {} strands", self.strands.len());
    }

    /// Follow a strand from `first`, queueing the second branch of every split.
    fn trace_strand(&self, first: TokenId, pending: &mut Vec<TokenId>) -> Interval {
        let mut current = first;
        loop {
            let token = &self[current];
            pending.extend(token.next.iter().skip(1).copied());
            if token.is_terminator() || self.ends_at_merge(current) {
                break;
            }
            match token.next_token(0) {
                Some(next) => current = next,
                None => break,
            }
        }
        Interval {
            first,
            last: current,
        }
    }

    /// A `*v` whose left neighbour is also `*v` hands its spine to the left.
    fn ends_at_merge(&self, id: TokenId) -> bool {
        self[id].is_merge() && self.previous_field(id).map_or(false, |t| t.is_merge())
    }

    /// Tokens from `interval.first` to `interval.last` along the primary path.
    pub(crate) fn walk_interval(&self, interval: Interval) -> Vec<TokenId> {
        let mut ids = Vec::new();
        let mut current = Some(interval.first);
        while let Some(id) = current {
            ids.push(id);
            if id == interval.last {
                break;
            }
            current = self[id].next_token(0);
        }
        ids
    }

    pub fn strand_count(&self) -> Result<usize, HumdrumError> {
        self.require(Stage::StrandsAnalyzed)?;
        Ok(self.strands.len())
    }

    pub fn strand(&self, index: usize) -> Result<Interval, HumdrumError> {
        self.require(Stage::StrandsAnalyzed)?;
        self.strands
            .get(index)
            .copied()
            .ok_or(HumdrumError::NoSuchElement {
                what: "strand",
                index,
            })
    }

    pub fn strand_count_for_spine(&self, spine: usize) -> Result<usize, HumdrumError> {
        Ok(self.spine_strands(spine)?.len())
    }

    pub fn strand_for_spine(&self, spine: usize, index: usize) -> Result<Interval, HumdrumError> {
        self.spine_strands(spine)?
            .get(index)
            .copied()
            .ok_or(HumdrumError::NoSuchElement {
                what: "strand",
                index,
            })
    }

    /// Every token of strand `index`, in order.
    pub fn strand_tokens(&self, index: usize) -> Result<Vec<TokenId>, HumdrumError> {
        Ok(self.walk_interval(self.strand(index)?))
    }

    fn spine_strands(&self, spine: usize) -> Result<&[Interval], HumdrumError> {
        self.require(Stage::StrandsAnalyzed)?;
        self.strands_by_spine
            .get(spine)
            .map(Vec::as_slice)
            .ok_or(HumdrumError::NoSuchElement {
                what: "spine",
                index: spine,
            })
    }
}
