//! Strophes.
//!
//! Two kinds of markup are read:
//!
//! - `*strophe` ... `*Xstrophe` (or `*S-`) pairs in the same spine give the
//!   strophe intervals. A second `*strophe` before the close ends the open
//!   interval there and starts a new one. A close with nothing open and an
//!   open left at the end of the file are reported as warnings and
//!   otherwise ignored.
//! - `*S/name` labels at the head of a strand (before any data) mark the
//!   token that opens a strophe; every following token along the spine
//!   belongs to it until `*Xstrophe`, `*S-` or a token that already has a
//!   strophe. When two sub-spines of a track carry labels side by side,
//!   the left one is taken first.
//!
//! Tokens inside a marker interval that no `*S/` label claimed belong to the
//! interval's opening `*strophe` token.

use std::collections::BTreeMap;

use super::{HumdrumFile, Interval, Stage};
use crate::diagnostics::Diagnostic;
use crate::error::HumdrumError;
use crate::token::TokenId;

impl HumdrumFile {
    pub fn analyze_strophes(&mut self) -> Result<(), HumdrumError> {
        self.begin_pass(Stage::StrophesAnalyzed)?;
        self.pair_strophe_markers();
        self.assign_token_strophes();
        self.finish_pass(Stage::StrophesAnalyzed, Ok(()))
    }

    fn pair_strophe_markers(&mut self) {
        let mut by_spine: Vec<Vec<Interval>> = vec![Vec::new(); self.track_starts.len()];
        let mut flat = Vec::new();
        let mut open: BTreeMap<String, TokenId> = BTreeMap::new();
        let mut warnings = Vec::new();

        for line in self.lines.iter().filter(|l| l.is_interpretation()) {
            for token in &line.tokens {
                let is_open = token.text() == "*strophe";
                let is_close = token.text() == "*Xstrophe" || token.text() == "*S-";
                if !is_open && !is_close {
                    continue;
                }
                let id = token.id();
                let previous = if is_open {
                    open.insert(token.spine_info().to_string(), id)
                } else {
                    open.remove(token.spine_info())
                };
                match previous {
                    Some(first) => {
                        let interval = Interval { first, last: id };
                        if let Some(spine) = token.track().checked_sub(1) {
                            by_spine[spine].push(interval);
                        }
                        flat.push(interval);
                    }
                    None if is_close => warnings.push(
                        Diagnostic::warning(
                            id.line + 1,
                            "unmatched_strophe_end",
                            format!("'{}' closes no open strophe", token.text()),
                        )
                        .with_field(id.field),
                    ),
                    None => {}
                }
            }
        }

        for first in open.into_values() {
            warnings.push(
                Diagnostic::warning(
                    first.line + 1,
                    "unterminated_strophe",
                    "'*strophe' is never closed",
                )
                .with_field(first.field),
            );
        }
        for warning in warnings {
            self.diagnostics.add(warning);
        }

        self.strophes_by_spine = by_spine;
        self.strophes = flat;
    }

    fn assign_token_strophes(&mut self) {
        let starts = self.strophe_labels();
        for start in starts {
            if self[start].has_strophe() {
                continue;
            }
            self.claim_strophe(start, start, None);
        }
        for interval in self.strophes.clone() {
            self.claim_strophe(interval.first, interval.first, Some(interval.last));
        }
        log::debug!("found {} strophe intervals", self.strophes.len());
    }

    /// `*S/` labels found at strand heads, in strand order.
    fn strophe_labels(&self) -> Vec<TokenId> {
        let mut starts: Vec<TokenId> = Vec::new();
        for strand in &self.strands {
            let mut current = Some(strand.first);
            while let Some(id) = current {
                if id == strand.last {
                    break;
                }
                let token = &self[id];
                if !token.is_interpretation() {
                    break;
                }
                if token.is_strophe_label() {
                    if let Some(left) = self.previous_field(id) {
                        if left.track() == token.track()
                            && left.is_strophe_label()
                            && !starts.contains(&left.id())
                        {
                            starts.push(left.id());
                        }
                    }
                    if !starts.contains(&id) {
                        starts.push(id);
                    }
                    break;
                }
                current = token.next_token(0);
            }
        }
        starts
    }

    /// Mark tokens from `first` along the primary path as belonging to the
    /// strophe opened by `owner`, stopping at a close marker, at `until`
    /// (exclusive) or at a token that already has a strophe.
    fn claim_strophe(&mut self, owner: TokenId, first: TokenId, until: Option<TokenId>) {
        let mut current = Some(first);
        while let Some(id) = current {
            if Some(id) == until {
                break;
            }
            let token = &self[id];
            if token.has_strophe() {
                break;
            }
            if id != owner && (token.text() == "*Xstrophe" || token.text() == "*S-") {
                break;
            }
            let next = token.next_token(0);
            self.lines[id.line].tokens[id.field].strophe = Some(owner);
            current = next;
        }
    }

    pub fn strophe_count(&self) -> Result<usize, HumdrumError> {
        self.require(Stage::StrophesAnalyzed)?;
        Ok(self.strophes.len())
    }

    pub fn strophe(&self, index: usize) -> Result<Interval, HumdrumError> {
        self.require(Stage::StrophesAnalyzed)?;
        self.strophes
            .get(index)
            .copied()
            .ok_or(HumdrumError::NoSuchElement {
                what: "strophe",
                index,
            })
    }

    pub fn strophe_count_for_spine(&self, spine: usize) -> Result<usize, HumdrumError> {
        Ok(self.spine_strophes(spine)?.len())
    }

    pub fn strophe_for_spine(&self, spine: usize, index: usize) -> Result<Interval, HumdrumError> {
        self.spine_strophes(spine)?
            .get(index)
            .copied()
            .ok_or(HumdrumError::NoSuchElement {
                what: "strophe",
                index,
            })
    }

    fn spine_strophes(&self, spine: usize) -> Result<&[Interval], HumdrumError> {
        self.require(Stage::StrophesAnalyzed)?;
        self.strophes_by_spine
            .get(spine)
            .map(Vec::as_slice)
            .ok_or(HumdrumError::NoSuchElement {
                what: "spine",
                index: spine,
            })
    }
}
