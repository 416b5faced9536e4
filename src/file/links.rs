//! Linking tokens across consecutive spine-bearing lines.
//!
//! Global lines (comments, reference records, empty lines) are skipped, so
//! a link always joins a token to the token(s) that continue its spine on the
//! next line that has spines:
//!
//! ```text
//! *^        one token -> two          *x  *x   crossed
//! *v  *v    all tokens in the run -> one
//! *+        links to its own column; the new ** column has no previous
//! *-        no next token
//! ```
//!
//! The same pass records the previous/next non-null data tokens of every
//! token and resolves null tokens along their spine path: `.` to the data
//! token it continues, a bare `*` to the latest interpretation and a bare
//! `!` to the latest local comment.

use super::{HumdrumFile, Stage};
use crate::error::HumdrumError;
use crate::token::{Token, TokenId};

const INTERPRETATION: usize = 0;
const COMMENT: usize = 1;

/// Which non-data null resolution slot a token belongs to.
fn marker_slot(token: &Token) -> Option<usize> {
    if token.is_interpretation() {
        Some(INTERPRETATION)
    } else if token.is_comment_local() {
        Some(COMMENT)
    } else {
        None
    }
}

impl HumdrumFile {
    pub fn link_spines(&mut self) -> Result<(), HumdrumError> {
        self.begin_pass(Stage::SpinesLinked)?;
        let result = self.run_linking();
        self.finish_pass(Stage::SpinesLinked, result)
    }

    fn run_linking(&mut self) -> Result<(), HumdrumError> {
        let spine_lines: Vec<usize> = (0..self.lines.len())
            .filter(|&i| self.lines[i].has_spines())
            .collect();

        for pair in spine_lines.windows(2) {
            let links = self.stitch(pair[0], pair[1])?;
            for (from, to) in links {
                self.lines[from.line].tokens[from.field].next.push(to);
                self.lines[to.line].tokens[to.field].previous.push(from);
            }
        }

        self.link_non_null_data(&spine_lines);
        Ok(())
    }

    /// Links from the tokens on `upper` to the tokens on `lower`.
    fn stitch(&self, upper: usize, lower: usize) -> Result<Vec<(TokenId, TokenId)>, HumdrumError> {
        let above = &self.lines[upper].tokens;
        let below_count = self.lines[lower].tokens.len();
        let mut links = Vec::with_capacity(above.len() + 1);

        let mut field = 0;
        let mut target = 0;
        while field < above.len() {
            let token = &above[field];
            if token.is_split() {
                links.push((field, target));
                links.push((field, target + 1));
                target += 2;
                field += 1;
            } else if token.is_merge() {
                while field < above.len() && above[field].is_merge() {
                    links.push((field, target));
                    field += 1;
                }
                target += 1;
            } else if token.is_exchange() && field + 1 < above.len() {
                links.push((field, target + 1));
                links.push((field + 1, target));
                target += 2;
                field += 2;
            } else if token.is_terminator() {
                field += 1;
            } else if token.is_add() {
                links.push((field, target));
                target += 2;
                field += 1;
            } else {
                links.push((field, target));
                target += 1;
                field += 1;
            }
        }

        // A fully terminated line may be followed by a fresh exclusive line.
        let restarts = target == 0 && self.lines[lower].is_exclusive();
        if target != below_count && !restarts {
            return Err(HumdrumError::Spine {
                line: lower + 1,
                message: format!(
                    "line {} leaves {} spines but this line has {} fields",
                    upper + 1,
                    target,
                    below_count
                ),
            });
        }

        Ok(links
            .into_iter()
            .map(|(from, to)| (TokenId::new(upper, from), TokenId::new(lower, to)))
            .collect())
    }

    /// Previous/next non-null data links and null resolution.
    ///
    /// Lines are visited in order, so every predecessor of a token has
    /// already been processed when the token is reached.
    fn link_non_null_data(&mut self, spine_lines: &[usize]) {
        // Latest non-null data tokens reaching each token along its spine path.
        let mut latest: Vec<Vec<Vec<TokenId>>> = self
            .lines
            .iter()
            .map(|line| vec![Vec::new(); line.tokens.len()])
            .collect();
        // Latest non-null interpretation and local comment on each path.
        let mut markers: Vec<Vec<[Option<TokenId>; 2]>> = self
            .lines
            .iter()
            .map(|line| vec![[None, None]; line.tokens.len()])
            .collect();

        for &index in spine_lines {
            for field in 0..self.lines[index].tokens.len() {
                let mut incoming: Vec<TokenId> = Vec::new();
                let mut inherited: [Option<TokenId>; 2] = [None, None];
                for previous in &self.lines[index].tokens[field].previous {
                    for id in &latest[previous.line][previous.field] {
                        if !incoming.contains(id) {
                            incoming.push(*id);
                        }
                    }
                    for (slot, marker) in markers[previous.line][previous.field].iter().enumerate() {
                        if inherited[slot].is_none() {
                            inherited[slot] = *marker;
                        }
                    }
                }

                let id = TokenId::new(index, field);
                let token = &self.lines[index].tokens[field];
                if let Some(slot) = marker_slot(token) {
                    if token.is_null() {
                        self.lines[index].tokens[field].null_resolution = inherited[slot];
                    } else {
                        inherited[slot] = Some(id);
                    }
                }
                markers[index][field] = inherited;

                let token = &self.lines[index].tokens[field];
                if token.is_non_null_data() {
                    for source in &incoming {
                        let next = &mut self.lines[source.line].tokens[source.field].next_non_null;
                        if !next.contains(&id) {
                            next.push(id);
                        }
                    }
                    self.lines[index].tokens[field].previous_non_null = incoming;
                    latest[index][field] = vec![id];
                } else {
                    if token.is_null_data() {
                        self.lines[index].tokens[field].null_resolution = incoming.first().copied();
                    }
                    latest[index][field] = incoming;
                }
            }
        }
    }
}
