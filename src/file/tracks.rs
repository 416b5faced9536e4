//! Spine info and track assignment.
//!
//! Walks the spine-bearing lines in order, keeping the list of active spines
//! and rewriting it at every manipulator line:
//!
//! ```text
//! **kern  **kern      1        2
//! *^      *           (1)a (1)b 2
//! *v      *v  *       1        2
//! *+      *           1   3?   2      (new column must be ** on the next line)
//! *-      **text  *   ...
//! ```
//!
//! The track of a token is the first integer in its spine info.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::HumdrumFile;
use crate::error::HumdrumError;
use crate::token::{Token, TokenId};

#[derive(Clone, Debug)]
struct ActiveSpine {
    info: String,
    data_type: Arc<str>,
    /// Opened by `*+`; the next line must put an exclusive interpretation here.
    awaiting_exclusive: bool,
}

impl HumdrumFile {
    /// Assign spine info, track and subtrack numbers to every token, and
    /// record where each track starts and ends.
    pub fn assign_tracks(&mut self) -> Result<(), HumdrumError> {
        self.begin_pass(super::Stage::TracksAssigned)?;
        let result = self.run_track_assignment();
        self.finish_pass(super::Stage::TracksAssigned, result)
    }

    fn run_track_assignment(&mut self) -> Result<(), HumdrumError> {
        let mut active: Vec<ActiveSpine> = Vec::new();
        let mut started = false;
        let mut last_spine_line = None;

        for index in 0..self.lines.len() {
            if !self.lines[index].has_spines() {
                continue;
            }
            let line_number = index + 1;

            if active.is_empty() {
                if !self.lines[index].tokens.iter().all(|t| t.is_exclusive_interpretation()) {
                    let message = if started {
                        "data found after all spines were terminated"
                    } else {
                        "data found before the first exclusive interpretation"
                    };
                    return Err(HumdrumError::Spine {
                        line: line_number,
                        message: message.to_string(),
                    });
                }
                active = self.lines[index]
                    .tokens
                    .iter()
                    .map(|_| ActiveSpine {
                        info: String::new(),
                        data_type: Arc::from(""),
                        awaiting_exclusive: true,
                    })
                    .collect();
                started = true;
            }

            let field_count = self.lines[index].tokens.len();
            if field_count != active.len() {
                return Err(HumdrumError::Spine {
                    line: line_number,
                    message: format!(
                        "expected {} fields but found {}",
                        active.len(),
                        field_count
                    ),
                });
            }

            self.open_exclusive_spines(index, &mut active)?;
            self.assign_line_addresses(index, &active);

            if self.lines[index].is_manipulator() {
                let next = self.apply_manipulators(index, &active)?;
                self.register_merged_ends(index, &next);
                active = next;
            }
            last_spine_line = Some(index);
        }

        if let Some(pending) = active.iter().position(|s| s.awaiting_exclusive) {
            return Err(HumdrumError::Spine {
                line: last_spine_line.map_or(0, |i| i + 1),
                message: format!(
                    "spine added in field {} is never given an exclusive interpretation",
                    pending + 1
                ),
            });
        }

        if !active.is_empty() {
            if let Some(last) = last_spine_line {
                self.register_unterminated_ends(last);
            }
        }

        log::debug!(
            "assigned {} tracks over {} lines",
            self.track_starts.len(),
            self.lines.len()
        );
        Ok(())
    }

    /// Give new spines (fresh exclusive line or `*+` slots) their track
    /// number and data type, and reject `**` tokens with no slot prepared.
    fn open_exclusive_spines(
        &mut self,
        index: usize,
        active: &mut [ActiveSpine],
    ) -> Result<(), HumdrumError> {
        for (field, spine) in active.iter_mut().enumerate() {
            let token = &self.lines[index].tokens[field];
            let is_exclusive = token.is_exclusive_interpretation();
            if spine.awaiting_exclusive {
                if !is_exclusive {
                    return Err(HumdrumError::Spine {
                        line: index + 1,
                        message: format!(
                            "expected an exclusive interpretation in field {} after '*+', found '{}'",
                            field + 1,
                            token.text()
                        ),
                    });
                }
                let track = self.track_starts.len() + 1;
                spine.info = track.to_string();
                spine.data_type = Arc::from(token.text());
                spine.awaiting_exclusive = false;
                self.track_starts.push(TokenId::new(index, field));
                self.track_ends.push(Vec::new());
            } else if is_exclusive {
                return Err(HumdrumError::Spine {
                    line: index + 1,
                    message: format!(
                        "exclusive interpretation '{}' in field {} with no spine prepared by '*+'",
                        token.text(),
                        field + 1
                    ),
                });
            }
        }
        Ok(())
    }

    fn assign_line_addresses(&mut self, index: usize, active: &[ActiveSpine]) {
        let mut per_track: HashMap<usize, usize> = HashMap::new();
        let tracks: Vec<usize> = active.iter().map(|s| track_of(&s.info)).collect();
        for track in &tracks {
            *per_track.entry(*track).or_default() += 1;
        }

        let mut seen: HashMap<usize, usize> = HashMap::new();
        for (field, spine) in active.iter().enumerate() {
            let track = tracks[field];
            let count = per_track.get(&track).copied().unwrap_or(1);
            let subtrack = if count > 1 {
                let n = seen.entry(track).or_default();
                *n += 1;
                *n
            } else {
                0
            };
            let rhythmic = self.options.is_rhythmic(&spine.data_type);
            let token = &mut self.lines[index].tokens[field];
            token.address.spine_info = spine.info.clone();
            token.address.track = track;
            token.address.subtrack = subtrack;
            token.address.subtrack_count = if count > 1 { count } else { 0 };
            token.data_type = spine.data_type.clone();
            token.rhythmic = rhythmic;
            if token.is_terminator() && track > 0 {
                let id = token.id();
                self.track_ends[track - 1].push(id);
            }
        }
    }

    /// The active spines after a manipulator line.
    fn apply_manipulators(
        &self,
        index: usize,
        active: &[ActiveSpine],
    ) -> Result<Vec<ActiveSpine>, HumdrumError> {
        let tokens = &self.lines[index].tokens;
        let mut next = Vec::with_capacity(active.len() + 1);
        let mut field = 0;
        while field < tokens.len() {
            let token = &tokens[field];
            let spine = &active[field];
            if token.is_split() {
                next.push(ActiveSpine {
                    info: format!("({})a", spine.info),
                    ..spine.clone()
                });
                next.push(ActiveSpine {
                    info: format!("({})b", spine.info),
                    ..spine.clone()
                });
                field += 1;
            } else if token.is_merge() {
                let end = (field..tokens.len())
                    .find(|&f| !tokens[f].is_merge())
                    .unwrap_or(tokens.len());
                if end - field < 2 {
                    return Err(HumdrumError::Spine {
                        line: index + 1,
                        message: format!("merge '*v' in field {} has no adjacent partner", field + 1),
                    });
                }
                let infos: Vec<&str> = active[field..end].iter().map(|s| s.info.as_str()).collect();
                next.push(ActiveSpine {
                    info: merged_spine_info(&infos),
                    ..spine.clone()
                });
                field = end;
            } else if token.is_exchange() {
                let paired = tokens.get(field + 1).map_or(false, |t| t.is_exchange());
                if !paired {
                    return Err(HumdrumError::Spine {
                        line: index + 1,
                        message: format!(
                            "exchange '*x' in field {} has no adjacent partner",
                            field + 1
                        ),
                    });
                }
                next.push(active[field + 1].clone());
                next.push(spine.clone());
                field += 2;
            } else if token.is_terminator() {
                field += 1;
            } else if token.is_add() {
                next.push(spine.clone());
                next.push(ActiveSpine {
                    info: String::new(),
                    data_type: Arc::from(""),
                    awaiting_exclusive: true,
                });
                field += 1;
            } else {
                next.push(spine.clone());
                field += 1;
            }
        }
        Ok(next)
    }

    /// A track whose last spine merges into another track ends on its `*v`.
    fn register_merged_ends(&mut self, index: usize, next: &[ActiveSpine]) {
        let remaining: HashSet<usize> = next.iter().map(|s| track_of(&s.info)).collect();
        let ids: Vec<TokenId> = self.lines[index]
            .tokens
            .iter()
            .filter(|t| t.is_merge() && t.track() > 0 && !remaining.contains(&t.track()))
            .map(Token::id)
            .collect();
        for id in ids {
            let track = self[id].track();
            self.track_ends[track - 1].push(id);
        }
    }

    /// Spines still open at the end of the file end on their last token.
    fn register_unterminated_ends(&mut self, last: usize) {
        let mut ids = Vec::new();
        for token in &self.lines[last].tokens {
            if !token.is_terminator() && token.track() > 0 {
                ids.push((token.track(), token.id()));
            }
        }
        for (track, id) in ids {
            self.track_ends[track - 1].push(id);
            self.diagnostics.add(
                crate::diagnostics::Diagnostic::warning(
                    last + 1,
                    "unterminated_spine",
                    format!("spine of track {} is not terminated with '*-'", track),
                )
                .with_field(id.field),
            );
        }
    }

    /// Number of tracks (spines opened by exclusive interpretations).
    pub fn max_track(&self) -> usize {
        self.track_starts.len()
    }

    /// Exclusive-interpretation token that opened `track` (1-based).
    pub fn track_start(&self, track: usize) -> Result<TokenId, HumdrumError> {
        self.require(super::Stage::TracksAssigned)?;
        track
            .checked_sub(1)
            .and_then(|i| self.track_starts.get(i))
            .copied()
            .ok_or(HumdrumError::NoSuchElement {
                what: "track",
                index: track,
            })
    }

    /// Every track start, in track order. Spine `i` is track `i + 1`.
    pub fn spine_starts(&self) -> Result<&[TokenId], HumdrumError> {
        self.require(super::Stage::TracksAssigned)?;
        Ok(&self.track_starts)
    }

    pub fn track_end_count(&self, track: usize) -> Result<usize, HumdrumError> {
        Ok(self.track_ends_of(track)?.len())
    }

    pub fn track_end(&self, track: usize, index: usize) -> Result<TokenId, HumdrumError> {
        self.track_ends_of(track)?
            .get(index)
            .copied()
            .ok_or(HumdrumError::NoSuchElement {
                what: "track end",
                index,
            })
    }

    /// Terminator tokens of `track`, or the `*v` where it merges into another
    /// track, or its final tokens if it never terminates.
    pub fn track_ends_of(&self, track: usize) -> Result<&[TokenId], HumdrumError> {
        self.require(super::Stage::TracksAssigned)?;
        track
            .checked_sub(1)
            .and_then(|i| self.track_ends.get(i))
            .map(Vec::as_slice)
            .ok_or(HumdrumError::NoSuchElement {
                what: "track",
                index: track,
            })
    }
}

/// First integer appearing in a spine info string, or 0.
pub(crate) fn track_of(info: &str) -> usize {
    let digits: String = info
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

/// Spine info after merging adjacent spines: sibling sub-spines `(X)a (X)b`
/// collapse back to `X`, anything else is joined with spaces.
pub(crate) fn merged_spine_info(infos: &[&str]) -> String {
    let mut parts: Vec<String> = infos.iter().map(|s| s.to_string()).collect();
    loop {
        let sibling = (0..parts.len().saturating_sub(1))
            .find_map(|i| collapse_siblings(&parts[i], &parts[i + 1]).map(|inner| (i, inner)));
        match sibling {
            Some((i, inner)) => {
                parts[i] = inner;
                parts.remove(i + 1);
            }
            None => break,
        }
    }
    parts.join(" ")
}

fn collapse_siblings(left: &str, right: &str) -> Option<String> {
    let left_inner = left.strip_prefix('(')?.strip_suffix(")a")?;
    let right_inner = right.strip_prefix('(')?.strip_suffix(")b")?;
    if left_inner == right_inner {
        Some(left_inner.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_of() {
        assert_eq!(track_of("3"), 3);
        assert_eq!(track_of("((12)a)b"), 12);
        assert_eq!(track_of("(1)a 2"), 1);
        assert_eq!(track_of(""), 0);
    }

    #[test]
    fn test_merge_siblings() {
        assert_eq!(merged_spine_info(&["(1)a", "(1)b"]), "1");
        assert_eq!(merged_spine_info(&["((1)a)a", "((1)a)b", "(1)b"]), "1");
        assert_eq!(merged_spine_info(&["(1)b", "2"]), "(1)b 2");
        assert_eq!(merged_spine_info(&["(1)a", "(2)b"]), "(1)a (2)b");
    }
}
