//! Layout parameter propagation.
//!
//! - A local comment `!NS1:NS2:k=v` applies to the next token in its spine
//!   that is neither null nor a comment.
//! - A global comment `!!NS1:NS2:k=v` applies to the next spine-bearing line
//!   that is not all-null, not a manipulator line and not a local comment
//!   line, and to every token on that line.
//!
//! Comments are applied in file order and the first value written for a
//! key wins; later duplicates are reported as warnings. The comment token
//! keeps its own parsed values as well.

use super::{HumdrumFile, Stage};
use crate::diagnostics::Diagnostic;
use crate::error::HumdrumError;
use crate::parameters::{parse_parameter_comment, ParameterComment, ParameterScope};
use crate::token::TokenId;

impl HumdrumFile {
    pub fn propagate_parameters(&mut self) -> Result<(), HumdrumError> {
        self.begin_pass(Stage::ParametersPropagated)?;
        self.propagate_local_parameters();
        self.propagate_global_parameters();
        self.finish_pass(Stage::ParametersPropagated, Ok(()))
    }

    fn propagate_local_parameters(&mut self) {
        for index in 0..self.lines.len() {
            if !self.lines[index].is_comment_local() {
                continue;
            }
            for field in 0..self.lines[index].tokens.len() {
                let comment_id = TokenId::new(index, field);
                let comment = match parse_parameter_comment(self[comment_id].text()) {
                    Some(c) if c.scope == ParameterScope::Local => c,
                    _ => continue,
                };
                self.store_on_comment(comment_id, &comment);
                match self.local_parameter_target(comment_id) {
                    Some(target) => self.apply_to_token(target, comment_id, &comment, true),
                    None => self.diagnostics.add(
                        Diagnostic::warning(
                            index + 1,
                            "orphan_parameter",
                            "local parameter comment has no following token in its spine",
                        )
                        .with_field(field),
                    ),
                }
            }
        }
    }

    /// Next token along the primary path that is not null and not a comment.
    fn local_parameter_target(&self, comment: TokenId) -> Option<TokenId> {
        let mut current = self[comment].next_token(0);
        while let Some(id) = current {
            let token = &self[id];
            if !token.is_null() && !token.is_comment() {
                return Some(id);
            }
            current = token.next_token(0);
        }
        None
    }

    fn propagate_global_parameters(&mut self) {
        let mut pending: Vec<(TokenId, ParameterComment)> = Vec::new();
        for index in 0..self.lines.len() {
            let line = &self.lines[index];
            if line.is_comment_global() {
                if let Some(comment) = line
                    .tokens
                    .first()
                    .and_then(|t| parse_parameter_comment(t.text()))
                    .filter(|c| c.scope == ParameterScope::Global)
                {
                    let comment_id = TokenId::new(index, 0);
                    self.store_on_comment(comment_id, &comment);
                    pending.push((comment_id, comment));
                }
                continue;
            }
            if !line.has_spines()
                || line.is_all_null()
                || line.is_manipulator()
                || line.is_comment_local()
            {
                continue;
            }
            for (comment_id, comment) in pending.drain(..) {
                self.apply_to_line(index, comment_id, &comment);
            }
        }
        for (comment_id, _) in pending {
            self.diagnostics.warn(
                comment_id.line + 1,
                "orphan_parameter",
                "global parameter comment has no following line to apply to",
            );
        }
    }

    fn store_on_comment(&mut self, comment_id: TokenId, comment: &ParameterComment) {
        let store = &mut self.lines[comment_id.line].tokens[comment_id.field].parameters;
        for (key, value) in &comment.entries {
            store.set_with_origin(&comment.ns1, &comment.ns2, key, value, Some(comment_id));
        }
        for key in &comment.repeated_keys {
            self.report_duplicate(comment_id, comment, key);
        }
    }

    fn apply_to_token(
        &mut self,
        target: TokenId,
        comment_id: TokenId,
        comment: &ParameterComment,
        warn_duplicates: bool,
    ) {
        let mut duplicates = Vec::new();
        {
            let token = &mut self.lines[target.line].tokens[target.field];
            for (key, value) in &comment.entries {
                if !token.parameters.insert_if_absent(
                    &comment.ns1,
                    &comment.ns2,
                    key,
                    value,
                    Some(comment_id),
                ) {
                    duplicates.push(key.clone());
                }
            }
            if !token.linked_parameters.contains(&comment_id) {
                token.linked_parameters.push(comment_id);
            }
        }
        if warn_duplicates {
            for key in duplicates {
                self.report_duplicate(comment_id, comment, &key);
            }
        }
    }

    fn apply_to_line(&mut self, index: usize, comment_id: TokenId, comment: &ParameterComment) {
        let mut duplicates = Vec::new();
        for (key, value) in &comment.entries {
            if !self.lines[index].parameters.insert_if_absent(
                &comment.ns1,
                &comment.ns2,
                key,
                value,
                Some(comment_id),
            ) {
                duplicates.push(key.clone());
            }
        }
        for field in 0..self.lines[index].tokens.len() {
            self.apply_to_token(TokenId::new(index, field), comment_id, comment, false);
        }
        for key in duplicates {
            self.report_duplicate(comment_id, comment, &key);
        }
    }

    fn report_duplicate(&mut self, comment_id: TokenId, comment: &ParameterComment, key: &str) {
        self.diagnostics.add(
            Diagnostic::warning(
                comment_id.line + 1,
                "duplicate_parameter",
                format!(
                    "parameter {}:{}:{} is already set; keeping the earlier value",
                    comment.ns1, comment.ns2, key
                ),
            )
            .with_field(comment_id.field),
        );
    }
}
