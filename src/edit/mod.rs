//! Interactive editing of one token part at a time.
//!
//! [`EditMachine`] is a plain value. Every command consumes it and returns a
//! [`Transition`] holding the next machine and, when the query text changed,
//! the new [`ParseResult`]. Commits never patch tokens in place: the edited
//! part is spliced into the full query string and the whole string is parsed
//! again, so the result always covers its source exactly.
//!
//! At most one token is being edited at a time. Starting an edit on another
//! token first commits the current one if its buffer changed, or discards it.

pub mod session;
pub mod splice;

use serde::Serialize;
use tracing::{debug, trace};

use crate::cursor::word_at_cursor;
use crate::identity::TokenKey;
use crate::operators::Operator;
use crate::syntax::token::{Span, TokenPart};
use crate::syntax::value::quote_if_needed;
use crate::syntax::{ParseResult, QueryParser};

pub use session::EditSession;
use splice::{remove_with_separator, rewrite_operator, splice};

/// Edit in progress on one part of one token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveEdit {
    pub token_key: TokenKey,
    pub part: TokenPart,
    /// Span of the part in `source`.
    pub span: Span,
    /// Query the edit started from.
    pub source: String,
    /// Literal text of the part when the edit started.
    pub original: String,
    pub buffer: String,
}

impl ActiveEdit {
    pub fn is_changed(&self) -> bool {
        self.buffer != self.original
    }

    /// The full query with the buffer in place of the part.
    pub fn spliced(&self) -> String {
        splice(&self.source, self.span, &self.buffer)
    }

    /// Word of the buffer under `cursor`, used to filter suggestions.
    pub fn suggestion_query(&self, cursor: usize) -> &str {
        word_at_cursor(&self.buffer, cursor)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "edit", rename_all = "camelCase")]
pub enum EditState {
    #[default]
    Viewing,
    Editing(ActiveEdit),
    /// Focus left the part; the edit is waiting to be committed or discarded.
    Exiting(ActiveEdit),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditMachine {
    state: EditState,
}

/// Outcome of an edit command.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub machine: EditMachine,
    /// New parse when the command changed the query text.
    pub result: Option<ParseResult>,
}

impl Transition {
    fn unchanged(machine: EditMachine) -> Self {
        Self {
            machine,
            result: None,
        }
    }

    fn viewing(result: Option<ParseResult>) -> Self {
        Self {
            machine: EditMachine::default(),
            result,
        }
    }
}

impl EditMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn active(&self) -> Option<&ActiveEdit> {
        match &self.state {
            EditState::Editing(edit) | EditState::Exiting(edit) => Some(edit),
            EditState::Viewing => None,
        }
    }

    pub fn is_editing(&self) -> bool {
        matches!(self.state, EditState::Editing(_))
    }

    /// Starts editing `part` of the token `key` in `query`.
    ///
    /// Unknown keys, and tokens without that part, leave the machine as it
    /// was. A different token being edited is settled first and `key` is
    /// looked up again in the parse that produced.
    pub fn begin_edit(
        self,
        parser: &QueryParser,
        query: &ParseResult,
        key: TokenKey,
        part: TokenPart,
    ) -> Transition {
        let target_exists = query
            .find(&key)
            .and_then(|token| token.part_span(part))
            .is_some();
        if !target_exists {
            trace!("begin_edit: {key} has no {part} part");
            return Transition::unchanged(self);
        }

        let same_target = self
            .active()
            .is_some_and(|edit| edit.token_key == key && edit.part == part);
        if same_target {
            // refocusing an exiting part resumes it with its buffer intact
            return match self.state {
                EditState::Exiting(edit) => {
                    trace!("resuming edit of {key} {part}");
                    Transition::unchanged(EditMachine {
                        state: EditState::Editing(edit),
                    })
                }
                state => Transition::unchanged(EditMachine { state }),
            };
        }

        let settled = self.settle(parser).result;
        let current = settled.as_ref().unwrap_or(query);

        let Some(span) = current.find(&key).and_then(|token| token.part_span(part)) else {
            debug!("begin_edit: {key} disappeared after settling the previous edit");
            return Transition::viewing(settled);
        };

        let original = span.slice(&current.source).to_string();
        debug!("editing {key} {part}: {original:?}");
        let edit = ActiveEdit {
            token_key: key,
            part,
            span,
            source: current.source.clone(),
            buffer: original.clone(),
            original,
        };

        Transition {
            machine: EditMachine {
                state: EditState::Editing(edit),
            },
            result: settled,
        }
    }

    /// Replaces the pending buffer. Nothing is parsed.
    pub fn update_buffer(mut self, text: impl Into<String>) -> Transition {
        if let EditState::Editing(edit) = &mut self.state {
            edit.buffer = text.into();
        }
        Transition::unchanged(self)
    }

    /// Splices the buffer into the query and re-parses it. An unchanged
    /// buffer returns to viewing without a new parse.
    pub fn commit(self, parser: &QueryParser) -> Transition {
        match self.state {
            EditState::Editing(edit) | EditState::Exiting(edit) => {
                if !edit.is_changed() {
                    return Transition::viewing(None);
                }
                let query = edit.spliced();
                debug!("committing {} {}: {:?}", edit.token_key, edit.part, query);
                Transition::viewing(Some(parser.parse(&query)))
            }
            EditState::Viewing => Transition::viewing(None),
        }
    }

    pub fn discard(self) -> Transition {
        if let Some(edit) = self.active() {
            trace!("discarding edit of {}", edit.token_key);
        }
        Transition::viewing(None)
    }

    /// Focus left the part being edited.
    pub fn blur(self) -> Transition {
        match self.state {
            EditState::Editing(edit) => Transition::unchanged(EditMachine {
                state: EditState::Exiting(edit),
            }),
            state => Transition::unchanged(EditMachine { state }),
        }
    }

    /// Commits an exiting edit when its buffer changed, discards it otherwise.
    pub fn resolve_exit(self, parser: &QueryParser) -> Transition {
        if matches!(self.state, EditState::Exiting(_)) {
            self.settle(parser)
        } else {
            Transition::unchanged(self)
        }
    }

    /// Takes a suggested text for the part being edited and commits it.
    ///
    /// Values are quoted when needed. For the operator part, a label such as
    /// `>=` or `is not` is turned into its query literal, including the `!`
    /// prefix that spells `is not`.
    pub fn select_suggestion(self, parser: &QueryParser, text: &str) -> Transition {
        let Some(edit) = self.active().cloned() else {
            return Transition::unchanged(self);
        };

        if edit.part == TokenPart::Operator {
            if let Some(operator) = Operator::from_label(text) {
                let source = &edit.source;
                let rewritten = parser
                    .parse(source)
                    .find(&edit.token_key)
                    .and_then(|token| rewrite_operator(source, token, operator));
                return match rewritten {
                    Some(query) if query != *source => Transition::viewing(Some(parser.parse(&query))),
                    _ => Transition::viewing(None),
                };
            }
        }

        let buffer = match edit.part {
            TokenPart::Value => quote_if_needed(text).into_owned(),
            _ => text.to_string(),
        };
        let mut machine = self;
        if let EditState::Editing(edit) | EditState::Exiting(edit) = &mut machine.state {
            edit.buffer = buffer;
        }
        machine.commit(parser)
    }

    /// Removes the token `key` and one adjacent whitespace separator.
    ///
    /// Deleting the token being edited drops its pending edit. Any other
    /// pending edit is settled first.
    pub fn delete_token(self, parser: &QueryParser, query: &ParseResult, key: TokenKey) -> Transition {
        if query.find(&key).is_none() {
            return Transition::unchanged(self);
        }

        let editing_other = self.active().is_some_and(|edit| edit.token_key != key);
        let settled = if editing_other {
            self.settle(parser).result
        } else {
            None
        };
        let current = settled.as_ref().unwrap_or(query);

        let Some(token) = current.find(&key) else {
            return Transition::viewing(settled);
        };
        let remaining = remove_with_separator(&current.source, token.span());
        debug!("deleted {key}: {remaining:?}");
        Transition::viewing(Some(parser.parse(&remaining)))
    }

    /// Commits a changed buffer or discards an unchanged one.
    fn settle(self, parser: &QueryParser) -> Transition {
        if self.active().is_some_and(ActiveEdit::is_changed) {
            self.commit(parser)
        } else {
            self.discard()
        }
    }
}
