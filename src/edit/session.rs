//! Mutable wrapper around the edit machine.
//!
//! [`EditSession`] owns the parser, the current parse and the machine, and
//! applies each [`Transition`] to itself. Callers that keep their own state
//! can use [`EditMachine`] directly instead.

use super::{EditMachine, EditState, Transition};
use crate::identity::TokenKey;
use crate::syntax::token::TokenPart;
use crate::syntax::{ParseResult, QueryParser};

#[derive(Debug, Clone)]
pub struct EditSession {
    parser: QueryParser,
    query: ParseResult,
    machine: EditMachine,
}

impl EditSession {
    pub fn new(parser: QueryParser, input: &str) -> Self {
        let query = parser.parse(input);
        Self {
            parser,
            query,
            machine: EditMachine::new(),
        }
    }

    pub fn query(&self) -> &ParseResult {
        &self.query
    }

    pub fn source(&self) -> &str {
        &self.query.source
    }

    pub fn state(&self) -> &EditState {
        self.machine.state()
    }

    pub fn parser(&self) -> &QueryParser {
        &self.parser
    }

    /// Replaces the whole query, dropping any pending edit.
    pub fn set_query(&mut self, input: &str) {
        self.machine = EditMachine::new();
        self.query = self.parser.parse(input);
    }

    /// Returns `true` when an edit on `key`/`part` is active afterwards.
    pub fn begin_edit(&mut self, key: TokenKey, part: TokenPart) -> bool {
        let machine = std::mem::take(&mut self.machine);
        let transition = machine.begin_edit(&self.parser, &self.query, key, part);
        self.apply(transition);
        self.machine
            .active()
            .is_some_and(|edit| edit.token_key == key && edit.part == part)
    }

    pub fn update_buffer(&mut self, text: impl Into<String>) {
        let machine = std::mem::take(&mut self.machine);
        self.apply(machine.update_buffer(text));
    }

    /// Returns `true` when the query text changed.
    pub fn commit(&mut self) -> bool {
        let machine = std::mem::take(&mut self.machine);
        let transition = machine.commit(&self.parser);
        self.apply(transition)
    }

    pub fn discard(&mut self) {
        let machine = std::mem::take(&mut self.machine);
        self.apply(machine.discard());
    }

    pub fn blur(&mut self) {
        let machine = std::mem::take(&mut self.machine);
        self.apply(machine.blur());
    }

    pub fn resolve_exit(&mut self) -> bool {
        let machine = std::mem::take(&mut self.machine);
        let transition = machine.resolve_exit(&self.parser);
        self.apply(transition)
    }

    pub fn select_suggestion(&mut self, text: &str) -> bool {
        let machine = std::mem::take(&mut self.machine);
        let transition = machine.select_suggestion(&self.parser, text);
        self.apply(transition)
    }

    pub fn delete_token(&mut self, key: TokenKey) -> bool {
        let machine = std::mem::take(&mut self.machine);
        let transition = machine.delete_token(&self.parser, &self.query, key);
        self.apply(transition)
    }

    fn apply(&mut self, transition: Transition) -> bool {
        self.machine = transition.machine;
        match transition.result {
            Some(result) => {
                self.query = result;
                true
            }
            None => false,
        }
    }
}
