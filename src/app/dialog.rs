//! State of the remote search dialog.

use crate::library::Track;

#[derive(Debug, Clone, Default)]
pub struct SearchDialog {
    pub query: String,
    /// Keystrokes go to the query while editing, to the result list otherwise.
    pub editing: bool,
    pub results: Vec<Track>,
    pub selected: usize,
    /// Generation of the request this dialog is waiting for (0 = none yet).
    pub generation: u64,
    pub loading: bool,
    pub error: Option<String>,
}

impl SearchDialog {
    pub fn new() -> Self {
        Self {
            editing: true,
            ..Self::default()
        }
    }

    pub fn selected_result(&self) -> Option<&Track> {
        self.results.get(self.selected)
    }

    pub fn next(&mut self) {
        if !self.results.is_empty() {
            self.selected = (self.selected + 1) % self.results.len();
        }
    }

    pub fn prev(&mut self) {
        if !self.results.is_empty() {
            self.selected = self
                .selected
                .checked_sub(1)
                .unwrap_or(self.results.len() - 1);
        }
    }

    pub fn push_char(&mut self, c: char) {
        self.query.push(c);
    }

    pub fn pop_char(&mut self) {
        self.query.pop();
    }
}
