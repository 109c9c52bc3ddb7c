//! Multi-line draft held by a client while a problem tag is being filled in
//!
//! Nothing here touches storage. A draft always holds at least one line; the
//! finished line list is handed to `SubmissionService::submit`.

use serde::{Deserialize, Serialize};

use crate::db::{PackingSlipMatch, ProblemLineInput, Size};

/// Size preselected on a fresh line
pub const DEFAULT_SIZE: Size = Size::M;

/// Blank line as first shown to the user
pub fn default_line() -> ProblemLineInput {
    ProblemLineInput {
        size: DEFAULT_SIZE.as_str().to_string(),
        packing_slip_match: PackingSlipMatch::Unknown,
        ..Default::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagDraft {
    lines: Vec<ProblemLineInput>,
}

impl Default for TagDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl TagDraft {
    pub fn new() -> Self {
        Self {
            lines: vec![default_line()],
        }
    }

    /// Append a blank line; returns its index
    pub fn add_line(&mut self) -> usize {
        self.lines.push(default_line());
        self.lines.len() - 1
    }

    /// Remove the line at `index`; removing the last line leaves one blank line
    ///
    /// Returns the removed line, or `None` if `index` is out of range.
    pub fn remove_line(&mut self, index: usize) -> Option<ProblemLineInput> {
        if index >= self.lines.len() {
            return None;
        }
        let removed = self.lines.remove(index);
        if self.lines.is_empty() {
            self.lines.push(default_line());
        }
        Some(removed)
    }

    /// Reset to a single blank line
    pub fn clear(&mut self) {
        self.lines = vec![default_line()];
    }

    pub fn lines(&self) -> &[ProblemLineInput] {
        &self.lines
    }

    pub fn line_mut(&mut self, index: usize) -> Option<&mut ProblemLineInput> {
        self.lines.get_mut(index)
    }

    /// Final line list for submission, with zero quantities sent as absent
    pub fn into_lines(self) -> Vec<ProblemLineInput> {
        self.lines
            .into_iter()
            .map(|mut line| {
                line.qty_short = line.qty_short.filter(|q| *q != 0);
                line.qty_heavy = line.qty_heavy.filter(|q| *q != 0);
                line
            })
            .collect()
    }
}
