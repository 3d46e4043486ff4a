//! Composition buffer
//!
//! Holds the local draft and enforces the character cap at entry time,
//! the way the original input filter did — the send pipeline never has
//! to re-check length.

/// Local draft text with a hard character cap.
#[derive(Debug, Clone)]
pub struct Composer {
    draft: String,
    char_limit: usize,
}

impl Composer {
    pub fn new(char_limit: usize) -> Self {
        Self {
            draft: String::new(),
            char_limit,
        }
    }

    /// Replace the draft, truncating at the cap on a char boundary.
    pub fn set_draft(&mut self, text: &str) {
        self.draft = match text.char_indices().nth(self.char_limit) {
            Some((idx, _)) => text[..idx].to_string(),
            None => text.to_string(),
        };
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Whether the send affordance is enabled: a pure function of the
    /// current draft, true iff it is non-empty after trimming.
    pub fn can_send(&self) -> bool {
        !self.draft.trim().is_empty()
    }

    /// Take the draft for dispatch, clearing it immediately (optimistic
    /// clear — independent of remote acknowledgement).
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.draft)
    }
}
