use std::collections::HashSet;

/// Per-session completion state for a tutorial checklist.
///
/// Lives only as long as the UI session that created it; nothing here is
/// persisted. A fresh state starts with every step unchecked.
#[derive(Debug, Clone, Default)]
pub struct ChecklistState {
    done: HashSet<String>,
}

impl ChecklistState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip the completion state of a step, returning the new state
    pub fn toggle(&mut self, step_id: &str) -> bool {
        if self.done.remove(step_id) {
            false
        } else {
            self.done.insert(step_id.to_string());
            true
        }
    }

    pub fn is_done(&self, step_id: &str) -> bool {
        self.done.contains(step_id)
    }

    pub fn completed_count(&self) -> usize {
        self.done.len()
    }

    /// Clear every checkmark
    pub fn reset(&mut self) {
        self.done.clear();
    }
}
