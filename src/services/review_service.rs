use std::collections::BTreeSet;

use crate::models::analysis::{AnalysisReport, FileAnalysis};

/// Feedback sent back to the classifier when the user forces a fresh
/// strategy on an already-organized folder.
pub const FORCE_NEW_STRATEGY_FEEDBACK: &str = "The folder is already clean, but I want a \
    DIFFERENT, fresh approach to organization. Group them by a new logic like Project Phase \
    or Priority.";

/// Per-item review state, derived from the two sets rather than stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    /// Sensitive and not yet consented; cannot be selected.
    Locked,
    Selected,
    Unselected,
}

/// Selection and consent state for one analysis report. Keyed by
/// `original_name`, the same join key the executor resolves against.
/// Scoped to a single report; dropped once the executor runs.
#[derive(Debug, Default)]
pub struct ReviewState {
    selected: BTreeSet<String>,
    consented: BTreeSet<String>,
    sensitive: BTreeSet<String>,
    all: Vec<String>,
}

impl ReviewState {
    /// Safe items start selected; sensitive items start locked and
    /// unselected, with an empty consent set.
    pub fn new(report: &AnalysisReport) -> Self {
        let mut state = Self::default();
        for item in &report.analyses {
            state.all.push(item.original_name.clone());
            if item.contains_sensitive_data {
                state.sensitive.insert(item.original_name.clone());
            } else {
                state.selected.insert(item.original_name.clone());
            }
        }
        state
    }

    pub fn state_of(&self, name: &str) -> ItemState {
        if self.sensitive.contains(name) && !self.consented.contains(name) {
            ItemState::Locked
        } else if self.selected.contains(name) {
            ItemState::Selected
        } else {
            ItemState::Unselected
        }
    }

    /// Unlock a sensitive item and select it in the same step. Idempotent;
    /// there is no revoke within a session.
    pub fn grant_consent(&mut self, name: &str) {
        self.consented.insert(name.to_string());
        self.selected.insert(name.to_string());
    }

    /// Flip selection membership. Locked items do not respond.
    pub fn toggle(&mut self, name: &str) {
        if self.state_of(name) == ItemState::Locked {
            return;
        }
        if !self.selected.remove(name) {
            self.selected.insert(name.to_string());
        }
    }

    /// Everything selectable right now: safe items plus consented ones.
    pub fn selectable(&self) -> BTreeSet<String> {
        self.all
            .iter()
            .filter(|name| self.state_of(name) != ItemState::Locked)
            .cloned()
            .collect()
    }

    /// Select exactly the selectable set, or clear the selection if it
    /// already equals that set. Never grants consent.
    pub fn select_all(&mut self) {
        let selectable = self.selectable();
        if self.selected == selectable {
            self.selected.clear();
        } else {
            self.selected = selectable;
        }
    }

    pub fn selected(&self) -> &BTreeSet<String> {
        &self.selected
    }

    pub fn is_selected(&self, name: &str) -> bool {
        self.selected.contains(name)
    }

    pub fn selection_count(&self) -> usize {
        self.selected.len()
    }

    /// The terminal read: the selected subset of the report's analyses, in
    /// report order. The caller discards this state afterwards regardless
    /// of what the executor does with the result.
    pub fn take_selected(self, report: &AnalysisReport) -> Vec<FileAnalysis> {
        report
            .analyses
            .iter()
            .filter(|item| self.selected.contains(&item.original_name))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, sensitive: bool) -> FileAnalysis {
        FileAnalysis {
            original_name: name.to_string(),
            suggested_name: format!("neat_{name}"),
            category: "Work".to_string(),
            is_junk: false,
            reason: String::new(),
            suggested_folder: ".".to_string(),
            confidence: 0.9,
            contains_sensitive_data: sensitive,
            context_tags: Vec::new(),
        }
    }

    fn report(items: Vec<FileAnalysis>) -> AnalysisReport {
        AnalysisReport {
            summary: String::new(),
            strategy: String::new(),
            impact_score: 0,
            analyses: items,
            is_already_organized: false,
        }
    }

    fn mixed_report() -> AnalysisReport {
        report(vec![
            item("a.txt", false),
            item("b.env", true),
            item("c.tmp", false),
        ])
    }

    #[test]
    fn test_initial_state_selects_safe_and_locks_sensitive() {
        let state = ReviewState::new(&mixed_report());

        assert_eq!(state.state_of("a.txt"), ItemState::Selected);
        assert_eq!(state.state_of("b.env"), ItemState::Locked);
        assert_eq!(state.state_of("c.tmp"), ItemState::Selected);
        assert_eq!(state.selection_count(), 2);
    }

    #[test]
    fn test_grant_consent_unlocks_and_selects() {
        let mut state = ReviewState::new(&mixed_report());

        state.grant_consent("b.env");
        assert_eq!(state.state_of("b.env"), ItemState::Selected);

        // Idempotent under repeats, even after a manual deselect.
        state.toggle("b.env");
        assert_eq!(state.state_of("b.env"), ItemState::Unselected);
        state.grant_consent("b.env");
        assert_eq!(state.state_of("b.env"), ItemState::Selected);
    }

    #[test]
    fn test_toggle_is_a_noop_on_locked_items() {
        let mut state = ReviewState::new(&mixed_report());

        state.toggle("b.env");
        assert_eq!(state.state_of("b.env"), ItemState::Locked);
        assert!(!state.is_selected("b.env"));
    }

    #[test]
    fn test_toggle_flips_unlocked_items() {
        let mut state = ReviewState::new(&mixed_report());

        state.toggle("a.txt");
        assert_eq!(state.state_of("a.txt"), ItemState::Unselected);
        state.toggle("a.txt");
        assert_eq!(state.state_of("a.txt"), ItemState::Selected);
    }

    #[test]
    fn test_select_all_toggles_against_the_selectable_set() {
        let mut state = ReviewState::new(&mixed_report());

        // Initial selection is exactly the selectable set (the safe items),
        // so select-all clears.
        state.select_all();
        assert_eq!(state.selection_count(), 0);

        // From any other state it selects exactly the selectable set and
        // never auto-grants consent.
        state.select_all();
        assert_eq!(state.selection_count(), 2);
        assert_eq!(state.state_of("b.env"), ItemState::Locked);

        // Once consent is granted the selectable set grows.
        state.grant_consent("b.env");
        state.select_all(); // selection == {a, b, c} == selectable -> clears
        assert_eq!(state.selection_count(), 0);
        state.select_all();
        assert_eq!(state.selection_count(), 3);
    }

    #[test]
    fn test_take_selected_preserves_report_order() {
        let mut state = ReviewState::new(&mixed_report());
        state.grant_consent("b.env");

        let selected = state.take_selected(&mixed_report());
        let names: Vec<_> = selected.iter().map(|a| a.original_name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.env", "c.tmp"]);
    }

    #[test]
    fn test_all_sensitive_report_starts_empty() {
        let state = ReviewState::new(&report(vec![item("x.pem", true), item("y.key", true)]));
        assert_eq!(state.selection_count(), 0);
        assert!(state.selectable().is_empty());
    }
}
