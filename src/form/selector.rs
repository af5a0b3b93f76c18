use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::policy::CreateFailure;

/// What a key press asks the owning editor to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorAction {
    Ignored,
    /// Query or focus changed.
    Updated,
    /// Add this candidate to the draft. The query has already been cleared.
    Pick(String),
    /// Run the creation callback for this label.
    Create(String),
    /// Backspace on an empty query.
    RemoveLast,
    /// Escape.
    Dismiss,
    /// Enter with nothing focused and an empty query.
    Submit,
}

/// Free-text filter over a candidate list with a wrap-around focus.
///
/// Focus indices `0..filtered.len()` address filtered candidates; when the
/// "create" affordance is showing it takes index `filtered.len()`.
#[derive(Debug, Clone)]
pub struct AutocompleteSelector {
    candidates: Vec<String>,
    query: String,
    focus: Option<usize>,
    allow_create: bool,
    exclude_selected: bool,
    creating: Option<String>,
    create_error: Option<String>,
}

impl AutocompleteSelector {
    pub fn new<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
            query: String::new(),
            focus: None,
            allow_create: false,
            exclude_selected: true,
            creating: None,
            create_error: None,
        }
    }

    pub fn with_create(mut self, allow: bool) -> Self {
        self.allow_create = allow;
        self
    }

    /// Single-select pickers keep the current value selectable.
    pub fn excluding_selected(mut self, exclude: bool) -> Self {
        self.exclude_selected = exclude;
        self
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn focus(&self) -> Option<usize> {
        self.focus
    }

    pub fn create_error(&self) -> Option<&str> {
        self.create_error.as_deref()
    }

    pub fn pending_create(&self) -> Option<&str> {
        self.creating.as_deref()
    }

    pub fn reset(&mut self) {
        self.query.clear();
        self.focus = None;
        self.creating = None;
        self.create_error = None;
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.focus = None;
        self.create_error = None;
    }

    pub fn add_candidate(&mut self, candidate: impl Into<String>) {
        let candidate = candidate.into();
        if !self.candidates.contains(&candidate) {
            self.candidates.push(candidate);
        }
    }

    /// Candidates not already selected whose text contains the query, ignoring case.
    pub fn filtered(&self, selected: &[String]) -> Vec<&str> {
        let needle = self.query.trim().to_lowercase();
        self.candidates
            .iter()
            .filter(|candidate| !(self.exclude_selected && selected.contains(*candidate)))
            .filter(|candidate| candidate.to_lowercase().contains(&needle))
            .map(String::as_str)
            .collect()
    }

    /// Label offered for creation, if the affordance is showing.
    pub fn create_label(&self, selected: &[String]) -> Option<&str> {
        if !self.allow_create {
            return None;
        }
        let label = self.query.trim();
        if label.is_empty() || selected.iter().any(|value| value == label) {
            return None;
        }
        let lowered = label.to_lowercase();
        if self
            .candidates
            .iter()
            .any(|candidate| candidate.to_lowercase() == lowered)
        {
            return None;
        }
        Some(label)
    }

    pub fn focusable_len(&self, selected: &[String]) -> usize {
        self.filtered(selected).len() + usize::from(self.create_label(selected).is_some())
    }

    pub fn focus_next(&mut self, selected: &[String]) -> bool {
        let len = self.focusable_len(selected);
        if len == 0 {
            return false;
        }
        self.focus = Some(match self.focus {
            Some(idx) => (idx + 1) % len,
            None => 0,
        });
        true
    }

    pub fn focus_prev(&mut self, selected: &[String]) -> bool {
        let len = self.focusable_len(selected);
        if len == 0 {
            return false;
        }
        self.focus = Some(match self.focus {
            Some(idx) => (idx + len - 1) % len,
            None => len - 1,
        });
        true
    }

    pub fn handle_key(&mut self, key: &KeyEvent, selected: &[String]) -> SelectorAction {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return SelectorAction::Ignored;
        }
        match key.code {
            KeyCode::Down => moved(self.focus_next(selected)),
            KeyCode::Up => moved(self.focus_prev(selected)),
            KeyCode::Enter => match self.activate(selected) {
                SelectorAction::Ignored if self.query.is_empty() && self.focus.is_none() => {
                    SelectorAction::Submit
                }
                other => other,
            },
            KeyCode::Char(' ') if self.focus.is_some() => self.activate(selected),
            KeyCode::Char(ch) => {
                self.query.push(ch);
                self.focus = None;
                self.create_error = None;
                SelectorAction::Updated
            }
            KeyCode::Backspace if self.query.is_empty() => {
                // the removed tag rejoins the list and shifts every index after it
                self.focus = None;
                SelectorAction::RemoveLast
            }
            KeyCode::Backspace => {
                self.query.pop();
                self.focus = None;
                self.create_error = None;
                SelectorAction::Updated
            }
            KeyCode::Esc => SelectorAction::Dismiss,
            _ => SelectorAction::Ignored,
        }
    }

    /// Record the result of a creation call started by [`SelectorAction::Create`].
    pub fn finish_create(&mut self, outcome: Result<&str, &str>, on_failure: CreateFailure) {
        self.creating = None;
        match outcome {
            Ok(created) => {
                self.add_candidate(created);
                self.query.clear();
                self.focus = None;
                self.create_error = None;
            }
            Err(message) => {
                self.create_error = Some(message.to_string());
                if on_failure == CreateFailure::ClearQuery {
                    self.query.clear();
                    self.focus = None;
                }
            }
        }
    }

    fn activate(&mut self, selected: &[String]) -> SelectorAction {
        let Some(focus) = self.focus else {
            return SelectorAction::Ignored;
        };
        let filtered = self.filtered(selected);
        if let Some(candidate) = filtered.get(focus) {
            let candidate = candidate.to_string();
            self.query.clear();
            self.focus = None;
            self.create_error = None;
            return SelectorAction::Pick(candidate);
        }
        if focus == filtered.len()
            && let Some(label) = self.create_label(selected)
        {
            if self.creating.is_some() {
                return SelectorAction::Ignored;
            }
            let label = label.to_string();
            self.creating = Some(label.clone());
            self.create_error = None;
            return SelectorAction::Create(label);
        }
        SelectorAction::Ignored
    }
}

fn moved(moved: bool) -> SelectorAction {
    if moved {
        SelectorAction::Updated
    } else {
        SelectorAction::Ignored
    }
}
