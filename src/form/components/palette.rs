use std::borrow::Cow;

/// Copy for the trigger and actions slots.
#[derive(Debug, Clone)]
pub struct SlotLabels {
    pub trigger_hint: Cow<'static, str>,
    pub save_hint: Cow<'static, str>,
    pub cancel_hint: Cow<'static, str>,
    pub saving: Cow<'static, str>,
}

impl SlotLabels {
    pub fn with_trigger_hint(mut self, hint: impl Into<Cow<'static, str>>) -> Self {
        self.trigger_hint = hint.into();
        self
    }

    pub fn with_save_hint(mut self, hint: impl Into<Cow<'static, str>>) -> Self {
        self.save_hint = hint.into();
        self
    }

    pub fn with_cancel_hint(mut self, hint: impl Into<Cow<'static, str>>) -> Self {
        self.cancel_hint = hint.into();
        self
    }

    pub fn with_saving(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.saving = label.into();
        self
    }
}

impl Default for SlotLabels {
    fn default() -> Self {
        Self {
            trigger_hint: Cow::Borrowed("Enter to edit"),
            save_hint: Cow::Borrowed("Ctrl+S save"),
            cancel_hint: Cow::Borrowed("Esc cancel"),
            saving: Cow::Borrowed("Saving…"),
        }
    }
}

/// What the display slot shows for empty values.
#[derive(Debug, Clone)]
pub struct Placeholders {
    pub empty_text: Cow<'static, str>,
    pub empty_tags: Cow<'static, str>,
    pub unset_date: Cow<'static, str>,
}

impl Placeholders {
    pub fn with_empty_text(mut self, text: impl Into<Cow<'static, str>>) -> Self {
        self.empty_text = text.into();
        self
    }

    pub fn with_empty_tags(mut self, text: impl Into<Cow<'static, str>>) -> Self {
        self.empty_tags = text.into();
        self
    }

    pub fn with_unset_date(mut self, text: impl Into<Cow<'static, str>>) -> Self {
        self.unset_date = text.into();
        self
    }
}

impl Default for Placeholders {
    fn default() -> Self {
        Self {
            empty_text: Cow::Borrowed("Empty"),
            empty_tags: Cow::Borrowed("No tags"),
            unset_date: Cow::Borrowed("Not set"),
        }
    }
}

/// Copy shown inside autocomplete dropdowns.
#[derive(Debug, Clone)]
pub struct SelectorHints {
    pub create_prefix: Cow<'static, str>,
    pub no_matches: Cow<'static, str>,
    pub creating: Cow<'static, str>,
}

impl SelectorHints {
    pub fn with_create_prefix(mut self, prefix: impl Into<Cow<'static, str>>) -> Self {
        self.create_prefix = prefix.into();
        self
    }

    pub fn with_no_matches(mut self, text: impl Into<Cow<'static, str>>) -> Self {
        self.no_matches = text.into();
        self
    }
}

impl Default for SelectorHints {
    fn default() -> Self {
        Self {
            create_prefix: Cow::Borrowed("+ Create"),
            no_matches: Cow::Borrowed("No matches"),
            creating: Cow::Borrowed("Creating…"),
        }
    }
}

/// Aggregated copy used by every editor slot.
#[derive(Debug, Clone, Default)]
pub struct EditorPalette {
    pub slots: SlotLabels,
    pub placeholders: Placeholders,
    pub selector: SelectorHints,
}

impl EditorPalette {
    pub fn with_slots(mut self, slots: SlotLabels) -> Self {
        self.slots = slots;
        self
    }

    pub fn with_placeholders(mut self, placeholders: Placeholders) -> Self {
        self.placeholders = placeholders;
        self
    }

    pub fn with_selector_hints(mut self, hints: SelectorHints) -> Self {
        self.selector = hints;
        self
    }
}
