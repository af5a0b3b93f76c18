use std::{borrow::Cow, sync::Arc, time::Duration};

use crate::form::{
    CreateFailure, EditorPalette, FieldPolicy, Placeholders, SaveTrigger, SelectorHints,
    SlotLabels,
};

#[derive(Debug, Clone)]
pub struct UiOptions {
    pub tick_rate: Duration,
    pub confirm_exit: bool,
    /// Escape on a dirty draft must be pressed twice before it is thrown away.
    pub confirm_discard: bool,
    pub show_help: bool,
    pub allow_create: bool,
    pub policy: FieldPolicy,
    pub(crate) palette: Arc<EditorPalette>,
}

impl Default for UiOptions {
    fn default() -> Self {
        Self {
            tick_rate: Duration::from_millis(250),
            confirm_exit: true,
            confirm_discard: false,
            show_help: true,
            allow_create: true,
            policy: FieldPolicy::default(),
            palette: Arc::new(EditorPalette::default()),
        }
    }
}

impl UiOptions {
    pub fn with_help(mut self, show: bool) -> Self {
        self.show_help = show;
        self
    }

    pub fn with_confirm_exit(mut self, confirm: bool) -> Self {
        self.confirm_exit = confirm;
        self
    }

    pub fn with_confirm_discard(mut self, confirm: bool) -> Self {
        self.confirm_discard = confirm;
        self
    }

    pub fn with_tick_rate(mut self, tick_rate: Duration) -> Self {
        self.tick_rate = tick_rate;
        self
    }

    pub fn with_create(mut self, allow: bool) -> Self {
        self.allow_create = allow;
        self
    }

    pub fn with_save_trigger(mut self, trigger: SaveTrigger) -> Self {
        self.policy = self.policy.with_save_trigger(trigger);
        self
    }

    pub fn with_create_failure(mut self, behaviour: CreateFailure) -> Self {
        self.policy = self.policy.with_create_failure(behaviour);
        self
    }

    pub fn with_palette(mut self, palette: EditorPalette) -> Self {
        self.palette = Arc::new(palette);
        self
    }

    pub fn with_slot_labels(self, labels: SlotLabels) -> Self {
        self.map_palette(|palette| palette.with_slots(labels))
    }

    pub fn with_placeholders(self, placeholders: Placeholders) -> Self {
        self.map_palette(|palette| palette.with_placeholders(placeholders))
    }

    pub fn with_selector_hints(self, hints: SelectorHints) -> Self {
        self.map_palette(|palette| palette.with_selector_hints(hints))
    }

    pub fn with_trigger_hint(self, hint: impl Into<Cow<'static, str>>) -> Self {
        let hint = hint.into();
        self.map_palette(|mut palette| {
            palette.slots = palette.slots.clone().with_trigger_hint(hint);
            palette
        })
    }

    pub fn with_saving_label(self, label: impl Into<Cow<'static, str>>) -> Self {
        let label = label.into();
        self.map_palette(|mut palette| {
            palette.slots = palette.slots.clone().with_saving(label);
            palette
        })
    }

    pub fn palette(&self) -> Arc<EditorPalette> {
        Arc::clone(&self.palette)
    }

    fn map_palette(mut self, map: impl FnOnce(EditorPalette) -> EditorPalette) -> Self {
        let updated = map((*self.palette).clone());
        self.palette = Arc::new(updated);
        self
    }
}
