#[derive(Debug, Clone)]
pub struct StatusLine {
    message: String,
}

pub const READY_STATUS: &str = "Ready. Press Enter to edit the focused field.";

impl Default for StatusLine {
    fn default() -> Self {
        Self {
            message: READY_STATUS.to_string(),
        }
    }
}

impl StatusLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_raw(&mut self, msg: impl Into<String>) {
        self.message = msg.into();
    }

    pub fn ready(&mut self) {
        self.message = READY_STATUS.to_string();
    }

    pub fn editing(&mut self, label: &str) {
        self.message = format!("Editing {label}");
    }

    pub fn saving(&mut self, label: &str) {
        self.message = format!("Saving {label}…");
    }

    pub fn saved(&mut self, label: &str) {
        self.message = format!("{label} saved");
    }

    pub fn unchanged(&mut self, label: &str) {
        self.message = format!("{label} unchanged");
    }

    pub fn invalid(&mut self, label: &str, reason: &str) {
        self.message = format!("{label}: {reason}");
    }

    pub fn save_failed(&mut self, label: &str, reason: &str) {
        self.message = format!("Could not save {label}: {reason}");
    }

    pub fn cancelled(&mut self, label: &str) {
        self.message = format!("Discarded changes to {label}");
    }

    pub fn creating(&mut self, candidate: &str) {
        self.message = format!("Creating \"{candidate}\"…");
    }

    pub fn created(&mut self, candidate: &str) {
        self.message = format!("Created \"{candidate}\"");
    }

    pub fn create_failed(&mut self, reason: &str) {
        self.message = format!("Create failed: {reason}");
    }

    pub fn pending_discard(&mut self) {
        self.message = "Unsaved draft. Press Esc again to discard it.".to_string();
    }

    pub fn pending_exit(&mut self) {
        self.message = "Unsaved edits. Press Ctrl+Q again to quit anyway.".to_string();
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
