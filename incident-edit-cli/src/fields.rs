use std::fs;
use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};
use inline_edit::domain::{FieldDefinition, parse_field_configs};
use inline_edit::prelude::Rule;
use serde_json::Value;

pub const SEVERITIES: [&str; 5] = ["P0", "P1", "P2", "P3", "P4"];
pub const STATUSES: [&str; 4] = ["Investigating", "Identified", "Monitoring", "Resolved"];
const TAG_SUGGESTIONS: [&str; 6] = ["API", "Database", "Frontend", "Network", "Storage", "Auth"];

/// Fields shown when no `--fields` file is given.
pub fn incident_fields() -> Vec<FieldDefinition> {
    vec![
        FieldDefinition::text("title")
            .with_label("Title")
            .with_rule(Rule::required("Title is required"))
            .with_rule(Rule::max_length(120, "Title must be at most 120 characters")),
        FieldDefinition::multiline("description").with_label("Description"),
        FieldDefinition::single_select("severity", SEVERITIES)
            .with_label("Severity")
            .with_rule(Rule::one_of(SEVERITIES, "Pick a severity between P0 and P4")),
        FieldDefinition::single_select("status", STATUSES).with_label("Status"),
        FieldDefinition::tag_set("tags", TAG_SUGGESTIONS).with_label("Tags"),
        FieldDefinition::date_time("due").with_label("Due"),
    ]
}

/// Field declarations from a JSON file (an array of field configs).
pub fn load_fields(path: &Path) -> Result<Vec<FieldDefinition>> {
    let raw = fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read field declarations {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .wrap_err_with(|| format!("{} is not valid JSON", path.display()))?;
    parse_field_configs(&value).wrap_err_with(|| format!("invalid fields in {}", path.display()))
}
