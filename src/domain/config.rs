use jsonschema::validator_for;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::validation::{Rule, RuleSet};

use super::field::{FieldDefinition, FieldKind};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("field declarations must be a JSON array: {0}")]
    Shape(#[from] serde_json::Error),
    #[error("field `{field}` has an invalid pattern: {source}")]
    Pattern {
        field: String,
        #[source]
        source: regex::Error,
    },
    #[error("field `{field}` has an invalid schema: {message}")]
    Schema { field: String, message: String },
    #[error("field `{field}` of kind {kind} needs at least one candidate")]
    MissingCandidates { field: String, kind: FieldKind },
    #[error("field `{0}` is declared twice")]
    Duplicate(String),
}

/// Serializable declaration of a field, loaded from JSON.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConfig {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub pattern_message: Option<String>,
    #[serde(default)]
    pub candidates: Vec<String>,
    #[serde(default)]
    pub schema: Option<Value>,
}

impl FieldConfig {
    pub fn into_definition(self) -> Result<FieldDefinition, ConfigError> {
        let label = self.label.clone().unwrap_or_else(|| self.name.clone());
        if self.kind == FieldKind::SingleSelect && self.candidates.is_empty() {
            return Err(ConfigError::MissingCandidates {
                field: self.name,
                kind: self.kind,
            });
        }

        let mut rules = RuleSet::new();
        if self.required {
            rules.push(Rule::required(format!("{label} is required")));
        }
        if let Some(limit) = self.max_length {
            rules.push(Rule::max_length(
                limit,
                format!("{label} must be at most {limit} characters"),
            ));
        }
        if let Some(pattern) = &self.pattern {
            let regex = Regex::new(pattern).map_err(|source| ConfigError::Pattern {
                field: self.name.clone(),
                source,
            })?;
            let message = self
                .pattern_message
                .clone()
                .unwrap_or_else(|| format!("{label} must match {pattern}"));
            rules.push(Rule::pattern(regex, message));
        }
        if let Some(schema) = &self.schema {
            let validator = validator_for(schema).map_err(|err| ConfigError::Schema {
                field: self.name.clone(),
                message: err.to_string(),
            })?;
            rules.push(Rule::schema(validator));
        }

        let mut definition = FieldDefinition::new(self.name, self.kind)
            .with_label(label)
            .with_candidates(self.candidates);
        if !rules.is_empty() {
            definition = definition.with_rules(rules);
        }
        Ok(definition)
    }
}

/// Parse a JSON array of field declarations into definitions.
pub fn parse_field_configs(value: &Value) -> Result<Vec<FieldDefinition>, ConfigError> {
    let configs: Vec<FieldConfig> = serde_json::from_value(value.clone())?;
    let mut definitions: Vec<FieldDefinition> = Vec::with_capacity(configs.len());
    for config in configs {
        if definitions.iter().any(|field| field.name == config.name) {
            return Err(ConfigError::Duplicate(config.name));
        }
        definitions.push(config.into_definition()?);
    }
    Ok(definitions)
}
