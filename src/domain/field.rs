use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::validation::{Rule, RuleSet};

use super::record::RecordId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    Text,
    Multiline,
    SingleSelect,
    TagSet,
    DateTime,
}

impl FieldKind {
    /// Canonical form of a draft before it is validated or compared.
    pub fn normalize(self, draft: &Value) -> Value {
        match (self, draft) {
            (FieldKind::DateTime, Value::String(text)) if text.trim().is_empty() => Value::Null,
            (FieldKind::DateTime, Value::String(text)) => Value::String(text.trim().to_string()),
            (FieldKind::TagSet, Value::Null) => Value::Array(Vec::new()),
            _ => draft.clone(),
        }
    }

    /// Value equality, except tag sets which compare as sets.
    pub fn same_value(self, left: &Value, right: &Value) -> bool {
        match self {
            FieldKind::TagSet => {
                let left = tag_list(left).into_iter().collect::<BTreeSet<_>>();
                let right = tag_list(right).into_iter().collect::<BTreeSet<_>>();
                left == right
            }
            _ => left == right,
        }
    }

    /// Value a fresh editor starts from when the record holds nothing for the field.
    pub fn empty_value(self) -> Value {
        match self {
            FieldKind::TagSet => Value::Array(Vec::new()),
            _ => Value::String(String::new()),
        }
    }

    pub(crate) fn implied_rule(self) -> Option<Rule> {
        match self {
            FieldKind::DateTime => Some(Rule::date_time(
                "Enter a date and time like 2024-05-01T13:30",
            )),
            _ => None,
        }
    }

    pub fn uses_candidates(self) -> bool {
        matches!(self, FieldKind::SingleSelect | FieldKind::TagSet)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FieldKind::Text => "text",
            FieldKind::Multiline => "multiline",
            FieldKind::SingleSelect => "single-select",
            FieldKind::TagSet => "tag-set",
            FieldKind::DateTime => "date-time",
        };
        f.write_str(label)
    }
}

/// Immutable description of one editable field, supplied by the caller.
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub rules: Option<RuleSet>,
    pub candidates: Vec<String>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            kind,
            rules: None,
            candidates: Vec::new(),
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn multiline(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Multiline)
    }

    pub fn date_time(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::DateTime)
    }

    pub fn single_select<I, S>(name: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, FieldKind::SingleSelect).with_candidates(options)
    }

    pub fn tag_set<I, S>(name: impl Into<String>, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, FieldKind::TagSet).with_candidates(suggestions)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.get_or_insert_with(RuleSet::default).push(rule);
        self
    }

    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn with_candidates<I, S>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.candidates = candidates.into_iter().map(Into::into).collect();
        self
    }

    /// Caller rules followed by the rule the field kind implies, if any.
    pub fn effective_rules(&self) -> Option<RuleSet> {
        match (self.rules.clone(), self.kind.implied_rule()) {
            (None, None) => None,
            (Some(rules), None) => Some(rules),
            (None, Some(rule)) => Some(RuleSet::from(vec![rule])),
            (Some(mut rules), Some(rule)) => {
                rules.push(rule);
                Some(rules)
            }
        }
    }
}

/// Identity of one editable slot: a field of a specific record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldKey {
    pub record: RecordId,
    pub field: String,
}

impl FieldKey {
    pub fn new(record: RecordId, field: impl Into<String>) -> Self {
        Self {
            record,
            field: field.into(),
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.record, self.field)
    }
}

pub(crate) fn tag_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            })
            .collect(),
        Value::String(text) if !text.is_empty() => vec![text.clone()],
        _ => Vec::new(),
    }
}
