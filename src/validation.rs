use std::fmt;
use std::sync::{Arc, LazyLock};

use jsonschema::Validator;
use regex::Regex;
use serde_json::Value;

static DATE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^([0-9]{4})-([0-9]{2})-([0-9]{2})(?:[T ]([0-9]{2}):([0-9]{2})(?::([0-9]{2})(?:\.[0-9]+)?)?(?:Z|[+-][0-9]{2}:[0-9]{2})?)?$",
    )
    .expect("invalid date-time pattern")
});

type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// One predicate + message pair of a field's validation schema.
#[derive(Clone)]
pub enum Rule {
    Required { message: String },
    MaxLength { limit: usize, message: String },
    Pattern { regex: Regex, message: String },
    OneOf { options: Vec<String>, message: String },
    DateTime { message: String },
    Schema { validator: Arc<Validator> },
    Custom { check: Predicate, message: String },
}

impl Rule {
    pub fn required(message: impl Into<String>) -> Self {
        Rule::Required {
            message: message.into(),
        }
    }

    pub fn max_length(limit: usize, message: impl Into<String>) -> Self {
        Rule::MaxLength {
            limit,
            message: message.into(),
        }
    }

    pub fn pattern(regex: Regex, message: impl Into<String>) -> Self {
        Rule::Pattern {
            regex,
            message: message.into(),
        }
    }

    pub fn one_of<I, S>(options: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Rule::OneOf {
            options: options.into_iter().map(Into::into).collect(),
            message: message.into(),
        }
    }

    pub fn date_time(message: impl Into<String>) -> Self {
        Rule::DateTime {
            message: message.into(),
        }
    }

    pub fn schema(validator: Validator) -> Self {
        Rule::Schema {
            validator: Arc::new(validator),
        }
    }

    pub fn custom<F>(check: F, message: impl Into<String>) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Rule::Custom {
            check: Arc::new(check),
            message: message.into(),
        }
    }

    /// `None` when the value passes, otherwise the message to show.
    pub fn check(&self, value: &Value) -> Option<String> {
        let passed = match self {
            Rule::Required { .. } => !is_blank(value),
            Rule::MaxLength { limit, .. } => match value {
                Value::String(text) => text.chars().count() <= *limit,
                Value::Array(items) => items.len() <= *limit,
                _ => true,
            },
            Rule::Pattern { regex, .. } => match value {
                Value::String(text) => regex.is_match(text),
                _ => true,
            },
            Rule::OneOf { options, .. } => match value {
                Value::Null => true,
                Value::String(text) => options.iter().any(|option| option == text),
                _ => false,
            },
            Rule::DateTime { .. } => match value {
                Value::Null => true,
                Value::String(text) => is_date_time(text),
                _ => false,
            },
            Rule::Schema { validator } => {
                return validator
                    .iter_errors(value)
                    .next()
                    .map(|error| error.to_string());
            }
            Rule::Custom { check, .. } => check(value),
        };
        if passed { None } else { Some(self.message()) }
    }

    fn message(&self) -> String {
        match self {
            Rule::Required { message }
            | Rule::MaxLength { message, .. }
            | Rule::Pattern { message, .. }
            | Rule::OneOf { message, .. }
            | Rule::DateTime { message }
            | Rule::Custom { message, .. } => message.clone(),
            Rule::Schema { .. } => "value does not match schema".to_string(),
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Required { message } => f.debug_struct("Required").field("message", message).finish(),
            Rule::MaxLength { limit, message } => f
                .debug_struct("MaxLength")
                .field("limit", limit)
                .field("message", message)
                .finish(),
            Rule::Pattern { regex, message } => f
                .debug_struct("Pattern")
                .field("regex", &regex.as_str())
                .field("message", message)
                .finish(),
            Rule::OneOf { options, message } => f
                .debug_struct("OneOf")
                .field("options", options)
                .field("message", message)
                .finish(),
            Rule::DateTime { message } => f.debug_struct("DateTime").field("message", message).finish(),
            Rule::Schema { .. } => f.write_str("Schema"),
            Rule::Custom { message, .. } => f.debug_struct("Custom").field("message", message).finish(),
        }
    }
}

/// Ordered list of rules; evaluation stops at the first failure.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }
}

impl From<Vec<Rule>> for RuleSet {
    fn from(rules: Vec<Rule>) -> Self {
        Self { rules }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Invalid(String),
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid)
    }
}

/// Runs every rule in order against `draft` and reports the first failure.
pub fn validate(draft: &Value, rules: Option<&RuleSet>) -> Verdict {
    let Some(rules) = rules else {
        return Verdict::Valid;
    };
    rules
        .iter()
        .find_map(|rule| rule.check(draft))
        .map_or(Verdict::Valid, Verdict::Invalid)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn is_date_time(text: &str) -> bool {
    let Some(caps) = DATE_TIME.captures(text) else {
        return false;
    };
    // absent time parts count as zero; present ones must parse
    let number = |idx: usize| match caps.get(idx) {
        Some(part) => part.as_str().parse::<u32>().ok(),
        None => Some(0),
    };
    let parts = (1..=6).map(number).collect::<Option<Vec<u32>>>();
    let Some([year, month, day, hour, minute, second]) = parts.as_deref() else {
        return false;
    };
    if !(1..=12).contains(month) || *day == 0 || *day > days_in_month(*year, *month) {
        return false;
    }
    *hour < 24 && *minute < 60 && *second < 61
}

fn days_in_month(year: u32, month: u32) -> u32 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if (year % 4 == 0 && year % 100 != 0) || year % 400 == 0 => 29,
        2 => 28,
        _ => 31,
    }
}
