//! Per-field rendering kinds.
//!
//! Pages may pin a field to a kind explicitly. Fields without an entry fall
//! back to the naming convention: numbers under a time-related key are timers,
//! keys containing `colour` drive a CSS custom property and keys containing
//! `custom` are shown as JSON.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::DisplayError;
use crate::format::{format_timer, is_truthy, js_number, to_text};

const TIMER_KEYS: [&str; 6] = ["clock", "time", "duration", "delay", "gap", "startedAt"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Boolean,
    Color,
    Json,
    Timer,
}

impl FieldKind {
    /// Kind implied by the field key alone, given whether the value is numeric.
    pub fn infer(field_key: &str, numeric: bool) -> Self {
        if numeric {
            if TIMER_KEYS.iter().any(|k| field_key.contains(k)) {
                return FieldKind::Timer;
            }
            return FieldKind::Text;
        }
        if field_key.contains("colour") {
            FieldKind::Color
        } else if field_key.contains("custom") {
            FieldKind::Json
        } else {
            FieldKind::Text
        }
    }
}

/// The concrete write a projection turns into.
#[derive(Clone, Debug, PartialEq)]
pub enum Write {
    Checked(bool),
    Text(String),
    Property { name: String, value: String },
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct FieldSchema {
    kinds: HashMap<String, FieldKind>,
}

impl FieldSchema {
    pub fn from_json(text: &str) -> Result<Self, DisplayError> {
        serde_json::from_str(text).map_err(DisplayError::Schema)
    }

    pub fn with_kind(mut self, field_key: impl Into<String>, kind: FieldKind) -> Self {
        self.kinds.insert(field_key.into(), kind);
        self
    }

    pub fn kind_of(&self, field_key: &str, value: &Value) -> FieldKind {
        self.kinds
            .get(field_key)
            .copied()
            .unwrap_or_else(|| FieldKind::infer(field_key, value.is_number()))
    }

    /// Decides how `value` lands on the target named `field_key`.
    pub fn resolve(&self, field_key: &str, value: &Value) -> Write {
        let kind = self.kind_of(field_key, value);
        match (value, kind) {
            (Value::Bool(checked), _) => Write::Checked(*checked),
            (_, FieldKind::Boolean) => Write::Checked(is_truthy(Some(value))),
            (Value::Number(n), FieldKind::Timer) => {
                Write::Text(format_timer(n.as_f64().unwrap_or(f64::NAN)))
            }
            (Value::Number(n), _) => Write::Text(js_number(n.as_f64().unwrap_or(f64::NAN))),
            (_, FieldKind::Color) => Write::Property {
                name: format!("--{}", field_key),
                value: to_text(value),
            },
            (_, FieldKind::Json) => {
                Write::Text(serde_json::to_string_pretty(value).unwrap_or_default())
            }
            _ => Write::Text(to_text(value)),
        }
    }
}
