//! Form fields, column metadata and typed field readers.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{AppError, AppResult};

/// Text-box contents keyed by column wire key.
pub type FieldValues = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    Integer,
    Number,
}

/// One editable column of a table.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub key: &'static str,
    #[serde(skip)]
    pub sql: &'static str,
    pub label: &'static str,
    pub kind: ColumnKind,
    pub required: bool,
}

pub struct FieldReader<'a> {
    fields: &'a FieldValues,
    max_len: usize,
}

impl<'a> FieldReader<'a> {
    pub fn new(fields: &'a FieldValues, max_len: usize) -> Self {
        FieldReader { fields, max_len }
    }

    /// Trimmed value; blank reads as `None`. Blank required columns fail.
    pub fn text(&self, col: &Column) -> AppResult<Option<String>> {
        let raw = self.fields.get(col.key).map(|s| s.trim()).unwrap_or("");
        if raw.is_empty() {
            if col.required {
                return Err(AppError::validation(col.key, "must not be empty"));
            }
            return Ok(None);
        }
        if raw.chars().count() > self.max_len {
            return Err(AppError::validation(
                col.key,
                format!("must be at most {} characters", self.max_len),
            ));
        }
        Ok(Some(raw.to_string()))
    }

    pub fn required_text(&self, col: &Column) -> AppResult<String> {
        self.text(col)?
            .ok_or_else(|| AppError::validation(col.key, "must not be empty"))
    }

    pub fn integer(&self, col: &Column) -> AppResult<i64> {
        let s = self.required_text(col)?;
        s.parse::<i64>()
            .map_err(|_| AppError::validation(col.key, format!("'{}' is not a whole number", s)))
    }

    pub fn number(&self, col: &Column) -> AppResult<f64> {
        let s = self.required_text(col)?;
        match s.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(AppError::validation(
                col.key,
                format!("'{}' is not a number", s),
            )),
        }
    }
}

/// Reads a `fields` object from request params. Numbers are accepted and
/// kept as their text form; null reads as blank.
pub fn fields_from_json(value: &serde_json::Value) -> Result<FieldValues, String> {
    let Some(obj) = value.as_object() else {
        return Err("fields must be an object".to_string());
    };
    let mut out = FieldValues::new();
    for (k, v) in obj {
        let text = match v {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Null => String::new(),
            _ => return Err(format!("fields.{} must be a string, number or null", k)),
        };
        out.insert(k.clone(), text);
    }
    Ok(out)
}
