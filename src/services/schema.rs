//! Dynamic form schema built from the field configuration.
//!
//! Each [`FieldType`] carries its own widget, default value and value check.
//! A [`FormSchema`] is built once per configuration change and shared by every
//! create/update until the configuration changes again.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{Map, Number, Value};

use crate::models::field::{FieldConfig, FieldType, FormField, Widget, RESERVED_FIELD_NAMES};
use crate::services::{BoardError, BoardResult};

impl FieldType {
    pub fn widget(&self) -> Widget {
        match self {
            Self::Text => Widget::TextInput,
            Self::Email => Widget::EmailInput,
            Self::Number => Widget::NumberInput,
            Self::Date => Widget::DateInput,
            Self::Datetime => Widget::DateTimeInput,
            Self::Time => Widget::TimeInput,
            Self::Checkbox => Widget::Checkbox,
            Self::Switch => Widget::Switch,
            Self::Radio => Widget::RadioGroup,
            Self::Dropdown => Widget::Select,
            Self::Multiselect => Widget::MultiSelect,
            Self::Textarea => Widget::TextArea,
        }
    }

    pub fn default_value(&self) -> Value {
        match self {
            Self::Text | Self::Email | Self::Textarea | Self::Radio | Self::Dropdown => {
                Value::String(String::new())
            }
            Self::Checkbox | Self::Switch => Value::Bool(false),
            Self::Multiselect => Value::Array(Vec::new()),
            Self::Number | Self::Date | Self::Datetime | Self::Time => Value::Null,
        }
    }

    /// Checks `value` against this kind and returns its normalized form.
    /// Empty values pass; whether they are allowed is decided by `required`.
    pub fn coerce(&self, value: &Value, options: &[String]) -> Result<Value, String> {
        if value.is_null() {
            return Ok(self.default_value());
        }

        match self {
            Self::Text | Self::Textarea => expect_string(value).map(|s| Value::String(s.to_string())),
            Self::Email => {
                let s = expect_string(value)?.trim();
                if s.is_empty() || is_email(s) {
                    Ok(Value::String(s.to_string()))
                } else {
                    Err("must be a valid e-mail address".to_string())
                }
            }
            Self::Number => coerce_number(value),
            Self::Date => coerce_temporal(value, |s| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
            }, "must be a date (YYYY-MM-DD)"),
            Self::Datetime => coerce_temporal(value, |s| {
                DateTime::parse_from_rfc3339(s).is_ok()
                    || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M").is_ok()
                    || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").is_ok()
            }, "must be a date and time"),
            Self::Time => coerce_temporal(value, |s| {
                NaiveTime::parse_from_str(s, "%H:%M").is_ok()
                    || NaiveTime::parse_from_str(s, "%H:%M:%S").is_ok()
            }, "must be a time (HH:MM)"),
            Self::Checkbox | Self::Switch => match value {
                Value::Bool(b) => Ok(Value::Bool(*b)),
                _ => Err("must be true or false".to_string()),
            },
            Self::Radio | Self::Dropdown => {
                let s = expect_string(value)?;
                if s.is_empty() || options.iter().any(|o| o == s) {
                    Ok(Value::String(s.to_string()))
                } else {
                    Err(format!("'{}' is not one of the available options", s))
                }
            }
            Self::Multiselect => {
                let items = value
                    .as_array()
                    .ok_or_else(|| "must be a list of options".to_string())?;
                let mut selected = Vec::with_capacity(items.len());
                for item in items {
                    let s = item
                        .as_str()
                        .ok_or_else(|| "must be a list of options".to_string())?;
                    if !options.iter().any(|o| o == s) {
                        return Err(format!("'{}' is not one of the available options", s));
                    }
                    if !selected.iter().any(|v: &Value| v.as_str() == Some(s)) {
                        selected.push(Value::String(s.to_string()));
                    }
                }
                Ok(Value::Array(selected))
            }
        }
    }
}

fn expect_string(value: &Value) -> Result<&str, String> {
    value.as_str().ok_or_else(|| "must be text".to_string())
}

fn is_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn coerce_number(value: &Value) -> Result<Value, String> {
    match value {
        Value::Number(n) => Ok(Value::Number(n.clone())),
        Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
        Value::String(s) => {
            let parsed: f64 = s
                .trim()
                .replace(',', ".")
                .parse()
                .map_err(|_| "must be a number".to_string())?;
            if parsed.fract() == 0.0 && parsed.abs() < i64::MAX as f64 {
                Ok(Value::from(parsed as i64))
            } else {
                Number::from_f64(parsed)
                    .map(Value::Number)
                    .ok_or_else(|| "must be a finite number".to_string())
            }
        }
        _ => Err("must be a number".to_string()),
    }
}

fn coerce_temporal(value: &Value, valid: impl Fn(&str) -> bool, message: &str) -> Result<Value, String> {
    let s = expect_string(value)?.trim();
    if s.is_empty() {
        Ok(Value::Null)
    } else if valid(s) {
        Ok(Value::String(s.to_string()))
    } else {
        Err(message.to_string())
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Active fields of a variant, in display order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormSchema {
    fields: Vec<FieldConfig>,
}

impl FormSchema {
    pub fn build(configs: &[FieldConfig]) -> Self {
        let mut fields: Vec<FieldConfig> = configs.iter().filter(|c| c.active).cloned().collect();
        fields.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.field_name.cmp(&b.field_name)));
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldConfig] {
        &self.fields
    }

    pub fn get(&self, field_name: &str) -> Option<&FieldConfig> {
        self.fields.iter().find(|f| f.field_name == field_name)
    }

    pub fn render(&self) -> Vec<FormField> {
        self.fields
            .iter()
            .map(|f| FormField {
                field_name: f.field_name.clone(),
                label: f.label.clone(),
                kind: f.kind,
                widget: f.kind.widget(),
                required: f.required,
                visible: f.visible,
                options: f.options.clone(),
                default: f.kind.default_value(),
            })
            .collect()
    }

    pub fn defaults(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|f| (f.field_name.clone(), f.kind.default_value()))
            .collect()
    }

    fn check(field: &FieldConfig, value: &Value) -> Result<Value, String> {
        let coerced = field.kind.coerce(value, &field.options)?;
        if field.required && is_empty(&coerced) {
            return Err(format!("{} is required", field.label));
        }
        Ok(coerced)
    }

    /// Validates a complete form: every active field is checked, absent ones
    /// get their default. Returns the normalized values.
    pub fn validate_all(&self, values: &Map<String, Value>) -> BoardResult<Map<String, Value>> {
        let mut errors = self.unknown_keys(values);
        let mut normalized = Map::new();

        for field in &self.fields {
            let value = values.get(&field.field_name).unwrap_or(&Value::Null);
            match Self::check(field, value) {
                Ok(v) => {
                    normalized.insert(field.field_name.clone(), v);
                }
                Err(message) => {
                    errors.insert(field.field_name.clone(), message);
                }
            }
        }

        if errors.is_empty() {
            Ok(normalized)
        } else {
            Err(BoardError::Fields(errors))
        }
    }

    /// Validates only the submitted fields of an update.
    pub fn validate_partial(&self, values: &Map<String, Value>) -> BoardResult<Map<String, Value>> {
        let mut errors = self.unknown_keys(values);
        let mut normalized = Map::new();

        for (key, value) in values {
            if let Some(field) = self.get(key) {
                match Self::check(field, value) {
                    Ok(v) => {
                        normalized.insert(key.clone(), v);
                    }
                    Err(message) => {
                        errors.insert(key.clone(), message);
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(normalized)
        } else {
            Err(BoardError::Fields(errors))
        }
    }

    fn unknown_keys(&self, values: &Map<String, Value>) -> BTreeMap<String, String> {
        values
            .keys()
            .filter(|k| self.get(k).is_none())
            .map(|k| (k.clone(), "is not an active field".to_string()))
            .collect()
    }
}

/// Checks a field definition before it is stored.
pub fn validate_definition(config: &FieldConfig) -> BoardResult<()> {
    let name = &config.field_name;
    let mut chars = name.chars();
    let valid_name = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if !valid_name {
        return Err(BoardError::Invalid(format!(
            "Field name '{}' must start with a letter and contain only letters, digits or '_'",
            name
        )));
    }

    if RESERVED_FIELD_NAMES.iter().any(|r| r.eq_ignore_ascii_case(name)) {
        return Err(BoardError::Invalid(format!("'{}' is a reserved field name", name)));
    }

    if config.label.trim().is_empty() {
        return Err(BoardError::Invalid("Field label is required".to_string()));
    }

    if config.kind.has_options() {
        if config.options.is_empty() {
            return Err(BoardError::Invalid(format!(
                "Field type '{}' needs at least one option",
                config.kind
            )));
        }
        let mut seen = HashSet::new();
        for option in &config.options {
            if option.trim().is_empty() {
                return Err(BoardError::Invalid("Options cannot be empty".to_string()));
            }
            if !seen.insert(option.as_str()) {
                return Err(BoardError::Invalid(format!("Duplicate option '{}'", option)));
            }
        }
    } else if !config.options.is_empty() {
        return Err(BoardError::Invalid(format!(
            "Field type '{}' does not take options",
            config.kind
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field(name: &str, kind: FieldType, required: bool, order: i32) -> FieldConfig {
        FieldConfig {
            field_name: name.to_string(),
            label: name.to_uppercase(),
            kind,
            required,
            active: true,
            visible: true,
            options: if kind.has_options() {
                vec!["a".to_string(), "b".to_string()]
            } else {
                Vec::new()
            },
            order,
        }
    }

    fn values(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_defaults_follow_field_type() {
        assert_eq!(FieldType::Text.default_value(), json!(""));
        assert_eq!(FieldType::Checkbox.default_value(), json!(false));
        assert_eq!(FieldType::Multiselect.default_value(), json!([]));
        assert_eq!(FieldType::Date.default_value(), Value::Null);
    }

    #[test]
    fn test_build_keeps_active_fields_in_order() {
        let mut inactive = field("old", FieldType::Text, false, 0);
        inactive.active = false;
        let schema = FormSchema::build(&[
            field("b", FieldType::Text, false, 2),
            inactive,
            field("a", FieldType::Number, false, 1),
        ]);
        let names: Vec<&str> = schema.fields().iter().map(|f| f.field_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_validate_all_fills_defaults() {
        let schema = FormSchema::build(&[
            field("nota", FieldType::Textarea, false, 0),
            field("urgente", FieldType::Switch, false, 1),
        ]);
        let normalized = schema.validate_all(&Map::new()).unwrap();
        assert_eq!(normalized["nota"], json!(""));
        assert_eq!(normalized["urgente"], json!(false));
    }

    #[test]
    fn test_required_fields_are_reported_per_field() {
        let schema = FormSchema::build(&[
            field("cpf", FieldType::Text, true, 0),
            field("tags", FieldType::Multiselect, true, 1),
            field("aceite", FieldType::Checkbox, true, 2),
        ]);
        let err = schema
            .validate_all(&values(json!({"cpf": "  ", "aceite": false})))
            .unwrap_err();
        match err {
            BoardError::Fields(errors) => {
                assert!(errors.contains_key("cpf"));
                assert!(errors.contains_key("tags"));
                assert!(!errors.contains_key("aceite"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let schema = FormSchema::build(&[field("a", FieldType::Text, false, 0)]);
        let err = schema.validate_partial(&values(json!({"zzz": "1"}))).unwrap_err();
        assert!(matches!(err, BoardError::Fields(ref e) if e.contains_key("zzz")));
    }

    #[test]
    fn test_number_accepts_numeric_strings() {
        assert_eq!(FieldType::Number.coerce(&json!("42"), &[]).unwrap(), json!(42));
        assert_eq!(FieldType::Number.coerce(&json!("1,5"), &[]).unwrap(), json!(1.5));
        assert_eq!(FieldType::Number.coerce(&json!(""), &[]).unwrap(), Value::Null);
        assert!(FieldType::Number.coerce(&json!("abc"), &[]).is_err());
        assert!(FieldType::Number.coerce(&json!(true), &[]).is_err());
    }

    #[test]
    fn test_temporal_formats() {
        assert!(FieldType::Date.coerce(&json!("2024-02-29"), &[]).is_ok());
        assert!(FieldType::Date.coerce(&json!("29/02/2024"), &[]).is_err());
        assert!(FieldType::Datetime.coerce(&json!("2024-02-29T10:30"), &[]).is_ok());
        assert!(FieldType::Datetime.coerce(&json!("2024-02-29T10:30:00Z"), &[]).is_ok());
        assert!(FieldType::Time.coerce(&json!("23:59"), &[]).is_ok());
        assert!(FieldType::Time.coerce(&json!("24:01"), &[]).is_err());
    }

    #[test]
    fn test_email_check() {
        assert!(FieldType::Email.coerce(&json!("ana@cartorio.gov.br"), &[]).is_ok());
        assert!(FieldType::Email.coerce(&json!(""), &[]).is_ok());
        assert!(FieldType::Email.coerce(&json!("ana@"), &[]).is_err());
        assert!(FieldType::Email.coerce(&json!("a b@c.d"), &[]).is_err());
    }

    #[test]
    fn test_option_membership() {
        let options = vec!["a".to_string(), "b".to_string()];
        assert!(FieldType::Dropdown.coerce(&json!("a"), &options).is_ok());
        assert!(FieldType::Radio.coerce(&json!("c"), &options).is_err());
        assert_eq!(
            FieldType::Multiselect.coerce(&json!(["b", "a", "b"]), &options).unwrap(),
            json!(["b", "a"])
        );
        assert!(FieldType::Multiselect.coerce(&json!(["x"]), &options).is_err());
    }

    #[test]
    fn test_render_exposes_widgets() {
        let schema = FormSchema::build(&[field("tipo", FieldType::Dropdown, true, 0)]);
        let rendered = schema.render();
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].widget, Widget::Select);
        assert_eq!(rendered[0].options, vec!["a", "b"]);
    }

    #[test]
    fn test_definition_checks() {
        assert!(validate_definition(&field("cartorio", FieldType::Dropdown, false, 0)).is_ok());

        let mut bad_name = field("1x", FieldType::Text, false, 0);
        assert!(validate_definition(&bad_name).is_err());
        bad_name.field_name = "com espaco".to_string();
        assert!(validate_definition(&bad_name).is_err());

        let mut no_options = field("tipo", FieldType::Radio, false, 0);
        no_options.options.clear();
        assert!(validate_definition(&no_options).is_err());

        let mut dup = field("tipo", FieldType::Radio, false, 0);
        dup.options = vec!["a".to_string(), "a".to_string()];
        assert!(validate_definition(&dup).is_err());

        let mut stray = field("nota", FieldType::Text, false, 0);
        stray.options = vec!["a".to_string()];
        assert!(validate_definition(&stray).is_err());
    }

    #[test]
    fn test_route_segment_is_not_a_field_name() {
        for name in ["order", "Order"] {
            assert!(matches!(
                validate_definition(&field(name, FieldType::Text, false, 0)),
                Err(BoardError::Invalid(_))
            ));
        }
        assert!(validate_definition(&field("ordem", FieldType::Text, false, 0)).is_ok());
    }
}
