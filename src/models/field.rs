use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use validator::Validate;

/// Field names that exist on every variant and cannot be edited or deleted.
pub const PROTECTED_FIELDS: [&str; 3] = ["name", "atendente", "pendencias"];

/// Names taken by fixed routes under `/fields`.
pub const RESERVED_FIELD_NAMES: [&str; 1] = ["order"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Email,
    Number,
    Date,
    Datetime,
    Time,
    Checkbox,
    Switch,
    Radio,
    Dropdown,
    Multiselect,
    Textarea,
}

impl FieldType {
    pub const ALL: [FieldType; 12] = [
        Self::Text,
        Self::Email,
        Self::Number,
        Self::Date,
        Self::Datetime,
        Self::Time,
        Self::Checkbox,
        Self::Switch,
        Self::Radio,
        Self::Dropdown,
        Self::Multiselect,
        Self::Textarea,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Email => "email",
            Self::Number => "number",
            Self::Date => "date",
            Self::Datetime => "datetime",
            Self::Time => "time",
            Self::Checkbox => "checkbox",
            Self::Switch => "switch",
            Self::Radio => "radio",
            Self::Dropdown => "dropdown",
            Self::Multiselect => "multiselect",
            Self::Textarea => "textarea",
        }
    }

    /// Kinds whose values must come from `options`.
    pub fn has_options(&self) -> bool {
        matches!(self, Self::Radio | Self::Dropdown | Self::Multiselect)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Invalid field type: {}", s))
    }
}

/// Describes one dynamic card attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FieldConfig {
    #[serde(rename = "fieldName")]
    pub field_name: String,
    #[serde(rename = "nome")]
    pub label: String,
    #[serde(rename = "tipo")]
    pub kind: FieldType,
    #[serde(rename = "obrigatorio")]
    pub required: bool,
    #[serde(rename = "ativo")]
    pub active: bool,
    pub visible: bool,
    pub options: Vec<String>,
    pub order: i32,
}

impl FieldConfig {
    pub fn is_protected(&self) -> bool {
        is_protected(&self.field_name)
    }
}

pub fn is_protected(field_name: &str) -> bool {
    PROTECTED_FIELDS.contains(&field_name)
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateFieldRequest {
    #[serde(rename = "fieldName")]
    #[validate(length(min = 1, max = 64, message = "Field name must have 1 to 64 characters"))]
    pub field_name: String,
    #[serde(rename = "nome")]
    #[validate(length(min = 1, max = 120, message = "Label must have 1 to 120 characters"))]
    pub label: String,
    #[serde(rename = "tipo")]
    pub kind: FieldType,
    #[serde(rename = "obrigatorio", default)]
    pub required: bool,
    #[serde(rename = "ativo", default = "default_true")]
    pub active: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub options: Vec<String>,
    /// Appended after the last field when absent.
    pub order: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateFieldRequest {
    #[serde(rename = "nome")]
    #[validate(length(min = 1, max = 120, message = "Label must have 1 to 120 characters"))]
    pub label: Option<String>,
    #[serde(rename = "tipo")]
    pub kind: Option<FieldType>,
    #[serde(rename = "obrigatorio")]
    pub required: Option<bool>,
    #[serde(rename = "ativo")]
    pub active: Option<bool>,
    pub visible: Option<bool>,
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ReorderFieldsRequest {
    /// Field names in their new display order.
    pub order: Vec<String>,
}

/// Input control a form should render for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Widget {
    TextInput,
    EmailInput,
    NumberInput,
    DateInput,
    DateTimeInput,
    TimeInput,
    Checkbox,
    Switch,
    RadioGroup,
    Select,
    MultiSelect,
    TextArea,
}

/// One rendered entry of the form schema.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    pub field_name: String,
    pub label: String,
    pub kind: FieldType,
    pub widget: Widget,
    pub required: bool,
    pub visible: bool,
    pub options: Vec<String>,
    #[schema(value_type = Object)]
    pub default: Value,
}
