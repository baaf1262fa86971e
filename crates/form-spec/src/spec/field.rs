use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One selectable entry of a `Select` / `ListOfValues` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Per-field validation rules declared by the schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct Validation {
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// Schema-declared display condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(default)]
    pub is_hidden: bool,
}

/// Payload shared by the selectable variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct SelectSpec {
    /// `None` is a schema shape mismatch; `Some(vec![])` is a valid empty selector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<SelectOption>>,
    #[serde(default)]
    pub is_clearable: bool,
    #[serde(default)]
    pub is_searchable: bool,
    #[serde(default)]
    pub multiple: bool,
}

impl SelectSpec {
    pub fn options(&self) -> &[SelectOption] {
        self.options.as_deref().unwrap_or_default()
    }
}

/// Payload of the repeatable inline group variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct InlineSpec {
    #[serde(default)]
    pub form_fields: Vec<Vec<FieldDescriptor>>,
}

impl InlineSpec {
    pub fn group(&self, index: usize) -> Option<&[FieldDescriptor]> {
        self.form_fields.get(index).map(Vec::as_slice)
    }

    /// Field list that defines the entry table columns for a pooled collection.
    pub fn first_group(&self) -> &[FieldDescriptor] {
        self.group(0).unwrap_or_default()
    }
}

/// Closed set of field variants, tagged by the `type` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type")]
pub enum FieldKind {
    #[serde(rename = "Input", alias = "Text")]
    Text,
    Select(SelectSpec),
    ListOfValues(SelectSpec),
    DatePicker,
    Upload,
    #[serde(rename = "InLineForm", alias = "InlineGroup")]
    InlineGroup(InlineSpec),
    #[serde(other)]
    Unknown,
}

impl FieldKind {
    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::Text => "Input",
            FieldKind::Select(_) => "Select",
            FieldKind::ListOfValues(_) => "ListOfValues",
            FieldKind::DatePicker => "DatePicker",
            FieldKind::Upload => "Upload",
            FieldKind::InlineGroup(_) => "InLineForm",
            FieldKind::Unknown => "Unknown",
        }
    }

    pub fn select(&self) -> Option<&SelectSpec> {
        match self {
            FieldKind::Select(spec) | FieldKind::ListOfValues(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn inline(&self) -> Option<&InlineSpec> {
        match self {
            FieldKind::InlineGroup(spec) => Some(spec),
            _ => None,
        }
    }
}

/// A single schema node: one form control or a nested inline group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub id: String,
    pub name: String,
    pub label: String,
    #[serde(
        default,
        rename = "placeHolder",
        alias = "placeholder",
        skip_serializing_if = "Option::is_none"
    )]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub is_disabled: bool,
    #[serde(default, alias = "isHide")]
    pub is_hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<Validation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(flatten)]
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        label: impl Into<String>,
        kind: FieldKind,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            label: label.into(),
            placeholder: None,
            is_disabled: false,
            is_hidden: false,
            width: None,
            validation: None,
            condition: None,
            kind,
        }
    }

    pub fn required(&self) -> bool {
        self.validation
            .as_ref()
            .map(|validation| validation.required)
            .unwrap_or(false)
    }

    pub fn hidden(&self) -> bool {
        self.is_hidden
            || self
                .condition
                .map(|condition| condition.is_hidden)
                .unwrap_or(false)
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.validation.get_or_insert_with(Validation::default).required = required;
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.is_disabled = true;
        self
    }

    pub fn hide(mut self) -> Self {
        self.is_hidden = true;
        self
    }
}
