//! Field type dispatch.
//!
//! Every descriptor resolves to exactly one [`WidgetKind`]. The same
//! dispatch drives rendering (store -> control) and input handling
//! (control -> store), so both directions stay keyed by `descriptor.name`.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::InlineScope;
use crate::error::FormError;
use crate::inline::InlineGroupEngine;
use crate::layout;
use crate::render::{RenderField, RenderInlineGroup, RenderWidget};
use crate::spec::{FieldDescriptor, FieldKind, InlineSpec, SelectOption, SelectSpec};
use crate::store::{FieldValue, FileHandle, FormValueStore};
use crate::visibility::{VisibilityMap, is_visible};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Rendering strategy for a descriptor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WidgetKind<'a> {
    TextInput,
    Select(&'a SelectSpec),
    DatePicker,
    FileUpload,
    InlineGroup(&'a InlineSpec),
    None,
}

impl WidgetKind<'_> {
    pub fn label(&self) -> &'static str {
        match self {
            WidgetKind::TextInput => "text",
            WidgetKind::Select(spec) if spec.multiple => "choices",
            WidgetKind::Select(_) => "choice",
            WidgetKind::DatePicker => "date",
            WidgetKind::FileUpload => "files",
            WidgetKind::InlineGroup(_) => "inline entry",
            WidgetKind::None => "no",
        }
    }
}

pub fn resolve(field: &FieldDescriptor) -> WidgetKind<'_> {
    match &field.kind {
        FieldKind::Text => WidgetKind::TextInput,
        FieldKind::Select(spec) | FieldKind::ListOfValues(spec) => WidgetKind::Select(spec),
        FieldKind::DatePicker => WidgetKind::DatePicker,
        FieldKind::Upload => WidgetKind::FileUpload,
        FieldKind::InlineGroup(spec) => WidgetKind::InlineGroup(spec),
        FieldKind::Unknown => WidgetKind::None,
    }
}

/// Raw result handed back by an external widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum WidgetInput {
    Text(String),
    /// Selected option value; `None` when a clearable select is cleared.
    Choice(Option<String>),
    Choices(Vec<String>),
    /// `None` when the date picker is cleared.
    Date(Option<NaiveDate>),
    Files(Vec<FileHandle>),
}

impl WidgetInput {
    pub fn label(&self) -> &'static str {
        match self {
            WidgetInput::Text(_) => "text",
            WidgetInput::Choice(_) => "choice",
            WidgetInput::Choices(_) => "choices",
            WidgetInput::Date(_) => "date",
            WidgetInput::Files(_) => "files",
        }
    }
}

/// Finds the option currently selected for `value` by scanning `options`.
pub fn selected_option<'a>(options: &'a [SelectOption], value: &str) -> Option<&'a SelectOption> {
    options.iter().find(|option| option.value == value)
}

/// Converts widget input into a store value for `field` and writes it under
/// `field.name`. Returns the stored value.
pub fn apply_input(
    field: &FieldDescriptor,
    input: WidgetInput,
    store: &mut FormValueStore,
) -> Result<FieldValue, FormError> {
    if field.is_disabled {
        return Err(FormError::FieldDisabled(field.name.clone()));
    }
    let widget = resolve(field);
    let value = match (widget, input) {
        (WidgetKind::TextInput, WidgetInput::Text(text)) => FieldValue::Text(text),
        (WidgetKind::Select(spec), WidgetInput::Choice(Some(value))) if !spec.multiple => {
            ensure_option(field, spec, &value)?;
            FieldValue::Choice(value)
        }
        (WidgetKind::Select(spec), WidgetInput::Choice(None)) => {
            if !spec.is_clearable {
                return Err(FormError::NotClearable(field.name.clone()));
            }
            FieldValue::Empty
        }
        (WidgetKind::Select(spec), WidgetInput::Choices(values)) if spec.multiple => {
            for value in &values {
                ensure_option(field, spec, value)?;
            }
            FieldValue::Choices(values)
        }
        (WidgetKind::DatePicker, WidgetInput::Date(Some(date))) => FieldValue::Date(date),
        (WidgetKind::DatePicker, WidgetInput::Date(None)) => FieldValue::Empty,
        (WidgetKind::FileUpload, WidgetInput::Files(files)) => FieldValue::Files(files),
        (widget, input) => {
            return Err(FormError::InputMismatch {
                name: field.name.clone(),
                expected: widget.label(),
                got: input.label(),
            });
        }
    };
    store.write(&field.name, value.clone());
    Ok(value)
}

/// Reads a plain JSON value (as found in values files and submissions) into
/// the store representation of `field`.
pub fn value_from_json(field: &FieldDescriptor, value: &Value) -> Result<FieldValue, FormError> {
    if value.is_null() {
        return Ok(FieldValue::Empty);
    }
    let invalid = |message: String| FormError::InvalidValue {
        name: field.name.clone(),
        message,
    };
    match resolve(field) {
        WidgetKind::TextInput => Ok(match value {
            Value::String(text) => FieldValue::Text(text.clone()),
            other => FieldValue::Text(other.to_string()),
        }),
        WidgetKind::Select(spec) if spec.multiple => {
            let values = match value {
                Value::String(single) => vec![single.clone()],
                Value::Array(items) => items
                    .iter()
                    .map(|item| {
                        item.as_str()
                            .map(String::from)
                            .ok_or_else(|| invalid(format!("{} as an option value", item)))
                    })
                    .collect::<Result<Vec<_>, _>>()?,
                other => return Err(invalid(format!("{} as a list of options", other))),
            };
            for value in &values {
                ensure_option(field, spec, value)?;
            }
            Ok(FieldValue::Choices(values))
        }
        WidgetKind::Select(spec) => {
            let choice = value
                .as_str()
                .ok_or_else(|| invalid(format!("{} as an option value", value)))?;
            if choice.is_empty() {
                return Ok(FieldValue::Empty);
            }
            ensure_option(field, spec, choice)?;
            Ok(FieldValue::Choice(choice.to_string()))
        }
        WidgetKind::DatePicker => {
            let raw = value
                .as_str()
                .ok_or_else(|| invalid(format!("{} as a date", value)))?;
            if raw.is_empty() {
                return Ok(FieldValue::Empty);
            }
            NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .map(FieldValue::Date)
                .map_err(|_| invalid(format!("'{}' as a date (expected YYYY-MM-DD)", raw)))
        }
        WidgetKind::FileUpload => {
            let items = match value {
                Value::Array(items) => items.as_slice(),
                other => std::slice::from_ref(other),
            };
            items
                .iter()
                .map(|item| match item {
                    Value::String(name) => Ok(FileHandle::named(name.clone())),
                    other => serde_json::from_value::<FileHandle>(other.clone())
                        .map_err(|_| invalid(format!("{} as a file handle", other))),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(FieldValue::Files)
        }
        WidgetKind::InlineGroup(_) => Err(invalid("a single value; expected rows".into())),
        WidgetKind::None => Ok(FieldValue::from_plain_json(value)),
    }
}

fn ensure_option(field: &FieldDescriptor, spec: &SelectSpec, value: &str) -> Result<(), FormError> {
    if selected_option(spec.options(), value).is_some() {
        Ok(())
    } else {
        Err(FormError::UnknownOption {
            name: field.name.clone(),
            value: value.to_string(),
        })
    }
}

/// Read-only state a render pass needs.
pub struct RenderContext<'a> {
    pub store: &'a FormValueStore,
    pub inline: &'a InlineGroupEngine,
    pub visibility: &'a VisibilityMap,
    pub errors: &'a BTreeMap<String, String>,
}

/// Builds the render node for one descriptor, recursing into inline groups.
/// Hidden fields and unknown types render nothing.
pub fn render_field(field: &FieldDescriptor, ctx: &RenderContext<'_>) -> Option<RenderField> {
    if !is_visible(ctx.visibility, &field.name) || field.hidden() {
        return None;
    }
    let current = ctx.store.read(&field.name);
    let widget = match resolve(field) {
        WidgetKind::TextInput => RenderWidget::TextInput {
            value: current.map(ToString::to_string).unwrap_or_default(),
        },
        WidgetKind::Select(spec) => {
            if spec.options.is_none() {
                debug!(field = %field.name, "select rendered without options");
            }
            let selected = match current {
                Some(FieldValue::Choice(value)) => selected_option(spec.options(), value)
                    .cloned()
                    .into_iter()
                    .collect(),
                Some(FieldValue::Choices(values)) => values
                    .iter()
                    .filter_map(|value| selected_option(spec.options(), value).cloned())
                    .collect(),
                _ => Vec::new(),
            };
            RenderWidget::Select {
                options: spec.options().to_vec(),
                selected,
                clearable: spec.is_clearable,
                searchable: spec.is_searchable,
                multiple: spec.multiple,
            }
        }
        WidgetKind::DatePicker => RenderWidget::DatePicker {
            value: match current {
                Some(FieldValue::Date(date)) => Some(*date),
                _ => None,
            },
        },
        WidgetKind::FileUpload => RenderWidget::Upload {
            files: match current {
                Some(FieldValue::Files(files)) => files.clone(),
                _ => Vec::new(),
            },
        },
        WidgetKind::InlineGroup(spec) => render_inline(field, spec, ctx),
        WidgetKind::None => {
            debug!(field = %field.name, "skipping field of unknown type");
            return None;
        }
    };

    Some(RenderField {
        id: field.id.clone(),
        name: field.name.clone(),
        label: field.label.clone(),
        placeholder: field.placeholder.clone(),
        disabled: field.is_disabled,
        required: field.required(),
        span: layout::span_for(field.width),
        error: ctx.errors.get(&field.name).cloned(),
        widget,
    })
}

fn render_inline(field: &FieldDescriptor, spec: &InlineSpec, ctx: &RenderContext<'_>) -> RenderWidget {
    let per_group = ctx.inline.scope() == InlineScope::PerGroup;
    let groups = spec
        .form_fields
        .iter()
        .enumerate()
        .map(|(index, fields)| RenderInlineGroup {
            index,
            fields: fields
                .iter()
                .filter_map(|sub| render_field(sub, ctx))
                .collect(),
            table: if per_group {
                ctx.inline
                    .table(field, index)
                    .ok()
                    .filter(|table| !table.is_empty())
            } else {
                None
            },
        })
        .collect();
    let table = if per_group {
        None
    } else {
        ctx.inline
            .table(field, 0)
            .ok()
            .filter(|table| !table.is_empty())
    };
    RenderWidget::InlineGroup { groups, table }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colors() -> FieldDescriptor {
        FieldDescriptor::new(
            "f1",
            "color",
            "Color",
            FieldKind::Select(SelectSpec {
                options: Some(vec![
                    SelectOption::new("Red", "r"),
                    SelectOption::new("Green", "g"),
                ]),
                is_clearable: true,
                ..SelectSpec::default()
            }),
        )
    }

    #[test]
    fn dispatch_covers_every_variant() {
        let text = FieldDescriptor::new("a", "a", "A", FieldKind::Text);
        let date = FieldDescriptor::new("b", "b", "B", FieldKind::DatePicker);
        let upload = FieldDescriptor::new("c", "c", "C", FieldKind::Upload);
        let unknown = FieldDescriptor::new("d", "d", "D", FieldKind::Unknown);
        assert_eq!(resolve(&text), WidgetKind::TextInput);
        assert_eq!(resolve(&date), WidgetKind::DatePicker);
        assert_eq!(resolve(&upload), WidgetKind::FileUpload);
        assert_eq!(resolve(&unknown), WidgetKind::None);
        assert!(matches!(resolve(&colors()), WidgetKind::Select(_)));
    }

    #[test]
    fn select_stores_option_value_and_redisplays_by_value() {
        let mut field = colors();
        let mut store = FormValueStore::new();
        apply_input(&field, WidgetInput::Choice(Some("r".into())), &mut store).expect("select");
        assert_eq!(store.read("color"), Some(&FieldValue::Choice("r".into())));

        if let FieldKind::Select(spec) = &mut field.kind
            && let Some(options) = spec.options.as_mut()
        {
            options[0].label = "Crimson".into();
        }
        let inline = InlineGroupEngine::default();
        let visibility = VisibilityMap::new();
        let errors = BTreeMap::new();
        let ctx = RenderContext {
            store: &store,
            inline: &inline,
            visibility: &visibility,
            errors: &errors,
        };
        let rendered = render_field(&field, &ctx).expect("rendered");
        match rendered.widget {
            RenderWidget::Select { selected, .. } => {
                assert_eq!(selected, vec![SelectOption::new("Crimson", "r")]);
            }
            other => panic!("unexpected widget {:?}", other),
        }
    }

    #[test]
    fn select_rejects_unknown_values_and_clears_when_allowed() {
        let field = colors();
        let mut store = FormValueStore::new();
        let err = apply_input(&field, WidgetInput::Choice(Some("blue".into())), &mut store)
            .expect_err("unknown option");
        assert!(matches!(err, FormError::UnknownOption { .. }));
        assert_eq!(store.read("color"), None);

        apply_input(&field, WidgetInput::Choice(None), &mut store).expect("clear");
        assert_eq!(store.read("color"), Some(&FieldValue::Empty));
    }

    #[test]
    fn disabled_and_mismatched_inputs_are_rejected() {
        let text = FieldDescriptor::new("a", "a", "A", FieldKind::Text);
        let mut store = FormValueStore::new();
        let err = apply_input(&text, WidgetInput::Date(None), &mut store).expect_err("mismatch");
        assert!(matches!(
            err,
            FormError::InputMismatch {
                expected: "text",
                got: "date",
                ..
            }
        ));

        let disabled = text.clone().disabled();
        let err = apply_input(&disabled, WidgetInput::Text("x".into()), &mut store)
            .expect_err("disabled");
        assert!(matches!(err, FormError::FieldDisabled(_)));
        assert!(!store.contains("a"));
    }

    #[test]
    fn plain_json_values_follow_the_field_kind() {
        let date = FieldDescriptor::new("d", "due", "Due", FieldKind::DatePicker);
        assert_eq!(
            value_from_json(&date, &serde_json::json!("2024-02-29")).expect("date"),
            FieldValue::Date(NaiveDate::from_ymd_opt(2024, 2, 29).expect("ymd"))
        );
        let err = value_from_json(&date, &serde_json::json!("29/02/2024")).expect_err("format");
        assert!(matches!(err, FormError::InvalidValue { .. }));

        let upload = FieldDescriptor::new("u", "docs", "Docs", FieldKind::Upload);
        assert_eq!(
            value_from_json(&upload, &serde_json::json!(["a.pdf", { "name": "b.pdf", "size": 3 }]))
                .expect("files"),
            FieldValue::Files(vec![
                FileHandle::named("a.pdf"),
                FileHandle {
                    name: "b.pdf".into(),
                    path: None,
                    size: Some(3),
                },
            ])
        );

        assert!(matches!(
            value_from_json(&colors(), &serde_json::json!("blue")),
            Err(FormError::UnknownOption { .. })
        ));
        assert_eq!(
            value_from_json(&colors(), &Value::Null).expect("null"),
            FieldValue::Empty
        );
    }

    #[test]
    fn unknown_and_hidden_fields_render_nothing() {
        let store = FormValueStore::new();
        let inline = InlineGroupEngine::default();
        let visibility = VisibilityMap::new();
        let errors = BTreeMap::new();
        let ctx = RenderContext {
            store: &store,
            inline: &inline,
            visibility: &visibility,
            errors: &errors,
        };
        let unknown = FieldDescriptor::new("x", "x", "X", FieldKind::Unknown);
        let hidden = FieldDescriptor::new("y", "y", "Y", FieldKind::Text).hide();
        assert!(render_field(&unknown, &ctx).is_none());
        assert!(render_field(&hidden, &ctx).is_none());
    }
}
