use chrono::NaiveDate;
use serde_json::{Map, Value, json};

use crate::inline::EntryTable;
use crate::layout::{GRID_COLUMNS, pack_rows};
use crate::spec::SelectOption;
use crate::store::FileHandle;
use crate::validate::ValidationResult;

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// The form accepts input.
    Editing,
    /// The last submit attempt was blocked by validation.
    Invalid,
    /// A submission has been handed out.
    Submitted,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::Editing => "editing",
            RenderStatus::Invalid => "invalid",
            RenderStatus::Submitted => "submitted",
        }
    }
}

/// Control-specific part of a rendered field.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderWidget {
    TextInput {
        value: String,
    },
    Select {
        options: Vec<SelectOption>,
        selected: Vec<SelectOption>,
        clearable: bool,
        searchable: bool,
        multiple: bool,
    },
    DatePicker {
        value: Option<NaiveDate>,
    },
    Upload {
        files: Vec<FileHandle>,
    },
    InlineGroup {
        groups: Vec<RenderInlineGroup>,
        /// Shared table of a pooled inline field; `None` while it has no rows.
        table: Option<EntryTable>,
    },
}

impl RenderWidget {
    pub fn type_label(&self) -> &'static str {
        match self {
            RenderWidget::TextInput { .. } => "text",
            RenderWidget::Select { .. } => "select",
            RenderWidget::DatePicker { .. } => "date",
            RenderWidget::Upload { .. } => "upload",
            RenderWidget::InlineGroup { .. } => "inline_group",
        }
    }
}

/// One repeatable group of an inline field.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderInlineGroup {
    pub index: usize,
    pub fields: Vec<RenderField>,
    /// Per-group table, set only when groups own their collections.
    pub table: Option<EntryTable>,
}

/// A field ready to hand to a widget binding.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderField {
    pub id: String,
    pub name: String,
    pub label: String,
    pub placeholder: Option<String>,
    pub disabled: bool,
    pub required: bool,
    pub span: u8,
    pub error: Option<String>,
    pub widget: RenderWidget,
}

/// Collected payload shared by the text, JSON, and card renderers.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPayload {
    pub title: String,
    pub status: RenderStatus,
    pub fields: Vec<RenderField>,
    pub validation: Option<ValidationResult>,
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let fields = payload.fields.iter().map(field_json).collect::<Vec<_>>();
    let mut root = json!({
        "title": payload.title,
        "status": payload.status.as_str(),
        "columns": GRID_COLUMNS,
        "fields": fields,
    });
    if let Some(validation) = &payload.validation
        && let Some(map) = root.as_object_mut()
    {
        map.insert(
            "validation".into(),
            serde_json::to_value(validation).unwrap_or(Value::Null),
        );
    }
    root
}

fn field_json(field: &RenderField) -> Value {
    let mut map = Map::new();
    map.insert("id".into(), Value::String(field.id.clone()));
    map.insert("name".into(), Value::String(field.name.clone()));
    map.insert("label".into(), Value::String(field.label.clone()));
    map.insert("type".into(), Value::String(field.widget.type_label().into()));
    if let Some(placeholder) = &field.placeholder {
        map.insert("placeholder".into(), Value::String(placeholder.clone()));
    }
    map.insert("disabled".into(), Value::Bool(field.disabled));
    map.insert("required".into(), Value::Bool(field.required));
    map.insert("span".into(), json!(field.span));
    if let Some(error) = &field.error {
        map.insert("error".into(), Value::String(error.clone()));
    }

    match &field.widget {
        RenderWidget::TextInput { value } => {
            map.insert("value".into(), Value::String(value.clone()));
        }
        RenderWidget::Select {
            options,
            selected,
            clearable,
            searchable,
            multiple,
        } => {
            map.insert("options".into(), options_json(options));
            let value = if *multiple {
                options_json(selected)
            } else {
                selected
                    .first()
                    .map(option_json)
                    .unwrap_or(Value::Null)
            };
            map.insert("value".into(), value);
            map.insert("clearable".into(), Value::Bool(*clearable));
            map.insert("searchable".into(), Value::Bool(*searchable));
            map.insert("multiple".into(), Value::Bool(*multiple));
        }
        RenderWidget::DatePicker { value } => {
            map.insert(
                "value".into(),
                value
                    .map(|date| Value::String(date.format("%Y-%m-%d").to_string()))
                    .unwrap_or(Value::Null),
            );
        }
        RenderWidget::Upload { files } => {
            map.insert(
                "value".into(),
                serde_json::to_value(files).unwrap_or(Value::Null),
            );
        }
        RenderWidget::InlineGroup { groups, table } => {
            let groups = groups
                .iter()
                .map(|group| {
                    json!({
                        "index": group.index,
                        "fields": group.fields.iter().map(field_json).collect::<Vec<_>>(),
                        "table": group.table.as_ref().map(table_json),
                    })
                })
                .collect::<Vec<_>>();
            map.insert("groups".into(), Value::Array(groups));
            map.insert(
                "table".into(),
                table.as_ref().map(table_json).unwrap_or(Value::Null),
            );
        }
    }
    Value::Object(map)
}

fn option_json(option: &SelectOption) -> Value {
    json!({ "label": option.label, "value": option.value })
}

fn options_json(options: &[SelectOption]) -> Value {
    Value::Array(options.iter().map(option_json).collect())
}

fn table_json(table: &EntryTable) -> Value {
    json!({
        "columns": table
            .columns
            .iter()
            .map(|column| json!({ "id": column.id, "name": column.name, "label": column.label }))
            .collect::<Vec<_>>(),
        "rows": table.rows,
    })
}

/// Render the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Form: {}", payload.title));
    lines.push(format!("Status: {}", payload.status.as_str()));
    if let Some(validation) = &payload.validation
        && !validation.valid
    {
        lines.push(format!("Problems: {}", validation.summary()));
    }

    let spans = payload
        .fields
        .iter()
        .map(|field| field.span)
        .collect::<Vec<_>>();
    for (row_index, row) in pack_rows(&spans, GRID_COLUMNS).into_iter().enumerate() {
        lines.push(format!("Row {}:", row_index + 1));
        for field in &payload.fields[row] {
            text_field(field, "  ", &mut lines);
        }
    }

    lines.join("\n")
}

fn text_field(field: &RenderField, indent: &str, lines: &mut Vec<String>) {
    let mut entry = format!("{}- {} [{}", indent, field.label, field.name);
    entry.push_str(&format!(", span {}]", field.span));
    if field.required {
        entry.push_str(" *");
    }
    if field.disabled {
        entry.push_str(" (disabled)");
    }
    match &field.widget {
        RenderWidget::TextInput { value } => {
            if value.is_empty() {
                if let Some(placeholder) = &field.placeholder {
                    entry.push_str(&format!(" <{}>", placeholder));
                }
            } else {
                entry.push_str(&format!(" = {}", value));
            }
        }
        RenderWidget::Select {
            options, selected, ..
        } => {
            if selected.is_empty() {
                let labels = options
                    .iter()
                    .map(|option| option.label.as_str())
                    .collect::<Vec<_>>();
                entry.push_str(&format!(" choose from: {}", labels.join(" / ")));
            } else {
                let labels = selected
                    .iter()
                    .map(|option| option.label.as_str())
                    .collect::<Vec<_>>();
                entry.push_str(&format!(" = {}", labels.join(", ")));
            }
        }
        RenderWidget::DatePicker { value } => {
            if let Some(date) = value {
                entry.push_str(&format!(" = {}", date.format("%Y-%m-%d")));
            }
        }
        RenderWidget::Upload { files } => {
            if !files.is_empty() {
                let names = files
                    .iter()
                    .map(|file| file.name.as_str())
                    .collect::<Vec<_>>();
                entry.push_str(&format!(" = {}", names.join(", ")));
            }
        }
        RenderWidget::InlineGroup { .. } => {}
    }
    if let Some(error) = &field.error {
        entry.push_str(&format!(" !! {}", error));
    }
    lines.push(entry);

    if let RenderWidget::InlineGroup { groups, table } = &field.widget {
        let nested = format!("{}    ", indent);
        for group in groups {
            lines.push(format!("{}  Group {}:", indent, group.index + 1));
            for sub in &group.fields {
                text_field(sub, &nested, lines);
            }
            if let Some(table) = &group.table {
                text_table(table, &nested, lines);
            }
        }
        if let Some(table) = table {
            text_table(table, &format!("{}  ", indent), lines);
        }
    }
}

fn text_table(table: &EntryTable, indent: &str, lines: &mut Vec<String>) {
    let header = table
        .columns
        .iter()
        .map(|column| column.label.as_str())
        .collect::<Vec<_>>();
    lines.push(format!("{}Entries: # | {}", indent, header.join(" | ")));
    for (index, row) in table.rows.iter().enumerate() {
        lines.push(format!("{}  {} | {}", indent, index, row.join(" | ")));
    }
}

/// Render the payload as an Adaptive Card v1.3 transport.
pub fn render_card(payload: &RenderPayload) -> Value {
    let mut body = Vec::new();

    body.push(json!({
        "type": "TextBlock",
        "text": payload.title,
        "weight": "Bolder",
        "size": "Large",
        "wrap": true,
    }));

    if let Some(validation) = &payload.validation
        && !validation.valid
    {
        body.push(json!({
            "type": "TextBlock",
            "text": validation.summary(),
            "color": "Attention",
            "wrap": true,
        }));
    }

    let mut actions = Vec::new();
    for field in &payload.fields {
        body.push(card_field(field, &mut actions));
    }

    actions.push(json!({
        "type": "Action.Submit",
        "title": "Submit",
        "data": { "event": "submit" }
    }));

    json!({
        "$schema": "http://adaptivecards.io/schemas/adaptive-card.json",
        "type": "AdaptiveCard",
        "version": "1.3",
        "body": body,
        "actions": actions,
    })
}

fn card_field(field: &RenderField, actions: &mut Vec<Value>) -> Value {
    let mut items = vec![json!({
        "type": "TextBlock",
        "text": if field.required { format!("{} *", field.label) } else { field.label.clone() },
        "weight": "Bolder",
        "wrap": true,
    })];
    if let Some(input) = card_input(field) {
        items.push(input);
    }
    if let RenderWidget::InlineGroup { groups, table } = &field.widget {
        for group in groups {
            for sub in &group.fields {
                items.push(card_field(sub, actions));
            }
            actions.push(json!({
                "type": "Action.Submit",
                "title": format!("Add {}", field.label),
                "data": { "event": "add_entry", "field": field.name, "group": group.index }
            }));
            if let Some(table) = &group.table {
                items.extend(card_table(&field.name, group.index, table));
            }
        }
        if let Some(table) = table {
            items.extend(card_table(&field.name, 0, table));
        }
    }
    if let Some(error) = &field.error {
        items.push(json!({
            "type": "TextBlock",
            "text": error,
            "color": "Attention",
            "spacing": "Small",
            "wrap": true,
        }));
    }
    json!({
        "type": "Container",
        "id": field.id,
        "items": items,
    })
}

fn card_input(field: &RenderField) -> Option<Value> {
    let mut map = Map::new();
    map.insert("id".into(), Value::String(field.name.clone()));
    map.insert("isRequired".into(), Value::Bool(field.required));
    if field.disabled {
        map.insert("isEnabled".into(), Value::Bool(false));
    }
    if let Some(placeholder) = &field.placeholder {
        map.insert("placeholder".into(), Value::String(placeholder.clone()));
    }
    match &field.widget {
        RenderWidget::TextInput { value } => {
            map.insert("type".into(), Value::String("Input.Text".into()));
            map.insert("value".into(), Value::String(value.clone()));
        }
        RenderWidget::Select {
            options,
            selected,
            multiple,
            ..
        } => {
            map.insert("type".into(), Value::String("Input.ChoiceSet".into()));
            map.insert("style".into(), Value::String("compact".into()));
            map.insert("isMultiSelect".into(), Value::Bool(*multiple));
            let choices = options
                .iter()
                .map(|option| json!({ "title": option.label, "value": option.value }))
                .collect::<Vec<_>>();
            map.insert("choices".into(), Value::Array(choices));
            if !selected.is_empty() {
                let value = selected
                    .iter()
                    .map(|option| option.value.as_str())
                    .collect::<Vec<_>>()
                    .join(",");
                map.insert("value".into(), Value::String(value));
            }
        }
        RenderWidget::DatePicker { value } => {
            map.insert("type".into(), Value::String("Input.Date".into()));
            if let Some(date) = value {
                map.insert(
                    "value".into(),
                    Value::String(date.format("%Y-%m-%d").to_string()),
                );
            }
        }
        RenderWidget::Upload { files } => {
            // Adaptive Cards have no file input; list the handles instead.
            let names = files
                .iter()
                .map(|file| file.name.as_str())
                .collect::<Vec<_>>();
            return Some(json!({
                "type": "TextBlock",
                "text": if names.is_empty() { "No files selected".to_string() } else { names.join(", ") },
                "isSubtle": true,
                "wrap": true,
            }));
        }
        RenderWidget::InlineGroup { .. } => return None,
    }
    Some(Value::Object(map))
}

/// Rows as a FactSet followed by one delete button per row. Button data is a
/// ready-to-apply `delete_entry` event.
fn card_table(field: &str, group: usize, table: &EntryTable) -> Vec<Value> {
    let facts = table
        .rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let value = table
                .columns
                .iter()
                .zip(row)
                .map(|(column, cell)| format!("{}: {}", column.label, cell))
                .collect::<Vec<_>>()
                .join(", ");
            json!({ "title": format!("#{}", index), "value": value })
        })
        .collect::<Vec<_>>();
    let deletes = (0..table.rows.len())
        .map(|index| {
            json!({
                "type": "Action.Submit",
                "title": format!("Delete #{}", index),
                "data": { "event": "delete_entry", "field": field, "group": group, "index": index }
            })
        })
        .collect::<Vec<_>>();
    vec![
        json!({
            "type": "FactSet",
            "facts": facts,
        }),
        json!({
            "type": "ActionSet",
            "actions": deletes,
        }),
    ]
}
