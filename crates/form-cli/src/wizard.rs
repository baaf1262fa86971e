use serde_json::Value;

/// Controls which bits of state the fill loop prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Clean output: field prompts only.
    Clean,
    /// Verbose output: status, visible fields, error details.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

/// Prints prompts, tables, and the final submission for `dynform fill`.
pub struct FillPresenter {
    verbosity: Verbosity,
    header_printed: bool,
    show_state_json: bool,
}

impl FillPresenter {
    pub fn new(verbosity: Verbosity, show_state_json: bool) -> Self {
        Self {
            verbosity,
            header_printed: false,
            show_state_json,
        }
    }

    pub fn show_header(&mut self, payload: &FillPayload) {
        if self.header_printed {
            return;
        }
        println!("Form: {}", payload.title);
        self.header_printed = true;
    }

    pub fn show_status(&self, payload: &FillPayload) {
        if self.verbosity.is_verbose() {
            println!("Status: {}", payload.status);
            println!("Visible fields:");
            for field in &payload.fields {
                let mut entry = format!(" - {} ({}, {})", field.name, field.label, field.kind.label());
                if field.required {
                    entry.push_str(" [required]");
                }
                if field.disabled {
                    entry.push_str(" [disabled]");
                }
                println!("{}", entry);
            }
        } else if payload.fields.is_empty() {
            println!("No visible fields are available; check the schema.");
        }
    }

    pub fn show_prompt(&self, prompt: &PromptContext) {
        let mut line = format!("{}/{} {}", prompt.index, prompt.total, prompt.label);
        if prompt.required {
            line.push_str(" *");
        }
        if let Some(hint) = &prompt.hint {
            line.push(' ');
            line.push_str(hint);
        }
        println!("{}", line);
        if let Some(current) = &prompt.current {
            println!("Current: {} (press enter to keep)", current);
        }
        if let Some(error) = &prompt.error {
            println!("Problem: {}", error);
        }
        if !prompt.options.is_empty() {
            for (index, option) in prompt.options.iter().enumerate() {
                println!("  {}) {}", index + 1, option);
            }
        }
    }

    pub fn show_parse_error(&self, error: &AnswerParseError) {
        eprintln!("Invalid answer: {}", error.user_message);
        if self.verbosity.is_verbose()
            && let Some(debug) = &error.debug_message
        {
            eprintln!("  Expected: {}", debug);
        }
    }

    pub fn show_table(&self, label: &str, table: &Value) {
        let columns = table
            .get("columns")
            .and_then(Value::as_array)
            .map(|columns| {
                columns
                    .iter()
                    .filter_map(|column| column.get("label").and_then(Value::as_str))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        let rows = table
            .get("rows")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        println!("{} entries: # | {}", label, columns.join(" | "));
        for (index, row) in rows.iter().enumerate() {
            let cells = row
                .as_array()
                .map(|cells| {
                    cells
                        .iter()
                        .map(|cell| cell.as_str().unwrap_or_default())
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            println!("  {} | {}", index, cells.join(" | "));
        }
    }

    pub fn show_completion(&self, submission: &Value, state: &Value) {
        println!("Done ✅");
        match serde_json::to_string_pretty(submission) {
            Ok(pretty) => println!("{}", pretty),
            Err(err) => eprintln!("Failed to serialize submission to JSON: {}", err),
        }
        match serde_cbor::to_vec(submission) {
            Ok(bytes) => println!("Submission (CBOR hex): {}", encode_hex(&bytes)),
            Err(err) => eprintln!("Failed to serialize submission to CBOR: {}", err),
        }
        if self.show_state_json {
            match serde_json::to_string_pretty(state) {
                Ok(pretty) => println!("Session state:\n{}", pretty),
                Err(err) => eprintln!("Failed to serialize session state: {}", err),
            }
        }
    }
}

/// Render payload extracted from the component's JSON UI output.
pub struct FillPayload {
    pub title: String,
    pub status: String,
    pub fields: Vec<FillField>,
}

impl FillPayload {
    pub fn from_json(json: &Value) -> Result<Self, String> {
        let title = json
            .get("title")
            .and_then(Value::as_str)
            .ok_or_else(|| "form payload missing title".to_string())?
            .to_string();
        let status = json
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("editing")
            .to_string();
        let fields = json
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| "form payload missing fields".to_string())?
            .iter()
            .map(FillField::from_json)
            .collect::<Result<_, _>>()?;
        Ok(Self {
            title,
            status,
            fields,
        })
    }

    /// Finds a rendered field by name, descending into inline groups.
    pub fn field(&self, name: &str) -> Option<FillField> {
        self.fields
            .iter()
            .find_map(|field| find_rendered(&field.raw, name))
    }
}

fn find_rendered(raw: &Value, name: &str) -> Option<FillField> {
    if raw.get("name").and_then(Value::as_str) == Some(name) {
        return FillField::from_json(raw).ok();
    }
    raw.get("groups")
        .and_then(Value::as_array)?
        .iter()
        .filter_map(|group| group.get("fields").and_then(Value::as_array))
        .flatten()
        .find_map(|field| find_rendered(field, name))
}

/// Minimal view of a rendered field used for prompting.
#[derive(Debug, Clone)]
pub struct FillField {
    pub name: String,
    pub label: String,
    pub kind: FieldKindLabel,
    pub required: bool,
    pub disabled: bool,
    pub error: Option<String>,
    pub raw: Value,
}

impl FillField {
    pub fn from_json(value: &Value) -> Result<Self, String> {
        let name = value
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| "field missing name".to_string())?
            .to_string();
        let label = value
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or(&name)
            .to_string();
        let kind = FieldKindLabel::from_label(
            value
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("text"),
        );
        Ok(Self {
            label,
            kind,
            required: value
                .get("required")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            disabled: value
                .get("disabled")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            error: value
                .get("error")
                .and_then(Value::as_str)
                .map(String::from),
            raw: value.clone(),
            name,
        })
    }

    /// Labels of the options offered by a select field.
    pub fn option_labels(&self) -> Vec<String> {
        self.raw
            .get("options")
            .and_then(Value::as_array)
            .map(|options| {
                options
                    .iter()
                    .filter_map(|option| option.get("label").and_then(Value::as_str))
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Human-readable current value, if any.
    pub fn current(&self) -> Option<String> {
        let value = self.raw.get("value")?;
        let text = match value {
            Value::Null => return None,
            Value::String(text) => text.clone(),
            Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.get("label")
                        .or_else(|| item.get("name"))
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                })
                .collect::<Vec<_>>()
                .join(", "),
            Value::Object(_) => value
                .get("label")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            other => other.to_string(),
        };
        if text.is_empty() { None } else { Some(text) }
    }
}

/// Widget type reported by the JSON UI renderer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FieldKindLabel {
    Text,
    Select,
    Date,
    Upload,
    InlineGroup,
}

impl FieldKindLabel {
    fn from_label(label: &str) -> Self {
        match label {
            "select" => FieldKindLabel::Select,
            "date" => FieldKindLabel::Date,
            "upload" => FieldKindLabel::Upload,
            "inline_group" => FieldKindLabel::InlineGroup,
            _ => FieldKindLabel::Text,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FieldKindLabel::Text => "text",
            FieldKindLabel::Select => "select",
            FieldKindLabel::Date => "date",
            FieldKindLabel::Upload => "upload",
            FieldKindLabel::InlineGroup => "inline group",
        }
    }
}

/// Context used to format a single prompt.
pub struct PromptContext {
    pub index: usize,
    pub total: usize,
    pub label: String,
    pub required: bool,
    pub hint: Option<String>,
    pub current: Option<String>,
    pub error: Option<String>,
    pub options: Vec<String>,
}

impl PromptContext {
    pub fn new(field: &FillField, index: usize, total: usize) -> Self {
        let multiple = field
            .raw
            .get("multiple")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let clearable = field
            .raw
            .get("clearable")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let hint = match field.kind {
            FieldKindLabel::Select if multiple => {
                Some("(numbers, labels or values, comma-separated)".to_string())
            }
            FieldKindLabel::Select if clearable => {
                Some("(number, label or value; '-' clears)".to_string())
            }
            FieldKindLabel::Select => Some("(number, label or value)".to_string()),
            FieldKindLabel::Date => Some("(YYYY-MM-DD; '-' clears)".to_string()),
            FieldKindLabel::Upload => Some("(comma-separated file paths)".to_string()),
            FieldKindLabel::InlineGroup => Some("(add [group] / delete <index> [group] / done)".to_string()),
            FieldKindLabel::Text => field
                .raw
                .get("placeholder")
                .and_then(Value::as_str)
                .map(|placeholder| format!("<{}>", placeholder)),
        };
        Self {
            index,
            total,
            label: field.label.clone(),
            required: field.required,
            hint,
            current: field.current(),
            error: field.error.clone(),
            options: if field.kind == FieldKindLabel::Select {
                field.option_labels()
            } else {
                Vec::new()
            },
        }
    }
}

/// Error produced when parsing answers from the user.
#[derive(Debug)]
pub struct AnswerParseError {
    pub user_message: String,
    pub debug_message: Option<String>,
}

impl AnswerParseError {
    pub fn new(user_message: impl Into<String>, debug_message: Option<String>) -> Self {
        Self {
            user_message: user_message.into(),
            debug_message,
        }
    }
}

fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{:02x}", byte)).collect()
}
