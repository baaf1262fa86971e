mod wizard;

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use component_form::{
    apply_event, render_card as component_render_card, render_json_ui, submit as component_submit,
};
use form_spec::{
    FormOptions, FormSchema, FormSession, Severity, ValidationResult, render_card,
    render_json_ui as form_render_json_ui, render_text,
};
use serde_json::{Map, Value, json};
use tracing::Level;
use wizard::{
    AnswerParseError, FieldKindLabel, FillField, FillPayload, FillPresenter, PromptContext,
    Verbosity,
};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const CONFIG_ENV: &str = "DYNFORM_CONFIG";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Schema-driven form CLI",
    long_about = "Renders, fills, validates, and checks form schemas backed by the form component"
)]
struct Cli {
    /// JSON file with form options (defaults to the DYNFORM_CONFIG environment variable).
    #[arg(long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,
    /// Show verbose output (statuses, visible fields, debug logs).
    #[arg(long, global = true, alias = "debug")]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RenderMode {
    Text,
    Card,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Render a form schema once, optionally prefilled with values.
    Render {
        /// Path to the form schema JSON.
        #[arg(long, value_name = "SCHEMA")]
        schema: PathBuf,
        /// Optional JSON file with field values keyed by name.
        #[arg(long, value_name = "VALUES")]
        values: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Fill a form interactively in a text shell and print the submission.
    Fill {
        /// Path to the form schema JSON.
        #[arg(long, value_name = "SCHEMA")]
        schema: PathBuf,
        /// Optional JSON file with initial field values.
        #[arg(long, value_name = "VALUES")]
        values: Option<PathBuf>,
        /// Also print the final session state JSON.
        #[arg(long)]
        answers_json: bool,
        /// Render output shown before each pass over the form.
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Validate a values file against a form schema.
    Validate {
        /// Path to the form schema JSON.
        #[arg(long, value_name = "SCHEMA")]
        schema: PathBuf,
        /// Path to the values JSON file.
        #[arg(long, value_name = "VALUES")]
        values: PathBuf,
    },
    /// Check a form schema for duplicate names, missing options, and similar issues.
    Check {
        /// Path to the form schema JSON.
        #[arg(long, value_name = "SCHEMA")]
        schema: PathBuf,
    },
    /// Print the JSON Schema of the form schema format.
    Schema,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Render {
            schema,
            values,
            format,
        } => {
            let options = load_options(cli.config.as_deref())?;
            run_render(&schema, values.as_deref(), options, format)
        }
        Command::Fill {
            schema,
            values,
            answers_json,
            format,
        } => {
            let options = load_options(cli.config.as_deref())?;
            run_fill(
                &schema,
                values.as_deref(),
                options,
                cli.verbose,
                answers_json,
                format,
            )
        }
        Command::Validate { schema, values } => {
            let options = load_options(cli.config.as_deref())?;
            run_validate(&schema, &values, options)
        }
        Command::Check { schema } => run_check(&schema),
        Command::Schema => run_schema(),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn load_options(path: Option<&Path>) -> CliResult<FormOptions> {
    let path = match path {
        Some(path) => Some(path.to_path_buf()),
        None => env::var_os(CONFIG_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from),
    };
    match path {
        Some(path) => {
            let contents = fs::read_to_string(&path)
                .map_err(|err| format!("failed to read config {}: {}", path.display(), err))?;
            Ok(FormOptions::from_json_str(&contents)?)
        }
        None => Ok(FormOptions::default()),
    }
}

fn load_schema(path: &Path) -> CliResult<(String, FormSchema)> {
    let contents = fs::read_to_string(path)?;
    let schema = FormSchema::from_json_str(&contents)?;
    Ok((contents, schema))
}

fn open_session(
    schema: FormSchema,
    options: FormOptions,
    values: Option<&Path>,
) -> CliResult<FormSession> {
    let mut session = FormSession::new(schema, options)?;
    if let Some(path) = values {
        let contents = fs::read_to_string(path)?;
        let values: Value = serde_json::from_str(&contents)?;
        session.load_values(&values)?;
    }
    Ok(session)
}

fn run_render(
    schema_path: &Path,
    values_path: Option<&Path>,
    options: FormOptions,
    format: RenderMode,
) -> CliResult<()> {
    let (_, schema) = load_schema(schema_path)?;
    let session = open_session(schema, options, values_path)?;
    let payload = session.render();
    match format {
        RenderMode::Text => println!("{}", render_text(&payload)),
        RenderMode::Json => println!(
            "{}",
            serde_json::to_string_pretty(&form_render_json_ui(&payload))?
        ),
        RenderMode::Card => println!("{}", serde_json::to_string_pretty(&render_card(&payload))?),
    }
    Ok(())
}

fn run_validate(schema_path: &Path, values_path: &Path, options: FormOptions) -> CliResult<()> {
    let (_, schema) = load_schema(schema_path)?;
    let session = open_session(schema, options, Some(values_path))?;

    let result = session.validate();
    println!(
        "Validation result: {}",
        if result.valid { "valid" } else { "invalid" }
    );
    describe_validation(&result);

    if result.valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_validation(result: &ValidationResult) {
    if !result.errors.is_empty() {
        println!("Errors:");
        for error in &result.errors {
            println!("  {} - {}", error.path, error.message);
        }
    }
    if !result.missing_required.is_empty() {
        println!(
            "Missing required fields: {}",
            result.missing_required.join(", ")
        );
    }
    if !result.unknown_fields.is_empty() {
        println!("Unknown fields: {}", result.unknown_fields.join(", "));
    }
}

fn run_check(schema_path: &Path) -> CliResult<()> {
    let (_, schema) = load_schema(schema_path)?;
    let report = form_spec::check_schema(&schema);
    if report.issues.is_empty() {
        println!(
            "Schema OK: {} ({} fields)",
            schema.title,
            schema.all_fields().len()
        );
        return Ok(());
    }
    for issue in &report.issues {
        let severity = match issue.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        println!(
            "[{}] {} ({}): {}",
            severity, issue.path, issue.code, issue.message
        );
    }
    if report.has_errors() {
        Err("schema check failed".into())
    } else {
        Ok(())
    }
}

fn run_schema() -> CliResult<()> {
    let schema = schemars::schema_for!(FormSchema);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn run_fill(
    schema_path: &Path,
    values_path: Option<&Path>,
    options: FormOptions,
    verbose: bool,
    answers_json: bool,
    format: RenderMode,
) -> CliResult<()> {
    let (schema_str, schema) = load_schema(schema_path)?;
    let config_json = json!({ "form_schema_json": schema_str, "options": options }).to_string();

    let mut state = match values_path {
        Some(path) => {
            let session = open_session(schema, options, Some(path))?;
            serde_json::to_value(session.state())?
        }
        None => Value::Object(Map::new()),
    };

    let mut presenter = FillPresenter::new(Verbosity::from_verbose(verbose), answers_json);
    let mut revisit: Option<BTreeSet<String>> = None;

    loop {
        let ui_raw = render_json_ui(&config_json, &state.to_string());
        let ui = parse_component_result(&ui_raw)?;
        print_render_output(format, &config_json, &state, &ui_raw);
        let payload =
            FillPayload::from_json(&ui).map_err(|err| format!("form UI error: {}", err))?;
        presenter.show_header(&payload);
        presenter.show_status(&payload);

        let targets = payload
            .fields
            .iter()
            .filter(|field| !field.disabled)
            .filter(|field| {
                revisit
                    .as_ref()
                    .map(|names| names.contains(&field.name))
                    .unwrap_or(true)
            })
            .cloned()
            .collect::<Vec<_>>();
        let total = targets.len();
        for (position, field) in targets.iter().enumerate() {
            let prompt = PromptContext::new(field, position + 1, total);
            state = match field.kind {
                FieldKindLabel::InlineGroup => {
                    fill_inline(&config_json, state, field, &prompt, &presenter)?
                }
                _ => fill_field(&config_json, state, field, &prompt, &presenter)?,
            };
        }

        let response =
            parse_component_result(&component_submit(&config_json, &state.to_string()))?;
        state = response["state"].clone();
        if response["status"] == "complete" {
            presenter.show_completion(&response["submission"], &state);
            return Ok(());
        }

        let details = gather_validation_details(&response);
        print_validation_errors(&details);
        let names = details.fields_to_revisit();
        if names.is_empty() {
            return Err(format!(
                "values contain unknown fields: {}",
                details.unknown_fields.join(", ")
            )
            .into());
        }
        revisit = Some(names);
    }
}

fn fill_field(
    config_json: &str,
    mut state: Value,
    field: &FillField,
    prompt: &PromptContext,
    presenter: &FillPresenter,
) -> CliResult<Value> {
    loop {
        presenter.show_prompt(prompt);
        let raw = read_answer()?;
        let input = match parse_input(field, &raw) {
            Ok(Some(input)) => input,
            Ok(None) => return Ok(state),
            Err(err) => {
                presenter.show_parse_error(&err);
                continue;
            }
        };
        let event = json!({ "event": "input", "name": field.name, "input": input });
        match send_event(config_json, &state, &event) {
            Ok(response) => {
                state = response["state"].clone();
                return Ok(state);
            }
            Err(err) => eprintln!("Rejected: {}", err),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum InlineCommand {
    Done,
    Add(usize),
    /// Entry index, then 0-based group.
    Delete(usize, usize),
    Unknown,
}

fn parse_inline_command(raw: &str) -> InlineCommand {
    let mut parts = raw.split_whitespace();
    let verb = parts.next().unwrap_or("done").to_lowercase();
    let first = parts.next().map(str::parse::<usize>);
    let second = parts.next().map(str::parse::<usize>);
    if parts.next().is_some() {
        return InlineCommand::Unknown;
    }
    match (verb.as_str(), first, second) {
        ("done" | "d" | "", None, None) => InlineCommand::Done,
        ("add" | "a", None, None) => InlineCommand::Add(0),
        ("add" | "a", Some(Ok(group)), None) if group > 0 => InlineCommand::Add(group - 1),
        ("delete" | "del" | "rm", Some(Ok(index)), None) => InlineCommand::Delete(index, 0),
        ("delete" | "del" | "rm", Some(Ok(index)), Some(Ok(group))) if group > 0 => {
            InlineCommand::Delete(index, group - 1)
        }
        _ => InlineCommand::Unknown,
    }
}

fn fill_inline(
    config_json: &str,
    mut state: Value,
    field: &FillField,
    prompt: &PromptContext,
    presenter: &FillPresenter,
) -> CliResult<Value> {
    loop {
        let ui = parse_component_result(&render_json_ui(config_json, &state.to_string()))?;
        let payload =
            FillPayload::from_json(&ui).map_err(|err| format!("form UI error: {}", err))?;
        let current = payload.field(&field.name).unwrap_or_else(|| field.clone());
        presenter.show_prompt(prompt);
        show_inline_tables(presenter, &current);

        let raw = read_answer()?;
        match parse_inline_command(&raw) {
            InlineCommand::Done => return Ok(state),
            InlineCommand::Add(group) => {
                let Some(fields) = current.raw["groups"]
                    .get(group)
                    .and_then(|group| group["fields"].as_array())
                else {
                    eprintln!("{} has no group {}", field.label, group + 1);
                    continue;
                };
                let subfields = fields
                    .iter()
                    .map(FillField::from_json)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|err| format!("form UI error: {}", err))?;
                let editable = subfields
                    .iter()
                    .filter(|sub| !sub.disabled)
                    .collect::<Vec<_>>();
                for (position, sub) in editable.iter().enumerate() {
                    let sub_prompt = PromptContext::new(sub, position + 1, editable.len());
                    state = match sub.kind {
                        FieldKindLabel::InlineGroup => {
                            fill_inline(config_json, state, sub, &sub_prompt, presenter)?
                        }
                        _ => fill_field(config_json, state, sub, &sub_prompt, presenter)?,
                    };
                }
                let event = json!({ "event": "add_entry", "field": field.name, "group": group });
                match send_event(config_json, &state, &event) {
                    Ok(response) => {
                        state = response["state"].clone();
                        println!("Added entry #{}", response["outcome"]["index"]);
                    }
                    Err(err) => eprintln!("Rejected: {}", err),
                }
            }
            InlineCommand::Delete(index, group) => {
                let event = json!({
                    "event": "delete_entry",
                    "field": field.name,
                    "group": group,
                    "index": index,
                });
                match send_event(config_json, &state, &event) {
                    Ok(response) => {
                        state = response["state"].clone();
                        if response["outcome"]["removed"].is_null() {
                            println!("No entry at index {}", index);
                        } else {
                            println!("Deleted entry #{}", index);
                        }
                    }
                    Err(err) => eprintln!("Rejected: {}", err),
                }
            }
            InlineCommand::Unknown => {
                eprintln!("Type add [group], delete <index> [group], or done.");
            }
        }
    }
}

fn show_inline_tables(presenter: &FillPresenter, field: &FillField) {
    if let Some(table) = field.raw.get("table").filter(|table| table.is_object()) {
        presenter.show_table(&field.label, table);
    }
    if let Some(groups) = field.raw.get("groups").and_then(Value::as_array) {
        for (index, group) in groups.iter().enumerate() {
            if let Some(table) = group.get("table").filter(|table| table.is_object()) {
                presenter.show_table(&format!("{} (group {})", field.label, index + 1), table);
            }
        }
    }
}

fn send_event(config_json: &str, state: &Value, event: &Value) -> CliResult<Value> {
    let response = parse_component_result(&apply_event(
        config_json,
        &state.to_string(),
        &event.to_string(),
    ))?;
    if response["status"] == "error" {
        let details = gather_validation_details(&response);
        print_validation_errors(&details);
        return Err("event rejected by validation".into());
    }
    Ok(response)
}

fn parse_component_result(response: &str) -> CliResult<Value> {
    let value: Value = serde_json::from_str(response)?;
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        Err(error.into())
    } else {
        Ok(value)
    }
}

fn read_answer() -> CliResult<String> {
    print!("> ");
    io::stdout().flush()?;
    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 {
        return Err("input closed before the form was submitted".into());
    }
    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case("exit") {
        return Err("fill aborted by user".into());
    }
    Ok(trimmed.to_string())
}

/// Turns a typed answer into the widget input JSON the component expects.
/// `Ok(None)` keeps the current value.
fn parse_input(field: &FillField, raw: &str) -> Result<Option<Value>, AnswerParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        if field.required && field.current().is_none() {
            return Err(AnswerParseError::new("This field requires an answer.", None));
        }
        return Ok(None);
    }

    match field.kind {
        FieldKindLabel::Text => Ok(Some(json!({ "kind": "text", "value": raw }))),
        FieldKindLabel::Select => parse_select(field, raw).map(Some),
        FieldKindLabel::Date => parse_date(raw).map(Some),
        FieldKindLabel::Upload => Ok(Some(parse_upload(raw))),
        FieldKindLabel::InlineGroup => Ok(None),
    }
}

fn parse_select(field: &FillField, raw: &str) -> Result<Value, AnswerParseError> {
    let options = field
        .raw
        .get("options")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let multiple = field.raw["multiple"].as_bool().unwrap_or(false);
    let clearable = field.raw["clearable"].as_bool().unwrap_or(false);

    if raw == "-" {
        if multiple {
            return Ok(json!({ "kind": "choices", "value": [] }));
        }
        if !clearable {
            return Err(AnswerParseError::new(
                "This selection cannot be cleared.",
                None,
            ));
        }
        return Ok(json!({ "kind": "choice", "value": null }));
    }

    if multiple {
        let values = raw
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| resolve_option(&options, token))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(json!({ "kind": "choices", "value": values }))
    } else {
        let value = resolve_option(&options, raw)?;
        Ok(json!({ "kind": "choice", "value": value }))
    }
}

/// Matches an option by value, then label, then 1-based position.
fn resolve_option(options: &[Value], token: &str) -> Result<String, AnswerParseError> {
    let value_of = |option: &Value| option["value"].as_str().map(String::from);
    if let Some(value) = options
        .iter()
        .find(|option| option["value"].as_str() == Some(token))
        .and_then(value_of)
    {
        return Ok(value);
    }
    if let Some(value) = options
        .iter()
        .find(|option| {
            option["label"]
                .as_str()
                .is_some_and(|label| label.eq_ignore_ascii_case(token))
        })
        .and_then(value_of)
    {
        return Ok(value);
    }
    if let Ok(position) = token.parse::<usize>()
        && position > 0
        && let Some(value) = options.get(position - 1).and_then(value_of)
    {
        return Ok(value);
    }
    let labels = options
        .iter()
        .filter_map(|option| option["label"].as_str())
        .collect::<Vec<_>>();
    Err(AnswerParseError::new(
        format!("'{}' is not one of the options.", token),
        Some(format!("one of: {}", labels.join(", "))),
    ))
}

fn parse_date(raw: &str) -> Result<Value, AnswerParseError> {
    if raw == "-" {
        return Ok(json!({ "kind": "date", "value": null }));
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map(|date| json!({ "kind": "date", "value": date.format(DATE_FORMAT).to_string() }))
        .map_err(|_| {
            AnswerParseError::new(
                "Please enter a date as YYYY-MM-DD.",
                Some("expected date YYYY-MM-DD".to_string()),
            )
        })
}

/// Records each path as a file handle; files are never opened.
fn parse_upload(raw: &str) -> Value {
    let files = raw
        .split(',')
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .map(|path| {
            let name = Path::new(path)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string());
            let mut handle = Map::new();
            handle.insert("name".into(), Value::String(name));
            handle.insert("path".into(), Value::String(path.to_string()));
            if let Ok(metadata) = fs::metadata(path) {
                handle.insert("size".into(), json!(metadata.len()));
            }
            Value::Object(handle)
        })
        .collect::<Vec<_>>();
    json!({ "kind": "files", "value": files })
}

struct ValidationDetails {
    errors: Vec<(String, String)>,
    missing_required: Vec<String>,
    unknown_fields: Vec<String>,
}

impl ValidationDetails {
    /// Fields the user can fix by answering again.
    fn fields_to_revisit(&self) -> BTreeSet<String> {
        self.errors
            .iter()
            .map(|(field, _)| field.clone())
            .chain(self.missing_required.iter().cloned())
            .collect()
    }
}

fn gather_validation_details(response: &Value) -> ValidationDetails {
    let validation = response.get("validation");

    let errors = validation
        .and_then(|value| value.get("errors"))
        .and_then(Value::as_array)
        .map(|array| {
            array
                .iter()
                .map(|error| {
                    let field = error
                        .get("field")
                        .and_then(Value::as_str)
                        .unwrap_or("<unknown>")
                        .to_string();
                    let message = error
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("validation failed")
                        .to_string();
                    (field, message)
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let string_list = |key: &str| {
        validation
            .and_then(|value| value.get(key))
            .and_then(Value::as_array)
            .map(|array| {
                array
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default()
    };

    ValidationDetails {
        errors,
        missing_required: string_list("missing_required"),
        unknown_fields: string_list("unknown_fields"),
    }
}

fn print_validation_errors(details: &ValidationDetails) {
    if !details.errors.is_empty() {
        eprintln!("Validation errors:");
        for (field, message) in &details.errors {
            eprintln!("  {}: {}", field, message);
        }
    }

    if !details.missing_required.is_empty() {
        eprintln!(
            "Missing required fields: {}",
            details.missing_required.join(", ")
        );
    }

    if !details.unknown_fields.is_empty() {
        eprintln!("Unknown fields: {}", details.unknown_fields.join(", "));
    }
}

fn print_render_output(mode: RenderMode, config_json: &str, state: &Value, ui: &str) {
    match mode {
        RenderMode::Text => {}
        RenderMode::Card => {
            let card = component_render_card(config_json, &state.to_string());
            println!("Adaptive card:\n{}", card);
        }
        RenderMode::Json => println!("JSON UI:\n{}", ui),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_cmd::Command;
    use assert_fs::TempDir;
    use serde_json::json;

    const ORDER_SCHEMA: &str = r#"{
        "formTitle": "Order",
        "formFields": [[
            { "id": "1", "name": "name", "label": "Name", "type": "Input", "width": 50,
              "validation": { "required": true } },
            { "id": "2", "name": "color", "label": "Color", "type": "Select", "width": 50,
              "options": [ { "label": "Red", "value": "r" }, { "label": "Green", "value": "g" } ] },
            { "id": "3", "name": "rows", "label": "Rows", "type": "InLineForm", "width": 100,
              "formFields": [[
                  { "id": "4", "name": "sku", "label": "SKU", "type": "Input",
                    "validation": { "required": true } }
              ]] }
        ]]
    }"#;

    const DUPLICATE_SCHEMA: &str = r#"{
        "formTitle": "Twice",
        "formFields": [[
            { "id": "1", "name": "name", "label": "Name", "type": "Input" },
            { "id": "2", "name": "name", "label": "Name again", "type": "Input" }
        ]]
    }"#;

    fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).expect("write fixture");
        path
    }

    fn stdout_of(output: &std::process::Output) -> String {
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    fn field(raw: Value) -> FillField {
        FillField::from_json(&raw).expect("field")
    }

    fn colors(multiple: bool, clearable: bool) -> FillField {
        field(json!({
            "name": "color",
            "label": "Color",
            "type": "select",
            "required": true,
            "multiple": multiple,
            "clearable": clearable,
            "options": [
                { "label": "Red", "value": "r" },
                { "label": "Green", "value": "g" }
            ],
            "value": null
        }))
    }

    #[test]
    fn select_accepts_value_label_or_position() {
        let select = colors(false, false);
        for raw in ["g", "green", "2"] {
            assert_eq!(
                parse_input(&select, raw).unwrap(),
                Some(json!({ "kind": "choice", "value": "g" }))
            );
        }
        assert!(parse_input(&select, "3").is_err());
        assert!(parse_input(&select, "-").is_err());
    }

    #[test]
    fn multi_select_splits_on_commas() {
        let select = colors(true, false);
        assert_eq!(
            parse_input(&select, "red, 2").unwrap(),
            Some(json!({ "kind": "choices", "value": ["r", "g"] }))
        );
    }

    #[test]
    fn clearable_select_clears_with_dash() {
        let select = colors(false, true);
        assert_eq!(
            parse_input(&select, "-").unwrap(),
            Some(json!({ "kind": "choice", "value": null }))
        );
    }

    #[test]
    fn empty_answer_keeps_current_or_requires_one() {
        let required = field(json!({ "name": "n", "type": "text", "required": true, "value": "" }));
        assert!(parse_input(&required, "").is_err());

        let filled = field(json!({ "name": "n", "type": "text", "required": true, "value": "Ada" }));
        assert_eq!(parse_input(&filled, "").unwrap(), None);
    }

    #[test]
    fn dates_must_be_iso() {
        let date = field(json!({ "name": "d", "type": "date", "value": null }));
        assert_eq!(
            parse_input(&date, "2024-03-01").unwrap(),
            Some(json!({ "kind": "date", "value": "2024-03-01" }))
        );
        assert!(parse_input(&date, "03/01/2024").is_err());
    }

    #[test]
    fn uploads_record_handles_without_reading() {
        let dir = tempfile::tempdir().expect("temp dir");
        let existing = dir.path().join("quote.pdf");
        fs::write(&existing, b"12345").expect("write");
        let raw = format!("{}, missing/report.txt", existing.display());

        let upload = field(json!({ "name": "u", "type": "upload", "value": [] }));
        let input = parse_input(&upload, &raw).unwrap().expect("files");
        assert_eq!(input["kind"], "files");
        assert_eq!(input["value"][0]["name"], "quote.pdf");
        assert_eq!(input["value"][0]["size"], 5);
        assert_eq!(input["value"][1]["name"], "report.txt");
        assert!(input["value"][1].get("size").is_none());
    }

    #[test]
    fn inline_commands_parse() {
        assert_eq!(parse_inline_command(""), InlineCommand::Done);
        assert_eq!(parse_inline_command("done"), InlineCommand::Done);
        assert_eq!(parse_inline_command("add"), InlineCommand::Add(0));
        assert_eq!(parse_inline_command("add 2"), InlineCommand::Add(1));
        assert_eq!(parse_inline_command("delete 3"), InlineCommand::Delete(3, 0));
        assert_eq!(parse_inline_command("delete 0 2"), InlineCommand::Delete(0, 1));
        assert_eq!(parse_inline_command("rm 1 1"), InlineCommand::Delete(1, 0));
        assert_eq!(parse_inline_command("delete 0 0"), InlineCommand::Unknown);
        assert_eq!(parse_inline_command("delete 0 1 2"), InlineCommand::Unknown);
        assert_eq!(parse_inline_command("delete"), InlineCommand::Unknown);
        assert_eq!(parse_inline_command("add 0"), InlineCommand::Unknown);
    }

    #[test]
    fn validation_details_collect_fields_to_revisit() {
        let response = json!({
            "status": "error",
            "validation": {
                "valid": false,
                "errors": [ { "field": "budget", "path": "/budget", "message": "value above maximum", "code": "max" } ],
                "missing_required": ["requester"],
                "unknown_fields": ["stray"]
            }
        });
        let details = gather_validation_details(&response);
        let names = details.fields_to_revisit();
        assert!(names.contains("budget"));
        assert!(names.contains("requester"));
        assert!(!names.contains("stray"));
    }

    #[test]
    fn render_command_prints_text_rows() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = TempDir::new()?;
        let schema = write_file(&workspace, "order.json", ORDER_SCHEMA);

        let output = Command::cargo_bin("dynform")?
            .arg("render")
            .arg("--schema")
            .arg(&schema)
            .assert()
            .success()
            .get_output()
            .clone();
        let stdout = stdout_of(&output);
        assert!(stdout.contains("Form: Order"));
        assert!(stdout.contains("Row 1:"));
        assert!(stdout.contains("Row 2:"));
        Ok(())
    }

    #[test]
    fn render_command_emits_json_ui_with_prefill() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = TempDir::new()?;
        let schema = write_file(&workspace, "order.json", ORDER_SCHEMA);
        let values = write_file(&workspace, "values.json", r#"{ "name": "Ada", "color": "g" }"#);

        let output = Command::cargo_bin("dynform")?
            .args(["render", "--format", "json", "--schema"])
            .arg(&schema)
            .arg("--values")
            .arg(&values)
            .assert()
            .success()
            .get_output()
            .clone();
        let ui: Value = serde_json::from_str(&stdout_of(&output))?;
        assert_eq!(ui["title"], "Order");
        assert_eq!(ui["fields"][0]["value"], "Ada");
        assert_eq!(ui["fields"][1]["type"], "select");
        assert_eq!(ui["fields"][1]["value"]["label"], "Green");
        assert_eq!(ui["fields"][2]["type"], "inline_group");
        Ok(())
    }

    #[test]
    fn validate_command_reports_missing_required() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = TempDir::new()?;
        let schema = write_file(&workspace, "order.json", ORDER_SCHEMA);
        let values = write_file(&workspace, "values.json", r#"{ "color": "r" }"#);

        let output = Command::cargo_bin("dynform")?
            .arg("validate")
            .arg("--schema")
            .arg(&schema)
            .arg("--values")
            .arg(&values)
            .assert()
            .failure()
            .get_output()
            .clone();
        let stdout = stdout_of(&output);
        assert!(stdout.contains("Validation result: invalid"));
        assert!(stdout.contains("Missing required fields: name"));
        Ok(())
    }

    #[test]
    fn validate_command_accepts_complete_values() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = TempDir::new()?;
        let schema = write_file(&workspace, "order.json", ORDER_SCHEMA);
        let values = write_file(&workspace, "values.json", r#"{ "name": "Ada" }"#);

        let mut cmd = Command::cargo_bin("dynform")?;
        cmd.arg("validate")
            .arg("--schema")
            .arg(&schema)
            .arg("--values")
            .arg(&values)
            .assert()
            .success();
        Ok(())
    }

    #[test]
    fn check_command_fails_on_duplicate_names() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = TempDir::new()?;
        let schema = write_file(&workspace, "twice.json", DUPLICATE_SCHEMA);

        let output = Command::cargo_bin("dynform")?
            .arg("check")
            .arg("--schema")
            .arg(&schema)
            .assert()
            .failure()
            .get_output()
            .clone();
        assert!(stdout_of(&output).contains("duplicate_name"));
        Ok(())
    }

    #[test]
    fn config_env_relaxes_strict_schema_loading() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = TempDir::new()?;
        let schema = write_file(&workspace, "twice.json", DUPLICATE_SCHEMA);
        let config = write_file(&workspace, "options.json", r#"{ "strict": false }"#);

        Command::cargo_bin("dynform")?
            .arg("render")
            .arg("--schema")
            .arg(&schema)
            .env_remove(CONFIG_ENV)
            .assert()
            .failure();

        Command::cargo_bin("dynform")?
            .arg("render")
            .arg("--schema")
            .arg(&schema)
            .env(CONFIG_ENV, &config)
            .assert()
            .success();
        Ok(())
    }

    #[test]
    fn schema_command_prints_json_schema() -> Result<(), Box<dyn std::error::Error>> {
        let output = Command::cargo_bin("dynform")?
            .arg("schema")
            .assert()
            .success()
            .get_output()
            .clone();
        let schema: Value = serde_json::from_str(&stdout_of(&output))?;
        assert_eq!(schema["title"], "FormSchema");
        Ok(())
    }

    #[test]
    fn fill_command_collects_answers_and_entries() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = TempDir::new()?;
        let schema = write_file(&workspace, "order.json", ORDER_SCHEMA);
        let answers = ["Ada", "2", "add", "A1", "done"];
        let stdin = format!("{}\n", answers.join("\n"));

        let output = Command::cargo_bin("dynform")?
            .arg("fill")
            .arg("--schema")
            .arg(&schema)
            .env_remove(CONFIG_ENV)
            .write_stdin(stdin)
            .assert()
            .success()
            .get_output()
            .clone();
        let stdout = stdout_of(&output);
        assert!(stdout.contains("Form: Order"));
        assert!(stdout.contains("Added entry #0"));
        assert!(stdout.contains("Done ✅"));
        assert!(stdout.contains("\"name\": \"Ada\""));
        assert!(stdout.contains("\"color\": \"g\""));
        assert!(stdout.contains("\"sku\": \"A1\""));
        assert!(stdout.contains("Submission (CBOR hex): "));
        Ok(())
    }

    #[test]
    fn fill_command_stops_when_input_runs_out() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = TempDir::new()?;
        let schema = write_file(&workspace, "order.json", ORDER_SCHEMA);

        Command::cargo_bin("dynform")?
            .arg("fill")
            .arg("--schema")
            .arg(&schema)
            .env_remove(CONFIG_ENV)
            .write_stdin("\n")
            .assert()
            .failure();
        Ok(())
    }

    #[test]
    fn fill_command_deletes_from_the_chosen_group() -> Result<(), Box<dyn std::error::Error>> {
        let workspace = TempDir::new()?;
        let schema = write_file(
            &workspace,
            "rows.json",
            r#"{
                "formTitle": "Rows",
                "formFields": [[
                    { "id": "1", "name": "rows", "label": "Rows", "type": "InLineForm",
                      "formFields": [
                          [ { "id": "2", "name": "a", "label": "A", "type": "Input" } ],
                          [ { "id": "3", "name": "b", "label": "B", "type": "Input" } ]
                      ] }
                ]]
            }"#,
        );
        let config = write_file(
            &workspace,
            "options.json",
            r#"{ "inline_scope": "per_group" }"#,
        );
        let answers = ["add 2", "y", "add", "x", "delete 0 2", "done"];
        let stdin = format!("{}\n", answers.join("\n"));

        let output = Command::cargo_bin("dynform")?
            .arg("fill")
            .arg("--schema")
            .arg(&schema)
            .arg("--config")
            .arg(&config)
            .write_stdin(stdin)
            .assert()
            .success()
            .get_output()
            .clone();
        let stdout = stdout_of(&output);
        assert!(stdout.contains("Deleted entry #0"));
        assert!(stdout.contains("\"rows[1]\": []"));
        assert!(stdout.contains("\"a\": \"x\""));
        Ok(())
    }
}
