use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

use form_spec::{
    EventOutcome, FormError, FormEvent, FormOptions, FormSchema, FormSession, RenderPayload,
    SchemaError, SessionState, Submission, check_schema as form_check_schema,
    render_card as form_render_card, render_json_ui as form_render_json_ui,
    render_text as form_render_text,
};

const DEFAULT_SCHEMA: &str = include_str!("../../form-spec/tests/fixtures/demo_form.json");

#[derive(Debug, Error)]
enum ComponentError {
    #[error("failed to parse config: {0}")]
    ConfigParse(#[source] serde_json::Error),
    #[error("failed to parse session state: {0}")]
    StateParse(#[source] serde_json::Error),
    #[error("failed to parse event: {0}")]
    EventParse(#[source] serde_json::Error),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
}

#[derive(Debug, Deserialize, Serialize, Default)]
struct ComponentConfig {
    #[serde(default)]
    form_schema_json: Option<String>,
    #[serde(default)]
    options: FormOptions,
}

fn load_config(config_json: &str) -> Result<ComponentConfig, ComponentError> {
    if config_json.trim().is_empty() {
        Ok(ComponentConfig::default())
    } else {
        serde_json::from_str(config_json).map_err(ComponentError::ConfigParse)
    }
}

fn load_schema(config: &ComponentConfig) -> Result<FormSchema, ComponentError> {
    let schema_json = config.form_schema_json.as_deref().unwrap_or(DEFAULT_SCHEMA);
    Ok(FormSchema::from_json_str(schema_json)?)
}

fn open_session(config_json: &str, state_json: &str) -> Result<FormSession, ComponentError> {
    let config = load_config(config_json)?;
    let schema = load_schema(&config)?;
    let state = SessionState::from_json_str(state_json).map_err(ComponentError::StateParse)?;
    Ok(FormSession::restore(schema, config.options, state)?)
}

fn respond(result: Result<Value, ComponentError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

fn respond_string(result: Result<String, ComponentError>) -> String {
    match result {
        Ok(value) => value,
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Value, ComponentError> {
    serde_json::to_value(value).map_err(ComponentError::JsonEncode)
}

/// Returns the parsed schema, normalized to the canonical key names.
pub fn describe(config_json: &str) -> String {
    respond(
        load_config(config_json)
            .and_then(|config| load_schema(&config))
            .and_then(|schema| encode(&schema)),
    )
}

pub fn check_schema(config_json: &str) -> String {
    respond(
        load_config(config_json)
            .and_then(|config| load_schema(&config))
            .and_then(|schema| {
                let report = form_check_schema(&schema);
                Ok(json!({
                    "ok": !report.has_errors(),
                    "issues": encode(&report.issues)?,
                }))
            }),
    )
}

fn render_payload(config_json: &str, state_json: &str) -> Result<RenderPayload, ComponentError> {
    open_session(config_json, state_json).map(|session| session.render())
}

pub fn render_text(config_json: &str, state_json: &str) -> String {
    respond_string(render_payload(config_json, state_json).map(|payload| form_render_text(&payload)))
}

pub fn render_json_ui(config_json: &str, state_json: &str) -> String {
    respond(render_payload(config_json, state_json).map(|payload| form_render_json_ui(&payload)))
}

pub fn render_card(config_json: &str, state_json: &str) -> String {
    respond(render_payload(config_json, state_json).map(|payload| form_render_card(&payload)))
}

fn outcome_json(outcome: &EventOutcome) -> Value {
    match outcome {
        EventOutcome::Updated { name, value } => json!({
            "kind": "updated",
            "name": name,
            "value": value.to_json(),
        }),
        EventOutcome::EntryAdded { field, index } => json!({
            "kind": "entry_added",
            "field": field,
            "index": index,
        }),
        EventOutcome::EntryDeleted {
            field,
            index,
            entry,
        } => json!({
            "kind": "entry_deleted",
            "field": field,
            "index": index,
            "removed": entry.as_ref().map(|entry| entry.to_json()),
        }),
        EventOutcome::Submitted(submission) => json!({
            "kind": "submitted",
            "submission": submission.to_json(),
        }),
    }
}

fn build_error_response(
    session: &FormSession,
    validation: &form_spec::ValidationResult,
) -> Result<Value, ComponentError> {
    Ok(json!({
        "status": "error",
        "validation": encode(validation)?,
        "state": encode(&session.state())?,
    }))
}

fn build_success_response(
    session: &FormSession,
    submission: &Submission,
) -> Result<Value, ComponentError> {
    Ok(json!({
        "status": "complete",
        "submission": submission.to_json(),
        "state": encode(&session.state())?,
    }))
}

/// Applies one event to the session described by `state_json` and returns
/// the outcome together with the new state.
pub fn apply_event(config_json: &str, state_json: &str, event_json: &str) -> String {
    respond(open_session(config_json, state_json).and_then(|mut session| {
        let event: FormEvent =
            serde_json::from_str(event_json).map_err(ComponentError::EventParse)?;
        debug!(?event, "applying form event");
        match session.apply(event) {
            Ok(outcome) => Ok(json!({
                "status": session.status().as_str(),
                "outcome": outcome_json(&outcome),
                "state": encode(&session.state())?,
            })),
            Err(FormError::Validation(validation)) => build_error_response(&session, &validation),
            Err(err) => Err(err.into()),
        }
    }))
}

pub fn submit(config_json: &str, state_json: &str) -> String {
    respond(
        open_session(config_json, state_json).and_then(|mut session| match session.submit() {
            Ok(submission) => build_success_response(&session, &submission),
            Err(FormError::Validation(validation)) => build_error_response(&session, &validation),
            Err(err) => Err(err.into()),
        }),
    )
}
