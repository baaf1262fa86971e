use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, info};

use crate::config::FormOptions;
use crate::error::FormError;
use crate::inline::{InlineEntry, InlineEntryCollection, InlineGroupEngine};
use crate::render::{RenderPayload, RenderStatus};
use crate::resolver::{RenderContext, WidgetInput, apply_input, render_field, value_from_json};
use crate::spec::{FieldDescriptor, FieldKind, FormSchema, InlineSpec};
use crate::store::{FieldValue, FieldValues, FormValueStore, SubscriptionId};
use crate::validate::{SchemaReport, ValidationResult, check_schema, validate};
use crate::visibility::{VisibilityMap, resolve_visibility};

/// One user interaction, processed synchronously and in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FormEvent {
    Input { name: String, input: WidgetInput },
    AddEntry {
        field: String,
        #[serde(default)]
        group: usize,
    },
    DeleteEntry {
        field: String,
        #[serde(default)]
        group: usize,
        index: usize,
    },
    Submit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Updated { name: String, value: FieldValue },
    EntryAdded { field: String, index: usize },
    /// `entry` is `None` when the index was out of range.
    EntryDeleted {
        field: String,
        index: usize,
        entry: Option<InlineEntry>,
    },
    Submitted(Submission),
}

/// Copy of the form contents handed to the submit handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub title: String,
    pub values: FieldValues,
    #[serde(default)]
    pub inline: BTreeMap<String, InlineEntryCollection>,
}

impl Submission {
    /// Plain JSON: field name to value, inline collections as arrays of rows.
    pub fn to_json(&self) -> Value {
        let values = self
            .values
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect::<Map<_, _>>();
        let inline = self
            .inline
            .iter()
            .map(|(key, collection)| {
                let rows = collection.iter().map(InlineEntry::to_json).collect();
                (key.clone(), Value::Array(rows))
            })
            .collect::<Map<_, _>>();
        json!({
            "title": self.title,
            "values": values,
            "inline": inline,
        })
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        serde_cbor::to_vec(&self.to_json())
    }
}

/// Serializable session contents, used to carry a session across calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SessionState {
    #[serde(default)]
    pub values: FieldValues,
    #[serde(default)]
    pub inline: BTreeMap<String, InlineEntryCollection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationResult>,
    #[serde(default)]
    pub submitted: bool,
}

impl SessionState {
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        if raw.trim().is_empty() {
            Ok(Self::default())
        } else {
            serde_json::from_str(raw)
        }
    }
}

type SubmitHandler = Box<dyn FnMut(&Submission)>;

/// One live form: schema, store, inline collections, and the last
/// validation outcome.
pub struct FormSession {
    schema: FormSchema,
    options: FormOptions,
    report: SchemaReport,
    visibility: VisibilityMap,
    store: FormValueStore,
    inline: InlineGroupEngine,
    validation: Option<ValidationResult>,
    submitted: bool,
    on_submit: Option<SubmitHandler>,
}

impl fmt::Debug for FormSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormSession")
            .field("title", &self.schema.title)
            .field("options", &self.options)
            .field("store", &self.store)
            .field("inline", &self.inline)
            .field("submitted", &self.submitted)
            .finish()
    }
}

impl FormSession {
    pub fn new(schema: FormSchema, options: FormOptions) -> Result<Self, FormError> {
        Self::restore(schema, options, SessionState::default())
    }

    /// Rebuilds a session from a previously captured [`SessionState`].
    pub fn restore(
        schema: FormSchema,
        options: FormOptions,
        state: SessionState,
    ) -> Result<Self, FormError> {
        let report = check_schema(&schema);
        if options.strict && report.has_errors() {
            return Err(FormError::InvalidSchema(report));
        }
        let visibility = resolve_visibility(&schema);
        debug!(title = %schema.title, fields = schema.flatten().len(), "form session ready");
        Ok(Self {
            schema,
            options,
            report,
            visibility,
            store: FormValueStore::from_values(state.values),
            inline: InlineGroupEngine::with_collections(options.inline_scope, state.inline),
            validation: state.validation,
            submitted: state.submitted,
            on_submit: None,
        })
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn options(&self) -> FormOptions {
        self.options
    }

    /// Issues found when the schema was loaded.
    pub fn report(&self) -> &SchemaReport {
        &self.report
    }

    pub fn store(&self) -> &FormValueStore {
        &self.store
    }

    pub fn inline(&self) -> &InlineGroupEngine {
        &self.inline
    }

    pub fn last_validation(&self) -> Option<&ValidationResult> {
        self.validation.as_ref()
    }

    /// Registers the completion callback that receives every submission.
    pub fn set_submit_handler<F>(&mut self, handler: F)
    where
        F: FnMut(&Submission) + 'static,
    {
        self.on_submit = Some(Box::new(handler));
    }

    pub fn subscribe<F>(&mut self, name: Option<&str>, listener: F) -> SubscriptionId
    where
        F: FnMut(&str, &FieldValue) + 'static,
    {
        self.store.subscribe(name, listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }

    pub fn status(&self) -> RenderStatus {
        if self.submitted {
            RenderStatus::Submitted
        } else if self.validation.as_ref().is_some_and(|result| !result.valid) {
            RenderStatus::Invalid
        } else {
            RenderStatus::Editing
        }
    }

    /// Builds the payload for the flattened top-level fields.
    pub fn render(&self) -> RenderPayload {
        let errors = self
            .validation
            .as_ref()
            .map(ValidationResult::field_messages)
            .unwrap_or_default();
        let ctx = RenderContext {
            store: &self.store,
            inline: &self.inline,
            visibility: &self.visibility,
            errors: &errors,
        };
        let fields = self
            .schema
            .flatten()
            .into_iter()
            .filter_map(|field| render_field(field, &ctx))
            .collect();
        RenderPayload {
            title: self.schema.title.clone(),
            status: self.status(),
            fields,
            validation: self.validation.clone(),
        }
    }

    pub fn apply(&mut self, event: FormEvent) -> Result<EventOutcome, FormError> {
        match event {
            FormEvent::Input { name, input } => {
                let value = self.input(&name, input)?;
                Ok(EventOutcome::Updated { name, value })
            }
            FormEvent::AddEntry { field, group } => {
                let index = self.add_entry(&field, group)?;
                Ok(EventOutcome::EntryAdded { field, index })
            }
            FormEvent::DeleteEntry {
                field,
                group,
                index,
            } => {
                let entry = self.delete_entry(&field, group, index)?;
                Ok(EventOutcome::EntryDeleted {
                    field,
                    index,
                    entry,
                })
            }
            FormEvent::Submit => self.submit().map(EventOutcome::Submitted),
        }
    }

    /// Routes widget input for the named field into the store.
    pub fn input(&mut self, name: &str, input: WidgetInput) -> Result<FieldValue, FormError> {
        let field = find(&self.schema, name)?;
        let value = apply_input(field, input, &mut self.store)?;
        self.submitted = false;
        Ok(value)
    }

    /// Prefills the session from a plain JSON object keyed by field name.
    ///
    /// Inline group fields take an array of row objects, appended to the
    /// first group. Keys that name no field are stored as given and show up
    /// as unknown fields when validating.
    pub fn load_values(&mut self, values: &Value) -> Result<(), FormError> {
        let object = values.as_object().ok_or_else(|| FormError::InvalidValue {
            name: "<root>".into(),
            message: format!("{} as a values object", values),
        })?;
        for (name, value) in object {
            let Some(field) = self.schema.find_field(name) else {
                self.store.write(name, FieldValue::from_plain_json(value));
                continue;
            };
            match &field.kind {
                FieldKind::InlineGroup(spec) => {
                    let rows = value.as_array().ok_or_else(|| FormError::InvalidValue {
                        name: name.clone(),
                        message: format!("{} as a list of rows", value),
                    })?;
                    for row in rows {
                        let entry = row_entry(name, spec, row)?;
                        self.inline.push_entry(field, 0, entry)?;
                    }
                }
                _ => {
                    let value = value_from_json(field, value)?;
                    self.store.write(name, value);
                }
            }
        }
        Ok(())
    }

    pub fn add_entry(&mut self, field: &str, group: usize) -> Result<usize, FormError> {
        let descriptor = find(&self.schema, field)?;
        let index = self.inline.add_entry(&mut self.store, descriptor, group)?;
        self.submitted = false;
        Ok(index)
    }

    pub fn delete_entry(
        &mut self,
        field: &str,
        group: usize,
        index: usize,
    ) -> Result<Option<InlineEntry>, FormError> {
        let descriptor = find(&self.schema, field)?;
        let removed = self.inline.delete_entry(descriptor, group, index)?;
        if removed.is_some() {
            self.submitted = false;
        }
        Ok(removed)
    }

    /// Runs the submit-time checks without submitting.
    pub fn validate(&self) -> ValidationResult {
        validate(&self.schema, &self.store, &self.inline, &self.visibility)
    }

    /// Validates, then hands a snapshot of the store and inline collections
    /// to the submit handler. The store is left as is.
    pub fn submit(&mut self) -> Result<Submission, FormError> {
        if self.options.validate_on_submit {
            let result = self.validate();
            let valid = result.valid;
            self.validation = Some(result.clone());
            if !valid {
                debug!(problems = %result.summary(), "submission blocked");
                return Err(FormError::Validation(result));
            }
        }

        let submission = Submission {
            title: self.schema.title.clone(),
            values: self.store.snapshot(),
            inline: self.inline.collections().clone(),
        };
        self.submitted = true;
        info!(
            title = %submission.title,
            values = submission.values.len(),
            inline = submission.inline.len(),
            "form submitted"
        );
        if let Some(handler) = self.on_submit.as_mut() {
            handler(&submission);
        }
        Ok(submission)
    }

    pub fn state(&self) -> SessionState {
        SessionState {
            values: self.store.snapshot(),
            inline: self.inline.collections().clone(),
            validation: self.validation.clone(),
            submitted: self.submitted,
        }
    }
}

fn row_entry(name: &str, spec: &InlineSpec, row: &Value) -> Result<InlineEntry, FormError> {
    let cells = row.as_object().ok_or_else(|| FormError::InvalidValue {
        name: name.to_string(),
        message: format!("{} as a row object", row),
    })?;
    cells
        .iter()
        .map(|(key, cell)| {
            let value = match spec
                .form_fields
                .iter()
                .flatten()
                .find(|sub| &sub.name == key)
            {
                Some(sub) => value_from_json(sub, cell)?,
                None => FieldValue::from_plain_json(cell),
            };
            Ok((key.clone(), value))
        })
        .collect()
}

fn find<'a>(schema: &'a FormSchema, name: &str) -> Result<&'a FieldDescriptor, FormError> {
    schema
        .find_field(name)
        .ok_or_else(|| FormError::UnknownField(name.to_string()))
}
