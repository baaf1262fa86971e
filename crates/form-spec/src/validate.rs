use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::InlineScope;
use crate::inline::InlineGroupEngine;
use crate::layout;
use crate::spec::{FieldDescriptor, FieldKind, FormSchema, InlineSpec};
use crate::store::{FieldValue, FormValueStore};
use crate::visibility::{VisibilityMap, is_visible};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// One finding of the schema-load check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaIssue {
    pub severity: Severity,
    pub code: String,
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SchemaReport {
    pub issues: Vec<SchemaIssue>,
}

impl SchemaReport {
    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn errors(&self) -> impl Iterator<Item = &SchemaIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &SchemaIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == Severity::Warning)
    }

    pub fn summary(&self) -> String {
        self.issues
            .iter()
            .map(|issue| format!("{}: {}", issue.path, issue.message))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn push(&mut self, severity: Severity, code: &str, path: String, message: String) {
        self.issues.push(SchemaIssue {
            severity,
            code: code.into(),
            path,
            message,
        });
    }
}

/// Structural checks run once when a schema is loaded.
pub fn check_schema(schema: &FormSchema) -> SchemaReport {
    let mut report = SchemaReport::default();

    let mut top_names = BTreeMap::new();
    for (index, field) in schema.flatten().into_iter().enumerate() {
        if let Some(first) = top_names.insert(field.name.as_str(), index) {
            report.push(
                Severity::Error,
                "duplicate_name",
                format!("/fields/{}", field.name),
                format!(
                    "name '{}' is used by fields #{} and #{}",
                    field.name, first, index
                ),
            );
        }
    }

    for (group_index, group) in schema.fields.iter().enumerate() {
        check_list(
            group,
            &format!("/fields/{}", group_index),
            &top_names,
            &mut report,
        );
    }

    let mut owners: BTreeMap<&str, &str> = BTreeMap::new();
    for field in schema.all_fields() {
        let Some(inline) = field.kind.inline() else {
            continue;
        };
        let names = inline
            .form_fields
            .iter()
            .flatten()
            .map(|sub| sub.name.as_str())
            .collect::<BTreeSet<_>>();
        for name in names {
            match owners.get(name) {
                Some(owner) if *owner != field.name.as_str() => report.push(
                    Severity::Warning,
                    "inline_name_collision",
                    format!("/fields/{}/{}", field.name, name),
                    format!(
                        "inline field '{}' is also declared by '{}'; both share one store slot",
                        name, owner
                    ),
                ),
                Some(_) => {}
                None => {
                    owners.insert(name, field.name.as_str());
                }
            }
        }
    }

    for issue in report.issues.iter() {
        match issue.severity {
            Severity::Warning => warn!(path = %issue.path, code = %issue.code, "{}", issue.message),
            Severity::Error => warn!(path = %issue.path, code = %issue.code, "schema error: {}", issue.message),
        }
    }
    report
}

fn check_list(
    fields: &[FieldDescriptor],
    path: &str,
    top_names: &BTreeMap<&str, usize>,
    report: &mut SchemaReport,
) {
    let mut ids = BTreeSet::new();
    for (index, field) in fields.iter().enumerate() {
        let field_path = format!("{}/{}", path, index);
        if !ids.insert(field.id.as_str()) {
            report.push(
                Severity::Error,
                "duplicate_id",
                field_path.clone(),
                format!("id '{}' appears twice in the same field list", field.id),
            );
        }
        check_field(field, &field_path, report);

        if let Some(inline) = field.kind.inline() {
            if inline.form_fields.is_empty() {
                report.push(
                    Severity::Warning,
                    "empty_inline_group",
                    field_path.clone(),
                    format!("inline group '{}' declares no groups", field.name),
                );
            }
            let first_shape = inline.form_fields.first().map(|group| shape(group));
            for (group_index, group) in inline.form_fields.iter().enumerate() {
                let group_path = format!("{}/formFields/{}", field_path, group_index);
                if group_index > 0 && first_shape.as_ref() != Some(&shape(group)) {
                    report.push(
                        Severity::Warning,
                        "inline_shape_mismatch",
                        group_path.clone(),
                        format!(
                            "group {} of '{}' differs from group 0; pooled entry tables use group 0 columns",
                            group_index, field.name
                        ),
                    );
                }
                let mut names = BTreeSet::new();
                for sub in group {
                    if !names.insert(sub.name.as_str()) {
                        report.push(
                            Severity::Error,
                            "duplicate_name",
                            group_path.clone(),
                            format!("name '{}' appears twice in one inline group", sub.name),
                        );
                    }
                    if top_names.contains_key(sub.name.as_str()) {
                        report.push(
                            Severity::Warning,
                            "inline_name_collision",
                            group_path.clone(),
                            format!(
                                "inline field '{}' shares its store slot with a top-level field",
                                sub.name
                            ),
                        );
                    }
                }
                check_list(group, &group_path, top_names, report);
            }
        }
    }
}

fn check_field(field: &FieldDescriptor, path: &str, report: &mut SchemaReport) {
    if let Some(select) = field.kind.select()
        && select.options.is_none()
    {
        report.push(
            Severity::Warning,
            "missing_options",
            path.to_string(),
            format!(
                "{} field '{}' has no options; it renders an empty selector",
                field.kind.label(),
                field.name
            ),
        );
    }
    if let Some(width) = field.width
        && !layout::width_in_range(width)
    {
        report.push(
            Severity::Warning,
            "width_out_of_range",
            path.to_string(),
            format!(
                "width {} of '{}' is outside 1..=100; span clamps to {}",
                width,
                field.name,
                layout::grid_span(width)
            ),
        );
    }
    if let Some(pattern) = field
        .validation
        .as_ref()
        .and_then(|validation| validation.pattern.as_deref())
        && Regex::new(pattern).is_err()
    {
        report.push(
            Severity::Warning,
            "invalid_pattern",
            path.to_string(),
            format!("pattern of '{}' is not a valid regex and is ignored", field.name),
        );
    }
}

fn shape(fields: &[FieldDescriptor]) -> Vec<&str> {
    fields.iter().map(|field| field.name.as_str()).collect()
}

/// A single rejected value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub path: String,
    pub message: String,
    pub code: String,
}

/// Outcome of the submit-time validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default)]
    pub errors: Vec<ValidationError>,
    #[serde(default)]
    pub missing_required: Vec<String>,
    #[serde(default)]
    pub unknown_fields: Vec<String>,
}

impl ValidationResult {
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if !self.missing_required.is_empty() {
            parts.push(format!("missing required {}", self.missing_required.join(", ")));
        }
        for error in &self.errors {
            parts.push(format!("{}: {}", error.field, error.message));
        }
        if !self.unknown_fields.is_empty() {
            parts.push(format!("unknown fields {}", self.unknown_fields.join(", ")));
        }
        parts.join("; ")
    }

    /// Field name to the message shown next to the invalid control.
    pub fn field_messages(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        for name in &self.missing_required {
            map.insert(name.clone(), "This field is required".to_string());
        }
        for error in &self.errors {
            map.entry(error.field.clone())
                .or_insert_with(|| error.message.clone());
        }
        map
    }
}

/// Checks the current store against the top-level fields.
///
/// Hidden and disabled fields are skipped. A required inline group needs one
/// entry, and every committed row is held to its sub-field rules.
pub fn validate(
    schema: &FormSchema,
    store: &FormValueStore,
    inline: &InlineGroupEngine,
    visibility: &VisibilityMap,
) -> ValidationResult {
    let mut errors = Vec::new();
    let mut missing_required = Vec::new();

    for field in schema.flatten() {
        if !is_visible(visibility, &field.name) || field.is_disabled {
            continue;
        }
        match &field.kind {
            FieldKind::Unknown => continue,
            FieldKind::InlineGroup(spec) => {
                if field.required() && inline.entry_count(field) == 0 {
                    missing_required.push(field.name.clone());
                }
                errors.extend(entry_errors(field, spec, inline));
            }
            _ => {
                let value = store.value_or_empty(&field.name);
                if value.is_empty() {
                    if field.required() {
                        missing_required.push(field.name.clone());
                    }
                } else if let Some(error) = enforce_rules(field, &value) {
                    errors.push(error);
                }
            }
        }
    }

    let known = schema
        .all_fields()
        .into_iter()
        .map(|field| field.name.as_str())
        .collect::<BTreeSet<_>>();
    let unknown_fields = store
        .names()
        .filter(|name| !known.contains(name))
        .map(String::from)
        .collect::<Vec<_>>();

    ValidationResult {
        valid: errors.is_empty() && missing_required.is_empty() && unknown_fields.is_empty(),
        errors,
        missing_required,
        unknown_fields,
    }
}

/// Rule violations inside committed rows, e.g. rows restored from a values
/// file that never went through `add_entry`.
fn entry_errors(
    field: &FieldDescriptor,
    spec: &InlineSpec,
    inline: &InlineGroupEngine,
) -> Vec<ValidationError> {
    let groups = match inline.scope() {
        InlineScope::PerField => 0..1,
        InlineScope::PerGroup => 0..spec.form_fields.len(),
    };
    let mut errors = Vec::new();
    for group in groups {
        let Some(collection) = inline.collection(&field.name, group) else {
            continue;
        };
        for (index, entry) in collection.iter().enumerate() {
            for (name, value) in entry.iter() {
                let Some(sub) = spec.form_fields.iter().flatten().find(|sub| &sub.name == name)
                else {
                    continue;
                };
                if value.is_empty() {
                    continue;
                }
                if let Some(mut error) = enforce_rules(sub, value) {
                    error.path = format!("/{}/{}/{}", field.name, index, sub.name);
                    error.field = field.name.clone();
                    errors.push(error);
                }
            }
        }
    }
    errors
}

pub(crate) fn enforce_rules(field: &FieldDescriptor, value: &FieldValue) -> Option<ValidationError> {
    let validation = field.validation.as_ref()?;
    let text = value.as_text()?;

    if let Some(pattern) = &validation.pattern
        && let Ok(regex) = Regex::new(pattern)
        && !regex.is_match(text)
    {
        return Some(base_error(
            field,
            "value does not match pattern",
            "pattern_mismatch",
        ));
    }

    if validation.min.is_some() || validation.max.is_some() {
        let Ok(number) = text.trim().parse::<f64>() else {
            return Some(base_error(field, "value is not a number", "not_a_number"));
        };
        if let Some(min) = validation.min
            && number < min
        {
            return Some(base_error(field, "value below minimum", "min"));
        }
        if let Some(max) = validation.max
            && number > max
        {
            return Some(base_error(field, "value above maximum", "max"));
        }
    }

    None
}

fn base_error(field: &FieldDescriptor, message: &str, code: &str) -> ValidationError {
    ValidationError {
        field: field.name.clone(),
        path: format!("/{}", field.name),
        message: message.into(),
        code: code.into(),
    }
}
