//! Repeatable inline groups.
//!
//! Each inline group cycles between editing (its sub-fields hold in-progress
//! values in the shared store) and committing (those values are captured as
//! an [`InlineEntry`] and the sub-fields are reset to empty).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::InlineScope;
use crate::error::FormError;
use crate::spec::{FieldDescriptor, FieldKind, InlineSpec};
use crate::store::{FieldValue, FormValueStore};
use crate::validate::enforce_rules;

/// One committed row: inline field name to the value captured at add time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InlineEntry {
    values: BTreeMap<String, FieldValue>,
}

impl InlineEntry {
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.values.insert(name.into(), value);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.values
                .iter()
                .map(|(name, value)| (name.clone(), value.to_json()))
                .collect(),
        )
    }
}

impl<K: Into<String>> FromIterator<(K, FieldValue)> for InlineEntry {
    fn from_iter<I: IntoIterator<Item = (K, FieldValue)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        }
    }
}

/// Ordered, index-addressed rows. Indices are positional: removing one
/// shifts every later entry up by one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InlineEntryCollection {
    entries: Vec<InlineEntry>,
}

impl InlineEntryCollection {
    pub fn push(&mut self, entry: InlineEntry) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    /// Removes the entry at `index`; `None` when out of range.
    pub fn remove(&mut self, index: usize) -> Option<InlineEntry> {
        if index < self.entries.len() {
            Some(self.entries.remove(index))
        } else {
            None
        }
    }

    pub fn get(&self, index: usize) -> Option<&InlineEntry> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, InlineEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Column of an entry table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumn {
    pub id: String,
    pub name: String,
    pub label: String,
}

/// Accumulated entries laid out for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryTable {
    pub columns: Vec<TableColumn>,
    pub rows: Vec<Vec<String>>,
}

impl EntryTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Key of the collection an inline group writes into.
pub fn collection_key(field: &str, group: usize, scope: InlineScope) -> String {
    match scope {
        InlineScope::PerField => field.to_string(),
        InlineScope::PerGroup => format!("{}[{}]", field, group),
    }
}

/// Owns every inline entry collection of one form instance.
#[derive(Debug, Clone, Default)]
pub struct InlineGroupEngine {
    scope: InlineScope,
    collections: BTreeMap<String, InlineEntryCollection>,
}

impl InlineGroupEngine {
    pub fn new(scope: InlineScope) -> Self {
        Self {
            scope,
            collections: BTreeMap::new(),
        }
    }

    pub fn with_collections(
        scope: InlineScope,
        collections: BTreeMap<String, InlineEntryCollection>,
    ) -> Self {
        Self { scope, collections }
    }

    pub fn scope(&self) -> InlineScope {
        self.scope
    }

    pub fn collections(&self) -> &BTreeMap<String, InlineEntryCollection> {
        &self.collections
    }

    pub fn collection(&self, field: &str, group: usize) -> Option<&InlineEntryCollection> {
        self.collections
            .get(&collection_key(field, group, self.scope))
    }

    /// Number of entries committed for a field across all of its collections.
    pub fn entry_count(&self, field: &FieldDescriptor) -> usize {
        match (&field.kind, self.scope) {
            (FieldKind::InlineGroup(_), InlineScope::PerField) => self
                .collection(&field.name, 0)
                .map(InlineEntryCollection::len)
                .unwrap_or(0),
            (FieldKind::InlineGroup(spec), InlineScope::PerGroup) => (0..spec.form_fields.len())
                .filter_map(|group| self.collection(&field.name, group))
                .map(InlineEntryCollection::len)
                .sum(),
            _ => 0,
        }
    }

    /// Snapshots the group's current store values into a new entry, appends
    /// it, then resets those store slots to empty. Returns the new index.
    pub fn add_entry(
        &mut self,
        store: &mut FormValueStore,
        field: &FieldDescriptor,
        group: usize,
    ) -> Result<usize, FormError> {
        let fields = group_fields(field, group)?;

        let missing = fields
            .iter()
            .filter(|sub| captured(sub) && sub.required() && !sub.hidden())
            .filter(|sub| store.value_or_empty(&sub.name).is_empty())
            .map(|sub| sub.name.clone())
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(FormError::EntryIncomplete {
                field: field.name.clone(),
                missing,
            });
        }

        let errors = fields
            .iter()
            .filter(|sub| captured(sub) && !sub.hidden())
            .filter_map(|sub| {
                let value = store.value_or_empty(&sub.name);
                if value.is_empty() {
                    None
                } else {
                    enforce_rules(sub, &value)
                }
            })
            .collect::<Vec<_>>();
        if !errors.is_empty() {
            return Err(FormError::EntryInvalid {
                field: field.name.clone(),
                errors,
            });
        }

        let entry = fields
            .iter()
            .filter(|sub| captured(sub))
            .map(|sub| (sub.name.clone(), store.value_or_empty(&sub.name)))
            .collect::<InlineEntry>();
        for sub in fields.iter().filter(|sub| captured(sub)) {
            store.clear(&sub.name);
        }

        let key = collection_key(&field.name, group, self.scope);
        let index = self.collections.entry(key.clone()).or_default().push(entry);
        debug!(collection = %key, index, "inline entry added");
        Ok(index)
    }

    /// Appends an already materialized entry, e.g. one restored from a
    /// values file.
    pub fn push_entry(
        &mut self,
        field: &FieldDescriptor,
        group: usize,
        entry: InlineEntry,
    ) -> Result<usize, FormError> {
        group_fields(field, group)?;
        let key = collection_key(&field.name, group, self.scope);
        Ok(self.collections.entry(key).or_default().push(entry))
    }

    /// Removes the entry at `index`. An out-of-range index leaves the
    /// collection untouched and yields `Ok(None)`.
    pub fn delete_entry(
        &mut self,
        field: &FieldDescriptor,
        group: usize,
        index: usize,
    ) -> Result<Option<InlineEntry>, FormError> {
        group_fields(field, group)?;
        let key = collection_key(&field.name, group, self.scope);
        let removed = self
            .collections
            .get_mut(&key)
            .and_then(|collection| collection.remove(index));
        match &removed {
            Some(_) => debug!(collection = %key, index, "inline entry deleted"),
            None => warn!(collection = %key, index, "ignored delete of missing inline entry"),
        }
        Ok(removed)
    }

    /// Field list whose names become the table columns for `group`.
    pub fn columns<'a>(&self, spec: &'a InlineSpec, group: usize) -> &'a [FieldDescriptor] {
        match self.scope {
            InlineScope::PerField => spec.first_group(),
            InlineScope::PerGroup => spec.group(group).unwrap_or_default(),
        }
    }

    pub fn table(&self, field: &FieldDescriptor, group: usize) -> Result<EntryTable, FormError> {
        let spec = field
            .kind
            .inline()
            .ok_or_else(|| FormError::NotInlineGroup(field.name.clone()))?;
        let columns = self
            .columns(spec, group)
            .iter()
            .filter(|sub| captured(sub))
            .map(|sub| TableColumn {
                id: sub.id.clone(),
                name: sub.name.clone(),
                label: sub.label.clone(),
            })
            .collect::<Vec<_>>();
        let rows: Vec<Vec<String>> = self
            .collection(&field.name, group)
            .map(|collection| {
                collection
                    .iter()
                    .map(|entry| {
                        columns
                            .iter()
                            .map(|column| {
                                entry
                                    .get(&column.name)
                                    .map(ToString::to_string)
                                    .unwrap_or_default()
                            })
                            .collect::<Vec<_>>()
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(EntryTable { columns, rows })
    }
}

fn group_fields(field: &FieldDescriptor, group: usize) -> Result<&[FieldDescriptor], FormError> {
    let spec = field
        .kind
        .inline()
        .ok_or_else(|| FormError::NotInlineGroup(field.name.clone()))?;
    spec.group(group).ok_or_else(|| FormError::GroupOutOfRange {
        field: field.name.clone(),
        group,
    })
}

/// Nested inline groups own their own collections and hold no store value.
fn captured(field: &FieldDescriptor) -> bool {
    !matches!(field.kind, FieldKind::InlineGroup(_))
}
