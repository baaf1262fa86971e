use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

/// Opaque reference to a user-selected file. The form never opens it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHandle {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl FileHandle {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            size: None,
        }
    }
}

/// Current value of one field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    #[default]
    Empty,
    Text(String),
    Choice(String),
    Choices(Vec<String>),
    Date(NaiveDate),
    Files(Vec<FileHandle>),
}

impl FieldValue {
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Empty => true,
            FieldValue::Text(text) => text.is_empty(),
            FieldValue::Choice(value) => value.is_empty(),
            FieldValue::Choices(values) => values.is_empty(),
            FieldValue::Date(_) => false,
            FieldValue::Files(files) => files.is_empty(),
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            FieldValue::Empty => "empty",
            FieldValue::Text(_) => "text",
            FieldValue::Choice(_) => "choice",
            FieldValue::Choices(_) => "choices",
            FieldValue::Date(_) => "date",
            FieldValue::Files(_) => "files",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Best-effort reading of a plain JSON value for a field of unknown kind.
    pub fn from_plain_json(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Empty,
            Value::String(text) => FieldValue::Text(text.clone()),
            Value::Array(items) if items.iter().all(Value::is_string) => FieldValue::Choices(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect(),
            ),
            other => FieldValue::Text(other.to_string()),
        }
    }

    /// Plain JSON used for submissions: empty values become `""`.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Empty => Value::String(String::new()),
            FieldValue::Text(text) | FieldValue::Choice(text) => Value::String(text.clone()),
            FieldValue::Choices(values) => {
                Value::Array(values.iter().cloned().map(Value::String).collect())
            }
            FieldValue::Date(date) => Value::String(date.format("%Y-%m-%d").to_string()),
            FieldValue::Files(files) => Value::Array(
                files
                    .iter()
                    .map(|file| {
                        let mut map = Map::new();
                        map.insert("name".into(), Value::String(file.name.clone()));
                        if let Some(path) = &file.path {
                            map.insert("path".into(), Value::String(path.clone()));
                        }
                        if let Some(size) = file.size {
                            map.insert("size".into(), json!(size));
                        }
                        Value::Object(map)
                    })
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Empty => Ok(()),
            FieldValue::Text(text) | FieldValue::Choice(text) => f.write_str(text),
            FieldValue::Choices(values) => f.write_str(&values.join(", ")),
            FieldValue::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            FieldValue::Files(files) => {
                let names = files
                    .iter()
                    .map(|file| file.name.as_str())
                    .collect::<Vec<_>>();
                f.write_str(&names.join(", "))
            }
        }
    }
}

/// Copy of the store contents, keyed by field name.
pub type FieldValues = BTreeMap<String, FieldValue>;

/// Handle returned by [`FormValueStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&str, &FieldValue)>;

struct Subscription {
    id: SubscriptionId,
    name: Option<String>,
    listener: Listener,
}

/// Single source of truth for the values of one form instance.
#[derive(Default)]
pub struct FormValueStore {
    values: FieldValues,
    subscriptions: Vec<Subscription>,
    next_subscription: u64,
}

impl fmt::Debug for FormValueStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormValueStore")
            .field("values", &self.values)
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

impl FormValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: FieldValues) -> Self {
        Self {
            values,
            ..Self::default()
        }
    }

    /// Last written value, or `None` when the field was never written.
    pub fn read(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    /// Like [`read`](Self::read) but treats an unwritten field as empty.
    pub fn value_or_empty(&self, name: &str) -> FieldValue {
        self.values.get(name).cloned().unwrap_or_default()
    }

    pub fn write(&mut self, name: &str, value: FieldValue) {
        debug!(field = name, kind = value.kind_label(), "store write");
        self.values.insert(name.to_string(), value);
        if let Some(stored) = self.values.get(name) {
            for subscription in self.subscriptions.iter_mut() {
                let matches = subscription
                    .name
                    .as_deref()
                    .map(|filter| filter == name)
                    .unwrap_or(true);
                if matches {
                    (subscription.listener)(name, stored);
                }
            }
        }
    }

    pub fn clear(&mut self, name: &str) {
        self.write(name, FieldValue::Empty);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Deep copy of every stored value; later writes do not affect it.
    pub fn snapshot(&self) -> FieldValues {
        self.values.clone()
    }

    /// Registers a listener called after every write, or only after writes to
    /// `name` when a filter is given.
    pub fn subscribe<F>(&mut self, name: Option<&str>, listener: F) -> SubscriptionId
    where
        F: FnMut(&str, &FieldValue) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscriptions.push(Subscription {
            id,
            name: name.map(String::from),
            listener: Box::new(listener),
        });
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions
            .retain(|subscription| subscription.id != id);
        before != self.subscriptions.len()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn write_then_read_returns_value_for_every_kind() {
        let mut store = FormValueStore::new();
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).expect("date");
        let cases = vec![
            ("text", FieldValue::Text("hello".into())),
            ("choice", FieldValue::Choice("r".into())),
            ("choices", FieldValue::Choices(vec!["a".into(), "b".into()])),
            ("date", FieldValue::Date(date)),
            ("files", FieldValue::Files(vec![FileHandle::named("cv.pdf")])),
        ];
        for (name, value) in cases {
            store.write(name, value.clone());
            assert_eq!(store.read(name), Some(&value));
        }
        assert_eq!(store.read("missing"), None);
        assert_eq!(store.value_or_empty("missing"), FieldValue::Empty);
    }

    #[test]
    fn snapshot_is_isolated_from_later_writes() {
        let mut store = FormValueStore::new();
        store.write("name", FieldValue::Text("before".into()));
        let snapshot = store.snapshot();
        store.write("name", FieldValue::Text("after".into()));
        assert_eq!(snapshot["name"], FieldValue::Text("before".into()));
    }

    #[test]
    fn subscribers_see_matching_writes_until_unsubscribed() {
        let mut store = FormValueStore::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = store.subscribe(Some("city"), move |name, value| {
            sink.borrow_mut().push(format!("{}={}", name, value));
        });

        store.write("city", FieldValue::Text("Oslo".into()));
        store.write("country", FieldValue::Text("NO".into()));
        assert!(store.unsubscribe(id));
        store.write("city", FieldValue::Text("Bergen".into()));

        assert_eq!(*seen.borrow(), vec!["city=Oslo".to_string()]);
        assert!(!store.unsubscribe(id));
    }

    #[test]
    fn submission_json_encoding() {
        assert_eq!(FieldValue::Empty.to_json(), json!(""));
        assert_eq!(
            FieldValue::Date(NaiveDate::from_ymd_opt(2023, 1, 5).expect("date")).to_json(),
            json!("2023-01-05")
        );
        assert_eq!(
            FieldValue::Files(vec![FileHandle::named("a.txt")]).to_json(),
            json!([{ "name": "a.txt" }])
        );
        assert!(FieldValue::Text(String::new()).is_empty());
        assert!(!FieldValue::Choice("x".into()).is_empty());
    }
}
