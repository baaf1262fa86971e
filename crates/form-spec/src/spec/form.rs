use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::spec::field::FieldDescriptor;

/// Top-level form definition: a title plus ordered groups of fields.
///
/// The outer grouping is authoring convenience only; layout works on the
/// flattened sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FormSchema {
    #[serde(alias = "formTitle")]
    pub title: String,
    #[serde(default, alias = "formFields")]
    pub fields: Vec<Vec<FieldDescriptor>>,
}

impl FormSchema {
    pub fn new(title: impl Into<String>, fields: Vec<Vec<FieldDescriptor>>) -> Self {
        Self {
            title: title.into(),
            fields,
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, SchemaError> {
        serde_json::from_str(raw).map_err(SchemaError::Parse)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, SchemaError> {
        serde_json::from_value(value).map_err(SchemaError::Parse)
    }

    /// Concatenates the groups, preserving group-then-field order.
    pub fn flatten(&self) -> Vec<&FieldDescriptor> {
        self.fields.iter().flatten().collect()
    }

    /// Depth-first walk over every descriptor, inline sub-fields included.
    pub fn all_fields(&self) -> Vec<&FieldDescriptor> {
        let mut out = Vec::new();
        for field in self.fields.iter().flatten() {
            collect(field, &mut out);
        }
        out
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.all_fields()
            .into_iter()
            .find(|field| field.name == name)
    }
}

fn collect<'a>(field: &'a FieldDescriptor, out: &mut Vec<&'a FieldDescriptor>) {
    out.push(field);
    if let Some(inline) = field.kind.inline() {
        for nested in inline.form_fields.iter().flatten() {
            collect(nested, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::field::FieldKind;

    const SCHEMA: &str = r#"{
        "formTitle": "Shipping",
        "formFields": [
            [ { "id": "1", "name": "city", "label": "City", "type": "Input", "placeHolder": "Town" } ],
            [
                { "id": "2", "name": "parcels", "label": "Parcels", "type": "InLineForm",
                  "formFields": [[ { "id": "3", "name": "weight", "label": "Weight", "type": "Input" } ]] },
                { "id": "4", "name": "sig", "label": "Signature", "type": "Signature" }
            ]
        ]
    }"#;

    #[test]
    fn parses_camel_case_schema() {
        let schema = FormSchema::from_json_str(SCHEMA).expect("schema");
        assert_eq!(schema.title, "Shipping");
        let names = schema
            .flatten()
            .iter()
            .map(|field| field.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["city", "parcels", "sig"]);
        assert_eq!(schema.flatten()[0].placeholder.as_deref(), Some("Town"));
        assert_eq!(schema.flatten()[2].kind, FieldKind::Unknown);
    }

    #[test]
    fn all_fields_descends_into_inline_groups() {
        let schema = FormSchema::from_json_str(SCHEMA).expect("schema");
        assert_eq!(schema.all_fields().len(), 4);
        let weight = schema.find_field("weight").expect("nested field");
        assert_eq!(weight.label, "Weight");
        assert!(schema.find_field("missing").is_none());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(FormSchema::from_json_str("{ \"formTitle\": 3 }").is_err());
    }
}
