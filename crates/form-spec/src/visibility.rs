use crate::spec::form::FormSchema;

/// Field name to visibility.
pub type VisibilityMap = std::collections::BTreeMap<String, bool>;

/// Resolves the schema-declared hidden flags for every field in the tree.
///
/// An inline sub-field is hidden when it or any enclosing inline group is.
pub fn resolve_visibility(schema: &FormSchema) -> VisibilityMap {
    let mut map = VisibilityMap::new();
    for field in schema.fields.iter().flatten() {
        visit(field, true, &mut map);
    }
    map
}

fn visit(field: &crate::spec::FieldDescriptor, parent_visible: bool, map: &mut VisibilityMap) {
    let visible = parent_visible && !field.hidden();
    map.entry(field.name.clone()).or_insert(visible);
    if let Some(inline) = field.kind.inline() {
        for nested in inline.form_fields.iter().flatten() {
            visit(nested, visible, map);
        }
    }
}

pub fn is_visible(map: &VisibilityMap, name: &str) -> bool {
    map.get(name).copied().unwrap_or(true)
}
