#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod inline;
pub mod layout;
pub mod render;
pub mod resolver;
pub mod session;
pub mod spec;
pub mod store;
pub mod validate;
pub mod visibility;

pub use config::{FormOptions, InlineScope};
pub use error::{FormError, SchemaError};
pub use inline::{
    EntryTable, InlineEntry, InlineEntryCollection, InlineGroupEngine, TableColumn,
};
pub use layout::{GRID_COLUMNS, grid_span, pack_rows};
pub use render::{
    RenderField, RenderInlineGroup, RenderPayload, RenderStatus, RenderWidget, render_card,
    render_json_ui, render_text,
};
pub use resolver::{
    WidgetInput, WidgetKind, apply_input, resolve, selected_option, value_from_json,
};
pub use session::{EventOutcome, FormEvent, FormSession, SessionState, Submission};
pub use spec::{
    Condition, FieldDescriptor, FieldKind, FormSchema, InlineSpec, SelectOption, SelectSpec,
    Validation,
};
pub use store::{FieldValue, FieldValues, FileHandle, FormValueStore, SubscriptionId};
pub use validate::{
    SchemaIssue, SchemaReport, Severity, ValidationError, ValidationResult, check_schema, validate,
};
pub use visibility::{VisibilityMap, resolve_visibility};
