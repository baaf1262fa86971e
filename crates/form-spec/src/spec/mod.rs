pub mod field;
pub mod form;

pub use field::{
    Condition, FieldDescriptor, FieldKind, InlineSpec, SelectOption, SelectSpec, Validation,
};
pub use form::FormSchema;
