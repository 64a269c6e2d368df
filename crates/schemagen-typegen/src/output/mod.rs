//! Output generators.
//!
//! Every generator reads a built [`ModelSet`](crate::model::ModelSet); none
//! consumes another's output. Each also implements
//! [`OutputPlugin`](crate::traits::OutputPlugin) for uniform access via the
//! registry.

// JSON Schema
pub mod jsonschema;

pub use jsonschema::{
    Document, IndividualSchemas, JsonSchemaPlugin, SchemaError, SchemaIndex, SchemaIndexEntry,
    SchemaSummary, emit_individual, emit_unified, schema_file_name,
};

// Form descriptor
pub mod form;

pub use form::{
    ControlKind, FormDescriptor, FormError, FormField, FormGroup, FormPlugin, Validator,
    generate as generate_form,
};

// TypeScript
pub mod typescript;

pub use typescript::{TypeScriptPlugin, generate_interfaces};

// Pydantic
#[cfg(feature = "backend-pydantic")]
pub mod pydantic;

#[cfg(feature = "backend-pydantic")]
pub use pydantic::{PydanticPlugin, generate_pydantic};
