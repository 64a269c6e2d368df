//! Type-descriptor translation.
//!
//! `schemagen-typegen` takes a table of named records and enums (as produced
//! by a schema compiler), resolves the references between them, builds
//! validating runtime models, and re-expresses every type as JSON Schema, a
//! form descriptor, TypeScript interfaces or Pydantic models.
//!
//! # Architecture
//!
//! ```text
//! Input            Resolve            Build              Output Plugins
//! ───────────     ──────────────     ─────────────     ──────────────────
//!                                                    ┌─> JSON Schema (unified / individual)
//! type table ──> TypeRegistry ────> ModelSet ───────┼─> Form descriptor
//! (input/)       (resolve.rs)       (model.rs)       ├─> TypeScript interfaces
//!                                                    └─> Pydantic models
//! ```
//!
//! # Example
//!
//! ```
//! use schemagen_typegen::{input, model, output, resolve};
//!
//! let table = input::parse_type_table(&serde_json::json!([
//!     { "name": "Person", "record": [
//!         { "name": "name", "type": "string" },
//!         { "name": "email", "type": { "optional": "string" } }
//!     ]}
//! ]))
//! .unwrap();
//!
//! let registry = resolve(table).unwrap();
//! let models = model::build(&registry).into_result().unwrap();
//!
//! let person = models
//!     .construct("Person", &serde_json::json!({ "name": "Ada" }))
//!     .unwrap();
//! assert!(person.get("email").unwrap().is_null());
//!
//! let schema = output::emit_unified(&models, "Person").unwrap();
//! assert_eq!(schema["required"], serde_json::json!(["name"]));
//! ```
//!
//! # Using the Plugin Registry
//!
//! ```ignore
//! use schemagen_typegen::PluginRegistry;
//!
//! let plugins = PluginRegistry::with_builtins();
//! for (name, description) in plugins.list() {
//!     println!("{name}: {description}");
//! }
//!
//! if let Some(plugin) = plugins.get("typescript") {
//!     let source = plugin.generate(&models, "Person")?;
//!     println!("{source}");
//! }
//! ```
//!
//! # Feature Flags
//!
//! - `backend-pydantic` - Pydantic v2 model source (default)

pub mod input;
pub mod ir;
pub mod model;
pub mod output;
pub mod registry;
pub mod resolve;
pub mod traits;

pub use ir::{
    DefaultValue, DescriptorError, EnumMember, FieldDescriptor, Literal, ScalarKind,
    TypeDescriptor, TypeKind, TypeRef,
};
pub use model::{BuildError, BuildReport, Instance, ModelSet, ValidationError, build};
pub use output::{FormError, SchemaError};
pub use registry::{PluginRegistry, RegistryError};
pub use resolve::{ResolveError, TypeId, TypeRegistry, resolve};
pub use traits::{OutputPlugin, PluginError};

/// Any error raised by the translation engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] input::ParseError),
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Plugin(#[from] PluginError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
