//! JSON Schema emitter.
//!
//! Emits draft 2020-12 documents from a [`ModelSet`], either one unified
//! document rooted at a chosen type or one document per model. Documents are
//! `serde_json::Value`s built with `preserve_order`, so properties and
//! definitions follow declaration order and repeated runs are byte-identical.

use crate::ir::{DefaultValue, ScalarKind};
use crate::model::{ModelField, ModelSet, ModelType, ResolvedModel};
use crate::resolve::TypeId;
use crate::traits::{OutputPlugin, PluginError};
use serde::Serialize;
use serde_json::{Map, Value, json};

pub const SCHEMA_DIALECT: &str = "https://json-schema.org/draft/2020-12/schema";

/// A generated JSON Schema document.
pub type Document = Value;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    #[error("root type `{root}` not found (available: {})", .available.join(", "))]
    RootNotFound { root: String, available: Vec<String> },
}

/// Unified JSON Schema document, pretty-printed.
pub struct JsonSchemaPlugin;

impl OutputPlugin for JsonSchemaPlugin {
    fn name(&self) -> &'static str {
        "json_schema"
    }

    fn description(&self) -> &'static str {
        "Unified JSON Schema (draft 2020-12) rooted at the main model"
    }

    fn extension(&self) -> &'static str {
        "schema.json"
    }

    fn generate(&self, models: &ModelSet<'_>, root: &str) -> Result<String, PluginError> {
        let document = emit_unified(models, root)?;
        Ok(serde_json::to_string_pretty(&document)?)
    }
}

/// One document per model, plus the manifest describing them.
#[derive(Debug, Clone)]
pub struct IndividualSchemas {
    pub documents: Vec<(String, Document)>,
    pub index: SchemaIndex,
}

impl IndividualSchemas {
    pub fn get(&self, name: &str) -> Option<&Document> {
        self.documents
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, doc)| doc)
    }
}

/// `index.json` for individual mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaIndex {
    pub total_schemas: usize,
    pub generated_schemas: Vec<String>,
    pub schemas: Vec<SchemaIndexEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaIndexEntry {
    pub name: String,
    pub file: String,
    pub definitions: Vec<String>,
}

/// `summary.json` for unified mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaSummary {
    pub main_model: String,
    pub total_models: usize,
    pub schema_file: String,
    pub nested_types: Vec<String>,
    pub models: Vec<String>,
}

impl SchemaSummary {
    pub fn new(models: &ModelSet<'_>, root: &str, document: &Document) -> Self {
        let nested_types = document
            .get("$defs")
            .and_then(Value::as_object)
            .map(|defs| defs.keys().cloned().collect())
            .unwrap_or_default();
        let names: Vec<String> = models.iter().map(|m| m.name().to_string()).collect();
        Self {
            main_model: root.to_string(),
            total_models: names.len(),
            schema_file: "schema.json".to_string(),
            nested_types,
            models: names,
        }
    }
}

/// File name of a model's individual schema.
pub fn schema_file_name(name: &str) -> String {
    format!("{name}.schema.json")
}

/// Emit one document describing `root` with everything it reaches in `$defs`.
pub fn emit_unified(models: &ModelSet<'_>, root: &str) -> Result<Document, SchemaError> {
    let model = models
        .get(root)
        .ok_or_else(|| SchemaError::RootNotFound {
            root: root.to_string(),
            available: models.names().into_iter().map(String::from).collect(),
        })?;
    Ok(SchemaEmitter::new(models, model.id()).emit(model))
}

/// Emit one document per built model, each with its own `$defs`.
pub fn emit_individual(models: &ModelSet<'_>) -> IndividualSchemas {
    let mut documents = Vec::new();
    let mut entries = Vec::new();

    for model in models.iter() {
        let document = SchemaEmitter::new(models, model.id()).emit(model);
        let definitions = document
            .get("$defs")
            .and_then(Value::as_object)
            .map(|defs| defs.keys().cloned().collect())
            .unwrap_or_default();
        entries.push(SchemaIndexEntry {
            name: model.name().to_string(),
            file: schema_file_name(model.name()),
            definitions,
        });
        documents.push((model.name().to_string(), document));
    }

    tracing::debug!(count = documents.len(), "emitted individual schemas");

    IndividualSchemas {
        index: SchemaIndex {
            total_schemas: documents.len(),
            generated_schemas: entries.iter().map(|e| e.file.clone()).collect(),
            schemas: entries,
        },
        documents,
    }
}

struct SchemaEmitter<'a, 'r> {
    models: &'a ModelSet<'r>,
    root: TypeId,
}

impl<'a, 'r> SchemaEmitter<'a, 'r> {
    fn new(models: &'a ModelSet<'r>, root: TypeId) -> Self {
        Self { models, root }
    }

    fn emit(&self, model: &ResolvedModel) -> Document {
        let mut doc = Map::new();
        doc.insert("$schema".into(), json!(SCHEMA_DIALECT));
        if let Value::Object(body) = self.model_schema(model) {
            doc.extend(body);
        }

        let mut defs = Map::new();
        for nested in self.models.reachable_from(self.root) {
            defs.insert(nested.name().to_string(), self.model_schema(nested));
        }
        if !defs.is_empty() {
            doc.insert("$defs".into(), Value::Object(defs));
        }
        Value::Object(doc)
    }

    fn model_schema(&self, model: &ResolvedModel) -> Value {
        let mut schema = Map::new();
        schema.insert("title".into(), json!(model.name()));
        if let Some(docs) = model.docs() {
            schema.insert("description".into(), json!(docs));
        }

        if model.is_enum() {
            schema.insert("type".into(), json!("string"));
            schema.insert("enum".into(), model.labels().collect());
            return Value::Object(schema);
        }

        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in model.fields() {
            properties.insert(field.name.clone(), self.field_schema(field));
            if field.required {
                required.push(json!(field.name));
            }
        }
        schema.insert("type".into(), json!("object"));
        schema.insert("properties".into(), Value::Object(properties));
        if !required.is_empty() {
            schema.insert("required".into(), Value::Array(required));
        }
        Value::Object(schema)
    }

    fn field_schema(&self, field: &ModelField) -> Value {
        let mut schema = match self.type_schema(&field.ty) {
            Value::Object(map) => map,
            other => return other,
        };
        if let Some(docs) = &field.docs {
            schema.insert("description".into(), json!(docs));
        }
        match &field.default {
            DefaultValue::Literal(literal) => {
                schema.insert("default".into(), literal.to_json());
            }
            DefaultValue::EmptyCollection => {
                schema.insert("default".into(), json!([]));
            }
            DefaultValue::None if field.ty.is_optional() => {
                schema.insert("default".into(), Value::Null);
            }
            DefaultValue::None => {}
        }
        Value::Object(schema)
    }

    fn type_schema(&self, ty: &ModelType) -> Value {
        match ty {
            ModelType::Scalar(kind) => scalar_schema(*kind),
            ModelType::Model(link) => json!({ "$ref": self.pointer(link.target()) }),
            ModelType::List(inner) => json!({ "type": "array", "items": self.type_schema(inner) }),
            ModelType::Optional(inner) => json!({
                "anyOf": [self.type_schema(inner), { "type": "null" }]
            }),
        }
    }

    fn pointer(&self, target: TypeId) -> String {
        if target == self.root {
            "#".to_string()
        } else {
            format!("#/$defs/{}", escape_pointer(self.models.registry().name(target)))
        }
    }
}

/// Escape a `$defs` key as a JSON Pointer reference token (RFC 6901).
fn escape_pointer(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn scalar_schema(kind: ScalarKind) -> Value {
    match kind {
        ScalarKind::String => json!({ "type": "string" }),
        ScalarKind::Integer => json!({ "type": "integer" }),
        ScalarKind::Decimal => json!({ "type": "number" }),
        ScalarKind::Boolean => json!({ "type": "boolean" }),
        ScalarKind::Date => json!({ "type": "string", "format": "date" }),
        ScalarKind::DateTime => json!({ "type": "string", "format": "date-time" }),
        ScalarKind::Bytes => json!({ "type": "string", "contentEncoding": "base64" }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{FieldDescriptor, Literal, TypeDescriptor, TypeRef};
    use crate::model::build;
    use crate::resolve::TypeRegistry;

    fn person_registry() -> TypeRegistry {
        TypeRegistry::from_descriptors(vec![
            TypeDescriptor::record(
                "Person",
                vec![
                    FieldDescriptor::required("name", ScalarKind::String),
                    FieldDescriptor::required("age", ScalarKind::Integer),
                    FieldDescriptor::optional("email", ScalarKind::String),
                    FieldDescriptor::required("tags", TypeRef::list(ScalarKind::String.into()))
                        .with_default(DefaultValue::EmptyCollection),
                    FieldDescriptor::required("color", TypeRef::reference("Color"))
                        .with_default(DefaultValue::Literal("RED".into())),
                ],
            )
            .unwrap()
            .with_docs("Someone we know"),
            TypeDescriptor::string_enum("Color", &["RED", "GREEN"]).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn unified_person_document() {
        let registry = person_registry();
        let models = build(&registry).into_result().unwrap();
        let doc = emit_unified(&models, "Person").unwrap();

        assert_eq!(
            doc,
            json!({
                "$schema": SCHEMA_DIALECT,
                "title": "Person",
                "description": "Someone we know",
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "age": { "type": "integer" },
                    "email": { "anyOf": [{ "type": "string" }, { "type": "null" }], "default": null },
                    "tags": { "type": "array", "items": { "type": "string" }, "default": [] },
                    "color": { "$ref": "#/$defs/Color", "default": "RED" }
                },
                "required": ["name", "age"],
                "$defs": {
                    "Color": { "title": "Color", "type": "string", "enum": ["RED", "GREEN"] }
                }
            })
        );
    }

    #[test]
    fn self_reference_points_at_document_root() {
        let registry = TypeRegistry::from_descriptors(vec![
            TypeDescriptor::record(
                "Node",
                vec![
                    FieldDescriptor::required("value", ScalarKind::Decimal)
                        .with_default(DefaultValue::Literal(Literal::Decimal(0.5))),
                    FieldDescriptor::optional("next", TypeRef::reference("Node")),
                ],
            )
            .unwrap(),
        ])
        .unwrap();
        let models = build(&registry).into_result().unwrap();
        let doc = emit_unified(&models, "Node").unwrap();

        assert_eq!(
            doc["properties"]["next"],
            json!({ "anyOf": [{ "$ref": "#" }, { "type": "null" }], "default": null })
        );
        assert_eq!(doc["properties"]["value"]["default"], json!(0.5));
        assert!(doc.get("$defs").is_none());
        assert!(doc.get("required").is_none());
    }

    #[test]
    fn missing_root_lists_available() {
        let registry = person_registry();
        let models = build(&registry).into_result().unwrap();
        let err = emit_unified(&models, "Nobody").unwrap_err();
        assert_eq!(
            err.to_string(),
            "root type `Nobody` not found (available: Person, Color)"
        );
    }

    #[test]
    fn individual_index() {
        let registry = person_registry();
        let models = build(&registry).into_result().unwrap();
        let schemas = emit_individual(&models);

        insta::assert_json_snapshot!(schemas.index, @r###"
        {
          "total_schemas": 2,
          "generated_schemas": [
            "Person.schema.json",
            "Color.schema.json"
          ],
          "schemas": [
            {
              "name": "Person",
              "file": "Person.schema.json",
              "definitions": [
                "Color"
              ]
            },
            {
              "name": "Color",
              "file": "Color.schema.json",
              "definitions": []
            }
          ]
        }
        "###);
        assert!(schemas.get("Color").unwrap().get("$defs").is_none());
    }

    #[test]
    fn summary_lists_nested_types() {
        let registry = person_registry();
        let models = build(&registry).into_result().unwrap();
        let doc = emit_unified(&models, "Person").unwrap();
        let summary = SchemaSummary::new(&models, "Person", &doc);

        assert_eq!(summary.main_model, "Person");
        assert_eq!(summary.total_models, 2);
        assert_eq!(summary.nested_types, vec!["Color"]);
    }

    #[test]
    fn scalar_formats() {
        let registry = TypeRegistry::from_descriptors(vec![
            TypeDescriptor::record(
                "Upload",
                vec![
                    FieldDescriptor::required("taken", ScalarKind::Date),
                    FieldDescriptor::required("received", ScalarKind::DateTime),
                    FieldDescriptor::required("payload", ScalarKind::Bytes),
                    FieldDescriptor::required("ratio", ScalarKind::Decimal),
                ],
            )
            .unwrap(),
        ])
        .unwrap();
        let models = build(&registry).into_result().unwrap();
        let doc = emit_unified(&models, "Upload").unwrap();

        let props = &doc["properties"];
        assert_eq!(props["taken"], json!({ "type": "string", "format": "date" }));
        assert_eq!(
            props["received"],
            json!({ "type": "string", "format": "date-time" })
        );
        assert_eq!(
            props["payload"],
            json!({ "type": "string", "contentEncoding": "base64" })
        );
        assert_eq!(props["ratio"], json!({ "type": "number" }));
    }

    #[test]
    fn refs_escape_pointer_tokens() {
        let registry = TypeRegistry::from_descriptors(vec![
            TypeDescriptor::record(
                "Root",
                vec![FieldDescriptor::required("item", TypeRef::reference("ns/Item~v1"))],
            )
            .unwrap(),
            TypeDescriptor::record(
                "ns/Item~v1",
                vec![FieldDescriptor::required("sku", ScalarKind::String)],
            )
            .unwrap(),
        ])
        .unwrap();
        let models = build(&registry).into_result().unwrap();
        let doc = emit_unified(&models, "Root").unwrap();

        let reference = doc["properties"]["item"]["$ref"].as_str().unwrap();
        assert_eq!(reference, "#/$defs/ns~1Item~0v1");
        assert!(doc.pointer(&reference[1..]).is_some());
        assert!(doc["$defs"].get("ns/Item~v1").is_some());
    }
}
