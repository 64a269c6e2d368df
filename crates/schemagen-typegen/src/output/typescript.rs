//! TypeScript interface writer.
//!
//! Renders a [`FormDescriptor`] as `export interface` declarations, one per
//! form group. Fields that are not required get a `?` marker.

use super::form::{FormDescriptor, FormGroup, escape_single_quoted, generate};
use crate::model::ModelSet;
use crate::traits::{OutputPlugin, PluginError};
use std::fmt::Write;

pub struct TypeScriptPlugin;

impl OutputPlugin for TypeScriptPlugin {
    fn name(&self) -> &'static str {
        "typescript"
    }

    fn description(&self) -> &'static str {
        "TypeScript interfaces for the form model"
    }

    fn extension(&self) -> &'static str {
        "ts"
    }

    fn generate(&self, models: &ModelSet<'_>, root: &str) -> Result<String, PluginError> {
        Ok(generate_interfaces(&generate(models, root)?))
    }
}

/// Render every group of `form` as an exported interface.
pub fn generate_interfaces(form: &FormDescriptor) -> String {
    let mut writer = TypeScriptWriter::new();
    for (i, group) in form.groups.iter().enumerate() {
        if i > 0 {
            writer.output.push('\n');
        }
        writer.write_interface(group);
    }
    writer.output
}

struct TypeScriptWriter {
    output: String,
    indent: usize,
}

impl TypeScriptWriter {
    fn new() -> Self {
        Self {
            output: String::new(),
            indent: 0,
        }
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.output.push_str("  ");
        }
    }

    fn write_doc(&mut self, docs: &str) {
        self.write_indent();
        let _ = writeln!(self.output, "/** {} */", docs.replace("*/", "*\\/"));
    }

    fn write_interface(&mut self, group: &FormGroup) {
        if let Some(docs) = &group.description {
            self.write_doc(docs);
        }
        let _ = writeln!(self.output, "export interface {} {{", group.name);
        self.indent += 1;
        for field in &group.fields {
            if let Some(docs) = &field.description {
                self.write_doc(docs);
            }
            self.write_indent();
            let marker = if field.required { "" } else { "?" };
            let _ = writeln!(
                self.output,
                "{}{}: {};",
                property_key(&field.name),
                marker,
                field.ts_type
            );
        }
        self.indent -= 1;
        self.output.push_str("}\n");
    }
}

/// A field name as an object-type key, quoted unless it is a plain identifier.
fn property_key(name: &str) -> String {
    let mut chars = name.chars();
    let plain = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if plain {
        name.to_string()
    } else {
        format!("'{}'", escape_single_quoted(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{DefaultValue, FieldDescriptor, ScalarKind, TypeDescriptor, TypeRef};
    use crate::model::build;
    use crate::resolve::TypeRegistry;

    #[test]
    fn interfaces_for_nested_form() {
        let registry = TypeRegistry::from_descriptors(vec![
            TypeDescriptor::record(
                "Order",
                vec![
                    FieldDescriptor::required("id", ScalarKind::String).with_docs("Order number"),
                    FieldDescriptor::required("items", TypeRef::list(TypeRef::reference("Item"))),
                    FieldDescriptor::optional("note", ScalarKind::String),
                    FieldDescriptor::required("tags", TypeRef::list(ScalarKind::String.into()))
                        .with_default(DefaultValue::EmptyCollection),
                ],
            )
            .unwrap()
            .with_docs("A customer order"),
            TypeDescriptor::record(
                "Item",
                vec![
                    FieldDescriptor::required("quantity", ScalarKind::Integer),
                    FieldDescriptor::optional("gift", ScalarKind::Boolean),
                ],
            )
            .unwrap(),
        ])
        .unwrap();
        let models = build(&registry).into_result().unwrap();
        let form = generate(&models, "Order").unwrap();

        insta::assert_snapshot!(form.typescript(), @r###"
        /** A customer order */
        export interface Order {
          /** Order number */
          id: string;
          items: Item[];
          note?: string | null;
          tags?: string[];
        }

        export interface Item {
          quantity: number;
          gift?: boolean | null;
        }
        "###);
    }

    #[test]
    fn non_identifier_names_are_quoted() {
        let registry = TypeRegistry::from_descriptors(vec![
            TypeDescriptor::record(
                "Person",
                vec![
                    FieldDescriptor::required("first-name", ScalarKind::String),
                    FieldDescriptor::optional("2nd", ScalarKind::String),
                    FieldDescriptor::required("$id", ScalarKind::Integer),
                ],
            )
            .unwrap(),
        ])
        .unwrap();
        let models = build(&registry).into_result().unwrap();
        let source = generate(&models, "Person").unwrap().typescript();

        assert!(source.contains("  'first-name': string;\n"));
        assert!(source.contains("  '2nd'?: string | null;\n"));
        assert!(source.contains("  $id: number;\n"));
    }

    #[test]
    fn property_keys() {
        assert_eq!(property_key("city"), "city");
        assert_eq!(property_key("_private"), "_private");
        assert_eq!(property_key("it's"), "'it\\'s'");
        assert_eq!(property_key(""), "''");
    }
}
