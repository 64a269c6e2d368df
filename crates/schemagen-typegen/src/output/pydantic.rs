//! Pydantic v2 model writer.
//!
//! Emits one `Enum` class per enum, then one `BaseModel` class per record, each
//! in declaration order. References to records declared later (or to the class
//! itself) are quoted, and such classes get a trailing `model_rebuild()`.

use crate::ir::{DefaultValue, Literal, ScalarKind};
use crate::model::{ModelField, ModelSet, ModelType, ResolvedModel};
use crate::traits::{OutputPlugin, PluginError};
use std::collections::BTreeSet;
use std::fmt::Write;

pub struct PydanticPlugin;

impl OutputPlugin for PydanticPlugin {
    fn name(&self) -> &'static str {
        "pydantic"
    }

    fn description(&self) -> &'static str {
        "Pydantic v2 model source"
    }

    fn extension(&self) -> &'static str {
        "py"
    }

    fn generate(&self, models: &ModelSet<'_>, _root: &str) -> Result<String, PluginError> {
        Ok(generate_pydantic(models))
    }
}

/// Render every built model as Python source.
pub fn generate_pydantic(models: &ModelSet<'_>) -> String {
    PydanticWriter::new(models).emit()
}

struct PydanticWriter<'a, 'r> {
    models: &'a ModelSet<'r>,
    output: String,
    typing: BTreeSet<&'static str>,
    datetime: BTreeSet<&'static str>,
    uses_enum: bool,
    uses_field: bool,
    rebuild: Vec<String>,
}

impl<'a, 'r> PydanticWriter<'a, 'r> {
    fn new(models: &'a ModelSet<'r>) -> Self {
        Self {
            models,
            output: String::new(),
            typing: BTreeSet::new(),
            datetime: BTreeSet::new(),
            uses_enum: false,
            uses_field: false,
            rebuild: Vec::new(),
        }
    }

    fn emit(mut self) -> String {
        let mut body = String::new();
        let models = self.models;
        for model in models.iter().filter(|m| m.is_enum()) {
            body.push_str("\n\n");
            self.write_enum(&mut body, model);
        }
        for model in models.iter().filter(|m| !m.is_enum()) {
            body.push_str("\n\n");
            self.write_model(&mut body, model);
        }
        if !self.rebuild.is_empty() {
            body.push_str("\n\n");
            for name in &self.rebuild {
                let _ = writeln!(body, "{name}.model_rebuild()");
            }
        }

        self.write_imports();
        self.output.push_str(&body);
        self.output
    }

    fn write_imports(&mut self) {
        if !self.datetime.is_empty() {
            let names: Vec<&str> = self.datetime.iter().copied().collect();
            let _ = writeln!(self.output, "from datetime import {}", names.join(", "));
        }
        if self.uses_enum {
            self.output.push_str("from enum import Enum\n");
        }
        if !self.typing.is_empty() {
            let names: Vec<&str> = self.typing.iter().copied().collect();
            let _ = writeln!(self.output, "from typing import {}", names.join(", "));
        }
        if !self.output.is_empty() {
            self.output.push('\n');
        }
        if self.uses_field {
            self.output.push_str("from pydantic import BaseModel, Field\n");
        } else {
            self.output.push_str("from pydantic import BaseModel\n");
        }
    }

    fn write_enum(&mut self, out: &mut String, model: &ResolvedModel) {
        self.uses_enum = true;
        let all_strings = model
            .members()
            .iter()
            .all(|m| matches!(m.value, Literal::String(_)));
        let base = if all_strings { "str, Enum" } else { "Enum" };
        let _ = writeln!(out, "class {}({}):", model.name(), base);
        write_docstring(out, model.docs());
        for member in model.members() {
            let _ = writeln!(
                out,
                "    {} = {}",
                identifier(&member.label),
                python_literal(&member.value)
            );
        }
    }

    fn write_model(&mut self, out: &mut String, model: &ResolvedModel) {
        let _ = writeln!(out, "class {}(BaseModel):", model.name());
        let has_docs = model.docs().is_some();
        write_docstring(out, model.docs());
        if model.fields().is_empty() {
            if !has_docs {
                out.push_str("    pass\n");
            }
            return;
        }
        if has_docs {
            out.push('\n');
        }

        let mut forward = false;
        for field in model.fields() {
            let annotation = self.annotation(model, &field.ty, &mut forward);
            let name = field_name(&field.name);
            let alias = (name != field.name).then_some(field.name.as_str());
            let _ = writeln!(
                out,
                "    {}: {}{}",
                name,
                annotation,
                self.assignment(field, alias)
            );
        }
        if forward {
            self.rebuild.push(model.name().to_string());
        }
    }

    fn annotation(&mut self, owner: &ResolvedModel, ty: &ModelType, forward: &mut bool) -> String {
        match ty {
            ModelType::Scalar(kind) => match kind {
                ScalarKind::String => "str".to_string(),
                ScalarKind::Integer => "int".to_string(),
                ScalarKind::Decimal => "float".to_string(),
                ScalarKind::Boolean => "bool".to_string(),
                ScalarKind::Bytes => "bytes".to_string(),
                ScalarKind::Date => {
                    self.datetime.insert("date");
                    "date".to_string()
                }
                ScalarKind::DateTime => {
                    self.datetime.insert("datetime");
                    "datetime".to_string()
                }
            },
            ModelType::Model(link) => {
                let name = self.models.registry().name(link.target());
                let is_enum = self.models.model(link.target()).is_some_and(|m| m.is_enum());
                if !is_enum && link.target() >= owner.id() {
                    *forward = true;
                    format!("\"{name}\"")
                } else {
                    name.to_string()
                }
            }
            ModelType::List(inner) => {
                self.typing.insert("List");
                format!("List[{}]", self.annotation(owner, inner, forward))
            }
            ModelType::Optional(inner) => {
                self.typing.insert("Optional");
                format!("Optional[{}]", self.annotation(owner, inner, forward))
            }
        }
    }

    fn assignment(&mut self, field: &ModelField, alias: Option<&str>) -> String {
        let mut args = Vec::new();
        let value = match &field.default {
            DefaultValue::EmptyCollection => {
                args.push("default_factory=list".to_string());
                None
            }
            DefaultValue::Literal(literal) => Some(match field.ty.inner() {
                ModelType::Model(link) => match literal {
                    Literal::String(label) => format!(
                        "{}.{}",
                        self.models.registry().name(link.target()),
                        identifier(label)
                    ),
                    other => python_literal(other),
                },
                _ => python_literal(literal),
            }),
            DefaultValue::None if field.ty.is_optional() => Some("None".to_string()),
            DefaultValue::None => None,
        };

        if let Some(alias) = alias {
            if let Some(value) = value {
                args.push(format!("default={value}"));
            }
            args.push(format!("alias={}", python_literal(&Literal::String(alias.into()))));
        } else if let Some(value) = value {
            return format!(" = {value}");
        }

        if args.is_empty() {
            return String::new();
        }
        self.uses_field = true;
        format!(" = Field({})", args.join(", "))
    }
}

fn write_docstring(out: &mut String, docs: Option<&str>) {
    if let Some(docs) = docs {
        let _ = writeln!(out, "    \"\"\"{}\"\"\"", docs.replace("\"\"\"", "\\\"\\\"\\\""));
    }
}

fn python_literal(literal: &Literal) -> String {
    match literal {
        Literal::Boolean(true) => "True".to_string(),
        Literal::Boolean(false) => "False".to_string(),
        Literal::Integer(i) => i.to_string(),
        Literal::Decimal(d) => format!("{d:?}"),
        Literal::String(s) => {
            let mut out = String::with_capacity(s.len() + 2);
            out.push('"');
            for c in s.chars() {
                match c {
                    '\\' => out.push_str("\\\\"),
                    '"' => out.push_str("\\\""),
                    '\n' => out.push_str("\\n"),
                    c => out.push(c),
                }
            }
            out.push('"');
            out
        }
    }
}

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

/// Make an enum label usable as a Python identifier.
fn identifier(label: &str) -> String {
    let mut out: String = label
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    if PYTHON_KEYWORDS.contains(&out.as_str()) {
        out.push('_');
    }
    out
}

/// Pydantic treats leading underscores as private attributes, so fields get a
/// `field` prefix instead.
fn field_name(name: &str) -> String {
    let out = identifier(name);
    if out.starts_with('_') {
        format!("field{out}")
    } else {
        out
    }
}
