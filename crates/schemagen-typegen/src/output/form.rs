//! Form descriptor generator.
//!
//! Maps every record reachable from a root model onto a group of form
//! controls: a presentation kind, validators, a TypeScript default literal and
//! the field's TypeScript type. The descriptor is framework-neutral; the
//! TypeScript interfaces are a projection of it (see
//! [`generate_interfaces`](super::typescript::generate_interfaces)).

use crate::ir::{DefaultValue, Literal, ScalarKind};
use crate::model::{ModelField, ModelSet, ModelType, ResolvedModel};
use crate::traits::{OutputPlugin, PluginError};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("root record `{root}` not found (available records: {})", .available.join(", "))]
    RootNotFound { root: String, available: Vec<String> },
}

/// Form descriptor as pretty JSON.
pub struct FormPlugin;

impl OutputPlugin for FormPlugin {
    fn name(&self) -> &'static str {
        "form"
    }

    fn description(&self) -> &'static str {
        "Form descriptor: controls, validators and defaults per field"
    }

    fn extension(&self) -> &'static str {
        "form.json"
    }

    fn generate(&self, models: &ModelSet<'_>, root: &str) -> Result<String, PluginError> {
        let form = generate(models, root)?;
        Ok(serde_json::to_string_pretty(&form)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormDescriptor {
    pub root: String,
    pub groups: Vec<FormGroup>,
}

impl FormDescriptor {
    pub fn group(&self, name: &str) -> Option<&FormGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// TypeScript interfaces for every group.
    pub fn typescript(&self) -> String {
        super::typescript::generate_interfaces(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormGroup {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<FormField>,
}

impl FormGroup {
    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub kind: ControlKind,
    pub required: bool,
    pub validators: Vec<Validator>,
    /// TypeScript literal.
    pub default: String,
    pub ts_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// How a field is presented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlKind {
    Toggle,
    Numeric,
    Date,
    Select { options: Vec<String> },
    Tags,
    /// A list of sub-forms over `group`.
    Repeatable { group: String },
    /// A single sub-form over `group`.
    Nested { group: String },
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Validator {
    Required,
}

/// Build the form descriptor rooted at the record `root`.
pub fn generate(models: &ModelSet<'_>, root: &str) -> Result<FormDescriptor, FormError> {
    let model = models
        .get(root)
        .filter(|m| !m.is_enum())
        .ok_or_else(|| FormError::RootNotFound {
            root: root.to_string(),
            available: models
                .iter()
                .filter(|m| !m.is_enum())
                .map(|m| m.name().to_string())
                .collect(),
        })?;

    let groups = std::iter::once(model)
        .chain(models.reachable_from(model.id()))
        .filter(|m| !m.is_enum())
        .map(|m| form_group(models, m))
        .collect();

    Ok(FormDescriptor {
        root: root.to_string(),
        groups,
    })
}

fn form_group(models: &ModelSet<'_>, model: &ResolvedModel) -> FormGroup {
    FormGroup {
        name: model.name().to_string(),
        description: model.docs().map(str::to_string),
        fields: model.fields().iter().map(|f| form_field(models, f)).collect(),
    }
}

fn form_field(models: &ModelSet<'_>, field: &ModelField) -> FormField {
    FormField {
        name: field.name.clone(),
        label: title_case(&field.name),
        kind: control_kind(models, field),
        required: field.required,
        validators: if field.required {
            vec![Validator::Required]
        } else {
            Vec::new()
        },
        default: default_literal(&field.default),
        ts_type: ts_type(models, &field.ty),
        description: field.docs.clone(),
    }
}

fn control_kind(models: &ModelSet<'_>, field: &ModelField) -> ControlKind {
    match field.ty.inner() {
        ModelType::Scalar(kind) => match kind {
            ScalarKind::Boolean => ControlKind::Toggle,
            ScalarKind::Integer | ScalarKind::Decimal => ControlKind::Numeric,
            ScalarKind::Date | ScalarKind::DateTime => ControlKind::Date,
            ScalarKind::String if looks_temporal(&field.name) => ControlKind::Date,
            ScalarKind::String | ScalarKind::Bytes => ControlKind::Text,
        },
        ModelType::Model(link) => match models.model(link.target()) {
            Some(target) if target.is_enum() => ControlKind::Select {
                options: target.labels().map(str::to_string).collect(),
            },
            Some(target) => ControlKind::Nested {
                group: target.name().to_string(),
            },
            None => ControlKind::Text,
        },
        ModelType::List(item) => match item.inner() {
            ModelType::Scalar(_) => ControlKind::Tags,
            ModelType::Model(link) => match models.model(link.target()) {
                Some(target) if target.is_enum() => ControlKind::Tags,
                Some(target) => ControlKind::Repeatable {
                    group: target.name().to_string(),
                },
                None => ControlKind::Text,
            },
            _ => ControlKind::Text,
        },
        ModelType::Optional(_) => ControlKind::Text,
    }
}

fn looks_temporal(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    name.contains("date") || name.contains("time")
}

/// TypeScript type of a field, e.g. `string`, `Item[]`, `number | null`.
pub(crate) fn ts_type(models: &ModelSet<'_>, ty: &ModelType) -> String {
    match ty {
        ModelType::Scalar(kind) => match kind {
            ScalarKind::Integer | ScalarKind::Decimal => "number".to_string(),
            ScalarKind::Boolean => "boolean".to_string(),
            _ => "string".to_string(),
        },
        ModelType::Model(link) => match models.model(link.target()) {
            Some(target) if !target.is_enum() => target.name().to_string(),
            _ => "string".to_string(),
        },
        ModelType::List(inner) => {
            let item = ts_type(models, inner);
            if item.contains('|') {
                format!("({item})[]")
            } else {
                format!("{item}[]")
            }
        }
        ModelType::Optional(inner) => format!("{} | null", ts_type(models, inner)),
    }
}

/// Default value as a TypeScript literal.
pub(crate) fn default_literal(default: &DefaultValue) -> String {
    match default {
        DefaultValue::None => "null".to_string(),
        DefaultValue::EmptyCollection => "[]".to_string(),
        DefaultValue::Literal(literal) => match literal {
            Literal::String(s) => format!("'{}'", escape_single_quoted(s)),
            Literal::Integer(i) => i.to_string(),
            Literal::Decimal(d) => d.to_string(),
            Literal::Boolean(b) => b.to_string(),
        },
    }
}

pub(crate) fn escape_single_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

/// `order_id` -> `Order Id`, `firstName` -> `First Name`.
pub fn title_case(name: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in name.chars() {
        if c == '_' || c == '-' || c == ' ' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
