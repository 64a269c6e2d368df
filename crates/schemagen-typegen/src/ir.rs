//! Type descriptor model.
//!
//! The normalized, language-neutral representation of a record/enum table as
//! handed over by the schema compiler. Everything downstream (resolver, model
//! builder, emitters) consumes this IR.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Errors raised while constructing descriptors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    #[error("type name must not be empty")]
    EmptyName,
    #[error("record `{type_name}` declares field `{field}` more than once")]
    DuplicateField { type_name: String, field: String },
    #[error("record `{type_name}` has a field with an empty name")]
    EmptyFieldName { type_name: String },
    #[error("enum `{type_name}` declares label `{label}` more than once")]
    DuplicateLabel { type_name: String, label: String },
}

/// Primitive kinds a field can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarKind {
    String,
    Integer,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Bytes,
}

impl ScalarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Integer => "integer",
            ScalarKind::Decimal => "decimal",
            ScalarKind::Boolean => "boolean",
            ScalarKind::Date => "date",
            ScalarKind::DateTime => "date_time",
            ScalarKind::Bytes => "bytes",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ScalarKind::Integer | ScalarKind::Decimal)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, ScalarKind::Date | ScalarKind::DateTime)
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A type expression.
///
/// Encoded in JSON as a bare scalar name (`"string"`) or a single-key object
/// (`{"ref": "Address"}`, `{"list": ...}`, `{"optional": ...}`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeRef {
    #[serde(rename = "ref")]
    Reference(String),
    List(Box<TypeRef>),
    Optional(Box<TypeRef>),
    #[serde(untagged)]
    Scalar(ScalarKind),
}

impl TypeRef {
    pub fn reference(name: impl Into<String>) -> Self {
        TypeRef::Reference(name.into())
    }

    pub fn list(inner: TypeRef) -> Self {
        TypeRef::List(Box::new(inner))
    }

    pub fn optional(inner: TypeRef) -> Self {
        TypeRef::Optional(Box::new(inner))
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, TypeRef::Optional(_))
    }

    /// The expression with one level of `Optional` removed.
    pub fn inner(&self) -> &TypeRef {
        match self {
            TypeRef::Optional(inner) => inner,
            other => other,
        }
    }

    /// Every type name referenced anywhere in the expression, in order.
    pub fn references(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            TypeRef::Scalar(_) => {}
            TypeRef::Reference(name) => out.push(name),
            TypeRef::List(inner) | TypeRef::Optional(inner) => inner.collect_references(out),
        }
    }
}

impl From<ScalarKind> for TypeRef {
    fn from(kind: ScalarKind) -> Self {
        TypeRef::Scalar(kind)
    }
}

/// A literal default or enum value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
}

impl Literal {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Literal::Boolean(b) => serde_json::Value::Bool(*b),
            Literal::Integer(i) => serde_json::Value::from(*i),
            Literal::Decimal(d) => serde_json::Number::from_f64(*d)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Literal::String(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::String(s.to_string())
    }
}

impl From<i64> for Literal {
    fn from(i: i64) -> Self {
        Literal::Integer(i)
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Literal::Boolean(b)
    }
}

/// How a field is defaulted when an instance omits it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultValue {
    #[default]
    None,
    Literal(Literal),
    /// A fresh empty collection per constructed instance.
    EmptyCollection,
}

impl DefaultValue {
    pub fn is_none(&self) -> bool {
        matches!(self, DefaultValue::None)
    }
}

/// One field of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(default, skip_serializing_if = "DefaultValue::is_none")]
    pub default: DefaultValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            default: DefaultValue::None,
            docs: None,
        }
    }

    /// A field that must always be supplied.
    pub fn required(name: impl Into<String>, ty: impl Into<TypeRef>) -> Self {
        Self::new(name, ty.into())
    }

    /// A field whose type is wrapped in `Optional`.
    pub fn optional(name: impl Into<String>, ty: impl Into<TypeRef>) -> Self {
        Self::new(name, TypeRef::optional(ty.into()))
    }

    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = default;
        self
    }

    pub fn with_docs(mut self, docs: impl Into<String>) -> Self {
        self.docs = Some(docs.into());
        self
    }

    /// Required iff not `Optional` and without a default.
    pub fn is_required(&self) -> bool {
        !self.ty.is_optional() && self.default.is_none()
    }
}

/// One member of an enum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumMember {
    pub label: String,
    pub value: Literal,
}

impl EnumMember {
    pub fn new(label: impl Into<String>, value: impl Into<Literal>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// The shape of a named type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Record(Vec<FieldDescriptor>),
    Enum(Vec<EnumMember>),
}

/// One named type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTypeDescriptor")]
pub struct TypeDescriptor {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    docs: Option<String>,
    #[serde(flatten)]
    kind: TypeKind,
}

#[derive(Deserialize)]
struct RawTypeDescriptor {
    name: String,
    #[serde(default)]
    docs: Option<String>,
    #[serde(flatten)]
    kind: TypeKind,
}

impl TryFrom<RawTypeDescriptor> for TypeDescriptor {
    type Error = DescriptorError;

    fn try_from(raw: RawTypeDescriptor) -> Result<Self, Self::Error> {
        let def = TypeDescriptor::new(raw.name, raw.kind)?;
        Ok(match raw.docs {
            Some(docs) => def.with_docs(docs),
            None => def,
        })
    }
}

impl TypeDescriptor {
    /// Build a descriptor, rejecting duplicate field names or enum labels.
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Result<Self, DescriptorError> {
        let name = name.into();
        if name.is_empty() {
            return Err(DescriptorError::EmptyName);
        }

        match &kind {
            TypeKind::Record(fields) => {
                let mut seen = HashSet::new();
                for field in fields {
                    if field.name.is_empty() {
                        return Err(DescriptorError::EmptyFieldName { type_name: name });
                    }
                    if !seen.insert(field.name.as_str()) {
                        return Err(DescriptorError::DuplicateField {
                            type_name: name,
                            field: field.name.clone(),
                        });
                    }
                }
            }
            TypeKind::Enum(members) => {
                let mut seen = HashSet::new();
                for member in members {
                    if !seen.insert(member.label.as_str()) {
                        return Err(DescriptorError::DuplicateLabel {
                            type_name: name,
                            label: member.label.clone(),
                        });
                    }
                }
            }
        }

        Ok(Self {
            name,
            docs: None,
            kind,
        })
    }

    pub fn record(
        name: impl Into<String>,
        fields: Vec<FieldDescriptor>,
    ) -> Result<Self, DescriptorError> {
        Self::new(name, TypeKind::Record(fields))
    }

    pub fn enumeration(
        name: impl Into<String>,
        members: Vec<EnumMember>,
    ) -> Result<Self, DescriptorError> {
        Self::new(name, TypeKind::Enum(members))
    }

    /// Enum whose labels double as their string values.
    pub fn string_enum(name: impl Into<String>, labels: &[&str]) -> Result<Self, DescriptorError> {
        Self::enumeration(
            name,
            labels.iter().map(|l| EnumMember::new(*l, *l)).collect(),
        )
    }

    pub fn with_docs(mut self, docs: impl Into<String>) -> Self {
        self.docs = Some(docs.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn docs(&self) -> Option<&str> {
        self.docs.as_deref()
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        match &self.kind {
            TypeKind::Record(fields) => fields,
            TypeKind::Enum(_) => &[],
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields().iter().find(|f| f.name == name)
    }

    pub fn is_enum(&self) -> bool {
        matches!(self.kind, TypeKind::Enum(_))
    }
}
