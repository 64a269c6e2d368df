//! Validating-model builder.
//!
//! [`build`] turns every registry entry into a [`ResolvedModel`]: a runtime
//! validator that constructs instances from JSON input, fills defaults and
//! rejects malformed data. Building favors partial success; a type that fails
//! takes down only itself and the types that depend on it.

use crate::ir::{DefaultValue, EnumMember, Literal, ScalarKind};
use crate::resolve::{RegistryEntry, ResolvedKind, ResolvedType, TypeId, TypeRegistry};
use serde::Serialize;
use serde_json::{Map, Value};

/// A type that could not be built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot build `{type_name}`: {reason}")]
pub struct BuildError {
    pub type_name: String,
    pub reason: String,
}

impl BuildError {
    fn new(type_name: &str, reason: impl Into<String>) -> Self {
        Self {
            type_name: type_name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Instance construction failures. `path` is dotted from the root type,
/// e.g. `Order.items[1].sku`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{path}: field is required")]
    MissingField { path: String },
    #[error("{path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },
    #[error("{path}: `{value}` is not a member of `{enum_name}` (expected one of: {})", .allowed.join(", "))]
    InvalidEnumValue {
        path: String,
        enum_name: String,
        value: String,
        allowed: Vec<String>,
    },
    #[error("no model named `{0}`")]
    UnknownModel(String),
}

/// Link from one model to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelLink {
    /// Target was already built when the link was created.
    Bound(TypeId),
    /// Target not yet built; patched by the finalize pass.
    Deferred(TypeId),
}

impl ModelLink {
    pub fn target(self) -> TypeId {
        match self {
            ModelLink::Bound(id) | ModelLink::Deferred(id) => id,
        }
    }

    pub fn is_bound(self) -> bool {
        matches!(self, ModelLink::Bound(_))
    }
}

/// The validator shape of one field.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelType {
    Scalar(ScalarKind),
    Model(ModelLink),
    List(Box<ModelType>),
    Optional(Box<ModelType>),
}

impl ModelType {
    pub fn is_optional(&self) -> bool {
        matches!(self, ModelType::Optional(_))
    }

    pub fn inner(&self) -> &ModelType {
        match self {
            ModelType::Optional(inner) => inner,
            other => other,
        }
    }

    fn for_each_link(&self, f: &mut impl FnMut(ModelLink)) {
        match self {
            ModelType::Scalar(_) => {}
            ModelType::Model(link) => f(*link),
            ModelType::List(inner) | ModelType::Optional(inner) => inner.for_each_link(f),
        }
    }

    fn patch(&mut self) {
        match self {
            ModelType::Scalar(_) => {}
            ModelType::Model(link) => *link = ModelLink::Bound(link.target()),
            ModelType::List(inner) | ModelType::Optional(inner) => inner.patch(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelField {
    pub name: String,
    pub ty: ModelType,
    pub default: DefaultValue,
    pub required: bool,
    pub docs: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelShape {
    Record(Vec<ModelField>),
    Enum(Vec<EnumMember>),
}

/// A built validator for one named type.
#[derive(Debug, Clone)]
pub struct ResolvedModel {
    id: TypeId,
    name: String,
    docs: Option<String>,
    shape: ModelShape,
}

impl ResolvedModel {
    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn docs(&self) -> Option<&str> {
        self.docs.as_deref()
    }

    pub fn shape(&self) -> &ModelShape {
        &self.shape
    }

    pub fn fields(&self) -> &[ModelField] {
        match &self.shape {
            ModelShape::Record(fields) => fields,
            ModelShape::Enum(_) => &[],
        }
    }

    pub fn field(&self, name: &str) -> Option<&ModelField> {
        self.fields().iter().find(|f| f.name == name)
    }

    pub fn members(&self) -> &[EnumMember] {
        match &self.shape {
            ModelShape::Record(_) => &[],
            ModelShape::Enum(members) => members,
        }
    }

    pub fn is_enum(&self) -> bool {
        matches!(self.shape, ModelShape::Enum(_))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.members().iter().map(|m| m.label.as_str())
    }

    fn for_each_link(&self, mut f: impl FnMut(ModelLink)) {
        for field in self.fields() {
            field.ty.for_each_link(&mut f);
        }
    }
}

/// The built models of one registry, indexed by [`TypeId`].
///
/// Types that failed to build have no model. Read-only once [`build`]
/// returns.
#[derive(Debug)]
pub struct ModelSet<'r> {
    registry: &'r TypeRegistry,
    models: Vec<Option<ResolvedModel>>,
}

/// Outcome of [`build`]: the models that built plus every failure.
#[derive(Debug)]
pub struct BuildReport<'r> {
    pub models: ModelSet<'r>,
    pub errors: Vec<BuildError>,
}

impl<'r> BuildReport<'r> {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// Strict mode: the first failure, if any, becomes the error.
    pub fn into_result(self) -> Result<ModelSet<'r>, BuildError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(self.models),
        }
    }
}

/// Build a validator for every entry of `registry`.
pub fn build(registry: &TypeRegistry) -> BuildReport<'_> {
    let mut models: Vec<Option<ResolvedModel>> = Vec::with_capacity(registry.len());
    let mut errors = Vec::new();

    for group in registry.recursive_groups() {
        let names: Vec<&str> = group.iter().map(|id| registry.name(*id)).collect();
        tracing::debug!(types = ?names, "recursive group");
    }

    // Pass 1: registration order; links to types not yet built are deferred.
    for entry in registry.iter() {
        match build_one(registry, entry, &models) {
            Ok(model) => {
                tracing::debug!(type_name = entry.name(), "built model");
                models.push(Some(model));
            }
            Err(err) => {
                tracing::warn!(type_name = %err.type_name, reason = %err.reason, "model build failed");
                errors.push(err);
                models.push(None);
            }
        }
    }

    // Finalize: fail dependents of missing models until nothing changes.
    loop {
        let mut failed = Vec::new();
        for model in models.iter().flatten() {
            let mut missing = None;
            model.for_each_link(|link| {
                if missing.is_none() && models[link.target().index()].is_none() {
                    missing = Some(link.target());
                }
            });
            if let Some(target) = missing {
                failed.push((model.id(), target));
            }
        }
        if failed.is_empty() {
            break;
        }
        for (id, target) in failed {
            let err = BuildError::new(
                registry.name(id),
                format!("depends on `{}`, which failed to build", registry.name(target)),
            );
            tracing::warn!(type_name = %err.type_name, reason = %err.reason, "model build failed");
            errors.push(err);
            models[id.index()] = None;
        }
    }

    for model in models.iter_mut().flatten() {
        if let ModelShape::Record(fields) = &mut model.shape {
            for field in fields {
                field.ty.patch();
            }
        }
    }

    let built = models.iter().filter(|m| m.is_some()).count();
    tracing::info!(built, failed = errors.len(), "models built");

    BuildReport {
        models: ModelSet { registry, models },
        errors,
    }
}

fn build_one(
    registry: &TypeRegistry,
    entry: &RegistryEntry,
    built: &[Option<ResolvedModel>],
) -> Result<ResolvedModel, BuildError> {
    let name = entry.name();
    let shape = match entry.kind() {
        ResolvedKind::Enum(members) => {
            if members.is_empty() {
                return Err(BuildError::new(name, "enum has no members"));
            }
            ModelShape::Enum(members.clone())
        }
        ResolvedKind::Record(fields) => {
            let mut out = Vec::with_capacity(fields.len());
            for field in fields {
                check_default(registry, &field.ty, &field.default).map_err(|reason| {
                    BuildError::new(name, format!("field `{}`: {reason}", field.name))
                })?;
                out.push(ModelField {
                    name: field.name.clone(),
                    ty: model_type(&field.ty, built),
                    default: field.default.clone(),
                    required: field.is_required(),
                    docs: field.docs.clone(),
                });
            }
            ModelShape::Record(out)
        }
    };

    Ok(ResolvedModel {
        id: entry.id(),
        name: name.to_string(),
        docs: entry.docs().map(str::to_string),
        shape,
    })
}

fn model_type(ty: &ResolvedType, built: &[Option<ResolvedModel>]) -> ModelType {
    match ty {
        ResolvedType::Scalar(kind) => ModelType::Scalar(*kind),
        ResolvedType::Link(id) => {
            let ready = built.get(id.index()).is_some_and(Option::is_some);
            ModelType::Model(if ready {
                ModelLink::Bound(*id)
            } else {
                ModelLink::Deferred(*id)
            })
        }
        ResolvedType::List(inner) => ModelType::List(Box::new(model_type(inner, built))),
        ResolvedType::Optional(inner) => ModelType::Optional(Box::new(model_type(inner, built))),
    }
}

fn check_default(
    registry: &TypeRegistry,
    ty: &ResolvedType,
    default: &DefaultValue,
) -> Result<(), String> {
    let ty = ty.inner();
    match default {
        DefaultValue::None => Ok(()),
        DefaultValue::EmptyCollection => match ty {
            ResolvedType::List(_) => Ok(()),
            _ => Err("empty-collection default on a non-list field".to_string()),
        },
        DefaultValue::Literal(literal) => match ty {
            ResolvedType::Scalar(kind) => {
                if literal_fits(*kind, literal) {
                    Ok(())
                } else {
                    Err(format!("default {literal:?} does not match type {kind}"))
                }
            }
            ResolvedType::Link(id) => {
                let target = registry.entry(*id);
                match literal {
                    Literal::String(label) if target.members().iter().any(|m| &m.label == label) => {
                        Ok(())
                    }
                    _ if target.is_enum() => Err(format!(
                        "default {literal:?} is not a label of `{}`",
                        target.name()
                    )),
                    _ => Err(format!(
                        "literal default on reference to record `{}`",
                        target.name()
                    )),
                }
            }
            ResolvedType::List(_) | ResolvedType::Optional(_) => {
                Err(format!("literal default {literal:?} on a list field"))
            }
        },
    }
}

fn literal_fits(kind: ScalarKind, literal: &Literal) -> bool {
    match (kind, literal) {
        (ScalarKind::Boolean, Literal::Boolean(_)) => true,
        (ScalarKind::Integer, Literal::Integer(_)) => true,
        (ScalarKind::Decimal, Literal::Integer(_) | Literal::Decimal(_)) => true,
        (ScalarKind::String | ScalarKind::Bytes, Literal::String(_)) => true,
        (ScalarKind::Date | ScalarKind::DateTime, Literal::String(s)) => scalar_ok(kind, s),
        _ => false,
    }
}

fn scalar_ok(kind: ScalarKind, s: &str) -> bool {
    match kind {
        ScalarKind::Date => chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
        ScalarKind::DateTime => chrono::DateTime::parse_from_rfc3339(s).is_ok(),
        _ => true,
    }
}

/// A constructed, validated instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Instance {
    #[serde(skip)]
    type_name: String,
    value: Value,
}

impl Instance {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.value.get(field)
    }

    pub fn get_mut(&mut self, field: &str) -> Option<&mut Value> {
        self.value.get_mut(field)
    }

    pub fn as_value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

impl<'r> ModelSet<'r> {
    pub fn registry(&self) -> &'r TypeRegistry {
        self.registry
    }

    pub fn model(&self, id: TypeId) -> Option<&ResolvedModel> {
        self.models.get(id.index()).and_then(Option::as_ref)
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedModel> {
        self.registry.id(name).and_then(|id| self.model(id))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Built models in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedModel> {
        self.models.iter().flatten()
    }

    pub fn names(&self) -> Vec<&str> {
        self.iter().map(|m| m.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Built models transitively referenced from `id`, in declaration order.
    pub fn reachable_from(&self, id: TypeId) -> Vec<&ResolvedModel> {
        self.registry
            .reachable_from(id)
            .into_iter()
            .filter_map(|id| self.model(id))
            .collect()
    }

    /// Validate `input` against the model named `type_name`.
    pub fn construct(&self, type_name: &str, input: &Value) -> Result<Instance, ValidationError> {
        let model = self
            .get(type_name)
            .ok_or_else(|| ValidationError::UnknownModel(type_name.to_string()))?;
        let value = self.validate_model(model, input, type_name)?;
        Ok(Instance {
            type_name: type_name.to_string(),
            value,
        })
    }

    /// The instance built from an empty input.
    pub fn defaults(&self, type_name: &str) -> Result<Instance, ValidationError> {
        self.construct(type_name, &Value::Object(Map::new()))
    }

    fn validate_model(
        &self,
        model: &ResolvedModel,
        input: &Value,
        path: &str,
    ) -> Result<Value, ValidationError> {
        match &model.shape {
            ModelShape::Enum(members) => match input {
                Value::String(s) if members.iter().any(|m| &m.label == s) => Ok(input.clone()),
                Value::String(s) => Err(ValidationError::InvalidEnumValue {
                    path: path.to_string(),
                    enum_name: model.name.clone(),
                    value: s.clone(),
                    allowed: members.iter().map(|m| m.label.clone()).collect(),
                }),
                other => Err(mismatch(path, "string", other)),
            },
            ModelShape::Record(fields) => {
                let Value::Object(obj) = input else {
                    return Err(mismatch(path, "object", input));
                };
                let mut out = Map::new();
                for field in fields {
                    let field_path = format!("{path}.{}", field.name);
                    let value = match obj.get(&field.name) {
                        Some(v) => self.validate(&field.ty, v, &field_path)?,
                        None => match &field.default {
                            DefaultValue::Literal(literal) => literal.to_json(),
                            DefaultValue::EmptyCollection => Value::Array(Vec::new()),
                            DefaultValue::None if field.ty.is_optional() => Value::Null,
                            DefaultValue::None => {
                                return Err(ValidationError::MissingField { path: field_path });
                            }
                        },
                    };
                    out.insert(field.name.clone(), value);
                }
                Ok(Value::Object(out))
            }
        }
    }

    fn validate(&self, ty: &ModelType, input: &Value, path: &str) -> Result<Value, ValidationError> {
        match ty {
            ModelType::Optional(_) if input.is_null() => Ok(Value::Null),
            ModelType::Optional(inner) => self.validate(inner, input, path),
            ModelType::List(inner) => {
                let Value::Array(items) = input else {
                    return Err(mismatch(path, "array", input));
                };
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.validate(inner, item, &format!("{path}[{i}]")))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
            ModelType::Model(link) => {
                let model = self.model(link.target()).ok_or_else(|| {
                    ValidationError::UnknownModel(self.registry.name(link.target()).to_string())
                })?;
                self.validate_model(model, input, path)
            }
            ModelType::Scalar(kind) => validate_scalar(*kind, input, path),
        }
    }
}

const MAX_EXACT_FLOAT_INTEGER: f64 = 9_007_199_254_740_992.0;

fn validate_scalar(kind: ScalarKind, input: &Value, path: &str) -> Result<Value, ValidationError> {
    let ok = match kind {
        ScalarKind::String | ScalarKind::Bytes => input.is_string(),
        ScalarKind::Integer if input.is_i64() || input.is_u64() => true,
        // Zero-fraction numbers count as integers in JSON Schema.
        ScalarKind::Integer => match input.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < MAX_EXACT_FLOAT_INTEGER => {
                return Ok(Value::from(f as i64));
            }
            _ => false,
        },
        ScalarKind::Decimal => input.is_number(),
        ScalarKind::Boolean => input.is_boolean(),
        ScalarKind::Date | ScalarKind::DateTime => {
            input.as_str().is_some_and(|s| scalar_ok(kind, s))
        }
    };
    if ok {
        Ok(input.clone())
    } else {
        Err(mismatch(path, expected_name(kind), input))
    }
}

fn expected_name(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::String => "string",
        ScalarKind::Integer => "integer",
        ScalarKind::Decimal => "number",
        ScalarKind::Boolean => "boolean",
        ScalarKind::Date => "date (YYYY-MM-DD)",
        ScalarKind::DateTime => "RFC 3339 date-time",
        ScalarKind::Bytes => "base64 string",
    }
}

fn mismatch(path: &str, expected: &str, found: &Value) -> ValidationError {
    let found = match found {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::String(s) => format!("string {s:?}"),
        Value::Array(_) => "array".to_string(),
        Value::Object(_) => "object".to_string(),
    };
    ValidationError::TypeMismatch {
        path: path.to_string(),
        expected: expected.to_string(),
        found,
    }
}
