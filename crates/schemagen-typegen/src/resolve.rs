//! Reference resolution.
//!
//! Turns an ordered table of descriptors into a [`TypeRegistry`]: an arena of
//! entries indexed by [`TypeId`] in which every `Reference(name)` has been
//! rewritten into a non-owning [`ResolvedType::Link`]. Recursive types stay
//! links, so cyclic graphs never expand.
//!
//! Resolution runs in two passes. Pass 1 reserves a slot (and a graph node)
//! for every name, so pass 2 can bind references regardless of declaration
//! order.

use crate::ir::{DefaultValue, EnumMember, ScalarKind, TypeDescriptor, TypeKind, TypeRef};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error(
        "type `{referencing_type}` (field `{field}`) references `{missing_name}`, which is not declared"
    )]
    UnresolvedReference {
        referencing_type: String,
        field: String,
        missing_name: String,
    },
    #[error("type `{0}` is declared more than once")]
    DuplicateType(String),
    #[error("table entry `{key}` holds a descriptor named `{name}`")]
    NameMismatch { key: String, name: String },
}

/// Index of a type in its registry (declaration order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(usize);

impl TypeId {
    pub fn index(self) -> usize {
        self.0
    }

    fn node(self) -> NodeIndex {
        NodeIndex::new(self.0)
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A type expression whose references are bound to registry entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResolvedType {
    Scalar(ScalarKind),
    Link(TypeId),
    List(Box<ResolvedType>),
    Optional(Box<ResolvedType>),
}

impl ResolvedType {
    pub fn is_optional(&self) -> bool {
        matches!(self, ResolvedType::Optional(_))
    }

    /// The expression with one level of `Optional` removed.
    pub fn inner(&self) -> &ResolvedType {
        match self {
            ResolvedType::Optional(inner) => inner,
            other => other,
        }
    }

    /// Every linked type, in order of appearance.
    pub fn links(&self) -> Vec<TypeId> {
        match self {
            ResolvedType::Scalar(_) => Vec::new(),
            ResolvedType::Link(id) => vec![*id],
            ResolvedType::List(inner) | ResolvedType::Optional(inner) => inner.links(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    pub name: String,
    pub ty: ResolvedType,
    pub default: DefaultValue,
    pub docs: Option<String>,
}

impl ResolvedField {
    pub fn is_required(&self) -> bool {
        !self.ty.is_optional() && self.default.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedKind {
    Record(Vec<ResolvedField>),
    Enum(Vec<EnumMember>),
}

/// One resolved type.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    id: TypeId,
    descriptor: TypeDescriptor,
    kind: ResolvedKind,
}

impl RegistryEntry {
    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn docs(&self) -> Option<&str> {
        self.descriptor.docs()
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn kind(&self) -> &ResolvedKind {
        &self.kind
    }

    pub fn fields(&self) -> &[ResolvedField] {
        match &self.kind {
            ResolvedKind::Record(fields) => fields,
            ResolvedKind::Enum(_) => &[],
        }
    }

    pub fn members(&self) -> &[EnumMember] {
        match &self.kind {
            ResolvedKind::Record(_) => &[],
            ResolvedKind::Enum(members) => members,
        }
    }

    pub fn is_enum(&self) -> bool {
        matches!(self.kind, ResolvedKind::Enum(_))
    }
}

/// All named types of one translation unit plus their reference graph.
///
/// Immutable once [`resolve`] returns.
#[derive(Debug)]
pub struct TypeRegistry {
    entries: Vec<RegistryEntry>,
    by_name: HashMap<String, TypeId>,
    graph: DiGraph<TypeId, ()>,
    recursive_groups: Vec<Vec<TypeId>>,
    recursive: Vec<bool>,
}

/// Resolve an ordered `(name, descriptor)` table into a registry.
pub fn resolve(entries: Vec<(String, TypeDescriptor)>) -> Result<TypeRegistry, ResolveError> {
    let mut by_name = HashMap::with_capacity(entries.len());
    let mut graph = DiGraph::with_capacity(entries.len(), 0);

    // Pass 1: a placeholder slot per name.
    for (index, (key, descriptor)) in entries.iter().enumerate() {
        if key != descriptor.name() {
            return Err(ResolveError::NameMismatch {
                key: key.clone(),
                name: descriptor.name().to_string(),
            });
        }
        if by_name.insert(key.clone(), TypeId(index)).is_some() {
            return Err(ResolveError::DuplicateType(key.clone()));
        }
        graph.add_node(TypeId(index));
    }

    // Pass 2: bind references.
    let mut resolved = Vec::with_capacity(entries.len());
    for (index, (_, descriptor)) in entries.into_iter().enumerate() {
        let id = TypeId(index);
        let kind = match descriptor.kind() {
            TypeKind::Record(fields) => {
                let mut out = Vec::with_capacity(fields.len());
                for field in fields {
                    let ty = bind(&field.ty, &by_name, &mut |missing| {
                        ResolveError::UnresolvedReference {
                            referencing_type: descriptor.name().to_string(),
                            field: field.name.clone(),
                            missing_name: missing.to_string(),
                        }
                    })?;
                    for target in ty.links() {
                        graph.update_edge(id.node(), target.node(), ());
                    }
                    out.push(ResolvedField {
                        name: field.name.clone(),
                        ty,
                        default: field.default.clone(),
                        docs: field.docs.clone(),
                    });
                }
                ResolvedKind::Record(out)
            }
            TypeKind::Enum(members) => ResolvedKind::Enum(members.clone()),
        };
        tracing::debug!(type_name = descriptor.name(), "resolved");
        resolved.push(RegistryEntry {
            id,
            descriptor,
            kind,
        });
    }

    let (recursive_groups, recursive) = find_recursion(&graph);
    if !recursive_groups.is_empty() {
        tracing::debug!(groups = recursive_groups.len(), "recursive type groups");
    }

    Ok(TypeRegistry {
        entries: resolved,
        by_name,
        graph,
        recursive_groups,
        recursive,
    })
}

fn bind(
    ty: &TypeRef,
    by_name: &HashMap<String, TypeId>,
    missing: &mut dyn FnMut(&str) -> ResolveError,
) -> Result<ResolvedType, ResolveError> {
    Ok(match ty {
        TypeRef::Scalar(kind) => ResolvedType::Scalar(*kind),
        TypeRef::Reference(name) => match by_name.get(name) {
            Some(id) => ResolvedType::Link(*id),
            None => return Err(missing(name)),
        },
        TypeRef::List(inner) => ResolvedType::List(Box::new(bind(inner, by_name, missing)?)),
        TypeRef::Optional(inner) => {
            ResolvedType::Optional(Box::new(bind(inner, by_name, missing)?))
        }
    })
}

// Strongly connected components with more than one member, or with a self-loop.
fn find_recursion(graph: &DiGraph<TypeId, ()>) -> (Vec<Vec<TypeId>>, Vec<bool>) {
    let mut recursive = vec![false; graph.node_count()];
    let mut groups = Vec::new();

    for scc in tarjan_scc(graph) {
        let cyclic = scc.len() > 1 || graph.contains_edge(scc[0], scc[0]);
        if !cyclic {
            continue;
        }
        let mut group: Vec<TypeId> = scc.iter().map(|n| graph[*n]).collect();
        group.sort();
        for id in &group {
            recursive[id.0] = true;
        }
        groups.push(group);
    }

    groups.sort();
    (groups, recursive)
}

impl TypeRegistry {
    /// Resolve descriptors keyed by their own names.
    pub fn from_descriptors(defs: Vec<TypeDescriptor>) -> Result<Self, ResolveError> {
        resolve(
            defs.into_iter()
                .map(|d| (d.name().to_string(), d))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn id(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.id(name).map(|id| self.entry(id))
    }

    pub fn entry(&self, id: TypeId) -> &RegistryEntry {
        &self.entries[id.0]
    }

    pub fn name(&self, id: TypeId) -> &str {
        self.entry(id).name()
    }

    /// Entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name())
    }

    /// Types referenced directly by `id`, in declaration order.
    pub fn references(&self, id: TypeId) -> Vec<TypeId> {
        let mut out: Vec<TypeId> = self
            .graph
            .neighbors(id.node())
            .map(|n| self.graph[n])
            .collect();
        out.sort();
        out
    }

    /// Every type transitively referenced from `id` (not `id` itself), in
    /// declaration order.
    pub fn reachable_from(&self, id: TypeId) -> Vec<TypeId> {
        let mut out = Vec::new();
        let mut dfs = Dfs::new(&self.graph, id.node());
        while let Some(node) = dfs.next(&self.graph) {
            let reached = self.graph[node];
            if reached != id {
                out.push(reached);
            }
        }
        out.sort();
        out
    }

    /// Whether `id` can reach itself through references.
    pub fn is_recursive(&self, id: TypeId) -> bool {
        self.recursive[id.0]
    }

    /// Groups of mutually (or self-) recursive types.
    pub fn recursive_groups(&self) -> &[Vec<TypeId>] {
        &self.recursive_groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::FieldDescriptor;

    fn record(name: &str, fields: Vec<FieldDescriptor>) -> TypeDescriptor {
        TypeDescriptor::record(name, fields).unwrap()
    }

    #[test]
    fn forward_reference_binds() {
        let registry = TypeRegistry::from_descriptors(vec![
            record(
                "Order",
                vec![FieldDescriptor::required(
                    "customer",
                    TypeRef::reference("Customer"),
                )],
            ),
            record(
                "Customer",
                vec![FieldDescriptor::required("name", ScalarKind::String)],
            ),
        ])
        .unwrap();

        let order = registry.get("Order").unwrap();
        let customer = registry.id("Customer").unwrap();
        assert_eq!(order.fields()[0].ty, ResolvedType::Link(customer));
        assert_eq!(registry.references(order.id()), vec![customer]);
    }

    #[test]
    fn self_reference_links_back() {
        let registry = TypeRegistry::from_descriptors(vec![record(
            "Node",
            vec![FieldDescriptor::optional(
                "next",
                TypeRef::reference("Node"),
            )],
        )])
        .unwrap();

        let node = registry.id("Node").unwrap();
        assert_eq!(
            registry.entry(node).fields()[0].ty,
            ResolvedType::Optional(Box::new(ResolvedType::Link(node)))
        );
        assert!(registry.is_recursive(node));
        assert_eq!(registry.recursive_groups(), &[vec![node]]);
        assert!(registry.reachable_from(node).is_empty());
    }

    #[test]
    fn mutual_recursion_is_one_group() {
        let registry = TypeRegistry::from_descriptors(vec![
            record(
                "A",
                vec![FieldDescriptor::optional("b", TypeRef::reference("B"))],
            ),
            record(
                "B",
                vec![FieldDescriptor::required(
                    "a",
                    TypeRef::list(TypeRef::reference("A")),
                )],
            ),
            record("C", vec![FieldDescriptor::required("a", TypeRef::reference("A"))]),
        ])
        .unwrap();

        let a = registry.id("A").unwrap();
        let b = registry.id("B").unwrap();
        let c = registry.id("C").unwrap();
        assert_eq!(registry.recursive_groups(), &[vec![a, b]]);
        assert!(!registry.is_recursive(c));
        assert_eq!(registry.reachable_from(c), vec![a, b]);
    }

    #[test]
    fn missing_reference_fails() {
        let err = TypeRegistry::from_descriptors(vec![record(
            "Order",
            vec![
                FieldDescriptor::required("id", ScalarKind::String),
                FieldDescriptor::required("items", TypeRef::list(TypeRef::reference("Item"))),
            ],
        )])
        .unwrap_err();

        assert_eq!(
            err,
            ResolveError::UnresolvedReference {
                referencing_type: "Order".into(),
                field: "items".into(),
                missing_name: "Item".into(),
            }
        );
    }

    #[test]
    fn duplicate_type_fails() {
        let err = TypeRegistry::from_descriptors(vec![
            record("A", vec![]),
            record("A", vec![]),
        ])
        .unwrap_err();
        assert_eq!(err, ResolveError::DuplicateType("A".into()));
    }

    #[test]
    fn mismatched_key_fails() {
        let err = resolve(vec![("B".to_string(), record("A", vec![]))]).unwrap_err();
        assert!(matches!(err, ResolveError::NameMismatch { .. }));
    }
}
