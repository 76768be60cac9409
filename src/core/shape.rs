//! Type shape resolution.
//!
//! [`ShapeResolver`] is the seam between the shape algorithm and whatever knows the host
//! program's types. [`CatalogResolver`] answers from a [`TypeCatalog`].
//!
//! Member hiding: the owner's own fields are collected first, then each embedded parent's
//! (`#[serde(flatten)]` / `base`) in declaration order, recursively. A name that was already
//! collected is skipped, so the most-derived declaration wins.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::core::catalog::{TypeCatalog, TypeDecl};
use crate::core::types::{Member, MemberKind, TypeRef, TypeShape};

pub trait ShapeResolver {
    /// Never fails: an unknown type resolves to an empty, unresolved shape.
    fn resolve(&self, ty: &TypeRef) -> TypeShape;

    /// Kind of a value type (no `Option` wrapper expected).
    fn kind_of(&self, ty: &TypeRef) -> MemberKind;

    /// Element type when `ty` is a recognized collection.
    fn collection_element<'t>(&self, ty: &'t TypeRef) -> Option<&'t TypeRef>;
}

pub const ATOMIC_TYPES: &[&str] = &[
    "DateTime",
    "NaiveDate",
    "NaiveDateTime",
    "NaiveTime",
    "Date",
    "Time",
    "OffsetDateTime",
    "PrimitiveDateTime",
    "Duration",
    "TimeDelta",
    "SystemTime",
    "Instant",
    "Uuid",
    "Ulid",
    "Url",
    "Uri",
];

pub const COLLECTION_TYPES: &[&str] =
    &["Vec", "VecDeque", "LinkedList", "HashSet", "BTreeSet", "BinaryHeap"];

/// Allow-lists used to classify member kinds. Detection is by name, never structural.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindRules {
    atomic: BTreeSet<String>,
    collections: BTreeSet<String>,
}

impl Default for KindRules {
    fn default() -> Self {
        KindRules {
            atomic: ATOMIC_TYPES.iter().map(|s| s.to_string()).collect(),
            collections: COLLECTION_TYPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl KindRules {
    pub fn with_atomic<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.atomic.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_collections<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.collections.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn is_atomic(&self, ty: &TypeRef) -> bool {
        ty.ident().is_some_and(|name| self.atomic.contains(name))
    }

    pub fn collection_element<'t>(&self, ty: &'t TypeRef) -> Option<&'t TypeRef> {
        match ty {
            TypeRef::Array { elem, .. } => Some(elem),
            TypeRef::Named { .. } => {
                let name = ty.ident()?;
                if self.collections.contains(name) { ty.single_arg() } else { None }
            }
            _ => None,
        }
    }
}

pub struct CatalogResolver<'c> {
    index: HashMap<&'c str, &'c TypeDecl>,
    rules: KindRules,
}

impl<'c> CatalogResolver<'c> {
    pub fn new(catalog: &'c TypeCatalog, rules: KindRules) -> Self {
        CatalogResolver { index: catalog.index(), rules }
    }

    fn lookup(&self, ty: &TypeRef) -> Option<&'c TypeDecl> {
        ty.ident().and_then(|name| self.index.get(name).copied())
    }

    fn collect(
        &self,
        decl: &'c TypeDecl,
        prefix: &[String],
        members: &mut Vec<Member>,
        seen: &mut HashSet<String>,
        visited: &mut HashSet<&'c str>,
    ) {
        //a type embedding itself (directly or not) is walked once
        if !visited.insert(decl.name.as_str()) {
            return;
        }

        for field in decl.fields.iter().filter(|f| f.public && !f.base) {
            if !seen.insert(field.name.clone()) {
                continue;
            }

            let optional = field.ty.is_option();
            let value_ty = field.ty.option_inner().unwrap_or(&field.ty);
            let mut access = prefix.to_vec();
            access.push(field.name.clone());

            members.push(Member {
                name: field.name.clone(),
                ty: field.ty.clone(),
                optional,
                required: !decl.has_default,
                kind: self.kind_of(value_ty),
                access,
            });
        }

        for base in decl.fields.iter().filter(|f| f.base) {
            let Some(parent) = self.lookup(&base.ty) else {
                tracing::debug!(owner = %decl.name, base = %base.ty, "embedded parent not in catalog");
                continue;
            };
            let mut nested = prefix.to_vec();
            nested.push(base.name.clone());
            self.collect(parent, &nested, members, seen, visited);
        }
    }
}

impl ShapeResolver for CatalogResolver<'_> {
    fn resolve(&self, ty: &TypeRef) -> TypeShape {
        let Some(decl) = self.lookup(ty) else {
            return TypeShape::empty(ty.identity());
        };

        let mut members = Vec::new();
        let mut seen = HashSet::new();
        let mut visited = HashSet::new();
        self.collect(decl, &[], &mut members, &mut seen, &mut visited);

        TypeShape {
            name: decl.name.clone(),
            members,
            fields: decl.fields.iter().map(|f| f.name.clone()).collect(),
            has_default: decl.has_default,
            resolved: true,
        }
    }

    fn kind_of(&self, ty: &TypeRef) -> MemberKind {
        if self.rules.is_atomic(ty) {
            return MemberKind::Atomic;
        }
        if let Some(element) = self.rules.collection_element(ty) {
            let element_ty = element.option_inner().unwrap_or(element);
            return MemberKind::Collection {
                element: element.clone(),
                element_kind: Box::new(self.kind_of(element_ty)),
            };
        }
        match self.lookup(ty) {
            Some(decl) => MemberKind::Complex { shape: decl.name.clone() },
            None => MemberKind::Scalar,
        }
    }

    fn collection_element<'t>(&self, ty: &'t TypeRef) -> Option<&'t TypeRef> {
        self.rules.collection_element(ty)
    }
}
