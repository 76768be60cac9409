//! Mapping Normalizer.
//!
//! Turns raw declarations into [`FinalizedMapping`]s: declarations are grouped, deduplicated per
//! type pair (first wins), reverse mappings are derived, and every destination member gets a
//! [`MemberPlan`] saying where its value comes from and how it converts. Shapes are resolved
//! once per type identity and cached for the lifetime of the normalizer.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::core::classify::{Conversion, classify};
use crate::core::decl::{
    BindingSource, DeclOrigin, HookRef, MappingDeclaration, SourceLocation, TypePairKey,
};
use crate::core::expr::InlineExpr;
use crate::core::mapping::MappingSet;
use crate::core::propagate::derive_reverses;
use crate::core::shape::ShapeResolver;
use crate::core::types::{Member, MemberKind, TypeRef, TypeShape};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanValue {
    Member { source: Member, conversion: Conversion },
    Expression(InlineExpr),
    Ignored,
    /// Nothing is assigned.
    Missing(MissingReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissingReason {
    /// No binding and no same-named source member.
    NoSource,
    /// An explicit binding names a source member that does not exist.
    UnknownSource(String),
    /// Both members exist but no conversion applies.
    Unconvertible { source: TypeRef },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberPlan {
    pub destination: Member,
    pub value: PlanValue,
    pub condition: Option<InlineExpr>,
}

impl MemberPlan {
    pub fn is_assigned(&self) -> bool {
        matches!(self.value, PlanValue::Member { .. } | PlanValue::Expression(_))
    }

    /// Can be written directly into a struct literal.
    pub fn is_initializer_eligible(&self) -> bool {
        self.is_assigned() && self.condition.is_none() && !self.destination.is_inherited()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedMapping {
    pub group: String,
    pub key: TypePairKey,
    pub source_type: TypeRef,
    pub destination_type: TypeRef,
    pub source: TypeShape,
    pub destination: TypeShape,
    pub members: Vec<MemberPlan>,
    /// Bindings whose destination member does not exist.
    pub unknown_destinations: Vec<String>,
    pub ignore_non_existing: bool,
    pub hooks: HookRef,
    pub origin: DeclOrigin,
    pub location: Option<SourceLocation>,
}

pub struct Normalizer<'r> {
    resolver: &'r dyn ShapeResolver,
    shapes: HashMap<String, TypeShape>,
}

impl<'r> Normalizer<'r> {
    pub fn new(resolver: &'r dyn ShapeResolver) -> Self {
        Normalizer { resolver, shapes: HashMap::new() }
    }

    pub fn shape(&mut self, ty: &TypeRef) -> TypeShape {
        let resolver = self.resolver;
        self.shapes.entry(ty.identity()).or_insert_with(|| resolver.resolve(ty)).clone()
    }

    pub fn normalize(&mut self, declarations: &[MappingDeclaration]) -> Vec<FinalizedMapping> {
        let mut groups: Vec<(String, MappingSet)> = Vec::new();

        for decl in declarations {
            let at = match groups.iter().position(|(name, _)| *name == decl.group) {
                Some(at) => at,
                None => {
                    groups.push((decl.group.clone(), MappingSet::new()));
                    groups.len() - 1
                }
            };
            if let Err(conflict) = groups[at].1.insert(decl.clone()) {
                tracing::debug!(group = %decl.group, %conflict, "duplicate declaration dropped");
            }
        }

        let mut finalized = Vec::new();
        for (name, set) in groups.iter_mut() {
            let derived = derive_reverses(set);
            tracing::debug!(group = %name, mappings = set.len(), derived, "group normalized");

            for decl in set.iter() {
                finalized.push(self.finalize(decl, set));
            }
        }
        finalized
    }

    fn finalize(&mut self, decl: &MappingDeclaration, scope: &MappingSet) -> FinalizedMapping {
        let source = self.shape(&decl.source);
        let destination = self.shape(&decl.destination);

        let mut members = Vec::with_capacity(destination.members.len());
        for dest in &destination.members {
            let binding = decl.binding(&dest.name);

            let value = match binding.map(|b| &b.source) {
                Some(BindingSource::Ignored) => PlanValue::Ignored,
                Some(BindingSource::Expression(expr)) => PlanValue::Expression(expr.clone()),
                Some(BindingSource::Member(name)) => match source.member(name) {
                    Some(src) => self.convert(src, dest, scope),
                    None => PlanValue::Missing(MissingReason::UnknownSource(name.clone())),
                },
                None => match source.member(&dest.name) {
                    Some(src) => self.convert(src, dest, scope),
                    None => PlanValue::Missing(MissingReason::NoSource),
                },
            };

            let condition = match value {
                PlanValue::Ignored => None,
                _ => binding.and_then(|b| b.condition.clone()),
            };
            members.push(MemberPlan { destination: dest.clone(), value, condition });
        }

        let mut seen = HashSet::new();
        let unknown_destinations = decl
            .bindings
            .iter()
            .filter(|b| !destination.has_member(&b.destination))
            .filter(|b| seen.insert(b.destination.clone()))
            .map(|b| b.destination.clone())
            .collect();

        FinalizedMapping {
            group: decl.group.clone(),
            key: decl.key(),
            source_type: decl.source.clone(),
            destination_type: decl.destination.clone(),
            source,
            destination,
            members,
            unknown_destinations,
            ignore_non_existing: decl.ignore_non_existing,
            hooks: decl.hooks,
            origin: decl.origin,
            location: decl.location.clone(),
        }
    }

    fn convert(&self, source: &Member, destination: &Member, scope: &MappingSet) -> PlanValue {
        let conversion = classify(&source.ty, &destination.ty, self.resolver, &|key| scope.contains(key))
            //atomic values are copied, never built through another mapping
            .filter(|c| destination.kind != MemberKind::Atomic || c.nested_pair().is_none());
        match conversion {
            Some(conversion) => PlanValue::Member { source: source.clone(), conversion },
            None => PlanValue::Missing(MissingReason::Unconvertible { source: source.ty.clone() }),
        }
    }
}

/// First mapping of every pair across all groups, in encounter order.
pub fn first_per_pair(mappings: &[FinalizedMapping]) -> Vec<&FinalizedMapping> {
    let mut seen = HashSet::new();
    mappings.iter().filter(|m| seen.insert(m.key.clone())).collect()
}

/// Group names in encounter order.
pub fn group_names(mappings: &[FinalizedMapping]) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for m in mappings {
        if !names.contains(&m.group.as_str()) {
            names.push(&m.group);
        }
    }
    names
}
