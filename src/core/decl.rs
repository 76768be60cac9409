// mapping declarations as extracted from configuration chains
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::expr::InlineExpr;
use crate::core::types::TypeRef;

/// (source, destination) identity pair. Declarations are deduplicated on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypePairKey {
    pub source: String,
    pub destination: String,
}

impl TypePairKey {
    pub fn new(source: &TypeRef, destination: &TypeRef) -> Self {
        TypePairKey { source: source.identity(), destination: destination.identity() }
    }

    pub fn reversed(&self) -> Self {
        TypePairKey { source: self.destination.clone(), destination: self.source.clone() }
    }
}

impl fmt::Display for TypePairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.destination)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindingSource {
    /// Name of a source member.
    Member(String),
    Expression(InlineExpr),
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberBinding {
    pub destination: String,
    pub source: BindingSource,
    /// Guard evaluated against the source value.
    pub condition: Option<InlineExpr>,
}

impl MemberBinding {
    pub fn member(destination: &str, source: &str) -> Self {
        MemberBinding {
            destination: destination.to_string(),
            source: BindingSource::Member(source.to_string()),
            condition: None,
        }
    }

    pub fn expression(destination: &str, expr: InlineExpr) -> Self {
        MemberBinding {
            destination: destination.to_string(),
            source: BindingSource::Expression(expr),
            condition: None,
        }
    }

    pub fn ignored(destination: &str) -> Self {
        MemberBinding {
            destination: destination.to_string(),
            source: BindingSource::Ignored,
            condition: None,
        }
    }

    pub fn when(mut self, condition: InlineExpr) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn is_ignored(&self) -> bool {
        matches!(self.source, BindingSource::Ignored)
    }

    pub fn source_member(&self) -> Option<&str> {
        match &self.source {
            BindingSource::Member(name) => Some(name),
            _ => None,
        }
    }
}

/// Which hook callables the chain registered. The callables themselves only exist at run time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookRef {
    pub before: bool,
    pub after: bool,
}

impl HookRef {
    pub fn any(&self) -> bool {
        self.before || self.after
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn from_span(file: &str, span: proc_macro2::Span) -> Self {
        let start = span.start();
        SourceLocation { file: file.to_string(), line: start.line, column: start.column + 1 }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclOrigin {
    Declared,
    /// Derived from a declaration that asked for `reverse_map()`.
    Reversed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingDeclaration {
    /// Configuration group the chain was found in.
    pub group: String,
    pub source: TypeRef,
    pub destination: TypeRef,
    pub bindings: Vec<MemberBinding>,
    pub ignore_non_existing: bool,
    pub reverse: bool,
    pub hooks: HookRef,
    pub origin: DeclOrigin,
    pub location: Option<SourceLocation>,
}

impl MappingDeclaration {
    pub fn new(group: &str, source: TypeRef, destination: TypeRef) -> Self {
        MappingDeclaration {
            group: group.to_string(),
            source,
            destination,
            bindings: Vec::new(),
            ignore_non_existing: false,
            reverse: false,
            hooks: HookRef::default(),
            origin: DeclOrigin::Declared,
            location: None,
        }
    }

    pub fn key(&self) -> TypePairKey {
        TypePairKey::new(&self.source, &self.destination)
    }

    /// Add a binding; a later binding for the same destination member replaces the earlier one.
    pub fn bind(&mut self, binding: MemberBinding) {
        match self.bindings.iter_mut().find(|b| b.destination == binding.destination) {
            Some(existing) => *existing = binding,
            None => self.bindings.push(binding),
        }
    }

    pub fn with(mut self, binding: MemberBinding) -> Self {
        self.bind(binding);
        self
    }

    pub fn binding(&self, destination: &str) -> Option<&MemberBinding> {
        self.bindings.iter().find(|b| b.destination == destination)
    }
}

/// A configuration site the extractor recognized but could not fully read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExtractionIssue {
    pub group: String,
    pub location: SourceLocation,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_uses_identities_and_reverses() {
        let decl = MappingDeclaration::new(
            "P",
            TypeRef::named("models::Order"),
            TypeRef::named("dto::OrderDto"),
        );
        let key = decl.key();
        assert_eq!(key.to_string(), "Order -> OrderDto");
        assert_eq!(key.reversed().reversed(), key);
        assert_eq!(key.reversed().source, "OrderDto");
    }

    #[test]
    fn later_binding_for_the_same_member_replaces_the_earlier() {
        let decl = MappingDeclaration::new("P", TypeRef::named("A"), TypeRef::named("B"))
            .with(MemberBinding::member("x", "a"))
            .with(MemberBinding::ignored("y"))
            .with(MemberBinding::member("x", "b"));

        assert_eq!(decl.bindings.len(), 2);
        assert_eq!(decl.binding("x").unwrap().source_member(), Some("b"));
        assert!(decl.binding("y").unwrap().is_ignored());
    }
}
