// member-to-member conversion classification
use serde::{Deserialize, Serialize};

use crate::core::decl::TypePairKey;
use crate::core::shape::ShapeResolver;
use crate::core::types::{MemberKind, TypeRef};

/// How a bound source value becomes the destination value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Conversion {
    /// Same type on both sides.
    Clone,
    /// Recursive call into the construct function of another mapping of the same group.
    Nested(TypePairKey),
    /// `Option<A>` to `Option<B>`, absence propagates.
    Optional(Box<Conversion>),
    /// `Option<A>` to `B`, absence becomes `B::default()`.
    Unwrap(Box<Conversion>),
    /// `A` to `Option<B>`.
    Wrap(Box<Conversion>),
    /// Element-wise into a new collection.
    Elements(Box<Conversion>),
}

/// Decide how `source` converts to `destination`, `None` when it cannot.
///
/// `has_mapping` answers whether a mapping for a nested pair exists in scope.
pub fn classify(
    source: &TypeRef,
    destination: &TypeRef,
    resolver: &dyn ShapeResolver,
    has_mapping: &dyn Fn(&TypePairKey) -> bool,
) -> Option<Conversion> {
    if source.same_as(destination) {
        return Some(Conversion::Clone);
    }

    match (source.option_inner(), destination.option_inner()) {
        (Some(a), Some(b)) => {
            return classify(a, b, resolver, has_mapping).map(|c| Conversion::Optional(Box::new(c)));
        }
        (Some(a), None) => {
            //absence falls back to `Default`, which a catalog type has to derive
            if matches!(resolver.kind_of(destination), MemberKind::Complex { .. })
                && !resolver.resolve(destination).has_default
            {
                return None;
            }
            return classify(a, destination, resolver, has_mapping)
                .map(|c| Conversion::Unwrap(Box::new(c)));
        }
        (None, Some(b)) => {
            return classify(source, b, resolver, has_mapping).map(|c| Conversion::Wrap(Box::new(c)));
        }
        (None, None) => {}
    }

    if !destination.is_array() {
        if let (Some(a), Some(b)) =
            (resolver.collection_element(source), resolver.collection_element(destination))
        {
            return classify(a, b, resolver, has_mapping).map(|c| Conversion::Elements(Box::new(c)));
        }
    }

    let key = TypePairKey::new(source, destination);
    if has_mapping(&key) {
        return Some(Conversion::Nested(key));
    }

    None
}

impl Conversion {
    /// Nested pairs this conversion calls into.
    pub fn nested_pair(&self) -> Option<&TypePairKey> {
        match self {
            Conversion::Clone => None,
            Conversion::Nested(key) => Some(key),
            Conversion::Optional(inner)
            | Conversion::Unwrap(inner)
            | Conversion::Wrap(inner)
            | Conversion::Elements(inner) => inner.nested_pair(),
        }
    }
}
