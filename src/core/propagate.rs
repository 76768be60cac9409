// reverse-mapping derivation
use crate::core::decl::{BindingSource, DeclOrigin, HookRef, MappingDeclaration, MemberBinding};
use crate::core::mapping::MappingSet;

/// Swap roles of a declaration.
///
/// Only member-to-member bindings have an inverse. Ignored and expression bindings are
/// dropped, and so are conditions, since they are written against the forward source.
/// `ignore_non_existing` carries over; hooks never do.
pub fn reverse_of(decl: &MappingDeclaration) -> MappingDeclaration {
    let mut reversed =
        MappingDeclaration::new(&decl.group, decl.destination.clone(), decl.source.clone());

    for binding in &decl.bindings {
        if let BindingSource::Member(source) = &binding.source {
            //two forward members read from the same source member: the first one is the inverse
            if reversed.binding(source).is_none() {
                reversed.bind(MemberBinding::member(source, &binding.destination));
            }
        }
    }

    reversed.ignore_non_existing = decl.ignore_non_existing;
    reversed.hooks = HookRef::default();
    reversed.origin = DeclOrigin::Reversed;
    reversed.location = decl.location.clone();
    reversed
}

/// Append the inverse of every declaration that asked for one. An explicit declaration of
/// the inverse pair is kept over the derived one. Derived mappings are not reversed again.
pub fn derive_reverses(set: &mut MappingSet) -> usize {
    let derived: Vec<MappingDeclaration> =
        set.iter().filter(|d| d.reverse && d.origin == DeclOrigin::Declared).map(reverse_of).collect();

    let mut added = 0;
    for decl in derived {
        let key = decl.key();
        match set.insert(decl) {
            Ok(_) => added += 1,
            Err(conflict) => tracing::debug!(%key, %conflict, "reverse mapping not derived"),
        }
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::decl::TypePairKey;
    use crate::core::expr::InlineExpr;
    use crate::core::types::TypeRef;

    fn mk_decl(source: &str, destination: &str) -> MappingDeclaration {
        MappingDeclaration::new("OrderProfile", TypeRef::named(source), TypeRef::named(destination))
    }

    #[test]
    fn member_bindings_swap_and_everything_else_is_dropped() {
        let mut forward = mk_decl("Order", "OrderDto")
            .with(MemberBinding::member("order_id", "id"))
            .with(MemberBinding::member("customer", "name").when(InlineExpr::Literal("true".into())))
            .with(MemberBinding::ignored("notes"))
            .with(MemberBinding::expression("total", InlineExpr::Literal("0".into())));
        forward.ignore_non_existing = true;
        forward.reverse = true;
        forward.hooks = HookRef { before: true, after: true };

        let reversed = reverse_of(&forward);

        assert_eq!(reversed.key(), forward.key().reversed());
        assert_eq!(reversed.origin, DeclOrigin::Reversed);
        assert!(!reversed.reverse);
        assert!(reversed.ignore_non_existing);
        assert!(!reversed.hooks.any());

        assert_eq!(reversed.bindings.len(), 2);
        assert_eq!(reversed.binding("id").unwrap().source_member(), Some("order_id"));
        let name = reversed.binding("name").unwrap();
        assert_eq!(name.source_member(), Some("customer"));
        assert!(name.condition.is_none());
    }

    #[test]
    fn explicit_inverse_declaration_wins_over_derived() {
        let mut forward = mk_decl("Order", "OrderDto").with(MemberBinding::member("order_id", "id"));
        forward.reverse = true;
        let explicit = mk_decl("OrderDto", "Order").with(MemberBinding::ignored("id"));

        let mut set = MappingSet::new();
        set.insert(forward).unwrap();
        set.insert(explicit).unwrap();

        assert_eq!(derive_reverses(&mut set), 0);
        let kept = set.get(&TypePairKey::new(&TypeRef::named("OrderDto"), &TypeRef::named("Order")));
        assert_eq!(kept.unwrap().origin, DeclOrigin::Declared);
    }

    #[test]
    fn derived_mappings_are_not_reversed_again() {
        let mut forward = mk_decl("LineItem", "LineItemDto");
        forward.reverse = true;

        let mut set = MappingSet::new();
        set.insert(forward).unwrap();

        assert_eq!(derive_reverses(&mut set), 1);
        assert_eq!(derive_reverses(&mut set), 0);
        assert_eq!(set.len(), 2);
    }
}
