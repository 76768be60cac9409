//! Hook Binder
//!
//! Plans one hook slot per mapping that registered a before or after callable, and emits the
//! slot struct plus the `from_config` body that fills the slots from a live
//! [`MapperConfiguration`](crate::runtime::MapperConfiguration). Slots are written once while
//! the mapper is built and only read afterwards.

use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};

use crate::core::decl::HookRef;
use crate::core::normalize::FinalizedMapping;
use crate::core::types::TypeRef;
use crate::mapping::generator::snake_case;

#[derive(Debug, Clone)]
pub struct HookSlotPlan {
    pub field: Ident,
    /// Group whose registration fills the slot.
    pub group: String,
    pub source: TypeRef,
    pub destination: TypeRef,
    pub hooks: HookRef,
}

pub fn slot_field(mapping: &FinalizedMapping) -> Ident {
    format_ident!("{}_to_{}", snake_case(&mapping.key.source), snake_case(&mapping.key.destination))
}

pub fn plan(mappings: &[&FinalizedMapping]) -> Vec<HookSlotPlan> {
    mappings
        .iter()
        .filter(|m| m.hooks.any())
        .map(|m| HookSlotPlan {
            field: slot_field(m),
            group: m.group.clone(),
            source: m.source_type.clone(),
            destination: m.destination_type.clone(),
            hooks: m.hooks,
        })
        .collect()
}

pub fn emit_slots(name: &Ident, plans: &[HookSlotPlan], rt: &syn::Path) -> TokenStream {
    let fields = plans.iter().map(|p| {
        let field = &p.field;
        let source = &p.source;
        let destination = &p.destination;
        quote! { #field: #rt::HookSlot<#source, #destination> }
    });

    quote! {
        #[derive(Default, Clone)]
        pub struct #name {
            #(#fields,)*
        }
    }
}

/// Body of `from_config(config)`.
pub fn emit_binding(plans: &[HookSlotPlan]) -> TokenStream {
    if plans.is_empty() {
        return quote! {
            let _ = config;
            Self::default()
        };
    }

    let binds = plans.iter().map(|p| {
        let field = &p.field;
        let source = &p.source;
        let destination = &p.destination;
        let group = &p.group;
        quote! { mapper.hooks.#field = config.hooks_for_group::<#source, #destination>(#group); }
    });

    quote! {
        let mut mapper = Self::default();
        #(#binds)*
        mapper
    }
}

/// `run_before` call for a mapping, empty when it has no before hook.
pub fn before_call(mapping: &FinalizedMapping, dst: &TokenStream) -> TokenStream {
    if !mapping.hooks.before {
        return TokenStream::new();
    }
    let field = slot_field(mapping);
    quote! { self.hooks.#field.run_before(src, #dst); }
}

pub fn after_call(mapping: &FinalizedMapping, dst: &TokenStream) -> TokenStream {
    if !mapping.hooks.after {
        return TokenStream::new();
    }
    let field = slot_field(mapping);
    quote! { self.hooks.#field.run_after(src, #dst); }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::TypeCatalog;
    use crate::core::decl::MappingDeclaration;
    use crate::core::normalize::Normalizer;
    use crate::core::shape::{CatalogResolver, KindRules};

    fn mk_mappings(hooks: &[HookRef]) -> Vec<FinalizedMapping> {
        let catalog = TypeCatalog::new();
        let r = CatalogResolver::new(&catalog, KindRules::default());
        let decls: Vec<MappingDeclaration> = hooks
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let mut d = MappingDeclaration::new(
                    "P",
                    TypeRef::named(&format!("Customer{}", i)),
                    TypeRef::named("CustomerCard"),
                );
                d.hooks = *h;
                d
            })
            .collect();
        Normalizer::new(&r).normalize(&decls)
    }

    fn flat(tokens: TokenStream) -> String {
        tokens.to_string().replace(' ', "")
    }

    #[test]
    fn only_hooked_mappings_get_a_slot() {
        let mappings = mk_mappings(&[HookRef { before: true, after: false }, HookRef::default()]);
        let refs: Vec<&FinalizedMapping> = mappings.iter().collect();
        let plans = plan(&refs);

        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].field.to_string(), "customer0_to_customer_card");

        let rt: syn::Path = syn::parse_str("rt").unwrap();
        let slots = flat(emit_slots(&format_ident!("PHooks"), &plans, &rt));
        assert!(slots.contains("customer0_to_customer_card:rt::HookSlot<Customer0,CustomerCard>"));

        let binding = flat(emit_binding(&plans));
        assert!(binding.contains("config.hooks_for_group::<Customer0,CustomerCard>(\"P\")"));
    }

    #[test]
    fn calls_are_emitted_per_registered_side() {
        let mappings = mk_mappings(&[HookRef { before: false, after: true }]);
        let dst = quote! { &mut dst };
        assert!(before_call(&mappings[0], &dst).is_empty());
        assert_eq!(
            flat(after_call(&mappings[0], &dst)),
            "self.hooks.customer0_to_customer_card.run_after(src,&mutdst);"
        );
    }

    #[test]
    fn no_slots_still_binds() {
        assert!(flat(emit_binding(&[])).contains("Self::default()"));
    }
}
