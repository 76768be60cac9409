//! Code Generator
//!
//! Emits, per configuration group, a `<Group>Mapper` with the full family of conversion
//! functions for every finalized mapping, plus a type-pair dispatcher. With more than one group
//! an aggregate mapper routes every pair to the first group that declared it.
//!
//! Uses [`quote`] for the token streams and [`prettyplease`] to format the file.

use std::collections::HashMap;

use proc_macro2::{Ident, TokenStream};
use quote::{format_ident, quote};

use crate::config::GeneratorOptions;
use crate::core::classify::Conversion;
use crate::core::decl::TypePairKey;
use crate::core::error::MapgenError;
use crate::core::expr::ident;
use crate::core::normalize::{FinalizedMapping, MemberPlan, PlanValue, first_per_pair, group_names};
use crate::mapping::hooks;

pub const HEADER: &str = "// @generated by mapgen-core. Do not edit manually.\n\n";

// ── Naming ────────────────────────────────────────────────────────────────────

/// `UserDto` -> `user_dto`, `HTTPServer` -> `http_server`, `Page<User>` -> `page_user`.
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = if i > 0 { Some(chars[i - 1]) } else { None };
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(char::is_lowercase),
                _ => false,
            };
            if boundary && !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else if c.is_alphanumeric() {
            out.push(c);
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_end_matches('_').to_string()
}

/// `configure_orders` -> `ConfigureOrders`; already-pascal names are kept.
pub fn pascal_case(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

fn checked_ident(text: &str) -> Result<Ident, MapgenError> {
    syn::parse_str::<Ident>(text)
        .map_err(|_| MapgenError::Config(format!("`{}` is not a valid identifier", text)))
}

struct MethodNames {
    direct: Ident,
    construct: Ident,
    into: Ident,
    array: Ident,
    list: Ident,
    iter: Ident,
}

impl MethodNames {
    fn all(&self) -> [&Ident; 6] {
        [&self.direct, &self.construct, &self.into, &self.array, &self.list, &self.iter]
    }

    fn of(key: &TypePairKey) -> Self {
        let s = snake_case(&key.source);
        let d = snake_case(&key.destination);
        MethodNames {
            direct: format_ident!("map_{}_to_{}", s, d),
            construct: construct_ident(key),
            into: format_ident!("map_{}_into_{}", s, d),
            array: format_ident!("map_{}_array_to_{}", s, d),
            list: format_ident!("map_{}_list_to_{}", s, d),
            iter: format_ident!("map_{}_iter_to_{}", s, d),
        }
    }
}

fn construct_ident(key: &TypePairKey) -> Ident {
    format_ident!("construct_{}_from_{}", snake_case(&key.destination), snake_case(&key.source))
}

// ── Member conversions ────────────────────────────────────────────────────────

/// A value being converted: a place reached through `src` (`src.address`), or a reference
/// bound by a closure parameter (`value`).
struct Operand {
    tokens: TokenStream,
    borrowed: bool,
}

impl Operand {
    fn place(root: &TokenStream, access: &[String]) -> Self {
        let path = access.iter().map(|segment| ident(segment));
        Operand { tokens: quote! { #root #(.#path)* }, borrowed: false }
    }

    fn value() -> Self {
        Operand { tokens: quote! { value }, borrowed: true }
    }
}

fn convert(conversion: &Conversion, operand: &Operand) -> TokenStream {
    let v = &operand.tokens;
    match conversion {
        Conversion::Clone => quote! { #v.clone() },
        Conversion::Nested(key) => {
            let construct = construct_ident(key);
            if operand.borrowed {
                quote! { self.#construct(#v) }
            } else {
                quote! { self.#construct(&#v) }
            }
        }
        Conversion::Optional(inner) => {
            let body = convert(inner, &Operand::value());
            quote! { #v.as_ref().map(|value| #body) }
        }
        Conversion::Unwrap(inner) => match inner.as_ref() {
            Conversion::Clone => quote! { #v.clone().unwrap_or_default() },
            inner => {
                let body = convert(inner, &Operand::value());
                quote! { #v.as_ref().map(|value| #body).unwrap_or_default() }
            }
        },
        Conversion::Wrap(inner) => {
            let body = convert(inner, operand);
            quote! { ::core::option::Option::Some(#body) }
        }
        Conversion::Elements(inner) => {
            let body = convert(inner, &Operand::value());
            quote! { #v.iter().map(|value| #body).collect() }
        }
    }
}

//right-hand side of a member assignment, `None` when nothing is assigned
fn value_of(plan: &MemberPlan) -> Option<TokenStream> {
    let src = quote! { src };
    match &plan.value {
        PlanValue::Member { source, conversion } => {
            Some(convert(conversion, &Operand::place(&src, &source.access)))
        }
        PlanValue::Expression(expr) => Some(expr.to_tokens_with(&src)),
        PlanValue::Ignored | PlanValue::Missing(_) => None,
    }
}

fn assignment(plan: &MemberPlan, dst: &TokenStream) -> Option<TokenStream> {
    let value = value_of(plan)?;
    let place = Operand::place(dst, &plan.destination.access).tokens;
    let stmt = quote! { #place = #value; };

    Some(match &plan.condition {
        Some(condition) => {
            let condition = condition.to_tokens_with(&quote! { src });
            quote! { if #condition { #stmt } }
        }
        None => stmt,
    })
}

// ── Generator ─────────────────────────────────────────────────────────────────

pub struct CodeGenerator<'o> {
    options: &'o GeneratorOptions,
}

impl<'o> CodeGenerator<'o> {
    pub fn new(options: &'o GeneratorOptions) -> Self {
        CodeGenerator { options }
    }

    /// Formatted source of the whole generated file.
    pub fn generate(&self, mappings: &[FinalizedMapping]) -> Result<String, MapgenError> {
        let tokens = self.emit(mappings)?;
        let file = syn::parse2::<syn::File>(tokens).map_err(MapgenError::InvalidOutput)?;
        let body = prettyplease::unparse(&file);

        Ok(if self.options.header { format!("{HEADER}{body}") } else { body })
    }

    pub fn emit(&self, mappings: &[FinalizedMapping]) -> Result<TokenStream, MapgenError> {
        let rt = self.options.runtime_path()?;
        let groups = group_names(mappings);
        self.check_collisions(&groups, mappings)?;

        let mut items = Vec::with_capacity(groups.len() + 1);
        for group in &groups {
            let members: Vec<&FinalizedMapping> =
                mappings.iter().filter(|m| m.group == *group).collect();
            items.push(self.emit_group(group, &members, &rt)?);
        }
        if groups.len() > 1 {
            items.push(self.emit_aggregate(&groups, mappings, &rt)?);
        }

        Ok(quote! { #(#items)* })
    }

    /// Distinct groups or pairs whose generated names would clash, e.g. `UserProfile` and
    /// `user_profile`, or `Page<User>` and `PageUser`.
    fn check_collisions(&self, groups: &[&str], mappings: &[FinalizedMapping]) -> Result<(), MapgenError> {
        let clash = |what: String, first: &dyn std::fmt::Display, second: &dyn std::fmt::Display| {
            MapgenError::Config(format!("`{}` and `{}` both generate `{}`", first, second, what))
        };

        let mut items: HashMap<String, &str> = HashMap::new();
        let mut fields: HashMap<String, &str> = HashMap::new();
        if groups.len() > 1 {
            items.insert(self.options.aggregate_name.clone(), "the aggregate mapper");
        }
        for group in groups {
            let pascal = pascal_case(group);
            for item in [format!("{}{}", pascal, self.options.mapper_suffix), format!("{}Hooks", pascal)] {
                if let Some(first) = items.insert(item.clone(), *group) {
                    return Err(clash(item, &first, group));
                }
            }
            if groups.len() > 1 {
                let field = snake_case(group);
                if let Some(first) = fields.insert(field.clone(), *group) {
                    return Err(clash(field, &first, group));
                }
            }
        }

        for group in groups {
            let mut methods: HashMap<String, &TypePairKey> = HashMap::new();
            for m in mappings.iter().filter(|m| m.group == *group) {
                let names = MethodNames::of(&m.key);
                for method in names.all() {
                    match methods.insert(method.to_string(), &m.key) {
                        Some(first) if *first != m.key => return Err(clash(method.to_string(), first, &m.key)),
                        _ => {}
                    }
                }
            }
        }
        Ok(())
    }

    fn mapper_ident(&self, group: &str) -> Result<Ident, MapgenError> {
        checked_ident(&format!("{}{}", pascal_case(group), self.options.mapper_suffix))
    }

    fn emit_group(
        &self,
        group: &str,
        mappings: &[&FinalizedMapping],
        rt: &syn::Path,
    ) -> Result<TokenStream, MapgenError> {
        let mapper = self.mapper_ident(group)?;
        let slots = checked_ident(&format!("{}Hooks", pascal_case(group)))?;

        let plans = hooks::plan(mappings);
        let slot_struct = hooks::emit_slots(&slots, &plans, rt);
        let binding = hooks::emit_binding(&plans);

        let methods = mappings.iter().map(|m| self.emit_methods(m));
        let dispatch = self.emit_dispatch(mappings, rt);
        let doc = format!(" Conversions declared in `{}`.", group);

        Ok(quote! {
            #slot_struct

            #[doc = #doc]
            #[derive(Default, Clone)]
            pub struct #mapper {
                #[allow(dead_code)]
                hooks: #slots,
            }

            #[allow(unused_mut, unused_variables, unused_parens, clippy::all)]
            impl #mapper {
                pub fn new() -> Self {
                    Self::default()
                }

                /// Build the mapper and bind the hook callables registered in `config`.
                pub fn from_config(config: &#rt::MapperConfiguration) -> Self {
                    #binding
                }

                #(#methods)*

                #dispatch
            }
        })
    }

    fn emit_methods(&self, m: &FinalizedMapping) -> TokenStream {
        let names = MethodNames::of(&m.key);
        let s = &m.source_type;
        let d = &m.destination_type;
        let MethodNames { direct, construct, into, array, list, iter } = &names;

        let direct_body = if m.hooks.any() || self.uses_literal(m) {
            quote! { self.#construct(src) }
        } else {
            self.sequential_body(m)
        };
        let construct_body = self.construct_body(m);

        let dst = quote! { dst };
        let before = hooks::before_call(m, &dst);
        let after = hooks::after_call(m, &dst);
        let assigns = m.members.iter().filter_map(|p| assignment(p, &dst));

        //batch forms go straight to the hook-free entry point when there is one
        let element = if m.hooks.any() { construct } else { direct };

        quote! {
            #[inline]
            pub fn #direct(&self, src: &#s) -> #d {
                #direct_body
            }

            pub fn #construct(&self, src: &#s) -> #d {
                #construct_body
            }

            pub fn #into(&self, src: &#s, dst: &mut #d) {
                #before
                #(#assigns)*
                #after
            }

            pub fn #array<const N: usize>(&self, src: &[#s; N]) -> [#d; N] {
                ::core::array::from_fn(|i| self.#element(&src[i]))
            }

            pub fn #list(&self, src: &[#s]) -> ::std::vec::Vec<#d> {
                let mut out = ::std::vec::Vec::with_capacity(src.len());
                for item in src {
                    out.push(self.#element(item));
                }
                out
            }

            pub fn #iter<'a, I>(&self, src: I) -> ::std::vec::Vec<#d>
            where
                I: ::core::iter::IntoIterator<Item = &'a #s>,
            {
                let mut out = ::std::vec::Vec::new();
                for item in src {
                    out.push(self.#element(item));
                }
                out
            }
        }
    }

    //destinations with members required at construction are built with a struct literal
    fn uses_literal(&self, m: &FinalizedMapping) -> bool {
        m.destination.resolved && m.destination.has_required_members()
    }

    fn empty_instance(&self, m: &FinalizedMapping) -> TokenStream {
        if !self.uses_literal(m) {
            return quote! { ::core::default::Default::default() };
        }
        let path = m.destination_type.path_tokens();
        let fields = m.destination.fields.iter().map(|f| {
            let f = ident(f);
            quote! { #f: ::core::default::Default::default() }
        });
        quote! { #path { #(#fields),* } }
    }

    fn construct_body(&self, m: &FinalizedMapping) -> TokenStream {
        if m.hooks.any() {
            let d = &m.destination_type;
            let empty = self.empty_instance(m);
            let dst = quote! { dst };
            let before = hooks::before_call(m, &quote! { &mut dst });
            let after = hooks::after_call(m, &quote! { &mut dst });
            let assigns = m.members.iter().filter_map(|p| assignment(p, &dst));
            quote! {
                let mut dst: #d = #empty;
                #before
                #(#assigns)*
                #after
                dst
            }
        } else if self.uses_literal(m) {
            self.initializer_body(m)
        } else {
            self.sequential_body(m)
        }
    }

    fn sequential_body(&self, m: &FinalizedMapping) -> TokenStream {
        let d = &m.destination_type;
        let dst = quote! { dst };
        let assigns = m.members.iter().filter_map(|p| assignment(p, &dst));
        quote! {
            let mut dst: #d = ::core::default::Default::default();
            #(#assigns)*
            dst
        }
    }

    fn initializer_body(&self, m: &FinalizedMapping) -> TokenStream {
        let path = m.destination_type.path_tokens();
        let dst = quote! { dst };

        let inits = m.destination.fields.iter().map(|field| {
            let value = m
                .members
                .iter()
                .find(|p| p.destination.access.len() == 1 && p.destination.access[0] == *field)
                .filter(|p| p.is_initializer_eligible())
                .and_then(value_of)
                .unwrap_or_else(|| quote! { ::core::default::Default::default() });
            let field = ident(field);
            quote! { #field: #value }
        });

        let late = m
            .members
            .iter()
            .filter(|p| p.is_assigned() && !p.is_initializer_eligible())
            .filter_map(|p| assignment(p, &dst));

        quote! {
            let mut dst = #path { #(#inits),* };
            #(#late)*
            dst
        }
    }

    fn emit_dispatch(&self, mappings: &[&FinalizedMapping], rt: &syn::Path) -> TokenStream {
        let map_arms = mappings.iter().map(|m| {
            let (s, d) = (&m.source_type, &m.destination_type);
            let direct = MethodNames::of(&m.key).direct;
            quote! {
                if #rt::is_type::<D, #d>() {
                    if let ::core::option::Option::Some(src) = #rt::cast_ref::<S, #s>(src) {
                        if let ::core::option::Option::Some(out) = #rt::cast_owned::<#d, D>(self.#direct(src)) {
                            return ::core::result::Result::Ok(out);
                        }
                    }
                }
            }
        });

        let into_arms = mappings.iter().map(|m| {
            let (s, d) = (&m.source_type, &m.destination_type);
            let into = MethodNames::of(&m.key).into;
            quote! {
                if let (::core::option::Option::Some(src), ::core::option::Option::Some(dst)) =
                    (#rt::cast_ref::<S, #s>(src), #rt::cast_mut::<D, #d>(&mut *dst))
                {
                    self.#into(src, dst);
                    return ::core::result::Result::Ok(());
                }
            }
        });

        let iter_arms = mappings.iter().map(|m| {
            let (s, d) = (&m.source_type, &m.destination_type);
            let direct = MethodNames::of(&m.key).direct;
            quote! {
                if #rt::is_type::<S, #s>() && #rt::is_type::<D, #d>() {
                    let out = src
                        .into_iter()
                        .filter_map(|item| #rt::cast_ref::<S, #s>(item))
                        .filter_map(|item| #rt::cast_owned::<#d, D>(self.#direct(item)))
                        .collect();
                    return ::core::result::Result::Ok(out);
                }
            }
        });

        quote! {
            /// Convert through the type pair `S -> D`.
            pub fn map<S: 'static, D: 'static>(&self, src: &S) -> ::core::result::Result<D, #rt::MappingError> {
                #(#map_arms)*
                ::core::result::Result::Err(#rt::MappingError::not_configured::<S, D>())
            }

            pub fn map_into<S: 'static, D: 'static>(&self, src: &S, dst: &mut D) -> ::core::result::Result<(), #rt::MappingError> {
                #(#into_arms)*
                ::core::result::Result::Err(#rt::MappingError::not_configured::<S, D>())
            }

            pub fn map_iter<'a, S: 'static, D: 'static, I>(&self, src: I) -> ::core::result::Result<::std::vec::Vec<D>, #rt::MappingError>
            where
                I: ::core::iter::IntoIterator<Item = &'a S>,
            {
                #(#iter_arms)*
                ::core::result::Result::Err(#rt::MappingError::not_configured::<S, D>())
            }

            pub fn map_slice<S: 'static, D: 'static>(&self, src: &[S]) -> ::core::result::Result<::std::vec::Vec<D>, #rt::MappingError> {
                self.map_iter(src)
            }
        }
    }

    fn emit_aggregate(
        &self,
        groups: &[&str],
        mappings: &[FinalizedMapping],
        rt: &syn::Path,
    ) -> Result<TokenStream, MapgenError> {
        let name = checked_ident(&self.options.aggregate_name)?;

        let mut fields = Vec::with_capacity(groups.len());
        let mut mappers = Vec::with_capacity(groups.len());
        for group in groups {
            fields.push(checked_ident(&snake_case(group))?);
            mappers.push(self.mapper_ident(group)?);
        }

        let mut routes = Vec::new();
        for m in first_per_pair(mappings) {
            let at = groups.iter().position(|g| *g == m.group).unwrap_or_default();
            routes.push((&fields[at], &m.source_type, &m.destination_type));
        }

        let map_arms = routes.iter().map(|(field, s, d)| {
            quote! {
                if #rt::is_type::<S, #s>() && #rt::is_type::<D, #d>() {
                    return self.#field.map(src);
                }
            }
        });
        let into_arms = routes.iter().map(|(field, s, d)| {
            quote! {
                if #rt::is_type::<S, #s>() && #rt::is_type::<D, #d>() {
                    return self.#field.map_into(src, dst);
                }
            }
        });
        let iter_arms = routes.iter().map(|(field, s, d)| {
            quote! {
                if #rt::is_type::<S, #s>() && #rt::is_type::<D, #d>() {
                    return self.#field.map_iter(src);
                }
            }
        });

        Ok(quote! {
            /// Every configuration group behind one dispatcher. Each type pair is served by the
            /// first group that declared it.
            #[derive(Default, Clone)]
            pub struct #name {
                #(pub #fields: #mappers,)*
            }

            #[allow(unused_variables, clippy::all)]
            impl #name {
                pub fn new() -> Self {
                    Self::default()
                }

                pub fn from_config(config: &#rt::MapperConfiguration) -> Self {
                    Self {
                        #(#fields: #mappers::from_config(config),)*
                    }
                }

                pub fn map<S: 'static, D: 'static>(&self, src: &S) -> ::core::result::Result<D, #rt::MappingError> {
                    #(#map_arms)*
                    ::core::result::Result::Err(#rt::MappingError::not_configured::<S, D>())
                }

                pub fn map_into<S: 'static, D: 'static>(&self, src: &S, dst: &mut D) -> ::core::result::Result<(), #rt::MappingError> {
                    #(#into_arms)*
                    ::core::result::Result::Err(#rt::MappingError::not_configured::<S, D>())
                }

                pub fn map_iter<'a, S: 'static, D: 'static, I>(&self, src: I) -> ::core::result::Result<::std::vec::Vec<D>, #rt::MappingError>
                where
                    I: ::core::iter::IntoIterator<Item = &'a S>,
                {
                    #(#iter_arms)*
                    ::core::result::Result::Err(#rt::MappingError::not_configured::<S, D>())
                }

                pub fn map_slice<S: 'static, D: 'static>(&self, src: &[S]) -> ::core::result::Result<::std::vec::Vec<D>, #rt::MappingError> {
                    self.map_iter(src)
                }
            }
        })
    }
}
