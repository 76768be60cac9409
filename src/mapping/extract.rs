//! Declaration Extractor.
//!
//! Walks parsed Rust source looking for configuration chains rooted at
//! `create_map::<Source, Destination>()` and turns each chain into a [`MappingDeclaration`].
//! The enclosing `impl` block (by self type) or free function (by name) is the chain's
//! configuration group.
//!
//! Extraction is best-effort: a chain call or closure shape that cannot be read is skipped and
//! recorded as an [`ExtractionIssue`] so it can be reported instead of silently lost.

use proc_macro2::{Span, TokenStream};
use quote::{ToTokens, quote};
use syn::spanned::Spanned;
use syn::visit::{self, Visit};

use crate::core::decl::{ExtractionIssue, MappingDeclaration, MemberBinding, SourceLocation};
use crate::core::error::MapgenError;
use crate::core::expr::{InlineExpr, SOURCE_PLACEHOLDER, substitute_param};
use crate::core::types::TypeRef;

/// Group for chains that sit outside any `impl` block or free function.
pub const FALLBACK_GROUP: &str = "Mappings";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub declarations: Vec<MappingDeclaration>,
    pub issues: Vec<ExtractionIssue>,
}

pub fn extract_source(path: &str, text: &str) -> Result<Extraction, MapgenError> {
    let file = syn::parse_file(text)
        .map_err(|source| MapgenError::Parse { path: path.to_string(), source })?;
    Ok(extract_file(path, &file))
}

pub fn extract_file(path: &str, file: &syn::File) -> Extraction {
    let mut extractor = Extractor { path, groups: Vec::new(), out: Extraction::default() };
    extractor.visit_file(file);
    extractor.out
}

struct Extractor<'p> {
    path: &'p str,
    groups: Vec<String>,
    out: Extraction,
}

impl<'ast> Visit<'ast> for Extractor<'_> {
    fn visit_item_impl(&mut self, node: &'ast syn::ItemImpl) {
        let group = TypeRef::from_syn(&node.self_ty)
            .ident()
            .map(str::to_string)
            .unwrap_or_else(|| FALLBACK_GROUP.to_string());
        self.groups.push(group);
        visit::visit_item_impl(self, node);
        self.groups.pop();
    }

    fn visit_item_fn(&mut self, node: &'ast syn::ItemFn) {
        self.groups.push(node.sig.ident.to_string());
        visit::visit_item_fn(self, node);
        self.groups.pop();
    }

    fn visit_expr_method_call(&mut self, node: &'ast syn::ExprMethodCall) {
        //a recognized chain is consumed whole, its inner calls are not visited again
        if !self.chain(node) {
            visit::visit_expr_method_call(self, node);
        }
    }
}

impl Extractor<'_> {
    fn group(&self) -> &str {
        self.groups.last().map(String::as_str).unwrap_or(FALLBACK_GROUP)
    }

    fn issue(&mut self, span: Span, message: impl Into<String>) {
        let issue = ExtractionIssue {
            group: self.group().to_string(),
            location: SourceLocation::from_span(self.path, span),
            message: message.into(),
        };
        tracing::debug!(location = %issue.location, message = %issue.message, "declaration site skipped");
        self.out.issues.push(issue);
    }

    /// Returns true when `node` is (the outermost call of) a `create_map` chain.
    fn chain(&mut self, node: &syn::ExprMethodCall) -> bool {
        let calls = method_chain(node);
        let Some(root_at) = calls.iter().position(|c| c.method == "create_map") else {
            return false;
        };
        let root = calls[root_at];

        let types: Vec<&syn::Type> = root
            .turbofish
            .iter()
            .flat_map(|tf| tf.args.iter())
            .filter_map(|arg| match arg {
                syn::GenericArgument::Type(ty) => Some(ty),
                _ => None,
            })
            .collect();
        let [source, destination] = types.as_slice() else {
            self.issue(root.method.span(), "`create_map` needs exactly two type arguments");
            return true;
        };

        let mut decl = MappingDeclaration::new(
            self.group(),
            TypeRef::from_syn(source),
            TypeRef::from_syn(destination),
        );
        decl.location = Some(SourceLocation::from_span(self.path, root.method.span()));

        for call in calls[..root_at].iter().rev() {
            match call.method.to_string().as_str() {
                "for_member" => self.for_member(&mut decl, call),
                "ignore_non_existing" | "ignore_all_non_existing" => decl.ignore_non_existing = true,
                "reverse_map" => decl.reverse = true,
                "before_map" => decl.hooks.before = true,
                "after_map" => decl.hooks.after = true,
                other => {
                    self.issue(call.method.span(), format!("unrecognized call `{}` in mapping chain", other))
                }
            }
        }

        tracing::debug!(
            group = %decl.group,
            pair = %decl.key(),
            bindings = decl.bindings.len(),
            reverse = decl.reverse,
            "mapping declaration extracted"
        );
        self.out.declarations.push(decl);
        true
    }

    fn for_member(&mut self, decl: &mut MappingDeclaration, call: &syn::ExprMethodCall) {
        let mut args = call.args.iter();
        let (Some(selector), Some(options), None) = (args.next(), args.next(), args.next()) else {
            self.issue(call.method.span(), "`for_member` takes a member selector and an options closure");
            return;
        };

        let Some(destination) = selected_member(selector) else {
            self.issue(selector.span(), "member selector must be a closure returning a field, like `|d| &d.name`");
            return;
        };

        let Some((Some(param), body)) = closure(options) else {
            self.issue(options.span(), format!("options for `{}` must be a closure", destination));
            return;
        };

        let options_chain = match body {
            syn::Expr::MethodCall(m) => method_chain(m),
            _ => Vec::new(),
        };
        let rooted = options_chain
            .last()
            .is_some_and(|innermost| is_path(&innermost.receiver, &param));
        if !rooted {
            self.issue(body.span(), format!("options for `{}` are not a call chain on `{}`", destination, param));
            return;
        }

        let mut ignored = false;
        let mut map_from = None;
        let mut condition = None;

        for opt in options_chain.iter().rev() {
            let method = opt.method.to_string();
            match (method.as_str(), opt.args.len()) {
                ("ignore", 0) => ignored = true,
                ("map_from", 1) => map_from = Some(source_expr(&opt.args[0])),
                ("when", 1) => condition = Some(source_expr(&opt.args[0])),
                _ => {
                    self.issue(
                        opt.method.span(),
                        format!("unrecognized member option `{}` for `{}`", method, destination),
                    );
                    return;
                }
            }
        }

        let binding = if ignored {
            MemberBinding::ignored(&destination)
        } else if let Some(expr) = map_from {
            match expr.as_source_member() {
                Some(member) => MemberBinding::member(&destination, member),
                None => MemberBinding::expression(&destination, expr),
            }
        } else if condition.is_some() {
            MemberBinding::member(&destination, &destination)
        } else {
            return;
        };

        let binding = match condition {
            Some(condition) if !ignored => binding.when(condition),
            _ => binding,
        };
        decl.bind(binding);
    }
}

//outermost call first
fn method_chain(node: &syn::ExprMethodCall) -> Vec<&syn::ExprMethodCall> {
    let mut calls = vec![node];
    let mut current = node;
    while let syn::Expr::MethodCall(inner) = peel(&current.receiver) {
        calls.push(inner);
        current = inner;
    }
    calls
}

fn peel(expr: &syn::Expr) -> &syn::Expr {
    match expr {
        syn::Expr::Paren(p) => peel(&p.expr),
        syn::Expr::Group(g) => peel(&g.expr),
        syn::Expr::Block(b) if b.label.is_none() => match b.block.stmts.as_slice() {
            [syn::Stmt::Expr(inner, None)] => peel(inner),
            _ => expr,
        },
        _ => expr,
    }
}

fn is_path(expr: &syn::Expr, name: &str) -> bool {
    matches!(peel(expr), syn::Expr::Path(p) if p.qself.is_none() && p.path.is_ident(name))
}

/// Parameter name (`None` for `_`) and body of a one-parameter closure.
fn closure(expr: &syn::Expr) -> Option<(Option<String>, &syn::Expr)> {
    let syn::Expr::Closure(c) = peel(expr) else {
        return None;
    };
    if c.inputs.len() != 1 {
        return None;
    }
    let param = param_name(&c.inputs[0])?;
    Some((param, peel(&c.body)))
}

fn param_name(pat: &syn::Pat) -> Option<Option<String>> {
    match pat {
        syn::Pat::Ident(p) if p.subpat.is_none() => Some(Some(p.ident.to_string())),
        syn::Pat::Wild(_) => Some(None),
        syn::Pat::Type(t) => param_name(&t.pat),
        _ => None,
    }
}

//`|d| &d.field` or `|d| d.field`
fn selected_member(selector: &syn::Expr) -> Option<String> {
    let (Some(param), body) = closure(selector)? else {
        return None;
    };
    let body = match body {
        syn::Expr::Reference(r) if r.mutability.is_none() => peel(&r.expr),
        other => other,
    };
    match body {
        syn::Expr::Field(f) if is_path(&f.base, &param) => match &f.member {
            syn::Member::Named(name) => Some(name.to_string()),
            syn::Member::Unnamed(_) => None,
        },
        _ => None,
    }
}

/// A `map_from` / `when` argument as an expression over the placeholder. A function path is
/// treated as a call with the source value.
fn source_expr(arg: &syn::Expr) -> InlineExpr {
    if let Some((param, body)) = closure(arg) {
        let tokens = body.to_token_stream();
        let tokens = match param {
            Some(param) => substitute_param(tokens, &param),
            None => tokens,
        };
        return InlineExpr::parse(tokens);
    }

    let placeholder = syn::Ident::new(SOURCE_PLACEHOLDER, Span::call_site());
    let call: TokenStream = quote! { #arg(#placeholder) };
    InlineExpr::parse(call)
}
