//! Inline source expressions captured from `map_from` and `when` closures.
//!
//! The closure parameter is replaced by [`SOURCE_PLACEHOLDER`] at capture time, so an
//! expression no longer depends on how the user named the parameter. [`InlineExpr`] keeps the
//! small set of forms mapping code actually uses as a tree; everything else is carried as
//! [`InlineExpr::Opaque`] token text. Nothing here evaluates or type-checks an expression.

use std::fmt;

use proc_macro2::{Ident, Span, TokenStream, TokenTree};
use quote::{ToTokens, quote};
use serde::{Deserialize, Serialize};

pub const SOURCE_PLACEHOLDER: &str = "__mapgen_source";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InlineExpr {
    /// The source value itself.
    Source,
    Member { base: Box<InlineExpr>, name: String },
    /// Literal token text, e.g. `0.0` or `"n/a"`.
    Literal(String),
    Reference(Box<InlineExpr>),
    Unary { op: UnaryOp, operand: Box<InlineExpr> },
    Binary { op: BinaryOp, left: Box<InlineExpr>, right: Box<InlineExpr> },
    Conditional { condition: Box<InlineExpr>, then: Box<InlineExpr>, otherwise: Box<InlineExpr> },
    /// `value.unwrap_or(fallback)`
    Coalesce { value: Box<InlineExpr>, fallback: Box<InlineExpr> },
    Call { receiver: Box<InlineExpr>, method: String, args: Vec<InlineExpr> },
    /// Token text of a form with no dedicated node. May contain the placeholder.
    Opaque(String),
}

/// Replace the closure parameter `param` with the placeholder, at any depth.
///
/// An identifier right after `.` is a field or method name and is left alone.
pub fn substitute_param(tokens: TokenStream, param: &str) -> TokenStream {
    replace_ident(tokens, param, &|span| {
        TokenStream::from(TokenTree::Ident(Ident::new(SOURCE_PLACEHOLDER, span)))
    })
}

/// Identifier for a field or method name, accepting raw identifiers.
pub fn ident(name: &str) -> Ident {
    match name.strip_prefix("r#") {
        Some(raw) => Ident::new_raw(raw, Span::call_site()),
        None => Ident::new(name, Span::call_site()),
    }
}

fn replace_ident(
    tokens: TokenStream,
    target: &str,
    with: &dyn Fn(Span) -> TokenStream,
) -> TokenStream {
    let mut out = TokenStream::new();
    let mut after_dot = false;

    for tt in tokens {
        match tt {
            TokenTree::Ident(ident) if !after_dot && ident == target => {
                out.extend(with(ident.span()));
                after_dot = false;
            }
            TokenTree::Group(group) => {
                let inner = replace_ident(group.stream(), target, with);
                let mut rebuilt = proc_macro2::Group::new(group.delimiter(), inner);
                rebuilt.set_span(group.span());
                out.extend(std::iter::once(TokenTree::Group(rebuilt)));
                after_dot = false;
            }
            TokenTree::Punct(p) => {
                after_dot = p.as_char() == '.';
                out.extend(std::iter::once(TokenTree::Punct(p)));
            }
            other => {
                out.extend(std::iter::once(other));
                after_dot = false;
            }
        }
    }
    out
}

impl InlineExpr {
    /// Parse tokens that already went through [`substitute_param`].
    pub fn parse(tokens: TokenStream) -> InlineExpr {
        match syn::parse2::<syn::Expr>(tokens.clone()) {
            Ok(expr) => InlineExpr::from_syn(&expr),
            Err(_) => InlineExpr::Opaque(tokens.to_string()),
        }
    }

    pub fn from_syn(expr: &syn::Expr) -> InlineExpr {
        let opaque = || InlineExpr::Opaque(expr.to_token_stream().to_string());

        match expr {
            syn::Expr::Path(p) if p.qself.is_none() && p.path.is_ident(SOURCE_PLACEHOLDER) => {
                InlineExpr::Source
            }
            syn::Expr::Field(f) => match &f.member {
                syn::Member::Named(name) => InlineExpr::Member {
                    base: Box::new(InlineExpr::from_syn(&f.base)),
                    name: name.to_string(),
                },
                syn::Member::Unnamed(_) => opaque(),
            },
            syn::Expr::Lit(lit) => InlineExpr::Literal(lit.to_token_stream().to_string()),
            syn::Expr::Reference(r) if r.mutability.is_none() => {
                InlineExpr::Reference(Box::new(InlineExpr::from_syn(&r.expr)))
            }
            syn::Expr::Unary(u) => {
                let op = match u.op {
                    syn::UnOp::Not(_) => UnaryOp::Not,
                    syn::UnOp::Neg(_) => UnaryOp::Neg,
                    _ => return opaque(),
                };
                InlineExpr::Unary { op, operand: Box::new(InlineExpr::from_syn(&u.expr)) }
            }
            syn::Expr::Binary(b) => match binary_op(&b.op) {
                Some(op) => InlineExpr::Binary {
                    op,
                    left: Box::new(InlineExpr::from_syn(&b.left)),
                    right: Box::new(InlineExpr::from_syn(&b.right)),
                },
                None => opaque(),
            },
            syn::Expr::If(i) => {
                let (Some(then), Some((_, otherwise))) = (block_value(&i.then_branch), &i.else_branch)
                else {
                    return opaque();
                };
                let otherwise = match otherwise.as_ref() {
                    syn::Expr::Block(b) if b.label.is_none() => match block_value(&b.block) {
                        Some(value) => value,
                        None => return opaque(),
                    },
                    nested @ syn::Expr::If(_) => InlineExpr::from_syn(nested),
                    _ => return opaque(),
                };
                if matches!(*i.cond, syn::Expr::Let(_)) {
                    return opaque();
                }
                InlineExpr::Conditional {
                    condition: Box::new(InlineExpr::from_syn(&i.cond)),
                    then: Box::new(then),
                    otherwise: Box::new(otherwise),
                }
            }
            syn::Expr::MethodCall(m) if m.turbofish.is_none() => {
                let receiver = Box::new(InlineExpr::from_syn(&m.receiver));
                let mut args: Vec<InlineExpr> = m.args.iter().map(InlineExpr::from_syn).collect();
                if m.method == "unwrap_or" && args.len() == 1 {
                    let fallback = Box::new(args.remove(0));
                    return InlineExpr::Coalesce { value: receiver, fallback };
                }
                InlineExpr::Call { receiver, method: m.method.to_string(), args }
            }
            syn::Expr::Paren(p) => InlineExpr::from_syn(&p.expr),
            syn::Expr::Group(g) => InlineExpr::from_syn(&g.expr),
            _ => opaque(),
        }
    }

    /// `s.x`, `&s.x` and `s.x.clone()` name a source member directly.
    pub fn as_source_member(&self) -> Option<&str> {
        match self {
            InlineExpr::Member { base, name } if **base == InlineExpr::Source => Some(name),
            InlineExpr::Reference(inner) => inner.as_source_member(),
            InlineExpr::Call { receiver, method, args } if method == "clone" && args.is_empty() => {
                receiver.as_source_member()
            }
            _ => None,
        }
    }

    //operands that need parentheses when nested
    fn is_compound(&self) -> bool {
        matches!(
            self,
            InlineExpr::Reference(_)
                | InlineExpr::Unary { .. }
                | InlineExpr::Binary { .. }
                | InlineExpr::Conditional { .. }
                | InlineExpr::Opaque(_)
        )
    }

    fn operand(&self, source: &TokenStream) -> TokenStream {
        let tokens = self.to_tokens_with(source);
        if self.is_compound() { quote! { (#tokens) } } else { tokens }
    }

    /// Emit the expression with the placeholder replaced by `source`.
    pub fn to_tokens_with(&self, source: &TokenStream) -> TokenStream {
        match self {
            InlineExpr::Source => source.clone(),
            InlineExpr::Member { base, name } => {
                let base = base.operand(source);
                let name = ident(name);
                quote! { #base.#name }
            }
            InlineExpr::Literal(text) => text.parse().unwrap_or_default(),
            InlineExpr::Reference(inner) => {
                let inner = inner.operand(source);
                quote! { &#inner }
            }
            InlineExpr::Unary { op, operand } => {
                let operand = operand.operand(source);
                match op {
                    UnaryOp::Not => quote! { !#operand },
                    UnaryOp::Neg => quote! { -#operand },
                }
            }
            InlineExpr::Binary { op, left, right } => {
                let left = left.operand(source);
                let right = right.operand(source);
                let op = op.tokens();
                quote! { #left #op #right }
            }
            InlineExpr::Conditional { condition, then, otherwise } => {
                let condition = condition.operand(source);
                let then = then.to_tokens_with(source);
                let otherwise = otherwise.to_tokens_with(source);
                quote! { if #condition { #then } else { #otherwise } }
            }
            InlineExpr::Coalesce { value, fallback } => {
                let value = value.operand(source);
                let fallback = fallback.to_tokens_with(source);
                quote! { #value.unwrap_or(#fallback) }
            }
            InlineExpr::Call { receiver, method, args } => {
                let receiver = receiver.operand(source);
                let method = ident(method);
                let args = args.iter().map(|a| a.to_tokens_with(source));
                quote! { #receiver.#method(#(#args),*) }
            }
            InlineExpr::Opaque(text) => {
                let tokens: TokenStream = text.parse().unwrap_or_default();
                replace_ident(tokens, SOURCE_PLACEHOLDER, &|_| source.clone())
            }
        }
    }
}

impl BinaryOp {
    fn tokens(self) -> TokenStream {
        match self {
            BinaryOp::Eq => quote! { == },
            BinaryOp::Ne => quote! { != },
            BinaryOp::Lt => quote! { < },
            BinaryOp::Le => quote! { <= },
            BinaryOp::Gt => quote! { > },
            BinaryOp::Ge => quote! { >= },
            BinaryOp::And => quote! { && },
            BinaryOp::Or => quote! { || },
            BinaryOp::Add => quote! { + },
            BinaryOp::Sub => quote! { - },
            BinaryOp::Mul => quote! { * },
            BinaryOp::Div => quote! { / },
            BinaryOp::Rem => quote! { % },
        }
    }
}

fn binary_op(op: &syn::BinOp) -> Option<BinaryOp> {
    Some(match op {
        syn::BinOp::Eq(_) => BinaryOp::Eq,
        syn::BinOp::Ne(_) => BinaryOp::Ne,
        syn::BinOp::Lt(_) => BinaryOp::Lt,
        syn::BinOp::Le(_) => BinaryOp::Le,
        syn::BinOp::Gt(_) => BinaryOp::Gt,
        syn::BinOp::Ge(_) => BinaryOp::Ge,
        syn::BinOp::And(_) => BinaryOp::And,
        syn::BinOp::Or(_) => BinaryOp::Or,
        syn::BinOp::Add(_) => BinaryOp::Add,
        syn::BinOp::Sub(_) => BinaryOp::Sub,
        syn::BinOp::Mul(_) => BinaryOp::Mul,
        syn::BinOp::Div(_) => BinaryOp::Div,
        syn::BinOp::Rem(_) => BinaryOp::Rem,
        _ => return None,
    })
}

//`{ value }` with no statements
fn block_value(block: &syn::Block) -> Option<InlineExpr> {
    match block.stmts.as_slice() {
        [syn::Stmt::Expr(expr, None)] => Some(InlineExpr::from_syn(expr)),
        _ => None,
    }
}

impl fmt::Display for InlineExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = quote! { source };
        write!(f, "{}", self.to_tokens_with(&source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk_expr(param: &str, body: &str) -> InlineExpr {
        let tokens: TokenStream = body.parse().unwrap();
        InlineExpr::parse(substitute_param(tokens, param))
    }

    fn emit(expr: &InlineExpr) -> String {
        expr.to_tokens_with(&quote! { src }).to_string().replace(' ', "")
    }

    #[test]
    fn substitution_skips_field_names_and_reaches_into_macros() {
        let tokens: TokenStream = "format!(\"{}\", s.s) + s".parse().unwrap();
        let out = substitute_param(tokens, "s").to_string().replace(' ', "");
        assert_eq!(out, "format!(\"{}\",__mapgen_source.s)+__mapgen_source");
    }

    #[test]
    fn bare_member_forms_name_a_source_member() {
        assert_eq!(mk_expr("s", "s.id").as_source_member(), Some("id"));
        assert_eq!(mk_expr("s", "&s.name").as_source_member(), Some("name"));
        assert_eq!(mk_expr("u", "u.name.clone()").as_source_member(), Some("name"));
        assert_eq!(mk_expr("s", "s.name.to_string()").as_source_member(), None);
        assert_eq!(mk_expr("s", "s.address.city").as_source_member(), None);
    }

    #[test]
    fn comparisons_and_boolean_ops_get_parenthesized_operands() {
        let expr = mk_expr("s", "s.price > 0.0 && !s.archived");
        match &expr {
            InlineExpr::Binary { op: BinaryOp::And, .. } => {}
            other => panic!("expected &&, got {:?}", other),
        }
        assert_eq!(emit(&expr), "(src.price>0.0)&&(!src.archived)");
    }

    #[test]
    fn unwrap_or_is_a_coalesce_and_if_else_is_a_conditional() {
        let expr = mk_expr("s", "s.nickname.clone().unwrap_or(s.username.clone())");
        assert!(matches!(expr, InlineExpr::Coalesce { .. }));
        assert_eq!(emit(&expr), "src.nickname.clone().unwrap_or(src.username.clone())");

        let expr = mk_expr("s", "if s.active { 1 } else { 0 }");
        assert!(matches!(expr, InlineExpr::Conditional { .. }));
        assert_eq!(emit(&expr), "ifsrc.active{1}else{0}");
    }

    #[test]
    fn unknown_forms_stay_opaque_and_still_substitute() {
        let expr = mk_expr("s", "s.items.iter().map(|i| i.price).sum::<f64>()");
        assert!(matches!(expr, InlineExpr::Opaque(_)));
        assert_eq!(emit(&expr), "src.items.iter().map(|i|i.price).sum::<f64>()");

        let expr = mk_expr("s", "format!(\"{} <{}>\", s.name, s.email)");
        assert!(matches!(expr, InlineExpr::Opaque(_)));
        assert!(emit(&expr).contains("src.name,src.email"));
    }

    #[test]
    fn display_uses_a_readable_source_name() {
        let expr = mk_expr("s", "s.age >= 18");
        assert_eq!(expr.to_string().replace(' ', ""), "source.age>=18");
    }
}
