// type references, members and resolved shapes
use std::fmt;

use proc_macro2::TokenStream;
use quote::ToTokens;
use serde::{Deserialize, Serialize};

/// A type as written in source, reduced to what the resolver and generator need.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeRef {
    /// `a::b::Name<Args..>`. A leading `::` is kept as an empty first segment.
    Named { path: Vec<String>, args: Vec<TypeRef> },
    Array { elem: Box<TypeRef>, len: String },
    Tuple(Vec<TypeRef>),
    /// Anything else (references, trait objects, fn pointers), kept as token text.
    Opaque(String),
}

impl TypeRef {
    pub fn named(path: &str) -> Self {
        Self::generic(path, Vec::new())
    }

    pub fn generic(path: &str, args: Vec<TypeRef>) -> Self {
        TypeRef::Named {
            path: path.split("::").map(|s| s.trim().to_string()).collect(),
            args,
        }
    }

    pub fn from_syn(ty: &syn::Type) -> Self {
        match ty {
            syn::Type::Path(p) if p.qself.is_none() => {
                let mut path: Vec<String> = Vec::with_capacity(p.path.segments.len() + 1);
                if p.path.leading_colon.is_some() {
                    path.push(String::new());
                }
                path.extend(p.path.segments.iter().map(|seg| seg.ident.to_string()));

                let args = match p.path.segments.last().map(|seg| &seg.arguments) {
                    Some(syn::PathArguments::AngleBracketed(ab)) => ab
                        .args
                        .iter()
                        .filter_map(|arg| match arg {
                            syn::GenericArgument::Type(t) => Some(TypeRef::from_syn(t)),
                            _ => None,
                        })
                        .collect(),
                    _ => Vec::new(),
                };

                TypeRef::Named { path, args }
            }
            syn::Type::Array(a) => TypeRef::Array {
                elem: Box::new(TypeRef::from_syn(&a.elem)),
                len: a.len.to_token_stream().to_string(),
            },
            syn::Type::Tuple(t) => TypeRef::Tuple(t.elems.iter().map(TypeRef::from_syn).collect()),
            syn::Type::Group(g) => TypeRef::from_syn(&g.elem),
            syn::Type::Paren(p) => TypeRef::from_syn(&p.elem),
            other => TypeRef::Opaque(other.to_token_stream().to_string()),
        }
    }

    /// Last path segment, `None` for non-path types.
    pub fn ident(&self) -> Option<&str> {
        match self {
            TypeRef::Named { path, .. } => path.last().map(String::as_str),
            _ => None,
        }
    }

    pub fn args(&self) -> &[TypeRef] {
        match self {
            TypeRef::Named { args, .. } => args,
            _ => &[],
        }
    }

    pub fn single_arg(&self) -> Option<&TypeRef> {
        match self.args() {
            [only] => Some(only),
            _ => None,
        }
    }

    pub fn option_inner(&self) -> Option<&TypeRef> {
        if self.ident() == Some("Option") {
            self.single_arg()
        } else {
            None
        }
    }

    pub fn is_option(&self) -> bool {
        self.option_inner().is_some()
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TypeRef::Array { .. })
    }

    /// Identity used for shape lookup and type-pair keys: the last segment plus the
    /// identities of the generic arguments, so `models::User` and `User` are the same type.
    pub fn identity(&self) -> String {
        match self {
            TypeRef::Named { path, args } => {
                let name = path.last().cloned().unwrap_or_default();
                if args.is_empty() {
                    name
                } else {
                    let args: Vec<String> = args.iter().map(TypeRef::identity).collect();
                    format!("{}<{}>", name, args.join(", "))
                }
            }
            TypeRef::Array { elem, len } => format!("[{}; {}]", elem.identity(), len),
            TypeRef::Tuple(elems) => {
                let elems: Vec<String> = elems.iter().map(TypeRef::identity).collect();
                format!("({})", elems.join(", "))
            }
            TypeRef::Opaque(text) => text.clone(),
        }
    }

    pub fn same_as(&self, other: &TypeRef) -> bool {
        self.identity() == other.identity()
    }

    /// Path without generic arguments, usable in struct-literal position.
    pub fn path_tokens(&self) -> TokenStream {
        let text = match self {
            TypeRef::Named { path, .. } => path.join("::"),
            other => other.to_string(),
        };
        text.parse().unwrap_or_default()
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named { path, args } => {
                write!(f, "{}", path.join("::"))?;
                if !args.is_empty() {
                    let args: Vec<String> = args.iter().map(ToString::to_string).collect();
                    write!(f, "<{}>", args.join(", "))?;
                }
                Ok(())
            }
            TypeRef::Array { elem, len } => write!(f, "[{}; {}]", elem, len),
            TypeRef::Tuple(elems) if elems.len() == 1 => write!(f, "({},)", elems[0]),
            TypeRef::Tuple(elems) => {
                let elems: Vec<String> = elems.iter().map(ToString::to_string).collect();
                write!(f, "({})", elems.join(", "))
            }
            TypeRef::Opaque(text) => write!(f, "{}", text),
        }
    }
}

impl ToTokens for TypeRef {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        let parsed: TokenStream = self.to_string().parse().unwrap_or_default();
        tokens.extend(parsed);
    }
}

/// How a member's value is carried across a conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberKind {
    /// Assigned directly.
    Scalar,
    /// Date/time, duration, id and uri types. Copied as opaque values, never recursed into.
    Atomic,
    /// A user-defined shape known to the catalog.
    Complex { shape: String },
    /// Ordered sequence; each element converts on its own.
    Collection {
        element: TypeRef,
        element_kind: Box<MemberKind>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    /// Declared type, including any `Option` wrapper.
    pub ty: TypeRef,
    pub optional: bool,
    /// Must be supplied when the owning value is built.
    pub required: bool,
    /// Kind of the value type (with `Option` stripped).
    pub kind: MemberKind,
    /// Field path from the owning value. Inherited members go through their embedding field.
    pub access: Vec<String>,
}

impl Member {
    pub fn is_inherited(&self) -> bool {
        self.access.len() > 1
    }
}

/// Inheritance-flattened member list of one type. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeShape {
    pub name: String,
    pub members: Vec<Member>,
    /// Every top-level field in declaration order, visible or not.
    pub fields: Vec<String>,
    pub has_default: bool,
    /// False when the resolver did not know the type.
    pub resolved: bool,
}

impl TypeShape {
    pub fn empty(name: impl Into<String>) -> Self {
        TypeShape {
            name: name.into(),
            members: Vec::new(),
            fields: Vec::new(),
            has_default: false,
            resolved: false,
        }
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn has_member(&self, name: &str) -> bool {
        self.member(name).is_some()
    }

    /// True when building a value needs every field spelled out (struct-literal strategy).
    pub fn has_required_members(&self) -> bool {
        !self.has_default || self.members.iter().any(|m| m.required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> TypeRef {
        TypeRef::from_syn(&syn::parse_str::<syn::Type>(text).unwrap())
    }

    #[test]
    fn from_syn_keeps_path_and_generic_args() {
        let ty = parse("std::collections::Vec<models::Address>");
        assert_eq!(ty.ident(), Some("Vec"));
        assert_eq!(ty.single_arg(), Some(&parse("models::Address")));
        assert_eq!(ty.to_string(), "std::collections::Vec<models::Address>");
        assert_eq!(ty.identity(), "Vec<Address>");
    }

    #[test]
    fn option_inner_and_identity_ignore_qualification() {
        let ty = parse("Option<crate::models::User>");
        assert!(ty.is_option());
        assert_eq!(ty.option_inner().unwrap().identity(), "User");
        assert!(parse("crate::models::User").same_as(&TypeRef::named("User")));
        assert!(!parse("Option<u32>").same_as(&parse("u32")));
    }

    #[test]
    fn arrays_tuples_and_leading_colons_render_back() {
        assert_eq!(parse("[u8; 4]").to_string(), "[u8; 4]");
        assert!(parse("[u8; 4]").is_array());
        assert_eq!(parse("(i32,)").to_string(), "(i32,)");
        assert_eq!(parse("::std::string::String").to_string(), "::std::string::String");
        assert_eq!(parse("::std::string::String").identity(), "String");
    }

    #[test]
    fn path_tokens_drop_generic_arguments() {
        let ty = parse("models::Page<User>");
        assert_eq!(ty.path_tokens().to_string(), "models :: Page");
    }
}
