//! Serializable type-declaration IR and the struct scanner that fills it.
//!
//! The catalog is the resolver's only view of the host program: one [`TypeDecl`] per
//! struct with named fields. It can be built by scanning Rust source with [`scan_items`]
//! or loaded from TOON text produced by another tool.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use proc_macro2::TokenTree;
use serde::{Deserialize, Serialize};

use crate::core::error::MapgenError;
use crate::core::types::TypeRef;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCatalog {
    #[serde(default)]
    pub types: Vec<TypeDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    #[serde(default)]
    pub has_default: bool,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeRef,
    #[serde(default)]
    pub public: bool,
    /// Embedded parent whose members are inherited.
    #[serde(default)]
    pub base: bool,
}

impl TypeDecl {
    pub fn new(name: impl Into<String>) -> Self {
        TypeDecl { name: name.into(), has_default: false, fields: Vec::new() }
    }

    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    pub fn field(mut self, name: &str, ty: TypeRef) -> Self {
        self.fields.push(FieldDecl { name: name.to_string(), ty, public: true, base: false });
        self
    }

    pub fn private_field(mut self, name: &str, ty: TypeRef) -> Self {
        self.fields.push(FieldDecl { name: name.to_string(), ty, public: false, base: false });
        self
    }

    pub fn base(mut self, name: &str, ty: TypeRef) -> Self {
        self.fields.push(FieldDecl { name: name.to_string(), ty, public: true, base: true });
        self
    }
}

/// Struct declarations and `impl Default for X` targets found in one source unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScannedTypes {
    pub decls: Vec<TypeDecl>,
    pub default_impls: BTreeSet<String>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, decl: TypeDecl) {
        //first declaration of a name wins, same as mapping declarations
        if self.get(&decl.name).is_none() {
            self.types.push(decl);
        }
    }

    pub fn get(&self, name: &str) -> Option<&TypeDecl> {
        self.types.iter().find(|t| t.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn merge(&mut self, other: TypeCatalog) {
        for decl in other.types {
            self.insert(decl);
        }
    }

    /// Build a catalog from scanned units. `impl Default` blocks may live in a different
    /// unit than the struct they target.
    pub fn assemble<'a>(units: impl IntoIterator<Item = &'a ScannedTypes>) -> Self {
        let mut catalog = TypeCatalog::new();
        let mut defaults: BTreeSet<&str> = BTreeSet::new();

        for unit in units {
            defaults.extend(unit.default_impls.iter().map(String::as_str));
            for decl in &unit.decls {
                catalog.insert(decl.clone());
            }
        }

        for decl in catalog.types.iter_mut() {
            if defaults.contains(decl.name.as_str()) {
                decl.has_default = true;
            }
        }
        catalog
    }

    pub fn index(&self) -> HashMap<&str, &TypeDecl> {
        self.types.iter().map(|t| (t.name.as_str(), t)).collect()
    }

    pub fn to_toon(&self) -> Result<String, MapgenError> {
        toon_format::encode_default(self).map_err(|e| MapgenError::Config(e.to_string()))
    }

    pub fn from_toon(text: &str) -> Result<Self, MapgenError> {
        toon_format::decode_default(text).map_err(|e| MapgenError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, MapgenError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| MapgenError::Read { path: path.display().to_string(), source })?;
        Self::from_toon(&text)
    }
}

pub fn scan_file(file: &syn::File) -> ScannedTypes {
    let mut out = ScannedTypes::default();
    scan_items(&file.items, &mut out);
    out
}

/// Collect named-field structs and `Default` impls, descending into inline modules.
pub fn scan_items(items: &[syn::Item], out: &mut ScannedTypes) {
    for item in items {
        match item {
            syn::Item::Struct(s) => {
                let syn::Fields::Named(named) = &s.fields else {
                    continue;
                };

                let mut decl = TypeDecl::new(s.ident.to_string());
                decl.has_default = s.attrs.iter().any(|a| attr_lists(a, "derive", "Default"));

                for field in &named.named {
                    let Some(ident) = &field.ident else { continue };
                    decl.fields.push(FieldDecl {
                        name: ident.to_string(),
                        ty: TypeRef::from_syn(&field.ty),
                        public: !matches!(field.vis, syn::Visibility::Inherited),
                        base: field.attrs.iter().any(|a| attr_lists(a, "serde", "flatten")),
                    });
                }
                out.decls.push(decl);
            }
            syn::Item::Impl(imp) => {
                let is_default = imp
                    .trait_
                    .as_ref()
                    .and_then(|(_, path, _)| path.segments.last())
                    .is_some_and(|seg| seg.ident == "Default");
                if is_default {
                    if let Some(name) = TypeRef::from_syn(&imp.self_ty).ident() {
                        out.default_impls.insert(name.to_string());
                    }
                }
            }
            syn::Item::Mod(m) => {
                if let Some((_, inner)) = &m.content {
                    scan_items(inner, out);
                }
            }
            _ => {}
        }
    }
}

//true for `#[outer(.., flag, ..)]`; only top-level idents of the list are looked at
fn attr_lists(attr: &syn::Attribute, outer: &str, flag: &str) -> bool {
    if !attr.path().is_ident(outer) {
        return false;
    }
    let syn::Meta::List(list) = &attr.meta else {
        return false;
    };
    list.tokens.clone().into_iter().any(|tt| match tt {
        TokenTree::Ident(ident) => ident == flag,
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(src: &str) -> ScannedTypes {
        scan_file(&syn::parse_file(src).unwrap())
    }

    fn ty(text: &str) -> TypeRef {
        TypeRef::from_syn(&syn::parse_str::<syn::Type>(text).unwrap())
    }

    #[test]
    fn toon_text_keeps_flags_and_generic_types() {
        let mut catalog = TypeCatalog::new();
        catalog.insert(
            TypeDecl::new("Employee")
                .with_default()
                .base("entity", ty("models::Entity"))
                .field("homes", ty("Vec<Option<Address>>"))
                .field("grid", ty("[u8; 4]"))
                .private_field("salary", ty("u64")),
        );
        catalog.insert(TypeDecl::new("Address").field("city", ty("::std::string::String")));

        let text = catalog.to_toon().unwrap();
        let back = TypeCatalog::from_toon(&text).unwrap();
        assert_eq!(back, catalog);

        let employee = back.get("Employee").unwrap();
        assert!(employee.has_default && !back.get("Address").unwrap().has_default);
        assert!(employee.fields[0].base && employee.fields[0].public);
        assert_eq!(employee.fields[1].ty.identity(), "Vec<Option<Address>>");
        assert!(!employee.fields[3].public);
    }

    #[test]
    fn malformed_toon_is_a_config_error() {
        let err = TypeCatalog::from_toon("types: 5").unwrap_err();
        assert!(matches!(err, MapgenError::Config(_)));
    }

    #[test]
    fn scans_named_structs_visibility_and_flatten() {
        let unit = scan(
            r#"
            #[derive(Debug, Clone, Default)]
            pub struct Employee {
                #[serde(flatten)]
                pub entity: Entity,
                pub name: String,
                secret: u64,
            }
            pub struct Unit;
            pub struct Pair(u8, u8);
            "#,
        );

        assert_eq!(unit.decls.len(), 1);
        let emp = &unit.decls[0];
        assert_eq!(emp.name, "Employee");
        assert!(emp.has_default);
        assert!(emp.fields[0].base);
        assert!(emp.fields[1].public && !emp.fields[1].base);
        assert!(!emp.fields[2].public);
    }

    #[test]
    fn impl_default_in_another_unit_marks_the_struct() {
        let models = scan("pub struct Receipt { pub id: i64 }");
        let impls = scan("impl Default for models::Receipt { fn default() -> Self { todo!() } }");

        let catalog = TypeCatalog::assemble([&models, &impls]);
        assert!(catalog.get("Receipt").unwrap().has_default);
    }

    #[test]
    fn nested_modules_are_scanned_and_first_declaration_wins() {
        let unit = scan(
            r#"
            mod a { pub struct Dup { pub x: i32 } }
            mod b { pub struct Dup { pub y: i32 } }
            "#,
        );
        let catalog = TypeCatalog::assemble([&unit]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("Dup").unwrap().fields[0].name, "x");
    }
}
