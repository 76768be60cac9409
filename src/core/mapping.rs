// per-group declaration store keyed by type pair
use std::collections::HashMap;

use thiserror::Error;

use crate::core::decl::{DeclOrigin, MappingDeclaration, TypePairKey};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MappingConflict {
    #[error("mapping {key} is already declared; the first declaration is kept")]
    AlreadyDeclared { key: TypePairKey, kept: DeclOrigin, rejected: DeclOrigin },
}

/// Declarations of one configuration group. Each pair maps at most once, first insert wins,
/// iteration follows insertion order.
#[derive(Debug, Clone, Default)]
pub struct MappingSet {
    entries: Vec<MappingDeclaration>,
    index: HashMap<TypePairKey, usize>,
}

impl MappingSet {
    pub fn new() -> Self {
        Self::default()
    }

    //no overwrites: a second declaration of the same pair is handed back as a conflict
    pub fn insert(&mut self, decl: MappingDeclaration) -> Result<usize, MappingConflict> {
        let key = decl.key();
        match self.index.get(&key).copied() {
            None => {
                let at = self.entries.len();
                self.index.insert(key, at);
                self.entries.push(decl);
                Ok(at)
            }
            Some(at) => Err(MappingConflict::AlreadyDeclared {
                key,
                kept: self.entries[at].origin,
                rejected: decl.origin,
            }),
        }
    }

    pub fn get(&self, key: &TypePairKey) -> Option<&MappingDeclaration> {
        self.index.get(key).map(|&at| &self.entries[at])
    }

    pub fn contains(&self, key: &TypePairKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MappingDeclaration> + '_ {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::decl::MemberBinding;
    use crate::core::types::TypeRef;

    fn mk_decl(source: &str, destination: &str) -> MappingDeclaration {
        MappingDeclaration::new("Profile", TypeRef::named(source), TypeRef::named(destination))
    }

    #[test]
    fn insert_and_lookup_by_pair() {
        let mut set = MappingSet::new();
        set.insert(mk_decl("User", "UserDto")).unwrap();
        set.insert(mk_decl("Order", "OrderDto")).unwrap();

        let key = TypePairKey::new(&TypeRef::named("models::User"), &TypeRef::named("UserDto"));
        assert!(set.contains(&key));
        assert!(!set.contains(&key.reversed()));
        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().next().unwrap().source, TypeRef::named("User"));
    }

    #[test]
    fn first_declaration_wins() {
        let mut set = MappingSet::new();
        set.insert(mk_decl("User", "UserDto").with(MemberBinding::ignored("email"))).unwrap();

        let err = set.insert(mk_decl("User", "UserDto")).unwrap_err();
        match err {
            MappingConflict::AlreadyDeclared { key, kept, rejected } => {
                assert_eq!(key.to_string(), "User -> UserDto");
                assert_eq!(kept, DeclOrigin::Declared);
                assert_eq!(rejected, DeclOrigin::Declared);
            }
        }

        let kept = set.get(&TypePairKey::new(&TypeRef::named("User"), &TypeRef::named("UserDto")));
        assert!(kept.unwrap().binding("email").unwrap().is_ignored());
    }
}
