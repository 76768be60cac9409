// incremental re-extraction
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::core::catalog::{ScannedTypes, TypeCatalog, scan_file};
use crate::core::decl::{ExtractionIssue, MappingDeclaration};
use crate::core::error::MapgenError;
use crate::mapping::extract::{Extraction, extract_file};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitChange {
    Added,
    Updated,
    Unchanged,
}

/// One scanned source file.
#[derive(Debug, Clone)]
pub struct Unit {
    pub path: String,
    pub fingerprint: u64,
    pub types: ScannedTypes,
    pub extraction: Extraction,
}

/// Per-file scan results, so a rerun only re-parses files whose text changed.
///
/// Units keep the order they were first added in; declarations and the assembled catalog follow
/// that order.
#[derive(Debug, Default)]
pub struct ExtractionCache {
    units: Vec<Unit>,
}

fn fingerprint(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

impl ExtractionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan `text` as the content of `path`.
    ///
    /// A file that does not parse leaves the cache untouched, including any earlier version of
    /// the same path.
    pub fn update(&mut self, path: &str, text: &str) -> Result<UnitChange, MapgenError> {
        let print = fingerprint(text);
        let existing = self.units.iter().position(|u| u.path == path);

        if let Some(at) = existing {
            if self.units[at].fingerprint == print {
                tracing::trace!(path, "source unchanged");
                return Ok(UnitChange::Unchanged);
            }
        }

        let file = syn::parse_file(text)
            .map_err(|source| MapgenError::Parse { path: path.to_string(), source })?;
        let unit = Unit {
            path: path.to_string(),
            fingerprint: print,
            types: scan_file(&file),
            extraction: extract_file(path, &file),
        };
        tracing::debug!(
            path,
            types = unit.types.decls.len(),
            declarations = unit.extraction.declarations.len(),
            "source scanned"
        );

        Ok(match existing {
            Some(at) => {
                self.units[at] = unit;
                UnitChange::Updated
            }
            None => {
                self.units.push(unit);
                UnitChange::Added
            }
        })
    }

    pub fn remove(&mut self, path: &str) -> bool {
        let before = self.units.len();
        self.units.retain(|u| u.path != path);
        before != self.units.len()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.units.iter().any(|u| u.path == path)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> + '_ {
        self.units.iter().map(|u| u.path.as_str())
    }

    pub fn declarations(&self) -> Vec<MappingDeclaration> {
        self.units.iter().flat_map(|u| u.extraction.declarations.iter().cloned()).collect()
    }

    pub fn issues(&self) -> Vec<ExtractionIssue> {
        self.units.iter().flat_map(|u| u.extraction.issues.iter().cloned()).collect()
    }

    pub fn catalog(&self) -> TypeCatalog {
        TypeCatalog::assemble(self.units.iter().map(|u| &u.types))
    }
}
