//! End-to-end generation: scan sources, normalize, check, emit.
//!
//! Meant to be driven from a `build.rs`:
//!
//! ```ignore
//! let mut generator = Generator::new(GeneratorOptions::default());
//! generator.add_source_file("src/models.rs")?;
//! generator.add_source_file("src/profiles.rs")?;
//! let output = generator.generate()?;
//! output.emit_cargo_warnings();
//! output.write_to(out_dir.join("mappers.rs"))?;
//! generator.rerun_if_changed();
//! ```

use std::path::Path;

use crate::config::GeneratorOptions;
use crate::core::catalog::TypeCatalog;
use crate::core::delta::{ExtractionCache, UnitChange};
use crate::core::error::MapgenError;
use crate::core::normalize::{FinalizedMapping, Normalizer};
use crate::core::shape::CatalogResolver;
use crate::mapping::diagnostics::{self, Diagnostic};
use crate::mapping::generator::CodeGenerator;

#[derive(Debug, Default)]
pub struct Generator {
    options: GeneratorOptions,
    cache: ExtractionCache,
    extra: TypeCatalog,
}

#[derive(Debug, Clone)]
pub struct GenerationOutput {
    pub code: String,
    pub diagnostics: Vec<Diagnostic>,
    pub mappings: Vec<FinalizedMapping>,
}

impl Generator {
    pub fn new(options: GeneratorOptions) -> Self {
        Generator { options, cache: ExtractionCache::new(), extra: TypeCatalog::new() }
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    /// Add or replace a source by path. Returns whether anything changed.
    pub fn add_source(&mut self, path: &str, text: &str) -> Result<bool, MapgenError> {
        Ok(self.cache.update(path, text)? != UnitChange::Unchanged)
    }

    pub fn add_source_file(&mut self, path: impl AsRef<Path>) -> Result<bool, MapgenError> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        let text = std::fs::read_to_string(path)
            .map_err(|source| MapgenError::Read { path: shown.clone(), source })?;
        self.add_source(&shown, &text)
    }

    pub fn remove_source(&mut self, path: &str) -> bool {
        self.cache.remove(path)
    }

    /// Types known without scanning, e.g. a catalog stored by an earlier run. Scanned
    /// declarations take precedence.
    pub fn add_catalog(&mut self, catalog: TypeCatalog) {
        self.extra.merge(catalog);
    }

    pub fn catalog(&self) -> TypeCatalog {
        let mut catalog = self.cache.catalog();
        catalog.merge(self.extra.clone());
        catalog
    }

    pub fn rerun_if_changed(&self) {
        for path in self.cache.paths() {
            println!("cargo:rerun-if-changed={}", path);
        }
    }

    pub fn generate(&self) -> Result<GenerationOutput, MapgenError> {
        self.options.validate()?;

        let catalog = self.catalog();
        let resolver = CatalogResolver::new(&catalog, self.options.kind_rules());
        let declarations = self.cache.declarations();
        let mappings = Normalizer::new(&resolver).normalize(&declarations);

        let diagnostics = diagnostics::check(&mappings, &self.cache.issues());
        for d in &diagnostics {
            tracing::warn!(code = d.code(), "{}", d);
        }

        let code = CodeGenerator::new(&self.options).generate(&mappings)?;
        tracing::info!(
            sources = self.cache.len(),
            types = catalog.len(),
            mappings = mappings.len(),
            diagnostics = diagnostics.len(),
            "mappers generated"
        );

        Ok(GenerationOutput { code, diagnostics, mappings })
    }
}

impl GenerationOutput {
    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// Write the code, leaving the file alone when its content is already current.
    /// Returns whether the file was written.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<bool, MapgenError> {
        let path = path.as_ref();
        if std::fs::read_to_string(path).is_ok_and(|current| current == self.code) {
            return Ok(false);
        }
        std::fs::write(path, &self.code)
            .map_err(|source| MapgenError::Write { path: path.display().to_string(), source })?;
        Ok(true)
    }

    pub fn emit_cargo_warnings(&self) {
        for d in &self.diagnostics {
            println!("cargo:warning={}", d);
        }
    }
}
