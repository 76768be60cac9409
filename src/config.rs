// generator options, loaded from TOON
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::MapgenError;
use crate::core::shape::KindRules;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorOptions {
    /// Path generated code uses to reach the run-time support module.
    pub runtime_path: String,
    /// Name of the mapper combining all groups, emitted when there is more than one group.
    pub aggregate_name: String,
    /// Appended to the group name to name its mapper.
    pub mapper_suffix: String,
    pub extra_atomic_types: Vec<String>,
    pub extra_collection_types: Vec<String>,
    /// Emit the `@generated` header line.
    pub header: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        GeneratorOptions {
            runtime_path: "::mapgen_core::runtime".to_string(),
            aggregate_name: "AggregateMapper".to_string(),
            mapper_suffix: "Mapper".to_string(),
            extra_atomic_types: Vec::new(),
            extra_collection_types: Vec::new(),
            header: true,
        }
    }
}

impl GeneratorOptions {
    pub fn from_toon(text: &str) -> Result<Self, MapgenError> {
        let options: GeneratorOptions =
            toon_format::decode_default(text).map_err(|e| MapgenError::Config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn to_toon(&self) -> Result<String, MapgenError> {
        toon_format::encode_default(self).map_err(|e| MapgenError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, MapgenError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| MapgenError::Read { path: path.display().to_string(), source })?;
        Self::from_toon(&text)
    }

    pub fn validate(&self) -> Result<(), MapgenError> {
        self.runtime_path()?;
        for (what, name) in [("aggregate_name", &self.aggregate_name), ("mapper_suffix", &self.mapper_suffix)] {
            if syn::parse_str::<syn::Ident>(name).is_err() {
                return Err(MapgenError::Config(format!("`{}` is not an identifier: {:?}", what, name)));
            }
        }
        Ok(())
    }

    pub fn runtime_path(&self) -> Result<syn::Path, MapgenError> {
        syn::parse_str::<syn::Path>(&self.runtime_path).map_err(|e| {
            MapgenError::Config(format!("runtime_path `{}` is not a path: {}", self.runtime_path, e))
        })
    }

    pub fn kind_rules(&self) -> KindRules {
        KindRules::default()
            .with_atomic(self.extra_atomic_types.iter().cloned())
            .with_collections(self.extra_collection_types.iter().cloned())
    }
}
