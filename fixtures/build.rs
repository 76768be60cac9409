use std::path::PathBuf;

use mapgen_core::{Generator, GeneratorOptions, MapgenError};

fn main() -> Result<(), MapgenError> {
    let manifest = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").unwrap_or_default());
    let out_dir = PathBuf::from(std::env::var("OUT_DIR").unwrap_or_default());

    let mut generator = Generator::new(GeneratorOptions::default());
    generator.add_source_file(manifest.join("src/models.rs"))?;
    generator.add_source_file(manifest.join("src/profiles.rs"))?;

    let output = generator.generate()?;
    output.emit_cargo_warnings();
    output.write_to(out_dir.join("mappers.rs"))?;
    generator.rerun_if_changed();
    Ok(())
}
