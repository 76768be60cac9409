//! Compile-time object mapping.
//!
//! Mapping profiles are written against [`runtime::MapperConfiguration`]:
//!
//! ```ignore
//! impl MappingProfile for UserProfile {
//!     fn configure(&self, config: &mut MapperConfiguration) {
//!         config
//!             .create_map::<User, UserDto>()
//!             .for_member(|d| &d.user_id, |o| o.map_from(|s| s.id))
//!             .reverse_map();
//!     }
//! }
//! ```
//!
//! A build script feeds the profiles and the model sources to [`Generator`], which reads the
//! declarations back out of the syntax tree and emits plain conversion functions. At run time
//! the same profiles only contribute hook callables and declaration summaries.

pub mod config;
pub mod core;
pub mod mapping;
pub mod pipeline;
pub mod runtime;

pub use config::GeneratorOptions;
pub use core::error::MapgenError;
pub use pipeline::{GenerationOutput, Generator};
pub use runtime::{MapperConfiguration, MappingError, MappingProfile};
