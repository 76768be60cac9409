//! Models and profiles run through the generator by `build.rs`; the generated mappers are
//! included below.

pub mod models;
pub mod profiles;

pub use models::*;

include!(concat!(env!("OUT_DIR"), "/mappers.rs"));
