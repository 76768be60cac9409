pub mod catalog;
pub mod classify;
pub mod decl;
pub mod delta;
pub mod error;
pub mod expr;
pub mod mapping;
pub mod normalize;
pub mod propagate;
pub mod shape;
pub mod types;
