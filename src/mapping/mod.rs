pub mod diagnostics;
pub mod extract;
pub mod generator;
pub mod hooks;
