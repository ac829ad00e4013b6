//! motif: a small typed language for writing music, compiled to ABC notation.

pub mod config;
pub mod dsl;
pub mod render;
pub mod runtime;
