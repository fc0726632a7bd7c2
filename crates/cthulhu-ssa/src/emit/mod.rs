//! C89 backend emitter (spec.md §4.5).
//!
//! Grounded on `examples/original_source/src/cthulhu/emit/src/c89/emit.c`:
//! the single entry point `run` dispatches on `BackendConfig::layout()` to
//! either the per-module or single-pair translation unit assembly in
//! `program.rs`, using `mangle`/`type_format`/`value_format`/`blocks` as the
//! shared formatting layer both layouts call into.

pub mod blocks;
pub mod error;
pub mod mangle;
pub mod program;
pub mod type_format;
pub mod value_format;

pub use error::EmitError;
pub use program::run;
