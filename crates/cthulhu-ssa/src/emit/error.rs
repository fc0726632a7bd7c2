//! Emitter I/O errors.
//!
//! Modeled on `codegen/error.rs`'s `CodeGenError` (`Logic`/`Format` split) —
//! here the split is between filesystem failures and formatting failures,
//! since structural/semantic problems are routed through the
//! `DiagnosticSink` (spec.md §7) rather than this error type.

use std::fmt;
use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("filesystem error: {0}")]
    Io(#[from] io::Error),
    #[error("formatting error: {0}")]
    Format(#[from] fmt::Error),
}
