//! Backend configuration.
//!
//! Modeled after `CompilerConfig`'s builder-style config struct.

use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// One `.c`/`.h` pair per SSA module.
    PerModule,
    /// One `.c`/`.h` pair for the entire program.
    Single,
}

/// Runtime configuration for a single emitter run.
///
/// `output_header`/`output_source` are an override pair used only by the
/// `Single` layout; exactly one of the two being set is the
/// `SourceAndHeaderOutput` configuration error (spec.md §7).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub layout: Option<Layout>,
    #[serde(default)]
    pub output_header: Option<PathBuf>,
    #[serde(default)]
    pub output_source: Option<PathBuf>,
    /// Treat `UnsupportedAtomic` as an error rather than a warning.
    #[serde(default)]
    pub atomic_qualifier_is_error: bool,
}

impl BackendConfig {
    pub fn layout(&self) -> Layout {
        self.layout.unwrap_or(Layout::Single)
    }

    /// `true` exactly when the caller set exactly one of the override
    /// output paths.
    pub fn has_mismatched_output_paths(&self) -> bool {
        self.output_header.is_some() != self.output_source.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_is_single() {
        let config = BackendConfig::default();
        assert_eq!(config.layout(), Layout::Single);
    }

    #[test]
    fn mismatched_output_paths_detected() {
        let mut config = BackendConfig::default();
        config.output_header = Some(PathBuf::from("out.h"));
        assert!(config.has_mismatched_output_paths());
        config.output_source = Some(PathBuf::from("out.c"));
        assert!(!config.has_mismatched_output_paths());
    }
}
