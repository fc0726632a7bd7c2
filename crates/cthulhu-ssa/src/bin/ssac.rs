//! `ssac` — a harness binary that runs a JSON-encoded HIR fixture through
//! lowering, the constant-folding optimizer, and the C89 emitter.
//!
//! `clap::Parser` for arguments, `tracing-subscriber` with an `EnvFilter`
//! installed once at startup (the library itself never prints).

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use cthulhu_ssa::config::BackendConfig;
use cthulhu_ssa::diagnostics::CollectingSink;
use cthulhu_ssa::hir::HirProgram;
use cthulhu_ssa::optimizer::Optimizer;
use cthulhu_ssa::vfs::{DiskFs, VirtualFilesystem};
use cthulhu_ssa::Lowering;

/// Compile a JSON HIR fixture to C89 via the `cthulhu-ssa` pipeline.
#[derive(Debug, Parser)]
#[command(name = "ssac", version, about)]
struct Cli {
    /// Path to a JSON-encoded `HirProgram` fixture.
    input: PathBuf,

    /// Directory output paths are resolved relative to.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Backend config as JSON (layout, output_header/output_source override,
    /// atomic_qualifier_is_error). Defaults to single-pair layout.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let input_text = match fs::read_to_string(&cli.input) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("failed to read {}: {err}", cli.input.display());
            return ExitCode::FAILURE;
        }
    };
    let hir: HirProgram = match serde_json::from_str(&input_text) {
        Ok(hir) => hir,
        Err(err) => {
            eprintln!("failed to parse HIR fixture: {err}");
            return ExitCode::FAILURE;
        }
    };
    let mut config: BackendConfig = match &cli.config {
        Some(path) => {
            let text = match fs::read_to_string(path) {
                Ok(text) => text,
                Err(err) => {
                    eprintln!("failed to read {}: {err}", path.display());
                    return ExitCode::FAILURE;
                }
            };
            match serde_json::from_str(&text) {
                Ok(config) => config,
                Err(err) => {
                    eprintln!("failed to parse config: {err}");
                    return ExitCode::FAILURE;
                }
            }
        }
        None => BackendConfig::default(),
    };
    if let Some(path) = &config.output_header {
        config.output_header = Some(cli.out_dir.join(path));
    }
    if let Some(path) = &config.output_source {
        config.output_source = Some(cli.out_dir.join(path));
    }

    let sink = CollectingSink::with_atomic_qualifier_as_error(config.atomic_qualifier_is_error);
    tracing::debug!(modules = hir.modules.len(), "lowering HIR program");
    let program = Lowering::lower(&hir, &sink);

    let optimizer = Optimizer::new(&sink);
    optimizer.run(&program);

    let fs_out = DiskFs;
    if let Err(err) = fs_out.create_dir(&cli.out_dir) {
        eprintln!("failed to create {}: {err}", cli.out_dir.display());
        return ExitCode::FAILURE;
    }
    let paths = cthulhu_ssa::emit::run(&program, &config, &sink, &fs_out);

    for diagnostic in sink.diagnostics().iter() {
        eprintln!("{diagnostic}");
    }
    for path in &paths {
        println!("{}", path.display());
    }

    if sink.error_count() > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
