//! schema-idl CLI
//!
//! Converts JSON Schema files or URLs into a single TypeSpec source file.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use schema_idl::{EmitOptions, Emitter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "schema-idl")]
#[command(about = "Convert JSON Schema documents into TypeSpec")]
#[command(version)]
struct Cli {
    /// Schema sources: file paths or URLs (http:// or https://)
    #[arg(required = true)]
    schemas: Vec<String>,

    /// Output file (stdout if not specified)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Namespace to declare the generated types in
    #[arg(long)]
    namespace: Option<String>,

    /// Skip pretty-printing of the generated source
    #[arg(long)]
    no_format: bool,

    /// Log resolution and emission details to stderr
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

/// `RUST_LOG` wins over `--verbose` when set.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn run(cli: Cli) -> Result<(), u8> {
    let mut options = EmitOptions::new().format(!cli.no_format);
    if let Some(namespace) = cli.namespace {
        options = options.namespace(namespace);
    }

    let mut emitter = Emitter::new().options(options);
    for schema in &cli.schemas {
        emitter.add_schema(schema).map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?;
    }

    let source = emitter.emit().map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    match cli.output {
        Some(path) => {
            std::fs::write(&path, &source).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            print!("{}", source);
        }
    }

    Ok(())
}
