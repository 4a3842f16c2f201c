use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use hermes_idl_compiler::{compile_file, emit, EmitOptions, HgcError, Target};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hgc")]
#[command(about = "Check Hermes rpc definitions and generate stubs from them", long_about = None)]
struct Cli {
    /// Log pipeline stages to stderr (same as `RUST_LOG=debug`)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate an rpc definition file
    Check {
        /// Input definition file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Generate code from an rpc definition file
    Gen {
        /// Input definition file
        #[arg(short, long)]
        input: PathBuf,

        /// Emission target (see `hgc targets`)
        #[arg(short, long, default_value = "cpp-stub")]
        target: String,

        /// Output file (if omitted, prints to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// JSON file with emitter options
        #[arg(long)]
        options: Option<PathBuf>,

        /// C++ namespace for the generated descriptors
        #[arg(long)]
        namespace: Option<String>,

        /// Public id of the first rpc
        #[arg(long)]
        first_id: Option<u16>,
    },

    /// List the available emission targets
    Targets,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Prints source diagnostics as `file:line:column: message`; anything else
/// as a single error line.
fn report(input: &Path, err: &HgcError) {
    let diagnostics = err.diagnostics();
    if diagnostics.is_empty() {
        eprintln!("error: {}", err);
        return;
    }
    for diagnostic in &diagnostics {
        eprintln!("{}:{}", input.display(), diagnostic);
    }
    eprintln!("error: {} diagnostic(s) in {}", diagnostics.len(), input.display());
}

fn run(command: &Commands) -> Result<(), HgcError> {
    match command {
        Commands::Check { input } => {
            let document = compile_file(input)?;
            println!("ok: {} rpc(s) in {}", document.len(), input.display());
            Ok(())
        }

        Commands::Gen { input, target, output, options, namespace, first_id } => {
            // Resolve the target before touching the input
            let target: Target = target.parse()?;

            let mut emit_options = match options {
                Some(path) => EmitOptions::from_file(path)?,
                None       => EmitOptions::default(),
            };
            if let Some(namespace) = namespace {
                emit_options.namespace = namespace.clone();
            }
            if let Some(first_id) = first_id {
                emit_options.first_public_id = *first_id;
            }

            let document = compile_file(input)?;
            let code = emit(&document, target, &emit_options)?;

            if let Some(out_path) = output {
                fs::write(out_path, &code)?;
                println!("Generated {} → {}", input.display(), out_path.display());
            } else {
                print!("{}", code);
            }
            Ok(())
        }

        Commands::Targets => {
            for target in Target::ALL {
                println!("{:<10} {}", target.id(), target.description());
            }
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let input = match &cli.command {
                Commands::Check { input } | Commands::Gen { input, .. } => input.as_path(),
                Commands::Targets => Path::new("hgc"),
            };
            tracing::debug!(error = ?err, "command failed");
            report(input, &err);
            ExitCode::FAILURE
        }
    }
}
