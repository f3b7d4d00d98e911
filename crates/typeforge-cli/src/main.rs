//! typeforge command-line tool
//!
//! Render model descriptions to forge script, compile and run them, check
//! standalone source files and inspect the reference set.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod model_file;

#[derive(Parser)]
#[command(name = "typeforge")]
#[command(about = "Build, compile and instantiate classes at runtime", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (default: ./typeforge.toml if present)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a model description to source text
    Render {
        /// Model description (TOML)
        model: PathBuf,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compile a model, create an instance and print its members
    Build {
        /// Model description (TOML)
        model: PathBuf,
        /// Constructor argument (repeatable)
        #[arg(long = "arg", value_name = "VALUE", allow_hyphen_values = true)]
        args: Vec<String>,
        /// Invoke a method on the instance: METHOD [ARGS]...
        #[arg(long, num_args = 1.., value_name = "METHOD", allow_hyphen_values = true)]
        invoke: Option<Vec<String>>,
    },

    /// Compile a source file and report diagnostics
    Check {
        /// Forge script source file
        source: PathBuf,
        /// Treat warnings as errors
        #[arg(long)]
        warnings_as_errors: bool,
    },

    /// Print the resolved reference set
    Refs {
        /// Rescan the reference directory
        #[arg(long)]
        reload: bool,
    },

    /// Compile a model and write the module image
    Emit {
        /// Model description (TOML)
        model: PathBuf,
        /// Output module file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let session = commands::Session::open(cli.config.as_deref())?;

    match cli.command {
        Commands::Render { model, output } => commands::render::execute(&session, &model, output.as_deref()),
        Commands::Build { model, args, invoke } => commands::build::execute(&session, &model, &args, invoke.as_deref()),
        Commands::Check {
            source,
            warnings_as_errors,
        } => commands::check::execute(&session, &source, warnings_as_errors),
        Commands::Refs { reload } => commands::refs::execute(&session, reload),
        Commands::Emit { model, output } => commands::emit::execute(&session, &model, &output),
    }
}
