//! Veil command-line tool
//!
//! Inspects, renders and compiles runtime proxies for types described in a
//! JSON type file.

mod commands;
mod output;
mod tracing_config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use termcolor::StandardStream;

use commands::compile::Input;
use commands::TargetArgs;

#[derive(Parser)]
#[command(name = "veil")]
#[command(about = "Runtime proxy synthesis toolkit", long_about = None)]
#[command(version)]
struct Cli {
    /// Colored output: auto, always or never
    #[arg(long, global = true, default_value = "auto")]
    color: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the methods a proxy for the targets would forward
    Surface {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Print the synthesized proxy source
    Render {
        #[command(flatten)]
        target: TargetArgs,
        /// Write the source into this directory instead of stdout
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },

    /// Compile and load a synthesized proxy, or a Veil source file
    Compile {
        /// JSON type description file
        #[arg(short, long)]
        types: PathBuf,
        /// Proxy a single class instead of a list of interfaces
        #[arg(long)]
        class: bool,
        /// Compile this source file instead of a synthesized proxy
        #[arg(long, conflicts_with_all = ["targets", "class"])]
        source: Option<PathBuf>,
        /// Fully qualified target type names
        #[arg(required_unless_present = "source")]
        targets: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_config::init_tracing();
    let cli = Cli::parse();
    let choice = output::resolve_color_choice(&cli.color);

    match cli.command {
        Commands::Surface { target } => {
            commands::surface::execute(&target, &mut std::io::stdout().lock())?;
        }

        Commands::Render { target, out_dir } => {
            commands::render::execute(&target, out_dir.as_deref(), &mut std::io::stdout().lock())?;
        }

        Commands::Compile {
            types,
            class,
            source,
            targets,
        } => {
            let mut out = StandardStream::stdout(choice);
            let mut err = StandardStream::stderr(choice);
            match source {
                Some(path) => {
                    let universe = commands::load_types(&types)?;
                    commands::compile::execute(&universe, Input::Source(&path), &mut out, &mut err)?;
                }
                None => {
                    let (universe, target) = TargetArgs { types, class, targets }.load()?;
                    commands::compile::execute(&universe, Input::Proxy(target), &mut out, &mut err)?;
                }
            }
        }
    }

    Ok(())
}
