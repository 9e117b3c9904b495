mod commands;
mod context;
mod output;
mod theme;

use anyhow::Result;
use clap::{Parser, Subcommand};
use quarry::Backend;
use std::path::PathBuf;

use commands::{
    render::{self, handle_render, RenderArgs},
    request::{self, handle_request, RequestArgs},
};
use context::CliContext;
use output::{GlobalOptions, OutputFormat, OutputManager};

const ENVIRONMENT_VARIABLES: &str = "\
Environment Variables:
  QUARRY_CONFIG  Path to the quarry.toml configuration file
  RUST_LOG       Log filter, e.g. quarry=debug

Tip: Use 'quarry <command> --help' to view examples for each command.
";

#[derive(Parser)]
#[command(name = "quarry")]
#[command(version = "0.1.0")]
#[command(
    about = "Build search queries once, render them for Azure Cognitive Search or Solr",
    long_about = r#"Query rendering CLI for quarry that provides:

• Rendering of saved JSON query models for either backend
• Translation of request-style parameters (q, filter, sort_by) into queries
• Backend settings loaded from quarry.toml
"#
)]
#[command(after_long_help = ENVIRONMENT_VARIABLES)]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    output: OutputFormat,

    /// Suppress output (only errors will be shown)
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Enable verbose output
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Path to quarry.toml (defaults to ./quarry.toml when present)
    #[arg(long, env = "QUARRY_CONFIG")]
    config: Option<PathBuf>,

    /// Target backend, overriding the config file (azure or solr)
    #[arg(long)]
    backend: Option<Backend>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a JSON query model for the selected backend
    #[command(after_long_help = render::EXAMPLES)]
    Render(RenderArgs),

    /// Build a query from request parameters and render it
    #[command(after_long_help = request::EXAMPLES)]
    Request(RequestArgs),
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let global_options = GlobalOptions {
        output_format: cli.output.clone(),
        quiet: cli.quiet,
        verbose: cli.verbose,
        no_color: cli.no_color,
    };
    let output = OutputManager::new(global_options);

    if let Err(err) = execute(cli, &output) {
        output.error(&format!("{err:#}"));
        std::process::exit(1);
    }
}

fn execute(cli: Cli, output: &OutputManager) -> Result<()> {
    let context = CliContext::load(cli.config.as_deref(), cli.backend)?;
    match &context.config_path {
        Some(path) => output.verbose(&format!("Using config {}", path.display())),
        None => output.verbose("No config file found; using defaults"),
    }

    match cli.command {
        Commands::Render(args) => handle_render(args, &context, output)?,
        Commands::Request(args) => handle_request(args, &context, output)?,
    }

    Ok(())
}
