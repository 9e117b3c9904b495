use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use quarry::QueryModel;

use super::RenderedQuery;
use crate::context::CliContext;
use crate::output::OutputManager;

pub const EXAMPLES: &str = "\
Examples:
  quarry render --input model.json                 # Use the configured backend
  quarry --backend solr render --input model.json  # Override the backend
  cat model.json | quarry --output json render --input -
";

#[derive(Args)]
pub struct RenderArgs {
    /// Path to a JSON query model, or `-` for stdin
    #[arg(long, short = 'i')]
    pub input: PathBuf,
}

pub fn handle_render(args: RenderArgs, context: &CliContext, output: &OutputManager) -> Result<()> {
    let json = if args.input.as_os_str() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer).context("Failed to read model from stdin")?;
        buffer
    } else {
        fs::read_to_string(&args.input).with_context(|| format!("Failed to read {}", args.input.display()))?
    };

    let model = QueryModel::from_json(&json)?;
    output.verbose(&format!("Rendering model for {}", context.backend()));

    let rendered = RenderedQuery::from_model(&model, &context.config);
    output.display(&rendered)
}
