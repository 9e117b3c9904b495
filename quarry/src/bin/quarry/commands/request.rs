use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use quarry::{SearchRequest, SearchSchema, SortOrder};

use super::RenderedQuery;
use crate::context::CliContext;
use crate::output::OutputManager;

pub const EXAMPLES: &str = "\
Examples:
  quarry request --schema schema.json --q \"dragon riders\"
  quarry request --schema schema.json --filter 'status:eq:active|pending'
  quarry request --schema schema.json --filter 'price:range:10,*' --sort-by price --sort-order desc
";

#[derive(Args)]
pub struct RequestArgs {
    /// Free-text query, split on whitespace
    #[arg(long)]
    pub q: Option<String>,

    /// Filter as field:operator:value (repeatable)
    #[arg(long = "filter", short = 'f')]
    pub filters: Vec<String>,

    /// Sort name declared in the schema
    #[arg(long)]
    pub sort_by: Option<String>,

    #[arg(long, value_parser = parse_sort_order)]
    pub sort_order: Option<SortOrder>,

    /// Path to a JSON search schema; without it no field is searchable
    #[arg(long, short = 's')]
    pub schema: Option<PathBuf>,

    /// Print the intermediate query model instead of rendering it
    #[arg(long)]
    pub model_only: bool,
}

fn parse_sort_order(raw: &str) -> Result<SortOrder, String> {
    match raw.to_ascii_lowercase().as_str() {
        "asc" => Ok(SortOrder::Asc),
        "desc" => Ok(SortOrder::Desc),
        other => Err(format!("expected asc or desc, got {other}")),
    }
}

pub fn handle_request(args: RequestArgs, context: &CliContext, output: &OutputManager) -> Result<()> {
    let schema = match &args.schema {
        Some(path) => {
            let json = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
            SearchSchema::from_json(&json)?
        }
        None => {
            output.warning("No --schema given; the request cannot reference any field");
            SearchSchema::default()
        }
    };

    let request = SearchRequest {
        q: args.q,
        sort_by: args.sort_by,
        sort_order: args.sort_order,
        filter: args.filters,
    };

    let builder = request.into_builder(&schema, context.config.query_builder())?;
    let model = builder.build();

    if args.model_only {
        println!("{}", model.to_json()?);
        return Ok(());
    }

    let rendered = RenderedQuery::from_model(&model, &context.config);
    output.display(&rendered)?;
    output.success(&format!("Rendered for {}", context.backend()));
    Ok(())
}
