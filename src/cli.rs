/*!
chartspec Command Line Interface

Compiles chart queries against JSON row files into standalone Vega-Lite documents.
*/

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

use chartspec::data::values_to_dataframe;
use chartspec::plot::{AggregateOp, PolarsAggregator};
use chartspec::{ChartRequest, CompileOptions, DataFrame, FieldMeta, Query, VegaLiteWriter, VERSION};

#[derive(Parser)]
#[command(name = "chartspec")]
#[command(about = "Compile analytic chart queries into Vega-Lite specifications")]
#[command(version = VERSION)]
pub struct Cli {
    /// Log compilation decisions to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a query into a Vega-Lite specification with inline data
    Compile {
        #[command(flatten)]
        input: InputArgs,

        /// Pretty-print the specification
        #[arg(long)]
        pretty: bool,

        /// Output file path
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show the mark family selected for a query
    Geometry {
        #[command(flatten)]
        input: InputArgs,
    },
}

#[derive(Args)]
pub struct InputArgs {
    /// JSON file holding the query
    #[arg(long)]
    query: PathBuf,

    /// JSON file holding the field metadata records
    #[arg(long)]
    fields: PathBuf,

    /// JSON file holding the rows, as an array of objects
    #[arg(long)]
    data: PathBuf,

    /// JSON file holding compile options
    #[arg(long)]
    config: Option<PathBuf>,

    /// Aggregation operator (sum, mean, count)
    #[arg(long)]
    aggregator: Option<String>,

    /// Display raw rows instead of aggregating
    #[arg(long)]
    no_aggregate: bool,

    /// Overlap quantitative marks instead of stacking them
    #[arg(long)]
    no_stack: bool,

    /// Attach pan/zoom to the axis scales
    #[arg(long)]
    zoom: bool,
}

impl InputArgs {
    /// Config file options with explicit flags applied on top
    fn options(&self) -> anyhow::Result<CompileOptions> {
        let mut options: CompileOptions = match &self.config {
            Some(path) => read_json(path)?,
            None => CompileOptions::default(),
        };
        if let Some(op) = &self.aggregator {
            options.aggregator = op.parse::<AggregateOp>()?;
        }
        if self.no_aggregate {
            options.default_aggregated = Some(false);
        }
        if self.no_stack {
            options.default_stack = false;
        }
        if self.zoom {
            options.zoom = true;
        }
        options.inline_data = true;
        Ok(options)
    }

    fn load(&self) -> anyhow::Result<(ChartRequest, DataFrame)> {
        let query: Query = read_json(&self.query)?;
        let fields: Vec<FieldMeta> = read_json(&self.fields)?;
        let rows: Vec<serde_json::Value> = read_json(&self.data)?;
        let table = values_to_dataframe(&rows)?;
        Ok((ChartRequest::new(query, fields), table))
    }

    /// Writer plus the table the chart displays
    fn prepare(&self) -> anyhow::Result<(VegaLiteWriter, ChartRequest, DataFrame)> {
        let writer = VegaLiteWriter::with_options(self.options()?);
        let (request, rows) = self.load()?;
        let table = writer.prepare_table(&PolarsAggregator::new(), &request, &rows)?;
        Ok((writer, request, table))
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    match cli.command {
        Commands::Compile {
            input,
            pretty,
            output,
        } => {
            let (writer, request, table) = input.prepare()?;
            let spec = writer.compile(&request, &table)?;
            if !spec.has_mark() {
                anyhow::bail!("Query has no renderable channel");
            }
            let json = spec.to_json_string(pretty)?;
            match output {
                Some(path) => std::fs::write(&path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{}", json),
            }
        }

        Commands::Geometry { input } => {
            let (writer, request, table) = input.prepare()?;
            match writer.effective_geometry(&request, &table)? {
                Some(geometry) => println!("{}", geometry.mark_type()),
                None => anyhow::bail!("Query requests no geometry"),
            }
        }
    }

    Ok(())
}
