pub mod charts;
pub mod clean;
pub mod cli;
pub mod data;
pub mod filters;
pub mod insight;
pub mod io_utils;
pub mod kpi;
pub mod layout;
pub mod pipeline;
pub mod profile;
pub mod stats;
pub mod table;

use std::{
    env,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    sync::OnceLock,
};

use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, info};
use serde::Serialize;

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("autodash", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Probe(args) => handle_probe(&args),
        Commands::Clean(args) => handle_clean(&args),
        Commands::Filters(args) => handle_filters(&args),
        Commands::Dashboard(args) => handle_dashboard(&args),
    }
}

fn handle_probe(args: &cli::ProbeArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    info!(
        "Probing '{}' with delimiter '{}'",
        args.input.display(),
        printable_delimiter(delimiter)
    );
    let dataset = io_utils::read_dataset(&args.input, delimiter)
        .with_context(|| format!("Loading {:?}", args.input))?;
    let index = profile::ColumnIndex::build(&dataset);

    let headers = vec![
        "column".to_string(),
        "kind".to_string(),
        "present".to_string(),
        "distinct".to_string(),
    ];
    let rows: Vec<Vec<String>> = index
        .profiles()
        .iter()
        .enumerate()
        .map(|(idx, profile)| {
            let present = dataset.column_values(idx).flatten().count();
            let distinct = dataset
                .column_values(idx)
                .flatten()
                .map(data::Value::as_display)
                .collect::<std::collections::HashSet<_>>()
                .len();
            vec![
                profile.name.clone(),
                profile.kind.to_string(),
                present.to_string(),
                distinct.to_string(),
            ]
        })
        .collect();
    table::print_table(&headers, &rows);
    info!(
        "Profiled {} column(s) over {} row(s)",
        dataset.column_count(),
        dataset.row_count()
    );
    Ok(())
}

fn handle_clean(args: &cli::CleanArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let dataset = io_utils::read_dataset(&args.input, delimiter)
        .with_context(|| format!("Loading {:?}", args.input))?;
    let rows_before = dataset.row_count();
    let cleaned = clean::clean(&dataset);
    let out_delimiter = io_utils::resolve_output_delimiter(
        args.output.as_deref(),
        args.output_delimiter,
        delimiter,
    );
    io_utils::write_dataset(&cleaned.dataset, args.output.as_deref(), out_delimiter)
        .context("Writing cleaned dataset")?;
    info!(
        "Cleaned {} row(s) down to {}",
        rows_before,
        cleaned.dataset.row_count()
    );
    Ok(())
}

fn handle_filters(args: &cli::FiltersArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let dataset = io_utils::read_dataset(&args.input, delimiter)
        .with_context(|| format!("Loading {:?}", args.input))?;
    let cleaned = clean::clean(&dataset);
    let filters = filters::synthesize_filters(&cleaned.dataset, &cleaned.index);
    write_json(args.output.as_deref(), &filters, args.pretty)?;
    info!(
        "Synthesized {} filter(s) for {} column(s)",
        filters.len(),
        cleaned.dataset.column_count()
    );
    Ok(())
}

fn handle_dashboard(args: &cli::DashboardArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let dataset = io_utils::read_dataset(&args.input, delimiter)
        .with_context(|| format!("Loading {:?}", args.input))?;
    let payload = match &args.filter_state {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("Opening filter state {path:?}"))?;
            Some(
                serde_json::from_reader(file)
                    .with_context(|| format!("Parsing filter state {path:?}"))?,
            )
        }
        None => None,
    };
    let dashboard = pipeline::generate_dashboard(&dataset, payload.as_ref());
    write_json(args.output.as_deref(), &dashboard, args.pretty)?;
    Ok(())
}

fn write_json<T: Serialize>(path: Option<&Path>, value: &T, pretty: bool) -> Result<()> {
    let mut writer: Box<dyn Write> = match path {
        Some(p) if !io_utils::is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(std::io::stdout()),
    };
    if pretty {
        serde_json::to_writer_pretty(&mut writer, value).context("Serializing JSON output")?;
    } else {
        serde_json::to_writer(&mut writer, value).context("Serializing JSON output")?;
    }
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
