use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, ValueEnum};
use std::path::{Path, PathBuf};

use crate::config::FilterConfig;
use crate::predicate::CombinationMode;
use crate::record::load_records;
use crate::session::{FilterSession, Layer};
use crate::sinks::{CsvSink, DataSink, GeoJsonSink, GeoJsonlSink};
use crate::utils::{display_to_pattern, pattern_to_display};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("filter").required(true).args(["query", "saved"])))]
pub struct Cli {
    /// Input records (.geojson, or one feature per line)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Layer name (default: input file stem)
    #[arg(short, long)]
    pub layer: Option<String>,

    /// Filter query, e.g. "nombre like 'C%' and poblacion > 1000"
    #[arg(short, long)]
    pub query: Option<String>,

    /// Name of a query from the config file
    #[arg(short, long)]
    pub saved: Option<String>,

    /// Query already active on the layer, applied before --query
    #[arg(short, long)]
    pub previous: Option<String>,

    /// How --query combines with --previous
    #[arg(short, long, value_enum)]
    pub mode: Option<CombinationMode>,

    /// Output file, or - for stdout
    #[arg(short, long, default_value = "-")]
    pub output: PathBuf,

    /// Output format (auto-detected if omitted)
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Number of threads (default: all cores)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Configuration file (YAML)
    #[arg(short, long, env = "FILTERSEARCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Take LIKE patterns as written (`.*` and `.`), without `%`/`_` translation
    #[arg(long)]
    pub raw_patterns: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum OutputFormat {
    #[value(name = "csv")]
    Csv,
    #[value(name = "geojson")]
    GeoJson,
    #[value(name = "geojsonl")]
    GeoJsonl,
}

pub fn output_format_label(format: &OutputFormat) -> &'static str {
    match format {
        OutputFormat::Csv => "csv",
        OutputFormat::GeoJson => "geojson",
        OutputFormat::GeoJsonl => "geojsonl",
    }
}

/// Explicit format, else the output extension; stdout defaults to CSV.
pub fn detect_format(format: Option<OutputFormat>, output: &Path) -> Result<OutputFormat> {
    if let Some(format) = format {
        return Ok(format);
    }
    if output == Path::new("-") {
        return Ok(OutputFormat::Csv);
    }
    output
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| match ext.to_lowercase().as_str() {
            "csv" => Some(OutputFormat::Csv),
            "geojson" | "json" => Some(OutputFormat::GeoJson),
            "geojsonl" | "jsonl" => Some(OutputFormat::GeoJsonl),
            _ => None,
        })
        .context("CLI: Could not detect output format from extension; use --format")
}

pub fn init_sink(format: &OutputFormat, output: &Path) -> Result<Box<dyn DataSink + Send>> {
    let to_stdout = output == Path::new("-");
    if to_stdout {
        tracing::info!("Sink: {} -> stdout", output_format_label(format));
    } else {
        tracing::info!("Sink: {} -> {:?}", output_format_label(format), output);
    }
    match format {
        OutputFormat::Csv if to_stdout => Ok(Box::new(CsvSink::stdout()?)),
        OutputFormat::Csv => Ok(Box::new(CsvSink::new(output)?)),
        OutputFormat::GeoJson if to_stdout => anyhow::bail!(
            "CLI: GeoJSON output to stdout is not supported; use geojsonl instead"
        ),
        OutputFormat::GeoJson => Ok(Box::new(GeoJsonSink::new(output)?)),
        OutputFormat::GeoJsonl if to_stdout => Ok(Box::new(GeoJsonlSink::stdout()?)),
        OutputFormat::GeoJsonl => Ok(Box::new(GeoJsonlSink::new(output)?)),
    }
}

fn layer_name(cli: &Cli) -> String {
    cli.layer
        .clone()
        .or_else(|| {
            cli.input
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "layer".to_string())
}

/// Load, filter and export. Returns the number of records written.
pub fn run(cli: &Cli) -> Result<usize> {
    let config = match &cli.config {
        Some(path) => FilterConfig::load(path)
            .with_context(|| format!("Config: Failed to load {:?}", path))?,
        None => FilterConfig::default(),
    };
    let translate = config.display_wildcards && !cli.raw_patterns;
    let to_pattern = |query: &str| {
        if translate {
            display_to_pattern(query)
        } else {
            query.to_string()
        }
    };

    let records = load_records(&cli.input)
        .with_context(|| format!("CLI: Failed to read records from {:?}", cli.input))?;
    let layer = layer_name(cli);

    let mut session = FilterSession::new();
    session.add_layer(Layer::new(layer.as_str(), records));
    if let Some(loaded) = session.layer(&layer) {
        tracing::info!(
            "Loaded {} records into layer '{}' (fields: {})",
            loaded.records().len(),
            loaded.name(),
            loaded.schema().iter().collect::<Vec<_>>().join(", ")
        );
    }

    if let Some(previous) = &cli.previous {
        session
            .apply(&layer, &to_pattern(previous), CombinationMode::Replace)
            .context("CLI: Previous query rejected")?;
    }

    let query = match (&cli.query, &cli.saved) {
        (Some(query), _) => query.as_str(),
        (None, Some(name)) => config
            .query(name)
            .with_context(|| format!("Config: No saved query named '{}'", name))?,
        (None, None) => anyhow::bail!("CLI: Either --query or --saved is required"),
    };
    let mode = cli.mode.unwrap_or(config.default_mode);
    session
        .apply(&layer, &to_pattern(query), mode)
        .context("CLI: Query rejected")?;

    if let Some(active) = session.active() {
        let shown = if translate {
            pattern_to_display(&active.query)
        } else {
            active.query.clone()
        };
        tracing::info!("Active filter on '{}': {}", active.layer, shown);
    }

    let matched = session.matching_records()?;
    if matched.is_empty() {
        anyhow::bail!("Export: no data to export");
    }

    let format = detect_format(cli.format, &cli.output)?;
    let mut sink = init_sink(&format, &cli.output)?;
    for record in &matched {
        sink.add_record(record)
            .context("Sink: Failed to write record")?;
    }
    sink.finish().context("Sink: Failed to finalize output")?;

    Ok(matched.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_format_from_extension() {
        let detect = |path: &str| detect_format(None, Path::new(path)).unwrap();
        assert_eq!(detect("out.csv"), OutputFormat::Csv);
        assert_eq!(detect("out.GeoJSON"), OutputFormat::GeoJson);
        assert_eq!(detect("out.geojsonl"), OutputFormat::GeoJsonl);
        assert_eq!(detect("out.jsonl"), OutputFormat::GeoJsonl);
        assert_eq!(detect("out.json"), OutputFormat::GeoJson);
        assert_eq!(detect("-"), OutputFormat::Csv);
        assert!(detect_format(None, Path::new("out.parquet")).is_err());
        assert_eq!(
            detect_format(Some(OutputFormat::GeoJson), Path::new("out.txt")).unwrap(),
            OutputFormat::GeoJson
        );
    }

    #[test]
    fn test_geojson_to_stdout_is_rejected() {
        assert!(init_sink(&OutputFormat::GeoJson, Path::new("-")).is_err());
    }

    #[test]
    fn test_layer_defaults_to_file_stem() {
        let cli = Cli::parse_from(["filtersearch", "-i", "data/provincias.geojson", "-q", "x = 1"]);
        assert_eq!(layer_name(&cli), "provincias");

        let cli = Cli::parse_from([
            "filtersearch",
            "-i",
            "data/provincias.geojson",
            "-q",
            "x = 1",
            "--layer",
            "andalucia",
        ]);
        assert_eq!(layer_name(&cli), "andalucia");
    }

    #[test]
    fn test_query_or_saved_is_required() {
        assert!(Cli::try_parse_from(["filtersearch", "-i", "a.geojson"]).is_err());
        assert!(
            Cli::try_parse_from(["filtersearch", "-i", "a.geojson", "-q", "x = 1", "-s", "costa"])
                .is_err()
        );
        let cli =
            Cli::try_parse_from(["filtersearch", "-i", "a.geojson", "-s", "costa", "-m", "and-not"])
                .unwrap();
        assert_eq!(cli.mode, Some(CombinationMode::AndNotPrevious));
    }
}
