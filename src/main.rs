use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use winecluster::config::{LoggingConfig, OutputFormat, WineClusterConfig};
use winecluster::{
    ClusterReport, Feature, FeatureVector, Locale, PipelineArtifact, PipelineError,
    QualityTable, RawSample, UnsetPolicy,
};

#[derive(Parser, Debug)]
#[command(
    name = "winecluster",
    version,
    about = "Assign wine samples to fitted quality clusters"
)]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Fitted artifact (JSON); overrides `artifact.path`
    #[arg(long, global = true)]
    artifact: Option<PathBuf>,
    /// Description language: id or en
    #[arg(long, global = true)]
    locale: Option<Locale>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Predict the cluster of one sample.
    #[command(allow_negative_numbers = true)]
    Predict {
        /// JSON file holding one sample; flags override its values
        #[arg(long)]
        input: Option<PathBuf>,
        #[command(flatten)]
        features: FeatureArgs,
        /// Output format: text or json
        #[arg(long)]
        format: Option<OutputFormat>,
        /// Accept 0 as a real measurement instead of "not filled in"
        #[arg(long)]
        allow_zero: bool,
    },

    /// Predict every sample in a JSON Lines file.
    Batch {
        /// One JSON sample per line
        #[arg(long)]
        input: PathBuf,
        /// Output format: text or json
        #[arg(long)]
        format: Option<OutputFormat>,
        /// Use the rayon thread pool
        #[arg(long)]
        parallel: bool,
        /// Accept 0 as a real measurement instead of "not filled in"
        #[arg(long)]
        allow_zero: bool,
    },

    /// Prompt for the eleven measurements and predict.
    Interactive {
        /// Accept 0 as a real measurement instead of "not filled in"
        #[arg(long)]
        allow_zero: bool,
    },

    /// Print a summary of the loaded artifact.
    Inspect {
        /// Output format: text or json
        #[arg(long)]
        format: Option<OutputFormat>,
    },
}

#[derive(Args, Debug, Default)]
struct FeatureArgs {
    #[arg(long)]
    fixed_acidity: Option<f64>,
    #[arg(long)]
    volatile_acidity: Option<f64>,
    #[arg(long)]
    citric_acid: Option<f64>,
    #[arg(long)]
    residual_sugar: Option<f64>,
    #[arg(long)]
    chlorides: Option<f64>,
    #[arg(long)]
    free_sulfur_dioxide: Option<f64>,
    #[arg(long)]
    total_sulfur_dioxide: Option<f64>,
    #[arg(long)]
    density: Option<f64>,
    #[arg(long)]
    ph: Option<f64>,
    #[arg(long)]
    sulphates: Option<f64>,
    #[arg(long)]
    alcohol: Option<f64>,
}

impl FeatureArgs {
    fn apply(&self, sample: &mut RawSample) {
        let flags = [
            (Feature::FixedAcidity, self.fixed_acidity),
            (Feature::VolatileAcidity, self.volatile_acidity),
            (Feature::CitricAcid, self.citric_acid),
            (Feature::ResidualSugar, self.residual_sugar),
            (Feature::Chlorides, self.chlorides),
            (Feature::FreeSulfurDioxide, self.free_sulfur_dioxide),
            (Feature::TotalSulfurDioxide, self.total_sulfur_dioxide),
            (Feature::Density, self.density),
            (Feature::Ph, self.ph),
            (Feature::Sulphates, self.sulphates),
            (Feature::Alcohol, self.alcohol),
        ];
        for (feature, value) in flags {
            if let Some(value) = value {
                sample.set(feature, value);
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => WineClusterConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => WineClusterConfig::default(),
    };
    if let Some(path) = &cli.artifact {
        config.artifact.path = path.clone();
    }
    if let Some(locale) = cli.locale {
        config.presenter.locale = locale;
    }

    init_tracing(&config.logging);

    let artifact = winecluster::load_artifact(&config.artifact.path, &config.load_options())
        .with_context(|| format!("loading artifact {}", config.artifact.path.display()))?;
    let table = QualityTable::for_locale(config.presenter.locale);

    match cli.command {
        Commands::Predict {
            input,
            features,
            format,
            allow_zero,
        } => {
            let format = format.unwrap_or(config.presenter.format);
            let policy = unset_policy(&config, allow_zero);
            cmd_predict(&artifact, &table, input.as_deref(), &features, format, policy)?;
        }
        Commands::Batch {
            input,
            format,
            parallel,
            allow_zero,
        } => {
            let format = format.unwrap_or(config.presenter.format);
            let parallel = parallel || config.batch.parallel;
            let policy = unset_policy(&config, allow_zero);
            cmd_batch(
                &artifact,
                &table,
                &input,
                format,
                parallel,
                policy,
                io::stdout().lock(),
            )?;
        }
        Commands::Interactive { allow_zero } => {
            let policy = unset_policy(&config, allow_zero);
            let stdin = io::stdin();
            let stdout = io::stdout();
            cmd_interactive(&artifact, &table, policy, stdin.lock(), stdout.lock())?;
        }
        Commands::Inspect { format } => {
            let format = format.unwrap_or(config.presenter.format);
            cmd_inspect(&artifact, format)?;
        }
    }

    Ok(())
}

fn init_tracing(cfg: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.level.as_str()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);
    if cfg.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn unset_policy(config: &WineClusterConfig, allow_zero: bool) -> UnsetPolicy {
    if allow_zero {
        UnsetPolicy::ExplicitPresence
    } else {
        config.unset_policy()
    }
}

fn cmd_predict(
    artifact: &PipelineArtifact,
    table: &QualityTable,
    input: Option<&Path>,
    features: &FeatureArgs,
    format: OutputFormat,
    policy: UnsetPolicy,
) -> anyhow::Result<()> {
    let mut sample = match input {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading sample {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing sample {}", path.display()))?
        }
        None => RawSample::new(),
    };
    features.apply(&mut sample);

    match winecluster::predict_sample(&sample, policy, artifact) {
        Ok(prediction) => {
            let report = ClusterReport::new(&prediction, table);
            print_report(&report, table, format)
        }
        Err(PipelineError::IncompleteInput(missing)) => {
            eprintln!("{}", table.incomplete_warning());
            bail!("missing: {}", feature_list(&missing))
        }
        Err(err) => Err(err.into()),
    }
}

fn print_report(
    report: &ClusterReport,
    table: &QualityTable,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => println!("{}", report.render_text(table)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct BatchLine {
    line: usize,
    #[serde(flatten)]
    report: Option<ClusterReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn cmd_batch(
    artifact: &PipelineArtifact,
    table: &QualityTable,
    input: &Path,
    format: OutputFormat,
    parallel: bool,
    policy: UnsetPolicy,
    mut out: impl Write,
) -> anyhow::Result<()> {
    let file = File::open(input).with_context(|| format!("opening {}", input.display()))?;
    let mut reader = BufReader::new(file);

    // Lines that fail to decode, parse or collect keep their slot so output stays in input order.
    let mut slots: Vec<(usize, Result<FeatureVector, String>)> = Vec::new();
    let mut buf = Vec::new();
    let mut line_no = 0usize;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_no += 1;
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim_end_matches(['\n', '\r']),
            Err(err) => {
                slots.push((line_no, Err(format!("invalid UTF-8: {err}"))));
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let collected = serde_json::from_str::<RawSample>(line)
            .map_err(|err| format!("invalid JSON: {err}"))
            .and_then(|raw| winecluster::collect(&raw, policy).map_err(|err| err.to_string()));
        slots.push((line_no, collected));
    }

    let vectors: Vec<FeatureVector> = slots
        .iter()
        .filter_map(|(_, slot)| slot.as_ref().ok().copied())
        .collect();
    let mut predictions = winecluster::predict_batch(&vectors, artifact, parallel).into_iter();

    let mut failed = 0usize;
    for (line, slot) in slots.iter() {
        let outcome = match slot {
            Ok(_) => match predictions.next() {
                Some(Ok(prediction)) => Ok(ClusterReport::new(&prediction, table)),
                Some(Err(err)) => Err(err.to_string()),
                None => Err("prediction missing".to_string()),
            },
            Err(msg) => Err(msg.clone()),
        };
        if outcome.is_err() {
            failed += 1;
        }
        write_batch_line(&mut out, *line, outcome, format)?;
    }

    info!(lines = slots.len(), failed, parallel, "batch_complete");
    if failed > 0 {
        warn!(failed, "batch_lines_rejected");
    }
    Ok(())
}

fn write_batch_line(
    out: &mut impl Write,
    line: usize,
    outcome: Result<ClusterReport, String>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => match outcome {
            Ok(report) => writeln!(
                out,
                "line {line}: Cluster {} - {}",
                report.label, report.headline
            )?,
            Err(msg) => writeln!(out, "line {line}: error: {msg}")?,
        },
        OutputFormat::Json => {
            let (report, error) = match outcome {
                Ok(report) => (Some(report), None),
                Err(msg) => (None, Some(msg)),
            };
            let record = BatchLine {
                line,
                report,
                error,
            };
            writeln!(out, "{}", serde_json::to_string(&record)?)?;
        }
    }
    Ok(())
}

fn cmd_interactive(
    artifact: &PipelineArtifact,
    table: &QualityTable,
    policy: UnsetPolicy,
    mut input: impl BufRead,
    mut out: impl Write,
) -> anyhow::Result<()> {
    writeln!(out, "{}", table.title())?;
    writeln!(out, "Leave a field blank to skip it. Ctrl-D exits.")?;

    let mut sample = RawSample::new();
    let mut pending: Vec<Feature> = Feature::ALL.to_vec();
    loop {
        for feature in pending.iter().copied() {
            match prompt_value(&mut input, &mut out, feature)? {
                Some(Some(value)) => sample.set(feature, value),
                Some(None) => sample.clear(feature),
                None => return Ok(()),
            }
        }

        match winecluster::predict_sample(&sample, policy, artifact) {
            Ok(prediction) => {
                let report = ClusterReport::new(&prediction, table);
                writeln!(out, "\n{}\n", report.render_text(table))?;
            }
            Err(PipelineError::IncompleteInput(missing)) => {
                writeln!(out, "{}", table.incomplete_warning())?;
                pending = missing;
                continue;
            }
            Err(err) if err.is_recoverable() => {
                writeln!(out, "{err}")?;
                pending = Feature::ALL.to_vec();
                continue;
            }
            Err(err) => return Err(err.into()),
        }

        write!(out, "Analyze another wine? [y/N] ")?;
        out.flush()?;
        let mut answer = String::new();
        if input.read_line(&mut answer)? == 0 || !answer.trim().eq_ignore_ascii_case("y") {
            return Ok(());
        }
        sample = RawSample::new();
        pending = Feature::ALL.to_vec();
    }
}

/// `None` on end of input, `Some(None)` for a blank answer.
fn prompt_value(
    input: &mut impl BufRead,
    out: &mut impl Write,
    feature: Feature,
) -> io::Result<Option<Option<f64>>> {
    loop {
        write!(out, "{}: ", feature.label())?;
        out.flush()?;

        let mut buf = String::new();
        if input.read_line(&mut buf)? == 0 {
            return Ok(None);
        }
        let answer = buf.trim();
        if answer.is_empty() {
            return Ok(Some(None));
        }
        match answer.replace(',', ".").parse::<f64>() {
            Ok(value) => return Ok(Some(Some(value))),
            Err(_) => writeln!(out, "  '{answer}' is not a number")?,
        }
    }
}

fn cmd_inspect(artifact: &PipelineArtifact, format: OutputFormat) -> anyhow::Result<()> {
    let summary = artifact.summary();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => {
            println!("format version: {}", summary.format_version);
            println!("scaler:         {}", summary.scaler);
            println!("clusters:       {}", summary.n_clusters);
            println!("features:");
            for name in &summary.feature_names {
                let marker = if artifact.is_log_transformed(name) {
                    " (log1p)"
                } else {
                    ""
                };
                println!("  - {name}{marker}");
            }
        }
    }
    Ok(())
}

fn feature_list(features: &[Feature]) -> String {
    features
        .iter()
        .map(|f| f.label())
        .collect::<Vec<_>>()
        .join(", ")
}
