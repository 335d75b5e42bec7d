use clap::{Parser, Subcommand};
use colored::Colorize;
use culpa::adjust::{self, ProbeBoost};
use culpa::causal::{CauseProbe, CauseTree};
use culpa::cli;
use culpa::config::{CulpaConfig, CONFIG_FILENAME};
use culpa::element::Granularity;
use culpa::ranking::Ranking;
use culpa::replay::SessionBundle;
use culpa::report::{LocalizationReport, ReportFormat};
use culpa::spectrum::{CoverageReport, SbflFormula, SpectrumData};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "culpa")]
#[command(version, about = "Spectrum-based fault localization with causal probing", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default culpa.toml to the current directory
    Init {
        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },
    /// Rank program elements by suspiciousness from a coverage report
    Rank {
        /// Coverage report (JSON)
        coverage: PathBuf,

        /// Suspiciousness formula
        #[arg(long)]
        formula: Option<FormulaArg>,

        /// Element granularity
        #[arg(long)]
        granularity: Option<GranularityArg>,

        /// Number of entries to show
        #[arg(long)]
        top: Option<usize>,

        /// Report format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Write the report here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Save the ranking itself for later adjustment
        #[arg(long)]
        save: Option<PathBuf>,

        /// Print rank and score of one element (Class#method():line)
        #[arg(long)]
        show: Option<String>,
    },
    /// Build a cause tree for a failing value from a recorded session
    Probe {
        /// Recorded session bundle (JSON)
        bundle: PathBuf,

        /// Failing test (TestClass#testMethod)
        #[arg(long)]
        test: String,

        /// Class holding the suspicious variable
        #[arg(long)]
        class: String,

        /// Enclosing method, required for local variables
        #[arg(long)]
        method: Option<String>,

        /// Variable name
        #[arg(long)]
        name: String,

        /// Observed wrong value
        #[arg(long, allow_hyphen_values = true)]
        value: String,

        /// Treat the variable as a field
        #[arg(long)]
        field: bool,

        /// Array slot the value was read from
        #[arg(long)]
        array_index: Option<u32>,

        /// Per-lookup trace timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Save the cause tree (JSON)
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Rework a saved ranking with developer feedback or a cause tree
    Adjust {
        /// Saved ranking (JSON)
        ranking: PathBuf,

        /// Remove the element at this position (0-based)
        #[arg(long)]
        remove: Option<usize>,

        /// Mark the element at this position as suspicious (0-based)
        #[arg(long)]
        mark: Option<usize>,

        /// Neighborhood factor for --remove
        #[arg(long)]
        remove_const: Option<f64>,

        /// Neighborhood factor for --mark
        #[arg(long)]
        susp_const: Option<f64>,

        /// Boost elements implicated by this cause tree (JSON)
        #[arg(long)]
        apply_tree: Option<PathBuf>,

        /// Depth decay base for --apply-tree
        #[arg(long)]
        base_factor: Option<f64>,

        /// Write the adjusted ranking here instead of in place
        #[arg(long)]
        output: Option<PathBuf>,

        /// Number of entries to show
        #[arg(long)]
        top: Option<usize>,
    },
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum FormulaArg {
    /// Tarantula (failed-ratio share)
    Tarantula,
    /// Ochiai similarity coefficient
    Ochiai,
    /// Jaccard similarity coefficient
    Jaccard,
    /// AMPLE ratio difference
    Ample,
}

impl From<FormulaArg> for SbflFormula {
    fn from(arg: FormulaArg) -> Self {
        match arg {
            FormulaArg::Tarantula => SbflFormula::Tarantula,
            FormulaArg::Ochiai => SbflFormula::Ochiai,
            FormulaArg::Jaccard => SbflFormula::Jaccard,
            FormulaArg::Ample => SbflFormula::Ample,
        }
    }
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum GranularityArg {
    /// Whole classes
    Class,
    /// Methods
    Method,
    /// Individual lines
    Line,
}

impl From<GranularityArg> for Granularity {
    fn from(arg: GranularityArg) -> Self {
        match arg {
            GranularityArg::Class => Granularity::Class,
            GranularityArg::Method => Granularity::Method,
            GranularityArg::Line => Granularity::Line,
        }
    }
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum OutputFormat {
    /// Plain text
    Text,
    /// Markdown report
    Markdown,
    /// JSON data
    Json,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter_layer = if cli.debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else if cli.verbose {
        tracing_subscriber::EnvFilter::new("info")
    } else {
        tracing_subscriber::EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Culpa v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Init { force } => {
            info!("Initializing culpa configuration");
            cmd_init(force)?;
        }
        Commands::Rank {
            coverage,
            formula,
            granularity,
            top,
            format,
            output,
            save,
            show,
        } => {
            info!("Ranking elements from {:?}", coverage);
            cmd_rank(coverage, formula, granularity, top, format, output, save, show)?;
        }
        Commands::Probe {
            bundle,
            test,
            class,
            method,
            name,
            value,
            field,
            array_index,
            timeout_secs,
            save,
        } => {
            info!("Probing cause of {} in {}", name, test);
            cmd_probe(
                bundle,
                test,
                class,
                method,
                name,
                value,
                field,
                array_index,
                timeout_secs,
                save,
            )?;
        }
        Commands::Adjust {
            ranking,
            remove,
            mark,
            remove_const,
            susp_const,
            apply_tree,
            base_factor,
            output,
            top,
        } => {
            info!("Adjusting ranking {:?}", ranking);
            cmd_adjust(
                ranking,
                remove,
                mark,
                remove_const,
                susp_const,
                apply_tree,
                base_factor,
                output,
                top,
            )?;
        }
    }

    Ok(())
}

fn cmd_init(force: bool) -> anyhow::Result<()> {
    println!(
        "{}",
        "🔍 Initializing culpa configuration...".bright_cyan().bold()
    );
    println!();

    let config_path = PathBuf::from(CONFIG_FILENAME);
    if config_path.exists() && !force {
        println!(
            "{}  {:?} already exists (use --force to overwrite)",
            "⚠️".yellow(),
            config_path
        );
        println!();
        return Ok(());
    }

    let config = CulpaConfig::default();
    config.save(&config_path)?;

    println!(
        "{} Created configuration: {:?}",
        "✓".bright_green(),
        config_path
    );
    println!();

    println!("{}", "📋 Defaults".bright_yellow().bold());
    println!("{}", "=".repeat(50));
    println!(
        "{}: {}",
        "Formula".bold(),
        config.ranking.formula.to_string().cyan()
    );
    println!(
        "{}: {}",
        "Granularity".bold(),
        config.ranking.granularity.to_string().cyan()
    );
    println!("{}: {}", "Top".bold(), config.ranking.top);
    println!();

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_rank(
    coverage: PathBuf,
    formula: Option<FormulaArg>,
    granularity: Option<GranularityArg>,
    top: Option<usize>,
    format: OutputFormat,
    output: Option<PathBuf>,
    save: Option<PathBuf>,
    show: Option<String>,
) -> anyhow::Result<()> {
    println!(
        "{}",
        "🔍 Ranking suspicious elements...".bright_cyan().bold()
    );
    println!();

    let config = CulpaConfig::load_optional()?.unwrap_or_default();
    let settings = cli::resolve_rank_settings(
        &config,
        formula.map(Into::into),
        granularity.map(Into::into),
        top,
    );

    let coverage_report = CoverageReport::load(&coverage)?;
    println!(
        "{} Loaded {} test executions from {:?}",
        "✓".bright_green(),
        coverage_report.executions().len(),
        coverage
    );

    let spectrum = SpectrumData::from_executions(coverage_report.executions(), settings.granularity);
    let ranking = Ranking::build(&spectrum, settings.formula);
    println!(
        "{} Ranked {} elements ({} passing, {} failing tests)",
        "✓".bright_green(),
        ranking.len(),
        spectrum.total_passed(),
        spectrum.total_failed()
    );
    println!();

    if let Some(spec) = show {
        let (rank, score) = cli::rank_query(&ranking, &spec)?;
        println!(
            "{}: rank {}, score {:.4}",
            spec.cyan(),
            format!("{rank:.1}").bold(),
            score
        );
        println!();
    }

    if let Some(path) = &save {
        ranking.save(path)?;
        println!("{} Saved ranking: {:?}", "✓".bright_green(), path);
        println!();
    }

    let project_name = coverage
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();
    let report = LocalizationReport::new(project_name, ranking);

    let report_format = match format {
        OutputFormat::Text => ReportFormat::Text,
        OutputFormat::Markdown => ReportFormat::Markdown,
        OutputFormat::Json => ReportFormat::Json,
    };

    match output {
        Some(path) => {
            report.save(&path, report_format, settings.top)?;
            println!("{} Wrote report: {:?}", "✓".bright_green(), path);
            println!();
        }
        None => {
            let rendered = match report_format {
                ReportFormat::Text => report.to_text(settings.top),
                ReportFormat::Markdown => report.to_markdown(settings.top),
                ReportFormat::Json => report.to_json()?,
            };
            println!("{rendered}");
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_probe(
    bundle: PathBuf,
    test: String,
    class: String,
    method: Option<String>,
    name: String,
    value: String,
    field: bool,
    array_index: Option<u32>,
    timeout_secs: Option<u64>,
    save: Option<PathBuf>,
) -> anyhow::Result<()> {
    println!(
        "{}",
        "🔍 Probing cause of failing value...".bright_cyan().bold()
    );
    println!();

    let config = CulpaConfig::load_optional()?.unwrap_or_default();
    let timeout = match timeout_secs {
        Some(secs) => Duration::from_secs(secs),
        None => config.probe.trace_timeout(),
    };

    let session = SessionBundle::load(&bundle)?;
    println!(
        "{} Loaded session for {}",
        "✓".bright_green(),
        session.test.cyan()
    );

    let seed = cli::seed_from_args(
        &test,
        &class,
        method.as_deref(),
        &name,
        &value,
        field,
        array_index,
    )
    .map_err(|message| anyhow::anyhow!(message))?;
    println!("{} Seed: {}", "✓".bright_green(), seed);
    println!();

    let probe = CauseProbe::new(&session, &session, &session, timeout);
    let tree = probe.run(&seed)?;

    println!(
        "{} Explained {} expressions",
        "✓".bright_green(),
        tree.expression_count()
    );
    println!();

    println!("{}", "🌳 Cause Tree".bright_yellow().bold());
    println!("{}", "=".repeat(50));
    println!("{}", tree.render());

    if let Some(path) = save {
        tree.save(&path)?;
        println!("{} Saved cause tree: {:?}", "✓".bright_green(), path);
        println!();
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_adjust(
    ranking_path: PathBuf,
    remove: Option<usize>,
    mark: Option<usize>,
    remove_const: Option<f64>,
    susp_const: Option<f64>,
    apply_tree: Option<PathBuf>,
    base_factor: Option<f64>,
    output: Option<PathBuf>,
    top: Option<usize>,
) -> anyhow::Result<()> {
    println!("{}", "🔧 Adjusting ranking...".bright_cyan().bold());
    println!();

    let config = CulpaConfig::load_optional()?.unwrap_or_default();
    let mut ranking = Ranking::load(&ranking_path)?;
    println!(
        "{} Loaded ranking with {} elements",
        "✓".bright_green(),
        ranking.len()
    );

    if let Some(index) = remove {
        let factor = remove_const.unwrap_or(config.adjust.remove_const);
        adjust::remove(&mut ranking, index, factor)?;
        println!(
            "{} Removed position {} (neighborhood x{})",
            "✓".bright_green(),
            index,
            factor
        );
    }

    if let Some(index) = mark {
        let factor = susp_const.unwrap_or(config.adjust.susp_const);
        adjust::mark_suspicious(&mut ranking, index, factor)?;
        println!(
            "{} Marked position {} (neighborhood x{})",
            "✓".bright_green(),
            index,
            factor
        );
    }

    if let Some(path) = apply_tree {
        let tree = CauseTree::load(&path)?;
        let boost = ProbeBoost::new(base_factor.unwrap_or(config.probe.base_factor))?;
        boost.apply(&tree, &mut ranking);
        println!(
            "{} Applied cause tree from {:?}",
            "✓".bright_green(),
            path
        );
    }

    let destination = output.unwrap_or(ranking_path);
    ranking.save(&destination)?;
    println!(
        "{} Saved adjusted ranking: {:?}",
        "✓".bright_green(),
        destination
    );
    println!();

    let display_top = top.unwrap_or(config.ranking.top);
    println!("{}", "📋 Top Elements".bright_yellow().bold());
    println!("{}", "=".repeat(50));
    for (index, entry) in ranking.top_n(display_top).iter().enumerate() {
        println!("  {:>3}. {:>8.4}  {}", index + 1, entry.score, entry.element);
    }
    println!();

    Ok(())
}
