use std::process::ExitCode;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use plant_harvest::app::{HarvestReport, Harvester};
use plant_harvest::chromium::ChromiumLauncher;
use plant_harvest::config::{Config, ConfigLoader, SubjectEntry};
use plant_harvest::error::HarvestError;
use plant_harvest::fetch::HttpImageFetcher;
use plant_harvest::output::{ConsoleOutput, JsonOutput, OutputMode};
use plant_harvest::query;

#[derive(Parser)]
#[command(name = "plant-harvest")]
#[command(about = "Harvest plant disease images from web image search into a labelled dataset")]
#[command(version, author)]
struct Cli {
    /// JSON config file (defaults to ./plant-harvest.json when present)
    #[arg(long)]
    config: Option<String>,

    /// Subject and categories, e.g. "Tomato: Leaf Spot, Early Blight". Repeatable.
    #[arg(long = "subject", value_name = "SUBJECT: CATEGORY, ...")]
    subjects: Vec<String>,

    /// Images to download per category
    #[arg(long)]
    count: Option<u64>,

    /// Destination root folder
    #[arg(long)]
    output: Option<String>,

    /// Provenance CSV path
    #[arg(long)]
    ledger: Option<String>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Print a JSON report instead of progress lines and a summary
    #[arg(long)]
    non_interactive: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<HarvestError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &HarvestError) -> u8 {
    match error {
        HarvestError::MissingConfig
        | HarvestError::ConfigRead(_)
        | HarvestError::ConfigParse(_)
        | HarvestError::InvalidSubject(_)
        | HarvestError::InvalidTargetCount(_)
        | HarvestError::InvalidEndpoint(_) => 2,
        HarvestError::BrowserLaunch(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let config = load_config(&cli)?;
    let resolved = ConfigLoader::resolve_config(apply_overrides(config, &cli))?;
    let queries = query::expand(&resolved.subjects);

    let launcher = ChromiumLauncher::new(&resolved.search)?;
    let fetcher = HttpImageFetcher::new(&resolved.fetch)?;
    let harvester = Harvester::from_config(&resolved, launcher, fetcher);

    match output_mode {
        OutputMode::NonInteractive => {
            let report = harvester.run(&queries, &JsonOutput)?;
            JsonOutput::print_report(&report).into_diagnostic()?;
        }
        OutputMode::Interactive => {
            let report = harvester.run(&queries, &ConsoleOutput)?;
            print_summary(&report);
        }
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config, HarvestError> {
    match ConfigLoader::load(cli.config.as_deref()) {
        Ok(config) => Ok(config),
        Err(HarvestError::MissingConfig) if !cli.subjects.is_empty() => Ok(Config::default()),
        Err(err) => Err(err),
    }
}

fn apply_overrides(mut config: Config, cli: &Cli) -> Config {
    if !cli.subjects.is_empty() {
        config.subjects = cli
            .subjects
            .iter()
            .cloned()
            .map(SubjectEntry::Shorthand)
            .collect();
    }
    if let Some(count) = cli.count {
        config.images_per_category = Some(count);
    }
    if let Some(output) = &cli.output {
        config.output_root = Some(output.clone());
    }
    if let Some(ledger) = &cli.ledger {
        config.ledger_path = Some(ledger.clone());
    }
    if cli.headed {
        config.search.headless = false;
    }
    config
}

fn print_summary(report: &HarvestReport) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let red = "\x1b[31m";
    let reset = "\x1b[0m";

    println!("{cyan}plant-harvest summary{reset}");
    println!("{green}Downloaded images: {}{reset}", report.downloaded());
    println!("{yellow}Failed downloads: {}{reset}", report.failed());

    for query in &report.queries {
        let color = match (&query.error, query.failed) {
            (Some(_), _) => red,
            (None, 0) => green,
            (None, _) => yellow,
        };
        println!(
            "{color}{} / {}: {}/{} saved ({} found){reset}",
            query.subject, query.category, query.downloaded, query.requested, query.collected
        );
        println!("{color}   folder: {}{reset}", query.folder);
        if let Some(error) = &query.error {
            println!("{red}   error: {error}{reset}");
        }
    }
    println!("{cyan}Provenance: {} ({} rows){reset}", report.ledger_path, report.ledger_rows);
    println!("{green}Done. All images are saved.{reset}");
}
