//! Hyperflow CLI - validate a training configuration and run the display workflow

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use hyperflow::backend::{create_backend, SubmitOptions, DEFAULT_DOMAIN, DEFAULT_PROJECT};
use hyperflow::error::{FixSuggestion, HyperflowError};
use hyperflow::loader::{ConfigLoader, DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_NAME};
use hyperflow::model::Configuration;
use hyperflow::output::OutputFormat;
use hyperflow::path::FieldPath;
use hyperflow::workflow::TaskGraph;

#[derive(Parser)]
#[command(name = "hyperflow")]
#[command(about = "Hyperflow - validated configuration for gradient boosting training runs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where the configuration comes from
#[derive(Args)]
struct LoadArgs {
    /// Directory holding the base config file
    #[arg(long, default_value = DEFAULT_CONFIG_DIR)]
    config_dir: PathBuf,

    /// Base config file name (.yaml appended when no extension is given)
    #[arg(long, default_value = DEFAULT_CONFIG_NAME)]
    config_name: String,

    /// Extra YAML file merged over the base (repeatable, later wins)
    #[arg(short = 'f', long = "override-file")]
    override_files: Vec<PathBuf>,

    /// Overrides: key.path=value to replace, +key.path=value to add,
    /// ++key.path=value to add or replace, ~key.path to delete
    overrides: Vec<String>,
}

impl LoadArgs {
    fn loader(&self) -> Result<ConfigLoader, HyperflowError> {
        let loader = self
            .override_files
            .iter()
            .fold(
                ConfigLoader::new(&self.config_dir, self.config_name.as_str()),
                |loader, file| loader.with_override_file(file),
            )
            .with_env();
        loader.with_overrides(&self.overrides)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration and run the display workflow
    Run {
        #[command(flatten)]
        load: LoadArgs,

        /// Execution backend
        #[arg(long, default_value = "local")]
        backend: String,

        /// Domain the run is registered under
        #[arg(long, default_value = DEFAULT_DOMAIN)]
        domain: String,

        /// Project the run is registered under
        #[arg(long, default_value = DEFAULT_PROJECT)]
        project: String,

        /// Display only this part of the configuration (e.g. hyperparameters.learning_rate)
        #[arg(long)]
        select: Option<String>,

        /// Payload format (text or json)
        #[arg(long, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Report every problem in the configuration
    Validate {
        #[command(flatten)]
        load: LoadArgs,

        /// Report format (text or json)
        #[arg(long, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Print the validated configuration (password masked)
    Show {
        #[command(flatten)]
        load: LoadArgs,

        /// Output format (text or json)
        #[arg(long, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (ignore if not present)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            load,
            backend,
            domain,
            project,
            select,
            format,
        } => {
            let options = SubmitOptions {
                domain,
                project,
                format,
                echo: true,
            };
            run(&load, &backend, select.as_deref(), &options).await.map(|_| true)
        }
        Commands::Validate { load, format } => validate(&load, format),
        Commands::Show { load, format } => show(&load, format).map(|_| true),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            if let Some(suggestion) = e.downcast_ref::<HyperflowError>().and_then(|e| e.fix_suggestion()) {
                eprintln!("  {} {}", "Fix:".yellow(), suggestion);
            }
            std::process::exit(1);
        }
    }
}

async fn run(
    load: &LoadArgs,
    backend_name: &str,
    select: Option<&str>,
    options: &SubmitOptions,
) -> anyhow::Result<()> {
    let backend = create_backend(backend_name)?;
    let config = Arc::new(load.loader()?.load_configuration()?);

    let mut graph = TaskGraph::standard();
    if let Some(selector) = select {
        graph = graph.with_selector(FieldPath::parse(selector)?);
    }

    println!(
        "{} Backend: {} | domain: {} | project: {}",
        "→".cyan(),
        backend.name().cyan().bold(),
        options.domain.cyan(),
        options.project.cyan()
    );

    let handle = backend.submit(&graph, config, options).await?;

    println!(
        "\n{} Run {} ({} tasks)",
        "✓".green().bold(),
        handle.run_id,
        handle.summary.completed
    );
    println!("  {}", handle.url);
    Ok(())
}

fn validate(load: &LoadArgs, format: OutputFormat) -> anyhow::Result<bool> {
    let loader = load.loader()?;
    let value = loader.load()?;
    let report = Configuration::validate(&value, loader.describe_sources());

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&report.to_json())?);
        return Ok(report.is_valid());
    }

    for warning in &report.warnings {
        println!("  {} {}", "⚠".yellow(), warning);
        if let Some(suggestion) = warning.fix_suggestion() {
            println!("    {} {}", "Fix:".yellow(), suggestion);
        }
    }

    if report.is_valid() {
        println!("{} {} is valid", "✓".green(), report.source);
    } else {
        println!(
            "{} {} has {} error(s)",
            "✗".red(),
            report.source,
            report.errors.len()
        );
        for error in &report.errors {
            println!("  {} {}", "•".red(), error);
            if let Some(suggestion) = error.fix_suggestion() {
                println!("    {} {}", "Fix:".yellow(), suggestion);
            }
        }
    }

    Ok(report.is_valid())
}

fn show(load: &LoadArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = load.loader()?.load_configuration()?;
    println!("{}", format.render(&config.to_display_value()?)?);
    Ok(())
}
