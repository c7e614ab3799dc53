//! research-crew - command line entry point
//!
//! Runs the researcher/writer crew on a topic, streaming the crew's progress
//! into a terminal log panel and printing the finished post.

use clap::{Parser, Subcommand};
use research_crew::config::CrewConfig;
use research_crew::crew::ResearchCrewFactory;
use research_crew::dashboard::{Dashboard, FormInput, RunOutcome, TerminalSurface};
use research_crew::observability::init_default_logging;
use std::path::PathBuf;
use std::process;
use tracing::{error, info};

/// Two-agent research and writing crew
#[derive(Parser)]
#[command(name = "research-crew")]
#[command(about = "Research a topic with a two-agent crew and write it up")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbose logging (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Research a topic and write a blog post about it
    Run {
        /// Topic to research
        #[arg(short, long)]
        topic: Option<String>,

        /// OpenAI API key; defaults to the configured environment variable
        #[arg(long, value_name = "KEY")]
        api_key: Option<String>,

        /// Record every callback event to this file as JSON lines
        #[arg(long, value_name = "FILE")]
        transcript: Option<PathBuf>,
    },
    /// Re-render the log of a recorded transcript
    Replay {
        /// Transcript file written by `run --transcript`
        file: PathBuf,
    },
    /// Validate configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_default_logging(cli.verbose);

    info!("Starting research-crew v{}", env!("CARGO_PKG_VERSION"));

    let config = match CrewConfig::discover(cli.config.as_deref()) {
        Ok((config, _)) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            eprintln!("Failed to load configuration: {e}");
            process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Run {
            topic,
            api_key,
            transcript,
        } => run_crew(config, topic, api_key, transcript).await,
        Commands::Replay { file } => replay(file),
        Commands::Config { show } => handle_config_command(&config, show),
    };

    process::exit(code);
}

async fn run_crew(
    config: CrewConfig,
    topic: Option<String>,
    api_key: Option<String>,
    transcript: Option<PathBuf>,
) -> i32 {
    let form = FormInput::resolve(api_key, topic, &config);
    let factory = ResearchCrewFactory::new(config);

    let mut dashboard = Dashboard::new(TerminalSurface::stdout());
    if let Some(path) = transcript {
        dashboard = dashboard.with_transcript(path);
    }

    match dashboard.start(&form, &factory).await {
        RunOutcome::Completed(_) => 0,
        RunOutcome::MissingInput => 2,
        RunOutcome::Failed(_) => 1,
    }
}

fn replay(file: PathBuf) -> i32 {
    let mut dashboard = Dashboard::new(TerminalSurface::stdout());
    match dashboard.replay(&file) {
        Ok(_) => 0,
        Err(e) => {
            dashboard.report_error(&e);
            1
        }
    }
}

fn handle_config_command(config: &CrewConfig, show: bool) -> i32 {
    if show {
        match toml::to_string_pretty(config) {
            Ok(text) => {
                println!("Current configuration:");
                println!("{text}");
            }
            Err(e) => {
                error!("Failed to render configuration: {}", e);
                return 1;
            }
        }
    }

    println!("Configuration is valid");
    info!("Configuration validation complete");
    0
}
