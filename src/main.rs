use anyhow::Context;
use clap::{Parser, Subcommand};
use cmdbridge::config::ConfigError;
use cmdbridge::error::describe_error_code;
use cmdbridge::{
    BridgeError, ConfigLoader, Engine, EngineConfig, ErrorCode, Operation, CATALOGUE,
};
use std::path::PathBuf;
use tracing::{debug, error, trace};

/// Run external tools and print structured results
#[derive(Parser)]
#[command(name = "cmdbridge")]
#[command(about = "Run git, docker, kubectl and openssl operations with structured JSON results", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one operation and print its result envelope
    Run {
        /// Operation name, e.g. git_grep
        operation: String,

        /// Parameters as a JSON object
        #[arg(short, long, conflicts_with = "params_file")]
        params: Option<String>,

        /// Read parameters from a JSON file
        #[arg(long)]
        params_file: Option<PathBuf>,

        /// Working directory for operations that do not name one
        #[arg(short = 'C', long)]
        dir: Option<PathBuf>,

        /// Pretty-print the envelope
        #[arg(long)]
        pretty: bool,
    },
    /// List supported operations
    Operations,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.clone()).await;

    let log_level = match cli.verbose {
        0 => config
            .as_ref()
            .map(|c| c.get_log_level().to_string())
            .unwrap_or_else(|_| "info".to_string()),
        1 => "debug".to_string(),
        2 => "trace".to_string(),
        _ => "trace,tokio=debug".to_string(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .with_target(cli.verbose >= 2) // Show target module for -vv and above
        .with_thread_ids(cli.verbose >= 3) // Show thread IDs for -vvv
        .with_line_number(cli.verbose >= 3) // Show line numbers for -vvv
        .init();

    debug!("cmdbridge started with verbosity level: {}", cli.verbose);
    trace!("Full CLI args: {:?}", std::env::args().collect::<Vec<_>>());

    let result = match cli.command {
        Commands::Run {
            operation,
            params,
            params_file,
            dir,
            pretty,
        } => run_operation(config, &operation, params, params_file, dir, pretty).await,
        Commands::Operations => {
            list_operations();
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("Fatal error: {:#}", e);
        match e.downcast_ref::<BridgeError>() {
            Some(err) => {
                eprintln!("Error: {}", err.user_message());
                eprintln!("  [E{:04}] {}", err.code(), describe_error_code(err.code()));
                std::process::exit(err.exit_code());
            }
            None => {
                eprintln!("Error: {e:#}");
                std::process::exit(1);
            }
        }
    }
}

async fn load_config(path: Option<PathBuf>) -> Result<EngineConfig, ConfigError> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = path {
        loader = loader.with_path(path);
    }
    loader.load().await
}

async fn run_operation(
    config: Result<EngineConfig, ConfigError>,
    name: &str,
    params: Option<String>,
    params_file: Option<PathBuf>,
    dir: Option<PathBuf>,
    pretty: bool,
) -> anyhow::Result<()> {
    let config = config.map_err(BridgeError::from)?;

    let params = match (params, params_file) {
        (Some(json), _) => json,
        (None, Some(path)) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read parameters from {}", path.display()))?,
        (None, None) => "{}".to_string(),
    };
    let params: serde_json::Value = serde_json::from_str(&params).map_err(|e| {
        BridgeError::validation_with_code(
            ErrorCode::VALIDATION_INVALID_FORMAT,
            format!("parameters are not valid JSON: {e}"),
            None,
        )
    })?;

    let operation = Operation::from_request(name, params)?;

    let mut engine = Engine::production(config);
    if let Some(dir) = dir {
        engine = engine.with_working_dir(dir);
    }

    let envelope = engine.execute(&operation).await?;
    println!("{}", envelope.to_json(pretty)?);
    Ok(())
}

fn list_operations() {
    let width = CATALOGUE.iter().map(|info| info.name.len()).max().unwrap_or(0);
    for info in CATALOGUE {
        println!(
            "{:<width$}  {:>5}  {}",
            info.name,
            humantime::format_duration(info.deadline).to_string(),
            info.description,
        );
    }
}
