use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

use startstop::{ServiceOrchestrator, StartStopConfig};

#[derive(Parser, Debug)]
#[command(name = "startstop")]
#[command(about = "Start services in order, stop them in reverse on SIGINT/SIGTERM")]
#[command(version)]
#[command(long_about = "Starts every configured service one at a time in declaration order, \
waits for SIGINT or SIGTERM, then stops them one at a time in reverse order. Each start and stop \
call is bounded by a deadline. A failed start rolls back the services already running. \
The process exits with 0 only if every call succeeded.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "startstop.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting services")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Dry run mode - build the service list but don't start it
    #[arg(long, help = "Perform dry run - build the service list but don't start it")]
    dry_run: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<String>,

    /// Override the per-call start deadline
    #[arg(long, value_name = "MS")]
    start_timeout_ms: Option<u64>,

    /// Override the per-call stop deadline
    #[arg(long, value_name = "MS")]
    stop_timeout_ms: Option<u64>,

    /// Print the lifecycle report as JSON on exit
    #[arg(long, help = "Print a JSON summary of every start/stop call on exit")]
    summary: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    let mut config = StartStopConfig::load_from_file(&args.config)?;
    apply_overrides(&mut config, &args);

    let log_guard = init_logging(&args, &config)?;

    info!("Starting startstop v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        eprintln!("✗ Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    if args.validate_config {
        info!("Configuration validation successful");
        println!("✓ Configuration is valid");
        return Ok(());
    }

    let mut orchestrator = ServiceOrchestrator::new(config).map_err(|e| {
        error!("Failed to create orchestrator: {}", e);
        e
    })?;

    if args.dry_run {
        info!("Dry run mode - services configured but not started");
        for (name, state) in orchestrator.get_all_component_states() {
            println!("{} ({:?})", name, state);
        }
        println!("✓ Dry run completed successfully");
        return Ok(());
    }

    orchestrator.install_signal_handlers()?;

    let exit_code = orchestrator.execute().await.map_err(|e| {
        error!("System error during execution: {}", e);
        e
    })?;

    let report = orchestrator.into_report();
    if args.summary {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    info!("startstop exited with code: {}", exit_code);

    // process::exit skips destructors, flush the log writer first
    drop(log_guard);
    std::process::exit(exit_code);
}

fn apply_overrides(config: &mut StartStopConfig, args: &Args) {
    if let Some(ms) = args.start_timeout_ms {
        config.lifecycle.start_timeout_ms = ms;
    }
    if let Some(ms) = args.stop_timeout_ms {
        config.lifecycle.stop_timeout_ms = ms;
    }
    if let Some(format) = &args.log_format {
        config.logging.format = format.clone();
    }
    if let Some(file) = &args.log_file {
        config.logging.file = Some(file.clone());
    }
    if args.debug {
        config.logging.level = "debug".to_string();
    } else if args.verbose {
        config.logging.level = "info".to_string();
    } else if args.quiet {
        config.logging.level = "error".to_string();
    }
}

fn init_logging(args: &Args, config: &StartStopConfig) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("startstop={}", config.logging.level)));

    let (writer, guard) = match &config.logging.file {
        Some(file) => {
            let path = Path::new(file);
            let directory = path
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("Invalid log file path: {}", file))?;
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (fmt::writer::BoxMakeWriter::new(writer), Some(guard))
        }
        None => (fmt::writer::BoxMakeWriter::new(std::io::stderr), None),
    };
    let ansi = config.logging.file.is_none();

    let fmt_layer = match config.logging.format.to_lowercase().as_str() {
        "json" => fmt::layer()
            .json()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        "compact" => fmt::layer()
            .compact()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        "pretty" => fmt::layer()
            .pretty()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        format => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_writer(writer)
                .with_ansi(ansi)
                .with_target(true)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(guard)
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# startstop configuration file");
    println!("# Services are started top to bottom and stopped bottom to top");
    println!();
    println!(
        "{}",
        toml::to_string_pretty(&StartStopConfig::default())?
    );
    Ok(())
}
