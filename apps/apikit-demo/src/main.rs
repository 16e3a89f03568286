use anyhow::{Context, Result};
use apikit::{enable_api_clients, Catalog, Container, Environment, ScanReport, ScanSettings};
use apikit_bootstrap::{AppConfig, AppConfigProvider, CliArgs, ConfigProvider, SectionError};
use clap::{Parser, Subcommand};

use std::path::PathBuf;

mod clients;

use clients::EchoApi;

/// Scan root used when the config has no `api_clients` section.
const DEFAULT_SCAN_ROOT: &str = "apikit_demo";

/// apikit demo - declared HTTP clients wired from layered configuration
#[derive(Parser)]
#[command(name = "apikit-demo")]
#[command(about = "apikit demo - declared HTTP clients wired from layered configuration")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan declared clients and print the registration report
    Check,
    /// Call the echo service through its declared client
    Call {
        /// Path appended to `/anything/`
        #[arg(default_value = "hello")]
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    // defaults -> YAML (if provided) -> env (APP__*) -> CLI overrides
    let mut config = AppConfig::load_or_default(args.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.clone().unwrap_or_default();
    apikit_bootstrap::init_logging(&logging_config, &config.base_dir());

    if args.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let provider = AppConfigProvider::new(config);
    let (container, report) = wire_clients(&provider)?;

    match cli.command.unwrap_or(Commands::Check) {
        Commands::Check => {
            print_report(&report);
            Ok(())
        }
        Commands::Call { path } => call_echo(&container, &path).await,
    }
}

/// Build the container from config properties and register every declared client.
fn wire_clients<P: ConfigProvider>(provider: &P) -> Result<(Container, ScanReport)> {
    let settings = scan_settings(provider)?;
    let container = Container::new(Environment::from_properties(provider.properties()));

    let report = enable_api_clients(&container, Catalog::discovered(), &settings)
        .context("api client scan failed")?;
    Ok((container, report))
}

fn scan_settings<P: ConfigProvider>(provider: &P) -> Result<ScanSettings> {
    match provider.section_as::<ScanSettings>("api_clients") {
        Ok(settings) => Ok(settings),
        Err(SectionError::Missing(_)) => {
            tracing::debug!(
                root = DEFAULT_SCAN_ROOT,
                "no api_clients section; scanning the demo crate"
            );
            Ok(ScanSettings::for_packages([DEFAULT_SCAN_ROOT]))
        }
        Err(e) => Err(e.into()),
    }
}

fn print_report(report: &ScanReport) {
    if report.skipped {
        println!("Scan skipped: client manager definition is missing");
        return;
    }
    println!("Registered clients: {}", report.registrations.len());
    for record in &report.registrations {
        println!(
            "  {} -> {} (read_timeout={}ms, retry_times={})",
            record.qualified_name,
            record.descriptor.url,
            record.descriptor.read_timeout_ms,
            record.descriptor.retry_times
        );
    }
    for rejected in &report.rejected {
        println!("  rejected {}: {}", rejected.name, rejected.error);
    }
}

async fn call_echo(container: &Container, path: &str) -> Result<()> {
    let echo = container.get::<dyn EchoApi>()?;
    match echo.echo(path).await? {
        Some(body) => println!("{}", serde_json::to_string_pretty(&body)?),
        None => println!("echo service returned 404"),
    }
    Ok(())
}
