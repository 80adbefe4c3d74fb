/// Version injected at compile time via GCE_IGM_VERSION env var (set by CI/CD),
/// or the crate version for local builds.
pub const VERSION: &str = match option_env!("GCE_IGM_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gce_igm::config::ProviderConfig;
use gce_igm::gcp::{auth::GcpCredentials, client::GcpClient};
use gce_igm::igm::{
    InstanceGroupManagerId, InstanceGroupManagerResource, InstanceGroupManagerSpec,
    InstanceGroupManagerState,
};
use gce_igm::state::StateFile;
use gce_igm::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Manage a Compute Engine managed instance group
#[derive(Parser, Debug)]
#[command(name = "gce-igm", version = VERSION, about, long_about = None)]
struct Args {
    /// GCP project to use when the resource doesn't name one
    #[arg(short, long, global = true)]
    project: Option<String>,

    /// GCP zone to use when the resource doesn't name one
    #[arg(short, long, global = true)]
    zone: Option<String>,

    /// Region searched when no zone is known
    #[arg(short, long, global = true)]
    region: Option<String>,

    /// Provider configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Where the resource state is kept between commands
    #[arg(long, global = true, default_value = "gce-igm.state.json")]
    state: PathBuf,

    /// Log level for debugging
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the instance group manager described by a YAML file
    Create {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Refresh the stored state from the API
    Read,
    /// Apply the changes in a YAML file to the stored instance group manager
    Update {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Delete the stored instance group manager
    Delete,
    /// Adopt an existing instance group manager, given as project/zone/name
    Import { id: String },
    /// Print the parts of an identifier
    ShowId { id: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

fn setup_logging(
    level: LogLevel,
    log_file: Option<&Path>,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    // RUST_LOG takes precedence over --log-level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()));

    let Some(log_path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
        return Ok(None);
    };

    if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory {:?}", parent))?;
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .with_context(|| format!("Failed to open log file {:?}", log_path))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("gce-igm {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn load_config(args: &Args) -> Result<ProviderConfig> {
    let mut config = match &args.config {
        Some(path) => ProviderConfig::load_from(path)?,
        None => ProviderConfig::load()?,
    };

    // CLI > config file > gcloud default
    if args.project.is_some() {
        config.project = args.project.clone();
    }
    if args.zone.is_some() {
        config.zone = args.zone.clone();
    }
    if args.region.is_some() {
        config.region = args.region.clone();
    }

    Ok(config)
}

async fn build_resource(config: &ProviderConfig) -> Result<InstanceGroupManagerResource> {
    let credentials = GcpCredentials::new()
        .await
        .context("Failed to initialize GCP credentials")?;
    let client = GcpClient::with_endpoint(credentials, &config.endpoint)?;

    let defaults = config.provider_defaults();
    tracing::info!(
        "Using project: {:?}, zone: {:?}, region: {:?}",
        defaults.project,
        defaults.zone,
        defaults.region
    );

    Ok(InstanceGroupManagerResource::new(Arc::new(client), defaults)
        .with_timeouts(config.timeouts())
        .with_delete_retry(config.delete_retry())
        .with_poll_interval(config.poll_interval()))
}

fn load_spec(path: &Path) -> Result<InstanceGroupManagerSpec> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))
}

fn stored(state: &StateFile, path: &Path) -> Result<InstanceGroupManagerState> {
    match &state.resource {
        Some(resource) => Ok(resource.clone()),
        None => bail!("No instance group manager recorded in {:?}", path),
    }
}

fn print_state(resource: &InstanceGroupManagerState) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(resource)?);
    Ok(())
}

fn show_id(id: &str) -> Result<()> {
    let id = InstanceGroupManagerId::decode(id)?;
    println!("project: {}", id.project);
    println!("zone:    {}", id.zone);
    println!("name:    {}", id.name);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level, args.log_file.as_deref())?;

    // No credentials needed
    if let Command::ShowId { id } = &args.command {
        return show_id(id);
    }

    let config = load_config(&args)?;
    let resource = build_resource(&config).await?;
    let mut state = StateFile::load(&args.state)?;

    match &args.command {
        Command::Create { file } => {
            if let Some(existing) = &state.resource {
                bail!(
                    "{:?} already tracks instance group manager {}; delete it first",
                    args.state,
                    existing.id
                );
            }
            let spec = load_spec(file)?;
            match resource.create(&spec).await {
                Ok(created) => {
                    state.store(&args.state, Some(created.clone()))?;
                    print_state(&created)?;
                },
                Err(Error::Created { id, source }) => {
                    // Keep the identifier so the next read or delete can find it
                    let partial = InstanceGroupManagerState {
                        id: id.clone(),
                        spec,
                        ..InstanceGroupManagerState::default()
                    };
                    state.store(&args.state, Some(partial))?;
                    return Err(Error::Created { id, source }.into());
                },
                Err(e) => return Err(e.into()),
            }
        },
        Command::Read => {
            let current = stored(&state, &args.state)?;
            match resource.read(&current).await? {
                Some(refreshed) => {
                    state.store(&args.state, Some(refreshed.clone()))?;
                    print_state(&refreshed)?;
                },
                None => {
                    state.store(&args.state, None)?;
                    println!("Instance group manager {} no longer exists", current.id);
                },
            }
        },
        Command::Update { file } => {
            let current = stored(&state, &args.state)?;
            let desired = load_spec(file)?;
            let updated = resource.update(&current, &desired).await?;
            state.store(&args.state, Some(updated.clone()))?;
            print_state(&updated)?;
        },
        Command::Delete => {
            let current = stored(&state, &args.state)?;
            resource.delete(&current).await?;
            state.store(&args.state, None)?;
            println!("Deleted instance group manager {}", current.id);
        },
        Command::Import { id } => {
            let seeded = resource.import(id)?;
            let Some(imported) = resource.read(&seeded).await? else {
                bail!("Instance group manager {} does not exist", id);
            };
            state.store(&args.state, Some(imported.clone()))?;
            print_state(&imported)?;
        },
        Command::ShowId { id } => show_id(id)?,
    }

    Ok(())
}
