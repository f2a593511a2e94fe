use std::path::PathBuf;

use anyhow::Context;
use archgate_core::ArchgateConfig;
use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(
    name = "archgate",
    about = "archgate — architecture-aware scheduling filter",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Path to an archgate.toml configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve image references to the architectures they were published for
    Resolve {
        /// Image references, e.g. nginx:1.25 or ghcr.io/org/app@sha256:...
        #[arg(required = true)]
        images: Vec<String>,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Run the archfilter plugin for a workload against a set of nodes.
    ///
    /// The workload file is a JSON object with `name`, optional `namespace`
    /// and `containers` ([{"name", "image"}]). The nodes file is a JSON
    /// array of {"name", "architecture"}.
    Evaluate {
        #[arg(short, long)]
        workload: PathBuf,
        #[arg(short, long)]
        nodes: PathBuf,
        /// Plugin args file (JSON, or YAML by .yaml/.yml extension).
        /// Overrides [weights] from the config file.
        #[arg(short, long)]
        args: Option<PathBuf>,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Print an example configuration file
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    match cli.command {
        Commands::Resolve { images, format } => {
            let config = load_config(cli.config)?;
            commands::resolve::resolve(&config, &images, &format).await
        }
        Commands::Evaluate {
            workload,
            nodes,
            args,
            format,
        } => {
            let config = load_config(cli.config)?;
            commands::evaluate::evaluate(&config, &workload, &nodes, args.as_deref(), &format).await
        }
        Commands::Config => {
            print!("{}", ArchgateConfig::example().to_toml_string()?);
            Ok(())
        }
    }
}

fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info,archgate=debug"))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<ArchgateConfig> {
    match path {
        Some(path) => ArchgateConfig::from_file(&path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(ArchgateConfig::default()),
    }
}
