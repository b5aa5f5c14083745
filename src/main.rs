use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use roleswap::orchestrator::SourcePayload;
use roleswap::{catalog, config, server, service};

#[derive(Parser)]
#[command(name = "roleswap")]
#[command(version, about = "Swap an uploaded face onto preset character images")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// Bind address (overrides the configured one)
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Swap a photo onto a preset and write the result to a file
    Swap {
        /// Path to the source photo
        source: PathBuf,
        /// Preset category
        #[arg(short, long)]
        gender: String,
        /// Preset id within the category
        #[arg(short, long)]
        role: String,
        /// Output JPEG path
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print the preset catalog as JSON
    Roles,
    /// Open config file in editor
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(None)?;

    match cli.command {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| cfg.bind.clone());
            server::serve(cfg, &bind).await
        }
        Commands::Swap {
            source,
            gender,
            role,
            output,
        } => swap_once(&cfg, &source, &gender, &role, &output),
        Commands::Roles => {
            println!("{}", serde_json::to_string_pretty(catalog::all())?);
            Ok(())
        }
        Commands::Config => open_config(),
    }
}

fn swap_once(
    cfg: &config::Config,
    source: &Path,
    gender: &str,
    role: &str,
    output: &Path,
) -> Result<()> {
    let target = catalog::resolve(gender, role, &cfg.asset_root)?;
    let bytes =
        std::fs::read(source).with_context(|| format!("reading {}", source.display()))?;

    let service = service::shared(cfg)?;
    let jpeg = service.swap_jpeg(SourcePayload::Bytes(&bytes), &target)?;

    std::fs::write(output, jpeg).with_context(|| format!("writing {}", output.display()))?;
    info!("✓ wrote {}", output.display());
    Ok(())
}

fn open_config() -> Result<()> {
    let config_path = config::CONFIG_PATH.as_os_str();
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {:?}", config_path);

    let status = std::process::Command::new(editor)
        .arg(config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}
