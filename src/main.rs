/*!
 * usdt-fire
 *
 * Loads a provider manifest, enables it and fires probes described by
 * JSON lines on stdin:
 *
 *   {"function": "doWork", "name": "start", "args": [42, "go"]}
 */

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufRead};
use std::path::PathBuf;
use tracing::{info, warn};

use usdt_provider::{
    init_tracing, BackendKind, CoercionPolicy, FireRequest, ProviderManifest, UsdtConfig,
    UsdtRegistry,
};

#[derive(Parser, Debug)]
#[command(version, about = "Fire USDT probes described by a JSON manifest")]
struct Cli {
    /// Provider manifest (JSON)
    manifest: PathBuf,

    /// Optional registry configuration (JSON); USDT_* variables otherwise
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the tracing backend
    #[arg(long, value_parser = parse_backend)]
    backend: Option<BackendKind>,

    /// Coerce by runtime type instead of declared type
    #[arg(long)]
    permissive: bool,

    /// Print fire counters as JSON on exit
    #[arg(long)]
    stats: bool,
}

fn parse_backend(raw: &str) -> Result<BackendKind, String> {
    raw.parse().map_err(|e: usdt_provider::UsdtError| e.to_string())
}

fn load_config(cli: &Cli) -> Result<UsdtConfig> {
    let mut config = match &cli.config {
        Some(path) => UsdtConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => UsdtConfig::from_env().context("reading USDT_* environment")?,
    };
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if cli.permissive {
        config.coercion = CoercionPolicy::Permissive;
    }
    Ok(config)
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let registry = UsdtRegistry::new(load_config(&cli)?).context("creating registry")?;
    let manifest = ProviderManifest::from_json_file(&cli.manifest)
        .with_context(|| format!("loading manifest {}", cli.manifest.display()))?;

    let mut provider = manifest.build(&registry).context("building provider")?;
    provider.enable().context("enabling provider")?;
    info!(
        provider = provider.name(),
        module = provider.module(),
        probes = provider.probe_count(),
        "ready, reading fire requests from stdin"
    );

    for (number, line) in io::stdin().lock().lines().enumerate() {
        let line = line.context("reading stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        match FireRequest::from_json_str(&line) {
            Ok(request) => {
                if !request.fire(&provider) {
                    warn!(line = number + 1, function = %request.function, probe = %request.name, "no such probe");
                }
            }
            Err(e) => warn!(line = number + 1, error = %e, "skipping malformed request"),
        }
    }

    if cli.stats {
        println!("{}", serde_json::to_string_pretty(&provider.info())?);
    }

    drop(provider);
    registry.shutdown();
    Ok(())
}
