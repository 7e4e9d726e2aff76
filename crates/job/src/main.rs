use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use serde_json::Value;
use subfetch_cache::region::{self, RegionConfig};
use subfetch_job::ScanJob;
use subfetch_job::error::ErrorReport;
use subfetch_metadata::provider::MetadataProvider;
use subfetch_metadata::tmdb::TmdbClient;
use subfetch_providers::ProviderRegistry;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
usage: subfetch-job '<json array>'

Runs one subtitle scan. Arguments, in order: scan_path, scan_age (weeks),
languages, encoding, min_score, providers, provider_configs, max_workers,
plex_url, plex_token. They can also be passed in SUBFETCH_JOB_ARGS.

This binary registers no subtitle providers. A run that finds videos
needing subtitles fails with an unknown provider error; register providers
in a ProviderRegistry from an embedding program instead.

Environment:
  SUBFETCH_JOB_ARGS       job arguments when none are given on the command line
  SUBFETCH_CACHE_DB       metadata cache file
  SUBFETCH_TMDB_API_KEY   enables TMDB refinement
  SUBFETCH_FFPROBE        ffprobe binary for embedded subtitles (empty disables)
  SUBFETCH_LOG_JSON=1     JSON logs on stderr
  RUST_LOG                log filter
";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::args()
        .nth(1)
        .is_some_and(|a| a == "-h" || a == "--help")
    {
        print!("{USAGE}");
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    if std::env::var("SUBFETCH_LOG_JSON").is_ok_and(|v| v == "1") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    // Job arguments: first CLI argument or SUBFETCH_JOB_ARGS, as a JSON array
    let raw_args = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SUBFETCH_JOB_ARGS").ok())
        .context("job arguments missing: pass a JSON array or set SUBFETCH_JOB_ARGS")?;
    let args: Vec<Value> =
        serde_json::from_str(&raw_args).context("job arguments must be a JSON array")?;

    let cache_path =
        std::env::var("SUBFETCH_CACHE_DB").unwrap_or_else(|_| region::DEFAULT_CACHE_FILE.to_string());
    info!(cache_path = %cache_path, "using metadata cache");

    let mut refiners: Vec<Arc<dyn MetadataProvider>> = Vec::new();
    if let Ok(api_key) = std::env::var("SUBFETCH_TMDB_API_KEY") {
        if !api_key.is_empty() {
            refiners.push(Arc::new(TmdbClient::new(api_key)));
            info!("TMDB refinement enabled");
        }
    }

    let ffprobe = match std::env::var("SUBFETCH_FFPROBE") {
        Ok(path) if path.is_empty() => None,
        Ok(path) => Some(PathBuf::from(path)),
        Err(_) => Some(PathBuf::from("ffprobe")),
    };

    // Concrete subtitle providers are registered by embedding applications.
    let registry = ProviderRegistry::new();
    if registry.names().next().is_none() {
        warn!("no subtitle providers registered, runs that need subtitles will fail (see --help)");
    }
    let job = ScanJob::new(registry)
        .with_refiners(refiners)
        .with_cache(RegionConfig::at(cache_path))
        .with_ffprobe(ffprobe);

    info!(description = %ScanJob::running_description(), "job running");
    let outcome = job.run_with_args(&args).await;
    region::close_global().await;

    match outcome {
        Ok(result) => {
            info!(description = %ScanJob::succeeded_description(&result), "job succeeded");
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(e) => {
            error!(description = %ScanJob::failed_description(&e), error = %e, "job failed");
            println!("{}", serde_json::to_string_pretty(&ErrorReport::from(&e))?);
            std::process::exit(1);
        }
    }
}
