use std::{
    fs, io,
    path::{Path, PathBuf},
    process::exit,
};

use clap::Parser;
use tracing::{error, info, warn};
use tracing_log::LogTracer;
use tracing_subscriber::{filter::EnvFilter, FmtSubscriber};

use catalogd::{
    config::{
        context::build_context,
        schema::{build_default_config, load_config, CatalogdConfig},
    },
    frontend::http::run_server,
    utils::run_one_off_command,
};

const DEFAULT_CONFIG_PATH: &str = "catalogd.toml";
const DEFAULT_LOG_FILTER: &str = "catalogd=info,warp=info";

#[derive(Debug, Parser)]
#[clap(name = "catalogd", version)]
struct Args {
    #[clap(short = 'c', long = "config", default_value = DEFAULT_CONFIG_PATH)]
    config_path: PathBuf,

    #[clap(
        long,
        help = "Create a collection from a JSON definition, print it and exit"
    )]
    one_off: Option<String>,

    #[clap(long, help = "Log in JSON format")]
    json_logs: bool,
}

fn prepare_tracing(json_logs: bool) {
    // Route `log` records from sqlx and warp through the subscriber
    LogTracer::init().expect("Error installing the log bridge");

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    // Stdout carries the result of a one-off command, keep it clean
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    let result = if json_logs {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.compact().finish())
    };
    result.expect("Error setting the global tracing subscriber");
}

fn prepare_config(path: &Path) -> CatalogdConfig {
    if !path.exists() {
        let (config_str, password) = build_default_config();
        info!(
            "Writing a default configuration file to {}",
            path.to_string_lossy()
        );
        fs::write(path, config_str).expect("Error writing the default config file");
        // Only ever shown here, the config file keeps its hash
        warn!("Write access requires this password: {password}");
    }

    match load_config(path) {
        Ok(config) => config,
        Err(e) => {
            error!("Error loading the config from {}: {e}", path.to_string_lossy());
            exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    prepare_tracing(args.json_logs);

    info!("Starting catalogd {}", env!("CARGO_PKG_VERSION"));

    let config = prepare_config(&args.config_path);
    let context = match build_context(config).await {
        Ok(context) => context,
        Err(e) => {
            error!("Error connecting to the catalog: {e}");
            exit(1);
        }
    };

    if let Some(definition) = args.one_off {
        if let Err(e) = run_one_off_command(context.store, &definition, io::stdout()).await
        {
            error!("{e}");
            exit(1);
        }
        return;
    }

    let Some(http) = context.config.frontend.http.clone() else {
        error!("No frontends configured, nothing to do");
        exit(1);
    };

    tokio::select! {
        _ = run_server(context.store.clone(), http) => {},
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
        }
    }
}
