use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tinyrest::{ApiServer, Config};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tinyrest", version, about = "Configurable mock REST API server")]
struct Args {
    /// Configuration file
    #[arg(short, long, env = "TINYREST_CONFIG", default_value = "config.yaml")]
    config: PathBuf,
    /// Override the listening host
    #[arg(long)]
    host: Option<String>,
    /// Override the listening port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), anyhow::Error> {
    let mut config = Config::from_file(&args.config)?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = i64::from(port);
    }
    config.validate()?;

    info!(
        "TinyREST {} (config {})",
        env!("CARGO_PKG_VERSION"),
        args.config.display()
    );

    let server = config.build_server();
    for (method, paths) in server.routes() {
        for path in paths {
            debug!("route {} {}", method, path);
        }
    }

    let api = ApiServer::bind(&config.listen_addr()?, Arc::new(server)).await?;
    info!("Press Ctrl-C to quit");

    tokio::select! {
        result = api.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            Ok(())
        }
    }
}
