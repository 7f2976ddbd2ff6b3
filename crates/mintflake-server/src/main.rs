use clap::Parser;
use mintflake_server::server::{
    config::{CliArgs, ServerConfig},
    service::handler::IdService,
    telemetry::init_telemetry,
    transport::{http::serve_http, stream::serve_tcp},
};
use tokio::net::TcpListener;
use tokio::signal;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    init_telemetry()?;

    let service = IdService::from_config(&config);

    if config.uds {
        #[cfg(unix)]
        {
            use mintflake_server::server::transport::stream::serve_uds;
            use tokio::net::UnixListener;
            let uds_path = config.listen.clone();
            let uds = UnixListener::bind(&uds_path)?;
            log_startup_info(&config);
            serve_uds(uds, service, shutdown_signal()).await;
            // Not reached on panic; a stale socket file then blocks the next bind.
            let _ = std::fs::remove_file(&uds_path);
        }
        #[cfg(not(unix))]
        {
            anyhow::bail!("Unix domain sockets are not supported on this platform");
        }
    } else if config.http {
        let tcp = TcpListener::bind(&config.listen).await?;
        log_startup_info(&config);
        serve_http(tcp, service, shutdown_signal()).await?;
    } else {
        let tcp = TcpListener::bind(&config.listen).await?;
        log_startup_info(&config);
        serve_tcp(tcp, service, shutdown_signal()).await;
    }

    tracing::info!("Service shut down successfully");
    Ok(())
}

fn log_startup_info(config: &ServerConfig) {
    let transport = match (config.uds, config.http) {
        (true, _) => "unix socket",
        (false, true) => "http",
        (false, false) => "tcp",
    };
    if cfg!(debug_assertions) {
        // The token never reaches the logs.
        tracing::info!(
            "Starting ID service on {} ({transport}) with full config: {:#?}",
            config.listen,
            ServerConfig {
                token: config.token.as_ref().map(|_| "<redacted>".to_string()),
                ..config.clone()
            }
        );
    } else {
        tracing::info!(
            "Starting ID service on {} ({transport}) as datacenter {} worker {}, auth {}",
            config.listen,
            config.datacenter_id,
            config.worker_id,
            if config.token.is_some() && !config.http { "on" } else { "off" },
        );
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }

    tracing::info!("Shutdown signal received, terminating gracefully...");
}
