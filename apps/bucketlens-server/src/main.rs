//! BucketLens server: a web API for browsing S3-compatible object stores.
//!
//! # Usage
//!
//! ```text
//! BUCKETLENS_LISTEN=0.0.0.0:8081 bucketlens-server
//! bucketlens-server --health-check
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `BUCKETLENS_LISTEN` | `0.0.0.0:8081` | Bind address |
//! | `BUCKETLENS_STORES_FILE` | `stores.json` | Persisted store registry |
//! | `MAX_UPLOAD_SIZE` | `104857600` | Request body ceiling in bytes |
//! | `UPLOAD_TEMP_DIR` | *(system temp)* | Upload buffer directory |
//! | `STATS_MAX_CONCURRENCY` | `8` | Concurrent prefix stats computations |
//! | `ARCHIVE_CHUNK_SIZE` | `65536` | Archive copy-buffer size |
//! | `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` | *(unset)* | Seed an in-memory `default` store |
//! | `AWS_REGION` / `AWS_ENDPOINT` / `AWS_SIGNING_REGION` | | Settings of the `default` store |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

mod handler;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use bucketlens_core::registry::{ENV_STORE_NAME, StoreRegistry, store_from_env};
use bucketlens_core::{BrowserConfig, BucketLens};
use bucketlens_http::dispatch::ApiHandler;
use bucketlens_http::service::{BucketLensHttpService, HttpConfig};

use crate::handler::BucketLensHandler;

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

fn build_http_config(config: &BrowserConfig) -> HttpConfig {
    HttpConfig {
        max_body_size: config.max_upload_size,
    }
}

/// Load the persisted registry and add the environment-seeded store, if any.
fn load_registry(
    config: &BrowserConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<StoreRegistry> {
    let registry = StoreRegistry::load(config.stores_file.clone()).with_context(|| {
        format!(
            "failed to load store registry from {}",
            config.stores_file.display()
        )
    })?;

    if let Some(store) = store_from_env(env) {
        if registry.insert_transient(store) {
            info!(store = ENV_STORE_NAME, "added store from environment");
        }
    }
    if registry.is_empty() {
        warn!("no stores configured; register one with POST /api/stores");
    }
    Ok(registry)
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve<H: ApiHandler>(listener: TcpListener, service: BucketLensHttpService<H>) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

/// Request the health endpoint over a raw connection.
async fn run_health_check(addr: &str) -> Result<()> {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    let stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("cannot connect to {addr}"))?;

    let (mut reader, mut writer) = stream.into_split();

    let request = format!("GET /health HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    writer.write_all(request.as_bytes()).await?;
    writer.shutdown().await?;

    let mut response = String::new();
    reader.read_to_string(&mut response).await?;

    if response.contains("200 OK") && response.contains("\"status\":\"running\"") {
        Ok(())
    } else {
        anyhow::bail!("unhealthy response from {addr}")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Handle --health-check flag for container health probes.
    if std::env::args().any(|a| a == "--health-check") {
        let config = BrowserConfig::from_env();
        let addr = config.listen.replace("0.0.0.0", "127.0.0.1");
        let healthy = run_health_check(&addr).await.is_ok();
        std::process::exit(i32::from(!healthy));
    }

    let config = BrowserConfig::from_env();

    init_tracing(&config.log_level)?;

    info!(
        listen = %config.listen,
        stores_file = %config.stores_file.display(),
        max_upload_size = config.max_upload_size,
        stats_max_concurrency = config.stats_max_concurrency,
        version = VERSION,
        "starting BucketLens server",
    );

    let registry = Arc::new(load_registry(&config, |name| std::env::var(name).ok())?);
    info!(stores = registry.len(), "store registry loaded");

    let http_config = build_http_config(&config);
    let addr: SocketAddr = config
        .listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.listen))?;

    let lens = BucketLens::new(config, registry);
    let service = BucketLensHttpService::new(BucketLensHandler(lens), http_config);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    serve(listener, service).await
}
