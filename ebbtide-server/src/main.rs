//! Ebbtide TAXII server binary.

use std::ffi::OsStr;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use ebbtide_core::ServerConfig;
use ebbtide_server::{ServerError, build_router};
use ebbtide_store::{SqliteStore, migrations};

/// Ebbtide TAXII 2.1 server.
#[derive(Debug, Parser)]
#[command(name = "ebbtide-server", version, about)]
struct Cli {
    /// Server configuration file.
    #[arg(short, long, default_value = "etc/ebbtide.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // The logger's level and destination come from the configuration, so
    // load it before installing the subscriber.
    let config = match ServerConfig::load(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error loading configuration {}: {err}", cli.config.display());
            std::process::exit(1);
        }
    };

    let _guard = init_tracing(&config);

    info!("starting Ebbtide TAXII server");

    if let Err(err) = run(config).await {
        error!("server error: {err}");
        std::process::exit(1);
    }
}

async fn run(config: ServerConfig) -> Result<(), ServerError> {
    config.verify()?;
    info!(
        listen = %config.global.listen,
        protocol = %config.global.protocol,
        "configuration verified"
    );

    let store = match config.global.db_type.as_str() {
        "sqlite3" => SqliteStore::connect(&config.global.db_path()).await?,
        other => return Err(ServerError::UnknownDbType(other.to_string())),
    };
    migrations::run(store.pool()).await?;
    info!(path = %config.global.db_path().display(), "datastore ready");

    let router = build_router(&config, Arc::new(store))?;
    let addr: SocketAddr = config.global.listen.parse()?;

    match config.global.protocol.as_str() {
        "http" => {
            let listener = TcpListener::bind(addr).await?;
            info!(address = %addr, "server listening");
            axum::serve(listener, router).await?;
        }
        "https" => {
            // Certificate and key paths were existence-checked by verify.
            let tls = RustlsConfig::from_pem_file(
                config.global.tls_crt_path(),
                config.global.tls_key_path(),
            )
            .await?;
            info!(address = %addr, "server listening (TLS)");
            axum_server::bind_rustls(addr, tls)
                .serve(router.into_make_service())
                .await?;
        }
        other => return Err(ServerError::UnknownProtocol(other.to_string())),
    }

    Ok(())
}

/// Install the tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the configured numeric level maps
/// onto a tracing filter. With file logging enabled, output goes through a
/// non-blocking appender whose guard must outlive the process.
fn init_tracing(config: &ServerConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(config.logging.level)));

    if config.logging.enabled && !config.logging.log_file.is_empty() {
        let path = Path::new(&config.logging.log_file);
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let file_name = path.file_name().unwrap_or_else(|| OsStr::new("ebbtide.log"));

        let appender = tracing_appender::rolling::never(dir, file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(BoxMakeWriter::new(writer)),
            )
            .init();
        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
        None
    }
}

/// Map the configured numeric level onto a tracing directive.
fn level_directive(level: u8) -> &'static str {
    match level {
        0 => "warn",
        1..=4 => "info",
        5..=9 => "debug",
        _ => "trace",
    }
}
