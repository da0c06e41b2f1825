//! this binary starts the kvs web server
//! to see the list of options, type: `kvs-server --help`
//!
//! Every option may also be given as an environment variable:
//!
//! | option         | environment         | default         |
//! |----------------|---------------------|-----------------|
//! | `--db-path`    | `BADGER_DB_PATH`    | `./badger-data` |
//! | `--engine-log` | `BADGER_LOG`        | `false`         |
//! | `--port`       | `PORT`              | `8080`          |
//! | `--addr`       | `KVS_ADDR`          | `0.0.0.0`       |
//! | `--templates`  | `KVS_TEMPLATES_DIR` | `templates`     |
//! | `--static`     | `KVS_STATIC_DIR`    | `static`        |
//!
//! An empty environment variable is treated as unset.

use std::process::exit;

use kvs_web::{load_page, KvsError, KvsServer, Result, ServerConfig, SledKvsEngine};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

fn main() {
    let config = match ServerConfig::from_args(std::env::args_os()) {
        Ok(config) => config,
        Err(KvsError::Cli(e)) => e.exit(),
        Err(e) => {
            eprintln!("{}", e);
            exit(1);
        }
    };

    // set up a tracing subscriber to log to STDERR
    if let Err(e) = subscriber_config(&config) {
        eprintln!("{}", e);
        exit(1);
    }

    // start the server
    if let Err(e) = run(config) {
        eprintln!("{}", e);
        exit(1);
    }
}

fn run(config: ServerConfig) -> Result<()> {
    info!("kvs-server {}", env!("CARGO_PKG_VERSION"));
    info!("Storage engine: sled at {:?}", config.db_path);

    let engine = SledKvsEngine::open(&config.db_path)
        .map_err(|e| KvsError::StringErr(format!("Failed to open database: {}", e)))?;
    let page = load_page(&config.templates_dir)
        .map_err(|e| KvsError::StringErr(format!("Failed to load templates: {}", e)))?;

    let server = KvsServer::new(engine, page, &config.static_dir);
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let listener = TcpListener::bind(config.addr).await?;
        println!("Server starting on http://localhost:{}", config.addr.port());
        server.run(listener).await
    })
}

/// configures a tracing subscriber that will log to STDERR.
///
/// The level is taken from `RUST_LOG` (`info` when unset). The storage engine's own log records
/// are silenced unless the engine log is enabled.
fn subscriber_config(config: &ServerConfig) -> Result<()> {
    let rust_log = std::env::var("RUST_LOG").ok();
    let filter = config.log_filter(rust_log.as_deref())?;

    FmtSubscriber::builder()
        .with_env_filter(filter)
        // log to stderr instead of stdout
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| KvsError::StringErr(format!("setting tracing default subscriber failed: {}", e)))
}
