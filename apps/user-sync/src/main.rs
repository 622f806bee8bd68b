//! user-sync — fetch users from a source, store them in SQLite, print them back.
//!
//! Run:
//! ```bash
//! # 10 mock users into ./api.sqlite3 (defaults)
//! cargo run -p user-sync
//!
//! # 20 users from the external listing service
//! cargo run -p user-sync -- external 20
//!
//! # json logs on stderr
//! LOG_FORMAT=json USER_SOURCE=external cargo run -p user-sync
//! ```
//!
//! Configuration: See `config.rs` for all environment variables.

mod config;
mod factory;

use std::io::Write;

use domain::service::UserSync;
use domain::{StoredUser, TableSchema, UserStore};
use sqlite_adapter::SqliteUserStore;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    let mut cfg = match config::Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = cfg.apply_args(std::env::args().skip(1)) {
        eprintln!("{}\n\nUsage:\n  user-sync [internal|external] [count]", e);
        std::process::exit(1);
    }

    init_tracing(&cfg);

    if let Err(msg) = run(&cfg) {
        eprintln!("error: {}", msg);
        std::process::exit(1);
    }
}

fn run(cfg: &config::Config) -> Result<(), String> {
    let api = factory::create_api(cfg.source.as_str(), cfg).map_err(|e| e.to_string())?;

    let store = SqliteUserStore::open(&cfg.db_path).map_err(|e| e.to_string())?;
    let schema = TableSchema::users();
    store.create_table(&schema).map_err(|e| e.to_string())?;

    // The store is dropped (and its connection released) on every early return.
    let sync = UserSync::new(api, store, cfg.source, schema.name.clone());
    let written = sync.sync(cfg.count).map_err(|e| e.to_string())?;
    info!(source = %cfg.source, count = written, db = %cfg.db_path.display(), "users stored");

    let rows = sync.stored(None).map_err(|e| e.to_string())?;
    write_rows(&mut std::io::stdout().lock(), sync.source(), &rows)
        .map_err(|e| format!("write output: {}", e))?;

    sync.into_store().close().map_err(|e| e.to_string())
}

fn write_rows<W: Write>(
    out: &mut W,
    source: domain::SourceKind,
    rows: &[StoredUser],
) -> std::io::Result<()> {
    writeln!(out, "### Stored users ({} source) ###", source)?;
    writeln!(out, "id | name | age | gender | address | email | phone_number")?;
    for row in rows {
        writeln!(out, "{}", row)?;
    }
    writeln!(out, "\n######################################")?;
    writeln!(out, "{} row(s)", rows.len())
}

fn init_tracing(cfg: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Logs go to stderr; stdout carries the row dump.
    let registry = tracing_subscriber::registry().with(env_filter);
    match cfg.log_format {
        config::LogFormat::Json => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_timer(fmt::time::SystemTime)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        config::LogFormat::Pretty => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    }
}
