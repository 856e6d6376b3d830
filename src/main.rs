mod auth;
mod cmd;
mod config;
mod drive;
mod store;
mod sync;

use crate::cmd::backup::Outcome;
use crate::config::AppConfig;
use anyhow::Result;
use std::env;
use std::process::exit;
use tracing_subscriber::EnvFilter;

fn main() {
    match entry() {
        Ok(Outcome::Terminated) => exit(1),
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {e:#}");
            exit(1);
        }
    }
}

fn entry() -> Result<Outcome> {
    let args: Vec<String> = env::args().skip(1).collect();

    match args.first().map(String::as_str) {
        Some("-h" | "--help") => {
            cmd::help::run();
            return Ok(Outcome::Completed(0));
        }
        Some("-V" | "--version") => {
            println!("drivebackup {}", env!("CARGO_PKG_VERSION"));
            return Ok(Outcome::Completed(0));
        }
        _ => {}
    }

    if args.len() != 1 {
        cmd::help::usage();
        return Ok(Outcome::Completed(0));
    }

    let cfg = AppConfig::load()?;
    init_logging(&cfg);
    cmd::run_backup(&cfg, &args[0])
}

fn init_logging(cfg: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.log_filter()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
