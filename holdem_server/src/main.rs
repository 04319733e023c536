//! Multi-table hold'em server over a single-threaded poll loop.
//!
//! Clients connect over TCP, are seated automatically, and exchange
//! length-prefixed binary frames with the session.

mod config;
mod logging;

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Error;
use ctrlc::set_handler;
use pico_args::Arguments;

use config::ServerConfig;
use holdem::net::server::Server;

const HELP: &str = "\
Run a multi-table hold'em server

USAGE:
  holdem_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env HOLDEM_BIND or 127.0.0.1:65432]
  --seed       N           Base seed for per-table RNGs  [default: env HOLDEM_SEED or 0]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  HOLDEM_BIND              Server bind address (e.g., 0.0.0.0:65432)
  HOLDEM_SEED              Base seed for per-table RNGs
  RUST_LOG                 Log filter (e.g., info, holdem=debug)
";

struct Args {
    bind: Option<SocketAddr>,
    seed: Option<u64>,
}

fn main() -> Result<(), Error> {
    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        seed: pargs.opt_value_from_str("--seed")?,
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.seed)?;
    config.validate()?;

    // SIGINT raises the stop flag; the poll loop notices within its
    // next timeout and drains.
    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    set_handler(move || flag.store(true, Ordering::Relaxed))?;

    tracing::info!("starting hold'em server at {}", config.bind);
    let mut server = Server::bind(config.bind, config.seed)?;
    server.run(&stop)?;
    tracing::info!("server stopped");

    Ok(())
}
