//! Awale match server.
//!
//! Serves the line protocol on one thread; `status` and `quit` typed on
//! stdin inspect and stop it.

mod config;

use std::net::SocketAddr;

use anyhow::Error;
use ctrlc::set_handler;
use log::info;
use pico_args::Arguments;

use awale::server::{self, AwaleConfig};
use config::{Overrides, ServerConfig};

const HELP: &str = "\
Run an awale match server

USAGE:
  awale_server [OPTIONS]

OPTIONS:
  --bind         IP:PORT   Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:5050]
  --max-users    N         Connected users at once     [default: env MAX_USERS or 256]
  --max-matches  N         Live matches at once        [default: env MAX_MATCHES or 128]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:5050)
  MAX_CHALLENGES           Pending challenges per user
  MAX_FRIENDS              Friends per user
  MAX_REPLAY_FRAMES        Board snapshots kept per match
  MAX_BIO_LEN              Bio length in characters
  MAX_NAME_LEN             Name length in characters (at most 31)
  RUST_LOG                 Log filter [default: info]

STDIN:
  status                   Log a snapshot of users and matches
  quit                     Stop the server
";

fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let overrides = Overrides {
        bind: pargs.opt_value_from_str::<_, SocketAddr>("--bind")?,
        max_users: pargs.opt_value_from_str("--max-users")?,
        max_matches: pargs.opt_value_from_str("--max-matches")?,
    };
    let config = ServerConfig::from_env(overrides)?;
    config.validate()?;

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .init();
    info!("starting awale server at {}", config.bind);

    server::run(
        config.bind,
        AwaleConfig {
            lobby: config.lobby,
            stdin_control: true,
        },
    )
}
