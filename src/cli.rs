//! CLI parser
use clap::Parser;
use std::num::NonZeroU16;
use url::Url;

use crate::constants::DEFAULT_DATABASE_PATH;

#[derive(Parser, Debug)]
/// CLI Options for the simulation server
pub struct CliOptions {
    #[clap(long, help = "Enable debug logging", env = "PARALLELIZATION_DEBUG")]
    /// Enable debug logging. Env: PARALLELIZATION_DEBUG
    pub debug: bool,
    #[clap(long, short, default_value = "9000", env = "PARALLELIZATION_PORT")]
    /// http listener, defaults to `9000`.
    /// Env: PARALLELIZATION_PORT
    pub port: NonZeroU16,
    #[clap(
        long,
        short,
        default_value = "127.0.0.1",
        env = "PARALLELIZATION_LISTEN_ADDRESS"
    )]
    /// Listen address, defaults to `127.0.0.1`.
    /// Env: PARALLELIZATION_LISTEN_ADDRESS
    pub listen_address: String,

    #[clap(
        long,
        short,
        default_value = DEFAULT_DATABASE_PATH,
        env = "PARALLELIZATION_DATABASE_PATH"
    )]
    /// Path to the database file, eg `/data/parallelization.sqlite`.
    /// Env: PARALLELIZATION_DATABASE_PATH
    pub database_path: String,
}

#[derive(Parser, Debug)]
/// Options for the one-shot status poller
pub struct PollOptions {
    #[clap(long, help = "Enable debug logging", env = "PARALLELIZATION_DEBUG")]
    /// Enable debug logging. Env: PARALLELIZATION_DEBUG
    pub debug: bool,
    #[clap(long, short)]
    /// Page to poll, eg `http://127.0.0.1:9000/simulate-problems/progress`.
    pub url: Url,
}
