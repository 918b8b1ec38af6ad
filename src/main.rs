// Entrypoint: set up logging from `-v` / `RUST_LOG`, parse arguments and
// run one command. Any error ends the process with a non-zero status.

use clap::Parser;
use gost::{cli::Cli, ui};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();

    ui::run(cli)
}
