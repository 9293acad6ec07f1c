mod consts;
mod daemon;
mod framing;
mod handlers;
mod netconf;
mod notify;
mod protocol;
mod registry;

use anyhow::Context;
use clap::Parser;

#[derive(Parser, Debug)]
#[clap(version, author, about = "multiplexes local clients onto a pool of NETCONF-over-SSH sessions")]
struct Args {
    #[clap(short, long, action, help = "a toml file containing configuration")]
    config_file: Option<String>,
    #[clap(short, long, action, help = "override the unix socket path from the config file")]
    socket: Option<String>,
    #[clap(short, long, action = clap::ArgAction::Count,
           help = "show more in logs, may be provided multiple times")]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    daemon::run(args.config_file, args.socket, args.verbose).context("running daemon")
}
