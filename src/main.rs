use std::process::exit;

use clap::Parser;
use env_logger::Env;
use log::error;

use net_dhcp::core::CLI;

fn main() {
    let cli = CLI::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();

    if let Err(e) = net_dhcp::daemon(cli) {
        error!("Fatal: {e:?}");
        exit(-1);
    }
}
