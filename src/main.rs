#![deny(unsafe_code)]

//! pst-send — data-egress daemon entry point.

use clap::Parser;

mod cli_app;

fn main() {
    let args = cli_app::Cli::parse();
    if let Err(e) = cli_app::run(&args) {
        eprintln!("pst-send: {e}");
        std::process::exit(1);
    }
}
