mod args;
mod ops;

use clap::Parser;
use env_logger::Env;
use log::{debug, error};
use snafu::ErrorCompat;

use crate::args::Args;

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();
    debug!("args: {:?}", args);

    match ops::run(&args) {
        Ok(processed) => {
            println!("done: {} ({} rows)", args.command.name(), processed);
        }
        Err(e) => {
            error!("{} failed: {:?}", args.command.name(), e);
            eprintln!("An error occured: {}", e);
            if let Some(bt) = ErrorCompat::backtrace(&e) {
                eprintln!("trace: {}", bt);
            }
            std::process::exit(1);
        }
    }
}
