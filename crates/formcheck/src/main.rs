//! Binary entrypoint for `formcheck`.
use std::process;

use clap::Parser;
use formcheck::{Cli, render, run};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log);

    match run(&cli).await {
        Ok(verdict) => {
            println!("{}", render(&verdict, cli.json));
            if !verdict.is_valid() {
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{e}");
            process::exit(2);
        }
    }
}
