use clap::Parser;
use pratilipi2epub::cli::{run, Args};
use std::error::Error;

fn main() {
    let args = Args::parse();
    let Err(e) = run(&args) else {
        return;
    };
    eprintln!("{}", e);
    if args.verbose {
        let mut cause = e.source();
        while let Some(c) = cause {
            eprintln!("  caused by: {}", c);
            cause = c.source();
        }
    }
    std::process::exit(e.exit_code());
}
