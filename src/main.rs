// src/main.rs

use dockhand::{cli, logging, run};

#[tokio::main]
async fn main() {
    let args = cli::parse();

    if let Err(err) = logging::init_logging(args.log_level, args.quiet) {
        eprintln!("dockhand error: {err:?}");
        std::process::exit(1);
    }

    match run(args).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(err) => {
            eprintln!("dockhand error: {err:?}");
            std::process::exit(1);
        }
    }
}
